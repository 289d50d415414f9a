//! Host-engine collaborator interfaces.
//!
//! The game module never owns a process, socket or renderer; everything it
//! needs from the outside world comes through the narrow traits defined
//! here. The host implements them against its transport and admin
//! database; [`ConsoleEngine`] is the in-process stand-in used by the dev
//! harness and [`RecordingEngine`] the one used by the test suites.

pub mod args;
pub mod console;
pub mod protocol;
pub mod recording;

pub use args::CommandArgs;
pub use console::{AllMaps, ConsoleAdmin, ConsoleEngine};
pub use protocol::{ChatKind, ServerMsg};
pub use recording::{FixedAdmin, FixedMaps, RecordingEngine};

/// Named admin capabilities consulted by the module. The host's permission
/// database decides who holds what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Cannot be targeted by kick/mute votes
    Immunity,
    /// Bypasses vote rate limits and grace periods
    NoVoteLimit,
    /// Exempt from flood limiting
    NoCensorFlood,
    /// Receives admin chat and audit broadcasts
    AdminChat,
    /// Spectator may read team chat of both teams
    SpecAllChat,
    /// May omit otherwise-required vote reasons
    Unaccountable,
}

// Configuration-string indices replicated to every client. The order of
// the vote fields is part of the client compatibility contract.
pub const CS_VOTE_TIME: u16 = 8;
pub const CS_VOTE_STRING: u16 = 9;
pub const CS_VOTE_YES: u16 = 10;
pub const CS_VOTE_NO: u16 = 11;
pub const CS_TEAMVOTE_TIME: u16 = 12;
pub const CS_TEAMVOTE_STRING: u16 = 14;
pub const CS_TEAMVOTE_YES: u16 = 16;
pub const CS_TEAMVOTE_NO: u16 = 18;

/// Config-string index for a team vote field, offset by team slot.
pub fn team_cs(base: u16, team_index: usize) -> u16 {
    base + team_index as u16
}

/// Transport and world services provided by the host engine.
pub trait Engine {
    /// Deliver a message to a single client slot.
    fn send(&mut self, slot: usize, msg: ServerMsg);

    /// Deliver a message to every connected client.
    fn broadcast(&mut self, msg: ServerMsg);

    /// Publish a configuration string replicated to all clients.
    fn set_config_string(&mut self, index: u16, value: &str);

    /// Queue a literal command for the host to execute after this
    /// invocation returns.
    fn queue_command(&mut self, command: &str);

    /// World position of a client, for area chat.
    fn client_origin(&self, slot: usize) -> [f32; 3];

    /// Human-readable map location of a client, suffixed to team chat.
    fn client_location(&self, slot: usize) -> Option<String>;

    /// Slots of clients whose entities intersect the given box.
    fn clients_in_box(&self, mins: [f32; 3], maxs: [f32; 3]) -> Vec<usize>;

    /// Kill the client's avatar (the `kill` command).
    fn kill_client(&mut self, slot: usize);

    /// Toggle noclip movement for a client; returns the new state.
    fn toggle_noclip(&mut self, slot: usize) -> bool;
}

/// Admin-permission database and the external admin-command interpreter.
pub trait AdminControl {
    fn has_capability(&self, slot: usize, cap: Capability) -> bool;

    fn admin_level(&self, slot: usize) -> i32;

    /// Offer an unrecognized command to the admin interpreter. Returns
    /// true when it was consumed.
    fn intercept_command(&mut self, slot: usize, args: &CommandArgs) -> bool;
}

/// Map lookup collaborator.
pub trait MapRegistry {
    fn map_exists(&self, name: &str) -> bool;
}
