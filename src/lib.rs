//! Arenamod - server-side game logic module for a team-based shooter
//!
//! The host engine invokes this crate synchronously: once per client
//! command ([`dispatch::client_command`]) and once per simulation frame
//! ([`vote::run_frame`]). It handles:
//! - command dispatch with capability-flag preconditions
//! - chat routing (all/team/private/admin/area) with ignore lists
//! - the voting subsystem (one global vote, one vote per team)
//! - flood limiting and reconnection-resume codes
//!
//! There is no internal threading; all state lives in an explicitly passed
//! [`state::MatchContext`] scoped to the current round.

pub mod chat;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod flood;
pub mod resolver;
pub mod session;
pub mod state;
pub mod strutil;
pub mod vote;

use engine::{AdminControl, Capability, Engine, MapRegistry, ServerMsg};
use state::MatchContext;

pub use config::Config;
pub use dispatch::client_command;
pub use engine::CommandArgs;

/// Borrowed bundle of the match context and the host collaborators,
/// threaded through every handler for the duration of one invocation.
pub struct GameModule<'a> {
    pub ctx: &'a mut MatchContext,
    pub engine: &'a mut dyn Engine,
    pub admin: &'a mut dyn AdminControl,
    pub maps: &'a dyn MapRegistry,
    pub config: &'a Config,
}

impl GameModule<'_> {
    /// Plain console print to one client.
    pub fn print(&mut self, slot: usize, text: impl Into<String>) {
        self.engine.send(slot, ServerMsg::print(text));
    }

    /// Print to a client, or to the server log when the origin is the
    /// console.
    pub fn print_opt(&mut self, slot: Option<usize>, text: impl Into<String>) {
        match slot {
            Some(slot) => self.print(slot, text),
            None => tracing::info!(text = %text.into(), "console"),
        }
    }

    /// Deliver an audit line to every admin-chat-capable client and to the
    /// admin log.
    pub fn admin_audit(&mut self, text: &str) {
        tracing::info!(target: "admin", %text);
        for slot in 0..self.ctx.clients.len() {
            if self.ctx.clients[slot].connected()
                && self.admin.has_capability(slot, Capability::AdminChat)
            {
                self.engine.send(slot, ServerMsg::print(text));
            }
        }
    }

    /// Raw display name of a connected client, or a placeholder.
    pub fn client_name(&self, slot: usize) -> String {
        self.ctx
            .client(slot)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
