//! Command dispatch: a static table mapping command names to handlers and
//! the precondition flags the dispatcher checks before invoking them.
//! Unknown commands are offered to the external admin interpreter.

use tracing::{debug, info};

use crate::chat;
use crate::engine::CommandArgs;
use crate::session;
use crate::state::Team;
use crate::vote;
use crate::GameModule;

/// Precondition a command imposes, checked in table order by the
/// dispatcher before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdFlag {
    /// Requires cheats enabled on the server
    Cheat,
    /// A chat-adjacent command, refused while muted
    Message,
    /// Caller must be on a team
    Team,
    /// Caller must not be on a team
    NoTeam,
    /// Caller must be on this specific team
    OnTeam(Team),
    /// Caller must be alive
    Living,
    /// Permitted during intermission and pauses (absence means refused)
    Intermission,
}

type Handler = fn(&mut GameModule, usize, &CommandArgs);

struct Command {
    name: &'static str,
    flags: &'static [CmdFlag],
    handler: Handler,
}

use CmdFlag as F;

static COMMANDS: &[Command] = &[
    Command { name: "team", flags: &[], handler: cmd_team },
    Command { name: "vote", flags: &[], handler: vote::cmd_vote },
    Command { name: "ignore", flags: &[], handler: chat::cmd_ignore },
    Command { name: "unignore", flags: &[], handler: chat::cmd_ignore },
    Command { name: "tell", flags: &[F::Message], handler: chat::cmd_tell },
    Command { name: "callvote", flags: &[F::Message], handler: vote::cmd_call_vote },
    Command { name: "callteamvote", flags: &[F::Message, F::Team], handler: vote::cmd_call_team_vote },
    Command { name: "say_area", flags: &[F::Message, F::Team], handler: chat::cmd_say_area },
    Command { name: "say", flags: &[F::Message, F::Intermission], handler: chat::cmd_say },
    Command { name: "say_team", flags: &[F::Message, F::Intermission], handler: chat::cmd_say },
    Command { name: "say_admins", flags: &[F::Message, F::Intermission], handler: chat::cmd_say },
    Command { name: "a", flags: &[F::Message, F::Intermission], handler: chat::cmd_say },
    Command { name: "m", flags: &[F::Message, F::Intermission], handler: chat::cmd_private_message },
    Command { name: "mt", flags: &[F::Message, F::Intermission], handler: chat::cmd_private_message },
    Command { name: "me", flags: &[F::Message, F::Intermission], handler: chat::cmd_say },
    Command { name: "me_team", flags: &[F::Message, F::Intermission], handler: chat::cmd_say },
    Command { name: "noclip", flags: &[F::Cheat, F::Team, F::Living], handler: cmd_noclip },
    Command { name: "kill", flags: &[F::Team, F::Living], handler: cmd_kill },
    Command { name: "ptrcverify", flags: &[F::NoTeam], handler: session::cmd_ptrc_verify },
    Command { name: "ptrcrestore", flags: &[F::NoTeam], handler: session::cmd_ptrc_restore },
    Command { name: "teamvote", flags: &[F::Team], handler: vote::cmd_team_vote },
];

/// The first flag the caller fails, with its rejection message. The
/// intermission gate is handled separately because it rejects silently.
fn failed_precondition(gm: &GameModule, slot: usize, flags: &[CmdFlag]) -> Option<&'static str> {
    let cl = &gm.ctx.clients[slot];
    for flag in flags {
        let rejection = match flag {
            F::Cheat if !gm.ctx.cheats => Some("Cheats are not enabled on this server"),
            F::Message if cl.muted => Some("You are muted and cannot use message commands."),
            F::Team if cl.team == Team::None => Some("Join a team first"),
            F::NoTeam if cl.team != Team::None => Some("Cannot use this command when on a team"),
            F::OnTeam(team) if cl.team != *team => match team {
                Team::Red => Some("Must be on the red team to use this command"),
                _ => Some("Must be on the blue team to use this command"),
            },
            F::Living if !cl.alive => Some("Must be alive to use this command"),
            _ => None,
        };
        if rejection.is_some() {
            return rejection;
        }
    }
    None
}

/// Host entry point for one tokenized client command.
pub fn client_command(gm: &mut GameModule, slot: usize, line: &str) {
    if gm.ctx.client(slot).is_none() {
        return; // not fully in game yet
    }

    let args = CommandArgs::tokenize(line);
    let name = args.argv(0).to_ascii_lowercase();
    if name.is_empty() {
        return;
    }

    let Some(cmd) = COMMANDS.iter().find(|c| c.name == name) else {
        if !gm.admin.intercept_command(slot, &args) {
            gm.print(slot, format!("Unknown command {name}"));
        }
        return;
    };

    if (gm.ctx.intermission || gm.ctx.paused) && !cmd.flags.contains(&F::Intermission) {
        debug!(slot, command = %name, "refused during intermission/pause");
        return;
    }

    if let Some(rejection) = failed_precondition(gm, slot, cmd.flags) {
        gm.print(slot, rejection);
        return;
    }

    (cmd.handler)(gm, slot, &args);
}

/// `team <red|blue|spectate>`: minimal team selection, enough to drive the
/// team-scoped commands. Balance checks and spawn queues belong to the
/// host.
fn cmd_team(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    let choice = args.argv(1).to_ascii_lowercase();
    let team = match choice.as_str() {
        "red" | "r" => Team::Red,
        "blue" | "b" => Team::Blue,
        "spectate" | "spec" | "s" => Team::None,
        _ => {
            gm.print(slot, "usage: team [red | blue | spectate]");
            return;
        }
    };

    let cl = &mut gm.ctx.clients[slot];
    if cl.team == team {
        let name = team.name().to_string();
        gm.print(slot, format!("You are already on the {name} team"));
        return;
    }

    cl.team = team;
    // leaving a team invalidates any team-vote ballot already cast
    cl.voted_team = false;
    if team == Team::None {
        cl.alive = false;
    } else {
        cl.joined_team = true;
        cl.alive = true;
        if cl.class == crate::state::PlayerClass::None {
            cl.class = crate::state::PlayerClass::Rookie;
        }
    }

    let name = gm.client_name(slot);
    info!(target: "team", slot, team = team.name(), player = %name, "team change");
    gm.print(slot, format!("Joined the {}", team.name()));
}

fn cmd_kill(gm: &mut GameModule, slot: usize, _args: &CommandArgs) {
    gm.ctx.clients[slot].alive = false;
    gm.engine.kill_client(slot);
    info!(target: "game", slot, "suicide");
}

fn cmd_noclip(gm: &mut GameModule, slot: usize, _args: &CommandArgs) {
    let enabled = gm.engine.toggle_noclip(slot);
    gm.print(slot, if enabled { "noclip ON" } else { "noclip OFF" });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FixedAdmin, FixedMaps, RecordingEngine};
    use crate::state::MatchContext;
    use crate::Config;

    struct Fixture {
        ctx: MatchContext,
        engine: RecordingEngine,
        admin: FixedAdmin,
        maps: FixedMaps,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let mut ctx = MatchContext::new();
            ctx.connect_client(0, "alice", "10.0.0.1");
            let mut config = Config::default();
            config.flood_min_ms = 0;
            Self {
                ctx,
                engine: RecordingEngine::new(),
                admin: FixedAdmin::new(),
                maps: FixedMaps::of(&[]),
                config,
            }
        }

        fn gm(&mut self) -> GameModule<'_> {
            GameModule {
                ctx: &mut self.ctx,
                engine: &mut self.engine,
                admin: &mut self.admin,
                maps: &self.maps,
                config: &self.config,
            }
        }

        fn run(&mut self, slot: usize, line: &str) {
            client_command(&mut self.gm(), slot, line);
        }
    }

    #[test]
    fn unknown_command_offered_to_interpreter_then_reported() {
        let mut fx = Fixture::new();
        fx.run(0, "frobnicate now");
        assert_eq!(fx.admin.offered, vec!["frobnicate now".to_string()]);
        assert_eq!(fx.engine.last_print_to(0), Some("Unknown command frobnicate"));
    }

    #[test]
    fn interpreter_claim_suppresses_the_error() {
        let mut fx = Fixture::new();
        fx.admin.consume_all = true;
        fx.run(0, "frobnicate");
        assert!(fx.engine.sent.is_empty());
    }

    #[test]
    fn disconnected_slot_is_ignored() {
        let mut fx = Fixture::new();
        fx.run(9, "say hi");
        assert!(fx.engine.sent.is_empty());
    }

    #[test]
    fn cheat_command_needs_cheats_enabled() {
        let mut fx = Fixture::new();
        fx.run(0, "team red");
        fx.run(0, "noclip");
        assert_eq!(
            fx.engine.last_print_to(0),
            Some("Cheats are not enabled on this server")
        );
        assert!(fx.engine.noclip.is_empty());

        fx.ctx.cheats = true;
        fx.run(0, "noclip");
        assert_eq!(fx.engine.last_print_to(0), Some("noclip ON"));
        assert_eq!(fx.engine.noclip, vec![0]);
    }

    #[test]
    fn muted_client_cannot_use_message_commands() {
        let mut fx = Fixture::new();
        fx.ctx.clients[0].muted = true;
        fx.run(0, "say hello");
        assert_eq!(
            fx.engine.last_print_to(0),
            Some("You are muted and cannot use message commands.")
        );
        // non-message commands still work
        fx.run(0, "team red");
        assert_eq!(fx.ctx.clients[0].team, Team::Red);
    }

    #[test]
    fn team_scoped_commands_refuse_spectators() {
        let mut fx = Fixture::new();
        fx.run(0, "teamvote yes");
        assert_eq!(fx.engine.last_print_to(0), Some("Join a team first"));
    }

    #[test]
    fn resume_commands_refuse_team_members() {
        let mut fx = Fixture::new();
        fx.run(0, "team blue");
        fx.run(0, "ptrcverify 1");
        assert_eq!(
            fx.engine.last_print_to(0),
            Some("Cannot use this command when on a team")
        );
    }

    #[test]
    fn living_flag_blocks_the_dead() {
        let mut fx = Fixture::new();
        fx.run(0, "team red");
        fx.run(0, "kill");
        assert_eq!(fx.engine.killed, vec![0]);
        assert!(!fx.ctx.clients[0].alive);
        fx.run(0, "kill");
        assert_eq!(fx.engine.killed.len(), 1);
        assert_eq!(
            fx.engine.last_print_to(0),
            Some("Must be alive to use this command")
        );
    }

    #[test]
    fn intermission_silently_swallows_non_chat_commands() {
        let mut fx = Fixture::new();
        fx.run(0, "team red");
        fx.ctx.intermission = true;
        fx.run(0, "kill");
        assert!(fx.engine.killed.is_empty());
        // chat stays available
        fx.run(0, "say gg");
        assert!(!fx.engine.chats_to(0).is_empty());
    }

    #[test]
    fn team_change_resets_team_ballot() {
        let mut fx = Fixture::new();
        fx.run(0, "team red");
        fx.ctx.clients[0].voted_team = true;
        fx.run(0, "team blue");
        assert!(!fx.ctx.clients[0].voted_team);
        assert_eq!(fx.ctx.clients[0].team, Team::Blue);
    }

    #[test]
    fn command_lookup_is_case_insensitive() {
        let mut fx = Fixture::new();
        fx.run(0, "TEAM red");
        assert_eq!(fx.ctx.clients[0].team, Team::Red);
    }
}
