//! Reconnection-resume codes. A client that verifies without a valid code
//! is issued a fresh random one; after a disconnect the code's record holds
//! a snapshot of the session, and presenting the code on reconnect restores
//! it (as long as the client has not yet joined a team on its own).

use rand::Rng;
use tracing::info;

use crate::engine::{CommandArgs, ServerMsg};
use crate::state::{ConnectionRecord, Team, MAX_CLIENTS};
use crate::GameModule;

/// Create a record with a fresh code for this client, reusing an unclaimed
/// entry when the table is full. Returns the code, or `None` when every
/// record is claimed.
fn generate_connection(gm: &mut GameModule, slot: usize) -> Option<u32> {
    let mut rng = rand::thread_rng();
    let code = loop {
        let candidate: u32 = rng.gen_range(1..=0x7fff_ffff);
        if !gm.ctx.connections.iter().any(|r| r.code == candidate) {
            break candidate;
        }
    };

    let cl = &gm.ctx.clients[slot];
    let record = ConnectionRecord {
        code,
        slot: Some(slot),
        team: cl.team,
        credits: cl.credits,
        score: cl.score,
        enter_time_ms: cl.enter_time_ms,
    };

    if gm.ctx.connections.len() >= MAX_CLIENTS {
        let reusable = gm.ctx.connections.iter().position(|r| r.slot.is_none())?;
        gm.ctx.connections[reusable] = record;
    } else {
        gm.ctx.connections.push(record);
    }

    gm.ctx.clients[slot].resume_code = Some(code);
    Some(code)
}

/// `ptrcverify <code>`: claim an unowned resume record, or get issued a
/// fresh code when the presented one is invalid.
pub fn cmd_ptrc_verify(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    if gm.ctx.clients[slot].resume_code.is_some() {
        return;
    }

    let arg = args.argv(1);
    if arg.is_empty() {
        return;
    }
    let code: u32 = arg.parse().unwrap_or(0);

    let claimable = gm
        .ctx
        .connections
        .iter()
        .position(|r| r.code == code && r.slot.is_none());

    if let Some(idx) = claimable {
        if gm.ctx.connections[idx].team != Team::None {
            gm.engine.send(slot, ServerMsg::PtrcConfirm);
        }
        gm.ctx.connections[idx].slot = Some(slot);
        gm.ctx.clients[slot].resume_code = Some(code);
        info!(target: "session", slot, code, "resume code claimed");
    } else if let Some(code) = generate_connection(gm, slot) {
        gm.engine.send(slot, ServerMsg::PtrcIssue { code });
        info!(target: "session", slot, code, "resume code issued");
    }
}

/// `ptrcrestore <code>`: restore the snapshotted session behind the
/// caller's claimed code.
pub fn cmd_ptrc_restore(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    if gm.ctx.clients[slot].joined_team {
        gm.print(slot, "You cannot use a resume code after joining a team");
        return;
    }

    let arg = args.argv(1);
    if arg.is_empty() {
        return;
    }
    let code: u32 = arg.parse().unwrap_or(0);

    let owned = gm.ctx.clients[slot].resume_code == Some(code);
    let record = gm
        .ctx
        .connections
        .iter()
        .find(|r| r.code == code && r.slot == Some(slot))
        .cloned();

    match record {
        Some(rec) if owned => {
            let cl = &mut gm.ctx.clients[slot];
            cl.team = rec.team;
            cl.credits = rec.credits;
            cl.score = rec.score;
            cl.enter_time_ms = rec.enter_time_ms;
            info!(target: "session", slot, code, team = rec.team.name(), "session restored");
        }
        _ => {
            gm.print(slot, format!("\"{code}\" is not a valid resume code"));
        }
    }
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
            Self {
                ctx,
                engine: RecordingEngine::new(),
                admin: FixedAdmin::new(),
                maps: FixedMaps::of(&[]),
                config: Config::default(),
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
    }

    #[test]
    fn invalid_code_gets_a_fresh_one_issued() {
        let mut fx = Fixture::new();
        cmd_ptrc_verify(&mut fx.gm(), 0, &CommandArgs::tokenize("ptrcverify 42"));
        let issued = match fx.engine.sent.last() {
            Some((0, ServerMsg::PtrcIssue { code })) => *code,
            other => panic!("expected an issued code, got {other:?}"),
        };
        assert_eq!(fx.ctx.clients[0].resume_code, Some(issued));
        assert_eq!(fx.ctx.connections.len(), 1);
        assert_eq!(fx.ctx.connections[0].slot, Some(0));
    }

    #[test]
    fn verify_is_a_noop_once_a_code_is_held() {
        let mut fx = Fixture::new();
        cmd_ptrc_verify(&mut fx.gm(), 0, &CommandArgs::tokenize("ptrcverify 0"));
        let held = fx.ctx.clients[0].resume_code;
        cmd_ptrc_verify(&mut fx.gm(), 0, &CommandArgs::tokenize("ptrcverify 0"));
        assert_eq!(fx.ctx.clients[0].resume_code, held);
        assert_eq!(fx.ctx.connections.len(), 1);
    }

    #[test]
    fn reconnect_claims_and_restores() {
        let mut fx = Fixture::new();
        cmd_ptrc_verify(&mut fx.gm(), 0, &CommandArgs::tokenize("ptrcverify 0"));
        let code = fx.ctx.clients[0].resume_code.unwrap();

        fx.ctx.clients[0].team = Team::Blue;
        fx.ctx.clients[0].score = 25;
        fx.ctx.clients[0].credits = 400;
        fx.ctx.disconnect_client(0);
        assert_eq!(fx.ctx.connections[0].slot, None);
        assert_eq!(fx.ctx.connections[0].team, Team::Blue);

        // the player comes back on a different slot
        fx.ctx.connect_client(5, "alice", "10.0.0.1");
        let verify = CommandArgs::tokenize(&format!("ptrcverify {code}"));
        cmd_ptrc_verify(&mut fx.gm(), 5, &verify);
        assert!(matches!(
            fx.engine.sent.last(),
            Some((5, ServerMsg::PtrcConfirm))
        ));
        assert_eq!(fx.ctx.connections[0].slot, Some(5));

        let restore = CommandArgs::tokenize(&format!("ptrcrestore {code}"));
        cmd_ptrc_restore(&mut fx.gm(), 5, &restore);
        assert_eq!(fx.ctx.clients[5].team, Team::Blue);
        assert_eq!(fx.ctx.clients[5].score, 25);
        assert_eq!(fx.ctx.clients[5].credits, 400);
    }

    #[test]
    fn restore_refused_after_joining_a_team() {
        let mut fx = Fixture::new();
        cmd_ptrc_verify(&mut fx.gm(), 0, &CommandArgs::tokenize("ptrcverify 0"));
        let code = fx.ctx.clients[0].resume_code.unwrap();
        fx.ctx.clients[0].joined_team = true;
        let restore = CommandArgs::tokenize(&format!("ptrcrestore {code}"));
        cmd_ptrc_restore(&mut fx.gm(), 0, &restore);
        assert!(fx
            .engine
            .last_print_to(0)
            .unwrap()
            .contains("after joining a team"));
    }

    #[test]
    fn wrong_code_is_rejected() {
        let mut fx = Fixture::new();
        cmd_ptrc_verify(&mut fx.gm(), 0, &CommandArgs::tokenize("ptrcverify 0"));
        cmd_ptrc_restore(&mut fx.gm(), 0, &CommandArgs::tokenize("ptrcrestore 1"));
        assert!(fx
            .engine
            .last_print_to(0)
            .unwrap()
            .contains("not a valid resume code"));
    }
}
