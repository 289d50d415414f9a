//! End-to-end tests driving the public entry points the host engine uses:
//! [`arenamod::client_command`] for each command and
//! [`arenamod::vote::run_frame`] for the per-frame poller.

use arenamod::engine::{
    team_cs, Capability, FixedAdmin, FixedMaps, RecordingEngine, ServerMsg, CS_TEAMVOTE_YES,
    CS_VOTE_NO, CS_VOTE_TIME, CS_VOTE_YES,
};
use arenamod::state::{MatchContext, Team};
use arenamod::{client_command, vote, Config, GameModule};

struct Server {
    ctx: MatchContext,
    engine: RecordingEngine,
    admin: FixedAdmin,
    maps: FixedMaps,
    config: Config,
}

impl Server {
    fn new() -> Self {
        let mut ctx = MatchContext::new();
        ctx.time_ms = 600_000;
        ctx.start_time_ms = 1000;
        let mut config = Config::default();
        config.flood_min_ms = 0;
        Self {
            ctx,
            engine: RecordingEngine::new(),
            admin: FixedAdmin::new(),
            maps: FixedMaps::of(&["arena1", "arena2"]),
            config,
        }
    }

    fn join(&mut self, slot: usize, name: &str, team: &str) {
        self.ctx
            .connect_client(slot, name, &format!("10.0.0.{slot}"));
        self.ctx.clients[slot].first_connect = false;
        if team != "spec" {
            self.cmd(slot, &format!("team {team}"));
        }
    }

    fn cmd(&mut self, slot: usize, line: &str) {
        let mut gm = GameModule {
            ctx: &mut self.ctx,
            engine: &mut self.engine,
            admin: &mut self.admin,
            maps: &self.maps,
            config: &self.config,
        };
        client_command(&mut gm, slot, line);
    }

    fn frame(&mut self) {
        let mut gm = GameModule {
            ctx: &mut self.ctx,
            engine: &mut self.engine,
            admin: &mut self.admin,
            maps: &self.maps,
            config: &self.config,
        };
        vote::run_frame(&mut gm);
    }

    fn advance(&mut self, ms: i64) {
        self.ctx.time_ms += ms;
        self.frame();
    }
}

fn four_player_server() -> Server {
    let mut sv = Server::new();
    sv.join(0, "alice", "red");
    sv.join(1, "bob", "red");
    sv.join(2, "carol", "blue");
    sv.join(3, "dave", "blue");
    sv
}

#[test]
fn kick_vote_lifecycle_passes_and_bans_by_ip() {
    let mut sv = four_player_server();

    sv.cmd(0, "callvote kick dave -r cheating");
    assert!(sv.ctx.vote.active());
    assert_eq!(sv.engine.config_string(CS_VOTE_YES), Some("1"));
    assert!(sv.ctx.vote.display.contains("Kick player 'dave'"));
    assert!(sv.ctx.vote.display.contains("Reason: 'cheating"));
    assert!(sv
        .engine
        .broadcasts
        .iter()
        .any(|m| matches!(m, ServerMsg::Print { text } if text.contains("called a vote"))));

    sv.cmd(1, "vote yes");
    sv.cmd(2, "vote y");
    assert_eq!(sv.engine.config_string(CS_VOTE_YES), Some("3"));

    sv.frame();
    assert!(!sv.ctx.vote.active());
    assert_eq!(sv.engine.config_string(CS_VOTE_TIME), Some("0"));
    assert_eq!(sv.engine.queued.len(), 1);
    assert!(sv.engine.queued[0].contains("10.0.0.3"));
    assert!(sv.engine.queued[0].contains("vote kick"));
}

#[test]
fn failed_kick_vote_discards_the_command() {
    let mut sv = four_player_server();
    sv.cmd(0, "callvote kick dave");
    sv.cmd(1, "vote no");
    sv.cmd(2, "vote no");
    sv.frame();
    assert!(!sv.ctx.vote.active());
    assert!(sv.engine.queued.is_empty());
    assert!(sv
        .engine
        .broadcasts
        .iter()
        .any(|m| matches!(m, ServerMsg::Print { text } if text == "Vote failed")));
}

#[test]
fn expired_vote_fails_after_the_window() {
    let mut sv = four_player_server();
    sv.cmd(0, "callvote kick dave");
    sv.advance(29_999);
    assert!(sv.ctx.vote.active());
    sv.advance(1);
    assert!(!sv.ctx.vote.active());
    assert!(sv.engine.queued.is_empty());
}

#[test]
fn map_vote_defers_execution_by_the_configured_delay() {
    let mut sv = four_player_server();
    sv.cmd(0, "callvote map arena2");
    for slot in [1, 2, 3] {
        sv.cmd(slot, "vote yes");
    }
    sv.frame();
    assert!(!sv.ctx.vote.active());
    assert!(sv.engine.queued.is_empty());

    sv.advance(3000);
    assert_eq!(sv.engine.queued, vec!["map arena2".to_string()]);
}

#[test]
fn unknown_map_never_starts_a_vote() {
    let mut sv = four_player_server();
    sv.maps = FixedMaps::of(&["arena1"]);
    sv.cmd(0, "callvote map atlantis");
    assert!(!sv.ctx.vote.active());
    assert!(sv.engine.config_string(CS_VOTE_TIME).is_none());
}

#[test]
fn ambiguous_vote_target_reports_both_candidates() {
    let mut sv = Server::new();
    sv.join(0, "Foo", "red");
    sv.join(1, "Foobar", "red");
    sv.cmd(0, "callvote mute foo");
    assert!(!sv.ctx.vote.active());
    let report = sv.engine.prints_to(0).join("\n");
    assert!(report.contains("0 - Foo"), "{report}");
    assert!(report.contains("1 - Foobar"), "{report}");
}

#[test]
fn poll_vote_resolves_without_any_host_command() {
    let mut sv = four_player_server();
    sv.cmd(0, "callvote poll \"switch to arena2 next week\"");
    assert_eq!(sv.engine.config_string(CS_VOTE_YES), Some("0"));
    assert_eq!(sv.engine.config_string(CS_VOTE_NO), Some("0"));
    assert!(sv.ctx.vote.display.contains("[Poll]"));

    for slot in 0..4 {
        sv.cmd(slot, "vote yes");
    }
    sv.frame();
    assert!(!sv.ctx.vote.active());
    assert!(sv.engine.queued.is_empty());
}

#[test]
fn team_vote_runs_independently_of_a_global_vote() {
    let mut sv = four_player_server();
    sv.cmd(0, "callvote draw");
    sv.cmd(2, "callteamvote admitdefeat");

    let idx = Team::Blue.index().unwrap();
    assert!(sv.ctx.vote.active());
    assert!(sv.ctx.team_votes[idx].active());
    assert_eq!(
        sv.engine.config_string(team_cs(CS_TEAMVOTE_YES, idx)),
        Some("1")
    );

    sv.cmd(3, "teamvote yes");
    sv.frame();
    // both blue players said yes out of two eligible
    assert!(!sv.ctx.team_votes[idx].active());
    assert_eq!(sv.engine.queued, vec!["admitdefeat blue".to_string()]);
    assert!(sv.ctx.vote.active(), "global vote keeps running");
}

#[test]
fn plain_vote_command_redirects_to_the_callers_team_vote() {
    let mut sv = four_player_server();
    sv.cmd(2, "callteamvote admitdefeat");
    sv.cmd(3, "vote yes");
    let idx = Team::Blue.index().unwrap();
    assert_eq!(sv.ctx.team_votes[idx].yes, 2);
    // the other team's generic vote still errors
    sv.cmd(0, "vote yes");
    assert_eq!(
        sv.engine.last_print_to(0),
        Some("No vote in progress")
    );
}

#[test]
fn muted_player_can_be_vote_unmuted_but_not_chat() {
    let mut sv = four_player_server();
    sv.ctx.clients[3].muted = true;

    sv.cmd(3, "say hello");
    assert_eq!(
        sv.engine.last_print_to(3),
        Some("You are muted and cannot use message commands.")
    );

    sv.cmd(0, "callvote unmute dave");
    assert!(sv.ctx.vote.active());
    assert!(sv.ctx.vote.display.contains("Un-Mute player 'dave'"));
    for slot in [1, 2] {
        sv.cmd(slot, "vote yes");
    }
    sv.frame();
    assert_eq!(sv.engine.queued, vec!["!unmute 3".to_string()]);
}

#[test]
fn immune_admin_attempt_is_audited() {
    let mut sv = four_player_server();
    sv.admin = FixedAdmin::new()
        .grant(1, Capability::Immunity)
        .grant(2, Capability::AdminChat);
    sv.cmd(0, "callvote kick bob");
    assert!(!sv.ctx.vote.active());
    assert!(sv
        .engine
        .prints_to(2)
        .iter()
        .any(|t| t.contains("attempted /callvote")));
}

#[test]
fn vote_limit_exempt_capability_bypasses_the_cap() {
    let mut sv = four_player_server();
    sv.config.vote_limit = 1;
    sv.admin = FixedAdmin::new().grant(0, Capability::NoVoteLimit);
    for _ in 0..3 {
        sv.cmd(0, "callvote draw");
        assert!(sv.ctx.vote.active());
        sv.ctx.vote.start_time_ms = 0; // resolve out of band
    }
}

#[test]
fn chat_flows_through_the_dispatcher() {
    let mut sv = four_player_server();
    sv.cmd(0, "say_team rushing mid");
    assert_eq!(sv.engine.chats_to(1).len(), 1);
    assert!(sv.engine.chats_to(2).is_empty());

    sv.cmd(0, "m carol psst");
    assert_eq!(sv.engine.chats_to(2).len(), 1);

    sv.cmd(3, "ignore alice");
    sv.cmd(0, "say hi all");
    let to_dave = sv.engine.chats_to(3);
    match to_dave.last().unwrap() {
        ServerMsg::Chat { skip_notify, .. } => assert!(skip_notify),
        other => panic!("unexpected message {other:?}"),
    }
}

#[test]
fn flood_limited_caller_cannot_call_votes() {
    let mut sv = four_player_server();
    sv.config.flood_min_ms = 1000;
    // hammer without letting the clock move
    for _ in 0..5 {
        sv.cmd(0, "callvote draw");
        sv.ctx.vote.start_time_ms = 0;
    }
    assert!(sv
        .engine
        .prints_to(0)
        .iter()
        .any(|t| t.contains("flood-limited")));
}

#[test]
fn resume_code_survives_a_reconnect() {
    let mut sv = four_player_server();
    sv.cmd(3, "team spectate");
    sv.cmd(3, "ptrcverify 0");
    let code = sv.ctx.clients[3].resume_code.expect("code issued");

    sv.ctx.clients[3].team = Team::Blue;
    sv.ctx.clients[3].score = 12;
    sv.ctx.disconnect_client(3);

    sv.ctx.connect_client(7, "dave", "10.0.0.3");
    sv.cmd(7, &format!("ptrcverify {code}"));
    sv.cmd(7, &format!("ptrcrestore {code}"));
    assert_eq!(sv.ctx.clients[7].team, Team::Blue);
    assert_eq!(sv.ctx.clients[7].score, 12);
}
