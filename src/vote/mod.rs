//! Vote engine: one global vote plus one vote per team, each a small state
//! machine (idle, active, resolved). Calls validate the proposed action and
//! publish it through config strings; ballots tally exactly once per
//! client; [`run_frame`] resolves active votes against the threshold and
//! the expiry window and executes the pending action through the host.

use tracing::{info, warn};

use crate::engine::{
    team_cs, Capability, CommandArgs, ServerMsg, CS_TEAMVOTE_NO, CS_TEAMVOTE_STRING,
    CS_TEAMVOTE_TIME, CS_TEAMVOTE_YES, CS_VOTE_NO, CS_VOTE_STRING, CS_VOTE_TIME, CS_VOTE_YES,
};
use crate::flood;
use crate::resolver;
use crate::state::{PlayerClass, Team};
use crate::strutil;
use crate::GameModule;

/// The action a vote proposes, held in typed form while the vote runs.
/// The literal host command is produced only at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteAction {
    Kick {
        /// Banned by address so the target cannot dodge by reconnecting
        ip: String,
        duration: String,
        reason: Option<String>,
        team_scoped: bool,
    },
    Mute { slot: usize },
    Unmute { slot: usize },
    ChangeMap { map: String },
    MapRestart,
    NextMap { map: String },
    Draw,
    AdmitDefeat { team: Team },
    Goalie { slot: usize },
    /// Informational only; passing executes nothing
    Poll,
}

impl VoteAction {
    /// The literal command handed to the host when the vote passes.
    pub fn to_command(&self) -> Option<String> {
        match self {
            VoteAction::Kick {
                ip,
                duration,
                reason,
                team_scoped,
            } => {
                let kind = if *team_scoped { "team vote kick" } else { "vote kick" };
                let mut cmd = format!("!ban {ip} \"{duration}\" {kind}");
                // only global kicks record the reason in the ban entry
                if !*team_scoped {
                    if let Some(reason) = reason {
                        cmd.push_str(&format!("({reason}^7)"));
                    }
                }
                Some(cmd)
            }
            VoteAction::Mute { slot } => Some(format!("!mute {slot}")),
            VoteAction::Unmute { slot } => Some(format!("!unmute {slot}")),
            VoteAction::ChangeMap { map } => Some(format!("map {map}")),
            VoteAction::MapRestart => Some("map_restart".to_string()),
            VoteAction::NextMap { map } => Some(format!("set next_map {map}")),
            VoteAction::Draw => Some("draw".to_string()),
            VoteAction::AdmitDefeat { team } => Some(format!("admitdefeat {}", team.name())),
            VoteAction::Goalie { slot } => Some(format!("!goalie {slot}")),
            VoteAction::Poll => None,
        }
    }

    /// Map-family actions execute one resolution pass after passing so the
    /// round's result log can be finalized first.
    fn deferred(&self) -> bool {
        matches!(
            self,
            VoteAction::ChangeMap { .. } | VoteAction::MapRestart | VoteAction::NextMap { .. }
        )
    }
}

/// One vote slot (the global one, or one of the two team ones).
/// `start_time_ms == 0` means no vote is in progress here.
#[derive(Debug, Clone, Default)]
pub struct VoteSlot {
    pub start_time_ms: i64,
    pub action: Option<VoteAction>,
    pub display: String,
    pub yes: u32,
    pub no: u32,
    pub threshold_percent: u8,
    /// A passed action waiting for its deferred execution time
    pub pending: Option<VoteAction>,
    pub execute_at_ms: i64,
}

impl VoteSlot {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn active(&self) -> bool {
        self.start_time_ms != 0
    }
}

/// The observable yes-test: first byte `y`, or second byte `Y`/`1`.
/// Everything else, including a bare "Y" or "1", counts as no.
pub fn ballot_is_yes(msg: &str) -> bool {
    let b = msg.as_bytes();
    b.first() == Some(&b'y') || matches!(b.get(1), Some(b'Y') | Some(b'1'))
}

/// Split an optional trailing ` -r <reason>` clause off a joined argument
/// string. Returns the head, the reason if one was given, and whether an
/// unknown flag letter was seen.
fn split_reason(joined: &str) -> (&str, Option<String>, bool) {
    let Some(pos) = joined.find(" -") else {
        return (joined, None, false);
    };
    let head = &joined[..pos];
    let rest = &joined[pos + 2..];
    match rest.chars().next() {
        Some('r') | Some('R') => {
            let reason = rest[1..].trim_start().to_string();
            let reason = (!reason.is_empty()).then_some(reason);
            (head, reason, false)
        }
        _ => (head, None, true),
    }
}

fn publish_global(gm: &mut GameModule) {
    let v = &gm.ctx.vote;
    gm.engine.set_config_string(CS_VOTE_TIME, &v.start_time_ms.to_string());
    gm.engine.set_config_string(CS_VOTE_STRING, &v.display);
    gm.engine.set_config_string(CS_VOTE_YES, &v.yes.to_string());
    gm.engine.set_config_string(CS_VOTE_NO, &v.no.to_string());
}

fn publish_team(gm: &mut GameModule, idx: usize) {
    let v = &gm.ctx.team_votes[idx];
    gm.engine
        .set_config_string(team_cs(CS_TEAMVOTE_TIME, idx), &v.start_time_ms.to_string());
    gm.engine
        .set_config_string(team_cs(CS_TEAMVOTE_STRING, idx), &v.display);
    gm.engine
        .set_config_string(team_cs(CS_TEAMVOTE_YES, idx), &v.yes.to_string());
    gm.engine
        .set_config_string(team_cs(CS_TEAMVOTE_NO, idx), &v.no.to_string());
}

/// Execute a passed vote's command that is still waiting when a new call
/// arrives, rather than dropping it.
fn flush_pending_global(gm: &mut GameModule) {
    if let Some(action) = gm.ctx.vote.pending.take() {
        gm.ctx.vote.execute_at_ms = 0;
        if let Some(cmd) = action.to_command() {
            info!(target: "vote", command = %cmd, "executing pending vote before new call");
            gm.engine.queue_command(&cmd);
        }
    }
}

/// Shared admission checks for callvote and callteamvote. Returns false
/// after reporting the first failing check to the caller.
fn admission(gm: &mut GameModule, slot: usize, scope_active: bool) -> bool {
    if !gm.config.allow_vote {
        gm.print(slot, "Voting not allowed here");
        return false;
    }

    if flood::flood_limited(gm, slot) {
        gm.print(
            slot,
            "Your /callvote attempt is flood-limited; wait before chatting again",
        );
        return false;
    }

    if gm.ctx.clients[slot].muted {
        gm.print(slot, "You are muted and cannot call votes");
        return false;
    }

    let exempt = gm.admin.has_capability(slot, Capability::NoVoteLimit);

    if gm.config.vote_limit > 0
        && gm.ctx.clients[slot].vote_count >= gm.config.vote_limit
        && !exempt
    {
        gm.print(
            slot,
            format!(
                "You have already called the maximum number of votes ({})",
                gm.config.vote_limit
            ),
        );
        return false;
    }

    if scope_active {
        gm.print(slot, "A vote is already in progress");
        return false;
    }

    // fresh connections wait out a grace period, waived on near-empty servers
    let cl = &gm.ctx.clients[slot];
    if gm.config.vote_min_wait_s > 0
        && cl.first_connect
        && gm.ctx.time_ms - cl.enter_time_ms < gm.config.vote_min_wait_s * 1000
        && !exempt
        && gm.ctx.num_playing() > 0
        && gm.ctx.num_connected() > 1
    {
        gm.print(
            slot,
            format!(
                "You must wait {} seconds after connecting before calling a vote",
                gm.config.vote_min_wait_s
            ),
        );
        return false;
    }

    true
}

/// Resolve the target token of a target-bearing vote action. Reports the
/// failure to the caller and returns `None` when resolution does not land
/// on exactly one connected client.
fn resolve_target(gm: &mut GameModule, slot: usize, label: &str, token: &str) -> Option<usize> {
    if token.is_empty() {
        gm.print(slot, format!("{label}: no target"));
        return None;
    }

    let matches = resolver::find_clients(gm.ctx, token);
    let target = if matches.len() == 1 {
        Some(matches[0])
    } else {
        resolver::find_exact(gm.ctx, token)
    };

    match target {
        Some(t) => Some(t),
        None => {
            if matches.len() > 1 {
                if let Err(err) = resolver::match_one(gm.ctx, &matches) {
                    gm.print(slot, format!("^3{label}: ^7{err}"));
                }
            } else {
                gm.print(slot, format!("{label}: invalid player"));
            }
            None
        }
    }
}

/// Immunity gate for votes against a player. On rejection the attempt is
/// reported to the caller and audited to admins.
fn immune(gm: &mut GameModule, slot: usize, target: usize, label: &str, verb: &str, token: &str, reason: &Option<String>) -> bool {
    if !gm.admin.has_capability(target, Capability::Immunity) {
        return false;
    }
    gm.print(slot, format!("{label}: admin is immune from vote {verb}"));
    let caller = gm.client_name(slot);
    let target_name = gm.client_name(target);
    let reasonprint = match reason {
        Some(r) => format!("With reason: {r}"),
        None => String::new(),
    };
    gm.admin_audit(&format!(
        "{caller}^7 attempted /{label} {verb} {token} on immune admin {target_name}^7 {reasonprint}^7"
    ));
    true
}

/// True when the map-family time box has closed for this caller.
fn map_window_closed(gm: &GameModule, slot: usize) -> bool {
    gm.config.map_vote_max_time_s > 0
        && gm.ctx.time_ms - gm.ctx.start_time_ms >= gm.config.map_vote_max_time_s * 1000
        && !gm.admin.has_capability(slot, Capability::NoVoteLimit)
        && gm.ctx.num_playing() > 0
        && gm.ctx.num_connected() > 1
}

/// `callvote <action> [args] [-r reason]`: start a global vote.
pub fn cmd_call_vote(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    let scope_active = gm.ctx.vote.active();
    if !admission(gm, slot, scope_active) {
        return;
    }

    let arg1plus = args.say_concat(1);
    // a semicolon anywhere would smuggle a second command into the string
    // the host eventually executes
    if arg1plus.contains(';') {
        gm.print(slot, "Invalid vote string");
        return;
    }

    flush_pending_global(gm);

    let (_, reason, bad_flag) = split_reason(&arg1plus);
    if bad_flag {
        gm.print(slot, "callvote: Warning: invalid argument specified");
    }

    let keyword = args.argv(1).to_ascii_lowercase();
    let arg2 = args.argv(2).to_string();
    let arg2plus = {
        let joined = args.say_concat(2);
        let (head, _, _) = split_reason(&joined);
        head.to_string()
    };

    let exempt = gm.admin.has_capability(slot, Capability::NoVoteLimit);
    let mut threshold: u8 = 50;

    let (action, display_text) = match keyword.as_str() {
        "kick" | "mute" | "unmute" => {
            if gm.config.require_vote_reasons
                && keyword == "kick"
                && reason.is_none()
                && !gm.admin.has_capability(slot, Capability::Unaccountable)
            {
                gm.print(
                    slot,
                    "callvote: You must specify a reason. Use /callvote kick [player] -r [reason]",
                );
                return;
            }

            let Some(target) = resolve_target(gm, slot, "callvote", &arg2plus) else {
                return;
            };
            let name = strutil::decolor(&gm.client_name(target));

            match keyword.as_str() {
                "kick" => {
                    if immune(gm, slot, target, "callvote", "kick", &arg2plus, &reason) {
                        return;
                    }
                    if gm.ctx.clients[target].bot {
                        gm.print(slot, "callvote: you can't kick bots");
                        return;
                    }
                    let action = VoteAction::Kick {
                        ip: gm.ctx.clients[target].ip.clone(),
                        duration: gm.config.temp_ban.clone(),
                        reason: reason.clone(),
                        team_scoped: false,
                    };
                    (action, format!("Kick player '{name}'"))
                }
                "mute" => {
                    if gm.ctx.clients[target].muted {
                        gm.print(slot, "callvote: player is already muted");
                        return;
                    }
                    if immune(gm, slot, target, "callvote", "mute", &arg2plus, &reason) {
                        return;
                    }
                    (VoteAction::Mute { slot: target }, format!("Mute player '{name}'"))
                }
                _ => {
                    if !gm.ctx.clients[target].muted {
                        gm.print(slot, "callvote: player is not currently muted");
                        return;
                    }
                    (
                        VoteAction::Unmute { slot: target },
                        format!("Un-Mute player '{name}'"),
                    )
                }
            }
        }
        "map_restart" => {
            if map_window_closed(gm, slot) {
                gm.print(
                    slot,
                    format!(
                        "You cannot call for a restart after {} seconds",
                        gm.config.map_vote_max_time_s
                    ),
                );
                return;
            }
            threshold = gm.config.map_vote_percent;
            (VoteAction::MapRestart, "Restart current map".to_string())
        }
        "map" => {
            if map_window_closed(gm, slot) {
                gm.print(
                    slot,
                    format!(
                        "You cannot call for a mapchange after {} seconds",
                        gm.config.map_vote_max_time_s
                    ),
                );
                return;
            }
            if !gm.maps.map_exists(&arg2) {
                gm.print(
                    slot,
                    format!("callvote: 'maps/{arg2}.bsp' could not be found on the server"),
                );
                return;
            }
            if !exempt && !gm.config.map_is_votable(&arg2) {
                gm.print(
                    slot,
                    format!("callvote: Only admins may call a vote for map: {arg2}"),
                );
                return;
            }
            threshold = gm.config.map_vote_percent;
            (
                VoteAction::ChangeMap { map: arg2.clone() },
                format!("Change to map '{arg2}'"),
            )
        }
        "nextmap" => {
            if !gm.config.next_map.is_empty() && gm.maps.map_exists(&gm.config.next_map) {
                gm.print(
                    slot,
                    format!(
                        "callvote: the next map is already set to '{}^7'",
                        gm.config.next_map
                    ),
                );
                return;
            }
            if arg2.is_empty() {
                gm.print(slot, "callvote: you must specify a map");
                return;
            }
            if !gm.maps.map_exists(&arg2) {
                gm.print(
                    slot,
                    format!("callvote: 'maps/{arg2}^7.bsp' could not be found on the server"),
                );
                return;
            }
            if !exempt && !gm.config.map_is_votable(&arg2) {
                gm.print(
                    slot,
                    format!("callvote: Only admins may call a vote for map: {arg2}"),
                );
                return;
            }
            threshold = gm.config.map_vote_percent;
            (
                VoteAction::NextMap { map: arg2.clone() },
                format!("Set the next map to '{arg2}^7'"),
            )
        }
        "draw" => {
            threshold = gm.config.map_vote_percent;
            (VoteAction::Draw, "End match in a draw".to_string())
        }
        "poll" => {
            if arg2plus.is_empty() {
                gm.print(
                    slot,
                    "callvote: You forgot to specify what people should vote on.",
                );
                return;
            }
            threshold = gm.config.map_vote_percent;
            (VoteAction::Poll, format!("[Poll] '{arg2plus}'"))
        }
        _ => {
            gm.print(slot, "Invalid vote string");
            gm.print(
                slot,
                "Valid vote commands are: map, map_restart, draw, nextmap, kick, mute, unmute, poll",
            );
            return;
        }
    };

    let mut display_text = display_text;
    if threshold != 50 {
        display_text.push_str(&format!(" (Needs > {threshold} percent)"));
    }
    if let Some(reason) = &reason {
        display_text.push_str(&format!(" Reason: '{reason}^7'"));
    }

    let caller = gm.client_name(slot);
    gm.engine.broadcast(ServerMsg::print(format!(
        "{caller}^7 called a vote: {display_text}^7"
    )));
    info!(target: "vote", caller = %strutil::decolor(&caller), display = %display_text, "vote called");

    display_text.push_str(&format!(" Called by: '{caller}^7'"));

    gm.ctx.clients[slot].vote_count += 1;

    // start the vote; everyone's global ballot flag resets
    for cl in gm.ctx.clients.iter_mut() {
        cl.voted_global = false;
    }

    let poll = action == VoteAction::Poll;
    gm.ctx.vote = VoteSlot {
        start_time_ms: gm.ctx.time_ms,
        action: Some(action),
        display: display_text,
        yes: if poll { 0 } else { 1 },
        no: 0,
        threshold_percent: threshold,
        pending: None,
        execute_at_ms: 0,
    };
    if !poll {
        // the caller automatically votes yes
        gm.ctx.clients[slot].voted_global = true;
    }

    publish_global(gm);
}

/// `vote <y|n>`: cast a ballot in the global vote. When no global vote is
/// active but the caller's team has one, the ballot is redirected there;
/// clients with default bindings only ever send the generic form.
pub fn cmd_vote(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    if !gm.ctx.vote.active() {
        if let Some(idx) = gm.ctx.clients[slot].team.index() {
            if gm.ctx.team_votes[idx].active() && !gm.ctx.clients[slot].voted_team {
                cmd_team_vote(gm, slot, args);
                return;
            }
        }
        gm.print(slot, "No vote in progress");
        return;
    }

    if gm.ctx.clients[slot].voted_global {
        gm.print(slot, "Vote already cast");
        return;
    }

    gm.print(slot, "Vote cast");
    gm.ctx.clients[slot].voted_global = true;

    if ballot_is_yes(args.argv(1)) {
        gm.ctx.vote.yes += 1;
        gm.engine
            .set_config_string(CS_VOTE_YES, &gm.ctx.vote.yes.to_string());
    } else {
        gm.ctx.vote.no += 1;
        gm.engine
            .set_config_string(CS_VOTE_NO, &gm.ctx.vote.no.to_string());
    }
    // majority is determined in run_frame, which also accounts for
    // players entering or leaving
}

/// `callteamvote <action> [args] [-r reason]`: start a vote scoped to the
/// caller's team.
pub fn cmd_call_team_vote(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    let team = gm.ctx.clients[slot].team;
    let Some(idx) = team.index() else {
        gm.print(slot, "callteamvote: join a team first");
        return;
    };

    let scope_active = gm.ctx.team_votes[idx].active();
    if !admission(gm, slot, scope_active) {
        return;
    }

    let arg1plus = args.say_concat(1);
    if arg1plus.contains(';') {
        gm.print(slot, "Invalid team vote string");
        return;
    }

    let (_, reason, bad_flag) = split_reason(&arg1plus);
    if bad_flag {
        gm.print(slot, "callteamvote: Warning: invalid argument specified");
    }

    let keyword = args.argv(1).to_ascii_lowercase();
    let arg2plus = {
        let joined = args.say_concat(2);
        let (head, _, _) = split_reason(&joined);
        head.to_string()
    };

    let (action, display_text) = match keyword.as_str() {
        "kick" | "goalie" => {
            if gm.config.require_vote_reasons
                && keyword == "kick"
                && reason.is_none()
                && !gm.admin.has_capability(slot, Capability::Unaccountable)
            {
                gm.print(
                    slot,
                    "callteamvote: You must specify a reason. Use /callteamvote kick [player] -r [reason]",
                );
                return;
            }

            let Some(target) = resolve_target(gm, slot, "callteamvote", &arg2plus) else {
                return;
            };
            if gm.ctx.clients[target].team != team {
                gm.print(slot, "callteamvote: invalid player");
                return;
            }
            let name = strutil::decolor(&gm.client_name(target));

            if keyword == "kick" {
                if immune(gm, slot, target, "callteamvote", "kick", &arg2plus, &reason) {
                    return;
                }
                if gm.ctx.clients[target].bot {
                    gm.print(slot, "callvote: you can't kick bots");
                    return;
                }
                let action = VoteAction::Kick {
                    ip: gm.ctx.clients[target].ip.clone(),
                    duration: gm.config.temp_ban.clone(),
                    reason: reason.clone(),
                    team_scoped: true,
                };
                (action, format!("Kick player '{name}'"))
            } else {
                if gm.ctx.clients[target].goalie {
                    gm.print(
                        slot,
                        format!("callteamvote: Player {name} is goalie already."),
                    );
                    return;
                }
                let cl = &gm.ctx.clients[target];
                if cl.team == Team::None
                    || matches!(cl.class, PlayerClass::None | PlayerClass::Rookie)
                {
                    gm.print(
                        slot,
                        "callteamvote: Goalie can be only player from red or blue team.",
                    );
                    return;
                }
                (
                    VoteAction::Goalie { slot: target },
                    format!("Make '{name}' the goalie"),
                )
            }
        }
        "admitdefeat" => {
            if gm.ctx.team_count(team) <= 1 {
                gm.print(
                    slot,
                    "callteamvote: You cannot admitdefeat by yourself. Use /callvote draw.",
                );
                return;
            }
            (VoteAction::AdmitDefeat { team }, "Admit Defeat".to_string())
        }
        "poll" => {
            if arg2plus.is_empty() {
                gm.print(
                    slot,
                    "callteamvote: You forgot to specify what people should vote on.",
                );
                return;
            }
            (VoteAction::Poll, format!("[Poll] '{arg2plus}'"))
        }
        _ => {
            gm.print(slot, "Invalid team vote string");
            gm.print(
                slot,
                "Valid team vote commands are: kick, goalie, poll, and admitdefeat",
            );
            return;
        }
    };

    gm.ctx.clients[slot].vote_count += 1;

    let mut display_text = display_text;
    if let Some(reason) = &reason {
        display_text.push_str(&format!(" Reason: '{reason}'^7"));
    }

    // teammates hear about the vote; admins off the team get an audit line
    // for kick votes, or for any action when the admin is spectating
    let caller = gm.client_name(slot);
    for i in 0..gm.ctx.clients.len() {
        let Some(cl) = gm.ctx.client(i) else {
            continue;
        };
        if cl.team == team {
            gm.print(i, format!("{caller}^7 called a team vote: {display_text}^7"));
        } else if gm.admin.has_capability(i, Capability::AdminChat)
            && (keyword == "kick" || cl.team == Team::None)
        {
            gm.print(
                i,
                format!("^6[Admins]^7 {caller}^7 called a team vote: {display_text}^7"),
            );
        }
    }
    info!(
        target: "vote",
        team = team.name(),
        caller = %strutil::decolor(&caller),
        display = %display_text,
        "team vote called"
    );

    display_text.push_str(&format!(" Called by: '{caller}^7'"));

    for i in 0..gm.ctx.clients.len() {
        if gm.ctx.clients[i].team == team {
            gm.ctx.clients[i].voted_team = false;
        }
    }

    let poll = action == VoteAction::Poll;
    gm.ctx.team_votes[idx] = VoteSlot {
        start_time_ms: gm.ctx.time_ms,
        action: Some(action),
        display: display_text,
        yes: if poll { 0 } else { 1 },
        no: 0,
        threshold_percent: 50,
        pending: None,
        execute_at_ms: 0,
    };
    if !poll {
        gm.ctx.clients[slot].voted_team = true;
    }

    publish_team(gm, idx);
}

/// `teamvote <y|n>`: cast a ballot in the caller's team vote.
pub fn cmd_team_vote(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    let Some(idx) = gm.ctx.clients[slot].team.index() else {
        gm.print(slot, "No team vote in progress");
        return;
    };

    if !gm.ctx.team_votes[idx].active() {
        gm.print(slot, "No team vote in progress");
        return;
    }

    if gm.ctx.clients[slot].voted_team {
        gm.print(slot, "Team vote already cast");
        return;
    }

    gm.print(slot, "Team vote cast");
    gm.ctx.clients[slot].voted_team = true;

    if ballot_is_yes(args.argv(1)) {
        gm.ctx.team_votes[idx].yes += 1;
        gm.engine.set_config_string(
            team_cs(CS_TEAMVOTE_YES, idx),
            &gm.ctx.team_votes[idx].yes.to_string(),
        );
    } else {
        gm.ctx.team_votes[idx].no += 1;
        gm.engine.set_config_string(
            team_cs(CS_TEAMVOTE_NO, idx),
            &gm.ctx.team_votes[idx].no.to_string(),
        );
    }
}

enum Outcome {
    Passed,
    Failed,
    Expired,
}

/// Test an active slot's tallies against the electorate. Pass needs
/// strictly more than `threshold` percent of eligible voters to have said
/// yes; fail needs the complementary share to have said no.
fn resolve(slot: &VoteSlot, eligible: usize, now_ms: i64, duration_ms: i64) -> Option<Outcome> {
    let eligible = eligible as u64;
    // percentages above 100 would make the no-side share underflow
    let threshold = u64::from(slot.threshold_percent).min(100);
    if u64::from(slot.yes) * 100 > threshold * eligible {
        Some(Outcome::Passed)
    } else if u64::from(slot.no) * 100 >= (100 - threshold) * eligible {
        Some(Outcome::Failed)
    } else if now_ms - slot.start_time_ms >= duration_ms {
        Some(Outcome::Expired)
    } else {
        None
    }
}

/// Per-frame vote poller, invoked by the host once per simulation tick.
/// Resolves active votes and executes pending passed actions whose delay
/// has elapsed.
pub fn run_frame(gm: &mut GameModule) {
    run_pending(gm);
    run_global(gm);
    for idx in 0..gm.ctx.team_votes.len() {
        run_team(gm, idx);
    }
}

fn run_pending(gm: &mut GameModule) {
    let now = gm.ctx.time_ms;
    if gm.ctx.vote.execute_at_ms != 0 && now >= gm.ctx.vote.execute_at_ms {
        gm.ctx.vote.execute_at_ms = 0;
        if let Some(cmd) = gm.ctx.vote.pending.take().and_then(|a| a.to_command()) {
            info!(target: "vote", command = %cmd, "executing passed vote");
            gm.engine.queue_command(&cmd);
        }
    }
    for idx in 0..gm.ctx.team_votes.len() {
        let v = &mut gm.ctx.team_votes[idx];
        if v.execute_at_ms != 0 && now >= v.execute_at_ms {
            v.execute_at_ms = 0;
            if let Some(cmd) = v.pending.take().and_then(|a| a.to_command()) {
                info!(target: "vote", team = idx, command = %cmd, "executing passed team vote");
                gm.engine.queue_command(&cmd);
            }
        }
    }
}

fn run_global(gm: &mut GameModule) {
    if !gm.ctx.vote.active() {
        return;
    }

    let eligible = gm.ctx.num_connected();
    let Some(outcome) = resolve(
        &gm.ctx.vote,
        eligible,
        gm.ctx.time_ms,
        gm.config.vote_duration_ms,
    ) else {
        return;
    };

    match outcome {
        Outcome::Passed => {
            gm.engine.broadcast(ServerMsg::print("Vote passed"));
            info!(target: "vote", yes = gm.ctx.vote.yes, no = gm.ctx.vote.no, "vote passed");
            schedule_or_execute(gm, None);
        }
        Outcome::Failed | Outcome::Expired => {
            gm.engine.broadcast(ServerMsg::print("Vote failed"));
            info!(target: "vote", yes = gm.ctx.vote.yes, no = gm.ctx.vote.no, "vote failed");
            gm.ctx.vote.action = None;
        }
    }

    gm.ctx.vote.start_time_ms = 0;
    publish_global(gm);
}

fn run_team(gm: &mut GameModule, idx: usize) {
    if !gm.ctx.team_votes[idx].active() {
        return;
    }

    let team = if idx == 0 { Team::Red } else { Team::Blue };
    let eligible = gm.ctx.team_count(team);
    let Some(outcome) = resolve(
        &gm.ctx.team_votes[idx],
        eligible,
        gm.ctx.time_ms,
        gm.config.vote_duration_ms,
    ) else {
        return;
    };

    match outcome {
        Outcome::Passed => {
            gm.engine.broadcast(ServerMsg::print("Team vote passed"));
            info!(
                target: "vote",
                team = team.name(),
                yes = gm.ctx.team_votes[idx].yes,
                no = gm.ctx.team_votes[idx].no,
                "team vote passed"
            );
            schedule_or_execute(gm, Some(idx));
        }
        Outcome::Failed | Outcome::Expired => {
            gm.engine.broadcast(ServerMsg::print("Team vote failed"));
            info!(
                target: "vote",
                team = team.name(),
                yes = gm.ctx.team_votes[idx].yes,
                no = gm.ctx.team_votes[idx].no,
                "team vote failed"
            );
            gm.ctx.team_votes[idx].action = None;
        }
    }

    gm.ctx.team_votes[idx].start_time_ms = 0;
    publish_team(gm, idx);
}

/// A passed action either executes now or, for map-family actions, is
/// parked until the configured delay elapses.
fn schedule_or_execute(gm: &mut GameModule, team_idx: Option<usize>) {
    let now = gm.ctx.time_ms;
    let delay = gm.config.vote_execute_delay_ms;
    let slot = match team_idx {
        Some(idx) => &mut gm.ctx.team_votes[idx],
        None => &mut gm.ctx.vote,
    };
    let Some(action) = slot.action.take() else {
        return;
    };

    if action.deferred() {
        slot.pending = Some(action);
        slot.execute_at_ms = now + delay;
        return;
    }

    match action.to_command() {
        Some(cmd) => {
            info!(target: "vote", command = %cmd, "executing passed vote");
            gm.engine.queue_command(&cmd);
        }
        None => {
            // polls resolve with no side effect
        }
    }
}
