//! Match state: the per-round context threaded through every command, the
//! per-slot client records it owns, and the reconnection-resume records.

use crate::strutil::{self, MAX_NAME_LENGTH};
use crate::vote::VoteSlot;

/// Fixed client table size. [`ClientSet`] packs one bit per slot.
pub const MAX_CLIENTS: usize = 64;

/// Team assignment. `None` is the spectator pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Team {
    #[default]
    None,
    Red,
    Blue,
}

impl Team {
    /// Slot used to index the per-team vote array and config strings.
    pub fn index(self) -> Option<usize> {
        match self {
            Team::None => None,
            Team::Red => Some(0),
            Team::Blue => Some(1),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Team::None => "spectators",
            Team::Red => "red",
            Team::Blue => "blue",
        }
    }

    /// Chat scope prefix shown when team prefixes are enabled.
    pub fn chat_prefix(self) -> &'static str {
        match self {
            Team::None => "[S] ",
            Team::Red => "[R] ",
            Team::Blue => "[B] ",
        }
    }
}

/// Connection lifecycle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Combat class tiers. `Rookie` is the unupgraded starting class; a goalie
/// vote may not target it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerClass {
    #[default]
    None,
    Rookie,
    Striker,
    Keeper,
}

/// One bit per client slot; backs ignore lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientSet(u64);

impl ClientSet {
    pub fn contains(&self, slot: usize) -> bool {
        slot < MAX_CLIENTS && self.0 & (1 << slot) != 0
    }

    pub fn insert(&mut self, slot: usize) {
        if slot < MAX_CLIENTS {
            self.0 |= 1 << slot;
        }
    }

    pub fn remove(&mut self, slot: usize) {
        if slot < MAX_CLIENTS {
            self.0 &= !(1 << slot);
        }
    }
}

/// Per-slot client record. Owned by the match context; the engine owns the
/// underlying connection.
#[derive(Debug, Clone, Default)]
pub struct ClientRecord {
    /// Raw display name as supplied by the client (attacker-controlled)
    pub name: String,
    /// Sanitized-name cache kept in sync with `name`
    pub name_clean: String,

    pub conn: ConnState,
    pub team: Team,
    pub class: PlayerClass,
    pub alive: bool,
    pub bot: bool,
    pub goalie: bool,
    /// Remote address, captured for kick votes that outlive the connection
    pub ip: String,

    pub muted: bool,
    pub ignore: ClientSet,

    // voting
    pub voted_global: bool,
    pub voted_team: bool,
    pub vote_count: u32,

    // flood control
    pub last_flood_ms: i64,
    pub flood_demerits: i64,

    // session
    pub enter_time_ms: i64,
    pub first_connect: bool,
    pub joined_team: bool,
    pub score: i32,
    pub credits: i32,
    /// Claimed resume code, if any
    pub resume_code: Option<u32>,
}

impl ClientRecord {
    pub fn connected(&self) -> bool {
        self.conn == ConnState::Connected
    }

    /// Update the display name and its sanitized cache.
    pub fn set_name(&mut self, raw: &str) {
        self.name = raw.to_string();
        self.name_clean = strutil::sanitize(raw, MAX_NAME_LENGTH);
    }
}

/// Reconnection-resume token: a short code plus the state snapshotted when
/// its owner disconnected.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub code: u32,
    /// Owning slot; `None` once the owner disconnected and the record is
    /// waiting to be claimed
    pub slot: Option<usize>,
    pub team: Team,
    pub credits: i32,
    pub score: i32,
    pub enter_time_ms: i64,
}

/// Process-wide match state, reset at round start. Passed explicitly into
/// every module call; nothing here is a global.
pub struct MatchContext {
    /// Match clock in milliseconds, advanced by the host each frame
    pub time_ms: i64,
    /// Clock value at round start
    pub start_time_ms: i64,
    pub paused: bool,
    pub intermission: bool,
    pub cheats: bool,

    pub clients: Vec<ClientRecord>,
    pub vote: VoteSlot,
    pub team_votes: [VoteSlot; 2],
    pub connections: Vec<ConnectionRecord>,
}

impl MatchContext {
    pub fn new() -> Self {
        Self {
            time_ms: 0,
            start_time_ms: 0,
            paused: false,
            intermission: false,
            cheats: false,
            clients: vec![ClientRecord::default(); MAX_CLIENTS],
            vote: VoteSlot::idle(),
            team_votes: [VoteSlot::idle(), VoteSlot::idle()],
            connections: Vec::new(),
        }
    }

    /// Mark a slot connected with a fresh record. A slot that was used
    /// before this round keeps nothing.
    pub fn connect_client(&mut self, slot: usize, name: &str, ip: &str) {
        let mut record = ClientRecord {
            conn: ConnState::Connected,
            ip: ip.to_string(),
            enter_time_ms: self.time_ms,
            first_connect: true,
            ..ClientRecord::default()
        };
        record.set_name(name);
        self.clients[slot] = record;
    }

    /// Drop a slot, snapshotting session state into its resume record so a
    /// reconnect can restore it.
    pub fn disconnect_client(&mut self, slot: usize) {
        let (team, credits, score, enter, code) = {
            let cl = &self.clients[slot];
            (cl.team, cl.credits, cl.score, cl.enter_time_ms, cl.resume_code)
        };
        if let Some(code) = code {
            if let Some(rec) = self.connections.iter_mut().find(|r| r.code == code) {
                rec.slot = None;
                rec.team = team;
                rec.credits = credits;
                rec.score = score;
                rec.enter_time_ms = enter;
            }
        }
        self.clients[slot] = ClientRecord::default();
    }

    pub fn client(&self, slot: usize) -> Option<&ClientRecord> {
        self.clients.get(slot).filter(|c| c.connected())
    }

    pub fn connected_slots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.clients.len()).filter(|&i| self.clients[i].connected())
    }

    pub fn num_connected(&self) -> usize {
        self.connected_slots().count()
    }

    /// Clients on a team (not spectating).
    pub fn num_playing(&self) -> usize {
        self.connected_slots()
            .filter(|&i| self.clients[i].team != Team::None)
            .count()
    }

    pub fn team_count(&self, team: Team) -> usize {
        self.connected_slots()
            .filter(|&i| self.clients[i].team == team)
            .count()
    }

    pub fn on_same_team(&self, a: usize, b: usize) -> bool {
        match (self.client(a), self.client(b)) {
            (Some(ca), Some(cb)) => ca.team != Team::None && ca.team == cb.team,
            _ => false,
        }
    }
}

impl Default for MatchContext {
    fn default() -> Self {
        Self::new()
    }
}
