//! Recording collaborator doubles used by the test suites: everything the
//! module asks the host to do is captured for later assertions.

use std::collections::BTreeMap;

use super::args::CommandArgs;
use super::protocol::ServerMsg;
use super::{AdminControl, Capability, Engine, MapRegistry};

/// Engine double that records every delivery.
#[derive(Default)]
pub struct RecordingEngine {
    pub sent: Vec<(usize, ServerMsg)>,
    pub broadcasts: Vec<ServerMsg>,
    pub config_strings: BTreeMap<u16, String>,
    pub queued: Vec<String>,
    pub killed: Vec<usize>,
    pub noclip: Vec<usize>,
    /// Returned verbatim from `clients_in_box`.
    pub nearby: Vec<usize>,
    /// Returned from `client_location` for every slot.
    pub location: Option<String>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `Print` texts delivered to a slot.
    pub fn prints_to(&self, slot: usize) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(s, _)| *s == slot)
            .filter_map(|(_, m)| match m {
                ServerMsg::Print { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn last_print_to(&self, slot: usize) -> Option<&str> {
        self.prints_to(slot).last().copied()
    }

    /// All chat messages delivered to a slot.
    pub fn chats_to(&self, slot: usize) -> Vec<&ServerMsg> {
        self.sent
            .iter()
            .filter(|(s, m)| *s == slot && matches!(m, ServerMsg::Chat { .. }))
            .map(|(_, m)| m)
            .collect()
    }

    pub fn config_string(&self, index: u16) -> Option<&str> {
        self.config_strings.get(&index).map(String::as_str)
    }
}

impl Engine for RecordingEngine {
    fn send(&mut self, slot: usize, msg: ServerMsg) {
        self.sent.push((slot, msg));
    }

    fn broadcast(&mut self, msg: ServerMsg) {
        self.broadcasts.push(msg);
    }

    fn set_config_string(&mut self, index: u16, value: &str) {
        self.config_strings.insert(index, value.to_string());
    }

    fn queue_command(&mut self, command: &str) {
        self.queued.push(command.to_string());
    }

    fn client_origin(&self, _slot: usize) -> [f32; 3] {
        [0.0; 3]
    }

    fn client_location(&self, _slot: usize) -> Option<String> {
        self.location.clone()
    }

    fn clients_in_box(&self, _mins: [f32; 3], _maxs: [f32; 3]) -> Vec<usize> {
        self.nearby.clone()
    }

    fn kill_client(&mut self, slot: usize) {
        self.killed.push(slot);
    }

    fn toggle_noclip(&mut self, slot: usize) -> bool {
        if let Some(pos) = self.noclip.iter().position(|&s| s == slot) {
            self.noclip.swap_remove(pos);
            false
        } else {
            self.noclip.push(slot);
            true
        }
    }
}

/// Admin double with a fixed capability table.
#[derive(Default)]
pub struct FixedAdmin {
    pub caps: Vec<(usize, Capability)>,
    pub levels: BTreeMap<usize, i32>,
    /// Commands offered to the interpreter, joined for inspection.
    pub offered: Vec<String>,
    /// When true, the interpreter claims every offered command.
    pub consume_all: bool,
}

impl FixedAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, slot: usize, cap: Capability) -> Self {
        self.caps.push((slot, cap));
        self
    }
}

impl AdminControl for FixedAdmin {
    fn has_capability(&self, slot: usize, cap: Capability) -> bool {
        self.caps.contains(&(slot, cap))
    }

    fn admin_level(&self, slot: usize) -> i32 {
        self.levels.get(&slot).copied().unwrap_or(0)
    }

    fn intercept_command(&mut self, _slot: usize, args: &CommandArgs) -> bool {
        self.offered.push(args.concat(0));
        self.consume_all
    }
}

/// Map registry double backed by a fixed list.
pub struct FixedMaps(pub Vec<String>);

impl FixedMaps {
    pub fn of(names: &[&str]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

impl MapRegistry for FixedMaps {
    fn map_exists(&self, name: &str) -> bool {
        self.0.iter().any(|m| m.eq_ignore_ascii_case(name))
    }
}
