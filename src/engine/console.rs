//! In-process engine stub for the console harness: messages become JSON
//! lines on stdout, queued commands and config strings are logged.

use tracing::info;

use super::args::CommandArgs;
use super::protocol::ServerMsg;
use super::{AdminControl, Capability, Engine, MapRegistry};

/// Engine stand-in with no world: every client sits at the origin.
#[derive(Default)]
pub struct ConsoleEngine {
    noclip: Vec<usize>,
}

impl ConsoleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&self, target: &str, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(json) => println!("[{target}] {json}"),
            Err(err) => info!(%err, "failed to encode server message"),
        }
    }
}

impl Engine for ConsoleEngine {
    fn send(&mut self, slot: usize, msg: ServerMsg) {
        self.emit(&format!("#{slot}"), &msg);
    }

    fn broadcast(&mut self, msg: ServerMsg) {
        self.emit("all", &msg);
    }

    fn set_config_string(&mut self, index: u16, value: &str) {
        info!(index, value, "config string");
    }

    fn queue_command(&mut self, command: &str) {
        info!(command, "queued host command");
    }

    fn client_origin(&self, _slot: usize) -> [f32; 3] {
        [0.0; 3]
    }

    fn client_location(&self, _slot: usize) -> Option<String> {
        None
    }

    fn clients_in_box(&self, _mins: [f32; 3], _maxs: [f32; 3]) -> Vec<usize> {
        // no world in the harness; the chat router filters by connection
        (0..crate::state::MAX_CLIENTS).collect()
    }

    fn kill_client(&mut self, slot: usize) {
        info!(slot, "client suicide");
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

/// Harness admin database: nobody holds any capability and there is no
/// admin interpreter behind the dispatcher.
pub struct ConsoleAdmin;

impl AdminControl for ConsoleAdmin {
    fn has_capability(&self, _slot: usize, _cap: Capability) -> bool {
        false
    }

    fn admin_level(&self, _slot: usize) -> i32 {
        0
    }

    fn intercept_command(&mut self, _slot: usize, _args: &CommandArgs) -> bool {
        false
    }
}

/// Map registry that admits every name; the harness has no map files.
pub struct AllMaps;

impl MapRegistry for AllMaps {
    fn map_exists(&self, _name: &str) -> bool {
        true
    }
}
