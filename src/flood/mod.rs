//! Flood controller: a per-client demerit accumulator that penalizes
//! commands arriving faster than the configured minimum interval and
//! decays with good behavior.

use crate::engine::Capability;
use crate::GameModule;

/// Fold one command arrival into the demerit count. Early arrivals add
/// the missing time, late arrivals subtract the surplus; never below 0.
pub fn accumulate(demerits: i64, elapsed_ms: i64, min_interval_ms: i64) -> i64 {
    if elapsed_ms < min_interval_ms {
        demerits + (min_interval_ms - elapsed_ms)
    } else {
        (demerits - (elapsed_ms - min_interval_ms)).max(0)
    }
}

/// Demerit ceiling: the configured maximum, or a quadratic default derived
/// from the minimum interval.
pub fn limit(max_demerits: i64, min_interval_ms: i64) -> i64 {
    if max_demerits != 0 {
        max_demerits
    } else {
        min_interval_ms * min_interval_ms / 1000
    }
}

/// Update the client's flood state for one command and report whether the
/// command should be refused. Disabled while the match is paused, while
/// flood checking is off, and for flood-exempt clients.
pub fn flood_limited(gm: &mut GameModule, slot: usize) -> bool {
    let min_interval = gm.config.flood_min_ms;
    if min_interval == 0 || gm.ctx.paused {
        return false;
    }
    if gm.admin.has_capability(slot, Capability::NoCensorFlood) {
        return false;
    }

    let now = gm.ctx.time_ms;
    let cl = &mut gm.ctx.clients[slot];
    let elapsed = now - cl.last_flood_ms;
    cl.flood_demerits = accumulate(cl.flood_demerits, elapsed, min_interval);
    cl.last_flood_ms = now;

    cl.flood_demerits > limit(gm.config.flood_max_demerits, min_interval)
}
