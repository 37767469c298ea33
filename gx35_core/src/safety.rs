//! Safety supervisor (spec.md 4.8): killswitch gating and rev-limit hysteresis. This is the
//! host-testable logic the firmware binary's killswitch-edge ISR and main loop call into;
//! the ISR itself only latches the pin level and calls `Supervisor::on_killswitch_edge`.

use crate::constants::{LOWER_REV_LIMIT_RPM, UPPER_REV_LIMIT_RPM};

/// Supervisor state (spec.md 3, "Supervisor state"). `killswitch_closed` is latched by the
/// killswitch edge ISR (the sole writer); `rev_limit` is updated by the main loop on each
/// CALIBRATION decision (the sole writer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Supervisor {
    pub killswitch_closed: bool,
    pub rev_limit: bool,
}

impl Supervisor {
    /// Called from the killswitch edge ISR with the latched pin level. Never arms or cancels
    /// timers itself (spec.md 4.8: pending timers are allowed to finish their current pulse) —
    /// it only updates the latch the main loop reads on its next CALIBRATION decision.
    pub fn on_killswitch_edge(&mut self, closed: bool) {
        self.killswitch_closed = closed;
    }

    /// Updates rev-limit hysteresis for the current RPM reading and returns whether fueling and
    /// spark should be armed this cycle (spec.md 4.8): sets `rev_limit` once `rpm >=
    /// UPPER_REV_LIMIT_RPM`, clears it only once `rpm < LOWER_REV_LIMIT_RPM`.
    pub fn update_rev_limit(&mut self, rpm: f32) {
        if rpm >= UPPER_REV_LIMIT_RPM {
            self.rev_limit = true;
        } else if rpm < LOWER_REV_LIMIT_RPM {
            self.rev_limit = false;
        }
    }

    /// Whether fuel/spark events may be armed this cycle: killswitch closed and not limiting.
    pub fn events_allowed(&self) -> bool {
        self.killswitch_closed && !self.rev_limit
    }
}
