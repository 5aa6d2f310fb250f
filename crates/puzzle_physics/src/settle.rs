//! Drop-phase completion policy.
//!
//! A single still sample is not trusted: a piece can be momentarily motionless
//! at the top of a bounce. The detector waits `settle_min_time`, samples every
//! `settle_check_interval`, and needs `settle_consecutive_checks` positive
//! samples in a row. `max_sim_time` ends the phase regardless, so a drop
//! always terminates.

use crate::settings::PhysicsSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Keep simulating.
    Pending,
    /// Enough consecutive still samples.
    Settled,
    /// The time limit fired before the pile confirmed.
    TimedOut,
}

impl SettleOutcome {
    pub fn is_done(self) -> bool {
        self != SettleOutcome::Pending
    }
}

#[derive(Debug, Clone)]
pub struct SettleDetector {
    min_time: f32,
    check_interval: f32,
    required: u32,
    max_time: f32,
    elapsed: f32,
    next_check_at: f32,
    consecutive: u32,
}

impl SettleDetector {
    pub fn new(settings: &PhysicsSettings) -> Self {
        Self {
            min_time: settings.settle_min_time,
            check_interval: settings.settle_check_interval,
            required: settings.settle_consecutive_checks.max(1),
            max_time: settings.max_sim_time,
            elapsed: 0.0,
            next_check_at: settings.settle_min_time,
            consecutive: 0,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.next_check_at = self.min_time;
        self.consecutive = 0;
    }

    /// Simulated time since the last reset.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Current run of positive samples.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn check_interval(&self) -> f32 {
        self.check_interval
    }

    /// Advance by `dt` simulated seconds.
    ///
    /// `is_settled` is only evaluated when a sample is due.
    pub fn update(&mut self, dt: f32, is_settled: impl FnOnce() -> bool) -> SettleOutcome {
        self.elapsed += dt.max(0.0);

        if self.elapsed >= self.min_time && self.elapsed >= self.next_check_at {
            self.next_check_at = self.elapsed + self.check_interval;
            if is_settled() {
                self.consecutive += 1;
            } else {
                self.consecutive = 0;
            }
            if self.consecutive >= self.required {
                return SettleOutcome::Settled;
            }
        }

        if self.elapsed >= self.max_time {
            return SettleOutcome::TimedOut;
        }
        SettleOutcome::Pending
    }
}
