//! Debounced resize reset
//!
//! A burst of size changes collapses into one corner reset once the burst
//! has been quiet for the configured delay. The timer is a plain deadline so
//! the owner decides how to wait for it.

use std::time::{Duration, Instant};

use crate::surface::SurfaceRect;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingReset {
    size: (f64, f64),
    deadline: Instant,
}

/// Cancellable delayed reset, rescheduled by every resize
#[derive(Debug, Clone)]
pub struct ResizeDebounce {
    delay: Duration,
    pending: Option<PendingReset>,
}

impl ResizeDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace any pending reset with one for `rect`'s size
    pub fn schedule(&mut self, rect: &SurfaceRect, now: Instant) -> Instant {
        let deadline = now + self.delay;
        self.pending = Some(PendingReset {
            size: (rect.width, rect.height),
            deadline,
        });
        deadline
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Take the pending size if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<(f64, f64)> {
        match self.pending {
            Some(p) if now >= p.deadline => {
                self.pending = None;
                Some(p.size)
            }
            _ => None,
        }
    }
}
