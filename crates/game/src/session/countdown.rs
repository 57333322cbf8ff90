use crate::authority::EntityId;

/// Remaining time at or below this counts as expired.
const EXPIRY_EPSILON: f32 = 1e-3;

/// Decrements a countdown value and fires exactly once when it runs out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    timer: EntityId,
    fired: bool,
}

impl Countdown {
    pub fn new(timer: EntityId) -> Self {
        Self {
            timer,
            fired: false,
        }
    }

    pub fn timer(&self) -> EntityId {
        self.timer
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Returns the new remaining time and whether this step expired it.
    pub fn step(&mut self, remaining: f32, dt: f32) -> (f32, bool) {
        if self.fired || remaining <= 0.0 {
            return (remaining.max(0.0), false);
        }

        let next = remaining - dt;
        if next <= EXPIRY_EPSILON {
            self.fired = true;
            return (0.0, true);
        }
        (next, false)
    }
}
