use serde::{Deserialize, Serialize};

use crate::event::GameEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionOutcome {
    #[default]
    Active,
    Victory,
    Defeat,
}

/// Paint counter plus a one-shot outcome latch. The first outcome to
/// latch wins.
#[derive(Debug)]
pub struct Session {
    outcome: SessionOutcome,
    paint_count: u32,
    required_count: u32,
}

impl Session {
    pub fn new(required_count: u32) -> Self {
        Self {
            outcome: SessionOutcome::Active,
            paint_count: 0,
            required_count,
        }
    }

    pub fn outcome(&self) -> SessionOutcome {
        self.outcome
    }

    pub fn is_active(&self) -> bool {
        self.outcome == SessionOutcome::Active
    }

    pub fn paint_count(&self) -> u32 {
        self.paint_count
    }

    pub fn required_count(&self) -> u32 {
        self.required_count
    }

    /// Counts one applied paint. Returns the victory event the first time
    /// the counter reaches the requirement.
    pub fn record_paint(&mut self) -> Option<GameEvent> {
        self.paint_count += 1;
        if self.paint_count >= self.required_count && self.latch(SessionOutcome::Victory) {
            return Some(GameEvent::Victory {
                count: self.paint_count,
            });
        }
        None
    }

    pub fn expire(&mut self) -> Option<GameEvent> {
        self.latch(SessionOutcome::Defeat).then_some(GameEvent::Defeat)
    }

    fn latch(&mut self, outcome: SessionOutcome) -> bool {
        if !self.is_active() {
            log::debug!("session already {:?}, ignoring {:?}", self.outcome, outcome);
            return false;
        }
        self.outcome = outcome;
        log::info!("session outcome: {:?}", outcome);
        true
    }
}
