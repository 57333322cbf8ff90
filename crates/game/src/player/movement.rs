use serde::{Deserialize, Serialize};

/// Which movement capability a participant is spawned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementKind {
    Basic,
    #[default]
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicMovement {
    base_speed: f32,
    speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendedMovement {
    base_speed: f32,
    speed: f32,
    grounded: bool,
    blocked: bool,
    can_rotate: bool,
}

/// Movement capability of a participant. Exactly one variant is active per
/// entity, chosen at spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Movement {
    Basic(BasicMovement),
    Extended(ExtendedMovement),
}

impl Movement {
    pub fn new(kind: MovementKind, speed: f32) -> Self {
        match kind {
            MovementKind::Basic => Self::Basic(BasicMovement {
                base_speed: speed,
                speed,
            }),
            MovementKind::Extended => Self::Extended(ExtendedMovement {
                base_speed: speed,
                speed,
                grounded: true,
                blocked: false,
                can_rotate: true,
            }),
        }
    }

    pub fn kind(&self) -> MovementKind {
        match self {
            Self::Basic(_) => MovementKind::Basic,
            Self::Extended(_) => MovementKind::Extended,
        }
    }

    pub fn speed(&self) -> f32 {
        match self {
            Self::Basic(m) => m.speed,
            Self::Extended(m) if m.blocked => 0.0,
            Self::Extended(m) => m.speed,
        }
    }

    // basic movement has no ground sensing
    pub fn is_grounded(&self) -> bool {
        match self {
            Self::Basic(_) => true,
            Self::Extended(m) => m.grounded,
        }
    }

    pub fn set_grounded(&mut self, grounded: bool) {
        if let Self::Extended(m) = self {
            m.grounded = grounded;
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Extended(m) if m.blocked)
    }

    pub fn set_blocked(&mut self, blocked: bool) {
        if let Self::Extended(m) = self {
            m.blocked = blocked;
        }
    }

    pub fn can_rotate(&self) -> bool {
        match self {
            Self::Basic(_) => true,
            Self::Extended(m) => m.can_rotate,
        }
    }

    pub fn begin_carry(&mut self, speed_multiplier: f32) {
        match self {
            Self::Basic(m) => m.speed = m.base_speed * speed_multiplier,
            Self::Extended(m) => {
                m.speed = m.base_speed * speed_multiplier;
                m.can_rotate = false;
            }
        }
    }

    pub fn end_carry(&mut self) {
        match self {
            Self::Basic(m) => m.speed = m.base_speed,
            Self::Extended(m) => {
                m.speed = m.base_speed;
                m.can_rotate = true;
            }
        }
    }
}
