use glam::{Quat, Vec3};

use crate::authority::EntityId;
use crate::physics::BodyFlags;
use crate::transform::Transform;

/// Temporary exclusive control of `target` by `claimant`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnershipClaim {
    pub claimant: EntityId,
    pub target: EntityId,
    pub local_offset: Vec3,
    pub local_rotation_offset: Quat,
    /// Tick the claim was granted on.
    pub since: u32,
    /// Body mode to restore on release.
    pub restore_flags: BodyFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryState {
    Free,
    Claimed(EntityId),
}

impl CarryState {
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }

    pub fn claimant(&self) -> Option<EntityId> {
        match self {
            Self::Free => None,
            Self::Claimed(claimant) => Some(*claimant),
        }
    }
}

/// Outcome of a successful carry command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Claimed {
        target: EntityId,
        carrier: EntityId,
    },
    Moved {
        target: EntityId,
        position: Vec3,
    },
    /// The target passed through release and is free again at `pose`.
    Released {
        target: EntityId,
        carrier: EntityId,
        pose: Transform,
    },
}
