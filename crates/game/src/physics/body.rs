use bitflags::bitflags;
use glam::Vec3;

use crate::authority::EntityId;
use crate::transform::Transform;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BodyFlags: u8 {
        /// Simulated by the physics step rather than driven by its transform.
        const DYNAMIC = 1 << 0;
        /// Takes part in collision response.
        const COLLISION = 1 << 1;
    }
}

impl BodyFlags {
    pub const FREE: Self = Self::DYNAMIC.union(Self::COLLISION);
}

/// Physics collaborator seen from the authority core.
pub trait BodyPhysics {
    fn body_flags(&self, entity: EntityId) -> Option<BodyFlags>;

    fn set_body_flags(&mut self, entity: EntityId, flags: BodyFlags);

    /// Pushes a pose computed by the transform hierarchy into the body.
    fn sync_pose(&mut self, entity: EntityId, pose: &Transform);

    /// Pose of a body the physics step moves on its own.
    fn simulated_pose(&self, entity: EntityId) -> Option<Transform>;

    /// Distance to the first blocking surface along `direction`, ignoring
    /// the bodies of `ignore`.
    fn cast_obstruction(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: &[EntityId],
    ) -> Option<f32>;

    fn remove_body(&mut self, entity: EntityId);

    fn step(&mut self) {}
}
