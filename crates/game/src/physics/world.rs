use std::collections::HashMap;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::authority::EntityId;
use crate::transform::Transform;

use super::{BodyFlags, BodyPhysics};

/// Rapier-backed physics for the state-authority node.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
    entity_bodies: HashMap<EntityId, RigidBodyHandle>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(60)
    }
}

impl PhysicsWorld {
    pub fn new(tick_rate: u32) -> Self {
        let dt = 1.0 / tick_rate.max(1) as Real;
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = dt;
        integration_parameters.min_ccd_dt = dt / 100.0;

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, -9.81, 0.0),
            entity_bodies: HashMap::new(),
        }
    }

    pub fn add_static_box(&mut self, position: Vec3, half_extents: Vec3) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(Vector::new(position.x, position.y, position.z))
            .build();
        self.colliders.insert(collider)
    }

    pub fn add_ground(&mut self, y: Real, half_size: Real) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_size, 0.1, half_size)
            .translation(Vector::new(0.0, y, 0.0))
            .build();
        self.colliders.insert(collider)
    }

    /// Movable box bound to `entity`, starting free (dynamic, colliding).
    pub fn add_carryable_box(
        &mut self,
        entity: EntityId,
        position: Vec3,
        half_extents: Vec3,
        mass: Real,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position.x, position.y, position.z))
            .ccd_enabled(true)
            .build();

        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass)
            .friction(0.5)
            .restitution(0.1)
            .build();

        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        self.entity_bodies.insert(entity, handle);
        handle
    }

    pub fn body_handle(&self, entity: EntityId) -> Option<RigidBodyHandle> {
        self.entity_bodies.get(&entity).copied()
    }

    pub fn body_position(&self, entity: EntityId) -> Option<Vec3> {
        let handle = self.body_handle(entity)?;
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            Vec3::new(t.x, t.y, t.z)
        })
    }

    fn set_body_pose(&mut self, handle: RigidBodyHandle, position: Vec3, rotation: Quat) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let rot =
                Rotation::from_xyzw(rotation.x, rotation.y, rotation.z, rotation.w).normalize();
            let new_pose = Pose::from_parts(Vector::new(position.x, position.y, position.z), rot);
            if body.is_kinematic() {
                body.set_next_kinematic_position(new_pose);
            }
            body.set_position(new_pose, true);
        }
    }
}

impl BodyPhysics for PhysicsWorld {
    fn body_flags(&self, entity: EntityId) -> Option<BodyFlags> {
        let body = self.bodies.get(self.body_handle(entity)?)?;

        let mut flags = BodyFlags::empty();
        flags.set(BodyFlags::DYNAMIC, body.is_dynamic());
        let colliding = body
            .colliders()
            .iter()
            .any(|h| self.colliders.get(*h).is_some_and(|c| c.is_enabled()));
        flags.set(BodyFlags::COLLISION, colliding);
        Some(flags)
    }

    fn set_body_flags(&mut self, entity: EntityId, flags: BodyFlags) {
        let Some(handle) = self.body_handle(entity) else {
            return;
        };
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };

        let body_type = if flags.contains(BodyFlags::DYNAMIC) {
            RigidBodyType::Dynamic
        } else {
            RigidBodyType::KinematicPositionBased
        };
        body.set_body_type(body_type, true);
        body.set_linvel(Vector::new(0.0, 0.0, 0.0), true);

        let collider_handles: Vec<_> = body.colliders().to_vec();
        for collider_handle in collider_handles {
            if let Some(collider) = self.colliders.get_mut(collider_handle) {
                collider.set_enabled(flags.contains(BodyFlags::COLLISION));
            }
        }
    }

    fn sync_pose(&mut self, entity: EntityId, pose: &Transform) {
        if let Some(handle) = self.body_handle(entity) {
            self.set_body_pose(handle, pose.translation, pose.rotation);
        }
    }

    fn simulated_pose(&self, entity: EntityId) -> Option<Transform> {
        let body = self.bodies.get(self.body_handle(entity)?)?;
        if !body.is_dynamic() {
            return None;
        }
        let t = body.translation();
        let r = body.rotation();
        Some(Transform::new(
            Vec3::new(t.x, t.y, t.z),
            Quat::from_xyzw(r.x, r.y, r.z, r.w).normalize(),
        ))
    }

    fn cast_obstruction(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: &[EntityId],
    ) -> Option<f32> {
        let ignored: Vec<RigidBodyHandle> =
            ignore.iter().filter_map(|e| self.body_handle(*e)).collect();
        let predicate = |_handle: ColliderHandle, collider: &Collider| {
            collider.parent().is_none_or(|parent| !ignored.contains(&parent))
        };

        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            QueryFilter::default().predicate(&predicate),
        );

        let ray = Ray::new(
            Vector::new(origin.x, origin.y, origin.z),
            Vector::new(direction.x, direction.y, direction.z),
        );

        query.cast_ray(&ray, max_distance, true).map(|(_, toi)| toi)
    }

    fn remove_body(&mut self, entity: EntityId) {
        if let Some(handle) = self.entity_bodies.remove(&entity) {
            self.bodies.remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    fn step(&mut self) {
        self.pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }
}
