use std::collections::HashMap;

use crate::authority::{EntityId, EntityRegistry, NodeId};
use crate::error::{AuthorityError, Result};
use crate::physics::BodyPhysics;
use crate::player::Movement;
use crate::property::{POSITION, PropertyKey, PropertyStore, PropertyType, ROTATION};
use crate::transform::TransformHierarchy;

/// Everything the state-authority node mutates during a tick.
pub struct WorldState<P> {
    pub local_node: NodeId,
    pub tick: u32,
    pub dt: f32,
    pub registry: EntityRegistry,
    pub properties: PropertyStore,
    pub transforms: TransformHierarchy,
    pub physics: P,
    pub movements: HashMap<EntityId, Movement>,
}

impl<P: BodyPhysics> WorldState<P> {
    pub fn new(local_node: NodeId, dt: f32, physics: P) -> Self {
        Self {
            local_node,
            tick: 0,
            dt,
            registry: EntityRegistry::new(),
            properties: PropertyStore::new(),
            transforms: TransformHierarchy::new(),
            physics,
            movements: HashMap::new(),
        }
    }

    pub fn is_local_authority(&self, entity: EntityId) -> bool {
        self.registry
            .lookup(entity)
            .is_ok_and(|r| r.state_authority == self.local_node)
    }

    /// `NotFound` for unknown entities, `Unauthorized` when another node
    /// holds state authority.
    pub fn require_authority(&self, entity: EntityId) -> Result<()> {
        if self.registry.lookup(entity)?.state_authority != self.local_node {
            return Err(AuthorityError::Unauthorized {
                node: self.local_node,
                entity,
            });
        }
        Ok(())
    }

    pub fn stage<T: PropertyType>(
        &mut self,
        entity: EntityId,
        key: PropertyKey<T>,
        value: T,
    ) -> Result<()> {
        self.properties
            .write(&self.registry, entity, key, value, self.local_node)
    }

    /// Stages the entity's current world pose and pushes it to its body.
    pub fn publish_pose(&mut self, entity: EntityId) -> Result<()> {
        let pose = self.transforms.world(entity)?;
        self.physics.sync_pose(entity, &pose);

        if self.properties.contains(entity, POSITION)
            && self.properties.pending(entity, POSITION)? != pose.translation
        {
            self.stage(entity, POSITION, pose.translation)?;
        }
        if self.properties.contains(entity, ROTATION)
            && self.properties.pending(entity, ROTATION)? != pose.rotation
        {
            self.stage(entity, ROTATION, pose.rotation)?;
        }
        Ok(())
    }
}
