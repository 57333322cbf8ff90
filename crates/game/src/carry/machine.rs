use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::authority::{EntityId, EntityKind};
use crate::config::CarryConfig;
use crate::error::{AuthorityError, Result};
use crate::physics::{BodyFlags, BodyPhysics};
use crate::property::CARRIED;
use crate::simulation::{CommandSource, WorldState};
use crate::transform::Transform;

use super::{CarryState, OwnershipClaim, Transition};

/// Carry/push protocol: `Free -> Claimed(carrier) -> Released -> Free`.
///
/// Every transition runs at the target's state authority, inside a tick.
#[derive(Debug, Default)]
pub struct CarryController {
    claims: BTreeMap<EntityId, OwnershipClaim>,
    config: CarryConfig,
}

impl CarryController {
    pub fn new(config: CarryConfig) -> Self {
        Self {
            claims: BTreeMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &CarryConfig {
        &self.config
    }

    pub fn state(&self, target: EntityId) -> CarryState {
        match self.claims.get(&target) {
            Some(claim) => CarryState::Claimed(claim.claimant),
            None => CarryState::Free,
        }
    }

    pub fn claim(&self, target: EntityId) -> Option<&OwnershipClaim> {
        self.claims.get(&target)
    }

    pub fn claim_by_carrier(&self, carrier: EntityId) -> Option<&OwnershipClaim> {
        self.claims.values().find(|c| c.claimant == carrier)
    }

    pub fn claims(&self) -> impl Iterator<Item = &OwnershipClaim> {
        self.claims.values()
    }

    pub fn start_carry<P: BodyPhysics>(
        &mut self,
        world: &mut WorldState<P>,
        target: EntityId,
        carrier: EntityId,
    ) -> Result<Transition> {
        world.require_authority(target)?;
        world.registry.lookup(carrier)?;
        if world.registry.lookup(target)?.kind != EntityKind::Carryable || target == carrier {
            return Err(AuthorityError::NotCarryable(target));
        }

        if let Some(existing) = self.claims.get(&target) {
            return Err(AuthorityError::AlreadyClaimed {
                target,
                claimant: existing.claimant,
            });
        }
        if let Some(held) = self.claim_by_carrier(carrier) {
            return Err(AuthorityError::AlreadyClaimed {
                target: held.target,
                claimant: carrier,
            });
        }

        if !world.transforms.set_parent(target, Some(carrier), false)? {
            return Err(AuthorityError::NotCarryable(target));
        }
        let local = Transform::new(self.config.local_offset, Quat::IDENTITY);
        world.transforms.set_local(target, local)?;

        let restore_flags = world
            .physics
            .body_flags(target)
            .unwrap_or(BodyFlags::FREE);
        world.physics.set_body_flags(target, BodyFlags::empty());

        self.claims.insert(
            target,
            OwnershipClaim {
                claimant: carrier,
                target,
                local_offset: local.translation,
                local_rotation_offset: local.rotation,
                since: world.tick,
                restore_flags,
            },
        );

        if let Some(movement) = world.movements.get_mut(&carrier) {
            movement.begin_carry(self.config.carrier_speed_multiplier);
        }
        if world.properties.contains(target, CARRIED) {
            world.stage(target, CARRIED, true)?;
        }
        world.publish_pose(target)?;

        log::info!("{} claimed by {}", target, carrier);
        Ok(Transition::Claimed { target, carrier })
    }

    pub fn move_claimed<P: BodyPhysics>(
        &mut self,
        world: &mut WorldState<P>,
        target: EntityId,
        source: CommandSource,
        direction: Vec3,
    ) -> Result<Transition> {
        world.require_authority(target)?;
        let claim = self
            .claims
            .get(&target)
            .ok_or(AuthorityError::NotClaimed(target))?;
        if claim.claimant != source.entity {
            return Err(AuthorityError::Unauthorized {
                node: source.node,
                entity: target,
            });
        }

        if !direction.is_finite() || direction.length_squared() < 1e-6 {
            return Err(AuthorityError::InvalidDirection);
        }
        let direction = direction.normalize();
        let step = direction * self.config.move_speed * world.dt;

        let mut pose = world.transforms.world(target)?;
        let reach = step.length() + self.config.obstruction_skin;
        if world
            .physics
            .cast_obstruction(pose.translation, direction, reach, &[target, claim.claimant])
            .is_some()
        {
            return Err(AuthorityError::Obstructed(target));
        }

        pose.translation += step;
        world.transforms.set_world(target, pose)?;
        let local = world.transforms.local(target)?;
        if let Some(claim) = self.claims.get_mut(&target) {
            claim.local_offset = local.translation;
            claim.local_rotation_offset = local.rotation;
        }
        world.publish_pose(target)?;

        Ok(Transition::Moved {
            target,
            position: pose.translation,
        })
    }

    /// Releases `target`. With a `source`, only the claimant may release.
    pub fn stop_carry<P: BodyPhysics>(
        &mut self,
        world: &mut WorldState<P>,
        target: EntityId,
        source: Option<CommandSource>,
    ) -> Result<Transition> {
        let claim = *self
            .claims
            .get(&target)
            .ok_or(AuthorityError::AlreadyFree(target))?;
        if let Some(source) = source {
            world.require_authority(target)?;
            if source.entity != claim.claimant {
                return Err(AuthorityError::Unauthorized {
                    node: source.node,
                    entity: target,
                });
            }
        }

        // capture before un-parenting, then re-apply identically
        let pose = world.transforms.world(target)?;
        world.transforms.set_parent(target, None, false)?;
        world.transforms.set_world(target, pose)?;

        world.physics.sync_pose(target, &pose);
        world.physics.set_body_flags(target, claim.restore_flags);
        self.claims.remove(&target);

        if let Some(movement) = world.movements.get_mut(&claim.claimant) {
            movement.end_carry();
        }
        if world.is_local_authority(target) {
            if world.properties.contains(target, CARRIED) {
                world.stage(target, CARRIED, false)?;
            }
            world.publish_pose(target)?;
        }

        log::info!("{} released by {}", target, claim.claimant);
        Ok(Transition::Released {
            target,
            carrier: claim.claimant,
            pose,
        })
    }

    /// Releases every claim `entity` takes part in, as target or carrier.
    pub fn release_involving<P: BodyPhysics>(
        &mut self,
        world: &mut WorldState<P>,
        entity: EntityId,
    ) -> Vec<Transition> {
        let targets: Vec<EntityId> = self
            .claims
            .values()
            .filter(|c| c.target == entity || c.claimant == entity)
            .map(|c| c.target)
            .collect();

        targets
            .into_iter()
            .filter_map(|target| match self.stop_carry(world, target, None) {
                Ok(transition) => Some(transition),
                Err(e) => {
                    log::warn!("releasing {} failed: {}", target, e);
                    self.claims.remove(&target);
                    None
                }
            })
            .collect()
    }
}
