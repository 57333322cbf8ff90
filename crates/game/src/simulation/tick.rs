use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::authority::{EntityId, EntityKind, NodeId, can_issue_input};
use crate::carry::{CarryController, Transition};
use crate::config::SimulationConfig;
use crate::error::{AuthorityError, Result};
use crate::event::{EventQueue, GameEvent, PendingEvent};
use crate::physics::BodyPhysics;
use crate::player::Movement;
use crate::property::{
    CARRIED, COUNTDOWN, PAINT_INDEX, POSITION, PropertyKey, PropertyType, ROTATION,
};
use crate::session::{Countdown, ParticipantSpawner, Session};
use crate::transform::Transform;

use super::{Command, CommandDispatcher, CommandKind, CommandSource, Dispatch, WorldState};

pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.accumulator += delta.min(0.25);
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }
}

/// What one authoritative tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub tick: u32,
    pub applied: usize,
    pub rejected: usize,
    pub committed: usize,
}

/// The state-authority simulation: command intake, ownership transfers,
/// per-entity logic and the commit boundary, advanced one tick at a time.
pub struct Simulation<P> {
    world: WorldState<P>,
    dispatcher: CommandDispatcher,
    carry: CarryController,
    countdowns: Vec<Countdown>,
    session: Session,
    spawner: ParticipantSpawner,
    events: EventQueue,
    timestep: FixedTimestep,
    config: SimulationConfig,
    inputs: BTreeMap<EntityId, Vec3>,
    blocked_until: BTreeMap<EntityId, u32>,
}

impl<P: BodyPhysics> Simulation<P> {
    pub fn new(local_node: NodeId, config: SimulationConfig, physics: P) -> Self {
        Self {
            world: WorldState::new(local_node, config.dt(), physics),
            dispatcher: CommandDispatcher::default(),
            carry: CarryController::new(config.carry.clone()),
            countdowns: Vec::new(),
            session: Session::new(config.paint.required_count),
            spawner: ParticipantSpawner::new(config.participants.max_participants),
            events: EventQueue::new(config.event_capacity),
            timestep: FixedTimestep::new(config.tick_rate),
            config,
            inputs: BTreeMap::new(),
            blocked_until: BTreeMap::new(),
        }
    }

    pub fn local_node(&self) -> NodeId {
        self.world.local_node
    }

    /// The next tick to be simulated.
    pub fn tick_number(&self) -> u32 {
        self.world.tick
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldState<P> {
        &self.world
    }

    pub fn physics(&self) -> &P {
        &self.world.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.world.physics
    }

    pub fn carry(&self) -> &CarryController {
        &self.carry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn spawner(&self) -> &ParticipantSpawner {
        &self.spawner
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn movement(&self, entity: EntityId) -> Option<&Movement> {
        self.world.movements.get(&entity)
    }

    pub fn movement_mut(&mut self, entity: EntityId) -> Option<&mut Movement> {
        self.world.movements.get_mut(&entity)
    }

    /// Last committed value, as any observer sees it.
    pub fn read<T: PropertyType>(&self, entity: EntityId, key: PropertyKey<T>) -> Result<T> {
        self.world.properties.read(entity, key)
    }

    pub fn world_pose(&self, entity: EntityId) -> Result<Transform> {
        self.world.transforms.world(entity)
    }

    pub fn drain_events(&mut self) -> Vec<PendingEvent> {
        self.events.drain().collect()
    }

    pub fn spawn_carryable(&mut self, pose: Transform) -> Result<EntityId> {
        let id = self.spawn(EntityKind::Carryable, None, pose)?;
        self.world.properties.declare(id, CARRIED, false);
        self.declare_pose(id, pose);
        Ok(id)
    }

    pub fn spawn_paintable(&mut self, pose: Transform) -> Result<EntityId> {
        let id = self.spawn(EntityKind::Paintable, None, pose)?;
        self.world.properties.declare(id, PAINT_INDEX, 0);
        Ok(id)
    }

    /// A countdown starting at `config.countdown_secs`.
    pub fn spawn_timer(&mut self) -> Result<EntityId> {
        let id = self.spawn(EntityKind::Timer, None, Transform::IDENTITY)?;
        self.world
            .properties
            .declare(id, COUNTDOWN, self.config.countdown_secs);
        self.countdowns.push(Countdown::new(id));
        Ok(id)
    }

    /// Spawns the participant `node` drives, or returns the one it already
    /// has. Fails with `SessionFull` once every slot is taken.
    pub fn join(&mut self, node: NodeId) -> Result<EntityId> {
        if let Some(existing) = self.spawner.get(node) {
            return Ok(existing.entity);
        }

        let slot = match self.spawner.next_slot() {
            Ok(slot) => slot,
            Err(e) => {
                log::warn!("{} rejected: {}", node, e);
                return Err(e);
            }
        };

        let participants = &self.config.participants;
        let pose = Transform::from_translation(participants.spawn_position);
        let movement = Movement::new(participants.movement, participants.move_speed);

        let id = self.spawn(EntityKind::Participant, Some(node), pose)?;
        self.declare_pose(id, pose);
        self.world.movements.insert(id, movement);
        self.spawner.bind(node, id, slot);

        log::info!("{} joined as {} in slot {}", node, id, slot);
        self.events.push(
            self.world.tick,
            GameEvent::ParticipantJoined {
                node,
                entity: id,
                slot,
            },
        );
        Ok(id)
    }

    /// Despawns the participant of `node`. `None` if it never joined.
    pub fn leave(&mut self, node: NodeId) -> Result<Option<EntityId>> {
        let Some(participant) = self.spawner.get(node).copied() else {
            return Ok(None);
        };
        self.despawn(participant.entity)?;
        Ok(Some(participant.entity))
    }

    /// Removes an entity everywhere. Claims it takes part in are released
    /// first, keeping the released target's world pose.
    pub fn despawn(&mut self, id: EntityId) -> Result<()> {
        self.world.registry.lookup(id)?;

        for transition in self.carry.release_involving(&mut self.world, id) {
            self.record_transition(transition);
        }

        self.dispatcher.drop_entity(id);
        self.world.properties.remove_entity(id);
        self.world.transforms.remove(id);
        self.world.physics.remove_body(id);
        self.world.movements.remove(&id);
        self.countdowns.retain(|c| c.timer() != id);
        self.inputs.remove(&id);
        self.blocked_until.remove(&id);

        if let Some(participant) = self.spawner.remove_entity(id) {
            log::info!("{} left, despawned {}", participant.node, id);
            self.events.push(
                self.world.tick,
                GameEvent::ParticipantLeft {
                    node: participant.node,
                    entity: id,
                },
            );
        }

        self.world.registry.unregister(id)?;
        Ok(())
    }

    pub fn issue(&mut self, command: Command) -> Result<Dispatch> {
        self.dispatcher.issue(&self.world.registry, command)
    }

    pub fn schedule(&mut self, command: Command, due_tick: u32) -> Result<Dispatch> {
        self.dispatcher
            .schedule(&self.world.registry, command, due_tick)
    }

    /// Hands state authority of `id` to `node`. Claims it takes part in are
    /// released here first, and commands still queued for it here resolve as
    /// no-ops.
    pub fn hand_off(&mut self, id: EntityId, node: NodeId) -> Result<()> {
        self.world.require_authority(id)?;

        for transition in self.carry.release_involving(&mut self.world, id) {
            self.record_transition(transition);
        }

        let local = self.world.local_node;
        self.world
            .registry
            .reassign_state_authority(id, node, local)
    }

    /// Latest locomotion intent for a participant, consumed by the next tick.
    pub fn submit_input(&mut self, source: CommandSource, direction: Vec3) -> Result<()> {
        if !can_issue_input(&self.world.registry, source.node, source.entity)? {
            return Err(AuthorityError::Unauthorized {
                node: source.node,
                entity: source.entity,
            });
        }
        self.inputs
            .insert(source.entity, direction.normalize_or_zero());
        Ok(())
    }

    /// Starts a paint action on `target`. The paint lands after the
    /// configured delay; the participant cannot move until then.
    ///
    /// Returns the tick the paint is due, or `None` when the participant
    /// is airborne or already painting.
    pub fn request_paint(&mut self, source: CommandSource, target: EntityId) -> Result<Option<u32>> {
        if !can_issue_input(&self.world.registry, source.node, source.entity)? {
            return Err(AuthorityError::Unauthorized {
                node: source.node,
                entity: source.entity,
            });
        }

        if let Some(movement) = self.world.movements.get(&source.entity) {
            if !movement.is_grounded() {
                log::debug!("{} is not grounded, paint cancelled", source.entity);
                return Ok(None);
            }
        }
        if self.blocked_until.contains_key(&source.entity) {
            return Ok(None);
        }

        let slot = self.spawner.slot_of_entity(source.entity).unwrap_or(1);
        let index = self.palette_index(slot);
        let due = self.world.tick + self.config.paint_delay_ticks();

        let command = Command {
            kind: CommandKind::ApplyPropertyIndex { index },
            target,
            source,
        };
        if self.schedule(command, due)? == Dispatch::Ignored {
            return Ok(None);
        }

        if let Some(movement) = self.world.movements.get_mut(&source.entity) {
            movement.set_blocked(true);
        }
        self.blocked_until.insert(source.entity, due);
        log::debug!("{} paints {} with {} at tick {}", source.entity, target, index, due);
        Ok(Some(due))
    }

    /// Runs however many whole ticks `delta` seconds cover. The remainder
    /// carries over to the next call.
    pub fn update(&mut self, delta: f32) -> Vec<TickReport> {
        self.timestep.accumulate(delta);

        let mut reports = Vec::new();
        while self.timestep.consume_tick() {
            reports.push(self.tick());
        }
        reports
    }

    /// One authoritative tick: apply commands, step entities, commit.
    pub fn tick(&mut self) -> TickReport {
        let tick = self.world.tick;
        self.dispatcher.promote_due(tick);

        let mut report = TickReport {
            tick,
            ..Default::default()
        };

        for entity in self.dispatcher.queued_entities() {
            for command in self.dispatcher.drain(entity) {
                match self.apply(command) {
                    Ok(()) => report.applied += 1,
                    Err(e) if e.is_noop() => {
                        log::debug!("{} on {}: {}", command.kind.name(), command.target, e);
                        report.rejected += 1;
                    }
                    Err(e) => {
                        log::warn!("{} on {} rejected: {}", command.kind.name(), command.target, e);
                        report.rejected += 1;
                    }
                }
            }
        }

        self.step_entities();

        report.committed = self.world.properties.commit_dirty();
        self.world.tick += 1;
        report
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        // the target may have despawned or changed authority while queued
        self.world.require_authority(command.target)?;

        match command.kind {
            CommandKind::StartCarry { carrier } => {
                let transition = self
                    .carry
                    .start_carry(&mut self.world, command.target, carrier)?;
                self.record_transition(transition);
            }
            CommandKind::MoveClaimed { direction } => {
                self.carry.move_claimed(
                    &mut self.world,
                    command.target,
                    command.source,
                    direction,
                )?;
            }
            CommandKind::StopCarry => {
                let transition =
                    self.carry
                        .stop_carry(&mut self.world, command.target, Some(command.source))?;
                self.record_transition(transition);
            }
            CommandKind::ApplyPropertyIndex { index } => {
                self.apply_property_index(command.target, index)?;
            }
        }
        Ok(())
    }

    fn apply_property_index(&mut self, target: EntityId, index: i32) -> Result<()> {
        let max = self.config.paint.max_index;
        if !(0..=max).contains(&index) {
            return Err(AuthorityError::InvalidIndex { index, max });
        }

        self.world.stage(target, PAINT_INDEX, index)?;
        let victory = self.session.record_paint();
        let count = self.session.paint_count();

        log::info!("{} painted with {} ({} total)", target, index, count);
        self.events.push(
            self.world.tick,
            GameEvent::PropertyIndexApplied {
                target,
                index,
                count,
            },
        );
        if let Some(event) = victory {
            self.events.push(self.world.tick, event);
        }
        Ok(())
    }

    fn step_entities(&mut self) {
        let tick = self.world.tick;
        let dt = self.world.dt;

        for countdown in &mut self.countdowns {
            let timer = countdown.timer();
            if !self.world.is_local_authority(timer) {
                continue;
            }
            let Ok(remaining) = self.world.properties.pending(timer, COUNTDOWN) else {
                continue;
            };

            let (next, expired) = countdown.step(remaining, dt);
            if next != remaining {
                if let Err(e) = self.world.stage(timer, COUNTDOWN, next) {
                    log::warn!("countdown {} not staged: {}", timer, e);
                }
            }
            if expired {
                log::info!("countdown {} expired", timer);
                self.events.push(tick, GameEvent::CountdownExpired { timer });
                if let Some(event) = self.session.expire() {
                    self.events.push(tick, event);
                }
            }
        }

        let released: Vec<EntityId> = self
            .blocked_until
            .iter()
            .filter(|(_, due)| **due <= tick)
            .map(|(entity, _)| *entity)
            .collect();
        for entity in released {
            self.blocked_until.remove(&entity);
            if let Some(movement) = self.world.movements.get_mut(&entity) {
                movement.set_blocked(false);
            }
        }

        for (entity, direction) in std::mem::take(&mut self.inputs) {
            if let Err(e) = self.step_participant(entity, direction) {
                log::debug!("input for {} dropped: {}", entity, e);
            }
        }

        self.world.physics.step();

        let carryables: Vec<EntityId> = self
            .world
            .registry
            .records()
            .filter(|r| r.kind == EntityKind::Carryable && r.state_authority == self.world.local_node)
            .map(|r| r.id)
            .collect();
        for entity in carryables {
            if let Err(e) = self.sync_carryable(entity) {
                log::warn!("pose sync for {} failed: {}", entity, e);
            }
        }
    }

    fn step_participant(&mut self, entity: EntityId, direction: Vec3) -> Result<()> {
        self.world.require_authority(entity)?;
        let Some(movement) = self.world.movements.get(&entity).copied() else {
            return Ok(());
        };
        if direction == Vec3::ZERO {
            return Ok(());
        }

        let mut pose = self.world.transforms.world(entity)?;
        pose.translation += direction * movement.speed() * self.world.dt;
        if movement.can_rotate() && !movement.is_blocked() {
            pose.rotation = Quat::from_rotation_y(direction.x.atan2(direction.z));
        }
        self.world.transforms.set_world(entity, pose)?;
        self.world.publish_pose(entity)
    }

    fn sync_carryable(&mut self, entity: EntityId) -> Result<()> {
        if self.carry.state(entity).is_free() {
            if let Some(pose) = self.world.physics.simulated_pose(entity) {
                self.world.transforms.set_world(entity, pose)?;
            }
        }
        // claimed targets follow their carrier through the hierarchy
        self.world.publish_pose(entity)
    }

    fn record_transition(&mut self, transition: Transition) {
        let event = match transition {
            Transition::Claimed { target, carrier } => GameEvent::CarryStarted { target, carrier },
            Transition::Released {
                target, carrier, ..
            } => GameEvent::CarryStopped { target, carrier },
            Transition::Moved { .. } => return,
        };
        self.events.push(self.world.tick, event);
    }

    fn spawn(&mut self, kind: EntityKind, input: Option<NodeId>, pose: Transform) -> Result<EntityId> {
        let id = self.world.registry.allocate_id()?;
        self.world
            .registry
            .register(id, kind, self.world.local_node, input)?;
        self.world.transforms.insert(id, pose);
        Ok(id)
    }

    fn declare_pose(&mut self, id: EntityId, pose: Transform) {
        self.world.properties.declare(id, POSITION, pose.translation);
        self.world.properties.declare(id, ROTATION, pose.rotation);
    }

    // slot 1 paints 1..=2, slot 2 paints 3..=4, alternating by tick
    fn palette_index(&self, slot: u8) -> i32 {
        let base = (i32::from(slot.max(1)) - 1) * 2 + 1;
        let index = base + (self.world.tick % 2) as i32;
        index.min(self.config.paint.max_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::new(60);

        ts.accumulate(1.0 / 30.0);
        assert!(ts.consume_tick());
        assert!(ts.consume_tick());
        assert!(!ts.consume_tick());
    }

    #[test]
    fn zero_tick_rate_is_clamped() {
        let ts = FixedTimestep::new(0);
        assert_eq!(ts.tick_rate(), 1);
        assert_eq!(ts.dt(), 1.0);
    }
}
