use std::collections::{BTreeMap, VecDeque};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::authority::{EntityId, EntityRegistry, NodeId, SourceFilter, satisfies};
use crate::error::{AuthorityError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CommandKind {
    StartCarry { carrier: EntityId },
    MoveClaimed { direction: Vec3 },
    StopCarry,
    ApplyPropertyIndex { index: i32 },
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartCarry { .. } => "StartCarry",
            Self::MoveClaimed { .. } => "MoveClaimed",
            Self::StopCarry => "StopCarry",
            Self::ApplyPropertyIndex { .. } => "ApplyPropertyIndex",
        }
    }

    pub fn source_filter(&self) -> SourceFilter {
        match self {
            Self::StartCarry { .. } | Self::MoveClaimed { .. } | Self::StopCarry => {
                SourceFilter::InputAuthority
            }
            Self::ApplyPropertyIndex { .. } => SourceFilter::Any,
        }
    }
}

/// The issuing node and the entity it speaks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandSource {
    pub node: NodeId,
    pub entity: EntityId,
}

/// A request for a state change, always executed at the target's state
/// authority.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub target: EntityId,
    pub source: CommandSource,
}

impl Command {
    pub fn start_carry(node: NodeId, target: EntityId, carrier: EntityId) -> Self {
        Self {
            kind: CommandKind::StartCarry { carrier },
            target,
            source: CommandSource {
                node,
                entity: carrier,
            },
        }
    }

    pub fn move_claimed(node: NodeId, carrier: EntityId, target: EntityId, direction: Vec3) -> Self {
        Self {
            kind: CommandKind::MoveClaimed { direction },
            target,
            source: CommandSource {
                node,
                entity: carrier,
            },
        }
    }

    pub fn stop_carry(node: NodeId, carrier: EntityId, target: EntityId) -> Self {
        Self {
            kind: CommandKind::StopCarry,
            target,
            source: CommandSource {
                node,
                entity: carrier,
            },
        }
    }

    pub fn apply_property_index(node: NodeId, target: EntityId, index: i32) -> Self {
        Self {
            kind: CommandKind::ApplyPropertyIndex { index },
            target,
            source: CommandSource {
                node,
                entity: target,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredCommand {
    pub due_tick: u32,
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Queued,
    /// Target unknown; dropped without error.
    Ignored,
}

/// Inbound command channel of the state-authority node.
///
/// One FIFO per target entity. Commands for the same entity drain in
/// arrival order; nothing is promised across entities.
#[derive(Debug)]
pub struct CommandDispatcher {
    queues: BTreeMap<EntityId, VecDeque<Command>>,
    deferred: VecDeque<DeferredCommand>,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self {
            queues: BTreeMap::new(),
            deferred: VecDeque::new(),
        }
    }

    pub fn issue(&mut self, registry: &EntityRegistry, command: Command) -> Result<Dispatch> {
        if !self.validate(registry, &command)? {
            return Ok(Dispatch::Ignored);
        }

        self.queues
            .entry(command.target)
            .or_default()
            .push_back(command);
        Ok(Dispatch::Queued)
    }

    /// Validates now, executes once `due_tick` is reached.
    pub fn schedule(
        &mut self,
        registry: &EntityRegistry,
        command: Command,
        due_tick: u32,
    ) -> Result<Dispatch> {
        if !self.validate(registry, &command)? {
            return Ok(Dispatch::Ignored);
        }
        self.deferred.push_back(DeferredCommand { due_tick, command });
        Ok(Dispatch::Queued)
    }

    /// Moves every deferred command due at `tick` behind the commands
    /// already queued for its target, keeping schedule order.
    pub fn promote_due(&mut self, tick: u32) -> usize {
        let mut promoted = 0;
        let mut waiting = VecDeque::with_capacity(self.deferred.len());
        while let Some(deferred) = self.deferred.pop_front() {
            if deferred.due_tick <= tick {
                self.queues
                    .entry(deferred.command.target)
                    .or_default()
                    .push_back(deferred.command);
                promoted += 1;
            } else {
                waiting.push_back(deferred);
            }
        }
        self.deferred = waiting;
        promoted
    }

    pub fn drain(&mut self, entity: EntityId) -> Vec<Command> {
        self.queues
            .remove(&entity)
            .map(Vec::from)
            .unwrap_or_default()
    }

    pub fn queued_entities(&self) -> Vec<EntityId> {
        self.queues.keys().copied().collect()
    }

    pub fn pending_for(&self, entity: EntityId) -> usize {
        self.queues.get(&entity).map_or(0, VecDeque::len)
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn drop_entity(&mut self, entity: EntityId) {
        self.queues.remove(&entity);
        self.deferred.retain(|d| d.command.target != entity);
    }

    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum::<usize>() + self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self, registry: &EntityRegistry, command: &Command) -> Result<bool> {
        if !registry.contains(command.target) {
            log::debug!(
                "{} for unknown entity {} ignored",
                command.kind.name(),
                command.target
            );
            return Ok(false);
        }

        let source = command.source;
        let unauthorized = AuthorityError::Unauthorized {
            node: source.node,
            entity: source.entity,
        };

        if let CommandKind::StartCarry { carrier } = command.kind {
            if carrier != source.entity {
                log::warn!("{} tried to start a carry for {}", source.node, carrier);
                return Err(unauthorized);
            }
        }

        let allowed = satisfies(
            registry,
            command.kind.source_filter(),
            source.node,
            source.entity,
        )
        .unwrap_or(false);
        if !allowed {
            log::warn!(
                "dropping {} from {}: no {:?} over {}",
                command.kind.name(),
                source.node,
                command.kind.source_filter(),
                source.entity
            );
            return Err(unauthorized);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::EntityKind;

    const HOST: NodeId = NodeId(0);
    const ALICE: NodeId = NodeId(1);
    const BOB: NodeId = NodeId(2);

    struct Fixture {
        registry: EntityRegistry,
        player: EntityId,
        crate_id: EntityId,
    }

    fn fixture() -> Fixture {
        let mut registry = EntityRegistry::new();
        let player = registry.allocate_id().unwrap();
        registry
            .register(player, EntityKind::Participant, HOST, Some(ALICE))
            .unwrap();
        let crate_id = registry.allocate_id().unwrap();
        registry
            .register(crate_id, EntityKind::Carryable, HOST, None)
            .unwrap();
        Fixture {
            registry,
            player,
            crate_id,
        }
    }

    #[test]
    fn input_authority_required_for_carry() {
        let f = fixture();
        let mut dispatcher = CommandDispatcher::default();

        let ok = Command::start_carry(ALICE, f.crate_id, f.player);
        assert_eq!(dispatcher.issue(&f.registry, ok), Ok(Dispatch::Queued));

        let foreign = Command::start_carry(BOB, f.crate_id, f.player);
        assert_eq!(
            dispatcher.issue(&f.registry, foreign),
            Err(AuthorityError::Unauthorized {
                node: BOB,
                entity: f.player
            })
        );
        assert_eq!(dispatcher.pending_for(f.crate_id), 1);
    }

    #[test]
    fn carrier_must_be_source() {
        let f = fixture();
        let mut dispatcher = CommandDispatcher::default();

        let mut forged = Command::start_carry(ALICE, f.crate_id, f.player);
        forged.kind = CommandKind::StartCarry {
            carrier: f.crate_id,
        };
        assert!(dispatcher.issue(&f.registry, forged).is_err());
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn any_node_may_paint() {
        let f = fixture();
        let mut dispatcher = CommandDispatcher::default();
        let cmd = Command::apply_property_index(BOB, f.crate_id, 2);
        assert_eq!(dispatcher.issue(&f.registry, cmd), Ok(Dispatch::Queued));
    }

    #[test]
    fn unknown_target_is_noop() {
        let f = fixture();
        let mut dispatcher = CommandDispatcher::default();
        let cmd = Command::stop_carry(ALICE, f.player, EntityId(404));
        assert_eq!(dispatcher.issue(&f.registry, cmd), Ok(Dispatch::Ignored));
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn drain_preserves_arrival_order() {
        let f = fixture();
        let mut dispatcher = CommandDispatcher::default();
        dispatcher
            .issue(&f.registry, Command::start_carry(ALICE, f.crate_id, f.player))
            .unwrap();
        dispatcher
            .issue(
                &f.registry,
                Command::move_claimed(ALICE, f.player, f.crate_id, Vec3::Z),
            )
            .unwrap();
        dispatcher
            .issue(&f.registry, Command::stop_carry(ALICE, f.player, f.crate_id))
            .unwrap();

        let names: Vec<_> = dispatcher
            .drain(f.crate_id)
            .iter()
            .map(|c| c.kind.name())
            .collect();
        assert_eq!(names, vec!["StartCarry", "MoveClaimed", "StopCarry"]);
        assert!(dispatcher.drain(f.crate_id).is_empty());
    }

    #[test]
    fn deferred_commands_wait_for_due_tick() {
        let f = fixture();
        let mut dispatcher = CommandDispatcher::default();
        dispatcher
            .schedule(&f.registry, Command::apply_property_index(ALICE, f.crate_id, 1), 5)
            .unwrap();
        dispatcher
            .issue(&f.registry, Command::apply_property_index(ALICE, f.crate_id, 2))
            .unwrap();

        assert_eq!(dispatcher.promote_due(4), 0);
        assert_eq!(dispatcher.promote_due(5), 1);

        let indices: Vec<_> = dispatcher
            .drain(f.crate_id)
            .iter()
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            indices,
            vec![
                CommandKind::ApplyPropertyIndex { index: 2 },
                CommandKind::ApplyPropertyIndex { index: 1 },
            ]
        );
    }

    #[test]
    fn long_backlog_keeps_every_command() {
        let f = fixture();
        let mut dispatcher = CommandDispatcher::new();
        for index in 0..200 {
            dispatcher
                .issue(&f.registry, Command::apply_property_index(HOST, f.crate_id, index))
                .unwrap();
        }
        let drained = dispatcher.drain(f.crate_id);
        assert_eq!(drained.len(), 200);
        assert_eq!(drained[0].kind, CommandKind::ApplyPropertyIndex { index: 0 });
        assert_eq!(drained[199].kind, CommandKind::ApplyPropertyIndex { index: 199 });
    }
}
