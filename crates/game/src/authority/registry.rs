use std::collections::BTreeMap;

use crate::error::{AuthorityError, Result};

use super::{EntityId, EntityKind, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRecord {
    pub id: EntityId,
    pub kind: EntityKind,
    pub state_authority: NodeId,
    pub input_authority: Option<NodeId>,
}

/// Authority assignment for every live entity.
///
/// Ordered by id so that anything iterating the registry (the tick driver in
/// particular) visits entities in the same order on every run.
#[derive(Debug)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, EntityRecord>,
    next_id: u32,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Next unused id above every id seen so far.
    pub fn allocate_id(&mut self) -> Result<EntityId> {
        while self.entities.contains_key(&EntityId(self.next_id)) {
            self.next_id = self
                .next_id
                .checked_add(1)
                .ok_or(AuthorityError::IdsExhausted)?;
        }
        let id = EntityId(self.next_id);
        // u32::MAX stays the cursor once handed out; the scan above rejects it
        self.next_id = self.next_id.saturating_add(1);
        Ok(id)
    }

    pub fn register(
        &mut self,
        id: EntityId,
        kind: EntityKind,
        state_authority: NodeId,
        input_authority: Option<NodeId>,
    ) -> Result<()> {
        if self.entities.contains_key(&id) {
            return Err(AuthorityError::DuplicateEntity(id));
        }
        self.entities.insert(
            id,
            EntityRecord {
                id,
                kind,
                state_authority,
                input_authority,
            },
        );
        if id.0 >= self.next_id {
            self.next_id = id.0.saturating_add(1);
        }
        Ok(())
    }

    pub fn lookup(&self, id: EntityId) -> Result<&EntityRecord> {
        self.entities.get(&id).ok_or(AuthorityError::NotFound(id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn reassign_state_authority(
        &mut self,
        id: EntityId,
        node: NodeId,
        requester: NodeId,
    ) -> Result<()> {
        let record = self.record_mut(id)?;
        if record.state_authority != requester {
            return Err(AuthorityError::Unauthorized {
                node: requester,
                entity: id,
            });
        }
        record.state_authority = node;
        log::info!("state authority of {} handed from {} to {}", id, requester, node);
        Ok(())
    }

    /// Bootstrap-only reassignment that skips the current-holder check.
    pub fn bootstrap_state_authority(&mut self, id: EntityId, node: NodeId) -> Result<()> {
        self.record_mut(id)?.state_authority = node;
        Ok(())
    }

    pub fn set_input_authority(
        &mut self,
        id: EntityId,
        node: Option<NodeId>,
        requester: NodeId,
    ) -> Result<()> {
        let record = self.record_mut(id)?;
        if record.state_authority != requester {
            return Err(AuthorityError::Unauthorized {
                node: requester,
                entity: id,
            });
        }
        record.input_authority = node;
        Ok(())
    }

    pub fn unregister(&mut self, id: EntityId) -> Result<EntityRecord> {
        self.entities.remove(&id).ok_or(AuthorityError::NotFound(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    pub fn records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn record_mut(&mut self, id: EntityId) -> Result<&mut EntityRecord> {
        self.entities
            .get_mut(&id)
            .ok_or(AuthorityError::NotFound(id))
    }
}
