use std::collections::BTreeMap;

use crate::authority::{EntityId, NodeId};
use crate::error::{AuthorityError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    pub node: NodeId,
    pub entity: EntityId,
    pub slot: u8,
}

/// Hands out numbered participant slots, lowest free first.
#[derive(Debug)]
pub struct ParticipantSpawner {
    max_participants: usize,
    by_node: BTreeMap<NodeId, Participant>,
}

impl ParticipantSpawner {
    pub fn new(max_participants: usize) -> Self {
        Self {
            max_participants,
            by_node: BTreeMap::new(),
        }
    }

    pub fn max_participants(&self) -> usize {
        self.max_participants
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.by_node.len() >= self.max_participants
    }

    pub fn get(&self, node: NodeId) -> Option<&Participant> {
        self.by_node.get(&node)
    }

    pub fn slot_of_entity(&self, entity: EntityId) -> Option<u8> {
        self.by_node
            .values()
            .find(|p| p.entity == entity)
            .map(|p| p.slot)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.by_node.values()
    }

    /// Lowest free slot, starting at 1.
    pub fn next_slot(&self) -> Result<u8> {
        if self.is_full() {
            return Err(AuthorityError::SessionFull {
                max: self.max_participants,
            });
        }
        // slots are u8; anything above 255 participants is capped there
        let last = u8::try_from(self.max_participants).unwrap_or(u8::MAX);
        let slot = (1..=last)
            .find(|slot| self.by_node.values().all(|p| p.slot != *slot))
            .ok_or(AuthorityError::SessionFull {
                max: self.max_participants,
            })?;
        Ok(slot)
    }

    pub fn bind(&mut self, node: NodeId, entity: EntityId, slot: u8) {
        self.by_node.insert(node, Participant { node, entity, slot });
    }

    pub fn leave(&mut self, node: NodeId) -> Option<Participant> {
        self.by_node.remove(&node)
    }

    pub fn remove_entity(&mut self, entity: EntityId) -> Option<Participant> {
        let node = self
            .by_node
            .values()
            .find(|p| p.entity == entity)
            .map(|p| p.node)?;
        self.by_node.remove(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_fill_then_reject() {
        let mut spawner = ParticipantSpawner::new(2);
        assert_eq!(spawner.next_slot(), Ok(1));
        spawner.bind(NodeId(1), EntityId(10), 1);
        assert_eq!(spawner.next_slot(), Ok(2));
        spawner.bind(NodeId(2), EntityId(11), 2);

        assert_eq!(spawner.next_slot(), Err(AuthorityError::SessionFull { max: 2 }));
    }

    #[test]
    fn large_capacity_still_hands_out_slots() {
        let mut spawner = ParticipantSpawner::new(256);
        assert_eq!(spawner.next_slot(), Ok(1));
        for slot in 1..=u8::MAX {
            spawner.bind(NodeId(u32::from(slot)), EntityId(u32::from(slot)), slot);
        }
        assert!(!spawner.is_full());
        assert_eq!(
            spawner.next_slot(),
            Err(AuthorityError::SessionFull { max: 256 })
        );
    }

    #[test]
    fn leaving_frees_lowest_slot() {
        let mut spawner = ParticipantSpawner::new(2);
        spawner.bind(NodeId(1), EntityId(10), 1);
        spawner.bind(NodeId(2), EntityId(11), 2);

        assert_eq!(spawner.leave(NodeId(1)).map(|p| p.entity), Some(EntityId(10)));
        assert_eq!(spawner.next_slot(), Ok(1));
        assert_eq!(spawner.slot_of_entity(EntityId(11)), Some(2));
        assert!(spawner.remove_entity(EntityId(11)).is_some());
        assert!(spawner.is_empty());
    }
}
