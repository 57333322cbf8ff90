use serde::{Deserialize, Serialize};

use crate::authority::{EntityId, NodeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ParticipantJoined {
        node: NodeId,
        entity: EntityId,
        slot: u8,
    },
    ParticipantLeft {
        node: NodeId,
        entity: EntityId,
    },
    CarryStarted {
        target: EntityId,
        carrier: EntityId,
    },
    CarryStopped {
        target: EntityId,
        carrier: EntityId,
    },
    PropertyIndexApplied {
        target: EntityId,
        index: i32,
        count: u32,
    },
    CountdownExpired {
        timer: EntityId,
    },
    Victory {
        count: u32,
    },
    Defeat,
}

impl GameEvent {
    /// Events that end the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Victory { .. } | Self::Defeat)
    }
}
