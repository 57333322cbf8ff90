use crate::authority::{EntityId, NodeId};

pub type Result<T> = std::result::Result<T, AuthorityError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthorityError {
    #[error("entity {0} not found")]
    NotFound(EntityId),
    #[error("entity {entity} has no property `{key}`")]
    PropertyNotFound { entity: EntityId, key: &'static str },
    #[error("node {node} lacks the required authority over entity {entity}")]
    Unauthorized { node: NodeId, entity: EntityId },
    #[error("node {writer} is not the state authority of entity {entity}")]
    AuthorityViolation { writer: NodeId, entity: EntityId },
    #[error("entity {target} is already claimed by {claimant}")]
    AlreadyClaimed { target: EntityId, claimant: EntityId },
    #[error("entity {0} is already free")]
    AlreadyFree(EntityId),
    #[error("entity {0} cannot be carried")]
    NotCarryable(EntityId),
    #[error("entity {0} is not claimed")]
    NotClaimed(EntityId),
    #[error("movement of entity {0} is obstructed")]
    Obstructed(EntityId),
    #[error("index {index} outside 0..={max}")]
    InvalidIndex { index: i32, max: i32 },
    #[error("property `{key}` holds a different type")]
    TypeMismatch { key: &'static str },
    #[error("session is full ({max} participants)")]
    SessionFull { max: usize },
    #[error("entity {0} is already registered")]
    DuplicateEntity(EntityId),
    #[error("no entity ids left to allocate")]
    IdsExhausted,
    #[error("direction must be finite and non-zero")]
    InvalidDirection,
}

impl AuthorityError {
    /// Errors that leave state untouched and are expected during normal play.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::AlreadyClaimed { .. }
                | Self::AlreadyFree(_)
                | Self::NotClaimed(_)
                | Self::Obstructed(_)
                | Self::InvalidDirection
        )
    }
}
