mod id;
mod model;
mod registry;

pub use id::{EntityId, EntityKind, NodeId};
pub use model::{SourceFilter, can_issue_input, is_state_authority, satisfies};
pub use registry::{EntityRecord, EntityRegistry};
