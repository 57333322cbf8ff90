pub mod authority;
pub mod carry;
pub mod config;
pub mod error;
pub mod event;
pub mod physics;
pub mod player;
pub mod property;
pub mod reconcile;
pub mod session;
pub mod simulation;
pub mod transform;

pub use authority::{EntityId, EntityKind, EntityRegistry, NodeId, SourceFilter};
pub use carry::{CarryController, CarryState, OwnershipClaim, Transition};
pub use config::{CarryConfig, PaintConfig, ParticipantConfig, SimulationConfig};
pub use error::{AuthorityError, Result};
pub use event::{EventQueue, GameEvent, PendingEvent};
pub use physics::{BodyFlags, BodyPhysics, PhysicsWorld};
pub use player::{Movement, MovementKind};
pub use property::{PropertyKey, PropertyStore, PropertyValue};
pub use reconcile::{Presenter, Reconciler};
pub use session::{Countdown, ParticipantSpawner, Session, SessionOutcome};
pub use simulation::{
    Command, CommandDispatcher, CommandKind, CommandSource, Dispatch, FixedTimestep, Simulation,
    TickReport, WorldState,
};
pub use transform::{Transform, TransformHierarchy};
