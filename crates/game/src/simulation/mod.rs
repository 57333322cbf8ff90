mod command;
mod state;
mod tick;

pub use command::{
    Command, CommandDispatcher, CommandKind, CommandSource, DeferredCommand, Dispatch,
};
pub use state::WorldState;
pub use tick::{FixedTimestep, Simulation, TickReport};
