mod movement;

pub use movement::{BasicMovement, ExtendedMovement, Movement, MovementKind};
