mod body;
mod world;

pub use body::{BodyFlags, BodyPhysics};
pub use world::PhysicsWorld;
