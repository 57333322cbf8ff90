mod claim;
mod machine;

pub use claim::{CarryState, OwnershipClaim, Transition};
pub use machine::CarryController;
