mod countdown;
mod outcome;
mod spawner;

pub use countdown::Countdown;
pub use outcome::{Session, SessionOutcome};
pub use spawner::{Participant, ParticipantSpawner};
