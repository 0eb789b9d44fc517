pub mod arena;
pub mod checkpoint;
pub mod constants;
pub mod error;
pub mod events;
pub mod geometry;
pub mod reward;
pub mod rng;
pub mod rules;
pub mod scenario;
pub mod schedule;
pub mod sensing;
pub mod sim;
pub mod tape;
pub mod target;
pub mod verify;
pub mod waypoint;

pub use error::{EpisodeRule, ScenarioError, VerifyError};
pub use scenario::Scenario;
pub use sim::{ActionPair, LiveEpisode, StepOutcome};
pub use verify::{verify_tape, VerificationJournal};
