pub mod engine;
pub mod error;
pub mod phase;
pub mod random;
pub mod stats;
pub mod trial;

pub use engine::{Effect, Effects, Engine, TaskKind};
pub use error::ConfigError;
pub use phase::Phase;
pub use trial::{Trial, TrialResult};
