pub mod config;
pub mod digit_span;
pub mod fluency;
pub mod inhibition;
pub mod orientation;
pub mod outcome;
pub mod reaction;
pub mod runner;
pub mod stroop;
pub mod symbol_coding;
pub mod trails;
pub mod verbal_list;
pub mod visual_memory;

pub use config::BatteryConfig;
pub use digit_span::DigitSpanEngine;
pub use fluency::FluencyEngine;
pub use inhibition::InhibitionEngine;
pub use orientation::OrientationEngine;
pub use outcome::TaskOutcome;
pub use reaction::ReactionEngine;
pub use runner::{RunStatus, TaskRunner};
pub use stroop::StroopEngine;
pub use symbol_coding::SymbolCodingEngine;
pub use trails::TrailsEngine;
pub use verbal_list::VerbalListEngine;
pub use visual_memory::VisualMemoryEngine;
