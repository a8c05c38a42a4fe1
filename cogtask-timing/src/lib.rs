pub mod queue;
pub mod timer;
pub mod wall;

pub use queue::{Fired, Scheduler, TimerId, TimerQueue};
pub use timer::{HighPrecisionTimer, ManualTimer, Timer};
pub use wall::{FixedWallClock, SystemWallClock, WallClock};
