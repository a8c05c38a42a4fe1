use chrono::{Local, NaiveDateTime};

/// Source of local civil time, used where ground truth depends on the calendar
/// rather than on elapsed time.
pub trait WallClock {
    fn local_now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedWallClock(pub NaiveDateTime);

impl WallClock for FixedWallClock {
    fn local_now(&self) -> NaiveDateTime {
        self.0
    }
}
