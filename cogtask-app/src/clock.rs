use cogtask_core::Engine;
use cogtask_engine::TaskRunner;
use cogtask_timing::{HighPrecisionTimer, ManualTimer, Scheduler, Timer};

/// How a host lets time pass for a run: virtual clocks jump straight to the
/// next deadline, live clocks sleep until it.
pub trait Clock: Timer + Sized {
    fn wait_ms<G, S>(runner: &mut TaskRunner<G, Self, S>, ms: u64)
    where
        G: Engine,
        S: Scheduler<G::Event>;

    /// Waits until the next owned deadline. Returns `false` when the run has
    /// nothing scheduled.
    fn step<G, S>(runner: &mut TaskRunner<G, Self, S>) -> bool
    where
        G: Engine,
        S: Scheduler<G::Event>,
    {
        let Some(deadline) = runner.next_deadline() else {
            return false;
        };
        let now = runner.timer().now();
        let ms = deadline.saturating_sub(now).div_ceil(1_000_000);
        Self::wait_ms(runner, ms);
        true
    }
}

impl Clock for ManualTimer {
    fn wait_ms<G, S>(runner: &mut TaskRunner<G, Self, S>, ms: u64)
    where
        G: Engine,
        S: Scheduler<G::Event>,
    {
        runner.advance_ms(ms);
    }
}

impl Clock for HighPrecisionTimer {
    fn wait_ms<G, S>(runner: &mut TaskRunner<G, Self, S>, ms: u64)
    where
        G: Engine,
        S: Scheduler<G::Event>,
    {
        let target = runner.timer().now() + ms * 1_000_000;
        loop {
            let wake = runner
                .next_deadline()
                .filter(|d| *d < target)
                .unwrap_or(target);
            runner.timer().sleep_until(wake);
            runner.poll();
            if wake >= target {
                break;
            }
        }
    }
}
