use cogtask_core::{Effect, Effects, Engine, Phase};
use cogtask_timing::{ManualTimer, Scheduler, Timer, TimerId, TimerQueue};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Aborted,
}

type CompletionSink<O> = Box<dyn FnOnce(O)>;
type AbortSink = Box<dyn FnOnce()>;

/// Drives one engine against a clock and a host scheduler.
///
/// The runner owns every timer it registers. Completion and abort both cancel
/// all of them, so a stale callback can never reach the engine, and the
/// completion sink is invoked at most once.
pub struct TaskRunner<G, T, S = TimerQueue<<G as Engine>::Event>>
where
    G: Engine,
    T: Timer,
    S: Scheduler<G::Event>,
{
    engine: G,
    timer: T,
    scheduler: S,
    pending: Vec<TimerId>,
    status: RunStatus,
    started_at: Option<u64>,
    on_complete: Option<CompletionSink<G::Output>>,
    on_abort: Option<AbortSink>,
    fx: Effects<G::Event, G::Output>,
}

impl<G, T> TaskRunner<G, T>
where
    G: Engine,
    T: Timer,
{
    pub fn new(engine: G, timer: T) -> Self {
        Self::with_scheduler(engine, timer, TimerQueue::new())
    }
}

impl<G, T, S> TaskRunner<G, T, S>
where
    G: Engine,
    T: Timer,
    S: Scheduler<G::Event>,
{
    pub fn with_scheduler(engine: G, timer: T, scheduler: S) -> Self {
        Self {
            engine,
            timer,
            scheduler,
            pending: Vec::new(),
            status: RunStatus::Idle,
            started_at: None,
            on_complete: None,
            on_abort: None,
            fx: Effects::new(),
        }
    }

    pub fn on_complete(mut self, sink: impl FnOnce(G::Output) + 'static) -> Self {
        self.on_complete = Some(Box::new(sink));
        self
    }

    pub fn on_abort(mut self, sink: impl FnOnce() + 'static) -> Self {
        self.on_abort = Some(Box::new(sink));
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn engine(&self) -> &G {
        &self.engine
    }

    pub fn phase(&self) -> G::Phase {
        self.engine.phase()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Number of timers registered by this run and not yet fired or cancelled.
    pub fn pending_timers(&self) -> usize {
        self.pending.len()
    }

    /// Earliest deadline among this run's own timers.
    pub fn next_deadline(&self) -> Option<u64> {
        self.earliest_owned().map(|(_, deadline)| deadline)
    }

    /// Clock reading when `start` was called.
    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn start(&mut self) {
        if self.status != RunStatus::Idle {
            warn!(task = %G::KIND, status = ?self.status, "start ignored");
            return;
        }
        let now = self.timer.now();
        self.status = RunStatus::Running;
        self.started_at = Some(now);
        info!(task = %G::KIND, "task started");
        self.engine.start(now, &mut self.fx);
        self.apply(now);
        self.poll();
    }

    /// Delivers participant input. Timers already due fire first, so the
    /// engine sees events in clock order.
    ///
    /// Returns `false` when the run is not active.
    pub fn input(&mut self, input: G::Input) -> bool {
        self.poll();
        if self.status != RunStatus::Running {
            debug!(task = %G::KIND, status = ?self.status, "input dropped");
            return false;
        }
        let now = self.timer.now();
        if !self.engine.phase().allows_input() {
            debug!(task = %G::KIND, phase = ?self.engine.phase(), "input outside response phase");
        }
        self.engine.input(now, input, &mut self.fx);
        self.apply(now);
        self.poll();
        true
    }

    /// Fires every owned timer due at the current clock reading. Each event is
    /// dispatched with its own deadline as `now`. Timers registered by other
    /// runs on a shared scheduler are left in place.
    pub fn poll(&mut self) -> usize {
        let now = self.timer.now();
        let mut fired = 0;
        while self.status == RunStatus::Running {
            let Some((pos, deadline)) = self.earliest_owned() else {
                break;
            };
            if deadline > now {
                break;
            }
            let id = self.pending.swap_remove(pos);
            let Some(due) = self.scheduler.take(id) else {
                warn!(task = %G::KIND, timer = %id, "owned timer vanished from the scheduler");
                continue;
            };
            fired += 1;
            self.engine.timer(due.deadline, due.event, &mut self.fx);
            self.apply(due.deadline);
        }
        fired
    }

    /// Position in `pending` and deadline of the next owned timer. Equal
    /// deadlines resolve in registration order.
    fn earliest_owned(&self) -> Option<(usize, u64)> {
        self.pending
            .iter()
            .enumerate()
            .filter_map(|(pos, id)| self.scheduler.deadline_of(*id).map(|d| (pos, d, *id)))
            .min_by_key(|(_, deadline, id)| (*deadline, *id))
            .map(|(pos, deadline, _)| (pos, deadline))
    }

    /// Stops the run without producing a result.
    pub fn abort(&mut self) {
        if !matches!(self.status, RunStatus::Idle | RunStatus::Running) {
            return;
        }
        self.cancel_pending();
        self.status = RunStatus::Aborted;
        self.on_complete = None;
        info!(task = %G::KIND, "task aborted");
        if let Some(sink) = self.on_abort.take() {
            sink();
        }
    }

    fn apply(&mut self, now: u64) {
        let mut fx = std::mem::take(&mut self.fx);
        for effect in fx.drain() {
            if self.status != RunStatus::Running {
                break;
            }
            match effect {
                Effect::Schedule { delay, event } => {
                    let deadline = now.saturating_add(delay.as_nanos() as u64);
                    let id = self.scheduler.schedule(deadline, event);
                    debug!(task = %G::KIND, timer = %id, ?event, deadline, "scheduled");
                    self.pending.push(id);
                }
                Effect::CancelAll => self.cancel_pending(),
                Effect::Complete(output) => {
                    self.cancel_pending();
                    self.status = RunStatus::Completed;
                    let elapsed_ms = self
                        .started_at
                        .map(|t| now.saturating_sub(t) / 1_000_000)
                        .unwrap_or_default();
                    info!(task = %G::KIND, elapsed_ms, "task completed");
                    if let Some(sink) = self.on_complete.take() {
                        sink(output);
                    }
                }
            }
        }
        self.fx = fx;
    }

    fn cancel_pending(&mut self) {
        for id in self.pending.drain(..) {
            self.scheduler.cancel(id);
        }
    }
}

impl<G, S> TaskRunner<G, ManualTimer, S>
where
    G: Engine,
    S: Scheduler<G::Event>,
{
    /// Moves virtual time forward and fires whatever came due.
    pub fn advance_ms(&mut self, ms: u64) -> usize {
        self.timer.advance_ms(ms);
        self.poll()
    }

    /// Jumps virtual time to the next owned deadline. Returns `false` when
    /// nothing is scheduled.
    pub fn advance_to_next(&mut self) -> bool {
        match self.next_deadline() {
            Some(deadline) => {
                if deadline > self.timer.now() {
                    self.timer.set(deadline);
                }
                self.poll();
                true
            }
            None => false,
        }
    }

    /// Runs timers until the run ends or is left waiting for input.
    pub fn run_until_idle(&mut self) {
        while self.is_running() && self.advance_to_next() {}
    }
}

impl<G, T, S> Drop for TaskRunner<G, T, S>
where
    G: Engine,
    T: Timer,
    S: Scheduler<G::Event>,
{
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
