use anyhow::{Context, Result};
use cogtask_core::{Engine, TaskKind};
use cogtask_engine::{
    BatteryConfig, DigitSpanEngine, FluencyEngine, InhibitionEngine, OrientationEngine,
    ReactionEngine, StroopEngine, SymbolCodingEngine, TaskOutcome, TaskRunner, TrailsEngine,
    VerbalListEngine, VisualMemoryEngine,
};
use cogtask_timing::{HighPrecisionTimer, ManualTimer, SystemWallClock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::{env, fs};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::participant::Participant;

type Slot = Rc<RefCell<Option<TaskOutcome>>>;

/// Runs the configured battery with a simulated participant and prints the
/// collected results as JSON.
pub struct App {
    config: BatteryConfig,
    realtime: bool,
}

impl App {
    /// Configuration comes from the first positional argument or
    /// `COGTASK_CONFIG`. `--realtime` or `COGTASK_REALTIME=1` sleeps through
    /// every delay instead of jumping a virtual clock. `COGTASK_SEED` overrides
    /// the file's seed.
    pub fn new() -> Result<Self> {
        let mut realtime = env_flag("COGTASK_REALTIME");
        let mut path = None;
        for arg in env::args().skip(1) {
            if arg == "--realtime" {
                realtime = true;
            } else {
                path = Some(PathBuf::from(arg));
            }
        }
        let path = path.or_else(|| env::var_os("COGTASK_CONFIG").map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("reading battery config {}", path.display()))?;
                BatteryConfig::from_json_str(&raw)
                    .with_context(|| format!("parsing battery config {}", path.display()))?
            }
            None => BatteryConfig::default(),
        };

        if let Ok(seed) = env::var("COGTASK_SEED") {
            let seed = seed
                .parse()
                .with_context(|| format!("COGTASK_SEED must be an unsigned integer, got {seed:?}"))?;
            config.seed = Some(seed);
        }

        Ok(Self { config, realtime })
    }

    pub fn run(self) -> Result<()> {
        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        info!(
            seed,
            realtime = self.realtime,
            tasks = self.config.order.len(),
            "starting battery"
        );

        let outcomes = if self.realtime {
            self.run_battery(HighPrecisionTimer::new, seed)?
        } else {
            self.run_battery(ManualTimer::new, seed)?
        };

        let json = serde_json::to_string_pretty(&outcomes).context("serializing results")?;
        println!("{json}");
        Ok(())
    }

    fn run_battery<T: Clock + 'static>(&self, timer: impl Fn() -> T, seed: u64) -> Result<Vec<TaskOutcome>> {
        let mut participant = Participant::new(StdRng::seed_from_u64(seed));
        let mut outcomes = Vec::with_capacity(self.config.order.len());
        for (i, kind) in self.config.order.iter().copied().enumerate() {
            let rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64 + 1));
            match self.run_task(kind, rng, timer(), &mut participant)? {
                Some(outcome) => {
                    info!(task = kind.label(), "task finished");
                    outcomes.push(outcome);
                }
                None => warn!(task = kind.label(), "task produced no result"),
            }
        }
        Ok(outcomes)
    }

    fn run_task<T: Clock + 'static>(
        &self,
        kind: TaskKind,
        rng: StdRng,
        timer: T,
        p: &mut Participant,
    ) -> Result<Option<TaskOutcome>> {
        let c = &self.config;
        let slot = Slot::default();
        match kind {
            TaskKind::ReactionTime => {
                let engine = ReactionEngine::new(c.reaction.clone(), rng)?;
                execute(engine, timer, &slot, |r| p.reaction(r));
            }
            TaskKind::Inhibition => {
                let engine = InhibitionEngine::new(c.inhibition.clone(), rng)?;
                execute(engine, timer, &slot, |r| p.inhibition(r));
            }
            TaskKind::Trails => {
                let engine = TrailsEngine::new(c.trails.clone())?;
                execute(engine, timer, &slot, |r| p.trails(r));
            }
            TaskKind::SymbolCoding => {
                let engine = SymbolCodingEngine::new(c.symbol_coding.clone(), rng)?;
                execute(engine, timer, &slot, |r| p.symbol_coding(r));
            }
            TaskKind::DigitSpan => {
                let engine = DigitSpanEngine::new(c.digit_span.clone(), rng)?;
                execute(engine, timer, &slot, |r| p.digit_span(r));
            }
            TaskKind::VisualMemory => {
                let engine = VisualMemoryEngine::new(c.visual_memory.clone(), rng)?;
                execute(engine, timer, &slot, |r| p.visual_memory(r));
            }
            TaskKind::Fluency => {
                let engine = FluencyEngine::new(c.fluency.clone())?;
                execute(engine, timer, &slot, |r| p.fluency(r));
            }
            TaskKind::Orientation => {
                let engine = OrientationEngine::new(SystemWallClock);
                execute(engine, timer, &slot, |r| p.orientation(r));
            }
            TaskKind::Stroop => {
                let engine = StroopEngine::new(c.stroop.clone(), rng)?;
                execute(engine, timer, &slot, |r| p.stroop(r));
            }
            TaskKind::VerbalList => {
                let engine = VerbalListEngine::new(c.verbal_list.clone())?;
                execute(engine, timer, &slot, |r| p.verbal_list(r));
            }
        }
        let outcome = slot.borrow_mut().take();
        Ok(outcome)
    }
}

/// Runs one engine to completion, storing its result in `slot`. A run the
/// driver leaves unfinished is aborted.
fn execute<G, T>(engine: G, timer: T, slot: &Slot, drive: impl FnOnce(&mut TaskRunner<G, T>))
where
    G: Engine + 'static,
    G::Output: Into<TaskOutcome>,
    T: Clock + 'static,
{
    let sink = Rc::clone(slot);
    let mut runner = TaskRunner::new(engine, timer)
        .on_complete(move |result: G::Output| *sink.borrow_mut() = Some(result.into()));
    drive(&mut runner);
    if runner.is_running() {
        warn!(task = G::KIND.label(), "driver stopped early, aborting run");
        runner.abort();
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
