use cogtask_core::random::index;
use cogtask_core::trial::latency_between;
use cogtask_core::{ConfigError, Effects, Engine, Phase, TaskKind, Trial, TrialResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SymbolCodingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolCodingPhase {
    #[default]
    Idle,
    Awaiting,
    /// Brief correct/incorrect flash; keys are locked out.
    Feedback,
    Done,
}

impl Phase for SymbolCodingPhase {
    fn allows_input(&self) -> bool {
        matches!(self, SymbolCodingPhase::Awaiting)
    }

    fn is_finished(&self) -> bool {
        matches!(self, SymbolCodingPhase::Done)
    }

    fn is_idle(&self) -> bool {
        matches!(self, SymbolCodingPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolCodingEvent {
    Tick,
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolCodingInput {
    /// Number key, 1-based.
    Key(u8),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolCodingResult {
    pub raw_score: u32,
}

/// Symbol-digit coding under a time limit: each symbol maps to a number key,
/// score is the count of correct keys.
pub struct SymbolCodingEngine {
    config: SymbolCodingConfig,
    phase: SymbolCodingPhase,
    trials: Vec<Trial<usize>>,
    results: Vec<TrialResult<usize>>,
    current: usize,
    correct: u32,
    seconds_left: u64,
    last_feedback: Option<bool>,
}

type Fx = Effects<SymbolCodingEvent, SymbolCodingResult>;

impl SymbolCodingEngine {
    /// The symbol sequence is drawn up front; `rng` is not kept.
    pub fn new<R: Rng>(config: SymbolCodingConfig, mut rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let trials = (0..config.trial_count)
            .map(|i| Trial::new(i, index(&mut rng, config.symbols.len())))
            .collect();
        Ok(Self {
            seconds_left: config.duration_secs,
            config,
            phase: SymbolCodingPhase::Idle,
            trials,
            results: Vec::new(),
            current: 0,
            correct: 0,
            last_feedback: None,
        })
    }

    /// Symbol awaiting a key, as drawn from the key legend.
    pub fn current_symbol(&self) -> Option<&str> {
        if self.phase.is_finished() {
            return None;
        }
        let trial = self.trials.get(self.current)?;
        self.config.symbols.get(trial.kind).map(String::as_str)
    }

    pub fn legend(&self) -> &[String] {
        &self.config.symbols
    }

    pub fn seconds_left(&self) -> u64 {
        self.seconds_left
    }

    pub fn score(&self) -> u32 {
        self.correct
    }

    /// Whether the last key was correct, while its feedback is showing.
    pub fn feedback(&self) -> Option<bool> {
        (self.phase == SymbolCodingPhase::Feedback)
            .then_some(self.last_feedback)
            .flatten()
    }

    pub fn results(&self) -> &[TrialResult<usize>] {
        &self.results
    }

    fn finish(&mut self, fx: &mut Fx) {
        self.phase = SymbolCodingPhase::Done;
        info!(
            raw_score = self.correct,
            answered = self.results.len(),
            seconds_left = self.seconds_left,
            "symbol coding finished"
        );
        fx.complete(SymbolCodingResult {
            raw_score: self.correct,
        });
    }

    fn key(&mut self, now: u64, key: u8, fx: &mut Fx) {
        if key == 0 || key as usize > self.config.symbols.len() {
            debug!(key, "key outside the legend ignored");
            return;
        }
        let trial = self.trials[self.current].clone();
        let correct = key as usize == trial.kind + 1;
        if correct {
            self.correct += 1;
        }
        let latency = trial.onset_ns.and_then(|at| latency_between(at, now));
        self.results.push(TrialResult {
            trial,
            responded: true,
            latency,
            correct,
        });
        self.last_feedback = Some(correct);
        self.phase = SymbolCodingPhase::Feedback;
        fx.schedule_ms(self.config.feedback_ms, SymbolCodingEvent::Advance);
    }

    fn present(&mut self, now: u64) {
        self.phase = SymbolCodingPhase::Awaiting;
        self.trials[self.current].onset_ns = Some(now);
    }
}

impl Engine for SymbolCodingEngine {
    type Phase = SymbolCodingPhase;
    type Input = SymbolCodingInput;
    type Event = SymbolCodingEvent;
    type Output = SymbolCodingResult;

    const KIND: TaskKind = TaskKind::SymbolCoding;

    fn phase(&self) -> SymbolCodingPhase {
        self.phase
    }

    fn start(&mut self, now: u64, fx: &mut Fx) {
        self.seconds_left = self.config.duration_secs;
        self.present(now);
        fx.schedule_ms(1000, SymbolCodingEvent::Tick);
    }

    fn input(&mut self, now: u64, input: SymbolCodingInput, fx: &mut Fx) {
        let SymbolCodingInput::Key(key) = input;
        if self.phase == SymbolCodingPhase::Awaiting {
            self.key(now, key, fx);
        }
    }

    fn timer(&mut self, now: u64, event: SymbolCodingEvent, fx: &mut Fx) {
        if self.phase.is_finished() {
            return;
        }
        match event {
            SymbolCodingEvent::Tick => {
                self.seconds_left = self.seconds_left.saturating_sub(1);
                if self.seconds_left == 0 {
                    self.finish(fx);
                } else {
                    fx.schedule_ms(1000, SymbolCodingEvent::Tick);
                }
            }
            SymbolCodingEvent::Advance if self.phase == SymbolCodingPhase::Feedback => {
                self.current += 1;
                if self.current >= self.trials.len() {
                    self.finish(fx);
                } else {
                    self.present(now);
                }
            }
            SymbolCodingEvent::Advance => debug!(phase = ?self.phase, "stale advance"),
        }
    }
}
