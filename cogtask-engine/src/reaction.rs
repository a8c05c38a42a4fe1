use cogtask_core::random::jitter_ms;
use cogtask_core::stats::mean;
use cogtask_core::trial::{latency_between, ns_to_whole_ms};
use cogtask_core::{ConfigError, Effects, Engine, Phase, TaskKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ReactionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionPhase {
    #[default]
    Idle,
    /// Foreperiod: the stimulus is off and a press counts as early.
    Waiting,
    /// Stimulus on.
    Ready,
    /// Showing the measured time.
    Feedback,
    /// Showing the "too early" message.
    Early,
    Done,
}

impl Phase for ReactionPhase {
    fn allows_input(&self) -> bool {
        matches!(self, ReactionPhase::Waiting | ReactionPhase::Ready)
    }

    fn is_finished(&self) -> bool {
        matches!(self, ReactionPhase::Done)
    }

    fn is_idle(&self) -> bool {
        matches!(self, ReactionPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionEvent {
    Go,
    NextAttempt,
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionInput {
    Press,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResult {
    pub raw_score: u64,
    pub trials: Vec<u64>,
    pub attempts: usize,
    pub early_clicks: u32,
    pub fastest: Option<u64>,
    pub slowest: Option<u64>,
    pub duration_ms: u64,
}

impl ReactionResult {
    fn from_trials(trials: Vec<u64>, early_clicks: u32, duration_ms: u64) -> Self {
        let as_f64: Vec<f64> = trials.iter().map(|&t| t as f64).collect();
        Self {
            raw_score: mean(&as_f64).map(|m| m.round() as u64).unwrap_or_default(),
            attempts: trials.len(),
            early_clicks,
            fastest: trials.iter().copied().min(),
            slowest: trials.iter().copied().max(),
            trials,
            duration_ms,
        }
    }
}

/// Simple reaction time: wait a random foreperiod, then press as fast as
/// possible once the stimulus turns on.
pub struct ReactionEngine<R: Rng> {
    config: ReactionConfig,
    rng: R,
    phase: ReactionPhase,
    trials: Vec<u64>,
    early_clicks: u32,
    session_start: u64,
    ready_at: Option<u64>,
    pending: Option<ReactionResult>,
}

type Fx = Effects<ReactionEvent, ReactionResult>;

impl<R: Rng> ReactionEngine<R> {
    pub fn new(config: ReactionConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rng,
            phase: ReactionPhase::Idle,
            trials: Vec::new(),
            early_clicks: 0,
            session_start: 0,
            ready_at: None,
            pending: None,
        })
    }

    pub fn trials(&self) -> &[u64] {
        &self.trials
    }

    pub fn early_clicks(&self) -> u32 {
        self.early_clicks
    }

    /// Most recent measured time, for feedback display.
    pub fn last_trial_ms(&self) -> Option<u64> {
        self.trials.last().copied()
    }

    fn begin_attempt(&mut self, fx: &mut Fx) {
        self.phase = ReactionPhase::Waiting;
        self.ready_at = None;
        let foreperiod = jitter_ms(&mut self.rng, self.config.foreperiod_range_ms);
        debug!(attempt = self.trials.len() + 1, foreperiod, "foreperiod scheduled");
        fx.schedule_ms(foreperiod, ReactionEvent::Go);
    }

    fn pause_then_retry(&mut self, phase: ReactionPhase, fx: &mut Fx) {
        self.phase = phase;
        fx.schedule_ms(self.config.feedback_ms, ReactionEvent::NextAttempt);
    }

    fn record(&mut self, now: u64, fx: &mut Fx) {
        let Some(latency) = self.ready_at.and_then(|at| latency_between(at, now)) else {
            warn!("response precedes stimulus onset, attempt discarded");
            self.pause_then_retry(ReactionPhase::Feedback, fx);
            return;
        };
        let ms = ns_to_whole_ms(latency.as_nanos() as u64);
        self.trials.push(ms);
        debug!(attempt = self.trials.len(), ms, "reaction recorded");

        if self.trials.len() >= self.config.attempts {
            let duration_ms = ns_to_whole_ms(now.saturating_sub(self.session_start));
            self.pending = Some(ReactionResult::from_trials(
                self.trials.clone(),
                self.early_clicks,
                duration_ms,
            ));
            self.phase = ReactionPhase::Feedback;
            fx.schedule_ms(self.config.completion_delay_ms, ReactionEvent::Finalize);
        } else {
            self.pause_then_retry(ReactionPhase::Feedback, fx);
        }
    }
}

impl<R: Rng> Engine for ReactionEngine<R> {
    type Phase = ReactionPhase;
    type Input = ReactionInput;
    type Event = ReactionEvent;
    type Output = ReactionResult;

    const KIND: TaskKind = TaskKind::ReactionTime;

    fn phase(&self) -> ReactionPhase {
        self.phase
    }

    fn start(&mut self, now: u64, fx: &mut Fx) {
        self.session_start = now;
        self.begin_attempt(fx);
    }

    fn input(&mut self, now: u64, input: ReactionInput, fx: &mut Fx) {
        let ReactionInput::Press = input;
        match self.phase {
            ReactionPhase::Waiting => {
                self.early_clicks += 1;
                debug!(early_clicks = self.early_clicks, "early press");
                fx.cancel_all();
                self.pause_then_retry(ReactionPhase::Early, fx);
            }
            ReactionPhase::Ready => self.record(now, fx),
            _ => {}
        }
    }

    fn timer(&mut self, now: u64, event: ReactionEvent, fx: &mut Fx) {
        match (event, self.phase) {
            (ReactionEvent::Go, ReactionPhase::Waiting) => {
                self.phase = ReactionPhase::Ready;
                self.ready_at = Some(now);
            }
            (ReactionEvent::NextAttempt, ReactionPhase::Feedback | ReactionPhase::Early) => {
                self.begin_attempt(fx);
            }
            (ReactionEvent::Finalize, ReactionPhase::Feedback) => {
                if let Some(result) = self.pending.take() {
                    self.phase = ReactionPhase::Done;
                    fx.complete(result);
                }
            }
            (event, phase) => debug!(?event, ?phase, "stale reaction event"),
        }
    }
}
