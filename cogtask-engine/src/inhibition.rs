use cogtask_core::random::{jitter_ms, shuffle};
use cogtask_core::stats::{median, std_dev};
use cogtask_core::trial::{latency_between, ns_to_ms};
use cogtask_core::{ConfigError, Effects, Engine, Phase, TaskKind, Trial, TrialResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{InhibitionConfig, InhibitionScoring};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stimulus {
    #[serde(rename = "go")]
    Go,
    #[serde(rename = "nogo")]
    NoGo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InhibitionPhase {
    #[default]
    Idle,
    Fixation,
    Stimulus,
    InterTrial,
    Done,
}

impl Phase for InhibitionPhase {
    fn allows_input(&self) -> bool {
        matches!(self, InhibitionPhase::Stimulus)
    }

    fn is_finished(&self) -> bool {
        matches!(self, InhibitionPhase::Done)
    }

    fn is_idle(&self) -> bool {
        matches!(self, InhibitionPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InhibitionEvent {
    StimulusOnset,
    WindowElapsed,
    NextTrial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InhibitionInput {
    Press,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InhibitionTrial {
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: Stimulus,
    /// Milliseconds from run start to stimulus onset.
    pub onset_ms: Option<f64>,
    pub responded: bool,
    pub rt_ms: Option<f64>,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InhibitionSummary {
    pub go_trials: usize,
    pub no_go_trials: usize,
    pub commission_errors: usize,
    pub omission_errors: usize,
    pub commission_rate: f64,
    pub omission_rate: f64,
    pub median_go_rt_ms: Option<f64>,
    pub go_rt_std_dev_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InhibitionResult {
    pub raw_score: u32,
    pub trials: Vec<InhibitionTrial>,
    pub summary: InhibitionSummary,
}

/// Builds the shuffled trial list: `round(total * go_proportion)` go trials,
/// the rest no-go.
pub fn build_trials<R: Rng>(config: &InhibitionConfig, rng: &mut R) -> Vec<Trial<Stimulus>> {
    let go = config.go_count().min(config.total_trials);
    let mut kinds: Vec<Stimulus> = (0..config.total_trials)
        .map(|i| if i < go { Stimulus::Go } else { Stimulus::NoGo })
        .collect();
    shuffle(&mut kinds, rng);
    kinds
        .into_iter()
        .enumerate()
        .map(|(i, kind)| Trial::new(i, kind))
        .collect()
}

fn rate(errors: usize, trials: usize) -> f64 {
    if trials == 0 {
        0.0
    } else {
        errors as f64 / trials as f64
    }
}

pub fn summarize(trials: &[InhibitionTrial]) -> InhibitionSummary {
    let go: Vec<_> = trials.iter().filter(|t| t.kind == Stimulus::Go).collect();
    let no_go: Vec<_> = trials.iter().filter(|t| t.kind == Stimulus::NoGo).collect();
    let commission_errors = no_go.iter().filter(|t| t.responded).count();
    let omission_errors = go.iter().filter(|t| !t.responded).count();
    let go_rts: Vec<f64> = go
        .iter()
        .filter(|t| t.responded)
        .filter_map(|t| t.rt_ms)
        .filter(|rt| rt.is_finite())
        .collect();

    InhibitionSummary {
        go_trials: go.len(),
        no_go_trials: no_go.len(),
        commission_errors,
        omission_errors,
        commission_rate: rate(commission_errors, no_go.len()),
        omission_rate: rate(omission_errors, go.len()),
        median_go_rt_ms: median(&go_rts),
        go_rt_std_dev_ms: std_dev(&go_rts),
    }
}

/// Heuristic 0..=100 score. Not a normed measure.
pub fn score(summary: &InhibitionSummary, scoring: &InhibitionScoring) -> u32 {
    let mut raw = 100.0
        - summary.commission_rate * scoring.commission_weight
        - summary.omission_rate * scoring.omission_weight;
    let too_fast = summary
        .median_go_rt_ms
        .is_some_and(|m| m < scoring.fast_guard_median_rt_ms);
    if too_fast && summary.commission_rate > scoring.fast_guard_commission_rate {
        raw -= scoring.fast_guard_penalty;
    }
    raw.round().clamp(0.0, 100.0) as u32
}

/// Go/no-go: press for the go stimulus, withhold for the no-go stimulus.
pub struct InhibitionEngine<R: Rng> {
    config: InhibitionConfig,
    rng: R,
    phase: InhibitionPhase,
    trials: Vec<Trial<Stimulus>>,
    results: Vec<TrialResult<Stimulus>>,
    index: usize,
    run_start: u64,
}

type Fx = Effects<InhibitionEvent, InhibitionResult>;

impl<R: Rng> InhibitionEngine<R> {
    pub fn new(config: InhibitionConfig, mut rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let trials = build_trials(&config, &mut rng);
        Ok(Self {
            config,
            rng,
            phase: InhibitionPhase::Idle,
            trials,
            results: Vec::new(),
            index: 0,
            run_start: 0,
        })
    }

    pub fn trials(&self) -> &[Trial<Stimulus>] {
        &self.trials
    }

    pub fn results(&self) -> &[TrialResult<Stimulus>] {
        &self.results
    }

    /// Stimulus on screen, if any.
    pub fn current_stimulus(&self) -> Option<Stimulus> {
        (self.phase == InhibitionPhase::Stimulus).then(|| self.trials[self.index].kind)
    }

    fn begin_trial(&mut self, fx: &mut Fx) {
        self.phase = InhibitionPhase::Fixation;
        let fixation = jitter_ms(&mut self.rng, self.config.fixation_range_ms);
        fx.schedule_ms(fixation, InhibitionEvent::StimulusOnset);
    }

    fn resolve(&mut self, latency: Option<std::time::Duration>, fx: &mut Fx) {
        let trial = self.trials[self.index].clone();
        let responded = latency.is_some();
        let correct = match trial.kind {
            Stimulus::Go => responded,
            Stimulus::NoGo => !responded,
        };
        debug!(trial = trial.index, kind = ?trial.kind, responded, correct, "trial resolved");
        self.results.push(TrialResult {
            trial,
            responded,
            latency,
            correct,
        });

        if self.index + 1 >= self.trials.len() {
            self.phase = InhibitionPhase::Done;
            let result = self.build_result();
            info!(
                raw_score = result.raw_score,
                commission_errors = result.summary.commission_errors,
                omission_errors = result.summary.omission_errors,
                "inhibition finished"
            );
            fx.complete(result);
        } else {
            self.phase = InhibitionPhase::InterTrial;
            let iti = jitter_ms(&mut self.rng, self.config.iti_range_ms);
            fx.schedule_ms(iti, InhibitionEvent::NextTrial);
        }
    }

    fn build_result(&self) -> InhibitionResult {
        let trials: Vec<InhibitionTrial> = self
            .results
            .iter()
            .map(|r| InhibitionTrial {
                id: r.trial.index,
                kind: r.trial.kind,
                onset_ms: r
                    .trial
                    .onset_ns
                    .map(|at| ns_to_ms(at.saturating_sub(self.run_start))),
                responded: r.responded,
                rt_ms: r.latency_ms(),
                correct: r.correct,
            })
            .collect();
        let summary = summarize(&trials);
        InhibitionResult {
            raw_score: score(&summary, &self.config.scoring),
            trials,
            summary,
        }
    }
}

impl<R: Rng> Engine for InhibitionEngine<R> {
    type Phase = InhibitionPhase;
    type Input = InhibitionInput;
    type Event = InhibitionEvent;
    type Output = InhibitionResult;

    const KIND: TaskKind = TaskKind::Inhibition;

    fn phase(&self) -> InhibitionPhase {
        self.phase
    }

    fn start(&mut self, now: u64, fx: &mut Fx) {
        self.run_start = now;
        self.begin_trial(fx);
    }

    fn input(&mut self, now: u64, input: InhibitionInput, fx: &mut Fx) {
        let InhibitionInput::Press = input;
        if self.phase != InhibitionPhase::Stimulus {
            return;
        }
        let onset = self.trials[self.index].onset_ns;
        let latency = onset.and_then(|at| latency_between(at, now));
        if latency.is_none() {
            warn!(trial = self.index, "press precedes stimulus onset, recorded as no response");
        }
        fx.cancel_all();
        self.resolve(latency, fx);
    }

    fn timer(&mut self, now: u64, event: InhibitionEvent, fx: &mut Fx) {
        match (event, self.phase) {
            (InhibitionEvent::StimulusOnset, InhibitionPhase::Fixation) => {
                self.phase = InhibitionPhase::Stimulus;
                self.trials[self.index].onset_ns = Some(now);
                fx.schedule_ms(self.config.stimulus_window_ms, InhibitionEvent::WindowElapsed);
            }
            (InhibitionEvent::WindowElapsed, InhibitionPhase::Stimulus) => self.resolve(None, fx),
            (InhibitionEvent::NextTrial, InhibitionPhase::InterTrial) => {
                self.index += 1;
                self.begin_trial(fx);
            }
            (event, phase) => debug!(?event, ?phase, "stale inhibition event"),
        }
    }
}
