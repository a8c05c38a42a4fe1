use cogtask_core::random::index;
use cogtask_core::trial::{latency_between, duration_ms};
use cogtask_core::{ConfigError, Effects, Engine, Phase, TaskKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::StroopConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StroopColor {
    Red,
    Blue,
    Green,
    Yellow,
}

impl StroopColor {
    pub const ALL: [StroopColor; 4] = [
        StroopColor::Red,
        StroopColor::Blue,
        StroopColor::Green,
        StroopColor::Yellow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StroopColor::Red => "RED",
            StroopColor::Blue => "BLUE",
            StroopColor::Green => "GREEN",
            StroopColor::Yellow => "YELLOW",
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            StroopColor::Red => "#ef4444",
            StroopColor::Blue => "#3b82f6",
            StroopColor::Green => "#22c55e",
            StroopColor::Yellow => "#eab308",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StroopPhase {
    #[default]
    Idle,
    Presenting,
    Done,
}

impl Phase for StroopPhase {
    fn allows_input(&self) -> bool {
        matches!(self, StroopPhase::Presenting)
    }

    fn is_finished(&self) -> bool {
        matches!(self, StroopPhase::Done)
    }

    fn is_idle(&self) -> bool {
        matches!(self, StroopPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StroopEvent {
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StroopInput {
    Answer(StroopColor),
}

/// Word shown in an ink colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StroopStimulus {
    pub word: StroopColor,
    pub ink: StroopColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StroopTrial {
    pub word: StroopColor,
    pub ink: StroopColor,
    pub response: StroopColor,
    pub correct: bool,
    pub rt_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StroopResult {
    pub raw_score: u32,
    pub rounds_completed: usize,
    pub correct_count: usize,
    pub trials: Vec<StroopTrial>,
}

/// Draws a word and an ink uniformly. A coinciding pair is shifted to the
/// next ink with probability `shift_probability`.
pub fn draw_stimulus<R: Rng>(rng: &mut R, shift_probability: f64) -> StroopStimulus {
    let colors = StroopColor::ALL;
    let word = index(rng, colors.len());
    let mut ink = index(rng, colors.len());
    if ink == word && rng.random_bool(shift_probability) {
        ink = (ink + 1) % colors.len();
    }
    StroopStimulus {
        word: colors[word],
        ink: colors[ink],
    }
}

/// Colour-word interference: answer the ink colour, not the word. Correct
/// answers earn more the faster the run goes.
pub struct StroopEngine<R: Rng> {
    config: StroopConfig,
    rng: R,
    phase: StroopPhase,
    seconds_left: u64,
    presented: usize,
    current: Option<(StroopStimulus, u64)>,
    score: u32,
    trials: Vec<StroopTrial>,
}

type Fx = Effects<StroopEvent, StroopResult>;

impl<R: Rng> StroopEngine<R> {
    pub fn new(config: StroopConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            seconds_left: config.duration_secs,
            config,
            rng,
            phase: StroopPhase::Idle,
            presented: 0,
            current: None,
            score: 0,
            trials: Vec::new(),
        })
    }

    pub fn current(&self) -> Option<StroopStimulus> {
        self.current.map(|(stimulus, _)| stimulus)
    }

    /// 1-based round on screen.
    pub fn round(&self) -> usize {
        self.presented
    }

    pub fn seconds_left(&self) -> u64 {
        self.seconds_left
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    fn next_round(&mut self, now: u64, fx: &mut Fx) {
        if self.presented >= self.config.rounds {
            self.finish(fx);
            return;
        }
        let stimulus = draw_stimulus(&mut self.rng, self.config.incongruent_shift_probability);
        self.presented += 1;
        debug!(round = self.presented, word = stimulus.word.name(), ink = stimulus.ink.name(), "round");
        self.current = Some((stimulus, now));
    }

    fn answer(&mut self, now: u64, response: StroopColor, fx: &mut Fx) {
        let Some((stimulus, onset)) = self.current.take() else {
            return;
        };
        let correct = response == stimulus.ink;
        if correct {
            let seconds = u32::try_from(self.seconds_left).unwrap_or(u32::MAX);
            let bonus = self.config.points_per_second_left.saturating_mul(seconds);
            self.score = self
                .score
                .saturating_add(self.config.correct_points)
                .saturating_add(bonus);
        } else {
            self.score = self.score.saturating_sub(self.config.incorrect_penalty);
        }
        self.trials.push(StroopTrial {
            word: stimulus.word,
            ink: stimulus.ink,
            response,
            correct,
            rt_ms: latency_between(onset, now).map(duration_ms),
        });
        self.next_round(now, fx);
    }

    fn finish(&mut self, fx: &mut Fx) {
        self.phase = StroopPhase::Done;
        self.current = None;
        let result = StroopResult {
            raw_score: self.score,
            rounds_completed: self.trials.len(),
            correct_count: self.trials.iter().filter(|t| t.correct).count(),
            trials: std::mem::take(&mut self.trials),
        };
        info!(
            raw_score = result.raw_score,
            rounds = result.rounds_completed,
            seconds_left = self.seconds_left,
            "stroop finished"
        );
        fx.complete(result);
    }
}

impl<R: Rng> Engine for StroopEngine<R> {
    type Phase = StroopPhase;
    type Input = StroopInput;
    type Event = StroopEvent;
    type Output = StroopResult;

    const KIND: TaskKind = TaskKind::Stroop;

    fn phase(&self) -> StroopPhase {
        self.phase
    }

    fn start(&mut self, now: u64, fx: &mut Fx) {
        self.phase = StroopPhase::Presenting;
        self.seconds_left = self.config.duration_secs;
        fx.schedule_ms(1000, StroopEvent::Tick);
        self.next_round(now, fx);
    }

    fn input(&mut self, now: u64, input: StroopInput, fx: &mut Fx) {
        let StroopInput::Answer(color) = input;
        if self.phase == StroopPhase::Presenting {
            self.answer(now, color, fx);
        }
    }

    fn timer(&mut self, _now: u64, event: StroopEvent, fx: &mut Fx) {
        let StroopEvent::Tick = event;
        if self.phase != StroopPhase::Presenting {
            return;
        }
        self.seconds_left = self.seconds_left.saturating_sub(1);
        if self.seconds_left == 0 {
            self.finish(fx);
        } else {
            fx.schedule_ms(1000, StroopEvent::Tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TaskRunner;
    use cogtask_timing::ManualTimer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Runner = TaskRunner<StroopEngine<StdRng>, ManualTimer>;

    fn runner() -> (Runner, Rc<RefCell<Vec<StroopResult>>>) {
        let engine = StroopEngine::new(StroopConfig::default(), StdRng::seed_from_u64(8)).unwrap();
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();
        let r = TaskRunner::new(engine, ManualTimer::new())
            .on_complete(move |res| sink.borrow_mut().push(res));
        (r, out)
    }

    fn wrong(ink: StroopColor) -> StroopColor {
        StroopColor::ALL
            .into_iter()
            .find(|c| *c != ink)
            .unwrap_or(StroopColor::Red)
    }

    #[test]
    fn coinciding_pairs_are_always_shifted_at_probability_one() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..500 {
            let s = draw_stimulus(&mut rng, 1.0);
            assert_ne!(s.word, s.ink);
        }
    }

    #[test]
    fn scoring_rewards_speed_and_floors_at_zero() {
        let (mut r, out) = runner();
        r.start();

        // wrong answer at zero score stays at zero
        let ink = r.engine().current().unwrap().ink;
        r.input(StroopInput::Answer(wrong(ink)));
        assert_eq!(r.engine().score(), 0);

        // correct at 30 s left: 100 + 60
        let ink = r.engine().current().unwrap().ink;
        r.input(StroopInput::Answer(ink));
        assert_eq!(r.engine().score(), 160);

        r.advance_ms(5_000);
        assert_eq!(r.engine().seconds_left(), 25);
        let ink = r.engine().current().unwrap().ink;
        r.input(StroopInput::Answer(ink));
        assert_eq!(r.engine().score(), 160 + 150);

        let ink = r.engine().current().unwrap().ink;
        r.input(StroopInput::Answer(wrong(ink)));
        assert_eq!(r.engine().score(), 260);

        for _ in 4..15 {
            let ink = r.engine().current().unwrap().ink;
            r.input(StroopInput::Answer(ink));
        }
        let results = out.borrow();
        let res = &results[0];
        assert_eq!(res.rounds_completed, 15);
        assert_eq!(res.correct_count, 13);
        assert_eq!(res.raw_score, 260 + 11 * 150);
        assert_eq!(res.trials[2].rt_ms, Some(5000.0));
        assert_eq!(r.pending_timers(), 0);
    }

    #[test]
    fn oversized_point_values_saturate() {
        let config = StroopConfig {
            correct_points: u32::MAX - 10,
            points_per_second_left: u32::MAX,
            ..StroopConfig::default()
        };
        let engine = StroopEngine::new(config, StdRng::seed_from_u64(8)).unwrap();
        let mut r = TaskRunner::new(engine, ManualTimer::new());
        r.start();
        for _ in 0..2 {
            let ink = r.engine().current().unwrap().ink;
            r.input(StroopInput::Answer(ink));
        }
        assert_eq!(r.engine().score(), u32::MAX);
    }

    #[test]
    fn countdown_ends_the_run() {
        let (mut r, out) = runner();
        r.start();
        r.advance_ms(30_000);
        let results = out.borrow();
        assert_eq!(results[0].rounds_completed, 0);
        assert_eq!(results[0].raw_score, 0);
    }
}
