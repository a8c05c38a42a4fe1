use cogtask_core::random::index;
use cogtask_core::{ConfigError, Effects, Engine, Phase, TaskKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::VisualMemoryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualMemoryPhase {
    #[default]
    Idle,
    Playback,
    Input,
    Success,
    Failed,
}

impl Phase for VisualMemoryPhase {
    fn allows_input(&self) -> bool {
        matches!(self, VisualMemoryPhase::Input)
    }

    fn is_finished(&self) -> bool {
        matches!(self, VisualMemoryPhase::Failed)
    }

    fn is_idle(&self) -> bool {
        matches!(self, VisualMemoryPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualMemoryEvent {
    Light,
    Unlight,
    NextLevel,
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualMemoryInput {
    Tap(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualMemoryResult {
    pub raw_score: usize,
    pub highest_level: usize,
    pub sequences: Vec<Vec<usize>>,
    pub failure_sequence: Option<Vec<usize>>,
    pub completed_levels: usize,
}

/// Sequence memory on a tile grid. The sequence grows by one tile per
/// completed level and the run ends at the first wrong tap.
pub struct VisualMemoryEngine<R: Rng> {
    config: VisualMemoryConfig,
    rng: R,
    phase: VisualMemoryPhase,
    level: usize,
    completed: usize,
    sequence: Vec<usize>,
    sequences: Vec<Vec<usize>>,
    step: usize,
    lit: Option<usize>,
    entered: Vec<usize>,
    pending: Option<VisualMemoryResult>,
}

type Fx = Effects<VisualMemoryEvent, VisualMemoryResult>;

impl<R: Rng> VisualMemoryEngine<R> {
    pub fn new(config: VisualMemoryConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            level: config.start_level,
            config,
            rng,
            phase: VisualMemoryPhase::Idle,
            completed: 0,
            sequence: Vec::new(),
            sequences: Vec::new(),
            step: 0,
            lit: None,
            entered: Vec::new(),
            pending: None,
        })
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Number of tiles on the grid.
    pub fn tiles(&self) -> usize {
        self.config.tiles()
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    /// Tile lit during playback.
    pub fn lit(&self) -> Option<usize> {
        self.lit
    }

    pub fn entered(&self) -> &[usize] {
        &self.entered
    }

    fn extend_and_play(&mut self, fx: &mut Fx) {
        let tiles = self.config.tiles();
        if self.sequence.is_empty() {
            for _ in 0..self.level {
                self.sequence.push(index(&mut self.rng, tiles));
            }
        } else {
            self.sequence.push(index(&mut self.rng, tiles));
        }
        self.sequences.push(self.sequence.clone());
        debug!(level = self.level, len = self.sequence.len(), "playback");
        self.step = 0;
        self.lit = None;
        self.entered.clear();
        self.phase = VisualMemoryPhase::Playback;
        fx.schedule_ms(self.config.gap_ms, VisualMemoryEvent::Light);
    }

    fn tap(&mut self, tile: usize, fx: &mut Fx) {
        if tile >= self.config.tiles() {
            debug!(tile, "tap outside the grid ignored");
            return;
        }
        let position = self.entered.len();
        self.entered.push(tile);

        if self.sequence.get(position) != Some(&tile) {
            let highest_level = if self.completed == 0 { 0 } else { self.level - 1 };
            info!(highest_level, "visual memory finished");
            self.pending = Some(VisualMemoryResult {
                raw_score: highest_level,
                highest_level,
                sequences: self.sequences.clone(),
                failure_sequence: Some(self.sequence.clone()),
                completed_levels: self.completed,
            });
            self.phase = VisualMemoryPhase::Failed;
            fx.schedule_ms(self.config.completion_delay_ms, VisualMemoryEvent::Finalize);
        } else if self.entered.len() == self.sequence.len() {
            self.completed += 1;
            self.phase = VisualMemoryPhase::Success;
            fx.schedule_ms(self.config.success_pause_ms, VisualMemoryEvent::NextLevel);
        }
    }
}

impl<R: Rng> Engine for VisualMemoryEngine<R> {
    type Phase = VisualMemoryPhase;
    type Input = VisualMemoryInput;
    type Event = VisualMemoryEvent;
    type Output = VisualMemoryResult;

    const KIND: TaskKind = TaskKind::VisualMemory;

    fn phase(&self) -> VisualMemoryPhase {
        self.phase
    }

    fn start(&mut self, _now: u64, fx: &mut Fx) {
        self.level = self.config.start_level;
        self.extend_and_play(fx);
    }

    fn input(&mut self, _now: u64, input: VisualMemoryInput, fx: &mut Fx) {
        let VisualMemoryInput::Tap(tile) = input;
        if self.phase == VisualMemoryPhase::Input {
            self.tap(tile, fx);
        }
    }

    fn timer(&mut self, _now: u64, event: VisualMemoryEvent, fx: &mut Fx) {
        match (event, self.phase) {
            (VisualMemoryEvent::Light, VisualMemoryPhase::Playback) => {
                self.lit = self.sequence.get(self.step).copied();
                fx.schedule_ms(self.config.flash_ms, VisualMemoryEvent::Unlight);
            }
            (VisualMemoryEvent::Unlight, VisualMemoryPhase::Playback) => {
                self.lit = None;
                self.step += 1;
                if self.step >= self.sequence.len() {
                    self.phase = VisualMemoryPhase::Input;
                } else {
                    fx.schedule_ms(self.config.gap_ms, VisualMemoryEvent::Light);
                }
            }
            (VisualMemoryEvent::NextLevel, VisualMemoryPhase::Success) => {
                self.level += 1;
                self.extend_and_play(fx);
            }
            (VisualMemoryEvent::Finalize, VisualMemoryPhase::Failed) => {
                if let Some(result) = self.pending.take() {
                    fx.complete(result);
                }
            }
            (event, phase) => debug!(?event, ?phase, "stale visual memory event"),
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

    type Runner = TaskRunner<VisualMemoryEngine<StdRng>, ManualTimer>;

    fn runner() -> (Runner, Rc<RefCell<Vec<VisualMemoryResult>>>) {
        let engine =
            VisualMemoryEngine::new(VisualMemoryConfig::default(), StdRng::seed_from_u64(4)).unwrap();
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();
        let r = TaskRunner::new(engine, ManualTimer::new())
            .on_complete(move |res| sink.borrow_mut().push(res));
        (r, out)
    }

    fn play_back(r: &mut Runner) -> Vec<usize> {
        let mut seen = Vec::new();
        while r.phase() == VisualMemoryPhase::Playback {
            r.advance_to_next();
            if let Some(tile) = r.engine().lit() {
                seen.push(tile);
            }
        }
        seen
    }

    #[test]
    fn playback_shows_each_tile_then_waits() {
        let (mut r, _) = runner();
        r.start();
        r.advance_ms(499);
        assert_eq!(r.engine().lit(), None);
        r.advance_ms(1);
        assert_eq!(r.engine().lit(), Some(r.engine().sequence()[0]));
        r.advance_ms(500);
        assert_eq!(r.phase(), VisualMemoryPhase::Input);
        assert_eq!(r.pending_timers(), 0);
    }

    #[test]
    fn sequence_grows_until_a_wrong_tap() {
        let (mut r, out) = runner();
        r.start();
        for level in 1..=3 {
            let seen = play_back(&mut r);
            assert_eq!(seen.len(), level);
            assert_eq!(seen, r.engine().sequence());
            // out-of-grid taps do not count
            r.input(VisualMemoryInput::Tap(9));
            for tile in seen {
                r.input(VisualMemoryInput::Tap(tile));
            }
            assert_eq!(r.phase(), VisualMemoryPhase::Success);
            r.advance_ms(1000);
        }

        let previous = r.engine().sequence().to_vec();
        let seen = play_back(&mut r);
        assert_eq!(&seen[..3], &previous[..]);
        let wrong = (seen[0] + 1) % 9;
        r.input(VisualMemoryInput::Tap(wrong));
        assert_eq!(r.phase(), VisualMemoryPhase::Failed);
        r.advance_ms(1500);

        let results = out.borrow();
        let res = &results[0];
        assert_eq!(res.highest_level, 3);
        assert_eq!(res.raw_score, 3);
        assert_eq!(res.completed_levels, 3);
        assert_eq!(res.sequences.len(), 4);
        assert_eq!(res.failure_sequence.as_deref(), Some(&seen[..]));
        for (k, seq) in res.sequences.iter().enumerate() {
            assert_eq!(seq.len(), k + 1);
        }
    }

    #[test]
    fn failing_the_first_level_scores_zero() {
        let (mut r, out) = runner();
        r.start();
        let seen = play_back(&mut r);
        r.input(VisualMemoryInput::Tap((seen[0] + 4) % 9));
        r.advance_ms(1500);
        assert_eq!(out.borrow()[0].highest_level, 0);
    }
}
