use chrono::{Datelike, NaiveDateTime, Timelike};
use cogtask_core::Phase;
use cogtask_engine::TaskRunner;
use cogtask_engine::digit_span::{
    DigitSpanEngine, DigitSpanInput, DigitSpanPhase, SpanMode, expected_answer,
};
use cogtask_engine::fluency::{FluencyEngine, FluencyInput};
use cogtask_engine::inhibition::{InhibitionEngine, InhibitionInput, InhibitionPhase, Stimulus};
use cogtask_engine::orientation::{
    MONTHS, OrientationAnswers, OrientationEngine, OrientationInput, Season, TimeOfDay, WEEKDAYS,
};
use cogtask_engine::reaction::{ReactionEngine, ReactionInput, ReactionPhase};
use cogtask_engine::stroop::{StroopColor, StroopEngine, StroopInput};
use cogtask_engine::symbol_coding::{SymbolCodingEngine, SymbolCodingInput};
use cogtask_engine::trails::{TRAIL, TrailsEngine, TrailsInput};
use cogtask_engine::verbal_list::{VerbalListEngine, VerbalListInput, VerbalListPhase};
use cogtask_engine::visual_memory::{VisualMemoryEngine, VisualMemoryInput, VisualMemoryPhase};
use cogtask_timing::WallClock;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::clock::Clock;

/// Words the simulated participant offers in the fluency task, in order.
/// Includes a repeat, a plural and a non-member.
const FLUENCY_WORDS: &[&str] = &[
    "dog", "Cat", "horse", "cats", "lion", "Dog", "tiger", "zebra", "unicorn", "eagle", "shark",
    "rabbit", "giraffe", "table", "wolves", "owl",
];

/// Scripted participant with a stable skill profile: response times drawn
/// from a fixed band, a hit rate, and memory capacities.
pub struct Participant {
    rng: StdRng,
    accuracy: f64,
    rt_ms: (u64, u64),
    forward_capacity: usize,
    backward_capacity: usize,
    visual_capacity: usize,
    /// Words recalled on the first list trial. Each repeat adds two.
    list_capacity: usize,
}

impl Participant {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            accuracy: 0.9,
            rt_ms: (230, 420),
            forward_capacity: 6,
            backward_capacity: 5,
            visual_capacity: 7,
            list_capacity: 6,
        }
    }

    fn rt(&mut self) -> u64 {
        self.rng.random_range(self.rt_ms.0..=self.rt_ms.1)
    }

    fn hits(&mut self) -> bool {
        self.rng.random_bool(self.accuracy)
    }

    fn finish<G, T>(runner: &mut TaskRunner<G, T>)
    where
        G: cogtask_core::Engine,
        T: Clock,
    {
        while runner.is_running() && T::step(runner) {}
    }

    pub fn reaction<T: Clock>(&mut self, runner: &mut TaskRunner<ReactionEngine<StdRng>, T>) {
        runner.start();
        while runner.is_running() {
            if runner.phase() == ReactionPhase::Ready {
                let rt = self.rt();
                T::wait_ms(runner, rt);
                runner.input(ReactionInput::Press);
            } else if !T::step(runner) {
                break;
            }
        }
    }

    pub fn inhibition<T: Clock>(&mut self, runner: &mut TaskRunner<InhibitionEngine<StdRng>, T>) {
        runner.start();
        while runner.is_running() {
            if runner.phase() == InhibitionPhase::Stimulus {
                let press = match runner.engine().current_stimulus() {
                    Some(Stimulus::Go) => self.hits(),
                    Some(Stimulus::NoGo) => !self.hits(),
                    None => false,
                };
                if press {
                    let rt = self.rt();
                    T::wait_ms(runner, rt);
                    runner.input(InhibitionInput::Press);
                    continue;
                }
            }
            if !T::step(runner) {
                break;
            }
        }
    }

    pub fn trails<T: Clock>(&mut self, runner: &mut TaskRunner<TrailsEngine, T>) {
        runner.start();
        for (i, node) in TRAIL.iter().enumerate() {
            let search = self.rt() * 3;
            T::wait_ms(runner, search);
            if !self.hits() {
                let decoy = TRAIL[(i + 2) % TRAIL.len()].id;
                debug!(decoy, expected = node.id, "participant slips");
                runner.input(TrailsInput::click(decoy));
                let recover = self.rt();
                T::wait_ms(runner, recover);
            }
            runner.input(TrailsInput::click(node.id));
        }
        Self::finish(runner);
    }

    pub fn symbol_coding<T: Clock>(&mut self, runner: &mut TaskRunner<SymbolCodingEngine, T>) {
        runner.start();
        let keys = runner.engine().legend().len() as u8;
        while runner.is_running() {
            let think = self.rt() * 2;
            T::wait_ms(runner, think);
            if !runner.is_running() {
                break;
            }
            let Some(symbol) = runner.engine().current_symbol() else {
                break;
            };
            let Some(pos) = runner.engine().legend().iter().position(|s| s == symbol) else {
                break;
            };
            let correct = pos as u8 + 1;
            let key = if self.hits() { correct } else { correct % keys + 1 };
            runner.input(SymbolCodingInput::Key(key));
            T::step(runner);
        }
    }

    pub fn digit_span<T: Clock>(&mut self, runner: &mut TaskRunner<DigitSpanEngine<StdRng>, T>) {
        runner.start();
        while runner.is_running() {
            match runner.phase() {
                DigitSpanPhase::Instructions => {
                    T::wait_ms(runner, 1500);
                    runner.input(DigitSpanInput::Begin);
                }
                DigitSpanPhase::Input => {
                    let engine = runner.engine();
                    let (mode, level) = (engine.mode(), engine.level());
                    let capacity = match mode {
                        SpanMode::Forward => self.forward_capacity,
                        SpanMode::Backward => self.backward_capacity,
                    };
                    let mut answer = expected_answer(engine.sequence(), mode);
                    if level > capacity {
                        answer = answer.chars().rev().chain(['0']).collect();
                    }
                    let typing = 250 * level as u64;
                    T::wait_ms(runner, typing);
                    runner.input(DigitSpanInput::Submit(answer));
                }
                _ => {
                    if !T::step(runner) {
                        break;
                    }
                }
            }
        }
    }

    pub fn visual_memory<T: Clock>(
        &mut self,
        runner: &mut TaskRunner<VisualMemoryEngine<StdRng>, T>,
    ) {
        runner.start();
        while runner.is_running() {
            if runner.phase() != VisualMemoryPhase::Input {
                if !T::step(runner) {
                    break;
                }
                continue;
            }
            let level = runner.engine().level();
            let tiles = runner.engine().tiles();
            let mut taps = runner.engine().sequence().to_vec();
            if level > self.visual_capacity {
                if let Some(last) = taps.last_mut() {
                    *last = (*last + 1) % tiles;
                }
            }
            for tile in taps {
                let rt = self.rt();
                T::wait_ms(runner, rt);
                runner.input(VisualMemoryInput::Tap(tile));
                if runner.phase() != VisualMemoryPhase::Input {
                    break;
                }
            }
        }
    }

    pub fn fluency<T: Clock>(&mut self, runner: &mut TaskRunner<FluencyEngine, T>) {
        runner.start();
        for word in FLUENCY_WORDS {
            let recall = self.rt() * 8;
            T::wait_ms(runner, recall);
            if !runner.phase().allows_input() {
                break;
            }
            runner.input(FluencyInput::Submit(word.to_string()));
        }
        Self::finish(runner);
    }

    pub fn orientation<T: Clock, W: WallClock>(
        &mut self,
        runner: &mut TaskRunner<OrientationEngine<W>, T>,
    ) {
        runner.start();
        let mut answers = truthful_answers(runner.engine().clock().local_now());
        if !self.hits() {
            answers.day = String::new();
        }
        let writing = self.rt() * 20;
        T::wait_ms(runner, writing);
        runner.input(OrientationInput::Submit(answers));
    }

    pub fn stroop<T: Clock>(&mut self, runner: &mut TaskRunner<StroopEngine<StdRng>, T>) {
        runner.start();
        while runner.is_running() {
            let Some(stimulus) = runner.engine().current() else {
                break;
            };
            let rt = self.rt() * 2;
            T::wait_ms(runner, rt);
            let answer = if self.hits() {
                stimulus.ink
            } else {
                confusable(stimulus.ink)
            };
            runner.input(StroopInput::Answer(answer));
        }
    }

    pub fn verbal_list<T: Clock>(&mut self, runner: &mut TaskRunner<VerbalListEngine, T>) {
        runner.start();
        while runner.is_running() {
            match runner.phase() {
                VerbalListPhase::Intro => {
                    let reading = self.rt() * 5;
                    T::wait_ms(runner, reading);
                    runner.input(VerbalListInput::Begin);
                }
                VerbalListPhase::Recall => self.recall_list(runner),
                _ => {
                    if !T::step(runner) {
                        break;
                    }
                }
            }
        }
    }

    fn recall_list<T: Clock>(&mut self, runner: &mut TaskRunner<VerbalListEngine, T>) {
        let trial = runner.engine().trial();
        let words = runner.engine().word_list().to_vec();
        let capacity = self.list_capacity + 2 * (trial - 1);
        let rate = (capacity as f64 / words.len() as f64).min(1.0);
        let mut offered: Vec<String> = words
            .iter()
            .filter(|_| self.rng.random_bool(rate))
            .map(|w| w.to_lowercase())
            .collect();
        if !self.hits() {
            offered.push("table".to_string());
        }
        debug!(trial, offered = offered.len(), "recalling list");
        for word in offered {
            let recall = self.rt() * 4;
            T::wait_ms(runner, recall);
            runner.input(VerbalListInput::Recall(word));
        }
        let giving_up = self.rt() * 2;
        T::wait_ms(runner, giving_up);
        runner.input(VerbalListInput::Finish);
    }
}

fn truthful_answers(now: NaiveDateTime) -> OrientationAnswers {
    OrientationAnswers {
        year: now.year().to_string(),
        month: MONTHS[now.month0() as usize].to_string(),
        date: now.day().to_string(),
        day: WEEKDAYS[now.weekday().num_days_from_sunday() as usize].to_string(),
        season: Season::from_month0(now.month0()).to_string(),
        time_of_day: TimeOfDay::from_hour(now.hour()).label().to_string(),
    }
}

/// Colour picked on a slip.
fn confusable(color: StroopColor) -> StroopColor {
    let all = StroopColor::ALL;
    let i = all.iter().position(|c| *c == color).unwrap_or(0);
    all[(i + 1) % all.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogtask_engine::RunStatus;
    use cogtask_engine::config::{VerbalListConfig, VisualMemoryConfig};
    use cogtask_timing::ManualTimer;
    use rand::SeedableRng;

    #[test]
    fn visual_memory_slip_stays_on_a_small_grid() {
        let config = VisualMemoryConfig {
            grid_side: 2,
            ..VisualMemoryConfig::default()
        };
        let engine = VisualMemoryEngine::new(config, StdRng::seed_from_u64(11)).unwrap();
        let mut runner = TaskRunner::new(engine, ManualTimer::new());
        let mut participant = Participant::new(StdRng::seed_from_u64(12));
        participant.visual_memory(&mut runner);

        assert_eq!(runner.status(), RunStatus::Completed);
        let engine = runner.engine();
        let sequence = engine.sequence();
        let entered = engine.entered();
        assert_eq!(sequence.len(), 8);
        assert_eq!(entered.len(), 8);
        assert_eq!(entered[..7], sequence[..7]);
        assert_eq!(entered[7], (sequence[7] + 1) % 4);
    }

    #[test]
    fn verbal_list_runs_every_trial() {
        let engine = VerbalListEngine::new(VerbalListConfig::default()).unwrap();
        let mut runner = TaskRunner::new(engine, ManualTimer::new());
        let mut participant = Participant::new(StdRng::seed_from_u64(5));
        participant.verbal_list(&mut runner);

        assert_eq!(runner.status(), RunStatus::Completed);
        let trials = runner.engine().trials();
        assert_eq!(trials.len(), 3);
        assert!(trials.iter().all(|t| t.correct_count <= 15));
        assert!(trials.iter().any(|t| t.correct_count > 0));
    }
}
