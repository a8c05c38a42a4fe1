use cogtask_core::{ConfigError, Effects, Engine, Phase, TaskKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DigitSpanConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanMode {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigitSpanPhase {
    #[default]
    Idle,
    /// Waiting for the participant to begin the backward mode.
    Instructions,
    Display,
    Input,
    Done,
}

impl Phase for DigitSpanPhase {
    fn allows_input(&self) -> bool {
        matches!(self, DigitSpanPhase::Instructions | DigitSpanPhase::Input)
    }

    fn is_finished(&self) -> bool {
        matches!(self, DigitSpanPhase::Done)
    }

    fn is_idle(&self) -> bool {
        matches!(self, DigitSpanPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitSpanEvent {
    Blank,
    NextDigit,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigitSpanInput {
    Begin,
    Submit(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitSpanResult {
    pub raw_score: usize,
    pub forward_span: usize,
    pub backward_span: usize,
    pub forward_sequences: Vec<Vec<String>>,
    pub backward_sequences: Vec<Vec<String>>,
    pub total_trials: usize,
}

/// Keeps ASCII digits only, truncated to `max_len`.
pub fn sanitize_answer(raw: &str, max_len: usize) -> String {
    raw.chars().filter(char::is_ascii_digit).take(max_len).collect()
}

pub fn expected_answer(sequence: &[u8], mode: SpanMode) -> String {
    let digits = sequence.iter().map(|d| char::from(b'0' + d));
    match mode {
        SpanMode::Forward => digits.collect(),
        SpanMode::Backward => digits.rev().collect(),
    }
}

/// Digit span, forward then backward. Each mode grows the sequence by one
/// digit per correct recall and ends at the first mistake.
pub struct DigitSpanEngine<R: Rng> {
    config: DigitSpanConfig,
    rng: R,
    phase: DigitSpanPhase,
    mode: SpanMode,
    level: usize,
    sequence: Vec<u8>,
    shown: usize,
    blank: bool,
    forward_span: usize,
    backward_span: usize,
    forward_sequences: Vec<Vec<String>>,
    backward_sequences: Vec<Vec<String>>,
    pending: Option<DigitSpanResult>,
}

type Fx = Effects<DigitSpanEvent, DigitSpanResult>;

impl<R: Rng> DigitSpanEngine<R> {
    pub fn new(config: DigitSpanConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            level: config.start_level,
            config,
            rng,
            phase: DigitSpanPhase::Idle,
            mode: SpanMode::Forward,
            sequence: Vec::new(),
            shown: 0,
            blank: false,
            forward_span: 0,
            backward_span: 0,
            forward_sequences: Vec::new(),
            backward_sequences: Vec::new(),
            pending: None,
        })
    }

    pub fn mode(&self) -> SpanMode {
        self.mode
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// Digit on screen, if any.
    pub fn current_digit(&self) -> Option<u8> {
        if self.phase != DigitSpanPhase::Display || self.blank {
            return None;
        }
        self.sequence.get(self.shown).copied()
    }

    fn begin_trial(&mut self, fx: &mut Fx) {
        let rng = &mut self.rng;
        self.sequence = (0..self.level).map(|_| rng.random_range(0..=9u8)).collect();
        let as_strings = self.sequence.iter().map(u8::to_string).collect();
        match self.mode {
            SpanMode::Forward => self.forward_sequences.push(as_strings),
            SpanMode::Backward => self.backward_sequences.push(as_strings),
        }
        debug!(mode = ?self.mode, level = self.level, "presenting sequence");
        self.shown = 0;
        self.blank = false;
        self.phase = DigitSpanPhase::Display;
        fx.schedule_ms(self.config.digit_on_ms, DigitSpanEvent::Blank);
    }

    fn submit(&mut self, raw: &str, fx: &mut Fx) {
        let answer = sanitize_answer(raw, self.config.max_input_len);
        if answer.is_empty() {
            return;
        }
        if answer == expected_answer(&self.sequence, self.mode) {
            match self.mode {
                SpanMode::Forward => self.forward_span = self.level,
                SpanMode::Backward => self.backward_span = self.level,
            }
            self.level += 1;
            self.begin_trial(fx);
            return;
        }

        debug!(mode = ?self.mode, level = self.level, "recall failed");
        match self.mode {
            SpanMode::Forward => {
                self.mode = SpanMode::Backward;
                self.level = self.config.start_level;
                self.phase = DigitSpanPhase::Instructions;
            }
            SpanMode::Backward => {
                let result = DigitSpanResult {
                    raw_score: self.forward_span + self.backward_span,
                    forward_span: self.forward_span,
                    backward_span: self.backward_span,
                    total_trials: self.forward_sequences.len() + self.backward_sequences.len(),
                    forward_sequences: std::mem::take(&mut self.forward_sequences),
                    backward_sequences: std::mem::take(&mut self.backward_sequences),
                };
                info!(
                    forward_span = result.forward_span,
                    backward_span = result.backward_span,
                    "digit span finished"
                );
                self.pending = Some(result);
                self.phase = DigitSpanPhase::Done;
                fx.schedule_ms(self.config.completion_delay_ms, DigitSpanEvent::Finalize);
            }
        }
    }
}

impl<R: Rng> Engine for DigitSpanEngine<R> {
    type Phase = DigitSpanPhase;
    type Input = DigitSpanInput;
    type Event = DigitSpanEvent;
    type Output = DigitSpanResult;

    const KIND: TaskKind = TaskKind::DigitSpan;

    fn phase(&self) -> DigitSpanPhase {
        self.phase
    }

    fn start(&mut self, _now: u64, fx: &mut Fx) {
        self.mode = SpanMode::Forward;
        self.level = self.config.start_level;
        self.begin_trial(fx);
    }

    fn input(&mut self, _now: u64, input: DigitSpanInput, fx: &mut Fx) {
        match (input, self.phase) {
            (DigitSpanInput::Begin, DigitSpanPhase::Instructions) => self.begin_trial(fx),
            (DigitSpanInput::Submit(raw), DigitSpanPhase::Input) => self.submit(&raw, fx),
            _ => {}
        }
    }

    fn timer(&mut self, _now: u64, event: DigitSpanEvent, fx: &mut Fx) {
        match (event, self.phase) {
            (DigitSpanEvent::Blank, DigitSpanPhase::Display) => {
                self.blank = true;
                fx.schedule_ms(self.config.digit_off_ms, DigitSpanEvent::NextDigit);
            }
            (DigitSpanEvent::NextDigit, DigitSpanPhase::Display) => {
                self.blank = false;
                self.shown += 1;
                if self.shown >= self.sequence.len() {
                    self.phase = DigitSpanPhase::Input;
                } else {
                    fx.schedule_ms(self.config.digit_on_ms, DigitSpanEvent::Blank);
                }
            }
            (DigitSpanEvent::Finalize, DigitSpanPhase::Done) => {
                if let Some(result) = self.pending.take() {
                    fx.complete(result);
                }
            }
            (event, phase) => debug!(?event, ?phase, "stale digit span event"),
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

    type Runner = TaskRunner<DigitSpanEngine<StdRng>, ManualTimer>;

    fn runner() -> (Runner, Rc<RefCell<Vec<DigitSpanResult>>>) {
        let engine = DigitSpanEngine::new(DigitSpanConfig::default(), StdRng::seed_from_u64(21)).unwrap();
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();
        let r = TaskRunner::new(engine, ManualTimer::new())
            .on_complete(move |res| sink.borrow_mut().push(res));
        (r, out)
    }

    fn watch(r: &mut Runner) -> String {
        let mut seen = String::new();
        while r.phase() == DigitSpanPhase::Display {
            if let Some(d) = r.engine().current_digit() {
                seen.push(char::from(b'0' + d));
            }
            r.advance_to_next();
        }
        assert_eq!(r.phase(), DigitSpanPhase::Input);
        seen
    }

    #[test]
    fn sanitizing_keeps_digits_only() {
        assert_eq!(sanitize_answer("1 2-3a", 20), "123");
        assert_eq!(sanitize_answer(&"9".repeat(30), 20).len(), 20);
        assert_eq!(expected_answer(&[1, 2, 3], SpanMode::Backward), "321");
    }

    #[test]
    fn display_timing_is_on_then_blank() {
        let (mut r, _) = runner();
        r.start();
        let first = r.engine().current_digit();
        assert!(first.is_some());
        r.advance_ms(700);
        assert_eq!(r.engine().current_digit(), None);
        r.advance_ms(200);
        assert_eq!(r.engine().current_digit(), Some(r.engine().sequence()[1]));
        // 3 digits take 3 * 900 ms
        r.advance_ms(1800);
        assert_eq!(r.phase(), DigitSpanPhase::Input);
    }

    #[test]
    fn forward_then_backward_run() {
        let (mut r, out) = runner();
        r.start();

        // forward: pass levels 3 and 4, fail level 5
        for _ in 0..2 {
            let seen = watch(&mut r);
            r.input(DigitSpanInput::Submit(seen));
        }
        watch(&mut r);
        r.input(DigitSpanInput::Submit(String::new()));
        assert_eq!(r.phase(), DigitSpanPhase::Input);
        let wrong = if r.engine().sequence()[0] == 0 { "1" } else { "0" };
        r.input(DigitSpanInput::Submit(wrong.to_string()));
        assert_eq!(r.phase(), DigitSpanPhase::Instructions);
        assert_eq!(r.engine().mode(), SpanMode::Backward);

        // nothing plays until the participant begins
        r.advance_ms(10_000);
        assert_eq!(r.phase(), DigitSpanPhase::Instructions);
        r.input(DigitSpanInput::Begin);
        assert_eq!(r.engine().level(), 3);

        let seen = watch(&mut r);
        r.input(DigitSpanInput::Submit(seen.chars().rev().collect()));
        watch(&mut r);
        r.input(DigitSpanInput::Submit(format!("{wrong} {wrong}")));
        assert!(out.borrow().is_empty());
        r.advance_ms(1200);

        let results = out.borrow();
        let res = &results[0];
        assert_eq!(res.forward_span, 4);
        assert_eq!(res.backward_span, 3);
        assert_eq!(res.raw_score, 7);
        assert_eq!(res.total_trials, 5);
        assert_eq!(res.forward_sequences.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(res.backward_sequences.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 4]);
    }
}
