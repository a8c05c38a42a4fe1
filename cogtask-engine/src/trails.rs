use cogtask_core::stats::round_to;
use cogtask_core::trial::ns_to_ms;
use cogtask_core::{ConfigError, Effects, Engine, Phase, TaskKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrailsConfig;

/// A target on the canvas. Coordinates are percentages of the canvas size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailNode {
    pub id: &'static str,
    pub label: &'static str,
    pub x: f32,
    pub y: f32,
}

const fn node(id: &'static str, x: f32, y: f32) -> TrailNode {
    TrailNode { id, label: id, x, y }
}

/// Alternating number-letter sequence, in the order it must be clicked.
pub const TRAIL: [TrailNode; 10] = [
    node("1", 50.0, 82.0),
    node("A", 18.0, 50.0),
    node("2", 82.0, 18.0),
    node("B", 50.0, 48.0),
    node("3", 18.0, 82.0),
    node("C", 82.0, 82.0),
    node("4", 32.0, 28.0),
    node("D", 68.0, 62.0),
    node("5", 32.0, 62.0),
    node("E", 68.0, 28.0),
];

pub fn position(id: &str) -> Option<usize> {
    TRAIL.iter().position(|n| n.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailsPhase {
    #[default]
    Idle,
    Active,
    /// Final node reached; the result is emitted after a short delay.
    Finishing,
    Done,
}

impl Phase for TrailsPhase {
    fn allows_input(&self) -> bool {
        matches!(self, TrailsPhase::Active)
    }

    fn is_finished(&self) -> bool {
        matches!(self, TrailsPhase::Done)
    }

    fn is_idle(&self) -> bool {
        matches!(self, TrailsPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailsEvent {
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailsInput {
    Click(String),
}

impl TrailsInput {
    pub fn click(id: impl Into<String>) -> Self {
        TrailsInput::Click(id.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub id: String,
    pub index: usize,
    pub expected_id: String,
    pub expected_index: usize,
    pub correct: bool,
    /// Milliseconds since the run started.
    pub at_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub id: String,
    pub index: usize,
    pub expected_id: String,
    pub expected_index: usize,
    pub at_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailsResult {
    pub total_time_sec: f64,
    pub adjusted_time_sec: f64,
    pub n_points: usize,
    pub errors: u32,
    pub guided: bool,
    pub click_events: Vec<ClickEvent>,
    pub error_events: Vec<ErrorEvent>,
}

/// Completion time plus the error penalty, to one decimal.
pub fn adjusted_time_sec(total_time_sec: f64, errors: u32, penalty_sec: f64) -> f64 {
    round_to(total_time_sec + errors as f64 * penalty_sec, 1)
}

/// Set-shifting trail: click 1, A, 2, B, ... in order. Wrong clicks count
/// as errors and do not advance.
pub struct TrailsEngine {
    config: TrailsConfig,
    phase: TrailsPhase,
    cursor: usize,
    errors: u32,
    run_start: u64,
    first_click: Option<u64>,
    clicks: Vec<ClickEvent>,
    error_events: Vec<ErrorEvent>,
    pending: Option<TrailsResult>,
}

type Fx = Effects<TrailsEvent, TrailsResult>;

impl TrailsEngine {
    pub fn new(config: TrailsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            phase: TrailsPhase::Idle,
            cursor: 0,
            errors: 0,
            run_start: 0,
            first_click: None,
            clicks: Vec::new(),
            error_events: Vec::new(),
            pending: None,
        })
    }

    /// Next node to click. Guided hosts highlight it.
    pub fn expected(&self) -> Option<&'static TrailNode> {
        TRAIL.get(self.cursor)
    }

    /// Nodes already connected, in order.
    pub fn connected(&self) -> &'static [TrailNode] {
        &TRAIL[..self.cursor.min(TRAIL.len())]
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn is_guided(&self) -> bool {
        self.config.guided
    }

    fn click(&mut self, now: u64, id: &str, fx: &mut Fx) {
        let Some(index) = position(id) else {
            debug!(id, "click on unknown node ignored");
            return;
        };
        let started = *self.first_click.get_or_insert(now);
        let expected = &TRAIL[self.cursor];
        let correct = index == self.cursor;
        let at_ms = ns_to_ms(now.saturating_sub(self.run_start));

        self.clicks.push(ClickEvent {
            id: id.to_string(),
            index,
            expected_id: expected.id.to_string(),
            expected_index: self.cursor,
            correct,
            at_ms,
        });

        if !correct {
            self.errors += 1;
            debug!(id, expected = expected.id, errors = self.errors, "wrong node");
            self.error_events.push(ErrorEvent {
                id: id.to_string(),
                index,
                expected_id: expected.id.to_string(),
                expected_index: self.cursor,
                at_ms,
            });
            return;
        }

        self.cursor += 1;
        if self.cursor == TRAIL.len() {
            let total = round_to(ns_to_ms(now.saturating_sub(started)) / 1000.0, 1);
            self.pending = Some(TrailsResult {
                total_time_sec: total,
                adjusted_time_sec: adjusted_time_sec(total, self.errors, self.config.penalty_sec),
                n_points: TRAIL.len(),
                errors: self.errors,
                guided: self.config.guided,
                click_events: std::mem::take(&mut self.clicks),
                error_events: std::mem::take(&mut self.error_events),
            });
            self.phase = TrailsPhase::Finishing;
            fx.schedule_ms(self.config.completion_delay_ms, TrailsEvent::Finalize);
        }
    }
}

impl Engine for TrailsEngine {
    type Phase = TrailsPhase;
    type Input = TrailsInput;
    type Event = TrailsEvent;
    type Output = TrailsResult;

    const KIND: TaskKind = TaskKind::Trails;

    fn phase(&self) -> TrailsPhase {
        self.phase
    }

    fn start(&mut self, now: u64, _fx: &mut Fx) {
        self.run_start = now;
        self.phase = TrailsPhase::Active;
    }

    fn input(&mut self, now: u64, input: TrailsInput, fx: &mut Fx) {
        if self.phase != TrailsPhase::Active {
            return;
        }
        match input {
            TrailsInput::Click(id) => self.click(now, &id, fx),
        }
    }

    fn timer(&mut self, _now: u64, event: TrailsEvent, fx: &mut Fx) {
        let TrailsEvent::Finalize = event;
        if let Some(result) = self.pending.take() {
            self.phase = TrailsPhase::Done;
            fx.complete(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TaskRunner;
    use cogtask_timing::ManualTimer;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Runner = TaskRunner<TrailsEngine, ManualTimer>;

    fn runner() -> (Runner, Rc<RefCell<Vec<TrailsResult>>>) {
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();
        let r = TaskRunner::new(TrailsEngine::new(TrailsConfig::default()).unwrap(), ManualTimer::new())
            .on_complete(move |res| sink.borrow_mut().push(res));
        (r, out)
    }

    #[test]
    fn clean_run_with_one_error() {
        let (mut r, out) = runner();
        r.start();
        r.advance_ms(2000);
        // the clock starts at the first click, even a wrong one
        r.input(TrailsInput::click("A"));
        for node in TRAIL.iter() {
            r.advance_ms(1000);
            r.input(TrailsInput::click(node.id));
        }
        assert_eq!(r.phase(), TrailsPhase::Finishing);
        assert!(out.borrow().is_empty());
        r.advance_ms(400);

        let results = out.borrow();
        let res = &results[0];
        assert_eq!(res.total_time_sec, 10.0);
        assert_eq!(res.adjusted_time_sec, 13.0);
        assert_eq!(res.errors, 1);
        assert_eq!(res.n_points, 10);
        assert_eq!(res.click_events.len(), 11);
        assert_eq!(res.error_events.len(), 1);
        assert_eq!(res.error_events[0].expected_id, "1");
        assert_eq!(res.error_events[0].at_ms, 2000.0);
        assert!(!res.guided);
    }

    #[test]
    fn unknown_nodes_and_repeats_do_not_advance() {
        let (mut r, _) = runner();
        r.start();
        r.input(TrailsInput::click("Z"));
        assert_eq!(r.engine().errors(), 0);
        r.input(TrailsInput::click("1"));
        r.input(TrailsInput::click("1"));
        assert_eq!(r.engine().errors(), 1);
        assert_eq!(r.engine().expected().map(|n| n.id), Some("A"));
        assert_eq!(r.engine().connected().len(), 1);
    }

    #[test]
    fn clicks_after_the_final_node_are_ignored() {
        let (mut r, out) = runner();
        r.start();
        for node in TRAIL.iter() {
            r.input(TrailsInput::click(node.id));
        }
        r.input(TrailsInput::click("1"));
        r.advance_ms(400);
        assert_eq!(out.borrow()[0].errors, 0);
        assert_eq!(out.borrow()[0].total_time_sec, 0.0);
    }

    #[test]
    fn adjusted_time_rounds_to_one_decimal() {
        assert_eq!(adjusted_time_sec(12.3, 2, 3.0), 18.3);
        assert_eq!(adjusted_time_sec(9.96, 0, 3.0), 10.0);
    }
}
