use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::phase::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    ReactionTime,
    Inhibition,
    Trails,
    SymbolCoding,
    DigitSpan,
    VisualMemory,
    Fluency,
    Orientation,
    Stroop,
    VerbalList,
}

impl TaskKind {
    pub const ALL: [TaskKind; 10] = [
        TaskKind::ReactionTime,
        TaskKind::Inhibition,
        TaskKind::Trails,
        TaskKind::SymbolCoding,
        TaskKind::DigitSpan,
        TaskKind::VisualMemory,
        TaskKind::Fluency,
        TaskKind::Orientation,
        TaskKind::Stroop,
        TaskKind::VerbalList,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::ReactionTime => "reaction time",
            TaskKind::Inhibition => "go/no-go inhibition",
            TaskKind::Trails => "set-shifting trails",
            TaskKind::SymbolCoding => "symbol coding",
            TaskKind::DigitSpan => "digit span",
            TaskKind::VisualMemory => "visual sequence memory",
            TaskKind::Fluency => "verbal fluency",
            TaskKind::Orientation => "orientation",
            TaskKind::Stroop => "stroop",
            TaskKind::VerbalList => "verbal list learning",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Side effect requested by an engine transition. The runner turns these into
/// scheduler calls and sink invocations.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<E, O> {
    Schedule { delay: Duration, event: E },
    CancelAll,
    Complete(O),
}

#[derive(Debug)]
pub struct Effects<E, O> {
    items: Vec<Effect<E, O>>,
}

impl<E, O> Effects<E, O> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn schedule(&mut self, delay: Duration, event: E) {
        self.items.push(Effect::Schedule { delay, event });
    }

    pub fn schedule_ms(&mut self, ms: u64, event: E) {
        self.schedule(Duration::from_millis(ms), event);
    }

    pub fn cancel_all(&mut self) {
        self.items.push(Effect::CancelAll);
    }

    pub fn complete(&mut self, output: O) {
        self.items.push(Effect::Complete(output));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, Effect<E, O>> {
        self.items.drain(..)
    }

    pub fn completed(&self) -> Option<&O> {
        self.items.iter().find_map(|e| match e {
            Effect::Complete(o) => Some(o),
            _ => None,
        })
    }
}

impl<E, O> Default for Effects<E, O> {
    fn default() -> Self {
        Self::new()
    }
}

/// A self-contained timed task, written as a finite-state machine.
///
/// Transitions never block and never touch host timers directly: waiting is
/// expressed as `Effect::Schedule`, and the finished result as
/// `Effect::Complete`. `now` is a monotonic reading in nanoseconds.
pub trait Engine {
    type Phase: Phase;
    type Input;
    type Event: Copy + fmt::Debug;
    type Output: Clone + fmt::Debug;

    const KIND: TaskKind;

    fn phase(&self) -> Self::Phase;

    fn start(&mut self, now: u64, fx: &mut Effects<Self::Event, Self::Output>);

    fn input(&mut self, now: u64, input: Self::Input, fx: &mut Effects<Self::Event, Self::Output>);

    fn timer(&mut self, now: u64, event: Self::Event, fx: &mut Effects<Self::Event, Self::Output>);
}
