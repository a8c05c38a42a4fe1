use chrono::{Datelike, NaiveDateTime, Timelike};
use cogtask_core::{Effects, Engine, Phase, TaskKind};
use cogtask_timing::WallClock;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Indexed by days from Sunday.
pub const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Fixed quarters: Dec-Feb, Mar-May, Jun-Aug, Sep-Nov.
    pub fn from_month0(month0: u32) -> Self {
        match month0 {
            2..=4 => Season::Spring,
            5..=7 => Season::Summer,
            8..=10 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn/Fall",
        }
    }

    fn accepts(&self, answer: &str) -> bool {
        let answer = answer.trim();
        match self {
            Season::Autumn => ["Autumn/Fall", "Autumn", "Fall"]
                .iter()
                .any(|s| s.eq_ignore_ascii_case(answer)),
            other => other.label().eq_ignore_ascii_case(answer),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// 05-11 morning, 12-16 afternoon, 17-20 evening, otherwise night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Night => "Night",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrientationAnswers {
    pub year: String,
    pub month: String,
    pub date: String,
    pub day: String,
    pub season: String,
    pub time_of_day: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationResult {
    pub score: u8,
    pub max_score: u8,
    pub answers: OrientationAnswers,
}

pub const MAX_SCORE: u8 = 6;

fn parse_int<T: std::str::FromStr>(s: &str) -> Option<T> {
    s.trim().parse().ok()
}

fn same_word(answer: &str, truth: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(truth)
}

/// Counts the answers that match the calendar at `now`.
pub fn score(answers: &OrientationAnswers, now: NaiveDateTime) -> u8 {
    let month0 = now.month0();
    let checks = [
        parse_int::<i32>(&answers.year) == Some(now.year()),
        same_word(&answers.month, MONTHS[month0 as usize]),
        parse_int::<u32>(&answers.date) == Some(now.day()),
        same_word(
            &answers.day,
            WEEKDAYS[now.weekday().num_days_from_sunday() as usize],
        ),
        Season::from_month0(month0).accepts(&answers.season),
        same_word(&answers.time_of_day, TimeOfDay::from_hour(now.hour()).label()),
    ];
    checks.iter().filter(|ok| **ok).count() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationPhase {
    #[default]
    Idle,
    Awaiting,
    Done,
}

impl Phase for OrientationPhase {
    fn allows_input(&self) -> bool {
        matches!(self, OrientationPhase::Awaiting)
    }

    fn is_finished(&self) -> bool {
        matches!(self, OrientationPhase::Done)
    }

    fn is_idle(&self) -> bool {
        matches!(self, OrientationPhase::Idle)
    }
}

/// Orientation never schedules anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationEvent {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrientationInput {
    Submit(OrientationAnswers),
}

/// Single-submission scorer against local civil time at the moment of
/// submission.
pub struct OrientationEngine<W: WallClock> {
    clock: W,
    phase: OrientationPhase,
}

impl<W: WallClock> OrientationEngine<W> {
    pub fn new(clock: W) -> Self {
        Self {
            clock,
            phase: OrientationPhase::Idle,
        }
    }

    pub fn clock(&self) -> &W {
        &self.clock
    }
}

impl<W: WallClock> Engine for OrientationEngine<W> {
    type Phase = OrientationPhase;
    type Input = OrientationInput;
    type Event = OrientationEvent;
    type Output = OrientationResult;

    const KIND: TaskKind = TaskKind::Orientation;

    fn phase(&self) -> OrientationPhase {
        self.phase
    }

    fn start(&mut self, _now: u64, _fx: &mut Effects<OrientationEvent, OrientationResult>) {
        self.phase = OrientationPhase::Awaiting;
    }

    fn input(
        &mut self,
        _now: u64,
        input: OrientationInput,
        fx: &mut Effects<OrientationEvent, OrientationResult>,
    ) {
        if self.phase != OrientationPhase::Awaiting {
            return;
        }
        let OrientationInput::Submit(answers) = input;
        let local = self.clock.local_now();
        let score = score(&answers, local);
        info!(score, %local, "orientation scored");
        self.phase = OrientationPhase::Done;
        fx.complete(OrientationResult {
            score,
            max_score: MAX_SCORE,
            answers,
        });
    }

    fn timer(
        &mut self,
        _now: u64,
        event: OrientationEvent,
        _fx: &mut Effects<OrientationEvent, OrientationResult>,
    ) {
        match event {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RunStatus, TaskRunner};
    use chrono::NaiveDate;
    use cogtask_timing::{FixedWallClock, ManualTimer};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 30, 0)
            .unwrap()
    }

    fn answers(year: &str, month: &str, date: &str, day: &str, season: &str, tod: &str) -> OrientationAnswers {
        OrientationAnswers {
            year: year.into(),
            month: month.into(),
            date: date.into(),
            day: day.into(),
            season: season.into(),
            time_of_day: tod.into(),
        }
    }

    #[test]
    fn seasons_follow_fixed_quarters() {
        assert_eq!(Season::from_month0(11), Season::Winter);
        assert_eq!(Season::from_month0(0), Season::Winter);
        assert_eq!(Season::from_month0(2), Season::Spring);
        assert_eq!(Season::from_month0(7), Season::Summer);
        assert_eq!(Season::from_month0(8), Season::Autumn);
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(16), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Night);
    }

    #[test]
    fn full_marks_with_loose_formatting() {
        // 2026-10-19 is a Monday
        let now = at(2026, 10, 19, 9);
        let a = answers(" 2026", "october", "19 ", "MONDAY", "fall", "Morning");
        assert_eq!(score(&a, now), 6);
        let a = answers("2026", "October", "19", "Monday", "Autumn/Fall", "Morning");
        assert_eq!(score(&a, now), 6);
    }

    #[test]
    fn partial_and_empty_answers() {
        let now = at(2025, 1, 1, 23);
        let a = answers("2024", "January", "1", "Tuesday", "Summer", "Night");
        // 2025-01-01 is a Wednesday
        assert_eq!(score(&a, now), 3);
        assert_eq!(score(&OrientationAnswers::default(), now), 0);
    }

    #[test]
    fn submission_completes_the_run() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();
        let engine = OrientationEngine::new(FixedWallClock(at(2026, 7, 4, 14)));
        let mut r = TaskRunner::new(engine, ManualTimer::new())
            .on_complete(move |res| sink.borrow_mut().push(res));
        r.start();
        let a = answers("2026", "July", "4", "Saturday", "Summer", "Afternoon");
        r.input(OrientationInput::Submit(a.clone()));
        assert_eq!(r.status(), RunStatus::Completed);
        let results = out.borrow();
        assert_eq!(results[0].score, 6);
        assert_eq!(results[0].max_score, 6);
        assert_eq!(results[0].answers, a);
    }
}
