use cogtask_core::{ConfigError, Effects, Engine, Phase, TaskKind};
use cogtask_lexicon::Lexicon;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FluencyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FluencyPhase {
    #[default]
    Idle,
    Running,
    Done,
}

impl Phase for FluencyPhase {
    fn allows_input(&self) -> bool {
        matches!(self, FluencyPhase::Running)
    }

    fn is_finished(&self) -> bool {
        matches!(self, FluencyPhase::Done)
    }

    fn is_idle(&self) -> bool {
        matches!(self, FluencyPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluencyEvent {
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FluencyInput {
    Submit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluencyEntry {
    pub text: String,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluencyResult {
    pub raw_score: usize,
    pub total_entries: usize,
    pub valid_animals: Vec<String>,
    pub invalid_entries: Vec<String>,
    pub all_entries: Vec<String>,
    pub duration_seconds: u64,
}

/// Category fluency: name as many category members as possible before the
/// time runs out.
pub struct FluencyEngine {
    config: FluencyConfig,
    lexicon: Lexicon,
    phase: FluencyPhase,
    seconds_left: u64,
    entries: Vec<FluencyEntry>,
}

type Fx = Effects<FluencyEvent, FluencyResult>;

impl FluencyEngine {
    /// Uses the built-in lexicon named by `config.category`.
    pub fn new(config: FluencyConfig) -> Result<Self, ConfigError> {
        let lexicon = Lexicon::builtin(&config.category).map_err(|e| ConfigError::Invalid {
            field: "fluency.category",
            reason: e.to_string(),
        })?;
        Self::with_lexicon(config, lexicon)
    }

    pub fn with_lexicon(config: FluencyConfig, lexicon: Lexicon) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            seconds_left: config.duration_secs,
            config,
            lexicon,
            phase: FluencyPhase::Idle,
            entries: Vec::new(),
        })
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn entries(&self) -> &[FluencyEntry] {
        &self.entries
    }

    pub fn seconds_left(&self) -> u64 {
        self.seconds_left
    }

    fn submit(&mut self, raw: &str) {
        let text = raw.trim();
        if text.is_empty() {
            return;
        }
        let lowered = text.to_lowercase();
        if self.entries.iter().any(|e| e.text.to_lowercase() == lowered) {
            debug!(entry = text, "duplicate entry suppressed");
            return;
        }
        let valid = self.lexicon.is_member(text);
        debug!(entry = text, valid, "entry recorded");
        self.entries.push(FluencyEntry {
            text: text.to_string(),
            valid,
        });
    }

    fn build_result(&self) -> FluencyResult {
        let pick = |valid: bool| {
            self.entries
                .iter()
                .filter(|e| e.valid == valid)
                .map(|e| e.text.clone())
                .collect::<Vec<_>>()
        };
        let valid = pick(true);
        FluencyResult {
            raw_score: valid.len(),
            total_entries: self.entries.len(),
            valid_animals: valid,
            invalid_entries: pick(false),
            all_entries: self.entries.iter().map(|e| e.text.clone()).collect(),
            duration_seconds: self.config.duration_secs,
        }
    }
}

impl Engine for FluencyEngine {
    type Phase = FluencyPhase;
    type Input = FluencyInput;
    type Event = FluencyEvent;
    type Output = FluencyResult;

    const KIND: TaskKind = TaskKind::Fluency;

    fn phase(&self) -> FluencyPhase {
        self.phase
    }

    fn start(&mut self, _now: u64, fx: &mut Fx) {
        self.seconds_left = self.config.duration_secs;
        self.phase = FluencyPhase::Running;
        info!(
            category = self.lexicon.category(),
            version = self.lexicon.version(),
            "fluency started"
        );
        fx.schedule_ms(1000, FluencyEvent::Tick);
    }

    fn input(&mut self, _now: u64, input: FluencyInput, _fx: &mut Fx) {
        let FluencyInput::Submit(raw) = input;
        if self.phase == FluencyPhase::Running {
            self.submit(&raw);
        }
    }

    fn timer(&mut self, _now: u64, event: FluencyEvent, fx: &mut Fx) {
        let FluencyEvent::Tick = event;
        if self.phase != FluencyPhase::Running {
            return;
        }
        self.seconds_left = self.seconds_left.saturating_sub(1);
        if self.seconds_left > 0 {
            fx.schedule_ms(1000, FluencyEvent::Tick);
            return;
        }
        self.phase = FluencyPhase::Done;
        let result = self.build_result();
        info!(raw_score = result.raw_score, total = result.total_entries, "fluency finished");
        fx.complete(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TaskRunner;
    use cogtask_timing::ManualTimer;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn submit(r: &mut TaskRunner<FluencyEngine, ManualTimer>, text: &str) {
        r.input(FluencyInput::Submit(text.to_string()));
    }

    #[test]
    fn entries_are_deduplicated_and_validated() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();
        let engine = FluencyEngine::new(FluencyConfig::default()).unwrap();
        let mut r = TaskRunner::new(engine, ManualTimer::new())
            .on_complete(move |res| sink.borrow_mut().push(res));
        r.start();
        for text in ["Dog", "dog", "  dogs ", "asdf", "", "   ", "Guinea Pig"] {
            submit(&mut r, text);
        }
        r.advance_ms(59_000);
        assert_eq!(r.engine().seconds_left(), 1);
        submit(&mut r, "Cat.");
        r.advance_ms(1_000);
        submit(&mut r, "horse");

        let results = out.borrow();
        let res = &results[0];
        assert_eq!(res.all_entries, vec!["Dog", "dogs", "asdf", "Guinea Pig", "Cat."]);
        assert_eq!(res.valid_animals, vec!["Dog", "dogs", "Guinea Pig", "Cat."]);
        assert_eq!(res.invalid_entries, vec!["asdf"]);
        assert_eq!(res.raw_score, 4);
        assert_eq!(res.total_entries, 5);
        assert_eq!(res.duration_seconds, 60);
    }

    #[test]
    fn injected_lexicon_replaces_the_builtin() {
        let lexicon = Lexicon::from_words("pets", "1", ["hamster"]).unwrap();
        let mut engine = FluencyEngine::with_lexicon(FluencyConfig::default(), lexicon).unwrap();
        let mut fx = Effects::new();
        engine.start(0, &mut fx);
        engine.input(0, FluencyInput::Submit("Hamsters".into()), &mut fx);
        engine.input(0, FluencyInput::Submit("dog".into()), &mut fx);
        assert_eq!(
            engine.entries().iter().map(|e| e.valid).collect::<Vec<_>>(),
            vec![true, false]
        );
    }

    #[test]
    fn unknown_category_is_a_config_error() {
        let config = FluencyConfig {
            category: "vehicles".into(),
            ..FluencyConfig::default()
        };
        match FluencyEngine::new(config) {
            Err(ConfigError::Invalid { field, reason }) => {
                assert_eq!(field, "fluency.category");
                assert!(reason.contains("available: animals, foods"), "{reason}");
            }
            other => panic!("expected invalid category, got {:?}", other.err()),
        }
    }
}
