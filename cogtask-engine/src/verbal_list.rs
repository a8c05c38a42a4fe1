use cogtask_core::{ConfigError, Effects, Engine, Phase, TaskKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::VerbalListConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerbalListPhase {
    #[default]
    Idle,
    /// Waiting for the participant to start the next trial.
    Intro,
    Learning,
    Recall,
    /// Last trial recorded, result not yet emitted.
    Finishing,
    Done,
}

impl Phase for VerbalListPhase {
    fn allows_input(&self) -> bool {
        matches!(self, VerbalListPhase::Intro | VerbalListPhase::Recall)
    }

    fn is_finished(&self) -> bool {
        matches!(self, VerbalListPhase::Done)
    }

    fn is_idle(&self) -> bool {
        matches!(self, VerbalListPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbalListEvent {
    NextWord,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerbalListInput {
    Begin,
    Recall(String),
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerbalListTrial {
    pub trial: usize,
    pub recalled: Vec<String>,
    pub correct_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerbalListResult {
    pub raw_score: usize,
    pub trials: Vec<VerbalListTrial>,
    pub total_trials: usize,
    pub word_list: Vec<String>,
}

/// Recall entries are compared in upper case with surrounding space removed.
pub fn normalize_word(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// List learning: the same word list is shown one word at a time, then
/// recalled freely, over a fixed number of trials.
pub struct VerbalListEngine {
    config: VerbalListConfig,
    words: Vec<String>,
    phase: VerbalListPhase,
    trial: usize,
    shown: usize,
    recalled: Vec<String>,
    trials: Vec<VerbalListTrial>,
}

type Fx = Effects<VerbalListEvent, VerbalListResult>;

impl VerbalListEngine {
    pub fn new(config: VerbalListConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let words = config.words.iter().map(|w| normalize_word(w)).collect();
        Ok(Self {
            config,
            words,
            phase: VerbalListPhase::Idle,
            trial: 1,
            shown: 0,
            recalled: Vec::new(),
            trials: Vec::new(),
        })
    }

    pub fn word_list(&self) -> &[String] {
        &self.words
    }

    /// Trial in progress, starting at 1.
    pub fn trial(&self) -> usize {
        self.trial
    }

    /// Word on screen during learning.
    pub fn current_word(&self) -> Option<&str> {
        if self.phase != VerbalListPhase::Learning {
            return None;
        }
        self.words.get(self.shown).map(String::as_str)
    }

    pub fn recalled(&self) -> &[String] {
        &self.recalled
    }

    pub fn trials(&self) -> &[VerbalListTrial] {
        &self.trials
    }

    fn begin_trial(&mut self, fx: &mut Fx) {
        self.phase = VerbalListPhase::Learning;
        self.shown = 0;
        debug!(trial = self.trial, words = self.words.len(), "learning started");
        fx.schedule_ms(self.config.word_ms, VerbalListEvent::NextWord);
    }

    fn recall(&mut self, raw: &str) {
        let word = normalize_word(raw);
        if word.is_empty() || self.recalled.contains(&word) {
            return;
        }
        debug!(trial = self.trial, word = word.as_str(), "word recalled");
        self.recalled.push(word);
    }

    fn finish_trial(&mut self, fx: &mut Fx) {
        let recalled = std::mem::take(&mut self.recalled);
        let correct_count = recalled.iter().filter(|w| self.words.contains(w)).count();
        info!(trial = self.trial, correct_count, recalled = recalled.len(), "recall finished");
        self.trials.push(VerbalListTrial {
            trial: self.trial,
            recalled,
            correct_count,
        });

        if self.trial < self.config.trials {
            self.trial += 1;
            self.phase = VerbalListPhase::Intro;
        } else {
            self.phase = VerbalListPhase::Finishing;
            fx.schedule_ms(self.config.completion_delay_ms, VerbalListEvent::Finalize);
        }
    }

    fn build_result(&self) -> VerbalListResult {
        VerbalListResult {
            raw_score: self.trials.iter().map(|t| t.correct_count).sum(),
            trials: self.trials.clone(),
            total_trials: self.config.trials,
            word_list: self.words.clone(),
        }
    }
}

impl Engine for VerbalListEngine {
    type Phase = VerbalListPhase;
    type Input = VerbalListInput;
    type Event = VerbalListEvent;
    type Output = VerbalListResult;

    const KIND: TaskKind = TaskKind::VerbalList;

    fn phase(&self) -> VerbalListPhase {
        self.phase
    }

    fn start(&mut self, _now: u64, _fx: &mut Fx) {
        self.trial = 1;
        self.phase = VerbalListPhase::Intro;
    }

    fn input(&mut self, _now: u64, input: VerbalListInput, fx: &mut Fx) {
        match (input, self.phase) {
            (VerbalListInput::Begin, VerbalListPhase::Intro) => self.begin_trial(fx),
            (VerbalListInput::Recall(raw), VerbalListPhase::Recall) => self.recall(&raw),
            (VerbalListInput::Finish, VerbalListPhase::Recall) => self.finish_trial(fx),
            (input, phase) => debug!(?input, ?phase, "verbal list input ignored"),
        }
    }

    fn timer(&mut self, _now: u64, event: VerbalListEvent, fx: &mut Fx) {
        match (event, self.phase) {
            (VerbalListEvent::NextWord, VerbalListPhase::Learning) => {
                self.shown += 1;
                if self.shown < self.words.len() {
                    fx.schedule_ms(self.config.word_ms, VerbalListEvent::NextWord);
                } else {
                    self.phase = VerbalListPhase::Recall;
                }
            }
            (VerbalListEvent::Finalize, VerbalListPhase::Finishing) => {
                self.phase = VerbalListPhase::Done;
                let result = self.build_result();
                info!(raw_score = result.raw_score, "verbal list finished");
                fx.complete(result);
            }
            (event, phase) => debug!(?event, ?phase, "stale verbal list event"),
        }
    }
}
