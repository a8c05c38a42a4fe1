use cogtask_core::error::{ensure_non_negative, ensure_nonzero, ensure_range, ensure_unit};
use cogtask_core::{ConfigError, TaskKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReactionConfig {
    pub attempts: usize,
    /// Random wait before the stimulus turns on.
    pub foreperiod_range_ms: (u64, u64),
    /// Pause after a scored or early response before the next attempt.
    pub feedback_ms: u64,
    pub completion_delay_ms: u64,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            foreperiod_range_ms: (1500, 3500),
            feedback_ms: 1500,
            completion_delay_ms: 1500,
        }
    }
}

impl ReactionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("reaction.attempts", self.attempts as u64)?;
        ensure_range("reaction.foreperiodRangeMs", self.foreperiod_range_ms)
    }
}

/// Heuristic calibration constants for the inhibition score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InhibitionScoring {
    pub commission_weight: f64,
    pub omission_weight: f64,
    /// Deducted when responses are both very fast and impulsive.
    pub fast_guard_penalty: f64,
    pub fast_guard_median_rt_ms: f64,
    pub fast_guard_commission_rate: f64,
}

impl Default for InhibitionScoring {
    fn default() -> Self {
        Self {
            commission_weight: 120.0,
            omission_weight: 80.0,
            fast_guard_penalty: 10.0,
            fast_guard_median_rt_ms: 250.0,
            fast_guard_commission_rate: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InhibitionConfig {
    pub total_trials: usize,
    pub go_proportion: f64,
    pub fixation_range_ms: (u64, u64),
    pub stimulus_window_ms: u64,
    pub iti_range_ms: (u64, u64),
    pub scoring: InhibitionScoring,
}

impl Default for InhibitionConfig {
    fn default() -> Self {
        Self {
            total_trials: 80,
            go_proportion: 0.75,
            fixation_range_ms: (400, 600),
            stimulus_window_ms: 800,
            iti_range_ms: (600, 800),
            scoring: InhibitionScoring::default(),
        }
    }
}

impl InhibitionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("inhibition.totalTrials", self.total_trials as u64)?;
        ensure_unit("inhibition.goProportion", self.go_proportion)?;
        ensure_range("inhibition.fixationRangeMs", self.fixation_range_ms)?;
        ensure_nonzero("inhibition.stimulusWindowMs", self.stimulus_window_ms)?;
        ensure_range("inhibition.itiRangeMs", self.iti_range_ms)?;
        ensure_unit(
            "inhibition.scoring.fastGuardCommissionRate",
            self.scoring.fast_guard_commission_rate,
        )
    }

    pub fn go_count(&self) -> usize {
        (self.total_trials as f64 * self.go_proportion).round() as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrailsConfig {
    pub penalty_sec: f64,
    /// Hosts highlight the next expected node when set.
    pub guided: bool,
    pub completion_delay_ms: u64,
}

impl Default for TrailsConfig {
    fn default() -> Self {
        Self {
            penalty_sec: 3.0,
            guided: false,
            completion_delay_ms: 400,
        }
    }
}

impl TrailsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_non_negative("trails.penaltySec", self.penalty_sec)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SymbolCodingConfig {
    pub trial_count: usize,
    /// Key `n` answers `symbols[n - 1]`.
    pub symbols: Vec<String>,
    pub duration_secs: u64,
    pub feedback_ms: u64,
}

impl Default for SymbolCodingConfig {
    fn default() -> Self {
        Self {
            trial_count: 100,
            symbols: ["★", "●", "▲", "■"].iter().map(|s| s.to_string()).collect(),
            duration_secs: 90,
            feedback_ms: 200,
        }
    }
}

impl SymbolCodingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("symbolCoding.trialCount", self.trial_count as u64)?;
        ensure_nonzero("symbolCoding.symbols", self.symbols.len() as u64)?;
        if self.symbols.len() > 9 {
            return Err(ConfigError::Invalid {
                field: "symbolCoding.symbols",
                reason: format!("at most 9 symbols can be keyed, got {}", self.symbols.len()),
            });
        }
        ensure_nonzero("symbolCoding.durationSecs", self.duration_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DigitSpanConfig {
    /// Starting length for both the forward and the backward mode.
    pub start_level: usize,
    pub digit_on_ms: u64,
    pub digit_off_ms: u64,
    pub max_input_len: usize,
    pub completion_delay_ms: u64,
}

impl Default for DigitSpanConfig {
    fn default() -> Self {
        Self {
            start_level: 3,
            digit_on_ms: 700,
            digit_off_ms: 200,
            max_input_len: 20,
            completion_delay_ms: 1200,
        }
    }
}

impl DigitSpanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("digitSpan.startLevel", self.start_level as u64)?;
        ensure_nonzero("digitSpan.digitOnMs", self.digit_on_ms)?;
        if self.max_input_len < self.start_level {
            return Err(ConfigError::Invalid {
                field: "digitSpan.maxInputLen",
                reason: format!(
                    "{} is shorter than the starting level {}",
                    self.max_input_len, self.start_level
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VisualMemoryConfig {
    /// Tiles per grid side; the grid holds `grid_side²` tiles.
    pub grid_side: usize,
    pub start_level: usize,
    pub flash_ms: u64,
    pub gap_ms: u64,
    pub success_pause_ms: u64,
    pub completion_delay_ms: u64,
}

impl Default for VisualMemoryConfig {
    fn default() -> Self {
        Self {
            grid_side: 3,
            start_level: 1,
            flash_ms: 500,
            gap_ms: 500,
            success_pause_ms: 1000,
            completion_delay_ms: 1500,
        }
    }
}

impl VisualMemoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("visualMemory.gridSide", self.grid_side as u64)?;
        ensure_nonzero("visualMemory.startLevel", self.start_level as u64)?;
        ensure_nonzero("visualMemory.flashMs", self.flash_ms)
    }

    pub fn tiles(&self) -> usize {
        self.grid_side * self.grid_side
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FluencyConfig {
    pub duration_secs: u64,
    /// Built-in lexicon category used when the host does not inject one.
    pub category: String,
}

impl Default for FluencyConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            category: "animals".to_string(),
        }
    }
}

impl FluencyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("fluency.durationSecs", self.duration_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StroopConfig {
    pub rounds: usize,
    pub duration_secs: u64,
    /// Chance that a word drawn in its own ink is shifted to the next colour.
    pub incongruent_shift_probability: f64,
    pub correct_points: u32,
    pub points_per_second_left: u32,
    pub incorrect_penalty: u32,
}

impl Default for StroopConfig {
    fn default() -> Self {
        Self {
            rounds: 15,
            duration_secs: 30,
            incongruent_shift_probability: 0.7,
            correct_points: 100,
            points_per_second_left: 2,
            incorrect_penalty: 50,
        }
    }
}

impl StroopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("stroop.rounds", self.rounds as u64)?;
        ensure_nonzero("stroop.durationSecs", self.duration_secs)?;
        ensure_unit(
            "stroop.incongruentShiftProbability",
            self.incongruent_shift_probability,
        )
    }
}

/// Word list shown on every learning trial.
pub const VERBAL_LIST_WORDS: [&str; 15] = [
    "DRUM", "CURTAIN", "BELL", "COFFEE", "SCHOOL", "PARENT", "MOON", "GARDEN", "HAT", "FARMER",
    "NOSE", "TURKEY", "COLOR", "HOUSE", "RIVER",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerbalListConfig {
    pub words: Vec<String>,
    /// Time each word stays on screen.
    pub word_ms: u64,
    pub trials: usize,
    pub completion_delay_ms: u64,
}

impl Default for VerbalListConfig {
    fn default() -> Self {
        Self {
            words: VERBAL_LIST_WORDS.iter().map(|w| w.to_string()).collect(),
            word_ms: 1500,
            trials: 3,
            completion_delay_ms: 1500,
        }
    }
}

impl VerbalListConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("verbalList.words", self.words.len() as u64)?;
        if self.words.iter().any(|w| w.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "verbalList.words",
                reason: "words must not be blank".to_string(),
            });
        }
        ensure_nonzero("verbalList.wordMs", self.word_ms)?;
        ensure_nonzero("verbalList.trials", self.trials as u64)
    }
}

/// Configuration for a whole battery, as loaded by a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatteryConfig {
    /// Fixed seed for reproducible trial sequences; fresh entropy when absent.
    pub seed: Option<u64>,
    pub order: Vec<TaskKind>,
    pub reaction: ReactionConfig,
    pub inhibition: InhibitionConfig,
    pub trails: TrailsConfig,
    pub symbol_coding: SymbolCodingConfig,
    pub digit_span: DigitSpanConfig,
    pub visual_memory: VisualMemoryConfig,
    pub fluency: FluencyConfig,
    pub stroop: StroopConfig,
    pub verbal_list: VerbalListConfig,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            seed: None,
            order: TaskKind::ALL.to_vec(),
            reaction: ReactionConfig::default(),
            inhibition: InhibitionConfig::default(),
            trails: TrailsConfig::default(),
            symbol_coding: SymbolCodingConfig::default(),
            digit_span: DigitSpanConfig::default(),
            visual_memory: VisualMemoryConfig::default(),
            fluency: FluencyConfig::default(),
            stroop: StroopConfig::default(),
            verbal_list: VerbalListConfig::default(),
        }
    }
}

impl BatteryConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reaction.validate()?;
        self.inhibition.validate()?;
        self.trails.validate()?;
        self.symbol_coding.validate()?;
        self.digit_span.validate()?;
        self.visual_memory.validate()?;
        self.fluency.validate()?;
        self.stroop.validate()?;
        self.verbal_list.validate()
    }
}
