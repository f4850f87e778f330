use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FollowError;
use crate::types::RecognitionMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: RecognitionMode,
    pub normalization: NormalizationMode,
    pub precise: PreciseConfig,
    pub speed: SpeedConfig,
    pub confidence: ConfidenceConfig,
    pub highlight: HighlightConfig,
    pub session: SessionConfig,
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, FollowError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| FollowError::io("read engine config", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| FollowError::json("parse engine config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FollowError> {
        let p = &self.precise;
        if p.max_context == 0 {
            return Err(FollowError::invalid_config("precise.max_context must be >= 1"));
        }
        if p.lookahead_interim == 0 || p.lookahead_final == 0 {
            return Err(FollowError::invalid_config("precise lookahead must be >= 1"));
        }
        if p.global_lookahead == Some(0) {
            return Err(FollowError::invalid_config(
                "precise.global_lookahead must be >= 1 when set",
            ));
        }
        if p.recovery_after_misses == 0 {
            return Err(FollowError::invalid_config(
                "precise.recovery_after_misses must be >= 1",
            ));
        }
        require_finite(
            "precise",
            &[
                p.penalty_log_weight,
                p.penalty_linear_weight,
                p.min_score_single,
                p.min_score_per_word,
                p.global_penalty_log_weight,
                p.global_penalty_linear_weight,
                p.global_min_score_single,
                p.global_min_score_per_word,
                p.global_min_threshold,
            ],
        )?;

        let s = &self.speed;
        if s.max_context == 0 {
            return Err(FollowError::invalid_config("speed.max_context must be >= 1"));
        }
        if s.window_interim == 0 || s.window_final == 0 {
            return Err(FollowError::invalid_config("speed forward window must be >= 1"));
        }
        if s.miss_limit_interim == 0 || s.miss_limit_final == 0 {
            return Err(FollowError::invalid_config("speed miss limits must be >= 1"));
        }
        if !(0.0..1.0).contains(&s.stability_decay) {
            return Err(FollowError::invalid_config(
                "speed.stability_decay must be in [0, 1)",
            ));
        }
        require_finite(
            "speed",
            &[
                s.context_weight,
                s.penalty_log_weight,
                s.penalty_linear_weight,
                s.final_bonus,
                s.accept_interim,
                s.accept_final,
                s.match_quality,
            ],
        )?;
        if s.dp.tail_words == 0 || s.dp.window_ahead == 0 {
            return Err(FollowError::invalid_config(
                "speed.dp tail_words and window_ahead must be >= 1",
            ));
        }
        for penalties in [&s.dp.interim_penalties, &s.dp.final_penalties] {
            if !(penalties.skip_reference > 0.0 && penalties.skip_recognized > 0.0) {
                return Err(FollowError::invalid_config(
                    "speed.dp skip penalties must be positive",
                ));
            }
        }
        require_finite(
            "speed.dp",
            &[s.dp.proximity_weight, s.dp.min_coverage, s.dp.match_coverage],
        )?;

        match self.confidence.strategy {
            SmoothingStrategy::MovingAverage { window } if window == 0 => {
                return Err(FollowError::invalid_config(
                    "confidence moving_average window must be >= 1",
                ));
            }
            SmoothingStrategy::Kalman {
                process_noise,
                measurement_noise,
            } if !(process_noise > 0.0 && measurement_noise > 0.0)
                || !process_noise.is_finite()
                || !measurement_noise.is_finite() =>
            {
                return Err(FollowError::invalid_config(
                    "confidence kalman noise values must be positive and finite",
                ));
            }
            _ => {}
        }
        if !(0.0..=1.0).contains(&self.confidence.default_confidence) {
            return Err(FollowError::invalid_config(
                "confidence.default_confidence must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

fn require_finite(section: &str, values: &[f64]) -> Result<(), FollowError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(FollowError::invalid_config(format!(
            "{section} thresholds and weights must be finite"
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    #[default]
    Unicode,
    Ascii,
}

/// Order in which the precise aligner tries context window lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextOrder {
    #[default]
    LongestFirst,
    ShortestFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreciseConfig {
    pub context_order: ContextOrder,
    pub max_context: usize,
    pub backtrack: usize,
    pub lookahead_interim: usize,
    pub lookahead_final: usize,
    pub penalty_log_weight: f64,
    pub penalty_linear_weight: f64,
    pub min_score_single: f64,
    pub min_score_per_word: f64,
    pub global_penalty_log_weight: f64,
    pub global_penalty_linear_weight: f64,
    pub global_min_score_single: f64,
    pub global_min_score_per_word: f64,
    pub global_min_threshold: f64,
    /// Upper bound on how far past the cursor the recovery search looks.
    /// `None` searches to the end of the reference.
    pub global_lookahead: Option<usize>,
    pub recovery_after_misses: u32,
    pub mark_skipped: bool,
}

impl Default for PreciseConfig {
    fn default() -> Self {
        Self {
            context_order: ContextOrder::LongestFirst,
            max_context: 4,
            backtrack: 3,
            lookahead_interim: 14,
            lookahead_final: 22,
            penalty_log_weight: 0.8,
            penalty_linear_weight: 0.3,
            min_score_single: 0.8,
            min_score_per_word: 1.0,
            global_penalty_log_weight: 1.2,
            global_penalty_linear_weight: 0.4,
            global_min_score_single: 0.6,
            global_min_score_per_word: 0.8,
            global_min_threshold: 0.6,
            global_lookahead: None,
            recovery_after_misses: 2,
            mark_skipped: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub max_context: usize,
    pub window_interim: usize,
    pub window_final: usize,
    pub context_weight: f64,
    pub penalty_log_weight: f64,
    pub penalty_linear_weight: f64,
    pub final_bonus: f64,
    pub accept_interim: f64,
    pub accept_final: f64,
    /// Raw word score at or above which an accepted candidate counts as a
    /// match rather than a skip.
    pub match_quality: f64,
    pub miss_limit_interim: u32,
    pub miss_limit_final: u32,
    pub stability_decay: f64,
    pub dp: WindowDpConfig,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            max_context: 4,
            window_interim: 8,
            window_final: 12,
            context_weight: 0.25,
            penalty_log_weight: 0.6,
            penalty_linear_weight: 0.25,
            final_bonus: 0.3,
            accept_interim: 1.4,
            accept_final: 1.0,
            match_quality: 2.0,
            miss_limit_interim: 3,
            miss_limit_final: 1,
            stability_decay: 0.8,
            dp: WindowDpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DpPenalties {
    pub skip_reference: f64,
    pub skip_recognized: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowDpConfig {
    pub tail_words: usize,
    pub window_back: usize,
    pub window_ahead: usize,
    pub interim_penalties: DpPenalties,
    pub final_penalties: DpPenalties,
    pub proximity_weight: f64,
    pub min_coverage: f64,
    pub match_coverage: f64,
}

impl Default for WindowDpConfig {
    fn default() -> Self {
        Self {
            tail_words: 6,
            window_back: 2,
            window_ahead: 16,
            interim_penalties: DpPenalties {
                skip_reference: 0.6,
                skip_recognized: 0.8,
            },
            final_penalties: DpPenalties {
                skip_reference: 0.4,
                skip_recognized: 0.6,
            },
            proximity_weight: 0.01,
            min_coverage: 0.5,
            match_coverage: 0.75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmoothingStrategy {
    MovingAverage { window: usize },
    Kalman {
        process_noise: f32,
        measurement_noise: f32,
    },
}

impl Default for SmoothingStrategy {
    fn default() -> Self {
        Self::MovingAverage {
            window: ConfidenceConfig::DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub strategy: SmoothingStrategy,
    /// Substituted for missing or unusable raw confidence values.
    pub default_confidence: f32,
}

impl ConfidenceConfig {
    pub const DEFAULT_WINDOW: usize = 10;
    pub const DEFAULT_CONFIDENCE: f32 = 0.5;
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            strategy: SmoothingStrategy::default(),
            default_confidence: Self::DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub tentative_max_ahead: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            tentative_max_ahead: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_ms: u64,
    pub idle_check_interval_ms: u64,
    pub restart_debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 9_000,
            idle_check_interval_ms: 4_000,
            restart_debounce_ms: 180,
        }
    }
}
