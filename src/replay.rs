//! Scripted sessions: feed a recorded sequence of recognizer results and
//! host actions through an engine and collect everything it emitted.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::FollowError;
use crate::pipeline::runtime::FollowEngine;
use crate::session::{RecoveryAction, RestartReason, SessionSupervisor};
use crate::types::{EngineEvent, Progress, RecognitionEvent, RecognitionMode, WordState};

/// Longest simulated silence allowed between two consecutive steps.
pub const MAX_STEP_GAP_MS: u64 = 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub reference: String,
    #[serde(default)]
    pub mode: Option<RecognitionMode>,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn load(path: &Path) -> Result<Self, FollowError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| FollowError::io("read replay script", e))?;
        serde_json::from_str(&data).map_err(|e| FollowError::json("parse replay script", e))
    }
}

/// One scripted action. `at_ms` is milliseconds since the session started;
/// a step without it happens at the previous step's time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayStep {
    Recognition {
        #[serde(default)]
        at_ms: Option<u64>,
        transcript: String,
        #[serde(default)]
        is_final: bool,
        #[serde(default)]
        confidence: Vec<Option<f32>>,
    },
    Seek {
        #[serde(default)]
        at_ms: Option<u64>,
        index: usize,
    },
    Mode {
        #[serde(default)]
        at_ms: Option<u64>,
        mode: RecognitionMode,
    },
    Restart {
        #[serde(default)]
        at_ms: Option<u64>,
    },
    /// The recognizer ended on its own.
    End {
        #[serde(default)]
        at_ms: Option<u64>,
    },
    Reset {
        #[serde(default)]
        at_ms: Option<u64>,
    },
    Error {
        #[serde(default)]
        at_ms: Option<u64>,
        code: String,
    },
}

impl ReplayStep {
    pub fn at_ms(&self) -> Option<u64> {
        match self {
            Self::Recognition { at_ms, .. }
            | Self::Seek { at_ms, .. }
            | Self::Mode { at_ms, .. }
            | Self::Restart { at_ms }
            | Self::End { at_ms }
            | Self::Reset { at_ms }
            | Self::Error { at_ms, .. } => *at_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayMeta {
    pub generated_at: String,
    pub mode: RecognitionMode,
    pub word_count: usize,
    pub step_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayEntry {
    /// Index of the script step, `None` for watchdog restarts.
    pub step: Option<usize>,
    pub at_ms: u64,
    pub event: EngineEvent,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryEntry {
    pub step: usize,
    pub code: String,
    pub action: RecoveryAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestartEntry {
    pub at_ms: u64,
    pub reason: RestartReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalState {
    pub mode: RecognitionMode,
    pub cursor: Option<usize>,
    pub pending_gap: bool,
    pub stability: f64,
    pub progress: Progress,
    pub word_states: Vec<WordState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub meta: ReplayMeta,
    pub events: Vec<ReplayEntry>,
    pub recoveries: Vec<RecoveryEntry>,
    pub restarts: Vec<RestartEntry>,
    pub final_state: FinalState,
}

impl ReplayReport {
    pub fn highlight_count(&self, outcome: &str) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(&e.event, EngineEvent::Highlight(c) if c.outcome() == outcome))
            .count()
    }
}

pub fn run_replay(
    script: &ReplayScript,
    mut config: EngineConfig,
    generated_at: String,
) -> Result<ReplayReport, FollowError> {
    if let Some(mode) = script.mode {
        config.mode = mode;
    }
    let check_interval = Duration::from_millis(config.session.idle_check_interval_ms.max(1));
    let mut supervisor = SessionSupervisor::new(&config.session);
    let mut engine = FollowEngine::new(config)?;

    let mut events = Vec::new();
    let mut recoveries = Vec::new();
    let mut restarts = Vec::new();

    let origin = Instant::now();
    let mut now_ms = 0u64;
    let mut polled = origin;
    supervisor.start(origin);
    for event in engine.set_reference_text(&script.reference) {
        events.push(ReplayEntry {
            step: None,
            at_ms: 0,
            event,
        });
    }

    for (i, step) in script.steps.iter().enumerate() {
        let at_ms = step.at_ms().unwrap_or(now_ms);
        if at_ms < now_ms {
            return Err(FollowError::invalid_input(format!(
                "replay step {i} at {at_ms} ms is earlier than the previous step at {now_ms} ms"
            )));
        }
        if at_ms - now_ms > MAX_STEP_GAP_MS {
            return Err(FollowError::invalid_input(format!(
                "replay step {i} at {at_ms} ms is more than {MAX_STEP_GAP_MS} ms after the previous step"
            )));
        }
        now_ms = at_ms;
        let now = origin + Duration::from_millis(now_ms);

        // Let the watchdog observe every check tick up to this step.
        while polled + check_interval <= now {
            polled += check_interval;
            poll_supervisor(
                &mut supervisor,
                &mut engine,
                polled,
                origin,
                &mut events,
                &mut restarts,
            );
        }
        poll_supervisor(
            &mut supervisor,
            &mut engine,
            now,
            origin,
            &mut events,
            &mut restarts,
        );

        let emitted = match step {
            ReplayStep::Recognition {
                transcript,
                is_final,
                confidence,
                ..
            } => {
                supervisor.record_transcript(now);
                engine.on_recognition_event(&RecognitionEvent {
                    transcript: transcript.clone(),
                    is_final: *is_final,
                    confidence_samples: confidence.clone(),
                })
            }
            ReplayStep::Seek { index, .. } => engine.manual_seek(*index)?,
            ReplayStep::Mode { mode, .. } => engine.set_mode(*mode),
            ReplayStep::Restart { .. } => {
                supervisor.start(now);
                engine.on_recognition_restarted()
            }
            ReplayStep::End { .. } => {
                supervisor.on_recognizer_end(now);
                Vec::new()
            }
            ReplayStep::Reset { .. } => engine.reset(),
            ReplayStep::Error { code, .. } => {
                let action = engine.on_recognition_error(code);
                supervisor.on_error(code);
                recoveries.push(RecoveryEntry {
                    step: i,
                    code: code.clone(),
                    action,
                });
                Vec::new()
            }
        };
        events.extend(emitted.into_iter().map(|event| ReplayEntry {
            step: Some(i),
            at_ms: now_ms,
            event,
        }));
    }

    tracing::debug!(
        steps = script.steps.len(),
        events = events.len(),
        restarts = restarts.len(),
        "replay finished"
    );

    Ok(ReplayReport {
        meta: ReplayMeta {
            generated_at,
            mode: engine.config().mode,
            word_count: engine.words().len(),
            step_count: script.steps.len(),
        },
        events,
        recoveries,
        restarts,
        final_state: FinalState {
            mode: engine.mode(),
            cursor: engine.cursor(),
            pending_gap: engine.pending_gap(),
            stability: engine.stability(),
            progress: engine.progress(),
            word_states: engine.word_states().to_vec(),
        },
    })
}

fn poll_supervisor(
    supervisor: &mut SessionSupervisor,
    engine: &mut FollowEngine,
    now: Instant,
    origin: Instant,
    events: &mut Vec<ReplayEntry>,
    restarts: &mut Vec<RestartEntry>,
) {
    let Some(reason) = supervisor.poll(now) else {
        return;
    };
    let at_ms = now.saturating_duration_since(origin).as_millis() as u64;
    restarts.push(RestartEntry { at_ms, reason });
    events.extend(
        engine
            .on_recognition_restarted()
            .into_iter()
            .map(|event| ReplayEntry {
                step: None,
                at_ms,
                event,
            }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(json: &str) -> ReplayScript {
        serde_json::from_str(json).expect("valid script")
    }

    #[test]
    fn replays_precise_session() {
        let script = script(
            r#"{
                "reference": "the quick brown fox jumps over the lazy dog",
                "steps": [
                    { "type": "recognition", "at_ms": 100, "transcript": "the quick" },
                    { "type": "recognition", "at_ms": 900, "transcript": "the quick brown fox", "is_final": true, "confidence": [0.9] }
                ]
            }"#,
        );
        let report = run_replay(&script, EngineConfig::default(), "now".into()).expect("replay");
        assert_eq!(report.final_state.cursor, Some(3));
        assert_eq!(report.final_state.progress.matched, 4);
        assert_eq!(report.meta.word_count, 9);
        assert!(report.restarts.is_empty());
    }

    #[test]
    fn idle_gap_triggers_watchdog_restart() {
        let script = script(
            r#"{
                "reference": "one two three",
                "steps": [
                    { "type": "recognition", "at_ms": 0, "transcript": "one", "is_final": true },
                    { "type": "recognition", "at_ms": 20000, "transcript": "two", "is_final": true }
                ]
            }"#,
        );
        let report = run_replay(&script, EngineConfig::default(), "now".into()).expect("replay");
        assert_eq!(report.restarts.len(), 1);
        assert_eq!(report.restarts[0].at_ms, 12_000);
        assert_eq!(report.restarts[0].reason, RestartReason::Idle);
        assert_eq!(report.final_state.cursor, Some(1));
    }

    #[test]
    fn permission_error_stops_auto_restart() {
        let script = script(
            r#"{
                "reference": "one two three",
                "steps": [
                    { "type": "error", "at_ms": 10, "code": "not-allowed" },
                    { "type": "end", "at_ms": 20 },
                    { "type": "recognition", "at_ms": 30000, "transcript": "one", "is_final": true }
                ]
            }"#,
        );
        let report = run_replay(&script, EngineConfig::default(), "now".into()).expect("replay");
        assert!(report.restarts.is_empty());
        assert_eq!(report.recoveries[0].action, RecoveryAction::Stop);
    }

    #[test]
    fn steps_must_not_go_back_in_time() {
        let script = script(
            r#"{
                "reference": "one two",
                "steps": [
                    { "type": "reset", "at_ms": 50 },
                    { "type": "reset", "at_ms": 10 }
                ]
            }"#,
        );
        assert!(matches!(
            run_replay(&script, EngineConfig::default(), "now".into()),
            Err(FollowError::InvalidInput { .. })
        ));
    }

    #[test]
    fn oversized_gap_between_steps_is_rejected() {
        let script = script(&format!(
            r#"{{
                "reference": "one two",
                "steps": [
                    {{ "type": "recognition", "at_ms": 10, "transcript": "one" }},
                    {{ "type": "recognition", "at_ms": {}, "transcript": "two" }}
                ]
            }}"#,
            u64::MAX
        ));
        assert!(matches!(
            run_replay(&script, EngineConfig::default(), "now".into()),
            Err(FollowError::InvalidInput { .. })
        ));

        let mut bounded = script.clone();
        bounded.steps[1] = ReplayStep::Recognition {
            at_ms: Some(10 + MAX_STEP_GAP_MS),
            transcript: "two".into(),
            is_final: true,
            confidence: Vec::new(),
        };
        let report =
            run_replay(&bounded, EngineConfig::default(), "now".into()).expect("bounded gap");
        assert_eq!(report.final_state.cursor, Some(1));
        assert!(!report.restarts.is_empty());
    }

    #[test]
    fn out_of_range_seek_fails_replay() {
        let script = script(
            r#"{ "reference": "one two", "steps": [ { "type": "seek", "index": 7 } ] }"#,
        );
        assert!(matches!(
            run_replay(&script, EngineConfig::default(), "now".into()),
            Err(FollowError::IndexOutOfRange { index: 7, len: 2 })
        ));
    }
}
