//! Recognition-session recovery policy.
//!
//! The engine never owns a recognizer. Hosts report recognizer errors and
//! "ended" notifications here, and poll the supervisor with their own clock
//! to learn when a restart is due.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// No further speech will be delivered (permission or service refused).
    PermissionDenied,
    NoSpeech,
    /// Session torn down, usually by our own restart.
    Aborted,
    Other(String),
}

impl RecognitionErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn action(&self) -> RecoveryAction {
        match self {
            Self::PermissionDenied => RecoveryAction::Stop,
            Self::NoSpeech | Self::Aborted => RecoveryAction::Ignore,
            Self::Other(code) => RecoveryAction::Report { code: code.clone() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Stop listening and do not auto-resume.
    Stop,
    Ignore,
    /// Surface to the user; alignment state stays intact for a retry.
    Report { code: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartReason {
    Idle,
    RecognizerEnded,
}

/// Idle watchdog plus debounced auto-restart.
#[derive(Debug, Clone)]
pub struct SessionSupervisor {
    idle_timeout: Duration,
    check_interval: Duration,
    debounce: Duration,
    listening: bool,
    stopped: bool,
    last_activity: Option<Instant>,
    last_check: Option<Instant>,
    restart_due: Option<Instant>,
}

impl SessionSupervisor {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            idle_timeout: Duration::from_millis(config.idle_timeout_ms),
            check_interval: Duration::from_millis(config.idle_check_interval_ms),
            debounce: Duration::from_millis(config.restart_debounce_ms),
            listening: false,
            stopped: false,
            last_activity: None,
            last_check: None,
            restart_due: None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn start(&mut self, now: Instant) {
        self.listening = true;
        self.stopped = false;
        self.last_activity = Some(now);
        self.last_check = Some(now);
        self.restart_due = None;
    }

    /// User-requested stop; suppresses auto-restart until the next `start`.
    pub fn stop(&mut self) {
        self.listening = false;
        self.stopped = true;
        self.restart_due = None;
    }

    pub fn record_transcript(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Applies the recovery policy for a recognizer error.
    pub fn on_error(&mut self, code: &str) -> RecoveryAction {
        let action = RecognitionErrorKind::from_code(code).action();
        if action == RecoveryAction::Stop {
            tracing::info!(code, "session: recognizer refused, stopping");
            self.stop();
        }
        action
    }

    /// Recognizer ended on its own; schedule a debounced restart unless the
    /// session was stopped.
    pub fn on_recognizer_end(&mut self, now: Instant) {
        if self.listening && !self.stopped {
            self.restart_due = Some(now + self.debounce);
        }
    }

    /// Returns a restart reason when the host should restart recognition.
    pub fn poll(&mut self, now: Instant) -> Option<RestartReason> {
        if !self.listening || self.stopped {
            return None;
        }
        if let Some(due) = self.restart_due {
            if now >= due {
                self.restart_due = None;
                self.last_activity = Some(now);
                return Some(RestartReason::RecognizerEnded);
            }
        }

        let last_check = self.last_check.unwrap_or(now);
        if now.saturating_duration_since(last_check) < self.check_interval {
            return None;
        }
        self.last_check = Some(now);
        let last_activity = self.last_activity.unwrap_or(now);
        if now.saturating_duration_since(last_activity) >= self.idle_timeout {
            tracing::info!(
                idle_ms = now.saturating_duration_since(last_activity).as_millis() as u64,
                "session: no transcript, restarting recognizer"
            );
            self.last_activity = Some(now);
            return Some(RestartReason::Idle);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn error_codes_map_to_actions() {
        assert_eq!(
            RecognitionErrorKind::from_code("not-allowed").action(),
            RecoveryAction::Stop
        );
        assert_eq!(
            RecognitionErrorKind::from_code("service-not-allowed").action(),
            RecoveryAction::Stop
        );
        assert_eq!(
            RecognitionErrorKind::from_code("no-speech").action(),
            RecoveryAction::Ignore
        );
        assert_eq!(
            RecognitionErrorKind::from_code("aborted").action(),
            RecoveryAction::Ignore
        );
        assert_eq!(
            RecognitionErrorKind::from_code("network").action(),
            RecoveryAction::Report {
                code: "network".into()
            }
        );
    }

    #[test]
    fn idle_watchdog_fires_on_check_after_timeout() {
        let mut sup = SessionSupervisor::new(&SessionConfig::default());
        let t0 = Instant::now();
        sup.start(t0);
        assert_eq!(sup.poll(t0 + ms(4_000)), None);
        assert_eq!(sup.poll(t0 + ms(8_000)), None);
        assert_eq!(sup.poll(t0 + ms(10_000)), None);
        assert_eq!(sup.poll(t0 + ms(12_000)), Some(RestartReason::Idle));
    }

    #[test]
    fn transcripts_keep_watchdog_quiet() {
        let mut sup = SessionSupervisor::new(&SessionConfig::default());
        let t0 = Instant::now();
        sup.start(t0);
        sup.record_transcript(t0 + ms(7_000));
        assert_eq!(sup.poll(t0 + ms(12_000)), None);
    }

    #[test]
    fn recognizer_end_restarts_after_debounce() {
        let mut sup = SessionSupervisor::new(&SessionConfig::default());
        let t0 = Instant::now();
        sup.start(t0);
        sup.on_recognizer_end(t0 + ms(1_000));
        assert_eq!(sup.poll(t0 + ms(1_100)), None);
        assert_eq!(
            sup.poll(t0 + ms(1_180)),
            Some(RestartReason::RecognizerEnded)
        );
        assert_eq!(sup.poll(t0 + ms(1_200)), None);
    }

    #[test]
    fn permission_error_suppresses_restart() {
        let mut sup = SessionSupervisor::new(&SessionConfig::default());
        let t0 = Instant::now();
        sup.start(t0);
        assert_eq!(sup.on_error("not-allowed"), RecoveryAction::Stop);
        sup.on_recognizer_end(t0 + ms(10));
        assert!(!sup.is_listening());
        assert_eq!(sup.poll(t0 + ms(20_000)), None);
    }

    #[test]
    fn user_stop_suppresses_restart() {
        let mut sup = SessionSupervisor::new(&SessionConfig::default());
        let t0 = Instant::now();
        sup.start(t0);
        sup.on_recognizer_end(t0);
        sup.stop();
        assert_eq!(sup.poll(t0 + ms(500)), None);
    }
}
