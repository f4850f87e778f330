use crate::alignment::precise::{next_index, PreciseAligner, WindowMatch};
use crate::alignment::speed::{AlignmentState, SpeedAligner};
use crate::config::EngineConfig;
use crate::error::FollowError;
use crate::highlight::HighlightState;
use crate::pipeline::builder::FollowEngineBuilder;
use crate::pipeline::traits::{ConfidenceSmoother, Tokenizer, WordScorer};
use crate::session::{RecognitionErrorKind, RecoveryAction};
use crate::types::{
    EngineEvent, HighlightCommand, Progress, RecognitionEvent, RecognitionMode, StatusUpdate,
    Token, TokenizedText, WordState,
};

/// Owns the reference text, the cursor and every piece of alignment state.
/// All calls are synchronous and return the events they produced.
pub struct FollowEngine {
    config: EngineConfig,
    tokenizer: Box<dyn Tokenizer>,
    scorer: Box<dyn WordScorer>,
    smoother: Box<dyn ConfidenceSmoother>,
    precise: PreciseAligner,
    speed: SpeedAligner,
    text: TokenizedText,
    highlight: HighlightState,
    mode: RecognitionMode,
    speed_state: AlignmentState,
    pending_gap: bool,
    unmatched_count: u32,
    last_precise_key: Option<String>,
    last_speed_key: Option<String>,
}

pub(crate) struct FollowEngineParts {
    pub config: EngineConfig,
    pub tokenizer: Box<dyn Tokenizer>,
    pub scorer: Box<dyn WordScorer>,
    pub smoother: Box<dyn ConfidenceSmoother>,
}

impl FollowEngine {
    pub fn new(config: EngineConfig) -> Result<Self, FollowError> {
        FollowEngineBuilder::new(config).build()
    }

    pub(crate) fn from_parts(parts: FollowEngineParts) -> Self {
        let config = parts.config;
        Self {
            precise: PreciseAligner::new(config.precise.clone()),
            speed: SpeedAligner::new(config.speed.clone()),
            highlight: HighlightState::new(0, config.highlight.tentative_max_ahead),
            mode: config.mode,
            tokenizer: parts.tokenizer,
            scorer: parts.scorer,
            smoother: parts.smoother,
            text: TokenizedText::default(),
            speed_state: AlignmentState::new(),
            pending_gap: false,
            unmatched_count: 0,
            last_precise_key: None,
            last_speed_key: None,
            config,
        }
    }

    /// Tokenizes `text` and resets everything, including the confidence
    /// smoother.
    pub fn set_reference_text(&mut self, text: &str) -> Vec<EngineEvent> {
        self.load_reference(self.tokenizer.tokenize(text));
        let words = self.text.word_count();
        tracing::info!(
            words,
            tokens = self.text.tokens.len(),
            "reference text loaded"
        );
        vec![EngineEvent::Status(StatusUpdate::ReferenceLoaded { words })]
    }

    /// Like [`set_reference_text`](Self::set_reference_text) for raw input;
    /// bytes that are not UTF-8 leave the engine empty.
    pub fn set_reference_bytes(&mut self, bytes: &[u8]) -> Vec<EngineEvent> {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.set_reference_text(text),
            Err(e) => {
                tracing::warn!(
                    valid_up_to = e.valid_up_to(),
                    "reference text is not valid UTF-8; clearing reference"
                );
                self.load_reference(TokenizedText::default());
                vec![EngineEvent::Status(StatusUpdate::ReferenceRejected {
                    message: format!("reference text is not valid UTF-8: {e}"),
                })]
            }
        }
    }

    pub fn on_recognition_event(&mut self, event: &RecognitionEvent) -> Vec<EngineEvent> {
        let raw = event.raw_confidence(self.config.confidence.default_confidence);
        let confidence = self.smoother.smooth(raw);
        let transcript = event.transcript.trim().to_owned();
        let normalized = self.tokenizer.normalize(&event.transcript);

        if normalized.is_empty() {
            return vec![EngineEvent::Status(StatusUpdate::Listening {
                transcript,
                confidence,
            })];
        }
        if self.text.is_empty() {
            return vec![EngineEvent::Status(StatusUpdate::NoReference)];
        }

        let key = match self.mode {
            RecognitionMode::Precise => &mut self.last_precise_key,
            RecognitionMode::Speed => &mut self.last_speed_key,
        };
        if event.is_final {
            *key = None;
        } else if key.as_deref() == Some(normalized.as_str()) {
            tracing::debug!(transcript = normalized.as_str(), "duplicate interim ignored");
            return vec![EngineEvent::Status(StatusUpdate::Duplicate { transcript })];
        } else {
            *key = Some(normalized.clone());
        }

        let recognized: Vec<String> = normalized.split(' ').map(str::to_owned).collect();
        let commands = match self.mode {
            RecognitionMode::Precise => {
                self.follow_precise(&recognized, event.is_final, confidence)
            }
            RecognitionMode::Speed => self.speed.process(
                &mut self.speed_state,
                &self.text.words,
                &recognized,
                event.is_final,
                confidence,
                self.scorer.as_ref(),
            ),
        };

        let mut events = Vec::with_capacity(commands.len() + 1);
        for command in commands {
            if self.highlight.apply(&command) {
                events.push(EngineEvent::Highlight(command));
            } else {
                tracing::debug!(
                    outcome = command.outcome(),
                    index = ?command.index(),
                    cursor = ?self.highlight.cursor(),
                    "highlight command rejected"
                );
            }
        }

        let status = if event.is_final {
            StatusUpdate::Recognized {
                transcript,
                confidence,
                progress: self.highlight.progress(),
            }
        } else {
            StatusUpdate::Listening {
                transcript,
                confidence,
            }
        };
        events.push(EngineEvent::Status(status));
        events
    }

    /// Switches strategy; transient alignment state restarts at the cursor.
    pub fn set_mode(&mut self, mode: RecognitionMode) -> Vec<EngineEvent> {
        self.mode = mode;
        self.clear_transient();
        tracing::info!(mode = mode.as_str(), "recognition mode changed");
        vec![EngineEvent::Status(StatusUpdate::ModeChanged { mode })]
    }

    pub fn manual_seek(&mut self, index: usize) -> Result<Vec<EngineEvent>, FollowError> {
        let len = self.text.word_count();
        if index >= len {
            return Err(FollowError::IndexOutOfRange { index, len });
        }
        let command = HighlightCommand::Manual { index };
        self.highlight.apply(&command);
        self.clear_transient();
        tracing::debug!(index, "manual seek");
        Ok(vec![EngineEvent::Highlight(command)])
    }

    /// Every word back to pending and the cursor cleared; the reference
    /// text is kept.
    pub fn reset(&mut self) -> Vec<EngineEvent> {
        let command = HighlightCommand::Rollback { target: None };
        self.highlight.apply(&command);
        self.speed_state = AlignmentState::new();
        self.clear_transient();
        vec![
            EngineEvent::Highlight(command),
            EngineEvent::Status(StatusUpdate::Reset),
        ]
    }

    /// The recognizer was restarted: drop transient state, keep committed
    /// word states and the cursor.
    pub fn on_recognition_restarted(&mut self) -> Vec<EngineEvent> {
        self.clear_transient();
        tracing::info!(
            mode = self.mode.as_str(),
            cursor = ?self.highlight.cursor(),
            "recognition restarted"
        );
        vec![EngineEvent::Status(StatusUpdate::Restarted { mode: self.mode })]
    }

    pub fn on_recognition_error(&self, code: &str) -> RecoveryAction {
        let action = RecognitionErrorKind::from_code(code).action();
        match &action {
            RecoveryAction::Stop => tracing::info!(code, "recognition refused, stopping"),
            RecoveryAction::Ignore => tracing::debug!(code, "recognition error ignored"),
            RecoveryAction::Report { .. } => tracing::warn!(code, "recognition error"),
        }
        action
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn text(&self) -> &TokenizedText {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.text.tokens
    }

    pub fn words(&self) -> &[String] {
        &self.text.words
    }

    pub fn word_states(&self) -> &[WordState] {
        self.highlight.states()
    }

    pub fn confidence(&self) -> &[f32] {
        self.highlight.confidences()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.highlight.cursor()
    }

    pub fn active(&self) -> Option<usize> {
        self.highlight.active()
    }

    pub fn mode(&self) -> RecognitionMode {
        self.mode
    }

    pub fn pending_gap(&self) -> bool {
        self.pending_gap
    }

    pub fn stability(&self) -> f64 {
        self.speed_state.stability()
    }

    pub fn alignment_state(&self) -> &AlignmentState {
        &self.speed_state
    }

    pub fn progress(&self) -> Progress {
        self.highlight.progress()
    }

    pub fn word_index_at(&self, offset: usize) -> Option<usize> {
        self.text.word_index_at(offset)
    }

    fn load_reference(&mut self, text: TokenizedText) {
        self.text = text;
        self.highlight.reset(self.text.word_count());
        self.speed_state = AlignmentState::new();
        self.smoother.reset();
        self.clear_transient();
    }

    fn clear_transient(&mut self) {
        self.pending_gap = false;
        self.unmatched_count = 0;
        self.last_precise_key = None;
        self.last_speed_key = None;
        self.speed_state.reanchor(self.highlight.cursor());
    }

    fn follow_precise(
        &mut self,
        recognized: &[String],
        is_final: bool,
        confidence: f32,
    ) -> Vec<HighlightCommand> {
        let cursor = self.highlight.cursor();
        let words = &self.text.words;
        let scorer = self.scorer.as_ref();
        let mark_skipped = self.config.precise.mark_skipped;

        let lookahead = self.precise.lookahead(is_final);
        match self.precise.find_next(words, recognized, cursor, lookahead, scorer) {
            Some(found) if Some(found.index) == cursor => {
                self.unmatched_count = 0;
                self.pending_gap = false;
                return Vec::new();
            }
            Some(found) if Some(found.index) > cursor => {
                self.unmatched_count = 0;
                self.pending_gap = false;
                return vec![window_command(found, confidence, mark_skipped)];
            }
            Some(found) => {
                tracing::debug!(
                    index = found.index,
                    cursor = ?cursor,
                    "precise: candidate behind cursor"
                );
            }
            None => {}
        }

        self.unmatched_count += 1;
        let escalate = self.unmatched_count >= self.config.precise.recovery_after_misses
            || is_final
            || self.pending_gap;
        if escalate {
            if let Some(found) = self.precise.find_global(words, recognized, cursor, scorer) {
                tracing::debug!(
                    index = found.index,
                    misses = self.unmatched_count,
                    "precise: recovered with global search"
                );
                self.unmatched_count = 0;
                self.pending_gap = false;
                return vec![window_command(found, confidence, mark_skipped)];
            }
            if is_final {
                self.unmatched_count = 0;
                self.pending_gap = false;
                let next = next_index(cursor);
                if next >= words.len() {
                    return Vec::new();
                }
                tracing::debug!(index = next, "precise: soft advance");
                return vec![HighlightCommand::Skip {
                    index: next,
                    confidence,
                    mark_skipped: false,
                }];
            }
        }
        self.pending_gap = true;
        Vec::new()
    }
}

fn window_command(found: WindowMatch, confidence: f32, mark_skipped: bool) -> HighlightCommand {
    HighlightCommand::Match {
        index: found.index,
        span_start: found.span_start,
        confidence,
        mark_skipped,
    }
}
