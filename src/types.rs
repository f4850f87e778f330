use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Word,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    /// Byte offset of the token in the source text.
    pub source_offset: usize,
}

/// Reference text split into alternating word/whitespace tokens.
///
/// `words[i]` is the normalized form of the i-th word token and
/// `word_offsets[i]` its byte offset in the source. A word whose normalized
/// form is empty (pure punctuation) keeps its slot so that word indices
/// stay aligned with the rendered tokens; it never scores as a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedText {
    pub tokens: Vec<Token>,
    pub words: Vec<String>,
    pub word_offsets: Vec<usize>,
}

impl TokenizedText {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Index of the word containing or preceding `offset`; `None` when the
    /// text has no words.
    pub fn word_index_at(&self, offset: usize) -> Option<usize> {
        if self.word_offsets.is_empty() {
            return None;
        }
        let after = self.word_offsets.partition_point(|&start| start <= offset);
        Some(after.saturating_sub(1))
    }

    /// Word index of the token at `token_index`, if that token is a word.
    pub fn word_index_for_token(&self, token_index: usize) -> Option<usize> {
        let token = self.tokens.get(token_index)?;
        if token.kind != TokenKind::Word {
            return None;
        }
        self.word_offsets
            .binary_search(&token.source_offset)
            .ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordState {
    #[default]
    Pending,
    Matched,
    Missed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMode {
    #[default]
    Precise,
    Speed,
}

impl RecognitionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Precise => "precise",
            Self::Speed => "speed",
        }
    }
}

impl fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcription update from the speech-input source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognitionEvent {
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
    /// Raw per-result confidences. `None` marks a result that carried no
    /// confidence value.
    #[serde(default)]
    pub confidence_samples: Vec<Option<f32>>,
}

impl RecognitionEvent {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
            confidence_samples: Vec::new(),
        }
    }

    pub fn settled(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
            confidence_samples: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, samples: &[f32]) -> Self {
        self.confidence_samples = samples.iter().copied().map(Some).collect();
        self
    }

    /// Mean of the usable samples, each clamped to `[0, 1]`. Missing and
    /// non-finite samples are dropped; with nothing usable left the
    /// `default` is returned.
    pub fn raw_confidence(&self, default: f32) -> f32 {
        let (sum, count) = self
            .confidence_samples
            .iter()
            .flatten()
            .filter(|c| c.is_finite())
            .fold((0.0f32, 0usize), |(sum, count), &c| {
                (sum + c.clamp(0.0, 1.0), count + 1)
            });
        if count == 0 {
            default
        } else {
            sum / count as f32
        }
    }
}

/// A single state change for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HighlightCommand {
    /// Words `span_start..=index` were recognized. With `mark_skipped`,
    /// words between the previous cursor and `span_start` become missed.
    Match {
        index: usize,
        span_start: usize,
        confidence: f32,
        mark_skipped: bool,
    },
    /// Advance to `index` without recognizing it. With `mark_skipped`,
    /// the passed-over words up to and including `index` become missed.
    Skip {
        index: usize,
        confidence: f32,
        mark_skipped: bool,
    },
    /// Revert to `target` (`None` = before the first word); every word
    /// past it returns to pending.
    Rollback { target: Option<usize> },
    /// Paint `index` as a preview without committing anything.
    Tentative { index: usize, confidence: f32 },
    /// User-selected position.
    Manual { index: usize },
}

impl HighlightCommand {
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Match { .. } => "match",
            Self::Skip { .. } => "skip",
            Self::Rollback { .. } => "rollback",
            Self::Tentative { .. } => "tentative",
            Self::Manual { .. } => "manual",
        }
    }

    /// Word this command activates, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Match { index, .. }
            | Self::Skip { index, .. }
            | Self::Tentative { index, .. }
            | Self::Manual { index } => Some(*index),
            Self::Rollback { target } => *target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub matched: usize,
    pub missed: usize,
    pub pending: usize,
}

impl Progress {
    pub fn total(&self) -> usize {
        self.matched + self.missed + self.pending
    }
}

/// Semantic progress notification; the English rendering via `Display`
/// is a convenience for hosts without their own phrasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusUpdate {
    ReferenceLoaded { words: usize },
    ReferenceRejected { message: String },
    ModeChanged { mode: RecognitionMode },
    Listening { transcript: String, confidence: f32 },
    Recognized {
        transcript: String,
        confidence: f32,
        progress: Progress,
    },
    Duplicate { transcript: String },
    NoReference,
    Restarted { mode: RecognitionMode },
    Reset,
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceLoaded { words } => write!(f, "script loaded ({words} words)"),
            Self::ReferenceRejected { message } => write!(f, "script rejected: {message}"),
            Self::ModeChanged { mode } => write!(f, "[{mode}] ready"),
            Self::Listening {
                transcript,
                confidence,
            } => write!(
                f,
                "listening: {transcript} (confidence {:.0}%)",
                confidence * 100.0
            ),
            Self::Recognized {
                transcript,
                confidence,
                progress,
            } => write!(
                f,
                "recognized: {transcript} (confidence {:.0}%, {}/{} read)",
                confidence * 100.0,
                progress.matched,
                progress.total()
            ),
            Self::Duplicate { transcript } => write!(f, "listening: {transcript}"),
            Self::NoReference => f.write_str("no script loaded"),
            Self::Restarted { mode } => write!(f, "[{mode}] resumed, keep reading"),
            Self::Reset => f.write_str("reset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    Highlight(HighlightCommand),
    Status(StatusUpdate),
}
