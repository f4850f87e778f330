use crate::alignment::precise::next_index;
use crate::types::{HighlightCommand, Progress, WordState};

/// Per-word state and the cursor. Applying a command is the only way word
/// states change.
#[derive(Debug, Clone, Default)]
pub struct HighlightState {
    states: Vec<WordState>,
    confidences: Vec<f32>,
    cursor: Option<usize>,
    active: Option<usize>,
    tentative_max_ahead: usize,
}

impl HighlightState {
    pub fn new(word_count: usize, tentative_max_ahead: usize) -> Self {
        Self {
            states: vec![WordState::Pending; word_count],
            confidences: vec![0.0; word_count],
            cursor: None,
            active: None,
            tentative_max_ahead,
        }
    }

    /// Every word back to pending, cursor cleared.
    pub fn reset(&mut self, word_count: usize) {
        *self = Self::new(word_count, self.tentative_max_ahead);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[WordState] {
        &self.states
    }

    pub fn confidences(&self) -> &[f32] {
        &self.confidences
    }

    /// Last committed word. Both aligners search forward from here, and
    /// only recognition, manual seeks and rollbacks move it.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The one word currently painted as active; may be a tentative preview.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn progress(&self) -> Progress {
        let mut progress = Progress::default();
        for state in &self.states {
            match state {
                WordState::Matched => progress.matched += 1,
                WordState::Missed => progress.missed += 1,
                WordState::Pending => progress.pending += 1,
            }
        }
        progress
    }

    /// Applies one command; returns `false` if it was rejected and nothing
    /// changed.
    pub fn apply(&mut self, command: &HighlightCommand) -> bool {
        match *command {
            HighlightCommand::Match {
                index,
                span_start,
                confidence,
                mark_skipped,
            } => {
                if index >= self.len() {
                    return false;
                }
                let from = next_index(self.cursor);
                if mark_skipped {
                    for i in from..span_start.min(index) {
                        self.set(i, WordState::Missed, confidence);
                    }
                }
                for i in span_start.max(from)..index {
                    self.set(i, WordState::Matched, confidence);
                }
                self.set(index, WordState::Matched, confidence);
                self.commit(index);
                true
            }
            HighlightCommand::Skip {
                index,
                confidence,
                mark_skipped,
            } => {
                if index >= self.len() {
                    return false;
                }
                if mark_skipped {
                    let from = match self.cursor {
                        Some(c) if c >= index => index,
                        cursor => next_index(cursor),
                    };
                    for i in from..=index {
                        self.set(i, WordState::Missed, confidence);
                    }
                }
                self.commit(index);
                true
            }
            HighlightCommand::Rollback { target } => {
                let target = match (target, self.len()) {
                    (_, 0) => None,
                    (Some(t), len) => Some(t.min(len - 1)),
                    (None, _) => None,
                };
                for i in next_index(target)..self.len() {
                    self.states[i] = WordState::Pending;
                    self.confidences[i] = 0.0;
                }
                self.cursor = target;
                self.active = target;
                true
            }
            HighlightCommand::Tentative { index, .. } => {
                if index >= self.len() {
                    return false;
                }
                let ahead = match self.cursor {
                    Some(c) if index <= c => return false,
                    Some(c) => index - c,
                    None => index + 1,
                };
                if ahead > self.tentative_max_ahead {
                    return false;
                }
                self.active = Some(index);
                true
            }
            HighlightCommand::Manual { index } => {
                if index >= self.len() {
                    return false;
                }
                self.commit(index);
                true
            }
        }
    }

    fn set(&mut self, index: usize, state: WordState, confidence: f32) {
        self.states[index] = state;
        self.confidences[index] = confidence.clamp(0.0, 1.0);
    }

    fn commit(&mut self, index: usize) {
        self.cursor = Some(index);
        self.active = Some(index);
    }
}
