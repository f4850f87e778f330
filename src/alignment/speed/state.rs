/// Incremental alignment state for the speed aligner.
///
/// `history` is the recognized-word sequence of the current segment and
/// `map[k]` the reference index assigned to `history[k]`. `map` never
/// outgrows `history`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentState {
    pub(crate) history: Vec<String>,
    pub(crate) map: Vec<Option<usize>>,
    pub(crate) anchor: Option<usize>,
    pub(crate) last_reliable: Option<usize>,
    /// Index the current segment started from; rollbacks never go below it.
    pub(crate) segment_base: Option<usize>,
    pub(crate) miss_count: u32,
    pub(crate) stability: f64,
}

impl Default for AlignmentState {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignmentState {
    pub fn new() -> Self {
        Self::anchored_at(None)
    }

    pub fn anchored_at(anchor: Option<usize>) -> Self {
        Self {
            history: Vec::new(),
            map: Vec::new(),
            anchor,
            last_reliable: anchor,
            segment_base: anchor,
            miss_count: 0,
            stability: 0.0,
        }
    }

    /// Drops transient history and restarts from `anchor`. Stability is kept.
    pub fn reanchor(&mut self, anchor: Option<usize>) {
        let stability = self.stability;
        *self = Self::anchored_at(anchor);
        self.stability = stability;
    }

    /// Closes the current segment; the next transcript starts fresh from
    /// the anchor.
    pub fn finish_segment(&mut self) {
        self.history.clear();
        self.map.clear();
        self.segment_base = self.anchor;
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn map(&self) -> &[Option<usize>] {
        &self.map
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    pub fn last_reliable(&self) -> Option<usize> {
        self.last_reliable
    }

    pub fn miss_count(&self) -> u32 {
        self.miss_count
    }

    pub fn stability(&self) -> f64 {
        self.stability
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.history.truncate(len);
        self.map.truncate(len);
    }

    pub(crate) fn record(&mut self, word: &str, mapped: Option<usize>) {
        self.history.push(word.to_owned());
        self.map.push(mapped);
    }

    pub(crate) fn advance(&mut self, index: usize) {
        self.anchor = Some(index);
        self.last_reliable = self.last_reliable.max(Some(index));
        self.miss_count = 0;
    }

    pub(crate) fn rise(&mut self, decay: f64, quality: f64) {
        self.stability = self.stability * decay + (1.0 - decay) * quality.clamp(0.0, 1.0);
    }

    pub(crate) fn decay(&mut self, decay: f64) {
        self.stability *= decay;
    }
}
