use crate::types::TokenizedText;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> TokenizedText;

    /// Comparable form of a transcript or word; must agree with the
    /// normalization applied to reference words by `tokenize`.
    fn normalize(&self, text: &str) -> String;
}

pub trait WordScorer: Send + Sync {
    /// Similarity of a reference word and a recognized word, both already
    /// normalized. Negative scores mean "do not align".
    fn score(&self, reference: &str, recognized: &str) -> f64;
}

pub trait ConfidenceSmoother: Send {
    /// Admits one raw confidence and returns the smoothed value in `[0, 1]`.
    fn smooth(&mut self, raw: f32) -> f32;

    fn reset(&mut self);
}
