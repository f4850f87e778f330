use crate::alignment::normalization::Normalizer;
use crate::alignment::scoring::score_word_match;
use crate::alignment::tokenization::tokenize_reference;
use crate::config::NormalizationMode;
use crate::pipeline::traits::{Tokenizer, WordScorer};
use crate::types::TokenizedText;

/// Whitespace tokenizer with letter/digit normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptTokenizer {
    normalizer: Normalizer,
}

impl ScriptTokenizer {
    pub fn new(mode: NormalizationMode) -> Self {
        Self {
            normalizer: Normalizer::new(mode),
        }
    }
}

impl Tokenizer for ScriptTokenizer {
    fn tokenize(&self, text: &str) -> TokenizedText {
        tokenize_reference(text, &self.normalizer)
    }

    fn normalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }
}

/// Exact / prefix / edit distance / Jaro-Winkler ladder.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridWordScorer;

impl WordScorer for HybridWordScorer {
    fn score(&self, reference: &str, recognized: &str) -> f64 {
        score_word_match(reference, recognized)
    }
}
