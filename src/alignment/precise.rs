use crate::config::{ContextOrder, PreciseConfig};
use crate::pipeline::traits::WordScorer;

/// Accepted context window: recognized words `[len - context, len)` line up
/// with reference words `span_start..=index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowMatch {
    pub index: usize,
    pub span_start: usize,
    pub context: usize,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
struct SearchParams {
    start: usize,
    end_limit: usize,
    log_weight: f64,
    linear_weight: f64,
    min_single: f64,
    min_per_word: f64,
}

/// Context-window matcher: aligns the trailing words of a transcript with a
/// bounded neighbourhood of the reference around `base`.
#[derive(Debug, Clone)]
pub struct PreciseAligner {
    config: PreciseConfig,
}

impl PreciseAligner {
    pub fn new(config: PreciseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreciseConfig {
        &self.config
    }

    pub fn lookahead(&self, is_final: bool) -> usize {
        if is_final {
            self.config.lookahead_final
        } else {
            self.config.lookahead_interim
        }
    }

    /// Best window within `[base + 1 - backtrack, base + 1 + lookahead)`.
    pub fn find_next(
        &self,
        reference: &[String],
        recognized: &[String],
        base: Option<usize>,
        lookahead: usize,
        scorer: &dyn WordScorer,
    ) -> Option<WindowMatch> {
        let next = next_index(base);
        let params = SearchParams {
            start: next.saturating_sub(self.config.backtrack),
            end_limit: next.saturating_add(lookahead),
            log_weight: self.config.penalty_log_weight,
            linear_weight: self.config.penalty_linear_weight,
            min_single: self.config.min_score_single,
            min_per_word: self.config.min_score_per_word,
        };
        self.search(reference, recognized, base, params, scorer).0
    }

    /// Recovery search: strictly after `base`, no lookahead bound unless
    /// configured, heavier distance penalty and its own thresholds.
    pub fn find_global(
        &self,
        reference: &[String],
        recognized: &[String],
        base: Option<usize>,
        scorer: &dyn WordScorer,
    ) -> Option<WindowMatch> {
        if reference.is_empty() {
            return None;
        }
        let next = next_index(base);
        let params = SearchParams {
            start: next,
            end_limit: self
                .config
                .global_lookahead
                .map_or(usize::MAX, |limit| next.saturating_add(limit)),
            log_weight: self.config.global_penalty_log_weight,
            linear_weight: self.config.global_penalty_linear_weight,
            min_single: self.config.global_min_score_single,
            min_per_word: self.config.global_min_score_per_word,
        };
        match self.search(reference, recognized, base, params, scorer) {
            (Some(found), _) => Some(found),
            (None, Some(best)) if best.score >= self.config.global_min_threshold => Some(best),
            _ => None,
        }
    }

    /// Returns the first window that clears its context threshold, plus
    /// the best-scoring window seen overall.
    fn search(
        &self,
        reference: &[String],
        recognized: &[String],
        base: Option<usize>,
        params: SearchParams,
        scorer: &dyn WordScorer,
    ) -> (Option<WindowMatch>, Option<WindowMatch>) {
        let max_context = self.config.max_context.min(recognized.len());
        let contexts: Vec<usize> = match self.config.context_order {
            ContextOrder::LongestFirst => (1..=max_context).rev().collect(),
            ContextOrder::ShortestFirst => (1..=max_context).collect(),
        };

        let mut overall: Option<WindowMatch> = None;
        for context in contexts {
            if reference.len() < context {
                continue;
            }
            let slice = &recognized[recognized.len() - context..];
            let end = (reference.len() - context + 1).min(params.end_limit);
            if end <= params.start {
                continue;
            }

            let mut best: Option<WindowMatch> = None;
            for start in params.start..end {
                let Some(raw) = window_score(&reference[start..start + context], slice, scorer)
                else {
                    continue;
                };
                let index = start + context - 1;
                let distance = forward_distance(index, base);
                let score =
                    raw - distance_penalty(distance, params.log_weight, params.linear_weight);
                if best.map_or(true, |b| score > b.score) {
                    best = Some(WindowMatch {
                        index,
                        span_start: start,
                        context,
                        score,
                    });
                }
            }

            let Some(best) = best else {
                continue;
            };
            if overall.map_or(true, |o| best.score > o.score) {
                overall = Some(best);
            }
            let min_score = if context == 1 {
                params.min_single
            } else {
                context as f64 * params.min_per_word
            };
            tracing::debug!(
                context,
                index = best.index,
                score = format!("{:.3}", best.score),
                min_score,
                "precise: best window for context"
            );
            if best.score >= min_score {
                return (Some(best), overall);
            }
        }
        (None, overall)
    }
}

/// Summed word scores, or `None` if any word in the window is rejected.
fn window_score(
    reference: &[String],
    recognized: &[String],
    scorer: &dyn WordScorer,
) -> Option<f64> {
    let mut total = 0.0;
    for (r, w) in reference.iter().zip(recognized) {
        let s = scorer.score(r, w);
        if s < 0.0 {
            return None;
        }
        total += s;
    }
    Some(total)
}

pub(crate) fn next_index(base: Option<usize>) -> usize {
    base.map_or(0, |b| b + 1)
}

/// Words between `base` and `candidate`; a missing base sits before word 0.
fn forward_distance(candidate: usize, base: Option<usize>) -> usize {
    match base {
        Some(b) => candidate.saturating_sub(b),
        None => candidate + 1,
    }
}

pub(crate) fn distance_penalty(distance: usize, log_weight: f64, linear_weight: f64) -> f64 {
    if distance == 0 {
        return 0.0;
    }
    let d = distance as f64;
    (d + 1.0).log2() * log_weight + d * linear_weight
}
