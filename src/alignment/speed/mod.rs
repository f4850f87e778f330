//! Incremental aligner: maps each recognized word to a reference index,
//! rolls back when the recognizer revises recent words and falls back to a
//! bounded DP alignment when greedy matching stalls.

mod state;
mod window_dp;


pub use state::AlignmentState;
pub use window_dp::{align_window, DpAlignment};

use crate::alignment::precise::{distance_penalty, next_index};
use crate::alignment::scoring::SCORE_EXACT;
use crate::config::SpeedConfig;
use crate::pipeline::traits::WordScorer;
use crate::types::HighlightCommand;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    index: usize,
    word_score: f64,
    total: f64,
}

#[derive(Debug, Clone)]
pub struct SpeedAligner {
    config: SpeedConfig,
}

impl SpeedAligner {
    pub fn new(config: SpeedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpeedConfig {
        &self.config
    }

    /// Feeds one recognized-word sequence (the full transcript of the
    /// current result) and returns the highlight commands it produces.
    pub fn process(
        &self,
        state: &mut AlignmentState,
        reference: &[String],
        recognized: &[String],
        is_final: bool,
        confidence: f32,
        scorer: &dyn WordScorer,
    ) -> Vec<HighlightCommand> {
        let mut commands = Vec::new();
        if reference.is_empty() {
            return commands;
        }

        let common = common_prefix_len(&state.history, recognized);
        // History only holds the current interim segment, so any divergence,
        // including one at the first word, is a revision of it.
        if common < state.history.len() {
            let target = state.map[..common]
                .iter()
                .rev()
                .find_map(|m| *m)
                .or(state.segment_base);
            if target < state.anchor {
                tracing::debug!(
                    common,
                    from = ?state.anchor,
                    to = ?target,
                    "speed: recognizer revised history, rolling back"
                );
                commands.push(HighlightCommand::Rollback { target });
                state.anchor = target;
                state.last_reliable = state.last_reliable.min(target);
            }
            state.truncate(common);
        }

        let resume = state
            .map
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |p| p + 1);
        state.truncate(resume);

        for k in resume..recognized.len() {
            let mapped = self.step(
                state,
                reference,
                recognized,
                k,
                is_final,
                confidence,
                scorer,
                &mut commands,
            );
            state.record(&recognized[k], mapped);
        }

        if is_final {
            state.finish_segment();
        }
        commands
    }

    #[allow(clippy::too_many_arguments)]
    fn step(
        &self,
        state: &mut AlignmentState,
        reference: &[String],
        recognized: &[String],
        k: usize,
        is_final: bool,
        confidence: f32,
        scorer: &dyn WordScorer,
        commands: &mut Vec<HighlightCommand>,
    ) -> Option<usize> {
        let cfg = &self.config;
        let threshold = if is_final {
            cfg.accept_final
        } else {
            cfg.accept_interim
        };
        let candidate =
            self.best_candidate(state.anchor, reference, recognized, k, is_final, scorer);

        if let Some(c) = candidate.filter(|c| c.total >= threshold) {
            state.advance(c.index);
            state.rise(cfg.stability_decay, c.word_score / SCORE_EXACT);
            let command = if c.word_score >= cfg.match_quality {
                HighlightCommand::Match {
                    index: c.index,
                    span_start: c.index,
                    confidence,
                    mark_skipped: true,
                }
            } else {
                HighlightCommand::Skip {
                    index: c.index,
                    confidence,
                    mark_skipped: false,
                }
            };
            tracing::debug!(
                word = recognized[k].as_str(),
                index = c.index,
                total = format!("{:.3}", c.total),
                outcome = command.outcome(),
                "speed: accepted candidate"
            );
            commands.push(command);
            return Some(c.index);
        }

        state.miss_count += 1;
        state.decay(cfg.stability_decay);
        if let Some(c) = candidate {
            if !is_final && c.total >= cfg.accept_final {
                commands.push(HighlightCommand::Tentative {
                    index: c.index,
                    confidence,
                });
            }
        }

        let limit = if is_final {
            cfg.miss_limit_final
        } else {
            cfg.miss_limit_interim
        };
        if state.miss_count < limit {
            return None;
        }
        self.dp_fallback(state, reference, recognized, k, is_final, confidence, scorer, commands)
    }

    fn best_candidate(
        &self,
        anchor: Option<usize>,
        reference: &[String],
        recognized: &[String],
        k: usize,
        is_final: bool,
        scorer: &dyn WordScorer,
    ) -> Option<Candidate> {
        let cfg = &self.config;
        let window = if is_final {
            cfg.window_final
        } else {
            cfg.window_interim
        };
        let lo = next_index(anchor);
        let hi = reference.len().min(lo.saturating_add(window));

        let mut best: Option<Candidate> = None;
        for j in lo..hi {
            let word_score = scorer.score(&reference[j], &recognized[k]);
            if word_score < 0.0 {
                continue;
            }
            let mut support = 0.0;
            for t in 1..cfg.max_context {
                if t > j || t > k {
                    break;
                }
                support += scorer.score(&reference[j - t], &recognized[k - t]).max(0.0);
            }
            let mut total = word_score + cfg.context_weight * support
                - distance_penalty(j - lo, cfg.penalty_log_weight, cfg.penalty_linear_weight);
            if is_final {
                total += cfg.final_bonus;
            }
            if best.map_or(true, |b| total > b.total) {
                best = Some(Candidate {
                    index: j,
                    word_score,
                    total,
                });
            }
        }
        best
    }

    #[allow(clippy::too_many_arguments)]
    fn dp_fallback(
        &self,
        state: &mut AlignmentState,
        reference: &[String],
        recognized: &[String],
        k: usize,
        is_final: bool,
        confidence: f32,
        scorer: &dyn WordScorer,
        commands: &mut Vec<HighlightCommand>,
    ) -> Option<usize> {
        let dp = &self.config.dp;
        let tail_start = (k + 1).saturating_sub(dp.tail_words);
        let tail = &recognized[tail_start..=k];

        let lo = next_index(state.anchor);
        let window_start = lo.saturating_sub(dp.window_back);
        let window_end = reference.len().min(lo.saturating_add(dp.window_ahead));
        if window_start >= window_end {
            return None;
        }

        let penalties = if is_final {
            dp.final_penalties
        } else {
            dp.interim_penalties
        };
        let found = align_window(
            &reference[window_start..window_end],
            tail,
            penalties,
            dp.proximity_weight,
            scorer,
        )?;
        let index = window_start + found.end_offset;
        tracing::debug!(
            tail = tail.len(),
            index,
            coverage = format!("{:.2}", found.coverage),
            "speed: dp fallback"
        );
        if Some(index) <= state.anchor || found.coverage < dp.min_coverage {
            return None;
        }

        state.advance(index);
        state.rise(self.config.stability_decay, found.coverage);
        commands.push(if found.coverage >= dp.match_coverage {
            HighlightCommand::Match {
                index,
                span_start: index,
                confidence,
                mark_skipped: true,
            }
        } else {
            HighlightCommand::Skip {
                index,
                confidence,
                mark_skipped: true,
            }
        });
        Some(index)
    }
}

fn common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
