use crate::config::DpPenalties;
use crate::pipeline::traits::WordScorer;

const STEP_DIAG: u8 = 0;
const STEP_UP: u8 = 1;
const STEP_LEFT: u8 = 2;

/// Result of aligning a recognized tail against a reference window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DpAlignment {
    /// Offset into the window of the reference word matched by the last
    /// recognized word.
    pub end_offset: usize,
    /// Diagonal (match) moves divided by the tail length.
    pub coverage: f64,
    pub matched: usize,
    pub score: f64,
}

/// Bounded edit-distance style alignment.
///
/// Rows are recognized words, columns are reference words. Starting
/// anywhere in the window is free; skipping a recognized word or a
/// reference word costs the configured penalty; aligning a pair costs the
/// negated scorer value and is only allowed for non-negative scores. The
/// chosen end column must be reached by a diagonal move and maximizes
/// `-cost - proximity_weight * column`.
pub fn align_window(
    window: &[String],
    tail: &[String],
    penalties: DpPenalties,
    proximity_weight: f64,
    scorer: &dyn WordScorer,
) -> Option<DpAlignment> {
    let m = tail.len();
    let w = window.len();
    if m == 0 || w == 0 {
        return None;
    }

    let cols = w + 1;
    let mut cost = vec![0.0f64; (m + 1) * cols];
    let mut bp = vec![STEP_LEFT; (m + 1) * cols];

    for i in 1..=m {
        cost[i * cols] = i as f64 * penalties.skip_recognized;
        bp[i * cols] = STEP_UP;
        for j in 1..=w {
            let mut best = f64::INFINITY;
            let mut step = STEP_DIAG;

            let s = scorer.score(&window[j - 1], &tail[i - 1]);
            if s >= 0.0 {
                best = cost[(i - 1) * cols + (j - 1)] - s;
            }
            let up = cost[(i - 1) * cols + j] + penalties.skip_recognized;
            if up < best {
                best = up;
                step = STEP_UP;
            }
            let left = cost[i * cols + (j - 1)] + penalties.skip_reference;
            if left < best {
                best = left;
                step = STEP_LEFT;
            }

            cost[i * cols + j] = best;
            bp[i * cols + j] = step;
        }
    }

    let last_row = m * cols;
    let mut best: Option<(usize, f64)> = None;
    for j in 1..=w {
        if bp[last_row + j] != STEP_DIAG {
            continue;
        }
        let adjusted = -cost[last_row + j] - proximity_weight * (j - 1) as f64;
        if best.map_or(true, |(_, b)| adjusted > b) {
            best = Some((j, adjusted));
        }
    }
    let (end_col, score) = best?;

    let mut matched = 0usize;
    let (mut i, mut j) = (m, end_col);
    while i > 0 && j > 0 {
        match bp[i * cols + j] {
            STEP_DIAG => {
                matched += 1;
                i -= 1;
                j -= 1;
            }
            STEP_UP => i -= 1,
            _ => j -= 1,
        }
    }

    Some(DpAlignment {
        end_offset: end_col - 1,
        coverage: matched as f64 / m as f64,
        matched,
        score,
    })
}
