//! Word-pair similarity used by every aligner.
//!
//! Recognizer errors cluster around near-homophones and single-character
//! substitutions, so the score is a ladder: exact, prefix, small edit
//! distance, then Jaro-Winkler similarity for longer words. The first rung
//! that applies decides the score.

/// Returned when two words should not be aligned.
pub const NO_MATCH: f64 = -100.0;

pub const SCORE_EXACT: f64 = 3.0;
pub const SCORE_PREFIX: f64 = 2.0;
pub const SCORE_EDIT_ONE: f64 = 2.0;
const SCORE_EDIT_TWO_LONG: f64 = 1.5;
const SCORE_EDIT_TWO: f64 = 1.2;
const SCORE_EDIT_HALF: f64 = 1.0;
const MIN_LEN_EDIT_HALF: usize = 5;
const MIN_LEN_JARO_WINKLER: usize = 4;

/// Jaro-Winkler tiers, highest first.
const JW_TIERS: [(f64, f64); 4] = [(0.75, 1.2), (0.70, 0.9), (0.65, 0.7), (0.60, 0.5)];

const WINKLER_PREFIX_CAP: usize = 4;
const WINKLER_SCALE: f64 = 0.1;

pub fn score_word_match(reference: &str, recognized: &str) -> f64 {
    if reference.is_empty() || recognized.is_empty() {
        return NO_MATCH;
    }
    if reference == recognized {
        return SCORE_EXACT;
    }
    if reference.starts_with(recognized) || recognized.starts_with(reference) {
        return SCORE_PREFIX;
    }

    let a: Vec<char> = reference.chars().collect();
    let b: Vec<char> = recognized.chars().collect();
    let dist = levenshtein(&a, &b);
    let min_len = a.len().min(b.len());
    let max_len = a.len().max(b.len());

    if dist == 1 {
        return SCORE_EDIT_ONE;
    }
    if dist == 2 && min_len > 4 {
        return SCORE_EDIT_TWO_LONG;
    }
    if dist == 2 && min_len > 3 {
        return SCORE_EDIT_TWO;
    }
    if min_len >= MIN_LEN_EDIT_HALF && dist <= min_len.div_ceil(2) {
        return SCORE_EDIT_HALF;
    }

    if max_len >= MIN_LEN_JARO_WINKLER {
        let similarity = jaro_winkler(&a, &b);
        for (threshold, score) in JW_TIERS {
            if similarity >= threshold {
                return score;
            }
        }
    }

    NO_MATCH
}

pub fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diag
            } else {
                diag.min(row[j]).min(above) + 1
            };
            diag = above;
        }
    }
    row[b.len()]
}

pub fn jaro_winkler(a: &[char], b: &[char]) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let match_distance = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, &ca) in a.iter().enumerate() {
        let start = i.saturating_sub(match_distance);
        let end = (i + match_distance + 1).min(b.len());
        for j in start..end {
            if b_matched[j] || ca != b[j] {
                continue;
            }
            a_matched[i] = true;
            b_matched[j] = true;
            matches += 1;
            break;
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut k = 0usize;
    for (i, &ca) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[k] {
            k += 1;
        }
        if ca != b[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let jaro = (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64 / 2.0) / m)
        / 3.0;

    let prefix = a
        .iter()
        .zip(b.iter())
        .take(WINKLER_PREFIX_CAP)
        .take_while(|(x, y)| x == y)
        .count();

    jaro + prefix as f64 * WINKLER_SCALE * (1.0 - jaro)
}
