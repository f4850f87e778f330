use crate::config::NormalizationMode;

/// Folds text into the comparable form used for matching: lowercase,
/// curly single quotes folded to `'`, everything except letters, digits,
/// apostrophes and whitespace replaced by a space, whitespace collapsed
/// and trimmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalizer {
    mode: NormalizationMode,
}

impl Normalizer {
    pub fn new(mode: NormalizationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    pub fn normalize(&self, input: &str) -> String {
        match self.mode {
            NormalizationMode::Unicode => normalize_for_match(input),
            NormalizationMode::Ascii => normalize_ascii(input),
        }
    }

    /// Normalized words of `input`, in order.
    pub fn words(&self, input: &str) -> Vec<String> {
        self.normalize(input)
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

pub fn normalize_for_match(input: &str) -> String {
    fold(input, |c| c.is_alphabetic() || c.is_numeric())
}

/// Locale-unaware variant that keeps only ASCII letters and digits.
pub fn normalize_ascii(input: &str) -> String {
    fold(input, |c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

fn fold(input: &str, keep: impl Fn(char) -> bool) -> String {
    let mut mapped = String::with_capacity(input.len());
    for c in input.chars().flat_map(char::to_lowercase) {
        let c = match c {
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        };
        if c == '\'' || c.is_whitespace() || keep(c) {
            mapped.push(c);
        } else {
            mapped.push(' ');
        }
    }

    let mut out = String::with_capacity(mapped.len());
    for word in mapped.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
