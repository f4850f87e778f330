use crate::alignment::normalization::Normalizer;
use crate::types::{Token, TokenKind, TokenizedText};

/// Splits `text` into maximal runs of whitespace and non-whitespace.
/// Every non-whitespace run is a word token and gets exactly one slot in
/// the normalized word list, even when it normalizes to nothing.
pub fn tokenize_reference(text: &str, normalizer: &Normalizer) -> TokenizedText {
    let mut tokens = Vec::new();
    let mut words = Vec::new();
    let mut word_offsets = Vec::new();

    let mut run_start = 0usize;
    let mut run_is_ws: Option<bool> = None;
    for (offset, c) in text.char_indices() {
        let is_ws = c.is_whitespace();
        match run_is_ws {
            Some(prev) if prev == is_ws => {}
            Some(prev) => {
                push_run(
                    &text[run_start..offset],
                    run_start,
                    prev,
                    normalizer,
                    &mut tokens,
                    &mut words,
                    &mut word_offsets,
                );
                run_start = offset;
            }
            None => run_start = offset,
        }
        run_is_ws = Some(is_ws);
    }
    if let Some(prev) = run_is_ws {
        push_run(
            &text[run_start..],
            run_start,
            prev,
            normalizer,
            &mut tokens,
            &mut words,
            &mut word_offsets,
        );
    }

    debug_assert_eq!(
        tokens.iter().map(|t| t.text.as_str()).collect::<String>(),
        text,
        "tokenization must cover the source text exactly"
    );
    debug_assert_eq!(words.len(), word_offsets.len());

    TokenizedText {
        tokens,
        words,
        word_offsets,
    }
}

fn push_run(
    slice: &str,
    offset: usize,
    is_ws: bool,
    normalizer: &Normalizer,
    tokens: &mut Vec<Token>,
    words: &mut Vec<String>,
    word_offsets: &mut Vec<usize>,
) {
    let kind = if is_ws {
        TokenKind::Whitespace
    } else {
        words.push(normalizer.normalize(slice));
        word_offsets.push(offset);
        TokenKind::Word
    };
    tokens.push(Token {
        text: slice.to_owned(),
        kind,
        source_offset: offset,
    });
}
