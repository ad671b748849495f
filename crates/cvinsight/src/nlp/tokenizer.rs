//! Rule-based tokenizer and sentence splitter shared by both NLP tiers.
//!
//! Offsets are byte offsets into the original text so that entity spans can
//! be sliced back out of it.

use crate::types::{Span, Token, TokenTag};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        [A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}   # email
        | (?:https?://|www\.)[^\s<>()]+                  # url
        | \p{L}[\p{L}\p{M}\p{N}'’-]*                     # word
        | \p{N}+(?:[.,:/]\p{N}+)*                        # number
        | \S                                             # anything else, one char
        ",
    )
    .expect("Token regex pattern is valid and should compile")
});

/// Split `text` into tagged tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| {
            let raw = m.as_str();
            let trimmed = match raw.trim_end_matches(['-', '\'', '’']) {
                "" => raw,
                t => t,
            };
            let end = m.start() + trimmed.len();
            let token_text = &text[m.start()..end];
            Token {
                start: m.start(),
                end,
                text: token_text.to_string(),
                tag: classify(token_text),
            }
        })
        .collect()
}

fn classify(token: &str) -> TokenTag {
    let Some(first) = token.chars().next() else {
        return TokenTag::Symbol;
    };

    if token.contains('@') && token.len() > 1 {
        return TokenTag::Email;
    }
    if token.starts_with("http://") || token.starts_with("https://") || token.starts_with("www.") {
        return TokenTag::Url;
    }
    if first.is_numeric() {
        return TokenTag::Number;
    }
    if first.is_alphabetic() {
        return if first.is_uppercase() {
            TokenTag::ProperNoun
        } else {
            TokenTag::Word
        };
    }
    if first.is_ascii_punctuation() || matches!(first, '–' | '—' | '“' | '”' | '‘' | '’' | '…' | '•') {
        TokenTag::Punct
    } else {
        TokenTag::Symbol
    }
}

/// Sentence spans. A sentence ends at a line break, or at `.`, `!` or `?`
/// followed by whitespace. Spans are trimmed and never empty.
pub fn sentences(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let mut start = line_start;
        let mut chars = line.char_indices().peekable();
        while let Some((idx, c)) = chars.next() {
            if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
                let end = line_start + idx + c.len_utf8();
                push_trimmed(text, start, end, &mut spans);
                start = end;
            }
        }
        push_trimmed(text, start, line_start + line.len(), &mut spans);
        line_start += line.len();
    }

    spans
}

fn push_trimmed(text: &str, start: usize, end: usize, spans: &mut Vec<Span>) {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if !trimmed.is_empty() {
        let s = start + leading;
        spans.push(Span {
            start: s,
            end: s + trimmed.len(),
        });
    }
}

/// Lines of `text` with their byte offsets, excluding the line terminator.
pub fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        (start, raw.trim_end_matches(['\n', '\r']))
    })
}
