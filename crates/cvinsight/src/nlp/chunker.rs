//! Shallow parsing: noun-phrase chunks over the tokenizer output.
//!
//! Each token gets a coarse part of speech from its tag, the language's
//! function words and a few verb shapes. A chunk is an optional determiner
//! followed by modifiers and ending on a noun, inside one sentence.

use crate::stopwords::get_stopwords;
use crate::types::{NounChunk, Span, Token, TokenTag};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pos {
    Det,
    Noun,
    Num,
    Verb,
    Function,
    Break,
}

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "these", "those", "my", "our", "their", "his", "her", "its", "your", "every", "each",
    // Indonesian classifiers and plural marker
    "sebuah", "seorang", "beberapa", "para",
];

/// Frequent irregular verbs in English resumes that no suffix rule catches.
const IRREGULAR_VERBS: &[&str] = &[
    "led", "built", "ran", "won", "taught", "wrote", "made", "drove", "grew", "began", "became", "do", "does", "did",
];

static INDONESIAN_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:meng|meny|mem|men|me|ber|ter)\p{L}{4,}$")
        .expect("Indonesian verb regex pattern is valid and should compile")
});

fn pos_of(token: &Token, language: &str, sentence_initial: bool) -> Pos {
    match token.tag {
        TokenTag::Number => return Pos::Num,
        TokenTag::Word | TokenTag::ProperNoun => {}
        _ => return Pos::Break,
    }

    let lower = token.text.to_lowercase();
    if DETERMINERS.contains(&lower.as_str()) {
        return Pos::Det;
    }
    if get_stopwords(language).is_some_and(|words| words.contains(lower.as_str())) {
        return Pos::Function;
    }

    // Capitalised words mid-sentence are names, whatever their shape.
    if token.tag == TokenTag::ProperNoun && !sentence_initial {
        return Pos::Noun;
    }
    let verb = match language {
        "ind" => INDONESIAN_VERB.is_match(&lower),
        _ => IRREGULAR_VERBS.contains(&lower.as_str()) || (lower.len() > 4 && lower.ends_with("ed")),
    };
    if verb { Pos::Verb } else { Pos::Noun }
}

/// Noun-phrase chunks of `text`.
///
/// `tokens` and `sentences` must come from the tokenizer over the same
/// text. `language` selects the function-word list and verb shapes; an
/// unsupported code falls back to the English rules.
pub fn noun_chunks(text: &str, tokens: &[Token], sentences: &[Span], language: &str) -> Vec<NounChunk> {
    let mut chunks = Vec::new();
    let mut rest = tokens;

    for sentence in sentences {
        let start = rest.iter().position(|t| t.start >= sentence.start).unwrap_or(rest.len());
        let len = rest[start..]
            .iter()
            .position(|t| t.end > sentence.end)
            .unwrap_or(rest.len() - start);
        let in_sentence = &rest[start..start + len];
        rest = &rest[start + len..];

        let tags: Vec<Pos> = in_sentence
            .iter()
            .enumerate()
            .map(|(i, t)| pos_of(t, language, i == 0))
            .collect();
        chunk_sentence(text, in_sentence, &tags, &mut chunks);
    }

    chunks
}

fn chunk_sentence(text: &str, tokens: &[Token], tags: &[Pos], chunks: &mut Vec<NounChunk>) {
    let mut i = 0;
    while i < tokens.len() {
        if !matches!(tags[i], Pos::Det | Pos::Noun | Pos::Num) {
            i += 1;
            continue;
        }

        let first = i;
        if tags[i] == Pos::Det {
            i += 1;
        }
        let mut last_noun = None;
        while i < tokens.len() && matches!(tags[i], Pos::Noun | Pos::Num) {
            if tags[i] == Pos::Noun {
                last_noun = Some(i);
            }
            i += 1;
        }

        match last_noun {
            Some(last) => {
                let (start, end) = (tokens[first].start, tokens[last].end);
                chunks.push(NounChunk {
                    start,
                    end,
                    text: text[start..end].to_string(),
                });
                i = last + 1;
            }
            None => i = first + 1,
        }
    }
}
