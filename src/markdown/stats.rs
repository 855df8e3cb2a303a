use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WordCount {
    /// Top-level blocks.
    pub paragraph: usize,
    pub word: usize,
    /// Characters inside words, whitespace excluded.
    pub character: usize,
    pub all: usize,
}

/// Unified ideographs, Extension A and the compatibility block.
fn is_cjk(c: char) -> bool {
    matches!(c, '\u{3400}'..='\u{4dbf}' | '\u{4e00}'..='\u{9fff}' | '\u{f900}'..='\u{faff}')
}

/// Counts words in rendered markdown. Each CJK ideograph is a word of its
/// own; everything else splits on whitespace.
pub fn word_count(markdown: &str, paragraphs: usize) -> WordCount {
    let ideographs = markdown.chars().filter(|c| is_cjk(*c)).count();
    let rest: String = markdown.chars().filter(|c| !is_cjk(*c)).collect();
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let token_chars: usize = tokens.iter().map(|token| token.chars().count()).sum();

    WordCount {
        paragraph: paragraphs,
        word: ideographs + tokens.len(),
        character: ideographs + token_chars,
        all: markdown.chars().count(),
    }
}
