//! Script classification and mixed-language tokenization
//!
//! Japanese text is recognized by code point range only:
//! - Hiragana (U+3040..=U+309F)
//! - Katakana (U+30A0..=U+30FF)
//! - CJK Unified Ideographs used for Kanji (U+4E00..=U+9FAF)
//!
//! Everything else, including punctuation, digits and whitespace, is
//! treated as Latin/English for voice selection purposes.

use serde::Serialize;

/// A maximal run of text in one script class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub text: String,
    pub is_japanese: bool,
}

impl Token {
    pub fn new(text: impl Into<String>, is_japanese: bool) -> Self {
        let text = text.into();
        Self { text, is_japanese }
    }

    /// True if the token carries nothing to speak
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Is this single character in a Japanese script range?
pub fn is_japanese_char(ch: char) -> bool {
    matches!(ch, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{4E00}'..='\u{9FAF}')
}

/// True iff `text` contains at least one Hiragana, Katakana or Kanji character
pub fn is_japanese_script(text: &str) -> bool {
    text.chars().any(is_japanese_char)
}

/// Split `text` into ordered runs of Japanese and non-Japanese text
///
/// Whitespace that follows an English run stays inside that run. Whitespace
/// that follows a Japanese run closes it and opens a new English token.
/// Concatenating the token texts reproduces the input exactly.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_japanese: Option<bool> = None;

    for ch in text.chars() {
        let ch_japanese = is_japanese_char(ch);

        match current_japanese {
            None => {
                current.push(ch);
                current_japanese = Some(ch_japanese);
            }
            Some(class) if class == ch_japanese => current.push(ch),
            // Whitespace is never Japanese: after an English run it lands in
            // the arm above, after a Japanese run it opens an English token.
            Some(class) => {
                tokens.push(Token::new(std::mem::take(&mut current), class));
                current.push(ch);
                current_japanese = Some(ch_japanese);
            }
        }
    }

    if let Some(class) = current_japanese {
        if !current.is_empty() {
            tokens.push(Token::new(current, class));
        }
    }

    tokens
}
