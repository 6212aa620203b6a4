//! Query tokenizer.
//!
//! Splits a query string into lowercase [Token]s. Bare words before the first `#`, `~` or
//! `note.` are full-text terms; after that point the lexer is in expression mode and also splits
//! comparison operators (`=`, `!=`, `*=*`, `%=`, ...) from their operands. Property paths such as
//! `note.parents.title` or `~author.title` are split on `.`.

use serde::Serialize;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::BeccaError;

const QUOTES: [char; 3] = ['"', '\'', '`'];

pub(crate) fn is_operator_char(chr: char) -> bool {
    matches!(chr, '=' | '*' | '>' | '<' | '!' | '%')
}

/// Lowercase `text` and strip diacritics (`Příliš` -> `prilis`).
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|chr| !is_combining_mark(*chr))
        .collect::<String>()
        .to_lowercase()
}

/// One lexed token. `start..end` is the byte span of its text in the original query; for quoted
/// tokens the span excludes the quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub text: String,
    pub in_quotes: bool,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new<S: Into<String>>(text: S, in_quotes: bool, start: usize, end: usize) -> Token {
        Token {
            text: text.into(),
            in_quotes,
            start,
            end,
        }
    }

    /// True for an unquoted token equal to `text`.
    pub fn is(&self, text: &str) -> bool {
        !self.in_quotes && self.text == text
    }

    /// True for an unquoted token made only of operator characters.
    pub fn is_operator(&self) -> bool {
        !self.in_quotes && !self.text.is_empty() && self.text.chars().all(is_operator_char)
    }

    pub fn is_paren(&self) -> bool {
        self.is("(") || self.is(")")
    }
}

struct Lexer<'a> {
    query: &'a str,
    tokens: Vec<Token>,
    word: String,
    word_start: Option<usize>,
    quote: Option<(char, usize)>,
    expression_mode: bool,
    in_path: bool,
}

impl<'a> Lexer<'a> {
    fn new(query: &'a str) -> Lexer<'a> {
        Lexer {
            query,
            tokens: Vec::new(),
            word: String::new(),
            word_start: None,
            quote: None,
            expression_mode: false,
            in_path: false,
        }
    }

    fn push_char(&mut self, idx: usize, chr: char) {
        if self.word_start.is_none() {
            self.word_start = Some(idx);
        }
        self.word.extend(chr.to_lowercase());
    }

    fn finish_word(&mut self, end: usize) {
        if self.word.is_empty() {
            self.word_start = None;
            return;
        }
        let start = self.word_start.take().unwrap_or(end);
        self.tokens
            .push(Token::new(std::mem::take(&mut self.word), false, start, end));
    }

    fn last_char(&self) -> Option<char> {
        self.word.chars().last()
    }

    fn word_is_negated_sigil(&self) -> bool {
        self.word == "#!" || self.word == "~!"
    }

    fn starts_path(&self) -> bool {
        self.in_path || self.word == "note" || self.word.starts_with('~')
    }

    fn run(mut self) -> Result<Vec<Token>, BeccaError> {
        let query = self.query;
        let mut chars = query.char_indices();
        while let Some((idx, chr)) = chars.next() {
            if chr == '\\' {
                match chars.next() {
                    Some((_, escaped)) => self.push_char(idx, escaped),
                    None => self.push_char(idx, chr),
                }
                continue;
            }

            if let Some((quote, _)) = self.quote {
                if chr == quote {
                    let start = self.word_start.take().unwrap_or(idx);
                    self.tokens
                        .push(Token::new(std::mem::take(&mut self.word), true, start, idx));
                    self.quote = None;
                } else {
                    self.push_char(idx, chr);
                }
                continue;
            }

            if QUOTES.contains(&chr)
                && (self.word.is_empty() || self.last_char().is_some_and(is_operator_char))
            {
                self.finish_word(idx);
                self.quote = Some((chr, idx));
                self.word_start = Some(idx + chr.len_utf8());
                continue;
            }

            if chr.is_whitespace() {
                self.finish_word(idx);
                self.in_path = false;
                continue;
            }

            if chr == '(' || chr == ')' || (chr == ',' && self.expression_mode) {
                self.finish_word(idx);
                self.tokens
                    .push(Token::new(chr.to_string(), false, idx, idx + chr.len_utf8()));
                self.in_path = false;
                continue;
            }

            if chr == ',' {
                self.finish_word(idx);
                continue;
            }

            if (chr == '#' || chr == '~') && (self.word.is_empty() || self.expression_mode) {
                self.finish_word(idx);
                self.expression_mode = true;
                self.in_path = false;
                self.push_char(idx, chr);
                continue;
            }

            if chr == '.' && !self.word.is_empty() && self.starts_path() {
                if self.word == "note" {
                    self.expression_mode = true;
                }
                self.finish_word(idx);
                self.tokens.push(Token::new(".", false, idx, idx + 1));
                self.in_path = true;
                continue;
            }

            if self.expression_mode {
                if chr == '!' && (self.word == "#" || self.word == "~") {
                    self.push_char(idx, chr);
                    continue;
                }
                let at_operator_boundary = match self.last_char() {
                    None => false,
                    Some(_) if self.word_is_negated_sigil() => false,
                    Some(last) => is_operator_char(last) != is_operator_char(chr),
                };
                if at_operator_boundary {
                    self.finish_word(idx);
                }
                if is_operator_char(chr) {
                    self.in_path = false;
                }
            }
            self.push_char(idx, chr);
        }

        if let Some((_, position)) = self.quote {
            return Err(BeccaError::unterminated_quote(self.query, position));
        }
        self.finish_word(self.query.len());
        Ok(self.tokens)
    }
}

/// Tokenize `query`. Fails only on an unterminated quote.
pub fn lex(query: &str) -> Result<Vec<Token>, BeccaError> {
    Lexer::new(query).run()
}
