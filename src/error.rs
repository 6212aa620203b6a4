use std::{fmt, io};

use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError as TokioSendError;

use crate::event::ChangeEvent;

/// Characters of query context shown on each side of an offending token.
const CONTEXT_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum BeccaError {
    #[error("Unterminated quote at position {position} in {fragment}")]
    UnterminatedQuote { position: usize, fragment: String },
    #[error("Unbalanced parenthesis at position {position} in {fragment}")]
    UnbalancedParens { position: usize, fragment: String },
    #[error("Invalid query syntax at position {position}: {message} in {fragment}")]
    InvalidQuerySyntax {
        message: String,
        position: usize,
        fragment: String,
    },
    #[error("Query evaluation was cancelled")]
    QueryCancelled,
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Channel error: {0}")]
    Channel(String),
}

impl BeccaError {
    /// True for the errors a caller can fix by rewriting the query string.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            BeccaError::UnterminatedQuote { .. }
                | BeccaError::UnbalancedParens { .. }
                | BeccaError::InvalidQuerySyntax { .. }
        )
    }

    pub(crate) fn unterminated_quote(query: &str, position: usize) -> Self {
        BeccaError::UnterminatedQuote {
            position,
            fragment: context_fragment(query, position, position),
        }
    }

    pub(crate) fn unbalanced_parens(query: &str, position: usize) -> Self {
        BeccaError::UnbalancedParens {
            position,
            fragment: context_fragment(query, position, position),
        }
    }

    pub(crate) fn invalid_syntax<M: Into<String>>(
        query: &str,
        start: usize,
        end: usize,
        message: M,
    ) -> Self {
        BeccaError::InvalidQuerySyntax {
            message: message.into(),
            position: start,
            fragment: context_fragment(query, start, end),
        }
    }
}

/// Quote the slice of `query` around `[start, end]` (byte offsets), widened by
/// [CONTEXT_CHARS] characters on each side and marked with `...` where cut.
pub(crate) fn context_fragment(query: &str, start: usize, end: usize) -> String {
    let char_starts: Vec<usize> = query.char_indices().map(|(idx, _)| idx).collect();
    let start_char = char_starts.partition_point(|idx| *idx < start);
    let end_char = char_starts.partition_point(|idx| *idx <= end);
    let from = start_char.saturating_sub(CONTEXT_CHARS);
    let to = (end_char + CONTEXT_CHARS).min(char_starts.len());
    let snippet: String = query.chars().skip(from).take(to - from).collect();
    format!(
        "\"{}{}{}\"",
        if from > 0 { "..." } else { "" },
        snippet,
        if to < char_starts.len() { "..." } else { "" }
    )
}

impl From<io::Error> for BeccaError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => BeccaError::NotFound(format!("{x}")),
            _ => BeccaError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for BeccaError {
    fn from(x: fmt::Error) -> Self {
        BeccaError::Serialization(format!("{x}"))
    }
}

impl From<toml::de::Error> for BeccaError {
    fn from(src: toml::de::Error) -> BeccaError {
        BeccaError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for BeccaError {
    fn from(src: toml::ser::Error) -> BeccaError {
        BeccaError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for BeccaError {
    fn from(src: JsonError) -> BeccaError {
        BeccaError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<RegexError> for BeccaError {
    fn from(x: RegexError) -> Self {
        BeccaError::Serialization(format!("Regex parse failed: {x}"))
    }
}

impl From<TokioSendError<ChangeEvent>> for BeccaError {
    fn from(x: TokioSendError<ChangeEvent>) -> Self {
        BeccaError::Channel(format!(
            "Channel update send Error, could not transmit change event {}",
            x.0
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_marks_truncation() {
        let query = "#first = one and #second = two and #third = (three";
        let fragment = context_fragment(query, 45, 45);
        assert!(fragment.starts_with("\"..."));
        assert!(fragment.ends_with("(three\""));
    }

    #[test]
    fn short_query_fragment_is_whole_query() {
        assert_eq!(context_fragment("#foo=(", 5, 5), "\"#foo=(\"");
    }
}
