//! Query language over the note index.
//!
//! A query string goes through four stages:
//!
//! - [`lex`]: tokens with byte spans, lowercased, quotes and escapes resolved
//! - [`parens`]: tokens grouped into a tree by their parentheses
//! - [`parse`]: the tree turned into an [Expression]
//! - [`search`]: the expression wrapped with archive/subtree filters and evaluated against a
//!   [crate::becca::Becca]
//!
//! ```rust
//! use becca_core::query::{parse_query, Expression};
//!
//! let parsed = parse_query("#book and not(#archived)", true).unwrap();
//! assert!(matches!(parsed.expression, Some(Expression::And(_))));
//! ```

pub mod context;
pub mod expression;
pub mod lex;
pub mod noteset;
pub mod parens;
pub mod parse;
pub mod search;

pub use context::{CancelToken, SearchContext};
pub use expression::{
    Comparator, ComparisonOp, DepthFilter, Expression, NoteProperty, OrderKey, OrderSource,
    WrappedRegex,
};
pub use lex::{lex, normalize, Token};
pub use noteset::NoteSet;
pub use parens::{flatten, structure, TokenTree};
pub use parse::{parse_query, ParsedQuery};
pub use search::{SearchOptions, SearchOutcome};
