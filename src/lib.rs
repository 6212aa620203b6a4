//! # becca-core
//!
//! An in-memory index of a hierarchical note store, plus the query engine that searches it.
//!
//! ## Overview
//!
//! Notes form a tree (in fact a DAG, since a note may be placed under several parents through
//! *branches*) and carry *attributes*: labels (`#name=value`) and relations (`~name=noteId`).
//! Attributes can be inherited down the tree and copied from template notes. becca-core mirrors
//! every note, branch and attribute the persistence layer reports, keeps the indices needed to
//! answer questions about them quickly, and evaluates a small query language against the mirror.
//!
//! ### Key Features
//!
//! - **Event-driven mirror**: state is built and kept current from [`event::ChangeEvent`]s
//! - **Effective attributes**: own, inherited and templated attributes with closer-wins precedence
//! - **Query language**: full-text words, `#label` / `~relation` predicates, comparison operators,
//!   `note.*` property paths, boolean composition, `orderby` and `limit`
//! - **Positioned errors**: parse failures carry the offending position and a query fragment
//!
//! ## Architecture
//!
//! - **[`becca`]**: The [`becca::Becca`] store, its indices and the attribute resolver
//! - **[`query`]**: Lexer, paren structurer, parser, expression tree and search pipeline
//! - **[`properties`]**: Note, branch and attribute rows
//! - **[`event`]**: Change events delivered by the persistence layer
//! - **[`config`]**: TOML-backed configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use becca_core::{
//!     becca::Becca,
//!     event::{ChangeEvent, EntityChange},
//!     properties::{Attribute, Branch, Note},
//!     query::SearchOptions,
//! };
//!
//! let mut becca = Becca::default();
//! for change in [
//!     EntityChange::NoteUpserted(Note::new("root", "root")),
//!     EntityChange::NoteUpserted(Note::new("europe", "Europe")),
//!     EntityChange::NoteUpserted(Note::new("prague", "Prague")),
//!     EntityChange::BranchUpserted(Branch::new("b1", "europe", "root", 10)),
//!     EntityChange::BranchUpserted(Branch::new("b2", "prague", "europe", 10)),
//!     EntityChange::AttributeUpserted(
//!         Attribute::label("a1", "europe", "continent", "europe").inheritable(),
//!     ),
//! ] {
//!     becca.process_event(&ChangeEvent::remote(change));
//! }
//!
//! let found = becca
//!     .search("#continent = europe", &SearchOptions::default().with_ancestor("europe"))
//!     .unwrap();
//! assert_eq!(found, vec!["prague".to_string()]);
//! ```

pub mod becca;
pub mod config;
pub mod error;
pub mod event;
pub mod properties;
pub mod query;
#[cfg(test)]
mod tests;

pub use error::*;
