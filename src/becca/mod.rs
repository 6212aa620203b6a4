//! Becca module: the in-memory note index.
//!
//! Mirrors every note, branch and attribute delivered by the persistence layer as
//! [crate::event::ChangeEvent]s, maintains the lookup indices the query engine needs, and
//! resolves effective (own + inherited + templated) attributes.
//!
//! # Module Organization
//!
//! - [`graph`]: Branch topology (`NoteHierarchy`) over a petgraph `StableDiGraph`
//! - `base`: The `Becca` store, its indices, accessors and mutation helpers
//! - `inheritance`: Effective attribute resolution and its cache
//!
//! ```rust
//! use becca_core::{
//!     becca::Becca,
//!     event::{ChangeEvent, EntityChange},
//!     properties::{Attribute, Branch, Note},
//! };
//!
//! let mut becca = Becca::default();
//! for change in [
//!     EntityChange::NoteUpserted(Note::new("root", "root")),
//!     EntityChange::NoteUpserted(Note::new("n1", "Prague")),
//!     EntityChange::BranchUpserted(Branch::new("b1", "n1", "root", 10)),
//!     EntityChange::AttributeUpserted(Attribute::label("a1", "n1", "city", "")),
//! ] {
//!     becca.process_event(&ChangeEvent::remote(change));
//! }
//! assert!(becca.has_label("n1", "city"));
//! ```

mod base;
pub mod graph;
mod inheritance;

#[cfg(test)]
mod tests;

pub use base::Becca;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    error::BeccaError,
    event::ChangeEvent,
    query::SearchOptions,
};

/// A [Becca] shared between one writer (the change listener) and any number of searching
/// readers.
#[derive(Debug, Clone, Default)]
pub struct SharedBecca(Arc<RwLock<Becca>>);

impl SharedBecca {
    pub fn new(becca: Becca) -> SharedBecca {
        SharedBecca(Arc::new(RwLock::new(becca)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Becca> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Becca> {
        self.0.write()
    }

    /// Apply one event under the write lock. See [Becca::process_event].
    pub fn apply(&self, event: &ChangeEvent) -> bool {
        self.write().process_event(event)
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<String>, BeccaError> {
        self.read().search(query, options)
    }

    /// Apply events from `rx` until every sender is dropped. Returns how many events changed
    /// the state.
    pub async fn listen(&self, mut rx: UnboundedReceiver<ChangeEvent>) -> usize {
        let mut applied = 0;
        while let Some(event) = rx.recv().await {
            if self.apply(&event) {
                applied += 1;
            } else {
                tracing::trace!("[SharedBecca] event {event} left the state unchanged");
            }
        }
        tracing::debug!("[SharedBecca] change channel closed after {applied} applied events");
        applied
    }
}
