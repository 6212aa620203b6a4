use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{becca::Becca, error::BeccaError, query::noteset::NoteSet};

/// Cooperative cancellation flag for a running search. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-search state shared by every expression node during one evaluation.
pub struct SearchContext<'a> {
    pub becca: &'a Becca,
    /// All live notes when the search started, in tree order. `not(...)` complements against it.
    pub universe: NoteSet,
    pub fast_search: bool,
    cancel: CancelToken,
}

impl<'a> SearchContext<'a> {
    pub fn new(becca: &'a Becca, fast_search: bool, cancel: CancelToken) -> SearchContext<'a> {
        SearchContext {
            becca,
            universe: becca.all_note_ids().iter().cloned().collect(),
            fast_search,
            cancel,
        }
    }

    pub fn check_cancelled(&self) -> Result<(), BeccaError> {
        if self.cancel.is_cancelled() {
            tracing::debug!("[SearchContext] cancellation observed, abandoning evaluation");
            return Err(BeccaError::QueryCancelled);
        }
        Ok(())
    }
}
