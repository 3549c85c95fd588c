//! Per-document exclusive sections

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One mutex per document id, created on first use.
///
/// Work on different documents proceeds in parallel; work on the same
/// document is serialized.
#[derive(Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `document_id`
    pub fn with_lock<T>(&self, document_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                locks
                    .entry(document_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        // Guards no data; poisoning carries no meaning here
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of documents that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
