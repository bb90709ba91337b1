//! Bookkeeping of in-flight requests.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::transport::Handle;

/// Identifies one request issued by a `FetchPlease`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handles currently in flight, in call order. Each id appears at most once.
#[derive(Debug, Clone, Default)]
pub(crate) struct Registry {
    opened: Arc<Mutex<Vec<(RequestId, Handle)>>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Vec<(RequestId, Handle)>> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn add(&self, id: RequestId, handle: Handle) {
        let mut opened = self.lock();
        if !opened.iter().any(|(existing, _)| *existing == id) {
            opened.push((id, handle));
        }
    }

    /// Remove `id`. Returns whether it was present.
    pub(crate) fn close(&self, id: RequestId) -> bool {
        let mut opened = self.lock();
        match opened.iter().position(|(existing, _)| *existing == id) {
            Some(idx) => {
                opened.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Copy of the current handles; safe to iterate while listeners mutate
    /// the registry.
    pub(crate) fn snapshot(&self) -> Vec<Handle> {
        self.lock().iter().map(|(_, handle)| Arc::clone(handle)).collect()
    }

    pub(crate) fn ids(&self) -> Vec<RequestId> {
        self.lock().iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn contains(&self, id: RequestId) -> bool {
        self.lock().iter().any(|(existing, _)| *existing == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}
