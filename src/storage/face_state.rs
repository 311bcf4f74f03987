use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use crate::analytics::FaceOffset;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackingSnapshot {
    pub face: Option<FaceOffset>,
    /// When the tracker last processed a frame; `None` before the first one.
    pub updated_at: Option<SystemTime>,
}

/// Last-known face, shared between the tracking loop (sole writer) and
/// status readers. Every access holds the lock for the whole read or write.
#[derive(Default)]
pub struct FaceState {
    inner: Arc<RwLock<TrackingSnapshot>>,
}

impl FaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, face: Option<FaceOffset>) {
        // The snapshot is plain data, so a poisoned lock still holds a whole value.
        let mut snapshot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *snapshot = TrackingSnapshot {
            face,
            updated_at: Some(SystemTime::now()),
        };
    }

    pub fn current_face(&self) -> Option<FaceOffset> {
        self.snapshot().face
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for FaceState {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
