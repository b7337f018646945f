//! Memoized notation decoding
//!
//! A descriptor is a pure function of its notation string, so concurrent
//! first decodes of the same string may both run; the first insert wins and
//! every caller receives that shared instance.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::Result;
use crate::notation::{self, TypeDescriptor};

/// Decode cache owned by a [`crate::Validator`]
#[derive(Debug, Default)]
pub struct DecodeCache {
    entries: DashMap<String, Arc<TypeDescriptor>>,
    /// Maximum number of stored descriptors; `None` means unbounded
    capacity: Option<usize>,
}

impl DecodeCache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that stops storing new strings once `capacity`
    /// descriptors are held. Nothing is evicted.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Decode `notation`, returning the cached instance when present
    pub fn decode(&self, notation: &str, property: &str) -> Result<Arc<TypeDescriptor>> {
        if let Some(hit) = self.entries.get(notation) {
            return Ok(Arc::clone(hit.value()));
        }

        let descriptor = Arc::new(notation::decode(notation, property)?);
        if self.is_full() {
            debug!(notation, "decode cache full, descriptor not stored");
            return Ok(descriptor);
        }

        debug!(notation, property, "decoded notation");
        let stored = self
            .entries
            .entry(notation.to_string())
            .or_insert(descriptor);
        Ok(Arc::clone(stored.value()))
    }

    /// Number of stored descriptors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_full(&self) -> bool {
        self.capacity
            .map_or(false, |capacity| self.entries.len() >= capacity)
    }
}
