//! Caller-owned memo of loaded tidy tables.
//!
//! Each distinct (source set, schema) pair gets one slot. A slot is filled at
//! most once and only with a complete [`LoadOutcome`]; a failed load leaves it
//! empty so the next call retries.

use crate::error::Result;
use crate::loader::{self, LoadOutcome};
use crate::schema::WideSchema;
use crate::types::SourceSet;
use once_cell::sync::OnceCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    sources: SourceSet,
    schema: WideSchema,
}

impl CacheKey {
    fn fingerprint(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.hash(&mut h);
        h.finish()
    }
}

type Slot = Arc<OnceCell<Arc<LoadOutcome>>>;

#[derive(Debug, Default)]
pub struct TidyCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl TidyCache {
    pub fn new() -> Self {
        TidyCache::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
        // The map holds no invariant a panicking holder could break.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached table for `sources`, loading it on first use.
    ///
    /// The map lock is only held to find the slot; parsing happens inside the
    /// slot's `OnceCell`, so concurrent callers for the same key wait for one
    /// load and everyone else proceeds.
    pub fn get_or_load(
        &self,
        sources: &SourceSet,
        schema: &WideSchema,
    ) -> Result<Arc<LoadOutcome>> {
        let key = CacheKey {
            sources: sources.clone(),
            schema: schema.clone(),
        };
        let fingerprint = key.fingerprint();
        let slot = self.slots().entry(key.clone()).or_default().clone();

        if let Some(hit) = slot.get() {
            debug!(fingerprint, "Tidy cache hit");
            return Ok(hit.clone());
        }
        let loaded = slot.get_or_try_init(|| {
            debug!(fingerprint, "Tidy cache miss, loading");
            loader::load(sources, schema).map(Arc::new)
        });
        match loaded {
            Ok(outcome) => Ok(outcome.clone()),
            Err(e) => {
                // Drop our empty slot unless another caller has replaced or filled it.
                let mut slots = self.slots();
                if slots
                    .get(&key)
                    .is_some_and(|s| Arc::ptr_eq(s, &slot) && s.get().is_none())
                {
                    slots.remove(&key);
                }
                Err(e)
            }
        }
    }

    /// Forget the entry for `sources`. Returns whether a loaded table was dropped.
    pub fn invalidate(&self, sources: &SourceSet, schema: &WideSchema) -> bool {
        let key = CacheKey {
            sources: sources.clone(),
            schema: schema.clone(),
        };
        self.slots()
            .remove(&key)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Drop the entry and load it again from disk.
    pub fn refresh(&self, sources: &SourceSet, schema: &WideSchema) -> Result<Arc<LoadOutcome>> {
        self.invalidate(sources, schema);
        self.get_or_load(sources, schema)
    }

    pub fn clear(&self) {
        self.slots().clear();
    }

    /// Number of keys holding a loaded table.
    pub fn len(&self) -> usize {
        self.slots().values().filter(|s| s.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
