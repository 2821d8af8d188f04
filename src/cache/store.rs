//! Per-host cache of fetched source records
//!
//! The store maps a [`SourceKey`] to the fetched record, the state machine
//! guarding it and, for expirable sources, its TTL record. It belongs to the
//! object composing the sources, never to a descriptor, so two hosts sharing
//! descriptor definitions keep independent caches.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::ttl::{Clock, SystemClock, TtlPolicy, TtlRecord};
use crate::source::{
    Document, FetchMachine, Refresh, Source, SourceKey, SourceResult, SourceState, SourceValue,
};

#[derive(Debug)]
struct CacheEntry {
    refresh: Refresh,
    machine: FetchMachine,
    ttl: Option<TtlRecord>,
}

impl CacheEntry {
    fn new(refresh: Refresh) -> Self {
        Self {
            refresh,
            machine: FetchMachine::new(refresh.machine_kind()),
            ttl: None,
        }
    }
}

/// Cache of source records keyed by source identity.
///
/// Each key has its own lock, so concurrent resolutions of one key run at
/// most one fetch while other keys proceed independently.
#[derive(Debug)]
pub struct CacheStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<SourceKey, Arc<Mutex<CacheEntry>>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    fn entry(&self, key: &SourceKey, refresh: Refresh) -> Arc<Mutex<CacheEntry>> {
        let mut entries = self.entries.lock();
        Arc::clone(
            entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(CacheEntry::new(refresh)))),
        )
    }

    fn existing(&self, key: &SourceKey) -> Option<Arc<Mutex<CacheEntry>>> {
        self.entries.lock().get(key).cloned()
    }

    /// Resolve one field of a source.
    ///
    /// Triggers the key's state machine, which fetches only when the record
    /// is missing, failed or expired, then reads the field out of whatever
    /// record the machine serves. Fetch errors stay inside the machine.
    pub fn resolve(&self, source: &dyn Source) -> SourceValue {
        let key = source.key();
        let entry = self.entry(&key, source.refresh());
        let mut entry = entry.lock();
        let now = self.clock.now();

        let refresh = entry.refresh;
        let CacheEntry { machine, ttl, .. } = &mut *entry;

        let fetched = machine.trigger(
            || match refresh {
                Refresh::Ttl(lifetime) => TtlPolicy::new(lifetime).expired(ttl.as_ref(), now),
                Refresh::Once => false,
            },
            || {
                debug!("Fetching source {}", key);
                source.fetch()
            },
        );

        if fetched {
            if let Refresh::Ttl(_) = refresh {
                *ttl = Some(TtlRecord::new(now, source.marker()));
            }
        } else {
            debug!("Serving source {} from cache ({})", key, machine.state());
        }

        machine
            .data()
            .and_then(|document| document.get(source.field()).cloned())
            .into()
    }

    /// Current state of a source without triggering it.
    pub fn result(&self, source: &dyn Source) -> SourceResult {
        match self.existing(&source.key()) {
            Some(entry) => entry.lock().machine.result(),
            None => SourceResult {
                data: None,
                errors: Vec::new(),
                state: SourceState::Uninitialized,
            },
        }
    }

    /// Record currently cached under `key`.
    pub fn document(&self, key: &SourceKey) -> Option<Document> {
        self.existing(key)
            .and_then(|entry| entry.lock().machine.data().cloned())
    }

    pub fn ttl_record(&self, key: &SourceKey) -> Option<TtlRecord> {
        self.existing(key).and_then(|entry| entry.lock().ttl.clone())
    }

    pub fn keys(&self) -> Vec<SourceKey> {
        let mut keys: Vec<SourceKey> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Forget every record. The next resolution of any key fetches again.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}
