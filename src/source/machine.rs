//! Fetch state machines
//!
//! Every cached record is guarded by a [`FetchMachine`] that decides whether a
//! trigger runs the fetch. Two flavours exist:
//!
//! - **Basic**: fetch at most once. Only a source that has never succeeded
//!   (`SOURCE_ERROR`) fetches again.
//! - **Expirable**: consult an expiry predicate before serving the cached
//!   record, keep the last good record through failed re-fetches and report
//!   the errors of the most recent attempt alongside it.
//!
//! Transitions are plain tables of (state, event) → state. Entering
//! `FETCHING` is the only side effect: it runs the fetch.

use crate::error::SourceFetchError;
use crate::source::{Document, SourceValue};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    Uninitialized,
    Fetching,
    ValueCachedSourceOk,
    ValueCachedSourceError,
    SourceError,
}

impl SourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Fetching => "FETCHING",
            Self::ValueCachedSourceOk => "VALUE_CACHED_SOURCE_OK",
            Self::ValueCachedSourceError => "VALUE_CACHED_SOURCE_ERROR",
            Self::SourceError => "SOURCE_ERROR",
        }
    }

    /// True when a record is available to serve, stale or not.
    pub fn has_value(&self) -> bool {
        matches!(
            self,
            Self::ValueCachedSourceOk | Self::ValueCachedSourceError
        )
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineKind {
    Basic,
    Expirable,
}

/// Snapshot of a machine: the record it serves, the errors of the most
/// recent fetch and its current state.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResult {
    pub data: Option<Document>,
    pub errors: Vec<SourceFetchError>,
    pub state: SourceState,
}

impl SourceResult {
    /// Value of one field of the served record.
    pub fn value(&self, field: &str) -> SourceValue {
        self.data
            .as_ref()
            .and_then(|document| document.get(field).cloned())
            .into()
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Trigger,
    TriggerExpired,
    Succeeded,
    Failed,
    FailedWithCache,
}

struct Transition {
    from: SourceState,
    event: Event,
    to: SourceState,
}

const fn t(from: SourceState, event: Event, to: SourceState) -> Transition {
    Transition { from, event, to }
}

use SourceState::{
    Fetching, SourceError, Uninitialized, ValueCachedSourceError, ValueCachedSourceOk,
};

const BASIC_TRANSITIONS: &[Transition] = &[
    t(Uninitialized, Event::Trigger, Fetching),
    t(Fetching, Event::Succeeded, ValueCachedSourceOk),
    t(Fetching, Event::Failed, SourceError),
    t(ValueCachedSourceOk, Event::Trigger, ValueCachedSourceOk),
    t(SourceError, Event::Trigger, Fetching),
];

const EXPIRABLE_TRANSITIONS: &[Transition] = &[
    t(Uninitialized, Event::Trigger, Fetching),
    t(Fetching, Event::Succeeded, ValueCachedSourceOk),
    t(Fetching, Event::Failed, SourceError),
    t(Fetching, Event::FailedWithCache, ValueCachedSourceError),
    t(ValueCachedSourceOk, Event::Trigger, ValueCachedSourceOk),
    t(ValueCachedSourceOk, Event::TriggerExpired, Fetching),
    t(ValueCachedSourceError, Event::Trigger, ValueCachedSourceError),
    t(ValueCachedSourceError, Event::TriggerExpired, Fetching),
    t(SourceError, Event::Trigger, Fetching),
];

impl MachineKind {
    fn transitions(&self) -> &'static [Transition] {
        match self {
            Self::Basic => BASIC_TRANSITIONS,
            Self::Expirable => EXPIRABLE_TRANSITIONS,
        }
    }

    fn next(&self, from: SourceState, event: Event) -> Option<SourceState> {
        self.transitions()
            .iter()
            .find(|row| row.from == from && row.event == event)
            .map(|row| row.to)
    }
}

#[derive(Debug, Clone)]
pub struct FetchMachine {
    kind: MachineKind,
    state: SourceState,
    data: Option<Document>,
    errors: Vec<SourceFetchError>,
}

impl FetchMachine {
    pub fn new(kind: MachineKind) -> Self {
        Self {
            kind,
            state: SourceState::Uninitialized,
            data: None,
            errors: Vec::new(),
        }
    }

    pub fn basic() -> Self {
        Self::new(MachineKind::Basic)
    }

    pub fn expirable() -> Self {
        Self::new(MachineKind::Expirable)
    }

    pub fn kind(&self) -> MachineKind {
        self.kind
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn data(&self) -> Option<&Document> {
        self.data.as_ref()
    }

    pub fn errors(&self) -> &[SourceFetchError] {
        &self.errors
    }

    pub fn result(&self) -> SourceResult {
        SourceResult {
            data: self.data.clone(),
            errors: self.errors.clone(),
            state: self.state,
        }
    }

    /// Run one trigger. `expired` is only evaluated by an expirable machine
    /// that holds a record; `fetch` only when the transition enters
    /// `FETCHING`. Returns whether the fetch ran.
    pub fn trigger<E, F>(&mut self, expired: E, fetch: F) -> bool
    where
        E: FnOnce() -> bool,
        F: FnOnce() -> Result<Document, SourceFetchError>,
    {
        let consults_expiry = self.kind == MachineKind::Expirable && self.state.has_value();
        let event = if consults_expiry && expired() {
            Event::TriggerExpired
        } else {
            Event::Trigger
        };
        self.apply(event);

        if self.state != SourceState::Fetching {
            return false;
        }

        match fetch() {
            Ok(document) => {
                self.data = Some(document);
                self.errors.clear();
                self.apply(Event::Succeeded);
            }
            Err(error) => {
                warn!("Fetch failed: {}", error);
                let event = if self.data.is_some() {
                    Event::FailedWithCache
                } else {
                    Event::Failed
                };
                self.errors = vec![error];
                self.apply(event);
            }
        }
        true
    }

    fn apply(&mut self, event: Event) {
        match self.kind.next(self.state, event) {
            Some(next) => {
                if next != self.state {
                    debug!("{} -> {} on {:?}", self.state, next, event);
                }
                self.state = next;
            }
            None => {
                warn!(
                    "No {:?} transition from {} on {:?}, state unchanged",
                    self.kind, self.state, event
                );
            }
        }
    }
}
