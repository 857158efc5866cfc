use std::time::{Duration, Instant};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use scry_types::FetchError;

pub type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

/// Per-stage state exposed to consumers.
#[derive(Debug, Clone)]
pub struct StageSnapshot<T> {
    pub data: Option<T>,
    pub is_fetching: bool,
    pub error: Option<FetchError>,
}

impl<T> Default for StageSnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_fetching: false,
            error: None,
        }
    }
}

/// Cached asynchronous query keyed by the resource's natural key.
///
/// Holds at most one entry and at most one in-flight request per key; a
/// second caller attaches to the shared in-flight future instead of issuing
/// a duplicate call. Successful values age out after `ttl`. Failures are
/// sticky until the slot is reset or marked stale, so a failed stage is
/// never retried behind the caller's back. Completion is guarded by key
/// equality: a late result for a superseded key is dropped.
pub struct QuerySlot<K, T> {
    ttl: Duration,
    entry: Option<Entry<K, T>>,
}

struct Entry<K, T> {
    key: K,
    state: EntryState<T>,
}

enum EntryState<T> {
    Pending {
        fetch: SharedFetch<T>,
        /// Last good value, kept on hand so a refetch never blanks the
        /// display.
        last: Option<T>,
    },
    Ready {
        outcome: Result<T, FetchError>,
        at: Instant,
        stale: bool,
    },
}

impl<T> EntryState<T> {
    fn data(&self) -> Option<&T> {
        match self {
            EntryState::Ready {
                outcome: Ok(value), ..
            } => Some(value),
            EntryState::Pending {
                last: Some(value), ..
            } => Some(value),
            _ => None,
        }
    }
}

impl<K: PartialEq, T: Clone> QuerySlot<K, T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Cached outcome for `key` that does not warrant a refetch: a fresh
    /// success, or any failure that has not been explicitly aged out.
    pub fn lookup(&self, key: &K, now: Instant) -> Option<Result<T, FetchError>> {
        let entry = self.entry.as_ref()?;
        if entry.key != *key {
            return None;
        }
        match &entry.state {
            EntryState::Ready {
                outcome,
                at,
                stale: false,
            } => match outcome {
                Ok(_) if now.duration_since(*at) < self.ttl => Some(outcome.clone()),
                Ok(_) => None,
                Err(_) => Some(outcome.clone()),
            },
            _ => None,
        }
    }

    /// In-flight fetch for `key`, if any.
    pub fn pending(&self, key: &K) -> Option<SharedFetch<T>> {
        match &self.entry {
            Some(Entry {
                key: cached,
                state: EntryState::Pending { fetch, .. },
            }) if cached == key => Some(fetch.clone()),
            _ => None,
        }
    }

    /// Start a fetch for `key`, replacing whatever the slot held. The
    /// previous value survives as display state only when the key matches.
    pub fn begin(
        &mut self,
        key: K,
        fetch: BoxFuture<'static, Result<T, FetchError>>,
    ) -> SharedFetch<T> {
        let last = match &self.entry {
            Some(entry) if entry.key == key => entry.state.data().cloned(),
            _ => None,
        };
        let shared = fetch.shared();
        self.entry = Some(Entry {
            key,
            state: EntryState::Pending {
                fetch: shared.clone(),
                last,
            },
        });
        shared
    }

    /// Record a settled fetch. Ignored when the slot has moved on to a
    /// different key.
    pub fn complete(&mut self, key: &K, outcome: Result<T, FetchError>, now: Instant) {
        if let Some(entry) = &mut self.entry {
            if entry.key == *key {
                entry.state = EntryState::Ready {
                    outcome,
                    at: now,
                    stale: false,
                };
            }
        }
    }

    /// Age the cached outcome out immediately so the next evaluation
    /// refetches, while keeping any value as last-known-good display state.
    pub fn mark_stale(&mut self) {
        if let Some(Entry {
            state: EntryState::Ready { stale, .. },
            ..
        }) = &mut self.entry
        {
            *stale = true;
        }
    }

    pub fn reset(&mut self) {
        self.entry = None;
    }

    pub fn data(&self) -> Option<&T> {
        self.entry.as_ref().and_then(|entry| entry.state.data())
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.entry {
            Some(Entry {
                state:
                    EntryState::Ready {
                        outcome: Err(err), ..
                    },
                ..
            }) => Some(err),
            _ => None,
        }
    }

    pub fn is_fetching(&self) -> bool {
        matches!(
            &self.entry,
            Some(Entry {
                state: EntryState::Pending { .. },
                ..
            })
        )
    }

    pub fn snapshot(&self) -> StageSnapshot<T> {
        StageSnapshot {
            data: self.data().cloned(),
            is_fetching: self.is_fetching(),
            error: self.error().cloned(),
        }
    }
}
