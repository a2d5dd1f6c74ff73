use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared, WeakShared};
use serde_json::Value;
use shopdesk_core::query::{QuerySnapshot, QueryStatus};
use shopdesk_core::{Result, ShopdeskError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub type QueryResult = Result<Value>;

/// Produces the future that performs one network fetch for a key.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, QueryResult> + Send + Sync>;

pub(crate) type SharedFetch = Shared<BoxFuture<'static, QueryResult>>;
type WeakFetch = WeakShared<BoxFuture<'static, QueryResult>>;

/// One memoized query result plus its bookkeeping.
pub(crate) struct CacheEntry {
    pub data: Option<Value>,
    pub error: Option<ShopdeskError>,
    pub status: QueryStatus,
    pub fetched_at: Option<DateTime<Utc>>,
    pub stale_after: Duration,
    /// Set by a mutation; cleared by the next successful fetch.
    pub invalidated: bool,
    /// Bumped on invalidation so older in-flight results are not stored.
    pub generation: u64,
    pub last_accessed: DateTime<Utc>,
    /// Weak so the request is dropped once nobody awaits it.
    in_flight: Option<WeakFetch>,
    pub fetcher: Option<Fetcher>,
    sender: watch::Sender<QuerySnapshot>,
}

impl CacheEntry {
    pub fn new(now: DateTime<Utc>, stale_after: Duration) -> Self {
        let (sender, _) = watch::channel(QuerySnapshot::default());
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            fetched_at: None,
            stale_after,
            invalidated: false,
            generation: 0,
            last_accessed: now,
            in_flight: None,
            fetcher: None,
            sender,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        if self.invalidated || self.data.is_none() {
            return false;
        }
        match self.fetched_at {
            Some(fetched_at) => elapsed(fetched_at, now) < self.stale_after,
            None => false,
        }
    }

    pub fn fresh_data(&self, now: DateTime<Utc>) -> Option<Value> {
        if self.is_fresh(now) { self.data.clone() } else { None }
    }

    /// The live in-flight request, if any caller still holds it.
    pub fn in_flight(&self) -> Option<SharedFetch> {
        self.in_flight.as_ref().and_then(WeakShared::upgrade)
    }

    pub fn set_in_flight(&mut self, fetch: &SharedFetch) {
        self.in_flight = fetch.downgrade();
        self.status = QueryStatus::Loading;
    }

    /// Forgets the in-flight request so the next read starts a new one.
    pub fn abandon_in_flight(&mut self) {
        self.in_flight = None;
        if self.status == QueryStatus::Loading {
            self.status = if self.data.is_some() {
                QueryStatus::Success
            } else {
                QueryStatus::Idle
            };
        }
    }

    /// Back to the never-fetched state. Pending results are discarded.
    pub fn reset(&mut self) {
        self.data = None;
        self.error = None;
        self.status = QueryStatus::Idle;
        self.fetched_at = None;
        self.invalidated = false;
        self.generation += 1;
        self.in_flight = None;
    }

    pub fn record(&mut self, result: &QueryResult, now: DateTime<Utc>) {
        self.in_flight = None;
        match result {
            Ok(value) => {
                self.data = Some(value.clone());
                self.error = None;
                self.status = QueryStatus::Success;
                self.fetched_at = Some(now);
                self.invalidated = false;
            }
            Err(e) => {
                // Last good data stays visible next to the error.
                self.error = Some(e.clone());
                self.status = QueryStatus::Error;
            }
        }
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }

    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> QuerySnapshot {
        QuerySnapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_stale: self.data.is_some() && !self.is_fresh(now),
        }
    }

    pub fn publish(&self, now: DateTime<Utc>) {
        self.sender.send_replace(self.snapshot(now));
    }
}

pub(crate) fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}
