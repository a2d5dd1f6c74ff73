//! Read-through query cache with in-flight deduplication.

use super::entry::{CacheEntry, Fetcher, QueryResult, SharedFetch, elapsed};
use super::handle::{QueryHandle, QueryOptions};
use crate::toast::{Toast, ToastSink};
use futures::FutureExt;
use serde_json::Value;
use shopdesk_core::clock::Clock;
use shopdesk_core::mutation::MutationKind;
use shopdesk_core::query::{QueryKey, QuerySnapshot};
use shopdesk_core::resource::Resource;
use shopdesk_core::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

struct Inner {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
    toasts: Arc<dyn ToastSink>,
    cache_time: Duration,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores a finished fetch unless the key was invalidated meanwhile.
    fn complete(&self, key: &QueryKey, generation: u64, result: &QueryResult) {
        let now = self.clock.now();
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if entry.generation != generation {
            tracing::debug!("[QueryClient] Dropping superseded result for {}", key);
            return;
        }
        entry.record(result, now);
        entry.publish(now);
        if let Err(e) = result {
            tracing::debug!("[QueryClient] Fetch for {} failed: {}", key, e);
        }
    }
}

/// Process-wide query cache, cheap to clone.
///
/// The mutex guarding the entries is never held across an `.await`; the
/// network future runs outside it and re-locks only to store its result.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    pub fn new(clock: Arc<dyn Clock>, toasts: Arc<dyn ToastSink>, cache_time: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                clock,
                toasts,
                cache_time,
            }),
        }
    }

    /// Returns fresh cached data, or joins/starts the single in-flight fetch
    /// for `key` and waits for it.
    pub async fn fetch(&self, key: &QueryKey, stale_time: Duration, fetcher: Fetcher) -> Result<Value> {
        let shared = {
            let now = self.inner.clock.now();
            let mut entries = self.inner.entries();
            let entry = touch(&mut entries, key, now, stale_time, &fetcher);
            if let Some(data) = entry.fresh_data(now) {
                tracing::trace!("[QueryClient] Cache hit for {}", key);
                return Ok(data);
            }
            self.start_or_join(key, entry, fetcher, now)
        };
        shared.await
    }

    /// Stale-while-revalidate read: serves the last known value right away
    /// and refreshes it in the background once it is stale. Waits on the
    /// network when nothing has been fetched yet or the key was invalidated.
    pub async fn read(&self, key: &QueryKey, stale_time: Duration, fetcher: Fetcher) -> Result<Value> {
        let revalidate = {
            let now = self.inner.clock.now();
            let mut entries = self.inner.entries();
            let entry = touch(&mut entries, key, now, stale_time, &fetcher);
            if let Some(data) = entry.fresh_data(now) {
                return Ok(data);
            }
            // Data a mutation invalidated is never served; wait for the refetch.
            match entry.data.clone() {
                Some(stale) if !entry.invalidated => {
                    Some((stale, self.start_or_join(key, entry, fetcher.clone(), now)))
                }
                _ => None,
            }
        };

        match revalidate {
            Some((stale, shared)) => {
                tokio::spawn(async move {
                    let _ = shared.await;
                });
                Ok(stale)
            }
            None => self.fetch(key, stale_time, fetcher).await,
        }
    }

    /// Creates an observer for `key`. Its subscription lives as long as the handle.
    pub fn watch(&self, key: QueryKey, options: QueryOptions, fetcher: Fetcher) -> QueryHandle {
        let receiver = self.subscribe(&key);
        QueryHandle::new(self.clone(), key, options, fetcher, receiver)
    }

    /// Like [`watch`](Self::watch), but the query is enabled only while
    /// `condition` holds for the latest value of `signal`, and fetches as
    /// soon as it starts to hold.
    pub fn watch_while<T, P>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: Fetcher,
        signal: watch::Receiver<T>,
        condition: P,
    ) -> QueryHandle
    where
        T: Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let receiver = self.subscribe(&key);
        QueryHandle::gated(self.clone(), key, options, fetcher, receiver, signal, condition)
    }

    pub fn subscribe(&self, key: &QueryKey) -> watch::Receiver<QuerySnapshot> {
        let now = self.inner.clock.now();
        let mut entries = self.inner.entries();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(now, Duration::ZERO));
        entry.last_accessed = now;
        let receiver = entry.subscribe();
        entry.publish(now);
        receiver
    }

    /// Current state of `key`, if it is cached.
    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let now = self.inner.clock.now();
        self.inner.entries().get(key).map(|entry| entry.snapshot(now))
    }

    /// Cached payload of `key` regardless of freshness.
    pub fn cached_data(&self, key: &QueryKey) -> Option<Value> {
        self.inner.entries().get(key).and_then(|entry| entry.data.clone())
    }

    /// Marks every key of `resource` stale and drops its in-flight request.
    ///
    /// Keys still observed by a view are refetched in the background.
    /// Returns the number of keys affected.
    pub fn invalidate(&self, resource: Resource) -> usize {
        let now = self.inner.clock.now();
        let mut refetch = Vec::new();
        let mut affected = 0;
        {
            let mut entries = self.inner.entries();
            for (key, entry) in entries.iter_mut().filter(|(key, _)| key.matches(resource)) {
                affected += 1;
                entry.generation += 1;
                entry.invalidated = true;
                entry.abandon_in_flight();
                entry.publish(now);
                if entry.has_subscribers() {
                    if let Some(fetcher) = entry.fetcher.clone() {
                        refetch.push((key.clone(), entry.stale_after, fetcher));
                    }
                }
            }
        }

        tracing::debug!(
            "[QueryClient] Invalidated {} key(s) of {}, refetching {}",
            affected,
            resource,
            refetch.len()
        );

        for (key, stale_time, fetcher) in refetch {
            let client = self.clone();
            tokio::spawn(async move {
                if let Err(e) = client.fetch(&key, stale_time, fetcher).await {
                    tracing::debug!("[QueryClient] Background refetch of {} failed: {}", key, e);
                }
            });
        }
        affected
    }

    /// Runs a write. Invalidation happens only after it succeeded.
    ///
    /// Success and operation failures both raise a toast. A 401 raises none:
    /// the gateway has already redirected to the login route.
    pub async fn mutate<T, F>(&self, kind: MutationKind, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match request.await {
            Ok(value) => {
                for resource in kind.invalidates() {
                    self.invalidate(*resource);
                }
                tracing::info!("[QueryClient] Mutation {} succeeded", kind);
                self.inner.toasts.push(Toast::success(kind.success_message()));
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("[QueryClient] Mutation {} failed: {}", kind, e);
                if !e.is_session_fatal() {
                    self.inner.toasts.push(Toast::error(e.user_message()));
                }
                Err(e)
            }
        }
    }

    /// Evicts entries nobody observes or awaits that were last used more
    /// than `cache_time` ago. Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let now = self.inner.clock.now();
        let cache_time = self.inner.cache_time;
        let mut entries = self.inner.entries();
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.has_subscribers()
                || entry.in_flight().is_some()
                || elapsed(entry.last_accessed, now) < cache_time
        });
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("[QueryClient] Garbage-collected {} entr(ies)", removed);
        }
        removed
    }

    /// Forgets every cached payload, e.g. when the session ends.
    ///
    /// Entries a view still observes are reset in place so the view keeps
    /// receiving updates; all others are dropped.
    pub fn clear(&self) {
        let now = self.inner.clock.now();
        let mut entries = self.inner.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.has_subscribers());
        for entry in entries.values_mut() {
            entry.reset();
            entry.publish(now);
        }
        tracing::debug!(
            "[QueryClient] Cleared {} entr(ies), reset {} observed",
            before - entries.len(),
            entries.len()
        );
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn start_or_join(
        &self,
        key: &QueryKey,
        entry: &mut CacheEntry,
        fetcher: Fetcher,
        now: chrono::DateTime<chrono::Utc>,
    ) -> SharedFetch {
        if let Some(existing) = entry.in_flight() {
            tracing::trace!("[QueryClient] Joining in-flight fetch for {}", key);
            return existing;
        }

        let inner = self.inner.clone();
        let generation = entry.generation;
        let owned_key = key.clone();
        let fetch = async move {
            let result = fetcher().await;
            inner.complete(&owned_key, generation, &result);
            result
        }
        .boxed()
        .shared();

        tracing::debug!("[QueryClient] Fetching {}", key);
        entry.set_in_flight(&fetch);
        entry.publish(now);
        fetch
    }
}

/// Gets or creates the entry for `key` and records the access.
fn touch<'a>(
    entries: &'a mut HashMap<QueryKey, CacheEntry>,
    key: &QueryKey,
    now: chrono::DateTime<chrono::Utc>,
    stale_time: Duration,
    fetcher: &Fetcher,
) -> &'a mut CacheEntry {
    let entry = entries
        .entry(key.clone())
        .or_insert_with(|| CacheEntry::new(now, stale_time));
    entry.stale_after = stale_time;
    entry.last_accessed = now;
    entry.fetcher = Some(fetcher.clone());
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fetcher;
    use crate::toast::ToastLevel;
    use serde_json::json;
    use shopdesk_core::ShopdeskError;
    use shopdesk_core::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CollectingSink {
        toasts: Mutex<Vec<Toast>>,
    }

    impl ToastSink for CollectingSink {
        fn push(&self, toast: Toast) {
            self.toasts.lock().unwrap().push(toast);
        }
    }

    struct Harness {
        clock: ManualClock,
        sink: Arc<CollectingSink>,
        client: QueryClient,
    }

    fn harness() -> Harness {
        let clock = ManualClock::default();
        let sink = Arc::new(CollectingSink::default());
        let client = QueryClient::new(
            Arc::new(clock.clone()),
            sink.clone(),
            Duration::from_secs(300),
        );
        Harness {
            clock,
            sink,
            client,
        }
    }

    /// Fetcher returning `{"version": n}` where n counts network calls.
    fn counting(calls: &Arc<AtomicUsize>, delay: Duration) -> Fetcher {
        let calls = calls.clone();
        fetcher(move || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(json!({ "version": n }))
            }
        })
    }

    fn accounts() -> QueryKey {
        QueryKey::resource(Resource::Accounts)
    }

    #[tokio::test]
    async fn test_concurrent_identical_keys_share_one_call() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let f = counting(&calls, Duration::from_millis(20));
        let key = accounts();

        let (a, b) = tokio::join!(
            h.client.fetch(&key, Duration::from_secs(60), f.clone()),
            h.client.fetch(&key, Duration::from_secs(60), f.clone()),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test]
    async fn test_fresh_data_served_from_cache() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let f = counting(&calls, Duration::ZERO);
        let key = accounts();

        h.client.fetch(&key, Duration::from_secs(60), f.clone()).await.unwrap();
        h.clock.advance(chrono::Duration::seconds(59));
        let cached = h.client.fetch(&key, Duration::from_secs(60), f.clone()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached, json!({"version": 1}));

        h.clock.advance(chrono::Duration::seconds(1));
        let refreshed = h.client.fetch(&key, Duration::from_secs(60), f).await.unwrap();
        assert_eq!(refreshed, json!({"version": 2}));
    }

    #[tokio::test]
    async fn test_zero_stale_time_always_fetches() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let f = counting(&calls, Duration::ZERO);
        let key = accounts();

        for _ in 0..3 {
            h.client.fetch(&key, Duration::ZERO, f.clone()).await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_serves_stale_and_revalidates() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let f = counting(&calls, Duration::ZERO);
        let key = accounts();

        let first = h.client.read(&key, Duration::ZERO, f.clone()).await.unwrap();
        let second = h.client.read(&key, Duration::ZERO, f.clone()).await.unwrap();

        assert_eq!(first, json!({"version": 1}));
        // Stale value is returned immediately...
        assert_eq!(second, json!({"version": 1}));
        // ...while the background refetch lands in the cache.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.client.cached_data(&key), Some(json!({"version": 2})));
    }

    #[tokio::test]
    async fn test_mutation_invalidates_declared_targets() {
        let h = harness();
        let account_calls = Arc::new(AtomicUsize::new(0));
        let tx_calls = Arc::new(AtomicUsize::new(0));
        let orders_calls = Arc::new(AtomicUsize::new(0));
        let accounts_f = counting(&account_calls, Duration::ZERO);
        let tx_f = counting(&tx_calls, Duration::ZERO);
        let orders_f = counting(&orders_calls, Duration::ZERO);
        let long = Duration::from_secs(600);
        let tx_key = QueryKey::from_value(Resource::Transactions, &json!({"page": 1}));
        let orders = QueryKey::resource(Resource::Orders);

        h.client.fetch(&accounts(), long, accounts_f.clone()).await.unwrap();
        h.client.fetch(&tx_key, long, tx_f.clone()).await.unwrap();
        h.client.fetch(&orders, long, orders_f.clone()).await.unwrap();

        h.client
            .mutate(MutationKind::CreateTransaction, async { Ok(()) })
            .await
            .unwrap();

        let balances = h.client.fetch(&accounts(), long, accounts_f).await.unwrap();
        let page = h.client.fetch(&tx_key, long, tx_f).await.unwrap();
        h.client.fetch(&orders, long, orders_f).await.unwrap();

        assert_eq!(balances, json!({"version": 2}));
        assert_eq!(page, json!({"version": 2}));
        assert_eq!(orders_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *h.sink.toasts.lock().unwrap(),
            vec![Toast::success("Transaction recorded successfully")]
        );
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_invalidate() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let f = counting(&calls, Duration::ZERO);
        let long = Duration::from_secs(600);

        h.client.fetch(&accounts(), long, f.clone()).await.unwrap();
        let result: Result<()> = h
            .client
            .mutate(MutationKind::CreateAccount, async {
                Err(ShopdeskError::api(409, "Duplicate account"))
            })
            .await;
        h.client.fetch(&accounts(), long, f).await.unwrap();

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let toasts = h.sink.toasts.lock().unwrap();
        assert_eq!(toasts[0].level, ToastLevel::Error);
        assert_eq!(toasts[0].message, "Duplicate account");
    }

    #[tokio::test]
    async fn test_unauthorized_mutation_is_silent() {
        let h = harness();

        let result: Result<()> = h
            .client
            .mutate(MutationKind::DeleteUser, async { Err(ShopdeskError::Unauthorized) })
            .await;

        assert_eq!(result, Err(ShopdeskError::Unauthorized));
        assert!(h.sink.toasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_result_started_before_invalidation_is_not_cached() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let slow = counting(&calls, Duration::from_millis(30));
        let long = Duration::from_secs(600);
        let key = accounts();

        let client = h.client.clone();
        let early_key = key.clone();
        let early_fetch = slow.clone();
        let early = tokio::spawn(async move { client.fetch(&early_key, long, early_fetch).await });

        tokio::time::sleep(Duration::from_millis(5)).await;
        h.client.invalidate(Resource::Accounts);
        let early = early.await.unwrap().unwrap();

        // The early caller still gets its own answer...
        assert_eq!(early, json!({"version": 1}));
        // ...but the cache does not keep data that predates the invalidation.
        assert_eq!(h.client.cached_data(&key), None);
        let next = h.client.fetch(&key, long, slow).await.unwrap();
        assert_eq!(next, json!({"version": 2}));
    }

    #[tokio::test]
    async fn test_subscribers_are_notified_and_refetched_on_invalidation() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let f = counting(&calls, Duration::ZERO);
        let long = Duration::from_secs(600);
        let key = accounts();

        let mut rx = h.client.subscribe(&key);
        h.client.fetch(&key, long, f).await.unwrap();
        assert_eq!(rx.borrow_and_update().data, Some(json!({"version": 1})));

        h.client.invalidate(Resource::Accounts);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(rx.borrow_and_update().data, Some(json!({"version": 2})));
    }

    #[tokio::test]
    async fn test_error_keeps_last_good_data() {
        let h = harness();
        let key = accounts();
        let ok = fetcher(|| async { Ok(json!([1, 2])) });
        let failing = fetcher(|| async { Err(ShopdeskError::network("offline")) });

        h.client.fetch(&key, Duration::ZERO, ok).await.unwrap();
        let err = h.client.fetch(&key, Duration::ZERO, failing).await.unwrap_err();

        assert_eq!(err, ShopdeskError::network("offline"));
        let snapshot = h.client.snapshot(&key).unwrap();
        assert_eq!(snapshot.status, shopdesk_core::query::QueryStatus::Error);
        assert_eq!(snapshot.data, Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_garbage_collection_spares_observed_entries() {
        let h = harness();
        let f = fetcher(|| async { Ok(json!(null)) });
        let observed = QueryKey::resource(Resource::Users);

        h.client.fetch(&accounts(), Duration::ZERO, f.clone()).await.unwrap();
        let _rx = h.client.subscribe(&observed);
        h.clock.advance(chrono::Duration::seconds(301));

        assert_eq!(h.client.collect_garbage(), 1);
        assert!(h.client.snapshot(&accounts()).is_none());
        assert!(h.client.snapshot(&observed).is_some());
    }

    #[tokio::test]
    async fn test_read_after_mutation_waits_for_fresh_data() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let f = counting(&calls, Duration::ZERO);
        let long = Duration::from_secs(600);

        let before = h.client.read(&accounts(), long, f.clone()).await.unwrap();
        h.client
            .mutate(MutationKind::CreateTransaction, async { Ok(()) })
            .await
            .unwrap();
        let after = h.client.read(&accounts(), long, f).await.unwrap();

        assert_eq!(before, json!({"version": 1}));
        assert_eq!(after, json!({"version": 2}));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_resets_observed_entries_and_drops_the_rest() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let f = counting(&calls, Duration::ZERO);
        let long = Duration::from_secs(600);
        let observed = QueryKey::resource(Resource::Users);

        let mut rx = h.client.subscribe(&observed);
        h.client.fetch(&observed, long, f.clone()).await.unwrap();
        h.client.fetch(&accounts(), long, f.clone()).await.unwrap();

        h.client.clear();

        assert_eq!(h.client.len(), 1);
        assert_eq!(h.client.cached_data(&observed), None);
        assert_eq!(rx.borrow_and_update().data, None);
        let next = h.client.fetch(&observed, long, f).await.unwrap();
        assert_eq!(next, json!({"version": 3}));
        assert_eq!(rx.borrow_and_update().data, Some(json!({"version": 3})));
    }
}
