use super::client::QueryClient;
use super::entry::Fetcher;
use serde_json::Value;
use shopdesk_core::Result;
use shopdesk_core::query::{QueryKey, QuerySnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Per-view query settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: Duration,
    /// A disabled query never hits the network.
    pub enabled: bool,
}

impl QueryOptions {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            stale_time,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

/// Evaluates whether an external condition currently allows fetching.
type Gate = Arc<dyn Fn() -> bool + Send + Sync>;

/// A mounted view's subscription to one query key.
///
/// While the handle lives the entry counts as observed: it survives garbage
/// collection and is refetched when invalidated. Dropping it unsubscribes.
pub struct QueryHandle {
    client: QueryClient,
    key: QueryKey,
    options: QueryOptions,
    /// The handle's own on/off switch, shared with the follower task.
    switch: Arc<AtomicBool>,
    gate: Option<Gate>,
    follower: Option<JoinHandle<()>>,
    fetcher: Fetcher,
    receiver: watch::Receiver<QuerySnapshot>,
}

impl QueryHandle {
    pub(crate) fn new(
        client: QueryClient,
        key: QueryKey,
        options: QueryOptions,
        fetcher: Fetcher,
        receiver: watch::Receiver<QuerySnapshot>,
    ) -> Self {
        Self {
            client,
            key,
            switch: Arc::new(AtomicBool::new(options.enabled)),
            options,
            gate: None,
            follower: None,
            fetcher,
            receiver,
        }
    }

    /// A handle that is enabled only while `condition` holds for the latest
    /// value of `signal`. A follower task fetches whenever the condition
    /// turns true; it stops when the handle is dropped.
    pub(crate) fn gated<T, P>(
        client: QueryClient,
        key: QueryKey,
        options: QueryOptions,
        fetcher: Fetcher,
        receiver: watch::Receiver<QuerySnapshot>,
        mut signal: watch::Receiver<T>,
        condition: P,
    ) -> Self
    where
        T: Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let condition = Arc::new(condition);
        let gate: Gate = {
            let signal = signal.clone();
            let condition = condition.clone();
            Arc::new(move || {
                let value = signal.borrow();
                condition(&*value)
            })
        };

        let mut handle = Self::new(client.clone(), key.clone(), options, fetcher.clone(), receiver);
        let switch = handle.switch.clone();
        // Read before spawning so a change made right after construction
        // still counts as a transition.
        let mut open = {
            let value = signal.borrow_and_update();
            condition(&*value)
        };
        let follower = tokio::spawn(async move {
            while signal.changed().await.is_ok() {
                let now_open = {
                    let value = signal.borrow_and_update();
                    condition(&*value)
                };
                if now_open && !open && switch.load(Ordering::SeqCst) {
                    tracing::debug!("[QueryHandle] {} enabled", key);
                    if let Err(e) = client.fetch(&key, options.stale_time, fetcher.clone()).await {
                        tracing::debug!("[QueryHandle] Fetch of {} on enable failed: {}", key, e);
                    }
                }
                open = now_open;
            }
        });

        handle.gate = Some(gate);
        handle.follower = Some(follower);
        handle
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current settings; `enabled` reflects both the switch and the gate.
    pub fn options(&self) -> QueryOptions {
        self.options.enabled(self.is_enabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.switch.load(Ordering::SeqCst) && self.gate.as_ref().is_none_or(|gate| gate())
    }

    /// Fetches through the cache. `Ok(None)` while the query is disabled.
    pub async fn refresh(&self) -> Result<Option<Value>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        self.client
            .fetch(&self.key, self.options.stale_time, self.fetcher.clone())
            .await
            .map(Some)
    }

    /// Like [`refresh`](Self::refresh) but serves stale data while revalidating.
    pub async fn read(&self) -> Result<Option<Value>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        self.client
            .read(&self.key, self.options.stale_time, self.fetcher.clone())
            .await
            .map(Some)
    }

    /// Toggles the query. Enabling a disabled query fetches right away.
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<Option<Value>> {
        let was_enabled = self.is_enabled();
        self.switch.store(enabled, Ordering::SeqCst);
        if self.is_enabled() && !was_enabled {
            tracing::debug!("[QueryHandle] {} enabled", self.key);
            return self.refresh().await;
        }
        Ok(None)
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.receiver.borrow().clone()
    }

    /// Waits for the next state change of the key.
    pub async fn changed(&mut self) -> Option<QuerySnapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

impl Drop for QueryHandle {
    fn drop(&mut self) {
        if let Some(follower) = self.follower.take() {
            follower.abort();
        }
    }
}

impl std::fmt::Debug for QueryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryHandle")
            .field("key", &self.key)
            .field("options", &self.options())
            .finish()
    }
}
