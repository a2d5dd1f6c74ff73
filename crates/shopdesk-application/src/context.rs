//! Composition root.
//!
//! [`AppContext`] owns every shared component (session store, router,
//! gateway, API client, query cache, toasts) and the background cache GC
//! task. Nothing here is global: tests build as many contexts as they like.

use crate::accounting_service::AccountingService;
use crate::auth_service::AuthService;
use crate::resource_service::ResourceService;
use crate::router::Router;
use crate::telemetry;
use crate::toast::ToastQueue;
use anyhow::{Context as _, Result};
use shopdesk_api::{ApiClient, Gateway, HttpTransport, QueryClient, ReqwestTransport, ToastSink};
use shopdesk_core::clock::{Clock, SystemClock};
use shopdesk_core::config::ClientConfig;
use shopdesk_core::session::{SessionRepository, SessionStore};
use shopdesk_infrastructure::storage::ConfigFile;
use shopdesk_infrastructure::{JsonSessionRepository, ShopdeskPaths};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct AppContext {
    config: Arc<ClientConfig>,
    session: Arc<SessionStore>,
    router: Arc<Router>,
    api: ApiClient,
    queries: QueryClient,
    toasts: Arc<ToastQueue>,
    shutdown: CancellationToken,
    gc_task: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    /// Reads `config.toml` from the platform config directory with
    /// `SHOPDESK_*` environment overrides applied.
    pub fn load_config() -> Result<ClientConfig> {
        let path = ShopdeskPaths::config_file()?;
        let config = ConfigFile::new(path.clone())
            .load()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Ok(config)
    }

    /// Wires the production stack: tracing from `[logging]`, reqwest
    /// transport, JSON session file and the system clock. Must run inside a
    /// tokio runtime.
    pub fn bootstrap(config: ClientConfig) -> Result<Self> {
        config.validate().context("Invalid client configuration")?;
        telemetry::init_tracing(&config.logging.filter);

        let data_dir = match &config.storage.data_dir {
            Some(dir) => dir.clone(),
            None => ShopdeskPaths::data_dir()?,
        };
        let repository = Arc::new(JsonSessionRepository::in_dir(&data_dir));
        tracing::info!(
            "[AppContext] Session file: {}, API: {}",
            repository.path().display(),
            config.api.base_url
        );

        let transport = ReqwestTransport::new(&config.api.base_url, config.request_timeout())
            .context("Failed to create HTTP transport")?;

        Ok(Self::from_parts(
            config,
            Arc::new(transport),
            repository,
            Arc::new(SystemClock),
        ))
    }

    /// Wires a context around the given transport, repository and clock.
    /// The persisted session is restored from `repository`.
    pub fn from_parts(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        repository: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = Arc::new(config);
        let session = Arc::new(SessionStore::restore(repository, clock.clone()));
        let toasts = Arc::new(ToastQueue::new());
        let queries = QueryClient::new(clock, toasts.clone(), config.cache_time());
        let router = Arc::new(Router::new(session.clone(), queries.clone()));
        let gateway = Arc::new(Gateway::new(transport, session.clone(), router.clone()));
        let api = ApiClient::new(gateway);

        let shutdown = CancellationToken::new();
        let gc_task = spawn_cache_gc(queries.clone(), config.gc_interval(), shutdown.clone());

        Self {
            config,
            session,
            router,
            api,
            queries,
            toasts,
            shutdown,
            gc_task: Mutex::new(Some(gc_task)),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn toasts(&self) -> &Arc<ToastQueue> {
        &self.toasts
    }

    pub fn auth(&self) -> AuthService {
        let toasts: Arc<dyn ToastSink> = self.toasts.clone();
        AuthService::new(self.resources(), self.router.clone(), toasts)
    }

    pub fn resources(&self) -> ResourceService {
        ResourceService::new(
            self.api.clone(),
            self.queries.clone(),
            self.session.clone(),
            self.config.clone(),
        )
    }

    pub fn accounting(&self) -> AccountingService {
        AccountingService::new(self.resources())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops background work and waits for it to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self
            .gc_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::warn!("[AppContext] Cache GC task ended abnormally: {}", e);
        }
        tracing::info!("[AppContext] Shut down");
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn spawn_cache_gc(
    queries: QueryClient,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    queries.collect_garbage();
                }
            }
        }
        tracing::debug!("[AppContext] Cache GC stopped");
    })
}
