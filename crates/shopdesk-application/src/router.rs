//! Current location plus guarded navigation.

use shopdesk_api::QueryClient;
use shopdesk_core::navigation::{GuardChain, NavigationDecision, Navigator, Route};
use shopdesk_core::session::SessionStore;
use std::sync::Arc;
use tokio::sync::watch;

/// Owns the location. Whenever the session ends under it, whether through a
/// 401, an expired token or an explicit logout, the query cache is cleared
/// before the next route is shown.
pub struct Router {
    session: Arc<SessionStore>,
    queries: QueryClient,
    guards: GuardChain,
    location: watch::Sender<Route>,
}

impl Router {
    /// Starts on the login route with the default guard chain.
    pub fn new(session: Arc<SessionStore>, queries: QueryClient) -> Self {
        Self::with_guards(session, queries, GuardChain::default())
    }

    pub fn with_guards(session: Arc<SessionStore>, queries: QueryClient, guards: GuardChain) -> Self {
        let (location, _) = watch::channel(Route::LOGIN);
        Self {
            session,
            queries,
            guards,
            location,
        }
    }

    pub fn current(&self) -> Route {
        *self.location.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.location.subscribe()
    }

    /// Runs the guard chain for `route` and moves to wherever it leads.
    pub fn navigate(&self, route: Route) -> NavigationDecision {
        let was_authenticated = self.session.is_authenticated();
        let decision = self.guards.evaluate(&self.session, route);
        if was_authenticated && !self.session.is_authenticated() {
            tracing::info!("[Router] Session ended during navigation; clearing cached queries");
            self.queries.clear();
        }
        let destination = decision.destination(route);
        if decision != NavigationDecision::Allow {
            tracing::info!(
                "[Router] {} denied ({:?}); showing {}",
                route,
                decision,
                destination
            );
        }
        self.location.send_replace(destination);
        decision
    }
}

impl Navigator for Router {
    /// Skips the guards and drops every cached query, like a page reload.
    fn hard_redirect(&self, route: Route) {
        tracing::info!("[Router] Hard redirect to {}", route);
        self.queries.clear();
        self.location.send_replace(route);
    }
}
