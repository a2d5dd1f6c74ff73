//! Composable navigation gates.
//!
//! A navigation attempt runs the expiry check first, then each gate in
//! order. The first gate that objects decides the redirect; if none
//! objects the view is rendered.

use super::route::{Route, RouteAccess};
use crate::session::{Session, SessionStore};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationDecision {
    Allow,
    RedirectLogin,
    RedirectDefault,
}

impl NavigationDecision {
    /// The route that ends up displayed for a request to `requested`.
    pub fn destination(&self, requested: Route) -> Route {
        match self {
            NavigationDecision::Allow => requested,
            NavigationDecision::RedirectLogin => Route::LOGIN,
            NavigationDecision::RedirectDefault => Route::DEFAULT,
        }
    }
}

/// One check in the chain. `None` lets the attempt continue.
pub trait Guard: Send + Sync {
    fn check(&self, session: &Session, access: &RouteAccess) -> Option<NavigationDecision>;
}

/// Sends unauthenticated sessions to the login route.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthGate;

impl Guard for AuthGate {
    fn check(&self, session: &Session, access: &RouteAccess) -> Option<NavigationDecision> {
        (access.requires_auth && !session.is_authenticated)
            .then_some(NavigationDecision::RedirectLogin)
    }
}

/// Sends sessions lacking an allowed role to the default route.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleGate;

impl Guard for RoleGate {
    fn check(&self, session: &Session, access: &RouteAccess) -> Option<NavigationDecision> {
        (!access.permits(session.effective_role())).then_some(NavigationDecision::RedirectDefault)
    }
}

pub struct GuardChain {
    guards: Vec<Box<dyn Guard>>,
}

impl GuardChain {
    pub fn new(guards: Vec<Box<dyn Guard>>) -> Self {
        Self { guards }
    }

    /// Pure decision for a session snapshot.
    pub fn decide(&self, session: &Session, route: Route) -> NavigationDecision {
        let access = route.access();
        self.guards
            .iter()
            .find_map(|guard| guard.check(session, &access))
            .unwrap_or(NavigationDecision::Allow)
    }

    /// Runs the expiry check, then decides on the resulting session.
    pub fn evaluate(&self, store: &SessionStore, route: Route) -> NavigationDecision {
        store.check_auth_expiry();
        let decision = self.decide(&store.snapshot(), route);
        tracing::debug!("[Guard] {} -> {:?}", route, decision);
        decision
    }
}

impl Default for GuardChain {
    /// Authentication gate followed by the role gate.
    fn default() -> Self {
        Self::new(vec![Box::new(AuthGate), Box::new(RoleGate)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Result;
    use crate::session::{Role, SessionRepository};
    use chrono::Duration;
    use std::sync::Arc;

    struct NullRepository;

    impl SessionRepository for NullRepository {
        fn load(&self) -> Result<Option<Session>> {
            Ok(None)
        }

        fn save(&self, _session: &Session) -> Result<()> {
            Ok(())
        }
    }

    fn authenticated(role: Role) -> Session {
        Session {
            token: Some("abc".into()),
            expires_at: Some(chrono::Utc::now() + Duration::hours(1)),
            user_id: Some("u1".into()),
            role: Some(role),
            active_business: Some("penhouse".into()),
            is_authenticated: true,
        }
    }

    #[test]
    fn test_unauthenticated_goes_to_login() {
        let chain = GuardChain::default();
        assert_eq!(
            chain.decide(&Session::new(), Route::Accounts),
            NavigationDecision::RedirectLogin
        );
        assert_eq!(
            chain.decide(&Session::new(), Route::Dashboard),
            NavigationDecision::RedirectLogin
        );
        assert_eq!(chain.decide(&Session::new(), Route::Login), NavigationDecision::Allow);
    }

    #[test]
    fn test_insufficient_role_goes_to_default_not_login() {
        let chain = GuardChain::default();
        let decision = chain.decide(&authenticated(Role::Admin), Route::Users);
        assert_eq!(decision, NavigationDecision::RedirectDefault);
        assert_eq!(decision.destination(Route::Users), Route::Dashboard);
    }

    #[test]
    fn test_sufficient_role_or_unrestricted_allows() {
        let chain = GuardChain::default();
        assert_eq!(
            chain.decide(&authenticated(Role::SuperAdmin), Route::Users),
            NavigationDecision::Allow
        );
        assert_eq!(
            chain.decide(&authenticated(Role::User), Route::Dashboard),
            NavigationDecision::Allow
        );
        assert_eq!(
            chain.decide(&authenticated(Role::BulkOrder), Route::Quotations),
            NavigationDecision::Allow
        );
    }

    #[test]
    fn test_evaluate_re_enters_unauthenticated_after_expiry() {
        let clock = ManualClock::default();
        let store = SessionStore::new(Arc::new(NullRepository), Arc::new(clock.clone()));
        store.set_auth("abc", 60, "u1", Role::SuperAdmin).unwrap();
        let chain = GuardChain::default();

        assert_eq!(chain.evaluate(&store, Route::Users), NavigationDecision::Allow);

        clock.advance(Duration::seconds(61));
        assert_eq!(
            chain.evaluate(&store, Route::Users),
            NavigationDecision::RedirectLogin
        );
        assert!(!store.is_authenticated());
    }
}
