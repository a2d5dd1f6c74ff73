//! Route access rules and the navigation guard chain.

mod guard;
mod route;

pub use guard::{AuthGate, Guard, GuardChain, NavigationDecision, RoleGate};
pub use route::{Route, RouteAccess};

/// Receiver of forced navigations (e.g. the 401 redirect to login).
pub trait Navigator: Send + Sync {
    /// Replaces the current location without running guards.
    fn hard_redirect(&self, route: Route);
}
