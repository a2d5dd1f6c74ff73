//! Authenticated request gateway.
//!
//! Every outbound call goes through [`Gateway::execute`], which attaches the
//! current bearer token and treats a 401 from any endpoint as the end of the
//! session: the store is cleared and the user is sent to the login route.

use crate::transport::{AUTHORIZATION, ApiRequest, ApiResponse, HttpTransport};
use shopdesk_core::navigation::{Navigator, Route};
use shopdesk_core::session::SessionStore;
use shopdesk_core::{Result, ShopdeskError};
use std::sync::Arc;

pub struct Gateway {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            session,
            navigator,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Sends `request` with the session's credentials.
    ///
    /// Non-401 statuses come back untouched in `Ok`. A 401 yields
    /// `Err(ShopdeskError::Unauthorized)` after the session has been cleared.
    /// Transport failures are returned as they are; nothing is retried.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        request.remove_header(AUTHORIZATION);
        if let Some(token) = self.session.token() {
            request
                .headers
                .push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        }

        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.send(request).await.inspect_err(|e| {
            tracing::warn!("[Gateway] {:?} {} failed: {}", method, path, e);
        })?;

        if response.is_unauthorized() {
            tracing::info!("[Gateway] 401 from {:?} {}; ending session", method, path);
            self.end_session();
            return Err(ShopdeskError::Unauthorized);
        }

        Ok(response)
    }

    fn end_session(&self) {
        if let Err(e) = self.session.logout() {
            tracing::warn!("[Gateway] Session cleared in memory only: {}", e);
        }
        self.navigator.hard_redirect(Route::LOGIN);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use shopdesk_core::clock::ManualClock;
    use shopdesk_core::session::Role;
    use shopdesk_infrastructure::MemorySessionRepository;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport that records requests and replays scripted responses.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        pub requests: Mutex<Vec<ApiRequest>>,
        pub responses: Mutex<VecDeque<Result<ApiResponse>>>,
    }

    impl ScriptedTransport {
        pub fn respond(&self, status: u16, body: Value) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(ApiResponse::new(status, body)));
        }

        pub fn fail(&self, error: ShopdeskError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        pub fn last_request(&self) -> ApiRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ApiResponse::new(200, json!({"message": "ok", "data": null}))))
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingNavigator {
        pub redirects: Mutex<Vec<Route>>,
    }

    impl Navigator for RecordingNavigator {
        fn hard_redirect(&self, route: Route) {
            self.redirects.lock().unwrap().push(route);
        }
    }

    pub(crate) struct Fixture {
        pub transport: Arc<ScriptedTransport>,
        pub navigator: Arc<RecordingNavigator>,
        pub session: Arc<SessionStore>,
        pub gateway: Arc<Gateway>,
    }

    pub(crate) fn fixture() -> Fixture {
        let transport = Arc::new(ScriptedTransport::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let session = Arc::new(SessionStore::new(
            Arc::new(MemorySessionRepository::new()),
            Arc::new(ManualClock::default()),
        ));
        let gateway = Arc::new(Gateway::new(
            transport.clone(),
            session.clone(),
            navigator.clone(),
        ));
        Fixture {
            transport,
            navigator,
            session,
            gateway,
        }
    }

    #[tokio::test]
    async fn test_attaches_bearer_token_when_present() {
        let f = fixture();
        f.session.set_auth("abc", 3600, "u1", Role::Admin).unwrap();

        f.gateway.execute(ApiRequest::get("/orders")).await.unwrap();

        assert_eq!(f.transport.last_request().header(AUTHORIZATION), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn test_no_header_without_token() {
        let f = fixture();

        let spoofed = ApiRequest::get("/orders").with_header("authorization", "Bearer stale");
        f.gateway.execute(spoofed).await.unwrap();

        assert_eq!(f.transport.last_request().header(AUTHORIZATION), None);
    }

    #[tokio::test]
    async fn test_401_ends_session_and_redirects() {
        let f = fixture();
        f.session.set_auth("abc", 3600, "u1", Role::Admin).unwrap();
        f.transport.respond(401, json!({"message": "jwt expired"}));

        let result = f.gateway.execute(ApiRequest::get("/accounts")).await;

        assert_eq!(result, Err(ShopdeskError::Unauthorized));
        assert!(!f.session.is_authenticated());
        assert_eq!(f.session.token(), None);
        assert_eq!(*f.navigator.redirects.lock().unwrap(), vec![Route::Login]);
    }

    #[tokio::test]
    async fn test_other_statuses_pass_through() {
        let f = fixture();
        f.session.set_auth("abc", 3600, "u1", Role::Admin).unwrap();
        f.transport.respond(403, json!({"message": "forbidden"}));
        f.transport.respond(500, Value::Null);

        let forbidden = f.gateway.execute(ApiRequest::get("/users")).await.unwrap();
        let failed = f.gateway.execute(ApiRequest::get("/users")).await.unwrap();

        assert_eq!(forbidden.status, 403);
        assert_eq!(failed.status, 500);
        assert!(f.session.is_authenticated());
        assert!(f.navigator.redirects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_is_not_session_fatal() {
        let f = fixture();
        f.session.set_auth("abc", 3600, "u1", Role::Admin).unwrap();
        f.transport.fail(ShopdeskError::network("connection refused"));

        let result = f.gateway.execute(ApiRequest::get("/orders")).await;

        assert!(matches!(result, Err(ShopdeskError::Network(_))));
        assert!(f.session.is_authenticated());
        assert_eq!(f.transport.requests.lock().unwrap().len(), 1);
    }
}
