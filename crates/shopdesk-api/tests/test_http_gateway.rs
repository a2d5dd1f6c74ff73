//! End-to-end checks of the gateway over real HTTP against a mock server.

use serde_json::json;
use shopdesk_api::query::fetcher;
use shopdesk_api::{ApiClient, Gateway, QueryClient, ReqwestTransport, Toast, ToastSink};
use shopdesk_core::auth::LoginForm;
use shopdesk_core::clock::ManualClock;
use shopdesk_core::navigation::{Navigator, Route};
use shopdesk_core::query::QueryKey;
use shopdesk_core::resource::Resource;
use shopdesk_core::session::{Role, SessionStore};
use shopdesk_core::ShopdeskError;
use shopdesk_infrastructure::MemorySessionRepository;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Redirects(Mutex<Vec<Route>>);

impl Navigator for Redirects {
    fn hard_redirect(&self, route: Route) {
        self.0.lock().unwrap().push(route);
    }
}

#[derive(Default)]
struct Toasts(Mutex<Vec<Toast>>);

impl ToastSink for Toasts {
    fn push(&self, toast: Toast) {
        self.0.lock().unwrap().push(toast);
    }
}

struct Setup {
    server: MockServer,
    session: Arc<SessionStore>,
    redirects: Arc<Redirects>,
    client: ApiClient,
}

async fn setup() -> Setup {
    let server = MockServer::start().await;
    let session = Arc::new(SessionStore::new(
        Arc::new(MemorySessionRepository::new()),
        Arc::new(ManualClock::default()),
    ));
    let redirects = Arc::new(Redirects::default());
    let transport = ReqwestTransport::new(server.uri(), Duration::from_secs(5)).unwrap();
    let gateway = Arc::new(Gateway::new(
        Arc::new(transport),
        session.clone(),
        redirects.clone(),
    ));
    Setup {
        server,
        session,
        redirects,
        client: ApiClient::new(gateway),
    }
}

#[tokio::test]
async fn test_login_then_authorized_list() {
    let s = setup().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({
            "email": "a@b.com",
            "password": "secret",
            "business": "penhouse"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-1",
            "expiresIn": 3600,
            "userId": "u1",
            "role": "admin"
        })))
        .expect(1)
        .mount(&s.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "ok",
            "data": [{"id": "acc-1", "name": "Cash"}]
        })))
        .expect(1)
        .mount(&s.server)
        .await;

    let login = s
        .client
        .login(&LoginForm::new("a@b.com", "secret", "penhouse"))
        .await
        .unwrap();
    s.session
        .set_auth(&login.token, login.expires_in, &login.user_id, login.role)
        .unwrap();
    let accounts: Vec<serde_json::Value> = s
        .client
        .list(Resource::Accounts, &serde_json::Value::Null)
        .await
        .unwrap();

    assert_eq!(s.session.role(), Some(Role::Admin));
    assert_eq!(accounts.len(), 1);
}

#[tokio::test]
async fn test_401_from_any_endpoint_logs_out() {
    let s = setup().await;
    s.session.set_auth("expired", 3600, "u1", Role::Admin).unwrap();
    Mock::given(method("GET"))
        .and(path("/vendors"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .mount(&s.server)
        .await;

    let err = s
        .client
        .list_raw(Resource::Vendors, &serde_json::Value::Null)
        .await
        .unwrap_err();

    assert_eq!(err, ShopdeskError::Unauthorized);
    assert!(!s.session.is_authenticated());
    assert_eq!(*s.redirects.0.lock().unwrap(), vec![Route::Login]);
}

#[tokio::test]
async fn test_pagination_params_reach_the_server() {
    let s = setup().await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .and(query_param("page", "3"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "ok",
            "data": [],
            "total": 45
        })))
        .expect(1)
        .mount(&s.server)
        .await;

    let page: shopdesk_api::Paginated<serde_json::Value> = s
        .client
        .list_page(Resource::Transactions, &json!({"page": 3, "limit": 20}))
        .await
        .unwrap();

    assert_eq!(page.total, 45);
}

#[tokio::test]
async fn test_concurrent_cached_reads_hit_server_once() {
    let s = setup().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "ok", "data": []}))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&s.server)
        .await;
    let toasts = Arc::new(Toasts::default());
    let cache = QueryClient::new(
        Arc::new(ManualClock::default()),
        toasts.clone(),
        Duration::from_secs(300),
    );
    let api = s.client.clone();
    let load = fetcher(move || {
        let api = api.clone();
        async move {
            api.list_raw(Resource::Categories, &serde_json::Value::Null)
                .await
        }
    });
    let key = QueryKey::resource(Resource::Categories);
    let stale = Duration::from_secs(600);

    let (a, b, c) = tokio::join!(
        cache.fetch(&key, stale, load.clone()),
        cache.fetch(&key, stale, load.clone()),
        cache.fetch(&key, stale, load.clone()),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert!(toasts.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_server_message_surfaces_in_error_toast() {
    let s = setup().await;
    Mock::given(method("POST"))
        .and(path("/accounts"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Account name is required"})),
        )
        .mount(&s.server)
        .await;
    let toasts = Arc::new(Toasts::default());
    let cache = QueryClient::new(
        Arc::new(ManualClock::default()),
        toasts.clone(),
        Duration::from_secs(300),
    );

    let result = cache
        .mutate(
            shopdesk_core::mutation::MutationKind::CreateAccount,
            s.client.create(Resource::Accounts, json!({"name": ""})),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(
        *toasts.0.lock().unwrap(),
        vec![Toast::error("Account name is required")]
    );
}
