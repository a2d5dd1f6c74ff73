//! Typed endpoints of the back-office API.

use crate::gateway::Gateway;
use crate::transport::{ApiRequest, ApiResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shopdesk_core::auth::LoginForm;
use shopdesk_core::resource::Resource;
use shopdesk_core::session::{BusinessInfo, Role};
use shopdesk_core::{Result, ShopdeskError};
use std::sync::Arc;

const LOGIN_PATH: &str = "/auth/login";

/// The `{ message, data }` wrapper every resource endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

/// A list envelope that also carries the total row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub data: Vec<T>,
    pub total: u64,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Lifetime of `token` in seconds.
    pub expires_in: i64,
    pub user_id: String,
    pub role: Role,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"***")
            .field("expires_in", &self.expires_in)
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .finish()
    }
}

/// Decodes a JSON payload into `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

#[derive(Clone)]
pub struct ApiClient {
    gateway: Arc<Gateway>,
}

impl ApiClient {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub async fn login(&self, form: &LoginForm) -> Result<LoginResponse> {
        let body = serde_json::to_value(form)?;
        let value = self.send(ApiRequest::post(LOGIN_PATH, body)).await?;
        decode(value)
    }

    pub async fn business_info(&self) -> Result<BusinessInfo> {
        let value = self
            .send(ApiRequest::get(Resource::BusinessInfo.path()))
            .await?;
        decode(value)
    }

    /// Raw list response (the whole envelope) for caching.
    pub async fn list_raw(&self, resource: Resource, params: &Value) -> Result<Value> {
        self.send(ApiRequest::get(resource.path()).with_query(params))
            .await
    }

    pub async fn list<T: DeserializeOwned>(&self, resource: Resource, params: &Value) -> Result<Vec<T>> {
        let envelope: Envelope<Vec<T>> = decode(self.list_raw(resource, params).await?)?;
        Ok(envelope.data)
    }

    pub async fn list_page<T: DeserializeOwned>(
        &self,
        resource: Resource,
        params: &Value,
    ) -> Result<Paginated<T>> {
        decode(self.list_raw(resource, params).await?)
    }

    pub async fn get(&self, resource: Resource, id: &str) -> Result<Value> {
        self.send(ApiRequest::get(resource.item_path(id))).await
    }

    pub async fn create(&self, resource: Resource, body: Value) -> Result<Value> {
        self.send(ApiRequest::post(resource.path(), body)).await
    }

    pub async fn update(&self, resource: Resource, id: &str, body: Value) -> Result<Value> {
        self.send(ApiRequest::put(resource.item_path(id), body))
            .await
    }

    /// Partial update on a sub-path, e.g. `/orders/{id}/status`.
    pub async fn patch(
        &self,
        resource: Resource,
        id: &str,
        action: &str,
        body: Value,
    ) -> Result<Value> {
        let path = format!("{}/{}", resource.item_path(id), action);
        self.send(ApiRequest::patch(path, body)).await
    }

    /// Action on a sub-path, e.g. `/quotations/{id}/convert`.
    pub async fn action(
        &self,
        resource: Resource,
        id: &str,
        action: &str,
        body: Value,
    ) -> Result<Value> {
        let path = format!("{}/{}", resource.item_path(id), action);
        self.send(ApiRequest::post(path, body)).await
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<Value> {
        self.send(ApiRequest::delete(resource.item_path(id))).await
    }

    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let response = self.gateway.execute(request).await?;
        into_body(response)
    }
}

/// Turns a non-2xx response into an `Api` error carrying the server message.
fn into_body(response: ApiResponse) -> Result<Value> {
    if response.is_success() {
        return Ok(response.body);
    }

    let message = match &response.body {
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Value::String(text) => text.clone(),
        _ => String::new(),
    };
    Err(ShopdeskError::api(response.status, message))
}
