//! Cached list queries and cache-aware writes for the dashboard resources.
//!
//! Every list goes through the shared [`QueryClient`] with the stale time
//! configured for its resource, and only runs while the session is
//! authenticated. Every write goes through [`QueryClient::mutate`] under a
//! [`MutationKind`], which decides what gets invalidated and what toast the
//! user sees.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shopdesk_api::client::{Envelope, Paginated, decode};
use shopdesk_api::query::Fetcher;
use shopdesk_api::{ApiClient, QueryClient, QueryHandle, QueryOptions, fetcher};
use shopdesk_core::config::ClientConfig;
use shopdesk_core::mutation::MutationKind;
use shopdesk_core::pricing::{PriceBreakdown, PriceInput, price};
use shopdesk_core::query::QueryKey;
use shopdesk_core::resource::Resource;
use shopdesk_core::session::{BusinessInfo, Role, Session, SessionStore};
use shopdesk_core::{Result, ShopdeskError};
use std::future::Future;
use std::sync::Arc;

/// A quotation or invoice before it is priced and sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub customer_id: String,
    #[serde(flatten)]
    pub pricing: PriceInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DocumentDraft {
    /// Request body with the computed totals attached under `totals`.
    pub fn to_body(&self) -> Result<Value> {
        if self.customer_id.trim().is_empty() {
            return Err(ShopdeskError::validation("customerId", "Please select a customer"));
        }
        if self.pricing.items.is_empty() {
            return Err(ShopdeskError::validation("items", "Add at least one item"));
        }
        let totals: PriceBreakdown = price(&self.pricing)?;
        let mut body = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut body {
            map.insert("totals".to_string(), serde_json::to_value(totals)?);
        }
        Ok(body)
    }
}

#[derive(Clone)]
pub struct ResourceService {
    api: ApiClient,
    queries: QueryClient,
    session: Arc<SessionStore>,
    config: Arc<ClientConfig>,
}

impl ResourceService {
    pub fn new(
        api: ApiClient,
        queries: QueryClient,
        session: Arc<SessionStore>,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            api,
            queries,
            session,
            config,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn key(resource: Resource, params: &Value) -> QueryKey {
        QueryKey::from_value(resource, params)
    }

    /// Stale time from config; enabled only while signed in.
    pub fn options(&self, resource: Resource) -> QueryOptions {
        QueryOptions::new(self.config.stale_time(resource)).enabled(self.session.is_authenticated())
    }

    /// Mounts a view on the list of `resource` filtered by `params`.
    ///
    /// The view follows the session: it is disabled while signed out and
    /// fetches as soon as a sign-in completes.
    pub fn watch(&self, resource: Resource, params: Value) -> QueryHandle {
        let key = Self::key(resource, &params);
        let options = QueryOptions::new(self.config.stale_time(resource));
        self.queries.watch_while(
            key,
            options,
            self.list_fetcher(resource, params),
            self.session.subscribe(),
            |session: &Session| session.is_authenticated,
        )
    }

    /// The raw list envelope, through the cache. `None` while signed out.
    pub async fn list(&self, resource: Resource, params: Value) -> Result<Option<Value>> {
        let key = Self::key(resource, &params);
        self.fetch_list(key, resource, params).await
    }

    /// Typed rows of a list. Empty while signed out.
    pub async fn list_as<T: DeserializeOwned>(&self, resource: Resource, params: Value) -> Result<Vec<T>> {
        if resource.is_paginated() {
            let page = self.page::<T, _>(resource, &params).await?;
            return Ok(page.map(|page| page.data).unwrap_or_default());
        }
        match self.list(resource, params).await? {
            Some(value) => Ok(decode::<Envelope<Vec<T>>>(value)?.data),
            None => Ok(Vec::new()),
        }
    }

    /// One typed page of a paginated resource. `None` while signed out.
    pub async fn page<T, P>(&self, resource: Resource, params: &P) -> Result<Option<Paginated<T>>>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        if !resource.is_paginated() {
            return Err(ShopdeskError::internal(format!("{resource} is not paginated")));
        }
        let key = QueryKey::with_params(resource, params)?;
        let params = serde_json::to_value(params)?;
        match self.fetch_list(key, resource, params).await? {
            Some(value) => Ok(Some(decode(value)?)),
            None => Ok(None),
        }
    }

    /// The active business and the caller's role in it, through the cache.
    ///
    /// Every fetch writes the answer back to the session, so once a role
    /// change invalidates business info the next read updates the session.
    pub async fn business_info(&self) -> Result<BusinessInfo> {
        let key = QueryKey::resource(Resource::BusinessInfo);
        let stale_time = self.config.stale_time(Resource::BusinessInfo);
        let value = self
            .queries
            .fetch(&key, stale_time, self.business_info_fetcher())
            .await?;
        decode(value)
    }

    pub async fn create(&self, kind: MutationKind, resource: Resource, body: Value) -> Result<Value> {
        self.mutate(kind, self.api.create(resource, body)).await
    }

    pub async fn update(
        &self,
        kind: MutationKind,
        resource: Resource,
        id: &str,
        body: Value,
    ) -> Result<Value> {
        self.mutate(kind, self.api.update(resource, id, body)).await
    }

    pub async fn delete(&self, kind: MutationKind, resource: Resource, id: &str) -> Result<Value> {
        self.mutate(kind, self.api.delete(resource, id)).await
    }

    pub async fn mutate<F>(&self, kind: MutationKind, request: F) -> Result<Value>
    where
        F: Future<Output = Result<Value>>,
    {
        self.queries.mutate(kind, request).await
    }

    // Orders and inventory

    pub async fn update_order_status(&self, id: &str, status: &str) -> Result<Value> {
        let request = self
            .api
            .patch(Resource::Orders, id, "status", json!({ "status": status }));
        self.mutate(MutationKind::UpdateOrderStatus, request).await
    }

    /// Adds `delta` units (negative to remove) to an inventory item.
    pub async fn adjust_inventory(&self, id: &str, delta: i64, reason: &str) -> Result<Value> {
        if delta == 0 {
            return Err(ShopdeskError::validation("quantity", "Adjustment cannot be zero"));
        }
        let request = self.api.patch(
            Resource::Inventory,
            id,
            "adjust",
            json!({ "delta": delta, "reason": reason }),
        );
        self.mutate(MutationKind::AdjustInventory, request).await
    }

    // Vendors

    pub async fn create_vendor(&self, body: Value) -> Result<Value> {
        self.create(MutationKind::CreateVendor, Resource::Vendors, body).await
    }

    pub async fn update_vendor(&self, id: &str, body: Value) -> Result<Value> {
        self.update(MutationKind::UpdateVendor, Resource::Vendors, id, body)
            .await
    }

    // Bulk orders

    pub async fn create_bulk_customer(&self, body: Value) -> Result<Value> {
        self.create(MutationKind::CreateBulkCustomer, Resource::BulkCustomers, body)
            .await
    }

    pub async fn create_quotation(&self, draft: &DocumentDraft) -> Result<Value> {
        let body = draft.to_body()?;
        self.create(MutationKind::CreateQuotation, Resource::Quotations, body)
            .await
    }

    pub async fn update_quotation(&self, id: &str, draft: &DocumentDraft) -> Result<Value> {
        let body = draft.to_body()?;
        self.update(MutationKind::UpdateQuotation, Resource::Quotations, id, body)
            .await
    }

    pub async fn convert_quotation(&self, id: &str) -> Result<Value> {
        let request = self
            .api
            .action(Resource::Quotations, id, "convert", Value::Null);
        self.mutate(MutationKind::ConvertQuotationToInvoice, request)
            .await
    }

    pub async fn create_invoice(&self, draft: &DocumentDraft) -> Result<Value> {
        let body = draft.to_body()?;
        self.create(MutationKind::CreateInvoice, Resource::Invoices, body)
            .await
    }

    /// Records `amount` (minor units) paid into `bank_account_id`.
    pub async fn record_invoice_payment(
        &self,
        id: &str,
        amount: i64,
        bank_account_id: &str,
    ) -> Result<Value> {
        if amount <= 0 {
            return Err(ShopdeskError::validation("amount", "Amount must be greater than zero"));
        }
        let request = self.api.action(
            Resource::Invoices,
            id,
            "payments",
            json!({ "amount": amount, "bankAccountId": bank_account_id }),
        );
        self.mutate(MutationKind::RecordInvoicePayment, request).await
    }

    // Banking and users

    pub async fn create_bank_account(&self, body: Value) -> Result<Value> {
        self.create(MutationKind::CreateBankAccount, Resource::BankAccounts, body)
            .await
    }

    pub async fn create_user(&self, body: Value) -> Result<Value> {
        self.create(MutationKind::CreateUser, Resource::Users, body).await
    }

    /// Changes a user's role, then re-reads business info in case the
    /// caller's own role changed.
    pub async fn update_user_role(&self, id: &str, role: Role) -> Result<Value> {
        let request = self
            .api
            .patch(Resource::Users, id, "role", json!({ "role": role }));
        let updated = self.mutate(MutationKind::UpdateUserRole, request).await?;
        if let Err(e) = self.business_info().await {
            tracing::warn!("[ResourceService] Business info refresh failed: {}", e);
        }
        Ok(updated)
    }

    pub async fn delete_user(&self, id: &str) -> Result<Value> {
        self.delete(MutationKind::DeleteUser, Resource::Users, id).await
    }

    async fn fetch_list(&self, key: QueryKey, resource: Resource, params: Value) -> Result<Option<Value>> {
        let options = self.options(resource);
        if !options.enabled {
            return Ok(None);
        }
        let fetch = self.list_fetcher(resource, params);
        self.queries
            .fetch(&key, options.stale_time, fetch)
            .await
            .map(Some)
    }

    fn business_info_fetcher(&self) -> Fetcher {
        let api = self.api.clone();
        let session = self.session.clone();
        fetcher(move || {
            let api = api.clone();
            let session = session.clone();
            async move {
                let info = api.business_info().await?;
                tolerate_degraded(session.set_business_info(info.clone()))?;
                Ok(serde_json::to_value(info)?)
            }
        })
    }

    fn list_fetcher(&self, resource: Resource, params: Value) -> Fetcher {
        let api = self.api.clone();
        fetcher(move || {
            let api = api.clone();
            let params = params.clone();
            async move { api.list_raw(resource, &params).await }
        })
    }
}

/// Accepts a failed disk write: the store has already applied the change in memory.
pub(crate) fn tolerate_degraded(result: Result<()>) -> Result<()> {
    match result {
        Err(ShopdeskError::PersistenceDegraded(reason)) => {
            tracing::warn!("[Session] Continuing without durable session: {}", reason);
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopdesk_core::pricing::{Discount, LineItem};

    fn draft() -> DocumentDraft {
        DocumentDraft {
            customer_id: "cust-1".to_string(),
            pricing: PriceInput {
                items: vec![LineItem {
                    unit_price: 1_000,
                    quantity: 3,
                }],
                delivery_charge: 500,
                discount: Discount::Flat(300),
                tax_rate_bp: 1_000,
            },
            notes: None,
        }
    }

    #[test]
    fn test_draft_body_carries_totals() {
        let body = draft().to_body().unwrap();

        assert_eq!(body["customerId"], "cust-1");
        assert_eq!(body["deliveryCharge"], 500);
        assert_eq!(body["totals"]["subtotal"], 3_000);
        assert_eq!(body["totals"]["taxable"], 3_200);
        assert_eq!(body["totals"]["tax"], 320);
        assert_eq!(body["totals"]["total"], 3_520);
        assert!(body.get("notes").is_none());
    }

    #[test]
    fn test_draft_without_items_is_rejected() {
        let mut empty = draft();
        empty.pricing.items.clear();

        let err = empty.to_body().unwrap_err();
        assert_eq!(err, ShopdeskError::validation("items", "Add at least one item"));
    }

    #[test]
    fn test_draft_pricing_errors_propagate() {
        let mut over = draft();
        over.pricing.discount = Discount::Flat(10_000);

        assert!(over.to_body().unwrap_err().is_validation());
    }

    #[test]
    fn test_degraded_persistence_is_tolerated() {
        assert_eq!(
            tolerate_degraded(Err(ShopdeskError::PersistenceDegraded("disk full".into()))),
            Ok(())
        );
        assert_eq!(
            tolerate_degraded(Err(ShopdeskError::storage("denied"))),
            Err(ShopdeskError::storage("denied"))
        );
    }
}
