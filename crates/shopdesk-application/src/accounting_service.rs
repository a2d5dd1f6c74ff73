//! Accounts, transactions, categories and liabilities.

use crate::resource_service::ResourceService;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shopdesk_api::{Paginated, QueryHandle};
use shopdesk_core::mutation::MutationKind;
use shopdesk_core::resource::Resource;
use shopdesk_core::{Result, ShopdeskError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    Income,
    Expense,
}

/// A transaction as entered in the form. `amount` is in minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: i64,
    #[serde(default)]
    pub description: String,
    /// ISO date (`YYYY-MM-DD`) the transaction took effect.
    pub date: String,
}

impl TransactionDraft {
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(ShopdeskError::validation("accountId", "Please select an account"));
        }
        if self.amount <= 0 {
            return Err(ShopdeskError::validation("amount", "Amount must be greater than zero"));
        }
        if self.date.trim().is_empty() {
            return Err(ShopdeskError::validation("date", "Date is required"));
        }
        Ok(())
    }
}

/// Page request for the transactions ledger (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Page and limit clamped to at least 1.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.max(1),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

#[derive(Clone)]
pub struct AccountingService {
    resources: ResourceService,
}

impl AccountingService {
    pub fn new(resources: ResourceService) -> Self {
        Self { resources }
    }

    pub async fn accounts(&self) -> Result<Option<Value>> {
        self.resources.list(Resource::Accounts, Value::Null).await
    }

    pub fn watch_accounts(&self) -> QueryHandle {
        self.resources.watch(Resource::Accounts, Value::Null)
    }

    pub async fn transactions(&self, page: PageRequest) -> Result<Option<Value>> {
        self.resources
            .list(Resource::Transactions, page_params(page))
            .await
    }

    /// One typed page of the ledger with its total row count. Shares the
    /// cache entry of [`transactions`](Self::transactions) for the same page.
    pub async fn transactions_page<T: DeserializeOwned>(
        &self,
        page: PageRequest,
    ) -> Result<Option<Paginated<T>>> {
        self.resources
            .page(Resource::Transactions, &page.normalized())
            .await
    }

    pub fn watch_transactions(&self, page: PageRequest) -> QueryHandle {
        self.resources.watch(Resource::Transactions, page_params(page))
    }

    pub async fn categories(&self) -> Result<Option<Value>> {
        self.resources.list(Resource::Categories, Value::Null).await
    }

    pub async fn liabilities(&self) -> Result<Option<Value>> {
        self.resources.list(Resource::Liabilities, Value::Null).await
    }

    pub async fn bank_accounts(&self) -> Result<Option<Value>> {
        self.resources.list(Resource::BankAccounts, Value::Null).await
    }

    pub async fn create_account(&self, body: Value) -> Result<Value> {
        self.resources
            .create(MutationKind::CreateAccount, Resource::Accounts, body)
            .await
    }

    pub async fn update_account(&self, id: &str, body: Value) -> Result<Value> {
        self.resources
            .update(MutationKind::UpdateAccount, Resource::Accounts, id, body)
            .await
    }

    pub async fn delete_account(&self, id: &str) -> Result<Value> {
        self.resources
            .delete(MutationKind::DeleteAccount, Resource::Accounts, id)
            .await
    }

    /// Records a transaction. Balances change, so cached accounts are
    /// refetched along with the ledger.
    pub async fn create_transaction(&self, draft: &TransactionDraft) -> Result<Value> {
        draft.validate()?;
        let body = serde_json::to_value(draft)?;
        self.resources
            .create(MutationKind::CreateTransaction, Resource::Transactions, body)
            .await
    }

    pub async fn delete_transaction(&self, id: &str) -> Result<Value> {
        self.resources
            .delete(MutationKind::DeleteTransaction, Resource::Transactions, id)
            .await
    }

    pub async fn create_category(&self, name: &str, kind: TransactionType) -> Result<Value> {
        if name.trim().is_empty() {
            return Err(ShopdeskError::validation("name", "Name is required"));
        }
        self.resources
            .create(
                MutationKind::CreateCategory,
                Resource::Categories,
                json!({ "name": name.trim(), "type": kind }),
            )
            .await
    }

    pub async fn delete_category(&self, id: &str) -> Result<Value> {
        self.resources
            .delete(MutationKind::DeleteCategory, Resource::Categories, id)
            .await
    }

    pub async fn create_liability(&self, body: Value) -> Result<Value> {
        self.resources
            .create(MutationKind::CreateLiability, Resource::Liabilities, body)
            .await
    }

    /// Pays `amount` (minor units) of a liability from `account_id`.
    pub async fn pay_liability(&self, id: &str, amount: i64, account_id: &str) -> Result<Value> {
        if amount <= 0 {
            return Err(ShopdeskError::validation("amount", "Amount must be greater than zero"));
        }
        let request = self.resources.api().action(
            Resource::Liabilities,
            id,
            "pay",
            json!({ "amount": amount, "accountId": account_id }),
        );
        self.resources
            .mutate(MutationKind::PayLiability, request)
            .await
    }
}

fn page_params(page: PageRequest) -> Value {
    let page = page.normalized();
    json!({ "page": page.page, "limit": page.limit })
}
