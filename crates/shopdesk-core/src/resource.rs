//! Remote resources the dashboard reads and writes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A logical REST resource exposed by the back-office API.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Resource {
    Orders,
    Accounts,
    Categories,
    Transactions,
    Vendors,
    Liabilities,
    Inventory,
    BulkCustomers,
    Quotations,
    Invoices,
    BankAccounts,
    Users,
    BusinessInfo,
}

impl Resource {
    /// Collection path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Orders => "/orders",
            Resource::Accounts => "/accounts",
            Resource::Categories => "/categories",
            Resource::Transactions => "/transactions",
            Resource::Vendors => "/vendors",
            Resource::Liabilities => "/liabilities",
            Resource::Inventory => "/inventory",
            Resource::BulkCustomers => "/bulk-customers",
            Resource::Quotations => "/quotations",
            Resource::Invoices => "/invoices",
            Resource::BankAccounts => "/bank-accounts",
            Resource::Users => "/users",
            Resource::BusinessInfo => "/auth/business-info",
        }
    }

    /// Path of a single item in the collection.
    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.path(), id)
    }

    /// Whether list responses carry a total count for pagination.
    pub fn is_paginated(&self) -> bool {
        matches!(self, Resource::Transactions)
    }
}
