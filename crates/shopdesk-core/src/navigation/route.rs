//! Dashboard routes and their access rules.

use crate::session::Role;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Access rule attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteAccess {
    pub requires_auth: bool,
    /// `None` means any authenticated role may enter.
    pub allowed_roles: Option<&'static [Role]>,
}

impl RouteAccess {
    pub const PUBLIC: RouteAccess = RouteAccess {
        requires_auth: false,
        allowed_roles: None,
    };

    pub const AUTHENTICATED: RouteAccess = RouteAccess {
        requires_auth: true,
        allowed_roles: None,
    };

    pub const fn roles(roles: &'static [Role]) -> Self {
        RouteAccess {
            requires_auth: true,
            allowed_roles: Some(roles),
        }
    }

    pub fn permits(&self, role: Option<Role>) -> bool {
        match (self.allowed_roles, role) {
            (None, _) => true,
            (Some(allowed), Some(role)) => allowed.contains(&role),
            (Some(_), None) => false,
        }
    }
}

const MANAGERS: &[Role] = &[Role::Admin, Role::SuperAdmin, Role::OperationManager];
const ACCOUNTING: &[Role] = &[Role::Admin, Role::SuperAdmin];
const BULK: &[Role] = &[Role::Admin, Role::SuperAdmin, Role::BulkOrder];
const SUPER_ADMIN: &[Role] = &[Role::SuperAdmin];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Route {
    Login,
    Dashboard,
    Orders,
    Inventory,
    Accounts,
    Transactions,
    Categories,
    Vendors,
    Liabilities,
    BankAccounts,
    BulkCustomers,
    Quotations,
    Invoices,
    Users,
    Settings,
}

impl Route {
    /// Where unauthenticated sessions are sent.
    pub const LOGIN: Route = Route::Login;
    /// Where authenticated sessions without the required role are sent.
    pub const DEFAULT: Route = Route::Dashboard;

    pub fn access(&self) -> RouteAccess {
        match self {
            Route::Login => RouteAccess::PUBLIC,
            Route::Dashboard | Route::Settings => RouteAccess::AUTHENTICATED,
            Route::Orders | Route::Inventory => RouteAccess::roles(MANAGERS),
            Route::Accounts
            | Route::Transactions
            | Route::Categories
            | Route::Vendors
            | Route::Liabilities
            | Route::BankAccounts => RouteAccess::roles(ACCOUNTING),
            Route::BulkCustomers | Route::Quotations | Route::Invoices => {
                RouteAccess::roles(BULK)
            }
            Route::Users => RouteAccess::roles(SUPER_ADMIN),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/".to_string(),
            other => format!("/{other}"),
        }
    }
}
