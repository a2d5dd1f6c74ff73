//! Write operations and the cached resources each one affects.
//!
//! The dependency graph lives in exhaustive matches: adding a variant to
//! [`MutationKind`] does not compile until it declares what it invalidates
//! and what to tell the user.

use crate::resource::Resource;
use serde::Serialize;
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MutationKind {
    CreateAccount,
    UpdateAccount,
    DeleteAccount,
    CreateTransaction,
    DeleteTransaction,
    CreateCategory,
    DeleteCategory,
    CreateVendor,
    UpdateVendor,
    CreateLiability,
    PayLiability,
    UpdateOrderStatus,
    AdjustInventory,
    CreateBulkCustomer,
    CreateQuotation,
    UpdateQuotation,
    ConvertQuotationToInvoice,
    CreateInvoice,
    RecordInvoicePayment,
    CreateBankAccount,
    CreateUser,
    UpdateUserRole,
    DeleteUser,
}

impl MutationKind {
    /// Every cached resource whose data may change when this write succeeds.
    pub fn invalidates(&self) -> &'static [Resource] {
        use Resource::*;
        match self {
            MutationKind::CreateAccount
            | MutationKind::UpdateAccount
            | MutationKind::DeleteAccount => &[Accounts],
            // Recording or removing a transaction moves account balances.
            MutationKind::CreateTransaction | MutationKind::DeleteTransaction => {
                &[Transactions, Accounts]
            }
            MutationKind::CreateCategory | MutationKind::DeleteCategory => &[Categories],
            MutationKind::CreateVendor | MutationKind::UpdateVendor => &[Vendors],
            MutationKind::CreateLiability => &[Liabilities],
            MutationKind::PayLiability => &[Liabilities, Transactions, Accounts],
            MutationKind::UpdateOrderStatus => &[Orders],
            MutationKind::AdjustInventory => &[Inventory],
            MutationKind::CreateBulkCustomer => &[BulkCustomers],
            MutationKind::CreateQuotation | MutationKind::UpdateQuotation => &[Quotations],
            MutationKind::ConvertQuotationToInvoice => &[Quotations, Invoices],
            MutationKind::CreateInvoice => &[Invoices],
            MutationKind::RecordInvoicePayment => &[Invoices, Transactions, Accounts, BankAccounts],
            MutationKind::CreateBankAccount => &[BankAccounts],
            MutationKind::CreateUser | MutationKind::DeleteUser => &[Users],
            MutationKind::UpdateUserRole => &[Users, BusinessInfo],
        }
    }

    /// Toast text shown after the write succeeds.
    pub fn success_message(&self) -> &'static str {
        match self {
            MutationKind::CreateAccount => "Account created successfully",
            MutationKind::UpdateAccount => "Account updated successfully",
            MutationKind::DeleteAccount => "Account deleted successfully",
            MutationKind::CreateTransaction => "Transaction recorded successfully",
            MutationKind::DeleteTransaction => "Transaction deleted successfully",
            MutationKind::CreateCategory => "Category created successfully",
            MutationKind::DeleteCategory => "Category deleted successfully",
            MutationKind::CreateVendor => "Vendor created successfully",
            MutationKind::UpdateVendor => "Vendor updated successfully",
            MutationKind::CreateLiability => "Liability created successfully",
            MutationKind::PayLiability => "Liability payment recorded",
            MutationKind::UpdateOrderStatus => "Order status updated",
            MutationKind::AdjustInventory => "Inventory updated successfully",
            MutationKind::CreateBulkCustomer => "Customer created successfully",
            MutationKind::CreateQuotation => "Quotation created successfully",
            MutationKind::UpdateQuotation => "Quotation updated successfully",
            MutationKind::ConvertQuotationToInvoice => "Quotation converted to invoice",
            MutationKind::CreateInvoice => "Invoice created successfully",
            MutationKind::RecordInvoicePayment => "Payment recorded successfully",
            MutationKind::CreateBankAccount => "Bank account added successfully",
            MutationKind::CreateUser => "User created successfully",
            MutationKind::UpdateUserRole => "User role updated",
            MutationKind::DeleteUser => "User deleted successfully",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_transaction_writes_invalidate_accounts() {
        let targets = MutationKind::CreateTransaction.invalidates();
        assert!(targets.contains(&Resource::Transactions));
        assert!(targets.contains(&Resource::Accounts));
    }

    #[test]
    fn test_every_kind_declares_targets_and_message() {
        for kind in MutationKind::iter() {
            assert!(!kind.invalidates().is_empty(), "{kind} has no targets");
            assert!(!kind.success_message().is_empty(), "{kind} has no message");
        }
    }
}
