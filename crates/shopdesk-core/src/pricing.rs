//! Quotation, invoice and bulk-order totals.
//!
//! All money is integer minor units (e.g. cents). The order of operations is
//! fixed: `subtotal + delivery - discount`, then tax on that amount. Each
//! percentage is rounded exactly once, half-up, at the point it is applied.

use crate::error::{Result, ShopdeskError};
use serde::{Deserialize, Serialize};

/// 100% expressed in basis points.
pub const BASIS_POINTS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub unit_price: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Discount {
    #[default]
    None,
    /// Fixed amount in minor units.
    Flat(i64),
    /// Share of the subtotal in basis points (`1250` = 12.5%).
    Percent(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInput {
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub delivery_charge: i64,
    #[serde(default)]
    pub discount: Discount,
    /// Tax rate in basis points.
    #[serde(default)]
    pub tax_rate_bp: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub delivery: i64,
    pub discount: i64,
    pub taxable: i64,
    pub tax: i64,
    pub total: i64,
}

/// Computes the breakdown for one document.
pub fn price(input: &PriceInput) -> Result<PriceBreakdown> {
    if input.delivery_charge < 0 {
        return Err(ShopdeskError::validation(
            "deliveryCharge",
            "Delivery charge cannot be negative",
        ));
    }
    if input.tax_rate_bp > BASIS_POINTS {
        return Err(ShopdeskError::validation("taxRate", "Tax rate cannot exceed 100%"));
    }

    let mut subtotal: i64 = 0;
    for item in &input.items {
        if item.unit_price < 0 {
            return Err(ShopdeskError::validation("unitPrice", "Price cannot be negative"));
        }
        let line = item
            .unit_price
            .checked_mul(i64::from(item.quantity))
            .ok_or_else(|| ShopdeskError::validation("quantity", "Line total is too large"))?;
        subtotal = subtotal
            .checked_add(line)
            .ok_or_else(|| ShopdeskError::validation("items", "Subtotal is too large"))?;
    }

    let discount = match input.discount {
        Discount::None => 0,
        Discount::Flat(amount) if amount < 0 => {
            return Err(ShopdeskError::validation("discount", "Discount cannot be negative"));
        }
        Discount::Flat(amount) => amount,
        Discount::Percent(bp) if bp > BASIS_POINTS => {
            return Err(ShopdeskError::validation("discount", "Discount cannot exceed 100%"));
        }
        Discount::Percent(bp) => percent_of(subtotal, bp),
    };

    let gross = subtotal
        .checked_add(input.delivery_charge)
        .ok_or_else(|| ShopdeskError::validation("deliveryCharge", "Delivery charge is too large"))?;
    if discount > gross {
        return Err(ShopdeskError::validation(
            "discount",
            "Discount cannot exceed subtotal plus delivery",
        ));
    }

    let taxable = gross - discount;
    let tax = percent_of(taxable, input.tax_rate_bp);
    let total = taxable
        .checked_add(tax)
        .ok_or_else(|| ShopdeskError::validation("taxRate", "Total is too large"))?;

    Ok(PriceBreakdown {
        subtotal,
        delivery: input.delivery_charge,
        discount,
        taxable,
        tax,
        total,
    })
}

/// `amount * bp / 10000`, rounded half-up. `amount` is never negative here.
fn percent_of(amount: i64, bp: u32) -> i64 {
    let scaled = i128::from(amount) * i128::from(bp);
    let half = i128::from(BASIS_POINTS / 2);
    ((scaled + half) / i128::from(BASIS_POINTS)) as i64
}
