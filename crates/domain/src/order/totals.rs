//! Order totals computation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::records::OrderLine;
use super::value_objects::Money;

/// IVA rate applied to the taxable base (12%).
pub fn tax_rate() -> Decimal {
    Decimal::new(12, 2)
}

/// The four totals carried by an order.
///
/// This is the single place totals are derived. They are computed once
/// at creation; nothing recomputes them implicitly afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount_total: Money,
    pub tax_total: Money,
    pub grand_total: Money,
}

impl OrderTotals {
    /// Computes totals over the given lines plus an explicit
    /// order-level discount.
    ///
    /// - subtotal = Σ(final price × quantity)
    /// - discount = Σ(max(0, list − final) × quantity) + order discount
    /// - tax = (subtotal − discount) × 12%, rounded to cents
    /// - grand total = subtotal − discount + tax
    pub fn compute(lines: &[OrderLine], order_discount: Money) -> Self {
        let mut subtotal = Money::zero();
        let mut discount_total = order_discount;

        for line in lines {
            subtotal += line.line_total();
            discount_total += line.discount();
        }

        let taxable = subtotal - discount_total;
        let tax_total = Money::new(taxable.amount() * tax_rate()).round_cents();
        let grand_total = taxable + tax_total;

        Self {
            subtotal,
            discount_total,
            tax_total,
            grand_total,
        }
    }
}
