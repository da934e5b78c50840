use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::format::round_money;

/// Fixed VAT rate applied to every invoice.
pub const TAX_RATE: Decimal = dec!(0.19);

/// Subtotal, tax and grand total. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    /// Totals from already-rounded line totals, or `None` when the sum or
    /// the tax does not fit into a `Decimal`.
    pub fn checked_from_line_totals<I>(line_totals: I) -> Option<Self>
    where
        I: IntoIterator<Item = Decimal>,
    {
        let subtotal = line_totals
            .into_iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line))?;
        let tax = round_money(subtotal.checked_mul(TAX_RATE)?);
        let total = round_money(subtotal.checked_add(tax)?);

        Some(Self {
            subtotal,
            tax,
            total,
        })
    }

    /// Like [`checked_from_line_totals`](Self::checked_from_line_totals) but
    /// saturates at `Decimal::MAX`/`MIN` instead of failing.
    pub fn from_line_totals<I>(line_totals: I) -> Self
    where
        I: IntoIterator<Item = Decimal>,
    {
        let subtotal = line_totals
            .into_iter()
            .fold(Decimal::ZERO, |sum, line| sum.saturating_add(line));
        let tax = round_money(subtotal.saturating_mul(TAX_RATE));
        let total = round_money(subtotal.saturating_add(tax));

        Self {
            subtotal,
            tax,
            total,
        }
    }
}
