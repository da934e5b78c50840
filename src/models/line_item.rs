use std::fmt;

use rust_decimal::Decimal;

use crate::error::{InvoiceError, Result};
use crate::format::round_money;

/// 1-based display ordinal of a line item, printed zero-padded ("001").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(usize);

impl Position {
    /// Position for the item stored at `index` (0-based).
    pub fn from_index(index: usize) -> Self {
        Position(index + 1)
    }

    pub fn ordinal(self) -> usize {
        self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// One priced row of the invoice.
///
/// Fields are private so that `line_total` can only change together with
/// `quantity` or `unit_price`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    position: Position,
    quantity: Decimal,
    unit: String,
    description: String,
    unit_price: Decimal,
    line_total: Decimal,
}

impl LineItem {
    /// Fails when quantity × unit price does not fit into a `Decimal`.
    pub(crate) fn new(
        position: Position,
        quantity: Decimal,
        unit: String,
        description: String,
        unit_price: Decimal,
    ) -> Result<Self> {
        Ok(Self {
            position,
            quantity,
            unit,
            description,
            unit_price,
            line_total: checked_line_total(quantity, unit_price)?,
        })
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn line_total(&self) -> Decimal {
        self.line_total
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Copy of this item with the patch applied and the total recomputed.
    /// `self` is left untouched, also when the new total overflows.
    pub(crate) fn patched(&self, patch: LineItemPatch) -> Result<Self> {
        let quantity = patch.quantity.unwrap_or(self.quantity);
        let unit_price = patch.unit_price.unwrap_or(self.unit_price);

        Ok(Self {
            position: self.position,
            quantity,
            unit: patch
                .unit
                .map_or_else(|| self.unit.clone(), |unit| unit.trim().to_string()),
            description: patch.description.map_or_else(
                || self.description.clone(),
                |description| description.trim().to_string(),
            ),
            unit_price,
            line_total: checked_line_total(quantity, unit_price)?,
        })
    }
}

/// round(quantity × unit_price, 2), or `None` if the product overflows.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity.checked_mul(unit_price).map(round_money)
}

fn checked_line_total(quantity: Decimal, unit_price: Decimal) -> Result<Decimal> {
    line_total(quantity, unit_price).ok_or_else(|| {
        InvoiceError::Validation(format!("{quantity} × {unit_price} is too large"))
    })
}

/// Input for a new line item as collected from the form.
///
/// `None` means the field was left empty. Zero is a provided value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemDraft {
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
}

impl LineItemDraft {
    pub fn new(
        quantity: Decimal,
        unit: impl Into<String>,
        description: impl Into<String>,
        unit_price: Decimal,
    ) -> Self {
        Self {
            quantity: Some(quantity),
            unit: Some(unit.into()),
            description: Some(description.into()),
            unit_price: Some(unit_price),
        }
    }
}

/// Subset of fields to replace on an existing line item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemPatch {
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
}

impl LineItemPatch {
    pub fn quantity(quantity: Decimal) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    pub fn unit_price(unit_price: Decimal) -> Self {
        Self {
            unit_price: Some(unit_price),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.unit.is_none()
            && self.description.is_none()
            && self.unit_price.is_none()
    }
}
