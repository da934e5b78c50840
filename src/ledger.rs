//! Ordered line items of the invoice being edited.
//!
//! Positions are always `001..N` in display order and every line total is
//! the rounded product of its quantity and unit price. Amounts whose line
//! total or invoice total would overflow a `Decimal` are rejected. Every
//! operation either applies completely or leaves the ledger untouched.

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{InvoiceError, Result};
use crate::models::{InvoiceTotals, LineItem, LineItemDraft, LineItemPatch, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// What a mutating call did, so the caller can adjust selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    Edited(usize),
    Removed(usize),
    Moved { from: usize, to: usize },
    Unchanged,
    Cleared,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceLedger {
    items: Vec<LineItem>,
    last_moved: Option<usize>,
}

impl InvoiceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&LineItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Destination index of the most recent successful move.
    pub fn last_moved(&self) -> Option<usize> {
        self.last_moved
    }

    /// Append a new item.
    ///
    /// Quantity and unit price must be provided (zero is fine); unit and
    /// description must not be blank.
    pub fn add(&mut self, draft: LineItemDraft) -> Result<&LineItem> {
        let quantity = draft
            .quantity
            .ok_or_else(|| InvoiceError::Validation("quantity".to_string()))?;
        let unit = required_text(draft.unit.as_deref(), "unit")?;
        let description = required_text(draft.description.as_deref(), "description")?;
        let unit_price = draft
            .unit_price
            .ok_or_else(|| InvoiceError::Validation("unit price".to_string()))?;

        let index = self.items.len();
        let item = LineItem::new(
            Position::from_index(index),
            quantity,
            unit,
            description,
            unit_price,
        )?;
        check_totals(self.items.iter().chain([&item]))?;
        debug!(position = %item.position(), total = %item.line_total(), "line item added");

        self.items.push(item);
        self.last_moved = None;
        Ok(&self.items[index])
    }

    /// Replace any subset of fields on the item at `index`.
    pub fn edit(&mut self, index: usize, patch: LineItemPatch) -> Result<LedgerChange> {
        self.check_index(index)?;
        if let Some(unit) = patch.unit.as_deref() {
            required_text(Some(unit), "unit")?;
        }
        if let Some(description) = patch.description.as_deref() {
            required_text(Some(description), "description")?;
        }
        if patch.is_empty() {
            return Ok(LedgerChange::Unchanged);
        }

        let item = self.items[index].patched(patch)?;
        check_totals(
            self.items
                .iter()
                .enumerate()
                .map(|(i, other)| if i == index { &item } else { other }),
        )?;
        debug!(position = %item.position(), total = %item.line_total(), "line item edited");

        self.items[index] = item;
        Ok(LedgerChange::Edited(index))
    }

    /// Remove the item at `index` and renumber the rest.
    pub fn delete(&mut self, index: usize) -> Result<LedgerChange> {
        self.check_index(index)?;

        let removed = self.items.remove(index);
        self.renumber();
        self.last_moved = None;
        debug!(position = %removed.position(), remaining = self.items.len(), "line item deleted");

        Ok(LedgerChange::Removed(index))
    }

    /// Swap the item at `index` with its neighbour.
    ///
    /// Moving the first item up or the last item down changes nothing.
    pub fn move_item(&mut self, index: usize, direction: Direction) -> Result<LedgerChange> {
        self.check_index(index)?;

        let target = match direction {
            Direction::Up if index > 0 => index - 1,
            Direction::Down if index + 1 < self.items.len() => index + 1,
            _ => return Ok(LedgerChange::Unchanged),
        };

        self.items.swap(index, target);
        self.renumber();
        self.last_moved = Some(target);
        debug!(from = index, to = target, "line item moved");

        Ok(LedgerChange::Moved {
            from: index,
            to: target,
        })
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::from_line_totals(self.items.iter().map(LineItem::line_total))
    }

    /// Sum of line totals without tax.
    pub fn subtotal(&self) -> Decimal {
        self.totals().subtotal
    }

    pub fn reset(&mut self) -> LedgerChange {
        self.items.clear();
        self.last_moved = None;
        LedgerChange::Cleared
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(InvoiceError::Index {
                index,
                len: self.items.len(),
            })
        }
    }

    fn renumber(&mut self) {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.set_position(Position::from_index(index));
        }
    }
}

// The totals of the candidate items must fit into a `Decimal`.
fn check_totals<'a>(items: impl Iterator<Item = &'a LineItem>) -> Result<()> {
    InvoiceTotals::checked_from_line_totals(items.map(LineItem::line_total))
        .map(|_| ())
        .ok_or_else(|| InvoiceError::Validation("invoice total is too large".to_string()))
}

fn required_text(value: Option<&str>, field: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(InvoiceError::Validation(field.to_string())),
    }
}
