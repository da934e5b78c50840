mod invoice;
mod line_item;
mod totals;

pub use invoice::{InvoiceHeader, Salutation};
pub use line_item::{LineItem, LineItemDraft, LineItemPatch, Position, line_total};
pub use totals::{InvoiceTotals, TAX_RATE};
