pub mod config;
pub mod docx;
pub mod error;
pub mod format;
pub mod invoice_gen;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod ui;

pub use error::InvoiceError;
pub use ledger::{Direction, InvoiceLedger, LedgerChange};
