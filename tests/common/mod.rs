// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use invoice_form::InvoiceLedger;
use invoice_form::models::{InvoiceHeader, LineItemDraft, Salutation};
use rust_decimal_macros::dec;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;

/// Minimal docx archive holding the given parts.
pub fn docx_bytes(parts: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.start_file("[Content_Types].xml", options)?;
    writer.write_all(CONTENT_TYPES.as_bytes())?;
    for (name, body) in parts {
        writer.start_file(*name, options)?;
        writer.write_all(body.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Write a template with the given document body into `dir`.
pub fn write_template(dir: &Path, parts: &[(&str, &str)]) -> Result<PathBuf> {
    let path = dir.join("vorlage.docx");
    std::fs::write(&path, docx_bytes(parts)?)?;
    Ok(path)
}

pub fn read_part(docx: &[u8], name: &str) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(docx))?;
    let mut content = String::new();
    archive.by_name(name)?.read_to_string(&mut content)?;
    Ok(content)
}

/// Wrap body xml the way Word does.
pub fn document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
}

pub fn sample_header() -> InvoiceHeader {
    let mut header = InvoiceHeader::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    header.number = "2024-17".to_string();
    header.subject = "Renovierung Bad".to_string();
    header.reference = "BV Lindenweg".to_string();
    header.salutation = Salutation::Herr;
    header.customer_name = "Max Mustermann".to_string();
    header.customer_address = "Lindenweg 3".to_string();
    header.customer_postcode = "12345 Musterstadt".to_string();
    header
}

pub fn sample_ledger() -> Result<InvoiceLedger> {
    let mut ledger = InvoiceLedger::new();
    ledger.add(LineItemDraft::new(dec!(2), "Stk", "Widget", dec!(10.00)))?;
    ledger.add(LineItemDraft::new(dec!(1), "Std", "Labor", dec!(50.00)))?;
    Ok(ledger)
}
