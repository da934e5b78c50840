use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::docx::{Row, TemplateContext, render_docx};
use crate::error::{InvoiceError, Result};
use crate::format::format_decimal_comma;
use crate::ledger::InvoiceLedger;
use crate::models::{InvoiceHeader, LineItem};

/// Where the docx template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Url(String),
    Path(PathBuf),
}

impl TemplateSource {
    /// Interpret the configured template location.
    ///
    /// `http://` and `https://` values are downloaded, anything else is read
    /// from disk. A missing or blank value is a configuration error.
    pub fn parse(value: Option<&str>) -> Result<Self> {
        let value = value.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Err(InvoiceError::Configuration(
                "INVOICE_TEMPLATE_PATH is not set".to_string(),
            ));
        }

        let lower = value.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(TemplateSource::Url(value.to_string()))
        } else {
            Ok(TemplateSource::Path(PathBuf::from(value)))
        }
    }

    pub async fn fetch(&self) -> Result<Vec<u8>> {
        match self {
            TemplateSource::Url(url) => {
                let fetch_error = |reason: String| InvoiceError::Fetch {
                    source_name: url.clone(),
                    reason,
                };

                let response = reqwest::get(url)
                    .await
                    .map_err(|e| fetch_error(e.to_string()))?
                    .error_for_status()
                    .map_err(|e| fetch_error(e.to_string()))?;
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| fetch_error(e.to_string()))?;
                Ok(body.to_vec())
            }
            TemplateSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|e| InvoiceError::Fetch {
                        source_name: path.display().to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::Url(url) => f.write_str(url),
            TemplateSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Build the values bound into the template.
///
/// Key names match the placeholders used by the existing invoice templates.
pub fn build_context(header: &InvoiceHeader, ledger: &InvoiceLedger) -> TemplateContext {
    let totals = ledger.totals();
    let mut context = TemplateContext::new();

    context.insert_text("invoice_number", header.number.as_str());
    context.insert_text("invoice_date", header.date.format("%Y-%m-%d").to_string());
    context.insert_text("invoice_subject", header.subject.as_str());
    context.insert_text("invoice_bv", header.reference.as_str());
    context.insert_text("customer_salutation", header.salutation.as_str());
    context.insert_text("customer_name", header.customer_name.as_str());
    context.insert_text("customer_adress", header.customer_address.as_str());
    context.insert_text("customer_postcode", header.customer_postcode.as_str());
    context.insert_rows(
        "invoice_items",
        ledger.items().iter().map(item_row).collect(),
    );
    context.insert_text("sum_items", format_decimal_comma(totals.subtotal));
    context.insert_text("tax", format_decimal_comma(totals.tax));
    context.insert_text("total", format_decimal_comma(totals.total));

    context
}

fn item_row(item: &LineItem) -> Row {
    Row::from([
        ("Position".to_string(), item.position().to_string()),
        ("Menge".to_string(), format_decimal_comma(item.quantity())),
        ("Einheit".to_string(), item.unit().to_string()),
        ("Beschreibung".to_string(), item.description().to_string()),
        ("Einzelpreis".to_string(), format_decimal_comma(item.unit_price())),
        ("Gesamtpreis".to_string(), format_decimal_comma(item.line_total())),
    ])
}

/// File name offered for download, e.g. `rechnung_2024-17_2024-03-01.docx`.
pub fn document_file_name(header: &InvoiceHeader) -> String {
    let number: String = header
        .number
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("rechnung_{}_{}.docx", number, header.date.format("%Y-%m-%d"))
}

/// Service for rendering the invoice document from the configured template
pub struct InvoiceGenerator {
    template: Option<String>,
    output_dir: PathBuf,
}

impl InvoiceGenerator {
    pub fn new(template: Option<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fetch the template, bind the invoice into it and write the result.
    ///
    /// Returns the path of the written document. Nothing is fetched when no
    /// template is configured.
    pub async fn generate(&self, header: &InvoiceHeader, ledger: &InvoiceLedger) -> Result<PathBuf> {
        let source = TemplateSource::parse(self.template.as_deref())?;
        if ledger.is_empty() {
            warn!("rendering an invoice without line items");
        }

        info!(%source, "fetching invoice template");
        let template = source.fetch().await?;

        let context = build_context(header, ledger);
        let document = render_docx(&template, &context)?;

        let path = self.output_dir.join(document_file_name(header));
        let output_error = |source: std::io::Error| InvoiceError::Output {
            path: path.display().to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(output_error)?;
        tokio::fs::write(&path, document)
            .await
            .map_err(output_error)?;

        info!(path = %path.display(), items = ledger.len(), "invoice document written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{LineItemDraft, Salutation};

    fn header() -> InvoiceHeader {
        let mut header = InvoiceHeader::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        header.number = "2024-17".to_string();
        header.salutation = Salutation::Frau;
        header.customer_address = "Hauptstraße 5".to_string();
        header
    }

    #[test]
    fn test_parse_template_source() {
        assert_eq!(
            TemplateSource::parse(Some("https://example.com/t.docx")).unwrap(),
            TemplateSource::Url("https://example.com/t.docx".to_string())
        );
        assert_eq!(
            TemplateSource::parse(Some(" templates/rechnung.docx ")).unwrap(),
            TemplateSource::Path(PathBuf::from("templates/rechnung.docx"))
        );
    }

    #[test]
    fn test_missing_template_is_configuration_error() {
        for value in [None, Some(""), Some("   ")] {
            assert!(matches!(
                TemplateSource::parse(value),
                Err(InvoiceError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_context_formats_with_decimal_comma() {
        let mut ledger = InvoiceLedger::new();
        ledger
            .add(LineItemDraft::new(dec!(2), "Stk", "Widget", dec!(10)))
            .unwrap();
        ledger
            .add(LineItemDraft::new(dec!(1.5), "Std", "Labor", dec!(50)))
            .unwrap();

        let context = build_context(&header(), &ledger);
        assert_eq!(context.text("invoice_date"), Some("2024-03-01"));
        assert_eq!(context.text("customer_salutation"), Some("Frau"));
        assert_eq!(context.text("customer_adress"), Some("Hauptstraße 5"));
        assert_eq!(context.text("sum_items"), Some("95,00"));
        assert_eq!(context.text("tax"), Some("18,05"));
        assert_eq!(context.text("total"), Some("113,05"));

        let rows = context.rows("invoice_items").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Position"], "002");
        assert_eq!(rows[1]["Menge"], "1,50");
        assert_eq!(rows[1]["Einzelpreis"], "50,00");
        assert_eq!(rows[1]["Gesamtpreis"], "75,00");
    }

    #[test]
    fn test_document_file_name() {
        assert_eq!(document_file_name(&header()), "rechnung_2024-17_2024-03-01.docx");

        let mut odd = header();
        odd.number = "A/12 b".to_string();
        assert_eq!(document_file_name(&odd), "rechnung_A_12_b_2024-03-01.docx");
    }

    #[tokio::test]
    async fn test_generate_without_template_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let generator = InvoiceGenerator::new(None, &out);

        let result = generator.generate(&header(), &InvoiceLedger::new()).await;
        assert!(matches!(result, Err(InvoiceError::Configuration(_))));
        assert!(!out.exists());
    }
}
