mod common;

use anyhow::Result;
use common::{document, read_part, sample_header, sample_ledger, write_template};
use invoice_form::InvoiceError;
use invoice_form::invoice_gen::{InvoiceGenerator, TemplateSource};
use tempfile::TempDir;

const ITEM_TABLE: &str = concat!(
    "<w:tbl>",
    "<w:tr><w:tc><w:p><w:r><w:t>Pos</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Gesamt</w:t></w:r></w:p></w:tc></w:tr>",
    "<w:tr><w:tc><w:p><w:r><w:t>{%tr for item in invoice_items %}</w:t></w:r></w:p></w:tc></w:tr>",
    "<w:tr><w:tc><w:p><w:r><w:t>{{ item.Position }}</w:t></w:r></w:p></w:tc>",
    "<w:tc><w:p><w:r><w:t>{{ item.Menge }} {{ item.Einheit }} {{ item.Beschreibung }} à {{ item.Einzelpreis }} = {{ item.Gesamtpreis }}</w:t></w:r></w:p></w:tc></w:tr>",
    "<w:tr><w:tc><w:p><w:r><w:t>{%tr endfor %}</w:t></w:r></w:p></w:tc></w:tr>",
    "</w:tbl>"
);

fn template_body() -> String {
    document(&format!(
        concat!(
            "<w:p><w:r><w:t>Rechnung {{{{ invoice_number }}}} vom {{{{ invoice_date }}}}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>{{{{ customer_salutation }}}} {{{{ customer_name }}}}, {{{{ customer_adress }}}}, {{{{ customer_postcode }}}}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>{{{{ invoice_subject }}}} / {{{{ invoice_bv }}}}</w:t></w:r></w:p>",
            "{table}",
            "<w:p><w:r><w:t>Netto {{{{ sum_items }}}} MwSt {{{{ tax }}}} Gesamt {{{{ total }}}}</w:t></w:r></w:p>"
        ),
        table = ITEM_TABLE
    ))
}

async fn generate(dir: &TempDir, template: Option<String>) -> Result<std::path::PathBuf, InvoiceError> {
    let generator = InvoiceGenerator::new(template, dir.path().join("out"));
    let ledger = sample_ledger().expect("sample ledger");
    generator.generate(&sample_header(), &ledger).await
}

#[tokio::test]
async fn test_generate_from_local_template() -> Result<()> {
    let dir = TempDir::new()?;
    let body = template_body();
    let header_xml = "<w:hdr><w:p><w:r><w:t>Nr. {{ invoice_number }}</w:t></w:r></w:p></w:hdr>";
    let styles = "<w:styles>{{ not_a_placeholder_here }}</w:styles>";
    let template = write_template(
        dir.path(),
        &[
            ("word/document.xml", body.as_str()),
            ("word/header1.xml", header_xml),
            ("word/styles.xml", styles),
        ],
    )?;

    let path = generate(&dir, Some(template.display().to_string())).await?;
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("rechnung_2024-17_2024-03-01.docx")
    );

    let output = std::fs::read(&path)?;
    let xml = read_part(&output, "word/document.xml")?;
    assert!(xml.contains("Rechnung 2024-17 vom 2024-03-01"));
    assert!(xml.contains("Herr Max Mustermann, Lindenweg 3, 12345 Musterstadt"));
    assert!(xml.contains("Renovierung Bad / BV Lindenweg"));
    assert!(xml.contains("2,00 Stk Widget à 10,00 = 20,00"));
    assert!(xml.contains("1,00 Std Labor à 50,00 = 50,00"));
    assert!(xml.contains("<w:t>001</w:t>"));
    assert!(xml.contains("<w:t>002</w:t>"));
    assert!(xml.contains("Netto 70,00 MwSt 13,30 Gesamt 83,30"));
    assert!(!xml.contains("{%"));
    assert!(!xml.contains("{{"));

    assert_eq!(read_part(&output, "word/header1.xml")?, "<w:hdr><w:p><w:r><w:t>Nr. 2024-17</w:t></w:r></w:p></w:hdr>");
    // parts that are not templated are copied as they are
    assert_eq!(read_part(&output, "word/styles.xml")?, styles);
    Ok(())
}

#[tokio::test]
async fn test_missing_template_file_is_fetch_error() -> Result<()> {
    let dir = TempDir::new()?;
    let missing = dir.path().join("nope.docx").display().to_string();

    let result = generate(&dir, Some(missing)).await;
    assert!(matches!(result, Err(InvoiceError::Fetch { .. })));
    assert!(!dir.path().join("out").exists());
    Ok(())
}

#[tokio::test]
async fn test_unconfigured_template_is_configuration_error() -> Result<()> {
    let dir = TempDir::new()?;
    let result = generate(&dir, Some("  ".to_string())).await;
    assert!(matches!(result, Err(InvoiceError::Configuration(_))));
    Ok(())
}

#[tokio::test]
async fn test_broken_templates_are_render_errors() -> Result<()> {
    let dir = TempDir::new()?;

    let not_a_zip = dir.path().join("plain.docx");
    std::fs::write(&not_a_zip, b"definitely not a zip archive")?;
    let result = generate(&dir, Some(not_a_zip.display().to_string())).await;
    assert!(matches!(result, Err(InvoiceError::Render(_))));

    let unknown_key = document("<w:p><w:r><w:t>{{ iban }}</w:t></w:r></w:p>");
    let template = write_template(dir.path(), &[("word/document.xml", unknown_key.as_str())])?;
    let result = generate(&dir, Some(template.display().to_string())).await;
    match result {
        Err(InvoiceError::Render(reason)) => assert!(reason.contains("iban")),
        other => panic!("expected render error, got {other:?}"),
    }

    let no_document = write_template(dir.path(), &[("word/styles.xml", "<w:styles/>")])?;
    let result = generate(&dir, Some(no_document.display().to_string())).await;
    assert!(matches!(result, Err(InvoiceError::Render(_))));
    Ok(())
}

#[test]
fn test_template_source_kinds() {
    assert!(matches!(
        TemplateSource::parse(Some("HTTPS://example.com/vorlage.docx")),
        Ok(TemplateSource::Url(_))
    ));
    assert!(matches!(
        TemplateSource::parse(Some("./vorlage.docx")),
        Ok(TemplateSource::Path(_))
    ));
}
