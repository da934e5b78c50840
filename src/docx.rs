//! Binds a [`TemplateContext`] into the placeholders of a `.docx` template.
//!
//! Supported tags:
//!
//! - `{{ key }}` and `{{ item.Key }}` inside a loop
//! - `{% for item in rows %}` ... `{% endfor %}` repeating the text between
//!   the tags
//! - `{%tr for item in rows %}` ... `{%tr endfor %}` repeating the table rows
//!   between the rows holding the tags; `{%p`, `{%tc` and `{%r` do the same
//!   for paragraphs, table cells and runs
//!
//! Word processors often split a tag over several runs, so markup inside a
//! tag is removed before binding. Loops do not nest.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use quick_xml::escape::escape;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{InvoiceError, Result};

pub const DOCUMENT_PART: &str = "word/document.xml";

pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Rows(Vec<Row>),
}

/// Flat mapping of template keys to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    values: BTreeMap<String, Value>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), Value::Text(value.into()));
    }

    pub fn insert_rows(&mut self, key: impl Into<String>, rows: Vec<Row>) {
        self.values.insert(key.into(), Value::Rows(rows));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(Value::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn rows(&self, key: &str) -> Option<&[Row]> {
        match self.values.get(key) {
            Some(Value::Rows(rows)) => Some(rows.as_slice()),
            _ => None,
        }
    }
}

/// Render every templated part of a docx archive and return the new archive.
pub fn render_docx(template: &[u8], context: &TemplateContext) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut rendered_document = false;

    for index in 0..archive.len() {
        let name = archive.by_index_raw(index)?.name().to_string();

        if !is_templated_part(&name) {
            let entry = archive.by_index_raw(index)?;
            writer.raw_copy_file(entry)?;
            continue;
        }

        let mut xml = String::new();
        archive
            .by_index(index)?
            .read_to_string(&mut xml)
            .map_err(|e| InvoiceError::render(format!("cannot read {name}: {e}")))?;

        let rendered = render_xml(&xml, context)
            .map_err(|e| InvoiceError::render(format!("{name}: {}", render_reason(e))))?;
        debug!(part = %name, bytes = rendered.len(), "rendered template part");

        writer.start_file(name.as_str(), SimpleFileOptions::default())?;
        writer
            .write_all(rendered.as_bytes())
            .map_err(|e| InvoiceError::render(format!("cannot write {name}: {e}")))?;

        rendered_document |= name == DOCUMENT_PART;
    }

    if !rendered_document {
        return Err(InvoiceError::render(format!(
            "template has no {DOCUMENT_PART}"
        )));
    }

    Ok(writer.finish()?.into_inner())
}

fn render_reason(err: InvoiceError) -> String {
    match err {
        InvoiceError::Render(reason) => reason,
        other => other.to_string(),
    }
}

fn is_templated_part(name: &str) -> bool {
    name == DOCUMENT_PART
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

/// Render a single WordprocessingML part.
pub fn render_xml(xml: &str, context: &TemplateContext) -> Result<String> {
    let cleaned = clean_tags(xml);
    render_block(&cleaned, &Scope::new(context))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Paragraph,
    Row,
    Cell,
    Run,
}

impl Element {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "p" => Some(Element::Paragraph),
            "tr" => Some(Element::Row),
            "tc" => Some(Element::Cell),
            "r" => Some(Element::Run),
            _ => None,
        }
    }

    fn open(self) -> &'static str {
        match self {
            Element::Paragraph => "<w:p",
            Element::Row => "<w:tr",
            Element::Cell => "<w:tc",
            Element::Run => "<w:r",
        }
    }

    fn close(self) -> &'static str {
        match self {
            Element::Paragraph => "</w:p>",
            Element::Row => "</w:tr>",
            Element::Cell => "</w:tc>",
            Element::Run => "</w:r>",
        }
    }

    /// Start of the innermost element of this kind that contains `offset`.
    fn start_before(self, xml: &str, offset: usize) -> Option<usize> {
        let open = self.open();
        let mut end = offset;
        while let Some(pos) = xml[..end].rfind(open) {
            match xml.as_bytes().get(pos + open.len()) {
                Some(b'>') | Some(b' ') => return Some(pos),
                _ => end = pos,
            }
        }
        None
    }

    /// Offset just past the first closing tag of this kind after `offset`.
    fn end_after(self, xml: &str, offset: usize) -> Option<usize> {
        let close = self.close();
        xml[offset..]
            .find(close)
            .map(|pos| offset + pos + close.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement<'a> {
    For { var: &'a str, collection: &'a str },
    EndFor,
}

#[derive(Debug, Clone, Copy)]
struct Tag<'a> {
    element: Option<Element>,
    statement: Statement<'a>,
    start: usize,
    end: usize,
}

struct Scope<'a> {
    context: &'a TemplateContext,
    row: Option<(&'a str, &'a Row)>,
}

impl<'a> Scope<'a> {
    fn new(context: &'a TemplateContext) -> Self {
        Self { context, row: None }
    }

    fn with_row(&self, var: &'a str, row: &'a Row) -> Self {
        Self {
            context: self.context,
            row: Some((var, row)),
        }
    }

    fn rows(&self, collection: &str) -> Result<&'a [Row]> {
        match self.context.get(collection) {
            Some(Value::Rows(rows)) => Ok(rows.as_slice()),
            Some(Value::Text(_)) => Err(InvoiceError::render(format!(
                "`{collection}` is not a list"
            ))),
            None => Err(InvoiceError::render(format!(
                "unknown list `{collection}`"
            ))),
        }
    }

    fn lookup(&self, expr: &str) -> Result<&'a str> {
        if let Some((var, key)) = expr.split_once('.') {
            let (var, key) = (var.trim(), key.trim());
            return match self.row {
                Some((row_var, row)) if row_var == var => row
                    .get(key)
                    .map(String::as_str)
                    .ok_or_else(|| InvoiceError::render(format!("unknown field `{expr}`"))),
                _ => Err(InvoiceError::render(format!(
                    "`{var}` is not a loop variable here"
                ))),
            };
        }

        match self.context.get(expr) {
            Some(Value::Text(text)) => Ok(text.as_str()),
            Some(Value::Rows(_)) => Err(InvoiceError::render(format!(
                "list `{expr}` used as a value"
            ))),
            None => Err(InvoiceError::render(format!("unknown key `{expr}`"))),
        }
    }
}

fn render_block<'a>(xml: &'a str, scope: &Scope<'a>) -> Result<String> {
    let Some(open) = next_tag(xml, 0)? else {
        return substitute(xml, scope);
    };

    let Statement::For { var, collection } = open.statement else {
        return Err(InvoiceError::render("`endfor` without a matching `for`"));
    };

    let close = next_tag(xml, open.end)?.ok_or_else(|| {
        InvoiceError::render(format!("loop over `{collection}` is never closed"))
    })?;
    if close.statement != Statement::EndFor {
        return Err(InvoiceError::render("nested loops are not supported"));
    }
    if close.element != open.element {
        return Err(InvoiceError::render(format!(
            "loop over `{collection}` opens and closes with different tag kinds"
        )));
    }

    let (outer_start, body_start, body_end, outer_end) = match open.element {
        None => (open.start, open.end, close.start, close.end),
        Some(element) => {
            let missing = || {
                InvoiceError::render(format!(
                    "loop tag for `{collection}` is not inside a {} element",
                    element.open().trim_start_matches('<')
                ))
            };
            let outer_start = element.start_before(xml, open.start).ok_or_else(missing)?;
            let body_start = element.end_after(xml, open.end).ok_or_else(missing)?;
            let body_end = element.start_before(xml, close.start).ok_or_else(missing)?;
            let outer_end = element.end_after(xml, close.end).ok_or_else(missing)?;
            if body_end < body_start {
                return Err(InvoiceError::render(format!(
                    "loop over `{collection}` opens and closes in the same element"
                )));
            }
            (outer_start, body_start, body_end, outer_end)
        }
    };

    let rows = scope.rows(collection)?;
    let body = &xml[body_start..body_end];

    let mut out = substitute(&xml[..outer_start], scope)?;
    for row in rows {
        out.push_str(&render_block(body, &scope.with_row(var, row))?);
    }
    out.push_str(&render_block(&xml[outer_end..], scope)?);

    Ok(out)
}

fn next_tag(xml: &str, from: usize) -> Result<Option<Tag<'_>>> {
    let Some(pos) = xml[from..].find("{%") else {
        return Ok(None);
    };
    let start = from + pos;
    let inner_start = start + 2;
    let inner_len = xml[inner_start..]
        .find("%}")
        .ok_or_else(|| InvoiceError::render("unterminated `{%` tag"))?;
    let inner = &xml[inner_start..inner_start + inner_len];

    let (element, statement) = parse_statement(inner)?;
    Ok(Some(Tag {
        element,
        statement,
        start,
        end: inner_start + inner_len + 2,
    }))
}

fn parse_statement(inner: &str) -> Result<(Option<Element>, Statement<'_>)> {
    let prefix_len = inner
        .find(char::is_whitespace)
        .unwrap_or(inner.len());
    let (element, rest) = match Element::from_prefix(&inner[..prefix_len]) {
        Some(element) => (Some(element), &inner[prefix_len..]),
        None => (None, inner),
    };

    let words: Vec<&str> = rest.split_whitespace().collect();
    match words.as_slice() {
        ["for", var, "in", collection] => Ok((
            element,
            Statement::For {
                var: *var,
                collection: *collection,
            },
        )),
        ["endfor"] => Ok((element, Statement::EndFor)),
        _ => Err(InvoiceError::render(format!(
            "unsupported tag `{{%{inner}%}}`"
        ))),
    }
}

fn substitute(xml: &str, scope: &Scope<'_>) -> Result<String> {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| InvoiceError::render("unterminated `{{` tag"))?;
        let value = scope.lookup(after[..end].trim())?;
        out.push_str(&escape(value));
        rest = &after[end + 2..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Remove markup that a word processor placed inside template tags.
fn clean_tags(xml: &str) -> String {
    let glued = glue_delimiters(xml);
    let mut out = String::with_capacity(glued.len());
    let mut rest = glued.as_str();

    while let Some(start) = find_tag_open(rest) {
        out.push_str(&rest[..start]);
        let tag = &rest[start..];
        let closer = if tag.starts_with("{{") { "}}" } else { "%}" };
        match tag[2..].find(closer) {
            Some(end) => {
                let tag_len = 2 + end + 2;
                out.push_str(&strip_markup(&tag[..tag_len]));
                rest = &tag[tag_len..];
            }
            None => {
                out.push_str(tag);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out
}

fn find_tag_open(xml: &str) -> Option<usize> {
    match (xml.find("{{"), xml.find("{%")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Join delimiter halves separated by markup, e.g. `{</w:t><w:t>{`.
fn glue_delimiters(xml: &str) -> String {
    let bytes = xml.as_bytes();
    let mut out = String::with_capacity(xml.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'{' | b'}' | b'%') {
            let mut j = i + 1;
            while bytes.get(j) == Some(&b'<') {
                match xml[j..].find('>') {
                    Some(end) => j += end + 1,
                    None => break,
                }
            }
            let joins = j > i + 1
                && matches!(
                    (bytes[i], bytes.get(j)),
                    (b'{', Some(b'{')) | (b'{', Some(b'%')) | (b'}', Some(b'}')) | (b'%', Some(b'}'))
                );
            if joins {
                out.push_str(&xml[copied..=i]);
                copied = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&xml[copied..]);

    out
}

fn strip_markup(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut in_markup = false;
    for c in tag.chars() {
        match c {
            '<' => in_markup = true,
            '>' if in_markup => in_markup = false,
            _ if !in_markup => out.push(c),
            _ => {}
        }
    }
    out
}
