use std::path::Path;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, warn};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::error::InvoiceError;
use crate::format::{format_decimal_comma, format_decimal_input, parse_decimal};
use crate::ledger::{Direction, InvoiceLedger, LedgerChange};
use crate::models::{InvoiceHeader, LineItem, LineItemDraft, LineItemPatch};
use crate::ui::components::date_input::DateInputState;

// Fields of the form in navigation order
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FormField {
    Number,
    Date,
    Subject,
    Reference,
    Salutation,
    CustomerName,
    CustomerAddress,
    CustomerPostcode,
    Quantity,
    Unit,
    Description,
    UnitPrice,
    Items,
}

impl FormField {
    const ORDER: [FormField; 13] = [
        FormField::Number,
        FormField::Date,
        FormField::Subject,
        FormField::Reference,
        FormField::Salutation,
        FormField::CustomerName,
        FormField::CustomerAddress,
        FormField::CustomerPostcode,
        FormField::Quantity,
        FormField::Unit,
        FormField::Description,
        FormField::UnitPrice,
        FormField::Items,
    ];

    fn label(self) -> &'static str {
        match self {
            FormField::Number => "Invoice no.",
            FormField::Date => "Date",
            FormField::Subject => "Subject",
            FormField::Reference => "BV",
            FormField::Salutation => "Salutation",
            FormField::CustomerName => "Name",
            FormField::CustomerAddress => "Street",
            FormField::CustomerPostcode => "Postcode/City",
            FormField::Quantity => "Quantity",
            FormField::Unit => "Unit",
            FormField::Description => "Description",
            FormField::UnitPrice => "Unit price",
            FormField::Items => "Items",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, FormField::Quantity | FormField::UnitPrice)
    }

    fn step(self, offset: isize) -> Self {
        let len = Self::ORDER.len() as isize;
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0) as isize;
        Self::ORDER[(index + offset).rem_euclid(len) as usize]
    }
}

/// Text typed into the line item fields before it enters the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemEntry {
    pub quantity: String,
    pub unit: String,
    pub description: String,
    pub unit_price: String,
}

impl LineItemEntry {
    fn from_item(item: &LineItem) -> Self {
        Self {
            quantity: format_decimal_input(item.quantity()),
            unit: item.unit().to_string(),
            description: item.description().to_string(),
            unit_price: format_decimal_input(item.unit_price()),
        }
    }

    fn to_draft(&self) -> Result<LineItemDraft, InvoiceError> {
        Ok(LineItemDraft {
            quantity: number_field(&self.quantity, "quantity")?,
            unit: Some(self.unit.clone()),
            description: Some(self.description.clone()),
            unit_price: number_field(&self.unit_price, "unit price")?,
        })
    }

    /// Patch holding only the fields that differ from `item`.
    fn to_patch(&self, item: &LineItem) -> Result<LineItemPatch, InvoiceError> {
        let draft = self.to_draft()?;
        let quantity = draft
            .quantity
            .ok_or_else(|| InvoiceError::Validation("quantity".to_string()))?;
        let unit_price = draft
            .unit_price
            .ok_or_else(|| InvoiceError::Validation("unit price".to_string()))?;
        Ok(LineItemPatch {
            quantity: (quantity != item.quantity()).then_some(quantity),
            unit: draft.unit.filter(|unit| unit.trim() != item.unit()),
            description: draft
                .description
                .filter(|description| description.trim() != item.description()),
            unit_price: (unit_price != item.unit_price()).then_some(unit_price),
        })
    }
}

// Blank is "not provided"; anything else has to parse.
fn number_field(text: &str, name: &str) -> Result<Option<rust_decimal::Decimal>, InvoiceError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_decimal(text)
        .map(Some)
        .ok_or_else(|| InvoiceError::Validation(format!("{name} is not a number")))
}

pub enum InvoiceFormAction {
    Quit,
    Generate,
}

/// Everything one session of the form owns.
pub struct InvoiceFormState {
    header: InvoiceHeader,
    ledger: InvoiceLedger,
    entry: LineItemEntry,
    editing_item: Option<usize>,
    current_field: FormField,
    editing: bool,
    date_state: DateInputState,
    items_list_state: ListState,
    show_error: Option<(String, String)>,
    status: Option<String>,
}

impl InvoiceFormState {
    pub fn new(header: InvoiceHeader) -> Self {
        let date_state = DateInputState::new(header.date);
        Self {
            header,
            ledger: InvoiceLedger::new(),
            entry: LineItemEntry::default(),
            editing_item: None,
            current_field: FormField::Number,
            editing: false,
            date_state,
            items_list_state: ListState::default(),
            show_error: None,
            status: None,
        }
    }

    pub fn header(&self) -> &InvoiceHeader {
        &self.header
    }

    pub fn ledger(&self) -> &InvoiceLedger {
        &self.ledger
    }

    pub fn entry(&self) -> &LineItemEntry {
        &self.entry
    }

    pub fn current_field(&self) -> FormField {
        self.current_field
    }

    pub fn selected_item(&self) -> Option<usize> {
        self.items_list_state.selected()
    }

    pub fn error(&self) -> Option<&(String, String)> {
        self.show_error.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn report_error(&mut self, err: &InvoiceError) {
        warn!(error = %err, "action failed");
        self.show_error = Some((err.title().to_string(), err.to_string()));
    }

    pub fn report_generated(&mut self, path: &Path) {
        self.status = Some(format!("Invoice written to {}", path.display()));
    }

    /// Start a new invoice: empty ledger, empty header dated today.
    pub fn new_invoice(&mut self) {
        let change = self.ledger.reset();
        self.apply_change(change);
        self.header = InvoiceHeader::default();
        self.date_state = DateInputState::new(self.header.date);
        self.entry = LineItemEntry::default();
        self.editing_item = None;
        self.editing = false;
        self.current_field = FormField::Number;
        self.status = Some("New invoice".to_string());
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        self.date_state
            .set_editing(self.editing && self.current_field == FormField::Date);
        if !self.editing {
            self.header.date = self.date_state.date;
        } else if self.current_field == FormField::Items
            && self.items_list_state.selected().is_none()
            && !self.ledger.is_empty()
        {
            self.items_list_state.select(Some(0));
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = self.current_field.step(1);
    }

    pub fn previous_field(&mut self) {
        self.current_field = self.current_field.step(-1);
    }

    /// Add the entry as a new line item, or save it over the item being edited.
    pub fn submit_entry(&mut self) {
        let result = match self.editing_item {
            Some(index) => self
                .ledger
                .get(index)
                .ok_or_else(|| InvoiceError::Index {
                    index,
                    len: self.ledger.len(),
                })
                .and_then(|item| self.entry.to_patch(item))
                .and_then(|patch| self.ledger.edit(index, patch))
                .map(Some),
            None => self.entry.to_draft().and_then(|draft| {
                let item = self.ledger.add(draft)?;
                debug!(position = %item.position(), "position added from form");
                Ok(None)
            }),
        };

        match result {
            Ok(change) => {
                match change {
                    Some(change) => self.apply_change(change),
                    None => self.items_list_state.select(Some(self.ledger.len() - 1)),
                }
                self.entry = LineItemEntry::default();
                self.editing_item = None;
                self.current_field = FormField::Quantity;
            }
            Err(err) => self.report_error(&err),
        }
    }

    /// Load the selected item into the entry fields for editing.
    pub fn edit_selected(&mut self) {
        if let Some(item) = self.selected_item().and_then(|i| self.ledger.get(i)) {
            self.entry = LineItemEntry::from_item(item);
            self.editing_item = self.selected_item();
            self.editing = false;
            self.current_field = FormField::Quantity;
        }
    }

    pub fn cancel_item_edit(&mut self) {
        self.entry = LineItemEntry::default();
        self.editing_item = None;
    }

    pub fn delete_selected(&mut self) {
        let Some(index) = self.selected_item() else {
            return;
        };
        match self.ledger.delete(index) {
            Ok(change) => {
                if let Some(editing) = self.editing_item {
                    if editing == index {
                        self.cancel_item_edit();
                    } else if editing > index {
                        self.editing_item = Some(editing - 1);
                    }
                }
                self.apply_change(change);
            }
            Err(err) => self.report_error(&err),
        }
    }

    pub fn move_selected(&mut self, direction: Direction) {
        let Some(index) = self.selected_item() else {
            return;
        };
        match self.ledger.move_item(index, direction) {
            Ok(change) => {
                if let LedgerChange::Moved { from, to } = change {
                    self.editing_item = self.editing_item.map(|e| match e {
                        e if e == from => to,
                        e if e == to => from,
                        e => e,
                    });
                }
                self.apply_change(change);
            }
            Err(err) => self.report_error(&err),
        }
    }

    fn select_relative(&mut self, forward: bool) {
        let len = self.ledger.len();
        if len == 0 {
            return;
        }
        let next = match self.items_list_state.selected() {
            Some(i) if forward => (i + 1) % len,
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.items_list_state.select(Some(next));
    }

    fn apply_change(&mut self, change: LedgerChange) {
        match change {
            LedgerChange::Edited(index) => self.items_list_state.select(Some(index)),
            LedgerChange::Moved { to, .. } => self.items_list_state.select(Some(to)),
            LedgerChange::Removed(index) => {
                let len = self.ledger.len();
                self.items_list_state
                    .select(if len == 0 { None } else { Some(index.min(len - 1)) });
            }
            LedgerChange::Cleared => self.items_list_state.select(None),
            LedgerChange::Unchanged => {}
        }
    }

    fn text_field_mut(&mut self) -> Option<&mut String> {
        match self.current_field {
            FormField::Number => Some(&mut self.header.number),
            FormField::Subject => Some(&mut self.header.subject),
            FormField::Reference => Some(&mut self.header.reference),
            FormField::CustomerName => Some(&mut self.header.customer_name),
            FormField::CustomerAddress => Some(&mut self.header.customer_address),
            FormField::CustomerPostcode => Some(&mut self.header.customer_postcode),
            FormField::Quantity => Some(&mut self.entry.quantity),
            FormField::Unit => Some(&mut self.entry.unit),
            FormField::Description => Some(&mut self.entry.description),
            FormField::UnitPrice => Some(&mut self.entry.unit_price),
            FormField::Date | FormField::Salutation | FormField::Items => None,
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            FormField::Date => {
                self.date_state.handle_input(key);
                self.header.date = self.date_state.date;
            }
            FormField::Salutation => match key {
                KeyCode::Right | KeyCode::Char(' ') => {
                    self.header.salutation = self.header.salutation.next()
                }
                KeyCode::Left => self.header.salutation = self.header.salutation.previous(),
                _ => {}
            },
            FormField::Items => {}
            field => {
                let numeric = field.is_numeric();
                if let Some(value) = self.text_field_mut() {
                    match key {
                        KeyCode::Char(c)
                            if !numeric || c.is_ascii_digit() || matches!(c, ',' | '.' | '-') =>
                        {
                            value.push(c);
                        }
                        KeyCode::Backspace => {
                            value.pop();
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn field_value(&self, field: FormField) -> String {
        let editing = self.editing && self.current_field == field;
        let cursor = if editing { "|" } else { "" };
        match field {
            FormField::Number => format!("{}{}", self.header.number, cursor),
            FormField::Date if !self.date_state.is_valid() => {
                format!("{} (no such date)", self.date_state.display())
            }
            FormField::Date => self.date_state.display(),
            FormField::Subject => format!("{}{}", self.header.subject, cursor),
            FormField::Reference => format!("{}{}", self.header.reference, cursor),
            FormField::Salutation if editing => format!("< {} >", self.header.salutation),
            FormField::Salutation => self.header.salutation.to_string(),
            FormField::CustomerName => format!("{}{}", self.header.customer_name, cursor),
            FormField::CustomerAddress => format!("{}{}", self.header.customer_address, cursor),
            FormField::CustomerPostcode => format!("{}{}", self.header.customer_postcode, cursor),
            FormField::Quantity => format!("{}{}", self.entry.quantity, cursor),
            FormField::Unit => format!("{}{}", self.entry.unit, cursor),
            FormField::Description => format!("{}{}", self.entry.description, cursor),
            FormField::UnitPrice => format!("{}{}", self.entry.unit_price, cursor),
            FormField::Items => String::new(),
        }
    }
}

pub fn render_invoice_form<B: Backend>(frame: &mut Frame<B>, state: &mut InvoiceFormState) {
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3), // Title
                Constraint::Min(12),   // Form
                Constraint::Length(3), // Help
            ]
            .as_ref(),
        )
        .split(frame.size());

    let title_text = match state.status() {
        Some(status) => format!("Create invoice - {status}"),
        None => "Create invoice".to_string(),
    };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    let columns = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(chunks[1]);

    let left = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(6)].as_ref())
        .split(columns[0]);

    render_fields(frame, state, &FormField::ORDER[..8], "Invoice", left[0]);
    let entry_title = match state.editing_item {
        Some(index) => format!("Edit position {:03}", index + 1),
        None => "New position".to_string(),
    };
    render_fields(frame, state, &FormField::ORDER[8..12], &entry_title, left[1]);

    let right = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(5)].as_ref())
        .split(columns[1]);

    render_items(frame, state, right[0]);
    render_totals(frame, state, right[1]);

    let help_text = match (state.editing, state.current_field) {
        (false, _) => {
            "Enter - Edit | Up/Down - Navigate | A - Add/save position | C - Clear position | G - Generate | N - New invoice | Q - Quit"
        }
        (true, FormField::Date) => "Digits - Type DD MM YYYY | Left/Right - Switch part | Enter/Esc - Done",
        (true, FormField::Salutation) => "Left/Right - Change | Enter/Esc - Done",
        (true, FormField::Items) => {
            "Up/Down - Select | Shift+Up/Down - Move | E - Edit | D - Delete | Enter/Esc - Done"
        }
        (true, _) => "Type to edit | Enter/Esc - Done",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[2]);

    if let Some((title, message)) = &state.show_error {
        let size = frame.size();
        render_error(frame, size, title, message);
    }
}

fn render_fields<B: Backend>(
    frame: &mut Frame<B>,
    state: &InvoiceFormState,
    fields: &[FormField],
    title: &str,
    area: Rect,
) {
    let lines: Vec<Spans> = fields
        .iter()
        .map(|field| {
            let style = if state.current_field == *field {
                let style = Style::default().fg(Color::Yellow);
                if state.editing {
                    style.add_modifier(Modifier::BOLD)
                } else {
                    style
                }
            } else {
                Style::default()
            };
            Spans::from(vec![
                Span::styled(format!("{:<14}", format!("{}:", field.label())), style),
                Span::raw(state.field_value(*field)),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_items<B: Backend>(frame: &mut Frame<B>, state: &mut InvoiceFormState, area: Rect) {
    let focused = state.current_field == FormField::Items;
    let block = Block::default()
        .title(if focused { "Items (selected)" } else { "Items" })
        .borders(Borders::ALL)
        .style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });

    if state.ledger.is_empty() {
        let empty = Paragraph::new("No positions added yet").block(block);
        frame.render_widget(empty, area);
        return;
    }

    let last_moved = state.ledger.last_moved();
    let items: Vec<ListItem> = state
        .ledger
        .items()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let text = format!(
                "{}  {} {}  {}  à {}  = {} €",
                item.position(),
                format_decimal_comma(item.quantity()),
                item.unit(),
                item.description(),
                format_decimal_comma(item.unit_price()),
                format_decimal_comma(item.line_total()),
            );
            let style = if last_moved == Some(index) {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(
        if focused && state.editing {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else {
            Style::default().add_modifier(Modifier::REVERSED)
        },
    );

    frame.render_stateful_widget(list, area, &mut state.items_list_state);
}

fn render_totals<B: Backend>(frame: &mut Frame<B>, state: &InvoiceFormState, area: Rect) {
    let totals = state.ledger.totals();
    let lines = vec![
        Spans::from(format!("Net:      {:>12} €", format_decimal_comma(totals.subtotal))),
        Spans::from(format!("VAT 19%:  {:>12} €", format_decimal_comma(totals.tax))),
        Spans::from(Span::styled(
            format!("Total:    {:>12} €", format_decimal_comma(totals.total)),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title("Overview").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_error<B: Backend>(frame: &mut Frame<B>, size: Rect, title: &str, message: &str) {
    let popup_area = centered_rect(60, 25, size);

    let error_msg = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(message.to_string()),
        Spans::from(""),
        Spans::from("Press any key to continue"),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().title(title.to_string()).borders(Borders::ALL))
    .style(Style::default().fg(Color::Red));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(error_msg, popup_area);
}

// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub fn handle_input(state: &mut InvoiceFormState) -> Result<Option<InvoiceFormAction>> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Release {
            return Ok(None);
        }
        return Ok(handle_key(state, key));
    }

    Ok(None)
}

pub fn handle_key(state: &mut InvoiceFormState, key: KeyEvent) -> Option<InvoiceFormAction> {
    // Any key dismisses the error popup
    if state.show_error.take().is_some() {
        return None;
    }

    if state.editing {
        handle_editing_key(state, key);
        return None;
    }

    match key.code {
        KeyCode::Char('q') => return Some(InvoiceFormAction::Quit),
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up => state.previous_field(),
        KeyCode::Down | KeyCode::Tab => state.next_field(),
        KeyCode::BackTab => state.previous_field(),
        KeyCode::Char('a') => state.submit_entry(),
        KeyCode::Char('c') | KeyCode::Esc => state.cancel_item_edit(),
        KeyCode::Char('g') => {
            state.status = None;
            return Some(InvoiceFormAction::Generate);
        }
        KeyCode::Char('n') => state.new_invoice(),
        _ => {}
    }

    None
}

fn handle_editing_key(state: &mut InvoiceFormState, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Esc => state.toggle_editing(),
        KeyCode::Tab if state.current_field != FormField::Items => {
            state.toggle_editing();
            state.next_field();
        }
        _ if state.current_field == FormField::Items => {
            let shift = key.modifiers.contains(KeyModifiers::SHIFT);
            match key.code {
                KeyCode::Up if shift => state.move_selected(Direction::Up),
                KeyCode::Down if shift => state.move_selected(Direction::Down),
                KeyCode::Char('K') => state.move_selected(Direction::Up),
                KeyCode::Char('J') => state.move_selected(Direction::Down),
                KeyCode::Up => state.select_relative(false),
                KeyCode::Down => state.select_relative(true),
                KeyCode::Char('e') => state.edit_selected(),
                KeyCode::Char('d') | KeyCode::Delete => state.delete_selected(),
                _ => {}
            }
        }
        code => state.edit_current_field(code),
    }
}
