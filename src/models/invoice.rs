use std::fmt;

use chrono::{Local, NaiveDate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Salutation {
    #[default]
    Herr,
    Frau,
    Firma,
}

impl Salutation {
    pub const ALL: [Salutation; 3] = [Salutation::Herr, Salutation::Frau, Salutation::Firma];

    pub fn as_str(self) -> &'static str {
        match self {
            Salutation::Herr => "Herr",
            Salutation::Frau => "Frau",
            Salutation::Firma => "Firma",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Salutation::Herr => Salutation::Frau,
            Salutation::Frau => Salutation::Firma,
            Salutation::Firma => Salutation::Herr,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Salutation::Herr => Salutation::Firma,
            Salutation::Frau => Salutation::Herr,
            Salutation::Firma => Salutation::Frau,
        }
    }
}

impl fmt::Display for Salutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoice header fields entered in the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceHeader {
    pub number: String,
    pub date: NaiveDate,
    pub subject: String,
    /// Building project reference ("BV").
    pub reference: String,
    pub salutation: Salutation,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_postcode: String,
}

impl InvoiceHeader {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            number: String::new(),
            date,
            subject: String::new(),
            reference: String::new(),
            salutation: Salutation::default(),
            customer_name: String::new(),
            customer_address: String::new(),
            customer_postcode: String::new(),
        }
    }
}

impl Default for InvoiceHeader {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}
