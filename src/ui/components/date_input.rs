use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DatePart {
    Day,
    Month,
    Year,
}

impl DatePart {
    fn width(self) -> usize {
        match self {
            DatePart::Day | DatePart::Month => 2,
            DatePart::Year => 4,
        }
    }
}

/// Date field edited part by part, shown as `DD.MM.YYYY`.
///
/// Typed digits are buffered until the part is complete. Completed parts are
/// kept even when they do not form a date with the other parts yet (31 typed
/// while the month is still February); `date` follows as soon as day, month
/// and year are valid together. Leaving edit mode drops an impossible
/// combination.
pub struct DateInputState {
    pub date: NaiveDate,
    pub editing: bool,
    pub part: DatePart,
    buffer: String,
    day: u32,
    month: u32,
    year: i32,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            part: DatePart::Day,
            buffer: String::new(),
            day: date.day(),
            month: date.month(),
            year: date.year(),
        }
    }

    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
        self.part = DatePart::Day;
        self.buffer.clear();
        self.day = self.date.day();
        self.month = self.date.month();
        self.year = self.date.year();
    }

    /// Whether the parts typed so far form a real date.
    pub fn is_valid(&self) -> bool {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).is_some()
    }

    pub fn next_part(&mut self) {
        self.part = match self.part {
            DatePart::Day => DatePart::Month,
            DatePart::Month => DatePart::Year,
            DatePart::Year => DatePart::Day,
        };
        self.buffer.clear();
    }

    pub fn previous_part(&mut self) {
        self.part = match self.part {
            DatePart::Day => DatePart::Year,
            DatePart::Month => DatePart::Day,
            DatePart::Year => DatePart::Month,
        };
        self.buffer.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.buffer.push(c);
                if self.buffer.len() == self.part.width() {
                    self.commit_part();
                    self.next_part();
                }
            }
            KeyCode::Backspace => {
                self.buffer.pop();
            }
            KeyCode::Right | KeyCode::Char('.') => self.next_part(),
            KeyCode::Left => self.previous_part(),
            _ => {}
        }
    }

    fn commit_part(&mut self) {
        let Ok(value) = self.buffer.parse::<u32>() else {
            return;
        };

        match self.part {
            DatePart::Day if (1..=31).contains(&value) => self.day = value,
            DatePart::Month if (1..=12).contains(&value) => self.month = value,
            DatePart::Year if (1900..=2100).contains(&value) => self.year = value as i32,
            _ => return,
        }

        if let Some(date) = NaiveDate::from_ymd_opt(self.year, self.month, self.day) {
            self.date = date;
        }
    }

    pub fn display(&self) -> String {
        let day = format!("{:02}", self.day);
        let month = format!("{:02}", self.month);
        let year = format!("{:04}", self.year);

        if !self.editing {
            return format!("{day}.{month}.{year}");
        }

        let cursor = |part: DatePart, value: String| {
            if part != self.part {
                value
            } else if self.buffer.is_empty() {
                format!("[{value}]")
            } else {
                format!("[{}]", self.buffer)
            }
        };

        format!(
            "{}.{}.{}",
            cursor(DatePart::Day, day),
            cursor(DatePart::Month, month),
            cursor(DatePart::Year, year)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn type_digits(state: &mut DateInputState, digits: &str) {
        for c in digits.chars() {
            state.handle_input(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typing_full_date() {
        let mut state = DateInputState::new(date(2024, 1, 15));
        state.set_editing(true);
        type_digits(&mut state, "03112025");
        assert_eq!(state.date, date(2025, 11, 3));
    }

    #[test]
    fn test_day_waits_for_month() {
        let mut state = DateInputState::new(date(2024, 2, 10));
        state.set_editing(true);
        type_digits(&mut state, "31");
        assert_eq!(state.date, date(2024, 2, 10));
        assert!(!state.is_valid());
        assert_eq!(state.part, DatePart::Month);
        assert_eq!(state.display(), "31.[02].2024");

        type_digits(&mut state, "032024");
        assert_eq!(state.date, date(2024, 3, 31));
        assert!(state.is_valid());
    }

    #[test]
    fn test_leap_day_waits_for_year() {
        let mut state = DateInputState::new(date(2023, 1, 5));
        state.set_editing(true);
        type_digits(&mut state, "2902");
        assert_eq!(state.date, date(2023, 1, 5));

        type_digits(&mut state, "2024");
        assert_eq!(state.date, date(2024, 2, 29));
    }

    #[test]
    fn test_impossible_date_is_dropped_when_editing_ends() {
        let mut state = DateInputState::new(date(2024, 4, 10));
        state.set_editing(true);
        type_digits(&mut state, "31");
        assert_eq!(state.date, date(2024, 4, 10));

        state.set_editing(false);
        assert_eq!(state.display(), "10.04.2024");
    }

    #[test]
    fn test_out_of_range_parts_are_ignored() {
        let mut state = DateInputState::new(date(2024, 4, 10));
        state.set_editing(true);
        type_digits(&mut state, "4513");
        assert_eq!(state.date, date(2024, 4, 10));
        assert_eq!(state.display(), "10.04.[2024]");
    }

    #[test]
    fn test_ignores_input_when_not_editing() {
        let mut state = DateInputState::new(date(2024, 2, 10));
        type_digits(&mut state, "01");
        assert_eq!(state.date, date(2024, 2, 10));
    }

    #[test]
    fn test_display_marks_active_part() {
        let mut state = DateInputState::new(date(2024, 3, 1));
        assert_eq!(state.display(), "01.03.2024");

        state.set_editing(true);
        assert_eq!(state.display(), "[01].03.2024");
        state.handle_input(KeyCode::Right);
        state.handle_input(KeyCode::Char('1'));
        assert_eq!(state.display(), "01.[1].2024");
    }
}
