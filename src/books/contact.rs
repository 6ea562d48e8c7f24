//! Contact book: people with addresses, emails, birthdays, phone numbers.

use crate::book::{Book, BookSchema, OperationSpec, RecordStore};
use crate::dispatch::Arguments;
use crate::error::DispatchError;
use crate::outcome::Outcome;
use crate::record::Record;
use chrono::{Datelike, Days, Local, NaiveDate};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const BOOK_NAME: &str = "contact";

const FIELDS: &[&str] = &[
    "firstname",
    "lastname",
    "address",
    "email",
    "birthday",
    "phone_number",
];
const MULTI_VALUE_FIELDS: &[&str] = &["phone_number"];
const REQUIRED_FIELDS: &[&str] = &["firstname", "lastname"];
const KEY_FIELDS: &[&str] = &["firstname", "lastname"];

const BIRTHDAY_FORMAT: &str = "%Y-%m-%d";
const MAX_DAYS_AHEAD: u64 = 365;
const MIN_PHONE_DIGITS: usize = 3;
const MAX_PHONE_DIGITS: usize = 15;

const COMING_BIRTHDAYS: &str = "get_coming_birthdays_from_now";
const SEARCH: &str = "search_contacts";

pub struct ContactBook {
    store: RecordStore,
}

impl ContactBook {
    pub fn new() -> Self {
        let schema = BookSchema::new(FIELDS, MULTI_VALUE_FIELDS, REQUIRED_FIELDS, KEY_FIELDS);
        Self {
            store: RecordStore::new(BOOK_NAME, schema),
        }
    }

    /// Contacts whose birthday (month and day) falls within
    /// `today ..= today + days_ahead`.
    pub fn coming_birthdays(&self, today: NaiveDate, days_ahead: u64) -> Vec<Record> {
        let window: BTreeSet<(u32, u32)> = (0..=days_ahead)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .map(|date| (date.month(), date.day()))
            .collect();
        self.store
            .iter()
            .filter(|record| {
                record
                    .field("birthday")
                    .and_then(|raw| NaiveDate::parse_from_str(raw, BIRTHDAY_FORMAT).ok())
                    .is_some_and(|birthday| window.contains(&(birthday.month(), birthday.day())))
            })
            .cloned()
            .collect()
    }
}

impl Default for ContactBook {
    fn default() -> Self {
        Self::new()
    }
}

impl Book for ContactBook {
    fn store(&self) -> &RecordStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    fn normalize(&self, field: &str, value: &str) -> Result<String, DispatchError> {
        match field {
            "email" => normalize_email(value),
            "birthday" => normalize_birthday(value),
            "phone_number" => normalize_phone(value),
            _ => Ok(value.to_string()),
        }
    }

    fn custom_operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::custom(COMING_BIRTHDAYS, &["days_ahead"]),
            OperationSpec::custom(SEARCH, &["query"]),
        ]
    }

    fn run_custom(&mut self, operation: &str, args: &Arguments) -> Result<Outcome, DispatchError> {
        let records = match operation {
            COMING_BIRTHDAYS => {
                let days_ahead = parse_days_ahead(args.get("days_ahead"))?;
                self.coming_birthdays(Local::now().date_naive(), days_ahead)
            }
            SEARCH => {
                let query = args
                    .get("query")
                    .ok_or_else(|| DispatchError::validation("missing search query"))?;
                self.store.search(query)?.into_iter().cloned().collect()
            }
            other => {
                return Err(DispatchError::UnknownCommand {
                    command: other.to_string(),
                    suggestions: Vec::new(),
                });
            }
        };
        Ok(Outcome::Records {
            book: BOOK_NAME.to_string(),
            records,
        })
    }
}

fn parse_days_ahead(raw: Option<&str>) -> Result<u64, DispatchError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(0);
    };
    let days: u64 = raw.parse().map_err(|_| {
        DispatchError::validation(format!("days_ahead must be a whole number, got '{raw}'"))
    })?;
    if days > MAX_DAYS_AHEAD {
        return Err(DispatchError::validation(format!(
            "days_ahead must be at most {MAX_DAYS_AHEAD}, got {days}"
        )));
    }
    Ok(days)
}

fn normalize_email(value: &str) -> Result<String, DispatchError> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let pattern = EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern")
    });
    if pattern.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(DispatchError::validation(format!("invalid email '{value}'")))
    }
}

fn normalize_birthday(value: &str) -> Result<String, DispatchError> {
    NaiveDate::parse_from_str(value, BIRTHDAY_FORMAT)
        .map(|date| date.format(BIRTHDAY_FORMAT).to_string())
        .map_err(|_| {
            DispatchError::validation(format!("invalid birthday '{value}', expected YYYY-MM-DD"))
        })
}

fn normalize_phone(value: &str) -> Result<String, DispatchError> {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    let pattern = PHONE.get_or_init(|| Regex::new(r"^\+?[0-9() .\-]+$").expect("phone pattern"));
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if pattern.is_match(value) && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        Ok(value.to_string())
    } else {
        Err(DispatchError::validation(format!(
            "invalid phone number '{value}'"
        )))
    }
}
