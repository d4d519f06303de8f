//! Inline checks the expense form runs on a single field while the user types.
//!
//! Each [`FieldRule`] is an independent predicate; a field may have several and
//! the first failing one supplies the message shown next to the input.

use std::{fmt, str::FromStr, sync::OnceLock};

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Amount,
    Merchant,
    Date,
    Miles,
    GlAccount,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Amount => "amount",
            FormField::Merchant => "merchant",
            FormField::Date => "date",
            FormField::Miles => "miles",
            FormField::GlAccount => "gl_account",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "amount" => Ok(FormField::Amount),
            "merchant" | "merchantName" | "merchant_name" => Ok(FormField::Merchant),
            "date" => Ok(FormField::Date),
            "miles" => Ok(FormField::Miles),
            "glAccount" | "gl_account" => Ok(FormField::GlAccount),
            other => Err(format!("unknown form field: {other}")),
        }
    }
}

pub const MAX_AMOUNT: f64 = 10_000.0;
pub const MAX_MILES: f64 = 1_000.0;
pub const MIN_MERCHANT_CHARS: usize = 2;
pub const MAX_EXPENSE_AGE_DAYS: i64 = 60;

pub struct FieldRule {
    pub field: FormField,
    pub message: &'static str,
    check: fn(&str, NaiveDate) -> bool,
}

impl FieldRule {
    pub fn passes(&self, value: &str, today: NaiveDate) -> bool {
        (self.check)(value, today)
    }
}

pub static FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: FormField::Amount,
        message: "Amount must be greater than $0",
        check: |value, _| parse_number(value).is_some_and(|v| v > 0.0),
    },
    FieldRule {
        field: FormField::Amount,
        message: "Amount cannot exceed $10,000",
        check: |value, _| parse_number(value).is_some_and(|v| v <= MAX_AMOUNT),
    },
    FieldRule {
        field: FormField::Merchant,
        message: "Merchant name must be at least 2 characters",
        check: |value, _| value.trim().chars().count() >= MIN_MERCHANT_CHARS,
    },
    FieldRule {
        field: FormField::Date,
        message: "Enter a valid date (YYYY-MM-DD)",
        check: |value, _| parse_date(value).is_some(),
    },
    FieldRule {
        field: FormField::Date,
        message: "Date cannot be in the future",
        check: |value, today| parse_date(value).is_some_and(|d| d <= today),
    },
    FieldRule {
        field: FormField::Date,
        message: "Date cannot be more than 60 days old",
        check: |value, today| {
            parse_date(value).is_some_and(|d| {
                today.signed_duration_since(d).num_days() <= MAX_EXPENSE_AGE_DAYS
            })
        },
    },
    FieldRule {
        field: FormField::Miles,
        message: "Miles must be greater than 0",
        check: |value, _| parse_number(value).is_some_and(|v| v > 0.0),
    },
    FieldRule {
        field: FormField::Miles,
        message: "Miles cannot exceed 1,000 per trip",
        check: |value, _| parse_number(value).is_some_and(|v| v <= MAX_MILES),
    },
    FieldRule {
        field: FormField::GlAccount,
        message: "GL account must be exactly 8 digits",
        check: |value, _| gl_account_pattern().is_match(value),
    },
];

/// Returns the message of the first rule the value breaks, or `None` when the
/// value is acceptable.
pub fn validate_field(field: FormField, value: &str, today: NaiveDate) -> Option<&'static str> {
    FIELD_RULES
        .iter()
        .filter(|rule| rule.field == field)
        .find(|rule| !rule.passes(value, today))
        .map(|rule| rule.message)
}

/// Same as [`validate_field`] for a field name as the form reports it. Names
/// without rules are always accepted.
pub fn validate_field_named(name: &str, value: &str, today: NaiveDate) -> Option<&'static str> {
    let field = name.parse::<FormField>().ok()?;
    validate_field(field, value, today)
}

fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn gl_account_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{8}$").expect("gl account pattern is valid"))
}
