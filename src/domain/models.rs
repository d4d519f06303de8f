use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    Mileage,
    Meals,
    BusinessMeals,
    Hotel,
    Transport,
    Airfare,
    Supplies,
    Other,
}

impl ExpenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseType::Mileage => "mileage",
            ExpenseType::Meals => "meals",
            ExpenseType::BusinessMeals => "business_meals",
            ExpenseType::Hotel => "hotel",
            ExpenseType::Transport => "transport",
            ExpenseType::Airfare => "airfare",
            ExpenseType::Supplies => "supplies",
            ExpenseType::Other => "other",
        }
    }

    pub fn is_meal(&self) -> bool {
        matches!(self, ExpenseType::Meals | ExpenseType::BusinessMeals)
    }
}

impl fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mileage" => Ok(ExpenseType::Mileage),
            "meals" => Ok(ExpenseType::Meals),
            "business_meals" => Ok(ExpenseType::BusinessMeals),
            "hotel" => Ok(ExpenseType::Hotel),
            "transport" => Ok(ExpenseType::Transport),
            "airfare" => Ok(ExpenseType::Airfare),
            "supplies" => Ok(ExpenseType::Supplies),
            "other" => Ok(ExpenseType::Other),
            _ => Err(format!("unsupported expense type: {}", value.trim())),
        }
    }
}

/// A single claimed expense within a report, after form input has been parsed.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseLineItem {
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub zip_code: Option<String>,
}

impl ExpenseLineItem {
    pub fn has_receipt(&self) -> bool {
        present(&self.receipt_url)
    }

    pub fn has_zip_code(&self) -> bool {
        present(&self.zip_code)
    }

    pub fn notes_text(&self) -> &str {
        self.notes.as_deref().unwrap_or_default()
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Line item exactly as the expense form submits it. Every field is kept as raw
/// JSON so a mistyped value surfaces from [`ExpenseDraft::parse`] as an
/// [`InputError`] instead of rejecting the whole request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    #[serde(rename = "type", default)]
    pub expense_type: serde_json::Value,
    #[serde(default)]
    pub amount: serde_json::Value,
    #[serde(default)]
    pub date: serde_json::Value,
    #[serde(default)]
    pub description: serde_json::Value,
    #[serde(default)]
    pub receipt_url: serde_json::Value,
    #[serde(default)]
    pub notes: serde_json::Value,
    #[serde(default)]
    pub zip_code: serde_json::Value,
}

impl ExpenseDraft {
    pub fn parse(&self) -> Result<ExpenseLineItem, InputError> {
        let expense_type = match &self.expense_type {
            serde_json::Value::String(raw) => {
                raw.parse::<ExpenseType>().map_err(InputError::ExpenseType)?
            }
            other => {
                return Err(InputError::ExpenseType(format!(
                    "unsupported expense type: {other}"
                )))
            }
        };
        let amount_cents = parse_amount_value(&self.amount)
            .ok_or_else(|| InputError::Amount(self.amount.to_string()))?;
        let date = self
            .date
            .as_str()
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
            .ok_or_else(|| InputError::Date(self.date.to_string()))?;
        Ok(ExpenseLineItem {
            expense_type,
            amount_cents,
            date,
            description: text_value(&self.description, "description")?,
            receipt_url: text_value(&self.receipt_url, "receiptUrl")?,
            notes: text_value(&self.notes, "notes")?,
            zip_code: text_value(&self.zip_code, "zipCode")?,
        })
    }
}

fn text_value(
    value: &serde_json::Value,
    field: &'static str,
) -> Result<Option<String>, InputError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(text) => Ok(Some(text.clone())),
        _ => Err(InputError::Text(field)),
    }
}

fn optional_text(value: &Option<String>) -> serde_json::Value {
    value
        .clone()
        .map(serde_json::Value::String)
        .unwrap_or_default()
}

impl From<&ExpenseLineItem> for ExpenseDraft {
    fn from(item: &ExpenseLineItem) -> Self {
        Self {
            expense_type: serde_json::Value::String(item.expense_type.as_str().to_string()),
            amount: serde_json::Value::String(format_cents(item.amount_cents)),
            date: serde_json::Value::String(item.date.format("%Y-%m-%d").to_string()),
            description: optional_text(&item.description),
            receipt_url: optional_text(&item.receipt_url),
            notes: optional_text(&item.notes),
            zip_code: optional_text(&item.zip_code),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("{0}")]
    ExpenseType(String),
    #[error("amount must be a non-negative number with at most two decimals, got {0}")]
    Amount(String),
    #[error("date must use the YYYY-MM-DD format, got {0}")]
    Date(String),
    #[error("{0} must be text")]
    Text(&'static str),
}

impl InputError {
    /// Form field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            InputError::ExpenseType(_) => "type",
            InputError::Amount(_) => "amount",
            InputError::Date(_) => "date",
            InputError::Text(field) => field,
        }
    }
}

fn parse_amount_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(number) => {
            let amount = number.as_f64()?;
            if !amount.is_finite() || amount < 0.0 {
                return None;
            }
            let cents = (amount * 100.0).round();
            if (amount * 100.0 - cents).abs() > 1e-6 || cents > i64::MAX as f64 {
                return None;
            }
            Some(cents as i64)
        }
        serde_json::Value::String(raw) => parse_amount_cents(raw),
        _ => None,
    }
}

/// Parses `"12"`, `"12.5"`, `"$12.50"` into cents. Negative values, more than
/// two decimals, and non-digit characters are rejected.
pub fn parse_amount_cents(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > 2
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };
    whole.checked_mul(100)?.checked_add(fraction)
}

pub fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    Receipt,
    Travel,
    Transportation,
    Lodging,
    Meals,
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViolationComment {
    pub id: Uuid,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl ViolationComment {
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: author.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyViolation {
    pub id: String,
    pub field: String,
    pub message: String,
    pub severity: Severity,
    pub category: ViolationCategory,
    #[serde(default)]
    pub comments: Vec<ViolationComment>,
}

impl PolicyViolation {
    pub fn new(
        id: &str,
        field: &str,
        message: impl Into<String>,
        severity: Severity,
        category: ViolationCategory,
    ) -> Self {
        Self {
            id: id.to_string(),
            field: field.to_string(),
            message: message.into(),
            severity,
            category,
            comments: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Reviewer annotations are kept in the order they were added.
    pub fn add_comment(&mut self, comment: ViolationComment) {
        self.comments.push(comment);
    }
}

/// Fields read off a receipt image by a [`crate::infrastructure::ocr::ReceiptExtractor`].
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedReceipt {
    pub merchant_name: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub zip_code: Option<String>,
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(amount: serde_json::Value) -> ExpenseDraft {
        ExpenseDraft {
            expense_type: json!("meals"),
            amount,
            date: json!("2024-03-01"),
            ..ExpenseDraft::default()
        }
    }

    #[test]
    fn parses_amount_strings_into_cents() {
        assert_eq!(parse_amount_cents("12"), Some(1_200));
        assert_eq!(parse_amount_cents("12.5"), Some(1_250));
        assert_eq!(parse_amount_cents(" $12.05 "), Some(1_205));
        assert_eq!(parse_amount_cents(".75"), Some(75));
        assert_eq!(parse_amount_cents("12.345"), None);
        assert_eq!(parse_amount_cents("-4"), None);
        assert_eq!(parse_amount_cents("abc"), None);
        assert_eq!(parse_amount_cents(""), None);
        assert_eq!(parse_amount_cents("."), None);
    }

    #[test]
    fn draft_accepts_numeric_and_string_amounts() {
        assert_eq!(draft(json!(60)).parse().unwrap().amount_cents, 6_000);
        assert_eq!(draft(json!(60.25)).parse().unwrap().amount_cents, 6_025);
        assert_eq!(draft(json!("60.25")).parse().unwrap().amount_cents, 6_025);
    }

    #[test]
    fn draft_rejects_bad_input_with_field_name() {
        let err = draft(json!(-1)).parse().unwrap_err();
        assert_eq!(err.field(), "amount");

        let err = draft(json!(null)).parse().unwrap_err();
        assert_eq!(err.field(), "amount");

        let mut bad_date = draft(json!(10));
        bad_date.date = json!("03/01/2024");
        assert_eq!(bad_date.parse().unwrap_err().field(), "date");

        let mut bad_type = draft(json!(10));
        bad_type.expense_type = json!("yacht");
        let err = bad_type.parse().unwrap_err();
        assert_eq!(err.field(), "type");
        assert_eq!(err.to_string(), "unsupported expense type: yacht");

        let mut numeric_type = draft(json!(10));
        numeric_type.expense_type = json!(3);
        assert_eq!(numeric_type.parse().unwrap_err().field(), "type");
    }

    #[test]
    fn mistyped_text_fields_name_the_field() {
        let mut numeric_description = draft(json!(10));
        numeric_description.description = json!(12345678901_i64);
        let err = numeric_description.parse().unwrap_err();
        assert_eq!(err.field(), "description");
        assert_eq!(err.to_string(), "description must be text");

        let mut listed_zip = draft(json!(10));
        listed_zip.zip_code = json!(["10001"]);
        assert_eq!(listed_zip.parse().unwrap_err().field(), "zipCode");

        let mut null_notes = draft(json!(10));
        null_notes.notes = json!(null);
        assert_eq!(null_notes.parse().unwrap().notes, None);
    }

    #[test]
    fn expense_type_parsing_is_case_insensitive() {
        assert_eq!(
            " Business_Meals ".parse::<ExpenseType>(),
            Ok(ExpenseType::BusinessMeals)
        );
        assert!(ExpenseType::Meals.is_meal());
        assert!(!ExpenseType::Hotel.is_meal());
    }

    #[test]
    fn blank_receipt_and_zip_count_as_absent() {
        let mut item = draft(json!(10)).parse().unwrap();
        item.receipt_url = Some("  ".to_string());
        item.zip_code = Some(String::new());
        assert!(!item.has_receipt());
        assert!(!item.has_zip_code());

        item.receipt_url = Some("/receipts/abc.png".to_string());
        assert!(item.has_receipt());
    }

    #[test]
    fn line_item_round_trips_through_draft() {
        let item = draft(json!("42.10")).parse().unwrap();
        let again = ExpenseDraft::from(&item).parse().unwrap();
        assert_eq!(item, again);
    }

    #[test]
    fn comments_keep_insertion_order() {
        let mut violation = PolicyViolation::new(
            "meal-alcohol",
            "notes",
            "check",
            Severity::Warning,
            ViolationCategory::Meals,
        );
        violation.add_comment(ViolationComment::new("manager", "first"));
        violation.add_comment(ViolationComment::new("finance", "second"));
        let bodies: Vec<_> = violation.comments.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[test]
    fn violation_serializes_snake_case_enums() {
        let violation = PolicyViolation::new(
            "lodging-location",
            "zipCode",
            "ZIP required",
            Severity::Error,
            ViolationCategory::Lodging,
        );
        let value = serde_json::to_value(&violation).unwrap();
        assert_eq!(value["severity"], "error");
        assert_eq!(value["category"], "lodging");
        assert_eq!(value["comments"], json!([]));
    }
}
