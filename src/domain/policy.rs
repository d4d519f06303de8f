use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::{
    format_cents, ExpenseDraft, ExpenseLineItem, ExpenseType, PolicyViolation, Severity,
    ViolationCategory,
};

pub mod rule_ids {
    pub const RECEIPT_REQUIRED: &str = "receipt-required";
    pub const BUSINESS_PURPOSE: &str = "business-purpose";
    pub const MEAL_ALCOHOL: &str = "meal-alcohol";
    pub const EXCESSIVE_TIP: &str = "excessive-tip";
    pub const LODGING_LOCATION: &str = "lodging-location";
    pub const LODGING_RATE: &str = "lodging-rate";
    pub const MILEAGE_COMMUTE: &str = "mileage-commute";
    pub const STALE_EXPENSE: &str = "stale-expense";
    pub const INVALID_INPUT: &str = "invalid-input";
}

/// Percentage of the meal amount a tip may reach before it is flagged.
pub const TIP_LIMIT_PERCENT: i64 = 25;
/// Percentage quoted to the user in the excessive-tip message. Differs from
/// [`TIP_LIMIT_PERCENT`] and is kept as-is until the policy owner reconciles them.
pub const TIP_MESSAGE_PERCENT: i64 = 20;

const NO_ALCOHOL_MARKER: &str = "no alcohol";
const TIP_MARKER: &str = "tip";
const COMMUTE_MARKER: &str = "commute";

/// Numeric thresholds the policy rules compare against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct PolicyLimits {
    #[serde(default = "default_min_description_chars")]
    #[validate(range(min = 1))]
    pub min_description_chars: usize,
    #[serde(default = "default_meal_alcohol_threshold_cents")]
    #[validate(range(min = 0))]
    pub meal_alcohol_threshold_cents: i64,
    #[serde(default = "default_tip_limit_percent")]
    #[validate(range(min = 1))]
    pub tip_limit_percent: i64,
    #[serde(default = "default_lodging_rate_ceiling_cents")]
    #[validate(range(min = 0))]
    pub lodging_rate_ceiling_cents: i64,
    #[serde(default = "default_stale_after_days")]
    #[validate(range(min = 0))]
    pub stale_after_days: i64,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            min_description_chars: default_min_description_chars(),
            meal_alcohol_threshold_cents: default_meal_alcohol_threshold_cents(),
            tip_limit_percent: default_tip_limit_percent(),
            lodging_rate_ceiling_cents: default_lodging_rate_ceiling_cents(),
            stale_after_days: default_stale_after_days(),
        }
    }
}

fn default_min_description_chars() -> usize {
    10
}

fn default_meal_alcohol_threshold_cents() -> i64 {
    5_000
}

fn default_tip_limit_percent() -> i64 {
    TIP_LIMIT_PERCENT
}

fn default_lodging_rate_ceiling_cents() -> i64 {
    35_000
}

fn default_stale_after_days() -> i64 {
    60
}

/// Evaluates one line item against the default policy. Pure: the same item and
/// `today` always produce the same violations, in rule order.
pub fn validate_expense(item: &ExpenseLineItem, today: NaiveDate) -> Vec<PolicyViolation> {
    PolicyLimits::default().evaluate(item, today)
}

/// Like [`validate_expense`] but for unparsed form input. Input that cannot be
/// parsed yields a single `invalid-input` error instead of failing.
pub fn validate_draft(draft: &ExpenseDraft, today: NaiveDate) -> Vec<PolicyViolation> {
    PolicyLimits::default().evaluate_draft(draft, today)
}

impl PolicyLimits {
    pub fn evaluate(&self, item: &ExpenseLineItem, today: NaiveDate) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();
        violations.extend(check_receipt(item));
        violations.extend(self.check_business_purpose(item));
        violations.extend(self.check_meal_alcohol(item));
        violations.extend(self.check_tip(item));
        violations.extend(check_lodging_location(item));
        violations.extend(self.check_lodging_rate(item));
        violations.extend(check_mileage_commute(item));
        violations.extend(self.check_staleness(item, today));
        violations
    }

    pub fn evaluate_draft(&self, draft: &ExpenseDraft, today: NaiveDate) -> Vec<PolicyViolation> {
        match draft.parse() {
            Ok(item) => self.evaluate(&item, today),
            Err(err) => vec![PolicyViolation::new(
                rule_ids::INVALID_INPUT,
                err.field(),
                format!("Expense could not be checked: {err}"),
                Severity::Error,
                ViolationCategory::General,
            )],
        }
    }

    fn check_business_purpose(&self, item: &ExpenseLineItem) -> Option<PolicyViolation> {
        let length = item
            .description
            .as_deref()
            .map(|d| d.chars().count())
            .unwrap_or(0);
        (length < self.min_description_chars).then(|| {
            PolicyViolation::new(
                rule_ids::BUSINESS_PURPOSE,
                "description",
                format!(
                    "Business purpose must be at least {} characters",
                    self.min_description_chars
                ),
                Severity::Error,
                ViolationCategory::General,
            )
        })
    }

    fn check_meal_alcohol(&self, item: &ExpenseLineItem) -> Option<PolicyViolation> {
        if !item.expense_type.is_meal()
            || item.amount_cents <= self.meal_alcohol_threshold_cents
            || item.notes_text().contains(NO_ALCOHOL_MARKER)
        {
            return None;
        }
        Some(PolicyViolation::new(
            rule_ids::MEAL_ALCOHOL,
            "notes",
            format!(
                "Meals over ${} must confirm that no alcohol was purchased",
                format_cents(self.meal_alcohol_threshold_cents)
            ),
            Severity::Warning,
            ViolationCategory::Meals,
        ))
    }

    fn check_tip(&self, item: &ExpenseLineItem) -> Option<PolicyViolation> {
        if !item.expense_type.is_meal() {
            return None;
        }
        let notes = item.notes_text();
        if !notes.to_lowercase().contains(TIP_MARKER) {
            return None;
        }
        let tip_cents = first_amount_cents(notes)?;
        // tip > amount * limit%, kept in integer cents
        let limit = item.amount_cents.saturating_mul(self.tip_limit_percent);
        if tip_cents.saturating_mul(100) <= limit {
            return None;
        }
        Some(PolicyViolation::new(
            rule_ids::EXCESSIVE_TIP,
            "amount",
            format!("Tip appears excessive (exceeding {TIP_MESSAGE_PERCENT}% of the meal amount)"),
            Severity::Warning,
            ViolationCategory::Meals,
        ))
    }

    fn check_lodging_rate(&self, item: &ExpenseLineItem) -> Option<PolicyViolation> {
        if item.expense_type != ExpenseType::Hotel
            || item.amount_cents <= self.lodging_rate_ceiling_cents
        {
            return None;
        }
        Some(PolicyViolation::new(
            rule_ids::LODGING_RATE,
            "amount",
            format!(
                "Nightly rate exceeds the ${} lodging ceiling",
                format_cents(self.lodging_rate_ceiling_cents)
            ),
            Severity::Warning,
            ViolationCategory::Lodging,
        ))
    }

    fn check_staleness(&self, item: &ExpenseLineItem, today: NaiveDate) -> Option<PolicyViolation> {
        let age = today.signed_duration_since(item.date).num_days();
        (age > self.stale_after_days).then(|| {
            PolicyViolation::new(
                rule_ids::STALE_EXPENSE,
                "date",
                format!(
                    "Expenses must be submitted within {} days of the expense date",
                    self.stale_after_days
                ),
                Severity::Error,
                ViolationCategory::General,
            )
        })
    }
}

fn check_receipt(item: &ExpenseLineItem) -> Option<PolicyViolation> {
    if item.expense_type == ExpenseType::Mileage || item.has_receipt() {
        return None;
    }
    Some(PolicyViolation::new(
        rule_ids::RECEIPT_REQUIRED,
        "receipt",
        "A receipt is required for this expense",
        Severity::Error,
        ViolationCategory::Receipt,
    ))
}

fn check_lodging_location(item: &ExpenseLineItem) -> Option<PolicyViolation> {
    if item.expense_type != ExpenseType::Hotel || item.has_zip_code() {
        return None;
    }
    Some(PolicyViolation::new(
        rule_ids::LODGING_LOCATION,
        "zipCode",
        "Hotel expenses require the ZIP code of the property",
        Severity::Error,
        ViolationCategory::Lodging,
    ))
}

fn check_mileage_commute(item: &ExpenseLineItem) -> Option<PolicyViolation> {
    if item.expense_type != ExpenseType::Mileage
        || item.notes_text().to_lowercase().contains(COMMUTE_MARKER)
    {
        return None;
    }
    Some(PolicyViolation::new(
        rule_ids::MILEAGE_COMMUTE,
        "notes",
        "Confirm in the notes that normal commute miles were deducted",
        Severity::Warning,
        ViolationCategory::Transportation,
    ))
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("number pattern is valid")
    })
}

/// First ASCII number in free text, as cents. Values beyond `i64` saturate.
fn first_amount_cents(text: &str) -> Option<i64> {
    let found = number_pattern().find(text)?;
    let value: f64 = found.as_str().parse().ok()?;
    Some((value * 100.0).round() as i64)
}

/// Outcome of evaluating one line item, split by severity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyEvaluation {
    pub is_valid: bool,
    pub errors: Vec<PolicyViolation>,
    pub warnings: Vec<PolicyViolation>,
}

impl PolicyEvaluation {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_violations(violations: impl IntoIterator<Item = PolicyViolation>) -> Self {
        let mut evaluation = Self::ok();
        for violation in violations {
            evaluation.push(violation);
        }
        evaluation
    }

    pub fn push(&mut self, violation: PolicyViolation) {
        if violation.is_error() {
            self.is_valid = false;
            self.errors.push(violation);
        } else {
            self.warnings.push(violation);
        }
    }

    pub fn merge(&mut self, other: PolicyEvaluation) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineEvaluation {
    pub line: usize,
    #[serde(flatten)]
    pub evaluation: PolicyEvaluation,
}

/// Evaluation of every line item on a report. The report can be submitted only
/// when no line carries an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportEvaluation {
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub lines: Vec<LineEvaluation>,
}

pub fn aggregate_report(
    drafts: &[ExpenseDraft],
    today: NaiveDate,
    limits: &PolicyLimits,
) -> ReportEvaluation {
    let mut overall = PolicyEvaluation::ok();
    let mut lines = Vec::with_capacity(drafts.len());

    for (index, draft) in drafts.iter().enumerate() {
        let evaluation = PolicyEvaluation::from_violations(limits.evaluate_draft(draft, today));
        overall.merge(evaluation.clone());
        lines.push(LineEvaluation {
            line: index + 1,
            evaluation,
        });
    }

    ReportEvaluation {
        is_valid: overall.is_valid,
        error_count: overall.errors.len(),
        warning_count: overall.warnings.len(),
        lines,
    }
}
