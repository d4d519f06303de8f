//! Policy checks behind the `/api/policy` routes in `api/rest/policy.rs`.
//!
//! The service resolves the evaluation date and the configured
//! [`PolicyLimits`], then hands off to the pure rule functions in
//! `domain::policy` and `validation::rules`.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use crate::{
    domain::{
        models::{ExpenseDraft, PolicyViolation},
        policy::{aggregate_report, PolicyEvaluation, PolicyLimits, ReportEvaluation},
    },
    infrastructure::state::AppState,
    validation::rules::validate_field_named,
};

use super::errors::ServiceError;

#[derive(Debug, Deserialize)]
pub struct ValidateItemRequest {
    pub item: ExpenseDraft,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateReportRequest {
    #[validate(length(min = 1, max = 200))]
    pub items: Vec<ExpenseDraft>,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FieldCheckRequest {
    #[validate(length(min = 1, max = 64))]
    pub field: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub value: String,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ItemValidation {
    pub violations: Vec<PolicyViolation>,
    pub evaluation: PolicyEvaluation,
}

#[derive(Debug, Serialize)]
pub struct FieldCheck {
    pub field: String,
    pub error: Option<&'static str>,
}

pub struct PolicyService {
    pub state: Arc<AppState>,
}

impl PolicyService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn limits(&self) -> &PolicyLimits {
        &self.state.config.policy
    }

    /// Runs every policy rule against one line item. Unparsable input comes
    /// back as an `invalid-input` violation, never as an error.
    pub fn validate_item(&self, request: ValidateItemRequest) -> ItemValidation {
        let today = resolve_today(request.as_of);
        let violations = self.limits().evaluate_draft(&request.item, today);
        let evaluation = PolicyEvaluation::from_violations(violations.iter().cloned());
        debug!(
            %today,
            expense_type = %request.item.expense_type,
            errors = evaluation.errors.len(),
            warnings = evaluation.warnings.len(),
            "validated expense line item"
        );
        ItemValidation {
            violations,
            evaluation,
        }
    }

    pub fn validate_report(
        &self,
        request: ValidateReportRequest,
    ) -> Result<ReportEvaluation, ServiceError> {
        request.validate()?;
        let today = resolve_today(request.as_of);
        let report = aggregate_report(&request.items, today, self.limits());
        info!(
            %today,
            lines = report.lines.len(),
            errors = report.error_count,
            warnings = report.warning_count,
            is_valid = report.is_valid,
            "validated expense report"
        );
        Ok(report)
    }

    pub fn check_field(&self, request: FieldCheckRequest) -> Result<FieldCheck, ServiceError> {
        request.validate()?;
        let today = resolve_today(request.as_of);
        let error = validate_field_named(&request.field, &request.value, today);
        Ok(FieldCheck {
            field: request.field,
            error,
        })
    }
}

fn resolve_today(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Utc::now().date_naive())
}
