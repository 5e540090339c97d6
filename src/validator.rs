use crate::template::{CorepTemplate, CET1_ROW};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub severity: Severity,
    pub message: String,
    pub row_id: Option<String>,
}

impl ValidationResult {
    fn warning(message: String, row_id: &str) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            row_id: Some(row_id.to_string()),
        }
    }

    fn error(message: String, row_id: &str) -> Self {
        Self {
            severity: Severity::Error,
            message,
            row_id: Some(row_id.to_string()),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Runs every consistency check over a populated template.
///
/// Findings come out in row order; within a row the missing-justification
/// check precedes the unknown-rule checks (in audit-trail order). The CET1
/// sign check runs last.
pub fn validate(template: &CorepTemplate) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    for row in template.rows() {
        let Some(cell) = row.amount_cell() else {
            continue;
        };

        if cell.value != 0.0 && cell.audit_trail.is_empty() {
            results.push(ValidationResult::warning(
                format!(
                    "Row {} has a value but no regulatory justification (audit trail).",
                    row.row_id
                ),
                &row.row_id,
            ));
        }

        for audit in cell.audit_trail.iter().filter(|audit| audit.is_unknown_rule()) {
            results.push(ValidationResult::warning(
                format!(
                    "Row {} cites an unknown rule reference ({}).",
                    row.row_id, audit.justification
                ),
                &row.row_id,
            ));
        }
    }

    if let Some(cet1) = template.get_row(CET1_ROW) {
        if cet1.amount_cell().is_some_and(|cell| cell.value < 0.0) {
            results.push(ValidationResult::error(
                format!(
                    "Common Equity Tier 1 (Row {}) is negative ({:.2}). \
                     This indicates a critical capital breach or data error.",
                    CET1_ROW,
                    cet1.amount()
                ),
                CET1_ROW,
            ));
        }
    }

    debug!(
        "Validation produced {} findings over {} rows",
        results.len(),
        template.rows().len()
    );
    results
}

pub fn has_errors(results: &[ValidationResult]) -> bool {
    results.iter().any(|r| r.severity == Severity::Error)
}
