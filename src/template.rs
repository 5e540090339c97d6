use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TEMPLATE_ID: &str = "C 01.00";
pub const TEMPLATE_NAME: &str = "Own Funds";

/// Column 010 carries the reported amount.
pub const AMOUNT_COLUMN: &str = "010";

/// Row 010 is the Common Equity Tier 1 aggregate.
pub const CET1_ROW: &str = "010";

/// Rule id recorded when the oracle does not cite a rule.
pub const UNKNOWN_RULE: &str = "Unknown";

/// Rows the oracle is told about. Documents the target schema only; the
/// merge accepts any row id.
pub const REFERENCE_ROWS: &[(&str, &str)] = &[
    ("010", "Common Equity Tier 1 (CET1) capital"),
    ("020", "Capital instruments eligible as CET1 Capital"),
    ("350", "Total deductions from Common Equity Tier 1"),
    ("530", "Additional Tier 1 (AT1) capital"),
    ("750", "Tier 2 (T2) capital"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub rule_id: String,
    pub justification: String,
    pub source_text: Option<String>,
}

impl AuditEntry {
    pub fn new(rule_id: impl Into<String>, justification: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            justification: justification.into(),
            source_text: None,
        }
    }

    pub fn with_source_text(mut self, source_text: impl Into<String>) -> Self {
        self.source_text = Some(source_text.into());
        self
    }

    pub fn is_unknown_rule(&self) -> bool {
        self.rule_id == UNKNOWN_RULE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCell {
    pub column_id: String,
    /// Sum of every contribution merged into this cell.
    pub value: f64,
    /// One entry per contribution, in contribution order.
    pub audit_trail: Vec<AuditEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRow {
    pub row_id: String,
    pub description: String,
    cells: BTreeMap<String, TemplateCell>,
}

impl TemplateRow {
    pub fn new(row_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            description: description.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn cell(&self, column_id: &str) -> Option<&TemplateCell> {
        self.cells.get(column_id)
    }

    pub fn cells(&self) -> impl Iterator<Item = &TemplateCell> {
        self.cells.values()
    }

    pub fn amount_cell(&self) -> Option<&TemplateCell> {
        self.cell(AMOUNT_COLUMN)
    }

    /// Amount column value, 0.0 when nothing has been contributed.
    pub fn amount(&self) -> f64 {
        self.amount_cell().map_or(0.0, |cell| cell.value)
    }

    /// Replaces the cell wholesale with the given value and audit trail.
    pub fn set_value(&mut self, column_id: &str, value: f64, audit_trail: Vec<AuditEntry>) {
        self.cells.insert(
            column_id.to_string(),
            TemplateCell {
                column_id: column_id.to_string(),
                value,
                audit_trail,
            },
        );
    }

    /// Adds one contribution to a cell: the amount is summed and the audit
    /// entry appended, and the result replaces the previous cell.
    pub fn accumulate(&mut self, column_id: &str, amount: f64, audit: AuditEntry) {
        let (current_value, mut audit_trail) = match self.cells.get(column_id) {
            Some(cell) => (cell.value, cell.audit_trail.clone()),
            None => (0.0, Vec::new()),
        };
        audit_trail.push(audit);

        self.set_value(column_id, current_value + amount, audit_trail);
    }
}

/// A populated C 01.00 extract. Rows keep first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SerializedTemplate")]
pub struct CorepTemplate {
    pub template_id: String,
    pub template_name: String,
    rows: Vec<TemplateRow>,
}

// Deserialization goes through `from_rows` so row ids stay unique.
#[derive(Deserialize)]
struct SerializedTemplate {
    template_id: String,
    template_name: String,
    rows: Vec<TemplateRow>,
}

impl From<SerializedTemplate> for CorepTemplate {
    fn from(raw: SerializedTemplate) -> Self {
        let mut template = Self::from_rows(raw.rows);
        template.template_id = raw.template_id;
        template.template_name = raw.template_name;
        template
    }
}

impl Default for CorepTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CorepTemplate {
    pub fn new() -> Self {
        Self {
            template_id: TEMPLATE_ID.to_string(),
            template_name: TEMPLATE_NAME.to_string(),
            rows: Vec::new(),
        }
    }

    /// Builds a template from rows already in display order.
    ///
    /// Later rows with a repeated `row_id` are dropped.
    pub fn from_rows(rows: Vec<TemplateRow>) -> Self {
        let mut template = Self::new();
        for row in rows {
            if template.get_row(&row.row_id).is_none() {
                template.rows.push(row);
            }
        }
        template
    }

    pub fn rows(&self) -> &[TemplateRow] {
        &self.rows
    }

    pub fn get_row(&self, row_id: &str) -> Option<&TemplateRow> {
        self.rows.iter().find(|row| row.row_id == row_id)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Row ID,Description,Amount (Col 010),Rule Ref\n");

        for row in &self.rows {
            let rules: Vec<&str> = row
                .amount_cell()
                .map(|cell| {
                    cell.audit_trail
                        .iter()
                        .map(|audit| audit.rule_id.as_str())
                        .collect()
                })
                .unwrap_or_default();

            output.push_str(&format!(
                "{},{},{:.2},{}\n",
                row.row_id,
                csv_field(&row.description),
                row.amount(),
                csv_field(&rules.join("; "))
            ));
        }

        output
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
