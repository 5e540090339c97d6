use crate::error::Result;
use crate::llm::types::ExtractedRows;
use crate::rulebook::RuleRecord;
use crate::template::{REFERENCE_ROWS, TEMPLATE_ID, TEMPLATE_NAME};
use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT: &str =
    "You are a helpful regulatory assistant that outputs only valid JSON.";

const EXAMPLE_RESPONSE: &str = r#"{
  "rows": [
    {
      "row_id": "020",
      "description": "Capital instruments eligible as CET1 Capital",
      "amount": 50000000,
      "rule_ref": "CRR_ART_28",
      "justification": "Ordinary shares issued directly and fully paid up."
    },
    {
      "row_id": "010",
      "description": "Common Equity Tier 1 (CET1) capital",
      "amount": 50000000,
      "rule_ref": "CRR_ART_26",
      "justification": "The same instruments also count towards the CET1 aggregate."
    }
  ]
}"#;

/// The single text payload sent to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub prompt: String,
}

impl Payload {
    pub fn as_str(&self) -> &str {
        &self.prompt
    }
}

pub fn render_rule_context(rules: &[RuleRecord]) -> String {
    if rules.is_empty() {
        return "- (no matching rules were retrieved; cite 'Unknown' if no rule applies)\n"
            .to_string();
    }

    rules
        .iter()
        .map(|rule| format!("- **{}** ({}): {}\n", rule.id, rule.title, rule.text))
        .collect()
}

fn render_reference_rows() -> String {
    REFERENCE_ROWS
        .iter()
        .map(|(row_id, label)| format!("- Row {}: {}\n", row_id, label))
        .collect()
}

pub fn build_payload(query: &str, rules: &[RuleRecord]) -> Result<Payload> {
    let schema = ExtractedRows::schema_as_json()?;

    let prompt = format!(
        r#"You are an expert PRA/COREP Regulatory Reporting Assistant.
Your task is to extract data from the user's scenario and map it to the COREP {template_id} ({template_name}) template schema.

### Regulatory Context (use these rules to justify your mapping):
{rules}
### Template Structure:
The {template_id} template requires the following rows (among others):
{rows}
### User Scenario:
"{query}"

### Instructions:
1. Identify the relevant financial figures from the scenario.
2. Determine which COREP row each figure belongs to based on the Regulatory Context.
3. Every extracted figure MUST cite a rule id from the Regulatory Context in `rule_ref`.
4. If a figure belongs to a detailed row (like 020) and also contributes to an aggregate row (like 010), you MUST emit separate entries for BOTH the detailed row and the aggregate row. The template does not auto-sum.
5. Amounts are plain numbers (50m = 50000000), never words.
6. Return a single JSON object with a `rows` array matching this JSON Schema:
{schema}

Example:
{example}

IMPORTANT: valid JSON only. Do not wrap the object in markdown code blocks or add any other text.
"#,
        template_id = TEMPLATE_ID,
        template_name = TEMPLATE_NAME,
        rules = render_rule_context(rules),
        rows = render_reference_rows(),
        query = query,
        schema = schema,
        example = EXAMPLE_RESPONSE,
    );

    Ok(Payload { prompt })
}
