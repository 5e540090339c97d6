use crate::error::{CorepError, Result};
use crate::template::UNKNOWN_RULE;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_JUSTIFICATION: &str = "Extracted by automated process";

/// One loosely-typed line item exactly as the oracle returned it.
pub type RawLineItem = Map<String, Value>;

/// The oracle's structured reply: a `rows` array of line-item objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub rows: Vec<RawLineItem>,
}

impl OracleResponse {
    /// Parses model output, tolerating markdown fences or prose around the
    /// outermost JSON object.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cleaned = clean_json_output(raw);
        let value: Value = serde_json::from_str(cleaned).map_err(|e| {
            CorepError::OracleResponse(format!("response is not valid JSON: {}", e))
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(CorepError::OracleResponse(
                "top-level response must be a JSON object".to_string(),
            ));
        };

        let Some(rows) = object.remove("rows") else {
            return Err(CorepError::OracleResponse(
                "response is missing the 'rows' array".to_string(),
            ));
        };

        let Value::Array(items) = rows else {
            return Err(CorepError::OracleResponse(
                "'rows' must be an array".to_string(),
            ));
        };

        let rows = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(CorepError::OracleResponse(format!(
                    "row #{} is not an object: {}",
                    index, other
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rows })
    }
}

fn clean_json_output(raw: &str) -> &str {
    if let Some(start) = raw.find('{') {
        if let Some(end) = raw.rfind('}') {
            if end > start {
                return &raw[start..=end];
            }
        }
    }
    raw.trim()
}

/// A validated line item, ready to merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateLineItem {
    pub row_id: String,
    pub description: String,
    pub amount: f64,
    pub rule_ref: String,
    pub justification: String,
    pub source_text: Option<String>,
}

impl CandidateLineItem {
    /// Validates one raw item. `Ok(None)` means the item carries no usable
    /// `row_id` and must be skipped.
    pub fn from_raw(index: usize, raw: &RawLineItem) -> Result<Option<Self>> {
        let Some(row_id) = canonical_row_id(raw.get("row_id")) else {
            return Ok(None);
        };

        let amount = parse_amount(raw.get("amount")).map_err(|raw_amount| {
            CorepError::MalformedAmount {
                index,
                row_id: row_id.clone(),
                raw: raw_amount,
            }
        })?;

        Ok(Some(Self {
            description: text_field(raw.get("description")).unwrap_or_default(),
            amount,
            rule_ref: text_field(raw.get("rule_ref")).unwrap_or_else(|| UNKNOWN_RULE.to_string()),
            justification: text_field(raw.get("justification"))
                .unwrap_or_else(|| DEFAULT_JUSTIFICATION.to_string()),
            source_text: text_field(raw.get("source_text")),
            row_id,
        }))
    }
}

/// COREP row codes are three digits, so all-digit ids are zero-padded
/// whether they arrive as strings (`"10"`), integers (`10`) or whole
/// floats (`10.0`).
fn canonical_row_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(pad_row_code(trimmed).unwrap_or_else(|| trimmed.to_string()))
        }
        Value::Number(n) => {
            let code = n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= u64::MAX as f64)
                    .map(|v| v as u64)
            });
            Some(match code {
                Some(code) => format!("{:03}", code),
                None => n.to_string(),
            })
        }
        _ => None,
    }
}

fn pad_row_code(id: &str) -> Option<String> {
    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse::<u64>().ok().map(|code| format!("{:03}", code))
}

fn parse_amount(value: Option<&Value>) -> std::result::Result<f64, String> {
    match value {
        None => Ok(0.0),
        Some(Value::Null) => Err("null".to_string()),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| n.to_string()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| s.clone()),
        Some(other) => Err(other.to_string()),
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Shape the oracle is asked to produce. Only used to render the JSON
/// Schema embedded in the payload; responses are parsed leniently through
/// [`OracleResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedLineItem {
    #[schemars(description = "COREP C 01.00 row code, e.g. '010' or '020'")]
    pub row_id: String,

    #[schemars(description = "Row label, e.g. 'Common Equity Tier 1 (CET1) capital'")]
    pub description: String,

    #[schemars(
        description = "Amount in reporting currency units as a plain number (50 million = 50000000). Negative for deductions where the template expects it."
    )]
    pub amount: f64,

    #[schemars(description = "Id of the regulatory rule that justifies this mapping, taken from the Regulatory Context")]
    pub rule_ref: String,

    #[schemars(description = "Short explanation of why the rule places the figure in this row")]
    pub justification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedRows {
    #[schemars(
        description = "One entry per figure per row. A figure feeding both a detail row and an aggregate row appears twice."
    )]
    pub rows: Vec<ExtractedLineItem>,
}

impl ExtractedRows {
    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(ExtractedRows);
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawLineItem {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn test_parses_fenced_response() {
        let text = "```json\n{\"rows\": [{\"row_id\": \"010\", \"amount\": 5}]}\n```";
        let response = OracleResponse::from_json_str(text).unwrap();
        assert_eq!(response.rows.len(), 1);
    }

    #[test]
    fn test_rejects_missing_rows_key() {
        assert!(matches!(
            OracleResponse::from_json_str(r#"{"items": []}"#),
            Err(CorepError::OracleResponse(_))
        ));
    }

    #[test]
    fn test_rejects_non_object_row() {
        assert!(matches!(
            OracleResponse::from_json_str(r#"{"rows": [42]}"#),
            Err(CorepError::OracleResponse(_))
        ));
    }

    #[test]
    fn test_rejects_plain_text() {
        assert!(matches!(
            OracleResponse::from_json_str("I could not find any figures."),
            Err(CorepError::OracleResponse(_))
        ));
    }

    #[test]
    fn test_defaults_applied() {
        let item = CandidateLineItem::from_raw(0, &raw(json!({ "row_id": "020", "amount": 1.5 })))
            .unwrap()
            .unwrap();
        assert_eq!(item.rule_ref, UNKNOWN_RULE);
        assert_eq!(item.justification, DEFAULT_JUSTIFICATION);
        assert_eq!(item.description, "");
        assert_eq!(item.amount, 1.5);
        assert!(item.source_text.is_none());
    }

    #[test]
    fn test_numeric_row_id_is_zero_padded() {
        let item = CandidateLineItem::from_raw(0, &raw(json!({ "row_id": 10, "amount": 1 })))
            .unwrap()
            .unwrap();
        assert_eq!(item.row_id, "010");
    }

    #[test]
    fn test_missing_or_blank_row_id_is_skipped() {
        assert!(CandidateLineItem::from_raw(0, &raw(json!({ "amount": 1 })))
            .unwrap()
            .is_none());
        assert!(CandidateLineItem::from_raw(0, &raw(json!({ "row_id": "  ", "amount": 1 })))
            .unwrap()
            .is_none());
        assert!(CandidateLineItem::from_raw(0, &raw(json!({ "row_id": null })))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_string_amount_parsed() {
        let item = CandidateLineItem::from_raw(0, &raw(json!({ "row_id": "020", "amount": " 2500000.50 " })))
            .unwrap()
            .unwrap();
        assert_eq!(item.amount, 2_500_000.5);
    }

    #[test]
    fn test_missing_amount_is_zero() {
        let item = CandidateLineItem::from_raw(0, &raw(json!({ "row_id": "020" })))
            .unwrap()
            .unwrap();
        assert_eq!(item.amount, 0.0);
    }

    #[test]
    fn test_non_numeric_amount_rejected() {
        let err = CandidateLineItem::from_raw(3, &raw(json!({ "row_id": "020", "amount": "fifty million" })))
            .unwrap_err();
        match err {
            CorepError::MalformedAmount { index, row_id, raw } => {
                assert_eq!(index, 3);
                assert_eq!(row_id, "020");
                assert_eq!(raw, "fifty million");
            }
            other => panic!("expected MalformedAmount, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_amount_rejected() {
        assert!(CandidateLineItem::from_raw(0, &raw(json!({ "row_id": "020", "amount": "inf" }))).is_err());
        assert!(CandidateLineItem::from_raw(0, &raw(json!({ "row_id": "020", "amount": true }))).is_err());
    }

    #[test]
    fn test_null_amount_rejected() {
        let err = CandidateLineItem::from_raw(0, &raw(json!({ "row_id": "010", "amount": null, "rule_ref": "A" })))
            .unwrap_err();
        match err {
            CorepError::MalformedAmount { row_id, raw, .. } => {
                assert_eq!(row_id, "010");
                assert_eq!(raw, "null");
            }
            other => panic!("expected MalformedAmount, got {:?}", other),
        }
    }

    #[test]
    fn test_row_id_forms_share_one_canonical_code() {
        for form in [json!(10), json!("10"), json!("010"), json!(" 10 "), json!(10.0), json!("0010")] {
            let item = CandidateLineItem::from_raw(0, &raw(json!({ "row_id": form.clone(), "amount": 1 })))
                .unwrap()
                .unwrap();
            assert_eq!(item.row_id, "010", "row_id form {}", form);
        }
    }

    #[test]
    fn test_non_numeric_row_id_kept_verbatim() {
        let item = CandidateLineItem::from_raw(0, &raw(json!({ "row_id": " 020a ", "amount": 1 })))
            .unwrap()
            .unwrap();
        assert_eq!(item.row_id, "020a");
        let item = CandidateLineItem::from_raw(0, &raw(json!({ "row_id": 10.5, "amount": 1 })))
            .unwrap()
            .unwrap();
        assert_eq!(item.row_id, "10.5");
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = ExtractedRows::schema_as_json().unwrap();
        for field in ["row_id", "description", "amount", "rule_ref", "justification"] {
            assert!(schema.contains(field), "schema missing {}", field);
        }
    }
}
