use crate::error::{CorepError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

const BUNDLED_KNOWLEDGE_BASE: &str = include_str!("../data/knowledge_base.json");

/// A single regulatory provision the retriever can hand to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    /// Unique identifier, e.g. `CRR_ART_26`.
    pub id: String,
    pub title: String,
    pub text: String,
    /// Legal citation, e.g. "Regulation (EU) No 575/2013, Article 26".
    pub source: String,
    pub keywords: Vec<String>,
}

// Every field optional so a missing one can be reported by name and index.
#[derive(Deserialize)]
struct RawRuleRecord {
    id: Option<String>,
    title: Option<String>,
    text: Option<String>,
    source: Option<String>,
    keywords: Option<Vec<String>>,
}

impl RawRuleRecord {
    fn into_record(self, index: usize) -> Result<RuleRecord> {
        let missing = |field: &str| CorepError::MalformedData {
            index,
            details: format!("missing required field '{}'", field),
        };

        let id = self.id.ok_or_else(|| missing("id"))?;
        if id.trim().is_empty() {
            return Err(CorepError::MalformedData {
                index,
                details: "field 'id' is empty".to_string(),
            });
        }

        Ok(RuleRecord {
            id,
            title: self.title.ok_or_else(|| missing("title"))?,
            text: self.text.ok_or_else(|| missing("text"))?,
            source: self.source.ok_or_else(|| missing("source"))?,
            keywords: self.keywords.ok_or_else(|| missing("keywords"))?,
        })
    }
}

/// Immutable, cheaply cloneable collection of rule records.
///
/// Clones share the same backing slice, so one store can serve any number of
/// concurrent submissions.
#[derive(Debug, Clone)]
pub struct RuleStore {
    rules: Arc<[RuleRecord]>,
}

impl RuleStore {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CorepError::NotFound {
                path: path.display().to_string(),
            });
        }

        let raw = std::fs::read_to_string(path)?;
        let store = Self::from_json_str(&raw)?;
        info!(
            "Loaded {} regulatory rules from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// The compiled-in CRR / PRA rulebook.
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_KNOWLEDGE_BASE)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| CorepError::MalformedData {
                index: 0,
                details: format!("knowledge base is not valid JSON: {}", e),
            })?;

        let entries = value.as_array().ok_or_else(|| CorepError::MalformedData {
            index: 0,
            details: "knowledge base must be a JSON array of rule records".to_string(),
        })?;

        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if !entry.is_object() {
                return Err(CorepError::MalformedData {
                    index,
                    details: "rule record is not a JSON object".to_string(),
                });
            }
            let raw: RawRuleRecord = serde_json::from_value(entry.clone()).map_err(|e| {
                CorepError::MalformedData {
                    index,
                    details: e.to_string(),
                }
            })?;
            records.push(raw.into_record(index)?);
        }

        Self::from_records(records)
    }

    pub fn from_records(records: Vec<RuleRecord>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (index, record) in records.iter().enumerate() {
            if !seen.insert(record.id.as_str()) {
                return Err(CorepError::MalformedData {
                    index,
                    details: format!("duplicate rule id '{}'", record.id),
                });
            }
        }

        debug!("Rule store holds {} records", records.len());
        Ok(Self {
            rules: records.into(),
        })
    }

    pub fn rules(&self) -> &[RuleRecord] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&RuleRecord> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_rulebook_loads() {
        let store = RuleStore::bundled().unwrap();
        assert!(!store.is_empty());
        assert!(store.get("CRR_ART_26").is_some());
        assert!(store.get("CRR_ART_999").is_none());
    }

    #[test]
    fn test_missing_field_reports_index_and_name() {
        let raw = r#"[
            { "id": "A", "title": "t", "text": "x", "source": "s", "keywords": [] },
            { "id": "B", "title": "t", "text": "x", "keywords": [] }
        ]"#;

        match RuleStore::from_json_str(raw) {
            Err(CorepError::MalformedData { index, details }) => {
                assert_eq!(index, 1);
                assert!(details.contains("source"), "details: {}", details);
            }
            other => panic!("expected MalformedData, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let raw = r#"[
            { "id": "A", "title": "t", "text": "x", "source": "s", "keywords": [] },
            { "id": "A", "title": "u", "text": "y", "source": "s", "keywords": [] }
        ]"#;
        assert!(matches!(
            RuleStore::from_json_str(raw),
            Err(CorepError::MalformedData { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_non_array() {
        let raw = r#"{ "id": "A" }"#;
        assert!(matches!(
            RuleStore::from_json_str(raw),
            Err(CorepError::MalformedData { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(
            RuleStore::load(&path),
            Err(CorepError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_from_file_preserves_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{ "id": "Z", "title": "last", "text": "", "source": "s", "keywords": ["a"] }},
                {{ "id": "A", "title": "first", "text": "", "source": "s", "keywords": ["b"] }}
            ]"#
        )
        .unwrap();

        let store = RuleStore::load(file.path()).unwrap();
        let ids: Vec<&str> = store.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["Z", "A"]);
    }
}
