use crate::error::Result;
use crate::llm::types::{CandidateLineItem, RawLineItem};
use crate::rulebook::RuleRecord;
use crate::template::{AuditEntry, CorepTemplate, TemplateRow, AMOUNT_COLUMN};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const SOURCE_SNIPPET_CHARS: usize = 240;

/// A line item the merge dropped instead of aborting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    /// Position in the oracle's `rows` array.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub template: CorepTemplate,
    pub skipped: Vec<SkippedCandidate>,
}

/// Folds oracle line items into a template.
///
/// Items sharing a `row_id` collapse into one row whose amount is the sum of
/// their amounts, each contributing one audit entry in response order. The
/// first description seen for a row is kept. No aggregate rows are derived:
/// a row exists only if the oracle emitted it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateMerger<'a> {
    sources: &'a [RuleRecord],
}

impl<'a> TemplateMerger<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit entries citing one of `sources` get a snippet of its text.
    pub fn with_sources(sources: &'a [RuleRecord]) -> Self {
        Self { sources }
    }

    pub fn merge(&self, items: &[RawLineItem]) -> Result<MergeReport> {
        let mut rows: Vec<TemplateRow> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut skipped = Vec::new();

        for (index, raw) in items.iter().enumerate() {
            let Some(candidate) = CandidateLineItem::from_raw(index, raw)? else {
                warn!("Skipping candidate #{}: missing row_id", index);
                skipped.push(SkippedCandidate {
                    index,
                    reason: "missing row_id".to_string(),
                });
                continue;
            };

            let position = *positions
                .entry(candidate.row_id.clone())
                .or_insert_with(|| {
                    rows.push(TemplateRow::new(
                        candidate.row_id.clone(),
                        candidate.description.clone(),
                    ));
                    rows.len() - 1
                });

            let audit = self.audit_entry(&candidate);
            debug!(
                "Row {} += {} ({})",
                candidate.row_id, candidate.amount, audit.rule_id
            );
            rows[position].accumulate(AMOUNT_COLUMN, candidate.amount, audit);
        }

        info!(
            "Merged {} candidates into {} rows ({} skipped)",
            items.len(),
            rows.len(),
            skipped.len()
        );

        Ok(MergeReport {
            template: CorepTemplate::from_rows(rows),
            skipped,
        })
    }

    fn audit_entry(&self, candidate: &CandidateLineItem) -> AuditEntry {
        let audit = AuditEntry::new(candidate.rule_ref.clone(), candidate.justification.clone());

        let source_text = candidate.source_text.clone().or_else(|| {
            self.sources
                .iter()
                .find(|rule| rule.id == candidate.rule_ref)
                .map(|rule| snippet(&rule.text, SOURCE_SNIPPET_CHARS))
        });

        match source_text {
            Some(text) => audit.with_source_text(text),
            None => audit,
        }
    }
}

/// Merges without attaching rule text.
pub fn merge(items: &[RawLineItem]) -> Result<CorepTemplate> {
    TemplateMerger::new()
        .merge(items)
        .map(|report| report.template)
}

fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}
