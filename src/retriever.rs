//! Lexical retrieval over the rule store.
//!
//! Scoring is a weighted token overlap between the query and each rule:
//! keyword matches count 2, title matches 1 and body-text matches 0.5.
//! Tokens are lowercased whitespace-separated words; punctuation is kept.

use crate::rulebook::{RuleRecord, RuleStore};
use log::debug;
use std::collections::HashSet;

pub const KEYWORD_WEIGHT: f64 = 2.0;
pub const TITLE_WEIGHT: f64 = 1.0;
pub const TEXT_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct ScoredRule<'a> {
    pub rule: &'a RuleRecord,
    pub score: f64,
}

// Per-rule token sets, computed once at construction.
#[derive(Debug, Clone)]
struct IndexedRule {
    keywords: HashSet<String>,
    title: HashSet<String>,
    text: HashSet<String>,
}

impl IndexedRule {
    fn new(rule: &RuleRecord) -> Self {
        Self {
            keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
            title: tokenize(&rule.title),
            text: tokenize(&rule.text),
        }
    }

    fn score(&self, query_tokens: &HashSet<String>) -> f64 {
        let keyword_hits = query_tokens.intersection(&self.keywords).count() as f64;
        let title_hits = query_tokens.intersection(&self.title).count() as f64;
        let text_hits = query_tokens.intersection(&self.text).count() as f64;

        keyword_hits * KEYWORD_WEIGHT + title_hits * TITLE_WEIGHT + text_hits * TEXT_WEIGHT
    }
}

pub fn tokenize(input: &str) -> HashSet<String> {
    input
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

pub struct Retriever {
    store: RuleStore,
    index: Vec<IndexedRule>,
}

impl Retriever {
    pub fn new(store: RuleStore) -> Self {
        let index = store.rules().iter().map(IndexedRule::new).collect();
        Self { store, index }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Every rule with a positive score, best first.
    ///
    /// Equal scores keep rule-store order (`sort_by` is stable).
    pub fn rank(&self, query: &str) -> Vec<ScoredRule<'_>> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredRule<'_>> = self
            .store
            .rules()
            .iter()
            .zip(&self.index)
            .filter_map(|(rule, indexed)| {
                let score = indexed.score(&query_tokens);
                (score > 0.0).then_some(ScoredRule { rule, score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            "Query with {} distinct tokens matched {} of {} rules",
            query_tokens.len(),
            scored.len(),
            self.store.len()
        );
        scored
    }

    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<RuleRecord> {
        self.rank(query)
            .into_iter()
            .take(top_k)
            .map(|scored| scored.rule.clone())
            .collect()
    }
}
