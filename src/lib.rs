//! # COREP Assistant
//!
//! Maps a free-text description of a bank's capital position onto the COREP
//! C 01.00 (Own Funds) template, attaching a rule citation and justification
//! to every reported figure.
//!
//! ## Pipeline
//!
//! - **Retrieval**: the scenario is scored lexically against a read-only
//!   [`RuleStore`] and the best `top_k` rules become the oracle's context.
//! - **Extraction**: an [`Oracle`] (an LLM behind the `groq` feature, or a
//!   deterministic [`StaticOracle`]) returns candidate line items, which are
//!   merged into a [`CorepTemplate`] with accumulated audit trails.
//! - **Validation**: [`validate`] flags unjustified figures, unknown rule
//!   citations and a negative CET1 aggregate. Findings never block output.
//!
//! ## Example
//!
//! ```rust,ignore
//! use corep_assistant::*;
//!
//! let assistant = CorepAssistant::new(RuleStore::bundled()?, StaticOracle::simulated());
//! let submission = assistant
//!     .submit("We issued 50m in ordinary shares, fully paid up, and hold 20m retained earnings.")
//!     .await?;
//!
//! for row in submission.template.rows() {
//!     println!("{} {} {:.2}", row.row_id, row.description, row.amount());
//! }
//! for finding in &submission.findings {
//!     println!("{}", finding);
//! }
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod retriever;
pub mod rulebook;
pub mod template;
pub mod validator;

pub use config::AssistantConfig;
pub use error::{CorepError, Result};
pub use llm::*;
pub use retriever::{Retriever, ScoredRule};
pub use rulebook::{RuleRecord, RuleStore};
pub use template::*;
pub use validator::{has_errors, validate, Severity, ValidationResult};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Everything one scenario submission produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub scenario: String,
    /// Rules handed to the oracle, best match first.
    pub context: Vec<RuleRecord>,
    pub template: CorepTemplate,
    pub findings: Vec<ValidationResult>,
    pub skipped: Vec<SkippedCandidate>,
    pub generated_at: DateTime<Utc>,
}

impl Submission {
    /// Looks up a cited rule among the retrieved context.
    pub fn context_rule(&self, rule_id: &str) -> Option<&RuleRecord> {
        self.context.iter().find(|rule| rule.id == rule_id)
    }
}

/// Retrieval, extraction and validation wired together.
///
/// The rule store is shared read-only; every submission builds its own
/// template, so one assistant can serve concurrent callers.
pub struct CorepAssistant<O> {
    retriever: Retriever,
    adapter: ExtractionAdapter<O>,
    top_k: usize,
}

impl<O: Oracle> CorepAssistant<O> {
    pub fn new(store: RuleStore, oracle: O) -> Self {
        Self {
            retriever: Retriever::new(store),
            adapter: ExtractionAdapter::new(oracle),
            top_k: config::DEFAULT_TOP_K,
        }
    }

    /// Loads the configured knowledge base (or the bundled one).
    pub fn from_config(config: &AssistantConfig, oracle: O) -> Result<Self> {
        config.validate()?;
        let store = match &config.knowledge_base_path {
            Some(path) => RuleStore::load(path)?,
            None => RuleStore::bundled()?,
        };
        Ok(Self::new(store, oracle).with_top_k(config.top_k))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn adapter(&self) -> &ExtractionAdapter<O> {
        &self.adapter
    }

    pub async fn submit(&self, scenario: &str) -> Result<Submission> {
        if scenario.trim().is_empty() {
            return Err(CorepError::EmptyScenario);
        }

        let context = self.retriever.retrieve(scenario, self.top_k);
        info!(
            "Retrieved {} rules: [{}]",
            context.len(),
            context
                .iter()
                .map(|rule| rule.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let report = self.adapter.process_with_report(scenario, &context).await?;
        let findings = validate(&report.template);

        if has_errors(&findings) {
            warn!("Validation found errors in the populated template");
        }
        info!(
            "Submission complete: {} rows, {} findings, {} skipped candidates",
            report.template.rows().len(),
            findings.len(),
            report.skipped.len()
        );

        Ok(Submission {
            scenario: scenario.to_string(),
            context,
            template: report.template,
            findings,
            skipped: report.skipped,
            generated_at: Utc::now(),
        })
    }
}
