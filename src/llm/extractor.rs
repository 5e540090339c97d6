use crate::error::Result;
use crate::llm::merge::{MergeReport, TemplateMerger};
use crate::llm::oracle::Oracle;
use crate::llm::prompts::build_payload;
use crate::rulebook::RuleRecord;
use crate::template::CorepTemplate;
use log::{debug, info};

/// Grounds the oracle in retrieved rules and turns its reply into a template.
pub struct ExtractionAdapter<O> {
    oracle: O,
}

impl<O: Oracle> ExtractionAdapter<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub async fn process(&self, query: &str, context: &[RuleRecord]) -> Result<CorepTemplate> {
        Ok(self.process_with_report(query, context).await?.template)
    }

    /// Like [`Self::process`], also returning the candidates that were skipped.
    ///
    /// Merging starts only once the oracle has returned a complete response,
    /// so a failed or cancelled call never yields a partial template.
    pub async fn process_with_report(
        &self,
        query: &str,
        context: &[RuleRecord],
    ) -> Result<MergeReport> {
        let payload = build_payload(query, context)?;
        debug!(
            "Built extraction payload: {} chars, {} context rules",
            payload.prompt.len(),
            context.len()
        );

        info!("Requesting line items from oracle...");
        let response = self.oracle.complete(&payload).await?;
        info!("Oracle returned {} candidate line items", response.rows.len());

        TemplateMerger::with_sources(context).merge(&response.rows)
    }
}
