use crate::error::Result;
use crate::llm::prompts::Payload;
use crate::llm::types::OracleResponse;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The external extraction engine.
///
/// Implementations fail with [`crate::CorepError::Transport`] when the call
/// itself fails and [`crate::CorepError::OracleResponse`] when the reply
/// cannot be read as a `rows` object. They must not retry.
pub trait Oracle: Send + Sync {
    fn complete(&self, payload: &Payload) -> impl Future<Output = Result<OracleResponse>> + Send;
}

const SIMULATED_RESPONSE: &str = r#"{
  "rows": [
    {
      "row_id": "020",
      "description": "Capital instruments eligible as CET1 Capital",
      "amount": 50000000,
      "rule_ref": "CRR_ART_28",
      "justification": "Ordinary shares issued directly to the market and fully paid up meet the CET1 instrument conditions."
    },
    {
      "row_id": "010",
      "description": "Common Equity Tier 1 (CET1) capital",
      "amount": 50000000,
      "rule_ref": "CRR_ART_26",
      "justification": "Paid-up ordinary shares are a CET1 item and roll into the CET1 aggregate."
    },
    {
      "row_id": "010",
      "description": "Common Equity Tier 1 (CET1) capital",
      "amount": 20000000,
      "rule_ref": "CRR_ART_26",
      "justification": "Retained earnings are a CET1 item."
    }
  ]
}"#;

/// Replays a fixed response regardless of the payload.
#[derive(Debug)]
pub struct StaticOracle {
    response: String,
    calls: AtomicUsize,
}

impl StaticOracle {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Canned reply for the "50m ordinary shares, 20m retained earnings"
    /// walkthrough scenario.
    pub fn simulated() -> Self {
        Self::new(SIMULATED_RESPONSE)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Oracle for StaticOracle {
    async fn complete(&self, _payload: &Payload) -> Result<OracleResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        OracleResponse::from_json_str(&self.response)
    }
}
