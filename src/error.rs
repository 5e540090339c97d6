use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorepError {
    #[error("Knowledge base not found at {path}")]
    NotFound { path: String },

    #[error("Malformed rule record #{index}: {details}")]
    MalformedData { index: usize, details: String },

    #[error("Candidate #{index} (row {row_id}) has a non-numeric amount: {raw}")]
    MalformedAmount {
        index: usize,
        row_id: String,
        raw: String,
    },

    #[error("Oracle response could not be parsed: {0}")]
    OracleResponse(String),

    #[error("Oracle transport error: {0}")]
    Transport(String),

    #[error("Scenario description is empty")]
    EmptyScenario,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(feature = "groq")]
impl From<reqwest::Error> for CorepError {
    fn from(err: reqwest::Error) -> Self {
        CorepError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CorepError>;
