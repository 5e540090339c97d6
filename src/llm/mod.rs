pub mod extractor;
pub mod merge;
pub mod oracle;
pub mod prompts;
pub mod types;

#[cfg(feature = "groq")]
pub mod client;

pub use extractor::*;
pub use merge::*;
pub use oracle::*;
pub use prompts::*;
pub use types::*;

#[cfg(feature = "groq")]
pub use client::*;
