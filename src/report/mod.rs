//! Dataset statistics and the language-model report.

pub mod llm;
pub mod prompt;
pub mod stats;

pub use llm::ChatClient;
pub use prompt::{analysis_prompt, bound, WAREHOUSING_PROMPT};
pub use stats::{analyze, print_stats, sample_rows};
