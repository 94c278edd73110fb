//! Training-data pipeline for the pentest agent fine-tune.
//!
//! Raw agent session logs go in one end; a validated, filtered, augmented
//! JSONL dataset in the four-role chat format comes out the other. Stages
//! are independent and file-to-file, so each can be re-run in isolation:
//!
//! - [`prepare`]: logs to training examples (plus seed examples)
//! - [`filter`]: drop examples without a real tool-use workflow
//! - [`augment`]: synthesize payload-substituted variants per vulnerability
//! - [`report`]: validation report and filtering funnel diagnostics
//! - [`tokens`]: security token vocabulary for the tokenizer

pub mod augment;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod filter;
pub mod format;
pub mod prepare;
pub mod record;
pub mod report;
pub mod seeds;
pub mod tables;
pub mod tokens;

pub use augment::{augment_dataset, AugmentOptions, AugmentStats};
pub use config::RedtraceConfig;
pub use error::DatasetError;
pub use filter::{filter_dataset, FilterOptions, FilterStats};
pub use prepare::{prepare_dataset, PrepareStats};
pub use report::{analyze_dataset, analyze_log_dir, DatasetStats, FunnelStats};
pub use tokens::write_tokenizer_config;
