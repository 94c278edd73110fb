//! Dataset preparation driver.
//!
//! Walks a directory of raw log files and writes one training dataset:
//! seed examples first, then per file the merged conversation examples
//! followed by single-record conversions. A record can legitimately appear
//! in both a conversation example and a single-record example; downstream
//! filtering owns deduplication concerns, not this stage.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

use redtrace_types::Example;

use crate::conversation::reconstruct;
use crate::error::DatasetError;
use crate::format::{convert_record, has_user_assistant_flow, merge_conversation};
use crate::record::LogRecord;
use crate::seeds::seed_examples;

#[derive(Debug, Default)]
pub struct PrepareStats {
    pub files: usize,
    pub records: usize,
    pub parse_errors: usize,
    pub seed_examples: usize,
    pub conversation_examples: usize,
    pub record_examples: usize,
}

impl PrepareStats {
    pub fn total_examples(&self) -> usize {
        self.seed_examples + self.conversation_examples + self.record_examples
    }
}

/// Build the training dataset from every `.jsonl` log under `input_dir`.
pub fn prepare_dataset(input_dir: &Path, output: &Path) -> Result<PrepareStats> {
    if !input_dir.exists() {
        return Err(DatasetError::MissingInput(input_dir.to_path_buf()).into());
    }
    if !input_dir.is_dir() {
        return Err(DatasetError::NotADirectory(input_dir.to_path_buf()).into());
    }

    let mut stats = PrepareStats::default();
    let mut examples: Vec<Example> = Vec::new();

    let seeds = seed_examples();
    stats.seed_examples = seeds.len();
    examples.extend(seeds);
    info!(count = stats.seed_examples, "added seed examples");

    let mut files: Vec<_> = WalkDir::new(input_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path().extension().and_then(|x| x.to_str()) == Some("jsonl")
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();

    for path in files {
        stats.files += 1;
        info!(file = %path.display(), "processing log file");

        let reader = BufReader::new(
            File::open(&path).with_context(|| format!("open log at {}", path.display()))?,
        );

        let mut records = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match LogRecord::parse(line.trim()) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(
                        file = %path.display(),
                        line = line_num + 1,
                        %err,
                        "skipping unparseable log line"
                    );
                    stats.parse_errors += 1;
                }
            }
        }
        stats.records += records.len();

        // Conversation-level examples first, then single records. The same
        // record may contribute to both.
        let conversations = reconstruct(records.clone());
        for conversation in &conversations {
            if let Some(example) = merge_conversation(conversation) {
                if example.messages.len() >= 3 && has_user_assistant_flow(&example) {
                    stats.conversation_examples += 1;
                    examples.push(example);
                }
            }
        }

        for record in &records {
            if let Some(example) = convert_record(record) {
                if example.messages.len() >= 2 && has_user_assistant_flow(&example) {
                    stats.record_examples += 1;
                    examples.push(example);
                }
            }
        }
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("create output {}", output.display()))?,
    );
    for example in &examples {
        serde_json::to_writer(&mut writer, example)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    info!(
        files = stats.files,
        examples = stats.total_examples(),
        "dataset prepared"
    );
    Ok(stats)
}
