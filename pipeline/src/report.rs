//! Dataset reports.
//!
//! Two read-only inspection passes: a validation report over a finished
//! dataset file, and a filtering funnel over raw log files showing where
//! candidate examples drop out of the preparation pipeline.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use redtrace_types::validate_example;

use crate::conversation::reconstruct;
use crate::error::DatasetError;
use crate::extract::extract_user_input;
use crate::format::{convert_record, has_user_assistant_flow, merge_conversation};
use crate::record::LogRecord;

// ── Validation report ───────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct DatasetStats {
    pub total_examples: usize,
    pub valid_examples: usize,
    pub invalid_examples: usize,
    total_messages: usize,
    pub examples_with_system: usize,
    pub examples_with_user: usize,
    pub examples_with_assistant: usize,
    pub examples_with_observation: usize,
    pub examples_with_tool_calls: usize,
    /// Issue text to occurrence count, for invalid examples only.
    pub common_issues: BTreeMap<String, usize>,
    /// Message count to example count, for valid examples only.
    pub message_count_distribution: BTreeMap<usize, usize>,
}

impl DatasetStats {
    pub fn avg_message_count(&self) -> f64 {
        if self.valid_examples == 0 {
            return 0.0;
        }
        self.total_messages as f64 / self.valid_examples as f64
    }
}

/// Validate every line of a dataset file and aggregate the verdicts.
/// Unparseable lines count as invalid with a single "JSON decode error"
/// issue tag.
pub fn analyze_dataset(path: &Path) -> Result<DatasetStats> {
    if !path.is_file() {
        return Err(DatasetError::MissingInput(path.to_path_buf()).into());
    }

    let reader = BufReader::new(
        File::open(path).with_context(|| format!("open dataset at {}", path.display()))?,
    );

    let mut stats = DatasetStats::default();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let example: Value = match serde_json::from_str(line.trim()) {
            Ok(example) => example,
            Err(err) => {
                warn!(line = line_num + 1, %err, "JSON decode error");
                stats.invalid_examples += 1;
                *stats
                    .common_issues
                    .entry("JSON decode error".to_string())
                    .or_insert(0) += 1;
                continue;
            }
        };
        stats.total_examples += 1;

        let verdict = validate_example(&example);
        if verdict.valid {
            stats.valid_examples += 1;
            stats.total_messages += verdict.message_count;
            if verdict.has_system {
                stats.examples_with_system += 1;
            }
            if verdict.has_user {
                stats.examples_with_user += 1;
            }
            if verdict.has_assistant {
                stats.examples_with_assistant += 1;
            }
            if verdict.has_observation {
                stats.examples_with_observation += 1;
            }
            if verdict.has_tool_calls {
                stats.examples_with_tool_calls += 1;
            }
            *stats
                .message_count_distribution
                .entry(verdict.message_count)
                .or_insert(0) += 1;
        } else {
            stats.invalid_examples += 1;
            for issue in verdict.issues {
                *stats.common_issues.entry(issue).or_insert(0) += 1;
            }
        }
    }

    Ok(stats)
}

/// Printable validation summary.
pub fn render_report(path: &Path, stats: &DatasetStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Validating dataset: {}", path.display());
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out, "Total examples: {}", stats.total_examples);
    let _ = writeln!(out, "Valid examples: {}", stats.valid_examples);
    let _ = writeln!(out, "Invalid examples: {}", stats.invalid_examples);
    if stats.total_examples > 0 {
        let _ = writeln!(
            out,
            "Validation rate: {:.1}%",
            stats.valid_examples as f64 / stats.total_examples as f64 * 100.0
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Valid examples statistics:");
    let _ = writeln!(out, "  Average message count: {:.1}", stats.avg_message_count());
    let _ = writeln!(
        out,
        "  Examples with system message: {}",
        stats.examples_with_system
    );
    let _ = writeln!(
        out,
        "  Examples with user message: {}",
        stats.examples_with_user
    );
    let _ = writeln!(
        out,
        "  Examples with assistant message: {}",
        stats.examples_with_assistant
    );
    let _ = writeln!(
        out,
        "  Examples with observation: {}",
        stats.examples_with_observation
    );
    let _ = writeln!(
        out,
        "  Examples with tool calls: {}",
        stats.examples_with_tool_calls
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Message count distribution:");
    for (count, examples) in &stats.message_count_distribution {
        let _ = writeln!(out, "  {count} messages: {examples} examples");
    }
    let _ = writeln!(out);

    if !stats.common_issues.is_empty() {
        let _ = writeln!(out, "Common issues found:");
        let mut issues: Vec<(&String, &usize)> = stats.common_issues.iter().collect();
        issues.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (issue, count) in issues {
            let _ = writeln!(out, "  {issue}: {count} occurrences");
        }
    }

    if stats.invalid_examples == 0 {
        let _ = writeln!(out, "All examples are valid");
    } else {
        let _ = writeln!(out, "Found {} invalid examples", stats.invalid_examples);
    }
    out
}

// ── Filtering funnel ────────────────────────────────────────────────────

/// Counters along the raw-log to training-example funnel. Comparing
/// adjacent counters shows where candidates drop out of the pipeline.
#[derive(Debug, Default, Clone)]
pub struct FunnelStats {
    pub total_entries: usize,
    pub parse_errors: usize,
    pub generation_events: usize,
    pub tool_call_events: usize,
    pub user_inputs: usize,
    pub conversations: usize,
    pub record_examples: usize,
    pub conversation_examples: usize,
}

impl FunnelStats {
    fn absorb(&mut self, other: &FunnelStats) {
        self.total_entries += other.total_entries;
        self.parse_errors += other.parse_errors;
        self.generation_events += other.generation_events;
        self.tool_call_events += other.tool_call_events;
        self.user_inputs += other.user_inputs;
        self.conversations += other.conversations;
        self.record_examples += other.record_examples;
        self.conversation_examples += other.conversation_examples;
    }
}

/// Run every pipeline stage over one log file, counting survivors per
/// stage without writing anything.
pub fn analyze_log_file(path: &Path) -> Result<FunnelStats> {
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("open log at {}", path.display()))?,
    );

    let mut stats = FunnelStats::default();
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match LogRecord::parse(line.trim()) {
            Ok(record) => {
                stats.total_entries += 1;
                if record.is_generation() {
                    stats.generation_events += 1;
                } else if record.is_tool_call() {
                    stats.tool_call_events += 1;
                }
                records.push(record);
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unparseable log line");
                stats.parse_errors += 1;
            }
        }
    }

    for record in &records {
        if record.is_generation() && extract_user_input(record).is_some() {
            stats.user_inputs += 1;
        }
    }

    for record in &records {
        if let Some(example) = convert_record(record) {
            if example.messages.len() >= 2 && has_user_assistant_flow(&example) {
                stats.record_examples += 1;
            }
        }
    }

    let conversations = reconstruct(records);
    stats.conversations = conversations.len();
    for conversation in &conversations {
        if let Some(example) = merge_conversation(conversation) {
            if example.messages.len() >= 3 && has_user_assistant_flow(&example) {
                stats.conversation_examples += 1;
            }
        }
    }

    Ok(stats)
}

/// Aggregate the funnel over every `.jsonl` file in a directory. Returns
/// per-file results in filename order plus the combined totals.
pub fn analyze_log_dir(dir: &Path) -> Result<(Vec<(String, FunnelStats)>, FunnelStats)> {
    if !dir.is_dir() {
        return Err(DatasetError::NotADirectory(dir.to_path_buf()).into());
    }

    let mut files: Vec<_> = WalkDir::new(dir)
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

    let mut per_file = Vec::new();
    let mut totals = FunnelStats::default();
    for path in files {
        let stats = analyze_log_file(&path)?;
        totals.absorb(&stats);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        per_file.push((name, stats));
    }

    Ok((per_file, totals))
}

/// Printable funnel summary with per-stage conversion rates.
pub fn render_funnel(per_file: &[(String, FunnelStats)], totals: &FunnelStats) -> String {
    let mut out = String::new();

    for (name, stats) in per_file {
        let _ = writeln!(out, "Analyzing {name}");
        let _ = writeln!(out, "  Total entries: {}", stats.total_entries);
        let _ = writeln!(out, "  Generation events: {}", stats.generation_events);
        let _ = writeln!(out, "  Tool call events: {}", stats.tool_call_events);
        let _ = writeln!(out, "  Valid user inputs: {}", stats.user_inputs);
        let _ = writeln!(out, "  Valid conversations: {}", stats.conversations);
        let _ = writeln!(out, "  Individual examples: {}", stats.record_examples);
        let _ = writeln!(out, "  Final examples: {}", stats.conversation_examples);
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Total raw entries: {}", totals.total_entries);
    let _ = writeln!(out, "  Total generation events: {}", totals.generation_events);
    let _ = writeln!(out, "  Total tool call events: {}", totals.tool_call_events);
    let _ = writeln!(out, "  Total valid user inputs: {}", totals.user_inputs);
    let _ = writeln!(out, "  Total valid conversations: {}", totals.conversations);
    let _ = writeln!(out, "  Total individual examples: {}", totals.record_examples);
    let _ = writeln!(
        out,
        "  Total final examples: {}",
        totals.conversation_examples
    );

    if totals.total_entries > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Conversion rates:");
        let _ = writeln!(
            out,
            "  generation events / total: {:.2}%",
            totals.generation_events as f64 / totals.total_entries as f64 * 100.0
        );
        if totals.generation_events > 0 {
            let _ = writeln!(
                out,
                "  valid user inputs / generation events: {:.2}%",
                totals.user_inputs as f64 / totals.generation_events as f64 * 100.0
            );
        }
        let _ = writeln!(
            out,
            "  final examples / total: {:.2}%",
            totals.conversation_examples as f64 / totals.total_entries as f64 * 100.0
        );
    }

    out
}
