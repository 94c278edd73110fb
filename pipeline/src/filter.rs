//! Quality filter.
//!
//! Streams a dataset file and keeps only examples with a real tool-use
//! workflow: enough assistant tool-call messages and a substantive closing
//! response. Kept lines are written through verbatim, so running the filter
//! on its own output is a no-op.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::DatasetError;

#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Minimum count of assistant messages carrying tool_calls.
    pub min_tool_calls: usize,
    /// Minimum character length of the last non-empty assistant content.
    pub min_response_length: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            min_tool_calls: 1,
            min_response_length: 50,
        }
    }
}

#[derive(Debug, Default)]
pub struct FilterStats {
    pub kept: usize,
    pub dropped: usize,
    /// Lines that did not parse as JSON; skipped without counting as failures.
    pub skipped: usize,
}

pub fn filter_dataset(input: &Path, output: &Path, opts: &FilterOptions) -> Result<FilterStats> {
    if !input.is_file() {
        return Err(DatasetError::MissingInput(input.to_path_buf()).into());
    }

    let reader = BufReader::new(
        File::open(input).with_context(|| format!("open dataset at {}", input.display()))?,
    );
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("create output {}", output.display()))?,
    );

    let mut stats = FilterStats::default();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Ok(example) = serde_json::from_str::<Value>(&line) else {
            stats.skipped += 1;
            continue;
        };

        if passes(&example, opts) {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            stats.kept += 1;
        } else {
            stats.dropped += 1;
        }
    }

    writer.flush()?;
    Ok(stats)
}

/// Quality predicate for one parsed example value.
pub fn passes(example: &Value, opts: &FilterOptions) -> bool {
    let Some(messages) = example.get("messages").and_then(Value::as_array) else {
        return false;
    };

    let tool_call_count = messages
        .iter()
        .filter(|m| is_assistant(m) && m.get("tool_calls").is_some())
        .count();

    // Last non-empty assistant content, scanning from the end; absent
    // content counts as length zero.
    let final_response_len = messages
        .iter()
        .rev()
        .filter(|m| is_assistant(m))
        .find_map(|m| {
            m.get("content")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
        })
        .map(|c| c.chars().count())
        .unwrap_or(0);

    tool_call_count >= opts.min_tool_calls && final_response_len >= opts.min_response_length
}

fn is_assistant(message: &Value) -> bool {
    message.get("role").and_then(Value::as_str) == Some("assistant")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;

    fn example(messages: Value) -> Value {
        json!({ "messages": messages })
    }

    fn long_summary() -> String {
        "Exploitation successful; the flag was recovered from the jobs endpoint.".to_string()
    }

    #[test]
    fn keeps_tool_workflow_with_substantive_summary() {
        let ex = example(json!([
            { "role": "user", "content": "go" },
            { "role": "assistant", "tool_calls": [{ "id": "a", "function": { "name": "terminal", "arguments": "{}" } }] },
            { "role": "observation", "content": "HTTP/1.1 200 OK" },
            { "role": "assistant", "content": long_summary() }
        ]));
        assert!(passes(&ex, &FilterOptions::default()));
    }

    #[test]
    fn tool_call_only_example_fails_length_check() {
        // One tool-call assistant message passes the count check at the
        // default minimum, but with no assistant content the response
        // length is zero.
        let ex = example(json!([
            { "role": "user", "content": "go" },
            { "role": "assistant", "tool_calls": [{ "id": "a", "function": { "name": "terminal", "arguments": "{}" } }] }
        ]));
        let defaults = FilterOptions::default();
        assert!(!passes(&ex, &defaults));

        // With the length requirement relaxed it passes; raising the
        // tool-call minimum above 1 fails it again.
        assert!(passes(
            &ex,
            &FilterOptions {
                min_tool_calls: 1,
                min_response_length: 0
            }
        ));
        assert!(!passes(
            &ex,
            &FilterOptions {
                min_tool_calls: 2,
                min_response_length: 0
            }
        ));
    }

    #[test]
    fn short_final_response_is_dropped() {
        let ex = example(json!([
            { "role": "user", "content": "go" },
            { "role": "assistant", "tool_calls": [{ "id": "a", "function": { "name": "terminal", "arguments": "{}" } }] },
            { "role": "assistant", "content": "ok" }
        ]));
        assert!(!passes(&ex, &FilterOptions::default()));
    }

    #[test]
    fn scans_backwards_past_empty_assistant_content() {
        let ex = example(json!([
            { "role": "user", "content": "go" },
            { "role": "assistant", "tool_calls": [{ "id": "a", "function": { "name": "terminal", "arguments": "{}" } }] },
            { "role": "assistant", "content": long_summary() },
            { "role": "assistant", "content": "" }
        ]));
        assert!(passes(&ex, &FilterOptions::default()));
    }

    #[test]
    fn filter_is_idempotent_and_skips_bad_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.jsonl");
        let once = dir.path().join("once.jsonl");
        let twice = dir.path().join("twice.jsonl");

        let good = example(json!([
            { "role": "user", "content": "go" },
            { "role": "assistant", "tool_calls": [{ "id": "a", "function": { "name": "terminal", "arguments": "{}" } }] },
            { "role": "assistant", "content": long_summary() }
        ]));
        let bad = example(json!([
            { "role": "user", "content": "go" },
            { "role": "assistant", "content": long_summary() }
        ]));
        std::fs::write(
            &input,
            format!("{good}\nnot json at all\n{bad}\n"),
        )?;

        let opts = FilterOptions::default();
        let stats = filter_dataset(&input, &once, &opts)?;
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.skipped, 1);

        let stats = filter_dataset(&once, &twice, &opts)?;
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.dropped, 0);

        let mut first = String::new();
        File::open(&once)?.read_to_string(&mut first)?;
        let mut second = String::new();
        File::open(&twice)?.read_to_string(&mut second)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn missing_input_is_fatal() {
        let err = filter_dataset(
            Path::new("/nonexistent/input.jsonl"),
            Path::new("/tmp/out.jsonl"),
            &FilterOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
