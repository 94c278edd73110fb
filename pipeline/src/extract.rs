//! Field extractors.
//!
//! Each extractor pulls one kind of content out of a single log record using
//! positional and textual heuristics. Extraction order matters: the first
//! successful strategy wins, and later strategies are deliberately broader,
//! so callers must try them in the order given here.

use once_cell::sync::Lazy;
use regex::Regex;
use redtrace_types::{FunctionCall, ToolCall};
use serde_json::Value;

use crate::record::{InputPayload, LogRecord};

/// Banner prefixing summarizer output that leaks into user-facing text.
const SUMMARIZED_BANNER: &str = "**summarized content:**";

/// Whole blocks starting with any of these are system prompts, not model output.
const REJECTED_BLOCK_PREFIXES: [&str; 5] = [
    "# TASK EXECUTION EVALUATOR AND REPORTER",
    "# PRECISION SUMMARIZATION ENGINE",
    "<instructions>",
    SUMMARIZED_BANNER,
    "You are an elite archivist",
];

const TOOL_ONLY_MARKER: &str = "This system operates EXCLUSIVELY through structured tool calls";

const REJECTED_LINE_PREFIXES: [&str; 6] = [
    "#",
    "<",
    SUMMARIZED_BANNER,
    "You are an elite",
    "Always use your function",
    "User's question will be",
];

const REJECTED_LINE_MARKERS: [&str; 3] = [
    "This system operates EXCLUSIVELY",
    "NEVER mimic or copy",
    "ALWAYS use proper, structured tool calls",
];

/// Keywords that mark a task-report capture as security-relevant.
const SECURITY_KEYWORDS: [&str; 11] = [
    "vulnerability",
    "exploit",
    "flag",
    "security",
    "analysis",
    "finding",
    "technique",
    "method",
    "command",
    "curl",
    "http",
];

/// Per-line keywords kept when cleaning analysis content.
const ANALYSIS_KEYWORDS: [&str; 15] = [
    "vulnerability",
    "exploit",
    "flag",
    "security",
    "finding",
    "technique",
    "method",
    "command",
    "curl",
    "http",
    "successfully",
    "critical",
    "impact",
    "risk",
    "remediation",
];

static TASK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Target:\s*(http://\S+)[\s\S]*?vulnerabilities:([\s\S]*?)(?:\n\n|$)")
        .expect("task pattern")
});

static RESULT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<result>(.*?)</result>").expect("result pattern"));

/// A tool's textual result, paired with the tool that produced it.
#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub name: String,
    pub content: String,
}

// ── User input ──────────────────────────────────────────────────────────

/// Extract the original task description from a segment-start record.
///
/// Primary: second text part of a list-form input, with boilerplate lines
/// dropped. Fallback: scan a mapping-form `input.result` string for the
/// task pattern. Recognized task descriptions are normalized to one
/// canonical "Target / Vulnerabilities to exploit" shape either way.
pub fn extract_user_input(record: &LogRecord) -> Option<String> {
    if record.is_generation() {
        if let Some(text) = record.input().part_text(1) {
            if !text.is_empty() {
                if let Some(cleaned) = clean_user_input(text) {
                    return Some(normalize_task(&cleaned).unwrap_or(cleaned));
                }
            }
        }
    }

    let result = record.input().result_str()?;
    normalize_task(result)
}

fn clean_user_input(text: &str) -> Option<String> {
    let kept: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(SUMMARIZED_BANNER))
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join("\n"))
    }
}

fn normalize_task(text: &str) -> Option<String> {
    let caps = TASK_RE.captures(text)?;
    let target = &caps[1];
    let vulns = caps[2].trim();
    Some(format!(
        "Target: {target}\nVulnerabilities to exploit:\n{vulns}\n\nPlease analyze the target for these vulnerabilities and find the flag."
    ))
}

// ── Tool calls and responses ────────────────────────────────────────────

/// Extract tool-call requests from a tool-call record.
///
/// Arguments default to an empty JSON object and are overwritten with the
/// serialized input mapping when one is present; serialization failure
/// leaves the default in place.
pub fn extract_tool_calls(record: &LogRecord) -> Vec<ToolCall> {
    if !record.is_tool_call() {
        return Vec::new();
    }
    let (Some(id), Some(name)) = (record.tool_call_id(), record.tool_name()) else {
        return Vec::new();
    };

    let mut arguments = "{}".to_string();
    if let InputPayload::Object(map) = record.input() {
        if let Ok(serialized) = serde_json::to_string(map) {
            arguments = serialized;
        }
    }

    vec![ToolCall {
        id: id.to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments,
        },
    }]
}

pub fn extract_tool_responses(record: &LogRecord) -> Vec<ToolResponse> {
    if !record.is_tool_call() {
        return Vec::new();
    }
    let Some(result) = record.input().result_str() else {
        return Vec::new();
    };
    vec![ToolResponse {
        name: record.tool_name().unwrap_or("unknown").to_string(),
        content: result.to_string(),
    }]
}

// ── Assistant response ──────────────────────────────────────────────────

/// Scan every text-bearing part for salvageable assistant prose.
pub fn extract_assistant_response(record: &LogRecord) -> Option<String> {
    if !record.is_generation() {
        return None;
    }
    let InputPayload::Parts(parts) = record.input() else {
        return None;
    };

    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                if let Some(cleaned) = clean_assistant_response(text) {
                    return Some(cleaned);
                }
            }
        }
    }
    None
}

pub fn clean_assistant_response(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    if REJECTED_BLOCK_PREFIXES.iter().any(|p| text.starts_with(p)) {
        return None;
    }
    if text.contains(TOOL_ONLY_MARKER) {
        return None;
    }

    let kept: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !REJECTED_LINE_PREFIXES.iter().any(|p| line.starts_with(p)))
        .filter(|line| !REJECTED_LINE_MARKERS.iter().any(|m| line.contains(m)))
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("\n"))
    }
}

// ── Evaluation content fallback ─────────────────────────────────────────

/// Pull security analysis out of a task-report block when no direct
/// assistant prose survived cleaning.
pub fn extract_evaluation_content(record: &LogRecord) -> Option<String> {
    if !record.is_generation() {
        return None;
    }
    let text = record.input().part_text(1)?;
    if !text.contains("<task_report_context>") {
        return None;
    }
    analysis_from_task_report(text)
}

fn analysis_from_task_report(text: &str) -> Option<String> {
    let mut kept = Vec::new();
    for caps in RESULT_RE.captures_iter(text) {
        let block = &caps[1];
        let lower = block.to_lowercase();
        if SECURITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
            let cleaned = clean_analysis_content(block);
            if !cleaned.is_empty() {
                kept.push(cleaned);
            }
        }
        if kept.len() == 3 {
            break;
        }
    }
    if kept.is_empty() {
        None
    } else {
        Some(kept.join("\n\n"))
    }
}

fn clean_analysis_content(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            ANALYSIS_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generation(input: Value) -> LogRecord {
        LogRecord::from_value(json!({ "name": "custom-generation-ex", "input": input }))
    }

    #[test]
    fn normalizes_task_from_second_part() {
        let record = generation(json!([
            { "text": "irrelevant" },
            { "text": "Target: http://1.2.3.4:80\nvulnerabilities: IDOR\n\n" }
        ]));

        assert_eq!(
            extract_user_input(&record).as_deref(),
            Some(
                "Target: http://1.2.3.4:80\nVulnerabilities to exploit:\nIDOR\n\nPlease analyze the target for these vulnerabilities and find the flag."
            )
        );
    }

    #[test]
    fn keeps_free_form_user_text_with_boilerplate_dropped() {
        let record = generation(json!([
            { "text": "irrelevant" },
            { "text": "Probe the login form.\n\n**summarized content:** earlier session\nReport findings." }
        ]));

        assert_eq!(
            extract_user_input(&record).as_deref(),
            Some("Probe the login form.\nReport findings.")
        );
    }

    #[test]
    fn falls_back_to_result_task_pattern() {
        let record = LogRecord::from_value(json!({
            "name": "something-else",
            "input": { "result": "noise\nTarget: http://10.0.0.5:8080 found\nvulnerabilities: SSRF\nXSS\n\ntrailing" }
        }));

        let input = extract_user_input(&record).expect("fallback should fire");
        assert!(input.starts_with("Target: http://10.0.0.5:8080"));
        assert!(input.contains("Vulnerabilities to exploit:\nSSRF\nXSS"));
        assert!(input.ends_with("find the flag."));
    }

    #[test]
    fn no_content_is_an_absence_not_an_error() {
        let record = generation(json!([{ "text": "only one part" }]));
        assert!(extract_user_input(&record).is_none());

        let empty = generation(json!([{ "text": "a" }, { "text": "" }]));
        assert!(extract_user_input(&empty).is_none());
    }

    #[test]
    fn tool_call_arguments_default_to_empty_object() {
        let record = LogRecord::from_value(json!({
            "name": "tool call terminal",
            "metadata": { "tool_call_id": "c1", "tool_name": "terminal" }
        }));

        let calls = extract_tool_calls(&record);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].function.name, "terminal");
        assert_eq!(calls[0].function.arguments, "{}");
    }

    #[test]
    fn tool_call_arguments_serialize_input_mapping() {
        let record = LogRecord::from_value(json!({
            "name": "tool call terminal",
            "metadata": { "tool_call_id": "c1", "tool_name": "terminal" },
            "input": { "command": "curl http://10.0.0.1/" }
        }));

        let calls = extract_tool_calls(&record);
        let args: Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(
            args.get("command").and_then(Value::as_str),
            Some("curl http://10.0.0.1/")
        );
    }

    #[test]
    fn tool_call_without_metadata_yields_nothing() {
        let record = LogRecord::from_value(json!({
            "name": "tool call terminal",
            "input": { "command": "ls" }
        }));
        assert!(extract_tool_calls(&record).is_empty());
    }

    #[test]
    fn tool_response_uses_unknown_when_name_missing() {
        let record = LogRecord::from_value(json!({
            "name": "tool call ???",
            "input": { "result": "HTTP/1.1 200 OK" }
        }));

        let responses = extract_tool_responses(&record);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].name, "unknown");
        assert_eq!(responses[0].content, "HTTP/1.1 200 OK");
    }

    #[test]
    fn rejects_system_prompt_blocks() {
        assert!(clean_assistant_response("# PRECISION SUMMARIZATION ENGINE\nrules").is_none());
        assert!(clean_assistant_response(
            "Intro text.\nThis system operates EXCLUSIVELY through structured tool calls.\nMore."
        )
        .is_none());
    }

    #[test]
    fn keeps_prose_and_drops_instruction_lines() {
        let text = "## EVALUATION METHODOLOGY\nThe cookie decodes to user ID 1.\n<note>\nAlways use your function calls\nNext I will test IDOR.";
        assert_eq!(
            clean_assistant_response(text).as_deref(),
            Some("The cookie decodes to user ID 1.\nNext I will test IDOR.")
        );
    }

    #[test]
    fn assistant_response_scans_all_parts() {
        let record = generation(json!([
            { "text": "# TASK EXECUTION EVALUATOR AND REPORTER\nignored" },
            { "text": "Confirmed the IDOR vulnerability on /company/2/jobs." }
        ]));

        assert_eq!(
            extract_assistant_response(&record).as_deref(),
            Some("Confirmed the IDOR vulnerability on /company/2/jobs.")
        );
    }

    #[test]
    fn evaluation_content_keeps_first_three_relevant_captures() {
        let report = "\
<task_report_context>
<result>Found a critical vulnerability via curl.</result>
<result>nothing interesting here</result>
<result>Exploit confirmed with command injection.</result>
<result>The flag was recovered successfully.</result>
<result>Another security finding.</result>
</task_report_context>";
        let record = generation(json!([{ "text": "head" }, { "text": report }]));

        let content = extract_evaluation_content(&record).expect("should extract");
        let blocks: Vec<&str> = content.split("\n\n").collect();
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].contains("critical vulnerability"));
        assert!(blocks[1].contains("Exploit confirmed"));
        assert!(blocks[2].contains("flag was recovered"));
    }

    #[test]
    fn evaluation_content_requires_report_marker() {
        let record = generation(json!([
            { "text": "head" },
            { "text": "<result>security finding</result>" }
        ]));
        assert!(extract_evaluation_content(&record).is_none());
    }
}
