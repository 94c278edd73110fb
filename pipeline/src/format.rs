//! Example formatting.
//!
//! Maps a single record or a reconstructed conversation into the four-role
//! message schema. Both entry points share one verbatim system prompt; the
//! final assistant message is synthesized from tool output, reporting
//! success when a flag token shows up.

use once_cell::sync::Lazy;
use regex::Regex;
use redtrace_types::{Example, Message, ROLE_ASSISTANT, ROLE_OBSERVATION, ROLE_USER};

use crate::extract::{
    extract_assistant_response, extract_evaluation_content, extract_tool_calls,
    extract_tool_responses, extract_user_input, ToolResponse,
};
use crate::record::LogRecord;

/// Shared persona prompt. Byte-for-byte identical across both entry points;
/// do not fork per call site.
pub const SYSTEM_PROMPT: &str = "# ADVANCED PENETRATION TESTING SPECIALIST\nYou are an elite security researcher specializing in CTF challenges and vulnerability exploitation. Your expertise includes:\n- Insecure Direct Object Reference (IDOR) identification and exploitation\n- Default credential detection and utilization\n- Web application reconnaissance and enumeration\n- Command execution through security testing tools\n- Flag discovery in Capture The Flag environments\n\nAlways use proper tool calls for all actions. Never simulate tool calls in plain text.";

static FLAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"FLAG\{[^}]*\}").expect("flag pattern"));

/// Convert one record into an example: `[system, user]` plus any tool
/// interaction and a synthesized closing response. `None` when no user
/// input is extractable.
pub fn convert_record(record: &LogRecord) -> Option<Example> {
    let user_input = extract_user_input(record)?;

    let mut messages = vec![Message::system(SYSTEM_PROMPT), Message::user(user_input)];

    let tool_calls = extract_tool_calls(record);
    let tool_responses = extract_tool_responses(record);

    if !tool_calls.is_empty() {
        messages.push(Message::assistant_tool_calls(tool_calls));
    }
    for response in &tool_responses {
        messages.push(Message::observation(response.content.clone()));
    }
    if let Some(summary) = tool_summary(&tool_responses) {
        messages.push(Message::assistant(summary));
    }

    if messages.len() < 2 {
        return None;
    }
    Some(Example::new(messages))
}

/// Merge a reconstructed conversation into one example. `None` when fewer
/// than three messages accumulate (a bootstrap system+user pair alone is
/// not a conversation).
pub fn merge_conversation(conversation: &[LogRecord]) -> Option<Example> {
    let mut messages = vec![Message::system(SYSTEM_PROMPT)];

    for record in conversation {
        if record.is_generation() {
            if let Some(user_input) = extract_user_input(record) {
                messages.push(Message::user(user_input));
            }
            let response = extract_assistant_response(record)
                .or_else(|| extract_evaluation_content(record));
            if let Some(response) = response {
                messages.push(Message::assistant(response));
            }
        } else if record.is_tool_call() {
            let tool_calls = extract_tool_calls(record);
            if !tool_calls.is_empty() {
                messages.push(Message::assistant_tool_calls(tool_calls));
            }
            for response in extract_tool_responses(record) {
                messages.push(Message::observation(response.content));
            }
        }
    }

    // More than the system+user baseline means real interaction happened.
    if messages.len() > 2 {
        messages.push(Message::assistant(conversation_summary(&messages)));
    }

    if messages.len() < 3 {
        return None;
    }
    Some(Example::new(messages))
}

/// Conversion entry points require a user/assistant exchange on top of the
/// formatter's own minimum message count.
pub fn has_user_assistant_flow(example: &Example) -> bool {
    example.has_role(ROLE_USER) && example.has_role(ROLE_ASSISTANT)
}

// ── Synthesized closing responses ───────────────────────────────────────
//
// Known fidelity gap, reproduced from the source dataset on purpose: any
// FLAG{...} token in tool output is reported as the discovered flag, without
// checking it against the task's actual target.

fn find_flag<'a, I: IntoIterator<Item = &'a str>>(texts: I) -> Option<String> {
    for text in texts {
        if let Some(m) = FLAG_RE.find(text) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

fn tool_summary(tool_responses: &[ToolResponse]) -> Option<String> {
    if tool_responses.is_empty() {
        return None;
    }

    match find_flag(tool_responses.iter().map(|r| r.content.as_str())) {
        Some(flag) => Some(format!(
            "Successfully exploited the IDOR vulnerability and discovered the flag: {flag}. The Base64-encoded cookie manipulation allowed unauthorized access to sensitive data. This represents a critical security flaw requiring immediate remediation."
        )),
        None => Some(
            "Analysis completed. The target application contains multiple security vulnerabilities including IDOR through Base64 cookie manipulation. Recommend implementing proper session management and authorization controls."
                .to_string(),
        ),
    }
}

fn conversation_summary(messages: &[Message]) -> String {
    let observations = messages
        .iter()
        .filter(|m| m.is_role(ROLE_OBSERVATION))
        .filter_map(|m| m.content.as_deref());

    match find_flag(observations) {
        Some(flag) => format!(
            "Exploitation successful! I've identified and exploited the IDOR vulnerability through Base64 cookie manipulation. The flag {flag} was extracted from the target application. This demonstrates a critical security flaw in the session management system."
        ),
        None => "Penetration testing completed. Multiple security vulnerabilities were identified including IDOR, privilege escalation, and poor input validation. Immediate remediation is required."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redtrace_types::{validate_example, ROLE_SYSTEM};
    use serde_json::json;

    fn task_record() -> LogRecord {
        LogRecord::from_value(json!({
            "name": "custom-generation-ex",
            "input": [
                { "text": "head" },
                { "text": "Target: http://1.2.3.4:80\nvulnerabilities: IDOR\n\n" }
            ]
        }))
    }

    fn tool_record(result: &str) -> LogRecord {
        LogRecord::from_value(json!({
            "name": "tool call terminal",
            "metadata": { "tool_call_id": "c1", "tool_name": "terminal" },
            "input": { "command": "curl http://1.2.3.4:80/", "result": result }
        }))
    }

    #[test]
    fn single_record_yields_system_user_pair() {
        let example = convert_record(&task_record()).expect("should convert");
        assert_eq!(example.messages.len(), 2);
        assert!(example.messages[0].is_role(ROLE_SYSTEM));
        assert_eq!(example.messages[0].content.as_deref(), Some(SYSTEM_PROMPT));
        assert!(example.messages[1].is_role(ROLE_USER));
    }

    #[test]
    fn unextractable_record_is_skipped() {
        let record = LogRecord::from_value(json!({ "name": "custom-generation-ex" }));
        assert!(convert_record(&record).is_none());
    }

    #[test]
    fn merged_conversation_carries_tool_flow_and_summary() {
        let conversation = vec![
            task_record(),
            tool_record("HTTP/1.1 200 OK\nsecret:FLAG{demo-token}"),
        ];

        let example = merge_conversation(&conversation).expect("should merge");
        let roles: Vec<&str> = example.messages.iter().map(|m| m.role.as_str()).collect();
        // The generation record contributes both the user turn and an
        // assistant turn (its first part survives prose cleaning).
        assert_eq!(
            roles,
            vec![
                "system",
                "user",
                "assistant",
                "assistant",
                "observation",
                "assistant"
            ]
        );

        let tool_msg = &example.messages[3];
        assert!(tool_msg.content.is_none());
        assert_eq!(tool_msg.tool_calls.as_ref().unwrap().len(), 1);

        let closing = example.messages.last().unwrap();
        assert!(closing.content.as_deref().unwrap().contains("FLAG{demo-token}"));
    }

    #[test]
    fn merged_conversation_without_flag_uses_generic_summary() {
        let conversation = vec![task_record(), tool_record("HTTP/1.1 403 Forbidden")];
        let example = merge_conversation(&conversation).expect("should merge");
        let closing = example.messages.last().unwrap();
        assert!(closing
            .content
            .as_deref()
            .unwrap()
            .starts_with("Penetration testing completed."));
    }

    #[test]
    fn lone_marker_conversation_is_rejected_by_minimum() {
        // Mapping-form input yields a user turn via the task fallback but no
        // assistant prose, so the merge stays at system + user and is dropped.
        let record = LogRecord::from_value(json!({
            "name": "custom-generation-ex",
            "input": { "result": "Target: http://1.2.3.4:80\nvulnerabilities: IDOR\n\n" }
        }));
        assert!(merge_conversation(&[record]).is_none());
    }

    #[test]
    fn assistant_messages_satisfy_content_xor_tool_calls() {
        let conversation = vec![
            task_record(),
            tool_record("HTTP/1.1 200 OK"),
            tool_record("secret:FLAG{x}"),
        ];
        let example = merge_conversation(&conversation).expect("should merge");

        for message in &example.messages {
            if message.is_role("assistant") {
                assert!(
                    message.content.is_some() ^ message.tool_calls.is_some(),
                    "assistant message must carry exactly one of content/tool_calls: {message:?}"
                );
            }
        }

        let value = serde_json::to_value(&example).unwrap();
        let verdict = validate_example(&value);
        assert!(verdict.valid, "issues: {:?}", verdict.issues);
    }

    #[test]
    fn formatter_output_round_trips_through_validator() {
        let conversation = vec![task_record(), tool_record("body")];
        let example = merge_conversation(&conversation).unwrap();

        let line = serde_json::to_string(&example).unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert!(validate_example(&reparsed).valid);
    }
}
