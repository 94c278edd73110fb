//! Shared Redtrace dataset schema.
//!
//! A training example is a list of role-tagged messages in the chat-template
//! vocabulary the target model consumes: `system`, `user`, `assistant`,
//! `observation`. Assistant messages carry free text content or a list of
//! tool-call requests, never both. Tool-call arguments are kept as a
//! serialized JSON string so a tool-execution layer can replay them verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const ROLE_OBSERVATION: &str = "observation";

pub const VALID_ROLES: [&str; 4] = [ROLE_SYSTEM, ROLE_USER, ROLE_ASSISTANT, ROLE_OBSERVATION];

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Example {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FunctionCall {
    pub name: String,
    /// Serialized JSON object, stored as text.
    pub arguments: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ROLE_SYSTEM, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ROLE_USER, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(ROLE_ASSISTANT, content)
    }

    pub fn observation(content: impl Into<String>) -> Self {
        Self::text(ROLE_OBSERVATION, content)
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ROLE_ASSISTANT.to_string(),
            content: None,
            tool_calls: Some(tool_calls),
        }
    }

    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    pub fn is_role(&self, role: &str) -> bool {
        self.role == role
    }
}

impl Example {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.messages.iter().any(|m| m.is_role(role))
    }

    pub fn validate(&self) -> anyhow::Result<Verdict> {
        Ok(validate_example(&serde_json::to_value(self)?))
    }
}

// ── Structural validation ───────────────────────────────────────────────

/// Result of validating one example. `issues` enumerates every violation
/// found; validation never fails for structurally-valid JSON input.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Verdict {
    pub valid: bool,
    pub issues: Vec<String>,
    pub message_count: usize,
    pub has_system: bool,
    pub has_user: bool,
    pub has_assistant: bool,
    pub has_observation: bool,
    pub has_tool_calls: bool,
}

/// Check one example value against the message-schema invariants.
///
/// Bails out only when `messages` is missing or not a list (nothing else is
/// checkable then); all other violations are accumulated, so a one-message
/// example reports both the minimum-count issue and any missing-role issues.
pub fn validate_example(value: &Value) -> Verdict {
    let mut verdict = Verdict::default();

    let Some(messages) = value.get("messages") else {
        verdict.issues.push("Missing 'messages' field".to_string());
        return verdict;
    };
    let Some(messages) = messages.as_array() else {
        verdict.issues.push("'messages' must be a list".to_string());
        return verdict;
    };

    verdict.message_count = messages.len();
    if messages.len() < 2 {
        verdict
            .issues
            .push("Must have at least 2 messages".to_string());
    }

    for (i, msg) in messages.iter().enumerate() {
        let Some(role) = msg.get("role").and_then(Value::as_str) else {
            verdict
                .issues
                .push(format!("Message {i} missing 'role' field"));
            continue;
        };

        match role {
            ROLE_SYSTEM => verdict.has_system = true,
            ROLE_USER => verdict.has_user = true,
            ROLE_ASSISTANT => verdict.has_assistant = true,
            ROLE_OBSERVATION => verdict.has_observation = true,
            other => verdict
                .issues
                .push(format!("Message {i} has invalid role: {other}")),
        }

        if role == ROLE_ASSISTANT {
            validate_assistant(i, msg, &mut verdict);
        }
    }

    if !verdict.has_user {
        verdict.issues.push("Missing user message".to_string());
    }
    if !verdict.has_assistant {
        verdict.issues.push("Missing assistant message".to_string());
    }

    verdict.valid = verdict.issues.is_empty();
    verdict
}

fn validate_assistant(i: usize, msg: &Value, verdict: &mut Verdict) {
    // A null content key counts as absent so that serialized forms with and
    // without an explicit "content": null validate identically.
    let has_content = msg.get("content").map(|c| !c.is_null()).unwrap_or(false);
    let tool_calls = msg.get("tool_calls").filter(|t| !t.is_null());

    match (has_content, tool_calls.is_some()) {
        (false, false) => verdict.issues.push(format!(
            "Assistant message {i} must have either 'content' or 'tool_calls'"
        )),
        (true, true) => verdict.issues.push(format!(
            "Assistant message {i} must not have both 'content' and 'tool_calls'"
        )),
        _ => {}
    }

    let Some(tool_calls) = tool_calls else {
        return;
    };
    verdict.has_tool_calls = true;

    let Some(tool_calls) = tool_calls.as_array() else {
        verdict
            .issues
            .push(format!("Message {i} tool_calls must be a list"));
        return;
    };

    for (j, call) in tool_calls.iter().enumerate() {
        if !call.is_object() {
            verdict
                .issues
                .push(format!("Message {i} tool_call {j} must be an object"));
            continue;
        }
        if call.get("id").and_then(Value::as_str).is_none() {
            verdict
                .issues
                .push(format!("Message {i} tool_call {j} missing 'id'"));
            continue;
        }
        let Some(function) = call.get("function") else {
            verdict
                .issues
                .push(format!("Message {i} tool_call {j} missing 'function'"));
            continue;
        };
        if !function.is_object() {
            verdict
                .issues
                .push(format!("Message {i} tool_call {j} function must be an object"));
            continue;
        }
        if function.get("name").and_then(Value::as_str).is_none() {
            verdict
                .issues
                .push(format!("Message {i} tool_call {j} function missing 'name'"));
        } else if function.get("arguments").and_then(Value::as_str).is_none() {
            verdict.issues.push(format!(
                "Message {i} tool_call {j} function missing 'arguments'"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_call() -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            function: FunctionCall {
                name: "terminal".to_string(),
                arguments: "{\"command\": \"curl http://10.0.0.1/\"}".to_string(),
            },
        }
    }

    #[test]
    fn accepts_valid_example() -> anyhow::Result<()> {
        let example = Example::new(vec![
            Message::system("persona"),
            Message::user("Target: http://10.0.0.1"),
            Message::assistant_tool_calls(vec![tool_call()]),
            Message::observation("HTTP/1.1 200 OK"),
            Message::assistant("Analysis completed."),
        ]);

        let verdict = example.validate()?;
        assert!(verdict.valid, "issues: {:?}", verdict.issues);
        assert_eq!(verdict.message_count, 5);
        assert!(verdict.has_system);
        assert!(verdict.has_observation);
        assert!(verdict.has_tool_calls);
        Ok(())
    }

    #[test]
    fn missing_assistant_is_reported_alongside_count_issue() {
        let verdict = validate_example(&json!({
            "messages": [{ "role": "user", "content": "x" }]
        }));

        assert!(!verdict.valid);
        assert!(!verdict.has_assistant);
        assert!(verdict
            .issues
            .contains(&"Missing assistant message".to_string()));
        assert!(verdict
            .issues
            .contains(&"Must have at least 2 messages".to_string()));
    }

    #[test]
    fn assistant_needs_content_xor_tool_calls() {
        let neither = validate_example(&json!({
            "messages": [
                { "role": "user", "content": "x" },
                { "role": "assistant" }
            ]
        }));
        assert!(neither
            .issues
            .iter()
            .any(|i| i.contains("either 'content' or 'tool_calls'")));

        let both = validate_example(&json!({
            "messages": [
                { "role": "user", "content": "x" },
                {
                    "role": "assistant",
                    "content": "y",
                    "tool_calls": [
                        { "id": "a", "function": { "name": "terminal", "arguments": "{}" } }
                    ]
                }
            ]
        }));
        assert!(both
            .issues
            .iter()
            .any(|i| i.contains("both 'content' and 'tool_calls'")));
    }

    #[test]
    fn null_content_with_tool_calls_is_valid() {
        let verdict = validate_example(&json!({
            "messages": [
                { "role": "user", "content": "x" },
                {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        { "id": "a", "function": { "name": "terminal", "arguments": "{}" } }
                    ]
                }
            ]
        }));
        assert!(verdict.valid, "issues: {:?}", verdict.issues);
    }

    #[test]
    fn enumerates_tool_call_shape_issues() {
        let verdict = validate_example(&json!({
            "messages": [
                { "role": "user", "content": "x" },
                {
                    "role": "assistant",
                    "tool_calls": [
                        { "function": { "name": "terminal", "arguments": "{}" } },
                        { "id": "b", "function": { "name": "terminal" } }
                    ]
                }
            ]
        }));

        assert!(!verdict.valid);
        assert!(verdict
            .issues
            .contains(&"Message 1 tool_call 0 missing 'id'".to_string()));
        assert!(verdict
            .issues
            .contains(&"Message 1 tool_call 1 function missing 'arguments'".to_string()));
    }

    #[test]
    fn rejects_unknown_role() {
        let verdict = validate_example(&json!({
            "messages": [
                { "role": "user", "content": "x" },
                { "role": "tool", "content": "y" }
            ]
        }));
        assert!(verdict
            .issues
            .contains(&"Message 1 has invalid role: tool".to_string()));
    }

    #[test]
    fn round_trips_through_jsonl_line() -> anyhow::Result<()> {
        let example = Example::new(vec![
            Message::user("probe the target"),
            Message::assistant_tool_calls(vec![tool_call()]),
            Message::assistant("done"),
        ]);

        let line = serde_json::to_string(&example)?;
        let reparsed: Value = serde_json::from_str(&line)?;
        let verdict = validate_example(&reparsed);
        assert!(verdict.valid, "issues: {:?}", verdict.issues);

        let back: Example = serde_json::from_str(&line)?;
        assert_eq!(serde_json::to_string(&back)?, line);
        Ok(())
    }
}
