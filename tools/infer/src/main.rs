//! Inference harness for the fine-tuned model.
//!
//! Formats a message list into the chat template the model was trained on
//! and sends it to a local completion server (llama.cpp-compatible API).
//! Pass a JSON file of messages as the first argument, or run with none to
//! use a built-in pentest scenario.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::env;
use std::fs;

const DEFAULT_URL: &str = "http://127.0.0.1:8080/completion";

const IM_START: &str = "<|im_start|>";
const IM_END: &str = "<|im_end|>";

fn main() -> Result<()> {
    let messages = match env::args().nth(1) {
        Some(path) => load_messages(&path)?,
        None => test_messages(),
    };

    let url = env::var("REDTRACE_INFER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let prompt = format_prompt(&messages)?;

    let client = reqwest::blocking::Client::new();
    let resp = client
        .post(&url)
        .json(&serde_json::json!({
            "prompt": prompt,
            "n_predict": 512,
            "temperature": 0.7,
            "top_p": 0.9,
            "stop": [IM_END],
        }))
        .send()
        .with_context(|| format!("completion request to {url} failed"))?;

    if !resp.status().is_success() {
        bail!("completion request failed: HTTP {}", resp.status());
    }

    let body: Value = resp.json().context("completion response was not JSON")?;
    let completion = extract_completion(&body)
        .context("completion response had neither 'content' nor 'choices[0].text'")?;

    println!("Model response:");
    println!("{completion}");
    Ok(())
}

/// Accepts either a bare message array or an object with a `messages` field,
/// so a dataset example file works directly.
fn load_messages(path: &str) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path).with_context(|| format!("read messages from {path}"))?;
    let value: Value = serde_json::from_str(&content).with_context(|| format!("parse {path}"))?;

    let messages = match value {
        Value::Array(messages) => messages,
        Value::Object(mut obj) => match obj.remove("messages") {
            Some(Value::Array(messages)) => messages,
            _ => bail!("{path} has no 'messages' array"),
        },
        _ => bail!("{path} is not a message list"),
    };
    if messages.is_empty() {
        bail!("{path} contains no messages");
    }
    Ok(messages)
}

/// Render messages into the trained chat template, ending with an open
/// assistant turn for the model to complete.
fn format_prompt(messages: &[Value]) -> Result<String> {
    let mut prompt = String::new();
    for (i, message) in messages.iter().enumerate() {
        let role = message
            .get("role")
            .and_then(Value::as_str)
            .with_context(|| format!("message {i} missing 'role'"))?;
        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        prompt.push_str(&format!("{IM_START}{role}\n{content}{IM_END}\n"));
    }
    prompt.push_str(&format!("{IM_START}assistant\n"));
    Ok(prompt)
}

/// llama.cpp returns `content`; OpenAI-style servers return `choices[0].text`.
fn extract_completion(body: &Value) -> Option<String> {
    body.get("content")
        .and_then(Value::as_str)
        .or_else(|| body.pointer("/choices/0/text").and_then(Value::as_str))
        .map(|s| s.trim().to_string())
}

fn test_messages() -> Vec<Value> {
    vec![
        serde_json::json!({
            "role": "system",
            "content": "# ADVANCED PENETRATION TESTING SPECIALIST\nYou are an elite security researcher specializing in CTF challenges and vulnerability exploitation."
        }),
        serde_json::json!({
            "role": "user",
            "content": "Target: http://172.17.0.1:32775\nThis is a Capture The Flag (CTF) challenge. The application contains the following vulnerabilities:\n- Insecure Direct Object Reference (IDOR) — Category: Broken Authorization\n- Default Credentials — Category: Broken Authentication\n\nPlease analyze the target for these vulnerabilities and find the flag."
        }),
    ]
}
