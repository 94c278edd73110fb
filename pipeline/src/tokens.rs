//! Security token vocabulary.
//!
//! Emits a tokenizer configuration that registers domain terms as
//! additional special tokens so the fine-tuned model treats them as atomic
//! units instead of splitting them into subwords.

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;

/// Domain vocabulary registered as special tokens, grouped by kind.
pub const SECURITY_TOKENS: &[&str] = &[
    // Vulnerability types
    "IDOR", "XSS", "SQLi", "RCE", "SSRF", "LFI", "RFI", "XXE", "CSRF", "SSTI", "XXS", "CMDI",
    // Tools
    "NMAP", "BURP", "METASPLOIT", "SQLMAP", "WIRESHARK", "NESSUS", "GOBUSTER", "FFUF", "DIRB",
    "DIRBUSTER",
    // Commands
    "CVE-", "MSFVENOM", "EXPLOITDB", "SHODAN", "ZAP", "HYDRA", "JOHN", "HASHCAT",
    // Security concepts
    "PRIVESC", "PWN", "ROP", "SHELLCODE", "BUFFER", "OVERFLOW", "PAYLOAD", "REVSHELL",
    "BINDSHELL", "STAGED", "STAGELESS",
    // Common output patterns
    "ADMIN:", "ROOT:", "FLAG{", "HTTP/", "HTTPS/", "200OK", "403FORBIDDEN", "401UNAUTHORIZED",
    "500ERROR", "BASE64", "MD5:", "SHA1:", "SHA256:",
];

/// Write `tokenizer_config.json` and `special_tokens_map.json` into `dir`,
/// creating it as needed. Returns the number of registered tokens.
pub fn write_tokenizer_config(dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create tokenizer directory {}", dir.display()))?;

    let tokenizer_config = json!({
        "model_type": "qwen2",
        "tokenizer_class": "Qwen2Tokenizer",
        "pad_token": "",
        "bos_token": "<|im_start|>",
        "eos_token": "<|im_end|>",
        "unk_token": "",
        "additional_special_tokens": SECURITY_TOKENS,
        "clean_up_tokenization_spaces": true,
        "use_fast": true
    });
    let special_tokens_map = json!({
        "pad_token": "",
        "bos_token": "<|im_start|>",
        "eos_token": "<|im_end|>",
        "unk_token": "",
        "additional_special_tokens": SECURITY_TOKENS
    });

    let config_path = dir.join("tokenizer_config.json");
    fs::write(
        &config_path,
        serde_json::to_string_pretty(&tokenizer_config)?,
    )
    .with_context(|| format!("write {}", config_path.display()))?;

    let map_path = dir.join("special_tokens_map.json");
    fs::write(&map_path, serde_json::to_string_pretty(&special_tokens_map)?)
        .with_context(|| format!("write {}", map_path.display()))?;

    Ok(SECURITY_TOKENS.len())
}
