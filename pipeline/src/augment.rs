//! Dataset augmentation.
//!
//! Examples are classified into vulnerability buckets by keyword, then each
//! bucket spawns synthetic variants of randomly chosen members with
//! bucket-specific payload/ID/credential substitutions applied. The random
//! source is injected so callers (and tests) can seed it; the file-level
//! wrapper draws a seed from config or entropy.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use regex::{NoExpand, Regex};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::warn;

use crate::error::DatasetError;
use crate::tables;

/// The catch-all bucket augments at this fraction of the configured factor.
/// Tunable default inherited from the source dataset, not a semantic
/// requirement.
pub const GENERAL_FACTOR_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Idor,
    DefaultCreds,
    Ssrf,
    Xss,
    Sqli,
    Other,
}

/// Ordered classification table, evaluated top to bottom; the first
/// matching predicate wins and `Other` catches the remainder. Bucket order
/// is an explicit contract.
pub const BUCKET_TABLE: &[(fn(&str) -> bool, Bucket)] = &[
    (is_idor, Bucket::Idor),
    (is_default_creds, Bucket::DefaultCreds),
    (is_ssrf, Bucket::Ssrf),
    (is_xss, Bucket::Xss),
    (is_sqli, Bucket::Sqli),
];

fn is_idor(content: &str) -> bool {
    content.contains("idor") || content.contains("direct object reference")
}

fn is_default_creds(content: &str) -> bool {
    content.contains("default") && (content.contains("credential") || content.contains("password"))
}

fn is_ssrf(content: &str) -> bool {
    content.contains("ssrf") || content.contains("server-side request forgery")
}

fn is_xss(content: &str) -> bool {
    content.contains("xss") || content.contains("cross-site scripting")
}

fn is_sqli(content: &str) -> bool {
    content.contains("sql") && content.contains("injection")
}

/// Classify one example by the lowercased concatenation of its message
/// contents.
pub fn classify(example: &Value) -> Bucket {
    let content = example
        .get("messages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m.get("content").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .unwrap_or_default();

    for (predicate, bucket) in BUCKET_TABLE {
        if predicate(&content) {
            return *bucket;
        }
    }
    Bucket::Other
}

#[derive(Debug, Clone)]
pub struct AugmentOptions {
    pub factor: f64,
}

impl Default for AugmentOptions {
    fn default() -> Self {
        Self { factor: 0.3 }
    }
}

#[derive(Debug, Default)]
pub struct AugmentStats {
    pub original: usize,
    pub generated: usize,
    pub idor: usize,
    pub default_creds: usize,
    pub ssrf: usize,
    pub xss: usize,
    pub sqli: usize,
    pub other: usize,
    /// Lines that did not parse as JSON and were skipped.
    pub skipped: usize,
}

// ── Core augmentation ───────────────────────────────────────────────────

/// Augment a full example set. Returns the originals plus the generated
/// clones, shuffled together; output order is only reproducible when `rng`
/// is seeded.
pub fn augment_examples<R: Rng>(
    examples: Vec<Value>,
    opts: &AugmentOptions,
    rng: &mut R,
) -> (Vec<Value>, AugmentStats) {
    let mut stats = AugmentStats {
        original: examples.len(),
        ..AugmentStats::default()
    };

    let mut buckets: Vec<(Bucket, Vec<usize>)> = vec![
        (Bucket::Idor, Vec::new()),
        (Bucket::DefaultCreds, Vec::new()),
        (Bucket::Ssrf, Vec::new()),
        (Bucket::Xss, Vec::new()),
        (Bucket::Sqli, Vec::new()),
        (Bucket::Other, Vec::new()),
    ];
    for (index, example) in examples.iter().enumerate() {
        let bucket = classify(example);
        buckets
            .iter_mut()
            .find(|(b, _)| *b == bucket)
            .expect("bucket table covers all variants")
            .1
            .push(index);
    }
    for (bucket, members) in &buckets {
        match bucket {
            Bucket::Idor => stats.idor = members.len(),
            Bucket::DefaultCreds => stats.default_creds = members.len(),
            Bucket::Ssrf => stats.ssrf = members.len(),
            Bucket::Xss => stats.xss = members.len(),
            Bucket::Sqli => stats.sqli = members.len(),
            Bucket::Other => stats.other = members.len(),
        }
    }

    let mut augmented = examples.clone();

    for (bucket, members) in &buckets {
        if members.is_empty() {
            continue;
        }
        let factor = match bucket {
            Bucket::Other => opts.factor * GENERAL_FACTOR_RATIO,
            _ => opts.factor,
        };
        let count = (members.len() as f64 * factor) as usize;

        for _ in 0..count {
            let index = *members.choose(rng).expect("non-empty bucket");
            let mut clone = examples[index].clone();
            mutate_for_bucket(*bucket, &mut clone, rng);
            augmented.push(clone);
            stats.generated += 1;
        }
    }

    augmented.shuffle(rng);
    (augmented, stats)
}

/// Read a dataset file, augment it, write the shuffled result.
pub fn augment_dataset(
    input: &Path,
    output: &Path,
    opts: &AugmentOptions,
    seed: Option<u64>,
) -> Result<AugmentStats> {
    if !input.is_file() {
        return Err(DatasetError::MissingInput(input.to_path_buf()).into());
    }

    let reader = BufReader::new(
        File::open(input).with_context(|| format!("open dataset at {}", input.display()))?,
    );

    let mut examples = Vec::new();
    let mut skipped = 0usize;
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(example) => examples.push(example),
            Err(err) => {
                warn!(line = line_num + 1, %err, "skipping malformed dataset line");
                skipped += 1;
            }
        }
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (augmented, mut stats) = augment_examples(examples, opts, &mut rng);
    stats.skipped = skipped;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("create output {}", output.display()))?,
    );
    for example in &augmented {
        serde_json::to_writer(&mut writer, example)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(stats)
}

// ── Bucket-specific substitution passes ─────────────────────────────────

static IDOR_ID_RES: Lazy<Vec<(Regex, &'static str, u64)>> = Lazy::new(|| {
    tables::IDOR_ID_PATTERNS
        .iter()
        .map(|(pattern, label, max)| (Regex::new(pattern).expect("idor id pattern"), *label, *max))
        .collect()
});

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"http://[^\s'"]+"#).expect("url pattern"));
static URL_PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"http://[^\s]+:\d+").expect("url:port pattern"));
static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<script>.*?</script>").expect("script pattern"));
static SQLI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'.*?--").expect("sqli pattern"));
static CRED_USER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"username\s*=\s*(\w+)").expect("username pattern"));
static CRED_PASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"password\s*=\s*(\w+)").expect("password pattern"));
static FLAG_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"FLAG\{[^}]*\}").expect("flag pattern"));

fn mutate_for_bucket<R: Rng>(bucket: Bucket, example: &mut Value, rng: &mut R) {
    match bucket {
        Bucket::Idor => {
            mutate_example(
                example,
                rng,
                &mut |text, rng| idor_rewrite(text, tables::IDOR_SOURCE_ENDPOINTS, rng),
                &mut |command, rng| {
                    idor_rewrite(command, tables::IDOR_COMMAND_SOURCE_ENDPOINTS, rng)
                },
            );
        }
        Bucket::DefaultCreds => {
            let (user, pass) = *tables::CRED_PAIRS.choose(rng).expect("cred table");
            mutate_example(
                example,
                rng,
                &mut |text, _| {
                    let text = CRED_USER_RE.replace_all(text, format!("username={user}"));
                    let text = CRED_PASS_RE.replace_all(&text, format!("password={pass}"));
                    text.replace("demo", user)
                },
                &mut |command, _| {
                    let command = CRED_USER_RE.replace_all(command, format!("username={user}"));
                    CRED_PASS_RE
                        .replace_all(&command, format!("password={pass}"))
                        .into_owned()
                },
            );
        }
        Bucket::Ssrf => {
            let payload = *tables::SSRF_PAYLOADS.choose(rng).expect("ssrf table");
            let parameter = *tables::SSRF_PARAMETERS.choose(rng).expect("ssrf params");
            mutate_example(
                example,
                rng,
                &mut |text, _| {
                    URL_RE
                        .replace_all(text, NoExpand(payload))
                        .replace("url=", &format!("{parameter}="))
                },
                &mut |command, _| URL_RE.replace_all(command, NoExpand(payload)).into_owned(),
            );
        }
        Bucket::Xss => {
            let payload = *tables::XSS_PAYLOADS.choose(rng).expect("xss table");
            mutate_example(
                example,
                rng,
                &mut |text, rng| {
                    let alert_id: u32 = rng.gen_range(1..=100);
                    SCRIPT_RE
                        .replace_all(text, NoExpand(payload))
                        .replace("alert(\"XSS\")", &format!("alert(\"{alert_id}\")"))
                },
                &mut |command, _| {
                    SCRIPT_RE
                        .replace_all(command, NoExpand(payload))
                        .into_owned()
                },
            );
        }
        Bucket::Sqli => {
            let payload = *tables::SQLI_PAYLOADS.choose(rng).expect("sqli table");
            mutate_example(
                example,
                rng,
                &mut |text, _| SQLI_RE.replace_all(text, NoExpand(payload)).into_owned(),
                &mut |command, _| SQLI_RE.replace_all(command, NoExpand(payload)).into_owned(),
            );
        }
        Bucket::Other => {
            let url = *tables::GENERAL_TARGET_URLS.choose(rng).expect("url table");
            let flag = *tables::GENERAL_FLAGS.choose(rng).expect("flag table");
            mutate_example(
                example,
                rng,
                &mut |text, _| {
                    let text = URL_PORT_RE.replace_all(text, NoExpand(url));
                    FLAG_TOKEN_RE.replace_all(&text, NoExpand(flag)).into_owned()
                },
                &mut |command, _| URL_PORT_RE.replace_all(command, NoExpand(url)).into_owned(),
            );
        }
    }
}

fn idor_rewrite<R: Rng>(text: &str, source_endpoints: &[&str], rng: &mut R) -> String {
    let mut out = text.to_string();
    for (re, label, max) in IDOR_ID_RES.iter() {
        out = re
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                let id: u64 = caps[1].parse().unwrap_or(0);
                format!("{label} {}", id + rng.gen_range(1..=*max))
            })
            .into_owned();
    }
    for endpoint in source_endpoints {
        if out.contains(endpoint) {
            let replacement = *tables::IDOR_ENDPOINTS.choose(rng).expect("endpoint table");
            out = out.replace(endpoint, replacement);
        }
    }
    out
}

/// Apply a substitution pass over every message content string and over the
/// `command` field inside each tool call's decoded arguments. Decode or
/// encode failures leave that tool call unmodified.
fn mutate_example<R: Rng>(
    example: &mut Value,
    rng: &mut R,
    content_fn: &mut dyn FnMut(&str, &mut R) -> String,
    command_fn: &mut dyn FnMut(&str, &mut R) -> String,
) {
    let Some(messages) = example.get_mut("messages").and_then(Value::as_array_mut) else {
        return;
    };

    for message in messages {
        let Some(message) = message.as_object_mut() else {
            continue;
        };

        let rewritten = message
            .get("content")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(|content| content_fn(content, rng));
        if let Some(rewritten) = rewritten {
            message.insert("content".to_string(), Value::String(rewritten));
        }

        let Some(calls) = message.get_mut("tool_calls").and_then(Value::as_array_mut) else {
            continue;
        };
        for call in calls {
            let Some(arguments) = call.pointer("/function/arguments").and_then(Value::as_str)
            else {
                continue;
            };
            let Ok(mut args) = serde_json::from_str::<Value>(arguments) else {
                continue;
            };
            let Some(command) = args.get("command").and_then(Value::as_str) else {
                continue;
            };

            let rewritten = command_fn(command, rng);
            args["command"] = Value::String(rewritten);
            if let Ok(encoded) = serde_json::to_string(&args) {
                if let Some(slot) = call.pointer_mut("/function/arguments") {
                    *slot = Value::String(encoded);
                }
            }
        }
    }
}
