use std::env;
use std::path::PathBuf;

// ── Default paths (relative to the working directory) ───────────────────

const DEFAULT_RAW_LOGS_REL: &str = "data/logs/passed";
const DEFAULT_TRAINING_REL: &str = "data/training_data.jsonl";
const DEFAULT_FILTERED_REL: &str = "data/filtered_data.jsonl";
const DEFAULT_AUGMENTED_REL: &str = "data/augmented_training_data.jsonl";
const DEFAULT_TOKENIZER_REL: &str = "tokenizer_security";
const DEFAULT_TRAIN_CONFIG_REL: &str = "config/training.yml";

// ── Default thresholds ──────────────────────────────────────────────────

const DEFAULT_MIN_TOOL_CALLS: usize = 1;
const DEFAULT_MIN_RESPONSE_LENGTH: usize = 50;
const DEFAULT_AUGMENTATION_FACTOR: f64 = 0.3;

// ── Config struct ───────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct RedtraceConfig {
    pub raw_logs_dir: PathBuf,
    pub training_file: PathBuf,
    pub filtered_file: PathBuf,
    pub augmented_file: PathBuf,
    pub tokenizer_dir: PathBuf,
    pub train_config_file: PathBuf,
    pub min_tool_calls: usize,
    pub min_response_length: usize,
    pub augmentation_factor: f64,
    /// Optional fixed seed for the augmenter's random source.
    pub augment_seed: Option<u64>,
}

impl RedtraceConfig {
    pub fn from_env() -> Self {
        Self {
            raw_logs_dir: env_path("REDTRACE_RAW_LOGS", DEFAULT_RAW_LOGS_REL),
            training_file: env_path("REDTRACE_TRAINING_FILE", DEFAULT_TRAINING_REL),
            filtered_file: env_path("REDTRACE_FILTERED_FILE", DEFAULT_FILTERED_REL),
            augmented_file: env_path("REDTRACE_AUGMENTED_FILE", DEFAULT_AUGMENTED_REL),
            tokenizer_dir: env_path("REDTRACE_TOKENIZER_DIR", DEFAULT_TOKENIZER_REL),
            train_config_file: env_path("REDTRACE_TRAIN_CONFIG", DEFAULT_TRAIN_CONFIG_REL),
            min_tool_calls: env_usize("REDTRACE_MIN_TOOL_CALLS", DEFAULT_MIN_TOOL_CALLS),
            min_response_length: env_usize(
                "REDTRACE_MIN_RESPONSE_LENGTH",
                DEFAULT_MIN_RESPONSE_LENGTH,
            ),
            augmentation_factor: env_f64(
                "REDTRACE_AUGMENT_FACTOR",
                DEFAULT_AUGMENTATION_FACTOR,
            ),
            augment_seed: env::var("REDTRACE_AUGMENT_SEED")
                .ok()
                .and_then(|v| v.parse::<u64>().ok()),
        }
    }
}

fn env_path(key: &str, default_rel: &str) -> PathBuf {
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => expand_tilde(&val),
        _ => PathBuf::from(default_rel),
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    match env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    match env::var(key) {
        Ok(val) => val.parse::<f64>().unwrap_or(default),
        Err(_) => default,
    }
}

fn expand_tilde(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}
