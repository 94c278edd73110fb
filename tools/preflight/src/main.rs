//! Pre-training environment checks.
//!
//! Runs every check even after a failure so one invocation reports the
//! full set of problems. Exit code 0 only when all checks pass.

use chrono::Local;
use pipeline::config::RedtraceConfig;
use serde_json::Value;
use std::fs;
use std::path::Path;

const REQUIRED_CONFIG_FIELDS: [&str; 4] = ["base_model:", "datasets:", "output_dir:", "adapter:"];

fn log(level: &str, message: &str) {
    println!(
        "[{}] {level}: {message}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
}

fn main() {
    log("INFO", "Starting pre-training validation");
    log("INFO", &"=".repeat(60));

    let config = RedtraceConfig::from_env();

    let checks: [(&str, fn(&RedtraceConfig) -> bool); 5] = [
        ("Dataset Files", check_dataset_files),
        ("Tokenizer Config", check_tokenizer_config),
        ("Training Config", check_training_config),
        ("Raw Logs", check_raw_logs),
        ("Output Writability", check_output_writability),
    ];

    let mut passed = 0;
    for (name, check) in &checks {
        log("INFO", &format!("Running {name} check"));
        if check(&config) {
            passed += 1;
            log("INFO", &format!("{name}: PASSED"));
        } else {
            log("ERROR", &format!("{name}: FAILED"));
        }
    }

    log("INFO", &"=".repeat(60));
    log(
        "INFO",
        &format!("Validation results: {passed}/{} checks passed", checks.len()),
    );

    if passed == checks.len() {
        log("INFO", "All checks passed; environment is ready for training");
        std::process::exit(0);
    }
    log("ERROR", "Some checks failed; fix the issues before training");
    std::process::exit(1);
}

/// Each dataset file must exist and open with a valid JSON first line.
fn check_dataset_files(config: &RedtraceConfig) -> bool {
    let files = [
        &config.training_file,
        &config.filtered_file,
        &config.augmented_file,
    ];

    let mut ok = true;
    for path in files {
        if !path.is_file() {
            log("ERROR", &format!("{} missing", path.display()));
            ok = false;
            continue;
        }
        match fs::metadata(path) {
            Ok(meta) => log(
                "INFO",
                &format!(
                    "{} present ({:.1} MB)",
                    path.display(),
                    meta.len() as f64 / (1024.0 * 1024.0)
                ),
            ),
            Err(err) => {
                log("ERROR", &format!("{}: {err}", path.display()));
                ok = false;
                continue;
            }
        }
        if !first_line_is_json(path) {
            log(
                "ERROR",
                &format!("{} first line is not valid JSON", path.display()),
            );
            ok = false;
        }
    }
    ok
}

fn first_line_is_json(path: &Path) -> bool {
    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    let Some(first) = content.lines().next() else {
        return false;
    };
    serde_json::from_str::<Value>(first.trim()).is_ok()
}

fn check_tokenizer_config(config: &RedtraceConfig) -> bool {
    if !config.tokenizer_dir.is_dir() {
        log(
            "ERROR",
            &format!("{} directory missing", config.tokenizer_dir.display()),
        );
        return false;
    }

    let mut ok = true;
    for name in ["tokenizer_config.json", "special_tokens_map.json"] {
        let path = config.tokenizer_dir.join(name);
        let valid = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<Value>(&content).ok())
            .is_some();
        if valid {
            log("INFO", &format!("{} valid JSON", path.display()));
        } else {
            log("ERROR", &format!("{} missing or invalid", path.display()));
            ok = false;
        }
    }
    ok
}

fn check_training_config(config: &RedtraceConfig) -> bool {
    let path = &config.train_config_file;
    let Ok(content) = fs::read_to_string(path) else {
        log("ERROR", &format!("{} missing", path.display()));
        return false;
    };

    match missing_config_field(&content) {
        None => {
            log("INFO", &format!("{} has required fields", path.display()));
            true
        }
        Some(field) => {
            log(
                "ERROR",
                &format!("{} missing required field: {field}", path.display()),
            );
            false
        }
    }
}

/// Substring scan, not a YAML parse: the training stack owns full config
/// validation, this only catches forgotten sections early.
fn missing_config_field(content: &str) -> Option<&'static str> {
    REQUIRED_CONFIG_FIELDS
        .iter()
        .find(|field| !content.contains(*field))
        .copied()
}

fn check_raw_logs(config: &RedtraceConfig) -> bool {
    if config.raw_logs_dir.is_dir() {
        log(
            "INFO",
            &format!("{} directory present", config.raw_logs_dir.display()),
        );
        true
    } else {
        log(
            "ERROR",
            &format!("{} directory missing", config.raw_logs_dir.display()),
        );
        false
    }
}

/// Probe the dataset output directory with a throwaway file.
fn check_output_writability(config: &RedtraceConfig) -> bool {
    let dir = config
        .training_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let probe = dir.join(".preflight_write_probe");

    match fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            log("INFO", &format!("{} is writable", dir.display()));
            true
        }
        Err(err) => {
            log("ERROR", &format!("{} not writable: {err}", dir.display()));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_field_scan_reports_first_missing() {
        let complete = "base_model: Qwen/Qwen3-8B\ndatasets:\n  - path: data\noutput_dir: ./out\nadapter: lora\n";
        assert_eq!(missing_config_field(complete), None);

        let partial = "base_model: Qwen/Qwen3-8B\ndatasets:\n";
        assert_eq!(missing_config_field(partial), Some("output_dir:"));
    }

    #[test]
    fn first_line_json_check() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        let good = dir.path().join("good.jsonl");
        fs::write(&good, "{\"messages\": []}\nnot json\n")?;
        assert!(first_line_is_json(&good));

        let bad = dir.path().join("bad.jsonl");
        fs::write(&bad, "not json\n{\"messages\": []}\n")?;
        assert!(!first_line_is_json(&bad));

        let empty = dir.path().join("empty.jsonl");
        fs::write(&empty, "")?;
        assert!(!first_line_is_json(&empty));
        Ok(())
    }
}
