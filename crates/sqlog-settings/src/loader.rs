//! Options loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HandlerOptions::default()`]
//! 2. If the options file exists, deep-merge its values over the defaults
//! 3. Apply `SQLOG_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use sqlog_core::Level;
use tracing::debug;

use crate::errors::Result;
use crate::options::HandlerOptions;

/// Load options from a JSON file with env var overrides.
///
/// A missing file yields the defaults. Invalid JSON or an invalid final
/// configuration is an error.
pub fn load_options_from_path(path: &Path) -> Result<HandlerOptions> {
    let defaults = serde_json::to_value(HandlerOptions::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading handler options from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "options file not found, using defaults");
        defaults
    };

    let mut options: HandlerOptions = serde_json::from_value(merged)?;
    apply_env_overrides(&mut options);
    options.validate()?;
    Ok(options)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded options.
///
/// Invalid values are logged and ignored (fall back to file/default).
pub fn apply_env_overrides(options: &mut HandlerOptions) {
    if let Some(v) = read_env_level("SQLOG_LEVEL") {
        options.level = v;
    }
    if let Some(v) = read_env_u64("SQLOG_MAX_ROWS", 1, u64::from(u32::MAX)) {
        options.max_rows_per_slot = v;
    }
    if let Some(v) = read_env_u32("SQLOG_NUM_FILES", 1, 10_000) {
        options.num_slots = v;
    }
    if let Some(v) = read_env_bool("SQLOG_NO_COLOR") {
        options.no_color = v;
    }
    if let Some(v) = read_env_string("SQLOG_DIR") {
        options.directory = Some(PathBuf::from(v));
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_level(name: &str) -> Option<Level> {
    let val = std::env::var(name).ok()?;
    let result = val.parse::<Level>().ok();
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid level env var, ignoring");
    }
    result
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": 10});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 10);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_skips_nulls() {
        let target = serde_json::json!({"level": "info"});
        let source = serde_json::json!({"level": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["level"], "info");
    }

    #[test]
    fn merge_adds_new_keys() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"directory": "/var/log/app"});
        let merged = deep_merge(target, source);
        assert_eq!(merged["directory"], "/var/log/app");
    }

    // ── load_options_from_path ──────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let opts = load_options_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(opts.max_rows_per_slot, HandlerOptions::default().max_rows_per_slot);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlog.json");
        std::fs::write(&path, r#"{"level": "debug", "numSlots": 3, "noColor": true}"#).unwrap();

        let opts = load_options_from_path(&path).unwrap();
        assert_eq!(opts.level, Level::Debug);
        assert_eq!(opts.num_slots, 3);
        assert!(opts.no_color);
        assert_eq!(opts.max_rows_per_slot, 50_000);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlog.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_matches!(load_options_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlog.json");
        std::fs::write(&path, r#"{"numSlots": 0}"#).unwrap();
        assert_matches!(
            load_options_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        );
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u32_range("7", 1, 100), Some(7));
        assert_eq!(parse_u32_range("0", 1, 100), None);
        assert_eq!(parse_u32_range("abc", 1, 100), None);
        assert_eq!(parse_u64_range("50000", 1, 100_000), Some(50_000));
        assert_eq!(parse_u64_range("200000", 1, 100_000), None);
    }
}
