//! Command handlers for ptk.
//!
//! Shared helpers live here; the reconciliation commands live in
//! `tracker`.

pub mod tracker;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use pt_aggregate::TimeWindow;
use pt_audit::VerifyResult;
use pt_config::{LoadedConfig, TrackerConfig, UnusedKeyPolicy};
use serde::de::DeserializeOwned;
use std::fs;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Read a JSON file, tolerating a UTF-8 BOM (spreadsheet exports add one).
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {path} failed"))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let raw = std::str::from_utf8(bytes).with_context(|| format!("{path} must be UTF-8 text"))?;
    serde_json::from_str(raw.trim()).with_context(|| format!("{path} must contain valid JSON"))
}

/// Merge `paths`; no paths means every section takes its default.
pub fn load_config(paths: &[String]) -> Result<(LoadedConfig, TrackerConfig)> {
    let loaded = if paths.is_empty() {
        LoadedConfig::empty()
    } else {
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        pt_config::load_layered_yaml(&refs)?
    };
    let tracker = loaded.tracker()?;
    tracing::debug!(config_hash = %loaded.config_hash, "config loaded");
    Ok((loaded, tracker))
}

pub fn window(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> TimeWindow {
    TimeWindow {
        start: from,
        end: to,
    }
}

// ---------------------------------------------------------------------------
// config-hash / audit verify
// ---------------------------------------------------------------------------

pub fn config_hash(paths: &[String], policy: UnusedKeyPolicy) -> Result<()> {
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = pt_config::load_layered_yaml(&refs)?;
    let report = pt_config::report_unused_keys(&loaded.config_json, policy)?;
    for p in &report.unused_leaf_pointers {
        tracing::warn!(pointer = %p, "unused config key");
    }

    // Typed sections must parse too, or the hash describes a config no
    // pass could run under.
    loaded.tracker()?;

    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

pub fn audit_verify(path: &str) -> Result<()> {
    match pt_audit::verify_hash_chain(path)? {
        VerifyResult::Valid { lines } => {
            println!("audit_chain=valid lines={lines}");
            Ok(())
        }
        VerifyResult::Broken { line, reason } => {
            println!("audit_chain=broken line={line}");
            bail!("AUDIT_CHAIN_BROKEN line={line}: {reason}")
        }
    }
}
