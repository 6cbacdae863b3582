//! Unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes. A leaf under any consumed
//! prefix is consumed; every other leaf is unused. Callers decide whether
//! unused keys warn or fail.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Consumed prefixes used for this analysis (sorted, unique).
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Every section `TrackerConfig::from_json` reads.
///
/// Keep in step with the reads in `tracker.rs`; do not list sections that
/// are merely planned.
pub fn consumed_pointers() -> &'static [&'static str] {
    &[
        "/devices",
        "/day_boundary",
        "/roles",
        "/admin_roles",
        "/audit/path",
        "/audit/hash_chain",
    ]
}

pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = consumed_pointers()
        .iter()
        .map(|p| normalize_pointer(p))
        .collect();
    let consumed_prefixes: Vec<String> = consumed.into_iter().collect();

    let mut unused: Vec<String> = leaf_pointers(config_json)
        .into_iter()
        .filter(|lp| !consumed_prefixes.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
            Remove them or update the consumed registry. First few: {}",
            report.unused_leaf_pointers.len(),
            preview_list(&report.unused_leaf_pointers, 12)
        );
    }

    Ok(report)
}

// JSON-pointer helpers shared with the secret scan in lib.rs.

/// Leading "/" required, no trailing "/" unless root.
fn normalize_pointer(p: &str) -> String {
    let body = p.trim().trim_end_matches('/');
    if body.starts_with('/') {
        body.to_string()
    } else {
        format!("/{body}")
    }
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc". "/" consumes all.
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    match leaf.strip_prefix(prefix) {
        _ if prefix == "/" => true,
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Every scalar in `v`, as an escaped pointer. Empty containers contribute
/// nothing; a bare scalar document yields `"/"`.
pub(crate) fn leaf_pointers(v: &Value) -> Vec<String> {
    fn walk(v: &Value, at: &mut String, out: &mut Vec<String>) {
        let mark = at.len();
        match v {
            Value::Object(map) => {
                for (k, child) in map {
                    at.push('/');
                    at.push_str(&k.replace('~', "~0").replace('/', "~1"));
                    walk(child, at, out);
                    at.truncate(mark);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    at.push('/');
                    at.push_str(&i.to_string());
                    walk(child, at, out);
                    at.truncate(mark);
                }
            }
            _ => out.push(if at.is_empty() { "/".to_string() } else { at.clone() }),
        }
    }

    let mut out = Vec::new();
    walk(v, &mut String::new(), &mut out);
    out
}

fn preview_list(items: &[String], n: usize) -> String {
    let shown = items.iter().take(n).map(String::as_str).collect::<Vec<_>>().join(", ");
    match items.len().saturating_sub(n) {
        0 => format!("[{shown}]"),
        more => format!("[{shown}] (+{more} more)"),
    }
}
