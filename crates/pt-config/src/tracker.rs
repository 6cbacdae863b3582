//! Typed view of the merged configuration.
//!
//! ```yaml
//! devices:            # station id -> stage (code or label)
//!   "1": cut
//!   "2": corner_cleaned
//!   "3": stored
//! day_boundary:
//!   tz: Asia/Shanghai # or: utc_offset_hours: 8
//! roles:
//!   cutter: [scheduled, cut]
//!   manager: all
//! admin_roles: [admin]
//! audit:
//!   path: ./audit/reconcile.jsonl
//!   hash_chain: true
//! ```
//!
//! Every section is optional. Missing `devices` means the standard
//! three-station table; missing `day_boundary` means UTC.

use anyhow::{anyhow, bail, Context, Result};
use pt_aggregate::DayBoundary;
use pt_lifecycle::LifecycleStatus;
use pt_reconcile::DeviceStageTable;
use pt_view::{AllowedStatuses, RolePermissions};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSettings {
    pub path: Option<String>,
    pub hash_chain: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            path: None,
            hash_chain: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub devices: DeviceStageTable,
    pub day_boundary: DayBoundary,
    pub permissions: RolePermissions,
    pub audit: AuditSettings,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            devices: DeviceStageTable::standard(),
            day_boundary: DayBoundary::Utc,
            permissions: RolePermissions::default(),
            audit: AuditSettings::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_json(config: &Value) -> Result<Self> {
        Ok(Self {
            devices: read_devices(config.pointer("/devices"))?,
            day_boundary: read_day_boundary(config.pointer("/day_boundary"))?,
            permissions: read_permissions(
                config.pointer("/roles"),
                config.pointer("/admin_roles"),
            )?,
            audit: read_audit(config)?,
        })
    }
}

fn read_devices(v: Option<&Value>) -> Result<DeviceStageTable> {
    let Some(v) = v else {
        return Ok(DeviceStageTable::standard());
    };
    let map = v
        .as_object()
        .ok_or_else(|| anyhow!("CONFIG_INVALID /devices must be a mapping"))?;

    let mut table = DeviceStageTable::empty();
    for (device, stage) in map {
        let raw = stage
            .as_str()
            .ok_or_else(|| anyhow!("CONFIG_INVALID /devices/{device} must be a status string"))?;
        let status: LifecycleStatus = raw
            .parse()
            .with_context(|| format!("CONFIG_INVALID /devices/{device}"))?;
        if status.is_scan_only() {
            bail!("CONFIG_INVALID /devices/{device}: '{raw}' is not a production stage");
        }
        table.insert(device.trim(), status);
    }
    Ok(table)
}

fn read_day_boundary(v: Option<&Value>) -> Result<DayBoundary> {
    match v {
        None | Some(Value::Null) => Ok(DayBoundary::Utc),
        Some(Value::String(s)) => s
            .parse::<DayBoundary>()
            .with_context(|| "CONFIG_INVALID /day_boundary".to_string()),
        Some(Value::Object(obj)) => {
            let tz = obj.get("tz").and_then(Value::as_str);
            let hours = obj.get("utc_offset_hours");
            match (tz, hours) {
                (Some(_), Some(_)) => {
                    bail!("CONFIG_INVALID /day_boundary: set tz or utc_offset_hours, not both")
                }
                (Some(tz), None) => tz
                    .parse::<DayBoundary>()
                    .with_context(|| "CONFIG_INVALID /day_boundary/tz".to_string()),
                (None, Some(h)) => {
                    let h = h
                        .as_i64()
                        .and_then(|h| i32::try_from(h).ok())
                        .ok_or_else(|| {
                            anyhow!("CONFIG_INVALID /day_boundary/utc_offset_hours must be an integer")
                        })?;
                    DayBoundary::fixed_hours(h).ok_or_else(|| {
                        anyhow!("CONFIG_INVALID /day_boundary/utc_offset_hours out of range: {h}")
                    })
                }
                (None, None) => Ok(DayBoundary::Utc),
            }
        }
        Some(_) => bail!("CONFIG_INVALID /day_boundary must be a string or mapping"),
    }
}

fn read_permissions(roles: Option<&Value>, admins: Option<&Value>) -> Result<RolePermissions> {
    let mut perms = RolePermissions::new();

    if let Some(roles) = roles {
        let map = roles
            .as_object()
            .ok_or_else(|| anyhow!("CONFIG_INVALID /roles must be a mapping"))?;
        for (role, entry) in map {
            let entries = string_list(entry)
                .with_context(|| format!("CONFIG_INVALID /roles/{role}"))?;
            let allowed = AllowedStatuses::from_entries(entries.iter().map(String::as_str))
                .with_context(|| format!("CONFIG_INVALID /roles/{role}"))?;
            perms = perms.with_role(role.clone(), allowed);
        }
    }

    if let Some(admins) = admins {
        for role in string_list(admins).context("CONFIG_INVALID /admin_roles")? {
            perms = perms.with_admin(role);
        }
    }

    Ok(perms)
}

fn read_audit(config: &Value) -> Result<AuditSettings> {
    let path = match config.pointer("/audit/path") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(_) => bail!("CONFIG_INVALID /audit/path must be a non-empty string"),
    };
    let hash_chain = match config.pointer("/audit/hash_chain") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(_) => bail!("CONFIG_INVALID /audit/hash_chain must be a bool"),
    };
    Ok(AuditSettings { path, hash_chain })
}

/// A single string or a list of strings.
fn string_list(v: &Value) -> Result<Vec<String>> {
    match v {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|i| {
                i.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("expected a string, got {i}"))
            })
            .collect(),
        other => bail!("expected a string or list of strings, got {other}"),
    }
}
