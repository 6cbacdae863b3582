use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pt_aggregate::{group_by_status, Aggregator, TimeWindow};
use pt_audit::AuditWriter;
use pt_config::TrackerConfig;
use pt_reconcile::reconcile_with;
use pt_schemas::{ScanEvent, Unit};
use pt_sync::{FixedClock, InMemoryStore, SyncPass, UnitFilter};
use pt_view::filter_json_by_permission;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use super::{load_config, read_json};

fn print_json<T: Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v).context("json stringify failed")?);
    Ok(())
}

fn load_snapshot(units: &str, scans: &str) -> Result<(Vec<Unit>, Vec<ScanEvent>)> {
    let u: Vec<Unit> = read_json(units)?;
    let s: Vec<ScanEvent> = read_json(scans)?;
    info!(units = u.len(), scans = s.len(), "snapshot loaded");
    Ok((u, s))
}

fn sync_pass(store: &Arc<InMemoryStore>, cfg: &TrackerConfig) -> SyncPass {
    SyncPass::new(store.clone(), store.clone())
        .with_devices(cfg.devices.clone())
        .with_day_boundary(cfg.day_boundary)
        .with_permissions(Arc::new(cfg.permissions.clone()))
}

pub fn match_one(raw: &str, device: &str, config_paths: &[String]) -> Result<()> {
    let (_, cfg) = load_config(config_paths)?;
    let m = cfg
        .devices
        .match_barcode(raw, device)
        .with_context(|| format!("cannot match scan '{raw}'"))?;
    print_json(&m)
}

pub async fn reconcile(
    units_path: &str,
    scans_path: &str,
    config_paths: &[String],
    apply: bool,
    audit_path: Option<&str>,
) -> Result<()> {
    let (loaded, cfg) = load_config(config_paths)?;
    let (units, scans) = load_snapshot(units_path, scans_path)?;

    if !apply {
        let report = reconcile_with(&units, &scans, &cfg.devices);
        return print_json(&report);
    }

    let store = Arc::new(InMemoryStore::from_snapshot(units, scans));
    let mut pass = sync_pass(&store, &cfg);
    if let Some(path) = audit_path.or(cfg.audit.path.as_deref()) {
        let writer = AuditWriter::resume(path, cfg.audit.hash_chain)?;
        pass = pass.with_audit(Arc::new(Mutex::new(writer)));
    }

    info!(config_hash = %loaded.config_hash, "applying reconciliation");
    let outcome = pass.run(&UnitFilter::all()).await?;

    let updated = store.units().await;
    let body = serde_json::to_string_pretty(&updated).context("json stringify failed")?;
    fs::write(units_path, body).with_context(|| format!("write {units_path} failed"))?;

    print_json(&outcome)
}

pub fn aggregate(
    units_path: &str,
    scans_path: &str,
    config_paths: &[String],
    now: DateTime<Utc>,
    window: TimeWindow,
) -> Result<()> {
    let (_, cfg) = load_config(config_paths)?;
    let (units, scans) = load_snapshot(units_path, scans_path)?;
    let report = reconcile_with(&units, &scans, &cfg.devices);
    let agg = Aggregator::new(cfg.day_boundary).aggregate(&report.views, &window, now);
    print_json(&agg)
}

pub async fn dashboard(
    units_path: &str,
    scans_path: &str,
    config_paths: &[String],
    now: DateTime<Utc>,
    role: &str,
    window: TimeWindow,
) -> Result<()> {
    let (_, cfg) = load_config(config_paths)?;
    let (units, scans) = load_snapshot(units_path, scans_path)?;
    let store = Arc::new(InMemoryStore::from_snapshot(units, scans));
    let pass = sync_pass(&store, &cfg).with_clock(Arc::new(FixedClock(now)));
    let d = pass.dashboard(role, &window).await?;
    print_json(&d)
}

/// Resolved views per status bucket. Without a role every bucket is shown.
pub fn queue(
    units_path: &str,
    scans_path: &str,
    config_paths: &[String],
    role: Option<&str>,
    window: TimeWindow,
) -> Result<()> {
    let (_, cfg) = load_config(config_paths)?;
    let (units, scans) = load_snapshot(units_path, scans_path)?;
    let report = reconcile_with(&units, &scans, &cfg.devices);

    let grouped = serde_json::to_value(group_by_status(&report.views, &window))
        .context("json stringify failed")?;
    let out = match role {
        Some(role) => filter_json_by_permission(&grouped, &cfg.permissions.allowed_for(role)),
        None => grouped,
    };
    print_json(&out)
}
