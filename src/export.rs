//! CSV reports: the detailed reconciliation view and the outdated-registry
//! list, written to timestamped files under the export directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::Writer;

use crate::error::ReconError;
use crate::models::{OutdatedEntry, ReconciliationResult};

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Absolute time difference rendered as MM:SS.
fn diff_mmss(secs: i64) -> String {
    let abs = secs.abs();
    format!("{:02}:{:02}", abs / 60, abs % 60)
}

fn stamped(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!(
        "{stem}_{}.csv",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Detailed per-record report, ordered status -> timestamp -> error code.
pub fn export_results(
    results: &[ReconciliationResult],
    dir: &Path,
) -> Result<PathBuf, ReconError> {
    fs::create_dir_all(dir)?;
    let path = stamped(dir, "reconciliation");

    let mut ordered: Vec<&ReconciliationResult> = results.iter().collect();
    ordered.sort_by_key(|r| {
        (
            r.status.sort_rank(),
            r.batch_time,
            r.error_code.map(|c| c.code()).unwrap_or(0),
        )
    });

    let mut writer = Writer::from_writer(fs::File::create(&path)?);
    writer.write_record([
        "status",
        "time_diff",
        "batch_time",
        "a_number",
        "b_number",
        "claimed_eot_a",
        "claimed_eot_b",
        "cdr_id",
        "cdr_eot_a",
        "cdr_eot_b",
        "error_code",
        "notes",
    ])?;
    for r in ordered {
        writer.write_record([
            r.status.as_str().to_string(),
            r.diff_secs.map(diff_mmss).unwrap_or_default(),
            r.batch_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.a_number.clone(),
            r.b_number.clone(),
            opt(&r.claimed_eot_a),
            opt(&r.claimed_eot_b),
            r.cdr_id.map(|id| id.to_string()).unwrap_or_default(),
            opt(&r.cdr_eot_a),
            opt(&r.cdr_eot_b),
            r.error_code.map(|c| c.to_string()).unwrap_or_default(),
            r.observation().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    tracing::info!("wrote {} ({} rows)", path.display(), results.len());
    Ok(path)
}

/// Outdated-registry report: numbers whose CDR code no longer matches the
/// reference sources.
pub fn export_outdated(entries: &[OutdatedEntry], dir: &Path) -> Result<PathBuf, ReconError> {
    fs::create_dir_all(dir)?;
    let path = stamped(dir, "outdated_eot");

    let mut writer = Writer::from_writer(fs::File::create(&path)?);
    writer.write_record(["number", "cdr_eot", "authoritative_eot", "effective_since"])?;
    for e in entries {
        writer.write_record([
            e.number.clone(),
            opt(&e.cdr_eot),
            e.authoritative_eot.clone(),
            e.effective_since
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    tracing::info!("wrote {} ({} rows)", path.display(), entries.len());
    Ok(path)
}
