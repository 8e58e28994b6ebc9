//! Pure reconciliation pipeline: owns the whole window in memory, no IO.
//!
//! Sequencing: working window from the batch min/max timestamps, CDR slice
//! restricted to it, canonicalization of both sides, nearest-in-window
//! matching, per-record classification (parallel, re-sorted afterwards) and
//! the deduplicated outdated-registry set.

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::error::{NormalizeError, ReconError};
use crate::models::{
    BillingContext, CdrRecord, DetrafRecord, OutdatedEntry, ReconStatus,
    ReconciliationResult, RunSummary,
};
use crate::normalize::{normalize, NumberRole};
use crate::resolver::EotResolver;
use crate::service::classifier::classify;
use crate::service::matcher::{match_window, PreparedCdr, PreparedDetraf, MATCH_TOLERANCE_SECS};

/// Everything one run produces.
#[derive(Debug)]
pub struct ReconOutput {
    pub results: Vec<ReconciliationResult>,
    pub outdated: Vec<OutdatedEntry>,
    pub summary: RunSummary,
}

const ACCOUNT_RECOVERY_TAG: &str = "ACCOUNT_RECOVERY";

/// A batch record whose numbers cannot be canonicalized is unmatchable, but
/// it must not vanish: it surfaces as `Lost` with a distinct note.
fn unparseable_result(
    rec: &DetrafRecord,
    side: &str,
    raw: &str,
    err: &NormalizeError,
    billing: &BillingContext,
) -> ReconciliationResult {
    let mut notes = vec![format!("unparseable {side} number {raw:?}: {err}")];
    if !billing.contains(rec.data_hora) {
        notes.push(ACCOUNT_RECOVERY_TAG.to_string());
    }
    ReconciliationResult {
        detraf_id: rec.id,
        cdr_id: None,
        status: ReconStatus::Lost,
        error_code: None,
        diff_secs: None,
        batch_time: rec.data_hora,
        a_number: rec.assinante_a_numero.clone(),
        b_number: rec.assinante_b_numero.clone(),
        claimed_eot_a: rec.eot_de_a.clone(),
        claimed_eot_b: rec.eot_de_b.clone(),
        cdr_eot_a: None,
        cdr_eot_b: None,
        notes,
    }
}

/// Canonicalize the batch side. Records with unparseable numbers come back
/// separately, already classified.
fn prepare_batch(
    batch: &[DetrafRecord],
    billing: &BillingContext,
) -> (Vec<PreparedDetraf>, Vec<ReconciliationResult>) {
    let mut prepared = Vec::with_capacity(batch.len());
    let mut unparseable = Vec::new();

    for rec in batch {
        let a = match normalize(&rec.assinante_a_numero, NumberRole::A, None) {
            Ok(a) => a,
            Err(e) => {
                unparseable.push(unparseable_result(rec, "A", &rec.assinante_a_numero, &e, billing));
                continue;
            }
        };
        let b = match normalize(&rec.assinante_b_numero, NumberRole::B, a.area_code()) {
            Ok(b) => b,
            Err(e) => {
                unparseable.push(unparseable_result(rec, "B", &rec.assinante_b_numero, &e, billing));
                continue;
            }
        };
        prepared.push(PreparedDetraf {
            rec: rec.clone(),
            a,
            b,
        });
    }
    (prepared, unparseable)
}

/// Canonicalize the CDR side, restricted to the working window. Rows that
/// fail normalization cannot participate in matching and are dropped.
fn prepare_calls(
    calls: &[CdrRecord],
    window: (chrono::NaiveDateTime, chrono::NaiveDateTime),
) -> Vec<PreparedCdr> {
    let from = window.0 - chrono::Duration::seconds(MATCH_TOLERANCE_SECS);
    let to = window.1 + chrono::Duration::seconds(MATCH_TOLERANCE_SECS);

    let mut prepared = Vec::with_capacity(calls.len());
    let mut dropped = 0usize;
    for rec in calls {
        if rec.calldate < from || rec.calldate > to {
            continue;
        }
        let Ok(a) = normalize(&rec.src, NumberRole::A, None) else {
            dropped += 1;
            continue;
        };
        let hint = a.area_code().map(str::to_string);
        let Ok(b) = normalize(&rec.dst, NumberRole::B, hint.as_deref()) else {
            dropped += 1;
            continue;
        };
        prepared.push(PreparedCdr {
            rec: rec.clone(),
            a,
            b,
        });
    }
    if dropped > 0 {
        tracing::debug!("dropped {dropped} CDR rows with unparseable numbers");
    }
    prepared
}

/// Distinct canonical numbers appearing on either side of either source,
/// in sorted order. Drives the portability-registry prefetch; numbers that
/// fail normalization cannot be resolved and are skipped.
pub fn candidate_numbers(batch: &[DetrafRecord], calls: &[CdrRecord]) -> Vec<String> {
    let mut numbers = std::collections::BTreeSet::new();
    for rec in batch {
        if let Ok(a) = normalize(&rec.assinante_a_numero, NumberRole::A, None) {
            if let Ok(b) = normalize(&rec.assinante_b_numero, NumberRole::B, a.area_code()) {
                numbers.insert(b.as_str().to_string());
            }
            numbers.insert(a.as_str().to_string());
        }
    }
    for rec in calls {
        if let Ok(a) = normalize(&rec.src, NumberRole::A, None) {
            let hint = a.area_code().map(str::to_string);
            if let Ok(b) = normalize(&rec.dst, NumberRole::B, hint.as_deref()) {
                numbers.insert(b.as_str().to_string());
            }
            numbers.insert(a.as_str().to_string());
        }
    }
    numbers.into_iter().collect()
}

/// Run one full reconciliation over pre-loaded data.
///
/// An empty batch is fatal: the run produces zero results rather than a
/// partial output. Individual malformed records never abort the run.
pub fn reconcile(
    batch: &[DetrafRecord],
    calls: &[CdrRecord],
    resolver: &EotResolver,
    billing: &BillingContext,
) -> Result<ReconOutput, ReconError> {
    let window = batch
        .iter()
        .map(|r| r.data_hora)
        .fold(None, |acc: Option<(_, _)>, t| match acc {
            None => Some((t, t)),
            Some((min, max)) => Some((min.min(t), max.max(t))),
        })
        .ok_or(ReconError::EmptyBatch)?;

    let (prepared_batch, mut results) = prepare_batch(batch, billing);
    let unparseable = results.len();
    let prepared_calls = prepare_calls(calls, window);
    tracing::info!(
        "working window {} -> {}: {} batch records ({} unparseable), {} CDR rows",
        window.0,
        window.1,
        batch.len(),
        unparseable,
        prepared_calls.len()
    );

    let matches = match_window(&prepared_batch, &prepared_calls);

    let classified: Vec<_> = prepared_batch
        .par_iter()
        .map(|p| classify(p, matches.get(&p.rec.id), resolver, billing))
        .collect();

    // Dedup on the code triple, first observation wins; sequential merge in
    // batch order keeps the report deterministic.
    let mut outdated: IndexMap<_, OutdatedEntry> = IndexMap::new();
    for out in &classified {
        for entry in &out.outdated {
            outdated.entry(entry.key()).or_insert_with(|| entry.clone());
        }
    }

    results.extend(classified.into_iter().map(|c| c.result));
    results.sort_by_key(|r| r.detraf_id);
    let outdated: Vec<OutdatedEntry> = outdated.into_values().collect();

    let summary = RunSummary {
        total: results.len(),
        reconciled: results
            .iter()
            .filter(|r| r.status == ReconStatus::Reconciled)
            .count(),
        errors: results.iter().filter(|r| r.status == ReconStatus::Error).count(),
        lost: results.iter().filter(|r| r.status == ReconStatus::Lost).count(),
        unparseable,
        outdated_entries: outdated.len(),
    };

    Ok(ReconOutput {
        results,
        outdated,
        summary,
    })
}
