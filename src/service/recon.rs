//! Database orchestration around the pure pipeline.

use chrono::Duration;
use sqlx::MySqlPool;

use crate::db::queries;
use crate::error::ReconError;
use crate::import::{self, RawDetrafFields};
use crate::models::BillingContext;
use crate::resolver::EotResolver;
use crate::service::matcher::MATCH_TOLERANCE_SECS;
use crate::service::pipeline::{self, ReconOutput};

/// Outcome of a DETRAF import: how many lines arrived, how many survived
/// field validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub total: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// One reconciliation service per database. A run owns the working tables
/// exclusively; overlapping runs against the same schema are not supported.
pub struct ReconService {
    pool: MySqlPool,
}

impl ReconService {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Validate and persist already-sliced DETRAF lines, replacing any
    /// previous batch. Invalid lines are counted and skipped, never fatal.
    ///
    /// The fixed-width layout varies per carrier, so cutting each line into
    /// [`RawDetrafFields`] is the embedding host's job; the bundled binary
    /// only runs reconciliation over a batch imported this way.
    pub async fn import_batch(
        &self,
        lines: Vec<RawDetrafFields>,
    ) -> Result<ImportSummary, ReconError> {
        let total = lines.len();
        let mut rows = Vec::with_capacity(total);
        for (idx, line) in lines.iter().enumerate() {
            match import::build_record(line) {
                Ok(row) => rows.push(row),
                Err(e) => tracing::debug!("skipping DETRAF line {}: {e}", idx + 1),
            }
        }
        let skipped = total - rows.len();
        if skipped > 0 {
            tracing::warn!("{skipped} of {total} DETRAF lines failed field validation");
        }

        queries::truncate_detraf(&self.pool).await?;
        queries::insert_detraf(&self.pool, &rows).await?;
        tracing::info!("imported {} DETRAF rows", rows.len());

        Ok(ImportSummary {
            total,
            inserted: rows.len(),
            skipped,
        })
    }

    /// Full reconciliation for one YYYYMM reference period: load the batch
    /// window and the CDR slice, prefetch reference data, run the pure
    /// pipeline and persist its results.
    pub async fn run(&self, period: &str) -> Result<ReconOutput, ReconError> {
        let billing = BillingContext::from_period(period)?;
        tracing::info!(
            "billing window {} -> {} (period {period})",
            billing.window_start,
            billing.window_end
        );

        queries::reset_working_tables(&self.pool).await?;

        let (min, max) = queries::batch_window(&self.pool)
            .await?
            .ok_or(ReconError::EmptyBatch)?;
        let tolerance = Duration::seconds(MATCH_TOLERANCE_SECS);

        let (batch, calls) = futures::try_join!(
            queries::load_detraf(&self.pool, min, max),
            queries::load_cdr(&self.pool, min - tolerance, max + tolerance),
        )?;
        tracing::info!(
            "loaded {} DETRAF rows and {} CDR rows for {} -> {}",
            batch.len(),
            calls.len(),
            min,
            max
        );

        // Reference sources are best effort: an unreachable table degrades
        // every resolve to "no authoritative answer", it never aborts the run.
        let numbers = pipeline::candidate_numbers(&batch, &calls);
        let portability = match queries::load_portability(&self.pool, &numbers).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("portability registry unavailable, degrading: {e}");
                Vec::new()
            }
        };
        let ranges = match queries::load_cadup(&self.pool).await {
            Ok(ranges) => ranges,
            Err(e) => {
                tracing::warn!("CADUP unavailable, degrading: {e}");
                Vec::new()
            }
        };
        let resolver = EotResolver::new(portability, ranges);

        let output = pipeline::reconcile(&batch, &calls, &resolver, &billing)?;
        queries::insert_results(&self.pool, &output.results).await?;

        let s = &output.summary;
        tracing::info!(
            "run complete: {} total, {} reconciled, {} error, {} lost ({} unparseable), {} outdated entries",
            s.total, s.reconciled, s.errors, s.lost, s.unparseable, s.outdated_entries
        );
        Ok(output)
    }
}
