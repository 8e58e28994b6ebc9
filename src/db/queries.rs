use chrono::NaiveDateTime;
use sqlx::{MySqlPool, QueryBuilder};

use crate::models::{
    CdrRecord, DetrafImport, DetrafRecord, PortabilityEntry, RangeAssignment,
    ReconciliationResult,
};

/// IN-list / VALUES chunk size, keeps statements within server limits.
pub const CHUNK_SIZE: usize = 1000;

/// Min/max timestamp and row count of the imported DETRAF batch.
pub async fn batch_window(
    pool: &MySqlPool,
) -> Result<Option<(NaiveDateTime, NaiveDateTime)>, sqlx::Error> {
    let row: (Option<NaiveDateTime>, Option<NaiveDateTime>, i64) = sqlx::query_as(
        r#"
        SELECT MIN(data_hora), MAX(data_hora), COUNT(*)
        FROM detraf
        "#,
    )
    .fetch_one(pool)
    .await?;

    match row {
        (Some(min), Some(max), n) if n > 0 => Ok(Some((min, max))),
        _ => Ok(None),
    }
}

pub async fn load_detraf(
    pool: &MySqlPool,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<DetrafRecord>, sqlx::Error> {
    sqlx::query_as::<_, DetrafRecord>(
        r#"
        SELECT id, sequencial, assinante_a_numero, eot_de_a,
               assinante_b_numero, eot_de_b, data_hora
        FROM detraf
        WHERE data_hora BETWEEN ? AND ?
        ORDER BY id
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// CDR slice for the working window (already widened by the matching
/// tolerance by the caller).
pub async fn load_cdr(
    pool: &MySqlPool,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<CdrRecord>, sqlx::Error> {
    sqlx::query_as::<_, CdrRecord>(
        r#"
        SELECT id, calldate, src, dst,
               EOT_A AS eot_a, EOT_B AS eot_b,
               duration, billsec, disposition
        FROM cdr
        WHERE calldate BETWEEN ? AND ?
        ORDER BY id
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// IN-list statement for one chunk of canonical numbers.
fn portability_chunk_query(chunk: &[String]) -> QueryBuilder<'_, sqlx::MySql> {
    let mut qb = QueryBuilder::new(
        "SELECT numero AS number, eot, data_janela AS effective_since \
         FROM numeros_portados WHERE numero IN (",
    );
    let mut separated = qb.separated(", ");
    for number in chunk {
        separated.push_bind(number);
    }
    qb.push(")");
    qb
}

/// All portability entries for the given canonical numbers, chunked to keep
/// the IN list bounded.
pub async fn load_portability(
    pool: &MySqlPool,
    numbers: &[String],
) -> Result<Vec<PortabilityEntry>, sqlx::Error> {
    let mut entries = Vec::new();
    for chunk in numbers.chunks(CHUNK_SIZE) {
        let mut qb = portability_chunk_query(chunk);
        let rows: Vec<PortabilityEntry> = qb.build_query_as().fetch_all(pool).await?;
        entries.extend(rows);
    }
    Ok(entries)
}

/// Full CADUP range-assignment table. Static reference data, small enough to
/// hold per run.
pub async fn load_cadup(pool: &MySqlPool) -> Result<Vec<RangeAssignment>, sqlx::Error> {
    sqlx::query_as::<_, RangeAssignment>(
        r#"
        SELECT cn AS area_code, prefixo AS prefix,
               faixa_inicial AS block_start, faixa_final AS block_end, eot
        FROM cadup
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Reset the working tables for a fresh run. Partial output of an aborted
/// run must never survive into the next one.
pub async fn reset_working_tables(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query("TRUNCATE TABLE detraf_conferencia")
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn truncate_detraf(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query("TRUNCATE TABLE detraf").execute(pool).await?;
    Ok(())
}

/// VALUES statement for one chunk of classified results.
fn results_chunk_query(chunk: &[ReconciliationResult]) -> QueryBuilder<'_, sqlx::MySql> {
    let mut qb = QueryBuilder::new(
        "INSERT INTO detraf_conferencia (detraf_id, cdr_id, status, observacao) ",
    );
    qb.push_values(chunk, |mut b, r| {
        b.push_bind(r.detraf_id)
            .push_bind(r.cdr_id)
            .push_bind(r.status.as_str())
            .push_bind(r.observation());
    });
    qb
}

/// Persist classified results, chunked VALUES inserts.
pub async fn insert_results(
    pool: &MySqlPool,
    results: &[ReconciliationResult],
) -> Result<(), sqlx::Error> {
    for chunk in results.chunks(CHUNK_SIZE) {
        let mut qb = results_chunk_query(chunk);
        qb.build().execute(pool).await?;
    }
    tracing::info!("persisted {} reconciliation results", results.len());
    Ok(())
}

/// Persist validated DETRAF rows, chunked VALUES inserts.
pub async fn insert_detraf(
    pool: &MySqlPool,
    rows: &[DetrafImport],
) -> Result<(), sqlx::Error> {
    for chunk in rows.chunks(CHUNK_SIZE) {
        let mut qb = QueryBuilder::new(
            "INSERT INTO detraf (sequencial, assinante_a_numero, eot_de_a, \
             assinante_b_numero, eot_de_b, data_hora) ",
        );
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.sequencial)
                .push_bind(&r.assinante_a_numero)
                .push_bind(&r.eot_de_a)
                .push_bind(&r.assinante_b_numero)
                .push_bind(&r.eot_de_b)
                .push_bind(r.data_hora);
        });

        qb.build().execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReconStatus;
    use chrono::NaiveDate;

    fn numbers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("1198{i:07}")).collect()
    }

    fn result(id: i64) -> ReconciliationResult {
        ReconciliationResult {
            detraf_id: id,
            cdr_id: None,
            status: ReconStatus::Lost,
            error_code: None,
            diff_secs: None,
            batch_time: NaiveDate::from_ymd_opt(2025, 5, 10)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            a_number: "11987654321".into(),
            b_number: "1133334444".into(),
            claimed_eot_a: Some("010".into()),
            claimed_eot_b: Some("020".into()),
            cdr_eot_a: None,
            cdr_eot_b: None,
            notes: vec![],
        }
    }

    #[test]
    fn portability_chunks_at_statement_boundaries() {
        // 999/1000 fit in one statement, 1001 spills into a second
        for (len, statements) in [(0usize, 0usize), (999, 1), (1000, 1), (1001, 2)] {
            let nums = numbers(len);
            let chunks: Vec<&[String]> = nums.chunks(CHUNK_SIZE).collect();
            assert_eq!(chunks.len(), statements, "{len} numbers");

            // Every number binds exactly one placeholder across the chunks
            let bound: usize = chunks
                .iter()
                .map(|c| portability_chunk_query(c).sql().matches('?').count())
                .sum();
            assert_eq!(bound, len, "{len} numbers");
        }
    }

    #[test]
    fn portability_statement_shape() {
        let nums = numbers(3);
        let qb = portability_chunk_query(&nums);
        assert_eq!(qb.sql(), "SELECT numero AS number, eot, data_janela AS effective_since FROM numeros_portados WHERE numero IN (?, ?, ?)");
    }

    #[test]
    fn results_chunk_binds_four_columns_per_row() {
        let rows: Vec<ReconciliationResult> = (1..=2).map(result).collect();
        let qb = results_chunk_query(&rows);
        let sql = qb.sql();
        assert!(sql.starts_with(
            "INSERT INTO detraf_conferencia (detraf_id, cdr_id, status, observacao) VALUES "
        ));
        assert_eq!(sql.matches('?').count(), 8);
    }

    #[test]
    fn oversized_result_sets_split_into_chunked_inserts() {
        let rows: Vec<ReconciliationResult> = (0..(CHUNK_SIZE as i64 + 1)).map(result).collect();
        let chunks: Vec<_> = rows.chunks(CHUNK_SIZE).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), 1);
        assert_eq!(
            results_chunk_query(chunks[1]).sql().matches('?').count(),
            4
        );
    }
}
