use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One imported DETRAF line (carrier billing claim).
///
/// `eot_de_a`/`eot_de_b` are the routing codes the carrier claims for each
/// side; `data_hora` combines the file's date and answer-time fields.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DetrafRecord {
    pub id: i64,
    pub sequencial: Option<i64>,
    pub assinante_a_numero: String,
    pub eot_de_a: Option<String>,
    pub assinante_b_numero: String,
    pub eot_de_b: Option<String>,
    pub data_hora: NaiveDateTime,
}

/// Insertable DETRAF row, produced by the field validator before the table
/// assigns ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetrafImport {
    pub sequencial: Option<i64>,
    pub assinante_a_numero: String,
    pub eot_de_a: Option<String>,
    pub assinante_b_numero: String,
    pub eot_de_b: Option<String>,
    pub data_hora: NaiveDateTime,
}
