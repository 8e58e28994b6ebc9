//! DETRAF field validation.
//!
//! The fixed-width layout is sliced by the host; this module receives the
//! already-cut field values and turns them into insertable rows: digit
//! cleanup, CHAR(8) date and CHAR(6) time checks, and the combined timestamp.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::DetrafImport;

/// Already-sliced fields of one DETRAF line, still raw.
#[derive(Debug, Clone, Default)]
pub struct RawDetrafFields {
    pub sequencial: String,
    pub assinante_a_numero: String,
    pub eot_de_a: String,
    pub assinante_b_numero: String,
    pub eot_de_b: String,
    /// YYYYMMDD
    pub data_da_chamada: String,
    /// HHMMSS
    pub hora_de_atendimento: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("invalid call date {0:?}, expected YYYYMMDD")]
    InvalidDate(String),
    #[error("invalid answer time {0:?}, expected HHMMSS")]
    InvalidTime(String),
    #[error("subscriber number field is empty")]
    MissingNumber,
}

fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Eight digits, year-month-day, year "0000" rejected.
fn parse_date8(value: &str) -> Result<NaiveDate, FieldError> {
    let invalid = || FieldError::InvalidDate(value.to_string());
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) || value.starts_with("0000") {
        return Err(invalid());
    }
    let year: i32 = value[..4].parse().map_err(|_| invalid())?;
    let month: u32 = value[4..6].parse().map_err(|_| invalid())?;
    let day: u32 = value[6..].parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Six digits, hours/minutes/seconds range-checked.
fn parse_time6(value: &str) -> Result<(u32, u32, u32), FieldError> {
    let invalid = || FieldError::InvalidTime(value.to_string());
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let h: u32 = value[..2].parse().map_err(|_| invalid())?;
    let m: u32 = value[2..4].parse().map_err(|_| invalid())?;
    let s: u32 = value[4..].parse().map_err(|_| invalid())?;
    if h >= 24 || m >= 60 || s >= 60 {
        return Err(invalid());
    }
    Ok((h, m, s))
}

/// Validate one sliced line into an insertable row.
pub fn build_record(fields: &RawDetrafFields) -> Result<DetrafImport, FieldError> {
    let a_number = digits(&fields.assinante_a_numero);
    let b_number = digits(&fields.assinante_b_numero);
    if a_number.is_empty() || b_number.is_empty() {
        return Err(FieldError::MissingNumber);
    }

    let date = parse_date8(fields.data_da_chamada.trim())?;
    let (h, m, s) = parse_time6(fields.hora_de_atendimento.trim())?;
    let data_hora: NaiveDateTime = date
        .and_hms_opt(h, m, s)
        .ok_or_else(|| FieldError::InvalidTime(fields.hora_de_atendimento.clone()))?;

    Ok(DetrafImport {
        sequencial: digits(&fields.sequencial).parse().ok(),
        assinante_a_numero: a_number,
        eot_de_a: clean(&fields.eot_de_a),
        assinante_b_numero: b_number,
        eot_de_b: clean(&fields.eot_de_b),
        data_hora,
    })
}
