use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One `numeros_portados` row: the given number routes through `eot` from
/// `effective_since` on. A number may carry several entries; the most recent
/// one wins.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PortabilityEntry {
    pub number: String,
    pub eot: String,
    pub effective_since: NaiveDateTime,
}

/// One CADUP row: a numbering block (area code + prefix + sub-block range)
/// statically assigned to an EOT. Consulted only when no portability entry
/// exists for a number.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RangeAssignment {
    pub area_code: String,
    pub prefix: String,
    pub block_start: i64,
    pub block_end: i64,
    pub eot: String,
}

impl RangeAssignment {
    pub fn covers(&self, suffix: u32) -> bool {
        let s = i64::from(suffix);
        self.block_start <= s && s <= self.block_end
    }
}
