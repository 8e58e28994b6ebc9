use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One call-detail row from the `cdr` store. The reconciliation only reads a
/// time-windowed slice; the table itself belongs to the switch.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CdrRecord {
    pub id: i64,
    pub calldate: NaiveDateTime,
    pub src: String,
    pub dst: String,
    pub eot_a: Option<String>,
    pub eot_b: Option<String>,
    pub duration: Option<i32>,
    pub billsec: Option<i32>,
    pub disposition: Option<String>,
}

impl CdrRecord {
    /// A missing disposition counts as answered; anything other than
    /// ANSWERED means the call never completed.
    pub fn answered(&self) -> bool {
        match &self.disposition {
            None => true,
            Some(d) => d.eq_ignore_ascii_case("ANSWERED"),
        }
    }
}
