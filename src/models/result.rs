use chrono::NaiveDateTime;
use serde::Serialize;

/// Terminal state of one DETRAF record after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconStatus {
    /// Matched, answered, claimed codes agree with the CDR on both sides.
    Reconciled,
    /// Matched but something is billable-wrong (see `ErrorCode`).
    Error,
    /// No CDR correspondence inside the matching window.
    Lost,
}

impl ReconStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reconciled => "Reconciled",
            Self::Error => "Error",
            Self::Lost => "Lost",
        }
    }

    /// Report ordering: reconciled first, lost last.
    pub fn sort_rank(&self) -> u8 {
        match self {
            Self::Reconciled => 0,
            Self::Error => 1,
            Self::Lost => 2,
        }
    }
}

impl std::fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact divergence pattern behind an `Error` status. Numeric values keep the
/// codes the legacy reports used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    /// Billing claimed for a call that never completed.
    NotAnswered,
    /// Called-party code diverges.
    DivergentB,
    /// Calling-party code diverges.
    DivergentA,
    /// Both sides diverge.
    DivergentBoth,
}

impl ErrorCode {
    pub fn code(&self) -> u8 {
        match self {
            Self::NotAnswered => 1,
            Self::DivergentB => 2,
            Self::DivergentA => 3,
            Self::DivergentBoth => 5,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Classified outcome for one DETRAF record. Created once by the classifier
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationResult {
    pub detraf_id: i64,
    pub cdr_id: Option<i64>,
    pub status: ReconStatus,
    pub error_code: Option<ErrorCode>,
    /// Signed seconds between batch timestamp and matched call.
    pub diff_secs: Option<i64>,
    pub batch_time: NaiveDateTime,
    pub a_number: String,
    pub b_number: String,
    pub claimed_eot_a: Option<String>,
    pub claimed_eot_b: Option<String>,
    pub cdr_eot_a: Option<String>,
    pub cdr_eot_b: Option<String>,
    pub notes: Vec<String>,
}

impl ReconciliationResult {
    /// Notes joined the way the `observacao` column stores them.
    pub fn observation(&self) -> Option<String> {
        if self.notes.is_empty() {
            None
        } else {
            Some(self.notes.join(" | "))
        }
    }
}

/// One stale-CDR observation for the outdated-registry report: the CDR still
/// carries `cdr_eot` for `number`, but the reference source says
/// `authoritative_eot` applied at call time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutdatedEntry {
    pub number: String,
    pub cdr_eot: Option<String>,
    pub authoritative_eot: String,
    pub effective_since: Option<NaiveDateTime>,
}

impl OutdatedEntry {
    /// Dedup key: the report is distinct on the code triple, regardless of
    /// which entry supplied the effective date.
    pub fn key(&self) -> (String, Option<String>, String) {
        (
            self.number.clone(),
            self.cdr_eot.clone(),
            self.authoritative_eot.clone(),
        )
    }
}

/// Counters surfaced by the host binary after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub reconciled: usize,
    pub errors: usize,
    pub lost: usize,
    /// Subset of `lost` whose numbers failed normalization.
    pub unparseable: usize,
    pub outdated_entries: usize,
}
