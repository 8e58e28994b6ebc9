use thiserror::Error;

/// Run-level failures. Everything here aborts the current reconciliation run;
/// per-record problems (unparseable numbers, missing reference entries) are
/// handled inline and never reach this enum.
#[derive(Debug, Error)]
pub enum ReconError {
    /// No DETRAF rows inside the working window: nothing to reconcile.
    #[error("DETRAF batch is empty or has no timestamps, nothing to process")]
    EmptyBatch,

    /// Reference period must be YYYYMM.
    #[error("invalid reference period {0:?}, expected YYYYMM")]
    InvalidPeriod(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a raw subscriber number could not be canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("number contains no digits")]
    Empty,

    /// Local numbers (8/9 digits, no area code) need the DDD of the A side.
    #[error("local number {0:?} requires an area-code hint")]
    MissingAreaHint(String),

    #[error("unrecognized number shape {0:?}")]
    UnrecognizedShape(String),
}
