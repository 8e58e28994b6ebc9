pub mod cdr;
pub mod context;
pub mod detraf;
pub mod reference;
pub mod result;

pub use cdr::CdrRecord;
pub use context::BillingContext;
pub use detraf::{DetrafImport, DetrafRecord};
pub use reference::{PortabilityEntry, RangeAssignment};
pub use result::{
    ErrorCode, OutdatedEntry, ReconStatus, ReconciliationResult, RunSummary,
};
