pub mod classifier;
pub mod matcher;
pub mod pipeline;
pub mod recon;

pub use pipeline::{reconcile, ReconOutput};
pub use recon::{ImportSummary, ReconService};
