//! DETRAF ↔ CDR reconciliation engine.
//!
//! Normalizes subscriber numbers from carrier billing files and internal
//! call-detail records into one canonical national form, matches the two
//! sources inside a ±5 minute window, resolves authoritative routing codes
//! (EOT) from the portability registry and the CADUP range table, and
//! classifies every billing claim with a human-readable explanation.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod normalize;
pub mod resolver;
pub mod service;

pub use config::AppConfig;
pub use db::create_pool;
pub use error::{NormalizeError, ReconError};
pub use resolver::EotResolver;
pub use service::{reconcile, ReconOutput, ReconService};
