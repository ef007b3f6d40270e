pub mod config;
pub mod engine;
pub mod reconcile;

pub use config::EngineConfig;
pub use engine::{EngineError, SwapEngine};
pub use reconcile::{classify_drift, Drift, ReconcileReport, Reconciler};
