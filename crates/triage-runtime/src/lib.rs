//! Correlation engine crate: turns chat reports into tracker issues through
//! a token-driven interaction workflow, and reconciles tracker-side changes
//! (commit references, closures) back into the originating discussion
//! threads.

pub mod correlation_runtime;

pub use correlation_runtime::{
    run_correlation_bridge, CorrelationRuntime, CorrelationRuntimeConfig, ReconcilePassReport,
};
