//! Kiai library.
//!
//! Streaming IP reputation classification against a known-bad set. A bloom
//! pre-filter answers "definitely clean" for most traffic; a cuckoo exact
//! table confirms or rejects everything else. The
//! [`ReputationManager`](reputation::ReputationManager) owns both, keeps the
//! pre-filter under its false positive target and grows the exact table
//! before it fills.
//!
//! # Architecture
//!
//! - `data_structures`: the bloom filter and cuckoo table over raw 128-bit keys
//! - `reputation`: address normalization, the manager, metrics and the
//!   periodic maintenance driver
//! - `replay`: file readers and the batched traffic replay
//! - `config` and `error`: the ambient configuration and error layers

// Re-export public modules
pub mod config;
pub mod data_structures;
pub mod error;
pub mod replay;
pub mod reputation;

// Internal modules that are not part of the public API
#[cfg(test)]
pub(crate) mod tests;

// Feature-gated modules
#[cfg(feature = "benchmarking")]
pub mod bench;

/// Version information for Kiai.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization function.
///
/// Installs the tracing error reporter and loads the global configuration
/// from the environment.
pub fn init() -> error::KiaiResult<()> {
    error::set_error_reporter(std::sync::Arc::new(error::TracingErrorReporter));
    config::init_config(None)?;
    Ok(())
}
