//! Test modules for Kiai.
//!
//! Crate-internal suites that exercise more than one module at a time:
//! - Configuration layering and validation
//! - Error wrapping and reporting
//! - Reputation manager scenarios with a mocked clock
//! - Shared fixtures and proptest strategies

pub mod config_tests;

// Re-export commonly used testing tools to simplify imports in test modules
pub use test_utils::{address_strategy, fixed_clock, malformed_address_strategy, TestFixture};
