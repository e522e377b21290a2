//! Blacklist loading and traffic replay.
//!
//! The outer surface that feeds the reputation manager from files and
//! collects classification totals for reporting.

pub mod runner;
pub mod source;

pub use runner::{LoadSummary, ReplayInputs, ReplayReport, ReplayRunner, TrafficTotals};
pub use source::{read_addresses, read_traffic, TrafficRecord};
