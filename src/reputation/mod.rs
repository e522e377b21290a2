//! Two-stage IP reputation classification.
//!
//! Addresses are normalized into [`IpKey`]s, screened by a bloom pre-filter
//! and confirmed by a cuckoo exact table. The [`ReputationManager`] owns both
//! structures, keeps the pre-filter's false positive rate under target by
//! rebuilding it, and grows the exact table before it fills.
//!
//! # Example
//!
//! ```
//! use kiai_lib::config::ReputationConfig;
//! use kiai_lib::reputation::{Classification, ReputationManager};
//!
//! let manager = ReputationManager::new(ReputationConfig::default()).unwrap();
//! manager.load_bulk(["10.0.0.1", "10.0.0.2"], 1_700_000_000).unwrap();
//! manager.load("10.0.0.3", 1_700_000_100).unwrap();
//!
//! assert_eq!(manager.fast_check("10.0.0.3").unwrap(), Classification::Malicious);
//! assert_ne!(manager.fast_check("10.0.0.9").unwrap(), Classification::Malicious);
//! ```

pub mod clock;
pub mod error;
pub mod key;
pub mod maintenance;
pub mod manager;
pub mod metrics;

pub use clock::{Clock, SystemClock};
pub use error::{ReputationError, ReputationResult};
pub use key::{normalize, IpKey};
pub use maintenance::{spawn_maintenance, MaintenanceHandle};
pub use manager::{
    BulkLoadReport, Classification, RebuildEvent, RebuildReason, RescaleOutcome,
    ReputationManager,
};
pub use metrics::{MetricsSnapshot, ReputationMetrics};
