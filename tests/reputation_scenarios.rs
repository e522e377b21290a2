//! Integration tests for the reputation manager's public API.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;

use kiai_lib::config::ReputationConfig;
use kiai_lib::reputation::{Classification, Clock, ReputationError, ReputationManager};

#[derive(Debug)]
struct FixedClock(u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

fn manager_with(config: ReputationConfig) -> ReputationManager {
    ReputationManager::with_clock(config, Arc::new(FixedClock(9_000))).unwrap()
}

fn address(i: u32) -> String {
    Ipv4Addr::from(0x0a00_0000 + i).to_string()
}

#[test]
fn test_end_to_end_scenario() {
    let manager = manager_with(ReputationConfig::default());

    let report = manager.load_bulk(["10.0.0.1", "10.0.0.2"], 1_000).unwrap();
    assert_eq!(report.inserted, 2);
    manager.load("10.0.0.3", 2_000).unwrap();

    assert_eq!(manager.fast_check("10.0.0.1").unwrap(), Classification::Malicious);
    assert_eq!(manager.fast_check("10.0.0.3").unwrap(), Classification::Malicious);
    assert_ne!(manager.fast_check("10.0.0.9").unwrap(), Classification::Malicious);

    let snapshot = manager.metrics_snapshot();
    assert_eq!(snapshot.exact_hit_count, 2);
    assert_eq!(snapshot.entries, 3);
}

#[test]
fn test_bulk_rejects_whole_batch_on_malformed_address() {
    let manager = manager_with(ReputationConfig::default());

    let err = manager
        .load_bulk(["10.0.0.1", "10.0.0.300", "10.0.0.2"], 1)
        .unwrap_err();
    assert_eq!(err, ReputationError::InvalidFormat("10.0.0.300".to_string()));
    assert!(manager.is_empty());
}

#[test]
fn test_bulk_preload_rebuild_uses_headroom() {
    let config = ReputationConfig {
        expected_items: 10,
        ..ReputationConfig::default()
    };
    let manager = manager_with(config);
    let addresses: Vec<String> = (0..10_000).map(address).collect();

    let report = manager.load_bulk(&addresses, 1).unwrap();
    assert_eq!(report.inserted, 10_000);

    let rebuild = report.preload_rebuild.expect("batch exceeds the initial filter");
    assert_eq!(rebuild.sized_for, 10_000);
    assert_eq!(rebuild.target_fpr, 0.005);
    assert!(manager.estimated_fpr() <= 0.005 * 1.01);
    assert!(report.rescale.rebuild.is_none());
}

#[test]
fn test_no_false_negatives_across_rescales() {
    let config = ReputationConfig {
        expected_items: 8,
        initial_capacity: 16,
        ..ReputationConfig::default()
    };
    let manager = manager_with(config);

    for i in 0..20_000 {
        manager.load(&address(i), u64::from(i)).unwrap();
        if i % 997 == 0 {
            // every key loaded so far must still be found
            for j in (0..=i).step_by(13) {
                assert_ne!(manager.fast_check(&address(j)).unwrap(), Classification::Clean);
            }
        }
    }

    assert!(manager.rehash_count() > 0);
    assert!(!manager.rebuild_events().is_empty());
    for i in 0..20_000 {
        assert_eq!(
            manager.fast_check(&address(i)).unwrap(),
            Classification::Malicious
        );
    }
}

#[test]
fn test_load_factor_trigger_rehashes_once() {
    let config = ReputationConfig {
        initial_capacity: 1_024,
        load_factor_limit: 0.25,
        ..ReputationConfig::default()
    };
    let manager = manager_with(config);
    let capacity = manager.capacity();
    let trigger = (0.25 * capacity as f64).ceil() as u32 + 1;

    for i in 0..trigger {
        manager.load(&address(i), 1).unwrap();
    }

    let snapshot = manager.metrics_snapshot();
    assert_eq!(snapshot.rehashes, 1);
    assert_eq!(snapshot.capacity, capacity * 2);
    assert!(snapshot.load_factor < 0.25);
    assert!(snapshot.load_factor <= 0.25 / 2.0 + 1.0 / snapshot.capacity as f64);
}

#[test]
fn test_rehash_preserves_identity() {
    let config = ReputationConfig {
        initial_capacity: 64,
        load_factor_limit: 0.3,
        ..ReputationConfig::default()
    };
    let manager = manager_with(config);

    for i in 0..10 {
        manager.load(&address(i), 100 + u64::from(i)).unwrap();
    }
    let before: Vec<_> = (0..10)
        .map(|i| manager.entry(&address(i)).unwrap().unwrap())
        .collect();

    for i in 10..200 {
        manager.load(&address(i), 5_000).unwrap();
    }
    assert!(manager.metrics_snapshot().rehashes > 0);

    for (i, entry) in (0..10).zip(before) {
        assert_eq!(manager.entry(&address(i)).unwrap(), Some(entry));
    }
}

#[test]
fn test_fpr_bound_after_rebuild() {
    for n in [1_000u32, 10_000, 100_000] {
        let manager = manager_with(ReputationConfig {
            expected_items: 16,
            rebuild_history: 64,
            ..ReputationConfig::default()
        });
        for i in 0..n {
            manager.load(&address(i), 1).unwrap();
        }

        let events = manager.rebuild_events();
        assert!(!events.is_empty(), "n = {n}");
        assert_eq!(events.len() as u64, manager.metrics_snapshot().rebuilds);
        for event in &events {
            assert!(event.estimated_fpr <= event.target_fpr, "n = {n}: {event:?}");
            assert!(event.sized_for >= event.active_entries, "n = {n}: {event:?}");
        }
        assert_eq!(events.last().unwrap().sequence, events.len() as u64);
        assert!(manager.estimated_fpr() <= 0.01, "n = {n}");
        assert_eq!(manager.len(), n as usize);
    }
}

#[test]
fn test_concurrent_checks_and_loads() {
    let manager = Arc::new(manager_with(ReputationConfig {
        expected_items: 16,
        initial_capacity: 32,
        ..ReputationConfig::default()
    }));

    let loaders: Vec<_> = (0..4u32)
        .map(|t| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for i in 0..2_000 {
                    manager.load(&address(t * 10_000 + i), 1).unwrap();
                }
            })
        })
        .collect();
    let checkers: Vec<_> = (0..2)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for i in 0..5_000u32 {
                    let address = Ipv4Addr::from(0xc0a8_0000 + i).to_string();
                    assert_ne!(
                        manager.fast_check(&address).unwrap(),
                        Classification::Malicious
                    );
                }
            })
        })
        .collect();

    for handle in loaders.into_iter().chain(checkers) {
        handle.join().unwrap();
    }

    assert_eq!(manager.len(), 8_000);
    for t in 0..4u32 {
        for i in (0..2_000).step_by(7) {
            assert_eq!(
                manager.fast_check(&address(t * 10_000 + i)).unwrap(),
                Classification::Malicious
            );
        }
    }
}
