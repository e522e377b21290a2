// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Sizing calculator for the bloom pre-filter.
//!
//! Formulas:
//! - m = ceil(-n * ln(p) / (ln 2)^2)  -- bit count
//! - k = max(1, round((m / n) * ln 2)) -- hash count
//! - fpr = (1 - e^(-k * n / m))^k

use std::f64::consts::LN_2;

use serde::Serialize;

use crate::data_structures::bloom::error::{BloomError, Result};

/// Bit count and hash count for a bloom filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BloomParams {
    /// Number of bits in the filter (m)
    pub m_bits: usize,
    /// Number of bit positions probed per key (k)
    pub hash_count: usize,
}

impl BloomParams {
    /// Create explicit parameters.
    ///
    /// Both values must be non-zero.
    pub fn new(m_bits: usize, hash_count: usize) -> Result<Self> {
        if m_bits == 0 {
            return Err(BloomError::InvalidParameters(
                "m_bits must be greater than 0".to_string(),
            ));
        }
        if hash_count == 0 {
            return Err(BloomError::InvalidParameters(
                "hash_count must be greater than 0".to_string(),
            ));
        }
        Ok(Self { m_bits, hash_count })
    }

    /// Optimal parameters for `capacity` keys at `target_fpr`.
    ///
    /// Shorthand for [`optimal_params`].
    pub fn for_capacity(capacity: usize, target_fpr: f64) -> Result<Self> {
        optimal_params(capacity, target_fpr)
    }

    /// Theoretical false positive rate once `items` keys have been inserted.
    pub fn fpr_at(&self, items: usize) -> f64 {
        estimate_fpr(self.m_bits, items, self.hash_count)
    }
}

/// Derive the optimal bit count and hash count for a target capacity and
/// false positive rate.
///
/// A capacity of zero is sized as a single key so an empty blacklist still
/// gets a usable filter.
///
/// # Errors
///
/// Returns [`BloomError::InvalidParameters`] when `target_fpr` is not in the
/// open interval (0, 1).
pub fn optimal_params(capacity: usize, target_fpr: f64) -> Result<BloomParams> {
    if !(target_fpr > 0.0 && target_fpr < 1.0) {
        return Err(BloomError::InvalidParameters(format!(
            "target_fpr must be in (0, 1), got {target_fpr}"
        )));
    }

    let n = capacity.max(1) as f64;
    let m = (-n * target_fpr.ln() / (LN_2 * LN_2)).ceil().max(1.0);
    let k = ((m / n) * LN_2).round().max(1.0);

    Ok(BloomParams {
        m_bits: m as usize,
        hash_count: k as usize,
    })
}

/// Standard bloom false positive estimate: (1 - e^(-k * n / m))^k.
pub fn estimate_fpr(m_bits: usize, items: usize, hash_count: usize) -> f64 {
    if m_bits == 0 {
        return 1.0;
    }
    let exponent = -(hash_count as f64) * (items as f64) / (m_bits as f64);
    (1.0 - exponent.exp()).powi(hash_count as i32)
}
