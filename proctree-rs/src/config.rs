//! Explicit configuration threaded through matching, diff and merge calls.

use crate::constants::{DEFAULT_INNER_THRESHOLD, DEFAULT_LEAF_THRESHOLD};
use crate::error::{Error, Result};
use crate::matching::MatchingAlgorithm;

/// Similarity thresholds gating match acceptance.
///
/// A pair is accepted only when its dissimilarity is strictly below the
/// relevant threshold. Values are only built through [`Thresholds::new`] or
/// [`Default`], so both always lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    leaf: f64,
    inner: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            leaf: DEFAULT_LEAF_THRESHOLD,
            inner: DEFAULT_INNER_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Creates validated thresholds. Both values must lie in `[0, 1]`.
    pub fn new(leaf: f64, inner: f64) -> Result<Self> {
        check("leaf", leaf)?;
        check("inner", inner)?;
        Ok(Thresholds { leaf, inner })
    }

    /// Maximum dissimilarity for leaf (and exact-matcher) pairs.
    pub fn leaf(&self) -> f64 {
        self.leaf
    }

    /// Maximum dissimilarity for inner-node pairs.
    pub fn inner(&self) -> f64 {
        self.inner
    }
}

fn check(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidThreshold { name, value })
    }
}

/// Configuration for a diff or merge call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffConfig {
    /// Acceptance thresholds.
    pub thresholds: Thresholds,
    /// Matching strategy used to correlate the two trees.
    pub algorithm: MatchingAlgorithm,
}

impl DiffConfig {
    /// Creates a configuration with the given thresholds and algorithm.
    pub fn new(thresholds: Thresholds, algorithm: MatchingAlgorithm) -> Self {
        DiffConfig {
            thresholds,
            algorithm,
        }
    }

    /// Returns a copy using a different matching algorithm.
    pub fn with_algorithm(mut self, algorithm: MatchingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}
