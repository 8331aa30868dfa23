//! # Ratio Analysis Engine
//!
//! Compares a snapshot of per-category product counts against configured target
//! ratios and turns the gaps into upload recommendations.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O and no state. Every function maps its inputs to a result,
//!   so the tracker's alerting and the dashboard's views always agree.
//! - **Shortfalls Only:** [`compute_shortfalls`] reports under-target categories and
//!   nothing else. [`category_breakdown`] is the display-oriented view that also keeps
//!   surpluses.
//! - **Explicit No-Data Case:** A zero total is [`AnalysisError::NoProducts`], never an
//!   empty success.
//!
//! ## Rounding
//!
//! Every rounded figure rounds half away from zero: `upload_count` to a whole number,
//! `required_count` to 2 dp, `current_percent` to 1 dp.

pub mod breakdown;
pub mod error;
pub mod ratio;
pub mod recommendations;

pub use breakdown::{CategoryBreakdown, TargetStatus, category_breakdown};
pub use error::AnalysisError;
pub use ratio::{
    DEFAULT_TOLERANCE, ShortfallEntry, Shortfalls, compute_shortfalls, is_balanced, targets_within_tolerance,
};
pub use recommendations::{build_recommendations, prioritized};

use core_types::{CategoryCounts, TargetRatios};
use rust_decimal::Decimal;
use serde::Serialize;

/// Everything derived from one set of counts. Built fresh on every call, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatioAnalysis {
    pub total_products: u64,
    pub shortfalls: Shortfalls,
    pub balanced: bool,
    /// Empty when balanced.
    pub recommendations: Vec<String>,
}

/// The analysis engine bound to one target-ratio configuration.
#[derive(Debug, Clone)]
pub struct RatioEngine {
    targets: TargetRatios,
    tolerance: Decimal,
}

impl RatioEngine {
    pub fn new(targets: TargetRatios, tolerance: Decimal) -> Self {
        Self { targets, tolerance }
    }

    pub fn targets(&self) -> &TargetRatios {
        &self.targets
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Runs shortfall computation, the balance check, and (when imbalanced) recommendations.
    ///
    /// `balanced` covers every under-target category, so it can be false while
    /// `shortfalls` is empty when no gap amounts to a whole upload.
    pub fn analyze(&self, counts: &CategoryCounts) -> Result<RatioAnalysis, AnalysisError> {
        let shortfalls = compute_shortfalls(counts, &self.targets)?;
        let balanced = targets_within_tolerance(counts, &self.targets, self.tolerance)?;
        let recommendations = if balanced {
            Vec::new()
        } else {
            build_recommendations(&shortfalls)
        };

        Ok(RatioAnalysis {
            total_products: counts.total(),
            shortfalls,
            balanced,
            recommendations,
        })
    }

    pub fn breakdown(&self, counts: &CategoryCounts) -> Result<Vec<CategoryBreakdown>, AnalysisError> {
        category_breakdown(counts, &self.targets)
    }
}

impl Default for RatioEngine {
    fn default() -> Self {
        Self::new(TargetRatios::default(), DEFAULT_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn counts(values: [u64; 4]) -> CategoryCounts {
        ["rings", "pendants", "earrings", "bracelets"]
            .into_iter()
            .zip(values)
            .collect()
    }

    #[test]
    fn imbalanced_counts_carry_recommendations() {
        let analysis = RatioEngine::default().analyze(&counts([10, 10, 10, 10])).unwrap();
        assert_eq!(analysis.total_products, 40);
        assert!(!analysis.balanced);
        assert_eq!(
            analysis.recommendations,
            vec!["Upload 6 more rings (currently 10, need total 16)"]
        );
    }

    #[test]
    fn balanced_counts_skip_recommendations() {
        let analysis = RatioEngine::default().analyze(&counts([38, 26, 21, 15])).unwrap();
        assert!(analysis.balanced);
        assert_eq!(analysis.shortfalls.len(), 1);
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn small_total_far_from_target_is_not_balanced() {
        let targets = TargetRatios::new([("rings", dec!(60)), ("pendants", dec!(40))]);
        let counts: CategoryCounts = [("rings", 2), ("pendants", 2)].into_iter().collect();

        let analysis = RatioEngine::new(targets, DEFAULT_TOLERANCE).analyze(&counts).unwrap();
        assert!(!analysis.balanced);
        assert!(analysis.shortfalls.is_empty());
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn no_products_propagates() {
        let result = RatioEngine::default().analyze(&counts([0, 0, 0, 0]));
        assert_eq!(result, Err(AnalysisError::NoProducts));
    }

    #[test]
    fn analysis_serializes_shortfalls_by_category() {
        let analysis = RatioEngine::default().analyze(&counts([10, 10, 10, 10])).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["shortfalls"]["rings"]["upload_count"], 6);
        assert_eq!(json["balanced"], false);
    }
}
