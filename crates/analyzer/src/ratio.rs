use crate::error::AnalysisError;
use core_types::{CategoryCounts, TargetRatios};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default balance band, in percentage points.
pub const DEFAULT_TOLERANCE: Decimal = dec!(5.0);

/// One under-target category and how many uploads would close the gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortfallEntry {
    pub category: String,
    pub current_count: u64,
    /// Share of the total, rounded to 1 dp.
    pub current_percent: Decimal,
    /// The configured target, unrounded.
    pub target_percent: Decimal,
    /// Count this category would need at today's total, rounded to 2 dp.
    pub required_count: Decimal,
    /// Number of products to upload, always at least 1.
    pub upload_count: u64,
}

/// Under-target categories keyed by name. Empty means every target is met.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shortfalls(BTreeMap<String, ShortfallEntry>);

impl Shortfalls {
    pub fn get(&self, category: &str) -> Option<&ShortfallEntry> {
        self.0.get(category)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ShortfallEntry> {
        self.0.values()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ShortfallEntry> for Shortfalls {
    fn from_iter<I: IntoIterator<Item = ShortfallEntry>>(iter: I) -> Self {
        Self(iter.into_iter().map(|e| (e.category.clone(), e)).collect())
    }
}

/// Rounds half away from zero. Every rounded figure in the analysis goes through here.
pub(crate) fn round_half_away(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// `100 * count / total`, unrounded. `total` must be non-zero.
pub(crate) fn percent_of(count: u64, total: u64) -> Decimal {
    Decimal::ONE_HUNDRED * Decimal::from(count) / Decimal::from(total)
}

/// Computes the categories that sit below their target share of the catalog.
///
/// Only categories present in `targets` are considered; a target category missing from
/// `counts` counts as zero, and counted categories without a target are ignored (they
/// still contribute to the total). A category is reported when it needs at least one
/// more upload to reach `target% * total`; categories at or above target never appear.
///
/// Returns [`AnalysisError::NoProducts`] when the total is zero.
pub fn compute_shortfalls(
    counts: &CategoryCounts,
    targets: &TargetRatios,
) -> Result<Shortfalls, AnalysisError> {
    let total = counts.total();
    if total == 0 {
        return Err(AnalysisError::NoProducts);
    }
    let total_dec = Decimal::from(total);

    let shortfalls: Shortfalls = targets
        .iter()
        .filter_map(|(category, target_percent)| {
            let current = counts.get(category);
            let required = target_percent / Decimal::ONE_HUNDRED * total_dec;
            let diff = required - Decimal::from(current);
            if diff <= Decimal::ZERO {
                return None;
            }

            let upload_count = round_half_away(diff, 0).to_u64().unwrap_or(0);
            // A gap under half a product rounds to nothing to upload.
            if upload_count == 0 {
                return None;
            }

            Some(ShortfallEntry {
                category: category.to_string(),
                current_count: current,
                current_percent: round_half_away(percent_of(current, total), 1),
                target_percent,
                required_count: round_half_away(required, 2),
                upload_count,
            })
        })
        .collect();

    if shortfalls.is_empty() {
        tracing::info!("All product categories meet or exceed target ratios.");
    }

    Ok(shortfalls)
}

/// True when every reported shortfall is within `tolerance` percentage points of its target.
///
/// Only the entries of `shortfalls` are checked, so an empty set is balanced.
pub fn is_balanced(shortfalls: &Shortfalls, tolerance: Decimal) -> bool {
    shortfalls
        .entries()
        .all(|e| (e.current_percent - e.target_percent).abs() <= tolerance)
}

/// True when every under-target category is within `tolerance` percentage points of its
/// target, including categories short by less than half a product.
///
/// This is the balance flag reported by [`crate::RatioEngine::analyze`]. At small totals a
/// category can be far below its target share while no whole upload closes the gap, so
/// it has no entry in [`Shortfalls`] and [`is_balanced`] cannot see it.
pub fn targets_within_tolerance(
    counts: &CategoryCounts,
    targets: &TargetRatios,
    tolerance: Decimal,
) -> Result<bool, AnalysisError> {
    let total = counts.total();
    if total == 0 {
        return Err(AnalysisError::NoProducts);
    }
    let total_dec = Decimal::from(total);

    Ok(targets.iter().all(|(category, target_percent)| {
        let current = counts.get(category);
        if target_percent / Decimal::ONE_HUNDRED * total_dec <= Decimal::from(current) {
            return true;
        }
        let current_percent = round_half_away(percent_of(current, total), 1);
        (current_percent - target_percent).abs() <= tolerance
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jewelry_targets() -> TargetRatios {
        TargetRatios::new([
            ("rings", dec!(40)),
            ("pendants", dec!(25)),
            ("earrings", dec!(20)),
            ("bracelets", dec!(15)),
        ])
    }

    fn counts(rings: u64, pendants: u64, earrings: u64, bracelets: u64) -> CategoryCounts {
        [
            ("rings", rings),
            ("pendants", pendants),
            ("earrings", earrings),
            ("bracelets", bracelets),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn counts_matching_targets_yield_no_shortfalls() {
        let shortfalls = compute_shortfalls(&counts(40, 25, 20, 15), &jewelry_targets()).unwrap();
        assert!(shortfalls.is_empty());
        assert!(is_balanced(&shortfalls, DEFAULT_TOLERANCE));
    }

    #[test]
    fn even_counts_report_only_rings() {
        let shortfalls = compute_shortfalls(&counts(10, 10, 10, 10), &jewelry_targets()).unwrap();
        assert_eq!(shortfalls.len(), 1);

        let rings = shortfalls.get("rings").unwrap();
        assert_eq!(rings.upload_count, 6);
        assert_eq!(rings.current_count, 10);
        assert_eq!(rings.current_percent, dec!(25.0));
        assert_eq!(rings.target_percent, dec!(40));
        assert_eq!(rings.required_count, dec!(16));

        // pendants sit exactly on target (diff 0) and must not appear
        assert!(shortfalls.get("pendants").is_none());
        assert!(!is_balanced(&shortfalls, DEFAULT_TOLERANCE));
    }

    #[test]
    fn zero_total_is_no_products_not_empty_success() {
        let result = compute_shortfalls(&counts(0, 0, 0, 0), &jewelry_targets());
        assert_eq!(result, Err(AnalysisError::NoProducts));

        let result = compute_shortfalls(&CategoryCounts::new(), &jewelry_targets());
        assert_eq!(result, Err(AnalysisError::NoProducts));
    }

    #[test]
    fn small_gap_is_within_tolerance() {
        let shortfalls = compute_shortfalls(&counts(38, 26, 21, 15), &jewelry_targets()).unwrap();
        assert_eq!(shortfalls.len(), 1);
        assert_eq!(shortfalls.get("rings").unwrap().upload_count, 2);
        assert!(is_balanced(&shortfalls, DEFAULT_TOLERANCE));
    }

    #[test]
    fn ties_round_away_from_zero() {
        // total 10: pendants need 2.5 more, rings are 2.5 over
        let targets = TargetRatios::new([("rings", dec!(75)), ("pendants", dec!(25))]);
        let counts: CategoryCounts = [("rings", 10)].into_iter().collect();

        let shortfalls = compute_shortfalls(&counts, &targets).unwrap();
        let pendants = shortfalls.get("pendants").unwrap();
        assert_eq!(pendants.upload_count, 3);
        assert_eq!(pendants.required_count, dec!(2.50));
        assert_eq!(pendants.current_percent, dec!(0));
        assert!(shortfalls.get("rings").is_none());
    }

    #[test]
    fn gap_below_half_a_product_is_not_reported() {
        // total 7: rings required 2.8 vs 3 held, pendants required 4.2 vs 4 held
        let targets = TargetRatios::new([("rings", dec!(40)), ("pendants", dec!(60))]);
        let counts: CategoryCounts = [("rings", 3), ("pendants", 4)].into_iter().collect();

        let shortfalls = compute_shortfalls(&counts, &targets).unwrap();
        assert!(shortfalls.is_empty());
    }

    #[test]
    fn sub_half_gap_far_from_target_is_still_out_of_tolerance() {
        // total 4: rings hold 50% against 60% but need only 0.4 more
        let targets = TargetRatios::new([("rings", dec!(60)), ("pendants", dec!(40))]);
        let counts: CategoryCounts = [("rings", 2), ("pendants", 2)].into_iter().collect();

        let shortfalls = compute_shortfalls(&counts, &targets).unwrap();
        assert!(shortfalls.is_empty());
        assert!(is_balanced(&shortfalls, DEFAULT_TOLERANCE));
        assert!(!targets_within_tolerance(&counts, &targets, DEFAULT_TOLERANCE).unwrap());
        assert!(targets_within_tolerance(&counts, &targets, dec!(10)).unwrap());
    }

    #[test]
    fn tolerance_check_agrees_with_entries_when_all_gaps_are_reported() {
        let targets = jewelry_targets();
        for (r, p, e, b) in [(10, 10, 10, 10), (38, 26, 21, 15), (40, 25, 20, 15), (0, 0, 0, 9)] {
            let counts = counts(r, p, e, b);
            let shortfalls = compute_shortfalls(&counts, &targets).unwrap();
            assert_eq!(
                targets_within_tolerance(&counts, &targets, DEFAULT_TOLERANCE).unwrap(),
                is_balanced(&shortfalls, DEFAULT_TOLERANCE)
            );
        }
        assert_eq!(
            targets_within_tolerance(&CategoryCounts::new(), &targets, DEFAULT_TOLERANCE),
            Err(AnalysisError::NoProducts)
        );
    }

    #[test]
    fn percentages_and_required_counts_are_rounded() {
        // total 3: rings 1/3 = 33.333..%, required 0.5 * 3 = 1.5
        let targets = TargetRatios::new([("rings", dec!(50)), ("pendants", dec!(50))]);
        let counts: CategoryCounts = [("rings", 0), ("pendants", 3)].into_iter().collect();
        let rings = compute_shortfalls(&counts, &targets).unwrap().get("rings").cloned().unwrap();
        assert_eq!(rings.required_count, dec!(1.5));
        assert_eq!(rings.upload_count, 2);

        let targets = TargetRatios::new([("rings", dec!(66.67)), ("pendants", dec!(33.33))]);
        let counts: CategoryCounts = [("rings", 1), ("pendants", 2)].into_iter().collect();
        let rings = compute_shortfalls(&counts, &targets).unwrap().get("rings").cloned().unwrap();
        assert_eq!(rings.current_percent, dec!(33.3));
        assert_eq!(rings.required_count, dec!(2.00));
        assert_eq!(rings.upload_count, 1);
        assert_eq!(rings.target_percent, dec!(66.67));
    }

    #[test]
    fn untracked_categories_count_towards_total_only() {
        let targets = TargetRatios::new([("rings", dec!(50)), ("pendants", dec!(50))]);
        let counts: CategoryCounts = [("rings", 5), ("pendants", 5), ("anklets", 10)]
            .into_iter()
            .collect();

        let shortfalls = compute_shortfalls(&counts, &targets).unwrap();
        assert_eq!(shortfalls.categories().collect::<Vec<_>>(), vec!["pendants", "rings"]);
        assert!(shortfalls.get("anklets").is_none());
        assert_eq!(shortfalls.get("rings").unwrap().upload_count, 5);
        assert_eq!(shortfalls.get("rings").unwrap().current_percent, dec!(25.0));
    }

    #[test]
    fn missing_target_category_counts_as_zero() {
        let counts: CategoryCounts = [("rings", 20)].into_iter().collect();
        let shortfalls = compute_shortfalls(&counts, &jewelry_targets()).unwrap();

        let bracelets = shortfalls.get("bracelets").unwrap();
        assert_eq!(bracelets.current_count, 0);
        assert_eq!(bracelets.upload_count, 3);
        assert!(shortfalls.get("rings").is_none());
    }

    #[test]
    fn every_entry_is_a_real_shortfall() {
        let targets = jewelry_targets();
        for (r, p, e, b) in [(1, 2, 3, 4), (0, 0, 0, 9), (17, 3, 11, 5), (100, 1, 1, 1), (7, 7, 7, 0)] {
            let counts = counts(r, p, e, b);
            let total = Decimal::from(counts.total());
            for entry in compute_shortfalls(&counts, &targets).unwrap().entries() {
                let target = targets.get(&entry.category).unwrap();
                assert!(entry.upload_count >= 1);
                assert!(target / Decimal::ONE_HUNDRED * total > Decimal::from(entry.current_count));
            }
        }
    }

    #[test]
    fn computation_is_deterministic() {
        let counts = counts(3, 9, 1, 4);
        let first = compute_shortfalls(&counts, &jewelry_targets()).unwrap();
        let second = compute_shortfalls(&counts, &jewelry_targets()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn balance_fails_iff_an_entry_exceeds_tolerance() {
        let entry = |category: &str, current: Decimal, target: Decimal| ShortfallEntry {
            category: category.to_string(),
            current_count: 1,
            current_percent: current,
            target_percent: target,
            required_count: dec!(2),
            upload_count: 1,
        };

        let at_edge: Shortfalls = [entry("rings", dec!(35.0), dec!(40))].into_iter().collect();
        assert!(is_balanced(&at_edge, dec!(5.0)));

        let over: Shortfalls = [
            entry("rings", dec!(35.0), dec!(40)),
            entry("pendants", dec!(19.9), dec!(25)),
        ]
        .into_iter()
        .collect();
        assert!(!is_balanced(&over, dec!(5.0)));
        assert!(is_balanced(&over, dec!(5.1)));

        assert!(is_balanced(&Shortfalls::default(), Decimal::ZERO));
    }
}
