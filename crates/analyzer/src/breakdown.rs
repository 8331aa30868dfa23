use crate::error::AnalysisError;
use crate::ratio::{percent_of, round_half_away};
use core_types::{CategoryCounts, TargetRatios};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStatus {
    AboveTarget,
    OnTarget,
    BelowTarget,
}

/// Current vs. target figures for one category, surpluses included. Used for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub current_count: u64,
    /// Rounded to 1 dp.
    pub current_percent: Decimal,
    pub target_percent: Decimal,
    /// Rounded to 1 dp.
    pub target_count: Decimal,
    /// `target_count - current_count`, rounded to 1 dp. Negative means surplus.
    pub difference: Decimal,
    pub status: TargetStatus,
}

/// Lists every target category with its current and target share, in category order.
///
/// Unlike [`crate::compute_shortfalls`] this keeps categories at or above target.
pub fn category_breakdown(
    counts: &CategoryCounts,
    targets: &TargetRatios,
) -> Result<Vec<CategoryBreakdown>, AnalysisError> {
    let total = counts.total();
    if total == 0 {
        return Err(AnalysisError::NoProducts);
    }

    Ok(targets
        .iter()
        .map(|(category, target_percent)| {
            let current = counts.get(category);
            let target_count = target_percent / Decimal::ONE_HUNDRED * Decimal::from(total);
            let difference = target_count - Decimal::from(current);
            let status = match difference {
                d if d > Decimal::ZERO => TargetStatus::BelowTarget,
                d if d < Decimal::ZERO => TargetStatus::AboveTarget,
                _ => TargetStatus::OnTarget,
            };
            CategoryBreakdown {
                category: category.to_string(),
                current_count: current,
                current_percent: round_half_away(percent_of(current, total), 1),
                target_percent,
                target_count: round_half_away(target_count, 1),
                difference: round_half_away(difference, 1),
                status,
            }
        })
        .collect())
}
