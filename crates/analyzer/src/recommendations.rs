use crate::ratio::{ShortfallEntry, Shortfalls, round_half_away};
use std::cmp::Ordering;

/// Orders entries by descending upload count, then by category name.
fn by_priority(a: &&ShortfallEntry, b: &&ShortfallEntry) -> Ordering {
    b.upload_count
        .cmp(&a.upload_count)
        .then_with(|| a.category.cmp(&b.category))
}

/// Shortfall entries in recommendation order: largest upload first, ties by category name.
pub fn prioritized(shortfalls: &Shortfalls) -> Vec<&ShortfallEntry> {
    let mut entries: Vec<_> = shortfalls.entries().filter(|e| e.upload_count > 0).collect();
    entries.sort_by(by_priority);
    entries
}

/// Renders one human-readable upload instruction per shortfall, in [`prioritized`] order.
///
/// The required total is shown rounded to a whole product.
pub fn build_recommendations(shortfalls: &Shortfalls) -> Vec<String> {
    prioritized(shortfalls)
        .into_iter()
        .map(|e| {
            format!(
                "Upload {} more {} (currently {}, need total {})",
                e.upload_count,
                e.category,
                e.current_count,
                round_half_away(e.required_count, 0)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn entry(category: &str, current_count: u64, required: Decimal, upload_count: u64) -> ShortfallEntry {
        ShortfallEntry {
            category: category.to_string(),
            current_count,
            current_percent: dec!(10.0),
            target_percent: dec!(20),
            required_count: required,
            upload_count,
        }
    }

    #[test]
    fn orders_by_upload_count_then_name() {
        let shortfalls: Shortfalls = [
            entry("earrings", 2, dec!(4.4), 2),
            entry("rings", 10, dec!(16), 6),
            entry("bracelets", 1, dec!(3.0), 2),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            build_recommendations(&shortfalls),
            vec![
                "Upload 6 more rings (currently 10, need total 16)",
                "Upload 2 more bracelets (currently 1, need total 3)",
                "Upload 2 more earrings (currently 2, need total 4)",
            ]
        );
    }

    #[test]
    fn required_total_rounds_half_away_from_zero() {
        let shortfalls: Shortfalls = [entry("pendants", 0, dec!(2.50), 3)].into_iter().collect();
        assert_eq!(
            build_recommendations(&shortfalls),
            vec!["Upload 3 more pendants (currently 0, need total 3)"]
        );
    }

    #[test]
    fn empty_shortfalls_produce_no_recommendations() {
        assert!(build_recommendations(&Shortfalls::default()).is_empty());
    }
}
