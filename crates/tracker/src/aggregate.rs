use core_types::{CategoryCounts, Product, TargetRatios};

/// Counts products per tracked category.
///
/// Every target category is present in the result, at zero if nothing matched. Products
/// whose category has no target are skipped; their number is returned alongside. The
/// result does not depend on product order.
pub fn aggregate_counts(products: &[Product], targets: &TargetRatios) -> (CategoryCounts, usize) {
    let mut counts: CategoryCounts = targets.categories().map(|c| (c, 0)).collect();
    let mut skipped = 0;

    for product in products {
        let category = product.category();
        if targets.get(&category).is_some() {
            counts.increment(&category, 1);
        } else {
            skipped += 1;
        }
    }

    (counts, skipped)
}
