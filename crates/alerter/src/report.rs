use analyzer::{RatioAnalysis, prioritized};
use chrono::NaiveDate;
use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::{CellAlignment, Table};
use serde::Serialize;

/// One line of the ratio summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub product_type: String,
    pub current_count: u64,
    pub current_percent: String,
    pub target_percent: String,
    pub required_count: String,
    pub next_upload_count: String,
}

/// A renderer-agnostic ratio alert: what every notification channel delivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertReport {
    pub subject: String,
    pub body: String,
    pub table: Vec<SummaryRow>,
}

impl AlertReport {
    /// Builds the alert for an imbalanced analysis. Returns `None` when balanced.
    pub fn build(date: NaiveDate, analysis: &RatioAnalysis) -> Option<Self> {
        if analysis.balanced {
            return None;
        }

        let table: Vec<SummaryRow> = prioritized(&analysis.shortfalls)
            .into_iter()
            .map(|e| SummaryRow {
                product_type: e.category.clone(),
                current_count: e.current_count,
                current_percent: format!("{:.1}%", e.current_percent),
                target_percent: format!("{:.1}%", e.target_percent),
                required_count: format!("{:.1}", e.required_count),
                next_upload_count: format!("+{}", e.upload_count),
            })
            .collect();

        let mut recommendations: Vec<String> = analysis
            .recommendations
            .iter()
            .map(|r| format!("• {r}"))
            .collect();
        if recommendations.is_empty() {
            recommendations.push("• No single upload closes any gap at the current total.".to_string());
        }

        let body = format!(
            "The uploaded product ratios deviate from the target ratios.\n\n\
             Total Products: {}\n\n\
             Recommendations:\n{}\n\n\
             Please review the detailed summary below:",
            analysis.total_products,
            recommendations.join("\n")
        );

        Some(Self {
            subject: format!("Product Ratio Alert for {}", date.format("%d-%m-%Y")),
            body,
            table,
        })
    }

    /// The summary table as markdown-style ASCII.
    pub fn render_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(ASCII_MARKDOWN).set_header(vec![
            "Product Type",
            "Current Count",
            "Current %",
            "Target %",
            "Required Count",
            "Next Upload Count",
        ]);
        for row in &self.table {
            table.add_row(vec![
                row.product_type.clone(),
                row.current_count.to_string(),
                row.current_percent.clone(),
                row.target_percent.clone(),
                row.required_count.clone(),
                row.next_upload_count.clone(),
            ]);
        }
        for index in 1..6 {
            if let Some(column) = table.column_mut(index) {
                column.set_cell_alignment(CellAlignment::Right);
            }
        }
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer::RatioEngine;
    use core_types::{CategoryCounts, TargetRatios};
    use rust_decimal_macros::dec;

    fn counts(values: [u64; 4]) -> CategoryCounts {
        ["rings", "pendants", "earrings", "bracelets"].into_iter().zip(values).collect()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn builds_subject_body_and_rows() {
        let analysis = RatioEngine::default().analyze(&counts([10, 10, 10, 10])).unwrap();
        let report = AlertReport::build(date(), &analysis).unwrap();

        assert_eq!(report.subject, "Product Ratio Alert for 14-03-2025");
        assert!(report.body.contains("Total Products: 40"));
        assert!(report.body.contains("• Upload 6 more rings (currently 10, need total 16)"));
        assert_eq!(
            report.table,
            vec![SummaryRow {
                product_type: "rings".to_string(),
                current_count: 10,
                current_percent: "25.0%".to_string(),
                target_percent: "40.0%".to_string(),
                required_count: "16.0".to_string(),
                next_upload_count: "+6".to_string(),
            }]
        );

        let rendered = report.render_table();
        assert!(rendered.contains("Next Upload Count"));
        assert!(rendered.contains("rings"));
    }

    #[test]
    fn imbalance_without_whole_uploads_still_alerts() {
        let targets = TargetRatios::new([("rings", dec!(60)), ("pendants", dec!(40))]);
        let counts: CategoryCounts = [("rings", 2), ("pendants", 2)].into_iter().collect();
        let analysis = RatioEngine::new(targets, dec!(5)).analyze(&counts).unwrap();

        let report = AlertReport::build(date(), &analysis).unwrap();
        assert!(report.table.is_empty());
        assert!(report.body.contains("• No single upload closes any gap"));
    }

    #[test]
    fn balanced_analysis_has_no_alert() {
        let analysis = RatioEngine::default().analyze(&counts([38, 26, 21, 15])).unwrap();
        assert!(AlertReport::build(date(), &analysis).is_none());
    }
}
