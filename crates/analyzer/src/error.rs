use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Every category count was zero, so there is no denominator for percentages.
    #[error("No products available for analysis")]
    NoProducts,
}
