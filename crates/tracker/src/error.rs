use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Catalog fetch failed: {0}")]
    Catalog(#[from] api_client::error::ApiError),

    #[error("Snapshot store error: {0}")]
    Store(#[from] database::DbError),

    #[error("Alert delivery failed: {0}")]
    Notify(#[from] alerter::error::AlerterError),

    #[error("Failed to write the snapshot export: {0}")]
    Export(#[from] std::io::Error),

    #[error("Serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
