use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("The HTTP request to the catalog failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unauthorized: invalid or expired Shopify access token")]
    Unauthorized,

    #[error("The catalog API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}
