use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown fetch mode: {0}")]
    UnknownFetchMode(String),
}
