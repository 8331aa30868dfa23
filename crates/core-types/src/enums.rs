use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which products the catalog source should return for a tracking run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchMode {
    /// Every product created on the target date.
    #[default]
    ByDate,
    /// Every active (or published) product, regardless of creation date.
    ActiveOnly,
    /// Active products created on the target date.
    ActiveByDate,
}

impl FetchMode {
    /// Whether the catalog query is restricted to the target date.
    pub fn filters_by_date(&self) -> bool {
        matches!(self, FetchMode::ByDate | FetchMode::ActiveByDate)
    }

    /// Whether only active products are counted.
    pub fn active_only(&self) -> bool {
        matches!(self, FetchMode::ActiveOnly | FetchMode::ActiveByDate)
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchMode::ByDate => "BY_DATE",
            FetchMode::ActiveOnly => "ACTIVE_ONLY",
            FetchMode::ActiveByDate => "ACTIVE_BY_DATE",
        };
        f.write_str(name)
    }
}

impl FromStr for FetchMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BY_DATE" => Ok(FetchMode::ByDate),
            "ACTIVE_ONLY" => Ok(FetchMode::ActiveOnly),
            "ACTIVE_BY_DATE" => Ok(FetchMode::ActiveByDate),
            other => Err(CoreError::UnknownFetchMode(other.to_string())),
        }
    }
}
