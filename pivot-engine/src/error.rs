//! FILENAME: pivot-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PivotError {
    #[error("Unknown aggregator: {0}")]
    UnknownAggregator(String),

    #[error("Unknown sort mode: {0}")]
    UnknownSortMode(String),

    #[error("Invalid pivot configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("Record {index} is not a flat attribute/value mapping: {reason}")]
    DataShape { index: usize, reason: String },
}

impl PivotError {
    /// Configuration errors abort a build; data shape errors only skip a record.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PivotError::UnknownAggregator(_)
                | PivotError::UnknownSortMode(_)
                | PivotError::InvalidConfig(_)
        )
    }
}
