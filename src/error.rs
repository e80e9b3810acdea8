use std::io;

use thiserror::Error;

use crate::game::state::GridSize;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("grid {0} has an empty dimension")]
    EmptyDimension(GridSize),

    #[error("grid {0} holds no pairs")]
    NoPairs(GridSize),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("no saved game")]
    NoData,

    #[error("save data corrupted: {0}")]
    Corrupt(String),

    #[error("unsupported save version {0}")]
    UnsupportedVersion(u32),

    #[error("save storage failed: {0}")]
    Io(#[from] io::Error),

    #[error("save encoding failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PersistenceError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        PersistenceError::Corrupt(reason.into())
    }
}
