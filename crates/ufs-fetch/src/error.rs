use std::path::PathBuf;

use thiserror::Error;
use ufs_store::StoreError;
use ufs_types::ContentAddress;
use ufs_walk::WalkError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("block not found: {0}")]
    NotFound(ContentAddress),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("{0} is not a file")]
    NotAFile(ContentAddress),

    #[error("invalid root name: {0:?}")]
    InvalidRootName(String),

    #[error("refusing to write through {}", .0.display())]
    UnsafePath(PathBuf),

    #[error("fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for FetchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(address) => Self::NotFound(address),
            other => Self::Store(other),
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
