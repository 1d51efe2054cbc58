use std::io;

use thiserror::Error;

use crate::compute::{table::TableError, MatrixError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("BadRequest: {0}")]
    BadRequest(String),
    #[error("NotFound")]
    NotFound,
    #[error("TooManyRequests")]
    TooManyRequests,
    #[error("Internal: {0}")]
    Internal(String),
    #[error("ServiceUnavailable")]
    ServiceUnavailable,
    #[error("IO: {0}")]
    Io(#[from] io::Error),
}

impl From<MatrixError> for ServerError {
    fn from(value: MatrixError) -> Self {
        match value {
            MatrixError::InvalidDimension { .. } => ServerError::BadRequest(value.to_string()),
            MatrixError::ShapeMismatch { .. } => ServerError::Internal(value.to_string()),
        }
    }
}

impl From<TableError> for ServerError {
    fn from(value: TableError) -> Self {
        ServerError::BadRequest(value.to_string())
    }
}
