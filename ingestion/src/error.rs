use crate::statements::ImportStep;
use std::path::PathBuf;
use thiserror::Error;
use tripgraph_core::error::{Classify, ErrorCode};

#[derive(Error, Debug)]
pub enum GraphError {
    #[error(transparent)]
    Driver(#[from] neo4rs::Error),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Cannot reach graph database: {0}")]
    Connectivity(#[source] GraphError),
    #[error("Cannot read {path}: {reason}")]
    Read {
        path: PathBuf,
        missing: bool,
        reason: String,
    },
    #[error("Schema error in column {column}: {reason}")]
    Schema { column: String, reason: String },
    #[error("Parse error in column {column} at row {row}: {value}")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Cannot stage {path}: {reason}")]
    Staging { path: PathBuf, reason: String },
    #[error("Import statement {step} failed: {source}")]
    Statement {
        step: ImportStep,
        #[source]
        source: GraphError,
    },
}

impl LoaderError {
    pub(crate) fn read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        LoaderError::Read {
            path: path.into(),
            missing: false,
            reason: err.to_string(),
        }
    }

    pub(crate) fn staging(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        LoaderError::Staging {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

impl Classify for LoaderError {
    fn error_code(&self) -> ErrorCode {
        match self {
            LoaderError::Connectivity(_) => ErrorCode::Unavailable,
            LoaderError::Read { missing: true, .. } => ErrorCode::NotFound,
            LoaderError::Read { .. } => ErrorCode::InvalidArgument,
            LoaderError::Schema { .. } => ErrorCode::FailedPrecondition,
            LoaderError::Parse { .. } => ErrorCode::InvalidArgument,
            LoaderError::Staging { .. } => ErrorCode::Unavailable,
            LoaderError::Statement { .. } => ErrorCode::Aborted,
        }
    }
}
