//! Mesh import errors.

use std::{collections::TryReserveError, io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to open mesh file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read line {line}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("malformed OBJ on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("mesh expands to {vertices} vertices, more than a draw call can address")]
    TooManyVertices { vertices: usize },

    #[error("failed to allocate host buffer for {vertices} vertices")]
    Allocation {
        vertices: usize,
        #[source]
        source: TryReserveError,
    },
}

impl ImportError {
    pub(crate) fn parse(line_no: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line: line_no + 1,
            message: message.into(),
        }
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
