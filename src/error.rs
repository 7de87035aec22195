//! Error types of the renderer.
//!
//! Degenerate geometry never shows up here - it is excluded locally by the stage that
//! finds it. Only structural problems (bad indices, out of range buffer access, a lost
//! worker) travel up to the caller, which then drops the frame.

use std::fmt;
use std::io;

/// Errors that abort the current frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    RowOutOfRange { row: usize, height: usize },
    ColumnOutOfRange { column: usize, width: usize },
    MalformedIndices { len: usize },     // Index buffer length is not a multiple of 3.
    VertexOutOfRange { index: usize, count: usize },
    NormalCountMismatch { normals: usize, vertices: usize },
    WorkerFailed { submitted: usize, received: usize },
    EmptyScreen,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::RowOutOfRange { row, height } => {
                write!(f, "row {} is out of range for buffer height {}", row, height)
            }
            RenderError::ColumnOutOfRange { column, width } => {
                write!(f, "column {} is out of range for row width {}", column, width)
            }
            RenderError::MalformedIndices { len } => {
                write!(f, "index buffer length {} is not a multiple of 3", len)
            }
            RenderError::VertexOutOfRange { index, count } => {
                write!(f, "vertex index {} is out of range for {} vertices", index, count)
            }
            RenderError::NormalCountMismatch { normals, vertices } => {
                write!(f, "mesh has {} normals for {} vertices", normals, vertices)
            }
            RenderError::WorkerFailed { submitted, received } => {
                write!(f, "worker pool returned {} of {} blocks", received, submitted)
            }
            RenderError::EmptyScreen => write!(f, "screen buffer has zero width or height"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Errors raised while loading configuration or mesh files.
#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Config(ron::error::SpannedError),
    Mesh(obj::ObjError),
    Render(RenderError),
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<ron::error::SpannedError> for LoadError {
    fn from(e: ron::error::SpannedError) -> Self {
        LoadError::Config(e)
    }
}

impl From<obj::ObjError> for LoadError {
    fn from(e: obj::ObjError) -> Self {
        LoadError::Mesh(e)
    }
}

impl From<RenderError> for LoadError {
    fn from(e: RenderError) -> Self {
        LoadError::Render(e)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "IO error: {}", e),
            LoadError::Config(e) => write!(f, "Config parse error: {}", e),
            LoadError::Mesh(e) => write!(f, "Mesh parse error: {}", e),
            LoadError::Render(e) => write!(f, "Invalid mesh: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Config(e) => Some(e),
            LoadError::Mesh(e) => Some(e),
            LoadError::Render(e) => Some(e),
        }
    }
}
