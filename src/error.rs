use thiserror::Error;

/// Errors raised by the detection pipeline.
///
/// Degenerate geometry (zero-length edges, flat quadrilaterals) is not an
/// error: such candidates are simply rejected.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("frame has zero area ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),

    #[error("frame processing was cancelled")]
    Cancelled,

    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DetectError>;
