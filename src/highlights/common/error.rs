use thiserror::Error;

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Invalid frame dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Buffer does not match its region of interest: expected {expected} floats, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },

    #[error("Failed to allocate {0} bytes of scratch memory")]
    AllocationFailed(usize),

    #[error("Accelerator error: {0}")]
    AcceleratorFailure(String),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode RAW image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HighlightError>;
