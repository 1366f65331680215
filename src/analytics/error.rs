use opencv::core::Size;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
    #[error("background model used before initialization")]
    NotInitialized,
    #[error("frame size {actual:?} does not match background size {expected:?}")]
    DimensionMismatch { expected: Size, actual: Size },
    #[error("unsupported frame type {0}, expected 8-bit 3-channel")]
    UnsupportedFrame(i32),
    #[error("blend weight must be in (0, 1), got {0}")]
    InvalidWeight(f64),
}

pub type VisionResult<T> = Result<T, VisionError>;
