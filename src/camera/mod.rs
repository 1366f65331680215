mod source;

pub use source::{CaptureError, FfmpegSource, FrameEvent, FrameSource};
