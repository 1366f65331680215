use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use opencv::core::Mat;
use opencv::prelude::*;
use thiserror::Error;

use crate::config::SourceConfig;

const FRAME_READ_TIMEOUT: Duration = Duration::from_millis(500);
const FRAME_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffmpeg not found")]
    FfmpegNotFound,
    #[error("failed to build frame: {0}")]
    Frame(#[from] opencv::Error),
    #[error("unsupported frame size {width}x{height}")]
    FrameSize { width: i32, height: i32 },
}

pub enum FrameEvent {
    Frame(Mat),
    /// Nothing arrived within the poll window; the source is still open.
    Idle,
    EndOfStream,
}

pub trait FrameSource {
    fn next_frame(&mut self) -> Result<FrameEvent, CaptureError>;
}

/// Decodes any ffmpeg-readable input into fixed-size BGR frames.
pub struct FfmpegSource {
    frame_rx: Receiver<Vec<u8>>,
    height: i32,
    child: Option<Child>,
    _reader_handle: JoinHandle<()>,
}

impl FfmpegSource {
    pub fn new(config: &SourceConfig) -> Result<Self, CaptureError> {
        let frame_size = bgr_frame_len(config.width, config.height).ok_or(
            CaptureError::FrameSize {
                width: config.width,
                height: config.height,
            },
        )?;

        let mut child = Command::new("ffmpeg")
            .args(ffmpeg_args(config))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CaptureError::FfmpegNotFound
                } else {
                    CaptureError::Io(e)
                }
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::Io(std::io::Error::other("failed to capture ffmpeg stdout"))
        })?;

        let (frame_tx, frame_rx) = mpsc::sync_channel::<Vec<u8>>(FRAME_QUEUE_DEPTH);

        let reader_handle = thread::spawn(move || {
            let mut buf = vec![0u8; frame_size];
            while stdout.read_exact(&mut buf).is_ok() {
                if frame_tx.send(buf.clone()).is_err() {
                    break;
                }
            }
        });

        tracing::info!(
            input = %config.input,
            width = config.width,
            height = config.height,
            "frame source started"
        );

        Ok(Self {
            frame_rx,
            height: config.height,
            child: Some(child),
            _reader_handle: reader_handle,
        })
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Result<FrameEvent, CaptureError> {
        match self.frame_rx.recv_timeout(FRAME_READ_TIMEOUT) {
            Ok(data) => Ok(FrameEvent::Frame(frame_from_bgr(&data, self.height)?)),
            Err(RecvTimeoutError::Timeout) => Ok(FrameEvent::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(FrameEvent::EndOfStream),
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        // reader thread ends once ffmpeg's stdout closes
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn ffmpeg_args(config: &SourceConfig) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "quiet".into()];

    if let Some(format) = &config.input_format {
        args.extend(["-f".into(), format.clone()]);
    }

    args.extend([
        "-i".into(),
        config.input.clone(),
        "-an".into(),
        "-vf".into(),
        format!("scale={}:{}", config.width, config.height),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "bgr24".into(),
        "pipe:1".into(),
    ]);

    args
}

/// Byte length of one packed `bgr24` frame, `None` if it does not fit.
fn bgr_frame_len(width: i32, height: i32) -> Option<usize> {
    let width = usize::try_from(width).ok().filter(|w| *w > 0)?;
    let height = usize::try_from(height).ok().filter(|h| *h > 0)?;
    width.checked_mul(height)?.checked_mul(3)
}

/// Wraps packed `bgr24` bytes as an owned 3-channel frame.
fn frame_from_bgr(data: &[u8], height: i32) -> Result<Mat, opencv::Error> {
    Mat::from_slice(data)?.reshape(3, height)?.try_clone()
}
