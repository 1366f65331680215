use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use opencv::core::Mat;

use crate::camera::{FfmpegSource, FrameEvent, FrameSource};
use crate::config::Config;
use crate::storage::SnapshotStore;

use super::overlay;
use super::pipeline::{FrameCyclePipeline, Phase};
use super::sampler::SamplingPolicy;

type AnalyzerError = Box<dyn std::error::Error + Send + Sync>;

/// Pulls frames from a source and runs one pipeline cycle per sampled frame.
pub struct MotionAnalyzer<S: FrameSource> {
    source: S,
    pipeline: FrameCyclePipeline,
    sampler: SamplingPolicy,
    store: SnapshotStore,
    reset_requested: Arc<AtomicBool>,
}

impl<S: FrameSource> MotionAnalyzer<S> {
    pub fn new(
        source: S,
        pipeline: FrameCyclePipeline,
        sampler: SamplingPolicy,
        store: SnapshotStore,
        reset_requested: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            pipeline,
            sampler,
            store,
            reset_requested,
        }
    }

    /// Runs until shutdown or end of stream. Processing errors end the run.
    pub fn run(mut self, shutdown: Arc<AtomicBool>) -> Result<(), AnalyzerError> {
        tracing::info!("motion analyzer started");

        while !shutdown.load(Ordering::Relaxed) {
            let frame = match self.source.next_frame()? {
                FrameEvent::Frame(frame) => frame,
                FrameEvent::Idle => continue,
                FrameEvent::EndOfStream => {
                    tracing::info!("end of stream");
                    self.store.mark_source_ended();
                    return Ok(());
                }
            };

            if !self.sampler.should_sample(Instant::now()) {
                continue;
            }

            if self.reset_requested.swap(false, Ordering::Relaxed) {
                tracing::info!("background reset requested");
                self.pipeline.reset();
            }

            self.process_frame(frame)?;
        }

        tracing::info!("motion analyzer stopped");
        Ok(())
    }

    fn process_frame(&mut self, mut frame: Mat) -> Result<(), AnalyzerError> {
        let report = self.pipeline.process_cycle(&frame)?;

        if report.phase == Phase::Detecting {
            overlay::annotate(&mut frame, &report)?;
        }
        let frame_jpeg = overlay::encode_jpeg(&frame);

        let counts = report.counts;
        let phase = report.phase;
        let sequence = self.store.publish(report, frame_jpeg);

        if phase == Phase::Detecting {
            tracing::debug!(
                sequence,
                person = counts.person,
                child = counts.child,
                animal = counts.animal,
                "cycle counts"
            );
        } else {
            tracing::debug!(sequence, "warm-up frame absorbed");
        }

        Ok(())
    }
}

pub fn spawn_analyzer(
    config: Config,
    store: SnapshotStore,
    reset_requested: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let source = match FfmpegSource::new(&config.source) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to open frame source");
                store.mark_source_ended();
                return;
            }
        };

        let pipeline = FrameCyclePipeline::from_config(&config.analytics, &config.classifier);
        let sampler =
            SamplingPolicy::new(Duration::from_millis(config.analytics.sample_interval_ms));
        let analyzer = MotionAnalyzer::new(source, pipeline, sampler, store, reset_requested);

        if let Err(e) = analyzer.run(shutdown) {
            tracing::error!(error = %e, "motion analysis failed");
        }
    })
}
