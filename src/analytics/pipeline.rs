use opencv::core::Mat;
use serde::Serialize;

use crate::config::{AnalyticsConfig, ClassifierConfig};

use super::background::BackgroundModel;
use super::classifier::{Classification, Label, RegionClassifier};
use super::error::VisionResult;
use super::motion::MotionDetector;

const DEFAULT_BLEND_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WarmUp,
    Detecting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameCounts {
    pub person: u32,
    pub child: u32,
    pub animal: u32,
}

impl FrameCounts {
    pub fn record(&mut self, label: Label) {
        match label {
            Label::Person => self.person += 1,
            Label::Child => self.child += 1,
            Label::Animal => self.animal += 1,
        }
    }

    pub fn get(&self, label: Label) -> u32 {
        match label {
            Label::Person => self.person,
            Label::Child => self.child,
            Label::Animal => self.animal,
        }
    }

    pub fn total(&self) -> u32 {
        self.person + self.child + self.animal
    }
}

/// Result of one processed frame. Built fresh every cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub phase: Phase,
    pub counts: FrameCounts,
    pub classifications: Vec<Classification>,
}

impl CycleReport {
    fn warm_up() -> Self {
        Self {
            phase: Phase::WarmUp,
            counts: FrameCounts::default(),
            classifications: Vec::new(),
        }
    }
}

pub struct FrameCyclePipeline {
    background: BackgroundModel,
    detector: MotionDetector,
    classifier: RegionClassifier,
    blend_weight: f64,
    warmup_frames: u32,
    absorbed: u32,
    adaptive: bool,
}

impl FrameCyclePipeline {
    pub fn new(detector: MotionDetector, classifier: RegionClassifier) -> Self {
        Self {
            background: BackgroundModel::new(),
            detector,
            classifier,
            blend_weight: DEFAULT_BLEND_WEIGHT,
            warmup_frames: 1,
            absorbed: 0,
            adaptive: false,
        }
    }

    pub fn from_config(analytics: &AnalyticsConfig, classifier: &ClassifierConfig) -> Self {
        let classifier = match &classifier.rules {
            Some(rules) => RegionClassifier::with_rules(rules.clone()),
            None => RegionClassifier::new(),
        };

        Self {
            blend_weight: analytics.blend_weight,
            warmup_frames: analytics.warmup_frames.max(1),
            adaptive: analytics.adaptive_background,
            ..Self::new(MotionDetector::from_config(analytics), classifier)
        }
    }

    pub fn phase(&self) -> Phase {
        if self.background.is_initialized() && self.absorbed >= self.warmup_frames {
            Phase::Detecting
        } else {
            Phase::WarmUp
        }
    }

    /// Forgets the background so the next frames warm it up again.
    pub fn reset(&mut self) {
        self.background.reset();
        self.absorbed = 0;
    }

    pub fn process_cycle(&mut self, frame: &Mat) -> VisionResult<CycleReport> {
        if self.phase() == Phase::WarmUp {
            if self.background.is_initialized() {
                self.background.update(frame, self.blend_weight)?;
            } else {
                self.background.initialize(frame)?;
            }
            self.absorbed += 1;

            if self.phase() == Phase::Detecting {
                tracing::info!(frames = self.absorbed, "background established");
            }
            return Ok(CycleReport::warm_up());
        }

        let background = self.background.current()?;
        let regions = self.detector.detect(frame, &background)?;

        let mut counts = FrameCounts::default();
        let classifications: Vec<Classification> = regions
            .iter()
            .filter_map(|region| self.classifier.classify(region))
            .collect();
        for c in &classifications {
            counts.record(c.label);
        }

        if self.adaptive {
            self.background.update(frame, self.blend_weight)?;
        }

        tracing::trace!(
            regions = regions.len(),
            classified = classifications.len(),
            "cycle processed"
        );

        Ok(CycleReport {
            phase: Phase::Detecting,
            counts,
            classifications,
        })
    }
}
