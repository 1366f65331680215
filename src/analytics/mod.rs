mod analyzer;
mod background;
mod classifier;
mod error;
mod motion;
mod overlay;
mod pipeline;
mod sampler;

pub use analyzer::spawn_analyzer;
pub use classifier::{ClassRule, Classification, Label};
pub use motion::BoundingBox;
pub use pipeline::{CycleReport, FrameCounts, Phase};
