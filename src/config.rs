use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::analytics::ClassRule;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no video source configured")]
    NoSource,
    #[error("blend weight must be in (0, 1), got {0}")]
    InvalidBlendWeight(f64),
    #[error("invalid source resolution {width}x{height}")]
    InvalidResolution { width: i32, height: i32 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub input: String,
    /// ffmpeg demuxer passed as `-f`, e.g. `v4l2` for a local camera.
    #[serde(default)]
    pub input_format: Option<String>,
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
}

fn default_width() -> i32 {
    640
}

fn default_height() -> i32 {
    480
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            input_format: None,
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_sample_interval_ms() -> u64 {
    150
}

fn default_blend_weight() -> f64 {
    0.5
}

fn default_warmup_frames() -> u32 {
    1
}

fn default_diff_threshold() -> f64 {
    25.0
}

fn default_dilate_iterations() -> i32 {
    2
}

fn default_min_contour_area() -> f64 {
    500.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    #[serde(default = "default_blend_weight")]
    pub blend_weight: f64,
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,
    /// Keep blending steady-state frames into the background after detection.
    #[serde(default)]
    pub adaptive_background: bool,
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: f64,
    #[serde(default = "default_dilate_iterations")]
    pub dilate_iterations: i32,
    #[serde(default = "default_min_contour_area")]
    pub min_contour_area: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            blend_weight: default_blend_weight(),
            warmup_frames: default_warmup_frames(),
            adaptive_background: false,
            diff_threshold: default_diff_threshold(),
            dilate_iterations: default_dilate_iterations(),
            min_contour_area: default_min_contour_area(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifierConfig {
    /// Ordered rule table; the built-in person/child/animal table when absent.
    #[serde(default)]
    pub rules: Option<Vec<ClassRule>>,
}

fn default_http_enabled() -> bool {
    true
}

fn default_http_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;

        if config.source.input.trim().is_empty() {
            return Err(ConfigError::NoSource);
        }

        let weight = config.analytics.blend_weight;
        if !(weight > 0.0 && weight < 1.0) {
            return Err(ConfigError::InvalidBlendWeight(weight));
        }

        if config.source.width <= 0 || config.source.height <= 0 {
            return Err(ConfigError::InvalidResolution {
                width: config.source.width,
                height: config.source.height,
            });
        }

        Ok(config)
    }
}
