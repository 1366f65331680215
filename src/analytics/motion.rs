use opencv::core::{self, Mat, Point, Rect, Vector};
use opencv::imgproc;
use opencv::prelude::*;
use serde::Serialize;

use crate::config::AnalyticsConfig;

use super::background::{check_dimensions, check_frame_type};
use super::error::VisionResult;

const DEFAULT_DIFF_THRESHOLD: f64 = 25.0;
const DEFAULT_DILATE_ITERATIONS: i32 = 2;
const DEFAULT_MIN_CONTOUR_AREA: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<Rect> for BoundingBox {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl From<BoundingBox> for Rect {
    fn from(bbox: BoundingBox) -> Self {
        Rect::new(bbox.x, bbox.y, bbox.width, bbox.height)
    }
}

/// A foreground blob found in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub bbox: BoundingBox,
    pub area: f64,
}

impl Region {
    /// Height over width; `None` for a zero-width box.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.bbox.width <= 0 {
            return None;
        }
        Some(self.bbox.height as f64 / self.bbox.width as f64)
    }
}

pub struct MotionDetector {
    diff_threshold: f64,
    dilate_iterations: i32,
    min_contour_area: f64,
}

impl MotionDetector {
    pub fn new() -> Self {
        Self {
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            dilate_iterations: DEFAULT_DILATE_ITERATIONS,
            min_contour_area: DEFAULT_MIN_CONTOUR_AREA,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self {
            diff_threshold: config.diff_threshold,
            dilate_iterations: config.dilate_iterations,
            min_contour_area: config.min_contour_area,
        }
    }

    /// Regions where `frame` differs from `background`, in contour scan order.
    pub fn detect(&self, frame: &Mat, background: &Mat) -> VisionResult<Vec<Region>> {
        check_frame_type(frame)?;
        check_frame_type(background)?;
        check_dimensions(background, frame)?;

        let mask = self.foreground_mask(frame, background)?;

        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            &mask,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )?;

        let mut regions = Vec::new();
        for contour in contours.iter() {
            let area = imgproc::contour_area(&contour, false)?;
            if area < self.min_contour_area {
                continue;
            }

            let rect = imgproc::bounding_rect(&contour)?;
            tracing::trace!(
                x = rect.x,
                y = rect.y,
                width = rect.width,
                height = rect.height,
                area = format!("{:.0}", area),
                "foreground region"
            );

            regions.push(Region {
                bbox: rect.into(),
                area,
            });
        }

        Ok(regions)
    }

    /// Binary change mask after thresholding and dilation.
    pub fn foreground_mask(&self, frame: &Mat, background: &Mat) -> VisionResult<Mat> {
        let mut diff = Mat::default();
        core::absdiff(background, frame, &mut diff)?;

        let mut gray = Mat::default();
        imgproc::cvt_color_def(&diff, &mut gray, imgproc::COLOR_BGR2GRAY)?;

        let mut thresh = Mat::default();
        imgproc::threshold(
            &gray,
            &mut thresh,
            self.diff_threshold,
            255.0,
            imgproc::THRESH_BINARY,
        )?;

        let mut dilated = Mat::default();
        imgproc::dilate(
            &thresh,
            &mut dilated,
            &Mat::default(),
            Point::new(-1, -1),
            self.dilate_iterations,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;

        Ok(dilated)
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::error::VisionError;
    use opencv::core::Scalar;

    fn blank() -> Mat {
        Mat::new_rows_cols_with_default(480, 640, core::CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    fn with_rect(rect: Rect) -> Mat {
        let mut frame = blank();
        imgproc::rectangle(
            &mut frame,
            rect,
            Scalar::all(255.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        frame
    }

    #[test]
    fn test_identical_frames_yield_nothing() {
        let detector = MotionDetector::new();
        let frame = with_rect(Rect::new(10, 10, 50, 50));
        let regions = detector.detect(&frame, &frame).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_single_rectangle_found() {
        let detector = MotionDetector::new();
        let regions = detector
            .detect(&with_rect(Rect::new(100, 120, 40, 80)), &blank())
            .unwrap();

        assert_eq!(regions.len(), 1);
        let region = regions[0];
        // Two dilation passes grow the blob by two pixels on each side.
        assert!((region.bbox.x - 100).abs() <= 3);
        assert!((region.bbox.y - 120).abs() <= 3);
        assert!((region.bbox.width - 40).abs() <= 5);
        assert!((region.bbox.height - 80).abs() <= 5);
        assert!(region.area >= 3000.0);

        let ratio = region.aspect_ratio().unwrap();
        assert!(ratio > 1.8 && ratio < 2.1);
    }

    #[test]
    fn test_small_changes_below_noise_floor() {
        let detector = MotionDetector::new();
        let regions = detector
            .detect(&with_rect(Rect::new(300, 200, 8, 8)), &blank())
            .unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_faint_changes_ignored() {
        let detector = MotionDetector::new();
        let mut frame = blank();
        imgproc::rectangle(
            &mut frame,
            Rect::new(100, 100, 100, 100),
            Scalar::all(20.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        assert!(detector.detect(&frame, &blank()).unwrap().is_empty());
    }

    #[test]
    fn test_separate_blobs_reported_separately() {
        let detector = MotionDetector::new();
        let mut frame = with_rect(Rect::new(50, 50, 40, 80));
        imgproc::rectangle(
            &mut frame,
            Rect::new(400, 300, 60, 40),
            Scalar::all(255.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        assert_eq!(detector.detect(&frame, &blank()).unwrap().len(), 2);
    }

    #[test]
    fn test_nested_contours_not_reported() {
        let detector = MotionDetector::new();
        // Hollow square: only the outer boundary counts.
        let mut frame = with_rect(Rect::new(100, 100, 200, 200));
        imgproc::rectangle(
            &mut frame,
            Rect::new(150, 150, 100, 100),
            Scalar::all(0.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        assert_eq!(detector.detect(&frame, &blank()).unwrap().len(), 1);
    }

    #[test]
    fn test_mismatched_sizes_rejected() {
        let detector = MotionDetector::new();
        let small =
            Mat::new_rows_cols_with_default(240, 320, core::CV_8UC3, Scalar::all(0.0)).unwrap();
        assert!(matches!(
            detector.detect(&small, &blank()),
            Err(VisionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_width_region_has_no_ratio() {
        let region = Region {
            bbox: BoundingBox {
                x: 0,
                y: 0,
                width: 0,
                height: 10,
            },
            area: 900.0,
        };
        assert_eq!(region.aspect_ratio(), None);
    }
}
