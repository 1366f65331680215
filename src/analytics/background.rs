use opencv::core::{self, Mat};
use opencv::imgproc;
use opencv::prelude::*;

use super::error::{VisionError, VisionResult};

/// Running per-pixel average of the static scene, stored as 64-bit floats.
pub struct BackgroundModel {
    estimate: Option<Mat>,
}

impl BackgroundModel {
    pub fn new() -> Self {
        Self { estimate: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.estimate.is_some()
    }

    /// Replaces the estimate with `frame`. Calling it again is a full reset.
    pub fn initialize(&mut self, frame: &Mat) -> VisionResult<()> {
        check_frame_type(frame)?;

        let mut estimate = Mat::default();
        frame.convert_to(&mut estimate, core::CV_64F, 1.0, 0.0)?;
        self.estimate = Some(estimate);
        Ok(())
    }

    /// `estimate = weight * frame + (1 - weight) * estimate`. An uninitialized
    /// model absorbs the frame as its initial estimate instead.
    pub fn update(&mut self, frame: &Mat, weight: f64) -> VisionResult<()> {
        if !(weight > 0.0 && weight < 1.0) {
            return Err(VisionError::InvalidWeight(weight));
        }

        if self.estimate.is_none() {
            return self.initialize(frame);
        }
        let estimate = self.estimate.as_mut().ok_or(VisionError::NotInitialized)?;

        check_frame_type(frame)?;
        check_dimensions(estimate, frame)?;

        imgproc::accumulate_weighted_def(frame, estimate, weight)?;
        Ok(())
    }

    /// The estimate in native 8-bit pixels, for differencing.
    pub fn current(&self) -> VisionResult<Mat> {
        let estimate = self.estimate.as_ref().ok_or(VisionError::NotInitialized)?;

        let mut native = Mat::default();
        estimate.convert_to(&mut native, core::CV_8U, 1.0, 0.0)?;
        Ok(native)
    }

    /// Drops the estimate; the next frame seen re-initializes it.
    pub fn reset(&mut self) {
        self.estimate = None;
    }

    #[cfg(test)]
    fn estimate(&self) -> Option<&Mat> {
        self.estimate.as_ref()
    }
}

impl Default for BackgroundModel {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn check_frame_type(frame: &Mat) -> VisionResult<()> {
    if frame.empty() || frame.typ() != core::CV_8UC3 {
        return Err(VisionError::UnsupportedFrame(frame.typ()));
    }
    Ok(())
}

pub(crate) fn check_dimensions(reference: &Mat, frame: &Mat) -> VisionResult<()> {
    let expected = reference.size()?;
    let actual = frame.size()?;
    if expected != actual {
        return Err(VisionError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Rect, Scalar, Vec3b, Vec3d};

    fn solid(rows: i32, cols: i32, value: f64) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC3, Scalar::all(value)).unwrap()
    }

    #[test]
    fn test_initialize_is_exact_copy() {
        let mut frame = solid(48, 64, 17.0);
        imgproc::rectangle(
            &mut frame,
            Rect::new(5, 6, 10, 12),
            Scalar::new(200.0, 100.0, 3.0, 0.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();

        let mut model = BackgroundModel::new();
        model.initialize(&frame).unwrap();

        let estimate = model.estimate().unwrap();
        assert_eq!(estimate.typ(), core::CV_64FC3);

        let mut expected = Mat::default();
        frame
            .convert_to(&mut expected, core::CV_64F, 1.0, 0.0)
            .unwrap();
        assert_eq!(core::norm2_def(estimate, &expected).unwrap(), 0.0);

        let est = estimate.at_2d::<Vec3d>(6, 5).unwrap();
        assert_eq!((est[0], est[1], est[2]), (200.0, 100.0, 3.0));
    }

    #[test]
    fn test_current_before_initialize_fails() {
        let model = BackgroundModel::new();
        assert!(!model.is_initialized());
        assert!(matches!(model.current(), Err(VisionError::NotInitialized)));
    }

    #[test]
    fn test_update_blends_with_weight() {
        let mut model = BackgroundModel::new();
        model.initialize(&solid(4, 4, 100.0)).unwrap();
        model.update(&solid(4, 4, 200.0), 0.5).unwrap();

        let est = model.estimate().unwrap().at_2d::<Vec3d>(2, 2).unwrap();
        assert!((est[0] - 150.0).abs() < 1e-9);

        model.update(&solid(4, 4, 50.0), 0.25).unwrap();
        let est = model.estimate().unwrap().at_2d::<Vec3d>(2, 2).unwrap();
        assert!((est[1] - 125.0).abs() < 1e-9);

        let native = model.current().unwrap();
        assert_eq!(native.typ(), core::CV_8UC3);
        assert_eq!(native.at_2d::<Vec3b>(0, 0).unwrap()[2], 125);
    }

    #[test]
    fn test_update_lazily_initializes() {
        let mut model = BackgroundModel::new();
        model.update(&solid(4, 4, 80.0), 0.5).unwrap();
        assert!(model.is_initialized());
        assert_eq!(model.current().unwrap().at_2d::<Vec3b>(1, 1).unwrap()[0], 80);
    }

    #[test]
    fn test_update_rejects_bad_weight() {
        let mut model = BackgroundModel::new();
        for weight in [0.0, 1.0, -0.1, 2.0] {
            assert!(matches!(
                model.update(&solid(4, 4, 1.0), weight),
                Err(VisionError::InvalidWeight(_))
            ));
        }
        assert!(!model.is_initialized());
    }

    #[test]
    fn test_update_rejects_mismatched_frame() {
        let mut model = BackgroundModel::new();
        model.initialize(&solid(4, 4, 1.0)).unwrap();
        assert!(matches!(
            model.update(&solid(8, 4, 1.0), 0.5),
            Err(VisionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_non_color_frame() {
        let gray =
            Mat::new_rows_cols_with_default(4, 4, core::CV_8UC1, Scalar::all(0.0)).unwrap();
        let mut model = BackgroundModel::new();
        assert!(matches!(
            model.initialize(&gray),
            Err(VisionError::UnsupportedFrame(_))
        ));
    }

    #[test]
    fn test_reinitialize_and_reset() {
        let mut model = BackgroundModel::new();
        model.initialize(&solid(4, 4, 10.0)).unwrap();
        model.initialize(&solid(4, 4, 90.0)).unwrap();
        assert_eq!(model.current().unwrap().at_2d::<Vec3b>(0, 0).unwrap()[0], 90);

        model.reset();
        assert!(!model.is_initialized());
    }
}
