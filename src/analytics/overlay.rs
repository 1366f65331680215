use opencv::core::{Mat, Point, Rect, Scalar, Vector};
use opencv::imgcodecs;
use opencv::imgproc;

use super::classifier::Label;
use super::error::VisionResult;
use super::pipeline::CycleReport;

const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f64 = 0.5;
const COUNT_SCALE: f64 = 1.0;

// BGR
fn label_color(label: Label) -> Scalar {
    match label {
        Label::Person => Scalar::new(0.0, 255.0, 0.0, 0.0),
        Label::Child => Scalar::new(255.0, 0.0, 0.0, 0.0),
        Label::Animal => Scalar::new(0.0, 0.0, 255.0, 0.0),
    }
}

/// Draws each classification's box and label plus the per-label counts.
pub fn annotate(frame: &mut Mat, report: &CycleReport) -> VisionResult<()> {
    for c in &report.classifications {
        let color = label_color(c.label);
        let rect: Rect = c.bbox.into();
        imgproc::rectangle(frame, rect, color, BOX_THICKNESS, imgproc::LINE_8, 0)?;
        imgproc::put_text(
            frame,
            c.label.as_str(),
            Point::new(rect.x, rect.y - 10),
            imgproc::FONT_HERSHEY_SIMPLEX,
            LABEL_SCALE,
            color,
            BOX_THICKNESS,
            imgproc::LINE_8,
            false,
        )?;
    }

    let lines = [
        (Label::Person, "persons"),
        (Label::Child, "children"),
        (Label::Animal, "animals"),
    ];
    for (i, (label, caption)) in lines.into_iter().enumerate() {
        let text = format!("{}: {}", caption, report.counts.get(label));
        imgproc::put_text(
            frame,
            &text,
            Point::new(10, 30 * (i as i32 + 1)),
            imgproc::FONT_HERSHEY_SIMPLEX,
            COUNT_SCALE,
            label_color(label),
            BOX_THICKNESS,
            imgproc::LINE_8,
            false,
        )?;
    }

    Ok(())
}

pub fn encode_jpeg(mat: &Mat) -> Option<Vec<u8>> {
    let mut buf = Vector::<u8>::new();
    let params = Vector::<i32>::new();
    imgcodecs::imencode(".jpg", mat, &mut buf, &params).ok()?;
    Some(buf.to_vec())
}
