use ndarray::{Array4, ArrayViewD};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;

use crate::camera::Frame;

const SSD_INPUT_SIZE: usize = 300;
/// Per-channel means in BGR order, subtracted before inference.
const SSD_MEAN_BGR: [f32; 3] = [104.0, 177.0, 123.0];
/// `(image_id, label, confidence, x0, y0, x1, y1)`
const SSD_ROW_LEN: usize = 7;

/// Face box in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// One detector output row with box corners normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub confidence: f32,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

pub trait FaceDetector: Send {
    /// The single most confident face in `frame`, if it clears the threshold.
    fn detect(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<Detection>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Picks the global argmax over every raw row, ignoring class labels, and
/// maps it back to pixels when its confidence is strictly above `threshold`.
///
/// The res10 SSD is single-class, so the label column carries no
/// information; a multi-class model would need a label filter here.
pub fn select_best(
    raw: &[RawDetection],
    threshold: f32,
    width: u32,
    height: u32,
) -> Option<Detection> {
    // First occurrence wins on ties.
    let best = raw
        .iter()
        .filter(|d| !d.confidence.is_nan())
        .fold(None::<&RawDetection>, |best, d| match best {
            Some(b) if b.confidence >= d.confidence => Some(b),
            _ => Some(d),
        })?;

    if best.confidence <= threshold {
        return None;
    }

    let (w, h) = (width as f32, height as f32);
    Some(Detection {
        confidence: best.confidence,
        bbox: BoundingBox {
            x0: (best.x0 * w) as i32,
            y0: (best.y0 * h) as i32,
            x1: (best.x1 * w) as i32,
            y1: (best.y1 * h) as i32,
        },
    })
}

/// ResNet-10 SSD face detector (300x300 input) running on ONNX Runtime.
pub struct SsdFaceDetector {
    session: Session,
    confidence_threshold: f32,
}

impl SsdFaceDetector {
    pub fn new(
        model_path: &str,
        confidence_threshold: f32,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        let session = if model_path.starts_with("http://") || model_path.starts_with("https://") {
            builder.commit_from_url(model_path)?
        } else {
            builder.commit_from_file(model_path)?
        };

        tracing::info!(model = %model_path, confidence_threshold, "face detector loaded");

        Ok(Self {
            session,
            confidence_threshold,
        })
    }
}

impl FaceDetector for SsdFaceDetector {
    fn detect(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        let input = preprocess(frame)?;

        let tensor_ref = TensorRef::from_array_view(input.view())?.into_dyn();
        let outputs = self.session.run(ort::inputs![tensor_ref])?;
        if outputs.len() == 0 {
            return Err("face model produced no outputs".into());
        }
        let output = outputs[0].try_extract_array::<f32>()?;
        let raw = parse_ssd_output(&output)?;

        Ok(select_best(
            &raw,
            self.confidence_threshold,
            frame.width(),
            frame.height(),
        ))
    }
}

/// Resize to 300x300 and lay out as mean-subtracted NCHW float32, keeping
/// the decoder's BGR channel order.
fn preprocess(frame: &Frame) -> Result<Array4<f32>, Box<dyn std::error::Error + Send + Sync>> {
    use opencv::core::{Mat, Size};
    use opencv::imgproc;
    use opencv::prelude::*;

    let mut resized = Mat::default();
    imgproc::resize(
        frame.image(),
        &mut resized,
        Size::new(SSD_INPUT_SIZE as i32, SSD_INPUT_SIZE as i32),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let data = resized.data_bytes()?;
    if data.len() < SSD_INPUT_SIZE * SSD_INPUT_SIZE * 3 {
        return Err("Frame data too small".into());
    }

    let mut tensor = Array4::<f32>::zeros((1, 3, SSD_INPUT_SIZE, SSD_INPUT_SIZE));
    for y in 0..SSD_INPUT_SIZE {
        for x in 0..SSD_INPUT_SIZE {
            let idx = (y * SSD_INPUT_SIZE + x) * 3;
            for (c, mean) in SSD_MEAN_BGR.iter().enumerate() {
                tensor[[0, c, y, x]] = data[idx + c] as f32 - mean;
            }
        }
    }

    Ok(tensor)
}

/// Flatten an SSD `[1, 1, N, 7]` output into raw rows.
fn parse_ssd_output(
    output: &ArrayViewD<f32>,
) -> Result<Vec<RawDetection>, Box<dyn std::error::Error + Send + Sync>> {
    let shape = output.shape();
    if shape.last() != Some(&SSD_ROW_LEN) {
        return Err(format!("unexpected face model output shape {shape:?}").into());
    }

    let flat = output.as_slice().ok_or("Cannot get detections slice")?;
    Ok(flat
        .chunks_exact(SSD_ROW_LEN)
        .map(|row| RawDetection {
            confidence: row[2],
            x0: row[3],
            y0: row[4],
            x1: row[5],
            y1: row[6],
        })
        .collect())
}
