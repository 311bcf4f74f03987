use serde::Serialize;

use super::face::Detection;

/// Face-center offset from frame center, as a percentage of the half-frame
/// dimension on each axis (roughly -100..100).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceOffset {
    pub dx: f64,
    pub dy: f64,
}

/// Frame dimensions must be positive; the decoder never yields empty frames.
pub fn compute_offset(detection: &Detection, frame_width: u32, frame_height: u32) -> FaceOffset {
    debug_assert!(frame_width > 0 && frame_height > 0);

    let bbox = &detection.bbox;
    let center_x = (bbox.x0 as f64 + bbox.x1 as f64) / 2.0;
    let center_y = (bbox.y0 as f64 + bbox.y1 as f64) / 2.0;

    let camera_x = frame_width as f64 / 2.0;
    let camera_y = frame_height as f64 / 2.0;

    FaceOffset {
        dx: (center_x - camera_x) / camera_x * 100.0,
        dy: (center_y - camera_y) / camera_y * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::face::BoundingBox;

    fn detection(x0: i32, y0: i32, x1: i32, y1: i32) -> Detection {
        Detection {
            confidence: 0.9,
            bbox: BoundingBox { x0, y0, x1, y1 },
        }
    }

    #[test]
    fn test_centered_box_has_zero_offset() {
        let offset = compute_offset(&detection(80, 60, 120, 140), 200, 200);
        assert_eq!(offset, FaceOffset { dx: 0.0, dy: 0.0 });
    }

    #[test]
    fn test_box_near_left_edge() {
        let offset = compute_offset(&detection(0, 90, 20, 110), 200, 200);
        assert!((offset.dx - -90.0).abs() < 1e-9);
        assert!(offset.dy.abs() < 1e-9);
    }

    #[test]
    fn test_box_in_lower_right_corner() {
        let offset = compute_offset(&detection(300, 220, 320, 240), 320, 240);
        assert!((offset.dx - 93.75).abs() < 1e-9);
        assert!((offset.dy - 91.666_666_666).abs() < 1e-6);
    }

    #[test]
    fn test_non_square_frame_scales_per_axis() {
        let offset = compute_offset(&detection(0, 0, 160, 120), 640, 480);
        assert!((offset.dx - -75.0).abs() < 1e-9);
        assert!((offset.dy - -75.0).abs() < 1e-9);
    }
}
