mod face;
mod offset;

pub use face::{BoundingBox, Detection, FaceDetector, SsdFaceDetector};
pub use offset::{compute_offset, FaceOffset};
