mod face_state;

pub use face_state::{FaceState, TrackingSnapshot};
