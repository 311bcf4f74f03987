mod frame;
mod mjpeg;
mod stream;

#[cfg(test)]
pub use frame::encode_test_jpeg;
pub use frame::Frame;
pub use stream::{CameraError, ConnectionBudget, MjpegStream};
