use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;

/// A decoded BGR raster. Owned by the iteration that produced it.
pub struct Frame {
    image: Mat,
}

impl Frame {
    /// Decode one JPEG slice. Returns `None` for anything the codec rejects
    /// or that decodes to an empty image.
    pub fn decode_jpeg(data: &[u8]) -> Option<Self> {
        let buf = Vector::<u8>::from_slice(data);
        let image = imgcodecs::imdecode(&buf, imgcodecs::IMREAD_COLOR).ok()?;
        Self::from_mat(image)
    }

    pub fn from_mat(image: Mat) -> Option<Self> {
        if image.rows() <= 0 || image.cols() <= 0 {
            return None;
        }
        Some(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.cols() as u32
    }

    pub fn height(&self) -> u32 {
        self.image.rows() as u32
    }

    pub fn image(&self) -> &Mat {
        &self.image
    }
}

#[cfg(test)]
pub fn encode_test_jpeg(width: i32, height: i32) -> Vec<u8> {
    use opencv::core::{Scalar, CV_8UC3};

    let mat = Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(128.0))
        .expect("allocate test image");
    let mut buf = Vector::<u8>::new();
    imgcodecs::imencode(".jpg", &mat, &mut buf, &Vector::<i32>::new()).expect("encode test jpeg");
    buf.to_vec()
}
