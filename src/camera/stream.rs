use std::time::{Duration, Instant};

use reqwest::StatusCode;
use thiserror::Error;

use super::frame::Frame;
use super::mjpeg::MjpegDemuxer;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("camera returned status {0}")]
    Status(StatusCode),
}

/// How long one stream connection is held before a fresh reconnect.
///
/// Periodic reconnects keep a single long-lived connection from piling up
/// stale frames in the camera's send buffer.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionBudget {
    pub max_frames: u32,
    pub max_duration: Duration,
}

/// One open MJPEG-over-HTTP connection, yielding decoded frames in arrival
/// order until the stream ends or its budget is spent.
pub struct MjpegStream {
    response: reqwest::Response,
    demuxer: MjpegDemuxer,
    budget: ConnectionBudget,
    opened_at: Instant,
    frames: u32,
}

impl MjpegStream {
    pub async fn connect(
        client: &reqwest::Client,
        url: &str,
        budget: ConnectionBudget,
    ) -> Result<Self, CameraError> {
        let response = client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CameraError::Status(status));
        }

        Ok(Self {
            response,
            demuxer: MjpegDemuxer::new(),
            budget,
            opened_at: Instant::now(),
            frames: 0,
        })
    }

    /// Next decodable frame, or `None` once the stream has ended or the
    /// connection budget is exhausted. Undecodable slices are skipped.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        loop {
            if self.budget_exhausted() {
                return Ok(None);
            }

            while let Some(jpeg) = self.demuxer.next_jpeg() {
                match Frame::decode_jpeg(&jpeg) {
                    Some(frame) => {
                        self.frames += 1;
                        return Ok(Some(frame));
                    }
                    None => {
                        tracing::trace!(bytes = jpeg.len(), "skipping undecodable jpeg slice");
                    }
                }
            }

            let remaining = self
                .budget
                .max_duration
                .saturating_sub(self.opened_at.elapsed());
            let chunk = match tokio::time::timeout(remaining, self.response.chunk()).await {
                Ok(chunk) => chunk?,
                Err(_) => return Ok(None),
            };

            match chunk {
                Some(bytes) if !bytes.is_empty() => self.demuxer.push(&bytes),
                _ => {
                    tracing::debug!(
                        frames = self.frames,
                        pending_bytes = self.demuxer.pending_bytes(),
                        "camera stream ended"
                    );
                    return Ok(None);
                }
            }
        }
    }

    pub fn frames_yielded(&self) -> u32 {
        self.frames
    }

    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }

    fn budget_exhausted(&self) -> bool {
        self.frames >= self.budget.max_frames || self.opened_at.elapsed() > self.budget.max_duration
    }
}
