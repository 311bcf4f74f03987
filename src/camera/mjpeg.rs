const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Largest partial frame kept while waiting for its EOI marker.
pub const MAX_PENDING_BYTES: usize = 8 * 1024 * 1024;

/// Splits a continuous MJPEG byte stream into JPEG slices on SOI/EOI markers.
///
/// The buffer never holds bytes from before the last emitted frame's EOI,
/// and junk ahead of the next SOI is dropped as soon as it is seen.
#[derive(Debug)]
pub struct MjpegDemuxer {
    buffer: Vec<u8>,
    // Offset into `buffer` where the next EOI search resumes.
    eoi_scan_from: usize,
}

impl MjpegDemuxer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            eoi_scan_from: SOI.len(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pop the next complete JPEG slice (SOI through EOI inclusive).
    pub fn next_jpeg(&mut self) -> Option<Vec<u8>> {
        let Some(start) = find_marker(&self.buffer, SOI, 0) else {
            // A trailing 0xFF may be the first half of a split SOI.
            let keep = usize::from(self.buffer.last() == Some(&SOI[0]));
            let junk = self.buffer.len() - keep;
            self.buffer.drain(..junk);
            self.eoi_scan_from = SOI.len();
            return None;
        };

        if start > 0 {
            self.buffer.drain(..start);
            self.eoi_scan_from = SOI.len();
        }

        let from = self.eoi_scan_from.max(SOI.len());
        match find_marker(&self.buffer, EOI, from) {
            Some(end) => {
                let frame_end = end + EOI.len();
                let jpeg: Vec<u8> = self.buffer.drain(..frame_end).collect();
                self.eoi_scan_from = SOI.len();
                Some(jpeg)
            }
            None if self.buffer.len() > MAX_PENDING_BYTES => {
                tracing::warn!(
                    pending = self.buffer.len(),
                    "no EOI marker within limit, dropping partial frame"
                );
                self.buffer.clear();
                self.eoi_scan_from = SOI.len();
                None
            }
            None => {
                self.eoi_scan_from = self.buffer.len().saturating_sub(1).max(SOI.len());
                None
            }
        }
    }

    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for MjpegDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(2)
        .position(|w| w == marker)
        .map(|pos| pos + from)
}
