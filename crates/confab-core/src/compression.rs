//! Raw DEFLATE compression of SDP text.

use crate::error::FrameError;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use std::io::{Read, Write};

/// Upper bound on inflated SDP size
pub const MAX_INFLATED_SDP_BYTES: usize = 1024 * 1024;

/// Compress SDP text
///
/// # Errors
/// Returns `FrameError::Compression` if the encoder fails
pub fn compress_sdp(sdp: &str) -> Result<Vec<u8>, FrameError> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(sdp.len() / 2), Compression::default());
    encoder
        .write_all(sdp.as_bytes())
        .map_err(|e| FrameError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| FrameError::Compression(e.to_string()))
}

/// Decompress SDP text
///
/// # Errors
/// Returns `FrameError::Compression` if the data is not valid DEFLATE, the
/// output exceeds [`MAX_INFLATED_SDP_BYTES`], or it is not UTF-8
pub fn decompress_sdp(compressed: &[u8]) -> Result<String, FrameError> {
    let mut inflated = Vec::with_capacity(compressed.len() * 4);
    DeflateDecoder::new(compressed)
        .take(MAX_INFLATED_SDP_BYTES as u64 + 1)
        .read_to_end(&mut inflated)
        .map_err(|e| FrameError::Compression(e.to_string()))?;

    if inflated.len() > MAX_INFLATED_SDP_BYTES {
        return Err(FrameError::Compression(format!(
            "inflated SDP exceeds {MAX_INFLATED_SDP_BYTES} bytes"
        )));
    }

    String::from_utf8(inflated).map_err(|e| FrameError::Compression(e.to_string()))
}
