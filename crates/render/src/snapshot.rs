//! CPU-side PNG rendering of a [`Frame`].
//!
//! This module is feature-gated behind `png` (default on) so hosts that draw
//! to their own surface can depend on this crate without pulling in `image`.

use std::path::Path;

use drift_core::error::EngineError;
use log::debug;

use crate::frame::Frame;
use crate::pixel::frame_to_rgba;

/// Writes a frame as a PNG image.
///
/// Returns `EngineError::InvalidDimensions` if the frame dimensions overflow
/// `u32`, or `EngineError::Io` on write failure.
pub fn write_png(frame: &Frame, path: &Path) -> Result<(), EngineError> {
    let rgba = frame_to_rgba(frame);
    let w = u32::try_from(frame.width()).map_err(|_| EngineError::InvalidDimensions)?;
    let h = u32::try_from(frame.height()).map_err(|_| EngineError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, rgba)
        .ok_or_else(|| EngineError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| EngineError::Io(e.to_string()))?;
    debug!("wrote {w}x{h} frame to {}", path.display());
    Ok(())
}
