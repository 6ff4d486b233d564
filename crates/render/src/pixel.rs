//! Pure-computation pixel buffer conversion from a [`Frame`].
//!
//! This module is always available (no feature gate) so that any host that
//! hands pixels to its own surface can share the conversion with the PNG path.

use crate::frame::Frame;

/// Expands a luminance frame into an RGBA8 buffer of `width * height * 4`
/// bytes, gray on gray with opaque alpha.
pub fn frame_to_rgba(frame: &Frame) -> Vec<u8> {
    frame
        .data()
        .iter()
        .flat_map(|&v| [v, v, v, 255u8])
        .collect()
}
