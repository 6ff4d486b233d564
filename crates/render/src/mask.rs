//! Formation masks: turning a pre-rasterized bitmap into particle targets.
//!
//! Text or artwork is rasterized elsewhere; this module only scans the
//! resulting pixels. A pixel is lit when its alpha channel is non-zero, and
//! lit pixels become targets in row-major scan order, so the first particles
//! land on the top rows of the shape.

use drift_core::bounds::WorldBounds;
use drift_core::error::EngineError;
use glam::DVec2;
use log::debug;

/// The lit pixels of a bitmap, as target coordinates in bitmap space.
#[derive(Debug, Clone, PartialEq)]
pub struct FormationMask {
    width: usize,
    height: usize,
    targets: Vec<DVec2>,
}

impl FormationMask {
    /// Scans an RGBA8 buffer of `width * height * 4` bytes.
    ///
    /// Returns `EngineError::InvalidDimensions` for zero or overflowing
    /// dimensions and `EngineError::InvalidMask` if the buffer length does
    /// not match them.
    pub fn from_rgba(width: usize, height: usize, rgba: &[u8]) -> Result<Self, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions);
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .ok_or(EngineError::InvalidDimensions)?;
        if rgba.len() != expected {
            return Err(EngineError::InvalidMask(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                rgba.len()
            )));
        }

        let targets: Vec<DVec2> = rgba
            .chunks_exact(4)
            .enumerate()
            .filter(|(_, px)| px[3] > 0)
            .map(|(i, _)| DVec2::new((i % width) as f64, (i / width) as f64))
            .collect();
        debug!("mask {width}x{height} has {} lit pixels", targets.len());

        Ok(Self {
            width,
            height,
            targets,
        })
    }

    /// Decodes a bitmap file and scans it with [`FormationMask::from_rgba`].
    #[cfg(feature = "png")]
    pub fn from_png(path: &std::path::Path) -> Result<Self, EngineError> {
        let img = image::open(path)
            .map_err(|e| EngineError::InvalidMask(format!("{}: {e}", path.display())))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        Self::from_rgba(w as usize, h as usize, img.as_raw())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Targets in bitmap coordinates, row-major.
    pub fn targets(&self) -> &[DVec2] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets shifted so the bitmap sits centered in `bounds`.
    ///
    /// The offset is floored to whole pixels. A bitmap the same size as the
    /// world is returned unchanged.
    pub fn centered_in(&self, bounds: WorldBounds) -> Vec<DVec2> {
        let offset = DVec2::new(
            ((bounds.width - self.width as f64) / 2.0).floor(),
            ((bounds.height - self.height as f64) / 2.0).floor(),
        );
        self.targets.iter().map(|&t| t + offset).collect()
    }
}
