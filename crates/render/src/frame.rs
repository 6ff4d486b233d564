//! A single-channel frame that particles are plotted onto as unit dots.

use drift_core::error::EngineError;
use drift_core::Engine;
use glam::DVec2;

/// Intensity of an empty pixel.
pub const BACKGROUND: u8 = 0;
/// Intensity of a pixel covered by at least one particle.
pub const FOREGROUND: u8 = 255;

/// Row-major luminance raster the size of the world.
///
/// Unlike a toroidal field, plotting clips: a particle outside the frame
/// (for example one converging on an off-screen target) draws nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Creates a cleared frame.
    ///
    /// Returns `EngineError::InvalidDimensions` if either dimension is zero
    /// or if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Result<Self, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions);
        }
        let len = width
            .checked_mul(height)
            .ok_or(EngineError::InvalidDimensions)?;
        Ok(Self {
            width,
            height,
            data: vec![BACKGROUND; len],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Read-only access to the underlying row-major data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Intensity at `(x, y)`, or `None` outside the frame.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.data[y * self.width + x])
    }

    /// Resets every pixel to the background.
    pub fn clear(&mut self) {
        self.data.fill(BACKGROUND);
    }

    /// Fills the pixel containing `p`. Returns `false` if `p` lies outside.
    pub fn plot(&mut self, p: DVec2) -> bool {
        if !(p.x >= 0.0 && p.y >= 0.0) {
            return false;
        }
        let (x, y) = (p.x as usize, p.y as usize);
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y * self.width + x] = FOREGROUND;
        true
    }

    /// Clears the frame, then plots every position. Returns how many landed
    /// inside the frame.
    pub fn draw(&mut self, positions: &[DVec2]) -> usize {
        self.clear();
        positions.iter().filter(|&&p| self.plot(p)).count()
    }

    /// Renders an engine's current positions onto a new frame sized to its
    /// world bounds (rounded up to whole pixels).
    pub fn from_engine(engine: &dyn Engine) -> Result<Self, EngineError> {
        let bounds = engine.bounds();
        if !(bounds.width.is_finite() && bounds.height.is_finite()) {
            return Err(EngineError::InvalidDimensions);
        }
        let mut frame = Self::new(bounds.width.ceil() as usize, bounds.height.ceil() as usize)?;
        frame.draw(engine.positions());
        Ok(frame)
    }

    /// Number of foreground pixels.
    pub fn lit_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == FOREGROUND).count()
    }
}
