#![deny(unsafe_code)]
//! The host-side collaborators of the particle core: a dot rasterizer, PNG
//! snapshots, and formation masks scanned from bitmaps.
//!
//! Nothing here feeds back into the simulation except the target list a
//! [`FormationMask`] produces.

pub mod frame;
pub mod mask;
pub mod pixel;

#[cfg(feature = "png")]
pub mod snapshot;

pub use frame::Frame;
pub use mask::FormationMask;
