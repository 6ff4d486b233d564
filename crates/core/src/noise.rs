//! Three-dimensional gradient (Perlin) noise.
//!
//! [`Perlin3`] evaluates classic improved Perlin noise over a fixed
//! permutation table and the twelve cube-edge gradients. The tables are
//! compile-time statics; sampling is a pure function of its inputs.

use glam::DVec3;

/// A deterministic scalar field over 3-D space.
///
/// Implementations must be pure: identical inputs produce bit-identical
/// outputs, and sampling never mutates shared state.
pub trait NoiseField {
    /// Samples the field at `(x, y, z)`.
    fn sample(&self, x: f64, y: f64, z: f64) -> f64;
}

impl<N: NoiseField + ?Sized> NoiseField for &N {
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        (**self).sample(x, y, z)
    }
}

impl<N: NoiseField + ?Sized> NoiseField for Box<N> {
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        (**self).sample(x, y, z)
    }
}

/// Cube-edge gradient directions, indexed 0..12.
pub const GRADIENTS: [DVec3; 12] = [
    DVec3::new(1.0, 1.0, 0.0),
    DVec3::new(1.0, -1.0, 0.0),
    DVec3::new(-1.0, -1.0, 0.0),
    DVec3::new(-1.0, 1.0, 0.0),
    DVec3::new(1.0, 0.0, -1.0),
    DVec3::new(-1.0, 0.0, -1.0),
    DVec3::new(1.0, 0.0, 1.0),
    DVec3::new(-1.0, 0.0, 1.0),
    DVec3::new(0.0, 1.0, -1.0),
    DVec3::new(0.0, -1.0, -1.0),
    DVec3::new(0.0, 1.0, 1.0),
    DVec3::new(0.0, -1.0, 1.0),
];

/// Reference scrambled permutation of 0..=255.
const BASE_PERMUTATION: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

/// The base permutation repeated twice.
///
/// Lookups reach index `255 + 255 + 1` at most, which the doubled table
/// covers without any wrapping arithmetic.
static PERMUTATION: [u8; 512] = double_permutation();

const fn double_permutation() -> [u8; 512] {
    let mut table = [0u8; 512];
    let mut i = 0;
    while i < 256 {
        table[i] = BASE_PERMUTATION[i];
        table[i + 256] = BASE_PERMUTATION[i];
        i += 1;
    }
    table
}

/// Quintic fade curve `6t^5 - 15t^4 + 10t^3`.
#[inline]
pub fn fade(t: f64) -> f64 {
    t * t * t * (10.0 + (6.0 * t - 15.0) * t)
}

/// Linear interpolation from `v0` (at `t = 0`) to `v1` (at `t = 1`).
#[inline]
pub fn lerp(t: f64, v0: f64, v1: f64) -> f64 {
    v0 * (1.0 - t) + v1 * t
}

#[inline]
fn perm(index: usize) -> usize {
    PERMUTATION[index] as usize
}

/// Classic 3-D Perlin noise over the reference permutation.
///
/// Output is roughly in `[-1, 1]` and never exceeds 2 in magnitude. Every
/// integer lattice point samples to exactly zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Perlin3;

impl Perlin3 {
    pub fn new() -> Self {
        Self
    }

    /// Gradient selected for lattice corner `(x, y, z)`, each already
    /// reduced to `0..=256`.
    #[inline]
    fn gradient(x: usize, y: usize, z: usize) -> DVec3 {
        GRADIENTS[perm(x + perm(y + perm(z))) % GRADIENTS.len()]
    }
}

impl NoiseField for Perlin3 {
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        let cell = DVec3::new(x, y, z).floor();
        let t = DVec3::new(x, y, z) - cell;

        let xi = (cell.x as i64 & 255) as usize;
        let yi = (cell.y as i64 & 255) as usize;
        let zi = (cell.z as i64 & 255) as usize;

        let n000 = Self::gradient(xi, yi, zi).dot(t);
        let n100 = Self::gradient(xi + 1, yi, zi).dot(t - DVec3::X);
        let n010 = Self::gradient(xi, yi + 1, zi).dot(t - DVec3::Y);
        let n110 = Self::gradient(xi + 1, yi + 1, zi).dot(t - DVec3::X - DVec3::Y);
        let n001 = Self::gradient(xi, yi, zi + 1).dot(t - DVec3::Z);
        let n101 = Self::gradient(xi + 1, yi, zi + 1).dot(t - DVec3::X - DVec3::Z);
        let n011 = Self::gradient(xi, yi + 1, zi + 1).dot(t - DVec3::Y - DVec3::Z);
        let n111 = Self::gradient(xi + 1, yi + 1, zi + 1).dot(t - DVec3::ONE);

        let u = fade(t.x);
        let v = fade(t.y);
        let w = fade(t.z);

        let x00 = lerp(u, n000, n100);
        let x01 = lerp(u, n001, n101);
        let x10 = lerp(u, n010, n110);
        let x11 = lerp(u, n011, n111);

        let xy0 = lerp(v, x00, x10);
        let xy1 = lerp(v, x01, x11);

        lerp(w, xy0, xy1)
    }
}
