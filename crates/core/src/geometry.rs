//! Minimal 3D vector math for positions and goals.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A point or direction in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Vec3) -> f64 {
        (*self - other).length()
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    pub fn normalized(&self) -> Option<Vec3> {
        let len = self.length();
        if len <= f64::EPSILON {
            None
        } else {
            Some(*self * (1.0 / len))
        }
    }

    /// Same point shifted by the given deltas.
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Vec3 {
        Vec3::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(b.distance_to(a), 5.0);
    }

    #[test]
    fn normalized_has_unit_length() {
        let v = Vec3::new(0.0, 0.0, 7.5).normalized().unwrap();
        assert!((v.length() - 1.0).abs() < 1e-9);
        assert_eq!(v, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn zero_vector_has_no_direction() {
        assert!(Vec3::ZERO.normalized().is_none());
    }

    #[test]
    fn offset_moves_point() {
        let p = Vec3::new(1.0, 2.0, 3.0).offset(0.0, 1.8, 0.0);
        assert!((p.y - 3.8).abs() < 1e-9);
    }
}
