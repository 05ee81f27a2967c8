//! Small 3-D vector toolkit shared by every stage of the engine.
//!
//! World space has `y` pointing up and `z` pointing forward, the convention
//! the spatial-mapping layer reports in. Distances are in meters.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::Display;
use std::ops::{Add, Mul, Neg, Sub};

/// Meters, seconds and radians are all plain `f64`s.
pub type Meters = f64;
#[allow(missing_docs)]
pub type Seconds = f64;
#[allow(missing_docs)]
pub type Radian = f64;

/// A point (or a direction, depending on context) in world space.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    #[allow(missing_docs)]
    pub x: f64,
    #[allow(missing_docs)]
    pub y: f64,
    #[allow(missing_docs)]
    pub z: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Point = Point {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    /// World up.
    pub const UP: Point = Point {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    #[allow(missing_docs)]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Point { x, y, z }
    }

    /// Euclidean distance between two points.
    pub fn abs_dist(&self, other: &Self) -> Meters {
        (*self - *other).length()
    }

    #[allow(missing_docs)]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[allow(missing_docs)]
    pub fn cross(&self, other: &Self) -> Self {
        Point {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    #[allow(missing_docs)]
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len <= f64::EPSILON {
            Point::ZERO
        } else {
            *self * (1.0 / len)
        }
    }

    /// Angle between two directions, in `[0, PI]`.
    pub fn angle_to(&self, other: &Self) -> Radian {
        let denom = self.length() * other.length();
        if denom <= f64::EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos()
    }

    /// Draws a point uniformly from the surface of the unit sphere.
    pub fn random_on_unit_sphere<R: Rng + ?Sized>(rng: &mut R) -> Self {
        // Archimedes: a uniform height and a uniform azimuth give a uniform
        // distribution over the sphere's surface.
        let z: f64 = rng.gen_range(-1.0..=1.0);
        let azimuth: Radian = rng.gen_range(0.0..(2.0 * PI));
        let ring = (1.0 - z * z).max(0.0).sqrt();
        Point {
            x: ring * azimuth.cos(),
            y: ring * azimuth.sin(),
            z,
        }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Where the user's head is and which way they are looking.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Pose {
    #[allow(missing_docs)]
    pub position: Point,
    /// Gaze direction. Not required to be normalized.
    pub forward: Point,
}

impl Pose {
    #[allow(missing_docs)]
    pub fn new(position: Point, forward: Point) -> Self {
        Pose { position, forward }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose {
            position: Point::new(0.0, 1.6, 0.0),
            forward: Point::new(0.0, 0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn unit_sphere_points_have_unit_length() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let p = Point::random_on_unit_sphere(&mut rng);
            assert!((p.length() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn unit_sphere_points_cover_both_hemispheres() {
        let mut rng = StdRng::seed_from_u64(11);
        let pts: Vec<Point> = (0..200)
            .map(|_| Point::random_on_unit_sphere(&mut rng))
            .collect();
        assert!(pts.iter().any(|p| p.z > 0.5));
        assert!(pts.iter().any(|p| p.z < -0.5));
        assert!(pts.iter().any(|p| p.x > 0.5));
        assert!(pts.iter().any(|p| p.x < -0.5));
    }

    #[test]
    fn distances_and_angles() {
        let a = Point::new(1.0, 2.0, 2.0);
        assert!((a.length() - 3.0).abs() < 1e-12);
        assert!((a.abs_dist(&Point::ZERO) - 3.0).abs() < 1e-12);

        let x = Point::new(1.0, 0.0, 0.0);
        let z = Point::new(0.0, 0.0, 4.0);
        assert!((x.angle_to(&z) - PI / 2.0).abs() < 1e-12);
        assert_eq!(x.cross(&Point::UP), Point::new(0.0, 0.0, 1.0));
        assert_eq!(Point::ZERO.normalized(), Point::ZERO);
    }
}
