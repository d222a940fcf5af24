//! Periodic (toroidal) domain and minimum-image distances.

use crate::error::ConfigError;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DOMAIN_SIZE: f64 = 25.0;

/// Rectangular domain `[0, Lx) × [0, Ly)` with periodic boundaries on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Domain {
    size: Vector2<f64>,
}

impl Domain {
    pub fn new(width: f64, height: f64) -> Result<Self, ConfigError> {
        let valid = |l: f64| l.is_finite() && l > 0.0;
        if !valid(width) || !valid(height) {
            return Err(ConfigError::InvalidDomain(width, height));
        }
        Ok(Self {
            size: Vector2::new(width, height),
        })
    }

    pub fn width(&self) -> f64 { self.size.x }
    pub fn height(&self) -> f64 { self.size.y }
    pub fn size(&self) -> Vector2<f64> { self.size }
    pub fn area(&self) -> f64 { self.size.x * self.size.y }

    pub fn centre(&self) -> Vector2<f64> { self.size * 0.5 }

    /// Shortest displacement from `from` to `to` under the minimum-image convention.
    pub fn displacement(&self, from: &Vector2<f64>, to: &Vector2<f64>) -> Vector2<f64> {
        let d = to - from;
        Vector2::new(
            minimum_image(d.x, self.size.x),
            minimum_image(d.y, self.size.y),
        )
    }

    pub fn distance_squared(&self, a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
        self.displacement(a, b).norm_squared()
    }

    /// Map a point back into the domain: `p - L * floor(p / L)` per axis.
    pub fn wrap(&self, p: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(wrap_axis(p.x, self.size.x), wrap_axis(p.y, self.size.y))
    }

    pub fn contains(&self, p: &Vector2<f64>) -> bool {
        (0.0..self.size.x).contains(&p.x) && (0.0..self.size.y).contains(&p.y)
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            size: Vector2::new(DEFAULT_DOMAIN_SIZE, DEFAULT_DOMAIN_SIZE),
        }
    }
}

impl TryFrom<[f64; 2]> for Domain {
    type Error = ConfigError;

    fn try_from(size: [f64; 2]) -> Result<Self, Self::Error> {
        Domain::new(size[0], size[1])
    }
}

impl From<Domain> for [f64; 2] {
    fn from(domain: Domain) -> Self {
        [domain.size.x, domain.size.y]
    }
}

fn minimum_image(d: f64, l: f64) -> f64 {
    d - l * (d / l).round()
}

fn wrap_axis(x: f64, l: f64) -> f64 {
    let w = x - l * (x / l).floor();
    // -1e-17 wraps to exactly l in floating point
    if w >= l || w < 0.0 { 0.0 } else { w }
}

/// Squared minimum-image distance from `origin` to every position.
///
/// `origin` need not be one of `positions`; this covers the "virtual point"
/// case (an event origin treated as an extra point) without an N×N matrix.
pub fn squared_distances_from(
    domain: &Domain,
    origin: &Vector2<f64>,
    positions: &[Vector2<f64>],
) -> Vec<f64> {
    positions
        .iter()
        .map(|p| domain.distance_squared(origin, p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_domain() {
        assert!(Domain::new(0.0, 1.0).is_err());
        assert!(Domain::new(1.0, -2.0).is_err());
        assert!(Domain::new(f64::NAN, 1.0).is_err());
        assert!(Domain::new(3.0, 4.0).is_ok());
    }

    #[test]
    fn displacement_takes_shortest_wrapped_path() {
        let d = Domain::new(10.0, 10.0).unwrap();
        let a = Vector2::new(0.5, 9.5);
        let b = Vector2::new(9.5, 0.5);
        let disp = d.displacement(&a, &b);
        assert!((disp.x + 1.0).abs() < 1e-12);
        assert!((disp.y - 1.0).abs() < 1e-12);
        assert!((d.distance_squared(&a, &b) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn distance_is_symmetric() {
        let d = Domain::new(7.0, 3.0).unwrap();
        let a = Vector2::new(6.2, 0.1);
        let b = Vector2::new(0.3, 2.9);
        assert_eq!(d.distance_squared(&a, &b), d.distance_squared(&b, &a));
    }

    #[test]
    fn wrap_maps_into_half_open_domain() {
        let d = Domain::new(10.0, 5.0).unwrap();
        let w = d.wrap(&Vector2::new(-0.5, 12.0));
        assert!((w.x - 9.5).abs() < 1e-12);
        assert!((w.y - 2.0).abs() < 1e-12);
        assert!(d.contains(&d.wrap(&Vector2::new(10.0, 5.0))));
        assert!(d.contains(&d.wrap(&Vector2::new(-1e-17, -1e-17))));
    }

    #[test]
    fn virtual_point_distances() {
        let d = Domain::new(10.0, 10.0).unwrap();
        let positions = vec![Vector2::new(1.0, 1.0), Vector2::new(9.0, 1.0)];
        let dists = squared_distances_from(&d, &Vector2::new(0.0, 1.0), &positions);
        assert!((dists[0] - 1.0).abs() < 1e-12);
        assert!((dists[1] - 1.0).abs() < 1e-12);
    }
}
