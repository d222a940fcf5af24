use crate::algorithms::switching::SwitchValues;
use crate::algorithms::vicsek::normalize_or_zero;
use crate::geometry::Domain;
use nalgebra::Vector2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Column-wise agent state: index `i` of every array describes agent `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmState {
    pub positions: Vec<Vector2<f64>>,
    pub orientations: Vec<Vector2<f64>>,
    /// Nominal per-agent values of the switchable attributes.
    pub switches: SwitchValues,
    pub stress: Vec<f64>,
    pub hunger: Vec<f64>,
    pub alive: Vec<bool>,
}

impl SwarmState {
    pub fn len(&self) -> usize { self.positions.len() }
    pub fn is_empty(&self) -> bool { self.positions.is_empty() }

    pub fn living(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    /// Agents that are alive and whose activation time delay has elapsed.
    pub fn ready(&self, timestep: usize) -> Vec<bool> {
        self.alive
            .iter()
            .zip(&self.switches.delays)
            .map(|(alive, delay)| *alive && timestep % (*delay).max(1) == 0)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InitialDistribution {
    /// Uniform positions, uniformly random headings.
    #[default]
    Random,
    /// Equidistant grid covering the domain, common heading `angle` (radians).
    Ordered { angle: f64 },
}

impl InitialDistribution {
    pub fn generate<R: Rng + ?Sized>(
        &self,
        domain: &Domain,
        n: usize,
        rng: &mut R,
    ) -> (Vec<Vector2<f64>>, Vec<Vector2<f64>>) {
        match *self {
            InitialDistribution::Random => random_state(domain, n, rng),
            InitialDistribution::Ordered { angle } => ordered_state(domain, n, angle),
        }
    }
}

pub fn random_state<R: Rng + ?Sized>(
    domain: &Domain,
    n: usize,
    rng: &mut R,
) -> (Vec<Vector2<f64>>, Vec<Vector2<f64>>) {
    let positions = (0..n)
        .map(|_| {
            Vector2::new(
                rng.gen_range(0.0..domain.width()),
                rng.gen_range(0.0..domain.height()),
            )
        })
        .collect();
    let orientations = (0..n).map(|_| random_heading(rng)).collect();
    (positions, orientations)
}

fn random_heading<R: Rng + ?Sized>(rng: &mut R) -> Vector2<f64> {
    loop {
        let v = Vector2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5));
        let h = normalize_or_zero(&v);
        if h != Vector2::zeros() {
            return h;
        }
    }
}

pub fn ordered_state(
    domain: &Domain,
    n: usize,
    angle: f64,
) -> (Vec<Vector2<f64>>, Vec<Vector2<f64>>) {
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let aspect = domain.width() / domain.height();
    let cols = ((n as f64 * aspect).sqrt().ceil() as usize).clamp(1, n);
    let rows = n.div_ceil(cols);
    let dx = domain.width() / cols as f64;
    let dy = domain.height() / rows as f64;

    let positions = (0..n)
        .map(|i| {
            let (r, c) = (i / cols, i % cols);
            Vector2::new((c as f64 + 0.5) * dx, (r as f64 + 0.5) * dy)
        })
        .collect();
    let heading = Vector2::new(angle.cos(), angle.sin());
    (positions, vec![heading; n])
}

/// Noise amplitude corresponding to `percentage` percent of a full turn.
pub fn noise_amplitude_for_percentage(percentage: f64) -> f64 {
    TAU * percentage / 100.0
}

pub fn particles_for_density(density: f64, domain: &Domain) -> usize {
    (density * domain.area()).round() as usize
}

/// Radius at which an agent sees `neighbours` others on average at `density`.
pub fn radius_for_average_neighbours(neighbours: f64, density: f64) -> f64 {
    (neighbours / (PI * density)).sqrt()
}
