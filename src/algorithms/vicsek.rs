use crate::geometry::Domain;
use crate::visibility::{Neighbour, NeighbourSet};
use nalgebra::Vector2;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Vectors shorter than this are treated as zero before normalization.
pub const DEGENERATE_NORM: f64 = 1.0e-12;
pub const DEFAULT_NOISE: f64 = 0.0;
pub const DEFAULT_SPEED: f64 = 1.0;
pub const DEFAULT_K: usize = 1;

/// Which visible neighbours contribute to the heading average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NeighbourSelectionMechanism {
    #[default]
    Nearest,
    Farthest,
    All,
}

impl NeighbourSelectionMechanism {
    /// Sub-select from a distance-ordered visible set.
    pub fn select<'a>(&self, set: &'a NeighbourSet, k: usize) -> &'a [Neighbour] {
        let visible = set.visible();
        let k = k.min(visible.len());
        match self {
            Self::Nearest => &visible[..k],
            Self::Farthest => &visible[visible.len() - k..],
            Self::All => visible,
        }
    }
}

/// Resolution of a zero-magnitude heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegenerateHeading {
    /// Keep the heading of the previous step.
    #[default]
    RetainPrevious,
    /// Fall back to the +x axis.
    Canonical,
}

impl DegenerateHeading {
    pub fn resolve(&self, previous: &Vector2<f64>) -> Vector2<f64> {
        match self {
            Self::RetainPrevious => *previous,
            Self::Canonical => Vector2::new(1.0, 0.0),
        }
    }
}

pub fn normalize_or_zero(v: &Vector2<f64>) -> Vector2<f64> {
    let norm = v.norm();
    if norm.is_finite() && norm > DEGENERATE_NORM { *v / norm } else { Vector2::zeros() }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VicsekParams {
    /// Standard deviation of the additive Gaussian heading noise.
    pub noise: f64,
    pub degenerate: DegenerateHeading,
    /// Isolated agents still re-average (their own heading) and receive noise.
    pub update_if_no_neighbours: bool,
}

impl Default for VicsekParams {
    fn default() -> Self {
        Self {
            noise: DEFAULT_NOISE,
            degenerate: DegenerateHeading::default(),
            update_if_no_neighbours: true,
        }
    }
}

/// Read-only per-step inputs of the orientation update.
pub struct OrientationInputs<'a> {
    pub orientations: &'a [Vector2<f64>],
    pub sets: &'a [NeighbourSet],
    pub mechanisms: &'a [NeighbourSelectionMechanism],
    pub ks: &'a [usize],
    /// Alive and due to update this step (activation time delay elapsed).
    pub ready: &'a [bool],
    /// Pre-drawn noise, one vector per agent.
    pub noise: &'a [Vector2<f64>],
}

#[derive(Debug, Clone)]
pub struct Vicsek {
    pub params: VicsekParams,
}

impl Vicsek {
    pub fn new(params: VicsekParams) -> Self {
        Self { params }
    }

    /// Draw one noise vector per agent from the shared generator.
    ///
    /// Drawn sequentially so the parallel read phase stays deterministic.
    pub fn sample_noise<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Vector2<f64>> {
        let distr = if self.params.noise > 0.0 {
            Normal::new(0.0, self.params.noise).ok()
        } else {
            None
        };
        match distr {
            Some(d) => (0..n)
                .map(|_| Vector2::new(d.sample(rng), d.sample(rng)))
                .collect(),
            None => vec![Vector2::zeros(); n],
        }
    }

    pub fn orientations(&self, inputs: &OrientationInputs<'_>) -> Vec<Vector2<f64>> {
        let n = inputs.orientations.len();

        #[cfg(feature = "parallel")]
        let out = {
            use rayon::prelude::*;
            (0..n).into_par_iter().map(|i| self.orientation_of(i, inputs)).collect()
        };

        #[cfg(not(feature = "parallel"))]
        let out = (0..n).map(|i| self.orientation_of(i, inputs)).collect();

        out
    }

    fn orientation_of(&self, i: usize, inputs: &OrientationInputs<'_>) -> Vector2<f64> {
        let previous = inputs.orientations[i];
        if !inputs.ready[i] {
            return previous;
        }

        let selected = inputs.mechanisms[i].select(&inputs.sets[i], inputs.ks[i]);
        if selected.is_empty() && !self.params.update_if_no_neighbours {
            return previous;
        }

        let mut sum = previous;
        for nb in selected {
            sum += inputs.orientations[nb.index];
        }
        let mean = normalize_or_zero(&sum);

        let perturbed = normalize_or_zero(&(mean + inputs.noise[i]));
        if perturbed == Vector2::zeros() {
            self.params.degenerate.resolve(&previous)
        } else {
            perturbed
        }
    }

    /// `position += dt * speed * orientation`, wrapped into the domain.
    pub fn integrate(
        &self,
        domain: &Domain,
        positions: &[Vector2<f64>],
        orientations: &[Vector2<f64>],
        speeds: &[f64],
        dt: f64,
    ) -> Vec<Vector2<f64>> {
        positions
            .iter()
            .zip(orientations)
            .zip(speeds)
            .map(|((p, o), s)| domain.wrap(&(*p + *o * (dt * s))))
            .collect()
    }
}
