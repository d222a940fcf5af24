//! Field-of-view filtering and occlusion culling.
//!
//! For every living agent this produces the set of other living agents it can
//! perceive this step, ordered by ascending distance (ties by index). The set
//! never contains the owner itself; averaging code adds the owner explicitly.

use crate::error::ConfigError;
use crate::geometry::Domain;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

pub const DEFAULT_RADIUS: f64 = 5.0;
pub const DEFAULT_FOV: f64 = TAU;
pub const DEFAULT_AGENT_RADIUS: f64 = 1.0;

const FULL_CIRCLE_EPS: f64 = 1.0e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionParams {
    /// Perception radius.
    pub radius: f64,
    /// Angular width of the field of view in radians, centred on the heading.
    pub fov: f64,
    pub occlusion: bool,
    /// Physical radius of an agent body, used for occlusion only.
    pub agent_radius: f64,
}

impl Default for VisionParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            fov: DEFAULT_FOV,
            occlusion: false,
            agent_radius: DEFAULT_AGENT_RADIUS,
        }
    }
}

impl VisionParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.radius >= 0.0) {
            return Err(ConfigError::Negative { name: "radius", value: self.radius });
        }
        if !(0.0..=TAU).contains(&self.fov) {
            return Err(ConfigError::InvalidFieldOfView(self.fov));
        }
        if !(self.agent_radius > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "agent_radius",
                value: self.agent_radius,
            });
        }
        Ok(())
    }
}

/// Normalise an angle into `[0, 2π)`.
pub fn normalise_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU { 0.0 } else { a }
}

pub fn heading_angle(orientation: &Vector2<f64>) -> f64 {
    orientation.y.atan2(orientation.x)
}

/// Angular window `[heading - fov/2, heading + fov/2]`, wraparound aware.
#[derive(Debug, Clone, Copy)]
pub struct FieldOfView {
    min: f64,
    max: f64,
    fov: f64,
}

impl FieldOfView {
    pub fn new(heading: f64, fov: f64) -> Self {
        let half = 0.5 * fov;
        Self {
            min: normalise_angle(heading - half),
            max: normalise_angle(heading + half),
            fov,
        }
    }

    /// Whether the absolute bearing `angle` (radians) lies inside the window.
    pub fn contains(&self, angle: f64) -> bool {
        if self.fov >= TAU - FULL_CIRCLE_EPS {
            return true;
        }
        if self.fov <= 0.0 {
            return false;
        }
        let a = normalise_angle(angle);
        if self.min < self.max {
            a >= self.min && a <= self.max
        } else {
            // window crosses the 0/2π boundary
            a >= self.min || a <= self.max
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    pub index: usize,
    pub distance_squared: f64,
}

/// Agents visible to `owner` this step, nearest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighbourSet {
    owner: usize,
    visible: Vec<Neighbour>,
}

impl NeighbourSet {
    pub fn new(owner: usize, visible: Vec<Neighbour>) -> Self {
        Self { owner, visible }
    }

    pub fn empty(owner: usize) -> Self {
        Self { owner, visible: Vec::new() }
    }

    pub fn owner(&self) -> usize { self.owner }
    pub fn visible(&self) -> &[Neighbour] { &self.visible }
    pub fn len(&self) -> usize { self.visible.len() }
    pub fn is_empty(&self) -> bool { self.visible.is_empty() }

    /// Membership with the self-inclusion convention: the owner always counts.
    pub fn contains(&self, index: usize) -> bool {
        index == self.owner || self.visible.iter().any(|n| n.index == index)
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.visible.iter().map(|n| n.index)
    }
}

struct Candidate {
    neighbour: Neighbour,
    offset: Vector2<f64>,
}

/// Compute the visible set of every agent. Dead agents see nothing and are
/// invisible to everyone else.
pub fn neighbour_sets(
    domain: &Domain,
    positions: &[Vector2<f64>],
    orientations: &[Vector2<f64>],
    alive: &[bool],
    params: &VisionParams,
) -> Vec<NeighbourSet> {
    let n = positions.len();

    #[cfg(feature = "parallel")]
    let sets = {
        use rayon::prelude::*;
        (0..n)
            .into_par_iter()
            .map(|i| visible_from(i, domain, positions, orientations, alive, params))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let sets = (0..n)
        .map(|i| visible_from(i, domain, positions, orientations, alive, params))
        .collect();

    sets
}

fn visible_from(
    i: usize,
    domain: &Domain,
    positions: &[Vector2<f64>],
    orientations: &[Vector2<f64>],
    alive: &[bool],
    params: &VisionParams,
) -> NeighbourSet {
    if !alive[i] {
        return NeighbourSet::empty(i);
    }

    let radius2 = params.radius * params.radius;
    let view = FieldOfView::new(heading_angle(&orientations[i]), params.fov);

    let mut candidates: Vec<Candidate> = Vec::new();
    for j in 0..positions.len() {
        if j == i || !alive[j] {
            continue;
        }
        let offset = domain.displacement(&positions[i], &positions[j]);
        let d2 = offset.norm_squared();
        if d2 > radius2 {
            continue;
        }
        // coincident agents have no bearing and are always perceived
        if d2 > 0.0 && !view.contains(offset.y.atan2(offset.x)) {
            continue;
        }
        candidates.push(Candidate {
            neighbour: Neighbour { index: j, distance_squared: d2 },
            offset,
        });
    }

    candidates.sort_by(|a, b| {
        a.neighbour
            .distance_squared
            .total_cmp(&b.neighbour.distance_squared)
            .then(a.neighbour.index.cmp(&b.neighbour.index))
    });

    let visible = if params.occlusion {
        cull_occluded(&candidates, params.agent_radius)
    } else {
        candidates.iter().map(|c| c.neighbour).collect()
    };

    NeighbourSet::new(i, visible)
}

/// Greedy nearest-first sweep: each accepted body hides every farther
/// candidate whose direction lies within its angular radius.
fn cull_occluded(candidates: &[Candidate], agent_radius: f64) -> Vec<Neighbour> {
    let mut occluded = vec![false; candidates.len()];
    let mut visible = Vec::with_capacity(candidates.len());

    for a in 0..candidates.len() {
        if occluded[a] {
            continue;
        }
        let blocker = &candidates[a];
        visible.push(blocker.neighbour);

        let dist = blocker.neighbour.distance_squared.sqrt();
        if dist <= 0.0 {
            continue;
        }
        let angular_radius = if agent_radius >= dist {
            0.5 * PI
        } else {
            (agent_radius / dist).asin()
        };

        for b in (a + 1)..candidates.len() {
            if occluded[b] {
                continue;
            }
            let other = &candidates[b];
            if other.neighbour.distance_squared <= blocker.neighbour.distance_squared {
                continue;
            }
            if angle_between(&blocker.offset, &other.offset) < angular_radius {
                occluded[b] = true;
            }
        }
    }

    visible
}

fn angle_between(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let cross = a.x * b.y - a.y * b.x;
    cross.abs().atan2(a.dot(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(radius: f64, fov: f64, occlusion: bool) -> VisionParams {
        VisionParams { radius, fov, occlusion, agent_radius: 1.0 }
    }

    #[test]
    fn validation_rejects_bad_params() {
        assert!(params(-1.0, TAU, false).validate().is_err());
        assert!(params(1.0, 7.0, false).validate().is_err());
        assert!(params(1.0, -0.1, false).validate().is_err());
        let mut p = params(1.0, PI, true);
        p.agent_radius = 0.0;
        assert!(p.validate().is_err());
        assert!(params(0.0, 0.0, false).validate().is_ok());
    }

    #[test]
    fn field_of_view_handles_wraparound() {
        // heading 0 with a 90° window spans [315°, 45°]
        let view = FieldOfView::new(0.0, 0.5 * PI);
        assert!(view.contains(0.1));
        assert!(view.contains(-0.1));
        assert!(view.contains(TAU - 0.1));
        assert!(!view.contains(PI));
        assert!(!view.contains(0.5 * PI));
    }

    #[test]
    fn field_of_view_distinguishes_opposite_quadrants() {
        // a bearing of 225° must not be confused with 45°
        let view = FieldOfView::new(0.25 * PI, 0.5 * PI);
        assert!(view.contains(0.25 * PI));
        assert!(!view.contains(1.25 * PI));
    }

    #[test]
    fn full_and_empty_fov() {
        assert!(FieldOfView::new(1.0, TAU).contains(4.0));
        assert!(!FieldOfView::new(1.0, 0.0).contains(1.0));
    }

    #[test]
    fn agent_behind_is_outside_half_fov() {
        let domain = Domain::new(20.0, 20.0).unwrap();
        let positions =
            vec![Vector2::new(10.0, 10.0), Vector2::new(8.0, 10.0), Vector2::new(12.0, 10.0)];
        let orientations = vec![Vector2::new(1.0, 0.0); 3];
        let alive = vec![true; 3];
        let sets =
            neighbour_sets(&domain, &positions, &orientations, &alive, &params(5.0, PI, false));
        assert_eq!(sets[0].indices().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn occlusion_hides_agent_behind_blocker() {
        let domain = Domain::new(20.0, 20.0).unwrap();
        let positions =
            vec![Vector2::new(1.0, 5.0), Vector2::new(3.0, 5.0), Vector2::new(5.0, 5.0)];
        let orientations = vec![Vector2::new(1.0, 0.0); 3];
        let alive = vec![true; 3];

        let open =
            neighbour_sets(&domain, &positions, &orientations, &alive, &params(10.0, TAU, false));
        assert!(open[0].contains(2));

        let occluded =
            neighbour_sets(&domain, &positions, &orientations, &alive, &params(10.0, TAU, true));
        assert!(occluded[0].contains(1));
        assert!(!occluded[0].contains(2));
    }

    #[test]
    fn offset_agent_is_not_occluded() {
        let domain = Domain::new(20.0, 20.0).unwrap();
        let positions =
            vec![Vector2::new(1.0, 5.0), Vector2::new(3.0, 5.0), Vector2::new(5.0, 9.0)];
        let orientations = vec![Vector2::new(1.0, 0.0); 3];
        let alive = vec![true; 3];
        let sets =
            neighbour_sets(&domain, &positions, &orientations, &alive, &params(10.0, TAU, true));
        assert!(sets[0].contains(2));
    }

    #[test]
    fn dead_agents_are_masked_out() {
        let domain = Domain::new(10.0, 10.0).unwrap();
        let positions =
            vec![Vector2::new(1.0, 1.0), Vector2::new(2.0, 1.0), Vector2::new(1.0, 2.0)];
        let orientations = vec![Vector2::new(1.0, 0.0); 3];
        let alive = vec![true, false, true];
        let sets =
            neighbour_sets(&domain, &positions, &orientations, &alive, &params(5.0, TAU, false));
        assert_eq!(sets[0].indices().collect::<Vec<_>>(), vec![2]);
        assert!(sets[1].is_empty());
    }

    #[test]
    fn neighbours_sorted_by_distance_then_index() {
        let domain = Domain::new(10.0, 10.0).unwrap();
        let positions = vec![
            Vector2::new(5.0, 5.0),
            Vector2::new(7.0, 5.0),
            Vector2::new(6.0, 5.0),
            Vector2::new(4.0, 5.0),
        ];
        let orientations = vec![Vector2::new(1.0, 0.0); 4];
        let alive = vec![true; 4];
        let sets =
            neighbour_sets(&domain, &positions, &orientations, &alive, &params(5.0, TAU, false));
        assert_eq!(sets[0].indices().collect::<Vec<_>>(), vec![2, 3, 1]);
        assert!(sets[0].contains(0));
    }

    #[test]
    fn radius_uses_periodic_distance() {
        let domain = Domain::new(10.0, 10.0).unwrap();
        let positions = vec![Vector2::new(0.5, 5.0), Vector2::new(9.5, 5.0)];
        let orientations = vec![Vector2::new(1.0, 0.0); 2];
        let alive = vec![true; 2];
        let sets =
            neighbour_sets(&domain, &positions, &orientations, &alive, &params(1.5, TAU, false));
        assert!(sets[0].contains(1));
        assert!(sets[1].contains(0));
    }
}
