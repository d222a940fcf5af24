//! Order metrics used as switching inputs.

use crate::visibility::NeighbourSet;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Which value each agent feeds into its threshold history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThresholdEvaluationMethod {
    /// Order of the agent and its visible neighbours.
    #[default]
    LocalOrder,
    /// Order of the whole living swarm, shared by every agent.
    GlobalOrder,
}

/// Magnitude of the mean of a set of unit vectors, in `[0, 1]`.
pub fn order<'a, I>(orientations: I) -> f64
where
    I: IntoIterator<Item = &'a Vector2<f64>>,
{
    let mut sum = Vector2::zeros();
    let mut count = 0usize;
    for o in orientations {
        sum += o;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    (sum.norm() / count as f64).min(1.0)
}

pub fn global_order(orientations: &[Vector2<f64>], alive: &[bool]) -> f64 {
    order(
        orientations
            .iter()
            .zip(alive)
            .filter(|(_, a)| **a)
            .map(|(o, _)| o),
    )
}

/// Local order of the owner of `set`, the owner itself included.
pub fn local_order(orientations: &[Vector2<f64>], set: &NeighbourSet) -> f64 {
    order(std::iter::once(set.owner()).chain(set.indices()).map(|j| &orientations[j]))
}

/// One threshold-evaluation value per agent for this step.
pub fn threshold_values(
    method: ThresholdEvaluationMethod,
    orientations: &[Vector2<f64>],
    alive: &[bool],
    sets: &[NeighbourSet],
) -> Vec<f64> {
    match method {
        ThresholdEvaluationMethod::LocalOrder => {
            sets.iter().map(|s| local_order(orientations, s)).collect()
        }
        ThresholdEvaluationMethod::GlobalOrder => {
            vec![global_order(orientations, alive); orientations.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::Neighbour;

    #[test]
    fn aligned_swarm_has_full_order() {
        let o = vec![Vector2::new(0.0, 1.0); 5];
        assert!((global_order(&o, &[true; 5]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opposing_pair_has_zero_order() {
        let o = vec![Vector2::new(1.0, 0.0), Vector2::new(-1.0, 0.0)];
        assert!(global_order(&o, &[true, true]).abs() < 1e-12);
    }

    #[test]
    fn dead_agents_do_not_count() {
        let o = vec![Vector2::new(1.0, 0.0), Vector2::new(-1.0, 0.0)];
        assert!((global_order(&o, &[true, false]) - 1.0).abs() < 1e-12);
        assert_eq!(global_order(&o, &[false, false]), 0.0);
    }

    #[test]
    fn local_order_includes_owner() {
        let o = vec![Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0), Vector2::new(-1.0, 0.0)];
        let isolated = NeighbourSet::empty(0);
        assert!((local_order(&o, &isolated) - 1.0).abs() < 1e-12);

        let set = NeighbourSet::new(0, vec![Neighbour { index: 2, distance_squared: 1.0 }]);
        assert!(local_order(&o, &set).abs() < 1e-12);
    }

    #[test]
    fn global_method_broadcasts_one_value() {
        let o = vec![Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)];
        let sets = vec![NeighbourSet::empty(0), NeighbourSet::empty(1)];
        let values =
            threshold_values(ThresholdEvaluationMethod::GlobalOrder, &o, &[true, true], &sets);
        assert_eq!(values[0], values[1]);
        assert!((values[0] - 0.5f64.sqrt()).abs() < 1e-12);
    }
}
