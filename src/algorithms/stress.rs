use crate::error::ConfigError;
use crate::visibility::NeighbourSet;
use serde::{Deserialize, Serialize};

pub const DEFAULT_INDIVIDUALISTIC_STRESS_DELTA: f64 = 0.01;
pub const DEFAULT_SOCIAL_STRESS_DELTA: f64 = 0.01;
pub const DEFAULT_STRESS_NUM_NEIGHBOURS: usize = 2;

pub const MAX_STRESS: f64 = 1.0;

/// Stress grows while an agent sees fewer than `target_neighbours` living
/// neighbours and relaxes otherwise. Always clamped to `[0, MAX_STRESS]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressParams {
    pub individualistic_delta: f64,
    pub social_delta: f64,
    pub target_neighbours: usize,
}

impl Default for StressParams {
    fn default() -> Self {
        Self {
            individualistic_delta: DEFAULT_INDIVIDUALISTIC_STRESS_DELTA,
            social_delta: DEFAULT_SOCIAL_STRESS_DELTA,
            target_neighbours: DEFAULT_STRESS_NUM_NEIGHBOURS,
        }
    }
}

impl StressParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.individualistic_delta >= 0.0) {
            return Err(ConfigError::Negative {
                name: "individualistic_delta",
                value: self.individualistic_delta,
            });
        }
        if !(self.social_delta >= 0.0) {
            return Err(ConfigError::Negative { name: "social_delta", value: self.social_delta });
        }
        Ok(())
    }

    /// Stress levels after one step. Dead agents keep their level.
    pub fn update(&self, stress: &[f64], sets: &[NeighbourSet], alive: &[bool]) -> Vec<f64> {
        stress
            .iter()
            .zip(sets)
            .zip(alive)
            .map(|((level, set), alive)| {
                if !alive {
                    return *level;
                }
                let next = if set.len() < self.target_neighbours {
                    level + self.individualistic_delta
                } else {
                    level - self.social_delta
                };
                next.clamp(0.0, MAX_STRESS)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::Neighbour;

    fn crowd(owner: usize, count: usize) -> NeighbourSet {
        NeighbourSet::new(
            owner,
            (0..count)
                .map(|j| Neighbour { index: j + 1, distance_squared: 1.0 })
                .collect(),
        )
    }

    #[test]
    fn isolation_raises_and_company_lowers_stress() {
        let params = StressParams {
            individualistic_delta: 0.1,
            social_delta: 0.05,
            target_neighbours: 2,
        };
        let sets = vec![crowd(0, 1), crowd(0, 3)];
        let next = params.update(&[0.5, 0.5], &sets, &[true, true]);
        assert!((next[0] - 0.6).abs() < 1e-12);
        assert!((next[1] - 0.45).abs() < 1e-12);
    }

    #[test]
    fn stress_is_clamped_and_frozen_for_dead() {
        let params = StressParams {
            individualistic_delta: 0.5,
            social_delta: 0.5,
            target_neighbours: 1,
        };
        let sets = vec![crowd(0, 0), crowd(0, 2), crowd(0, 0)];
        let next = params.update(&[0.9, 0.1, 0.3], &sets, &[true, true, false]);
        assert_eq!(next, vec![1.0, 0.0, 0.3]);
    }

    #[test]
    fn negative_deltas_are_rejected() {
        let params = StressParams { social_delta: -0.1, ..StressParams::default() };
        assert!(params.validate().is_err());
    }
}
