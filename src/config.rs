use crate::algorithms::stress::StressParams;
use crate::algorithms::switching::SwitchSummary;
use crate::algorithms::vicsek::{
    DegenerateHeading, NeighbourSelectionMechanism, VicsekParams, DEFAULT_K, DEFAULT_NOISE,
    DEFAULT_SPEED,
};
use crate::error::{ConfigError, Result};
use crate::events::{FoodParams, StimulusEvent};
use crate::geometry::Domain;
use crate::metrics::ThresholdEvaluationMethod;
use crate::models::swarm::InitialDistribution;
use crate::visibility::VisionParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PARTICLES: usize = 31;
pub const DEFAULT_DT: f64 = 1.0;
pub const DEFAULT_TMAX: f64 = 1000.0;
pub const DEFAULT_SEED: u64 = 0;
pub const DEFAULT_HISTORY_INTERVAL: usize = 1;

/// Guards `tmax / dt` against landing just below an integer.
const STEP_COUNT_EPS: f64 = 1.0e-9;

/// Complete description of one run. Every field has a default, so a TOML
/// file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub domain: Domain,
    pub particles: usize,
    pub noise: f64,
    #[serde(flatten)]
    pub vision: VisionParams,
    pub speed: f64,
    pub k: usize,
    pub neighbour_selection: NeighbourSelectionMechanism,
    pub dt: f64,
    pub tmax: f64,
    pub seed: u64,
    pub degenerate: DegenerateHeading,
    pub update_if_no_neighbours: bool,
    pub threshold_evaluation: ThresholdEvaluationMethod,
    pub switching: Option<SwitchSummary>,
    /// One delay per agent; empty means every agent updates every step.
    pub activation_time_delays: Vec<usize>,
    pub delay_relevant_for_events: bool,
    pub stress: Option<StressParams>,
    pub food: Option<FoodParams>,
    pub stimuli: Vec<StimulusEvent>,
    pub initial: InitialDistribution,
    pub record_history: bool,
    pub history_interval: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            domain: Domain::default(),
            particles: DEFAULT_PARTICLES,
            noise: DEFAULT_NOISE,
            vision: VisionParams::default(),
            speed: DEFAULT_SPEED,
            k: DEFAULT_K,
            neighbour_selection: NeighbourSelectionMechanism::default(),
            dt: DEFAULT_DT,
            tmax: DEFAULT_TMAX,
            seed: DEFAULT_SEED,
            degenerate: DegenerateHeading::default(),
            update_if_no_neighbours: true,
            threshold_evaluation: ThresholdEvaluationMethod::default(),
            switching: None,
            activation_time_delays: Vec::new(),
            delay_relevant_for_events: false,
            stress: None,
            food: None,
            stimuli: Vec::new(),
            initial: InitialDistribution::default(),
            record_history: true,
            history_interval: DEFAULT_HISTORY_INTERVAL,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.particles == 0 {
            return Err(ConfigError::NoParticles);
        }
        non_negative("noise", self.noise)?;
        non_negative("speed", self.speed)?;
        self.vision.validate()?;
        if self.k == 0 || self.k >= self.particles {
            return Err(ConfigError::InvalidNeighbourCount { k: self.k, particles: self.particles });
        }
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(ConfigError::NonPositive { name: "dt", value: self.dt });
        }
        non_negative("tmax", self.tmax)?;
        if self.history_interval == 0 {
            return Err(ConfigError::NonPositive { name: "history_interval", value: 0.0 });
        }

        if !self.activation_time_delays.is_empty() {
            if self.activation_time_delays.len() != self.particles {
                return Err(ConfigError::DelayCountMismatch {
                    expected: self.particles,
                    got: self.activation_time_delays.len(),
                });
            }
            if let Some(&delay) = self.activation_time_delays.iter().find(|d| **d == 0) {
                return Err(ConfigError::InvalidDelay(delay));
            }
        }

        if let Some(switching) = &self.switching {
            switching.validate(self.particles)?;
        }
        if let Some(stress) = &self.stress {
            stress.validate()?;
        }
        if let Some(food) = &self.food {
            food.validate()?;
        }
        for stimulus in &self.stimuli {
            stimulus.validate()?;
        }
        Ok(())
    }

    /// Number of discrete steps, `tmax / dt`.
    pub fn num_steps(&self) -> usize {
        (self.tmax / self.dt + STEP_COUNT_EPS).floor() as usize
    }

    pub fn vicsek_params(&self) -> VicsekParams {
        VicsekParams {
            noise: self.noise,
            degenerate: self.degenerate,
            update_if_no_neighbours: self.update_if_no_neighbours,
        }
    }

    /// Radius given to food sources that do not declare their own.
    pub fn food_radius(&self) -> f64 {
        self.food
            .as_ref()
            .and_then(|f| f.radius)
            .unwrap_or(self.vision.radius)
    }

    /// Every parameter of the run as one JSON object.
    pub fn parameter_summary(&self) -> std::result::Result<serde_json::Value, serde_json::Error> {
        let mut summary = serde_json::to_value(self)?;
        if let Some(map) = summary.as_object_mut() {
            map.insert("num_steps".to_string(), self.num_steps().into());
            map.insert("density".to_string(), (self.particles as f64 / self.domain.area()).into());
        }
        Ok(summary)
    }
}

fn non_negative(name: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { name, value });
    }
    if value < 0.0 {
        return Err(ConfigError::Negative { name, value });
    }
    Ok(())
}
