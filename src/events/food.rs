use super::{select_nearest, EventContext, EventOutcome};
use crate::error::ConfigError;
use crate::geometry::squared_distances_from;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Food event declared in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEventSpec {
    pub start: usize,
    pub origin: [f64; 2],
    /// Defaults to the food radius of the run.
    #[serde(default)]
    pub radius: Option<f64>,
    pub amount: usize,
}

pub const DEFAULT_MAX_FOOD: f64 = 50.0;
pub const DEFAULT_SOURCE_AMOUNT: usize = 10;
pub const DEFAULT_HUNGER_DECAY: f64 = 0.1;

/// Hunger levels this close to zero count as starved.
const STARVED_EPS: f64 = 1.0e-9;

/// Foraging parameters of a run. Hunger starts at `max_food` and counts
/// down; an agent dies when it reaches zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodParams {
    pub max_food: f64,
    /// Per-step probability that a new source appears at a random origin.
    pub appearance_probability: f64,
    pub source_amount: usize,
    /// Radius of spawned sources; the perception radius when absent.
    pub radius: Option<f64>,
    pub hunger_decay: f64,
    pub events: Vec<FoodEventSpec>,
}

impl Default for FoodParams {
    fn default() -> Self {
        Self {
            max_food: DEFAULT_MAX_FOOD,
            appearance_probability: 0.0,
            source_amount: DEFAULT_SOURCE_AMOUNT,
            radius: None,
            hunger_decay: DEFAULT_HUNGER_DECAY,
            events: Vec::new(),
        }
    }
}

impl FoodParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_food > 0.0) || !self.max_food.is_finite() {
            return Err(ConfigError::NonPositive { name: "max_food", value: self.max_food });
        }
        if !(0.0..=1.0).contains(&self.appearance_probability) {
            return Err(ConfigError::InvalidProbability {
                name: "appearance_probability",
                value: self.appearance_probability,
            });
        }
        if !(self.hunger_decay >= 0.0) {
            return Err(ConfigError::Negative { name: "hunger_decay", value: self.hunger_decay });
        }
        let radii = self.radius.into_iter().chain(self.events.iter().filter_map(|e| e.radius));
        for radius in radii {
            if !(radius >= 0.0) {
                return Err(ConfigError::Negative { name: "food radius", value: radius });
            }
        }
        Ok(())
    }

    /// Satiated agents keep moving even while standing on a source.
    pub fn is_sated(&self, hunger: f64) -> bool {
        hunger >= self.max_food
    }

    /// Hunger and aliveness after one step. `fed[i]` counts the events that
    /// fed agent `i`; unfed agents decay. Dead agents stay dead.
    pub fn next_hunger(
        &self,
        hunger: &[f64],
        fed: &[usize],
        alive: &[bool],
    ) -> (Vec<f64>, Vec<bool>) {
        hunger
            .iter()
            .zip(fed)
            .zip(alive)
            .map(|((&level, &meals), &alive)| {
                if !alive {
                    return (level, false);
                }
                let next = if meals > 0 {
                    level + meals as f64
                } else {
                    level - self.hunger_decay
                };
                let next = if next <= STARVED_EPS { 0.0 } else { next.min(self.max_food) };
                (next, next > 0.0)
            })
            .unzip()
    }
}

/// Budget-limited food source. Feeds the nearest living agents within its
/// radius every step from `start` on, until `amount` is used up.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodEvent {
    start: usize,
    origin: Vector2<f64>,
    radius: f64,
    initial_amount: usize,
    amount: usize,
    duration: Option<usize>,
}

/// Final account of a food event, handed to output collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodEventRecord {
    pub start: usize,
    pub origin: [f64; 2],
    pub radius: f64,
    pub initial_amount: usize,
    pub consumed: usize,
    /// Steps from `start` until the budget ran out; `None` if never exhausted.
    pub duration: Option<usize>,
}

impl FoodEvent {
    pub fn new(
        start: usize,
        origin: Vector2<f64>,
        radius: f64,
        amount: usize,
    ) -> Result<Self, ConfigError> {
        if !(radius >= 0.0) {
            return Err(ConfigError::Negative { name: "food radius", value: radius });
        }
        Ok(Self {
            start,
            origin,
            radius,
            initial_amount: amount,
            amount,
            duration: None,
        })
    }

    pub fn from_spec(spec: &FoodEventSpec, default_radius: f64) -> Result<Self, ConfigError> {
        Self::new(
            spec.start,
            Vector2::new(spec.origin[0], spec.origin[1]),
            spec.radius.unwrap_or(default_radius),
            spec.amount,
        )
    }

    pub fn start(&self) -> usize { self.start }
    pub fn origin(&self) -> Vector2<f64> { self.origin }
    pub fn radius(&self) -> f64 { self.radius }
    pub fn amount(&self) -> usize { self.amount }
    pub fn duration(&self) -> Option<usize> { self.duration }

    pub fn is_active(&self, timestep: usize) -> bool {
        timestep >= self.start && self.amount > 0
    }

    pub fn evaluate(&mut self, ctx: &EventContext<'_>) -> EventOutcome {
        if !self.is_active(ctx.timestep) {
            return EventOutcome::Inactive;
        }
        EventOutcome::Fed { agents: self.feed(ctx) }
    }

    fn feed(&mut self, ctx: &EventContext<'_>) -> Vec<usize> {
        let d2 = squared_distances_from(ctx.domain, &self.origin, ctx.positions);
        let r2 = self.radius * self.radius;
        let candidates = (0..d2.len()).filter(|&i| ctx.alive[i] && d2[i] <= r2);
        let selected = select_nearest(&d2, candidates, self.amount);

        self.amount -= selected.len();
        if self.amount == 0 && self.duration.is_none() {
            let duration = ctx.timestep - self.start + 1;
            self.duration = Some(duration);
            debug!(start = self.start, duration, "food source exhausted");
        }
        selected
    }

    pub fn record(&self) -> FoodEventRecord {
        FoodEventRecord {
            start: self.start,
            origin: [self.origin.x, self.origin.y],
            radius: self.radius,
            initial_amount: self.initial_amount,
            consumed: self.initial_amount - self.amount,
            duration: self.duration,
        }
    }
}
