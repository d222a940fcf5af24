//! Time- and space-triggered perturbations of agent state.
//!
//! Events read the committed state of the current step and return what they
//! did; the driver combines the outcomes of all events before writing.

pub mod food;
pub mod stimulus;

pub use food::{FoodEvent, FoodEventRecord, FoodEventSpec, FoodParams};
pub use stimulus::{EventArea, EventSelection, StimulusEffect, StimulusEvent};

use crate::geometry::Domain;
use nalgebra::Vector2;
use rand::Rng;

/// Read-only view of the swarm handed to every event.
pub struct EventContext<'a> {
    pub timestep: usize,
    pub domain: &'a Domain,
    pub positions: &'a [Vector2<f64>],
    pub alive: &'a [bool],
    /// Agents a stimulus may reorient this step. Every living agent is still
    /// a selection candidate.
    pub stimulus_eligible: &'a [bool],
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Inactive,
    Reoriented {
        headings: Vec<(usize, Vector2<f64>)>,
        /// Agents barred from switching this step.
        blocked: Vec<usize>,
    },
    Fed {
        agents: Vec<usize>,
    },
}

#[derive(Debug, Clone)]
pub enum Event {
    Stimulus(StimulusEvent),
    Food(FoodEvent),
}

impl Event {
    pub fn evaluate<R: Rng + ?Sized>(
        &mut self,
        ctx: &EventContext<'_>,
        rng: &mut R,
    ) -> EventOutcome {
        match self {
            Event::Stimulus(event) => event.evaluate(ctx, rng),
            Event::Food(event) => event.evaluate(ctx),
        }
    }

    pub fn as_food(&self) -> Option<&FoodEvent> {
        match self {
            Event::Food(event) => Some(event),
            Event::Stimulus(_) => None,
        }
    }
}

/// Up to `budget` candidates in ascending distance, ties broken by index.
pub fn select_nearest<I>(distances_squared: &[f64], candidates: I, budget: usize) -> Vec<usize>
where
    I: IntoIterator<Item = usize>,
{
    let mut ordered: Vec<usize> = candidates.into_iter().collect();
    ordered.sort_by(|a, b| {
        distances_squared[*a]
            .total_cmp(&distances_squared[*b])
            .then(a.cmp(b))
    });
    ordered.truncate(budget);
    ordered
}
