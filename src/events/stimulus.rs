use super::{select_nearest, EventContext, EventOutcome};
use crate::algorithms::vicsek::normalize_or_zero;
use crate::error::ConfigError;
use crate::geometry::squared_distances_from;
use nalgebra::Vector2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Heading imposed on the agents a stimulus selects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StimulusEffect {
    /// Absolute heading angle in radians.
    AlignTo { angle: f64 },
    AwayFromOrigin,
    TowardsOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSelection {
    #[default]
    Nearest,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventArea {
    pub centre: [f64; 2],
    pub radius: f64,
}

/// Orientation stimulus active on `[start, start + duration)`.
///
/// Without an `area` the event is global: every eligible agent is a
/// candidate and distances are measured from the domain centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusEvent {
    pub start: usize,
    pub duration: usize,
    pub effect: StimulusEffect,
    #[serde(default)]
    pub area: Option<EventArea>,
    #[serde(default)]
    pub selection: EventSelection,
    /// Per-step cap on affected agents; unlimited when absent.
    #[serde(default)]
    pub max_affected: Option<usize>,
    /// Affected agents keep their switch values this step.
    #[serde(default)]
    pub block_values: bool,
}

impl StimulusEvent {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration == 0 {
            return Err(ConfigError::NonPositive { name: "stimulus duration", value: 0.0 });
        }
        if let Some(area) = &self.area {
            if !(area.radius >= 0.0) {
                return Err(ConfigError::Negative { name: "stimulus radius", value: area.radius });
            }
        }
        if let StimulusEffect::AlignTo { angle } = self.effect {
            if !angle.is_finite() {
                return Err(ConfigError::NonFinite { name: "stimulus angle", value: angle });
            }
        }
        Ok(())
    }

    pub fn is_active(&self, timestep: usize) -> bool {
        timestep >= self.start && timestep - self.start < self.duration
    }

    pub fn evaluate<R: Rng + ?Sized>(&self, ctx: &EventContext<'_>, rng: &mut R) -> EventOutcome {
        if !self.is_active(ctx.timestep) {
            return EventOutcome::Inactive;
        }

        let origin = match &self.area {
            Some(area) => Vector2::new(area.centre[0], area.centre[1]),
            None => ctx.domain.centre(),
        };
        let d2 = squared_distances_from(ctx.domain, &origin, ctx.positions);
        let r2 = self.area.map(|a| a.radius * a.radius);
        let candidates: Vec<usize> = (0..d2.len())
            .filter(|&i| ctx.alive[i] && r2.is_none_or(|r2| d2[i] <= r2))
            .collect();
        let budget = self.max_affected.unwrap_or(candidates.len());

        let affected = match self.selection {
            EventSelection::Nearest => select_nearest(&d2, candidates, budget),
            EventSelection::Random => {
                let amount = budget.min(candidates.len());
                let mut picked: Vec<usize> = rand::seq::index::sample(rng, candidates.len(), amount)
                    .into_iter()
                    .map(|k| candidates[k])
                    .collect();
                picked.sort_unstable();
                picked
            }
        };

        // selected agents that cannot update this step use up budget but keep their values
        let affected: Vec<usize> =
            affected.into_iter().filter(|&i| ctx.stimulus_eligible[i]).collect();
        let headings = affected
            .iter()
            .filter_map(|&i| self.heading_for(ctx, &origin, i).map(|h| (i, h)))
            .collect();
        let blocked = if self.block_values { affected } else { Vec::new() };

        EventOutcome::Reoriented { headings, blocked }
    }

    fn heading_for(
        &self,
        ctx: &EventContext<'_>,
        origin: &Vector2<f64>,
        i: usize,
    ) -> Option<Vector2<f64>> {
        let heading = match self.effect {
            StimulusEffect::AlignTo { angle } => Vector2::new(angle.cos(), angle.sin()),
            StimulusEffect::AwayFromOrigin => {
                normalize_or_zero(&ctx.domain.displacement(origin, &ctx.positions[i]))
            }
            StimulusEffect::TowardsOrigin => {
                normalize_or_zero(&ctx.domain.displacement(&ctx.positions[i], origin))
            }
        };
        // an agent sitting on the origin has no direction to flee or approach
        (heading != Vector2::zeros()).then_some(heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Domain;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::FRAC_PI_2;

    fn event(effect: StimulusEffect) -> StimulusEvent {
        StimulusEvent {
            start: 2,
            duration: 3,
            effect,
            area: Some(EventArea { centre: [5.0, 5.0], radius: 2.0 }),
            selection: EventSelection::Nearest,
            max_affected: None,
            block_values: false,
        }
    }

    fn evaluate(
        e: &StimulusEvent,
        t: usize,
        positions: &[Vector2<f64>],
        eligible: &[bool],
    ) -> EventOutcome {
        evaluate_with(e, t, positions, eligible, eligible)
    }

    fn evaluate_with(
        e: &StimulusEvent,
        t: usize,
        positions: &[Vector2<f64>],
        alive: &[bool],
        eligible: &[bool],
    ) -> EventOutcome {
        let domain = Domain::new(10.0, 10.0).unwrap();
        let ctx = EventContext {
            timestep: t,
            domain: &domain,
            positions,
            alive,
            stimulus_eligible: eligible,
        };
        e.evaluate(&ctx, &mut ChaCha8Rng::seed_from_u64(1))
    }

    #[test]
    fn active_only_within_window() {
        let e = event(StimulusEffect::AlignTo { angle: 0.0 });
        assert!(!e.is_active(1));
        assert!(e.is_active(2));
        assert!(e.is_active(4));
        assert!(!e.is_active(5));
    }

    #[test]
    fn aligns_agents_inside_area() {
        let e = event(StimulusEffect::AlignTo { angle: FRAC_PI_2 });
        let positions = vec![Vector2::new(5.5, 5.0), Vector2::new(9.0, 9.0)];
        match evaluate(&e, 2, &positions, &[true, true]) {
            EventOutcome::Reoriented { headings, blocked } => {
                assert_eq!(headings.len(), 1);
                assert_eq!(headings[0].0, 0);
                assert!((headings[0].1 - Vector2::new(0.0, 1.0)).norm() < 1e-12);
                assert!(blocked.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn away_and_towards_origin() {
        let positions = vec![Vector2::new(6.0, 5.0)];
        let away = evaluate(&event(StimulusEffect::AwayFromOrigin), 3, &positions, &[true]);
        let towards = evaluate(&event(StimulusEffect::TowardsOrigin), 3, &positions, &[true]);
        assert_eq!(
            away,
            EventOutcome::Reoriented {
                headings: vec![(0, Vector2::new(1.0, 0.0))],
                blocked: vec![],
            }
        );
        assert_eq!(
            towards,
            EventOutcome::Reoriented {
                headings: vec![(0, Vector2::new(-1.0, 0.0))],
                blocked: vec![],
            }
        );
    }

    #[test]
    fn budget_and_blocking() {
        let mut e = event(StimulusEffect::AlignTo { angle: 0.0 });
        e.max_affected = Some(1);
        e.block_values = true;
        let positions =
            vec![Vector2::new(6.0, 5.0), Vector2::new(5.2, 5.0), Vector2::new(5.0, 5.5)];
        match evaluate(&e, 2, &positions, &[true, true, false]) {
            EventOutcome::Reoriented { headings, blocked } => {
                assert_eq!(headings.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1]);
                assert_eq!(blocked, vec![1]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn selected_agents_that_cannot_update_keep_their_values() {
        let mut e = event(StimulusEffect::AlignTo { angle: 0.0 });
        e.max_affected = Some(2);
        e.block_values = true;
        let positions =
            vec![Vector2::new(5.1, 5.0), Vector2::new(5.5, 5.0), Vector2::new(6.0, 5.0)];
        match evaluate_with(&e, 2, &positions, &[true; 3], &[false, true, true]) {
            EventOutcome::Reoriented { headings, blocked } => {
                assert_eq!(headings.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1]);
                assert_eq!(blocked, vec![1]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn random_selection_respects_budget() {
        let mut e = event(StimulusEffect::AlignTo { angle: 0.0 });
        e.area = None;
        e.selection = EventSelection::Random;
        e.max_affected = Some(2);
        let positions: Vec<_> = (0..6).map(|i| Vector2::new(i as f64, 1.0)).collect();
        match evaluate(&e, 2, &positions, &[true; 6]) {
            EventOutcome::Reoriented { headings, .. } => {
                assert_eq!(headings.len(), 2);
                assert_ne!(headings[0].0, headings[1].0);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut e = event(StimulusEffect::TowardsOrigin);
        e.duration = 0;
        assert!(e.validate().is_err());
    }
}
