use crate::algorithms::vicsek::NeighbourSelectionMechanism;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwitchType {
    NeighbourSelectionMechanism,
    K,
    Speed,
    ActivationTimeDelay,
}

impl SwitchType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NeighbourSelectionMechanism => "neighbour_selection",
            Self::K => "k",
            Self::Speed => "speed",
            Self::ActivationTimeDelay => "activation_time_delay",
        }
    }
}

/// Two-valued switch driven by a smoothed order metric.
///
/// `values.0` is taken when the smoothed metric drops below the lowest
/// threshold, `values.1` when it rises above the highest one. Between the
/// two (or exactly on a single threshold) the current value is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchInformation<T> {
    pub values: (T, T),
    pub thresholds: Vec<f64>,
    /// Number of previous steps averaged before comparing.
    #[serde(alias = "number_previous_steps_for_threshold")]
    pub window: usize,
}

impl<T: Copy> SwitchInformation<T> {
    pub fn new(values: (T, T), thresholds: Vec<f64>, window: usize) -> Self {
        Self { values, thresholds, window }
    }

    pub fn lower(&self) -> f64 {
        self.thresholds.first().copied().unwrap_or(0.0)
    }

    pub fn upper(&self) -> f64 {
        self.thresholds.last().copied().unwrap_or(0.0)
    }

    pub fn decide(&self, current: T, smoothed: f64) -> T {
        if smoothed < self.lower() {
            self.values.0
        } else if smoothed > self.upper() {
            self.values.1
        } else {
            current
        }
    }

    fn validate_thresholds(&self, switch: SwitchType) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidThresholds {
            switch: switch.name(),
            reason: reason.to_string(),
        };
        match self.thresholds.len() {
            1 | 2 => {}
            _ => return Err(invalid("expected one or two thresholds")),
        }
        if self.thresholds.iter().any(|t| !(0.0..=1.0).contains(t)) {
            return Err(invalid("thresholds must lie in [0, 1]"));
        }
        if self.lower() > self.upper() {
            return Err(invalid("thresholds must be ascending"));
        }
        if self.window == 0 {
            return Err(ConfigError::InvalidWindow(switch.name()));
        }
        Ok(())
    }
}

/// The switches available to the agents, at most one per attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchSummary {
    pub neighbour_selection: Option<SwitchInformation<NeighbourSelectionMechanism>>,
    pub k: Option<SwitchInformation<usize>>,
    pub speed: Option<SwitchInformation<f64>>,
    pub activation_time_delay: Option<SwitchInformation<usize>>,
}

impl SwitchSummary {
    pub fn is_empty(&self) -> bool {
        self.switch_types().is_empty()
    }

    pub fn switch_types(&self) -> Vec<SwitchType> {
        let mut out = Vec::new();
        if self.neighbour_selection.is_some() {
            out.push(SwitchType::NeighbourSelectionMechanism);
        }
        if self.k.is_some() {
            out.push(SwitchType::K);
        }
        if self.speed.is_some() {
            out.push(SwitchType::Speed);
        }
        if self.activation_time_delay.is_some() {
            out.push(SwitchType::ActivationTimeDelay);
        }
        out
    }

    /// Longest smoothing window over all configured switches.
    pub fn max_window(&self) -> usize {
        [
            self.neighbour_selection.as_ref().map(|s| s.window),
            self.k.as_ref().map(|s| s.window),
            self.speed.as_ref().map(|s| s.window),
            self.activation_time_delay.as_ref().map(|s| s.window),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0)
    }

    pub fn validate(&self, particles: usize) -> Result<(), ConfigError> {
        if let Some(info) = &self.neighbour_selection {
            info.validate_thresholds(SwitchType::NeighbourSelectionMechanism)?;
        }
        if let Some(info) = &self.k {
            info.validate_thresholds(SwitchType::K)?;
            for k in [info.values.0, info.values.1] {
                if k == 0 || k >= particles {
                    return Err(ConfigError::InvalidNeighbourCount { k, particles });
                }
            }
        }
        if let Some(info) = &self.speed {
            info.validate_thresholds(SwitchType::Speed)?;
            for speed in [info.values.0, info.values.1] {
                if !speed.is_finite() {
                    return Err(ConfigError::NonFinite { name: "speed switch value", value: speed });
                }
                if speed < 0.0 {
                    return Err(ConfigError::Negative { name: "speed switch value", value: speed });
                }
            }
        }
        if let Some(info) = &self.activation_time_delay {
            info.validate_thresholds(SwitchType::ActivationTimeDelay)?;
            for delay in [info.values.0, info.values.1] {
                if delay == 0 {
                    return Err(ConfigError::InvalidDelay(delay));
                }
            }
        }
        Ok(())
    }
}

/// Rolling per-agent record of threshold-evaluation values.
#[derive(Debug, Clone)]
pub struct ThresholdHistory {
    capacity: usize,
    values: Vec<VecDeque<f64>>,
}

impl ThresholdHistory {
    pub fn new(agents: usize, capacity: usize) -> Self {
        Self {
            capacity,
            values: vec![VecDeque::with_capacity(capacity); agents],
        }
    }

    pub fn push(&mut self, step_values: &[f64]) {
        if self.capacity == 0 {
            return;
        }
        for (queue, v) in self.values.iter_mut().zip(step_values) {
            if queue.len() == self.capacity {
                queue.pop_front();
            }
            queue.push_back(*v);
        }
    }

    pub fn recorded(&self, agent: usize) -> usize {
        self.values[agent].len()
    }

    /// Mean of the last `window` values; `None` until that many are recorded.
    pub fn smoothed(&self, agent: usize, window: usize) -> Option<f64> {
        let queue = &self.values[agent];
        if window == 0 || queue.len() < window {
            return None;
        }
        let sum: f64 = queue.iter().rev().take(window).sum();
        Some(sum / window as f64)
    }
}

/// Per-agent values of every switchable attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchValues {
    pub mechanisms: Vec<NeighbourSelectionMechanism>,
    pub ks: Vec<usize>,
    pub speeds: Vec<f64>,
    pub delays: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Switching {
    summary: SwitchSummary,
    history: ThresholdHistory,
}

impl Switching {
    pub fn new(summary: SwitchSummary, agents: usize) -> Self {
        let capacity = summary.max_window();
        Self {
            summary,
            history: ThresholdHistory::new(agents, capacity),
        }
    }

    pub fn summary(&self) -> &SwitchSummary { &self.summary }
    pub fn history(&self) -> &ThresholdHistory { &self.history }

    pub fn record(&mut self, step_values: &[f64]) {
        self.history.push(step_values);
    }

    /// Next values of every configured attribute. Agents that are not eligible
    /// (not due to activate, dead, or blocked by an event) keep their values.
    pub fn decide(&self, current: &SwitchValues, eligible: &[bool]) -> SwitchValues {
        SwitchValues {
            mechanisms: self.decide_attribute(
                &self.summary.neighbour_selection,
                &current.mechanisms,
                eligible,
            ),
            ks: self.decide_attribute(&self.summary.k, &current.ks, eligible),
            speeds: self.decide_attribute(&self.summary.speed, &current.speeds, eligible),
            delays: self.decide_attribute(
                &self.summary.activation_time_delay,
                &current.delays,
                eligible,
            ),
        }
    }

    fn decide_attribute<T: Copy + PartialEq>(
        &self,
        info: &Option<SwitchInformation<T>>,
        current: &[T],
        eligible: &[bool],
    ) -> Vec<T> {
        let Some(info) = info else {
            return current.to_vec();
        };
        let mut switched = 0usize;
        let next: Vec<T> = current
            .iter()
            .enumerate()
            .map(|(i, value)| {
                if !eligible[i] {
                    return *value;
                }
                match self.history.smoothed(i, info.window) {
                    Some(smoothed) => {
                        let decided = info.decide(*value, smoothed);
                        if decided != *value {
                            switched += 1;
                        }
                        decided
                    }
                    None => *value,
                }
            })
            .collect();
        if switched > 0 {
            debug!(switched, "agents changed switch value");
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::vicsek::NeighbourSelectionMechanism::{Farthest, Nearest};

    fn nsm_switching(thresholds: Vec<f64>, window: usize) -> Switching {
        let summary = SwitchSummary {
            neighbour_selection: Some(SwitchInformation::new(
                (Nearest, Farthest),
                thresholds,
                window,
            )),
            ..SwitchSummary::default()
        };
        Switching::new(summary, 1)
    }

    fn values(m: NeighbourSelectionMechanism) -> SwitchValues {
        SwitchValues { mechanisms: vec![m], ks: vec![1], speeds: vec![1.0], delays: vec![1] }
    }

    #[test]
    fn no_decision_before_window_is_filled() {
        let mut s = nsm_switching(vec![0.5], 3);
        s.record(&[0.0]);
        s.record(&[0.0]);
        assert_eq!(s.decide(&values(Farthest), &[true]).mechanisms[0], Farthest);
        s.record(&[0.0]);
        assert_eq!(s.decide(&values(Farthest), &[true]).mechanisms[0], Nearest);
    }

    #[test]
    fn low_order_selects_first_value_high_selects_second() {
        let info = SwitchInformation::new((1usize, 5usize), vec![0.3, 0.7], 1);
        assert_eq!(info.decide(5, 0.1), 1);
        assert_eq!(info.decide(1, 0.9), 5);
        assert_eq!(info.decide(1, 0.5), 1);
        assert_eq!(info.decide(5, 0.5), 5);
        let single = SwitchInformation::new((1usize, 5usize), vec![0.4], 1);
        assert_eq!(single.decide(5, 0.4), 5);
    }

    #[test]
    fn ineligible_agents_keep_value() {
        let mut s = nsm_switching(vec![0.5], 1);
        s.record(&[0.0]);
        assert_eq!(s.decide(&values(Farthest), &[false]).mechanisms[0], Farthest);
    }

    #[test]
    fn unconfigured_attributes_pass_through() {
        let mut s = nsm_switching(vec![0.5], 1);
        s.record(&[1.0]);
        let current = SwitchValues {
            mechanisms: vec![Nearest],
            ks: vec![3],
            speeds: vec![0.2],
            delays: vec![2],
        };
        let next = s.decide(&current, &[true]);
        assert_eq!(next.ks, vec![3]);
        assert_eq!(next.speeds, vec![0.2]);
        assert_eq!(next.delays, vec![2]);
        assert_eq!(next.mechanisms, vec![Farthest]);
    }

    #[test]
    fn history_keeps_only_capacity_values() {
        let mut h = ThresholdHistory::new(1, 2);
        h.push(&[1.0]);
        h.push(&[0.0]);
        h.push(&[0.0]);
        assert_eq!(h.recorded(0), 2);
        assert_eq!(h.smoothed(0, 2), Some(0.0));
        assert_eq!(h.smoothed(0, 3), None);
    }

    #[test]
    fn validation() {
        let bad_thresholds = SwitchSummary {
            k: Some(SwitchInformation::new((1, 2), vec![0.8, 0.2], 5)),
            ..SwitchSummary::default()
        };
        assert!(bad_thresholds.validate(10).is_err());

        let k_too_large = SwitchSummary {
            k: Some(SwitchInformation::new((1, 10), vec![0.5], 5)),
            ..SwitchSummary::default()
        };
        assert!(matches!(
            k_too_large.validate(10),
            Err(ConfigError::InvalidNeighbourCount { k: 10, .. })
        ));

        let zero_window = SwitchSummary {
            speed: Some(SwitchInformation::new((0.1, 1.0), vec![0.5], 0)),
            ..SwitchSummary::default()
        };
        assert!(zero_window.validate(10).is_err());

        let infinite_speed = SwitchSummary {
            speed: Some(SwitchInformation::new((f64::INFINITY, 1.0), vec![0.5], 1)),
            ..SwitchSummary::default()
        };
        assert!(matches!(
            infinite_speed.validate(10),
            Err(ConfigError::NonFinite { name: "speed switch value", .. })
        ));

        let zero_delay = SwitchSummary {
            activation_time_delay: Some(SwitchInformation::new((0, 2), vec![0.5], 1)),
            ..SwitchSummary::default()
        };
        assert!(zero_delay.validate(10).is_err());

        let ok = SwitchSummary {
            neighbour_selection: Some(SwitchInformation::new((Farthest, Nearest), vec![0.1], 100)),
            k: Some(SwitchInformation::new((5, 1), vec![0.1], 100)),
            ..SwitchSummary::default()
        };
        assert!(ok.validate(10).is_ok());
        assert_eq!(ok.max_window(), 100);
        assert_eq!(ok.switch_types(), vec![SwitchType::NeighbourSelectionMechanism, SwitchType::K]);
    }
}
