use crate::algorithms::stress::StressParams;
use crate::algorithms::switching::{SwitchInformation, SwitchSummary};
use crate::algorithms::vicsek::NeighbourSelectionMechanism;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::events::FoodParams;
use crate::geometry::Domain;
use crate::models::swarm::{noise_amplitude_for_percentage, particles_for_density};
use crate::visibility::VisionParams;
use std::f64::consts::PI;

pub const SCENARIO_VICSEK: &str = "vicsek";
pub const SCENARIO_LIMITED_VISION: &str = "limited-vision";
pub const SCENARIO_NEIGHBOUR_SWITCHING: &str = "neighbour-switching";
pub const SCENARIO_FORAGING: &str = "foraging";

const DENSITY: f64 = 0.05;
const NOISE_PERCENTAGE: f64 = 1.0;
const SWITCH_THRESHOLD: f64 = 0.1;
const SWITCH_WINDOW: usize = 100;

pub struct ScenarioInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub fn scenario_catalog() -> &'static [ScenarioInfo] {
    &[
        ScenarioInfo {
            id: SCENARIO_VICSEK,
            name: "Vicsek",
            description: "Plain Vicsek alignment with full vision and the nearest neighbour.",
        },
        ScenarioInfo {
            id: SCENARIO_LIMITED_VISION,
            name: "Limited vision",
            description: "Half-plane field of view with occlusion by agent bodies.",
        },
        ScenarioInfo {
            id: SCENARIO_NEIGHBOUR_SWITCHING,
            name: "Neighbour switching",
            description: "Agents switch between nearest and farthest neighbour on local order.",
        },
        ScenarioInfo {
            id: SCENARIO_FORAGING,
            name: "Foraging",
            description: "Neighbour switching with random food sources, hunger and starvation.",
        },
    ]
}

/// Accepts the catalog id in any case, with `_` in place of `-`.
pub fn normalize_scenario_id(id: &str) -> Option<&'static str> {
    let id = id.trim().to_ascii_lowercase().replace('_', "-");
    scenario_catalog().iter().map(|s| s.id).find(|s| *s == id)
}

pub fn build(id: &str) -> Result<SimConfig, ConfigError> {
    let id = normalize_scenario_id(id).ok_or_else(|| ConfigError::UnknownScenario(id.to_string()))?;
    let config = match id {
        SCENARIO_VICSEK => vicsek(),
        SCENARIO_LIMITED_VISION => limited_vision(),
        SCENARIO_NEIGHBOUR_SWITCHING => neighbour_switching(),
        SCENARIO_FORAGING => foraging(),
        _ => return Err(ConfigError::UnknownScenario(id.to_string())),
    };
    config.validate()?;
    Ok(config)
}

fn vicsek() -> SimConfig {
    let domain = Domain::default();
    SimConfig {
        domain,
        particles: particles_for_density(DENSITY, &domain),
        noise: noise_amplitude_for_percentage(NOISE_PERCENTAGE),
        ..SimConfig::default()
    }
}

fn limited_vision() -> SimConfig {
    SimConfig {
        vision: VisionParams {
            fov: PI,
            occlusion: true,
            ..VisionParams::default()
        },
        ..vicsek()
    }
}

fn neighbour_switching() -> SimConfig {
    SimConfig {
        switching: Some(SwitchSummary {
            neighbour_selection: Some(SwitchInformation::new(
                (NeighbourSelectionMechanism::Nearest, NeighbourSelectionMechanism::Farthest),
                vec![SWITCH_THRESHOLD],
                SWITCH_WINDOW,
            )),
            ..SwitchSummary::default()
        }),
        ..vicsek()
    }
}

fn foraging() -> SimConfig {
    SimConfig {
        stress: Some(StressParams::default()),
        food: Some(FoodParams {
            max_food: 50.0,
            appearance_probability: 0.02,
            source_amount: 10,
            ..FoodParams::default()
        }),
        ..neighbour_switching()
    }
}
