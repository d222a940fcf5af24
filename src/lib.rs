pub mod algorithms;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod metrics;
pub mod models;
pub mod scenarios;
pub mod sim;
pub mod visibility;

pub use algorithms::switching::{SwitchInformation, SwitchSummary, SwitchType};
pub use algorithms::vicsek::{DegenerateHeading, NeighbourSelectionMechanism};
pub use config::SimConfig;
pub use error::{ConfigError, Result, SimError};
pub use geometry::Domain;
pub use models::swarm::{InitialDistribution, SwarmState};
pub use sim::{Colour, Frame, SimulationOutput, Simulator};
pub use visibility::{NeighbourSet, VisionParams};
