pub mod swarm;

pub use swarm::{InitialDistribution, SwarmState};
