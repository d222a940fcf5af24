use thiserror::Error;

/// Invalid run configuration. Detected before the first step; the run never starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("domain size must be positive and finite, got ({0}, {1})")]
    InvalidDomain(f64, f64),

    #[error("field of view must lie in [0, 2π], got {0}")]
    InvalidFieldOfView(f64),

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("particle count must be at least 1")]
    NoParticles,

    #[error("neighbour count k={k} must satisfy 1 <= k < {particles}")]
    InvalidNeighbourCount { k: usize, particles: usize },

    #[error("activation time delay must be at least 1, got {0}")]
    InvalidDelay(usize),

    #[error("expected {expected} activation time delays, got {got}")]
    DelayCountMismatch { expected: usize, got: usize },

    #[error("invalid thresholds for {switch}: {reason}")]
    InvalidThresholds { switch: &'static str, reason: String },

    #[error("switch window for {0} must be at least 1")]
    InvalidWindow(&'static str),

    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("initial state has {got} entries, expected {expected}")]
    InitialStateMismatch { expected: usize, got: usize },

    #[error("unknown scenario id '{0}'")]
    UnknownScenario(String),
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
