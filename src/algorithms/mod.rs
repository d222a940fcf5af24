pub mod stress;
pub mod switching;
pub mod vicsek;
