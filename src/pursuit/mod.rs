//! pursuit - autonomous chase controller + obstacle sensing

pub mod controller;
pub mod sensor;

pub use controller::{PursuitConfig, PursuitController, PursuitDecision, PursuitState};
pub use sensor::{ObstacleReading, ObstacleSensor, Probe, SensorConfig};
