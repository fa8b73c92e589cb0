//! drive - engine-agnostic vehicle drive model (pure types + solvers)

pub mod anti_roll;
pub mod model;
pub mod tire;
pub mod types;
pub mod wheel;

pub use model::DriveModel;
pub use tire::{ContactPatch, solve_contacts};
pub use types::*;
pub use wheel::WheelActuator;
