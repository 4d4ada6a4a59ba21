pub mod config;
pub mod engine;
pub mod error;
pub mod simulation;

pub use simulation::*;
pub use config::*;
pub use engine::{PerformanceTracker, Simulation, SimulationClock};
pub use error::RouteError;
