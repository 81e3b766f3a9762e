pub mod chord;
pub mod error;
pub mod network;

pub use chord::coordinator::RingPlan;
pub use error::{ConfigError, RingError};
pub use network::node::{RingSimulation, SimulationReport};
pub use network::SimulationConfig;
