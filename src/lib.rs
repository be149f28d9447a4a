pub mod core;
pub mod lounge;

// Re-export commonly used types
pub use crate::core::simulation_engine::{Simulation, SimulationEngine, SimulationObserver};
pub use crate::core::types::{AgentId, SeatId, SimTime};
pub use crate::lounge::actions::ActionError;
pub use crate::lounge::agent::AgentState;
pub use crate::lounge::config::LoungeConfig;
pub use crate::lounge::world::Lounge;
