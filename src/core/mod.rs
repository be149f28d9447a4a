pub mod config;
pub mod event_scheduler;
pub mod simulation_engine;
pub mod types;

#[cfg(test)]
mod tests;
