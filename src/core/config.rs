//! Configuration for simulation execution
//!
//! Controls the tick length of a run and how independent runs of a batch are
//! spread over threads. A single simulation always runs on one thread.

use serde::{Deserialize, Serialize};

use super::types::SimTime;

/// Enumeration of supported concurrency modes for batches of runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Runs execute one after another on the calling thread
    #[default]
    Sequential,
    /// Runs are distributed over a Rayon thread pool
    Rayon,
}

/// Configuration for simulation execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Length of one fixed tick in milliseconds
    pub tick_millis: SimTime,
    /// The concurrency mode to use for batches
    pub concurrency_mode: ConcurrencyMode,
    /// The size of the thread pool for parallel execution
    /// Only relevant when concurrency_mode is Rayon
    pub thread_pool_size: Option<usize>,
}

impl SimulationConfig {
    /// Create a new simulation configuration with default values
    ///
    /// Default configuration uses 50 ms ticks in Sequential mode
    pub fn new() -> Self {
        Self {
            tick_millis: 50,
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
        }
    }

    pub fn with_tick_millis(mut self, tick_millis: SimTime) -> Self {
        self.tick_millis = tick_millis;
        self
    }

    /// Set the concurrency mode for batches
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel execution
    ///
    /// # Note
    /// This setting only affects execution when concurrency_mode is Rayon
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_millis == 0 {
            return Err("Tick length must be greater than 0".to_string());
        }
        if self.thread_pool_size == Some(0) {
            return Err("Thread pool size must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.tick_millis, 50);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Sequential);
        assert_eq!(config.thread_pool_size, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SimulationConfig::new()
            .with_tick_millis(20)
            .with_concurrency(ConcurrencyMode::Rayon)
            .with_thread_pool_size(4);

        assert_eq!(config.tick_millis, 20);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Rayon);
        assert_eq!(config.thread_pool_size, Some(4));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(SimulationConfig::new().with_tick_millis(0).validate().is_err());
        assert!(SimulationConfig::new().with_thread_pool_size(0).validate().is_err());
    }
}
