//! Autopiloted lounge days and batches of them.
//!
//! Each day is an independent, seeded simulation, so a batch can be spread
//! over a Rayon thread pool without changing its results.

use log::info;
use rayon::prelude::*;
use serde::Serialize;

use super::autopilot::AutoPilot;
use super::config::LoungeConfig;
use super::stats::LoungeStats;
use super::world::Lounge;
use crate::core::config::{ConcurrencyMode, SimulationConfig};
use crate::core::simulation_engine::SimulationEngine;
use crate::core::types::{secs_to_millis, SimTime};

/// How long the autopilot waits between decisions
const THINK_INTERVAL: SimTime = 500;

#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub day: usize,
    pub seed: u64,
    pub simulated_millis: SimTime,
    pub game_hours: f64,
    pub final_balance: f64,
    pub agents_remaining: usize,
    pub broken_seats: usize,
    pub autopilot_actions: u64,
    pub stats: LoungeStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub days: Vec<DayReport>,
    pub totals: LoungeStats,
    pub mean_final_balance: f64,
}

impl BatchReport {
    fn from_days(days: Vec<DayReport>) -> Self {
        let mut totals = LoungeStats::default();
        for day in &days {
            totals.absorb(&day.stats);
        }
        let mean_final_balance = if days.is_empty() {
            0.0
        } else {
            days.iter().map(|day| day.final_balance).sum::<f64>() / days.len() as f64
        };
        Self {
            days,
            totals,
            mean_final_balance,
        }
    }
}

/// Simulate one autopiloted day of `duration_secs` real seconds. The day
/// index is mixed into the configured seed.
pub fn run_day(
    config: &LoungeConfig,
    simulation: &SimulationConfig,
    day: usize,
    duration_secs: f32,
) -> Result<DayReport, String> {
    let seed = config.random_seed.wrapping_add(day as u64);
    let lounge = Lounge::headless(config.clone().with_random_seed(seed))?;
    let duration = secs_to_millis(duration_secs);
    let mut engine = SimulationEngine::new(lounge, Some(duration));
    let mut pilot = AutoPilot::new(THINK_INTERVAL);

    while engine.current_time() < duration {
        pilot.drive(engine.model_mut());
        engine.step(simulation.tick_millis)?;
    }

    let simulated_millis = engine.current_time();
    let lounge = engine.into_model();
    let report = DayReport {
        day,
        seed,
        simulated_millis,
        game_hours: lounge.clock().total_hours(),
        final_balance: lounge.balance(),
        agents_remaining: lounge.agent_count(),
        broken_seats: lounge
            .seats()
            .iter()
            .filter(|seat| seat.is_broken())
            .count(),
        autopilot_actions: pilot.actions_taken(),
        stats: lounge.stats().clone(),
    };
    info!(
        "[Batch] Day {} done: balance {:.2}, {} seated, {} refunds",
        day, report.final_balance, report.stats.seated, report.stats.refunds
    );
    Ok(report)
}

/// Simulate `days` independent days, sequentially or on a Rayon pool
pub fn run_batch(
    config: &LoungeConfig,
    simulation: &SimulationConfig,
    days: usize,
    duration_secs: f32,
) -> Result<BatchReport, String> {
    simulation.validate()?;
    config.validate()?;

    let reports = match simulation.concurrency_mode {
        ConcurrencyMode::Sequential => (0..days)
            .map(|day| run_day(config, simulation, day, duration_secs))
            .collect::<Result<Vec<_>, String>>()?,
        ConcurrencyMode::Rayon => {
            let mut builder = rayon::ThreadPoolBuilder::new();
            if let Some(threads) = simulation.thread_pool_size {
                builder = builder.num_threads(threads);
            }
            let pool = builder
                .build()
                .map_err(|e| format!("Failed to build thread pool: {}", e))?;
            pool.install(|| {
                (0..days)
                    .into_par_iter()
                    .map(|day| run_day(config, simulation, day, duration_secs))
                    .collect::<Result<Vec<_>, String>>()
            })?
        }
    };

    Ok(BatchReport::from_days(reports))
}
