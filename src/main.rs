use lounge_sim::core::config::{ConcurrencyMode, SimulationConfig};
use lounge_sim::lounge::batch::run_batch;
use lounge_sim::lounge::config::LoungeConfig;

/// Real seconds simulated per day
const DAY_SECS: f32 = 600.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    // Usage: lounge_day [config.json] [days]
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => LoungeConfig::from_json_str(&std::fs::read_to_string(&path)?)?,
        None => LoungeConfig::default(),
    };
    let days: usize = match args.next() {
        Some(days) => days.parse()?,
        None => 4,
    };

    let simulation = SimulationConfig::new().with_concurrency(if days > 1 {
        ConcurrencyMode::Rayon
    } else {
        ConcurrencyMode::Sequential
    });

    println!("Simulating {} lounge days of {}s each", days, DAY_SECS);
    let report = run_batch(&config, &simulation, days, DAY_SECS)?;

    for day in &report.days {
        println!(
            "Day {}: balance {:.2}, seated {}, refunds {:.2}, breakdowns {}, fires {}",
            day.day,
            day.final_balance,
            day.stats.seated,
            day.stats.refunds,
            day.stats.breakdowns,
            day.stats.fires
        );
    }
    println!("Mean final balance: {:.2}", report.mean_final_balance);
    println!("{}", serde_json::to_string_pretty(&report.totals)?);

    Ok(())
}
