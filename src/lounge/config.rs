use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Accelerated time-of-day settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Hour of day the lounge starts at, in [0, 24)
    pub start_hour: f64,
    /// Game hours that pass per real second while the doors are open
    pub hours_per_second: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start_hour: 10.0,
            hours_per_second: 1.0 / 60.0,
        }
    }
}

/// Price and session-length bounds of a seat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPricing {
    pub price_per_hour: f64,
    pub min_hours: f64,
    pub max_hours: f64,
}

impl Default for SessionPricing {
    fn default() -> Self {
        Self {
            price_per_hour: 50.0,
            min_hours: 1.0,
            max_hours: 3.0,
        }
    }
}

impl SessionPricing {
    pub fn validate(&self) -> Result<(), String> {
        if self.price_per_hour < 0.0 {
            return Err("Price per hour cannot be negative".to_string());
        }
        if self.min_hours <= 0.0 {
            return Err("Minimum session hours must be greater than 0".to_string());
        }
        if self.min_hours > self.max_hours {
            return Err("Min session hours cannot be greater than max hours".to_string());
        }
        if self.max_hours >= 24.0 {
            return Err("Max session hours must be below 24".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Delay before the first spawn attempt
    pub first_spawn_secs: f32,
    pub interval_secs: f32,
    /// Standard deviation of the interval jitter
    pub jitter_secs: f32,
    /// Lower bound of a jittered interval
    pub min_interval_secs: f32,
    /// Agents at the door, walking to or waiting at the counter
    pub queue_cap: usize,
    pub min_batch: usize,
    pub max_batch: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            first_spawn_secs: 2.0,
            interval_secs: 25.0,
            jitter_secs: 6.0,
            min_interval_secs: 5.0,
            queue_cap: 6,
            min_batch: 1,
            max_batch: 2,
        }
    }
}

/// Movement and want behaviour of customer agents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub walk_speed: f32,
    pub arrival_threshold: f32,
    pub stuck_check_secs: f32,
    /// Displacement below which a walking agent counts as stuck
    pub stuck_min_move: f32,
    /// Delays of the staggered re-attempts after a failed path request
    pub nav_retry_delays_secs: Vec<f32>,
    /// Failed door admissions before an agent gives up and leaves
    pub max_admission_rounds: u32,
    pub want_poll_secs: f32,
    /// Real seconds an agent must have been seated before wants are rolled
    pub min_seated_secs: f32,
    pub drink_want_probability: f64,
    pub food_want_probability: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            walk_speed: 2.5,
            arrival_threshold: 0.3,
            stuck_check_secs: 2.0,
            stuck_min_move: 0.1,
            nav_retry_delays_secs: vec![0.5, 1.0, 2.0],
            max_admission_rounds: 3,
            want_poll_secs: 10.0,
            min_seated_secs: 30.0,
            drink_want_probability: 0.08,
            food_want_probability: 0.04,
        }
    }
}

/// Breakdown, fire and food-delivery timers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentConfig {
    /// Fraction of the session that must have elapsed before incident rolls
    pub min_elapsed_fraction: f64,
    pub breakdown_probability: f64,
    pub fire_probability: f64,
    pub repair_timeout_secs: f32,
    pub extinguish_hits: u32,
    pub food_delivery_timeout_secs: f32,
    /// Floor for the remaining session time stored at a pause, in hours
    pub pause_epsilon_hours: f64,
}

impl Default for IncidentConfig {
    fn default() -> Self {
        Self {
            min_elapsed_fraction: 0.25,
            breakdown_probability: 0.1,
            fire_probability: 0.02,
            repair_timeout_secs: 45.0,
            extinguish_hits: 5,
            food_delivery_timeout_secs: 60.0,
            pause_epsilon_hours: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockSpec {
    pub capacity: u32,
    pub initial: u32,
    /// Cost of buying one unit
    pub unit_cost: f64,
    /// Price charged to the customer
    pub sale_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    pub drinks: StockSpec,
    pub food: StockSpec,
    pub hookah: StockSpec,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            drinks: StockSpec {
                capacity: 12,
                initial: 12,
                unit_cost: 2.0,
                sale_price: 5.0,
            },
            food: StockSpec {
                capacity: 8,
                initial: 8,
                unit_cost: 4.0,
                sale_price: 10.0,
            },
            hookah: StockSpec {
                capacity: 3,
                initial: 3,
                unit_cost: 30.0,
                sale_price: 20.0,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub lines_per_session: usize,
    /// Number of distinct recorded lines to choose from
    pub variants: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            lines_per_session: 2,
            variants: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatSpec {
    /// Chair pose; a seat without one cannot be assigned
    pub chair: Option<Vec3>,
    /// Overrides the lounge-wide pricing
    pub pricing: Option<SessionPricing>,
}

impl SeatSpec {
    pub fn at(chair: Vec3) -> Self {
        Self {
            chair: Some(chair),
            pricing: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub spawn_point: Vec3,
    /// Head of the counter queue
    pub counter_point: Vec3,
    /// Offset between consecutive places in the counter queue
    pub queue_spacing: Vec3,
    pub drink_point: Vec3,
    pub food_point: Vec3,
    pub exit_point: Vec3,
    /// Doors that must all be open before customers walk in
    pub doors: usize,
    pub seats: Vec<SeatSpec>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let seats = (0..8)
            .map(|i| SeatSpec::at(Vec3::new(4.0 + 2.0 * (i % 4) as f32, 0.0, 6.0 + 3.0 * (i / 4) as f32)))
            .collect();
        Self {
            spawn_point: Vec3::new(0.0, 0.0, -6.0),
            counter_point: Vec3::new(0.0, 0.0, 2.0),
            queue_spacing: Vec3::new(0.0, 0.0, -1.0),
            drink_point: Vec3::new(-2.0, 0.0, 3.0),
            food_point: Vec3::new(-3.5, 0.0, 3.0),
            exit_point: Vec3::new(1.0, 0.0, -7.0),
            doors: 1,
            seats,
        }
    }
}

/// Complete configuration of one lounge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoungeConfig {
    pub random_seed: u64,
    pub starting_balance: f64,
    pub clock: ClockConfig,
    pub pricing: SessionPricing,
    pub spawner: SpawnerConfig,
    pub agent: AgentConfig,
    pub incidents: IncidentConfig,
    pub stock: StockConfig,
    pub voice: VoiceConfig,
    pub layout: LayoutConfig,
}

impl LoungeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("Invalid lounge config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_starting_balance(mut self, balance: f64) -> Self {
        self.starting_balance = balance;
        self
    }

    pub fn with_pricing(mut self, pricing: SessionPricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_queue_cap(mut self, cap: usize) -> Self {
        self.spawner.queue_cap = cap;
        self
    }

    pub fn with_want_probabilities(mut self, drink: f64, food: f64) -> Self {
        self.agent.drink_want_probability = drink;
        self.agent.food_want_probability = food;
        self
    }

    pub fn with_incident_probabilities(mut self, breakdown: f64, fire: f64) -> Self {
        self.incidents.breakdown_probability = breakdown;
        self.incidents.fire_probability = fire;
        self
    }

    pub fn with_seats(mut self, seats: Vec<SeatSpec>) -> Self {
        self.layout.seats = seats;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.starting_balance < 0.0 {
            return Err("Starting balance cannot be negative".to_string());
        }

        if !(0.0..24.0).contains(&self.clock.start_hour) {
            return Err("Clock start hour must be in [0, 24)".to_string());
        }
        if self.clock.hours_per_second <= 0.0 {
            return Err("Clock speed must be greater than 0".to_string());
        }

        self.pricing.validate()?;
        for (i, seat) in self.layout.seats.iter().enumerate() {
            if let Some(pricing) = &seat.pricing {
                pricing
                    .validate()
                    .map_err(|e| format!("Seat {}: {}", i, e))?;
            }
        }

        if self.spawner.interval_secs <= 0.0 {
            return Err("Spawn interval must be greater than 0".to_string());
        }
        if self.spawner.min_interval_secs <= 0.0 {
            return Err("Minimum spawn interval must be greater than 0".to_string());
        }
        if self.spawner.jitter_secs < 0.0 {
            return Err("Spawn jitter cannot be negative".to_string());
        }
        if self.spawner.min_batch == 0 {
            return Err("Spawn batch must be at least 1".to_string());
        }
        if self.spawner.min_batch > self.spawner.max_batch {
            return Err("Min spawn batch cannot be greater than max batch".to_string());
        }

        if self.agent.walk_speed <= 0.0 {
            return Err("Walk speed must be greater than 0".to_string());
        }
        if self.agent.arrival_threshold < 0.0 {
            return Err("Arrival threshold cannot be negative".to_string());
        }
        if self.agent.max_admission_rounds == 0 {
            return Err("Door admission needs at least one round".to_string());
        }
        if self.agent.stuck_check_secs <= 0.0 || self.agent.want_poll_secs <= 0.0 {
            return Err("Agent polling intervals must be greater than 0".to_string());
        }
        for probability in [
            self.agent.drink_want_probability,
            self.agent.food_want_probability,
            self.incidents.breakdown_probability,
            self.incidents.fire_probability,
        ] {
            if !(0.0..=1.0).contains(&probability) {
                return Err(format!("Probability {} is outside [0, 1]", probability));
            }
        }

        if !(0.0..=1.0).contains(&self.incidents.min_elapsed_fraction) {
            return Err("Incident elapsed fraction must be in [0, 1]".to_string());
        }
        if self.incidents.extinguish_hits == 0 {
            return Err("Extinguishing needs at least one hit".to_string());
        }
        if self.incidents.pause_epsilon_hours <= 0.0 {
            return Err("Pause epsilon must be greater than 0".to_string());
        }

        for (name, spec) in [
            ("drinks", &self.stock.drinks),
            ("food", &self.stock.food),
            ("hookah", &self.stock.hookah),
        ] {
            if spec.initial > spec.capacity {
                return Err(format!("Initial {} stock exceeds capacity", name));
            }
            if spec.unit_cost < 0.0 || spec.sale_price < 0.0 {
                return Err(format!("Prices for {} cannot be negative", name));
            }
        }

        if self.voice.lines_per_session > 0 && self.voice.variants == 0 {
            return Err("Voice lines need at least one variant".to_string());
        }

        if self.layout.doors == 0 {
            return Err("Lounge needs at least one door".to_string());
        }

        Ok(())
    }
}
