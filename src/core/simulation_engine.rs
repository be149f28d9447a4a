use super::event_scheduler::EventScheduler;
use super::types::SimTime;
use log::debug;

/// A model driven by the engine: continuous per-tick work plus timed events.
pub trait Simulation {
    type Event;

    fn scheduler_mut(&mut self) -> &mut EventScheduler<Self::Event>;

    /// Called once per tick, before due events are delivered
    fn advance(&mut self, now: SimTime, dt: SimTime);

    /// React to a timer that came due
    fn react(&mut self, now: SimTime, event: Self::Event);
}

/// Observer trait for simulation events
pub trait SimulationObserver {
    /// Called when the simulation time advances
    fn on_time_advance(&mut self, old_time: SimTime, new_time: SimTime);

    /// Called when a simulation step completes
    fn on_step_complete(&mut self, time: SimTime, events_processed: usize);
}

/// Fixed-tick driver around a [`Simulation`].
pub struct SimulationEngine<S: Simulation> {
    model: S,
    current_time: SimTime,
    max_time: Option<SimTime>,
    observers: Vec<Box<dyn SimulationObserver>>,
}

impl<S: Simulation> SimulationEngine<S> {
    /// Create a new SimulationEngine with optional time limit
    pub fn new(model: S, max_time: Option<SimTime>) -> Self {
        Self {
            model,
            current_time: 0,
            max_time,
            observers: Vec::new(),
        }
    }

    /// Add an observer to the simulation
    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    fn notify_time_advance(&mut self, old_time: SimTime, new_time: SimTime) {
        for observer in &mut self.observers {
            observer.on_time_advance(old_time, new_time);
        }
    }

    fn notify_step_complete(&mut self, time: SimTime, events_processed: usize) {
        for observer in &mut self.observers {
            observer.on_step_complete(time, events_processed);
        }
    }

    /// Advance by one tick of `dt` milliseconds, returns events processed
    pub fn step(&mut self, dt: SimTime) -> Result<usize, String> {
        if dt == 0 {
            return Err("Tick length must be greater than 0".to_string());
        }

        let old_time = self.current_time;
        self.current_time = self.current_time.saturating_add(dt);
        self.notify_time_advance(old_time, self.current_time);

        self.model.advance(self.current_time, dt);

        let mut events_processed = 0;
        while let Some(event) = self.model.scheduler_mut().pop_due(self.current_time) {
            self.model.react(self.current_time, event);
            events_processed += 1;
        }

        if events_processed > 0 {
            debug!("=== Simulation time {} ms: {} events ===", self.current_time, events_processed);
        }

        self.notify_step_complete(self.current_time, events_processed);
        Ok(events_processed)
    }

    /// Run ticks of `dt` until the time limit, returns final time
    pub fn run(&mut self, dt: SimTime) -> Result<SimTime, String> {
        let max = self
            .max_time
            .ok_or_else(|| "run() requires a time limit".to_string())?;
        self.run_until(max, dt)
    }

    /// Run ticks of `dt` for `duration` milliseconds, returns final time
    pub fn run_for(&mut self, duration: SimTime, dt: SimTime) -> Result<SimTime, String> {
        let target = self.current_time.saturating_add(duration);
        self.run_until(target, dt)
    }

    /// Run ticks of `dt` until `target` is reached (or the time limit)
    pub fn run_until(&mut self, target: SimTime, dt: SimTime) -> Result<SimTime, String> {
        let target = self.max_time.map_or(target, |max| target.min(max));
        while self.current_time < target {
            self.step(dt)?;
        }
        Ok(self.current_time)
    }

    /// Get current simulation time
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    pub fn model(&self) -> &S {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut S {
        &mut self.model
    }

    pub fn into_model(self) -> S {
        self.model
    }
}
