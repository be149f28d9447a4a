// Tests for SimulationEngine functionality
#[cfg(test)]
mod tests {
    use crate::core::event_scheduler::EventScheduler;
    use crate::core::simulation_engine::{Simulation, SimulationEngine, SimulationObserver};
    use crate::core::types::SimTime;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Counts ticks and re-arms a periodic timer each time it fires
    struct Metronome {
        scheduler: EventScheduler<&'static str>,
        period: SimTime,
        ticks_advanced: u64,
        beats: Vec<SimTime>,
    }

    impl Metronome {
        fn new(period: SimTime) -> Self {
            let mut scheduler = EventScheduler::new();
            scheduler.schedule_at("beat", period);
            Self {
                scheduler,
                period,
                ticks_advanced: 0,
                beats: Vec::new(),
            }
        }
    }

    impl Simulation for Metronome {
        type Event = &'static str;

        fn scheduler_mut(&mut self) -> &mut EventScheduler<Self::Event> {
            &mut self.scheduler
        }

        fn advance(&mut self, _now: SimTime, _dt: SimTime) {
            self.ticks_advanced += 1;
        }

        fn react(&mut self, now: SimTime, event: Self::Event) {
            assert_eq!(event, "beat");
            self.beats.push(now);
            self.scheduler.schedule_in("beat", now, self.period);
        }
    }

    struct RecordingObserver {
        steps: Rc<RefCell<Vec<(SimTime, usize)>>>,
    }

    impl SimulationObserver for RecordingObserver {
        fn on_time_advance(&mut self, old_time: SimTime, new_time: SimTime) {
            assert!(new_time > old_time);
        }

        fn on_step_complete(&mut self, time: SimTime, events_processed: usize) {
            self.steps.borrow_mut().push((time, events_processed));
        }
    }

    #[test]
    fn test_step_delivers_due_events() {
        let mut engine = SimulationEngine::new(Metronome::new(100), None);

        assert_eq!(engine.step(50).unwrap(), 0);
        assert_eq!(engine.step(50).unwrap(), 1);
        assert_eq!(engine.current_time(), 100);
        assert_eq!(engine.model().beats, vec![100]);
        assert_eq!(engine.model().ticks_advanced, 2);
    }

    #[test]
    fn test_zero_tick_is_rejected() {
        let mut engine = SimulationEngine::new(Metronome::new(100), None);
        assert!(engine.step(0).is_err());
        assert_eq!(engine.current_time(), 0);
    }

    #[test]
    fn test_run_with_time_limit() {
        let mut engine = SimulationEngine::new(Metronome::new(100), Some(1000));

        let final_time = engine.run(50).unwrap();

        assert_eq!(final_time, 1000);
        assert_eq!(engine.model().beats.len(), 10);
    }

    #[test]
    fn test_run_without_limit_is_an_error() {
        let mut engine = SimulationEngine::new(Metronome::new(100), None);
        assert!(engine.run(50).is_err());
    }

    #[test]
    fn test_run_for_stops_at_time_limit() {
        let mut engine = SimulationEngine::new(Metronome::new(100), Some(300));
        assert_eq!(engine.run_for(10_000, 100).unwrap(), 300);
    }

    #[test]
    fn test_observers_see_every_step() {
        let steps = Rc::new(RefCell::new(Vec::new()));
        let mut engine = SimulationEngine::new(Metronome::new(100), None);
        engine.add_observer(Box::new(RecordingObserver { steps: steps.clone() }));

        engine.run_for(200, 50).unwrap();

        assert_eq!(
            *steps.borrow(),
            vec![(50, 0), (100, 1), (150, 0), (200, 1)]
        );
    }
}
