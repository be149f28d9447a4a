use glam::Vec3;
use log::{debug, info};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};
use uuid::Uuid;

use super::agent::Order;
use super::clock::GameClock;
use super::config::{IncidentConfig, SeatSpec, SessionPricing};
use super::errands::Errand;
use super::ledger::BalanceLedger;
use crate::core::types::{AgentId, SeatId, SimTime};

/// What a renderer shows for a seat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatStatus {
    /// No chair pose; never assignable
    Unplaced,
    Free,
    /// Assigned to an agent who has not sat down yet
    Reserved,
    InSession,
    /// Occupant is away on an errand
    Paused,
    /// Breakdown countdown running
    Malfunction,
    Broken,
    OnFire,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pause {
    errand: Errand,
    remaining: f64,
}

/// One billed stay at a seat. Times are game-clock hours (`GameClock::total_hours`).
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    agent: AgentId,
    order_id: Uuid,
    payment: f64,
    total_hours: f64,
    started_at: f64,
    duration: f64,
    paused: Option<Pause>,
    incident_rolled: bool,
}

impl Session {
    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    /// Amount credited when the session started
    pub fn payment(&self) -> f64 {
        self.payment
    }

    /// Hours bought
    pub fn total_hours(&self) -> f64 {
        self.total_hours
    }

    /// Start of the current (possibly resumed) stretch
    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    /// Length of the current stretch
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_paused(&self) -> bool {
        self.paused.is_some()
    }

    pub fn paused_for(&self) -> Option<Errand> {
        self.paused.map(|pause| pause.errand)
    }

    fn elapsed(&self, now_hours: f64) -> f64 {
        (now_hours - self.started_at).max(0.0)
    }

    pub fn remaining(&self, now_hours: f64) -> f64 {
        match self.paused {
            Some(pause) => pause.remaining,
            None => (self.duration - self.elapsed(now_hours)).max(0.0),
        }
    }

    /// Hours of the session used up so far, across pauses
    pub fn billed_hours(&self, now_hours: f64) -> f64 {
        (self.total_hours - self.remaining(now_hours)).max(0.0)
    }

    pub fn is_expired(&self, now_hours: f64) -> bool {
        self.paused.is_none() && self.elapsed(now_hours) >= self.duration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatTickOutcome {
    Idle,
    Expired,
    BreakdownStarted,
    FireStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// A running breakdown countdown was answered in time
    FixedInTime,
    /// A seat left broken by a missed countdown works again
    Restored,
    OnFire,
    NothingToRepair,
}

#[derive(Debug, Clone, Copy)]
struct Breakdown {
    epoch: u64,
    deadline: SimTime,
}

/// A station: one chair and one billable computer session
#[derive(Debug, Clone)]
pub struct Seat {
    id: SeatId,
    chair: Option<Vec3>,
    pricing: SessionPricing,
    occupied: bool,
    assigned: Option<AgentId>,
    session: Option<Session>,
    broken: bool,
    on_fire: bool,
    breakdown: Option<Breakdown>,
    extinguish_hits: u32,
    epoch: u64,
}

impl Seat {
    pub fn new(id: SeatId, spec: &SeatSpec, default_pricing: SessionPricing) -> Self {
        Self {
            id,
            chair: spec.chair,
            pricing: spec.pricing.unwrap_or(default_pricing),
            occupied: false,
            assigned: None,
            session: None,
            broken: false,
            on_fire: false,
            breakdown: None,
            extinguish_hits: 0,
            epoch: 0,
        }
    }

    pub fn id(&self) -> SeatId {
        self.id
    }

    pub fn chair(&self) -> Option<Vec3> {
        self.chair
    }

    pub fn pricing(&self) -> &SessionPricing {
        &self.pricing
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    pub fn assigned_agent(&self) -> Option<AgentId> {
        self.assigned
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn is_on_fire(&self) -> bool {
        self.on_fire
    }

    pub fn has_breakdown(&self) -> bool {
        self.breakdown.is_some()
    }

    pub fn breakdown_deadline(&self) -> Option<SimTime> {
        self.breakdown.map(|breakdown| breakdown.deadline)
    }

    /// Milliseconds left on the repair countdown
    pub fn breakdown_remaining(&self, now: SimTime) -> Option<SimTime> {
        self.breakdown_deadline()
            .map(|deadline| deadline.saturating_sub(now))
    }

    pub fn extinguish_hits(&self) -> u32 {
        self.extinguish_hits
    }

    /// Free, working and placed
    pub fn is_available(&self) -> bool {
        !self.occupied
            && !self.broken
            && !self.on_fire
            && self.breakdown.is_none()
            && self.chair.is_some()
    }

    pub fn status(&self) -> SeatStatus {
        if self.on_fire {
            SeatStatus::OnFire
        } else if self.broken {
            SeatStatus::Broken
        } else if self.breakdown.is_some() {
            SeatStatus::Malfunction
        } else if self.chair.is_none() {
            SeatStatus::Unplaced
        } else {
            match &self.session {
                Some(session) if session.is_paused() => SeatStatus::Paused,
                Some(_) => SeatStatus::InSession,
                None if self.occupied => SeatStatus::Reserved,
                None => SeatStatus::Free,
            }
        }
    }

    /// Hold the seat for an agent walking over from the counter
    pub fn reserve(&mut self, agent: AgentId) -> bool {
        if !self.is_available() {
            return false;
        }
        self.occupied = true;
        self.assigned = Some(agent);
        true
    }

    /// Drop a reservation that never turned into a session
    pub fn release_reservation(&mut self, agent: AgentId) -> bool {
        if self.assigned != Some(agent) || self.session.is_some() {
            return false;
        }
        self.occupied = false;
        self.assigned = None;
        true
    }

    /// Start a session for `agent` and credit its payment.
    ///
    /// Refused when the seat is held by someone else, broken, burning,
    /// malfunctioning, has no chair, already runs a session, or the agent
    /// has not ordered.
    pub fn seat(
        &mut self,
        agent: AgentId,
        order: Option<&Order>,
        clock: &GameClock,
        ledger: &mut BalanceLedger,
    ) -> bool {
        if self.occupied && self.assigned != Some(agent) {
            debug!("[Seat {}] Refused agent {}: occupied", self.id, agent);
            return false;
        }
        if self.broken || self.on_fire || self.breakdown.is_some() {
            debug!("[Seat {}] Refused agent {}: out of order", self.id, agent);
            return false;
        }
        if self.chair.is_none() || self.session.is_some() {
            debug!("[Seat {}] Refused agent {}: not assignable", self.id, agent);
            return false;
        }
        let Some(order) = order else {
            debug!("[Seat {}] Refused agent {}: no order", self.id, agent);
            return false;
        };

        self.session = Some(Session {
            agent,
            order_id: order.id,
            payment: order.payment,
            total_hours: order.hours,
            started_at: clock.total_hours(),
            duration: order.hours,
            paused: None,
            incident_rolled: false,
        });
        self.occupied = true;
        self.assigned = Some(agent);
        ledger.add(order.payment);

        info!(
            "[Seat {}] Agent {} seated for {:.2}h, paid {:.2}",
            self.id, agent, order.hours, order.payment
        );
        true
    }

    /// Freeze the session while its agent is away; no-op unless `agent` owns it
    pub fn pause(&mut self, agent: AgentId, errand: Errand, now_hours: f64, epsilon: f64) -> bool {
        if !self.occupied || self.assigned != Some(agent) {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.paused.is_some() {
            return false;
        }

        let remaining = (session.duration - session.elapsed(now_hours)).max(epsilon);
        session.paused = Some(Pause { errand, remaining });
        debug!(
            "[Seat {}] Paused for agent {} ({}), {:.3}h left",
            self.id, agent, errand, remaining
        );
        true
    }

    /// Continue a paused session with the time that was left
    pub fn resume(&mut self, agent: AgentId, errand: Errand, now_hours: f64) -> bool {
        if !self.occupied || self.assigned != Some(agent) {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match session.paused {
            Some(pause) if pause.errand == errand => {
                session.duration = pause.remaining;
                session.started_at = now_hours;
                session.paused = None;
                debug!("[Seat {}] Resumed for agent {}", self.id, agent);
                true
            }
            _ => false,
        }
    }

    /// Per-tick check of a running session
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        now_hours: f64,
        incidents: &IncidentConfig,
        rng: &mut R,
    ) -> SeatTickOutcome {
        if self.broken || self.on_fire {
            return SeatTickOutcome::Idle;
        }
        let has_breakdown = self.breakdown.is_some();
        let Some(session) = self.session.as_mut() else {
            return SeatTickOutcome::Idle;
        };
        if session.is_paused() {
            return SeatTickOutcome::Idle;
        }
        if session.is_expired(now_hours) {
            return SeatTickOutcome::Expired;
        }

        if session.incident_rolled || has_breakdown || session.total_hours <= 0.0 {
            return SeatTickOutcome::Idle;
        }
        let fraction = session.billed_hours(now_hours) / session.total_hours;
        if fraction < incidents.min_elapsed_fraction {
            return SeatTickOutcome::Idle;
        }

        session.incident_rolled = true;
        if roll(rng, incidents.breakdown_probability) {
            SeatTickOutcome::BreakdownStarted
        } else if roll(rng, incidents.fire_probability) {
            SeatTickOutcome::FireStarted
        } else {
            SeatTickOutcome::Idle
        }
    }

    /// Start the repair countdown, returns the epoch its deadline must carry
    pub fn start_breakdown(&mut self, deadline: SimTime) -> u64 {
        self.epoch += 1;
        self.breakdown = Some(Breakdown {
            epoch: self.epoch,
            deadline,
        });
        info!("[Seat {}] Broke down, repair needed", self.id);
        self.epoch
    }

    pub fn repair(&mut self) -> RepairOutcome {
        if self.on_fire {
            return RepairOutcome::OnFire;
        }
        if self.breakdown.take().is_some() {
            self.epoch += 1;
            info!("[Seat {}] Repaired before the deadline", self.id);
            return RepairOutcome::FixedInTime;
        }
        if self.broken {
            self.broken = false;
            info!("[Seat {}] Restored to service", self.id);
            return RepairOutcome::Restored;
        }
        RepairOutcome::NothingToRepair
    }

    /// The repair deadline `epoch` passed. Returns `None` for a stale
    /// deadline, otherwise the seat is broken and the interrupted session
    /// (if any) is handed back for refunding.
    pub fn fail_breakdown(&mut self, epoch: u64) -> Option<Option<Session>> {
        match self.breakdown {
            Some(breakdown) if breakdown.epoch == epoch => {
                self.breakdown = None;
                self.broken = true;
                info!("[Seat {}] Repair deadline missed, seat is broken", self.id);
                Some(self.vacate())
            }
            _ => None,
        }
    }

    /// Set the seat on fire, evicting whoever sits there
    pub fn catch_fire(&mut self) -> Option<Session> {
        self.epoch += 1;
        self.breakdown = None;
        self.on_fire = true;
        self.broken = true;
        self.extinguish_hits = 0;
        info!("[Seat {}] Caught fire", self.id);
        self.vacate()
    }

    /// One hit with the extinguisher. Returns the hits still needed, or
    /// `None` if the seat is not burning.
    pub fn extinguish_hit(&mut self, required_hits: u32) -> Option<u32> {
        if !self.on_fire {
            return None;
        }
        self.extinguish_hits += 1;
        if self.extinguish_hits >= required_hits {
            self.on_fire = false;
            self.broken = false;
            self.extinguish_hits = 0;
            info!("[Seat {}] Fire extinguished", self.id);
            return Some(0);
        }
        Some(required_hits - self.extinguish_hits)
    }

    /// Clear occupancy and hand back the session, if any
    pub fn vacate(&mut self) -> Option<Session> {
        self.occupied = false;
        self.assigned = None;
        self.session.take()
    }
}

fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    Bernoulli::new(probability)
        .map(|distribution| distribution.sample(rng))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lounge::config::ClockConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seat() -> Seat {
        Seat::new(SeatId(0), &SeatSpec::at(Vec3::ZERO), SessionPricing::default())
    }

    fn clock() -> GameClock {
        GameClock::new(&ClockConfig {
            start_hour: 10.0,
            hours_per_second: 1.0,
        })
    }

    fn order(hours: f64) -> Order {
        Order::new(Uuid::nil(), hours, &SessionPricing::default())
    }

    fn no_incidents() -> IncidentConfig {
        IncidentConfig {
            breakdown_probability: 0.0,
            fire_probability: 0.0,
            ..IncidentConfig::default()
        }
    }

    #[test]
    fn test_seat_credits_payment_once() {
        let mut seat = seat();
        let clock = clock();
        let mut ledger = BalanceLedger::new(0.0);

        assert!(seat.seat(AgentId(1), Some(&order(2.0)), &clock, &mut ledger));
        assert_eq!(ledger.balance(), 100.0);
        assert_eq!(seat.status(), SeatStatus::InSession);

        assert!(!seat.seat(AgentId(2), Some(&order(1.0)), &clock, &mut ledger));
        assert!(!seat.seat(AgentId(1), Some(&order(1.0)), &clock, &mut ledger));
        assert_eq!(ledger.balance(), 100.0);
    }

    #[test]
    fn test_seat_refuses_without_order_or_chair() {
        let clock = clock();
        let mut ledger = BalanceLedger::new(0.0);

        let mut seat = seat();
        assert!(!seat.seat(AgentId(1), None, &clock, &mut ledger));

        let mut unplaced = Seat::new(
            SeatId(1),
            &SeatSpec {
                chair: None,
                pricing: None,
            },
            SessionPricing::default(),
        );
        assert!(!unplaced.is_available());
        assert_eq!(unplaced.status(), SeatStatus::Unplaced);
        assert!(!unplaced.seat(AgentId(1), Some(&order(1.0)), &clock, &mut ledger));
        assert_eq!(ledger.balance(), 0.0);
    }

    #[test]
    fn test_reservation_only_admits_its_agent() {
        let clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut seat = seat();

        assert!(seat.reserve(AgentId(1)));
        assert_eq!(seat.status(), SeatStatus::Reserved);
        assert!(!seat.reserve(AgentId(2)));
        assert!(!seat.seat(AgentId(2), Some(&order(1.0)), &clock, &mut ledger));
        assert!(seat.seat(AgentId(1), Some(&order(1.0)), &clock, &mut ledger));
        assert!(!seat.release_reservation(AgentId(1)));
    }

    #[test]
    fn test_pause_resume_conserves_time() {
        let mut clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut seat = seat();
        seat.seat(AgentId(1), Some(&order(3.0)), &clock, &mut ledger);

        let mut expected_remaining = 3.0;
        for stretch in [0.5, 0.25, 1.0] {
            clock.advance(stretch as f32, true);
            expected_remaining -= stretch;
            let before = seat.session().unwrap().duration();
            let elapsed = clock.total_hours() - seat.session().unwrap().started_at();

            assert!(seat.pause(AgentId(1), Errand::Drink, clock.total_hours(), 0.01));
            clock.advance(0.75, true);
            assert!(seat.resume(AgentId(1), Errand::Drink, clock.total_hours()));

            let after = seat.session().unwrap().duration();
            assert!((after - (before - elapsed)).abs() < 1e-6);
            assert!((after - expected_remaining).abs() < 1e-6);
        }
        let session = seat.session().unwrap();
        assert!((session.billed_hours(clock.total_hours()) - 1.75).abs() < 1e-6);
    }

    #[test]
    fn test_pause_floors_remaining_at_epsilon() {
        let mut clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut seat = seat();
        seat.seat(AgentId(1), Some(&order(1.0)), &clock, &mut ledger);

        clock.advance(1.5, true);
        assert!(seat.pause(AgentId(1), Errand::Food, clock.total_hours(), 0.01));
        assert!(seat.resume(AgentId(1), Errand::Food, clock.total_hours()));
        assert_eq!(seat.session().unwrap().duration(), 0.01);
    }

    #[test]
    fn test_pause_ignores_other_agents_and_errands() {
        let clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut seat = seat();
        seat.seat(AgentId(1), Some(&order(1.0)), &clock, &mut ledger);

        assert!(!seat.pause(AgentId(2), Errand::Drink, 0.0, 0.01));
        assert!(seat.pause(AgentId(1), Errand::Drink, 0.0, 0.01));
        assert!(!seat.pause(AgentId(1), Errand::Food, 0.0, 0.01));
        assert!(!seat.resume(AgentId(1), Errand::Food, 0.0));
        assert_eq!(seat.status(), SeatStatus::Paused);
    }

    #[test]
    fn test_tick_reports_expiry_unless_paused() {
        let mut clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut seat = seat();
        seat.seat(AgentId(1), Some(&order(1.0)), &clock, &mut ledger);

        clock.advance(0.5, true);
        seat.pause(AgentId(1), Errand::Drink, clock.total_hours(), 0.01);
        clock.advance(5.0, true);
        assert_eq!(seat.tick(clock.total_hours(), &no_incidents(), &mut rng), SeatTickOutcome::Idle);

        seat.resume(AgentId(1), Errand::Drink, clock.total_hours());
        clock.advance(0.5, true);
        assert_eq!(seat.tick(clock.total_hours(), &no_incidents(), &mut rng), SeatTickOutcome::Expired);
    }

    #[test]
    fn test_incident_rolled_once_after_min_fraction() {
        let mut clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut seat = seat();
        seat.seat(AgentId(1), Some(&order(2.0)), &clock, &mut ledger);
        let certain = IncidentConfig {
            breakdown_probability: 1.0,
            fire_probability: 1.0,
            min_elapsed_fraction: 0.5,
            ..IncidentConfig::default()
        };

        clock.advance(0.9, true);
        assert_eq!(seat.tick(clock.total_hours(), &certain, &mut rng), SeatTickOutcome::Idle);
        clock.advance(0.2, true);
        assert_eq!(
            seat.tick(clock.total_hours(), &certain, &mut rng),
            SeatTickOutcome::BreakdownStarted
        );
        assert_eq!(seat.tick(clock.total_hours(), &certain, &mut rng), SeatTickOutcome::Idle);
    }

    #[test]
    fn test_fire_rolled_when_breakdown_misses() {
        let mut clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut seat = seat();
        seat.seat(AgentId(1), Some(&order(2.0)), &clock, &mut ledger);
        let fire_only = IncidentConfig {
            breakdown_probability: 0.0,
            fire_probability: 1.0,
            min_elapsed_fraction: 0.0,
            ..IncidentConfig::default()
        };

        clock.advance(0.1, true);
        assert_eq!(seat.tick(clock.total_hours(), &fire_only, &mut rng), SeatTickOutcome::FireStarted);
    }

    #[test]
    fn test_breakdown_repaired_in_time_invalidates_deadline() {
        let clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut seat = seat();
        seat.seat(AgentId(1), Some(&order(2.0)), &clock, &mut ledger);

        let epoch = seat.start_breakdown(45_000);
        assert_eq!(seat.status(), SeatStatus::Malfunction);
        assert_eq!(seat.breakdown_remaining(40_000), Some(5_000));
        assert_eq!(seat.repair(), RepairOutcome::FixedInTime);

        assert_eq!(seat.fail_breakdown(epoch), None);
        assert!(!seat.is_broken());
        assert!(seat.session().is_some());
    }

    #[test]
    fn test_missed_breakdown_breaks_seat_and_returns_session() {
        let clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut seat = seat();
        seat.seat(AgentId(1), Some(&order(2.0)), &clock, &mut ledger);

        let epoch = seat.start_breakdown(45_000);
        let session = seat.fail_breakdown(epoch).unwrap().unwrap();

        assert_eq!(session.payment(), 100.0);
        assert!(seat.is_broken());
        assert!(!seat.is_occupied());
        assert!(!seat.reserve(AgentId(2)));

        assert_eq!(seat.repair(), RepairOutcome::Restored);
        assert!(seat.is_available());
    }

    #[test]
    fn test_fire_needs_extinguishing_not_repair() {
        let clock = clock();
        let mut ledger = BalanceLedger::new(0.0);
        let mut seat = seat();
        seat.seat(AgentId(1), Some(&order(2.0)), &clock, &mut ledger);

        let evicted = seat.catch_fire().unwrap();
        assert_eq!(evicted.agent(), AgentId(1));
        assert_eq!(seat.status(), SeatStatus::OnFire);
        assert_eq!(seat.repair(), RepairOutcome::OnFire);

        assert_eq!(seat.extinguish_hit(3), Some(2));
        assert_eq!(seat.extinguish_hit(3), Some(1));
        assert!(!seat.is_available());
        assert_eq!(seat.extinguish_hit(3), Some(0));
        assert!(seat.is_available());
        assert_eq!(seat.extinguish_hit(3), None);
    }
}
