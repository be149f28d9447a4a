//! The lounge model: customers, seats, shelves and timers of one simulation.
//!
//! [`Lounge`] implements [`Simulation`], so it is driven by a
//! [`SimulationEngine`](crate::core::simulation_engine::SimulationEngine):
//! every tick advances the game clock and the navigator, moves customers
//! through their states and checks the running sessions; timers arrive
//! through the event scheduler. Player operations live in `actions`.

use glam::Vec3;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution};
use std::collections::BTreeMap;

use super::agent::{AgentState, CustomerAgent, LeaveReason, PendingWalk};
use super::clock::GameClock;
use super::config::{LoungeConfig, StockSpec};
use super::errands::{Errand, ErrandSlots};
use super::events::LoungeEvent;
use super::ledger::BalanceLedger;
use super::navigation::{Navigator, StraightLineNavigator};
use super::presentation::{AudioSink, LogSink, PresentationSink, SoundCue};
use super::seat::{Seat, SeatTickOutcome};
use super::spawner::Spawner;
use super::stats::LoungeStats;
use super::stock::{SlotHandle, StockKind, StockLedger};
use super::voice::VoiceSchedule;
use crate::core::event_scheduler::EventScheduler;
use crate::core::simulation_engine::Simulation;
use crate::core::types::{millis_to_secs, secs_to_millis, AgentId, SeatId, SimTime};

pub struct Lounge<N: Navigator = StraightLineNavigator> {
    pub(crate) config: LoungeConfig,
    pub(crate) now: SimTime,
    pub(crate) clock: GameClock,
    pub(crate) doors: Vec<bool>,
    pub(crate) seats: Vec<Seat>,
    pub(crate) agents: BTreeMap<AgentId, CustomerAgent>,
    pub(crate) balance: BalanceLedger,
    pub(crate) drinks: StockLedger,
    pub(crate) food: StockLedger,
    pub(crate) hookahs: StockLedger,
    pub(crate) errands: ErrandSlots,
    /// Item in the player's hands
    pub(crate) holding: Option<SlotHandle>,
    pub(crate) spawner: Spawner,
    pub(crate) scheduler: EventScheduler<LoungeEvent>,
    pub(crate) rng: StdRng,
    pub(crate) navigator: N,
    observers: Vec<Box<dyn PresentationSink>>,
    audio: Box<dyn AudioSink>,
    pub(crate) stats: LoungeStats,
    next_agent: u64,
    pub(crate) food_epoch: u64,
    last_hour: u32,
}

impl Lounge<StraightLineNavigator> {
    /// Lounge with straight-line movement and sounds written to the log
    pub fn headless(config: LoungeConfig) -> Result<Self, String> {
        let navigator = StraightLineNavigator::new(config.agent.walk_speed);
        Self::new(config, navigator, Box::new(LogSink))
    }
}

impl<N: Navigator> Lounge<N> {
    pub fn new(config: LoungeConfig, navigator: N, audio: Box<dyn AudioSink>) -> Result<Self, String> {
        config.validate()?;

        let clock = GameClock::new(&config.clock);
        let seats: Vec<Seat> = config
            .layout
            .seats
            .iter()
            .enumerate()
            .map(|(i, spec)| Seat::new(SeatId(i), spec, config.pricing))
            .collect();
        let spawner = Spawner::new(config.spawner.clone());
        let mut scheduler = EventScheduler::new();
        scheduler.schedule_at(LoungeEvent::SpawnDue, spawner.next_due());

        info!(
            "[Lounge] Opening with {} seats, {} doors, balance {:.2}",
            seats.len(),
            config.layout.doors,
            config.starting_balance
        );

        Ok(Self {
            now: 0,
            last_hour: clock.hour_of_day().floor() as u32,
            clock,
            doors: vec![false; config.layout.doors],
            seats,
            agents: BTreeMap::new(),
            balance: BalanceLedger::new(config.starting_balance),
            drinks: StockLedger::from_spec(StockKind::Drink, &config.stock.drinks),
            food: StockLedger::from_spec(StockKind::Food, &config.stock.food),
            hookahs: StockLedger::from_spec(StockKind::Hookah, &config.stock.hookah),
            errands: ErrandSlots::new(),
            holding: None,
            spawner,
            scheduler,
            rng: StdRng::seed_from_u64(config.random_seed),
            navigator,
            observers: Vec::new(),
            audio,
            stats: LoungeStats::default(),
            next_agent: 0,
            food_epoch: 0,
            config,
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn PresentationSink>) {
        self.observers.push(observer);
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn config(&self) -> &LoungeConfig {
        &self.config
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn balance(&self) -> f64 {
        self.balance.balance()
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn seat(&self, id: SeatId) -> Option<&Seat> {
        self.seats.get(id.0)
    }

    pub fn agent(&self, id: AgentId) -> Option<&CustomerAgent> {
        self.agents.get(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &CustomerAgent> {
        self.agents.values()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Ids of the agents currently in `state`, oldest first
    pub fn agents_in(&self, state: AgentState) -> Vec<AgentId> {
        self.agents
            .values()
            .filter(|agent| agent.state == state)
            .map(|agent| agent.id)
            .collect()
    }

    /// Agents at the door, walking to or waiting at the counter
    pub fn queue_len(&self) -> usize {
        self.agents
            .values()
            .filter(|agent| agent.state.is_queueing())
            .count()
    }

    pub fn stock(&self, kind: StockKind) -> &StockLedger {
        match kind {
            StockKind::Drink => &self.drinks,
            StockKind::Food => &self.food,
            StockKind::Hookah => &self.hookahs,
        }
    }

    pub(crate) fn stock_mut(&mut self, kind: StockKind) -> &mut StockLedger {
        match kind {
            StockKind::Drink => &mut self.drinks,
            StockKind::Food => &mut self.food,
            StockKind::Hookah => &mut self.hookahs,
        }
    }

    pub fn stock_spec(&self, kind: StockKind) -> &StockSpec {
        match kind {
            StockKind::Drink => &self.config.stock.drinks,
            StockKind::Food => &self.config.stock.food,
            StockKind::Hookah => &self.config.stock.hookah,
        }
    }

    pub fn errands(&self) -> &ErrandSlots {
        &self.errands
    }

    /// Kind of item the player is holding
    pub fn holding(&self) -> Option<StockKind> {
        self.holding.map(|handle| handle.kind)
    }

    pub fn door_count(&self) -> usize {
        self.doors.len()
    }

    pub fn door_open(&self, door: usize) -> Option<bool> {
        self.doors.get(door).copied()
    }

    /// True when every gating door is open
    pub fn doors_open(&self) -> bool {
        self.doors.iter().all(|open| *open)
    }

    pub fn stats(&self) -> &LoungeStats {
        &self.stats
    }

    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    // Presentation plumbing

    fn notify(&mut self, mut f: impl FnMut(&mut dyn PresentationSink)) {
        for observer in self.observers.iter_mut() {
            f(observer.as_mut());
        }
    }

    pub(crate) fn play(&mut self, cue: SoundCue) {
        self.audio.play(cue);
    }

    pub(crate) fn set_agent_state(&mut self, id: AgentId, to: AgentState) {
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        let from = agent.set_state(to);
        if from != to {
            debug!("[Agent {}] {:?} -> {:?}", id, from, to);
            self.notify(|sink| sink.agent_state_changed(id, from, to));
        }
    }

    pub(crate) fn seat_changed(&mut self, seat: SeatId) {
        let Some(status) = self.seats.get(seat.0).map(Seat::status) else {
            return;
        };
        self.notify(|sink| sink.seat_changed(seat, status));
    }

    pub(crate) fn balance_changed(&mut self) {
        let balance = self.balance.balance();
        self.notify(|sink| sink.balance_changed(balance));
    }

    pub(crate) fn credit(&mut self, amount: f64) {
        self.balance.add(amount);
        self.credited(amount);
    }

    /// Bookkeeping for money that already reached the ledger
    fn credited(&mut self, amount: f64) {
        self.stats.revenue += amount;
        self.play(SoundCue::CashRegister);
        self.balance_changed();
    }

    /// Pay money back, returns the amount actually refunded
    pub(crate) fn refund(&mut self, amount: f64) -> f64 {
        if amount <= 0.0 {
            return 0.0;
        }
        let paid = self.balance.refund(amount);
        self.stats.refunds += paid;
        self.balance_changed();
        paid
    }

    fn roll(&mut self, probability: f64) -> bool {
        Bernoulli::new(probability)
            .map(|distribution| distribution.sample(&mut self.rng))
            .unwrap_or(false)
    }

    // Agents

    pub(crate) fn spawn_agent(&mut self) -> AgentId {
        self.next_agent += 1;
        let id = AgentId(self.next_agent);
        let at = self.config.layout.spawn_point;

        self.navigator.place(id, at);
        self.agents.insert(id, CustomerAgent::new(id, self.next_agent, self.now));
        self.stats.spawned += 1;

        info!("[Spawner] Agent {} arrives at the door", id);
        self.notify(|sink| sink.agent_spawned(id, at));
        id
    }

    fn spawn_due(&mut self) {
        self.reconcile();

        let queue_len = self.queue_len();
        let batch = self.spawner.batch_size(&mut self.rng, queue_len);
        for _ in 0..batch {
            self.spawn_agent();
        }

        let due = self.spawner.reschedule(self.now, &mut self.rng);
        self.scheduler.schedule_at(LoungeEvent::SpawnDue, due);
    }

    /// Remove an agent from the world, releasing everything it holds
    pub(crate) fn despawn(&mut self, id: AgentId) {
        self.release_holdings(id, true);
        let Some(agent) = self.agents.remove(&id) else {
            return;
        };
        self.navigator.remove(id);
        self.stats.departed += 1;
        debug!("[Agent {}] Removed", id);
        self.notify(|sink| sink.agent_removed(id));

        if agent.state.is_queueing() {
            self.compact_queue();
        }
    }

    /// Give back the agent's errand slot, seat and hookah. Pending food is
    /// refunded when `refund_food` is set.
    fn release_holdings(&mut self, id: AgentId, refund_food: bool) {
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        let token = agent.errand.take();
        let seat = agent.seat.take();
        let hookah = agent.hookah.take();
        let food = agent.pending_food.take();
        agent.returning_to_seat = false;

        if let Some(token) = token {
            self.errands.release(token);
        }
        if let Some(seat_id) = seat {
            if let Some(seat) = self.seats.get_mut(seat_id.0) {
                if seat.assigned_agent() == Some(id) {
                    seat.vacate();
                    self.seat_changed(seat_id);
                }
            }
        }
        if hookah.is_some() {
            self.hookahs.give_back();
            debug!("[Agent {}] Returned a hookah", id);
        }
        if let Some(food) = food {
            if refund_food {
                let paid = self.refund(food.payment);
                debug!("[Agent {}] Refunded {:.2} for undelivered food", id, paid);
            }
        }
    }

    /// Release whatever the agent holds and send it to the exit
    pub(crate) fn begin_leaving(&mut self, id: AgentId, reason: LeaveReason) {
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        if agent.state == AgentState::Leaving {
            return;
        }
        agent.leave_reason = Some(reason);
        agent.pending_walk = None;
        let was_queueing = agent.state.is_queueing();

        info!("[Agent {}] Leaving: {:?}", id, reason);
        self.release_holdings(id, reason != LeaveReason::FireEvicted);
        let exit = self.config.layout.exit_point;
        self.walk(id, exit, AgentState::Leaving);

        if was_queueing {
            self.compact_queue();
        }
    }

    // Movement

    /// Send an agent towards `target`, entering `state` once the path is
    /// accepted. A refused path keeps the agent in its current state and
    /// schedules retries; leaving agents switch state right away.
    pub(crate) fn walk(&mut self, id: AgentId, target: Vec3, state: AgentState) {
        if state == AgentState::Leaving {
            self.set_agent_state(id, state);
        }

        match self.navigator.set_destination(id, target) {
            Ok(()) => self.walk_started(id, target, state),
            Err(err) => {
                self.stats.nav_failures += 1;
                debug!("[Agent {}] Path for {:?} refused: {}", id, state, err);
                let pending = PendingWalk { target, state };
                if let Some(agent) = self.agents.get_mut(&id) {
                    agent.pending_walk = Some(pending);
                }
                if !self.schedule_nav_retry(id, 0) {
                    self.give_up_walk(id, pending);
                }
            }
        }
    }

    fn walk_started(&mut self, id: AgentId, target: Vec3, state: AgentState) {
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        agent.pending_walk = None;
        agent.destination = Some(target);
        agent.last_sample = self.navigator.position(id);
        let arm_watchdog = !agent.watchdog_armed;
        agent.watchdog_armed = true;

        self.set_agent_state(id, state);

        if arm_watchdog {
            let delay = secs_to_millis(self.config.agent.stuck_check_secs);
            self.scheduler
                .schedule_in(LoungeEvent::StuckCheck(id), self.now, delay);
        }
    }

    fn schedule_nav_retry(&mut self, id: AgentId, attempt: usize) -> bool {
        let Some(delay) = self.config.agent.nav_retry_delays_secs.get(attempt) else {
            return false;
        };
        let delay = secs_to_millis(*delay);
        self.scheduler
            .schedule_in(LoungeEvent::NavRetry { agent: id, attempt }, self.now, delay);
        true
    }

    fn retry_walk(&mut self, id: AgentId, attempt: usize) {
        let Some(pending) = self.agents.get(&id).and_then(|agent| agent.pending_walk) else {
            return;
        };

        match self.navigator.set_destination(id, pending.target) {
            Ok(()) => {
                debug!("[Agent {}] Path accepted on retry {}", id, attempt + 1);
                self.walk_started(id, pending.target, pending.state);
                if pending.state == AgentState::WalkingToCounter {
                    self.compact_queue();
                }
            }
            Err(err) => {
                self.stats.nav_failures += 1;
                debug!("[Agent {}] Retry {} failed: {}", id, attempt + 1, err);
                if !self.schedule_nav_retry(id, attempt + 1) {
                    if let Some(agent) = self.agents.get_mut(&id) {
                        agent.pending_walk = None;
                    }
                    self.give_up_walk(id, pending);
                }
            }
        }
    }

    /// Retries for a walk are exhausted
    fn give_up_walk(&mut self, id: AgentId, pending: PendingWalk) {
        warn!(
            "[Agent {}] No path for {:?}, giving up after {} retries",
            id,
            pending.state,
            self.config.agent.nav_retry_delays_secs.len()
        );
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        agent.pending_walk = None;
        let seat = agent.seat;
        let returning = agent.returning_to_seat;
        // A re-issued walk that was refused has already entered its state
        let started = agent.state == pending.state;

        match pending.state {
            AgentState::Leaving => self.despawn(id),
            AgentState::WalkingToCounterForDrink | AgentState::WalkingToCounterForFood => {
                self.finish_errand(id);
                match seat {
                    Some(seat_id) if started => self.sit_down(id, seat_id),
                    Some(_) => self.schedule_want_roll(id),
                    None => self.begin_leaving(id, LeaveReason::SeatUnavailable),
                }
            }
            AgentState::WalkingToSeat => match seat {
                Some(seat_id) if returning => self.sit_down(id, seat_id),
                Some(seat_id) => {
                    if let Some(agent) = self.agents.get_mut(&id) {
                        agent.seat = None;
                    }
                    if let Some(seat) = self.seats.get_mut(seat_id.0) {
                        seat.release_reservation(id);
                    }
                    self.seat_changed(seat_id);
                    self.set_agent_state(id, AgentState::WaitingAtCounter);
                    self.compact_queue();
                }
                None => self.set_agent_state(id, AgentState::WaitingAtCounter),
            },
            AgentState::WalkingToCounter => self.give_up_admission(id),
            _ => {}
        }
    }

    /// Admission to the counter failed; back to the door for another round
    /// unless the rounds are used up
    fn give_up_admission(&mut self, id: AgentId) {
        let max_rounds = self.config.agent.max_admission_rounds;
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        agent.admission_rounds += 1;
        if agent.admission_rounds >= max_rounds {
            self.begin_leaving(id, LeaveReason::Unreachable);
            return;
        }
        self.set_agent_state(id, AgentState::WaitingAtDoor);
    }

    fn has_arrived(&self, id: AgentId) -> bool {
        !self.navigator.path_pending(id)
            && self
                .navigator
                .remaining_distance(id)
                .map_or(false, |distance| distance <= self.config.agent.arrival_threshold)
    }

    fn check_arrivals(&mut self) {
        let arrived: Vec<AgentId> = self
            .agents
            .values()
            .filter(|agent| agent.state.is_walking() && agent.pending_walk.is_none())
            .filter(|agent| self.has_arrived(agent.id))
            .map(|agent| agent.id)
            .collect();

        for id in arrived {
            self.on_arrival(id);
        }
    }

    fn on_arrival(&mut self, id: AgentId) {
        let Some(state) = self.agents.get(&id).map(|agent| agent.state) else {
            return;
        };
        match state {
            AgentState::WalkingToCounter => self.set_agent_state(id, AgentState::WaitingAtCounter),
            AgentState::WalkingToSeat => self.arrive_at_seat(id),
            AgentState::WalkingToCounterForDrink => self.set_agent_state(id, AgentState::WaitingForDrink),
            AgentState::WalkingToCounterForFood => self.set_agent_state(id, AgentState::WaitingForFood),
            AgentState::Leaving => {
                info!("[Agent {}] Left the lounge", id);
                self.despawn(id);
            }
            _ => {}
        }
    }

    fn arrive_at_seat(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get(&id) else {
            return;
        };
        let Some(seat_id) = agent.seat else {
            warn!("[Agent {}] Reached a seat it was never assigned", id);
            self.begin_leaving(id, LeaveReason::SeatUnavailable);
            return;
        };
        if agent.returning_to_seat {
            self.sit_down(id, seat_id);
            return;
        }

        let order = agent.order.clone();
        let seated = match self.seats.get_mut(seat_id.0) {
            Some(seat) => seat.seat(id, order.as_ref(), &self.clock, &mut self.balance),
            None => false,
        };
        let Some(order) = order.filter(|_| seated) else {
            warn!("[Agent {}] Could not take seat {}", id, seat_id);
            self.begin_leaving(id, LeaveReason::SeatUnavailable);
            return;
        };

        self.credited(order.payment);
        self.stats.seated += 1;
        let voice = VoiceSchedule::generate(&mut self.rng, order.hours, &self.config.voice);
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.voice = Some(voice);
            agent.seated_at = Some(self.now);
        }
        self.sit_down(id, seat_id);
    }

    /// Snap the agent onto its chair
    fn sit_down(&mut self, id: AgentId, seat_id: SeatId) {
        if let Some(chair) = self.seats.get(seat_id.0).and_then(Seat::chair) {
            self.navigator.warp(id, chair);
        }
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.returning_to_seat = false;
            agent.destination = None;
        }
        self.set_agent_state(id, AgentState::SittingAtSeat);
        self.seat_changed(seat_id);
        self.schedule_want_roll(id);
    }

    /// Send the agent back to its chair after an errand
    pub(crate) fn return_to_seat(&mut self, id: AgentId) {
        let chair = self
            .agents
            .get(&id)
            .and_then(|agent| agent.seat)
            .and_then(|seat_id| self.seats.get(seat_id.0))
            .and_then(Seat::chair);
        let Some(chair) = chair else {
            self.begin_leaving(id, LeaveReason::SeatUnavailable);
            return;
        };
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.returning_to_seat = true;
        }
        // The errand is over even if the path home is refused
        self.set_agent_state(id, AgentState::WalkingToSeat);
        self.walk(id, chair, AgentState::WalkingToSeat);
    }

    // Counter queue

    fn counter_line(&self) -> Vec<AgentId> {
        let mut line: Vec<&CustomerAgent> = self
            .agents
            .values()
            .filter(|agent| {
                matches!(
                    agent.state,
                    AgentState::WalkingToCounter | AgentState::WaitingAtCounter
                ) && agent.seat.is_none()
            })
            .collect();
        line.sort_by_key(|agent| agent.queue_ticket);
        line.iter().map(|agent| agent.id).collect()
    }

    fn queue_place(&self, rank: usize) -> Vec3 {
        self.config.layout.counter_point + self.config.layout.queue_spacing * rank as f32
    }

    /// Move everyone in the counter line up to their place
    pub(crate) fn compact_queue(&mut self) {
        for (rank, id) in self.counter_line().into_iter().enumerate() {
            let target = self.queue_place(rank);
            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            if agent.destination == Some(target) || agent.pending_walk.is_some() {
                continue;
            }
            match self.navigator.set_destination(id, target) {
                Ok(()) => {
                    agent.destination = Some(target);
                    debug!("[Agent {}] Moves up to queue place {}", id, rank);
                }
                Err(err) => debug!("[Agent {}] Could not move up the queue: {}", id, err),
            }
        }
    }

    fn admit_from_door(&mut self) {
        if !self.doors_open() {
            return;
        }
        let mut waiting: Vec<(u64, AgentId)> = self
            .agents
            .values()
            .filter(|agent| agent.state == AgentState::WaitingAtDoor && agent.pending_walk.is_none())
            .map(|agent| (agent.queue_ticket, agent.id))
            .collect();
        waiting.sort();

        for (_, id) in waiting {
            let target = self.queue_place(self.counter_line().len());
            self.walk(id, target, AgentState::WalkingToCounter);
        }
    }

    // Errands

    fn schedule_want_roll(&mut self, id: AgentId) {
        let delay = secs_to_millis(self.config.agent.want_poll_secs);
        self.scheduler
            .schedule_in(LoungeEvent::WantRoll(id), self.now, delay);
    }

    fn roll_wants(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get(&id) else {
            return;
        };
        if agent.state != AgentState::SittingAtSeat || agent.pending_walk.is_some() {
            return;
        }
        let min_seated = secs_to_millis(self.config.agent.min_seated_secs);
        let settled = agent.seated_for(self.now).map_or(false, |seated| seated >= min_seated);
        let may_order_food = agent.pending_food.is_none();

        let mut started = false;
        if settled {
            if self.roll(self.config.agent.drink_want_probability) {
                started = self.start_errand(id, Errand::Drink);
            }
            if !started && may_order_food && self.roll(self.config.agent.food_want_probability) {
                started = self.start_errand(id, Errand::Food);
            }
        }
        if !started {
            self.schedule_want_roll(id);
        }
    }

    fn start_errand(&mut self, id: AgentId, errand: Errand) -> bool {
        let Some(seat_id) = self.agents.get(&id).and_then(|agent| agent.seat) else {
            return false;
        };
        let Some(token) = self.errands.try_acquire(errand, id) else {
            return false;
        };

        let now_hours = self.clock.total_hours();
        let epsilon = self.config.incidents.pause_epsilon_hours;
        let paused = self
            .seats
            .get_mut(seat_id.0)
            .map_or(false, |seat| seat.pause(id, errand, now_hours, epsilon));
        if !paused {
            self.errands.release(token);
            return false;
        }
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.errand = Some(token);
        }

        info!("[Agent {}] Wants {}", id, errand);
        self.seat_changed(seat_id);
        let (target, state) = match errand {
            Errand::Drink => (self.config.layout.drink_point, AgentState::WalkingToCounterForDrink),
            Errand::Food => (self.config.layout.food_point, AgentState::WalkingToCounterForFood),
        };
        self.walk(id, target, state);
        true
    }

    /// Hand back the errand slot and resume the paused session
    pub(crate) fn finish_errand(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        let Some(token) = agent.errand.take() else {
            return;
        };
        let seat = agent.seat;
        let errand = token.errand();
        self.errands.release(token);

        if let Some(seat_id) = seat {
            let now_hours = self.clock.total_hours();
            if let Some(seat) = self.seats.get_mut(seat_id.0) {
                seat.resume(id, errand, now_hours);
            }
            self.seat_changed(seat_id);
        }
    }

    // Seats and incidents

    /// Free seats and errand slots whose holder is gone or can no longer
    /// hold them. Returns the number of repairs made.
    pub fn reconcile(&mut self) -> usize {
        let mut repaired = 0;
        for index in 0..self.seats.len() {
            let seat_id = SeatId(index);
            let seat = &self.seats[index];
            if !seat.is_occupied() && seat.assigned_agent().is_none() {
                continue;
            }
            let holds_seat = seat
                .assigned_agent()
                .and_then(|holder| self.agents.get(&holder))
                .map_or(false, |agent| {
                    let walking_over = agent
                        .pending_walk
                        .map_or(false, |walk| walk.state == AgentState::WalkingToSeat);
                    agent.seat == Some(seat_id) && (agent.state.may_hold_seat() || walking_over)
                });
            if holds_seat {
                continue;
            }

            warn!(
                "[Seat {}] Held by missing agent {:?}, freeing it",
                seat_id,
                seat.assigned_agent()
            );
            self.seats[index].vacate();
            self.stats.reconciled += 1;
            repaired += 1;
            self.seat_changed(seat_id);
        }

        let agents = &self.agents;
        let freed = self
            .errands
            .release_orphans(|holder| agents.get(&holder).map_or(false, |agent| agent.errand.is_some()));
        self.stats.reconciled += freed as u64;
        repaired + freed
    }

    fn tick_seats(&mut self) {
        let now_hours = self.clock.total_hours();
        for index in 0..self.seats.len() {
            let outcome = self.seats[index].tick(now_hours, &self.config.incidents, &mut self.rng);
            let seat_id = SeatId(index);
            match outcome {
                SeatTickOutcome::Idle => {}
                SeatTickOutcome::Expired => self.end_session(seat_id),
                SeatTickOutcome::BreakdownStarted => self.start_breakdown(seat_id),
                SeatTickOutcome::FireStarted => self.start_fire(seat_id),
            }
        }
    }

    fn end_session(&mut self, seat_id: SeatId) {
        let Some(session) = self.seats.get_mut(seat_id.0).and_then(Seat::vacate) else {
            return;
        };
        self.stats.sessions_completed += 1;
        info!(
            "[Seat {}] Session of agent {} ended after {:.2}h",
            seat_id,
            session.agent(),
            session.total_hours()
        );
        self.seat_changed(seat_id);
        self.begin_leaving(session.agent(), LeaveReason::SessionEnded);
    }

    fn start_breakdown(&mut self, seat_id: SeatId) {
        let deadline = self.now + secs_to_millis(self.config.incidents.repair_timeout_secs);
        let Some(epoch) = self
            .seats
            .get_mut(seat_id.0)
            .map(|seat| seat.start_breakdown(deadline))
        else {
            return;
        };
        self.scheduler
            .schedule_at(LoungeEvent::RepairDeadline { seat: seat_id, epoch }, deadline);
        self.stats.breakdowns += 1;
        self.play(SoundCue::Breakdown(seat_id));
        self.seat_changed(seat_id);
    }

    fn start_fire(&mut self, seat_id: SeatId) {
        let Some(seat) = self.seats.get_mut(seat_id.0) else {
            return;
        };
        let evicted = seat.catch_fire();
        self.stats.fires += 1;
        self.play(SoundCue::FireAlarm(seat_id));
        self.seat_changed(seat_id);

        if let Some(session) = evicted {
            warn!(
                "[Seat {}] Fire! Agent {} evicted, no refund",
                seat_id,
                session.agent()
            );
            self.begin_leaving(session.agent(), LeaveReason::FireEvicted);
        }
    }

    fn repair_deadline(&mut self, seat_id: SeatId, epoch: u64) {
        let Some(seat) = self.seats.get_mut(seat_id.0) else {
            return;
        };
        let Some(interrupted) = seat.fail_breakdown(epoch) else {
            debug!("[Seat {}] Stale repair deadline {} ignored", seat_id, epoch);
            return;
        };
        self.stats.seats_broken += 1;
        self.seat_changed(seat_id);

        if let Some(session) = interrupted {
            let refunded = self.refund(session.payment());
            warn!(
                "[Seat {}] Not repaired in time, refunded {:.2} to agent {}",
                seat_id,
                refunded,
                session.agent()
            );
            self.begin_leaving(session.agent(), LeaveReason::BreakdownTimeout);
        }
    }

    fn food_deadline(&mut self, id: AgentId, epoch: u64) {
        let Some(agent) = self.agents.get(&id) else {
            return;
        };
        if agent.pending_food.map(|food| food.epoch) != Some(epoch) {
            return;
        }
        let seat = agent.seat;

        self.stats.food_timeouts += 1;
        warn!("[Agent {}] Food never arrived, leaving with a refund", id);
        if let Some(seat_id) = seat {
            let session = match self.seats.get_mut(seat_id.0) {
                Some(seat) if seat.assigned_agent() == Some(id) => seat.vacate(),
                _ => None,
            };
            if let Some(session) = session {
                self.refund(session.payment());
            }
            self.seat_changed(seat_id);
        }
        // The food payment is refunded on the way out
        self.begin_leaving(id, LeaveReason::FoodTimeout);
    }

    fn check_stuck(&mut self, id: AgentId) {
        let min_move = self.config.agent.stuck_min_move;
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        if !agent.state.is_walking() {
            agent.watchdog_armed = false;
            return;
        }

        let position = self.navigator.position(id);
        let moved = match (agent.last_sample, position) {
            (Some(before), Some(now)) => before.distance(now),
            _ => f32::MAX,
        };
        agent.last_sample = position;
        let stuck = moved < min_move
            && agent.pending_walk.is_none()
            && !self.navigator.path_pending(id);
        let target = agent.destination;
        let state = agent.state;

        if let (true, Some(target)) = (stuck, target) {
            self.stats.stuck_reissues += 1;
            warn!("[Agent {}] Stuck while {:?}, re-issuing destination", id, state);
            if let Err(err) = self.navigator.set_destination(id, target) {
                self.stats.nav_failures += 1;
                debug!("[Agent {}] Re-issue refused: {}", id, err);
                if let Some(agent) = self.agents.get_mut(&id) {
                    agent.pending_walk = Some(PendingWalk { target, state });
                }
                self.schedule_nav_retry(id, 0);
            }
        }

        let delay = secs_to_millis(self.config.agent.stuck_check_secs);
        self.scheduler
            .schedule_in(LoungeEvent::StuckCheck(id), self.now, delay);
    }

    fn play_voice_lines(&mut self) {
        let now_hours = self.clock.total_hours();
        let mut cues = Vec::new();
        for agent in self.agents.values_mut() {
            if agent.state != AgentState::SittingAtSeat {
                continue;
            }
            let Some(session) = agent
                .seat
                .and_then(|seat_id| self.seats.get(seat_id.0))
                .and_then(Seat::session)
            else {
                continue;
            };
            let Some(voice) = agent.voice.as_mut() else {
                continue;
            };
            for cue in voice.due(session.billed_hours(now_hours)) {
                cues.push(SoundCue::VoiceLine {
                    agent: agent.id,
                    variant: cue.variant,
                });
            }
        }
        for cue in cues {
            self.play(cue);
        }
    }

    fn track_hour(&mut self) {
        let hour = self.clock.hour_of_day().floor() as u32;
        if hour != self.last_hour {
            self.last_hour = hour;
            self.notify(|sink| sink.hour_changed(hour));
        }
    }
}

impl<N: Navigator> Simulation for Lounge<N> {
    type Event = LoungeEvent;

    fn scheduler_mut(&mut self) -> &mut EventScheduler<LoungeEvent> {
        &mut self.scheduler
    }

    fn advance(&mut self, now: SimTime, dt: SimTime) {
        self.now = now;
        let dt_secs = millis_to_secs(dt);

        if self.clock.advance(dt_secs, self.doors_open()) {
            info!("[Clock] Midnight, day {} begins", self.clock.day());
        }
        self.track_hour();
        self.navigator.advance(dt_secs);

        self.admit_from_door();
        self.check_arrivals();
        self.tick_seats();
        self.play_voice_lines();
    }

    fn react(&mut self, now: SimTime, event: LoungeEvent) {
        self.now = now;
        match event {
            LoungeEvent::SpawnDue => self.spawn_due(),
            LoungeEvent::StuckCheck(agent) => self.check_stuck(agent),
            LoungeEvent::NavRetry { agent, attempt } => self.retry_walk(agent, attempt),
            LoungeEvent::WantRoll(agent) => self.roll_wants(agent),
            LoungeEvent::RepairDeadline { seat, epoch } => self.repair_deadline(seat, epoch),
            LoungeEvent::FoodDeadline { agent, epoch } => self.food_deadline(agent, epoch),
        }
    }
}
