use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::SessionPricing;
use super::errands::{Errand, ErrandToken};
use super::stock::SlotHandle;
use super::voice::VoiceSchedule;
use crate::core::types::{AgentId, SeatId, SimTime};

/// Lifecycle state of a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    WaitingAtDoor,
    WalkingToCounter,
    WaitingAtCounter,
    WalkingToSeat,
    SittingAtSeat,
    WalkingToCounterForDrink,
    WaitingForDrink,
    WalkingToCounterForFood,
    WaitingForFood,
    /// Walking to the exit; the agent is removed on arrival
    Leaving,
}

impl AgentState {
    pub fn is_walking(self) -> bool {
        matches!(
            self,
            AgentState::WalkingToCounter
                | AgentState::WalkingToSeat
                | AgentState::WalkingToCounterForDrink
                | AgentState::WalkingToCounterForFood
                | AgentState::Leaving
        )
    }

    /// Counts against the spawner's queue cap
    pub fn is_queueing(self) -> bool {
        matches!(
            self,
            AgentState::WaitingAtDoor | AgentState::WalkingToCounter | AgentState::WaitingAtCounter
        )
    }

    /// States in which an agent may be the occupant of a seat
    pub fn may_hold_seat(self) -> bool {
        matches!(
            self,
            AgentState::WalkingToSeat
                | AgentState::SittingAtSeat
                | AgentState::WalkingToCounterForDrink
                | AgentState::WaitingForDrink
                | AgentState::WalkingToCounterForFood
                | AgentState::WaitingForFood
        )
    }

    pub fn is_away(self) -> bool {
        self.errand().is_some()
    }

    /// The errand this state belongs to, if any
    pub fn errand(self) -> Option<Errand> {
        match self {
            AgentState::WalkingToCounterForDrink | AgentState::WaitingForDrink => Some(Errand::Drink),
            AgentState::WalkingToCounterForFood | AgentState::WaitingForFood => Some(Errand::Food),
            _ => None,
        }
    }
}

/// A session bought at the counter
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub hours: f64,
    pub payment: f64,
}

impl Order {
    pub fn new(id: Uuid, hours: f64, pricing: &SessionPricing) -> Self {
        Self {
            id,
            hours,
            payment: hours * pricing.price_per_hour,
        }
    }

    /// The same order moved to a seat with its own hour bounds and price
    pub fn priced_for(&self, pricing: &SessionPricing) -> Self {
        let hours = self.hours.clamp(pricing.min_hours, pricing.max_hours);
        Self::new(self.id, hours, pricing)
    }
}

/// Food that was paid for and still has to be brought to the seat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodOrder {
    pub payment: f64,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveReason {
    SessionEnded,
    OrderCancelled,
    BreakdownTimeout,
    FireEvicted,
    FoodTimeout,
    SeatUnavailable,
    /// No path to the counter after every admission round
    Unreachable,
}

/// A walk that could not be started yet and is being retried
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingWalk {
    pub target: Vec3,
    pub state: AgentState,
}

#[derive(Debug)]
pub struct CustomerAgent {
    pub(crate) id: AgentId,
    pub(crate) state: AgentState,
    pub(crate) destination: Option<Vec3>,
    pub(crate) seat: Option<SeatId>,
    pub(crate) order: Option<Order>,
    pub(crate) errand: Option<ErrandToken>,
    pub(crate) returning_to_seat: bool,
    pub(crate) pending_food: Option<FoodOrder>,
    pub(crate) hookah: Option<SlotHandle>,
    pub(crate) voice: Option<VoiceSchedule>,
    pub(crate) seated_at: Option<SimTime>,
    pub(crate) leave_reason: Option<LeaveReason>,
    pub(crate) pending_walk: Option<PendingWalk>,
    pub(crate) last_sample: Option<Vec3>,
    pub(crate) watchdog_armed: bool,
    /// Door admissions whose retries all failed
    pub(crate) admission_rounds: u32,
    pub(crate) queue_ticket: u64,
    pub(crate) spawned_at: SimTime,
}

impl CustomerAgent {
    pub fn new(id: AgentId, queue_ticket: u64, spawned_at: SimTime) -> Self {
        Self {
            id,
            state: AgentState::WaitingAtDoor,
            destination: None,
            seat: None,
            order: None,
            errand: None,
            returning_to_seat: false,
            pending_food: None,
            hookah: None,
            voice: None,
            seated_at: None,
            leave_reason: None,
            pending_walk: None,
            last_sample: None,
            watchdog_armed: false,
            admission_rounds: 0,
            queue_ticket,
            spawned_at,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    pub fn seat(&self) -> Option<SeatId> {
        self.seat
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn has_ordered(&self) -> bool {
        self.order.is_some()
    }

    /// Errand the agent currently holds the slot for
    pub fn away_for(&self) -> Option<Errand> {
        self.errand.as_ref().map(|token| token.errand())
    }

    pub fn pending_food(&self) -> Option<&FoodOrder> {
        self.pending_food.as_ref()
    }

    pub fn has_hookah(&self) -> bool {
        self.hookah.is_some()
    }

    pub fn voice_schedule(&self) -> Option<&VoiceSchedule> {
        self.voice.as_ref()
    }

    pub fn leave_reason(&self) -> Option<LeaveReason> {
        self.leave_reason
    }

    /// True while a failed path request is being retried
    pub fn is_retrying_path(&self) -> bool {
        self.pending_walk.is_some()
    }

    pub fn spawned_at(&self) -> SimTime {
        self.spawned_at
    }

    /// Real milliseconds since the agent first sat down
    pub fn seated_for(&self, now: SimTime) -> Option<SimTime> {
        self.seated_at.map(|at| now.saturating_sub(at))
    }

    /// Switch state, returning the previous one
    pub(crate) fn set_state(&mut self, state: AgentState) -> AgentState {
        std::mem::replace(&mut self.state, state)
    }
}
