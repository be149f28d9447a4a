//! Player operations on a lounge.
//!
//! Every action checks its preconditions first and leaves the lounge
//! untouched when it is refused.

use log::{debug, info};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::agent::{AgentState, CustomerAgent, FoodOrder, LeaveReason, Order};
use super::events::LoungeEvent;
use super::navigation::Navigator;
use super::presentation::SoundCue;
use super::seat::RepairOutcome;
use super::stock::{SlotHandle, StockKind};
use super::world::Lounge;
use crate::core::types::{secs_to_millis, AgentId, SeatId};

#[derive(Debug, Clone, PartialEq)]
pub enum ActionError {
    UnknownAgent(AgentId),
    UnknownSeat(SeatId),
    UnknownDoor(usize),
    WrongState { agent: AgentId, state: AgentState },
    AlreadyOrdered(AgentId),
    NotOrdered(AgentId),
    SeatUnavailable(SeatId),
    HandsFull,
    HandsEmpty,
    WrongItem { needed: StockKind, held: Option<StockKind> },
    OutOfStock(StockKind),
    ShelfFull(StockKind),
    InsufficientFunds { needed: f64, available: f64 },
    NoFoodPending(AgentId),
    AlreadyHasHookah(AgentId),
    NothingToRepair(SeatId),
    SeatOnFire(SeatId),
    NotOnFire(SeatId),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::UnknownAgent(agent) => write!(f, "Unknown agent {}", agent),
            ActionError::UnknownSeat(seat) => write!(f, "Unknown seat {}", seat),
            ActionError::UnknownDoor(door) => write!(f, "Unknown door {}", door),
            ActionError::WrongState { agent, state } => {
                write!(f, "Agent {} cannot do that while {:?}", agent, state)
            }
            ActionError::AlreadyOrdered(agent) => write!(f, "Agent {} has already ordered", agent),
            ActionError::NotOrdered(agent) => write!(f, "Agent {} has not ordered yet", agent),
            ActionError::SeatUnavailable(seat) => write!(f, "Seat {} is not available", seat),
            ActionError::HandsFull => write!(f, "Already holding an item"),
            ActionError::HandsEmpty => write!(f, "Not holding anything"),
            ActionError::WrongItem { needed, held } => match held {
                Some(held) => write!(f, "Need a {} but holding a {}", needed, held),
                None => write!(f, "Need a {} but holding nothing", needed),
            },
            ActionError::OutOfStock(kind) => write!(f, "Out of {} stock", kind),
            ActionError::ShelfFull(kind) => write!(f, "The {} shelf is already full", kind),
            ActionError::InsufficientFunds { needed, available } => {
                write!(f, "Need {:.2} but only {:.2} available", needed, available)
            }
            ActionError::NoFoodPending(agent) => write!(f, "Agent {} is not waiting for food", agent),
            ActionError::AlreadyHasHookah(agent) => write!(f, "Agent {} already has a hookah", agent),
            ActionError::NothingToRepair(seat) => write!(f, "Seat {} does not need repair", seat),
            ActionError::SeatOnFire(seat) => write!(f, "Seat {} is on fire", seat),
            ActionError::NotOnFire(seat) => write!(f, "Seat {} is not on fire", seat),
        }
    }
}

impl std::error::Error for ActionError {}

impl<N: Navigator> Lounge<N> {
    pub fn open_door(&mut self, door: usize) -> Result<(), ActionError> {
        let open = self.doors.get_mut(door).ok_or(ActionError::UnknownDoor(door))?;
        if !*open {
            *open = true;
            info!("[Door {}] Opened", door);
            self.play(SoundCue::DoorOpened(door));
        }
        Ok(())
    }

    pub fn close_door(&mut self, door: usize) -> Result<(), ActionError> {
        let open = self.doors.get_mut(door).ok_or(ActionError::UnknownDoor(door))?;
        if *open {
            *open = false;
            info!("[Door {}] Closed", door);
        }
        Ok(())
    }

    fn agent_in(&self, id: AgentId, allowed: &[AgentState]) -> Result<&CustomerAgent, ActionError> {
        let agent = self.agents.get(&id).ok_or(ActionError::UnknownAgent(id))?;
        if !allowed.contains(&agent.state) {
            return Err(ActionError::WrongState {
                agent: id,
                state: agent.state,
            });
        }
        Ok(agent)
    }

    /// Take the order of a customer waiting at the counter. The session
    /// length is drawn from the lounge pricing; nothing is paid until the
    /// customer sits down.
    pub fn accept_order(&mut self, id: AgentId) -> Result<Order, ActionError> {
        let agent = self.agent_in(id, &[AgentState::WaitingAtCounter])?;
        if agent.has_ordered() {
            return Err(ActionError::AlreadyOrdered(id));
        }

        let pricing = self.config.pricing;
        let hours = Uniform::new_inclusive(pricing.min_hours, pricing.max_hours).sample(&mut self.rng);
        let order_id = uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid();
        let order = Order::new(order_id, hours, &pricing);

        info!(
            "[Agent {}] Ordered {:.2}h for {:.2} ({})",
            id, order.hours, order.payment, order.id
        );
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.order = Some(order.clone());
        }
        Ok(order)
    }

    /// Turn a customer away before they are seated; nothing is charged
    pub fn cancel_order(&mut self, id: AgentId) -> Result<(), ActionError> {
        let agent = self.agent_in(
            id,
            &[
                AgentState::WaitingAtDoor,
                AgentState::WalkingToCounter,
                AgentState::WaitingAtCounter,
                AgentState::WalkingToSeat,
            ],
        )?;
        if agent.returning_to_seat {
            return Err(ActionError::WrongState {
                agent: id,
                state: agent.state,
            });
        }

        if let Some(agent) = self.agents.get_mut(&id) {
            agent.order = None;
        }
        self.stats.orders_cancelled += 1;
        self.begin_leaving(id, LeaveReason::OrderCancelled);
        Ok(())
    }

    /// Reserve a seat for a customer who has ordered and send them to it.
    /// The order is moved onto the seat's own pricing.
    pub fn assign_seat(&mut self, id: AgentId, seat_id: SeatId) -> Result<(), ActionError> {
        let agent = self.agent_in(id, &[AgentState::WaitingAtCounter])?;
        let order = agent.order.clone().ok_or(ActionError::NotOrdered(id))?;
        if agent.seat.is_some() {
            return Err(ActionError::WrongState {
                agent: id,
                state: agent.state,
            });
        }

        let seat = self
            .seats
            .get_mut(seat_id.0)
            .ok_or(ActionError::UnknownSeat(seat_id))?;
        let chair = seat.chair().ok_or(ActionError::SeatUnavailable(seat_id))?;
        let pricing = *seat.pricing();
        if !seat.reserve(id) {
            return Err(ActionError::SeatUnavailable(seat_id));
        }

        let order = order.priced_for(&pricing);
        info!(
            "[Agent {}] Assigned seat {} for {:.2}h at {:.2}",
            id, seat_id, order.hours, order.payment
        );
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.seat = Some(seat_id);
            agent.order = Some(order);
        }
        self.seat_changed(seat_id);
        self.walk(id, chair, AgentState::WalkingToSeat);
        self.compact_queue();
        Ok(())
    }

    /// Pick one item off a shelf into the player's hands
    pub fn take_item(&mut self, kind: StockKind) -> Result<SlotHandle, ActionError> {
        let holding = self.holding.is_some();
        let handle = self.stock_mut(kind).take(holding).ok_or(if holding {
            ActionError::HandsFull
        } else {
            ActionError::OutOfStock(kind)
        })?;
        debug!("[Player] Took a {} from slot {}", kind, handle.index);
        self.holding = Some(handle);
        Ok(handle)
    }

    /// Put the held item back on its shelf
    pub fn put_back_item(&mut self) -> Result<StockKind, ActionError> {
        let handle = self.holding.take().ok_or(ActionError::HandsEmpty)?;
        self.stock_mut(handle.kind).give_back();
        debug!("[Player] Put back a {}", handle.kind);
        Ok(handle.kind)
    }

    /// Hand over the held item, which must be of `kind`
    fn hand_over(&mut self, kind: StockKind) -> Result<SlotHandle, ActionError> {
        match self.holding {
            Some(handle) if handle.kind == kind => {
                self.holding = None;
                Ok(handle)
            }
            held => Err(ActionError::WrongItem {
                needed: kind,
                held: held.map(|handle| handle.kind),
            }),
        }
    }

    pub fn deliver_drink(&mut self, id: AgentId) -> Result<(), ActionError> {
        self.agent_in(id, &[AgentState::WaitingForDrink])?;
        self.hand_over(StockKind::Drink)?;

        let price = self.config.stock.drinks.sale_price;
        self.credit(price);
        self.stats.drinks_served += 1;
        info!("[Agent {}] Got a drink", id);

        self.finish_errand(id);
        self.return_to_seat(id);
        Ok(())
    }

    /// Take a food order at the counter: it is paid now and must be brought
    /// to the seat before the delivery timeout.
    pub fn accept_food_order(&mut self, id: AgentId) -> Result<(), ActionError> {
        self.agent_in(id, &[AgentState::WaitingForFood])?;

        let payment = self.config.stock.food.sale_price;
        self.food_epoch += 1;
        let epoch = self.food_epoch;
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.pending_food = Some(FoodOrder { payment, epoch });
        }
        self.credit(payment);
        self.stats.food_ordered += 1;

        let timeout = secs_to_millis(self.config.incidents.food_delivery_timeout_secs);
        self.scheduler
            .schedule_in(LoungeEvent::FoodDeadline { agent: id, epoch }, self.now, timeout);
        info!("[Agent {}] Ordered food for {:.2}", id, payment);

        self.finish_errand(id);
        self.return_to_seat(id);
        Ok(())
    }

    pub fn decline_food_order(&mut self, id: AgentId) -> Result<(), ActionError> {
        self.agent_in(id, &[AgentState::WaitingForFood])?;
        info!("[Agent {}] Food order declined", id);
        self.finish_errand(id);
        self.return_to_seat(id);
        Ok(())
    }

    /// Bring ordered food to a customer
    pub fn deliver_food(&mut self, id: AgentId) -> Result<(), ActionError> {
        let agent = self.agents.get(&id).ok_or(ActionError::UnknownAgent(id))?;
        if agent.pending_food.is_none() {
            return Err(ActionError::NoFoodPending(id));
        }
        if !agent.state.may_hold_seat() {
            return Err(ActionError::WrongState {
                agent: id,
                state: agent.state,
            });
        }
        self.hand_over(StockKind::Food)?;

        if let Some(agent) = self.agents.get_mut(&id) {
            agent.pending_food = None;
        }
        self.stats.food_served += 1;
        info!("[Agent {}] Food delivered", id);
        Ok(())
    }

    /// Rent the held hookah to a seated customer until they leave
    pub fn serve_hookah(&mut self, id: AgentId) -> Result<(), ActionError> {
        let agent = self.agent_in(id, &[AgentState::SittingAtSeat])?;
        if agent.has_hookah() {
            return Err(ActionError::AlreadyHasHookah(id));
        }
        let handle = self.hand_over(StockKind::Hookah)?;

        if let Some(agent) = self.agents.get_mut(&id) {
            agent.hookah = Some(handle);
        }
        let price = self.config.stock.hookah.sale_price;
        self.credit(price);
        self.stats.hookahs_served += 1;
        info!("[Agent {}] Got a hookah", id);
        Ok(())
    }

    /// Fix a malfunctioning seat before its deadline, or restore a broken one
    pub fn repair_seat(&mut self, seat_id: SeatId) -> Result<RepairOutcome, ActionError> {
        let seat = self
            .seats
            .get_mut(seat_id.0)
            .ok_or(ActionError::UnknownSeat(seat_id))?;
        match seat.repair() {
            RepairOutcome::OnFire => Err(ActionError::SeatOnFire(seat_id)),
            RepairOutcome::NothingToRepair => Err(ActionError::NothingToRepair(seat_id)),
            outcome => {
                self.stats.repairs += 1;
                self.play(SoundCue::Repaired(seat_id));
                self.seat_changed(seat_id);
                Ok(outcome)
            }
        }
    }

    /// One hit with the extinguisher, returns the hits still needed
    pub fn extinguish_hit(&mut self, seat_id: SeatId) -> Result<u32, ActionError> {
        let required = self.config.incidents.extinguish_hits;
        let seat = self
            .seats
            .get_mut(seat_id.0)
            .ok_or(ActionError::UnknownSeat(seat_id))?;
        let remaining = seat
            .extinguish_hit(required)
            .ok_or(ActionError::NotOnFire(seat_id))?;

        if remaining == 0 {
            self.stats.fires_extinguished += 1;
            self.play(SoundCue::Extinguished(seat_id));
            self.seat_changed(seat_id);
        }
        Ok(remaining)
    }

    /// Buy up to `units` items for a shelf, returns the number bought
    pub fn buy_stock(&mut self, kind: StockKind, units: u32) -> Result<u32, ActionError> {
        let units = units.min(self.stock(kind).missing());
        if units == 0 {
            return Err(ActionError::ShelfFull(kind));
        }
        let cost = units as f64 * self.stock_spec(kind).unit_cost;
        if !self.balance.try_spend(cost) {
            return Err(ActionError::InsufficientFunds {
                needed: cost,
                available: self.balance.balance(),
            });
        }

        let added = self.stock_mut(kind).restock(units);
        self.stats.stock_spent += cost;
        self.balance_changed();
        info!("[Player] Bought {} {} for {:.2}", added, kind, cost);
        Ok(added)
    }

    /// Remove an agent immediately, releasing its seat, errand slot and
    /// hookah
    pub fn remove_agent(&mut self, id: AgentId) -> Result<(), ActionError> {
        if !self.agents.contains_key(&id) {
            return Err(ActionError::UnknownAgent(id));
        }
        self.despawn(id);
        Ok(())
    }
}
