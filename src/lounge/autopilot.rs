use log::debug;

use super::agent::AgentState;
use super::navigation::Navigator;
use super::stock::StockKind;
use super::world::Lounge;
use crate::core::types::{SeatId, SimTime};

/// Scripted player that keeps a lounge running without input.
///
/// Every think interval it opens the doors, fights fires, repairs seats,
/// serves the counter and errands, rents hookahs and refills shelves.
#[derive(Debug, Clone)]
pub struct AutoPilot {
    think_interval: SimTime,
    next_think: SimTime,
    restock_below: u32,
    hookah_every: u64,
    actions: u64,
}

impl AutoPilot {
    pub fn new(think_interval: SimTime) -> Self {
        Self {
            think_interval,
            next_think: 0,
            restock_below: 3,
            hookah_every: 3,
            actions: 0,
        }
    }

    /// Refill a shelf once it holds fewer than `units` items
    pub fn with_restock_below(mut self, units: u32) -> Self {
        self.restock_below = units;
        self
    }

    /// Offer a hookah to every n-th customer; 0 disables hookahs
    pub fn with_hookah_every(mut self, n: u64) -> Self {
        self.hookah_every = n;
        self
    }

    pub fn actions_taken(&self) -> u64 {
        self.actions
    }

    /// Act if the think interval has passed, returns the number of
    /// successful actions
    pub fn drive<N: Navigator>(&mut self, lounge: &mut Lounge<N>) -> usize {
        if lounge.now() < self.next_think {
            return 0;
        }
        self.next_think = lounge.now() + self.think_interval;

        let taken = self.open_doors(lounge)
            + self.fight_fires(lounge)
            + self.repair_seats(lounge)
            + self.serve_counter(lounge)
            + self.serve_drinks(lounge)
            + self.serve_food(lounge)
            + self.rent_hookahs(lounge)
            + self.restock(lounge);
        self.actions += taken as u64;
        taken
    }

    fn open_doors<N: Navigator>(&self, lounge: &mut Lounge<N>) -> usize {
        (0..lounge.door_count())
            .filter(|door| lounge.door_open(*door) == Some(false))
            .collect::<Vec<_>>()
            .into_iter()
            .filter(|door| lounge.open_door(*door).is_ok())
            .count()
    }

    fn fight_fires<N: Navigator>(&self, lounge: &mut Lounge<N>) -> usize {
        let burning: Vec<SeatId> = lounge
            .seats()
            .iter()
            .filter(|seat| seat.is_on_fire())
            .map(|seat| seat.id())
            .collect();
        burning
            .into_iter()
            .filter(|seat| lounge.extinguish_hit(*seat).is_ok())
            .count()
    }

    fn repair_seats<N: Navigator>(&self, lounge: &mut Lounge<N>) -> usize {
        let damaged: Vec<SeatId> = lounge
            .seats()
            .iter()
            .filter(|seat| !seat.is_on_fire() && (seat.has_breakdown() || seat.is_broken()))
            .map(|seat| seat.id())
            .collect();
        damaged
            .into_iter()
            .filter(|seat| lounge.repair_seat(*seat).is_ok())
            .count()
    }

    fn serve_counter<N: Navigator>(&self, lounge: &mut Lounge<N>) -> usize {
        let mut taken = 0;
        for id in lounge.agents_in(AgentState::WaitingAtCounter) {
            let Some(agent) = lounge.agent(id) else {
                continue;
            };
            if agent.seat().is_some() {
                continue;
            }
            if !agent.has_ordered() {
                if lounge.accept_order(id).is_ok() {
                    taken += 1;
                }
                continue;
            }
            let free = lounge
                .seats()
                .iter()
                .find(|seat| seat.is_available())
                .map(|seat| seat.id());
            match free {
                Some(seat) => {
                    if lounge.assign_seat(id, seat).is_ok() {
                        taken += 1;
                    }
                }
                None => debug!("[AutoPilot] No free seat for agent {}", id),
            }
        }
        taken
    }

    /// Get an item of `kind` into the player's hands, buying stock if needed
    fn hold<N: Navigator>(&self, lounge: &mut Lounge<N>, kind: StockKind) -> bool {
        match lounge.holding() {
            Some(held) if held == kind => return true,
            Some(_) => {
                if lounge.put_back_item().is_err() {
                    return false;
                }
            }
            None => {}
        }
        if lounge.stock(kind).is_empty() {
            let missing = lounge.stock(kind).missing();
            if let Err(err) = lounge.buy_stock(kind, missing) {
                debug!("[AutoPilot] Cannot restock {}: {}", kind, err);
                return false;
            }
        }
        lounge.take_item(kind).is_ok()
    }

    fn serve_drinks<N: Navigator>(&self, lounge: &mut Lounge<N>) -> usize {
        let mut taken = 0;
        for id in lounge.agents_in(AgentState::WaitingForDrink) {
            if self.hold(lounge, StockKind::Drink) && lounge.deliver_drink(id).is_ok() {
                taken += 1;
            }
        }
        taken
    }

    fn serve_food<N: Navigator>(&self, lounge: &mut Lounge<N>) -> usize {
        let mut taken = 0;
        for id in lounge.agents_in(AgentState::WaitingForFood) {
            if lounge.accept_food_order(id).is_ok() {
                taken += 1;
            }
        }

        let hungry: Vec<_> = lounge
            .agents()
            .filter(|agent| agent.pending_food().is_some() && agent.state().may_hold_seat())
            .map(|agent| agent.id())
            .collect();
        for id in hungry {
            if self.hold(lounge, StockKind::Food) && lounge.deliver_food(id).is_ok() {
                taken += 1;
            }
        }
        taken
    }

    fn rent_hookahs<N: Navigator>(&self, lounge: &mut Lounge<N>) -> usize {
        if self.hookah_every == 0 {
            return 0;
        }
        let wanting: Vec<_> = lounge
            .agents()
            .filter(|agent| agent.state() == AgentState::SittingAtSeat && !agent.has_hookah())
            .filter(|agent| agent.id().0 % self.hookah_every == 0)
            .map(|agent| agent.id())
            .collect();

        let mut taken = 0;
        for id in wanting {
            if lounge.stock(StockKind::Hookah).is_empty() && lounge.holding() != Some(StockKind::Hookah) {
                break;
            }
            if self.hold(lounge, StockKind::Hookah) && lounge.serve_hookah(id).is_ok() {
                taken += 1;
            }
        }
        taken
    }

    fn restock<N: Navigator>(&self, lounge: &mut Lounge<N>) -> usize {
        let mut taken = 0;
        for kind in [StockKind::Drink, StockKind::Food] {
            if lounge.stock(kind).count() >= self.restock_below {
                continue;
            }
            let missing = lounge.stock(kind).missing();
            if lounge.buy_stock(kind, missing).is_ok() {
                taken += 1;
            }
        }
        if let Some(kind) = lounge.holding() {
            if lounge.put_back_item().is_ok() {
                debug!("[AutoPilot] Put back an unused {}", kind);
            }
        }
        taken
    }
}
