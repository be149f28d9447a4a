use log::{debug, warn};

use crate::core::types::AgentId;

/// An errand that takes a customer away from their seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Errand {
    Drink,
    Food,
}

impl std::fmt::Display for Errand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Errand::Drink => write!(f, "drink"),
            Errand::Food => write!(f, "food"),
        }
    }
}

/// Proof that an agent holds the single slot for an errand.
///
/// Not `Clone`: the only way to free the slot is to hand the token back.
#[derive(Debug, PartialEq, Eq)]
pub struct ErrandToken {
    errand: Errand,
    holder: AgentId,
}

impl ErrandToken {
    pub fn errand(&self) -> Errand {
        self.errand
    }

    pub fn holder(&self) -> AgentId {
        self.holder
    }
}

/// Admission control for errands: one agent per errand at any time.
#[derive(Debug, Default)]
pub struct ErrandSlots {
    drink: Option<AgentId>,
    food: Option<AgentId>,
}

impl ErrandSlots {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, errand: Errand) -> &mut Option<AgentId> {
        match errand {
            Errand::Drink => &mut self.drink,
            Errand::Food => &mut self.food,
        }
    }

    pub fn holder(&self, errand: Errand) -> Option<AgentId> {
        match errand {
            Errand::Drink => self.drink,
            Errand::Food => self.food,
        }
    }

    pub fn is_free(&self, errand: Errand) -> bool {
        self.holder(errand).is_none()
    }

    pub fn try_acquire(&mut self, errand: Errand, agent: AgentId) -> Option<ErrandToken> {
        let slot = self.slot_mut(errand);
        if let Some(holder) = slot {
            debug!(
                "[Errands] Agent {} denied {} slot, held by agent {}",
                agent, errand, holder
            );
            return None;
        }
        *slot = Some(agent);
        Some(ErrandToken {
            errand,
            holder: agent,
        })
    }

    pub fn release(&mut self, token: ErrandToken) {
        let slot = self.slot_mut(token.errand);
        if *slot == Some(token.holder) {
            *slot = None;
        } else {
            warn!(
                "[Errands] Agent {} released a {} slot it no longer held",
                token.holder, token.errand
            );
        }
    }

    /// Free slots whose holder fails `alive`; returns the number freed
    pub fn release_orphans(&mut self, alive: impl Fn(AgentId) -> bool) -> usize {
        let mut freed = 0;
        for errand in [Errand::Drink, Errand::Food] {
            let slot = self.slot_mut(errand);
            if let Some(holder) = *slot {
                if !alive(holder) {
                    warn!("[Errands] Freed {} slot held by missing agent {}", errand, holder);
                    *slot = None;
                    freed += 1;
                }
            }
        }
        freed
    }
}
