use crate::core::types::{AgentId, SeatId};

/// Timers of the lounge, delivered through the event scheduler.
///
/// Timers that can be overtaken by player actions carry an epoch; a timer
/// whose epoch no longer matches is dropped when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoungeEvent {
    SpawnDue,
    /// Sample a walking agent's position for the stuck watchdog
    StuckCheck(AgentId),
    /// Re-attempt a path request that failed; `attempt` indexes the retry delays
    NavRetry { agent: AgentId, attempt: usize },
    WantRoll(AgentId),
    RepairDeadline { seat: SeatId, epoch: u64 },
    FoodDeadline { agent: AgentId, epoch: u64 },
}
