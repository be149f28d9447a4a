//! Outputs of the simulation for a renderer and an audio player.

use glam::Vec3;
use log::{debug, info};
use std::cell::RefCell;
use std::rc::Rc;

use super::agent::AgentState;
use super::seat::SeatStatus;
use crate::core::types::{AgentId, SeatId};

/// Receives every state change a renderer needs to mirror.
///
/// All methods default to doing nothing so a sink only implements what it
/// draws.
pub trait PresentationSink {
    fn agent_spawned(&mut self, _agent: AgentId, _at: Vec3) {}
    fn agent_state_changed(&mut self, _agent: AgentId, _from: AgentState, _to: AgentState) {}
    fn agent_removed(&mut self, _agent: AgentId) {}
    fn seat_changed(&mut self, _seat: SeatId, _status: SeatStatus) {}
    fn balance_changed(&mut self, _balance: f64) {}
    /// Whole hour of the game clock, fired when it changes
    fn hour_changed(&mut self, _hour: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    VoiceLine { agent: AgentId, variant: usize },
    DoorOpened(usize),
    CashRegister,
    Breakdown(SeatId),
    Repaired(SeatId),
    FireAlarm(SeatId),
    Extinguished(SeatId),
}

pub trait AudioSink {
    fn play(&mut self, cue: SoundCue);
}

/// Writes presentation changes and sounds to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PresentationSink for LogSink {
    fn agent_spawned(&mut self, agent: AgentId, at: Vec3) {
        debug!("[View] Agent {} appears at {:?}", agent, at);
    }

    fn agent_state_changed(&mut self, agent: AgentId, from: AgentState, to: AgentState) {
        debug!("[View] Agent {}: {:?} -> {:?}", agent, from, to);
    }

    fn agent_removed(&mut self, agent: AgentId) {
        debug!("[View] Agent {} removed", agent);
    }

    fn seat_changed(&mut self, seat: SeatId, status: SeatStatus) {
        debug!("[View] Seat {} is now {:?}", seat, status);
    }

    fn hour_changed(&mut self, hour: u32) {
        info!("[Clock] {:02}:00", hour);
    }
}

impl AudioSink for LogSink {
    fn play(&mut self, cue: SoundCue) {
        debug!("[Audio] {:?}", cue);
    }
}

/// Everything a [`RecordingSink`] saw, in order
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    Spawned(AgentId),
    StateChanged(AgentId, AgentState, AgentState),
    Removed(AgentId),
    SeatChanged(SeatId, SeatStatus),
    Balance(f64),
    Hour(u32),
    Sound(SoundCue),
}

/// Sink that keeps a shared log of everything it receives, for replays and tests
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Rc<RefCell<Vec<PresentationEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<PresentationEvent> {
        self.log.borrow().clone()
    }

    pub fn sounds(&self) -> Vec<SoundCue> {
        self.log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                PresentationEvent::Sound(cue) => Some(*cue),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: PresentationEvent) {
        self.log.borrow_mut().push(event);
    }
}

impl PresentationSink for RecordingSink {
    fn agent_spawned(&mut self, agent: AgentId, _at: Vec3) {
        self.push(PresentationEvent::Spawned(agent));
    }

    fn agent_state_changed(&mut self, agent: AgentId, from: AgentState, to: AgentState) {
        self.push(PresentationEvent::StateChanged(agent, from, to));
    }

    fn agent_removed(&mut self, agent: AgentId) {
        self.push(PresentationEvent::Removed(agent));
    }

    fn seat_changed(&mut self, seat: SeatId, status: SeatStatus) {
        self.push(PresentationEvent::SeatChanged(seat, status));
    }

    fn balance_changed(&mut self, balance: f64) {
        self.push(PresentationEvent::Balance(balance));
    }

    fn hour_changed(&mut self, hour: u32) {
        self.push(PresentationEvent::Hour(hour));
    }
}

impl AudioSink for RecordingSink {
    fn play(&mut self, cue: SoundCue) {
        self.push(PresentationEvent::Sound(cue));
    }
}
