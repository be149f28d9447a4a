use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::collections::VecDeque;

use super::config::VoiceConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceCue {
    /// Billed session hours after which the line plays
    pub at_hours: f64,
    pub variant: usize,
}

/// Voice lines an agent will say during one session, in firing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceSchedule {
    cues: VecDeque<VoiceCue>,
}

impl VoiceSchedule {
    /// Spread `lines_per_session` lines uniformly over a session of `session_hours`
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, session_hours: f64, config: &VoiceConfig) -> Self {
        if config.lines_per_session == 0 || config.variants == 0 || session_hours <= 0.0 {
            return Self::default();
        }

        let offsets = Uniform::new(0.0, session_hours);
        let variants = Uniform::new(0, config.variants);
        let mut cues: Vec<VoiceCue> = (0..config.lines_per_session)
            .map(|_| VoiceCue {
                at_hours: offsets.sample(rng),
                variant: variants.sample(rng),
            })
            .collect();
        cues.sort_by(|a, b| a.at_hours.total_cmp(&b.at_hours));

        Self { cues: cues.into() }
    }

    /// Pop every cue due once `billed_hours` of the session have passed
    pub fn due(&mut self, billed_hours: f64) -> Vec<VoiceCue> {
        let mut fired = Vec::new();
        while let Some(cue) = self.cues.front() {
            if cue.at_hours > billed_hours {
                break;
            }
            if let Some(cue) = self.cues.pop_front() {
                fired.push(cue);
            }
        }
        fired
    }

    pub fn remaining(&self) -> usize {
        self.cues.len()
    }
}
