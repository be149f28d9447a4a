use serde::{Deserialize, Serialize};

/// Simulation time in milliseconds since the simulation started.
pub type SimTime = u64;

/// Convert a duration in seconds into simulation milliseconds.
///
/// Negative and non-finite inputs map to zero.
pub fn secs_to_millis(secs: f32) -> SimTime {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs as f64 * 1000.0).round() as SimTime
}

/// Convert simulation milliseconds into seconds.
pub fn millis_to_secs(millis: SimTime) -> f32 {
    (millis as f64 / 1000.0) as f32
}

/// Identifier of a customer agent, unique for the lifetime of a lounge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a seat; the index of the seat in the lounge layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatId(pub usize);

impl std::fmt::Display for SeatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_millis() {
        assert_eq!(secs_to_millis(1.5), 1500);
        assert_eq!(secs_to_millis(0.0), 0);
        assert_eq!(secs_to_millis(-3.0), 0);
        assert_eq!(secs_to_millis(f32::NAN), 0);
    }

    #[test]
    fn test_millis_to_secs() {
        assert_eq!(millis_to_secs(2500), 2.5);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(AgentId(7).to_string(), "7");
        assert_eq!(SeatId(2).to_string(), "2");
    }
}
