use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::config::SpawnerConfig;
use crate::core::types::{secs_to_millis, SimTime};

/// Rate-limited, queue-bounded creation of customers
#[derive(Debug, Clone)]
pub struct Spawner {
    config: SpawnerConfig,
    next_due: SimTime,
    attempts: u64,
    admitted: u64,
}

impl Spawner {
    pub fn new(config: SpawnerConfig) -> Self {
        let next_due = secs_to_millis(config.first_spawn_secs);
        Self {
            config,
            next_due,
            attempts: 0,
            admitted: 0,
        }
    }

    pub fn next_due(&self) -> SimTime {
        self.next_due
    }

    pub fn queue_cap(&self) -> usize {
        self.config.queue_cap
    }

    /// Spawn attempts made so far, including refused ones
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    /// Number of agents to create now given `queue_len` agents already
    /// queueing. Zero once the queue is at its cap; otherwise a random batch
    /// trimmed to the room left.
    pub fn batch_size<R: Rng + ?Sized>(&mut self, rng: &mut R, queue_len: usize) -> usize {
        self.attempts += 1;
        if queue_len >= self.config.queue_cap {
            debug!(
                "[Spawner] Queue full ({}/{}), nobody admitted",
                queue_len, self.config.queue_cap
            );
            return 0;
        }

        let room = self.config.queue_cap - queue_len;
        let batch = Uniform::new_inclusive(self.config.min_batch, self.config.max_batch)
            .sample(rng)
            .min(room);
        self.admitted += batch as u64;
        batch
    }

    /// Jittered delay until the next attempt, never below the minimum interval
    pub fn next_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> SimTime {
        let mean = self.config.interval_secs;
        let secs = Normal::new(mean, self.config.jitter_secs)
            .map(|jitter| jitter.sample(rng))
            .unwrap_or(mean);
        secs_to_millis(secs.max(self.config.min_interval_secs))
    }

    /// Schedule the next attempt after `now`, returns its due time
    pub fn reschedule<R: Rng + ?Sized>(&mut self, now: SimTime, rng: &mut R) -> SimTime {
        self.next_due = now + self.next_interval(rng);
        self.next_due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spawner(queue_cap: usize) -> Spawner {
        Spawner::new(SpawnerConfig {
            queue_cap,
            ..SpawnerConfig::default()
        })
    }

    #[test]
    fn test_first_attempt_after_initial_delay() {
        assert_eq!(spawner(6).next_due(), 2000);
    }

    #[test]
    fn test_full_queue_admits_nobody() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut spawner = spawner(6);

        assert_eq!(spawner.batch_size(&mut rng, 6), 0);
        assert_eq!(spawner.batch_size(&mut rng, 9), 0);
        assert_eq!(spawner.attempts(), 2);
        assert_eq!(spawner.admitted(), 0);
    }

    #[test]
    fn test_one_free_place_admits_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut spawner = spawner(6);
        for _ in 0..20 {
            assert_eq!(spawner.batch_size(&mut rng, 5), 1);
        }
    }

    #[test]
    fn test_batch_within_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut spawner = spawner(6);
        let mut seen = [false; 3];
        for _ in 0..100 {
            let batch = spawner.batch_size(&mut rng, 0);
            assert!((1..=2).contains(&batch));
            seen[batch] = true;
        }
        assert!(seen[1] && seen[2]);
    }

    #[test]
    fn test_reschedule_respects_min_interval() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut spawner = Spawner::new(SpawnerConfig {
            interval_secs: 6.0,
            jitter_secs: 20.0,
            min_interval_secs: 5.0,
            ..SpawnerConfig::default()
        });

        let mut now = 0;
        for _ in 0..200 {
            let due = spawner.reschedule(now, &mut rng);
            assert!(due - now >= 5000);
            now = due;
        }
    }

    #[test]
    fn test_no_jitter_is_exact() {
        let mut rng = StdRng::seed_from_u64(2);
        let spawner = Spawner::new(SpawnerConfig {
            jitter_secs: 0.0,
            ..SpawnerConfig::default()
        });
        assert_eq!(spawner.next_interval(&mut rng), 25_000);
    }
}
