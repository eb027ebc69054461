// Load generator - Synthetic CPU work followed by a voluntary yield
//
// The burst of floating point work makes the thread compete for a core and
// the short sleep hands the core back. The resulting on/off pattern is what
// the voices turn into music, so neither half is an inefficiency to remove.

use super::clock::VoiceClock;
use rand::Rng;
use rand::rngs::StdRng;
use std::hint::black_box;
use std::time::Duration;

/// Busy-work bounds and the sleep between loop iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProfile {
    /// Fewest sin*cos iterations per burst
    pub busy_work_min: u32,
    /// Most sin*cos iterations per burst
    pub busy_work_max: u32,
    /// Sleep at the end of every loop iteration
    pub sleep: Duration,
}

impl LoadProfile {
    pub const DEFAULT_BUSY_WORK_MIN: u32 = 500;
    pub const DEFAULT_BUSY_WORK_MAX: u32 = 10_000;
    pub const DEFAULT_SLEEP_MS: u64 = 1;

    /// Bounds are swapped if given in the wrong order
    pub fn new(busy_work_min: u32, busy_work_max: u32, sleep: Duration) -> Self {
        Self {
            busy_work_min: busy_work_min.min(busy_work_max),
            busy_work_max: busy_work_max.max(busy_work_min),
            sleep,
        }
    }
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_BUSY_WORK_MIN,
            Self::DEFAULT_BUSY_WORK_MAX,
            Duration::from_millis(Self::DEFAULT_SLEEP_MS),
        )
    }
}

/// Per-voice load generator owning its random generator
pub struct LoadGenerator {
    profile: LoadProfile,
    rng: StdRng,
}

impl LoadGenerator {
    pub fn new(profile: LoadProfile, rng: StdRng) -> Self {
        Self { profile, rng }
    }

    pub fn profile(&self) -> &LoadProfile {
        &self.profile
    }

    /// Run a randomized burst of work the optimizer cannot drop
    ///
    /// Returns the number of iterations performed.
    pub fn burn(&mut self) -> u32 {
        let iterations = self
            .rng
            .gen_range(self.profile.busy_work_min..=self.profile.busy_work_max);

        let mut sum = 0.0f64;
        for i in 0..iterations {
            let x = black_box(i as f64);
            sum += x.sin() * x.cos();
        }
        black_box(sum);

        iterations
    }

    /// Hand the core back for the configured interval
    pub fn yield_now<C: VoiceClock + ?Sized>(&self, clock: &mut C) {
        clock.sleep(self.profile.sleep);
    }
}
