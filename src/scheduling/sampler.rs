// Scheduling Sampler - Infers from its own clocks whether a thread is running
//
// ratio = cpu_delta / wall_delta over the interval since the previous sample.
// A descheduled thread shows almost no CPU time for the wall time that passed.

/// CPU/wall ratio above which a thread counts as scheduled
pub const DEFAULT_SCHEDULE_THRESHOLD: f64 = 0.001;

/// CPU time per unit of wall time; 0 when no wall time passed
pub fn scheduling_ratio(cpu_delta: f64, wall_delta: f64) -> f64 {
    if wall_delta > 0.0 {
        cpu_delta / wall_delta
    } else {
        0.0
    }
}

/// Pure classification of one interval
pub fn is_scheduled(cpu_delta: f64, wall_delta: f64, threshold: f64) -> bool {
    scheduling_ratio(cpu_delta, wall_delta) > threshold
}

/// Result of one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulingSample {
    pub ratio: f64,
    pub scheduled: bool,
}

/// Per-thread sampler remembering the previous reading
///
/// Statistics are kept for the voice report, in the same spirit as a CPU
/// load monitor: the share of samples that read as scheduled.
#[derive(Debug, Clone)]
pub struct SchedulingSampler {
    threshold: f64,
    last_wall: f64,
    last_cpu: f64,
    samples: u64,
    scheduled_samples: u64,
}

impl SchedulingSampler {
    /// Create a sampler whose first interval starts at (`wall`, `cpu`)
    pub fn new(threshold: f64, wall: f64, cpu: f64) -> Self {
        Self {
            threshold,
            last_wall: wall,
            last_cpu: cpu,
            samples: 0,
            scheduled_samples: 0,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify the interval since the previous sample and start a new one
    pub fn sample(&mut self, wall: f64, cpu: f64) -> SchedulingSample {
        let ratio = scheduling_ratio(cpu - self.last_cpu, wall - self.last_wall);
        let scheduled = ratio > self.threshold;

        self.last_wall = wall;
        self.last_cpu = cpu;
        self.samples += 1;
        if scheduled {
            self.scheduled_samples += 1;
        }

        SchedulingSample { ratio, scheduled }
    }

    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    /// Fraction of samples that read as scheduled (0.0 before any sample)
    pub fn scheduled_share(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.scheduled_samples as f64 / self.samples as f64
    }
}
