// Phase Clock - Splits a run into musical phases on the tick grid
// Melodic voices round phases to whole bars, percussion divides the raw tick count

use super::timeline::MusicalGrid;

/// How a phase length is derived from the requested duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhasePolicy {
    /// `total_ticks / phase_count`, used by the percussion voice
    Unaligned,
    /// Rounded to whole bars (at least one), used by melodic voices
    BarAligned,
}

/// Maps ticks to phase indices for one voice
///
/// The clock is computed once before a voice starts and never changes, so
/// every voice holding an equal clock agrees on where phases begin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseClock {
    policy: PhasePolicy,
    phase_count: usize,
    ticks_per_phase: u64,
    total_ticks: u64,
    duration_seconds: f64,
}

impl PhaseClock {
    /// Build a clock for `duration_seconds` split into `phase_count` phases
    ///
    /// A zero phase count is treated as one phase.
    pub fn new(
        grid: &MusicalGrid,
        duration_seconds: f64,
        phase_count: usize,
        policy: PhasePolicy,
    ) -> Self {
        let phase_count = phase_count.max(1);
        let nominal_ticks = grid.seconds_to_ticks(duration_seconds);

        match policy {
            PhasePolicy::Unaligned => {
                let mut ticks_per_phase = nominal_ticks / phase_count as u64;
                if duration_seconds > 0.0 && ticks_per_phase == 0 {
                    ticks_per_phase = 1;
                }
                Self {
                    policy,
                    phase_count,
                    ticks_per_phase,
                    total_ticks: nominal_ticks,
                    duration_seconds: duration_seconds.max(0.0),
                }
            }
            PhasePolicy::BarAligned => {
                let ticks_per_bar = grid.ticks_per_bar();
                let ideal = (duration_seconds.max(0.0) * grid.ticks_per_second())
                    / phase_count as f64;

                let ticks_per_phase = if ticks_per_bar > 0 && ideal > 0.0 {
                    let bars = (ideal / ticks_per_bar as f64).round() as u64;
                    bars.max(1) * ticks_per_bar
                } else {
                    ideal as u64
                };

                let total_ticks = ticks_per_phase * phase_count as u64;
                Self {
                    policy,
                    phase_count,
                    ticks_per_phase,
                    total_ticks,
                    duration_seconds: grid.ticks_to_seconds(total_ticks),
                }
            }
        }
    }

    pub fn policy(&self) -> PhasePolicy {
        self.policy
    }

    pub fn phase_count(&self) -> usize {
        self.phase_count
    }

    pub fn ticks_per_phase(&self) -> u64 {
        self.ticks_per_phase
    }

    /// Last tick of the run under this policy
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Wall-clock length the voice runs for (bar-aligned clocks may differ
    /// from the requested duration)
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Phase containing `tick`, clamped to the last phase
    pub fn phase_at(&self, tick: u64) -> usize {
        if self.ticks_per_phase == 0 {
            return 0;
        }
        let phase = tick / self.ticks_per_phase;
        phase.min(self.phase_count as u64 - 1) as usize
    }

    /// First tick of `phase`
    pub fn phase_start(&self, phase: usize) -> u64 {
        phase as u64 * self.ticks_per_phase
    }

    /// Boundary tick where `phase` hands over to the next one
    pub fn phase_end(&self, phase: usize) -> u64 {
        (phase as u64 + 1) * self.ticks_per_phase
    }

    /// Ticks by which this clock's run outlasts `other`'s (negative if shorter)
    pub fn drift_from(&self, other: &PhaseClock) -> i64 {
        self.total_ticks as i64 - other.total_ticks as i64
    }
}

/// Marker label written at the start of a phase (1-based for humans)
pub fn phase_label(phase: usize) -> String {
    format!("Phase {}", phase + 1)
}
