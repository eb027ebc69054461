// Drum Sequencer - Grid-quantized percussion for the single drum voice
//
// The drum voice ignores scheduling and simply follows its wall clock across
// the 16th-note grid. Steps passed over while the thread was asleep are
// played late, each on its own grid tick.

use super::pattern::{CRASH_VELOCITY, DrumPattern, drum_key};
use super::phase::{PhaseClock, PhasePolicy, phase_label};
use super::timeline::{MusicalGrid, STEPS_PER_BAR};
use super::voice::{StepSequencer, VoiceStep};
use crate::midi::event::TimelineEvent;

/// General MIDI percussion channel (channel 10, zero-based)
pub const DRUM_CHANNEL: u8 = 9;

/// Marker written where the drum voice stops
pub const ORIGINAL_END_LABEL: &str = "Original End";

/// Step sequencer on the unaligned (nominal) phase clock
#[derive(Debug, Clone)]
pub struct DrumSequencer {
    track: usize,
    grid: MusicalGrid,
    clock: PhaseClock,
    patterns: Vec<DrumPattern>,
    phase: Option<usize>,
    /// Absolute index of the last step played
    last_step: Option<u64>,
    last_tick: u64,
    finished: bool,
}

impl DrumSequencer {
    /// `patterns[p]` is played during phase `p` (indices wrap)
    pub fn new(
        track: usize,
        grid: MusicalGrid,
        duration_seconds: f64,
        phase_count: usize,
        patterns: Vec<DrumPattern>,
    ) -> Self {
        let clock = PhaseClock::new(&grid, duration_seconds, phase_count, PhasePolicy::Unaligned);
        Self {
            track,
            grid,
            clock,
            patterns,
            phase: None,
            last_step: None,
            last_tick: 0,
            finished: false,
        }
    }

    pub fn clock(&self) -> &PhaseClock {
        &self.clock
    }

    /// Absolute index of the last step played, if any
    pub fn last_step(&self) -> Option<u64> {
        self.last_step
    }

    /// Marker and crash for every phase entered up to the one holding `tick`
    fn advance_phase(&mut self, tick: u64, out: &mut Vec<TimelineEvent>) {
        let phase = self.clock.phase_at(tick);
        let first = match self.phase {
            None => 0,
            Some(current) if phase > current => current + 1,
            Some(_) => return,
        };

        // One step long, and always released before the next phase's crash
        let crash_length = self
            .grid
            .ticks_per_step()
            .min(self.clock.ticks_per_phase().saturating_sub(1))
            .max(1);

        for entered in first..=phase {
            let boundary = self.clock.phase_start(entered);
            log::debug!(
                "Drums entering {} at {} (tick {})",
                phase_label(entered),
                self.grid.musical_time(boundary),
                boundary
            );

            out.push(TimelineEvent::marker(self.track, boundary, phase_label(entered)));
            out.push(TimelineEvent::note_on(
                self.track,
                boundary,
                DRUM_CHANNEL,
                drum_key::CRASH,
                CRASH_VELOCITY,
            ));
            out.push(TimelineEvent::note_off(
                self.track,
                boundary + crash_length,
                DRUM_CHANNEL,
                drum_key::CRASH,
            ));
        }

        self.phase = Some(phase);
    }

    /// Emit the hits of absolute step `step`
    fn play_step(&self, step: u64, out: &mut Vec<TimelineEvent>) {
        if self.patterns.is_empty() {
            return;
        }

        let ticks_per_step = self.grid.ticks_per_step();
        let step_tick = self.grid.step_start(step);
        let phase = self.clock.phase_at(step_tick);
        let pattern = &self.patterns[phase % self.patterns.len()];
        let position = (step % STEPS_PER_BAR) as usize;
        let release = step_tick + ticks_per_step.saturating_sub(1).max(1);

        for hit in pattern.hits_at(position) {
            out.push(TimelineEvent::note_on(
                self.track,
                step_tick,
                DRUM_CHANNEL,
                hit.key,
                hit.velocity,
            ));
            out.push(TimelineEvent::note_off(self.track, release, DRUM_CHANNEL, hit.key));
        }
    }
}

impl StepSequencer for DrumSequencer {
    fn step(
        &mut self,
        now_seconds: f64,
        _scheduled: bool,
        out: &mut Vec<TimelineEvent>,
    ) -> VoiceStep {
        if self.finished || now_seconds >= self.clock.duration_seconds() {
            return VoiceStep::Finished;
        }

        let tick = self.grid.seconds_to_ticks(now_seconds);
        self.last_tick = tick;
        self.advance_phase(tick, out);

        let current = self.grid.step_index(tick);
        let first = self.last_step.map_or(0, |last| last + 1);
        if first <= current {
            for step in first..=current {
                self.play_step(step, out);
            }
            self.last_step = Some(current);
        }

        VoiceStep::Continue
    }

    fn finish(&mut self, out: &mut Vec<TimelineEvent>) {
        if self.finished {
            return;
        }
        self.finished = true;

        let end_tick = self.last_tick.max(self.clock.total_ticks());
        out.push(TimelineEvent::marker(self.track, end_tick, ORIGINAL_END_LABEL));
    }

    fn track(&self) -> usize {
        self.track
    }

    fn phase(&self) -> usize {
        self.phase.unwrap_or(0)
    }

    fn duration_seconds(&self) -> f64 {
        self.clock.duration_seconds()
    }
}
