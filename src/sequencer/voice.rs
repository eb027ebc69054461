// Voice Sequencer - Melodic state machine driven by scheduling edges
//
// A melodic voice is silent until its thread is seen running, then plays its
// phase's snippet note by note for as long as the thread stays scheduled.
// Every decision is made on the tick derived from the voice's own wall clock.

use super::note::Snippet;
use super::phase::{PhaseClock, PhasePolicy, phase_label};
use super::timeline::MusicalGrid;
use crate::midi::event::TimelineEvent;

/// Marker written where a melodic voice stops
pub const ALIGNED_END_LABEL: &str = "Aligned End";

/// Whether a voice wants another iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStep {
    Continue,
    Finished,
}

/// One voice's per-iteration logic, independent of threads and clocks
///
/// The runner samples time and scheduling, calls `step` with the result and
/// appends whatever lands in `out` to the shared timeline.
pub trait StepSequencer: Send {
    /// Advance to `now_seconds` since the voice started
    fn step(&mut self, now_seconds: f64, scheduled: bool, out: &mut Vec<TimelineEvent>)
    -> VoiceStep;

    /// Close any sounding note and write the end marker
    ///
    /// Called once when the loop exits, whether the voice finished by itself
    /// or was stopped. Further calls do nothing.
    fn finish(&mut self, out: &mut Vec<TimelineEvent>);

    /// Track every event of this voice goes to
    fn track(&self) -> usize;

    /// Phase the voice is currently in (0 before the first step)
    fn phase(&self) -> usize;

    /// Wall-clock length this voice runs for
    fn duration_seconds(&self) -> f64;
}

/// The note a voice is holding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundingNote {
    pub pitch: u8,
    pub start: u64,
    pub duration: u64,
}

/// Thread-local state of a melodic voice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceState {
    /// `None` until the first step
    pub phase: Option<usize>,
    pub sounding: Option<SoundingNote>,
    /// Scheduling reading of the previous iteration
    pub was_scheduled: bool,
    pub last_tick: u64,
    /// Tick of the latest note-off; no note may start before it
    pub last_release: u64,
}

/// Melodic voice sequencer on a bar-aligned phase clock
#[derive(Debug, Clone)]
pub struct MelodicSequencer {
    track: usize,
    channel: u8,
    grid: MusicalGrid,
    clock: PhaseClock,
    snippets: Vec<Snippet>,
    state: VoiceState,
    finished: bool,
}

impl MelodicSequencer {
    /// `snippets[p]` is played during phase `p` (indices wrap)
    pub fn new(
        track: usize,
        channel: u8,
        grid: MusicalGrid,
        duration_seconds: f64,
        phase_count: usize,
        snippets: Vec<Snippet>,
    ) -> Self {
        assert!(channel <= 15, "MIDI channel must be 0-15");

        let clock = PhaseClock::new(&grid, duration_seconds, phase_count, PhasePolicy::BarAligned);
        Self {
            track,
            channel,
            grid,
            clock,
            snippets,
            state: VoiceState::default(),
            finished: false,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn clock(&self) -> &PhaseClock {
        &self.clock
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    pub fn is_sounding(&self) -> bool {
        self.state.sounding.is_some()
    }

    fn snippet_mut(&mut self, phase: usize) -> Option<&mut Snippet> {
        let len = self.snippets.len();
        if len == 0 {
            return None;
        }
        self.snippets.get_mut(phase % len)
    }

    /// Handle crossing into the phase containing `tick`
    fn advance_phase(&mut self, tick: u64, out: &mut Vec<TimelineEvent>) {
        let phase = self.clock.phase_at(tick);
        let first = match self.state.phase {
            None => 0,
            Some(current) if phase > current => current + 1,
            Some(_) => return,
        };

        let boundary = self.clock.phase_start(first);
        if let Some(note) = self.state.sounding {
            self.release_at(note.start.max(boundary), out);
        }
        // The new phase starts silent even if the thread keeps running
        self.state.was_scheduled = false;

        for crossed in first..=phase {
            let start = self.clock.phase_start(crossed);
            log::debug!(
                "Voice {} entering {} at {} (tick {})",
                self.track,
                phase_label(crossed),
                self.grid.musical_time(start),
                start
            );
            out.push(TimelineEvent::marker(self.track, start, phase_label(crossed)));
        }

        self.state.phase = Some(phase);
        if let Some(snippet) = self.snippet_mut(phase) {
            snippet.reset();
        }
    }

    /// End the sounding note at `tick`, never before one tick after its start
    fn release_at(&mut self, tick: u64, out: &mut Vec<TimelineEvent>) {
        if let Some(note) = self.state.sounding.take() {
            let end = tick.max(note.start + 1);
            out.push(TimelineEvent::note_off(self.track, end, self.channel, note.pitch));
            self.state.last_release = end;
        }
    }

    /// Start the next note of the current snippet at `tick`
    ///
    /// Returns false when the snippet has nothing to play.
    fn start_next_note(&mut self, tick: u64, out: &mut Vec<TimelineEvent>) -> bool {
        let phase = self.state.phase.unwrap_or(0);
        let Some(note) = self.snippet_mut(phase).and_then(Snippet::next_note) else {
            return false;
        };

        log::trace!("Voice {} plays {} at tick {}", self.track, note.note_name(), tick);
        out.push(TimelineEvent::note_on(
            self.track,
            tick,
            self.channel,
            note.pitch,
            note.velocity,
        ));
        self.state.sounding = Some(SoundingNote {
            pitch: note.pitch,
            start: tick,
            duration: note.duration,
        });
        true
    }
}

impl StepSequencer for MelodicSequencer {
    fn step(
        &mut self,
        now_seconds: f64,
        scheduled: bool,
        out: &mut Vec<TimelineEvent>,
    ) -> VoiceStep {
        if self.finished {
            return VoiceStep::Finished;
        }

        if now_seconds >= self.clock.duration_seconds() {
            self.release_at(self.clock.total_ticks(), out);
            return VoiceStep::Finished;
        }

        let tick = self.grid.seconds_to_ticks(now_seconds);
        self.state.last_tick = tick;
        self.advance_phase(tick, out);

        let phase = self.state.phase.unwrap_or(0);
        let boundary = self.clock.phase_end(phase);

        if scheduled != self.state.was_scheduled {
            log::trace!(
                "Voice {} scheduling {} -> {} at tick {}",
                self.track,
                self.state.was_scheduled,
                scheduled,
                tick
            );

            if scheduled {
                if self.state.sounding.is_none() {
                    let start = tick.max(self.state.last_release);
                    if start < boundary {
                        self.start_next_note(start, out);
                    }
                }
            } else {
                self.release_at(tick.min(boundary), out);
            }
            self.state.was_scheduled = scheduled;
        } else if scheduled {
            // Chain every note whose time is up, each starting where the
            // previous one ended
            while let Some(note) = self.state.sounding {
                if tick.saturating_sub(note.start) < note.duration {
                    break;
                }
                let end = (note.start + note.duration).min(boundary);
                self.release_at(end, out);
                if end >= boundary || !self.start_next_note(end, out) {
                    break;
                }
            }
        }

        VoiceStep::Continue
    }

    fn finish(&mut self, out: &mut Vec<TimelineEvent>) {
        if self.finished {
            return;
        }
        self.finished = true;

        if self.state.sounding.is_some() {
            let phase = self.state.phase.unwrap_or(0);
            let end = self.state.last_tick.min(self.clock.phase_end(phase));
            self.release_at(end, out);
        }

        let end_tick = self.state.last_tick.max(self.clock.total_ticks());
        out.push(TimelineEvent::marker(self.track, end_tick, ALIGNED_END_LABEL));
    }

    fn track(&self) -> usize {
        self.track
    }

    fn phase(&self) -> usize {
        self.state.phase.unwrap_or(0)
    }

    fn duration_seconds(&self) -> f64 {
        self.clock.duration_seconds()
    }
}
