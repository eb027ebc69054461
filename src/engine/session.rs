// Session - Spawns one thread per voice, stops and joins them, collects the timeline
//
// Voices never see each other. The coordinator's only levers are the shared
// timeline it hands out and the stop signal it raises once the run is over.

use super::runner::{VoiceReport, VoiceRunner};
use super::stop::StopSignal;
use super::voices::{SeedSource, VoiceConfig, plan_voices};
use crate::config::SessionConfig;
use crate::midi::event::TimelineEvent;
use crate::midi::sink::{SharedTimeline, TimelineSink};
use crate::midi::validate::{PairingViolation, check_note_pairing};
use crate::scheduling::clock::{SystemClock, VoiceClock};
use crate::scheduling::load::{LoadGenerator, LoadProfile};
use crate::sequencer::phase::{PhaseClock, PhasePolicy};
use crate::sequencer::timeline::MusicalGrid;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often the coordinator checks whether every voice is done
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Session error types
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to spawn voice thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Voice {voice} panicked")]
    VoicePanicked { voice: usize },
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Every voice's events, stably ordered by tick
    pub events: Vec<TimelineEvent>,
    pub reports: Vec<VoiceReport>,
    pub track_count: usize,
    pub grid: MusicalGrid,
    /// Ticks by which melodic voices outlast the drum voice
    pub drift_ticks: i64,
    /// Note pairing problems found in the finished timeline
    pub violations: Vec<PairingViolation>,
}

/// One generation run
pub struct Session {
    grid: MusicalGrid,
    threshold: f64,
    load: LoadProfile,
    seeds: SeedSource,
    duration_seconds: f64,
    phase_count: usize,
    voices: Vec<VoiceConfig>,
    stop_after: Option<Duration>,
}

impl Session {
    /// Plan a run: clamp the config and generate every voice's content
    pub fn new(config: &SessionConfig) -> Self {
        let grid = config.engine.grid();
        let seeds = SeedSource::new(config.seed);
        let phase_count = config.phases();
        let voices = plan_voices(config.voices(), phase_count, &grid, &seeds);

        Self {
            grid,
            threshold: config.engine.threshold(),
            load: config.engine.load_profile(),
            seeds,
            duration_seconds: config.duration() as f64,
            phase_count,
            voices,
            stop_after: None,
        }
    }

    /// Raise the stop signal after `after` instead of at the end of the run
    pub fn with_stop_after(mut self, after: Duration) -> Self {
        self.stop_after = Some(after);
        self
    }

    pub fn grid(&self) -> &MusicalGrid {
        &self.grid
    }

    pub fn voices(&self) -> &[VoiceConfig] {
        &self.voices
    }

    /// Phase clock the drum voice runs on
    pub fn drum_clock(&self) -> PhaseClock {
        PhaseClock::new(
            &self.grid,
            self.duration_seconds,
            self.phase_count,
            PhasePolicy::Unaligned,
        )
    }

    /// Phase clock every melodic voice runs on
    pub fn melodic_clock(&self) -> PhaseClock {
        PhaseClock::new(
            &self.grid,
            self.duration_seconds,
            self.phase_count,
            PhasePolicy::BarAligned,
        )
    }

    /// Ticks by which bar alignment lengthens (or shortens) melodic voices
    pub fn drift_ticks(&self) -> i64 {
        self.melodic_clock().drift_from(&self.drum_clock())
    }

    /// Time after which the stop signal is raised
    fn stop_deadline(&self) -> Duration {
        if let Some(after) = self.stop_after {
            return after;
        }
        let longest = self
            .drum_clock()
            .duration_seconds()
            .max(self.melodic_clock().duration_seconds());
        Duration::from_secs_f64(longest.max(0.0))
    }

    /// Run every voice on real clocks
    pub fn run(self) -> Result<SessionOutcome, SessionError> {
        self.run_with_clocks(|_| SystemClock::start())
    }

    /// Run every voice with the clock `make_clock` builds for it
    ///
    /// The clock is built on the voice's own thread, so per-thread clocks
    /// measure the right thread.
    pub fn run_with_clocks<C, F>(self, make_clock: F) -> Result<SessionOutcome, SessionError>
    where
        C: VoiceClock + 'static,
        F: Fn(usize) -> C + Send + Sync + 'static,
    {
        let drift_ticks = self.drift_ticks();
        let deadline = self.stop_deadline();
        let track_count = self.voices.len();

        log::info!(
            "Starting session: {} voices, {:.0}s, {} phases",
            track_count,
            self.duration_seconds,
            self.phase_count
        );
        log::info!(
            "Grid: {} in {}, {} ticks per quarter",
            self.grid.tempo(),
            self.grid.time_signature(),
            self.grid.ticks_per_quarter()
        );
        log::info!(
            "Bar alignment drift: melodic voices end {} ticks ({:.3}s) {} the drums",
            drift_ticks.abs(),
            drift_ticks.unsigned_abs() as f64 / self.grid.ticks_per_second(),
            if drift_ticks >= 0 { "after" } else { "before" }
        );

        let timeline = SharedTimeline::new();
        let stop = StopSignal::new();
        let make_clock = Arc::new(make_clock);

        let mut handles: Vec<(usize, JoinHandle<VoiceReport>)> = Vec::with_capacity(track_count);
        for voice in self.voices {
            let id = voice.id;
            let sink: Arc<dyn TimelineSink> = timeline.clone();
            let stop_view = stop.clone();
            let make_clock = Arc::clone(&make_clock);
            let load = LoadGenerator::new(self.load, self.seeds.load_rng(id));
            let grid = self.grid;
            let threshold = self.threshold;
            let duration = self.duration_seconds;
            let phases = self.phase_count;

            let spawned = thread::Builder::new()
                .name(format!("voice-{}", id))
                .spawn(move || {
                    let clock = (*make_clock)(id);
                    VoiceRunner::new(grid, threshold, load, sink, stop_view, clock)
                        .run(voice, duration, phases)
                });

            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    stop.request_stop();
                    join_all(handles);
                    return Err(SessionError::Spawn(e));
                }
            }
        }

        let started = Instant::now();
        while started.elapsed() < deadline && !handles.iter().all(|(_, h)| h.is_finished()) {
            thread::sleep(POLL_INTERVAL.min(deadline.saturating_sub(started.elapsed())));
        }
        stop.request_stop();

        let (reports, panicked) = join_all(handles);
        if let Some(voice) = panicked {
            return Err(SessionError::VoicePanicked { voice });
        }

        let events = timeline.finalize();
        let violations = check_note_pairing(&events);
        for violation in &violations {
            log::warn!("Note pairing: {}", violation);
        }

        Ok(SessionOutcome {
            events,
            reports,
            track_count,
            grid: self.grid,
            drift_ticks,
            violations,
        })
    }
}

/// Join every voice; returns the reports and the first voice that panicked
fn join_all(handles: Vec<(usize, JoinHandle<VoiceReport>)>) -> (Vec<VoiceReport>, Option<usize>) {
    let mut reports = Vec::with_capacity(handles.len());
    let mut panicked = None;

    for (id, handle) in handles {
        match handle.join() {
            Ok(report) => reports.push(report),
            Err(_) => {
                log::warn!("Voice {} panicked", id);
                panicked.get_or_insert(id);
            }
        }
    }

    (reports, panicked)
}
