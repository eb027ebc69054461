// thread_music - Library exports for the binary, tests and benchmarks

pub mod config;
pub mod engine;
pub mod midi;
pub mod scheduling;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use config::{ConfigError, EngineSettings, SessionConfig};
pub use engine::{Session, SessionError, SessionOutcome, StopSignal, VoiceConfig, VoiceReport};
pub use midi::{ExportError, SharedTimeline, TimelineEvent, TimelineSink};
pub use scheduling::{SteppedClock, SystemClock, VoiceClock};
pub use sequencer::{MusicalGrid, PhaseClock, PhasePolicy, Snippet, StepSequencer};
