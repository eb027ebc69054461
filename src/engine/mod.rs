// Engine module
// Voice planning, the per-thread voice loop and the session coordinator

pub mod runner;
pub mod session;
pub mod stop;
pub mod voices;

pub use runner::{VoiceReport, VoiceRunner};
pub use session::{Session, SessionError, SessionOutcome};
pub use stop::StopSignal;
pub use voices::{
    PHASE_ROOTS, SeedSource, VoiceConfig, VoicePart, VoiceRole, melodic_channel, plan_voices,
};
