// Sequencer module
// Musical grid, phases, phrases and the per-voice state machines

pub mod drums;
pub mod generator;
pub mod note;
pub mod pattern;
pub mod phase;
pub mod timeline;
pub mod voice;

pub use drums::{DRUM_CHANNEL, DrumSequencer, ORIGINAL_END_LABEL};
pub use generator::{
    PhraseRole, PhraseSpec, PhraseWeights, Register, Scale, WeightTable, generate_drum_pattern,
    generate_snippet,
};
pub use note::{Note, Snippet};
pub use pattern::{DrumHit, DrumPattern, DrumVariant, drum_key};
pub use phase::{PhaseClock, PhasePolicy, phase_label};
pub use timeline::{MusicalGrid, MusicalTime, STEPS_PER_BAR, Tempo, TimeSignature};
pub use voice::{
    ALIGNED_END_LABEL, MelodicSequencer, SoundingNote, StepSequencer, VoiceState, VoiceStep,
};
