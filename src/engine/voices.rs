// Voice assignment - Track, channel, instrument and content for every voice
//
// Voice 0 is always the drum voice. Melodic voices take one of three roles in
// rotation and get a phrase per phase, generated before any thread starts.

use crate::sequencer::drums::{DRUM_CHANNEL, DrumSequencer};
use crate::sequencer::generator::{
    PhraseRole, PhraseSpec, PhraseWeights, Register, Scale, generate_drum_pattern,
    generate_snippet,
};
use crate::sequencer::note::Snippet;
use crate::sequencer::pattern::DrumPattern;
use crate::sequencer::timeline::MusicalGrid;
use crate::sequencer::voice::{MelodicSequencer, StepSequencer};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Scale roots cycled through by phase: C, G, F, D
pub const PHASE_ROOTS: [u8; 4] = [0, 7, 5, 2];

/// Musical role of a melodic voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceRole {
    Bass,
    Mid,
    High,
}

impl VoiceRole {
    /// Role of melodic voice `id` (ids start at 1)
    pub fn for_voice(id: usize) -> Self {
        match id % 3 {
            1 => VoiceRole::Bass,
            2 => VoiceRole::Mid,
            _ => VoiceRole::High,
        }
    }

    pub fn register(&self) -> Register {
        match self {
            VoiceRole::Bass => Register::BASS,
            VoiceRole::Mid => Register::MID,
            VoiceRole::High => Register::HIGH,
        }
    }

    /// General MIDI program: basses, organs or synth leads
    pub fn program(&self, id: usize) -> u8 {
        let variation = (id % 8) as u8;
        match self {
            VoiceRole::Bass => 32 + variation,
            VoiceRole::Mid => 16 + variation,
            VoiceRole::High => 80 + variation,
        }
    }

    pub fn scale_for_phase(&self, phase: usize) -> Scale {
        match self {
            VoiceRole::Bass => {
                if phase % 2 == 0 {
                    Scale::Major
                } else {
                    Scale::Minor
                }
            }
            VoiceRole::Mid => match phase % 3 {
                0 => Scale::Major,
                1 => Scale::Minor,
                _ => Scale::Pentatonic,
            },
            VoiceRole::High => match phase % 3 {
                0 => Scale::Pentatonic,
                1 => Scale::Major,
                _ => Scale::Minor,
            },
        }
    }

    pub fn phrase_role(&self) -> PhraseRole {
        match self {
            VoiceRole::Bass => PhraseRole::Bass,
            VoiceRole::Mid | VoiceRole::High => PhraseRole::Melody,
        }
    }
}

/// What a voice plays
#[derive(Debug, Clone)]
pub enum VoicePart {
    Drums(Vec<DrumPattern>),
    Melodic { role: VoiceRole, snippets: Vec<Snippet> },
}

/// Everything a voice thread needs, handed over by value
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub id: usize,
    pub track: usize,
    pub channel: u8,
    /// Patch change written at tick 0 (none for drums)
    pub program: Option<u8>,
    pub name: String,
    pub part: VoicePart,
}

impl VoiceConfig {
    pub fn is_drums(&self) -> bool {
        matches!(self.part, VoicePart::Drums(_))
    }

    /// Turn the voice's content into its state machine
    pub fn into_sequencer(
        self,
        grid: MusicalGrid,
        duration_seconds: f64,
        phase_count: usize,
    ) -> Box<dyn StepSequencer> {
        match self.part {
            VoicePart::Drums(patterns) => Box::new(DrumSequencer::new(
                self.track,
                grid,
                duration_seconds,
                phase_count,
                patterns,
            )),
            VoicePart::Melodic { snippets, .. } => Box::new(MelodicSequencer::new(
                self.track,
                self.channel,
                grid,
                duration_seconds,
                phase_count,
                snippets,
            )),
        }
    }
}

/// Hands out independent random generators
///
/// With a base seed every stream is reproducible; without one each stream is
/// seeded from OS entropy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSource {
    base: Option<u64>,
}

impl SeedSource {
    pub fn new(base: Option<u64>) -> Self {
        Self { base }
    }

    /// Generator for the phrase of `voice` in `phase`
    pub fn phrase_rng(&self, voice: usize, phase: usize) -> StdRng {
        self.rng(((voice as u64) << 32) | phase as u64)
    }

    /// Generator for the busy work of `voice`
    pub fn load_rng(&self, voice: usize) -> StdRng {
        self.rng(((voice as u64) << 32) | u32::MAX as u64)
    }

    fn rng(&self, stream: u64) -> StdRng {
        match self.base {
            Some(base) => StdRng::seed_from_u64(base ^ stream),
            None => StdRng::from_entropy(),
        }
    }
}

/// Channel of melodic voice `id`: 0-15 in rotation, skipping the drum channel
pub fn melodic_channel(id: usize) -> u8 {
    let index = (id.max(1) - 1) % 15;
    if index >= DRUM_CHANNEL as usize {
        index as u8 + 1
    } else {
        index as u8
    }
}

/// Plan `voice_count` voices (at least the drum voice) over `phase_count`
/// phases
pub fn plan_voices(
    voice_count: usize,
    phase_count: usize,
    grid: &MusicalGrid,
    seeds: &SeedSource,
) -> Vec<VoiceConfig> {
    let voice_count = voice_count.max(1);
    let phase_count = phase_count.max(1);
    let weights = PhraseWeights::for_resolution(grid.ticks_per_quarter());

    let mut voices = Vec::with_capacity(voice_count);
    voices.push(VoiceConfig {
        id: 0,
        track: 0,
        channel: DRUM_CHANNEL,
        program: None,
        name: "Drum Track".to_string(),
        part: VoicePart::Drums((0..phase_count).map(generate_drum_pattern).collect()),
    });

    for id in 1..voice_count {
        let role = VoiceRole::for_voice(id);
        let snippets = (0..phase_count)
            .map(|phase| {
                let spec = PhraseSpec {
                    register: role.register(),
                    scale: role.scale_for_phase(phase),
                    root: PHASE_ROOTS[phase % PHASE_ROOTS.len()],
                    role: role.phrase_role(),
                    weights: &weights,
                };
                generate_snippet(&mut seeds.phrase_rng(id, phase), &spec)
            })
            .collect();

        voices.push(VoiceConfig {
            id,
            track: id,
            channel: melodic_channel(id),
            program: Some(role.program(id)),
            name: format!("Thread {}", id),
            part: VoicePart::Melodic { role, snippets },
        });
    }

    voices
}
