// Pattern Generator - Builds the phrase each voice plays in each phase
// Pure functions of their inputs plus a caller-owned random generator

use super::note::{Note, Snippet};
use super::pattern::DrumPattern;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// Shortest and longest generated phrase, in notes
pub const MIN_PHRASE_NOTES: usize = 4;
pub const MAX_PHRASE_NOTES: usize = 8;

/// Fixed velocity of every bass note
pub const BASS_VELOCITY: u8 = 100;

/// Chance (1 in N) that a melodic step leaps over two degrees
const LEAP_ONE_IN: u32 = 4;

/// Scale as semitone offsets from its root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Major,
    Minor,
    Pentatonic,
}

impl Scale {
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Pentatonic => &[0, 2, 4, 7, 9],
        }
    }
}

/// Inclusive MIDI pitch range a voice plays in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub low: u8,
    pub high: u8,
}

impl Register {
    pub const BASS: Register = Register { low: 36, high: 48 };
    pub const MID: Register = Register { low: 48, high: 60 };
    pub const HIGH: Register = Register { low: 60, high: 72 };

    pub fn contains(&self, pitch: u8) -> bool {
        (self.low..=self.high).contains(&pitch)
    }
}

/// Whether a phrase is a walking melody or a root/fifth bass line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseRole {
    Melody,
    Bass,
}

/// Weighted choice among a few discrete values
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    entries: Vec<(u64, f64)>,
    fallback: u64,
}

impl WeightTable {
    /// Entries with a non-positive weight are never chosen; if none remain,
    /// `fallback` is returned
    pub fn new(entries: Vec<(u64, f64)>, fallback: u64) -> Self {
        let entries = entries.into_iter().filter(|(_, w)| *w > 0.0).collect();
        Self { entries, fallback }
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|(value, _)| *value)
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match WeightedIndex::new(self.entries.iter().map(|(_, w)| *w)) {
            Ok(dist) => self.entries[dist.sample(rng)].0,
            Err(_) => self.fallback,
        }
    }
}

/// Duration and velocity tables for one tick resolution
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseWeights {
    pub melody_durations: WeightTable,
    pub bass_durations: WeightTable,
    pub melody_velocities: WeightTable,
}

impl PhraseWeights {
    /// Default tables: melodies favour eighths and quarters, bass lines
    /// quarters and halves
    pub fn for_resolution(ticks_per_quarter: u32) -> Self {
        let quarter = ticks_per_quarter.max(4) as u64;
        let sixteenth = quarter / 4;
        let eighth = quarter / 2;

        Self {
            melody_durations: WeightTable::new(
                vec![
                    (sixteenth, 0.15),
                    (eighth, 0.35),
                    (quarter, 0.35),
                    (quarter * 2, 0.15),
                ],
                quarter,
            ),
            bass_durations: WeightTable::new(
                vec![
                    (eighth, 0.15),
                    (quarter, 0.45),
                    (quarter * 2, 0.3),
                    (quarter * 4, 0.1),
                ],
                quarter,
            ),
            melody_velocities: WeightTable::new(
                vec![(80, 0.2), (90, 0.3), (100, 0.3), (110, 0.2)],
                100,
            ),
        }
    }
}

/// Everything that shapes one phrase
#[derive(Debug, Clone, Copy)]
pub struct PhraseSpec<'a> {
    pub register: Register,
    pub scale: Scale,
    /// Pitch class of the scale root (0 = C)
    pub root: u8,
    pub role: PhraseRole,
    pub weights: &'a PhraseWeights,
}

/// Generate the phrase for one (voice, phase)
pub fn generate_snippet<R: Rng + ?Sized>(rng: &mut R, spec: &PhraseSpec<'_>) -> Snippet {
    let length = rng.gen_range(MIN_PHRASE_NOTES..=MAX_PHRASE_NOTES);
    let notes = match spec.role {
        PhraseRole::Melody => melody_notes(rng, spec, length),
        PhraseRole::Bass => bass_notes(rng, spec, length),
    };
    Snippet::new(notes)
}

/// Drum grid for a phase (fixed table, no randomness)
pub fn generate_drum_pattern(phase: usize) -> DrumPattern {
    DrumPattern::for_phase(phase)
}

/// Rise for the first half of the phrase, fall for the second
fn melody_notes<R: Rng + ?Sized>(rng: &mut R, spec: &PhraseSpec<'_>, length: usize) -> Vec<Note> {
    let scale = spec.scale.intervals();
    let degrees = scale.len() as i32;
    let low_octave = (spec.register.low / 12) as i32;
    let high_octave = (spec.register.high / 12) as i32;

    let mut octave = low_octave + (high_octave - low_octave) / 2;
    let mut degree = rng.gen_range(0..degrees);
    let mut notes = Vec::with_capacity(length);

    for i in 0..length {
        let pitch = fit_register(spec, &mut octave, degree as usize);

        let direction = if i < length / 2 { 1 } else { -1 };
        degree += direction;
        if rng.gen_ratio(1, LEAP_ONE_IN) {
            degree += direction * 2;
        }

        if degree < 0 {
            degree = degree.rem_euclid(degrees);
            if octave > low_octave {
                octave -= 1;
            }
        } else if degree >= degrees {
            degree = degree.rem_euclid(degrees);
            if octave < high_octave {
                octave += 1;
            }
        }

        let duration = spec.weights.melody_durations.choose(rng);
        let velocity = spec.weights.melody_velocities.choose(rng).min(127) as u8;
        notes.push(Note::new(pitch, velocity, duration));
    }

    notes
}

/// Root on every downbeat, the fifth-ish degree halfway, anything else between
fn bass_notes<R: Rng + ?Sized>(rng: &mut R, spec: &PhraseSpec<'_>, length: usize) -> Vec<Note> {
    let scale = spec.scale.intervals();
    let mut octave = (spec.register.low / 12) as i32;
    let mut notes = Vec::with_capacity(length);

    for i in 0..length {
        let degree = match i % 4 {
            0 => 0,
            2 => 4 % scale.len(),
            _ => rng.gen_range(0..scale.len()),
        };
        let pitch = fit_register(spec, &mut octave, degree);
        let duration = spec.weights.bass_durations.choose(rng);
        notes.push(Note::new(pitch, BASS_VELOCITY, duration));
    }

    notes
}

fn pitch_in_scale(scale: &[u8], octave: i32, degree: usize, root: u8) -> i32 {
    octave * 12 + root as i32 + scale[degree % scale.len()] as i32
}

/// Shift `octave` until the pitch lands in the register; the octave change
/// carries over to the following notes
fn fit_register(spec: &PhraseSpec<'_>, octave: &mut i32, degree: usize) -> u8 {
    let scale = spec.scale.intervals();
    let low = spec.register.low as i32;
    let high = spec.register.high as i32;

    let mut pitch = pitch_in_scale(scale, *octave, degree, spec.root);
    while pitch < low {
        *octave += 1;
        pitch = pitch_in_scale(scale, *octave, degree, spec.root);
    }
    while pitch > high {
        *octave -= 1;
        pitch = pitch_in_scale(scale, *octave, degree, spec.root);
    }

    // Registers narrower than an octave can still miss
    pitch.clamp(low, high).clamp(0, 127) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn spec<'a>(
        weights: &'a PhraseWeights,
        register: Register,
        role: PhraseRole,
    ) -> PhraseSpec<'a> {
        PhraseSpec {
            register,
            scale: Scale::Major,
            root: 7,
            role,
            weights,
        }
    }

    #[test]
    fn test_phrase_length_bounds() {
        let weights = PhraseWeights::for_resolution(480);
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let melody = spec(&weights, Register::MID, PhraseRole::Melody);
            let snippet = generate_snippet(&mut rng, &melody);
            assert!((MIN_PHRASE_NOTES..=MAX_PHRASE_NOTES).contains(&snippet.len()));
        }
    }

    #[test]
    fn test_pitches_stay_in_register() {
        let weights = PhraseWeights::for_resolution(480);
        let cases = [
            (Register::BASS, PhraseRole::Bass),
            (Register::MID, PhraseRole::Melody),
            (Register::HIGH, PhraseRole::Melody),
        ];

        for (register, role) in cases {
            for scale in [Scale::Major, Scale::Minor, Scale::Pentatonic] {
                for root in [0u8, 2, 5, 7] {
                    for seed in 0..50 {
                        let mut rng = StdRng::seed_from_u64(seed);
                        let phrase = PhraseSpec { register, scale, root, role, weights: &weights };
                        let snippet = generate_snippet(&mut rng, &phrase);
                        for note in snippet.notes() {
                            assert!(
                                register.contains(note.pitch),
                                "pitch {} outside {:?}",
                                note.pitch,
                                register
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_pitches_belong_to_scale() {
        let weights = PhraseWeights::for_resolution(480);
        let phrase = spec(&weights, Register::HIGH, PhraseRole::Melody);
        let mut rng = StdRng::seed_from_u64(7);

        let snippet = generate_snippet(&mut rng, &phrase);
        for note in snippet.notes() {
            let class = (note.pitch as i32 - phrase.root as i32).rem_euclid(12) as u8;
            assert!(Scale::Major.intervals().contains(&class));
        }
    }

    #[test]
    fn test_melody_durations_and_velocities_come_from_tables() {
        let weights = PhraseWeights::for_resolution(480);
        let durations: Vec<u64> = weights.melody_durations.values().collect();
        let velocities: Vec<u64> = weights.melody_velocities.values().collect();

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let melody = spec(&weights, Register::MID, PhraseRole::Melody);
            let snippet = generate_snippet(&mut rng, &melody);
            for note in snippet.notes() {
                assert!(durations.contains(&note.duration));
                assert!(velocities.contains(&(note.velocity as u64)));
            }
        }
    }

    #[test]
    fn test_bass_emphasises_root_and_fifth() {
        let weights = PhraseWeights::for_resolution(480);
        let phrase = spec(&weights, Register::BASS, PhraseRole::Bass);

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let snippet = generate_snippet(&mut rng, &phrase);
            for (i, note) in snippet.notes().iter().enumerate() {
                let class = (note.pitch as i32 - phrase.root as i32).rem_euclid(12);
                match i % 4 {
                    0 => assert_eq!(class, 0),
                    2 => assert_eq!(class, Scale::Major.intervals()[4] as i32),
                    _ => {}
                }
                assert_eq!(note.velocity, BASS_VELOCITY);
            }
        }
    }

    #[test]
    fn test_same_seed_same_phrase() {
        let weights = PhraseWeights::for_resolution(480);
        let phrase = spec(&weights, Register::MID, PhraseRole::Melody);

        let a = generate_snippet(&mut StdRng::seed_from_u64(42), &phrase);
        let b = generate_snippet(&mut StdRng::seed_from_u64(42), &phrase);
        assert_eq!(a, b);
    }

    #[test]
    fn test_narrow_register_is_clamped() {
        let weights = PhraseWeights::for_resolution(480);
        let narrow = Register { low: 61, high: 63 };
        let phrase = PhraseSpec {
            register: narrow,
            scale: Scale::Pentatonic,
            root: 0,
            role: PhraseRole::Melody,
            weights: &weights,
        };

        for seed in 0..50 {
            let snippet = generate_snippet(&mut StdRng::seed_from_u64(seed), &phrase);
            assert!(snippet.notes().iter().all(|n| narrow.contains(n.pitch)));
        }
    }

    #[test]
    fn test_weight_table_skips_zero_weights() {
        let table = WeightTable::new(vec![(120, 0.0), (480, 1.0)], 240);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(table.choose(&mut rng), 480);
        }

        let empty = WeightTable::new(vec![(120, 0.0)], 240);
        assert_eq!(empty.choose(&mut rng), 240);
    }
}
