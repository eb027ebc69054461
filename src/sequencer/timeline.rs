// Timeline - Musical time representation
// Converts elapsed wall time into ticks, beats, bars and 16th-note steps

use std::fmt;

/// Number of 16th-note steps in one drum bar
pub const STEPS_PER_BAR: u64 = 16;

/// Time signature (numerator/denominator)
/// Example: 4/4 time = TimeSignature { numerator: 4, denominator: 4 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per bar
    pub denominator: u8, // Note value (4 = quarter note, 8 = eighth note)
}

impl TimeSignature {
    /// Creates a new time signature
    pub fn new(numerator: u8, denominator: u8) -> Self {
        assert!(numerator > 0, "Time signature numerator must be > 0");
        assert!(
            denominator.is_power_of_two(),
            "Time signature denominator must be power of 2"
        );
        Self {
            numerator,
            denominator,
        }
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self::new(4, 4)
    }

    /// Number of beats per bar
    pub fn beats_per_bar(&self) -> u64 {
        self.numerator as u64
    }

    /// Denominator as a power of two (the form MIDI time signature events use)
    pub fn denominator_power(&self) -> u8 {
        self.denominator.trailing_zeros() as u8
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Lowest accepted tempo
    pub const MIN_BPM: f64 = 20.0;
    /// Highest accepted tempo
    pub const MAX_BPM: f64 = 999.0;

    /// Creates a new tempo
    /// BPM must be in range [20.0, 999.0]
    pub fn new(bpm: f64) -> Self {
        assert!(
            (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm),
            "BPM must be between 20 and 999"
        );
        Self { bpm }
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Microseconds per quarter note, as written in a MIDI tempo event
    pub fn micros_per_quarter(&self) -> u32 {
        (60_000_000.0 / self.bpm).round() as u32
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(200.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// The fixed-resolution tick grid every voice writes on
///
/// All voices share one grid so that ticks computed independently from each
/// thread's own wall clock land on the same musical positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicalGrid {
    tempo: Tempo,
    time_signature: TimeSignature,
    ticks_per_quarter: u32,
}

impl MusicalGrid {
    /// Standard resolution (PPQN - Pulses Per Quarter Note)
    pub const DEFAULT_TICKS_PER_QUARTER: u32 = 480;

    pub fn new(tempo: Tempo, time_signature: TimeSignature, ticks_per_quarter: u32) -> Self {
        assert!(ticks_per_quarter > 0, "Ticks per quarter must be > 0");
        Self {
            tempo,
            time_signature,
            ticks_per_quarter,
        }
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn ticks_per_quarter(&self) -> u32 {
        self.ticks_per_quarter
    }

    /// Ticks elapsing per second of wall time
    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_quarter as f64 * (self.tempo.bpm() / 60.0)
    }

    /// Ticks in one beat of the time signature
    pub fn ticks_per_beat(&self) -> u64 {
        (self.ticks_per_quarter as u64 * 4) / self.time_signature.denominator as u64
    }

    pub fn ticks_per_bar(&self) -> u64 {
        self.time_signature.beats_per_bar() * self.ticks_per_beat()
    }

    /// Ticks in one 16th-note step (never zero)
    pub fn ticks_per_step(&self) -> u64 {
        (self.ticks_per_quarter as u64 / 4).max(1)
    }

    /// Tick reached after `seconds` of wall time (floored, negative clamps to 0)
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.ticks_per_second()) as u64
    }

    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        ticks as f64 / self.ticks_per_second()
    }

    /// Absolute 16th-note step index containing `tick`
    pub fn step_index(&self, tick: u64) -> u64 {
        tick / self.ticks_per_step()
    }

    /// Tick where absolute 16th-note step `step` starts
    pub fn step_start(&self, step: u64) -> u64 {
        step * self.ticks_per_step()
    }

    /// Bar:beat:tick view of an absolute tick, used in phase logs
    pub fn musical_time(&self, tick: u64) -> MusicalTime {
        let ticks_per_beat = self.ticks_per_beat().max(1);
        let ticks_per_bar = self.ticks_per_bar().max(1);

        let bar = tick / ticks_per_bar + 1; // 1-based
        let remaining = tick % ticks_per_bar;
        let beat = remaining / ticks_per_beat + 1; // 1-based

        MusicalTime {
            bar: bar as u32,
            beat: beat as u8,
            tick: (remaining % ticks_per_beat) as u16,
        }
    }
}

impl Default for MusicalGrid {
    fn default() -> Self {
        Self::new(
            Tempo::default(),
            TimeSignature::default(),
            Self::DEFAULT_TICKS_PER_QUARTER,
        )
    }
}

/// Musical time representation
/// Represents a position in the timeline using bars, beats, and ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MusicalTime {
    pub bar: u32,  // Bar number (1-based)
    pub beat: u8,  // Beat within bar (1-based)
    pub tick: u16, // Tick within beat (0-based)
}

impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:03}", self.bar, self.beat, self.tick)
    }
}
