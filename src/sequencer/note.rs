// Note representation for the sequencer
// A note is a pitch, a velocity and a length on the tick grid; snippets cycle through them

/// A musical note in a voice's phrase
///
/// Notes carry no position: a voice decides when a note starts from its own
/// scheduling, the note only says what to play and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    /// MIDI note number (0-127, where 60 = C4)
    pub pitch: u8,

    /// MIDI velocity (0-127, where 127 = maximum)
    pub velocity: u8,

    /// Duration in ticks
    pub duration: u64,
}

impl Note {
    /// Creates a new note
    pub fn new(pitch: u8, velocity: u8, duration: u64) -> Self {
        assert!(pitch <= 127, "MIDI pitch must be 0-127");
        assert!(velocity <= 127, "MIDI velocity must be 0-127");
        assert!(duration > 0, "Note duration must be > 0");

        Self {
            pitch,
            velocity,
            duration,
        }
    }

    /// Get the note name (e.g., "C4", "A#5")
    pub fn note_name(&self) -> String {
        const NOTE_NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];

        let octave = (self.pitch / 12) as i32 - 1;
        let note_index = (self.pitch % 12) as usize;

        format!("{}{}", NOTE_NAMES[note_index], octave)
    }
}

/// A phrase played by one voice during one phase
///
/// The cursor wraps: asking for the note after the last one returns the
/// first again. It only moves through [`Snippet::next_note`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    notes: Vec<Note>,
    cursor: usize,
}

impl Snippet {
    pub fn new(notes: Vec<Note>) -> Self {
        Self { notes, cursor: 0 }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Index of the note the next call to `next_note` returns
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Rewind to the start of the phrase
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Take the note under the cursor and advance, wrapping at the end
    pub fn next_note(&mut self) -> Option<Note> {
        let note = *self.notes.get(self.cursor)?;
        self.cursor = (self.cursor + 1) % self.notes.len();
        Some(note)
    }
}
