// Timeline events
// What voices append to the shared timeline: notes, markers and track metadata

/// Payload of a timeline event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    TrackName(String),
    PatchChange { channel: u8, program: u8 },
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8 },
    Marker(String),
}

/// An event placed on a track at an absolute tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEvent {
    pub track: usize,
    pub tick: u64,
    pub kind: EventKind,
}

impl TimelineEvent {
    pub fn track_name(track: usize, tick: u64, name: impl Into<String>) -> Self {
        Self {
            track,
            tick,
            kind: EventKind::TrackName(name.into()),
        }
    }

    pub fn patch_change(track: usize, tick: u64, channel: u8, program: u8) -> Self {
        Self {
            track,
            tick,
            kind: EventKind::PatchChange { channel, program },
        }
    }

    pub fn note_on(track: usize, tick: u64, channel: u8, pitch: u8, velocity: u8) -> Self {
        Self {
            track,
            tick,
            kind: EventKind::NoteOn {
                channel,
                pitch,
                velocity,
            },
        }
    }

    pub fn note_off(track: usize, tick: u64, channel: u8, pitch: u8) -> Self {
        Self {
            track,
            tick,
            kind: EventKind::NoteOff { channel, pitch },
        }
    }

    pub fn marker(track: usize, tick: u64, label: impl Into<String>) -> Self {
        Self {
            track,
            tick,
            kind: EventKind::Marker(label.into()),
        }
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, EventKind::NoteOn { .. })
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self.kind, EventKind::NoteOff { .. })
    }

    /// (channel, pitch) for note events
    pub fn note_key(&self) -> Option<(u8, u8)> {
        match self.kind {
            EventKind::NoteOn { channel, pitch, .. } | EventKind::NoteOff { channel, pitch } => {
                Some((channel, pitch))
            }
            _ => None,
        }
    }

    /// Tie-break for events sharing a tick: metadata, then releases, then
    /// new notes, so a note ending where the next one starts never overlaps it
    pub fn order_rank(&self) -> u8 {
        match self.kind {
            EventKind::TrackName(_) => 0,
            EventKind::PatchChange { .. } => 1,
            EventKind::Marker(_) => 2,
            EventKind::NoteOff { .. } => 3,
            EventKind::NoteOn { .. } => 4,
        }
    }
}
