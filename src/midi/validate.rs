// Note pairing checks
// A well-formed timeline has every note-on closed by exactly one note-off

use super::event::{EventKind, TimelineEvent};
use std::collections::HashMap;
use std::fmt;

/// Why a note event broke pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingError {
    /// Note-on while the same key (or, for monophonic checks, the channel)
    /// was already sounding
    Overlap,
    /// Note-off with nothing sounding for that key
    Orphaned,
    /// Note-on never released
    Unreleased,
    /// Note-off for a different pitch than the one sounding on the channel
    WrongPitch,
}

/// A pairing violation located in the timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingViolation {
    pub error: PairingError,
    pub track: usize,
    pub channel: u8,
    pub pitch: u8,
    pub tick: u64,
}

impl fmt::Display for PairingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} on track {} channel {} pitch {} at tick {}",
            self.error, self.track, self.channel, self.pitch, self.tick
        )
    }
}

/// Check pairing per (track, channel, pitch) over tick-ordered events
pub fn check_note_pairing(events: &[TimelineEvent]) -> Vec<PairingViolation> {
    let mut sounding: HashMap<(usize, u8, u8), u64> = HashMap::new();
    let mut violations = Vec::new();

    for event in events {
        match event.kind {
            EventKind::NoteOn { channel, pitch, .. } => {
                if sounding.insert((event.track, channel, pitch), event.tick).is_some() {
                    violations.push(violation(PairingError::Overlap, event, channel, pitch));
                }
            }
            EventKind::NoteOff { channel, pitch } => {
                if sounding.remove(&(event.track, channel, pitch)).is_none() {
                    violations.push(violation(PairingError::Orphaned, event, channel, pitch));
                }
            }
            _ => {}
        }
    }

    push_unreleased(&mut violations, sounding.into_iter().map(|((t, c, p), tick)| (t, c, p, tick)));
    violations
}

/// Stricter check for monophonic tracks: per (track, channel) a note-on must
/// be released before any other note-on
pub fn check_monophonic(events: &[TimelineEvent], track: usize) -> Vec<PairingViolation> {
    let mut sounding: HashMap<u8, (u8, u64)> = HashMap::new();
    let mut violations = Vec::new();

    for event in events.iter().filter(|e| e.track == track) {
        match event.kind {
            EventKind::NoteOn { channel, pitch, .. } => {
                if sounding.insert(channel, (pitch, event.tick)).is_some() {
                    violations.push(violation(PairingError::Overlap, event, channel, pitch));
                }
            }
            EventKind::NoteOff { channel, pitch } => match sounding.remove(&channel) {
                Some((on_pitch, _)) if on_pitch == pitch => {}
                Some(_) => {
                    violations.push(violation(PairingError::WrongPitch, event, channel, pitch))
                }
                None => violations.push(violation(PairingError::Orphaned, event, channel, pitch)),
            },
            _ => {}
        }
    }

    push_unreleased(
        &mut violations,
        sounding.into_iter().map(|(c, (p, tick))| (track, c, p, tick)),
    );
    violations
}

fn violation(
    error: PairingError,
    event: &TimelineEvent,
    channel: u8,
    pitch: u8,
) -> PairingViolation {
    PairingViolation {
        error,
        track: event.track,
        channel,
        pitch,
        tick: event.tick,
    }
}

fn push_unreleased(
    violations: &mut Vec<PairingViolation>,
    left: impl Iterator<Item = (usize, u8, u8, u64)>,
) {
    let mut left: Vec<_> = left.collect();
    left.sort_unstable();
    violations.extend(left.into_iter().map(|(track, channel, pitch, tick)| PairingViolation {
        error: PairingError::Unreleased,
        track,
        channel,
        pitch,
        tick,
    }));
}
