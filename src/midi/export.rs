// MIDI Export - Writes a finalized timeline as a Standard MIDI File
//
// Format 1, one track per voice. Track 0 additionally carries the tempo and
// time signature. Absolute ticks are converted to delta times per track.

use super::event::{EventKind, TimelineEvent};
use crate::sequencer::timeline::MusicalGrid;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const MAX_U15: u16 = 0x7FFF;
const MAX_U24: u32 = 0x00FF_FFFF;
const MAX_U28: u32 = 0x0FFF_FFFF;

/// Export error types
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Value out of MIDI range: {0}")]
    OutOfRange(String),
}

/// Build the in-memory MIDI file for `events`
///
/// `track_count` is a minimum; tracks referenced by events beyond it are
/// added. Event text is borrowed from `events`.
pub fn build_smf<'a>(
    events: &'a [TimelineEvent],
    grid: &MusicalGrid,
    track_count: usize,
) -> Result<Smf<'a>, ExportError> {
    let tpq = u16::try_from(grid.ticks_per_quarter())
        .ok()
        .filter(|t| *t <= MAX_U15)
        .ok_or_else(|| {
            ExportError::OutOfRange(format!("ticks per quarter {}", grid.ticks_per_quarter()))
        })?;

    let track_count = events
        .iter()
        .map(|e| e.track + 1)
        .max()
        .unwrap_or(0)
        .max(track_count)
        .max(1);

    let mut per_track: Vec<Vec<&TimelineEvent>> = vec![Vec::new(); track_count];
    for event in events {
        per_track[event.track].push(event);
    }

    let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(u15::new(tpq))));

    for (index, mut track_events) in per_track.into_iter().enumerate() {
        track_events.sort_by_key(|e| (e.tick, e.order_rank()));

        let mut track = Vec::with_capacity(track_events.len() + 3);
        if index == 0 {
            let tempo = grid.tempo().micros_per_quarter();
            if tempo > MAX_U24 {
                return Err(ExportError::OutOfRange(format!("tempo {} us/quarter", tempo)));
            }
            let signature = grid.time_signature();
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo))),
            });
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                    signature.numerator,
                    signature.denominator_power(),
                    24,
                    8,
                )),
            });
        }

        let mut last_tick = 0u64;
        for event in track_events {
            let delta = event.tick - last_tick;
            last_tick = event.tick;
            track.push(TrackEvent {
                delta: delta_time(delta)?,
                kind: event_kind(&event.kind)?,
            });
        }

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
    }

    Ok(smf)
}

/// Write `events` to `path` as a Standard MIDI File
pub fn write_smf(
    path: &Path,
    events: &[TimelineEvent],
    grid: &MusicalGrid,
    track_count: usize,
) -> Result<(), ExportError> {
    let smf = build_smf(events, grid, track_count)?;
    let mut writer = BufWriter::new(File::create(path)?);
    smf.write_std(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// File name recording the run parameters and its start time
pub fn output_file_name(
    voice_count: usize,
    duration_seconds: u32,
    phase_count: usize,
    unix_timestamp: i64,
) -> String {
    format!(
        "thread_music_{}threads_{}sec_{}phases_{}.mid",
        voice_count, duration_seconds, phase_count, unix_timestamp
    )
}

/// Output path in `dir`, stamped with the current time
pub fn timestamped_output_path(
    dir: &Path,
    voice_count: usize,
    duration_seconds: u32,
    phase_count: usize,
) -> PathBuf {
    let now = chrono::Utc::now().timestamp();
    dir.join(output_file_name(voice_count, duration_seconds, phase_count, now))
}

fn delta_time(delta: u64) -> Result<u28, ExportError> {
    u32::try_from(delta)
        .ok()
        .filter(|d| *d <= MAX_U28)
        .map(u28::new)
        .ok_or_else(|| ExportError::OutOfRange(format!("delta time {}", delta)))
}

fn channel(value: u8) -> Result<u4, ExportError> {
    if value > 15 {
        return Err(ExportError::OutOfRange(format!("channel {}", value)));
    }
    Ok(u4::new(value))
}

fn data_byte(value: u8, what: &str) -> Result<u7, ExportError> {
    if value > 127 {
        return Err(ExportError::OutOfRange(format!("{} {}", what, value)));
    }
    Ok(u7::new(value))
}

fn event_kind(kind: &EventKind) -> Result<TrackEventKind<'_>, ExportError> {
    Ok(match kind {
        EventKind::TrackName(name) => {
            TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes()))
        }
        EventKind::Marker(label) => TrackEventKind::Meta(MetaMessage::Marker(label.as_bytes())),
        EventKind::PatchChange { channel: ch, program } => TrackEventKind::Midi {
            channel: channel(*ch)?,
            message: MidiMessage::ProgramChange {
                program: data_byte(*program, "program")?,
            },
        },
        EventKind::NoteOn {
            channel: ch,
            pitch,
            velocity,
        } => TrackEventKind::Midi {
            channel: channel(*ch)?,
            message: MidiMessage::NoteOn {
                key: data_byte(*pitch, "pitch")?,
                vel: data_byte(*velocity, "velocity")?,
            },
        },
        EventKind::NoteOff { channel: ch, pitch } => TrackEventKind::Midi {
            channel: channel(*ch)?,
            message: MidiMessage::NoteOff {
                key: data_byte(*pitch, "pitch")?,
                vel: u7::new(0),
            },
        },
    })
}
