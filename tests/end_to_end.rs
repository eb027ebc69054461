// Integration test: whole sessions on simulated clocks
//
// Every voice gets a SteppedClock, so scheduling is scripted and the
// resulting timelines are deterministic apart from thread interleaving,
// which the final sort removes.

use std::time::Duration;
use thread_music::config::EngineSettings;
use thread_music::engine::VoicePart;
use thread_music::midi::{EventKind, TimelineEvent, build_smf, check_monophonic, write_smf};
use thread_music::sequencer::drum_key;
use thread_music::{Session, SessionConfig, SessionOutcome, SteppedClock};

fn config(voices: i64, seconds: i64, phases: i64) -> SessionConfig {
    SessionConfig {
        voice_count: voices,
        duration_seconds: seconds,
        phase_count: phases,
        seed: Some(2024),
        engine: EngineSettings {
            busy_work_min: 1,
            busy_work_max: 20,
            sleep_ms: 0,
            ..EngineSettings::default()
        },
        ..SessionConfig::default()
    }
}

fn run_scheduled(session: Session, schedule: fn(u64) -> bool) -> SessionOutcome {
    session
        .run_with_clocks(move |_| SteppedClock::new(Duration::from_millis(1), schedule))
        .expect("session should run")
}

fn note_ons(events: &[TimelineEvent], track: usize, key: u8) -> Vec<u64> {
    events
        .iter()
        .filter(|e| e.track == track)
        .filter(|e| matches!(e.kind, EventKind::NoteOn { pitch, .. } if pitch == key))
        .map(|e| e.tick)
        .collect()
}

fn markers(events: &[TimelineEvent], track: usize) -> Vec<(u64, String)> {
    events
        .iter()
        .filter(|e| e.track == track)
        .filter_map(|e| match &e.kind {
            EventKind::Marker(label) => Some((e.tick, label.clone())),
            _ => None,
        })
        .collect()
}

/// (start, end, pitch) of every note on a monophonic track
fn notes(events: &[TimelineEvent], track: usize) -> Vec<(u64, u64, u8)> {
    let mut open: Option<(u64, u8)> = None;
    let mut result = Vec::new();
    for event in events.iter().filter(|e| e.track == track) {
        match event.kind {
            EventKind::NoteOn { pitch, .. } => open = Some((event.tick, pitch)),
            EventKind::NoteOff { pitch, .. } => {
                let (start, on_pitch) = open.take().expect("note-off without note-on");
                assert_eq!(on_pitch, pitch);
                result.push((start, event.tick, pitch));
            }
            _ => {}
        }
    }
    result
}

#[test]
fn test_single_drum_voice_single_phase() {
    let session = Session::new(&config(1, 4, 1));
    let outcome = run_scheduled(session, |_| true);

    assert_eq!(outcome.track_count, 1);
    let events = &outcome.events;

    let kicks = note_ons(events, 0, drum_key::KICK);
    let snares = note_ons(events, 0, drum_key::SNARE);
    assert_eq!(&kicks[..2], &[0, 8 * 120]);
    assert_eq!(&snares[..2], &[4 * 120, 12 * 120]);
    assert_eq!(note_ons(events, 0, drum_key::CRASH), vec![0]);

    assert_eq!(
        markers(events, 0),
        vec![(0, "Phase 1".to_string()), (6400, "Original End".to_string())]
    );
    assert!(outcome.violations.is_empty());
}

#[test]
fn test_scheduled_melodic_voice_chains_its_phrase() {
    let session = Session::new(&config(2, 12, 1));
    let phrase = match &session.voices()[1].part {
        VoicePart::Melodic { snippets, .. } => snippets[0].notes().to_vec(),
        other => panic!("voice 1 should be melodic, got {:?}", other),
    };
    let boundary = session.melodic_clock().phase_end(0);
    assert_eq!(boundary, 19_200);

    let outcome = run_scheduled(session, |_| true);
    let played = notes(&outcome.events, 1);

    assert!(played.len() >= phrase.len(), "phrase not played through once");
    for (i, (start, end, pitch)) in played.iter().enumerate() {
        let expected = phrase[i % phrase.len()];
        assert_eq!(*pitch, expected.pitch);
        assert!(*end == start + expected.duration || *end == boundary);
        if i > 0 {
            // Each note starts where the previous one ended
            assert_eq!(*start, played[i - 1].1);
        }
    }
    assert!(check_monophonic(&outcome.events, 1).is_empty());
}

#[test]
fn test_intermittent_scheduling_keeps_pairing() {
    let session = Session::new(&config(5, 6, 3));
    let outcome = run_scheduled(session, |i| (i / 17) % 3 != 0);

    assert!(outcome.violations.is_empty(), "{:?}", outcome.violations);
    for track in 1..5 {
        assert!(check_monophonic(&outcome.events, track).is_empty());
        assert!(!notes(&outcome.events, track).is_empty());
    }
}

#[test]
fn test_phase_markers_per_voice() {
    let session = Session::new(&config(3, 6, 3));
    let melodic_total = session.melodic_clock().total_ticks();
    let outcome = run_scheduled(session, |i| i % 10 < 7);

    let drum_labels: Vec<String> = markers(&outcome.events, 0)
        .into_iter()
        .map(|(_, l)| l)
        .collect();
    assert_eq!(drum_labels, vec!["Phase 1", "Phase 2", "Phase 3", "Original End"]);

    for track in 1..3 {
        let found = markers(&outcome.events, track);
        let labels: Vec<&str> = found.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(labels, vec!["Phase 1", "Phase 2", "Phase 3", "Aligned End"]);
        assert_eq!(found[3].0, melodic_total);
        // Phase ticks are bar-aligned
        assert!(found[..3].iter().all(|(tick, _)| tick % 1920 == 0));
    }
}

#[test]
fn test_never_scheduled_melodic_voices_stay_silent() {
    let session = Session::new(&config(3, 2, 1));
    let outcome = run_scheduled(session, |_| false);

    assert!(outcome.events.iter().all(|e| e.track == 0 || !e.is_note_on()));
    // Drums are not gated by scheduling
    assert!(!note_ons(&outcome.events, 0, drum_key::KICK).is_empty());
}

#[test]
fn test_header_events_per_track() {
    let session = Session::new(&config(3, 1, 1));
    let outcome = run_scheduled(session, |_| true);

    let names: Vec<(usize, String)> = outcome
        .events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::TrackName(name) => Some((e.track, name.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&(0, "Drum Track".to_string())));
    assert!(names.contains(&(2, "Thread 2".to_string())));

    let patches = outcome
        .events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::PatchChange { .. }))
        .count();
    assert_eq!(patches, 2);
}

#[test]
fn test_export_round_trip_through_midly() {
    let session = Session::new(&config(3, 2, 2));
    let outcome = run_scheduled(session, |_| true);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.mid");
    write_smf(&path, &outcome.events, &outcome.grid, outcome.track_count).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let parsed = midly::Smf::parse(&bytes).unwrap();
    assert_eq!(parsed.header.format, midly::Format::Parallel);
    assert_eq!(parsed.tracks.len(), 3);

    let built = build_smf(&outcome.events, &outcome.grid, outcome.track_count).unwrap();
    assert_eq!(parsed.tracks, built.tracks);
}
