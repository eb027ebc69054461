// Shared Timeline - The one sink every voice thread appends to
//
// Appends happen under a single lock held only for the append itself. Voices
// sample their own clocks, so events arrive out of tick order; `finalize`
// restores the order once, after every voice has been joined.

use super::event::TimelineEvent;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Destination for timeline events
///
/// Methods take `&self`: implementations synchronise internally so one sink
/// can be shared by every voice thread.
pub trait TimelineSink: Send + Sync {
    /// Append a batch atomically, leaving `events` empty
    fn append(&self, events: &mut Vec<TimelineEvent>);

    /// Take every event appended so far, stably ordered by tick
    fn finalize(&self) -> Vec<TimelineEvent>;

    fn add_track_name(&self, track: usize, tick: u64, name: &str) {
        self.append(&mut vec![TimelineEvent::track_name(track, tick, name)]);
    }

    fn add_patch_change(&self, track: usize, tick: u64, channel: u8, program: u8) {
        self.append(&mut vec![TimelineEvent::patch_change(
            track, tick, channel, program,
        )]);
    }

    fn add_note_on(&self, track: usize, tick: u64, channel: u8, pitch: u8, velocity: u8) {
        self.append(&mut vec![TimelineEvent::note_on(
            track, tick, channel, pitch, velocity,
        )]);
    }

    fn add_note_off(&self, track: usize, tick: u64, channel: u8, pitch: u8) {
        self.append(&mut vec![TimelineEvent::note_off(track, tick, channel, pitch)]);
    }

    fn add_marker(&self, track: usize, tick: u64, label: &str) {
        self.append(&mut vec![TimelineEvent::marker(track, tick, label)]);
    }
}

/// Mutex-protected, append-only event list
#[derive(Debug, Default)]
pub struct SharedTimeline {
    events: Mutex<Vec<TimelineEvent>>,
}

impl SharedTimeline {
    /// Create an empty timeline ready to hand to voice threads
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of events appended and not yet finalized
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A voice that panicked mid-append cannot leave a half-written batch
    /// (`Vec::append` is all or nothing), so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, Vec<TimelineEvent>> {
        self.events.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            log::warn!("Timeline lock poisoned by a panicking voice, recovering");
            poisoned.into_inner()
        })
    }
}

impl TimelineSink for SharedTimeline {
    fn append(&self, events: &mut Vec<TimelineEvent>) {
        if events.is_empty() {
            return;
        }
        self.lock().append(events);
    }

    fn finalize(&self) -> Vec<TimelineEvent> {
        let mut events = std::mem::take(&mut *self.lock());
        sort_events(&mut events);
        events
    }
}

/// Stable sort by tick, same-tick ties broken by [`TimelineEvent::order_rank`]
pub fn sort_events(events: &mut [TimelineEvent]) {
    events.sort_by_key(|e| (e.tick, e.order_rank()));
}
