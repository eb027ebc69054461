// MIDI module
// Timeline events, the shared sink, pairing checks and file export

pub mod event;
pub mod export;
pub mod sink;
pub mod validate;

pub use event::{EventKind, TimelineEvent};
pub use export::{ExportError, build_smf, output_file_name, timestamped_output_path, write_smf};
pub use sink::{SharedTimeline, TimelineSink, sort_events};
pub use validate::{PairingError, PairingViolation, check_monophonic, check_note_pairing};
