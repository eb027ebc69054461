// Voice runner - The loop every voice thread executes
//
// sample -> step -> append -> burn -> yield, until the voice finishes or the
// stop signal is raised. The timeline lock is taken once per iteration and
// only for the batch the step produced.

use super::stop::StopSignal;
use super::voices::VoiceConfig;
use crate::midi::event::TimelineEvent;
use crate::midi::sink::TimelineSink;
use crate::scheduling::clock::VoiceClock;
use crate::scheduling::load::LoadGenerator;
use crate::scheduling::sampler::SchedulingSampler;
use crate::sequencer::timeline::MusicalGrid;
use crate::sequencer::voice::VoiceStep;
use std::sync::Arc;

/// What a voice did, for logging once it has been joined
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceReport {
    pub voice: usize,
    pub name: String,
    pub iterations: u64,
    /// Share of samples that read as scheduled
    pub scheduled_share: f64,
    /// Events appended, header events included
    pub events: usize,
    pub final_phase: usize,
    /// True if the stop signal ended the loop before the voice finished
    pub stopped: bool,
}

/// Drives one voice with its own clock and load generator
pub struct VoiceRunner<C: VoiceClock> {
    grid: MusicalGrid,
    threshold: f64,
    load: LoadGenerator,
    timeline: Arc<dyn TimelineSink>,
    stop: StopSignal,
    clock: C,
}

impl<C: VoiceClock> VoiceRunner<C> {
    pub fn new(
        grid: MusicalGrid,
        threshold: f64,
        load: LoadGenerator,
        timeline: Arc<dyn TimelineSink>,
        stop: StopSignal,
        clock: C,
    ) -> Self {
        Self {
            grid,
            threshold,
            load,
            timeline,
            stop,
            clock,
        }
    }

    /// Run `voice` to completion on the calling thread
    pub fn run(
        mut self,
        voice: VoiceConfig,
        duration_seconds: f64,
        phase_count: usize,
    ) -> VoiceReport {
        let id = voice.id;
        let track = voice.track;
        let channel = voice.channel;
        let name = voice.name.clone();

        let mut batch: Vec<TimelineEvent> =
            vec![TimelineEvent::track_name(track, 0, name.as_str())];
        if let Some(program) = voice.program {
            batch.push(TimelineEvent::patch_change(track, 0, channel, program));
        }
        let mut events = batch.len();
        self.timeline.append(&mut batch);

        let mut sequencer = voice.into_sequencer(self.grid, duration_seconds, phase_count);
        log::debug!(
            "Voice {} ({}) running for {:.2}s",
            id,
            name,
            sequencer.duration_seconds()
        );

        let mut sampler = SchedulingSampler::new(
            self.threshold,
            self.clock.wall_seconds(),
            self.clock.cpu_seconds(),
        );
        let mut stopped = false;

        loop {
            if self.stop.is_stopped() {
                stopped = true;
                break;
            }

            let wall = self.clock.wall_seconds();
            let cpu = self.clock.cpu_seconds();
            let sample = sampler.sample(wall, cpu);

            let step = sequencer.step(wall, sample.scheduled, &mut batch);
            events += batch.len();
            self.timeline.append(&mut batch);
            if step == VoiceStep::Finished {
                break;
            }

            self.load.burn();
            self.load.yield_now(&mut self.clock);
        }

        sequencer.finish(&mut batch);
        events += batch.len();
        self.timeline.append(&mut batch);

        let report = VoiceReport {
            voice: id,
            name,
            iterations: sampler.sample_count(),
            scheduled_share: sampler.scheduled_share(),
            events,
            final_phase: sequencer.phase(),
            stopped,
        };
        log::debug!(
            "Voice {} done: {} iterations, {:.1}% scheduled, {} events{}",
            report.voice,
            report.iterations,
            report.scheduled_share * 100.0,
            report.events,
            if report.stopped { " (stopped)" } else { "" }
        );
        report
    }
}
