// Scheduling module
// Self-observed scheduling detection and the load that provokes it

pub mod clock;
pub mod load;
pub mod sampler;

pub use clock::{SteppedClock, SystemClock, VoiceClock, thread_cpu_time};
pub use load::{LoadGenerator, LoadProfile};
pub use sampler::{
    DEFAULT_SCHEDULE_THRESHOLD, SchedulingSample, SchedulingSampler, is_scheduled,
    scheduling_ratio,
};
