// Voice clocks - Wall time and per-thread CPU time as seen by one voice
//
// CPU time only advances while the OS runs the thread on a core, wall time
// advances regardless. Comparing the two is how a voice notices it was
// descheduled.

use std::time::{Duration, Instant};

/// Time source driving one voice loop
///
/// `sleep` is the only place a voice gives up its core. Implementations other
/// than [`SystemClock`] exist so that whole voices can be replayed
/// deterministically.
pub trait VoiceClock: Send {
    /// Seconds of wall time since the voice started
    fn wall_seconds(&mut self) -> f64;

    /// Seconds of CPU time consumed by the calling thread
    fn cpu_seconds(&mut self) -> f64;

    /// Yield the core for `duration`
    fn sleep(&mut self, duration: Duration);
}

/// Real clocks: `Instant` for wall time, the thread CPU clock for CPU time
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    /// Start counting wall time now
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl VoiceClock for SystemClock {
    fn wall_seconds(&mut self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn cpu_seconds(&mut self) -> f64 {
        thread_cpu_time().as_secs_f64()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// CPU time consumed so far by the calling thread
///
/// Returns zero if the clock cannot be read; a voice then reads as never
/// scheduled rather than failing.
#[cfg(unix)]
pub fn thread_cpu_time() -> Duration {
    // SAFETY: timespec is plain old data, all-zero is a valid value
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    // SAFETY: ts is a valid, exclusively borrowed out-pointer for the call
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_THREAD_CPUTIME_ID, &mut ts) };
    if rc != 0 || ts.tv_sec < 0 || ts.tv_nsec < 0 {
        return Duration::ZERO;
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

/// No per-thread CPU clock on this platform
#[cfg(not(unix))]
pub fn thread_cpu_time() -> Duration {
    Duration::ZERO
}

/// Deterministic clock advancing one fixed step per loop iteration
///
/// `schedule(iteration)` decides whether the thread "ran" during that
/// iteration; if so CPU time advances by half the wall step, otherwise it
/// stays put.
pub struct SteppedClock {
    wall: f64,
    cpu: f64,
    step: f64,
    iteration: u64,
    schedule: Box<dyn FnMut(u64) -> bool + Send>,
}

impl SteppedClock {
    pub fn new(step: Duration, schedule: impl FnMut(u64) -> bool + Send + 'static) -> Self {
        Self {
            wall: 0.0,
            cpu: 0.0,
            step: step.as_secs_f64(),
            iteration: 0,
            schedule: Box::new(schedule),
        }
    }

    /// A thread the OS never takes off its core
    pub fn always_scheduled(step: Duration) -> Self {
        Self::new(step, |_| true)
    }

    /// Loop iterations completed so far
    pub fn iterations(&self) -> u64 {
        self.iteration
    }
}

impl VoiceClock for SteppedClock {
    fn wall_seconds(&mut self) -> f64 {
        self.wall
    }

    fn cpu_seconds(&mut self) -> f64 {
        self.cpu
    }

    fn sleep(&mut self, _duration: Duration) {
        let ran = (self.schedule)(self.iteration);
        self.iteration += 1;
        self.wall += self.step;
        if ran {
            self.cpu += self.step * 0.5;
        }
    }
}
