//! Driver protocol between a scheduler and its external tick source.
//!
//! The host calls [`Scheduler::advance_time`](crate::scheduler::Scheduler::advance_time)
//! at a cadence it controls; the scheduler requests cadence changes through
//! this trait. `pause_ticking` asks for a single wake-up after the given
//! interval instead of per-frame ticks; the interval is a hint and the
//! source may wake earlier.

pub trait TickSource {
    /// Begin delivering ticks to the scheduler.
    fn start_ticking(&mut self);

    /// Stop delivering ticks; the scheduler has no registered jobs left.
    fn stop_ticking(&mut self);

    /// Switch to sleep-until-deadline mode: one wake-up in `interval_ms`.
    fn pause_ticking(&mut self, interval_ms: i64);

    /// Leave sleep mode and resume per-frame ticks.
    fn resume_ticking(&mut self);

    /// Elapsed-but-undelivered time, consumed when the scheduler forces its
    /// bookkeeping up to date. Sources that deliver every elapsed
    /// millisecond through `advance_time` can keep the default.
    fn take_pending_delta(&mut self) -> i64 {
        0
    }
}

/// Tick source for hosts that drive the scheduler unconditionally and
/// ignore cadence requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTickSource;

impl TickSource for NullTickSource {
    fn start_ticking(&mut self) {}
    fn stop_ticking(&mut self) {}
    fn pause_ticking(&mut self, _interval_ms: i64) {}
    fn resume_ticking(&mut self) {}
}
