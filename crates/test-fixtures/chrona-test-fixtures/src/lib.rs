//! Shared test support for the chrona crates: a recording tick source that
//! captures the driver-protocol request stream, and listener fixtures that
//! count or script notifications.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrona_animation_core::{JobChangeListener, JobId, JobState, Scheduler, TickSource};

/// One request the scheduler made of its tick source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickRequest {
    Start,
    Stop,
    Pause(i64),
    Resume,
}

/// Shared view into a [`RecordingTickSource`], held by the test while the
/// scheduler owns the source itself.
#[derive(Clone, Default)]
pub struct TickSourceHandle {
    requests: Rc<RefCell<Vec<TickRequest>>>,
    pending_delta: Rc<Cell<i64>>,
}

impl TickSourceHandle {
    /// All requests made so far, oldest first.
    pub fn requests(&self) -> Vec<TickRequest> {
        self.requests.borrow().clone()
    }

    pub fn last_request(&self) -> Option<TickRequest> {
        self.requests.borrow().last().copied()
    }

    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }

    /// Stage elapsed-but-undelivered time for the scheduler's next forced
    /// bookkeeping sync.
    pub fn set_pending_delta(&self, delta_ms: i64) {
        self.pending_delta.set(delta_ms);
    }

    pub fn pending_delta(&self) -> i64 {
        self.pending_delta.get()
    }
}

/// Tick source that records every request and hands out a staged pending
/// delta exactly once.
#[derive(Default)]
pub struct RecordingTickSource {
    handle: TickSourceHandle,
}

impl RecordingTickSource {
    pub fn new() -> (Self, TickSourceHandle) {
        let source = Self::default();
        let handle = source.handle.clone();
        (source, handle)
    }
}

impl TickSource for RecordingTickSource {
    fn start_ticking(&mut self) {
        self.handle.requests.borrow_mut().push(TickRequest::Start);
    }

    fn stop_ticking(&mut self) {
        self.handle.requests.borrow_mut().push(TickRequest::Stop);
    }

    fn pause_ticking(&mut self, interval_ms: i64) {
        self.handle
            .requests
            .borrow_mut()
            .push(TickRequest::Pause(interval_ms));
    }

    fn resume_ticking(&mut self) {
        self.handle.requests.borrow_mut().push(TickRequest::Resume);
    }

    fn take_pending_delta(&mut self) -> i64 {
        self.handle.pending_delta.replace(0)
    }
}

/// Listener that counts notifications and records transition history.
#[derive(Default)]
pub struct CountingListener {
    pub finished: Cell<u32>,
    pub state_changes: RefCell<Vec<(JobState, JobState)>>,
    pub loop_changes: RefCell<Vec<i32>>,
}

impl CountingListener {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

impl JobChangeListener for CountingListener {
    fn job_finished(&self, _scheduler: &mut Scheduler, _job: JobId) {
        self.finished.set(self.finished.get() + 1);
    }

    fn job_state_changed(
        &self,
        _scheduler: &mut Scheduler,
        _job: JobId,
        new_state: JobState,
        old_state: JobState,
    ) {
        self.state_changes.borrow_mut().push((new_state, old_state));
    }

    fn job_current_loop_changed(&self, _scheduler: &mut Scheduler, _job: JobId, current_loop: i32) {
        self.loop_changes.borrow_mut().push(current_loop);
    }
}

/// Listener adapter that runs a closure on every state change.
pub struct OnStateChanged<F>(pub F);

impl<F> JobChangeListener for OnStateChanged<F>
where
    F: Fn(&mut Scheduler, JobId, JobState, JobState),
{
    fn job_state_changed(
        &self,
        scheduler: &mut Scheduler,
        job: JobId,
        new_state: JobState,
        old_state: JobState,
    ) {
        (self.0)(scheduler, job, new_state, old_state);
    }
}

/// Listener adapter that runs a closure on completion.
pub struct OnFinished<F>(pub F);

impl<F> JobChangeListener for OnFinished<F>
where
    F: Fn(&mut Scheduler, JobId),
{
    fn job_finished(&self, scheduler: &mut Scheduler, job: JobId) {
        (self.0)(scheduler, job);
    }
}
