//! Change listeners: synchronous per-job notification subscribers.

use std::rc::Rc;

use bitflags::bitflags;

use crate::ids::JobId;
use crate::job::JobState;
use crate::scheduler::Scheduler;

bitflags! {
    /// Which notification kinds a subscription receives.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ChangeMask: u8 {
        const COMPLETION   = 0x01;
        const STATE_CHANGE = 0x02;
        const CURRENT_LOOP = 0x04;
    }
}

/// Subscriber interface for job notifications.
///
/// Callbacks fire synchronously, in subscription order, and receive mutable
/// access to the scheduler: a listener may control other jobs, unsubscribe,
/// or remove the very job it is being notified about. Dispatch re-checks the
/// job id after every callback, so removal simply cuts the remaining
/// notifications short.
///
/// Implementors keep their own state behind interior mutability (`Cell`,
/// `RefCell`); dispatch may legitimately re-enter the same listener.
pub trait JobChangeListener {
    fn job_finished(&self, scheduler: &mut Scheduler, job: JobId) {
        let _ = (scheduler, job);
    }

    fn job_state_changed(
        &self,
        scheduler: &mut Scheduler,
        job: JobId,
        new_state: JobState,
        old_state: JobState,
    ) {
        let _ = (scheduler, job, new_state, old_state);
    }

    fn job_current_loop_changed(&self, scheduler: &mut Scheduler, job: JobId, current_loop: i32) {
        let _ = (scheduler, job, current_loop);
    }
}

/// One subscription: a listener plus the kinds it asked for.
#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub(crate) listener: Rc<dyn JobChangeListener>,
    pub(crate) mask: ChangeMask,
}
