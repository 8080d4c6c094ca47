//! The scheduler: arena ownership, the job state machine driver, the
//! registration protocol, tick fan-out, and the idle-interval optimization.
//!
//! One scheduler per logical execution context. Everything runs
//! cooperatively on that context's thread: fan-out, pending-work
//! application, and every listener or hook callback execute synchronously,
//! and none of them may block.

use std::fmt;
use std::rc::Rc;

use slotmap::SlotMap;

use crate::config::Config;
use crate::error::ControlError;
use crate::events::SchedulerEvent;
use crate::ids::JobId;
use crate::job::{Direction, Job, JobKind, JobState};
use crate::listener::{ChangeMask, JobChangeListener, ListenerEntry};
use crate::tick_source::{NullTickSource, TickSource};

/// Per-job time-update callback: invoked with the loop-local time on every
/// applied update. The hook may control any job, including removing the one
/// it was called for; the scheduler re-checks liveness afterwards.
pub type UpdateHook = Rc<dyn Fn(&mut Scheduler, JobId, i64)>;

/// Registration state with the external tick source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriverState {
    Unregistered,
    Ticking,
    Sleeping,
}

pub struct Scheduler {
    cfg: Config,
    jobs: SlotMap<JobId, Job>,

    /// Top-level jobs receiving tick updates, in insertion order.
    running: Vec<JobId>,
    /// Jobs queued for the live set, applied at the next turn.
    pending_start: Vec<JobId>,
    /// Running pause-kind jobs, tracked for the wake-interval computation.
    running_pauses: Vec<JobId>,
    /// Running leaf-kind jobs (groups and pauses excluded).
    running_leaf_count: usize,

    last_tick: i64,
    last_delta: i64,

    /// Re-entrancy guard for the fan-out.
    inside_tick: bool,
    /// Shared fan-out cursor; unregistration during a fan-out adjusts it so
    /// no job is skipped or visited twice.
    current_job_idx: isize,

    /// Coalesced "apply pending starts" flag.
    start_pending: bool,
    /// Coalesced "stop the timer" flag, raised when the live set drains.
    stop_pending: bool,

    tick_source: Box<dyn TickSource>,
    driver_state: DriverState,

    events: Vec<SchedulerEvent>,
}

impl Scheduler {
    pub fn new(cfg: Config) -> Self {
        Self::with_tick_source(cfg, Box::new(NullTickSource))
    }

    pub fn with_tick_source(cfg: Config, tick_source: Box<dyn TickSource>) -> Self {
        Self {
            jobs: SlotMap::with_capacity_and_key(cfg.job_capacity),
            running: Vec::with_capacity(cfg.job_capacity),
            pending_start: Vec::new(),
            running_pauses: Vec::new(),
            running_leaf_count: 0,
            last_tick: 0,
            last_delta: 0,
            inside_tick: false,
            current_job_idx: 0,
            start_pending: false,
            stop_pending: false,
            tick_source,
            driver_state: DriverState::Unregistered,
            events: Vec::new(),
            cfg,
        }
    }

    // =========================================================================
    // Arena
    // =========================================================================

    pub fn add_job(&mut self, kind: JobKind) -> JobId {
        self.jobs.insert(Job::new(kind))
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Remove a job from the arena. A running job is deregistered exactly as
    /// an explicit `stop()` would deregister it, state-change listeners are
    /// notified, and a group takes its children with it. Returns false if
    /// the id no longer resolves.
    pub fn remove_job(&mut self, id: JobId) -> bool {
        let Some(job) = self.jobs.get(id) else {
            return false;
        };
        let children: Vec<JobId> = match &job.kind {
            JobKind::Group { children, .. } => children.clone(),
            _ => Vec::new(),
        };
        let old_state = job.state;

        if old_state != JobState::Stopped {
            self.jobs[id].state = JobState::Stopped;
            self.notify_state_changed(id, JobState::Stopped, old_state);
            if !self.jobs.contains_key(id) {
                // A listener already removed it; children went with it too.
                return true;
            }
            if old_state == JobState::Running {
                self.unregister_animation(id);
            }
        }

        if let Some(parent) = self.jobs[id].group {
            self.detach_child(parent, id);
        }
        self.jobs.remove(id);

        for child in children {
            self.remove_job(child);
        }
        true
    }

    /// Remove every job and reset all bookkeeping. No notifications fire;
    /// this is wholesale teardown, not a sequence of stops.
    pub fn clear(&mut self) {
        self.jobs.clear();
        self.running.clear();
        self.pending_start.clear();
        self.running_pauses.clear();
        self.running_leaf_count = 0;
        self.start_pending = false;
        self.stop_pending = false;
        self.events.clear();
        if self.driver_state != DriverState::Unregistered {
            if self.driver_state == DriverState::Sleeping {
                self.tick_source.resume_ticking();
            }
            self.tick_source.stop_ticking();
            self.driver_state = DriverState::Unregistered;
        }
        self.last_tick = 0;
        self.last_delta = 0;
    }

    // =========================================================================
    // Grouping
    // =========================================================================

    /// Attach `child` to a group job. Detaches from any previous parent.
    pub fn attach_to_group(&mut self, child: JobId, group: JobId) -> Result<(), ControlError> {
        if !self.jobs.contains_key(child) || !self.jobs.contains_key(group) {
            return Err(ControlError::UnknownJob);
        }
        if child == group || !self.jobs[group].kind.is_group() {
            return Err(ControlError::NotAGroup);
        }
        self.detach_from_group(child);
        self.jobs[child].group = Some(group);
        if let JobKind::Group { children, .. } = &mut self.jobs[group].kind {
            children.push(child);
        }
        Ok(())
    }

    pub fn detach_from_group(&mut self, child: JobId) {
        let Some(parent) = self.jobs.get(child).and_then(|j| j.group) else {
            return;
        };
        self.detach_child(parent, child);
        self.jobs[child].group = None;
    }

    fn detach_child(&mut self, parent: JobId, child: JobId) {
        if let Some(JobKind::Group { children, .. }) =
            self.jobs.get_mut(parent).map(|j| &mut j.kind)
        {
            children.retain(|&c| c != child);
        }
    }

    /// A job is top-level when it has no (live) parent or its parent is
    /// stopped. Only top-level jobs enter the fan-out lists; the rest are
    /// driven through their parents.
    pub fn is_top_level(&self, id: JobId) -> bool {
        match self.jobs.get(id).and_then(|j| j.group) {
            None => true,
            Some(parent) => self
                .jobs
                .get(parent)
                .is_none_or(|p| p.state == JobState::Stopped),
        }
    }

    // =========================================================================
    // Listeners and hooks
    // =========================================================================

    pub fn add_change_listener(
        &mut self,
        id: JobId,
        listener: Rc<dyn JobChangeListener>,
        mask: ChangeMask,
    ) -> Result<(), ControlError> {
        let job = self.jobs.get_mut(id).ok_or(ControlError::UnknownJob)?;
        job.listeners.push(ListenerEntry { listener, mask });
        Ok(())
    }

    /// Remove the first subscription matching this listener and mask.
    pub fn remove_change_listener(
        &mut self,
        id: JobId,
        listener: &Rc<dyn JobChangeListener>,
        mask: ChangeMask,
    ) -> bool {
        let Some(job) = self.jobs.get_mut(id) else {
            return false;
        };
        let pos = job
            .listeners
            .iter()
            .position(|e| Rc::ptr_eq(&e.listener, listener) && e.mask == mask);
        match pos {
            Some(pos) => {
                job.listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn set_update_hook<F>(&mut self, id: JobId, hook: F) -> Result<(), ControlError>
    where
        F: Fn(&mut Scheduler, JobId, i64) + 'static,
    {
        let job = self.jobs.get_mut(id).ok_or(ControlError::UnknownJob)?;
        job.update_hook = Some(Rc::new(hook));
        Ok(())
    }

    pub fn clear_update_hook(&mut self, id: JobId) {
        if let Some(job) = self.jobs.get_mut(id) {
            job.update_hook = None;
        }
    }

    // =========================================================================
    // Job control
    // =========================================================================

    pub fn start(&mut self, id: JobId) {
        let Some(job) = self.jobs.get(id) else {
            return;
        };
        if job.user_control_disabled || job.state == JobState::Running {
            return;
        }
        self.set_state(id, JobState::Running);
    }

    pub fn stop(&mut self, id: JobId) {
        let Some(job) = self.jobs.get(id) else {
            return;
        };
        if job.user_control_disabled || job.state == JobState::Stopped {
            return;
        }
        self.set_state(id, JobState::Stopped);
    }

    pub fn pause(&mut self, id: JobId) -> Result<(), ControlError> {
        let job = self.jobs.get(id).ok_or(ControlError::UnknownJob)?;
        if job.user_control_disabled {
            return Ok(());
        }
        if job.state == JobState::Stopped {
            return Err(ControlError::PauseWhileStopped);
        }
        self.set_state(id, JobState::Paused);
        Ok(())
    }

    pub fn resume(&mut self, id: JobId) -> Result<(), ControlError> {
        let job = self.jobs.get(id).ok_or(ControlError::UnknownJob)?;
        if job.user_control_disabled {
            return Ok(());
        }
        if job.state != JobState::Paused {
            return Err(ControlError::ResumeWhileNotPaused);
        }
        self.set_state(id, JobState::Running);
        Ok(())
    }

    pub fn set_loop_count(&mut self, id: JobId, loop_count: i32) {
        if let Some(job) = self.jobs.get_mut(id) {
            job.loop_count = loop_count;
        }
    }

    pub fn set_duration(&mut self, id: JobId, duration_ms: i64) -> Result<(), ControlError> {
        let job = self.jobs.get_mut(id).ok_or(ControlError::UnknownJob)?;
        let valid = match job.kind {
            JobKind::Pause { .. } => duration_ms >= 0,
            _ => duration_ms >= -1,
        };
        if !valid {
            return Err(ControlError::InvalidDuration(duration_ms));
        }
        match &mut job.kind {
            JobKind::Leaf { duration }
            | JobKind::Pause { duration }
            | JobKind::Group { duration, .. } => *duration = duration_ms,
        }
        Ok(())
    }

    pub fn set_direction(&mut self, id: JobId, direction: Direction) {
        let Some(job) = self.jobs.get_mut(id) else {
            return;
        };
        if job.direction == direction {
            return;
        }
        if job.state == JobState::Stopped {
            // Position a stopped job for the new direction so queries before
            // the next start() read sensibly.
            if direction == Direction::Backward {
                job.current_time = job.duration().max(0);
                job.current_loop = (job.loop_count - 1).max(0);
            } else {
                job.current_time = 0;
                job.current_loop = 0;
            }
        }
        let registered = job.timer_registered;
        // Deliver any undelivered time under the old direction first.
        if registered {
            self.ensure_timer_update();
        }
        let Some(job) = self.jobs.get_mut(id) else {
            return;
        };
        job.direction = direction;
        // The sleep interval of a pause job depends on its direction.
        if registered {
            self.restart_timer();
        }
    }

    /// Make the job scheduler-driven only: external `start`/`stop`/`pause`/
    /// `resume` become no-ops and the job stays out of the fan-out
    /// bookkeeping. The job is parked in `Paused` so an external driver can
    /// feed it time directly.
    pub fn set_user_control_disabled(&mut self, id: JobId) {
        let Some(job) = self.jobs.get_mut(id) else {
            return;
        };
        job.user_control_disabled = true;
        self.set_state(id, JobState::Running);
        self.set_state(id, JobState::Paused);
    }

    pub fn set_user_control_enabled(&mut self, id: JobId) {
        if let Some(job) = self.jobs.get_mut(id) {
            job.user_control_disabled = false;
        }
    }

    /// Raw state transition. External control normally goes through
    /// `start`/`stop`/`pause`/`resume`; this is the entry point for
    /// scheduler-driven jobs and for hosts that manage state directly.
    pub fn set_state(&mut self, id: JobId, new_state: JobState) {
        let old_state;
        let old_current_time;
        let old_current_loop;
        let old_direction;
        let dura;
        let loops;
        {
            let Some(job) = self.jobs.get_mut(id) else {
                return;
            };
            if job.state == new_state {
                return;
            }
            // A zero loop count is a designed no-op job, never an error.
            if job.loop_count == 0 {
                return;
            }
            old_state = job.state;
            old_current_time = job.current_time;
            old_current_loop = job.current_loop;
            old_direction = job.direction;
            dura = job.duration();
            loops = job.loop_count;

            // Leaving Stopped rewinds to the start for the current
            // direction. Done directly rather than through set_current_time:
            // applying the time now would run hooks before registration.
            if new_state != JobState::Stopped && old_state == JobState::Stopped {
                let rewound = match job.direction {
                    Direction::Forward => 0,
                    Direction::Backward => {
                        if loops < 0 {
                            dura.max(0)
                        } else {
                            job.total_duration().max(0)
                        }
                    }
                };
                job.total_current_time = rewound;
                job.current_time = rewound;
            }

            job.state = new_state;
        }

        let is_top_level = self.is_top_level(id);
        let has_group = self.jobs[id].group.is_some();

        // Timer (de)registration must settle before any callback observes
        // the new state.
        if old_state == JobState::Running {
            if new_state == JobState::Paused && self.jobs[id].timer_registered {
                self.ensure_timer_update();
            }
            self.unregister_animation(id);
        } else if new_state == JobState::Running {
            self.register_animation(id, is_top_level);
        }

        // Starting a parentless job counts as a top-level loop change.
        if new_state == JobState::Running && old_state == JobState::Stopped && !has_group {
            self.push_event(SchedulerEvent::TopLevelLoopChanged { job: id });
        }

        self.notify_state_changed(id, new_state, old_state);

        // A listener may have removed the job or moved it to another state;
        // in either case the remaining side effects of this transition no
        // longer apply.
        let Some(job) = self.jobs.get(id) else {
            return;
        };
        if job.state != new_state {
            return;
        }

        match new_state {
            JobState::Paused => {}
            JobState::Running => {
                if old_state == JobState::Stopped && is_top_level {
                    self.ensure_timer_update();
                    let total = self.jobs[id].total_current_time;
                    self.set_current_time(id, total);
                }
            }
            JobState::Stopped => {
                let exhausted = dura == -1
                    || loops < 0
                    || (old_direction == Direction::Forward
                        && old_current_time * (old_current_loop as i64 + 1)
                            == dura * loops as i64)
                    || (old_direction == Direction::Backward && old_current_time == 0);
                if exhausted {
                    self.notify_finished(id);
                }
            }
        }
    }

    /// Seek the job to a cumulative elapsed time (milliseconds across all
    /// loops). This is also the per-tick entry point used by the fan-out.
    pub fn set_current_time(&mut self, id: JobId, msecs: i64) {
        let loop_changed;
        let new_loop;
        let loop_time;
        let top_level;
        let total_dura;
        {
            let Some(job) = self.jobs.get_mut(id) else {
                return;
            };
            let dura = job.duration();
            total_dura = if dura <= 0 {
                dura
            } else if job.loop_count < 0 {
                -1
            } else {
                dura * job.loop_count as i64
            };
            let mut msecs = msecs.max(0);
            if total_dura != -1 {
                msecs = msecs.min(total_dura);
            }
            job.total_current_time = msecs;

            let old_loop = job.current_loop;
            job.current_loop = if dura <= 0 { 0 } else { (msecs / dura) as i32 };
            if job.current_loop == job.loop_count {
                // Playback reached the exact end of the last loop: pin to
                // the end of the final iteration.
                job.current_time = dura.max(0);
                job.current_loop = (job.loop_count - 1).max(0);
            } else {
                match job.direction {
                    Direction::Forward => {
                        job.current_time = if dura <= 0 { msecs } else { msecs % dura };
                    }
                    Direction::Backward => {
                        // Mirror of the forward modulo: a backward job sits
                        // at `duration`, not 0, on loop boundaries.
                        job.current_time = if dura <= 0 {
                            msecs
                        } else {
                            ((msecs - 1) % dura) + 1
                        };
                        if job.current_time == dura {
                            job.current_loop -= 1;
                        }
                    }
                }
            }

            loop_changed = job.current_loop != old_loop;
            new_loop = job.current_loop;
            loop_time = job.current_time;
            top_level = job.group.is_none();
        }

        if loop_changed && top_level {
            self.push_event(SchedulerEvent::TopLevelLoopChanged { job: id });
        }

        // The hook may remove the job; everything below re-checks liveness.
        self.dispatch_update_hook(id, loop_time);
        if !self.jobs.contains_key(id) {
            return;
        }

        if loop_changed {
            self.notify_current_loop_changed(id, new_loop);
            if !self.jobs.contains_key(id) {
                return;
            }
        }

        // Every job stops itself at its own natural end; the scheduler never
        // stops jobs on their behalf.
        let job = &self.jobs[id];
        if (job.direction == Direction::Forward && job.total_current_time == total_dura)
            || (job.direction == Direction::Backward && job.total_current_time == 0)
        {
            self.set_state(id, JobState::Stopped);
        }
    }

    // =========================================================================
    // Tick fan-out
    // =========================================================================

    /// One scheduler turn: drain pending registration work, fan the delta
    /// out to every live job, then drain again so requests made by callbacks
    /// settle before returning. A re-entrant call from inside the fan-out is
    /// a no-op. `advance_time(0)` is a valid drain-only turn.
    pub fn advance_time(&mut self, delta_ms: i64) {
        if self.inside_tick {
            return;
        }
        self.process_pending();
        self.fan_out_delta(delta_ms);
        self.process_pending();
    }

    fn fan_out_delta(&mut self, delta: i64) {
        if self.inside_tick {
            return;
        }
        self.last_tick += delta;
        self.last_delta = delta;
        // Skip the pass entirely when time has not moved; delayed delivery
        // under load can produce zero deltas.
        if delta == 0 {
            return;
        }
        self.inside_tick = true;
        self.current_job_idx = 0;
        while (self.current_job_idx as usize) < self.running.len() {
            let id = self.running[self.current_job_idx as usize];
            if let Some(job) = self.jobs.get(id) {
                let elapsed = match job.direction {
                    Direction::Forward => job.total_current_time + delta,
                    Direction::Backward => job.total_current_time - delta,
                };
                self.set_current_time(id, elapsed);
            }
            self.current_job_idx += 1;
        }
        self.inside_tick = false;
        self.current_job_idx = 0;
    }

    fn process_pending(&mut self) {
        if self.start_pending {
            self.apply_pending_starts();
        }
        if self.stop_pending {
            self.apply_pending_stop();
        }
    }

    fn apply_pending_starts(&mut self) {
        self.start_pending = false;
        // Deliver undelivered time to the jobs that were already live, so
        // the batch starting this turn does not absorb a large stale delta.
        if !self.running.is_empty() {
            let stale = self.tick_source.take_pending_delta();
            if stale != 0 {
                self.fan_out_delta(stale);
            }
        }
        debug_assert!(
            self.pending_start.iter().all(|id| !self.running.contains(id)),
            "job queued for start is already live"
        );
        log::trace!(
            "applying {} pending start(s) to {} live job(s)",
            self.pending_start.len(),
            self.running.len()
        );
        self.running.append(&mut self.pending_start);
        if self.running.is_empty() {
            // Every queued start was retracted before its turn; release the
            // tick source instead of ticking an empty scheduler.
            if self.driver_state != DriverState::Unregistered && !self.stop_pending {
                self.stop_pending = true;
            }
        } else {
            self.restart_timer();
        }
    }

    fn apply_pending_stop(&mut self) {
        self.stop_pending = false;
        if !self.running.is_empty() {
            return;
        }
        log::debug!("live set drained, releasing the tick source");
        if self.driver_state == DriverState::Sleeping {
            self.tick_source.resume_ticking();
        }
        if self.driver_state != DriverState::Unregistered {
            self.tick_source.stop_ticking();
            self.driver_state = DriverState::Unregistered;
        }
        // Invalidate the start reference time.
        self.last_tick = 0;
        self.last_delta = 0;
    }

    // =========================================================================
    // Registration protocol
    // =========================================================================

    fn register_animation(&mut self, id: JobId, is_top_level: bool) {
        if self.jobs[id].user_control_disabled {
            return;
        }
        self.register_running(id);
        if is_top_level {
            let job = &mut self.jobs[id];
            debug_assert!(!job.timer_registered, "job is already queued with the timer");
            job.timer_registered = true;
            self.pending_start.push(id);
            if !self.start_pending {
                self.start_pending = true;
                // The application itself stays coalesced; the tick source
                // only needs to be awake enough to deliver the next turn.
                self.wake_tick_source();
            }
        }
    }

    fn unregister_animation(&mut self, id: JobId) {
        self.unregister_running(id);
        let job = &mut self.jobs[id];
        if !job.timer_registered {
            return;
        }
        job.timer_registered = false;

        if let Some(idx) = self.running.iter().position(|&j| j == id) {
            self.running.remove(idx);
            // Keep an in-progress fan-out consistent: removing at or before
            // the cursor shifts the unvisited tail left by one.
            if idx as isize <= self.current_job_idx {
                self.current_job_idx -= 1;
            }
            if self.running.is_empty() && !self.stop_pending {
                self.stop_pending = true;
            }
        } else if let Some(idx) = self.pending_start.iter().position(|&j| j == id) {
            self.pending_start.remove(idx);
        }
    }

    fn register_running(&mut self, id: JobId) {
        let job = &self.jobs[id];
        debug_assert!(!job.user_control_disabled);
        match job.kind {
            JobKind::Group { .. } => {}
            JobKind::Pause { .. } => self.running_pauses.push(id),
            JobKind::Leaf { .. } => self.running_leaf_count += 1,
        }
    }

    fn unregister_running(&mut self, id: JobId) {
        let job = &self.jobs[id];
        if job.user_control_disabled {
            return;
        }
        match job.kind {
            JobKind::Group { .. } => {}
            JobKind::Pause { .. } => {
                if let Some(pos) = self.running_pauses.iter().position(|&j| j == id) {
                    self.running_pauses.remove(pos);
                }
            }
            JobKind::Leaf { .. } => {
                debug_assert!(self.running_leaf_count > 0, "leaf bookkeeping underflow");
                self.running_leaf_count = self.running_leaf_count.saturating_sub(1);
            }
        }
    }

    // =========================================================================
    // Driver protocol
    // =========================================================================

    /// Decide what to ask of the tick source given the current job mix:
    /// sleep until the nearest pause deadline when only idle jobs remain,
    /// otherwise make sure per-frame ticks are flowing.
    fn restart_timer(&mut self) {
        if self.running_leaf_count == 0 && !self.running_pauses.is_empty() {
            let interval = self.closest_pause_time_to_finish();
            log::debug!("only idle jobs remain, sleeping {interval}ms until the nearest deadline");
            self.tick_source.pause_ticking(interval);
            self.driver_state = DriverState::Sleeping;
        } else if self.driver_state == DriverState::Sleeping {
            log::debug!("active jobs present, resuming per-frame ticks");
            self.tick_source.resume_ticking();
            self.driver_state = DriverState::Ticking;
        } else if self.driver_state == DriverState::Unregistered {
            log::debug!("registering with the tick source");
            self.tick_source.start_ticking();
            self.driver_state = DriverState::Ticking;
        }
    }

    /// Minimum remaining time across idle jobs, `i64::MAX` when none.
    fn closest_pause_time_to_finish(&self) -> i64 {
        let mut closest = i64::MAX;
        for &id in &self.running_pauses {
            let Some(job) = self.jobs.get(id) else {
                continue;
            };
            let time_to_finish = match job.direction {
                Direction::Forward => job.duration() - job.current_time,
                Direction::Backward => job.current_time,
            };
            closest = closest.min(time_to_finish);
        }
        closest
    }

    /// Force tick bookkeeping up to date by consuming the source's
    /// undelivered time. Only meaningful while sleeping: per-frame ticks
    /// deliver continuously, but a sleeping scheduler accumulates elapsed
    /// time that pause/current-time queries must not miss.
    fn ensure_timer_update(&mut self) {
        if self.driver_state == DriverState::Sleeping {
            let delta = self.tick_source.take_pending_delta();
            if delta != 0 {
                self.fan_out_delta(delta);
            }
        }
    }

    fn wake_tick_source(&mut self) {
        match self.driver_state {
            DriverState::Unregistered => {
                log::debug!("registering with the tick source");
                self.tick_source.start_ticking();
                self.driver_state = DriverState::Ticking;
            }
            DriverState::Sleeping => {
                log::debug!("waking the tick source from idle sleep");
                self.tick_source.resume_ticking();
                self.driver_state = DriverState::Ticking;
            }
            DriverState::Ticking => {}
        }
    }

    // =========================================================================
    // Notification dispatch
    // =========================================================================

    fn dispatch_update_hook(&mut self, id: JobId, loop_time: i64) {
        let hook = self.jobs.get(id).and_then(|j| j.update_hook.clone());
        if let Some(hook) = hook {
            (*hook)(self, id, loop_time);
        }
    }

    fn notify_state_changed(&mut self, id: JobId, new_state: JobState, old_state: JobState) {
        let Some(job) = self.jobs.get(id) else {
            return;
        };
        let entries = job.listeners.clone();
        for entry in entries {
            if entry.mask.contains(ChangeMask::STATE_CHANGE) {
                entry
                    .listener
                    .job_state_changed(self, id, new_state, old_state);
                if !self.jobs.contains_key(id) {
                    return;
                }
            }
        }
    }

    fn notify_current_loop_changed(&mut self, id: JobId, current_loop: i32) {
        let Some(job) = self.jobs.get(id) else {
            return;
        };
        let entries = job.listeners.clone();
        for entry in entries {
            if entry.mask.contains(ChangeMask::CURRENT_LOOP) {
                entry.listener.job_current_loop_changed(self, id, current_loop);
                if !self.jobs.contains_key(id) {
                    return;
                }
            }
        }
    }

    fn notify_finished(&mut self, id: JobId) {
        let Some(job) = self.jobs.get(id) else {
            return;
        };
        let entries = job.listeners.clone();
        for entry in entries {
            if entry.mask.contains(ChangeMask::COMPLETION) {
                entry.listener.job_finished(self, id);
                if !self.jobs.contains_key(id) {
                    return;
                }
            }
        }
        let (group, uncontrolled) = {
            let Some(job) = self.jobs.get(id) else {
                return;
            };
            (job.group, job.duration() == -1 || job.loop_count < 0)
        };
        if let Some(group) = group {
            if uncontrolled && self.jobs.contains_key(group) {
                self.push_event(SchedulerEvent::UncontrolledFinished { group, job: id });
            }
        }
    }

    fn push_event(&mut self, event: SchedulerEvent) {
        if self.events.len() >= self.cfg.max_events_per_turn {
            log::warn!("scheduler event buffer full, dropping {event:?}");
            return;
        }
        self.events.push(event);
    }

    /// Drain the buffered scheduler events.
    pub fn take_events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn running_job_count(&self) -> usize {
        self.running.len()
    }

    pub fn pending_start_count(&self) -> usize {
        self.pending_start.len()
    }

    pub fn running_leaf_count(&self) -> usize {
        self.running_leaf_count
    }

    pub fn idle_job_count(&self) -> usize {
        self.running_pauses.len()
    }

    /// Accumulated time delivered since the live set last became empty.
    pub fn last_tick(&self) -> i64 {
        self.last_tick
    }

    /// The delta of the most recent fan-out.
    pub fn last_delta(&self) -> i64 {
        self.last_delta
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.jobs.len())
            .field("running", &self.running.len())
            .field("pending_start", &self.pending_start.len())
            .field("running_pauses", &self.running_pauses.len())
            .field("running_leaf_count", &self.running_leaf_count)
            .field("last_tick", &self.last_tick)
            .field("driver_state", &self.driver_state)
            .finish_non_exhaustive()
    }
}
