//! The job data model: one playable timeline.
//!
//! Jobs live in a scheduler's arena and are driven through scheduler
//! methods; this module holds the plain data plus the pure time math.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::JobId;
use crate::listener::ListenerEntry;
use crate::scheduler::UpdateHook;

/// Lifecycle phase of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Stopped,
    Paused,
    Running,
}

/// Sign of time progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

/// What a job is, as a closed variant.
///
/// Durations are in milliseconds. `-1` means the duration is uncontrolled:
/// known only by an external signal, as with a child-driven group. Pause
/// durations are always finite.
#[derive(Clone, Debug)]
pub enum JobKind {
    /// A concrete time-driven animation.
    Leaf { duration: i64 },
    /// A pure time delay with no per-frame work; tracked for the
    /// wake-interval optimization instead of per-tick updates.
    Pause { duration: i64 },
    /// A container job. Children are scheduled through their parent by
    /// external group machinery; the scheduler itself only uses the
    /// relation to decide which jobs are top-level.
    Group { children: Vec<JobId>, duration: i64 },
}

impl JobKind {
    pub fn leaf(duration_ms: i64) -> Self {
        JobKind::Leaf {
            duration: duration_ms.max(-1),
        }
    }

    pub fn pause(duration_ms: i64) -> Self {
        JobKind::Pause {
            duration: duration_ms.max(0),
        }
    }

    pub fn group() -> Self {
        JobKind::Group {
            children: Vec::new(),
            duration: -1,
        }
    }

    /// Duration of one loop in milliseconds, `-1` when uncontrolled.
    pub fn duration(&self) -> i64 {
        match self {
            JobKind::Leaf { duration }
            | JobKind::Pause { duration }
            | JobKind::Group { duration, .. } => *duration,
        }
    }

    pub fn is_pause(&self) -> bool {
        matches!(self, JobKind::Pause { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, JobKind::Group { .. })
    }
}

/// One playable timeline tracked by a scheduler.
pub struct Job {
    pub(crate) kind: JobKind,
    pub(crate) state: JobState,
    pub(crate) direction: Direction,
    pub(crate) loop_count: i32,
    pub(crate) total_current_time: i64,
    pub(crate) current_time: i64,
    pub(crate) current_loop: i32,
    pub(crate) group: Option<JobId>,
    pub(crate) timer_registered: bool,
    pub(crate) user_control_disabled: bool,
    pub(crate) listeners: Vec<ListenerEntry>,
    pub(crate) update_hook: Option<UpdateHook>,
}

impl Job {
    pub(crate) fn new(kind: JobKind) -> Self {
        Self {
            kind,
            state: JobState::Stopped,
            direction: Direction::Forward,
            loop_count: 1,
            total_current_time: 0,
            current_time: 0,
            current_loop: 0,
            group: None,
            timer_registered: false,
            user_control_disabled: false,
            listeners: Vec::new(),
            update_hook: None,
        }
    }

    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Repetition count: `-1` (or any negative value) loops forever, `0` is
    /// a designed no-op job that never leaves `Stopped`.
    pub fn loop_count(&self) -> i32 {
        self.loop_count
    }

    /// Duration of one loop, `-1` when uncontrolled.
    pub fn duration(&self) -> i64 {
        self.kind.duration()
    }

    /// Duration across all loops: the plain duration when it is zero or
    /// uncontrolled, `-1` when looping forever, else `duration * loop_count`.
    pub fn total_duration(&self) -> i64 {
        let dura = self.duration();
        if dura <= 0 {
            return dura;
        }
        if self.loop_count < 0 {
            return -1;
        }
        dura * self.loop_count as i64
    }

    /// Elapsed time within the current loop, in `[0, duration]`.
    pub fn current_time(&self) -> i64 {
        self.current_time
    }

    /// Cumulative elapsed time across all loops.
    pub fn total_current_time(&self) -> i64 {
        self.total_current_time
    }

    /// Index of the active loop iteration.
    pub fn current_loop(&self) -> i32 {
        self.current_loop
    }

    /// Parent group, if any. The reference is non-owning: once the parent is
    /// removed this id no longer resolves and the job reads as parentless.
    pub fn group(&self) -> Option<JobId> {
        self.group
    }

    /// Whether the job currently occupies a slot in the scheduler's
    /// live or pending fan-out bookkeeping.
    pub fn is_registered(&self) -> bool {
        self.timer_registered
    }

    pub fn user_control_disabled(&self) -> bool {
        self.user_control_disabled
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("direction", &self.direction)
            .field("loop_count", &self.loop_count)
            .field("total_current_time", &self.total_current_time)
            .field("current_time", &self.current_time)
            .field("current_loop", &self.current_loop)
            .field("group", &self.group)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
