//! Scheduler-level events with no synchronous consumer.
//!
//! Change listeners cover per-job notifications; events carry the signals a
//! host-side collaborator polls for instead, and are drained once per turn
//! via [`Scheduler::take_events`](crate::scheduler::Scheduler::take_events).

use serde::{Deserialize, Serialize};

use crate::ids::JobId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SchedulerEvent {
    /// A top-level job entered a new loop iteration (or was just started).
    TopLevelLoopChanged { job: JobId },
    /// An uncontrolled job (undefined duration or infinite loop count)
    /// finished inside a group; external group machinery reacts to this.
    UncontrolledFinished { group: JobId, job: JobId },
}
