//! Control errors reported to callers.

use thiserror::Error;

/// Non-fatal errors raised by job control operations. State is left
/// unchanged whenever one of these is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("unknown job id")]
    UnknownJob,
    #[error("cannot pause a stopped animation")]
    PauseWhileStopped,
    #[error("cannot resume an animation that is not paused")]
    ResumeWhileNotPaused,
    #[error("invalid duration {0} for this job kind")]
    InvalidDuration(i64),
    #[error("target job is not a group")]
    NotAGroup,
}
