//! Chrona animation core (host-agnostic)
//!
//! A time-driven animation scheduling engine. A [`Scheduler`] owns an arena
//! of [`Job`]s — leaf animations, pure time delays, and groups — and
//! advances the running ones in lock-step with an external tick source.
//! Registration and deregistration are coalesced per turn so bursts of
//! starts and stops produce one driver-protocol decision, and when only
//! delay jobs remain the scheduler asks its tick source to sleep until the
//! nearest deadline instead of ticking every frame.
//!
//! The crate has no opinion about rendering, windowing, or property
//! binding: hosts drive the scheduler through [`Scheduler::advance_time`],
//! observe jobs through change listeners and per-job update hooks, and
//! drain scheduler-level events once per turn.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod job;
pub mod listener;
pub mod scheduler;
pub mod tick_source;

// Re-exports for consumers (hosts and adapters)
pub use config::Config;
pub use error::ControlError;
pub use events::SchedulerEvent;
pub use ids::JobId;
pub use job::{Direction, Job, JobKind, JobState};
pub use listener::{ChangeMask, JobChangeListener};
pub use scheduler::{Scheduler, UpdateHook};
pub use tick_source::{NullTickSource, TickSource};
