//! Exam-style countdown timer
//!
//! Shows a shrinking pie that updates at configured remaining-time marks,
//! densely near the end and in whole minutes further out.
//!
//! - [`ticks`]: which marks a countdown of a given length shows
//! - [`timer`]: registry of cancellable deferred callbacks
//! - [`countdown`]: controller wiring ticks, timers and the renderer together

pub mod config;
pub mod countdown;
pub mod duration;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod render;
pub mod ticks;
pub mod timer;

pub use config::Config;
pub use countdown::{Countdown, CountdownSession, PlannedTick, State};
pub use error::{ConfigError, CountdownError};
pub use render::{Frame, Render, TerminalRenderer};
pub use ticks::{TickDescriptor, TickSequenceGenerator, Units};
pub use timer::{LocalScheduler, Scheduler, TimerId, TimerRegistry};
