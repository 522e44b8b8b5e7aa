//! Mission Board - gamified progress tracking
//!
//! Missions are grouped in blocks of ten. Tapping a mission selects it, tapping
//! it again adds a point until it is complete, and completing a whole block
//! unlocks the next one. Points accumulate towards a ladder of rewards shown
//! as animated counters.
//!
//! ## Layers
//!
//! - [`domain`]: scoring rules, the reward ladder and the mission catalog
//! - [`engine`]: the synchronous state machine (progress, unlocks, reveal
//!   timers, remote reconciliation)
//! - [`session`]: the tokio driver connecting an engine to the
//!   collaborators in [`remote`]

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod remote;
pub mod session;

pub use config::Config;
pub use engine::{BoardView, Effect, Engine, IgnoreReason, Interaction};
pub use error::BoardError;
pub use session::Session;
