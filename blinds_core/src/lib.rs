#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Position estimation for window coverings with coarse feedback (device-agnostic).
//!
//! The motor only reports an open/close/stop action and either a percent-state
//! readback or an echo of the last percent-control command. This crate turns
//! those sparse notifications plus elapsed time into a continuous 0..=100
//! position and a Stopped/Opening/Closing state. All device I/O goes through
//! `blinds_traits::Device`.
//!
//! ## Architecture
//!
//! - **Profile**: travel timing, tightening floor, tokens, data-point keys (`profile`)
//! - **Estimator**: pure position-from-elapsed-time math (`estimator`)
//! - **State machine**: reactions to action notifications (`machine`)
//! - **Reconciler**: target request -> one device command (`reconciler`)
//! - **Feedback**: percent-state and debounced percent-control paths (`feedback`)
//! - **Session**: owns the estimate and timer slots, applies transitions (`session`)
//! - **Runner**: serializes feed batches and timer expiries (`runner`)
//!
//! Every transition is a pure function `(estimate, event, now) -> (estimate, effects)`;
//! the session is the only place effects are carried out.
//!
//! ## Units
//!
//! Positions are `f64` units where 100 is fully open and 0 mechanically closed;
//! with a tightening band the floor is negative. Times are milliseconds on the
//! session clock. Anything published is `max(0, round(position))`.

pub mod config;
pub mod conversions;
pub mod device_error;
pub mod error;
pub mod estimator;
pub mod feedback;
pub mod machine;
pub mod mocks;
pub mod profile;
pub mod reconciler;
pub mod runner;
pub mod session;
pub mod timer;
pub mod transition;
pub mod util;

pub use config::{FeedbackCfg, RunnerCfg};
pub use error::{BlindsError, BuildError, Result};
pub use estimator::{Estimate, Motion};
pub use feedback::FeedbackMode;
pub use machine::Action;
pub use profile::{CommandTokens, DataPoints, DeviceProfile, TravelProfile};
pub use session::{BlindsSession, SessionBuilder};
pub use transition::{Command, Effect, Transition, Update};
