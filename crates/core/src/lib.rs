//! Core types for voice-study
//!
//! Domain vocabulary, the Latin-square assignment planner, balanced group
//! resolution and the per-session task flow. Shared by every other crate;
//! performs no I/O.

mod assignment;
mod audio;
pub mod constants;
mod conversation;
pub mod env_config;
mod error;
mod experiment;
mod flow;
mod progress;
mod survey;
mod validation;

pub use assignment::*;
pub use audio::*;
pub use constants::*;
pub use conversation::*;
pub use error::*;
pub use experiment::*;
pub use flow::*;
pub use progress::*;
pub use survey::*;
pub use validation::*;
