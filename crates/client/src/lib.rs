//! Client side of the voice-study backend
//!
//! `SessionController` drives one participant through a session: it rebuilds
//! the flow from the server's progress checkpoint, gates each step, persists
//! progress before advancing, and reports conversation turns and timing.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]

mod api;
mod cache;
mod controller;
mod error;
mod http_api;

#[cfg(test)]
mod tests;

pub use api::ExperimentApi;
pub use cache::ProgressCache;
pub use controller::{CurrentTask, SessionController, enroll};
pub use error::ClientError;
pub use http_api::HttpExperimentApi;
