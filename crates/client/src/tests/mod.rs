//! In-memory `ExperimentApi` and controller scenario tests.

#![allow(clippy::unwrap_used, reason = "test code")]

mod fake_api;
