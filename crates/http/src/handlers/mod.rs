#![allow(clippy::single_call_fn, reason = "HTTP handlers are called once from router")]

pub mod audio;
pub mod conversation;
pub mod participants;
pub mod playback;
pub mod progress;
pub mod surveys;
