//! Service layer for voice-study
//!
//! Centralizes business rules between the HTTP handlers / CLI and storage:
//! input checks that need domain knowledge, the registrar entry point, and
//! audio upload to object storage.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short error vars are idiomatic")]

mod audio_service;
mod conversation_service;
mod error;
pub mod object_store;
mod participant_service;
mod playback_service;
mod progress_service;
mod survey_service;

#[cfg(test)]
mod test_support;

pub use audio_service::AudioService;
pub use conversation_service::ConversationService;
pub use error::ServiceError;
pub use object_store::{ObjectStore, ObjectStoreConfig, SupabaseAudioStore, UploadError};
pub use participant_service::ParticipantService;
pub use playback_service::PlaybackService;
pub use progress_service::ProgressService;
pub use survey_service::SurveyService;
