//! Test utilities and module declarations for storage tests.

use std::io;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;
use voice_study_core::{NewTurn, Role, Session, TurnScope};

use crate::Storage;

#[allow(clippy::unwrap_used, reason = "test code")]
pub fn create_test_storage() -> (Storage, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let storage = Storage::new(&db_path).unwrap();
    (storage, temp_dir)
}

pub fn scope(task_id: &str) -> TurnScope {
    TurnScope::new("p-test", Session::S1, task_id)
}

pub fn make_turn(scope: &TurnScope, turn_index: i64, role: Role, base: DateTime<Utc>) -> NewTurn {
    let started_at = base + Duration::seconds(turn_index * 10);
    NewTurn {
        scope: scope.clone(),
        turn_index,
        role,
        text: Some(format!("{role} says {turn_index}")),
        audio_url: None,
        duration_ms: None,
        started_at,
        ended_at: started_at + Duration::milliseconds(1500),
    }
}

/// Collects formatted log output so tests can assert on emitted events.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

pub struct LogCaptureWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter(Arc::clone(&self.0))
    }
}

impl io::Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.0.lock().map_err(|_| io::Error::other("log buffer poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Info-level subscriber writing into this buffer.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish()
    }

    #[allow(clippy::unwrap_used, reason = "test code")]
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

mod conversation_tests;
mod progress_tests;
mod survey_tests;
