//! Async handle over one [`EncodingSession`].
//!
//! Encoding runs on tokio's blocking pool without holding the session lock, so the session
//! stays readable while a job is pending. Single-flight comes from the session itself, not from
//! callers being polite.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{EncodeError, Result};
use crate::export::ClipboardSink;
use crate::session::{ClipboardStatus, EncodingSession, QuickFill, Status};

/// Cloneable handle; every clone drives the same session.
#[derive(Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<EncodingSession>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_text(&self, text: impl Into<String>) {
        self.inner.lock().await.set_text(text);
    }

    pub async fn quick_fill(&self, example: QuickFill) {
        self.inner.lock().await.quick_fill(example);
    }

    pub async fn status(&self) -> Status {
        self.inner.lock().await.status()
    }

    /// Runs `f` against the session under the lock.
    pub async fn with<R>(&self, f: impl FnOnce(&EncodingSession) -> R) -> R {
        f(&*self.inner.lock().await)
    }

    /// Encodes the current text in the background and returns the status it settles on.
    ///
    /// The encode and its bookkeeping run in their own task holding a clone of the handle, so
    /// the session always leaves `Encoding` even if this future is dropped early. If the
    /// session was cleared while the job ran, the result is dropped and the cleared status is
    /// returned.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::EncodeInFlight`](crate::error::WorkflowError::EncodeInFlight) when
    /// another encode on this session has not finished.
    pub async fn request_encode(&self) -> Result<Status> {
        let job = {
            let mut session = self.inner.lock().await;
            match session.begin_encode()? {
                Some(job) => job,
                None => return Ok(session.status()),
            }
        };

        let ticket = job.ticket();
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome = match tokio::task::spawn_blocking(move || job.run()).await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(EncodeError::TaskAborted(join_err.to_string())),
            };
            let mut session = inner.lock().await;
            session.finish_encode(ticket, outcome);
            session.status()
        });

        match task.await {
            Ok(status) => Ok(status),
            Err(join_err) => {
                let mut session = self.inner.lock().await;
                session.finish_encode(ticket, Err(EncodeError::TaskAborted(join_err.to_string())));
                Ok(session.status())
            }
        }
    }

    pub async fn request_download(&self, directory: &Path) -> Result<Option<PathBuf>> {
        self.inner.lock().await.request_download(directory)
    }

    pub async fn request_clipboard_copy(
        &self,
        clipboard: &mut dyn ClipboardSink,
    ) -> Option<ClipboardStatus> {
        self.inner.lock().await.request_clipboard_copy(clipboard)
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}
