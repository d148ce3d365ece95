//! The QR encoding workflow: one text input, one rendered image, one status.
//!
//! State rules:
//!
//! - `rendered_image()` is `Some` exactly when `status()` is [`Status::Ready`].
//! - Editing the text never changes the status and never drops a ready image. The image stays
//!   until the next encode or [`EncodingSession::clear`]; [`EncodingSession::is_stale`] says
//!   whether it still matches the input.
//! - At most one encode is in flight. Asking for another returns
//!   [`WorkflowError::EncodeInFlight`].
//! - `clear` during an in-flight encode wins: the late result is discarded.

use std::path::{Path, PathBuf};

use crate::error::{EncodeError, Result, WorkflowError};
use crate::export::{self, ClipboardSink};
use crate::render::{self, RenderOptions, RenderedImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Idle,
    Encoding,
    Ready,
    Failed,
}

/// Outcome of the last clipboard copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardStatus {
    Copied,
    Failed(String),
}

/// Fixed example inputs offered next to the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuickFill {
    Url,
    Email,
    Message,
}

impl QuickFill {
    pub const ALL: [QuickFill; 3] = [QuickFill::Url, QuickFill::Email, QuickFill::Message];

    pub fn text(self) -> &'static str {
        match self {
            QuickFill::Url => "https://example.com",
            QuickFill::Email => "hello@example.com",
            QuickFill::Message => "Hello, World!",
        }
    }
}

/// A pending encode handed out by [`EncodingSession::begin_encode`].
///
/// Owns everything it needs, so it can run on another thread while the session stays usable.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    ticket: u64,
    text: String,
    options: RenderOptions,
}

impl EncodeJob {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn run(&self) -> std::result::Result<RenderedImage, EncodeError> {
        render::render_text(&self.text, &self.options)
    }
}

/// State of one page view of the QR generator.
#[derive(Debug)]
pub struct EncodingSession {
    input_text: String,
    rendered: Option<RenderedImage>,
    status: Status,
    options: RenderOptions,
    last_error: Option<EncodeError>,
    clipboard_status: Option<ClipboardStatus>,
    next_ticket: u64,
    in_flight: Option<u64>,
}

impl Default for EncodingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingSession {
    pub fn new() -> Self {
        Self {
            input_text: String::new(),
            rendered: None,
            status: Status::Idle,
            options: RenderOptions::default(),
            last_error: None,
            clipboard_status: None,
            next_ticket: 1,
            in_flight: None,
        }
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn rendered_image(&self) -> Option<&RenderedImage> {
        self.rendered.as_ref()
    }

    /// Why the session is `Failed`, if it is.
    pub fn last_error(&self) -> Option<&EncodeError> {
        self.last_error.as_ref()
    }

    pub fn clipboard_status(&self) -> Option<&ClipboardStatus> {
        self.clipboard_status.as_ref()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// True when a ready image was encoded from text other than the current input.
    pub fn is_stale(&self) -> bool {
        self.rendered
            .as_ref()
            .is_some_and(|img| img.source_text() != self.input_text)
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.input_text = text.into();
    }

    pub fn quick_fill(&mut self, example: QuickFill) {
        self.set_text(example.text());
    }

    /// Starts an encode of the current text.
    ///
    /// Returns `Ok(None)` without touching any state when the text is blank.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::EncodeInFlight`] if an earlier job has not finished.
    pub fn begin_encode(&mut self) -> Result<Option<EncodeJob>> {
        if self.status == Status::Encoding {
            log::warn!("encode requested while another is in flight, rejecting");
            return Err(WorkflowError::EncodeInFlight);
        }
        if self.input_text.trim().is_empty() {
            log::debug!("encode requested with blank input, ignoring");
            return Ok(None);
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.status = Status::Encoding;
        self.rendered = None;
        self.last_error = None;
        self.clipboard_status = None;
        log::debug!("encode #{} started ({} bytes)", ticket, self.input_text.len());

        Ok(Some(EncodeJob {
            ticket,
            text: self.input_text.clone(),
            options: self.options,
        }))
    }

    /// Applies the outcome of the job holding `ticket`.
    ///
    /// Returns `false` and changes nothing if that job is no longer the one in flight.
    pub fn finish_encode(
        &mut self,
        ticket: u64,
        outcome: std::result::Result<RenderedImage, EncodeError>,
    ) -> bool {
        if self.in_flight != Some(ticket) {
            log::debug!("discarding result of superseded encode #{}", ticket);
            return false;
        }
        self.in_flight = None;

        match outcome {
            Ok(image) => {
                log::debug!("encode #{} ready, version {}", ticket, image.version().value());
                self.rendered = Some(image);
                self.status = Status::Ready;
            }
            Err(err) => {
                log::error!("encode #{} failed: {}", ticket, err);
                self.rendered = None;
                self.last_error = Some(err);
                self.status = Status::Failed;
            }
        }
        true
    }

    /// Encodes the current text on the calling thread and returns the resulting status.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::EncodeInFlight`] if a job from [`begin_encode`](Self::begin_encode) is
    /// still pending.
    pub fn request_encode(&mut self) -> Result<Status> {
        if let Some(job) = self.begin_encode()? {
            let outcome = job.run();
            self.finish_encode(job.ticket(), outcome);
        }
        Ok(self.status)
    }

    /// Saves the ready image as `qrcode-<unix_millis>.png` in `directory`.
    ///
    /// Returns `Ok(None)` when there is no image.
    pub fn request_download(&self, directory: &Path) -> Result<Option<PathBuf>> {
        match &self.rendered {
            Some(image) => export::save_png(directory, image.png()).map(Some),
            None => Ok(None),
        }
    }

    /// Copies the ready image's data URL to `clipboard` and records the outcome.
    ///
    /// Returns `None` when there is no image.
    pub fn request_clipboard_copy(
        &mut self,
        clipboard: &mut dyn ClipboardSink,
    ) -> Option<ClipboardStatus> {
        let image = self.rendered.as_ref()?;
        let status = match clipboard.write_text(image.data_url()) {
            Ok(()) => ClipboardStatus::Copied,
            Err(err) => {
                log::warn!("copy to clipboard failed: {}", err);
                ClipboardStatus::Failed(err.to_string())
            }
        };
        self.clipboard_status = Some(status.clone());
        Some(status)
    }

    /// Back to an empty, idle session. Any in-flight result will be discarded.
    pub fn clear(&mut self) {
        self.input_text.clear();
        self.rendered = None;
        self.status = Status::Idle;
        self.last_error = None;
        self.clipboard_status = None;
        self.in_flight = None;
    }
}
