//! # qrsmith
//!
//! A small QR code workbench: type some text, turn it into a scannable PNG, then save the PNG or
//! copy it to the clipboard as a data URL.
//!
//! The crate is built around [`EncodingSession`], which holds the text, the last rendered image
//! and an `Idle` / `Encoding` / `Ready` / `Failed` status. The encoder itself is a complete
//! QR Code Model 2 implementation (versions 1 to 40, four error correction levels).
//!
//! ## Features
//!
//! - Encode text in numeric, alphanumeric or byte mode, picking the smallest version.
//! - Render to a fixed 300 px black-on-white PNG with a 2-module quiet zone.
//! - Export as `qrcode-<unix_millis>.png` or copy as `data:image/png;base64,...`.
//! - Single-flight encoding, also when driven from async code via [`SharedSession`].
//! - SVG and terminal renderings of the same symbol.
//!
//! ## Example
//!
//! ```rust
//! use qrsmith::{EncodingSession, Status};
//!
//! let mut session = EncodingSession::new();
//! session.set_text("https://example.com");
//! assert_eq!(session.request_encode().unwrap(), Status::Ready);
//!
//! let image = session.rendered_image().unwrap();
//! assert!(image.data_url().starts_with("data:image/png;base64,"));
//! ```
//!
//! ## Modules
//!
//! - [`qrcode`]: Core QR code encoding.
//! - [`render`]: Rasterizing, PNG and data URL output, SVG and terminal renderings.
//! - [`session`]: The encoding workflow state machine.
//! - [`shared`]: Async single-flight handle over a session.
//! - [`export`]: PNG downloads and clipboard backends.
//! - [`error`]: Error types.

pub mod error;
pub mod export;
pub mod qrcode;
pub mod render;
pub mod session;
pub mod shared;

pub use error::{EncodeError, WorkflowError};
pub use export::{ClipboardSink, SystemClipboard};
pub use render::{RenderOptions, RenderedImage};
pub use session::{ClipboardStatus, EncodeJob, EncodingSession, QuickFill, Status};
pub use shared::SharedSession;
