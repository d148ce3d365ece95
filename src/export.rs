//! Getting a rendered image out of the session: PNG files and the clipboard.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, WorkflowError};

/// File name for a download stamped at `epoch_millis`: `qrcode-<epoch_millis>.png`.
pub fn download_file_name(epoch_millis: i64) -> String {
    format!("qrcode-{}.png", epoch_millis)
}

/// Writes `png` into `directory` under a timestamped name and returns the full path.
///
/// The directory is created if it doesn't exist. An existing file is never overwritten.
///
/// # Errors
///
/// Returns [`WorkflowError::Download`] if the directory or file cannot be written, including
/// when a file with the same timestamp already exists.
pub fn save_png(directory: &Path, png: &[u8]) -> Result<PathBuf> {
    save_png_stamped(directory, png, chrono::Utc::now().timestamp_millis())
}

fn save_png_stamped(directory: &Path, png: &[u8], stamp: i64) -> Result<PathBuf> {
    let path = directory.join(download_file_name(stamp));

    if !directory.exists() {
        fs::create_dir_all(directory).map_err(|source| WorkflowError::Download {
            path: directory.to_path_buf(),
            source,
        })?;
    }

    let download_err = |source: std::io::Error| WorkflowError::Download {
        path: path.clone(),
        source,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(download_err)?;
    file.write_all(png).map_err(download_err)?;
    log::info!("saved {} ({} bytes)", path.display(), png.len());
    Ok(path)
}

/// Somewhere a data URL can be copied to.
pub trait ClipboardSink {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// The operating system clipboard.
///
/// Opened on first write, so a machine without a clipboard only fails the copy itself.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&mut arboard::Clipboard> {
        let clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new()
                .map_err(|e| WorkflowError::Clipboard(format!("cannot open clipboard: {}", e)))?,
        };
        Ok(self.inner.insert(clipboard))
    }
}

impl ClipboardSink for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        self.handle()?
            .set_text(text)
            .map_err(|e| WorkflowError::Clipboard(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_file_name() {
        assert_eq!(download_file_name(1_700_000_000_123), "qrcode-1700000000123.png");
    }

    #[test]
    fn test_save_png_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("out").join("qr");
        let path = save_png(&nested, b"\x89PNG").unwrap();
        assert!(path.starts_with(&nested));
        assert_eq!(fs::read(&path).unwrap(), b"\x89PNG");
    }

    #[test]
    fn test_save_png_reports_unwritable_target() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the directory should be
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let err = save_png(&blocker.join("sub"), b"png").unwrap_err();
        assert!(matches!(err, WorkflowError::Download { .. }));
    }

    #[test]
    fn test_same_millisecond_does_not_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let first = save_png_stamped(tmp.path(), b"first", 42).unwrap();
        let err = save_png_stamped(tmp.path(), b"second", 42).unwrap_err();
        match err {
            WorkflowError::Download { path, source } => {
                assert_eq!(path, first);
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
            }
            other => panic!("expected download error, got {:?}", other),
        }
        assert_eq!(fs::read(&first).unwrap(), b"first");
    }

    #[test]
    fn test_system_clipboard_opens_lazily() {
        // Building the sink never touches the OS, so it works headless
        let clipboard = SystemClipboard::new();
        assert!(clipboard.inner.is_none());
    }
}
