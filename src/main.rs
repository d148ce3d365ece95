//! qrsmith command line: one session per invocation.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use qrsmith::render::{to_svg_string, to_terminal_string};
use qrsmith::{ClipboardStatus, EncodingSession, QuickFill, Status, SystemClipboard};

/// Encode text as a QR code, then save it or copy it as a data URL.
#[derive(Parser, Debug)]
#[command(name = "qrsmith", version, about)]
struct Cli {
    /// Text to encode.
    text: Option<String>,

    /// Use a built-in example instead of TEXT.
    #[arg(short, long, value_enum, conflicts_with = "text")]
    example: Option<Example>,

    /// Save the PNG as qrcode-<unix_millis>.png in this directory.
    #[arg(short, long)]
    download_dir: Option<PathBuf>,

    /// Copy the PNG data URL to the system clipboard.
    #[arg(short, long)]
    copy: bool,

    /// Print the symbol to the terminal.
    #[arg(short, long)]
    preview: bool,

    /// Also write an SVG rendering to this path.
    #[arg(long)]
    svg: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Example {
    Url,
    Email,
    Message,
}

impl From<Example> for QuickFill {
    fn from(example: Example) -> Self {
        match example {
            Example::Url => QuickFill::Url,
            Example::Email => QuickFill::Email,
            Example::Message => QuickFill::Message,
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut session = EncodingSession::new();
    match (cli.text, cli.example) {
        (_, Some(example)) => session.quick_fill(example.into()),
        (Some(text), None) => session.set_text(text),
        (None, None) => {}
    }

    match session.request_encode()? {
        Status::Ready => {}
        Status::Failed => {
            if let Some(err) = session.last_error() {
                eprintln!("error: {}", err);
            }
            return Ok(false);
        }
        Status::Idle | Status::Encoding => {
            eprintln!("error: nothing to encode, pass TEXT or --example");
            return Ok(false);
        }
    }

    // Status is Ready, so the image is present
    let Some(image) = session.rendered_image() else {
        return Ok(false);
    };
    println!("{}", image.data_url());

    if cli.preview || cli.svg.is_some() {
        let qr = image.qr();
        if cli.preview {
            print!("{}", to_terminal_string(qr, session.options().margin));
        }
        if let Some(path) = &cli.svg {
            let svg = to_svg_string(qr, session.options().margin, session.options());
            fs::write(path, svg).with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("saved {}", path.display());
        }
    }

    if let Some(dir) = &cli.download_dir {
        if let Some(path) = session.request_download(dir)? {
            eprintln!("saved {}", path.display());
        }
    }

    if cli.copy {
        let mut clipboard = SystemClipboard::new();
        if let Some(ClipboardStatus::Failed(msg)) = session.request_clipboard_copy(&mut clipboard) {
            eprintln!("warning: clipboard copy failed: {}", msg);
        }
    }

    Ok(true)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
