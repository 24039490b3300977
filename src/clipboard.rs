//! Copying rendered templates to the system clipboard.
//!
//! Uses the platform's clipboard command:
//!
//! - **macOS**: `pbcopy`
//! - **Windows**: `clip`
//! - **Linux/BSD**: `wl-copy` under Wayland, otherwise `xclip` then `xsel`

use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ClipboardError {
    /// No usable clipboard command on this host.
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    /// A clipboard command ran but did not succeed.
    #[error("clipboard copy failed: {0}")]
    Failed(String),
}

/// Something that can take text for pasting elsewhere.
pub trait ClipboardWriter {
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The system clipboard, reached through external commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        let candidates = clipboard_commands();
        if candidates.is_empty() {
            return Err(ClipboardError::Unavailable(
                "Clipboard not supported on this platform".to_string(),
            ));
        }

        let mut last_error = None;
        for (program, args) in candidates {
            match pipe_to(program, args, text) {
                Ok(()) => {
                    info!(program, bytes = text.len(), "clipboard_copied");
                    return Ok(());
                }
                Err(e) => {
                    debug!(program, error = %e, "clipboard_command_failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ClipboardError::Unavailable("no clipboard command found".to_string())
        }))
    }
}

type ClipboardCommand = (&'static str, &'static [&'static str]);

const NO_ARGS: &[&str] = &[];
const XCLIP_ARGS: &[&str] = &["-selection", "clipboard"];
const XSEL_ARGS: &[&str] = &["--clipboard", "--input"];

/// Commands to try, in order.
fn clipboard_commands() -> Vec<ClipboardCommand> {
    if cfg!(target_os = "macos") {
        vec![("pbcopy", NO_ARGS)]
    } else if cfg!(windows) {
        vec![("clip", NO_ARGS)]
    } else if cfg!(unix) {
        let mut commands = Vec::new();
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            commands.push(("wl-copy", NO_ARGS));
        }
        commands.push(("xclip", XCLIP_ARGS));
        commands.push(("xsel", XSEL_ARGS));
        commands
    } else {
        Vec::new()
    }
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> Result<(), ClipboardError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ClipboardError::Unavailable(format!("{} not installed", program))
            }
            _ => ClipboardError::Failed(format!("{}: {}", program, e)),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| ClipboardError::Failed(format!("{}: {}", program, e)))?;
    }

    let status = child
        .wait()
        .map_err(|e| ClipboardError::Failed(format!("{}: {}", program, e)))?;
    if status.success() {
        Ok(())
    } else {
        Err(ClipboardError::Failed(format!("{} exited with {}", program, status)))
    }
}

#[cfg(test)]
pub mod mock {
    use std::cell::RefCell;

    use super::{ClipboardError, ClipboardWriter};

    /// Records copied text; optionally pretends the clipboard is unavailable.
    #[derive(Debug, Default)]
    pub struct MockClipboard {
        pub copied: RefCell<Vec<String>>,
        pub unavailable: bool,
    }

    impl MockClipboard {
        pub fn unavailable() -> Self {
            Self {
                copied: RefCell::new(Vec::new()),
                unavailable: true,
            }
        }
    }

    impl ClipboardWriter for MockClipboard {
        fn copy(&self, text: &str) -> Result<(), ClipboardError> {
            if self.unavailable {
                return Err(ClipboardError::Unavailable("mock".to_string()));
            }
            self.copied.borrow_mut().push(text.to_string());
            Ok(())
        }
    }
}
