// ── Document state ────────────────────────────────────────────────────────────
//
// The shell's record of the single file-backed document: its path, whether it
// has unsaved edits, and the line-ending convention it was loaded with.  The
// text itself lives in the embedded editor; this module only reads and writes
// it at the file-system boundary.

use std::path::{Path, PathBuf};

use crate::error::{MirrorError, Result};

const APP_NAME: &str = "Mirror IDE";

// ── EOL mode ──────────────────────────────────────────────────────────────────

/// The end-of-line convention used by the document.
///
/// The editor splits on any line ending and joins with `\n`; the detected
/// mode is restored when the buffer is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EolMode {
    /// Windows-style `\r\n`.
    Crlf,
    /// Unix-style `\n`.
    Lf,
    /// Old Mac-style `\r`.
    Cr,
}

impl EolMode {
    /// The line separator string for this mode.
    pub(crate) fn separator(self) -> &'static str {
        match self {
            Self::Crlf => "\r\n",
            Self::Lf => "\n",
            Self::Cr => "\r",
        }
    }

    /// Rewrite every line ending in `text` (`\r\n`, `\r` or `\n`) as this
    /// mode's separator.
    pub(crate) fn apply(self, text: &str) -> String {
        let sep = self.separator();
        let mut out = String::with_capacity(text.len() + text.len() / 32);
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    chars.next_if_eq(&'\n');
                    out.push_str(sep);
                }
                '\n' => out.push_str(sep),
                c => out.push(c),
            }
        }
        out
    }

    /// The convention for new, untitled documents on this platform.
    pub(crate) fn platform_default() -> Self {
        if cfg!(windows) {
            Self::Crlf
        } else {
            Self::Lf
        }
    }

    /// Detect the dominant EOL style in `text`.
    ///
    /// Counts `\r\n`, lone `\r`, and lone `\n` and returns whichever appears
    /// most (ties favour CRLF, then LF).  Falls back to the platform default
    /// when there are no line endings at all.
    pub(crate) fn detect(text: &str) -> Self {
        let bytes = text.as_bytes();
        let (mut crlf, mut lf, mut cr) = (0usize, 0usize, 0usize);
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    crlf += 1;
                    i += 2;
                }
                b'\r' => {
                    cr += 1;
                    i += 1;
                }
                b'\n' => {
                    lf += 1;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        if crlf + lf + cr == 0 {
            Self::platform_default()
        } else if crlf >= lf && crlf >= cr {
            Self::Crlf
        } else if lf >= cr {
            Self::Lf
        } else {
            Self::Cr
        }
    }
}

// ── Document ──────────────────────────────────────────────────────────────────

/// The currently open document.
///
/// `dirty` is `true` iff the editor has reported an edit since the last
/// load, save, or "New".
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Document {
    /// Path on disk, or `None` for an untitled buffer.
    pub(crate) path: Option<PathBuf>,
    pub(crate) dirty: bool,
    pub(crate) eol: EolMode,
}

impl Document {
    /// A fresh, untitled, clean document.
    pub(crate) fn untitled() -> Self {
        Self {
            path: None,
            dirty: false,
            eol: EolMode::platform_default(),
        }
    }

    /// The bare filename component, or `"Untitled"` if no path is set.
    pub(crate) fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_owned())
    }

    /// Compute the title string for the main window.
    ///
    /// | State | Title |
    /// |---|---|
    /// | No path, clean | `"Mirror IDE"` |
    /// | Path set, clean | `"file.py — Mirror IDE"` |
    /// | Path set, dirty | `"*file.py — Mirror IDE"` |
    /// | No path, dirty | `"*Untitled — Mirror IDE"` |
    pub(crate) fn window_title(&self) -> String {
        if self.path.is_none() && !self.dirty {
            return APP_NAME.to_owned();
        }
        let dirty = if self.dirty { "*" } else { "" };
        format!("{dirty}{} \u{2014} {APP_NAME}", self.display_name())
    }

    /// Record a successful load of `path` whose text is `text`.
    pub(crate) fn loaded(path: PathBuf, text: &str) -> Self {
        Self {
            path: Some(path),
            dirty: false,
            eol: EolMode::detect(text),
        }
    }

    /// Record a successful write to `path`.
    pub(crate) fn saved_to(&mut self, path: PathBuf) {
        self.path = Some(path);
        self.dirty = false;
    }
}

// ── File I/O ──────────────────────────────────────────────────────────────────

/// Read the full contents of `path` as UTF-8 text.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| MirrorError::io(path, e))?;
    String::from_utf8(bytes).map_err(|_| MirrorError::InvalidUtf8 {
        path: path.to_path_buf(),
    })
}

/// Replace the contents of `path` with `text`.
pub(crate) fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).map_err(|e| MirrorError::io(path, e))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
