// ── Central error type ────────────────────────────────────────────────────────
//
// All fallible operations in Mirror return `error::Result<T>`.  No panics
// in production paths; errors surface as user-facing dialogs (see
// `shell::ShellUi::show_error` and `platform::win32::window::show_error_dialog`).

use std::path::PathBuf;

use thiserror::Error;

/// Every error that Mirror can produce.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// A Win32 API call returned a failure code.
    #[error("{function} failed (error {code:#010x})")]
    Win32 {
        /// The name of the failing function, for display purposes.
        function: &'static str,
        /// The raw Win32 error code (`GetLastError()` value) or HRESULT.
        code: u32,
    },

    /// Reading or writing a document failed.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not UTF-8 text and cannot be handed to the editor.
    #[error("{} is not valid UTF-8 text", path.display())]
    InvalidUtf8 { path: PathBuf },

    /// The scripting bridge to the embedded editor failed.
    #[error("editor bridge: {0}")]
    Bridge(String),

    /// The settings file could not be encoded or decoded.
    #[error("settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl MirrorError {
    /// Attach a path to an I/O error raised while touching that file.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// Convert a windows-crate error (HRESULT) directly into a MirrorError so that
// `?` can be used on `windows::core::Result<T>` throughout the platform module.
#[cfg(windows)]
impl From<windows::core::Error> for MirrorError {
    fn from(e: windows::core::Error) -> Self {
        // HRESULT.0 is i32; reinterpret bits as u32 for display purposes.
        Self::Win32 {
            function: "windows",
            code: e.code().0 as u32,
        }
    }
}

#[cfg(windows)]
impl From<webview2_com::Error> for MirrorError {
    fn from(e: webview2_com::Error) -> Self {
        Self::Bridge(format!("{e:?}"))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MirrorError>;
