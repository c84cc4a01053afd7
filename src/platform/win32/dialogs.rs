// ── Common dialogs ─────────────────────────────────────────────────────────────
//
// Thin wrappers around the Win32 common-dialog and message-box APIs.  Pickers
// return `Some(value)` on user confirmation and `None` on cancel or error.
//
// This is inside `platform::win32` so `unsafe` is permitted per crate policy.

#![allow(unsafe_code)]

use std::path::PathBuf;

use windows::{
    core::{w, PCWSTR, PWSTR},
    Win32::{
        Foundation::HWND,
        Graphics::Gdi::LOGFONTW,
        UI::{
            Controls::Dialogs::{
                ChooseFontW, GetOpenFileNameW, GetSaveFileNameW, CF_INITTOLOGFONTSTRUCT,
                CF_NOVERTFONTS, CF_SCREENFONTS, CHOOSEFONTW, OFN_FILEMUSTEXIST,
                OFN_HIDEREADONLY, OFN_OVERWRITEPROMPT, OFN_PATHMUSTEXIST, OPENFILENAMEW,
            },
            WindowsAndMessaging::{
                MessageBoxW, IDNO, IDYES, MB_ICONERROR, MB_ICONWARNING, MB_OK, MB_YESNOCANCEL,
            },
        },
    },
};

use super::wide;
use crate::{catalog, shell::UnsavedChoice};

// ── Buffer size ───────────────────────────────────────────────────────────────

/// Maximum path length in `WCHAR`s, including the null terminator.
/// `MAX_PATH` (260) is too short for modern Windows paths; use 32 768 which
/// is the documented maximum for `\\?\` extended paths.
const PATH_BUF_LEN: usize = 32_768;

// ── Filter string ─────────────────────────────────────────────────────────────

/// Build the null-separated filter list: `"Display\0*.ext\0…\0\0"`.
fn filter_string() -> Vec<u16> {
    let mut s = String::new();
    for (display, pattern) in catalog::file_filters() {
        s.push_str(&display);
        s.push('\0');
        s.push_str(&pattern);
        s.push('\0');
    }
    s.push('\0');
    s.encode_utf16().collect()
}

// ── Open dialog ───────────────────────────────────────────────────────────────

/// Show the standard "Open File" dialog.
///
/// Returns the chosen path, or `None` if the user cancelled.
pub(crate) fn show_open_dialog(hwnd_owner: HWND) -> Option<PathBuf> {
    let mut buf = vec![0u16; PATH_BUF_LEN];
    let filter = filter_string();

    let mut ofn = OPENFILENAMEW {
        lStructSize: std::mem::size_of::<OPENFILENAMEW>() as u32,
        hwndOwner: hwnd_owner,
        lpstrFilter: PCWSTR(filter.as_ptr()),
        lpstrFile: PWSTR(buf.as_mut_ptr()),
        nMaxFile: PATH_BUF_LEN as u32,
        lpstrTitle: w!("Open File"),
        Flags: OFN_FILEMUSTEXIST | OFN_PATHMUSTEXIST | OFN_HIDEREADONLY,
        ..Default::default()
    };

    // SAFETY: `ofn` is fully initialised; `buf` and `filter` outlive this
    // call.  GetOpenFileNameW reads and writes only within the buffers we
    // provided.  The function is called on the UI thread (required for modal
    // dialogs).
    let ok = unsafe { GetOpenFileNameW(&mut ofn) };

    ok.as_bool().then(|| path_from_buf(&buf))
}

// ── Save dialog ───────────────────────────────────────────────────────────────

/// Show the standard "Save As" dialog.
///
/// `default_name` pre-populates the filename field (pass an empty string or
/// the current filename).  Returns the chosen path, or `None` if cancelled.
pub(crate) fn show_save_dialog(hwnd_owner: HWND, default_name: &str) -> Option<PathBuf> {
    let mut buf: Vec<u16> = default_name
        .encode_utf16()
        .chain(std::iter::repeat(0).take(PATH_BUF_LEN))
        .take(PATH_BUF_LEN)
        .collect();
    let filter = filter_string();

    let mut ofn = OPENFILENAMEW {
        lStructSize: std::mem::size_of::<OPENFILENAMEW>() as u32,
        hwndOwner: hwnd_owner,
        lpstrFilter: PCWSTR(filter.as_ptr()),
        lpstrFile: PWSTR(buf.as_mut_ptr()),
        nMaxFile: PATH_BUF_LEN as u32,
        lpstrTitle: w!("Save File As"),
        Flags: OFN_OVERWRITEPROMPT | OFN_PATHMUSTEXIST,
        ..Default::default()
    };

    // SAFETY: same invariants as show_open_dialog above.
    let ok = unsafe { GetSaveFileNameW(&mut ofn) };

    ok.as_bool().then(|| path_from_buf(&buf))
}

// ── Font dialog ───────────────────────────────────────────────────────────────

/// Show the standard font picker and return the chosen face name.
///
/// Only the family is used; size changes go through the Font Size menu.
pub(crate) fn show_font_dialog(hwnd_owner: HWND, current: Option<&str>) -> Option<String> {
    let mut logfont = LOGFONTW::default();
    if let Some(face) = current {
        // Leave room for the terminator; longer names are truncated.
        for (dst, src) in logfont.lfFaceName.iter_mut().zip(face.encode_utf16().take(31)) {
            *dst = src;
        }
    }

    let mut cf = CHOOSEFONTW {
        lStructSize: std::mem::size_of::<CHOOSEFONTW>() as u32,
        hwndOwner: hwnd_owner,
        lpLogFont: &mut logfont,
        Flags: CF_SCREENFONTS | CF_NOVERTFONTS | CF_INITTOLOGFONTSTRUCT,
        ..Default::default()
    };

    // SAFETY: `cf` is fully initialised and `logfont` outlives the call;
    // ChooseFontW writes the selection back into `logfont` only.
    let ok = unsafe { ChooseFontW(&mut cf) };
    if !ok.as_bool() {
        return None;
    }

    let name = string_from_buf(&logfont.lfFaceName).trim().to_owned();
    (!name.is_empty()).then_some(name)
}

// ── Message boxes ─────────────────────────────────────────────────────────────

/// Ask what to do with unsaved changes: Yes = save, No = discard.
pub(crate) fn confirm_unsaved(hwnd_owner: HWND) -> UnsavedChoice {
    // SAFETY: both strings are static null-terminated UTF-16 literals;
    // hwnd_owner is the live main window.
    let answer = unsafe {
        MessageBoxW(
            hwnd_owner,
            w!("You have unsaved changes. Do you want to save them?"),
            w!("Unsaved Changes"),
            MB_YESNOCANCEL | MB_ICONWARNING,
        )
    };
    match answer {
        IDYES => UnsavedChoice::Save,
        IDNO => UnsavedChoice::Discard,
        _ => UnsavedChoice::Cancel,
    }
}

/// Show a modal error dialog owned by `hwnd_owner` (or unowned when null).
///
/// Safe to call from any context; performs the UTF-16 conversion internally.
/// Used by `main()` when startup fails and by the shell for I/O errors.
pub(crate) fn show_error(hwnd_owner: HWND, title: &str, message: &str) {
    let msg_wide = wide(message);
    let title_wide = wide(title);

    // SAFETY: msg_wide and title_wide are valid null-terminated UTF-16 strings
    // that remain allocated for the duration of the MessageBoxW call.
    // Return value (button pressed) is intentionally unused for an error dialog.
    unsafe {
        let _ = MessageBoxW(
            hwnd_owner,
            PCWSTR(msg_wide.as_ptr()),
            PCWSTR(title_wide.as_ptr()),
            MB_OK | MB_ICONERROR,
        );
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Convert a null-terminated UTF-16 buffer to a `String`.
fn string_from_buf(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

fn path_from_buf(buf: &[u16]) -> PathBuf {
    PathBuf::from(string_from_buf(buf))
}
