#![allow(unsafe_code)]

use windows::Win32::{
    Foundation::{HWND, LPARAM, RECT},
    UI::{
        HiDpi::{GetDpiForSystem, SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2},
        WindowsAndMessaging::{SetWindowPos, SWP_NOACTIVATE, SWP_NOZORDER},
    },
};

pub(crate) const BASE_DPI: u32 = 96;

/// Scale a pixel value defined at 96 DPI to `dpi`.
pub(crate) fn scale(px: i32, dpi: u32) -> i32 {
    px * dpi as i32 / BASE_DPI as i32
}

/// Opt into Per-Monitor v2 DPI awareness.
/// MUST be called before any window is created on the calling thread.
pub(crate) fn init() {
    // SAFETY: Must precede all window creation; single call at process start.
    unsafe {
        let _ = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
    }
}

/// Return the primary-monitor system DPI. Used before window creation.
pub(crate) fn get_system_dpi() -> u32 {
    // SAFETY: GetDpiForSystem takes no parameters and always succeeds on Win10+.
    let v = unsafe { GetDpiForSystem() };
    if v == 0 {
        BASE_DPI
    } else {
        v
    }
}

/// Handle `WM_DPICHANGED`: move the window to the rectangle Windows suggests.
pub(crate) fn apply_suggested_rect(hwnd: HWND, lparam: LPARAM) {
    if lparam.0 == 0 {
        return;
    }
    // SAFETY: for WM_DPICHANGED, lparam points to a RECT owned by the system
    // that stays valid for the duration of the message.
    let rect = unsafe { *(lparam.0 as *const RECT) };
    // SAFETY: hwnd is the top-level window receiving WM_DPICHANGED.
    unsafe {
        let _ = SetWindowPos(
            hwnd,
            HWND::default(),
            rect.left,
            rect.top,
            rect.right - rect.left,
            rect.bottom - rect.top,
            SWP_NOZORDER | SWP_NOACTIVATE,
        );
    }
}
