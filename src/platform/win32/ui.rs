// ── ShellUi for the main window ───────────────────────────────────────────────
//
// Routes the shell's dialog and chrome requests to Win32.  Holds only the
// main window handle; everything else is looked up per call.

#![allow(unsafe_code)]

use std::path::PathBuf;

use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{BOOL, HWND, LPARAM, WPARAM},
        Graphics::{
            Dwm::{DwmSetWindowAttribute, DWMWA_USE_IMMERSIVE_DARK_MODE},
            Gdi::InvalidateRect,
        },
        UI::WindowsAndMessaging::{CheckMenuRadioItem, GetMenu, PostMessageW, SetWindowTextW, MF_BYCOMMAND},
    },
};

use super::{dialogs, wide, window};
use crate::{
    catalog::{self, WindowStyle},
    settings::EditorSettings,
    shell::{ShellUi, UnsavedChoice},
};

pub(crate) struct Win32Ui {
    hwnd: HWND,
}

impl Win32Ui {
    pub(crate) fn new(hwnd: HWND) -> Self {
        Self { hwnd }
    }

    /// Radio-check `index` within a contiguous block of menu command ids.
    fn check_radio(&self, base: usize, count: usize, index: Option<usize>) {
        let Some(index) = index else { return };
        if count == 0 {
            return;
        }
        // SAFETY: hwnd is the live main window; GetMenu returns its menu bar,
        // and MF_BYCOMMAND searches every submenu for the ids.
        unsafe {
            let menu = GetMenu(self.hwnd);
            let _ = CheckMenuRadioItem(
                menu,
                base as u32,
                (base + count - 1) as u32,
                (base + index) as u32,
                MF_BYCOMMAND.0,
            );
        }
    }
}

impl ShellUi for Win32Ui {
    fn confirm_unsaved(&mut self) -> UnsavedChoice {
        dialogs::confirm_unsaved(self.hwnd)
    }

    fn pick_open_path(&mut self) -> Option<PathBuf> {
        dialogs::show_open_dialog(self.hwnd)
    }

    fn pick_save_path(&mut self, suggested: &str) -> Option<PathBuf> {
        dialogs::show_save_dialog(self.hwnd, suggested)
    }

    fn pick_font_family(&mut self, current: Option<&str>) -> Option<String> {
        dialogs::show_font_dialog(self.hwnd, current)
    }

    fn show_error(&mut self, message: &str) {
        dialogs::show_error(self.hwnd, "Mirror IDE", message);
    }

    fn set_title(&mut self, title: &str) {
        let title = wide(title);
        // SAFETY: title is null-terminated UTF-16 alive for the call.
        unsafe {
            let _ = SetWindowTextW(self.hwnd, PCWSTR(title.as_ptr()));
        }
    }

    fn apply_window_style(&mut self, style: WindowStyle) {
        window::set_window_style(style);
        window::with_surface(|s| s.set_style(style));

        let dark = BOOL::from(style.is_dark());
        // SAFETY: hwnd is a top-level window; the attribute value is a BOOL
        // living on this stack frame for the duration of the call.  Older
        // Windows builds reject the attribute, which is harmless.
        unsafe {
            let _ = DwmSetWindowAttribute(
                self.hwnd,
                DWMWA_USE_IMMERSIVE_DARK_MODE,
                &dark as *const BOOL as *const std::ffi::c_void,
                std::mem::size_of::<BOOL>() as u32,
            );
            let _ = InvalidateRect(self.hwnd, None, BOOL::from(true));
        }
        log::debug!("window style {style:?}");
    }

    fn sync_menu(&mut self, settings: &EditorSettings) {
        let theme = catalog::THEMES.iter().position(|t| t == settings.theme);
        let mode = catalog::MODES.iter().position(|m| m == settings.mode);
        let size = catalog::FONT_SIZE_PRESETS.iter().position(|&px| px == settings.font_size);
        self.check_radio(window::IDM_THEME_BASE, catalog::THEMES.len(), theme);
        self.check_radio(window::IDM_MODE_BASE, catalog::MODES.len(), mode);
        self.check_radio(window::IDM_FONT_SIZE_BASE, catalog::FONT_SIZE_PRESETS.len(), size);
    }

    fn close_window(&mut self) {
        // Destroying the window re-enters the window procedure, which must not
        // happen while the shell is borrowed; post instead.
        // SAFETY: hwnd is the live main window.
        unsafe {
            let _ = PostMessageW(self.hwnd, window::WM_APP_CLOSE_NOW, WPARAM(0), LPARAM(0));
        }
    }
}
