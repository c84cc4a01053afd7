// ── Main window ───────────────────────────────────────────────────────────────
//
// Responsibilities in this file (unsafe confined here):
//   • Register the main window class and create the top-level window.
//   • Build the menu bar and the accelerator table from the catalog/keymap.
//   • Host the editor surface and own the `Shell` for the window's lifetime.
//   • Run the Win32 message loop and dispatch commands into the shell.
//
// The shell lives in a thread-local `RefCell`.  Modal dialogs opened by the
// shell pump messages while it is borrowed, so every entry point uses
// `try_borrow_mut`; web view traffic that arrives meanwhile stays queued
// and is retried once the borrow ends.

#![allow(unsafe_code)]

use std::cell::{Cell, RefCell};

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM},
        Graphics::Gdi::{CreateSolidBrush, DeleteObject, FillRect, GetStockObject, HBRUSH, HDC, WHITE_BRUSH},
        System::{
            Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED},
            LibraryLoader::GetModuleHandleW,
        },
        UI::WindowsAndMessaging::{
            AppendMenuW, CreateAcceleratorTableW, CreateMenu, CreateWindowExW, DefWindowProcW,
            DestroyAcceleratorTable, DestroyWindow, DispatchMessageW, GetClientRect, GetMessageW,
            LoadCursorW, LoadIconW, MessageBoxW, PostMessageW, PostQuitMessage, RegisterClassExW,
            SetMenu, ShowWindow, TranslateAcceleratorW, TranslateMessage, UpdateWindow, ACCEL,
            CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, FCONTROL, FSHIFT, FVIRTKEY, HACCEL, HMENU,
            IDC_ARROW, IDI_APPLICATION, MB_OK, MF_POPUP, MF_SEPARATOR, MF_STRING, MSG, SW_SHOW,
            WINDOW_EX_STYLE, WM_APP, WM_CLOSE, WM_COMMAND, WM_DESTROY, WM_DPICHANGED,
            WM_ERASEBKGND, WM_SIZE, WNDCLASSEXW, WS_OVERLAPPEDWINDOW,
        },
    },
};

use super::{
    colorref, dialogs, dpi,
    ui::Win32Ui,
    webview::{self, EditorSurface, Inbound, WebViewHost, WM_APP_INBOUND},
    wide,
};
use crate::{
    catalog::{self, WindowStyle},
    config::Config,
    editor::ScriptedEditor,
    error::{MirrorError, Result},
    keymap::{self, FileAction},
    shell::Shell,
};

type AppShell = Shell<ScriptedEditor<WebViewHost>, Win32Ui>;

// ── Window identity ───────────────────────────────────────────────────────────

/// Atom name used to register (and later find) the main window class.
const CLASS_NAME: PCWSTR = w!("MirrorMainWindow");

/// Placeholder title; the shell sets the real one on startup.
const APP_TITLE: PCWSTR = w!("Mirror IDE");

/// Default outer size at 96 DPI.
const DEFAULT_WIDTH: i32 = 1000;
const DEFAULT_HEIGHT: i32 = 700;

/// Posted by `Win32Ui::close_window` once a deferred close may proceed.
pub(crate) const WM_APP_CLOSE_NOW: u32 = WM_APP + 2;

// ── Menu command IDs ──────────────────────────────────────────────────────────

const IDM_FILE_NEW: usize = 1001;
const IDM_FILE_OPEN: usize = 1002;
const IDM_FILE_SAVE: usize = 1003;
const IDM_FILE_SAVE_AS: usize = 1004;
const IDM_FILE_EXIT: usize = 1005;

/// `IDM_THEME_BASE + i` selects `catalog::THEMES[i]`.
pub(crate) const IDM_THEME_BASE: usize = 2000;
/// `IDM_MODE_BASE + i` selects `catalog::MODES[i]`.
pub(crate) const IDM_MODE_BASE: usize = 3000;
/// `IDM_FONT_SIZE_BASE + i` selects `catalog::FONT_SIZE_PRESETS[i]`.
pub(crate) const IDM_FONT_SIZE_BASE: usize = 4000;
const IDM_FONT_FAMILY: usize = 4100;
const IDM_FONT_LARGER: usize = 4101;
const IDM_FONT_SMALLER: usize = 4102;

const IDM_HELP_ABOUT: usize = 9001;

/// The menu command a keyboard action maps to.
pub(crate) fn command_id(action: FileAction) -> usize {
    match action {
        FileAction::New => IDM_FILE_NEW,
        FileAction::Open => IDM_FILE_OPEN,
        FileAction::Save => IDM_FILE_SAVE,
        FileAction::SaveAs => IDM_FILE_SAVE_AS,
    }
}

// ── Per-thread window state ───────────────────────────────────────────────────

thread_local! {
    static SHELL: RefCell<Option<AppShell>> = const { RefCell::new(None) };
    static SURFACE: RefCell<Option<EditorSurface>> = const { RefCell::new(None) };
    static STYLE: Cell<WindowStyle> = const { Cell::new(WindowStyle::Light) };
    /// Inbound items arrived while the shell was busy.
    static INBOUND_DEFERRED: Cell<bool> = const { Cell::new(false) };
}

/// Run `f` against the editor surface, if it exists and is not borrowed.
pub(crate) fn with_surface(f: impl FnOnce(&EditorSurface)) {
    SURFACE.with(|cell| {
        if let Ok(guard) = cell.try_borrow() {
            if let Some(surface) = guard.as_ref() {
                f(surface);
            }
        }
    });
}

/// Remember the chrome style for `WM_ERASEBKGND`.
pub(crate) fn set_window_style(style: WindowStyle) {
    STYLE.with(|s| s.set(style));
}

/// Run `f` against the shell.  `None` when the shell is not installed yet
/// or is already borrowed further up the stack.
fn with_shell<R>(hwnd: HWND, f: impl FnOnce(&mut AppShell) -> R) -> Option<R> {
    let result = SHELL.with(|cell| {
        let mut guard = cell.try_borrow_mut().ok()?;
        guard.as_mut().map(f)
    });
    if INBOUND_DEFERRED.with(Cell::take) {
        // SAFETY: hwnd is the live main window.
        unsafe {
            let _ = PostMessageW(hwnd, WM_APP_INBOUND, WPARAM(0), LPARAM(0));
        }
    }
    result
}

fn shell_installed() -> bool {
    SHELL.with(|cell| cell.try_borrow().map_or(true, |g| g.is_some()))
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Create the main window and editor, open the command-line file, and drive
/// the message loop until the user closes the application.
pub(crate) fn run(config: Config) -> Result<()> {
    dpi::init();

    // SAFETY: first COM call on this thread; WebView2 requires an STA.
    unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.ok()?;
    let result = run_window(config);
    // SAFETY: balances the successful CoInitializeEx above.
    unsafe { CoUninitialize() };
    result
}

fn run_window(config: Config) -> Result<()> {
    // Startup timing is only reported in debug builds.
    #[cfg(debug_assertions)]
    let t0 = std::time::Instant::now();

    // SAFETY: GetModuleHandleW(None) returns the .exe's own HMODULE, which is
    // always valid for the process lifetime.
    let hmodule = unsafe { GetModuleHandleW(None) }?;
    let hinstance = HINSTANCE(hmodule.0);

    register_class(hinstance)?;
    let hwnd = create_window(hinstance)?;
    let accelerators = build_accelerators()?;

    let surface = EditorSurface::create(hwnd)?;
    let host = surface.script_host(hwnd);
    SURFACE.with(|cell| *cell.borrow_mut() = Some(surface));

    let shell = Shell::new(
        ScriptedEditor::new(host),
        Win32Ui::new(hwnd),
        config.editor,
        config.store,
    );
    SHELL.with(|cell| *cell.borrow_mut() = Some(shell));

    // SAFETY: hwnd was just returned by CreateWindowExW and is valid.
    unsafe {
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = UpdateWindow(hwnd);
    }

    #[cfg(debug_assertions)]
    log::debug!("window visible in {:.1} ms", t0.elapsed().as_secs_f64() * 1000.0);

    if let Some(path) = config.open {
        with_shell(hwnd, |shell| shell.open_path(path));
    }

    let result = message_loop(hwnd, accelerators);
    // SAFETY: the table was created above and is no longer used.
    unsafe {
        let _ = DestroyAcceleratorTable(accelerators);
    }
    result
}

/// Show a modal, unowned error dialog.  Used by `main()` when `run()` fails.
pub(crate) fn show_error_dialog(message: &str) {
    dialogs::show_error(HWND::default(), "Mirror IDE: Fatal Error", message);
}

// ── Window class registration ─────────────────────────────────────────────────

fn register_class(hinstance: HINSTANCE) -> Result<()> {
    // SAFETY: IDI_APPLICATION and IDC_ARROW are built-in resources.
    let icon = unsafe { LoadIconW(None, IDI_APPLICATION) }?;
    // SAFETY: as above.
    let cursor = unsafe { LoadCursorW(None, IDC_ARROW) }?;
    // SAFETY: GetStockObject with WHITE_BRUSH always returns a valid brush.
    let bg_brush = unsafe { HBRUSH(GetStockObject(WHITE_BRUSH).0) };

    let wndclass = WNDCLASSEXW {
        cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: Some(wnd_proc),
        hInstance: hinstance,
        hIcon: icon,
        hCursor: cursor,
        hbrBackground: bg_brush,
        lpszMenuName: PCWSTR::null(),
        lpszClassName: CLASS_NAME,
        hIconSm: icon,
        ..Default::default()
    };

    // SAFETY: wndclass is fully initialised with valid handles.
    let atom = unsafe { RegisterClassExW(&wndclass) };
    if atom == 0 {
        return Err(last_error("RegisterClassExW"));
    }
    Ok(())
}

// ── Window creation ───────────────────────────────────────────────────────────

fn create_window(hinstance: HINSTANCE) -> Result<HWND> {
    let system_dpi = dpi::get_system_dpi();

    // SAFETY: CLASS_NAME was just registered; hinstance is the exe's module;
    // a null parent creates a top-level window.
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            CLASS_NAME,
            APP_TITLE,
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            dpi::scale(DEFAULT_WIDTH, system_dpi),
            dpi::scale(DEFAULT_HEIGHT, system_dpi),
            HWND::default(),
            HMENU::default(),
            hinstance,
            None,
        )
    }?;

    let menu = build_menu()?;
    // SAFETY: hwnd and menu are valid handles; the window takes ownership.
    unsafe { SetMenu(hwnd, menu) }?;

    Ok(hwnd)
}

// ── Menu construction ─────────────────────────────────────────────────────────

/// Append a string item whose label is built at runtime.
fn append_item(menu: HMENU, id: usize, label: &str) -> Result<()> {
    let label = wide(label);
    // SAFETY: menu is a valid menu handle; AppendMenuW copies the label.
    unsafe { AppendMenuW(menu, MF_STRING, id, PCWSTR(label.as_ptr())) }?;
    Ok(())
}

fn append_popup(parent: HMENU, child: HMENU, label: PCWSTR) -> Result<()> {
    // SAFETY: both handles are valid; for MF_POPUP the id is the child HMENU.
    unsafe { AppendMenuW(parent, MF_POPUP, child.0 as usize, label) }?;
    Ok(())
}

fn file_item_label(text: &str, action: FileAction) -> String {
    match keymap::shortcut_for(action) {
        Some(shortcut) => format!("{text}\t{}", shortcut.label()),
        None => text.to_owned(),
    }
}

fn build_menu() -> Result<HMENU> {
    // SAFETY: CreateMenu has no preconditions.
    let new_menu = || unsafe { CreateMenu() }.map_err(MirrorError::from);

    let bar = new_menu()?;

    // ── File ──────────────────────────────────────────────────────────────────
    let file = new_menu()?;
    append_item(file, IDM_FILE_NEW, &file_item_label("&New", FileAction::New))?;
    append_item(file, IDM_FILE_OPEN, &file_item_label("&Open…", FileAction::Open))?;
    append_item(file, IDM_FILE_SAVE, &file_item_label("&Save", FileAction::Save))?;
    append_item(file, IDM_FILE_SAVE_AS, &file_item_label("Save &As…", FileAction::SaveAs))?;
    // SAFETY: file is a valid menu; separators carry no label.
    unsafe { AppendMenuW(file, MF_SEPARATOR, 0, PCWSTR::null()) }?;
    append_item(file, IDM_FILE_EXIT, "E&xit\tAlt+F4")?;

    // ── Theme ─────────────────────────────────────────────────────────────────
    let theme = new_menu()?;
    for (i, t) in catalog::THEMES.iter().enumerate() {
        append_item(theme, IDM_THEME_BASE + i, t.name)?;
    }

    // ── Mode ──────────────────────────────────────────────────────────────────
    let mode = new_menu()?;
    for (i, m) in catalog::MODES.iter().enumerate() {
        append_item(mode, IDM_MODE_BASE + i, m.label)?;
    }

    // ── Settings ──────────────────────────────────────────────────────────────
    let sizes = new_menu()?;
    for (i, px) in catalog::FONT_SIZE_PRESETS.iter().enumerate() {
        append_item(sizes, IDM_FONT_SIZE_BASE + i, &format!("{px} px"))?;
    }
    let settings = new_menu()?;
    append_popup(settings, sizes, w!("Font &Size"))?;
    append_item(settings, IDM_FONT_LARGER, "&Larger Font")?;
    append_item(settings, IDM_FONT_SMALLER, "S&maller Font")?;
    append_item(settings, IDM_FONT_FAMILY, "Font &Family…")?;

    // ── Help ──────────────────────────────────────────────────────────────────
    let help = new_menu()?;
    append_item(help, IDM_HELP_ABOUT, "&About Mirror IDE…")?;

    append_popup(bar, file, w!("&File"))?;
    append_popup(bar, theme, w!("&Theme"))?;
    append_popup(bar, mode, w!("&Mode"))?;
    append_popup(bar, settings, w!("&Settings"))?;
    append_popup(bar, help, w!("&Help"))?;

    Ok(bar)
}

fn build_accelerators() -> Result<HACCEL> {
    let table: Vec<ACCEL> = keymap::SHORTCUTS
        .iter()
        .map(|s| {
            let mut flags = FVIRTKEY;
            if s.ctrl {
                flags = flags | FCONTROL;
            }
            if s.shift {
                flags = flags | FSHIFT;
            }
            ACCEL {
                fVirt: flags,
                key: u16::from(s.key),
                cmd: command_id(s.action) as u16,
            }
        })
        .collect();
    // SAFETY: table is a valid slice of initialised ACCEL entries; the system
    // copies it.
    Ok(unsafe { CreateAcceleratorTableW(&table) }?)
}

// ── Message loop ──────────────────────────────────────────────────────────────

fn message_loop(hwnd: HWND, accelerators: HACCEL) -> Result<()> {
    let mut msg = MSG::default();

    loop {
        // SAFETY: &mut msg is a valid MSG pointer; a null HWND retrieves
        // messages for all windows on this thread.
        let ret = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };

        match ret.0 {
            -1 => return Err(last_error("GetMessageW")),
            0 => break,
            // SAFETY: msg was populated by a successful GetMessageW call.
            _ => unsafe {
                if TranslateAcceleratorW(hwnd, accelerators, &msg) == 0 {
                    let _ = TranslateMessage(&msg);
                    let _ = DispatchMessageW(&msg);
                }
            },
        }
    }

    Ok(())
}

// ── Window procedure ──────────────────────────────────────────────────────────

// SAFETY: wnd_proc is registered as lpfnWndProc in WNDCLASSEXW.
// Windows guarantees that hwnd, msg, wparam, and lparam are valid for the
// lifetime of this call.
unsafe extern "system" fn wnd_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        // ── Lifecycle ─────────────────────────────────────────────────────────
        WM_CLOSE => {
            let may_close = match with_shell(hwnd, AppShell::request_close) {
                Some(answer) => answer,
                None => !shell_installed(),
            };
            if may_close {
                let _ = DestroyWindow(hwnd);
            }
            LRESULT(0)
        }

        WM_APP_CLOSE_NOW => {
            let _ = DestroyWindow(hwnd);
            LRESULT(0)
        }

        WM_DESTROY => {
            SHELL.with(|cell| {
                if let Ok(mut guard) = cell.try_borrow_mut() {
                    guard.take();
                }
            });
            SURFACE.with(|cell| {
                if let Some(surface) = cell.borrow_mut().take() {
                    surface.close();
                }
            });
            PostQuitMessage(0);
            LRESULT(0)
        }

        // ── Editor traffic ────────────────────────────────────────────────────
        WM_APP_INBOUND => {
            let drained = with_shell(hwnd, |shell| {
                while let Some(item) = webview::next_inbound() {
                    match item {
                        Inbound::Event(event) => shell.handle_event(event),
                        Inbound::RequestFailed(request, message) => {
                            shell.request_failed(request, &message)
                        }
                    }
                }
            });
            if drained.is_none() && shell_installed() {
                INBOUND_DEFERRED.with(|d| d.set(true));
            }
            LRESULT(0)
        }

        // ── Layout and paint ──────────────────────────────────────────────────
        WM_SIZE => {
            with_surface(|surface| surface.fit_to(hwnd));
            LRESULT(0)
        }

        WM_DPICHANGED => {
            dpi::apply_suggested_rect(hwnd, lparam);
            LRESULT(0)
        }

        WM_ERASEBKGND => {
            let hdc = HDC(wparam.0 as *mut core::ffi::c_void);
            let mut rect = RECT::default();
            let _ = GetClientRect(hwnd, &mut rect);
            let brush = CreateSolidBrush(colorref(STYLE.with(Cell::get).background()));
            FillRect(hdc, &rect, brush);
            let _ = DeleteObject(brush);
            LRESULT(1)
        }

        // ── Commands ──────────────────────────────────────────────────────────
        WM_COMMAND => {
            let cmd_id = wparam.0 & 0xFFFF;
            if on_command(hwnd, cmd_id) {
                LRESULT(0)
            } else {
                DefWindowProcW(hwnd, msg, wparam, lparam)
            }
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// Dispatch a menu or accelerator command.  Returns `false` for unknown ids.
fn on_command(hwnd: HWND, cmd_id: usize) -> bool {
    let in_range = |base: usize, len: usize| (base..base + len).contains(&cmd_id).then(|| cmd_id - base);

    match cmd_id {
        IDM_FILE_NEW => {
            with_shell(hwnd, AppShell::new_document);
        }
        IDM_FILE_OPEN => {
            with_shell(hwnd, AppShell::open_document);
        }
        IDM_FILE_SAVE => {
            with_shell(hwnd, AppShell::save_document);
        }
        IDM_FILE_SAVE_AS => {
            with_shell(hwnd, AppShell::save_document_as);
        }
        IDM_FILE_EXIT => {
            // Route through WM_CLOSE so the unsaved-changes prompt runs.
            // SAFETY: hwnd is the live main window.
            unsafe {
                let _ = PostMessageW(hwnd, WM_CLOSE, WPARAM(0), LPARAM(0));
            }
        }
        IDM_FONT_FAMILY => {
            with_shell(hwnd, AppShell::choose_font_family);
        }
        IDM_FONT_LARGER => {
            with_shell(hwnd, |shell| shell.adjust_font_size(1));
        }
        IDM_FONT_SMALLER => {
            with_shell(hwnd, |shell| shell.adjust_font_size(-1));
        }
        IDM_HELP_ABOUT => about_dialog(hwnd),
        _ => {
            if let Some(i) = in_range(IDM_THEME_BASE, catalog::THEMES.len()) {
                with_shell(hwnd, |shell| shell.set_theme(catalog::THEMES[i].name));
            } else if let Some(i) = in_range(IDM_MODE_BASE, catalog::MODES.len()) {
                with_shell(hwnd, |shell| shell.set_mode(catalog::MODES[i].name));
            } else if let Some(i) = in_range(IDM_FONT_SIZE_BASE, catalog::FONT_SIZE_PRESETS.len()) {
                with_shell(hwnd, |shell| shell.set_font_size(catalog::FONT_SIZE_PRESETS[i]));
            } else {
                return false;
            }
        }
    }
    true
}

// ── Helper dialogs ────────────────────────────────────────────────────────────

fn about_dialog(hwnd: HWND) {
    let body = wide(&format!(
        "Mirror IDE {}\n\nA small code editor built on CodeMirror and WebView2.\n\nLicensed under MIT OR Apache-2.0.",
        env!("CARGO_PKG_VERSION"),
    ));
    // SAFETY: body is null-terminated UTF-16 alive for the call; hwnd is the
    // owner window from WndProc.
    unsafe {
        let _ = MessageBoxW(hwnd, PCWSTR(body.as_ptr()), w!("About Mirror IDE"), MB_OK);
    }
}

// ── Error helpers ─────────────────────────────────────────────────────────────

/// Capture the current Win32 last-error code and wrap it in a `MirrorError`.
///
/// Call immediately after a Win32 function that signals failure.
fn last_error(function: &'static str) -> MirrorError {
    // SAFETY: GetLastError reads thread-local state and never fails.
    let code = unsafe { GetLastError() };
    MirrorError::Win32 {
        function,
        code: code.0,
    }
}
