// ── WebView2 host ─────────────────────────────────────────────────────────────
//
// Creates the WebView2 controller inside the main window, loads the editor
// page, and implements `ScriptHost` on top of `ExecuteScript`.
//
// CodeMirror is served from a `codemirror` folder next to the executable
// (mapped to a virtual host) when one ships, and from the CDN otherwise.
//
// Web view callbacks fire from inside the message loop, possibly while a
// modal dialog owned by the shell is open.  They never touch the shell:
// each one pushes an `Inbound` item onto a thread-local queue and posts
// `WM_APP_INBOUND`, and the window procedure drains the queue once the shell
// is free.

#![allow(unsafe_code)]

use std::{cell::RefCell, collections::VecDeque, path::PathBuf, sync::mpsc};

use webview2_com::{
    take_pwstr, AcceleratorKeyPressedEventHandler, CoreWebView2EnvironmentOptions,
    CreateCoreWebView2ControllerCompletedHandler, CreateCoreWebView2EnvironmentCompletedHandler,
    ExecuteScriptCompletedHandler, NavigationCompletedEventHandler, WebMessageReceivedEventHandler,
    Microsoft::Web::WebView2::Win32::{
        CreateCoreWebView2EnvironmentWithOptions, ICoreWebView2, ICoreWebView2Controller,
        ICoreWebView2Controller2, ICoreWebView2Environment, ICoreWebView2EnvironmentOptions,
        ICoreWebView2Settings3, ICoreWebView2_3, COREWEBVIEW2_COLOR,
        COREWEBVIEW2_HOST_RESOURCE_ACCESS_KIND_ALLOW, COREWEBVIEW2_KEY_EVENT_KIND,
        COREWEBVIEW2_KEY_EVENT_KIND_KEY_DOWN, COREWEBVIEW2_MOVE_FOCUS_REASON_PROGRAMMATIC,
        COREWEBVIEW2_WEB_ERROR_STATUS,
    },
};
use windows::{
    core::{Interface, PCWSTR, PWSTR},
    Win32::{
        Foundation::{BOOL, E_POINTER, HWND, LPARAM, RECT, WPARAM},
        UI::{
            Input::KeyboardAndMouse::{GetKeyState, VIRTUAL_KEY, VK_CONTROL, VK_MENU, VK_SHIFT},
            WindowsAndMessaging::{GetClientRect, PostMessageW, WM_APP, WM_COMMAND},
        },
    },
};

use super::wide;
use crate::{
    catalog::WindowStyle,
    editor::{page, EditorEvent, RequestId, ScriptHost},
    error::{MirrorError, Result},
    keymap,
};

/// Posted to the main window whenever the inbound queue gains an item.
pub(crate) const WM_APP_INBOUND: u32 = WM_APP + 1;

// ── Inbound queue ─────────────────────────────────────────────────────────────

/// Something the web view reported, waiting for the shell.
#[derive(Debug)]
pub(crate) enum Inbound {
    Event(EditorEvent),
    RequestFailed(RequestId, String),
}

thread_local! {
    static INBOUND: RefCell<VecDeque<Inbound>> = const { RefCell::new(VecDeque::new()) };
}

fn post_inbound(hwnd: HWND, item: Inbound) {
    INBOUND.with(|q| q.borrow_mut().push_back(item));
    // SAFETY: hwnd is the main window; posting to a destroyed window fails
    // harmlessly and the queued item is dropped with the thread.
    unsafe {
        let _ = PostMessageW(hwnd, WM_APP_INBOUND, WPARAM(0), LPARAM(0));
    }
}

/// Take the oldest queued item, if any.
pub(crate) fn next_inbound() -> Option<Inbound> {
    INBOUND.with(|q| q.borrow_mut().pop_front())
}

// ── Controller ────────────────────────────────────────────────────────────────

/// The WebView2 controller hosted in the main window.
///
/// Kept outside the shell so resizing and restyling never wait on it.
pub(crate) struct EditorSurface {
    controller: ICoreWebView2Controller,
    webview: ICoreWebView2,
}

impl EditorSurface {
    /// Create the environment and controller, wire the page callbacks, and
    /// start loading the editor page.
    ///
    /// Blocks (pumping messages) until WebView2 has finished initialising.
    pub(crate) fn create(hwnd: HWND) -> Result<Self> {
        let environment = create_environment()?;
        let controller = create_controller(&environment, hwnd)?;

        // SAFETY: controller was just created and is valid on this thread.
        let webview = unsafe { controller.CoreWebView2() }?;

        // SAFETY: webview is valid; Settings() returns an owned interface.
        unsafe {
            let settings = webview.Settings()?;
            settings.SetIsStatusBarEnabled(false)?;
            settings.SetAreDevToolsEnabled(cfg!(debug_assertions))?;
            // Reload and the browser's own Ctrl+O / Ctrl+S must not fire.
            if let Ok(settings3) = settings.cast::<ICoreWebView2Settings3>() {
                settings3.SetAreBrowserAcceleratorKeysEnabled(false)?;
            }
        }

        register_page_messages(&webview, hwnd)?;
        register_navigation_failures(&webview, hwnd)?;
        register_shortcuts(&controller, hwnd)?;

        let surface = Self { controller, webview };
        surface.fit_to(hwnd);

        let base = asset_base(&surface.webview);
        log::info!("loading CodeMirror from {base}");
        let html = wide(&page::editor_html(&base));
        // SAFETY: html is a null-terminated UTF-16 string alive for the call.
        unsafe { surface.webview.NavigateToString(PCWSTR(html.as_ptr())) }?;
        // SAFETY: controller is valid; visibility and focus are plain setters.
        unsafe {
            surface.controller.SetIsVisible(true)?;
            let _ = surface
                .controller
                .MoveFocus(COREWEBVIEW2_MOVE_FOCUS_REASON_PROGRAMMATIC);
        }

        log::debug!("web view created");
        Ok(surface)
    }

    /// A `ScriptHost` that runs scripts in this surface's page.
    pub(crate) fn script_host(&self, hwnd: HWND) -> WebViewHost {
        WebViewHost {
            webview: self.webview.clone(),
            hwnd,
        }
    }

    /// Size the web view to the parent's client area.
    pub(crate) fn fit_to(&self, hwnd: HWND) {
        let mut rect = RECT::default();
        // SAFETY: hwnd is the live parent window; rect is a valid out pointer.
        unsafe {
            if GetClientRect(hwnd, &mut rect).is_ok() {
                let _ = self.controller.SetBounds(rect);
            }
        }
    }

    /// Match the web view's backdrop (visible while the page paints) to the
    /// window style.
    pub(crate) fn set_style(&self, style: WindowStyle) {
        let rgb = style.background();
        let color = COREWEBVIEW2_COLOR {
            A: 255,
            R: (rgb >> 16) as u8,
            G: (rgb >> 8) as u8,
            B: rgb as u8,
        };
        if let Ok(controller2) = self.controller.cast::<ICoreWebView2Controller2>() {
            // SAFETY: controller2 is a valid interface obtained from cast().
            unsafe {
                let _ = controller2.SetDefaultBackgroundColor(color);
            }
        }
    }

    /// Release the browser process before the parent window goes away.
    pub(crate) fn close(&self) {
        // SAFETY: controller is valid; Close() is idempotent.
        unsafe {
            let _ = self.controller.Close();
        }
    }
}

// ── ScriptHost ────────────────────────────────────────────────────────────────

pub(crate) struct WebViewHost {
    webview: ICoreWebView2,
    hwnd: HWND,
}

impl ScriptHost for WebViewHost {
    fn execute(&mut self, script: &str) -> Result<()> {
        let handler = ExecuteScriptCompletedHandler::create(Box::new(|result, _json| {
            if let Err(e) = result {
                log::warn!("editor script failed: {e}");
            }
            Ok(())
        }));
        let script = wide(script);
        // SAFETY: script is null-terminated UTF-16 alive for the call; the
        // handler is reference-counted and kept alive by WebView2.
        unsafe { self.webview.ExecuteScript(PCWSTR(script.as_ptr()), &handler) }?;
        Ok(())
    }

    fn evaluate(&mut self, script: &str, request: RequestId) -> Result<()> {
        let hwnd = self.hwnd;
        let handler = ExecuteScriptCompletedHandler::create(Box::new(move |result, json| {
            let item = result
                .map_err(MirrorError::from)
                .and_then(|()| EditorEvent::from_value_result(request, &json));
            let item = match item {
                Ok(event) => Inbound::Event(event),
                Err(e) => Inbound::RequestFailed(request, e.to_string()),
            };
            post_inbound(hwnd, item);
            Ok(())
        }));
        let script = wide(script);
        // SAFETY: as in execute().
        unsafe { self.webview.ExecuteScript(PCWSTR(script.as_ptr()), &handler) }?;
        Ok(())
    }
}

// ── Creation helpers ──────────────────────────────────────────────────────────

/// Per-user data folder for the embedded browser; the default (next to the
/// executable) is often read-only.
fn user_data_folder() -> Vec<u16> {
    let dir = dirs::data_local_dir()
        .map(|d| d.join("mirror-ide").join("WebView2"))
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();
    wide(&dir)
}

fn create_environment() -> Result<ICoreWebView2Environment> {
    let (tx, rx) = mpsc::channel();
    let data_dir = user_data_folder();
    let options: ICoreWebView2EnvironmentOptions = CoreWebView2EnvironmentOptions::default().into();

    CreateCoreWebView2EnvironmentCompletedHandler::wait_for_async_operation(
        Box::new(move |handler| {
            let folder = if data_dir.len() > 1 {
                PCWSTR(data_dir.as_ptr())
            } else {
                PCWSTR::null()
            };
            // SAFETY: folder (when non-null) points into data_dir, which the
            // closure owns for the duration of the call.
            unsafe { CreateCoreWebView2EnvironmentWithOptions(PCWSTR::null(), folder, &options, &handler) }
                .map_err(webview2_com::Error::WindowsError)
        }),
        Box::new(move |result, environment| {
            result?;
            let _ = tx.send(environment.ok_or_else(|| windows::core::Error::from(E_POINTER)));
            Ok(())
        }),
    )?;

    rx.recv()
        .map_err(|_| MirrorError::Bridge("WebView2 environment was not created".to_owned()))?
        .map_err(MirrorError::from)
}

fn create_controller(environment: &ICoreWebView2Environment, hwnd: HWND) -> Result<ICoreWebView2Controller> {
    let (tx, rx) = mpsc::channel();
    let environment = environment.clone();

    CreateCoreWebView2ControllerCompletedHandler::wait_for_async_operation(
        Box::new(move |handler| {
            // SAFETY: hwnd is the live main window that will parent the view.
            unsafe { environment.CreateCoreWebView2Controller(hwnd, &handler) }
                .map_err(webview2_com::Error::WindowsError)
        }),
        Box::new(move |result, controller| {
            result?;
            let _ = tx.send(controller.ok_or_else(|| windows::core::Error::from(E_POINTER)));
            Ok(())
        }),
    )?;

    rx.recv()
        .map_err(|_| MirrorError::Bridge("WebView2 controller was not created".to_owned()))?
        .map_err(MirrorError::from)
}

/// `<exe dir>/codemirror`, when it holds a CodeMirror release.
fn local_asset_folder() -> Option<PathBuf> {
    let dir = std::env::current_exe().ok()?.parent()?.join("codemirror");
    dir.join("codemirror.min.js").is_file().then_some(dir)
}

/// Map the local asset folder into the page's origin space and return the
/// URL to load CodeMirror from.  Falls back to the CDN.
fn asset_base(webview: &ICoreWebView2) -> String {
    let Some(folder) = local_asset_folder() else {
        return page::CODEMIRROR_CDN.to_owned();
    };
    let Ok(webview3) = webview.cast::<ICoreWebView2_3>() else {
        log::warn!("WebView2 runtime cannot map local folders; using the CDN");
        return page::CODEMIRROR_CDN.to_owned();
    };
    let host = wide(page::LOCAL_ASSET_HOST);
    let path = wide(&folder.to_string_lossy());
    // SAFETY: both strings are null-terminated UTF-16 alive for the call.
    let mapped = unsafe {
        webview3.SetVirtualHostNameToFolderMapping(
            PCWSTR(host.as_ptr()),
            PCWSTR(path.as_ptr()),
            COREWEBVIEW2_HOST_RESOURCE_ACCESS_KIND_ALLOW,
        )
    };
    match mapped {
        Ok(()) => format!("https://{}", page::LOCAL_ASSET_HOST),
        Err(e) => {
            log::warn!("could not map {}: {e}", folder.display());
            page::CODEMIRROR_CDN.to_owned()
        }
    }
}

/// A page that never loads cannot post `failed` itself; report it here.
fn register_navigation_failures(webview: &ICoreWebView2, hwnd: HWND) -> Result<()> {
    let handler = NavigationCompletedEventHandler::create(Box::new(move |_webview, args| {
        let Some(args) = args else { return Ok(()) };
        let mut ok = BOOL::default();
        let mut status = COREWEBVIEW2_WEB_ERROR_STATUS::default();
        // SAFETY: args is valid for this callback; both are plain out params.
        unsafe {
            args.IsSuccess(&mut ok)?;
            args.WebErrorStatus(&mut status)?;
        }
        if !ok.as_bool() {
            let message = format!("The editor page failed to load (web error status {}).", status.0);
            post_inbound(hwnd, Inbound::Event(EditorEvent::Failed { message }));
        }
        Ok(())
    }));
    let mut token = Default::default();
    // SAFETY: webview is valid; token receives the registration id.
    unsafe { webview.add_NavigationCompleted(&handler, &mut token) }?;
    Ok(())
}

/// Forward `{"type": …}` messages from the page to the shell.
fn register_page_messages(webview: &ICoreWebView2, hwnd: HWND) -> Result<()> {
    let handler = WebMessageReceivedEventHandler::create(Box::new(move |_webview, args| {
        let Some(args) = args else { return Ok(()) };
        let mut message = PWSTR::null();
        // SAFETY: args is valid for this callback; WebView2 allocates the
        // string and take_pwstr frees it with CoTaskMemFree.
        let json = unsafe {
            args.WebMessageAsJson(&mut message)?;
            take_pwstr(message)
        };
        match EditorEvent::from_page_message(&json) {
            Ok(event) => post_inbound(hwnd, Inbound::Event(event)),
            Err(e) => log::warn!("{e}"),
        }
        Ok(())
    }));
    let mut token = Default::default();
    // SAFETY: webview is valid; token receives the registration id.
    unsafe { webview.add_WebMessageReceived(&handler, &mut token) }?;
    Ok(())
}

fn key_down(vk: VIRTUAL_KEY) -> bool {
    // SAFETY: GetKeyState only reads this thread's keyboard state.
    unsafe { GetKeyState(i32::from(vk.0)) < 0 }
}

/// Keystrokes go to the web view while it has focus; turn the File
/// shortcuts into the same `WM_COMMAND`s the menu sends.
fn register_shortcuts(controller: &ICoreWebView2Controller, hwnd: HWND) -> Result<()> {
    let handler = AcceleratorKeyPressedEventHandler::create(Box::new(move |_controller, args| {
        let Some(args) = args else { return Ok(()) };
        let mut kind = COREWEBVIEW2_KEY_EVENT_KIND::default();
        let mut key = 0u32;
        // SAFETY: args is valid for this callback; both are plain out params.
        unsafe {
            args.KeyEventKind(&mut kind)?;
            args.VirtualKey(&mut key)?;
        }
        if kind != COREWEBVIEW2_KEY_EVENT_KIND_KEY_DOWN {
            return Ok(());
        }
        let action = keymap::lookup(key, key_down(VK_CONTROL), key_down(VK_SHIFT), key_down(VK_MENU));
        if let Some(action) = action {
            // SAFETY: args is valid; hwnd is the main window.
            unsafe {
                args.SetHandled(true)?;
                let _ = PostMessageW(hwnd, WM_COMMAND, WPARAM(super::window::command_id(action)), LPARAM(0));
            }
        }
        Ok(())
    }));
    let mut token = Default::default();
    // SAFETY: controller is valid; token receives the registration id.
    unsafe { controller.add_AcceleratorKeyPressed(&handler, &mut token) }?;
    Ok(())
}
