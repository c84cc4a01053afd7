// ── Platform abstraction layer ────────────────────────────────────────────────
//
// The rest of the codebase talks to the OS only through the traits in
// `shell` and `editor`.  No `unsafe` lives here; all Win32 and WebView2 FFI
// is confined to the `win32` sub-module and never leaks outward.

#[cfg(windows)]
pub mod win32;
