// ── Keyboard shortcuts ────────────────────────────────────────────────────────
//
// One table drives both the native accelerator table and the web view's
// accelerator-key hook: while the editor surface has focus, keystrokes go to
// the web view and never reach the top-level window's message loop.

/// A file action reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileAction {
    New,
    Open,
    Save,
    SaveAs,
}

/// A key chord.  `key` is an uppercase ASCII letter, which is also its
/// Win32 virtual-key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shortcut {
    pub(crate) key: u8,
    pub(crate) ctrl: bool,
    pub(crate) shift: bool,
    pub(crate) action: FileAction,
}

impl Shortcut {
    /// Menu-style label such as `"Ctrl+Shift+S"`.
    pub(crate) fn label(&self) -> String {
        let mut out = String::new();
        if self.ctrl {
            out.push_str("Ctrl+");
        }
        if self.shift {
            out.push_str("Shift+");
        }
        out.push(char::from(self.key));
        out
    }
}

pub(crate) static SHORTCUTS: &[Shortcut] = &[
    Shortcut { key: b'N', ctrl: true, shift: false, action: FileAction::New },
    Shortcut { key: b'O', ctrl: true, shift: false, action: FileAction::Open },
    Shortcut { key: b'S', ctrl: true, shift: false, action: FileAction::Save },
    Shortcut { key: b'S', ctrl: true, shift: true, action: FileAction::SaveAs },
];

/// Resolve a key press to an action.  Alt chords never match.
pub(crate) fn lookup(key: u32, ctrl: bool, shift: bool, alt: bool) -> Option<FileAction> {
    if alt {
        return None;
    }
    SHORTCUTS
        .iter()
        .find(|s| u32::from(s.key) == key && s.ctrl == ctrl && s.shift == shift)
        .map(|s| s.action)
}

/// The shortcut bound to `action`.
pub(crate) fn shortcut_for(action: FileAction) -> Option<&'static Shortcut> {
    SHORTCUTS.iter().find(|s| s.action == action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventional_bindings() {
        assert_eq!(lookup(u32::from(b'N'), true, false, false), Some(FileAction::New));
        assert_eq!(lookup(u32::from(b'O'), true, false, false), Some(FileAction::Open));
        assert_eq!(lookup(u32::from(b'S'), true, false, false), Some(FileAction::Save));
        assert_eq!(lookup(u32::from(b'S'), true, true, false), Some(FileAction::SaveAs));
    }

    #[test]
    fn modifiers_must_match_exactly() {
        assert_eq!(lookup(u32::from(b'S'), false, false, false), None);
        assert_eq!(lookup(u32::from(b'N'), true, true, false), None);
        assert_eq!(lookup(u32::from(b'S'), true, false, true), None);
    }

    #[test]
    fn labels() {
        let save_as = shortcut_for(FileAction::SaveAs).expect("bound");
        assert_eq!(save_as.label(), "Ctrl+Shift+S");
        assert_eq!(shortcut_for(FileAction::New).map(Shortcut::label).as_deref(), Some("Ctrl+N"));
    }
}
