// ── Window shell ──────────────────────────────────────────────────────────────
//
// The application logic behind the main window: the Document record, the
// unsaved-changes prompts, and forwarding of theme/mode/font choices to the
// embedded editor.  Generic over the editor bridge and the native UI so every
// path runs in unit tests without a window.
//
// All calls happen on the UI thread.  Saving is two-step: `request_value`
// goes out through the bridge, and the write happens when the matching
// `EditorEvent::Value` comes back through `handle_event`.  An action
// interrupted by "Save" at a prompt (New, Open, Close) runs only after that
// write succeeds.  A reply that lands after the document was replaced still
// writes the file it was requested for, but leaves the new document alone.

use std::path::PathBuf;

use crate::{
    catalog::{self, WindowStyle},
    document::{self, Document, EolMode},
    editor::{EditorBridge, EditorEvent, RequestId},
    error::Result,
    settings::{EditorSettings, SettingsStore},
};

// ── Native UI seam ────────────────────────────────────────────────────────────

/// Answer to the "You have unsaved changes" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnsavedChoice {
    Save,
    Discard,
    Cancel,
}

/// Dialogs and window chrome the shell needs from the platform.
pub(crate) trait ShellUi {
    fn confirm_unsaved(&mut self) -> UnsavedChoice;
    fn pick_open_path(&mut self) -> Option<PathBuf>;
    /// `suggested` pre-fills the file name field.
    fn pick_save_path(&mut self, suggested: &str) -> Option<PathBuf>;
    fn pick_font_family(&mut self, current: Option<&str>) -> Option<String>;
    fn show_error(&mut self, message: &str);
    fn set_title(&mut self, title: &str);
    fn apply_window_style(&mut self, style: WindowStyle);
    /// Reflect the current theme/mode/size in menu check marks.
    fn sync_menu(&mut self, settings: &EditorSettings);
    /// Tear the window down (used when a deferred close completes).
    fn close_window(&mut self);
}

// ── Pending save ──────────────────────────────────────────────────────────────

/// What to do once an in-flight save has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AfterSave {
    Nothing,
    New,
    /// `None` asks for the path after saving.
    Open(Option<PathBuf>),
    Close,
}

#[derive(Debug)]
struct PendingSave {
    request: RequestId,
    path: PathBuf,
    /// Line endings to write; the editor reports `\n` only.
    eol: EolMode,
    then: AfterSave,
    /// The document generation that asked for the save.
    generation: u64,
    /// An edit was reported after the request went out.
    edited_since_request: bool,
}

// ── Shell ─────────────────────────────────────────────────────────────────────

pub(crate) struct Shell<E: EditorBridge, U: ShellUi> {
    editor: E,
    ui: U,
    doc: Document,
    settings: EditorSettings,
    store: SettingsStore,
    next_request: RequestId,
    pending: Option<PendingSave>,
    /// Bumped whenever `doc` is replaced by New or Open.
    generation: u64,
    /// Set when the page reported that the editor could not start.
    editor_failure: Option<String>,
}

impl<E: EditorBridge, U: ShellUi> Shell<E, U> {
    /// Create the shell with an untitled document and push `settings` to the
    /// editor (the bridge queues them until the page is ready).
    pub(crate) fn new(
        editor: E,
        ui: U,
        settings: EditorSettings,
        store: SettingsStore,
    ) -> Self {
        let mut shell = Self {
            editor,
            ui,
            doc: Document::untitled(),
            settings,
            store,
            next_request: RequestId(0),
            pending: None,
            generation: 0,
            editor_failure: None,
        };
        shell.apply_settings();
        shell
    }

    // ── File actions ──────────────────────────────────────────────────────────

    /// File → New.
    pub(crate) fn new_document(&mut self) {
        if self.confirm_discard(AfterSave::New) {
            self.reset_to_untitled();
        }
    }

    /// File → Open: prompt for unsaved changes, then ask for a path.
    pub(crate) fn open_document(&mut self) {
        if self.confirm_discard(AfterSave::Open(None)) {
            self.pick_and_load();
        }
    }

    /// Open a known path (command line), prompting for unsaved changes first.
    pub(crate) fn open_path(&mut self, path: PathBuf) {
        if self.confirm_discard(AfterSave::Open(Some(path.clone()))) {
            self.load(path);
        }
    }

    /// File → Save.  Untitled documents go through Save As.
    pub(crate) fn save_document(&mut self) {
        self.begin_save(AfterSave::Nothing);
    }

    /// File → Save As.
    pub(crate) fn save_document_as(&mut self) {
        if !self.can_start_save(AfterSave::Nothing) {
            return;
        }
        if let Some(path) = self.ui.pick_save_path(&self.suggested_name()) {
            self.request_save(path, AfterSave::Nothing);
        }
    }

    /// The user asked to close the window.  Returns `true` when it may close
    /// right away; `false` keeps it open (cancelled, or closing after a save).
    pub(crate) fn request_close(&mut self) -> bool {
        self.confirm_discard(AfterSave::Close)
    }

    // ── Editor events ─────────────────────────────────────────────────────────

    pub(crate) fn handle_event(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::Ready => {
                log::debug!("editor page ready");
                let result = self.editor.mark_ready();
                self.report(result);
            }
            EditorEvent::Changed => {
                if let Some(p) = self.pending.as_mut() {
                    p.edited_since_request = true;
                }
                if !self.doc.dirty {
                    self.doc.dirty = true;
                    self.refresh_title();
                }
            }
            EditorEvent::Value { request, text } => match self.pending.take() {
                Some(p) if p.request == request => self.finish_save(p, &text),
                other => {
                    log::warn!("ignoring editor value for unknown request {}", request.0);
                    self.pending = other;
                }
            },
            EditorEvent::Failed { message } => {
                log::error!("editor failed to start: {message}");
                if self.pending.take().is_some() {
                    log::warn!("abandoning the save in progress");
                }
                self.ui.show_error(&format!("The editor could not be loaded.\n\n{message}"));
                self.editor_failure = Some(message);
            }
        }
    }

    /// A bridge request failed before a reply could arrive.
    pub(crate) fn request_failed(&mut self, request: RequestId, message: &str) {
        if self.pending.as_ref().is_some_and(|p| p.request == request) {
            self.pending = None;
            log::error!("save aborted: {message}");
            self.ui.show_error(&format!("Could not read the editor contents.\n\n{message}"));
        }
    }

    // ── Theme / mode / font ───────────────────────────────────────────────────

    pub(crate) fn set_theme(&mut self, name: &str) {
        let Some(theme) = catalog::theme(name) else {
            log::warn!("unknown theme {name:?}; ignoring");
            return;
        };
        self.settings.theme = theme;
        let result = self.editor.set_theme(theme.name);
        self.report(result);
        self.ui.apply_window_style(WindowStyle::for_theme(theme));
        self.ui.sync_menu(&self.settings);
        self.store.update(|s| s.theme = theme);
    }

    pub(crate) fn set_mode(&mut self, name: &str) {
        let Some(mode) = catalog::mode(name) else {
            log::warn!("unknown mode {name:?}; ignoring");
            return;
        };
        self.apply_mode(mode);
        self.store.update(|s| s.mode = mode);
    }

    pub(crate) fn set_font_size(&mut self, px: u32) {
        if !catalog::font_size_in_range(px) {
            log::warn!(
                "font size {px}px outside {}..={}; ignoring",
                catalog::MIN_FONT_SIZE,
                catalog::MAX_FONT_SIZE
            );
            return;
        }
        self.settings.font_size = px;
        let result = self.editor.set_font_size(px);
        self.report(result);
        self.ui.sync_menu(&self.settings);
        self.store.update(|s| s.font_size = px);
    }

    /// Settings → Larger / Smaller: step the size by `delta` pixels, clamped
    /// to the supported range.
    pub(crate) fn adjust_font_size(&mut self, delta: i32) {
        let current = i64::from(self.settings.font_size);
        let wanted = (current + i64::from(delta)).clamp(
            i64::from(catalog::MIN_FONT_SIZE),
            i64::from(catalog::MAX_FONT_SIZE),
        );
        if wanted != current {
            // Clamped into 10..=48 above.
            self.set_font_size(wanted as u32);
        }
    }

    pub(crate) fn set_font_family(&mut self, family: &str) {
        let family = family.trim();
        if family.is_empty() {
            log::warn!("empty font family; ignoring");
            return;
        }
        self.settings.font_family = Some(family.to_owned());
        let result = self.editor.set_font_family(family);
        self.report(result);
        self.ui.sync_menu(&self.settings);
        let family = family.to_owned();
        self.store.update(|s| s.font_family = Some(family));
    }

    /// Settings → Font Family: ask the platform font picker.
    pub(crate) fn choose_font_family(&mut self) {
        let current = self.settings.font_family.clone();
        if let Some(family) = self.ui.pick_font_family(current.as_deref()) {
            self.set_font_family(&family);
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Push every setting and the window chrome that goes with it.
    fn apply_settings(&mut self) {
        let s = self.settings.clone();
        let mut result = self
            .editor
            .set_theme(s.theme.name)
            .and_then(|_| self.editor.set_mode(s.mode.name))
            .and_then(|_| self.editor.set_font_size(s.font_size));
        if let Some(family) = s.font_family.as_deref() {
            result = result.and_then(|_| self.editor.set_font_family(family));
        }
        self.report(result);
        self.ui.apply_window_style(WindowStyle::for_theme(s.theme));
        self.ui.sync_menu(&s);
        self.refresh_title();
    }

    /// If the document is dirty, ask what to do.  Returns `true` when the
    /// caller may proceed now.  Choosing Save starts a save and defers `then`.
    fn confirm_discard(&mut self, then: AfterSave) -> bool {
        if !self.doc.dirty {
            return true;
        }
        match self.ui.confirm_unsaved() {
            UnsavedChoice::Discard => true,
            UnsavedChoice::Cancel => false,
            UnsavedChoice::Save => {
                self.begin_save(then);
                false
            }
        }
    }

    /// Switch the session's mode without recording it as a preference.
    fn apply_mode(&mut self, mode: &'static catalog::Mode) {
        self.settings.mode = mode;
        let result = self.editor.set_mode(mode.name);
        self.report(result);
        self.ui.sync_menu(&self.settings);
    }

    fn replace_document(&mut self, doc: Document) {
        self.doc = doc;
        self.generation += 1;
    }

    fn reset_to_untitled(&mut self) {
        self.replace_document(Document::untitled());
        let result = self.editor.set_value("");
        self.report(result);
        self.refresh_title();
    }

    fn pick_and_load(&mut self) {
        if let Some(path) = self.ui.pick_open_path() {
            self.load(path);
        }
    }

    /// Read `path` and hand its text to the editor.  Failures leave the
    /// current document untouched.
    fn load(&mut self, path: PathBuf) {
        let text = match document::read_text(&path) {
            Ok(text) => text,
            Err(e) => {
                log::error!("open failed: {e}");
                self.ui.show_error(&format!("Could not open the file.\n\n{e}"));
                return;
            }
        };
        log::info!("opened {} ({} bytes)", path.display(), text.len());
        let detected = catalog::mode_from_path(&path);
        self.replace_document(Document::loaded(path, &text));
        let result = self.editor.set_value(&text);
        self.report(result);
        if let Some(mode) = detected.filter(|m| *m != self.settings.mode) {
            self.apply_mode(mode);
        }
        self.refresh_title();
    }

    fn begin_save(&mut self, then: AfterSave) {
        if !self.can_start_save(then.clone()) {
            return;
        }
        let path = match self.doc.path.clone() {
            Some(p) => p,
            None => match self.ui.pick_save_path(&self.suggested_name()) {
                Some(p) => p,
                // Cancelling Save As also cancels whatever was waiting on it.
                None => return,
            },
        };
        self.request_save(path, then);
    }

    /// Whether a new save may start.  While one is in flight, an action
    /// deferred at a prompt rides on it instead; anything else is refused
    /// with a message.
    fn can_start_save(&mut self, then: AfterSave) -> bool {
        if let Some(message) = &self.editor_failure {
            let message = format!("The editor could not be loaded, so nothing can be saved.\n\n{message}");
            self.ui.show_error(&message);
            return false;
        }
        let Some(p) = self.pending.as_mut() else {
            return true;
        };
        if then != AfterSave::Nothing
            && p.then == AfterSave::Nothing
            && p.generation == self.generation
        {
            log::debug!("{then:?} will follow the save to {}", p.path.display());
            p.then = then;
            return false;
        }
        let message = format!("A save to {} is still in progress.", p.path.display());
        log::warn!("{message}");
        self.ui.show_error(&message);
        false
    }

    fn request_save(&mut self, path: PathBuf, then: AfterSave) {
        let request = self.next_request.take_next();
        if let Err(e) = self.editor.request_value(request) {
            log::error!("could not request editor contents: {e}");
            self.ui.show_error(&format!("Could not read the editor contents.\n\n{e}"));
            return;
        }
        self.pending = Some(PendingSave {
            request,
            path,
            eol: self.doc.eol,
            then,
            generation: self.generation,
            edited_since_request: false,
        });
    }

    fn finish_save(&mut self, pending: PendingSave, text: &str) {
        let text = pending.eol.apply(text);
        if let Err(e) = document::write_text(&pending.path, &text) {
            log::error!("save failed: {e}");
            self.ui.show_error(&format!("Could not save the file.\n\n{e}"));
            return;
        }
        log::info!("saved {} ({} bytes)", pending.path.display(), text.len());
        if pending.generation != self.generation {
            log::debug!("document replaced while saving; keeping the new one as is");
            return;
        }
        self.doc.saved_to(pending.path.clone());
        self.doc.dirty = pending.edited_since_request;
        self.refresh_title();

        if self.doc.dirty && pending.then != AfterSave::Nothing {
            // Edits arrived after the request; save again before moving on.
            self.request_save(pending.path, pending.then);
            return;
        }
        match pending.then {
            AfterSave::Nothing => {}
            AfterSave::New => self.reset_to_untitled(),
            AfterSave::Open(Some(path)) => self.load(path),
            AfterSave::Open(None) => self.pick_and_load(),
            AfterSave::Close => self.ui.close_window(),
        }
    }

    fn suggested_name(&self) -> String {
        match &self.doc.path {
            Some(_) => self.doc.display_name(),
            None => String::new(),
        }
    }

    fn refresh_title(&mut self) {
        let title = self.doc.window_title();
        self.ui.set_title(&title);
    }

    /// Surface a bridge failure from a fire-and-forget call.
    fn report(&mut self, result: Result<()>) {
        if let Err(e) = result {
            log::error!("{e}");
            self.ui.show_error(&e.to_string());
        }
    }
}

#[cfg(test)]
impl<E: EditorBridge, U: ShellUi> Shell<E, U> {
    pub(crate) fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub(crate) fn editor(&self) -> &E {
        &self.editor
    }

    pub(crate) fn ui(&mut self) -> &mut U {
        &mut self.ui
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, path::Path};

    use super::*;
    use crate::{error::MirrorError, settings};

    /// Stands in for the embedded editor: keeps the buffer and every setting.
    #[derive(Default)]
    struct FakeEditor {
        content: String,
        theme: Option<&'static str>,
        mode: Option<&'static str>,
        font_size: Option<u32>,
        font_family: Option<String>,
        requests: Vec<RequestId>,
        fail_requests: bool,
    }

    impl EditorBridge for FakeEditor {
        fn set_value(&mut self, text: &str) -> Result<()> {
            self.content = text.to_owned();
            Ok(())
        }
        fn request_value(&mut self, request: RequestId) -> Result<()> {
            if self.fail_requests {
                return Err(MirrorError::Bridge("web view gone".to_owned()));
            }
            self.requests.push(request);
            Ok(())
        }
        fn set_theme(&mut self, name: &'static str) -> Result<()> {
            self.theme = Some(name);
            Ok(())
        }
        fn set_mode(&mut self, name: &'static str) -> Result<()> {
            self.mode = Some(name);
            Ok(())
        }
        fn set_font_size(&mut self, px: u32) -> Result<()> {
            self.font_size = Some(px);
            Ok(())
        }
        fn set_font_family(&mut self, family: &str) -> Result<()> {
            self.font_family = Some(family.to_owned());
            Ok(())
        }
    }

    /// Scripted dialog answers plus a record of what the shell showed.
    #[derive(Default)]
    struct FakeUi {
        choices: VecDeque<UnsavedChoice>,
        open_paths: VecDeque<PathBuf>,
        save_paths: VecDeque<PathBuf>,
        font_family: Option<String>,
        prompts: usize,
        errors: Vec<String>,
        title: String,
        style: Option<WindowStyle>,
        menu_theme: Option<&'static str>,
        closed: bool,
    }

    impl ShellUi for FakeUi {
        fn confirm_unsaved(&mut self) -> UnsavedChoice {
            self.prompts += 1;
            self.choices.pop_front().unwrap_or(UnsavedChoice::Cancel)
        }
        fn pick_open_path(&mut self) -> Option<PathBuf> {
            self.open_paths.pop_front()
        }
        fn pick_save_path(&mut self, _suggested: &str) -> Option<PathBuf> {
            self.save_paths.pop_front()
        }
        fn pick_font_family(&mut self, _current: Option<&str>) -> Option<String> {
            self.font_family.take()
        }
        fn show_error(&mut self, message: &str) {
            self.errors.push(message.to_owned());
        }
        fn set_title(&mut self, title: &str) {
            self.title = title.to_owned();
        }
        fn apply_window_style(&mut self, style: WindowStyle) {
            self.style = Some(style);
        }
        fn sync_menu(&mut self, settings: &EditorSettings) {
            self.menu_theme = Some(settings.theme.name);
        }
        fn close_window(&mut self) {
            self.closed = true;
        }
    }

    type TestShell = Shell<FakeEditor, FakeUi>;

    fn shell() -> TestShell {
        Shell::new(
            FakeEditor::default(),
            FakeUi::default(),
            EditorSettings::default(),
            SettingsStore::new(None, EditorSettings::default()),
        )
    }

    /// A shell persisting to `path`, starting from `effective` over `saved`.
    fn shell_with_store(path: &Path, effective: EditorSettings, saved: EditorSettings) -> TestShell {
        Shell::new(
            FakeEditor::default(),
            FakeUi::default(),
            effective,
            SettingsStore::new(Some(path.to_path_buf()), saved),
        )
    }

    /// Deliver the editor's current buffer as the reply to its last request.
    fn answer_value(shell: &mut TestShell) {
        let request = *shell.editor().requests.last().expect("a value request");
        let text = shell.editor().content.clone();
        shell.handle_event(EditorEvent::Value { request, text });
    }

    /// Simulate the user typing `text` into the editor.
    fn type_text(shell: &mut TestShell, text: &str) {
        shell.editor.content.push_str(text);
        shell.handle_event(EditorEvent::Changed);
    }

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, text).expect("write fixture");
        p
    }

    #[test]
    fn startup_pushes_settings() {
        let s = shell();
        assert_eq!(s.editor().theme, Some("default"));
        assert_eq!(s.editor().mode, Some("python"));
        assert_eq!(s.editor().font_size, Some(14));
        assert_eq!(s.editor().font_family, None);
        assert_eq!(s.ui.style, Some(WindowStyle::Light));
        assert_eq!(s.ui.title, "Mirror IDE");
    }

    #[test]
    fn open_loads_exact_content_and_is_clean() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text = "def f():\r\n    return `x` + \"${y}\"\r\n";
        let path = write(dir.path(), "f.py", text);

        let mut s = shell();
        s.ui().open_paths.push_back(path.clone());
        s.open_document();

        assert_eq!(s.editor().content, text);
        assert_eq!(s.document().eol, EolMode::Crlf);
        assert_eq!(s.document().path.as_deref(), Some(path.as_path()));
        assert!(!s.document().dirty);
        assert_eq!(s.ui.title, "f.py \u{2014} Mirror IDE");
    }

    #[test]
    fn open_switches_mode_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "init.lua", "print(1)\n");
        let mut s = shell();
        s.open_path(path);
        assert_eq!(s.editor().mode, Some("lua"));
        assert_eq!(s.settings().mode.name, "lua");
    }

    #[test]
    fn open_failure_shows_error_and_keeps_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut s = shell();
        type_text(&mut s, "keep me");
        s.ui().choices.push_back(UnsavedChoice::Discard);
        s.open_path(dir.path().join("missing.py"));

        assert_eq!(s.ui.errors.len(), 1);
        assert!(s.ui.errors[0].contains("missing.py"));
        assert_eq!(s.editor().content, "keep me");
        assert!(s.document().dirty);
    }

    #[test]
    fn editing_after_load_sets_dirty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "a.py", "x = 1\n");
        let mut s = shell();
        s.open_path(path);
        type_text(&mut s, "y = 2\n");
        assert!(s.document().dirty);
        assert_eq!(s.ui.title, "*a.py \u{2014} Mirror IDE");
    }

    #[test]
    fn save_writes_editor_content_and_clears_dirty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "a.py", "x = 1\n");
        let mut s = shell();
        s.open_path(path.clone());
        type_text(&mut s, "y = 2\n");

        s.save_document();
        assert!(s.document().dirty, "dirty until the value arrives");
        answer_value(&mut s);

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "x = 1\ny = 2\n");
        assert!(!s.document().dirty);
    }

    #[test]
    fn save_untitled_goes_through_save_as() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("new.js");
        let mut s = shell();
        type_text(&mut s, "let a = 1;");
        s.ui().save_paths.push_back(target.clone());

        s.save_document();
        answer_value(&mut s);

        assert_eq!(std::fs::read_to_string(&target).expect("read"), "let a = 1;");
        assert_eq!(s.document().path.as_deref(), Some(target.as_path()));
        assert!(!s.document().dirty);
    }

    #[test]
    fn save_as_cancelled_does_nothing() {
        let mut s = shell();
        type_text(&mut s, "data");
        s.save_document_as();
        assert!(s.editor().requests.is_empty());
        assert!(s.document().dirty);
    }

    #[test]
    fn save_as_updates_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = write(dir.path(), "a.py", "a\n");
        let second = dir.path().join("b.py");
        let mut s = shell();
        s.open_path(first.clone());
        s.ui().save_paths.push_back(second.clone());

        s.save_document_as();
        answer_value(&mut s);

        assert_eq!(s.document().path.as_deref(), Some(second.as_path()));
        assert_eq!(std::fs::read_to_string(&second).expect("read"), "a\n");
        assert_eq!(std::fs::read_to_string(&first).expect("read"), "a\n");
    }

    #[test]
    fn write_failure_is_reported_and_stays_dirty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut s = shell();
        type_text(&mut s, "text");
        s.ui().save_paths.push_back(dir.path().join("no-such-dir").join("x.py"));

        s.save_document();
        answer_value(&mut s);

        assert_eq!(s.ui.errors.len(), 1);
        assert!(s.ui.errors[0].starts_with("Could not save the file."));
        assert!(s.document().dirty);
        assert_eq!(s.document().path, None);
    }

    #[test]
    fn edit_during_save_keeps_dirty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "a.py", "");
        let mut s = shell();
        s.open_path(path);
        type_text(&mut s, "one");
        s.save_document();
        let request = *s.editor().requests.last().expect("request");
        type_text(&mut s, " two");
        s.handle_event(EditorEvent::Value {
            request,
            text: "one".to_owned(),
        });
        assert!(s.document().dirty);
    }

    #[test]
    fn save_keeps_the_file_line_endings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "w.py", "a = 1\r\nb = 2\r\n");
        let mut s = shell();
        s.open_path(path.clone());
        s.editor.content = "a = 1\nb = 2\npasted\r\n".to_owned();
        s.handle_event(EditorEvent::Changed);

        s.save_document();
        answer_value(&mut s);

        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "a = 1\r\nb = 2\r\npasted\r\n"
        );
    }

    #[test]
    fn late_value_after_discard_leaves_new_document_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "a.py", "");
        let mut s = shell();
        s.open_path(path.clone());
        type_text(&mut s, "old work");
        s.save_document();
        let request = *s.editor().requests.last().expect("request");

        type_text(&mut s, " and more");
        s.ui().choices.push_back(UnsavedChoice::Discard);
        s.new_document();
        s.handle_event(EditorEvent::Value {
            request,
            text: "old work".to_owned(),
        });

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "old work");
        assert_eq!(s.document().path, None);
        assert!(!s.document().dirty);
        assert_eq!(s.ui.title, "Mirror IDE");
    }

    #[test]
    fn late_value_after_opening_another_file_keeps_it_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = write(dir.path(), "a.py", "");
        let second = write(dir.path(), "b.py", "b\n");
        let mut s = shell();
        s.open_path(first.clone());
        type_text(&mut s, "a");
        s.save_document();
        let request = *s.editor().requests.last().expect("request");

        type_text(&mut s, "a");
        s.ui().choices.push_back(UnsavedChoice::Discard);
        s.open_path(second.clone());
        type_text(&mut s, "c");
        s.handle_event(EditorEvent::Value {
            request,
            text: "a".to_owned(),
        });

        assert_eq!(std::fs::read_to_string(&first).expect("read"), "a");
        assert_eq!(s.document().path.as_deref(), Some(second.as_path()));
        assert!(s.document().dirty);
    }

    #[test]
    fn close_saved_while_a_save_is_running_closes_after_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "w.py", "");
        let mut s = shell();
        s.open_path(path.clone());
        type_text(&mut s, "work");
        s.save_document();
        s.ui().choices.push_back(UnsavedChoice::Save);

        assert!(!s.request_close());
        assert_eq!(s.editor().requests.len(), 1, "no second request");
        answer_value(&mut s);

        assert!(s.ui.closed);
        assert!(s.ui.errors.is_empty());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "work");
    }

    #[test]
    fn close_waits_for_edits_made_during_the_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "w.py", "");
        let mut s = shell();
        s.open_path(path.clone());
        type_text(&mut s, "one");
        s.ui().choices.push_back(UnsavedChoice::Save);
        assert!(!s.request_close());
        let request = *s.editor().requests.last().expect("request");

        type_text(&mut s, " two");
        s.handle_event(EditorEvent::Value {
            request,
            text: "one".to_owned(),
        });
        assert!(!s.ui.closed, "second save still outstanding");
        assert_eq!(s.editor().requests.len(), 2);

        answer_value(&mut s);
        assert!(s.ui.closed);
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "one two");
    }

    #[test]
    fn second_save_while_one_is_running_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "w.py", "");
        let mut s = shell();
        s.open_path(path);
        type_text(&mut s, "work");
        s.save_document();
        s.save_document_as();

        assert_eq!(s.editor().requests.len(), 1);
        assert_eq!(s.ui.errors.len(), 1);
        assert!(s.ui.errors[0].contains("still in progress"));
    }

    #[test]
    fn editor_failure_is_reported_and_blocks_saving() {
        let mut s = shell();
        type_text(&mut s, "draft");
        s.handle_event(EditorEvent::Failed {
            message: "CodeMirror did not load".to_owned(),
        });
        assert_eq!(s.ui.errors.len(), 1);
        assert!(s.ui.errors[0].contains("CodeMirror did not load"));

        s.ui().save_paths.push_back(PathBuf::from("x.py"));
        s.save_document();
        assert!(s.editor().requests.is_empty());
        assert_eq!(s.ui.errors.len(), 2);

        s.ui().choices.push_back(UnsavedChoice::Discard);
        assert!(s.request_close(), "discarding still closes");
    }

    #[test]
    fn stale_value_is_ignored() {
        let mut s = shell();
        s.handle_event(EditorEvent::Value {
            request: RequestId(42),
            text: "ghost".to_owned(),
        });
        assert!(s.ui.errors.is_empty());
        assert_eq!(s.document(), &Document::untitled());
    }

    #[test]
    fn request_failure_is_reported() {
        let mut s = shell();
        type_text(&mut s, "x");
        s.editor.fail_requests = true;
        s.ui().save_paths.push_back(PathBuf::from("x.py"));
        s.save_document();
        assert_eq!(s.ui.errors.len(), 1);
        assert!(s.document().dirty);
    }

    #[test]
    fn new_when_clean_does_not_prompt() {
        let mut s = shell();
        s.new_document();
        assert_eq!(s.ui.prompts, 0);
        assert_eq!(s.document(), &Document::untitled());
    }

    #[test]
    fn new_when_dirty_prompts_and_discard_clears_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "a.py", "old\n");
        let mut s = shell();
        s.open_path(path);
        type_text(&mut s, "more");
        s.ui().choices.push_back(UnsavedChoice::Discard);

        s.new_document();

        assert_eq!(s.ui.prompts, 1);
        assert_eq!(s.editor().content, "");
        assert_eq!(s.document().path, None);
        assert!(!s.document().dirty);
        assert_eq!(s.ui.title, "Mirror IDE");
    }

    #[test]
    fn new_when_dirty_and_cancel_keeps_everything() {
        let mut s = shell();
        type_text(&mut s, "draft");
        s.ui().choices.push_back(UnsavedChoice::Cancel);
        s.new_document();
        assert_eq!(s.editor().content, "draft");
        assert!(s.document().dirty);
    }

    #[test]
    fn new_after_save_waits_for_the_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("draft.py");
        let mut s = shell();
        type_text(&mut s, "draft");
        s.ui().choices.push_back(UnsavedChoice::Save);
        s.ui().save_paths.push_back(target.clone());

        s.new_document();
        assert_eq!(s.editor().content, "draft", "not cleared before the write");

        answer_value(&mut s);
        assert_eq!(std::fs::read_to_string(&target).expect("read"), "draft");
        assert_eq!(s.editor().content, "");
        assert_eq!(s.document(), &Document::untitled());
    }

    #[test]
    fn open_after_failed_save_is_abandoned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let other = write(dir.path(), "other.py", "other\n");
        let mut s = shell();
        type_text(&mut s, "draft");
        s.ui().choices.push_back(UnsavedChoice::Save);
        s.ui().save_paths.push_back(dir.path().join("missing").join("d.py"));

        s.open_path(other);
        answer_value(&mut s);

        assert_eq!(s.ui.errors.len(), 1);
        assert_eq!(s.editor().content, "draft");
        assert!(s.document().dirty);
    }

    #[test]
    fn open_dialog_follows_a_prompted_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let saved = dir.path().join("saved.py");
        let next = write(dir.path(), "next.sql", "select 1;\n");
        let mut s = shell();
        type_text(&mut s, "draft");
        s.ui().choices.push_back(UnsavedChoice::Save);
        s.ui().save_paths.push_back(saved.clone());
        s.ui().open_paths.push_back(next.clone());

        s.open_document();
        answer_value(&mut s);

        assert_eq!(std::fs::read_to_string(&saved).expect("read"), "draft");
        assert_eq!(s.editor().content, "select 1;\n");
        assert_eq!(s.document().path.as_deref(), Some(next.as_path()));
    }

    #[test]
    fn dark_theme_applies_dark_style() {
        let mut s = shell();
        s.set_theme("dracula");
        assert_eq!(s.editor().theme, Some("dracula"));
        assert_eq!(s.ui.style, Some(WindowStyle::Dark));
        assert_eq!(s.ui.menu_theme, Some("dracula"));

        s.set_theme("eclipse");
        assert_eq!(s.ui.style, Some(WindowStyle::Light));
    }

    #[test]
    fn unknown_theme_and_mode_are_ignored() {
        let mut s = shell();
        s.set_theme("dracula");
        s.set_theme("neon");
        s.set_mode("cobol");
        assert_eq!(s.editor().theme, Some("dracula"));
        assert_eq!(s.editor().mode, Some("python"));
        assert_eq!(s.ui.style, Some(WindowStyle::Dark));
        assert!(s.ui.errors.is_empty());
    }

    #[test]
    fn font_settings_are_forwarded() {
        let mut s = shell();
        s.set_font_size(20);
        s.set_font_size(100);
        assert_eq!(s.editor().font_size, Some(20));

        s.ui().font_family = Some("  JetBrains Mono ".to_owned());
        s.choose_font_family();
        assert_eq!(s.editor().font_family.as_deref(), Some("JetBrains Mono"));
        s.set_font_family("   ");
        assert_eq!(s.settings().font_family.as_deref(), Some("JetBrains Mono"));
    }

    #[test]
    fn font_size_steps_within_range() {
        let mut s = shell();
        s.adjust_font_size(1);
        assert_eq!(s.settings().font_size, 15);
        s.adjust_font_size(-3);
        assert_eq!(s.editor().font_size, Some(12));

        s.set_font_size(47);
        s.adjust_font_size(4);
        assert_eq!(s.settings().font_size, 48);
        s.set_font_size(10);
        s.adjust_font_size(-1);
        assert_eq!(s.settings().font_size, 10);
    }

    #[test]
    fn settings_changes_are_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let mut s = shell_with_store(&path, EditorSettings::default(), EditorSettings::default());
        s.set_theme("monokai");
        s.set_font_size(16);
        let stored = settings::load_from(&path).expect("stored");
        assert_eq!(stored.theme, "monokai");
        assert_eq!(stored.font_size, 16);
    }

    #[test]
    fn detected_mode_is_not_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let lua = write(dir.path(), "init.lua", "print(1)\n");
        let mut s = shell_with_store(&path, EditorSettings::default(), EditorSettings::default());
        s.open_path(lua);
        assert_eq!(s.settings().mode.name, "lua");
        assert!(!path.exists());

        s.set_font_size(18);
        let stored = settings::load_from(&path).expect("stored");
        assert_eq!(stored.mode, "python");
    }

    #[test]
    fn command_line_overrides_are_not_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let mut effective = EditorSettings::default();
        effective.theme = catalog::theme("dracula").expect("theme");
        let mut s = shell_with_store(&path, effective, EditorSettings::default());
        assert_eq!(s.editor().theme, Some("dracula"));

        s.set_font_size(18);
        let stored = settings::load_from(&path).expect("stored");
        assert_eq!(stored.theme, "default");
        assert_eq!(stored.font_size, 18);
    }

    #[test]
    fn close_clean_closes_immediately() {
        let mut s = shell();
        assert!(s.request_close());
        assert_eq!(s.ui.prompts, 0);
    }

    #[test]
    fn close_dirty_cancel_stays_open_and_unchanged() {
        let mut s = shell();
        type_text(&mut s, "work");
        let before = s.document().clone();
        s.ui().choices.push_back(UnsavedChoice::Cancel);
        assert!(!s.request_close());
        assert_eq!(s.document(), &before);
        assert_eq!(s.editor().content, "work");
        assert!(!s.ui.closed);
    }

    #[test]
    fn close_dirty_discard_closes() {
        let mut s = shell();
        type_text(&mut s, "work");
        s.ui().choices.push_back(UnsavedChoice::Discard);
        assert!(s.request_close());
    }

    #[test]
    fn close_dirty_save_closes_after_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "w.py", "");
        let mut s = shell();
        s.open_path(path.clone());
        type_text(&mut s, "work");
        s.ui().choices.push_back(UnsavedChoice::Save);

        assert!(!s.request_close());
        assert!(!s.ui.closed);
        answer_value(&mut s);
        assert!(s.ui.closed);
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "work");
    }
}
