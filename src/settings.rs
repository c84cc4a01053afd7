// ── Settings persistence ──────────────────────────────────────────────────────
//
// Reads and writes `<config dir>/mirror-ide/settings.json`: the theme, mode,
// and font the editor was last left with.  No `unsafe`; pure safe Rust +
// serde_json.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{self, Mode, Theme},
    error::{MirrorError, Result},
};

// ── On-disk type ──────────────────────────────────────────────────────────────

/// Root of the JSON settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SettingsFile {
    pub(crate) version: u32,
    #[serde(default = "default_theme")]
    pub(crate) theme: String,
    #[serde(default = "default_mode")]
    pub(crate) mode: String,
    #[serde(default = "default_font_size")]
    pub(crate) font_size: u32,
    #[serde(default)]
    pub(crate) font_family: Option<String>,
}

fn default_theme() -> String {
    catalog::DEFAULT_THEME.to_owned()
}

fn default_mode() -> String {
    catalog::DEFAULT_MODE.to_owned()
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

const SETTINGS_VERSION: u32 = 1;

/// Matches the `.CodeMirror` rule in the editor page.
pub(crate) const DEFAULT_FONT_SIZE: u32 = 14;

// ── In-memory settings ────────────────────────────────────────────────────────

/// Validated editor settings the shell re-applies to the embedded editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EditorSettings {
    pub(crate) theme: &'static Theme,
    pub(crate) mode: &'static Mode,
    pub(crate) font_size: u32,
    /// `None` leaves the page's stylesheet font in place.
    pub(crate) font_family: Option<String>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            theme: &catalog::THEMES[0],
            mode: &catalog::MODES[0],
            font_size: DEFAULT_FONT_SIZE,
            font_family: None,
        }
    }
}

impl EditorSettings {
    /// Validate a settings file.  Unknown names and out-of-range sizes fall
    /// back to the defaults with a warning; a hand-edited file never stops
    /// the editor from starting.
    pub(crate) fn from_file(file: &SettingsFile) -> Self {
        let defaults = Self::default();
        let theme = catalog::theme(&file.theme).unwrap_or_else(|| {
            log::warn!("settings: unknown theme {:?}, using default", file.theme);
            defaults.theme
        });
        let mode = catalog::mode(&file.mode).unwrap_or_else(|| {
            log::warn!("settings: unknown mode {:?}, using default", file.mode);
            defaults.mode
        });
        let font_size = if catalog::font_size_in_range(file.font_size) {
            file.font_size
        } else {
            log::warn!("settings: font size {} out of range, using default", file.font_size);
            defaults.font_size
        };
        let font_family = file
            .font_family
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_owned);
        Self {
            theme,
            mode,
            font_size,
            font_family,
        }
    }

    pub(crate) fn to_file(&self) -> SettingsFile {
        SettingsFile {
            version: SETTINGS_VERSION,
            theme: self.theme.name.to_owned(),
            mode: self.mode.name.to_owned(),
            font_size: self.font_size,
            font_family: self.font_family.clone(),
        }
    }
}

// ── Path ──────────────────────────────────────────────────────────────────────

/// Return the path to the settings file, or `None` when the platform has no
/// per-user configuration directory.
pub(crate) fn settings_path() -> Option<PathBuf> {
    let mut p = dirs::config_dir()?;
    p.push("mirror-ide");
    p.push("settings.json");
    Some(p)
}

// ── Save ──────────────────────────────────────────────────────────────────────

/// Write `settings` to `path`, creating the parent directory if needed.
pub(crate) fn save_to(path: &Path, settings: &EditorSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| MirrorError::io(dir, e))?;
    }
    let json = serde_json::to_vec_pretty(&settings.to_file())?;
    fs::write(path, json).map_err(|e| MirrorError::io(path, e))
}

// ── Load ──────────────────────────────────────────────────────────────────────

/// Read and parse the settings file at `path`.
///
/// Returns `None` on any error: file missing, JSON parse failure, or an
/// unrecognised version number.  The editor then starts with defaults.
pub(crate) fn load_from(path: &Path) -> Option<SettingsFile> {
    let data = fs::read(path).ok()?;
    let file: SettingsFile = match serde_json::from_slice(&data) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("ignoring unreadable settings file {}: {e}", path.display());
            return None;
        }
    };
    if file.version != SETTINGS_VERSION {
        log::warn!("ignoring settings file version {}", file.version);
        return None;
    }
    Some(file)
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// The persisted settings, kept apart from the session's effective ones.
///
/// Command-line overrides and the mode picked from a file extension only
/// affect the session; `update` records explicit user choices and writes
/// the file.
#[derive(Debug, Clone)]
pub(crate) struct SettingsStore {
    path: Option<PathBuf>,
    saved: EditorSettings,
}

impl SettingsStore {
    /// `path` of `None` keeps changes in memory only.
    pub(crate) fn new(path: Option<PathBuf>, saved: EditorSettings) -> Self {
        Self { path, saved }
    }

    #[cfg(test)]
    pub(crate) fn saved(&self) -> &EditorSettings {
        &self.saved
    }

    /// Apply `change` to the persisted settings and write them out.
    pub(crate) fn update(&mut self, change: impl FnOnce(&mut EditorSettings)) {
        change(&mut self.saved);
        if let Some(path) = &self.path {
            if let Err(e) = save_to(path, &self.saved) {
                log::warn!("could not save settings: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");
        let settings = EditorSettings {
            theme: catalog::theme("monokai").expect("theme"),
            mode: catalog::mode("lua").expect("mode"),
            font_size: 18,
            font_family: Some("Consolas".to_owned()),
        };
        save_to(&path, &settings).expect("save");
        let loaded = load_from(&path).expect("load");
        assert_eq!(EditorSettings::from_file(&loaded), settings);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let file: SettingsFile = serde_json::from_str(r#"{"version":1}"#).expect("parse");
        assert_eq!(EditorSettings::from_file(&file), EditorSettings::default());
    }

    #[test]
    fn invalid_values_fall_back() {
        let file = SettingsFile {
            version: SETTINGS_VERSION,
            theme: "neon".to_owned(),
            mode: "brainfuck".to_owned(),
            font_size: 200,
            font_family: Some("   ".to_owned()),
        };
        assert_eq!(EditorSettings::from_file(&file), EditorSettings::default());
    }

    #[test]
    fn wrong_version_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"version":99,"theme":"dracula"}"#).expect("write");
        assert!(load_from(&path).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(load_from(&path).is_none());
        assert!(load_from(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn default_is_first_table_entry() {
        let d = EditorSettings::default();
        assert_eq!(d.theme.name, catalog::DEFAULT_THEME);
        assert_eq!(d.mode.name, catalog::DEFAULT_MODE);
    }

    #[test]
    fn store_writes_only_what_it_is_given() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let saved = EditorSettings {
            font_size: 12,
            ..EditorSettings::default()
        };
        let mut store = SettingsStore::new(Some(path.clone()), saved);
        store.update(|s| s.theme = catalog::theme("twilight").expect("theme"));

        let file = load_from(&path).expect("written");
        assert_eq!(file.theme, "twilight");
        assert_eq!(file.font_size, 12);
        assert_eq!(store.saved().theme.name, "twilight");
    }

    #[test]
    fn store_without_path_stays_in_memory() {
        let mut store = SettingsStore::new(None, EditorSettings::default());
        store.update(|s| s.font_size = 30);
        assert_eq!(store.saved().font_size, 30);
    }
}
