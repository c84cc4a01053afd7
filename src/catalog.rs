// ── Theme and mode catalog ────────────────────────────────────────────────────
//
// Static tables of the editor themes and language modes the embedded editor
// page ships with.  Names are forwarded verbatim to the page, so the shell
// validates against these tables before calling into the bridge.  No Win32
// imports; pure Rust.

use std::path::Path;

// ── Themes ────────────────────────────────────────────────────────────────────

/// One editor colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Theme {
    /// Identifier understood by `changeTheme()` in the editor page.
    pub(crate) name: &'static str,
    /// `true` when the window chrome should switch to the dark style.
    pub(crate) dark: bool,
}

pub(crate) const DEFAULT_THEME: &str = "default";

pub(crate) static THEMES: &[Theme] = &[
    Theme { name: "default", dark: false },
    Theme { name: "3024-day", dark: false },
    Theme { name: "3024-night", dark: true },
    Theme { name: "abcdef", dark: false },
    Theme { name: "base16-dark", dark: true },
    Theme { name: "base16-light", dark: false },
    Theme { name: "bespin", dark: false },
    Theme { name: "dracula", dark: true },
    Theme { name: "eclipse", dark: false },
    Theme { name: "monokai", dark: true },
    Theme { name: "solarized", dark: true },
    Theme { name: "twilight", dark: true },
    Theme { name: "material-darker", dark: true },
    Theme { name: "panda-syntax", dark: true },
];

/// Look up a theme by its exact identifier.
pub(crate) fn theme(name: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.name == name)
}

// ── Window style ──────────────────────────────────────────────────────────────

/// Light or dark window chrome around the editor surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowStyle {
    Light,
    Dark,
}

impl WindowStyle {
    /// The style that goes with `theme`: dark for the dark set, light otherwise.
    pub(crate) fn for_theme(theme: &Theme) -> Self {
        if theme.dark {
            Self::Dark
        } else {
            Self::Light
        }
    }

    /// Window background in 0xRRGGBB form.
    pub(crate) fn background(self) -> u32 {
        match self {
            Self::Light => 0xFF_FF_FF,
            Self::Dark => 0x2E_2E_2E,
        }
    }

    pub(crate) fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

// ── Modes ─────────────────────────────────────────────────────────────────────

/// One language mode of the embedded editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mode {
    /// Identifier understood by `changeMode()` in the editor page.
    pub(crate) name: &'static str,
    /// Human-readable name for menus and file-dialog filters.
    pub(crate) label: &'static str,
    /// Lowercase file extensions, without the leading dot.
    pub(crate) extensions: &'static [&'static str],
}

pub(crate) const DEFAULT_MODE: &str = "python";

pub(crate) static MODES: &[Mode] = &[
    Mode { name: "python", label: "Python", extensions: &["py", "pyw", "pyi"] },
    Mode { name: "javascript", label: "JavaScript", extensions: &["js", "mjs", "cjs"] },
    Mode { name: "xml", label: "XML", extensions: &["xml", "xsl", "xslt", "svg", "html", "htm"] },
    Mode { name: "css", label: "CSS", extensions: &["css"] },
    Mode { name: "c", label: "C", extensions: &["c", "h"] },
    Mode { name: "cpp", label: "C++", extensions: &["cpp", "cc", "cxx", "hpp", "hh", "hxx"] },
    Mode { name: "csharp", label: "C#", extensions: &["cs"] },
    Mode { name: "lua", label: "Lua", extensions: &["lua"] },
    Mode { name: "vb", label: "VB", extensions: &["vb", "vbs"] },
    Mode { name: "sql", label: "SQL", extensions: &["sql"] },
    Mode { name: "json", label: "JSON", extensions: &["json", "jsonc"] },
    Mode { name: "java", label: "Java", extensions: &["java"] },
];

/// Look up a mode by its exact identifier.
pub(crate) fn mode(name: &str) -> Option<&'static Mode> {
    MODES.iter().find(|m| m.name == name)
}

/// Detect the mode from a file path by its (case-insensitive) extension.
///
/// Returns `None` when the extension is missing or unknown; the caller keeps
/// the current mode in that case.
pub(crate) fn mode_from_path(path: &Path) -> Option<&'static Mode> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())?;
    MODES.iter().find(|m| m.extensions.contains(&ext.as_str()))
}

// ── File-dialog filters ───────────────────────────────────────────────────────

/// `(display, pattern)` pairs for the open/save dialogs: "All Files" first,
/// then one entry per mode, then CSV (a common data format with no mode).
pub(crate) fn file_filters() -> Vec<(String, String)> {
    let mut filters = vec![("All Files (*.*)".to_owned(), "*.*".to_owned())];
    for m in MODES {
        let patterns: Vec<String> = m.extensions.iter().map(|e| format!("*.{e}")).collect();
        filters.push((
            format!("{} Files ({})", m.label, patterns.join(", ")),
            patterns.join(";"),
        ));
    }
    filters.push(("CSV Files (*.csv)".to_owned(), "*.csv".to_owned()));
    filters
}

// ── Font limits ───────────────────────────────────────────────────────────────

/// Smallest font size accepted from the Settings menu, in CSS pixels.
pub(crate) const MIN_FONT_SIZE: u32 = 10;
/// Largest font size accepted from the Settings menu, in CSS pixels.
pub(crate) const MAX_FONT_SIZE: u32 = 48;
/// Sizes offered in the Settings → Font Size submenu.
pub(crate) static FONT_SIZE_PRESETS: &[u32] = &[10, 12, 13, 14, 16, 18, 20, 24, 28, 32, 40, 48];

pub(crate) fn font_size_in_range(px: u32) -> bool {
    (MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&px)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_set_matches_window_style() {
        let dark: Vec<&str> = THEMES.iter().filter(|t| t.dark).map(|t| t.name).collect();
        assert_eq!(
            dark,
            [
                "3024-night",
                "base16-dark",
                "dracula",
                "monokai",
                "solarized",
                "twilight",
                "material-darker",
                "panda-syntax"
            ]
        );
        for t in THEMES {
            let style = WindowStyle::for_theme(t);
            assert_eq!(style.is_dark(), t.dark, "{}", t.name);
        }
    }

    #[test]
    fn defaults_are_in_tables() {
        assert!(theme(DEFAULT_THEME).is_some());
        assert!(mode(DEFAULT_MODE).is_some());
    }

    #[test]
    fn lookup_is_exact() {
        assert!(theme("Dracula").is_none());
        assert!(theme("dracula ").is_none());
        assert!(mode("rust").is_none());
        assert_eq!(mode("cpp").map(|m| m.label), Some("C++"));
    }

    #[test]
    fn style_colours() {
        assert_eq!(WindowStyle::Dark.background(), 0x2E2E2E);
        assert_eq!(WindowStyle::Light.background(), 0xFFFFFF);
    }

    #[test]
    fn mode_detection_by_extension() {
        assert_eq!(mode_from_path(Path::new("main.PY")).map(|m| m.name), Some("python"));
        assert_eq!(mode_from_path(Path::new("a/b/Program.cs")).map(|m| m.name), Some("csharp"));
        assert_eq!(mode_from_path(Path::new("x.hpp")).map(|m| m.name), Some("cpp"));
        assert_eq!(mode_from_path(Path::new("data.csv")), None);
        assert_eq!(mode_from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn filters_start_with_all_files() {
        let f = file_filters();
        assert_eq!(f[0].1, "*.*");
        assert_eq!(f.len(), MODES.len() + 2);
        assert!(f.iter().any(|(d, p)| d.starts_with("C# Files") && p == "*.cs"));
        assert_eq!(f.last().map(|(_, p)| p.as_str()), Some("*.csv"));
    }

    #[test]
    fn font_presets_are_in_range() {
        assert!(FONT_SIZE_PRESETS.iter().all(|&px| font_size_in_range(px)));
        assert!(!font_size_in_range(9));
        assert!(!font_size_in_range(49));
    }
}
