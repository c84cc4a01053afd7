// ── Startup configuration ─────────────────────────────────────────────────────
//
// Parses the command line and lays it over the persisted settings file.
// Command-line values hold for this session only; the settings store keeps
// the file's values so they are not written back.

use std::path::PathBuf;

use clap::{builder::PossibleValuesParser, Parser};

use crate::{
    catalog,
    settings::{self, EditorSettings, SettingsFile, SettingsStore},
};

/// Command-line arguments for Mirror IDE
#[derive(Debug, Parser)]
#[command(name = "mirror")]
#[command(about = "A small code editor hosting CodeMirror in a native window")]
#[command(version)]
pub(crate) struct Args {
    /// File to open at startup
    pub(crate) file: Option<PathBuf>,

    /// Editor theme to start with
    #[arg(long, value_parser = theme_names())]
    pub(crate) theme: Option<String>,

    /// Language mode to start with
    #[arg(long, value_parser = mode_names())]
    pub(crate) mode: Option<String>,

    /// Editor font size in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(10..=48))]
    pub(crate) font_size: Option<u32>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub(crate) log_level: String,
}

fn theme_names() -> PossibleValuesParser {
    PossibleValuesParser::new(catalog::THEMES.iter().map(|t| t.name))
}

fn mode_names() -> PossibleValuesParser {
    PossibleValuesParser::new(catalog::MODES.iter().map(|m| m.name))
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// File given on the command line
    pub(crate) open: Option<PathBuf>,
    /// Editor settings after applying command-line overrides
    pub(crate) editor: EditorSettings,
    /// Persisted settings, without the command-line overrides
    pub(crate) store: SettingsStore,
    pub(crate) log_level: String,
}

impl Config {
    /// Parse the process arguments; settings are read from the default path.
    pub(crate) fn from_env() -> Self {
        let args = Args::parse();
        let path = settings::settings_path();
        let stored = path.as_deref().and_then(settings::load_from);
        Self::from_args(args, stored, path)
    }

    /// Build configuration from explicit inputs (useful for testing)
    pub(crate) fn from_args(
        args: Args,
        stored: Option<SettingsFile>,
        settings_path: Option<PathBuf>,
    ) -> Self {
        let saved = stored
            .as_ref()
            .map(EditorSettings::from_file)
            .unwrap_or_default();
        let mut editor = saved.clone();

        // The parsers above already restrict these to catalog entries.
        if let Some(theme) = args.theme.as_deref().and_then(catalog::theme) {
            editor.theme = theme;
        }
        if let Some(mode) = args.mode.as_deref().and_then(catalog::mode) {
            editor.mode = mode;
        }
        if let Some(px) = args.font_size {
            editor.font_size = px;
        }

        Config {
            open: args.file,
            editor,
            store: SettingsStore::new(settings_path, saved),
            log_level: args.log_level,
        }
    }
}
