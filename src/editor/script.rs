// ── Editor commands → page script ─────────────────────────────────────────────
//
// Each command the shell sends to the embedded editor becomes one JavaScript
// statement executed in the page.  Every string argument is JSON-encoded, so
// arbitrary file content (quotes, backticks, `${`, `</script>`, lone
// surrogates excepted) reaches `editor.setValue` byte for byte.

/// CSS selector of the editor's root element in the page.
const ROOT_SELECTOR: &str = ".CodeMirror";

/// A fire-and-forget call into the embedded editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EditorCommand {
    /// Replace the whole buffer and drop the undo history.
    SetValue(String),
    SetTheme(&'static str),
    SetMode(&'static str),
    /// Font size override on the root element, in CSS pixels.
    SetFontSize(u32),
    /// Font family override on the root element.
    SetFontFamily(String),
}

impl EditorCommand {
    /// Render this command as a JavaScript statement.
    pub(crate) fn to_script(&self) -> String {
        match self {
            Self::SetValue(text) => {
                format!("editor.setValue({});editor.clearHistory();", js_string(text))
            }
            Self::SetTheme(name) => format!("changeTheme({});", js_string(name)),
            Self::SetMode(name) => format!("changeMode({});", js_string(name)),
            Self::SetFontSize(px) => style_override("fontSize", &format!("{px}px")),
            Self::SetFontFamily(family) => style_override("fontFamily", &css_font_family(family)),
        }
    }
}

/// Script whose completion value is the full editor buffer.
pub(crate) const GET_VALUE_SCRIPT: &str = "editor.getValue();";

/// Assign `property` on the root element's inline style, then let the editor
/// re-measure its lines.
fn style_override(property: &str, value: &str) -> String {
    format!(
        "document.querySelector({}).style.{property}={};editor.refresh();",
        js_string(ROOT_SELECTOR),
        js_string(value)
    )
}

/// Quote a family name for CSS and append the generic monospace fallback.
fn css_font_family(family: &str) -> String {
    let escaped = family.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\", monospace")
}

/// Encode `s` as a JavaScript string literal.
///
/// JSON string syntax is a subset of JavaScript's except for U+2028/U+2029,
/// which serde_json leaves raw; escape those too so older engines accept it.
fn js_string(s: &str) -> String {
    // Serialising a &str cannot fail.
    let json = serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_owned());
    json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
