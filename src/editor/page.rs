// ── Embedded editor page ──────────────────────────────────────────────────────
//
// The HTML document loaded into the web view.  It hosts a CodeMirror 5
// instance as the global `editor` and exposes the helpers the shell calls
// through the scripting bridge: `changeTheme(name)` and `changeMode(name)`.
//
// Page → host messages (via `window.chrome.webview.postMessage`):
//   {"type":"ready"}    the editor exists and can accept commands
//   {"type":"changed"}  the user edited the buffer (not `setValue`)
//   {"type":"failed","message":…}  CodeMirror itself did not load

/// CodeMirror release the page falls back to when no local copy ships.
pub(crate) const CODEMIRROR_CDN: &str = "https://cdnjs.cloudflare.com/ajax/libs/codemirror/5.65.16";

/// Virtual host the web view maps onto a local `codemirror` folder.
pub(crate) const LOCAL_ASSET_HOST: &str = "codemirror.mirror-ide";

/// Build the page HTML loading CodeMirror from `base`, a directory laid out
/// like the cdnjs release.  Theme stylesheets are generated from the catalog
/// so every selectable theme is available without a reload.
pub(crate) fn editor_html(base: &str) -> String {
    let base = base.trim_end_matches('/');
    let theme_links: String = crate::catalog::THEMES
        .iter()
        .filter(|t| t.name != crate::catalog::DEFAULT_THEME)
        .map(|t| format!("<link rel=\"stylesheet\" href=\"{base}/theme/{}.min.css\">\n", t.name))
        .collect();
    // Embedded in a JS string literal below.
    let base_literal = serde_json::to_string(base).unwrap_or_else(|_| "\"\"".to_owned());
    EDITOR_HTML
        .replace("{{BASE_LITERAL}}", &base_literal)
        .replace("{{BASE}}", base)
        .replace("{{THEMES}}", &theme_links)
}

const EDITOR_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<link rel="stylesheet" href="{{BASE}}/codemirror.min.css">
{{THEMES}}<style>
  html, body { margin: 0; padding: 0; height: 100%; overflow: hidden; }
  .CodeMirror { height: 100vh; font-size: 14px; }
</style>
<script src="{{BASE}}/codemirror.min.js"></script>
<script src="{{BASE}}/mode/python/python.min.js"></script>
<script src="{{BASE}}/mode/javascript/javascript.min.js"></script>
<script src="{{BASE}}/mode/xml/xml.min.js"></script>
<script src="{{BASE}}/mode/css/css.min.js"></script>
<script src="{{BASE}}/mode/clike/clike.min.js"></script>
<script src="{{BASE}}/mode/lua/lua.min.js"></script>
<script src="{{BASE}}/mode/vb/vb.min.js"></script>
<script src="{{BASE}}/mode/sql/sql.min.js"></script>
</head>
<body>
<textarea id="code"></textarea>
<script>
  var MODE_SPECS = {
    "c": "text/x-csrc",
    "cpp": "text/x-c++src",
    "csharp": "text/x-csharp",
    "java": "text/x-java",
    "json": { name: "javascript", json: true },
    "sql": "text/x-sql"
  };

  // Themes whose stylesheet is keyed on more than one class.
  var THEME_CLASSES = {
    "solarized": "solarized dark"
  };

  function post(message) {
    if (window.chrome && window.chrome.webview) {
      window.chrome.webview.postMessage(message);
    }
  }

  var editor = null;

  function changeTheme(name) {
    editor.setOption("theme", THEME_CLASSES[name] || name);
  }

  function changeMode(name) {
    editor.setOption("mode", MODE_SPECS[name] || name);
  }

  if (typeof CodeMirror === "undefined") {
    post({ type: "failed", message: "CodeMirror could not be loaded from " + {{BASE_LITERAL}} });
  } else {
    editor = CodeMirror.fromTextArea(document.getElementById("code"), {
      lineNumbers: true,
      mode: "python",
      theme: "default",
      indentUnit: 4
    });

    editor.on("change", function (cm, change) {
      if (change.origin !== "setValue") {
        post({ type: "changed" });
      }
    });

    editor.focus();
    post({ type: "ready" });
  }
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_links_every_non_default_theme() {
        let html = editor_html(CODEMIRROR_CDN);
        for t in crate::catalog::THEMES {
            let href = format!("/theme/{}.min.css", t.name);
            assert_eq!(html.contains(&href), t.name != crate::catalog::DEFAULT_THEME, "{}", t.name);
        }
        assert!(!html.contains("{{"));
    }

    #[test]
    fn page_defines_bridge_helpers() {
        let html = editor_html(CODEMIRROR_CDN);
        for needle in ["var editor", "function changeTheme(", "function changeMode(", "\"ready\"", "\"changed\""] {
            assert!(html.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn page_loads_from_the_given_base() {
        let html = editor_html("https://codemirror.mirror-ide/");
        assert!(html.contains("src=\"https://codemirror.mirror-ide/codemirror.min.js\""));
        assert!(html.contains("href=\"https://codemirror.mirror-ide/theme/monokai.min.css\""));
        assert!(!html.contains(CODEMIRROR_CDN));
    }

    #[test]
    fn page_reports_a_missing_editor_library() {
        let html = editor_html(CODEMIRROR_CDN);
        assert!(html.contains("typeof CodeMirror === \"undefined\""));
        assert!(html.contains("type: \"failed\""));
        assert!(html.contains(&format!("loaded from \" + \"{CODEMIRROR_CDN}\"")));
    }

    #[test]
    fn solarized_gets_its_variant_class() {
        let html = editor_html(CODEMIRROR_CDN);
        assert!(html.contains("\"solarized\": \"solarized dark\""));
        assert!(html.contains("THEME_CLASSES[name] || name"));
    }
}
