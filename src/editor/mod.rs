// ── Editor component abstraction ──────────────────────────────────────────────
//
// The embedded editor is an opaque web component.  The shell talks to it
// only through `EditorBridge`; the platform layer supplies a `ScriptHost`
// (execute a script, evaluate a script and report its result later) and
// `ScriptedEditor` turns bridge calls into page scripts.
//
// Retrieving the buffer is an explicit request/response pair: the shell
// calls `request_value(id)`, and the platform later delivers
// `EditorEvent::Value { request: id, .. }` back to the shell.

pub(crate) mod page;
pub(crate) mod script;

use serde::Deserialize;

use crate::error::{MirrorError, Result};

pub(crate) use script::EditorCommand;

// ── Request identity ──────────────────────────────────────────────────────────

/// Correlates a `request_value` call with its `EditorEvent::Value` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct RequestId(pub(crate) u64);

impl RequestId {
    /// Return the current id and advance `self` to the next one.
    pub(crate) fn take_next(&mut self) -> Self {
        let id = *self;
        self.0 = self.0.wrapping_add(1);
        id
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Something the embedded editor reported back to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EditorEvent {
    /// The page finished loading; queued commands may now run.
    Ready,
    /// The user edited the buffer.
    Changed,
    /// Reply to `EditorBridge::request_value`.
    Value { request: RequestId, text: String },
    /// The page could not start the editor; nothing sent to it will run.
    Failed { message: String },
}

/// Wire form of the messages the page posts.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum PageMessage {
    Ready,
    Changed,
    Failed { message: String },
}

impl EditorEvent {
    /// Decode a JSON message posted by the page.
    pub(crate) fn from_page_message(json: &str) -> Result<Self> {
        let msg: PageMessage = serde_json::from_str(json)
            .map_err(|e| MirrorError::Bridge(format!("bad page message {json:?}: {e}")))?;
        Ok(match msg {
            PageMessage::Ready => Self::Ready,
            PageMessage::Changed => Self::Changed,
            PageMessage::Failed { message } => Self::Failed { message },
        })
    }

    /// Decode the JSON-encoded completion value of `GET_VALUE_SCRIPT`.
    ///
    /// A `null` result means the page had no editor to ask, which is an
    /// error rather than an empty document.
    pub(crate) fn from_value_result(request: RequestId, json: &str) -> Result<Self> {
        let text: Option<String> = serde_json::from_str(json)
            .map_err(|e| MirrorError::Bridge(format!("bad getValue() result: {e}")))?;
        let text =
            text.ok_or_else(|| MirrorError::Bridge("getValue() returned null".to_owned()))?;
        Ok(Self::Value { request, text })
    }
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// Everything the shell can ask of the embedded editor.
pub(crate) trait EditorBridge {
    /// Replace the buffer contents.
    fn set_value(&mut self, text: &str) -> Result<()>;
    /// Ask for the buffer contents; the answer arrives as `EditorEvent::Value`.
    fn request_value(&mut self, request: RequestId) -> Result<()>;
    fn set_theme(&mut self, name: &'static str) -> Result<()>;
    fn set_mode(&mut self, name: &'static str) -> Result<()>;
    fn set_font_size(&mut self, px: u32) -> Result<()>;
    fn set_font_family(&mut self, family: &str) -> Result<()>;
    /// The page reported `ready`.
    fn mark_ready(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Raw script execution provided by the web view.
pub(crate) trait ScriptHost {
    /// Run `script`, discarding its result.
    fn execute(&mut self, script: &str) -> Result<()>;
    /// Run `script` and deliver its JSON-encoded result as the reply to
    /// `request` (see `EditorEvent::from_value_result`).
    fn evaluate(&mut self, script: &str, request: RequestId) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Queued {
    Execute(String),
    Evaluate(RequestId),
}

/// `EditorBridge` over a `ScriptHost`, holding calls back until the page is
/// ready.
pub(crate) struct ScriptedEditor<H: ScriptHost> {
    host: H,
    ready: bool,
    queue: Vec<Queued>,
}

impl<H: ScriptHost> ScriptedEditor<H> {
    pub(crate) fn new(host: H) -> Self {
        Self {
            host,
            ready: false,
            queue: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn host(&self) -> &H {
        &self.host
    }

    fn send(&mut self, command: EditorCommand) -> Result<()> {
        let script = command.to_script();
        if self.ready {
            self.host.execute(&script)
        } else {
            self.queue.push(Queued::Execute(script));
            Ok(())
        }
    }
}

impl<H: ScriptHost> EditorBridge for ScriptedEditor<H> {
    fn set_value(&mut self, text: &str) -> Result<()> {
        self.send(EditorCommand::SetValue(text.to_owned()))
    }

    fn request_value(&mut self, request: RequestId) -> Result<()> {
        if self.ready {
            self.host.evaluate(script::GET_VALUE_SCRIPT, request)
        } else {
            self.queue.push(Queued::Evaluate(request));
            Ok(())
        }
    }

    fn set_theme(&mut self, name: &'static str) -> Result<()> {
        self.send(EditorCommand::SetTheme(name))
    }

    fn set_mode(&mut self, name: &'static str) -> Result<()> {
        self.send(EditorCommand::SetMode(name))
    }

    fn set_font_size(&mut self, px: u32) -> Result<()> {
        self.send(EditorCommand::SetFontSize(px))
    }

    fn set_font_family(&mut self, family: &str) -> Result<()> {
        self.send(EditorCommand::SetFontFamily(family.to_owned()))
    }

    /// Flush queued calls in the order they were made.
    fn mark_ready(&mut self) -> Result<()> {
        self.ready = true;
        let queued = std::mem::take(&mut self.queue);
        if !queued.is_empty() {
            log::debug!("editor ready, flushing {} queued call(s)", queued.len());
        }
        for call in queued {
            match call {
                Queued::Execute(script) => self.host.execute(&script)?,
                Queued::Evaluate(request) => {
                    self.host.evaluate(script::GET_VALUE_SCRIPT, request)?
                }
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        calls: Vec<String>,
    }

    impl ScriptHost for RecordingHost {
        fn execute(&mut self, script: &str) -> Result<()> {
            self.calls.push(script.to_owned());
            Ok(())
        }

        fn evaluate(&mut self, script: &str, request: RequestId) -> Result<()> {
            self.calls.push(format!("{script} #{}", request.0));
            Ok(())
        }
    }

    #[test]
    fn calls_wait_for_ready_and_keep_order() {
        let mut ed = ScriptedEditor::new(RecordingHost::default());
        ed.set_theme("dracula").expect("theme");
        ed.request_value(RequestId(7)).expect("request");
        ed.set_mode("lua").expect("mode");
        assert!(ed.host().calls.is_empty());

        ed.mark_ready().expect("ready");
        assert_eq!(
            ed.host().calls,
            [
                "changeTheme(\"dracula\");".to_owned(),
                "editor.getValue(); #7".to_owned(),
                "changeMode(\"lua\");".to_owned(),
            ]
        );
    }

    #[test]
    fn calls_after_ready_go_straight_through() {
        let mut ed = ScriptedEditor::new(RecordingHost::default());
        ed.mark_ready().expect("ready");
        ed.set_font_size(20).expect("size");
        assert_eq!(ed.host().calls.len(), 1);
        assert!(ed.host().calls[0].contains("fontSize=\"20px\""));
    }

    #[test]
    fn page_messages_decode() {
        assert_eq!(EditorEvent::from_page_message(r#"{"type":"ready"}"#).ok(), Some(EditorEvent::Ready));
        assert_eq!(
            EditorEvent::from_page_message(r#"{"type":"changed"}"#).ok(),
            Some(EditorEvent::Changed)
        );
        assert_eq!(
            EditorEvent::from_page_message(r#"{"type":"failed","message":"offline"}"#).ok(),
            Some(EditorEvent::Failed {
                message: "offline".to_owned()
            })
        );
        assert!(EditorEvent::from_page_message(r#"{"type":"exploded"}"#).is_err());
        assert!(EditorEvent::from_page_message("not json").is_err());
    }

    #[test]
    fn value_result_decodes_json_string() {
        let ev = EditorEvent::from_value_result(RequestId(3), r#""a\r\nb""#).expect("decode");
        assert_eq!(
            ev,
            EditorEvent::Value {
                request: RequestId(3),
                text: "a\r\nb".to_owned()
            }
        );
    }

    #[test]
    fn null_value_result_is_an_error() {
        assert!(matches!(
            EditorEvent::from_value_result(RequestId(1), "null"),
            Err(MirrorError::Bridge(_))
        ));
    }

    #[test]
    fn request_ids_advance() {
        let mut next = RequestId(0);
        assert_eq!(next.take_next(), RequestId(0));
        assert_eq!(next.take_next(), RequestId(1));
        assert_eq!(next, RequestId(2));
    }
}
