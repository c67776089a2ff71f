//! Core diagnostic message types.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Informational message
    Info,
    /// A problem that does not prevent output
    Warning,
    /// A problem that invalidates part of the output
    Error,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Info => "info",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a detail item is presented (x/i bullet style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailKind {
    Error,
    Info,
    Note,
}

/// The content of a message or detail item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum MessageContent {
    /// Plain text content
    Plain(String),
    /// Markdown content, rendered verbatim in terminal output
    Markdown(String),
}

impl MessageContent {
    pub fn as_str(&self) -> &str {
        match self {
            MessageContent::Plain(s) | MessageContent::Markdown(s) => s,
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Markdown(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Markdown(s.to_string())
    }
}

/// A detail bullet in a diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailItem {
    pub kind: DetailKind,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<myst_source_map::SourceInfo>,
}

/// A diagnostic message.
///
/// Structure:
/// 1. **Code**: stable rule id (e.g. `directive-body-correct`)
/// 2. **Title**: brief message
/// 3. **Kind**: error, warning, info
/// 4. **Problem**: what went wrong
/// 5. **Details**: specific information
/// 6. **Hints**: guidance for fixing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    /// Stable rule id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub title: String,

    pub kind: DiagnosticKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<MessageContent>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<DetailItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<MessageContent>,

    /// Where the problem occurred, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<myst_source_map::SourceInfo>,
}

impl DiagnosticMessage {
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            kind,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            location: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, title)
    }

    /// Set the rule id.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_location(mut self, location: myst_source_map::SourceInfo) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }

    /// Whether this message was raised for the given rule.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    /// Render as text.
    ///
    /// With a source context and a location, the message is rendered as an
    /// ariadne report with a source snippet; otherwise it falls back to
    /// plain bullet output:
    ///
    /// ```text
    /// Warning [rule-id]: title
    /// Problem statement here
    /// ✖ Error detail
    /// ℹ Info detail
    /// ? Hint
    /// ```
    pub fn to_text(&self, ctx: Option<&myst_source_map::SourceContext>) -> String {
        let snippet = match (self.location.as_ref(), ctx) {
            (Some(location), Some(ctx)) => self.render_ariadne(location, ctx),
            _ => None,
        };

        let mut lines: Vec<String> = Vec::new();
        match snippet {
            Some(snippet) => lines.push(snippet.trim_end().to_string()),
            None => {
                let kind = match self.kind {
                    DiagnosticKind::Error => "Error",
                    DiagnosticKind::Warning => "Warning",
                    DiagnosticKind::Info => "Info",
                };
                match &self.code {
                    Some(code) => lines.push(format!("{} [{}]: {}", kind, code, self.title)),
                    None => lines.push(format!("{}: {}", kind, self.title)),
                }
                if let Some(problem) = &self.problem {
                    lines.push(problem.as_str().to_string());
                }
            }
        }

        for detail in &self.details {
            let bullet = match detail.kind {
                DetailKind::Error => "✖",
                DetailKind::Info => "ℹ",
                DetailKind::Note => "•",
            };
            lines.push(format!("{} {}", bullet, detail.content.as_str()));
        }
        for hint in &self.hints {
            lines.push(format!("? {}", hint.as_str()));
        }

        let mut result = lines.join("\n");
        result.push('\n');
        result
    }

    /// Render as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        // Serialization of these plain data types cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn render_ariadne(
        &self,
        location: &myst_source_map::SourceInfo,
        ctx: &myst_source_map::SourceContext,
    ) -> Option<String> {
        use ariadne::{Color, Config, Label, Report, ReportKind, Source};

        let file = ctx.get_file(location.file_id)?;
        let len = file.content.len();
        let start = location.start_offset().min(len);
        let end = location.end_offset().clamp(start, len);

        let (report_kind, color) = match self.kind {
            DiagnosticKind::Error => (ReportKind::Error, Color::Red),
            DiagnosticKind::Warning => (ReportKind::Warning, Color::Yellow),
            DiagnosticKind::Info => (ReportKind::Advice, Color::Cyan),
        };

        let message = match &self.code {
            Some(code) => format!("[{}] {}", code, self.title),
            None => self.title.clone(),
        };
        let label_message = self
            .problem
            .as_ref()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| self.title.clone());

        let report = Report::build(report_kind, file.path.clone(), start)
            .with_config(Config::default().with_color(false))
            .with_message(message)
            .with_label(
                Label::new((file.path.clone(), start..end))
                    .with_message(label_message)
                    .with_color(color),
            )
            .finish();

        let mut output = Vec::new();
        report
            .write(
                (file.path.clone(), Source::from(file.content.as_str())),
                &mut output,
            )
            .ok()?;
        String::from_utf8(output).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myst_source_map::{SourceContext, SourceInfo};

    #[test]
    fn test_constructors() {
        assert_eq!(DiagnosticMessage::error("e").kind, DiagnosticKind::Error);
        assert_eq!(
            DiagnosticMessage::warning("w").kind,
            DiagnosticKind::Warning
        );
        assert_eq!(DiagnosticMessage::info("i").kind, DiagnosticKind::Info);
    }

    #[test]
    fn test_kind_ordering() {
        assert!(DiagnosticKind::Error > DiagnosticKind::Warning);
        assert!(DiagnosticKind::Warning > DiagnosticKind::Info);
    }

    #[test]
    fn test_with_code() {
        let msg = DiagnosticMessage::error("Bad").with_code("directive-known");
        assert!(msg.has_code("directive-known"));
        assert!(!msg.has_code("role-known"));
    }

    #[test]
    fn test_to_text_without_location() {
        let mut msg = DiagnosticMessage::warning("Something happened").with_code("rule-x");
        msg.problem = Some("It went wrong".into());
        msg.hints.push("Try again?".into());
        let text = msg.to_text(None);
        assert!(text.starts_with("Warning [rule-x]: Something happened"));
        assert!(text.contains("It went wrong"));
        assert!(text.contains("? Try again?"));
    }

    #[test]
    fn test_to_text_with_source_snippet() {
        let mut ctx = SourceContext::new();
        let id = ctx.add_file("doc.md", "hello {bad}`x` world\n");
        let msg = DiagnosticMessage::error("Unknown role")
            .with_code("role-known")
            .with_location(SourceInfo::from_offsets(id, 6, 14));
        let text = msg.to_text(Some(&ctx));
        assert!(text.contains("doc.md"));
        assert!(text.contains("[role-known] Unknown role"));
    }

    #[test]
    fn test_to_json() {
        let msg = DiagnosticMessage::error("Oops").with_code("pass-failed");
        let json = msg.to_json();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["code"], "pass-failed");
        assert_eq!(json["title"], "Oops");
    }

    #[test]
    fn test_json_roundtrip() {
        let msg = DiagnosticMessage::warning("w")
            .with_code("c")
            .with_location(SourceInfo::default());
        let text = serde_json::to_string(&msg).unwrap();
        let back: DiagnosticMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(msg, back);
    }
}
