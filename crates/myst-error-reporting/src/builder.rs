//! Builder API for diagnostic messages.

use crate::diagnostic::{
    DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent,
};
use myst_source_map::SourceInfo;

/// Builder for [`DiagnosticMessage`].
///
/// ```
/// use myst_error_reporting::DiagnosticMessageBuilder;
///
/// let msg = DiagnosticMessageBuilder::error("Invalid directive option")
///     .with_code("directive-options-correct")
///     .problem("Option `width` must be a number")
///     .add_detail("Got `wide`")
///     .add_hint("Use a numeric value such as `50`?")
///     .build();
/// assert_eq!(msg.details.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticMessageBuilder {
    message: DiagnosticMessage,
}

impl DiagnosticMessageBuilder {
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            message: DiagnosticMessage::new(kind, title),
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

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.message.code = Some(code.into());
        self
    }

    pub fn with_location(mut self, location: SourceInfo) -> Self {
        self.message.location = Some(location);
        self
    }

    /// Attach a location if one is available.
    pub fn with_optional_location(mut self, location: Option<SourceInfo>) -> Self {
        self.message.location = location;
        self
    }

    pub fn problem(mut self, problem: impl Into<MessageContent>) -> Self {
        self.message.problem = Some(problem.into());
        self
    }

    pub fn add_detail(mut self, detail: impl Into<MessageContent>) -> Self {
        self.message.details.push(DetailItem {
            kind: DetailKind::Error,
            content: detail.into(),
            location: None,
        });
        self
    }

    pub fn add_detail_at(mut self, detail: impl Into<MessageContent>, location: SourceInfo) -> Self {
        self.message.details.push(DetailItem {
            kind: DetailKind::Error,
            content: detail.into(),
            location: Some(location),
        });
        self
    }

    pub fn add_info(mut self, info: impl Into<MessageContent>) -> Self {
        self.message.details.push(DetailItem {
            kind: DetailKind::Info,
            content: info.into(),
            location: None,
        });
        self
    }

    pub fn add_note(mut self, note: impl Into<MessageContent>) -> Self {
        self.message.details.push(DetailItem {
            kind: DetailKind::Note,
            content: note.into(),
            location: None,
        });
        self
    }

    pub fn add_hint(mut self, hint: impl Into<MessageContent>) -> Self {
        self.message.hints.push(hint.into());
        self
    }

    pub fn build(self) -> DiagnosticMessage {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myst_source_map::FileId;

    #[test]
    fn test_builder_all_parts() {
        let msg = DiagnosticMessageBuilder::warning("Title")
            .with_code("rule")
            .problem("Problem")
            .add_detail("detail")
            .add_info("info")
            .add_note("note")
            .add_hint("hint?")
            .with_location(SourceInfo::from_offsets(FileId(2), 1, 4))
            .build();

        assert_eq!(msg.kind, DiagnosticKind::Warning);
        assert_eq!(msg.code.as_deref(), Some("rule"));
        assert_eq!(msg.details.len(), 3);
        assert_eq!(msg.details[1].kind, DetailKind::Info);
        assert_eq!(msg.hints.len(), 1);
        assert_eq!(msg.location.unwrap().file_id, FileId(2));
    }

    #[test]
    fn test_optional_location() {
        let msg = DiagnosticMessageBuilder::info("x")
            .with_optional_location(None)
            .build();
        assert!(msg.location.is_none());
    }
}
