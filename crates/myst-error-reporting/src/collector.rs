//! Per-file accumulation of diagnostics.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::diagnostic::{DiagnosticKind, DiagnosticMessage};

/// Collects diagnostics for one file.
///
/// Rules listed in the suppression set are dropped when added, so users can
/// silence categories they already know about.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<DiagnosticMessage>,
    suppressed: Arc<BTreeSet<String>>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collector that drops messages for the given rule ids.
    pub fn with_suppressed(suppressed: Arc<BTreeSet<String>>) -> Self {
        Self {
            diagnostics: Vec::new(),
            suppressed,
        }
    }

    /// A fresh collector sharing this one's suppression set.
    pub fn fork(&self) -> Self {
        Self::with_suppressed(self.suppressed.clone())
    }

    pub fn add(&mut self, diagnostic: DiagnosticMessage) {
        if let Some(code) = &diagnostic.code {
            if self.suppressed.contains(code) {
                return;
            }
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = DiagnosticMessage>) {
        for diagnostic in diagnostics {
            self.add(diagnostic);
        }
    }

    /// Move every message from `other` into this collector.
    pub fn absorb(&mut self, other: DiagnosticCollector) {
        self.extend(other.diagnostics);
    }

    /// Whether any errors were collected (warnings don't count).
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// Messages raised for a rule id.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a DiagnosticMessage> {
        self.diagnostics.iter().filter(move |d| d.has_code(code))
    }

    pub fn diagnostics(&self) -> &[DiagnosticMessage] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn to_text(&self, ctx: Option<&myst_source_map::SourceContext>) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.to_text(ctx)).collect()
    }

    /// Consume the collector, returning messages in source order.
    ///
    /// The sort is stable so messages at the same offset keep emission order.
    pub fn into_diagnostics(mut self) -> Vec<DiagnosticMessage> {
        self.diagnostics
            .sort_by_key(|d| d.location.as_ref().map_or(0, |loc| loc.start_offset()));
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiagnosticMessageBuilder;
    use myst_source_map::{FileId, SourceInfo};

    #[test]
    fn test_new_collector() {
        let collector = DiagnosticCollector::new();
        assert!(collector.is_empty());
        assert!(!collector.has_errors());
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let mut collector = DiagnosticCollector::new();
        collector.add(DiagnosticMessage::warning("w"));
        assert!(!collector.has_errors());
        collector.add(DiagnosticMessage::error("e"));
        assert!(collector.has_errors());
        assert_eq!(collector.count(DiagnosticKind::Warning), 1);
    }

    #[test]
    fn test_suppressed_rules_are_dropped() {
        let suppressed: BTreeSet<String> = ["reference-target-resolves".to_string()].into();
        let mut collector = DiagnosticCollector::with_suppressed(Arc::new(suppressed));
        collector.add(DiagnosticMessage::warning("a").with_code("reference-target-resolves"));
        collector.add(DiagnosticMessage::warning("b").with_code("identifier-is-unique"));
        collector.add(DiagnosticMessage::warning("c"));
        assert_eq!(collector.len(), 2);

        let mut forked = collector.fork();
        forked.add(DiagnosticMessage::warning("d").with_code("reference-target-resolves"));
        assert!(forked.is_empty());
    }

    #[test]
    fn test_into_diagnostics_sorted_by_offset() {
        let mut collector = DiagnosticCollector::new();
        collector.add(
            DiagnosticMessageBuilder::error("late")
                .with_location(SourceInfo::from_offsets(FileId(0), 20, 25))
                .build(),
        );
        collector.add(
            DiagnosticMessageBuilder::error("early")
                .with_location(SourceInfo::from_offsets(FileId(0), 2, 5))
                .build(),
        );
        let sorted = collector.into_diagnostics();
        assert_eq!(sorted[0].title, "early");
        assert_eq!(sorted[1].title, "late");
    }

    #[test]
    fn test_with_code_filter() {
        let mut collector = DiagnosticCollector::new();
        collector.add(DiagnosticMessage::warning("a").with_code("x"));
        collector.add(DiagnosticMessage::warning("b").with_code("y"));
        assert_eq!(collector.with_code("x").count(), 1);
    }
}
