/*
 * xml.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Small event writer shared by the XML backends.
 */

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::BackendError;

fn xml_error(err: impl std::fmt::Display) -> BackendError {
    BackendError::Xml(err.to_string())
}

/// Streams XML events into a buffer, tracking open elements so a
/// mismatched close is caught where it happens.
pub(crate) struct XmlOut {
    writer: Writer<Vec<u8>>,
    open: Vec<String>,
}

impl XmlOut {
    pub fn new() -> Self {
        XmlOut {
            writer: Writer::new(Vec::new()),
            open: Vec::new(),
        }
    }

    pub fn declaration(&mut self) -> Result<(), BackendError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)
    }

    /// Text written verbatim, for doctype lines and processing instructions.
    pub fn raw(&mut self, text: &str) -> Result<(), BackendError> {
        self.writer.get_mut().extend_from_slice(text.as_bytes());
        Ok(())
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), BackendError> {
        let mut element = BytesStart::new(name);
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.writer
            .write_event(Event::Start(element))
            .map_err(xml_error)?;
        self.open.push(name.to_string());
        Ok(())
    }

    pub fn end(&mut self, name: &str) -> Result<(), BackendError> {
        match self.open.pop() {
            Some(open) if open == name => {}
            other => {
                return Err(BackendError::Xml(format!(
                    "closing <{name}> while <{}> is open",
                    other.unwrap_or_default()
                )));
            }
        }
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), BackendError> {
        let mut element = BytesStart::new(name);
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.writer
            .write_event(Event::Empty(element))
            .map_err(xml_error)
    }

    pub fn text(&mut self, text: &str) -> Result<(), BackendError> {
        if text.is_empty() {
            return Ok(());
        }
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)
    }

    /// `<name>text</name>`
    pub fn element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), BackendError> {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    pub fn finish(self) -> Result<Vec<u8>, BackendError> {
        if let Some(open) = self.open.last() {
            return Err(BackendError::Xml(format!("<{open}> was never closed")));
        }
        Ok(self.writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_and_nesting() {
        let mut out = XmlOut::new();
        out.start("p", &[("id", "a&b")]).unwrap();
        out.text("1 < 2").unwrap();
        out.empty("br", &[]).unwrap();
        out.end("p").unwrap();
        let bytes = out.finish().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"<p id="a&amp;b">1 &lt; 2<br/></p>"#
        );
    }

    #[test]
    fn test_mismatched_close_is_an_error() {
        let mut out = XmlOut::new();
        out.start("a", &[]).unwrap();
        assert!(out.end("b").is_err());
    }

    #[test]
    fn test_unclosed_is_an_error() {
        let mut out = XmlOut::new();
        out.start("a", &[]).unwrap();
        assert!(out.finish().is_err());
    }
}
