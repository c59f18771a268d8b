//! A small element tree over XML: named attributes, ordered children, a text value.
//!
//! This is the only place that knows about the XML syntax; the rest of the crate
//! reads and writes [`Element`]s.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// One element of a structured document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    /// Attributes in document order.
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    /// Text content. Empty when the element has none.
    text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attributes as `(name, value)` pairs, in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets an attribute, replacing an existing one of the same name in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first child with the given name, if there is such a child.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(Element::text)
    }

    /// Appends `child` and returns a handle to it for further filling.
    pub fn append_child(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Appends a `<name>value</name>` child.
    pub fn append_value(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Element {
        let mut child = Element::new(name);
        child.set_text(value);
        self.append_child(child)
    }

    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> Result<Element, DocumentError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocumentError::Parse(e.to_string()))?;
            match event {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let el = element_from_start(&start)?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::End(_) => {
                    let mut el = stack
                        .pop()
                        .ok_or_else(|| DocumentError::Parse("unexpected closing tag".into()))?;
                    // Around child elements, surrounding whitespace is indentation.
                    // A leaf keeps its text exactly.
                    if !el.children.is_empty() {
                        el.text = el.text.trim().to_string();
                    }
                    attach(&mut stack, &mut root, el)?;
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|e| DocumentError::Parse(e.to_string()))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&value);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DocumentError::Parse("unclosed element at end of input".into()));
        }
        root.ok_or(DocumentError::NoRoot)
    }

    /// Serializes this element as a complete document with an XML declaration.
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(serialize_err)?;
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner()).map_err(serialize_err)
    }

    pub fn read_file(path: &Path) -> Result<Element, DocumentError> {
        let xml = std::fs::read_to_string(path)
            .map_err(|e| DocumentError::Read(path.to_path_buf(), e))?;
        Element::parse(&xml)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), DocumentError> {
        let xml = self.to_xml_string()?;
        std::fs::write(path, xml).map_err(|e| DocumentError::Write(path.to_path_buf(), e))
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, DocumentError> {
    let qname = start.name();
    let name = std::str::from_utf8(qname.as_ref()).map_err(|e| DocumentError::Parse(e.to_string()))?;
    let mut el = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DocumentError::Parse(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| DocumentError::Parse(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| DocumentError::Parse(e.to_string()))?
            .into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

/// Hands a finished element to its parent, or makes it the root.
fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None if root.is_none() => *root = Some(el),
        None => return Err(DocumentError::Parse("more than one root element".into())),
    }
    Ok(())
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, el: &Element) -> Result<(), DocumentError> {
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if el.children.is_empty() && el.text.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(serialize_err);
    }

    writer.write_event(Event::Start(start)).map_err(serialize_err)?;
    if !el.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&el.text)))
            .map_err(serialize_err)?;
    }
    for child in &el.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(serialize_err)
}

fn serialize_err(e: impl std::fmt::Display) -> DocumentError {
    DocumentError::Serialize(e.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("malformed document: {0}")]
    Parse(String),
    #[error("failed to serialize document: {0}")]
    Serialize(String),
    #[error("document has no root element")]
    NoRoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_attribute_and_child_order() {
        let doc = Element::parse(r#"<Item filename="a.exe" b="2" a="1"><X>one</X><Y/><X>two</X></Item>"#).unwrap();
        assert_eq!(doc.name(), "Item");
        let attrs: Vec<_> = doc.attributes().collect();
        assert_eq!(attrs, vec![("filename", "a.exe"), ("b", "2"), ("a", "1")]);
        let names: Vec<_> = doc.children().iter().map(Element::name).collect();
        assert_eq!(names, vec!["X", "Y", "X"]);
        assert_eq!(doc.child_text("X"), Some("one"));
        assert_eq!(doc.child_text("Y"), Some(""));
        assert_eq!(doc.child_text("Z"), None);
    }

    #[test]
    fn text_is_unescaped_and_reescaped() {
        let mut root = Element::new("Root");
        root.set_attribute("path", r#"C:\a & "b""#);
        root.append_value("Value", "<x> & y");
        let xml = root.to_xml_string().unwrap();
        assert!(xml.contains("&lt;x&gt; &amp; y"));
        assert_eq!(Element::parse(&xml).unwrap(), root);
    }

    #[test]
    fn set_attribute_replaces_in_place() {
        let mut el = Element::new("E");
        el.set_attribute("a", "1");
        el.set_attribute("b", "2");
        el.set_attribute("a", "3");
        let attrs: Vec<_> = el.attributes().collect();
        assert_eq!(attrs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn indentation_is_not_text() {
        let doc = Element::parse("<A>\n  <B>  padded  </B>\n</A>").unwrap();
        assert_eq!(doc.text(), "");
        assert_eq!(doc.child_text("B"), Some("  padded  "));
    }

    #[test]
    fn whitespace_only_leaf_text_is_kept() {
        let doc = Element::parse("<A>\n  <B key=\"a\"> </B>\n  <C>\t </C>\n</A>").unwrap();
        assert_eq!(doc.child_text("B"), Some(" "));
        assert_eq!(doc.child_text("C"), Some("\t "));

        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains(r#"<B key="a"> </B>"#));
        assert_eq!(Element::parse(&xml).unwrap(), doc);
    }

    #[test]
    fn cdata_becomes_text() {
        let doc = Element::parse("<A><![CDATA[1 < 2]]></A>").unwrap();
        assert_eq!(doc.text(), "1 < 2");
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(matches!(Element::parse(""), Err(DocumentError::NoRoot)));
        assert!(matches!(Element::parse("<A><B></A>"), Err(DocumentError::Parse(_))));
        assert!(matches!(Element::parse("<A/><B/>"), Err(DocumentError::Parse(_))));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        let mut root = Element::new("Document");
        root.append_child(Element::new("Empty"));
        root.append_value("Full", "text");
        root.write_file(&path).unwrap();
        assert_eq!(Element::read_file(&path).unwrap(), root);
    }

    #[test]
    fn read_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Element::read_file(&dir.path().join("nope.xml")).unwrap_err();
        assert!(matches!(err, DocumentError::Read(..)));
    }
}
