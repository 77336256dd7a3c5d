//! Namespace-agnostic XML element tree
//!
//! Feed pages embed CODICE documents whose prefixes vary between publishers
//! (`cac:`, `cbc:`, `cac-place-ext:` ...). Field extraction only ever cares about
//! local names, so the tree drops prefixes on elements and attributes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;

/// Failure to build a tree from XML text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlError {
    pub position: u64,
    pub reason: String,
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.reason, self.position)
    }
}

impl std::error::Error for XmlError {}

/// One element with its local name, attributes, text and child elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    /// Create a bare element (used by builders and tests)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Parse a complete document and return its root element
    pub fn parse_str(xml: &str) -> Result<XmlNode, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            let event = reader.read_event().map_err(|e| XmlError {
                position: reader.error_position() as u64,
                reason: e.to_string(),
            })?;

            match event {
                Event::Start(start) => {
                    let node = open_element(&start, reader.buffer_position() as u64)?;
                    stack.push(node);
                },
                Event::Empty(start) => {
                    let node = open_element(&start, reader.buffer_position() as u64)?;
                    attach(&mut stack, &mut root, node, reader.buffer_position() as u64)?;
                },
                Event::End(_) => {
                    let node = stack.pop().ok_or_else(|| XmlError {
                        position: reader.buffer_position() as u64,
                        reason: "closing tag without matching opening tag".to_string(),
                    })?;
                    attach(&mut stack, &mut root, node, reader.buffer_position() as u64)?;
                },
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let value = text.unescape().map_err(|e| XmlError {
                            position: reader.buffer_position() as u64,
                            reason: e.to_string(),
                        })?;
                        current.text.push_str(&value);
                    }
                },
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        if let Some(open) = stack.last() {
            return Err(XmlError {
                position: reader.buffer_position() as u64,
                reason: format!("unexpected end of document inside <{}>", open.name),
            });
        }

        root.ok_or_else(|| XmlError {
            position: 0,
            reason: "document has no root element".to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed text content of this element (direct text only)
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All descendants reached by a `/`-separated path of local names, in document order
    pub fn find_all(&self, path: &str) -> Vec<&XmlNode> {
        let mut current: Vec<&XmlNode> = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter().filter(move |c| c.name == step))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// First descendant matching `path`, searching every branch
    pub fn find(&self, path: &str) -> Option<&XmlNode> {
        self.find_all(path).into_iter().next()
    }

    /// Text of the first element on `path` whose text is non-empty
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.find_all(path)
            .into_iter()
            .map(XmlNode::text)
            .find(|t| !t.is_empty())
    }
}

fn open_element(start: &BytesStart<'_>, position: u64) -> Result<XmlNode, XmlError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut node = XmlNode::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError {
            position,
            reason: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError {
                position,
                reason: e.to_string(),
            })?
            .into_owned();
        node.attrs.push((key, value));
    }

    Ok(node)
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
    position: u64,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        },
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        },
        None => Err(XmlError {
            position,
            reason: format!("second root element <{}>", node.name),
        }),
    }
}
