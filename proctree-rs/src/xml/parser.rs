//! XML parser that builds process trees.
//!
//! Uses quick-xml's streaming API. Element and attribute names lose their
//! namespace prefixes, namespace declarations and ignored attributes are
//! dropped, and element text is trimmed into the node's text payload.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::constants::{IGNORED_ATTRIBUTES, ROOT_LABEL};
use crate::error::{Error, Result};
use crate::node::{NodeContent, NodeId, Tree};

/// XML parser that builds process trees.
#[derive(Debug, Clone)]
pub struct XmlParser {
    ignored: Vec<String>,
}

impl Default for XmlParser {
    fn default() -> Self {
        XmlParser::new()
    }
}

impl XmlParser {
    /// Creates a parser stripping the default ignored attributes.
    pub fn new() -> Self {
        XmlParser {
            ignored: IGNORED_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Creates a parser stripping the given attributes instead.
    pub fn with_ignored_attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        XmlParser {
            ignored: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses XML from a string.
    pub fn parse_str(&self, xml: &str) -> Result<Tree> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut tree: Option<Tree> = None;
        let mut stack: Vec<NodeId> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let content = self.parse_element(e)?;
                    let id = open(&mut tree, &stack, content)?;
                    stack.push(id);
                }
                Event::Empty(ref e) => {
                    let content = self.parse_element(e)?;
                    open(&mut tree, &stack, content)?;
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    append_text(&mut tree, &stack, &text);
                }
                Event::CData(e) => {
                    let text = std::str::from_utf8(&e).map_err(|e| Error::Parse(e.to_string()))?;
                    append_text(&mut tree, &stack, text);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Parse(format!(
                "unexpected end of document inside {} open elements",
                stack.len()
            )));
        }
        let tree = tree.ok_or_else(|| Error::Parse("document has no root element".into()))?;
        let tree = narrow(tree);
        debug!(nodes = tree.len(), "parsed process tree");
        Ok(tree)
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Tree> {
        let xml = std::fs::read_to_string(path)?;
        self.parse_str(&xml)
    }

    /// Parses an element's local name and its kept attributes.
    fn parse_element(&self, e: &BytesStart) -> Result<NodeContent> {
        let name = e.local_name();
        let label = std::str::from_utf8(name.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
        let mut content = NodeContent::new(label);

        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("attribute error: {}", e)))?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let local = attr.key.local_name();
            let key = std::str::from_utf8(local.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
            if self.ignored.iter().any(|i| i == key) {
                continue;
            }
            let value = attr.unescape_value()?;
            content.attributes_mut().insert(key, value.into_owned());
        }
        Ok(content)
    }
}

/// Creates the root or appends a child to the innermost open element.
fn open(tree: &mut Option<Tree>, stack: &[NodeId], content: NodeContent) -> Result<NodeId> {
    match (tree.as_mut(), stack.last()) {
        (None, _) => {
            let t = Tree::new(content);
            let root = t.root();
            *tree = Some(t);
            Ok(root)
        }
        (Some(t), Some(&parent)) => Ok(t.add_child(parent, content)),
        (Some(_), None) => Err(Error::Parse("multiple root elements".into())),
    }
}

fn append_text(tree: &mut Option<Tree>, stack: &[NodeId], text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if let (Some(t), Some(&id)) = (tree.as_mut(), stack.last()) {
        let joined = match t.content(id).text() {
            Some(prev) => format!("{} {}", prev, text),
            None => text.to_string(),
        };
        t.content_mut(id).set_text(Some(joined));
    }
}

/// Narrows a wrapper document to its first process description.
fn narrow(tree: Tree) -> Tree {
    if tree.label(tree.root()) == ROOT_LABEL {
        return tree;
    }
    match tree.nodes().find(|&id| tree.label(id) == ROOT_LABEL) {
        Some(id) => tree.subtree_copy(id),
        None => tree,
    }
}

/// Parses XML from a file with the default parser.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Tree> {
    XmlParser::new().parse_file(path)
}

/// Parses XML from a string with the default parser.
pub fn parse_str(xml: &str) -> Result<Tree> {
    XmlParser::new().parse_str(xml)
}
