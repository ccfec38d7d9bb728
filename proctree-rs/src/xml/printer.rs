//! XML printer that outputs process trees.
//!
//! Plain trees print as ordinary process documents. Delta and merge trees
//! additionally declare the change namespaces and tag every changed node:
//! the element name carries the change prefix, updated attributes are
//! repeated under `upd:` with their old value, and moves carry their
//! correlation id.

use std::io::Write;

use crate::constants::{
    DELETE_NS, INSERT_NS, LABEL_KEY, MOVE_FROM_NS, MOVE_TO_NS, PROCESS_NS, RELABEL_ATTR, TEXT_KEY,
    UPDATE_NS,
};
use crate::node::{ChangeOrigin, DeltaType, NodeId, NodeKind, Tree};

/// Options for XML printing.
#[derive(Debug, Clone, Default)]
pub struct XmlPrinterOptions {
    /// Whether to pretty-print with indentation.
    pub pretty_print: bool,
}

/// XML printer that outputs process trees.
pub struct XmlPrinter<W: Write> {
    writer: W,
    options: XmlPrinterOptions,
    indent: usize,
}

impl<W: Write> XmlPrinter<W> {
    /// Creates a new XML printer.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, XmlPrinterOptions::default())
    }

    /// Creates a new XML printer with the given options.
    pub fn with_options(writer: W, options: XmlPrinterOptions) -> Self {
        XmlPrinter {
            writer,
            options,
            indent: 0,
        }
    }

    /// Prints a tree as a complete document.
    ///
    /// Only attached children are printed; resolve the placeholders of a
    /// delta tree first to show deleted and moved-away nodes in place.
    pub fn print(&mut self, tree: &Tree) -> std::io::Result<()> {
        write!(self.writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(self.writer)?;
        self.print_fragment(tree)?;
        if !self.options.pretty_print {
            writeln!(self.writer)?;
        }
        self.writer.flush()
    }

    /// Prints a tree without the XML declaration.
    pub fn print_fragment(&mut self, tree: &Tree) -> std::io::Result<()> {
        self.print_node(tree, tree.root(), true)
    }

    fn print_node(&mut self, tree: &Tree, id: NodeId, is_root: bool) -> std::io::Result<()> {
        let content = tree.content(id);
        let (name, attrs) = element_parts(tree, id, is_root);
        self.start_element(&name, &attrs)?;

        let children = tree.children(id);
        match (content.text(), children.is_empty()) {
            (None, true) => return self.close_empty(),
            (Some(text), true) => {
                write!(self.writer, ">{}", to_entities(text))?;
                self.indent -= 1;
                return self.print_with_nl(&format!("</{}>", name));
            }
            (text, false) => {
                self.print_with_nl(">")?;
                if let Some(text) = text {
                    self.write_indent()?;
                    self.print_with_nl(&to_entities(text))?;
                }
            }
        }

        for &child in children {
            self.print_node(tree, child, false)?;
        }
        self.end_element(&name)
    }

    fn start_element(&mut self, qname: &str, attrs: &[(String, String)]) -> std::io::Result<()> {
        let mut tag = String::new();
        tag.push('<');
        tag.push_str(qname);
        for (name, value) in attrs {
            tag.push(' ');
            tag.push_str(name);
            tag.push_str("=\"");
            tag.push_str(&to_entities(value));
            tag.push('"');
        }

        self.write_indent()?;
        write!(self.writer, "{}", tag)?;
        self.indent += 1;
        Ok(())
    }

    fn close_empty(&mut self) -> std::io::Result<()> {
        self.indent -= 1;
        self.print_with_nl(" />")
    }

    fn end_element(&mut self, qname: &str) -> std::io::Result<()> {
        self.indent -= 1;
        self.write_indent()?;
        self.print_with_nl(&format!("</{}>", qname))
    }

    fn write_indent(&mut self) -> std::io::Result<()> {
        if self.options.pretty_print {
            write!(self.writer, "{}", "  ".repeat(self.indent))?;
        }
        Ok(())
    }

    fn print_with_nl(&mut self, s: &str) -> std::io::Result<()> {
        if self.options.pretty_print {
            writeln!(self.writer, "{}", s)
        } else {
            write!(self.writer, "{}", s)
        }
    }
}

/// Computes the qualified element name and attribute list of a node.
fn element_parts(tree: &Tree, id: NodeId, is_root: bool) -> (String, Vec<(String, String)>) {
    let content = tree.content(id);
    let annotated = !matches!(tree.node(id).kind(), NodeKind::Plain);
    let mut attrs: Vec<(String, String)> = Vec::new();

    if is_root {
        attrs.push(("xmlns".into(), PROCESS_NS.into()));
        if annotated {
            for (prefix, uri) in [INSERT_NS, DELETE_NS, MOVE_FROM_NS, MOVE_TO_NS, UPDATE_NS] {
                attrs.push((format!("xmlns:{}", prefix), uri.into()));
            }
        }
    }

    attrs.extend(
        content
            .attributes()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    );

    let Some(delta) = tree.delta(id) else {
        return (content.label().to_string(), attrs);
    };

    let prefix = match delta.change() {
        DeltaType::Nil => None,
        DeltaType::Insertion | DeltaType::SubtreeInsertion => Some(INSERT_NS.0),
        DeltaType::Deletion | DeltaType::SubtreeDeletion => Some(DELETE_NS.0),
        DeltaType::MoveTo => Some(MOVE_TO_NS.0),
        DeltaType::MoveFrom => Some(MOVE_FROM_NS.0),
        DeltaType::Update => Some(UPDATE_NS.0),
    };

    for (key, update) in delta.updates() {
        let value = match key.as_str() {
            TEXT_KEY => "true".to_string(),
            _ => update.old.clone().unwrap_or_default(),
        };
        let name = if key == LABEL_KEY { RELABEL_ATTR } else { key.as_str() };
        attrs.push((format!("{}:{}", UPDATE_NS.0, name), value));
    }

    if let Some(move_id) = delta.move_id() {
        let ns = match delta.change() {
            DeltaType::MoveFrom => MOVE_FROM_NS.0,
            _ => MOVE_TO_NS.0,
        };
        attrs.push((format!("{}:id", ns), move_id.to_string()));
    }

    if let Some(info) = tree.merge_info(id) {
        if info.change_origin != ChangeOrigin::Unchanged {
            attrs.push(("origin".into(), info.change_origin.code().to_string()));
        }
    }

    let name = match prefix {
        Some(p) => format!("{}:{}", p, content.label()),
        None => content.label().to_string(),
    };
    (name, attrs)
}

/// Converts special characters to XML entities.
fn to_entities(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '\'' => result.push_str("&apos;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Prints a tree to a string.
pub fn print_to_string(tree: &Tree) -> std::io::Result<String> {
    let mut output = Vec::new();
    {
        let mut printer = XmlPrinter::new(&mut output);
        printer.print(tree)?;
    }
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Prints a tree to a string with pretty printing.
pub fn print_to_string_pretty(tree: &Tree) -> std::io::Result<String> {
    let mut output = Vec::new();
    {
        let options = XmlPrinterOptions { pretty_print: true };
        let mut printer = XmlPrinter::with_options(&mut output, options);
        printer.print(tree)?;
    }
    Ok(String::from_utf8_lossy(&output).to_string())
}
