//! XML parsing and output.
//!
//! Process documents are read into plain [`Tree`](crate::node::Tree)s and
//! any tree, plain, delta or merged, can be written back out.

mod parser;
mod printer;

pub use parser::{parse_file, parse_str, XmlParser};
pub use printer::{print_to_string, print_to_string_pretty, XmlPrinter, XmlPrinterOptions};
