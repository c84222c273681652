//! Writes a DOM tree back out as HTML text.

use crate::dom::dom_tree::{self, Document, DocumentKind, Node, NodeHandle};
use html5ever::QualName;

/// Void elements have no end tag and no children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Raw text elements: their text children are written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

/// Serializes a parsed document.
///
/// Full documents are written with their doctype. Fragments are written as the
/// children of the synthetic `<html>` element the fragment parser created.
pub fn serialize_document(document: &Document) -> String {
    let mut output = String::new();
    match document.kind {
        DocumentKind::Document => {
            if let Some(doctype) = &*document.doctype.borrow() {
                write_doctype(doctype, &mut output);
            }
            serialize_children(&document.root, &mut output);
        }
        DocumentKind::Fragment => {
            for child in dom_tree::children_of(&document.root) {
                if child.borrow().is_element() {
                    serialize_children(&child, &mut output);
                } else {
                    serialize_node(&child, &mut output);
                }
            }
        }
    }
    output
}

/// Serializes one node and its subtree (outer HTML).
pub fn serialize_node(node: &NodeHandle, output: &mut String) {
    match &*node.borrow() {
        Node::DocumentRoot(root) => {
            for child in &root.children {
                serialize_node(child, output);
            }
        }
        Node::Element(elem) => {
            let tag = elem.tag.as_str();
            output.push('<');
            output.push_str(tag);
            for (name, value) in &elem.attributes {
                output.push(' ');
                write_attr_name(name, output);
                output.push_str("=\"");
                escape_attribute(value, output);
                output.push('"');
            }
            output.push('>');

            if VOID_ELEMENTS.contains(&tag) {
                return;
            }
            if RAW_TEXT_ELEMENTS.contains(&tag) {
                for child in &elem.children {
                    if let Node::Text(text) = &*child.borrow() {
                        output.push_str(text);
                    }
                }
            } else {
                for child in &elem.children {
                    serialize_node(child, output);
                }
            }
            output.push_str("</");
            output.push_str(tag);
            output.push('>');
        }
        Node::Text(text) => escape_text(text, output),
        Node::Comment(text) => {
            output.push_str("<!--");
            output.push_str(text);
            output.push_str("-->");
        }
        Node::ProcessingInstruction { target, data } => {
            output.push_str("<?");
            output.push_str(target);
            if !data.is_empty() {
                output.push(' ');
                output.push_str(data);
            }
            output.push('>');
        }
    }
}

fn serialize_children(node: &NodeHandle, output: &mut String) {
    for child in dom_tree::children_of(node) {
        serialize_node(&child, output);
    }
}

fn write_doctype(doctype: &dom_tree::Doctype, output: &mut String) {
    output.push_str("<!DOCTYPE ");
    output.push_str(&doctype.name);
    if !doctype.public_id.is_empty() {
        output.push_str(" PUBLIC \"");
        output.push_str(&doctype.public_id);
        output.push('"');
        if !doctype.system_id.is_empty() {
            output.push_str(" \"");
            output.push_str(&doctype.system_id);
            output.push('"');
        }
    } else if !doctype.system_id.is_empty() {
        output.push_str(" SYSTEM \"");
        output.push_str(&doctype.system_id);
        output.push('"');
    }
    output.push('>');
}

fn write_attr_name(name: &QualName, output: &mut String) {
    if let Some(prefix) = &name.prefix {
        output.push_str(prefix);
        output.push(':');
    }
    output.push_str(&name.local);
}

fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}

fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '\u{a0}' => output.push_str("&nbsp;"),
            _ => output.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::html::{parse_document, parse_fragment};
    use pretty_assertions::assert_eq;

    #[test]
    fn fragment_round_trips_without_wrappers() {
        let document = parse_fragment("<p class=\"hl\">x</p><br><!-- note -->");
        assert_eq!(
            serialize_document(&document),
            "<p class=\"hl\">x</p><br><!-- note -->"
        );
    }

    #[test]
    fn document_keeps_doctype_and_structure() {
        let document =
            parse_document("<!DOCTYPE html><html><head><title>t</title></head><body><p>a</p></body></html>");
        assert_eq!(
            serialize_document(&document),
            "<!DOCTYPE html><html><head><title>t</title></head><body><p>a</p></body></html>"
        );
    }

    #[test]
    fn legacy_doctype_ids_are_written() {
        let html = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \
                    \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\"><html><head></head><body></body></html>";
        let out = serialize_document(&parse_document(html));
        assert!(out.starts_with(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \
             \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">"
        ));
    }

    #[test]
    fn noscript_content_is_not_escaped_twice() {
        let html = "<div><noscript><p>a &amp; b</p></noscript></div>";
        assert_eq!(serialize_document(&parse_fragment(html)), html);
    }

    #[test]
    fn escapes_text_and_attributes_but_not_raw_text() {
        let document = parse_fragment(
            "<a title=\"a &quot;b&quot; &amp; c\">1 &lt; 2</a><style>p > a { color: red }</style>",
        );
        assert_eq!(
            serialize_document(&document),
            "<a title=\"a &quot;b&quot; &amp; c\">1 &lt; 2</a><style>p > a { color: red }</style>"
        );
    }
}
