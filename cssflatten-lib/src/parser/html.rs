//! Parses HTML into the crate's DOM tree.
//!
//! html5ever drives the parse; `FlattenTreeSink` builds a `dom_tree::Document`
//! out of `Rc<RefCell<Node>>` handles with weak parent links, which is what
//! the query engine walks and the cascade mutates.

use crate::dom::dom_tree::{self, Document, DocumentKind, ElementNode, Node, NodeHandle};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    interface::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink},
    local_name, namespace_url, ns, Attribute, LocalName, Namespace, ParseOpts, QualName,
};
use log::debug;
use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

/// Parses `html_content`, choosing document or fragment mode from its first tag.
pub fn create_dom_tree(html_content: &str) -> Document {
    if looks_like_document(html_content) {
        parse_document(html_content)
    } else {
        parse_fragment(html_content)
    }
}

/// Parses a complete HTML document.
pub fn parse_document(html_content: &str) -> Document {
    let tree_sink = FlattenTreeSink::new(DocumentKind::Document);
    html5ever::parse_document(tree_sink, ParseOpts::default()).one(html_content.to_string())
}

/// Parses markup as the content of a `<body>` element.
///
/// html5ever places the fragment's nodes under a synthetic `<html>` element
/// appended to the document root.
pub fn parse_fragment(html_content: &str) -> Document {
    let tree_sink = FlattenTreeSink::new(DocumentKind::Fragment);
    let context = QualName::new(None, ns!(html), local_name!("body"));
    html5ever::parse_fragment(tree_sink, ParseOpts::default(), context, Vec::new())
        .one(html_content.to_string())
}

/// Start tags that only make sense at document level. A body fragment parse
/// would drop them along with their attributes.
const DOCUMENT_TAGS: &[&str] = &["html", "head", "body"];

/// True when the first markup token (after whitespace and comments) is a
/// doctype, an XML declaration or an `<html>`, `<head>` or `<body>` start tag.
pub fn looks_like_document(html_content: &str) -> bool {
    let mut rest = html_content.trim_start_matches('\u{feff}').trim_start();
    while let Some(after_open) = rest.strip_prefix("<!--") {
        match after_open.find("-->") {
            Some(end) => rest = after_open[end + 3..].trim_start(),
            None => return false,
        }
    }
    let head: String = rest.chars().take(9).collect::<String>().to_ascii_lowercase();
    if head.starts_with("<!doctype") || head.starts_with("<?xml") {
        return true;
    }

    let Some(tag) = rest.strip_prefix('<') else {
        return false;
    };
    let name_len = tag
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(tag.len());
    let name = &tag[..name_len];
    DOCUMENT_TAGS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// A TreeSink that builds the crate's DOM tree.
pub struct FlattenTreeSink {
    document: Document,
}

impl FlattenTreeSink {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            document: dom_tree::new_document(kind),
        }
    }
}

/// Owned element name handed back to html5ever.
#[derive(Debug)]
pub struct FlattenElemName {
    ns: Namespace,
    local: LocalName,
}

impl ElemName for FlattenElemName {
    fn local_name(&self) -> &LocalName {
        &self.local
    }

    fn ns(&self) -> &Namespace {
        &self.ns
    }
}

fn set_parent(child: &NodeHandle, parent: &NodeHandle) {
    if let Some(elem) = child.borrow_mut().as_element_mut() {
        elem.parent = Some(Rc::downgrade(parent));
    }
}

fn new_text(text: &str) -> NodeHandle {
    Rc::new(RefCell::new(Node::Text(text.to_string())))
}

/// Appends text to an existing text node. Returns false if `node` is not text.
fn merge_text(node: &NodeHandle, text: &str) -> bool {
    if let Node::Text(existing) = &mut *node.borrow_mut() {
        existing.push_str(text);
        return true;
    }
    false
}

impl TreeSink for FlattenTreeSink {
    type Handle = NodeHandle;
    type Output = Document;
    type ElemName<'a>
        = FlattenElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.document
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        debug!("html parse error: {}", msg);
    }

    fn get_document(&self) -> Self::Handle {
        Rc::clone(&self.document.root)
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        match &*target.borrow() {
            Node::Element(elem) => FlattenElemName {
                ns: elem.qual_name.ns.clone(),
                local: elem.qual_name.local.clone(),
            },
            _ => FlattenElemName {
                ns: ns!(),
                local: LocalName::from(""),
            },
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let mut element = ElementNode::new(name);
        element.attributes = attrs
            .into_iter()
            .map(|attr| (attr.name, attr.value.to_string()))
            .collect();
        Rc::new(RefCell::new(Node::Element(element)))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        Rc::new(RefCell::new(Node::Comment(text.to_string())))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        Rc::new(RefCell::new(Node::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        }))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendText(text) => {
                let last = parent
                    .borrow()
                    .children()
                    .and_then(|children| children.last().cloned());
                if let Some(last) = last {
                    if merge_text(&last, &text) {
                        return;
                    }
                }
                if let Some(children) = parent.borrow_mut().children_mut() {
                    children.push(new_text(&text));
                }
            }
            NodeOrText::AppendNode(node) => {
                set_parent(&node, parent);
                if let Some(children) = parent.borrow_mut().children_mut() {
                    children.push(node);
                }
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if dom_tree::parent_of(element).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        *self.document.doctype.borrow_mut() = Some(dom_tree::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        Rc::clone(target)
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        debug!("quirks mode: {:?}", mode);
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let Some(parent) = dom_tree::parent_of(sibling) else {
            return;
        };
        let index = match parent
            .borrow()
            .children()
            .and_then(|children| children.iter().position(|c| Rc::ptr_eq(c, sibling)))
        {
            Some(index) => index,
            None => return,
        };

        let new_node = match child {
            NodeOrText::AppendText(text) => {
                if index > 0 {
                    let previous = parent
                        .borrow()
                        .children()
                        .and_then(|children| children.get(index - 1).cloned());
                    if let Some(previous) = previous {
                        if merge_text(&previous, &text) {
                            return;
                        }
                    }
                }
                new_text(&text)
            }
            NodeOrText::AppendNode(node) => {
                set_parent(&node, &parent);
                node
            }
        };
        if let Some(children) = parent.borrow_mut().children_mut() {
            children.insert(index, new_node);
        };
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        if let Some(elem) = target.borrow_mut().as_element_mut() {
            for attr in attrs {
                if !elem.has_attr(&attr.name.local) {
                    elem.attributes.push((attr.name, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        let Some(parent) = dom_tree::parent_of(target) else {
            return;
        };
        if let Some(children) = parent.borrow_mut().children_mut() {
            children.retain(|child| !Rc::ptr_eq(child, target));
        }
        if let Some(elem) = target.borrow_mut().as_element_mut() {
            elem.parent = None;
        }
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let moved = match node.borrow_mut().children_mut() {
            Some(children) => std::mem::take(children),
            None => return,
        };
        for child in &moved {
            set_parent(child, new_parent);
        }
        if let Some(children) = new_parent.borrow_mut().children_mut() {
            children.extend(moved);
        }
    }
}
