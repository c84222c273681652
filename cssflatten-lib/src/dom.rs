use html5ever::{namespace_url, ns, LocalName, QualName};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub mod dom_tree {
    use super::*;

    /// Shared handle to a node. Parsing, querying and styling all pass these around.
    pub type NodeHandle = Rc<RefCell<Node>>;

    /// Non-owning back link from an element to its parent.
    pub type WeakHandle = Weak<RefCell<Node>>;

    #[derive(Debug)]
    pub enum Node {
        DocumentRoot(DocumentRootNode),
        Element(ElementNode),
        Text(String),
        Comment(String),
        ProcessingInstruction { target: String, data: String },
    }

    #[derive(Debug, Default)]
    pub struct DocumentRootNode {
        pub children: Vec<NodeHandle>,
    }

    #[derive(Debug)]
    pub struct ElementNode {
        pub tag: String,
        pub qual_name: QualName,
        /// Attributes in source order. Serialization writes them back in this order.
        pub attributes: Vec<(QualName, String)>,
        pub children: Vec<NodeHandle>,
        pub parent: Option<WeakHandle>,
    }

    /// How the markup was handed to the parser.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DocumentKind {
        /// A complete document; serialized with its doctype and `<html>` element.
        Document,
        /// A body fragment; only the fragment's own nodes are serialized.
        Fragment,
    }

    #[derive(Debug)]
    pub struct Document {
        pub root: NodeHandle,
        pub doctype: RefCell<Option<Doctype>>,
        pub kind: DocumentKind,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Doctype {
        pub name: String,
        pub public_id: String,
        pub system_id: String,
    }

    impl Node {
        pub fn as_element(&self) -> Option<&ElementNode> {
            match self {
                Node::Element(elem) => Some(elem),
                _ => None,
            }
        }

        pub fn as_element_mut(&mut self) -> Option<&mut ElementNode> {
            match self {
                Node::Element(elem) => Some(elem),
                _ => None,
            }
        }

        pub fn is_element(&self) -> bool {
            matches!(self, Node::Element(_))
        }

        /// Children of a node that can have them (document root or element).
        pub fn children(&self) -> Option<&Vec<NodeHandle>> {
            match self {
                Node::DocumentRoot(root) => Some(&root.children),
                Node::Element(elem) => Some(&elem.children),
                _ => None,
            }
        }

        pub fn children_mut(&mut self) -> Option<&mut Vec<NodeHandle>> {
            match self {
                Node::DocumentRoot(root) => Some(&mut root.children),
                Node::Element(elem) => Some(&mut elem.children),
                _ => None,
            }
        }
    }

    impl ElementNode {
        pub fn new(qual_name: QualName) -> Self {
            ElementNode {
                tag: qual_name.local.to_string(),
                qual_name,
                attributes: Vec::new(),
                children: Vec::new(),
                parent: None,
            }
        }

        /// Looks up an attribute by local name, ignoring ASCII case.
        pub fn attr(&self, name: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(key, _)| (*key.local).eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }

        pub fn has_attr(&self, name: &str) -> bool {
            self.attr(name).is_some()
        }

        /// Overwrites an existing attribute in place, or appends a new one.
        pub fn set_attr(&mut self, name: &str, value: String) {
            if let Some((_, existing)) = self
                .attributes
                .iter_mut()
                .find(|(key, _)| (*key.local).eq_ignore_ascii_case(name))
            {
                *existing = value;
                return;
            }
            let qual_name = QualName::new(None, ns!(), LocalName::from(name));
            self.attributes.push((qual_name, value));
        }
    }

    pub fn new_document(kind: DocumentKind) -> Document {
        Document {
            root: Rc::new(RefCell::new(Node::DocumentRoot(DocumentRootNode::default()))),
            doctype: RefCell::new(None),
            kind,
        }
    }

    /// Returns the parent of an element, or `None` for detached elements and non-elements.
    pub fn parent_of(node: &NodeHandle) -> Option<NodeHandle> {
        match &*node.borrow() {
            Node::Element(elem) => elem.parent.as_ref().and_then(Weak::upgrade),
            _ => None,
        }
    }

    /// Snapshot of a node's children. Empty for leaves.
    pub fn children_of(node: &NodeHandle) -> Vec<NodeHandle> {
        node.borrow().children().cloned().unwrap_or_default()
    }

    /// Element children only, in document order.
    pub fn element_children(node: &NodeHandle) -> Vec<NodeHandle> {
        children_of(node)
            .into_iter()
            .filter(|child| child.borrow().is_element())
            .collect()
    }

    /// Concatenated text of a node's direct text children.
    pub fn text_content(node: &NodeHandle) -> String {
        let mut text = String::new();
        for child in children_of(node) {
            if let Node::Text(chunk) = &*child.borrow() {
                text.push_str(chunk);
            }
        }
        text
    }

    /// Pre-order walk over the node and all of its descendants.
    pub fn descendants(node: &NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![Rc::clone(node)];
        while let Some(current) = stack.pop() {
            for child in children_of(&current).into_iter().rev() {
                stack.push(child);
            }
            out.push(current);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::dom_tree::*;
    use super::*;

    fn element(tag: &str) -> NodeHandle {
        let name = QualName::new(None, ns!(html), LocalName::from(tag));
        Rc::new(RefCell::new(Node::Element(ElementNode::new(name))))
    }

    fn adopt(parent: &NodeHandle, child: &NodeHandle) {
        if let Some(elem) = child.borrow_mut().as_element_mut() {
            elem.parent = Some(Rc::downgrade(parent));
        }
        if let Some(children) = parent.borrow_mut().children_mut() {
            children.push(Rc::clone(child));
        }
    }

    #[test]
    fn set_attr_overwrites_existing_value() {
        let node = element("p");
        let mut borrowed = node.borrow_mut();
        let elem = borrowed.as_element_mut().unwrap();
        elem.set_attr("class", "a".to_string());
        elem.set_attr("style", "color:red".to_string());
        elem.set_attr("STYLE", "color:blue".to_string());

        assert_eq!(elem.attributes.len(), 2);
        assert_eq!(elem.attr("style"), Some("color:blue"));
        assert!(elem.has_attr("class"));
        assert!(!elem.has_attr("id"));
    }

    #[test]
    fn descendants_are_pre_order() {
        let document = new_document(DocumentKind::Document);
        let html = element("html");
        let body = element("body");
        let div = element("div");
        let span = element("span");
        adopt(&document.root, &html);
        adopt(&html, &body);
        adopt(&body, &div);
        adopt(&body, &span);

        let tags: Vec<String> = descendants(&document.root)
            .iter()
            .filter_map(|n| n.borrow().as_element().map(|e| e.tag.clone()))
            .collect();
        assert_eq!(tags, vec!["html", "body", "div", "span"]);
        assert!(Rc::ptr_eq(&parent_of(&span).unwrap(), &body));
        assert_eq!(element_children(&body).len(), 2);
    }
}
