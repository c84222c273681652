//! Structural tree queries over the DOM.
//!
//! Queries are absolute XPath location paths in the subset the selector
//! translator generates. Compile once with [`Query::compile`], then run it
//! against any number of documents with [`Query::select`].

mod eval;
pub mod xpath;

use crate::dom::dom_tree::{Document, NodeHandle};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty query expression")]
    Empty,

    #[error("unexpected end of query expression")]
    UnexpectedEnd,

    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { offset: usize, found: char },

    #[error("unexpected token {found} at offset {offset}")]
    UnexpectedToken { offset: usize, found: String },

    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedLiteral { offset: usize },

    #[error("invalid number {text:?} at offset {offset}")]
    InvalidNumber { offset: usize, text: String },

    #[error("unsupported axis: {0}")]
    UnknownAxis(String),

    #[error("unsupported function: {0}()")]
    UnknownFunction(String),

    #[error("{function}() does not take {given} argument(s)")]
    Arity { function: String, given: usize },

    #[error("trailing input at offset {offset}")]
    TrailingInput { offset: usize },
}

/// A compiled query expression.
#[derive(Debug, Clone)]
pub struct Query {
    expression: String,
    path: xpath::LocationPath,
}

impl Query {
    pub fn compile(expression: &str) -> Result<Self, QueryError> {
        let path = xpath::parse(expression)?;
        Ok(Query {
            expression: expression.to_string(),
            path,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Matching elements in document order, without duplicates.
    ///
    /// The returned handles are a snapshot: mutating their attributes does not
    /// disturb the result set.
    pub fn select(&self, document: &Document) -> Vec<NodeHandle> {
        self.select_from(&document.root)
    }

    pub fn select_from(&self, root: &NodeHandle) -> Vec<NodeHandle> {
        eval::evaluate(&self.path, root)
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        Query::compile(expression)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Compiles `expression` and runs it against `document`.
pub fn select(document: &Document, expression: &str) -> Result<Vec<NodeHandle>, QueryError> {
    Ok(Query::compile(expression)?.select(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::html::parse_fragment;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    const PAGE: &str = r#"
        <div id="main" class="box wide">
            <h1>Title</h1>
            <p class="lead">one</p>
            <p>two</p>
            <section><p class="lead note">three</p></section>
        </div>
        <p id="footer">four</p>
        <a href="/x" target="_blank">link</a>
        <a name="anchor">anchor</a>
    "#;

    fn texts(expression: &str) -> Vec<String> {
        let document = parse_fragment(PAGE);
        select(&document, expression)
            .unwrap()
            .iter()
            .map(|node| crate::dom::dom_tree::text_content(node).trim().to_string())
            .collect()
    }

    #[test]
    fn descendant_and_child_axes() {
        assert_eq!(texts("//div//p"), vec!["one", "two", "three"]);
        assert_eq!(texts("//div/p"), vec!["one", "two"]);
        assert_eq!(texts("//p"), vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn id_and_attribute_predicates() {
        assert_eq!(texts("//*[@id='footer']"), vec!["four"]);
        assert_eq!(texts("//p[@id='footer']"), vec!["four"]);
        assert_eq!(texts("//a[@href]"), vec!["link"]);
        assert_eq!(texts("//a[@target=\"_blank\"]"), vec!["link"]);
        assert_eq!(texts("//a[@target!=\"_blank\"]"), Vec::<String>::new());
        assert_eq!(texts("//a[not(@href)]"), vec!["anchor"]);
    }

    #[test]
    fn class_list_containment() {
        let lead = "//*[contains(concat(' ', @class, ' '), concat(' ', 'lead', ' '))]";
        assert_eq!(texts(lead), vec!["one", "three"]);

        let both = format!(
            "{}[contains(concat(' ', @class, ' '), concat(' ', 'note', ' '))]",
            lead
        );
        assert_eq!(texts(&both), vec!["three"]);

        // "le" is a prefix of "lead" but not a class of its own.
        assert!(texts("//*[contains(concat(' ', @class, ' '), concat(' ', 'le', ' '))]").is_empty());
    }

    #[test]
    fn first_following_sibling() {
        assert_eq!(texts("//h1/following-sibling::*[1]/self::p"), vec!["one"]);
        assert!(texts("//h1/following-sibling::*[1]/self::section").is_empty());
        assert_eq!(texts("//p/following-sibling::*[1]/self::a"), vec!["link"]);
    }

    #[test]
    fn positions_are_relative_to_each_context() {
        assert_eq!(texts("//div/p[2]"), vec!["two"]);
        assert_eq!(texts("//div/p[last()]"), vec!["two"]);
        assert_eq!(texts("//p[1]"), vec!["one", "three", "four"]);
        assert_eq!(texts("//div/p[2][1]"), vec!["two"]);
        assert!(texts("//div/p[0]").is_empty());
        assert!(texts("//div/p[1.5]").is_empty());
    }

    #[test]
    fn preceding_siblings_are_nearest_first() {
        assert_eq!(texts("//section/preceding-sibling::*[1]"), vec!["two"]);
        assert_eq!(texts("//section/preceding-sibling::p[2]"), vec!["one"]);
        assert_eq!(texts("//h1/preceding-sibling::*"), Vec::<String>::new());
    }

    #[test]
    fn adjacent_siblings_across_a_long_run() {
        let html = "<p>x</p>".repeat(2000);
        let document = parse_fragment(&html);
        let found = select(&document, "//p/following-sibling::*[1]/self::p").unwrap();
        assert_eq!(found.len(), 1999);
        let first = select(&document, "//p[1]").unwrap();
        assert!(!Rc::ptr_eq(&found[0], &first[0]));
    }

    #[test]
    fn results_are_deduplicated() {
        let document = parse_fragment("<div><div><p>x</p></div></div>");
        let found = select(&document, "//div//p").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn tag_names_ignore_ascii_case() {
        assert_eq!(texts("//H1"), vec!["Title"]);
    }

    #[test]
    fn compile_errors_surface() {
        assert!("//div//~//p".parse::<Query>().is_err());
        let query: Query = "//p".parse().unwrap();
        assert_eq!(query.to_string(), "//p");
    }
}
