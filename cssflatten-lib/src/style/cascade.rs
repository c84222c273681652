//! Applies an ordered stylesheet to a document by merging each rule into the
//! `style` attribute of every element its selector matches.

use super::declarations::StyleDeclarations;
use super::stylesheet::{StyleRule, Stylesheet};
use super::translate;
use crate::dom::dom_tree::{Document, NodeHandle};
use crate::query::{Query, QueryError};
use log::{debug, error};

/// A rule whose selector could not be turned into a usable query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub selector: String,
    pub query: String,
    pub error: QueryError,
}

/// What an [`apply`] pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Rules that matched at least one element.
    pub applied: usize,
    /// Rules with a valid query that matched nothing.
    pub unmatched: usize,
    /// Element updates, counting an element once per rule that touched it.
    pub elements_styled: usize,
    pub failures: Vec<RuleFailure>,
}

/// Applies every rule in `stylesheet` order. A rule that fails to translate
/// into a valid query is recorded and skipped; the rest still apply.
pub fn apply(document: &Document, stylesheet: &Stylesheet) -> CascadeReport {
    let mut report = CascadeReport::default();

    for rule in stylesheet {
        let expression = translate::translate(&rule.selector);
        debug!(
            "selector {:?} translated to {}",
            rule.selector.trim(),
            expression
        );

        let query = match Query::compile(&expression) {
            Ok(query) => query,
            Err(err) => {
                error!(
                    "selector {:?} produced an invalid query {:?}: {}",
                    rule.selector.trim(),
                    expression,
                    err
                );
                report.failures.push(RuleFailure {
                    selector: rule.selector.clone(),
                    query: expression,
                    error: err,
                });
                continue;
            }
        };

        // Materialized before any attribute is touched.
        let nodes = query.select(document);
        if nodes.is_empty() {
            debug!("no elements match {}", query);
            report.unmatched += 1;
            continue;
        }

        debug!("{} element(s) match {}", nodes.len(), query);
        for node in &nodes {
            apply_rule_to_node(node, rule);
        }
        report.applied += 1;
        report.elements_styled += nodes.len();
    }

    report
}

/// Decodes the node's inline style, overlays the rule's declarations and writes it back.
fn apply_rule_to_node(node: &NodeHandle, rule: &StyleRule) {
    let mut node = node.borrow_mut();
    let Some(element) = node.as_element_mut() else {
        return;
    };
    let existing = element.attr("style");
    if existing.is_none() && rule.declarations.is_empty() {
        return;
    }
    let mut inline = StyleDeclarations::decode_lossy(existing.unwrap_or_default());
    inline.merge(&rule.declarations);
    element.set_attr("style", inline.encode());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::html::parse_fragment;
    use crate::parser::serialize::serialize_document;
    use pretty_assertions::assert_eq;

    fn run(html: &str, css: &str) -> (String, CascadeReport) {
        let document = parse_fragment(html);
        let report = apply(&document, &Stylesheet::parse(css));
        (serialize_document(&document), report)
    }

    #[test]
    fn rule_declarations_override_inline() {
        let (html, report) = run(
            "<p class=\"x\" style=\"color:red;margin:0\">t</p>",
            ".x{color:blue;font-weight:bold}",
        );
        assert_eq!(
            html,
            "<p class=\"x\" style=\"color:blue;margin:0;font-weight:bold\">t</p>"
        );
        assert_eq!(report.applied, 1);
        assert_eq!(report.elements_styled, 1);
    }

    #[test]
    fn later_rule_of_equal_precedence_wins() {
        let (html, _) = run("<p>t</p>", "p{color:red} p{color:green}");
        assert_eq!(html, "<p style=\"color:green\">t</p>");
    }

    #[test]
    fn higher_precedence_wins_regardless_of_order() {
        let (html, _) = run("<p id=\"a\" class=\"b\">t</p>", "#a{color:red} .b{color:green} p{color:blue}");
        assert_eq!(html, "<p id=\"a\" class=\"b\" style=\"color:red\">t</p>");
    }

    #[test]
    fn invalid_query_is_recorded_and_skipped() {
        let (html, report) = run("<h1>a</h1><p>b</p>", "h1 ~ p{color:red} p{margin:0}");
        assert_eq!(html, "<h1>a</h1><p style=\"margin:0\">b</p>");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].query, "//h1//~//p");
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn unmatched_rules_are_counted() {
        let (html, report) = run("<p>t</p>", "table{border:0}");
        assert_eq!(html, "<p>t</p>");
        assert_eq!(report.unmatched, 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn combinators_select_the_right_elements() {
        let (html, _) = run(
            "<div><p>a</p><section><p>b</p></section></div><h2>c</h2><p>d</p>",
            "div > p{color:red} h2 + p{color:blue}",
        );
        assert_eq!(
            html,
            "<div><p style=\"color:red\">a</p><section><p>b</p></section></div><h2>c</h2><p style=\"color:blue\">d</p>"
        );
    }
}
