//! Rewrites CSS selectors into XPath queries.
//!
//! A fixed table of regex rewrites runs in order, each one on the output of
//! the previous. The order matters: the combinator rewrites must run before
//! whitespace becomes `//`, and attribute syntax must be rewritten before the
//! id and class rewrites look at the text. This is a rewrite chain, not a
//! selector grammar; forms outside the table (pseudo-classes, `~`, `^=`, ...)
//! come out as queries the engine rejects.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

enum Rewrite {
    /// Replacement template using `${n}` group references.
    Template(&'static str),
    /// Replacement computed from the match.
    Evaluator(fn(&Captures<'_>) -> String),
}

struct Transformation {
    pattern: Regex,
    rewrite: Rewrite,
}

impl Transformation {
    fn new(pattern: &str, rewrite: Rewrite) -> Self {
        Transformation {
            pattern: Regex::new(pattern).expect("selector rewrite pattern"),
            rewrite,
        }
    }

    fn apply<'h>(&self, selector: &'h str) -> Cow<'h, str> {
        match &self.rewrite {
            Rewrite::Template(template) => self.pattern.replace_all(selector, *template),
            Rewrite::Evaluator(evaluate) => self
                .pattern
                .replace_all(selector, |caps: &Captures<'_>| evaluate(caps)),
        }
    }
}

static TRANSFORMATIONS: Lazy<Vec<Transformation>> = Lazy::new(|| {
    vec![
        // E > F: F is a child of E.
        Transformation::new(r"\s+>\s+", Rewrite::Template("/")),
        // E + F: F immediately follows E.
        Transformation::new(
            r"(\w+)\s+\+\s+(\w+)",
            Rewrite::Template("${1}/following-sibling::*[1]/self::${2}"),
        ),
        // E F: F is a descendant of E.
        Transformation::new(r"\s+", Rewrite::Template("//")),
        // E[attr]
        Transformation::new(r"(\w)\[(\w+)\]", Rewrite::Template("${1}[@${2}]")),
        // E[attr=value], value optionally quoted.
        Transformation::new(
            r#"(\w)\[(\w+)=['"]?(\w+)['"]?\]"#,
            Rewrite::Template(r#"${1}[@${2}="${3}"]"#),
        ),
        // E#id
        Transformation::new(r"(\w+)#(\w+)", Rewrite::Template("${1}[@id='${2}']")),
        // #id with no element in front.
        Transformation::new(r"(^|[^\w])#(\w+)", Rewrite::Template("${1}*[@id='${2}']")),
        // E.a.b or .a.b
        Transformation::new(r"(\w+|\*+)?((?:\.[\w-]+)+)", Rewrite::Evaluator(class_predicates)),
    ]
});

/// `div.a.b` → `div[...a...][...b...]`; a missing element becomes `*`.
fn class_predicates(caps: &Captures<'_>) -> String {
    let mut parts = caps[0].split('.');
    let element = match parts.next() {
        Some(element) if !element.is_empty() => element,
        _ => "*",
    };

    let mut query = String::from(element);
    for class in parts {
        query.push_str(&format!(
            "[contains(concat(' ', @class, ' '), concat(' ', '{}', ' '))]",
            class
        ));
    }
    query
}

/// Translates one selector into an absolute query expression.
pub fn translate(selector: &str) -> String {
    let mut query = selector.trim().to_string();
    for transformation in TRANSFORMATIONS.iter() {
        query = transformation.apply(&query).into_owned();
    }
    format!("//{}", query.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn has_class(class: &str) -> String {
        format!(
            "[contains(concat(' ', @class, ' '), concat(' ', '{}', ' '))]",
            class
        )
    }

    #[test]
    fn combinators() {
        assert_eq!(translate("div > p"), "//div/p");
        assert_eq!(translate("div p"), "//div//p");
        assert_eq!(translate("ul  li   a"), "//ul//li//a");
        assert_eq!(translate("h1 + p"), "//h1/following-sibling::*[1]/self::p");
        assert_eq!(translate("  div > p  "), "//div/p");
    }

    #[test]
    fn ids() {
        assert_eq!(translate("#main"), "//*[@id='main']");
        assert_eq!(translate("div#main"), "//div[@id='main']");
        assert_eq!(translate("#main p"), "//*[@id='main']//p");
        assert_eq!(translate("div #main"), "//div//*[@id='main']");
    }

    #[test]
    fn classes() {
        assert_eq!(translate(".foo"), format!("//*{}", has_class("foo")));
        assert_eq!(
            translate(".foo.bar"),
            format!("//*{}{}", has_class("foo"), has_class("bar"))
        );
        assert_eq!(translate("p.lead"), format!("//p{}", has_class("lead")));
        assert_eq!(translate("*.x-y"), format!("//*{}", has_class("x-y")));
        assert_eq!(
            translate("div > p.note"),
            format!("//div/p{}", has_class("note"))
        );
    }

    #[test]
    fn attributes() {
        assert_eq!(translate("a[href]"), "//a[@href]");
        assert_eq!(translate("a[target=_blank]"), "//a[@target=\"_blank\"]");
        assert_eq!(translate("a[target='_blank']"), "//a[@target=\"_blank\"]");
        assert_eq!(translate("a[target=\"_blank\"]"), "//a[@target=\"_blank\"]");
    }

    #[test]
    fn unsupported_forms_pass_through() {
        assert_eq!(translate("h1 ~ p"), "//h1//~//p");
        assert_eq!(translate("*"), "//*");
    }
}
