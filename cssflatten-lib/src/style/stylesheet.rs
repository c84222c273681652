//! Splits a stylesheet into single-selector rules ordered by cascade priority.

use super::declarations::{MalformedPolicy, StyleDeclarations};
use super::precedence;
use crate::error::StyleError;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;

/// Greedy: from the first `/*` to the last `*/`, across lines.
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*\*/").expect("comment pattern"));

static RULE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?P<selector>[^{]+)\{(?P<declarations>[^}]+)\}").expect("rule block pattern")
});

/// One selector with its declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// A single selector, never a comma group. Kept as written.
    pub selector: String,
    pub declarations: StyleDeclarations,
    /// Byte offset of the rule block in the comment-stripped stylesheet.
    pub source_index: usize,
    /// Cached [`precedence::score`] of `selector`.
    pub precedence: u32,
}

impl fmt::Display for StyleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{{}}}", self.selector.trim(), self.declarations)
    }
}

/// Rules sorted by ascending (precedence, source index): apply in order and
/// later rules legitimately override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    rules: Vec<StyleRule>,
}

impl Stylesheet {
    /// Parses `css`, skipping malformed declarations.
    pub fn parse(css: &str) -> Self {
        Self::parse_with(css, MalformedPolicy::Skip).unwrap_or_default()
    }

    /// Parses `css`; with [`MalformedPolicy::Reject`] the first malformed
    /// declaration fails the whole parse.
    pub fn parse_with(css: &str, policy: MalformedPolicy) -> Result<Self, StyleError> {
        let css = strip_comments(css);
        let mut rules = Vec::new();

        for block in RULE_BLOCK.captures_iter(&css) {
            let (Some(whole), Some(group), Some(body)) =
                (block.get(0), block.name("selector"), block.name("declarations"))
            else {
                continue;
            };
            let group = group.as_str();

            if group.contains(':') {
                debug!("skipping pseudo selector group {:?}", group.trim());
                continue;
            }
            if group.trim_start().starts_with('@') {
                debug!("skipping at-rule {:?}", group.trim());
                continue;
            }

            let declarations = StyleDeclarations::decode_with(body.as_str(), policy)?;
            for selector in group.split(',') {
                if selector.trim().is_empty() {
                    debug!("skipping empty selector in group {:?}", group.trim());
                    continue;
                }
                rules.push(StyleRule {
                    selector: selector.to_string(),
                    declarations: declarations.clone(),
                    source_index: whole.start(),
                    precedence: precedence::score(selector),
                });
            }
        }

        rules.sort_by_key(|rule| (rule.precedence, rule.source_index));
        Ok(Stylesheet { rules })
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StyleRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a Stylesheet {
    type Item = &'a StyleRule;
    type IntoIter = std::slice::Iter<'a, StyleRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Removes `/* ... */` comments.
///
/// The match is greedy, so with several comments everything between the first
/// opener and the last closer goes, rules included.
pub fn strip_comments(css: &str) -> Cow<'_, str> {
    COMMENT.replace_all(css, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selectors(sheet: &Stylesheet) -> Vec<&str> {
        sheet.iter().map(|rule| rule.selector.trim()).collect()
    }

    #[test]
    fn orders_by_precedence_then_source() {
        let sheet = Stylesheet::parse("#id{a:1} p{a:2} .c{a:3} div{a:4}");
        assert_eq!(selectors(&sheet), vec!["p", "div", ".c", "#id"]);
    }

    #[test]
    fn splits_comma_groups_into_rules() {
        let sheet = Stylesheet::parse("h1, h2 ,.title{color:red}");
        assert_eq!(selectors(&sheet), vec!["h1", "h2", ".title"]);
        let h1 = &sheet.rules()[0];
        let h2 = &sheet.rules()[1];
        assert_eq!(h1.source_index, h2.source_index);
        assert_eq!(h1.declarations, h2.declarations);
        assert_eq!(h2.selector, " h2 ");
    }

    #[test]
    fn drops_groups_with_pseudo_selectors() {
        let sheet = Stylesheet::parse("a:hover, b{color:red} a{color:blue} p::before{content:'x'}");
        assert_eq!(selectors(&sheet), vec!["a"]);
        assert!(sheet.iter().all(|rule| !rule.selector.contains(':')));
    }

    #[test]
    fn records_block_offsets() {
        let css = "p{color:red}\n.a{color:blue}";
        let sheet = Stylesheet::parse(css);
        let offsets: Vec<usize> = sheet.iter().map(|rule| rule.source_index).collect();
        assert_eq!(offsets, vec![0, 12]);
    }

    #[test]
    fn strips_multi_line_comment() {
        let sheet = Stylesheet::parse("/* header\n   comment */\np { color: red; }");
        assert_eq!(selectors(&sheet), vec!["p"]);
        assert_eq!(sheet.rules()[0].declarations.get("color"), Some(" red"));
    }

    #[test]
    fn greedy_comments_swallow_rules_between_them() {
        let sheet = Stylesheet::parse("/* a */ p{color:red} /* b */ div{color:blue}");
        assert_eq!(selectors(&sheet), vec!["div"]);
    }

    #[test]
    fn skips_at_rules_and_empty_selectors() {
        let sheet = Stylesheet::parse("@font-face{font-family:x} a,,b{color:red}");
        assert_eq!(selectors(&sheet), vec!["a", "b"]);
    }

    #[test]
    fn malformed_declarations_follow_policy() {
        let css = "p{color:red;oops} a{color:blue}";
        let lenient = Stylesheet::parse(css);
        assert_eq!(lenient.len(), 2);
        assert_eq!(lenient.rules()[0].declarations.encode(), "color:red");

        let strict = Stylesheet::parse_with(css, MalformedPolicy::Reject);
        assert!(matches!(strict, Err(StyleError::MalformedDeclaration { .. })));
    }

    #[test]
    fn display_shows_rule() {
        let sheet = Stylesheet::parse(".hl{color:red}");
        assert_eq!(sheet.rules()[0].to_string(), ".hl {color:red}");
    }
}
