//! Selector precedence: ids outrank classes, which outrank element names.

use once_cell::sync::Lazy;
use regex::Regex;

/// Token patterns per tier, highest weight first.
static TIERS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"#[\w-]+").expect("id pattern"),
        Regex::new(r"\.[\w-]+").expect("class pattern"),
        Regex::new(r"[\w-]+").expect("element pattern"),
    ]
});

/// `[...]` attribute sections, which take no part in scoring.
static ATTRIBUTE_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("attribute pattern"));

/// Scores a single selector: each id adds 100, each class 10, each element name 1.
///
/// Every tier's tokens are stripped from the text before the next tier is
/// counted, so the name inside `#main` is never seen again as an element.
pub fn score(selector: &str) -> u32 {
    let mut remaining = ATTRIBUTE_SECTION.replace_all(selector, "").into_owned();
    let mut weight = 100;
    let mut precedence = 0;

    for tier in TIERS.iter() {
        if remaining.trim().is_empty() {
            break;
        }
        let count = tier.find_iter(&remaining).count() as u32;
        precedence += count * weight;
        remaining = tier.replace_all(&remaining, "").into_owned();
        weight /= 10;
    }
    precedence
}
