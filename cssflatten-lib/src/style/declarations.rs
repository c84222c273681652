use crate::error::StyleError;
use indexmap::IndexMap;
use log::warn;
use std::fmt;
use std::str::FromStr;

/// What to do with a non-empty declaration segment that has no `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Fail the whole decode with [`StyleError::MalformedDeclaration`].
    Reject,
    /// Drop the segment and log a warning.
    #[default]
    Skip,
}

/// An ordered `property -> value` block, as found in a rule body or a `style` attribute.
///
/// Values are kept as written, surrounding whitespace included. Property
/// names are the exception: they are trimmed, so `color` and ` color ` are
/// one property and a later `color: blue` replaces an earlier `color:red`
/// instead of sitting beside it. Re-inserting a property replaces its value
/// but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDeclarations {
    entries: IndexMap<String, String>,
}

impl StyleDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict decode: a segment without `:` is an error.
    pub fn decode(text: &str) -> Result<Self, StyleError> {
        Self::decode_with(text, MalformedPolicy::Reject)
    }

    /// Lenient decode: segments without `:` are skipped.
    pub fn decode_lossy(text: &str) -> Self {
        Self::decode_with(text, MalformedPolicy::Skip).unwrap_or_default()
    }

    pub fn decode_with(text: &str, policy: MalformedPolicy) -> Result<Self, StyleError> {
        let cleaned: String = text
            .chars()
            .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
            .collect();

        let mut declarations = StyleDeclarations::new();
        for segment in cleaned.split(';').filter(|s| !s.trim().is_empty()) {
            match (declarations.push_segment(segment), policy) {
                (Ok(()), _) => {}
                (Err(err), MalformedPolicy::Skip) => warn!("skipping {}", err),
                (Err(err), MalformedPolicy::Reject) => return Err(err),
            }
        }
        Ok(declarations)
    }

    fn push_segment(&mut self, segment: &str) -> Result<(), StyleError> {
        match segment.split_once(':') {
            Some((name, value)) => {
                self.insert(name, value);
                Ok(())
            }
            None => Err(StyleError::MalformedDeclaration {
                segment: segment.to_string(),
            }),
        }
    }

    /// `name:value` pairs joined with `;`, in insertion order.
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.entries
            .insert(name.trim().to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Overlays every declaration of `other`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &StyleDeclarations) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl FromStr for StyleDeclarations {
    type Err = StyleError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        StyleDeclarations::decode(text)
    }
}

impl fmt::Display for StyleDeclarations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for StyleDeclarations {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut declarations = StyleDeclarations::new();
        for (name, value) in iter {
            declarations.insert(name, value);
        }
        declarations
    }
}
