use crate::dom::dom_tree::{self, Document};
use crate::error::FlattenError;
use crate::parser::{html, serialize};
use crate::query::Query;
use crate::style::{cascade, CascadeReport, MalformedPolicy, Stylesheet};
use log::{debug, info};
use std::borrow::Cow;

/// Knobs for a flatten run. The defaults never fail on stylesheet content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Fail on a malformed stylesheet declaration instead of skipping it.
    pub strict: bool,
    /// Also apply the text of the document's own `<style>` elements,
    /// after the supplied stylesheet.
    pub include_embedded_styles: bool,
}

impl FlattenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn include_embedded_styles(mut self, include: bool) -> Self {
        self.include_embedded_styles = include;
        self
    }

    fn malformed_policy(&self) -> MalformedPolicy {
        if self.strict {
            MalformedPolicy::Reject
        } else {
            MalformedPolicy::Skip
        }
    }
}

/// Moves stylesheet rules into inline `style` attributes.
#[derive(Debug, Clone, Default)]
pub struct Flattener {
    options: FlattenOptions,
}

impl Flattener {
    pub fn new(options: FlattenOptions) -> Self {
        Flattener { options }
    }

    pub fn options(&self) -> &FlattenOptions {
        &self.options
    }

    /// Parses the document, applies the stylesheet and serializes the result.
    pub fn flatten(&self, document_text: &str, stylesheet_text: &str) -> Result<String, FlattenError> {
        self.flatten_with_report(document_text, stylesheet_text)
            .map(|(output, _)| output)
    }

    /// Like [`Flattener::flatten`], also returning what the cascade did.
    pub fn flatten_with_report(
        &self,
        document_text: &str,
        stylesheet_text: &str,
    ) -> Result<(String, CascadeReport), FlattenError> {
        debug!("parsing html document");
        let document = html::create_dom_tree(document_text);
        let report = self.apply(&document, stylesheet_text)?;
        Ok((serialize::serialize_document(&document), report))
    }

    /// Applies the stylesheet to an already parsed document.
    pub fn apply(&self, document: &Document, stylesheet_text: &str) -> Result<CascadeReport, FlattenError> {
        let mut css = Cow::Borrowed(stylesheet_text);
        if self.options.include_embedded_styles {
            let embedded = embedded_styles(document)?;
            if !embedded.is_empty() {
                debug!("appending {} bytes of embedded styles", embedded.len());
                css = Cow::Owned(format!("{}\n{}", stylesheet_text, embedded));
            }
        }

        debug!("reading style rules from css");
        let stylesheet = Stylesheet::parse_with(&css, self.options.malformed_policy())?;
        debug!("found {} style rules", stylesheet.len());

        let report = cascade::apply(document, &stylesheet);
        info!(
            "applied {} of {} rules to {} element(s); {} unmatched, {} invalid",
            report.applied,
            stylesheet.len(),
            report.elements_styled,
            report.unmatched,
            report.failures.len()
        );
        Ok(report)
    }
}

/// Text of every `<style>` element, in document order.
pub fn embedded_styles(document: &Document) -> Result<String, FlattenError> {
    let query = Query::compile("//style")?;
    Ok(query
        .select(document)
        .iter()
        .map(dom_tree::text_content)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Flattens with default options.
pub fn flatten(document_text: &str, stylesheet_text: &str) -> Result<String, FlattenError> {
    Flattener::default().flatten(document_text, stylesheet_text)
}
