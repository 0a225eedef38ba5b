//! Highlighting of tagged code blocks.
//!
//! Every element carrying a `satzbau-language` attribute is a code block.
//! For each block the dispatcher picks a language, asks the engine for
//! markup, renames the engine's CSS classes to the public `satzbau-` prefix
//! and writes the markup back into the block.
//!
//! # Choosing a language
//!
//! Resolution happens per block:
//!
//! 1. The requested language is [`HighlightOptions::language`] if set,
//!    otherwise the block's own attribute value.
//! 2. A registered language is used as is.
//! 3. Otherwise [`HighlightOptions::fallback_language`] is used, provided it
//!    is registered itself.
//! 4. Otherwise the block is left alone.
//!
//! Blocks holding markup other than `<br>` are left alone too, since
//! rewriting them would drop their child elements.
//!
//! Blocks are independent: one block's unknown language or engine failure
//! never stops the others.

use std::collections::BTreeSet;

use crate::dom::{Document, DomError};
use crate::engine::HighlightEngine;
use crate::languages;

/// Public class prefix for highlighted spans.
pub const CLASS_PREFIX: &str = "satzbau";

/// How to highlight a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightOptions {
    /// Language for every block. `None` means each block's own.
    pub language: Option<String>,
    /// Used when the requested language is not registered.
    pub fallback_language: Option<String>,
    /// Strip the tagging attribute from blocks after processing.
    pub remove_attrs: bool,
}

/// A block the engine could not highlight. Its content is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFailure {
    pub index: usize,
    pub language: String,
    pub message: String,
}

/// What happened to the blocks of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightSummary {
    /// Blocks successfully highlighted.
    pub count: usize,
    /// Distinct languages applied.
    pub languages: BTreeSet<String>,
    /// Blocks the engine failed on.
    pub failures: Vec<BlockFailure>,
}

/// A highlighted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightResult {
    pub document: String,
    pub count: usize,
    pub languages: BTreeSet<String>,
    pub failures: Vec<BlockFailure>,
}

/// Pick the language to highlight with, if any.
pub fn resolve_language<'a>(requested: &'a str, fallback: Option<&'a str>) -> Option<&'a str> {
    if languages::supported(requested) {
        return Some(requested);
    }
    fallback.filter(|f| languages::supported(f))
}

/// Rename the engine's span classes to the public prefix.
pub fn rewrite_class_prefix(markup: &str, internal: &str, public: &str) -> String {
    if internal == public {
        return markup.to_string();
    }
    markup.replace(
        &format!("<span class=\"{internal}-"),
        &format!("<span class=\"{public}-"),
    )
}

/// Highlight every code block of `html`.
///
/// Returns `Ok(None)` when there is nothing to show for it: no options were
/// given, or not a single block was highlighted. `Err` only comes from the
/// HTML rewriter.
pub fn highlight<E>(
    html: &str,
    options: Option<&HighlightOptions>,
    engine: &mut E,
) -> Result<Option<HighlightResult>, DomError>
where
    E: HighlightEngine + ?Sized,
{
    let Some(options) = options else {
        return Ok(None);
    };

    let mut document = Document::parse(html)?;
    let summary = highlight_document(&mut document, options, engine);
    if summary.count == 0 {
        return Ok(None);
    }

    Ok(Some(HighlightResult {
        document: document.to_html()?,
        count: summary.count,
        languages: summary.languages,
        failures: summary.failures,
    }))
}

/// Highlight the code blocks of an already parsed document in place.
///
/// Callers that want to make more changes before serializing (the batch
/// processor injects stylesheets) use this instead of [`highlight`].
pub fn highlight_document<E>(
    document: &mut Document,
    options: &HighlightOptions,
    engine: &mut E,
) -> HighlightSummary
where
    E: HighlightEngine + ?Sized,
{
    let mut summary = HighlightSummary::default();
    tracing::debug!(blocks = document.block_count(), "highlighting document");

    for mut block in document.blocks() {
        if !block.is_plain_text() {
            tracing::debug!(block = block.index(), "block contains markup, leaving it as is");
            continue;
        }

        let requested = options
            .language
            .as_deref()
            .unwrap_or_else(|| block.language());
        let Some(language) =
            resolve_language(requested, options.fallback_language.as_deref()).map(str::to_owned)
        else {
            tracing::debug!(
                block = block.index(),
                language = requested,
                "no usable language, leaving block as is"
            );
            continue;
        };

        let source = html_escape::decode_html_entities(block.read_text()).into_owned();
        match engine.highlight(&language, &source) {
            Ok(markup) => {
                block.write_text(rewrite_class_prefix(
                    &markup,
                    engine.class_prefix(),
                    CLASS_PREFIX,
                ));
                summary.count += 1;
                summary.languages.insert(language);
            }
            Err(err) => {
                tracing::warn!(block = block.index(), %language, error = %err, "highlighting failed");
                summary.failures.push(BlockFailure {
                    index: block.index(),
                    language,
                    message: err.to_string(),
                });
            }
        }
    }

    if options.remove_attrs {
        document.remove_block_attrs();
    }

    summary
}
