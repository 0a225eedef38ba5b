//! HTML document model backed by lol_html.
//!
//! lol_html streams and has no tree to hold on to, so a [`Document`] works in
//! two passes:
//!
//! 1. [`Document::parse`] streams the input once, recording every element
//!    tagged with [`BLOCK_ATTR`] (its declared language and raw inner text)
//!    and counting the stylesheet links in `<head>`.
//! 2. [`Document::to_html`] streams the original input again and applies
//!    whatever was changed in between: new block contents, stripped tagging
//!    attributes, and stylesheet injection.
//!
//! Blocks are matched between the passes by their position in document
//! order. Anything not changed passes through byte-for-byte.
//!
//! A block's text is its raw character data, with `<br>` read as a line
//! break. Blocks holding any other element or a comment are marked as not
//! plain text: their content cannot be rewritten without losing markup.

use std::cell::{Cell, RefCell};

use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, comments, element, rewrite_str, text};

/// Attribute that marks an element as a code block and names its language.
pub const BLOCK_ATTR: &str = "satzbau-language";

const BLOCK_SELECTOR: &str = "[satzbau-language]";
const BLOCK_CHILD_SELECTOR: &str = "[satzbau-language] *";
const HEAD_STYLESHEET_SELECTOR: &str = r#"head link[rel="stylesheet"]"#;

/// Errors from the HTML rewriter.
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("failed to rewrite HTML: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
}

#[derive(Debug, Clone)]
struct BlockSlot {
    language: String,
    text: String,
    has_markup: bool,
    written: bool,
}

/// A parsed HTML document with its tagged code blocks.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    blocks: Vec<BlockSlot>,
    head_stylesheet_links: usize,
    strip_block_attrs: bool,
    stylesheet_link: Option<String>,
    embedded_styles: Vec<String>,
}

impl Document {
    /// Parse `html` and locate its code blocks.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let blocks = RefCell::new(Vec::<BlockSlot>::new());
        let links = Cell::new(0usize);

        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    // Runs before a nested block is pushed, so it marks the
                    // enclosing one
                    element!(BLOCK_CHILD_SELECTOR, |el| {
                        if let Some(block) = blocks.borrow_mut().last_mut() {
                            if el.tag_name() == "br" {
                                block.text.push('\n');
                            } else {
                                block.has_markup = true;
                            }
                        }
                        Ok(())
                    }),
                    element!(BLOCK_SELECTOR, |el| {
                        blocks.borrow_mut().push(BlockSlot {
                            language: el.get_attribute(BLOCK_ATTR).unwrap_or_default(),
                            text: String::new(),
                            has_markup: false,
                            written: false,
                        });
                        Ok(())
                    }),
                    comments!(BLOCK_SELECTOR, |_comment| {
                        if let Some(block) = blocks.borrow_mut().last_mut() {
                            block.has_markup = true;
                        }
                        Ok(())
                    }),
                    text!(BLOCK_SELECTOR, |chunk| {
                        if let Some(block) = blocks.borrow_mut().last_mut() {
                            block.text.push_str(chunk.as_str());
                        }
                        Ok(())
                    }),
                    element!(HEAD_STYLESHEET_SELECTOR, |_el| {
                        links.set(links.get() + 1);
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::new()
            },
        )?;

        Ok(Self {
            source: html.to_string(),
            blocks: blocks.into_inner(),
            head_stylesheet_links: links.get(),
            strip_block_attrs: false,
            stylesheet_link: None,
            embedded_styles: Vec::new(),
        })
    }

    /// Number of tagged code blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Handles to every code block, in document order.
    pub fn blocks(&mut self) -> impl Iterator<Item = CodeBlock<'_>> {
        self.blocks
            .iter_mut()
            .enumerate()
            .map(|(index, slot)| CodeBlock { index, slot })
    }

    /// Drop the tagging attribute from every code block on output.
    pub fn remove_block_attrs(&mut self) {
        self.strip_block_attrs = true;
    }

    /// Link a stylesheet from `<head>`, right after the last stylesheet
    /// link already there, or at the end of `<head>` if there is none.
    ///
    /// Does nothing for documents without a `<head>`.
    pub fn add_stylesheet_link(&mut self, href: &str) {
        self.stylesheet_link = Some(href.to_string());
    }

    /// Append a `<style>` element holding `css` to `<head>`.
    ///
    /// Does nothing for documents without a `<head>`.
    pub fn embed_stylesheet(&mut self, css: &str) {
        self.embedded_styles.push(css.to_string());
    }

    fn is_modified(&self) -> bool {
        self.strip_block_attrs
            || self.stylesheet_link.is_some()
            || !self.embedded_styles.is_empty()
            || self.blocks.iter().any(|b| b.written)
    }

    /// Serialize the document with all changes applied.
    pub fn to_html(&self) -> Result<String, DomError> {
        if !self.is_modified() {
            return Ok(self.source.clone());
        }

        let next_block = Cell::new(0usize);
        let seen_links = Cell::new(0usize);
        let link_tag = self.stylesheet_link.as_deref().map(stylesheet_link_tag);

        let html = rewrite_str(
            &self.source,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!(BLOCK_SELECTOR, |el| {
                        let index = next_block.get();
                        next_block.set(index + 1);

                        if let Some(block) = self.blocks.get(index)
                            && block.written
                        {
                            el.set_inner_content(&block.text, ContentType::Html);
                        }
                        if self.strip_block_attrs {
                            el.remove_attribute(BLOCK_ATTR);
                        }
                        Ok(())
                    }),
                    element!(HEAD_STYLESHEET_SELECTOR, |el| {
                        let seen = seen_links.get() + 1;
                        seen_links.set(seen);

                        if let Some(tag) = &link_tag
                            && seen == self.head_stylesheet_links
                        {
                            el.after(tag, ContentType::Html);
                        }
                        Ok(())
                    }),
                    element!("head", |el| {
                        if let Some(tag) = &link_tag
                            && self.head_stylesheet_links == 0
                        {
                            el.append(tag, ContentType::Html);
                        }
                        for css in &self.embedded_styles {
                            el.append(&format!("<style>{css}</style>"), ContentType::Html);
                        }
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::new()
            },
        )?;

        Ok(html)
    }
}

/// A code block inside a [`Document`].
///
/// The handle borrows the document, so it cannot outlive the operation
/// that obtained it.
pub struct CodeBlock<'a> {
    index: usize,
    slot: &'a mut BlockSlot,
}

impl CodeBlock<'_> {
    /// Position of the block in document order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The language named by the block's tagging attribute.
    pub fn language(&self) -> &str {
        &self.slot.language
    }

    /// The block's current content as HTML.
    pub fn read_text(&self) -> &str {
        &self.slot.text
    }

    /// False when the block holds elements (other than `<br>`) or comments.
    pub fn is_plain_text(&self) -> bool {
        !self.slot.has_markup
    }

    /// Replace the block's content. `value` is inserted as HTML.
    pub fn write_text(&mut self, value: impl Into<String>) {
        self.slot.text = value.into();
        self.slot.written = true;
    }
}

fn stylesheet_link_tag(href: &str) -> String {
    format!(
        r#"<link rel="stylesheet" href="{}" type="text/css" media="screen">"#,
        escape_attr(href)
    )
}

fn escape_attr(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}
