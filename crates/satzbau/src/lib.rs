//! Post-process HTML documents to syntax-highlight tagged code blocks.
//!
//! Authors mark code in their pages with a `satzbau-language` attribute:
//!
//! ```html
//! <pre><code satzbau-language="go">func main() {}</code></pre>
//! ```
//!
//! satzbau finds those pages on disk, replaces the content of every tagged
//! block with tree-sitter highlighted markup, and writes the pages back.
//!
//! # How it works
//!
//! 1. **Walking**: [`walk`] searches files and directories for names that
//!    match a glob, descending a bounded number of levels.
//!
//! 2. **Highlighting**: [`highlight`] parses a document with lol_html,
//!    picks a registered language for each tagged block (falling back when
//!    the requested one is unknown), runs the [`HighlightEngine`] on it and
//!    writes the markup back with classes prefixed by [`CLASS_PREFIX`].
//!
//! 3. **Processing**: [`Processor`] ties the two together, highlighting
//!    files in parallel and optionally linking or embedding a stylesheet.
//!
//! # Example
//!
//! ```no_run
//! use satzbau::{ArboriumEngine, HighlightOptions, highlight};
//!
//! let mut engine = ArboriumEngine::new();
//! let options = HighlightOptions::default();
//! let html = r#"<pre><code satzbau-language="rust">fn main() {}</code></pre>"#;
//! if let Some(result) = highlight(html, Some(&options), &mut engine)? {
//!     println!("{} block(s): {}", result.count, result.document);
//! }
//! # Ok::<(), satzbau::DomError>(())
//! ```

pub mod diagnostics;
pub mod dom;
pub mod engine;
pub mod highlighter;
pub mod languages;
mod processor;
pub mod styles;
pub mod walker;

pub use diagnostics::{Diagnostics, RecordingDiagnostics, TracingDiagnostics};
pub use dom::{BLOCK_ATTR, CodeBlock, Document, DomError};
pub use engine::{ArboriumEngine, EngineError, HighlightEngine};
pub use highlighter::{
    BlockFailure, CLASS_PREFIX, HighlightOptions, HighlightResult, HighlightSummary, highlight,
    highlight_document,
};
pub use processor::{ProcessError, ProcessOptions, Processor, ProcessorStats, StylesheetMode};
pub use styles::{StyleError, StyleOptions};
pub use walker::{FileSystem, OsFileSystem, WalkError, WalkOptions, walk, walk_blocking};
