//! The highlighting engine seam.
//!
//! The dispatcher only needs markup for one block at a time, so anything
//! that can turn (language, source) into HTML spans can drive it. The
//! production engine is [`ArboriumEngine`]; tests substitute their own.

use std::sync::Arc;

use arborium::{Config, GrammarStore, Highlighter, HtmlFormat};

/// Class prefix arborium is configured to emit. Never leaks into output.
pub const ARBORIUM_PREFIX: &str = "arb";

/// Something that turns source code into highlighted HTML.
pub trait HighlightEngine {
    /// Prefix the engine puts on the class names of the spans it emits,
    /// without the trailing dash.
    fn class_prefix(&self) -> &str;

    /// Highlight `source` as `language` and return HTML markup.
    ///
    /// Implementations must be strict: a language they cannot handle is an
    /// error, never a guess.
    fn highlight(&mut self, language: &str, source: &str) -> Result<String, EngineError>;
}

/// Failure to highlight a single block.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to highlight `{language}`: {message}")]
    Failed { language: String, message: String },
}

/// Tree-sitter highlighting through arborium.
///
/// Only the grammars enabled through this crate's `lang-*` features are
/// available; every other language fails with an [`EngineError`].
pub struct ArboriumEngine {
    highlighter: Highlighter,
}

impl Default for ArboriumEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ArboriumEngine {
    pub fn new() -> Self {
        Self::with_store(Arc::new(GrammarStore::new()))
    }

    /// Create an engine that shares compiled grammars with others.
    ///
    /// One store per process, one engine per worker thread.
    pub fn with_store(store: Arc<GrammarStore>) -> Self {
        let config = Config {
            html_format: HtmlFormat::ClassNamesWithPrefix(ARBORIUM_PREFIX.to_string()),
            ..Config::default()
        };
        Self {
            highlighter: Highlighter::with_store_and_config(store, config),
        }
    }

}

impl HighlightEngine for ArboriumEngine {
    fn class_prefix(&self) -> &str {
        ARBORIUM_PREFIX
    }

    fn highlight(&mut self, language: &str, source: &str) -> Result<String, EngineError> {
        let grammar = grammar_name(language);
        self.highlighter
            .highlight(grammar, source)
            .map_err(|e| EngineError::Failed {
                language: language.to_string(),
                message: e.to_string(),
            })
    }
}

/// Map a registered language identifier to the arborium grammar that
/// covers it, where the two names differ.
fn grammar_name(language: &str) -> &str {
    match language {
        "cs" => "c-sharp",
        "objectivec" => "objc",
        "shell" => "bash",
        "vbnet" => "vb",
        "lisp" => "commonlisp",
        "capnproto" => "capnp",
        "dts" => "devicetree",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_name_mapping() {
        assert_eq!(grammar_name("cs"), "c-sharp");
        assert_eq!(grammar_name("shell"), "bash");
        assert_eq!(grammar_name("go"), "go");
        assert_eq!(grammar_name("rust"), "rust");
        assert_eq!(grammar_name("protobuf"), "protobuf");
    }

    #[test]
    fn test_unknown_grammar_is_an_error() {
        let mut engine = ArboriumEngine::new();
        let result = engine.highlight("brainfuck", "+[-->-[>>+>-----<<]<--<---]>-.");
        assert!(matches!(result, Err(EngineError::Failed { .. })));
    }

    #[test]
    #[cfg(feature = "lang-go")]
    fn test_go_uses_internal_prefix() {
        let mut engine = ArboriumEngine::new();
        let html = engine
            .highlight("go", "package main\n\nfunc main() {}\n")
            .unwrap();
        assert!(html.contains(&format!("class=\"{ARBORIUM_PREFIX}-")));
        assert!(html.contains("main"));
    }

    #[test]
    #[cfg(feature = "lang-bash")]
    fn test_engines_share_a_grammar_store() {
        let store = Arc::new(GrammarStore::new());
        let mut a = ArboriumEngine::with_store(store.clone());
        let mut b = ArboriumEngine::with_store(store);
        assert!(a.highlight("shell", "echo hi").is_ok());
        assert!(b.highlight("bash", "echo hi").is_ok());
    }
}
