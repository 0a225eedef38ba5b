//! The fixed set of language identifiers a code block may request.
//!
//! Identifiers are matched exactly: no case folding, no aliases. Whether the
//! engine can actually highlight a registered language is a separate question
//! answered per block at highlight time.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Every language identifier accepted in a `satzbau-language` attribute.
#[rustfmt::skip]
pub const LANGUAGES: &[&str] = &[
    "1c",         "abnf",         "accesslog",  "actionscript", "ada",           "apache",     "applescript",
    "arduino",    "armasm",       "asciidoc",   "aspectj",      "autohotkey",    "autoit",     "avrasm",
    "awk",        "axapta",       "bash",       "basic",        "bnf",           "brainfuck",  "cal",
    "capnproto",  "ceylon",       "clean",      "clojure",      "clojure-repl",  "cmake",      "coffeescript",
    "coq",        "cos",          "cpp",        "crmsh",        "crystal",       "cs",         "csp",
    "css",        "dart",         "delphi",     "diff",         "django",        "d",          "dns",
    "dockerfile", "dos",          "dsconfig",   "dts",          "dust",          "ebnf",       "elixir",
    "elm",        "erb",          "erlang",     "erlang-repl",  "excel",         "fix",        "flix",
    "fortran",    "fsharp",       "gams",       "gauss",        "gcode",         "gherkin",    "glsl",
    "go",         "golo",         "gradle",     "groovy",       "haml",          "handlebars", "haskell",
    "haxe",       "hsp",          "htmlbars",   "http",         "hy",            "inform7",    "ini",
    "irpf90",     "java",         "javascript", "jboss-cli",    "json",          "julia",      "julia-repl",
    "kotlin",     "lasso",        "ldif",       "leaf",         "less",          "lisp",       "livecodeserver",
    "livescript", "llvm",         "lsl",        "lua",          "makefile",      "markdown",   "mathematica",
    "matlab",     "maxima",       "mel",        "mercury",      "mipsasm",       "mizar",      "mojolicious",
    "monkey",     "moonscript",   "n1ql",       "nginx",        "nimrod",        "nix",        "nsis",
    "objectivec", "ocaml",        "openscad",   "oxygene",      "parser3",       "perl",       "pf",
    "php",        "pony",         "powershell", "processing",   "profile",       "prolog",     "protobuf",
    "puppet",     "purebasic",    "python",     "q",            "qml",           "rib",        "r",
    "roboconf",   "routeros",     "rsl",        "ruby",         "ruleslanguage", "rust",       "scala",
    "scheme",     "scilab",       "scss",       "shell",        "smali",         "smalltalk",  "sml",
    "sqf",        "sql",          "stan",       "stata",        "step21",        "stylus",     "subunit",
    "swift",      "taggerscript", "tap",        "tcl",          "tex",           "thrift",     "tp",
    "twig",       "typescript",   "vala",       "vbnet",        "vbscript-html", "vbscript",   "verilog",
    "vhdl",       "vim",          "x86asm",     "xl",           "xml",           "xquery",     "yaml",
    "zephir",
];

static REGISTRY: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| LANGUAGES.iter().copied().collect());

/// Returns true if `language` is a registered identifier.
pub fn supported(language: &str) -> bool {
    REGISTRY.contains(language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_languages() {
        for lang in ["go", "rust", "1c", "clojure-repl", "vbscript-html", "zephir"] {
            assert!(supported(lang), "{lang} should be supported");
        }
    }

    #[test]
    fn test_matching_is_exact() {
        assert!(!supported("Go"));
        assert!(!supported("RUST"));
        assert!(!supported("rs"));
        assert!(!supported("pyth"));
        assert!(!supported(" go"));
        assert!(!supported(""));
        assert!(!supported("unsupported-xyz"));
    }

    #[test]
    fn test_no_duplicates() {
        assert_eq!(REGISTRY.len(), LANGUAGES.len());
        assert!(LANGUAGES.len() > 180);
    }
}
