//! Stylesheet lookup.
//!
//! A stylesheet is named without its directory and with or without the
//! `.css` extension (`github` and `github.css` are the same sheet). Sheets
//! live in `./styles` unless a different directory is given.

use std::io;
use std::path::{Path, PathBuf};

/// Directory searched when no path is configured, relative to the current
/// directory.
pub const DEFAULT_STYLES_DIR: &str = "styles";

/// Where to look and how to post-process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleOptions {
    /// Directory holding the stylesheets. Relative paths are taken from the
    /// current directory.
    pub path: Option<PathBuf>,
    /// Strip comments and collapse whitespace.
    pub minify: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("stylesheet name is empty")]
    EmptyName,

    #[error("cannot determine current directory")]
    CurrentDir(#[source] io::Error),

    #[error("stylesheet not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read stylesheet {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StyleError {
    /// True when the stylesheet file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StyleError::NotFound { .. })
    }
}

/// Resolve `name` to a file path, relative directories taken from the
/// process's current directory.
pub fn resolve(name: &str, options: &StyleOptions) -> Result<PathBuf, StyleError> {
    let cwd = std::env::current_dir().map_err(StyleError::CurrentDir)?;
    resolve_from(&cwd, name, options)
}

/// Resolve `name` to a file path, relative directories taken from `cwd`.
pub fn resolve_from(cwd: &Path, name: &str, options: &StyleOptions) -> Result<PathBuf, StyleError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StyleError::EmptyName);
    }

    let file_name = if name.ends_with(".css") {
        name.to_string()
    } else {
        format!("{name}.css")
    };

    let dir = match &options.path {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => cwd.join(path),
        None => cwd.join(DEFAULT_STYLES_DIR),
    };

    Ok(dir.join(file_name))
}

/// Read the stylesheet called `name`.
pub fn load(name: &str, options: &StyleOptions) -> Result<String, StyleError> {
    let path = resolve(name, options)?;
    read(&path, options.minify)
}

/// Read the stylesheet at `path`.
pub fn read(path: &Path, minify: bool) -> Result<String, StyleError> {
    let css = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            StyleError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StyleError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    Ok(if minify { minify_css(&css) } else { css })
}

/// Remove comments and squeeze whitespace out of a stylesheet.
///
/// Whitespace runs become a single space, and disappear entirely next to
/// `{ } ; : ,`. String contents are left alone.
pub fn minify_css(css: &str) -> String {
    let mut result = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            c if c.is_whitespace() => pending_space = true,
            '"' | '\'' => {
                flush_space(&mut result, &mut pending_space, c);
                result.push(c);
                let quote = c;
                let mut escaped = false;
                for c in chars.by_ref() {
                    result.push(c);
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == quote {
                        break;
                    }
                }
            }
            c => {
                flush_space(&mut result, &mut pending_space, c);
                result.push(c);
            }
        }
    }

    result
}

fn flush_space(result: &mut String, pending: &mut bool, next: char) {
    if *pending {
        let glued = |c: char| matches!(c, '{' | '}' | ';' | ':' | ',');
        let after_glue = result.chars().last().is_none_or(glued);
        if !after_glue && !glued(next) {
            result.push(' ');
        }
        *pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cwd() -> PathBuf {
        PathBuf::from("/work/site")
    }

    #[test]
    fn test_default_path() {
        let path = resolve_from(&cwd(), "github", &StyleOptions::default()).unwrap();
        assert_eq!(path, PathBuf::from("/work/site/styles/github.css"));
    }

    #[test]
    fn test_absolute_path() {
        let options = StyleOptions {
            path: Some(PathBuf::from("/fakepath")),
            ..StyleOptions::default()
        };
        let path = resolve_from(&cwd(), "github", &options).unwrap();
        assert_eq!(path, PathBuf::from("/fakepath/github.css"));
    }

    #[test]
    fn test_relative_path_joins_cwd() {
        let options = StyleOptions {
            path: Some(PathBuf::from("fakepath")),
            ..StyleOptions::default()
        };
        let path = resolve_from(&cwd(), "github", &options).unwrap();
        assert_eq!(path, PathBuf::from("/work/site/fakepath/github.css"));
    }

    #[test]
    fn test_extension_handling() {
        let options = StyleOptions::default();
        for name in ["github", "github.css", "  github.css\n"] {
            let path = resolve_from(&cwd(), name, &options).unwrap();
            assert_eq!(path.file_name().unwrap(), "github.css");
        }
    }

    #[test]
    fn test_empty_name() {
        for name in ["", "   "] {
            let err = resolve_from(&cwd(), name, &StyleOptions::default()).unwrap_err();
            assert!(matches!(err, StyleError::EmptyName));
        }
    }

    #[test]
    fn test_missing_style_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let options = StyleOptions {
            path: Some(dir.path().to_path_buf()),
            ..StyleOptions::default()
        };
        let err = load("non-existent-style", &options).unwrap_err();
        assert!(err.is_not_found());

        let options = StyleOptions {
            path: Some(dir.path().join("non-existent-styles")),
            ..StyleOptions::default()
        };
        let err = load("github", &options).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_and_minify() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("dark.css"),
            "/* dark theme */\n.satzbau {\n  display: block;\n  background: #474949;\n}\n\n.satzbau-string { content: \"a  /* b */\"; }\n",
        )
        .unwrap();

        let options = StyleOptions {
            path: Some(dir.path().to_path_buf()),
            minify: false,
        };
        let css = load("dark", &options).unwrap();
        assert!(css.starts_with("/* dark theme */"));

        let options = StyleOptions {
            minify: true,
            ..options
        };
        let css = load("dark.css", &options).unwrap();
        assert_eq!(
            css,
            ".satzbau{display:block;background:#474949;}.satzbau-string{content:\"a  /* b */\";}"
        );
    }

    #[test]
    fn test_minify_keeps_meaningful_spaces() {
        assert_eq!(
            minify_css("pre  code ,\n.x > .y { margin : 0 auto }"),
            "pre code,.x > .y{margin:0 auto}"
        );
    }
}
