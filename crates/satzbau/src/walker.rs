//! Depth-limited search for input files.
//!
//! Given a list of files and directories, [`walk`] collects every regular
//! file whose name matches a glob pattern, descending into subdirectories
//! when asked to.
//!
//! # Depth
//!
//! Paths given explicitly are at depth 0, their children at depth 1, and so
//! on. A directory at depth 0 is always listed, whatever the flags say:
//! naming a directory means "look inside". Deeper directories are listed
//! only when `recursive` is set and their depth is below `max_depth`.
//!
//! # Failures
//!
//! The two filesystem failures are handled differently:
//!
//! - Failing to read a path's metadata aborts the walk. It is reported as
//!   fatal and returned as [`WalkError::Metadata`].
//! - Failing to list a directory is reported as a recoverable error and the
//!   walk continues. That subtree just contributes no matches.
//!
//! # Sync in async clothing
//!
//! [`walk`] is an `async fn` so it composes with async callers, but every
//! filesystem call inside it is synchronous and it never yields.
//! [`walk_blocking`] polls it exactly once.

use std::ffi::OsStr;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::task::{Context, Poll, Waker};

use globset::{Glob, GlobMatcher};

use crate::diagnostics::Diagnostics;

/// What to search and how deep.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Files and directories to start from.
    pub roots: Vec<PathBuf>,
    /// Descend into subdirectories of the roots.
    pub recursive: bool,
    /// Directories at this depth or deeper are not listed.
    pub max_depth: usize,
    /// Glob matched against each file's base name.
    pub pattern: String,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            recursive: false,
            max_depth: 5,
            pattern: "*.html".to_string(),
        }
    }
}

/// How the walker classifies a path. Symlinks are never followed, so a link
/// to a directory is [`EntryKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Other,
}

/// Filesystem access used by the walker.
pub trait FileSystem {
    /// Classify `path` without following symlinks.
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;

    /// Full paths of the immediate children of `path`.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let file_type = std::fs::symlink_metadata(path)?.file_type();
        Ok(if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        })
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}

/// Errors that abort a walk.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("invalid file pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("cannot read metadata for {}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Collect the absolute paths of all matching files under `options.roots`.
///
/// Relative roots are resolved against the current directory. Results come
/// out depth-first; roots are visited last-given first, children in name
/// order. Treat the result as a set.
pub async fn walk<F>(
    options: &WalkOptions,
    fs: &F,
    diagnostics: &mut dyn Diagnostics,
) -> Result<Vec<PathBuf>, WalkError>
where
    F: FileSystem + ?Sized,
{
    let matcher = NameMatcher::new(&options.pattern)?;

    let mut stack: Vec<(PathBuf, usize)> = Vec::with_capacity(options.roots.len());
    for root in &options.roots {
        match std::path::absolute(root) {
            Ok(path) => stack.push((path, 0)),
            Err(source) => {
                diagnostics.fatal(&source, &format!("cannot resolve path: {}", root.display()));
                return Err(WalkError::Metadata {
                    path: root.clone(),
                    source,
                });
            }
        }
    }

    let mut matches = Vec::new();

    while let Some((path, depth)) = stack.pop() {
        let kind = match fs.entry_kind(&path) {
            Ok(kind) => kind,
            Err(source) => {
                diagnostics.fatal(&source, &format!("cannot read metadata: {}", path.display()));
                return Err(WalkError::Metadata { path, source });
            }
        };

        match kind {
            EntryKind::Directory => {
                if depth == 0 || (options.recursive && depth < options.max_depth) {
                    diagnostics.debug(&format!("descending into directory: {}", path.display()));
                    match fs.list_dir(&path) {
                        Ok(mut children) => {
                            // Reversed so the stack pops them in name order
                            children.sort();
                            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
                        }
                        Err(err) => {
                            diagnostics
                                .error(&err, &format!("error reading directory: {}", path.display()));
                        }
                    }
                } else {
                    diagnostics.debug(&format!("[SKIPPED] {} (depth {depth})", path.display()));
                }
            }
            EntryKind::File => {
                if path.file_name().is_some_and(|name| matcher.is_match(name)) {
                    diagnostics.debug(&format!("[MATCH] {}", path.display()));
                    matches.push(path);
                } else {
                    diagnostics.debug(&format!("[NON-MATCH] {}", path.display()));
                }
            }
            EntryKind::Other => {
                diagnostics.debug(&format!("[SKIPPED] {}", path.display()));
            }
        }
    }

    Ok(matches)
}

/// Glob over base names.
///
/// `{a,b}` alternatives are supported. Names starting with a dot only match
/// patterns that start with one too.
struct NameMatcher {
    glob: GlobMatcher,
    dot: bool,
}

impl NameMatcher {
    fn new(pattern: &str) -> Result<Self, WalkError> {
        let glob = Glob::new(pattern).map_err(|source| WalkError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            glob: glob.compile_matcher(),
            dot: pattern.starts_with('.'),
        })
    }

    fn is_match(&self, name: &OsStr) -> bool {
        if !self.dot && name.as_encoded_bytes().starts_with(b".") {
            return false;
        }
        self.glob.is_match(name)
    }
}

/// Run [`walk`] to completion on the current thread.
pub fn walk_blocking<F>(
    options: &WalkOptions,
    fs: &F,
    diagnostics: &mut dyn Diagnostics,
) -> Result<Vec<PathBuf>, WalkError>
where
    F: FileSystem + ?Sized,
{
    let future = std::pin::pin!(walk(options, fs, diagnostics));
    poll_once(future)
}

/// Poll a future that is known not to yield.
fn poll_once<T>(mut future: std::pin::Pin<&mut impl Future<Output = T>>) -> T {
    let mut cx = Context::from_waker(Waker::noop());
    match future.as_mut().poll(&mut cx) {
        Poll::Ready(value) => value,
        Poll::Pending => unreachable!("walk performs only synchronous filesystem calls"),
    }
}
