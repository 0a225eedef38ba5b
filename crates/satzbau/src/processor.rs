//! Batch processing of HTML files found on disk.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use arborium::GrammarStore;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::diagnostics::Diagnostics;
use crate::dom::{Document, DomError};
use crate::engine::{ArboriumEngine, HighlightEngine};
use crate::highlighter::{HighlightOptions, highlight_document};
use crate::walker::{OsFileSystem, WalkError, WalkOptions, walk_blocking};

/// How highlighted documents get their stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StylesheetMode {
    /// Add a `<link rel="stylesheet">` pointing at this href.
    Link(String),
    /// Embed this CSS in a `<style>` element.
    Embed(String),
}

/// Options for the processor.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Which files to process.
    pub walk: WalkOptions,
    /// How to highlight each of them.
    pub highlight: HighlightOptions,
    /// Stylesheet added to documents that had something highlighted.
    pub stylesheet: Option<StylesheetMode>,
    /// Output directory (if None, modifies in place).
    pub output_dir: Option<PathBuf>,
    /// Whether to draw a progress bar.
    pub show_progress: bool,
}

/// Statistics from processing.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    /// Number of files the walk matched.
    pub files_found: usize,
    /// Number of files read and highlighted without error.
    pub files_processed: usize,
    /// Number of files written out.
    pub files_written: usize,
    /// Number of files in which nothing was highlighted.
    pub files_unchanged: usize,
    /// Number of files that could not be read, parsed or written.
    pub files_failed: usize,
    /// Number of code blocks highlighted.
    pub blocks_highlighted: usize,
    /// Number of code blocks the engine failed on.
    pub block_failures: usize,
    /// Every language something was highlighted as.
    pub languages: BTreeSet<String>,
    /// Total bytes read from input HTML files.
    pub bytes_input: u64,
    /// Total bytes of highlighted HTML produced.
    pub bytes_output: u64,
    /// Time spent processing HTML files (excludes the walk).
    pub process_duration: Duration,
}

impl ProcessorStats {
    /// Calculate HTML inflation percentage ((output - input) / input * 100).
    pub fn html_inflation_percent(&self) -> f64 {
        if self.bytes_input == 0 {
            0.0
        } else {
            (self.bytes_output as f64 - self.bytes_input as f64) / self.bytes_input as f64 * 100.0
        }
    }

    /// Calculate processing throughput in MB/s.
    pub fn throughput_mb_s(&self) -> f64 {
        let secs = self.process_duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            (self.bytes_input as f64 / (1024.0 * 1024.0)) / secs
        }
    }
}

/// Errors that can occur during processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("cannot read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot rewrite {}", path.display())]
    Html {
        path: PathBuf,
        #[source]
        source: DomError,
    },

    #[error("cannot write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What happened to one file.
#[derive(Debug, Default)]
struct FileOutcome {
    count: usize,
    failures: usize,
    languages: BTreeSet<String>,
    input_size: usize,
    output_size: usize,
    written: bool,
}

type EngineFactory<E> = Box<dyn Fn() -> E + Send + Sync>;

/// Highlights every file a walk finds.
pub struct Processor<E> {
    options: ProcessOptions,
    make_engine: EngineFactory<E>,
}

impl Processor<ArboriumEngine> {
    /// Create a processor driven by arborium, one engine per worker thread
    /// over a shared grammar store.
    pub fn new(options: ProcessOptions) -> Self {
        let store = Arc::new(GrammarStore::new());
        Self::with_engine(options, move || ArboriumEngine::with_store(store.clone()))
    }
}

impl<E: HighlightEngine> Processor<E> {
    /// Create a processor whose workers each get an engine from
    /// `make_engine`.
    pub fn with_engine(
        options: ProcessOptions,
        make_engine: impl Fn() -> E + Send + Sync + 'static,
    ) -> Self {
        Self {
            options,
            make_engine: Box::new(make_engine),
        }
    }

    /// Walk the configured roots and highlight every matching file.
    ///
    /// Only a fatal walk error fails the whole run. Files that cannot be
    /// read, parsed or written are logged, counted and skipped.
    pub fn process(
        &self,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<ProcessorStats, ProcessError> {
        let files = walk_blocking(&self.options.walk, &OsFileSystem, diagnostics)?;
        let roots: Vec<PathBuf> = self
            .options
            .walk
            .roots
            .iter()
            .filter_map(|root| std::path::absolute(root).ok())
            .collect();

        let progress = if self.options.show_progress {
            let progress = ProgressBar::new(files.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            ) {
                progress.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
            }
            progress
        } else {
            ProgressBar::hidden()
        };

        let process_start = Instant::now();

        // Atomic counters for parallel aggregation
        let files_processed = AtomicUsize::new(0);
        let files_written = AtomicUsize::new(0);
        let files_unchanged = AtomicUsize::new(0);
        let files_failed = AtomicUsize::new(0);
        let blocks_highlighted = AtomicUsize::new(0);
        let block_failures = AtomicUsize::new(0);
        let bytes_input = AtomicUsize::new(0);
        let bytes_output = AtomicUsize::new(0);
        let languages = Mutex::new(BTreeSet::<String>::new());

        // One engine per worker thread, not per file
        files.par_iter().for_each_init(
            || (self.make_engine)(),
            |engine, path| {
                tracing::debug!(path = %path.display(), "processing");

                match self.process_file(path, &roots, engine) {
                    Ok(outcome) => {
                        files_processed.fetch_add(1, Ordering::Relaxed);
                        if outcome.count == 0 {
                            files_unchanged.fetch_add(1, Ordering::Relaxed);
                        }
                        if outcome.written {
                            files_written.fetch_add(1, Ordering::Relaxed);
                        }
                        blocks_highlighted.fetch_add(outcome.count, Ordering::Relaxed);
                        block_failures.fetch_add(outcome.failures, Ordering::Relaxed);
                        bytes_input.fetch_add(outcome.input_size, Ordering::Relaxed);
                        bytes_output.fetch_add(outcome.output_size, Ordering::Relaxed);

                        if !outcome.languages.is_empty() {
                            languages
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .extend(outcome.languages);
                        }
                    }
                    Err(e) => {
                        files_failed.fetch_add(1, Ordering::Relaxed);
                        progress.suspend(|| {
                            tracing::error!(error = %e, "failed to process file");
                        });
                    }
                }
                progress.inc(1);
            },
        );

        let process_duration = process_start.elapsed();
        progress.finish_and_clear();

        Ok(ProcessorStats {
            files_found: files.len(),
            files_processed: files_processed.load(Ordering::Relaxed),
            files_written: files_written.load(Ordering::Relaxed),
            files_unchanged: files_unchanged.load(Ordering::Relaxed),
            files_failed: files_failed.load(Ordering::Relaxed),
            blocks_highlighted: blocks_highlighted.load(Ordering::Relaxed),
            block_failures: block_failures.load(Ordering::Relaxed),
            languages: languages.into_inner().unwrap_or_else(PoisonError::into_inner),
            bytes_input: bytes_input.load(Ordering::Relaxed) as u64,
            bytes_output: bytes_output.load(Ordering::Relaxed) as u64,
            process_duration,
        })
    }

    /// Highlight one file and write the result where it belongs.
    fn process_file(
        &self,
        path: &Path,
        roots: &[PathBuf],
        engine: &mut E,
    ) -> Result<FileOutcome, ProcessError> {
        let html = fs::read_to_string(path).map_err(|source| ProcessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let html_error = |source| ProcessError::Html {
            path: path.to_path_buf(),
            source,
        };

        let mut document = Document::parse(&html).map_err(html_error)?;
        let summary = highlight_document(&mut document, &self.options.highlight, engine);

        let mut outcome = FileOutcome {
            count: summary.count,
            failures: summary.failures.len(),
            languages: summary.languages,
            input_size: html.len(),
            ..FileOutcome::default()
        };

        let target = self.output_path(path, roots);

        if outcome.count > 0 {
            match &self.options.stylesheet {
                Some(StylesheetMode::Link(href)) => document.add_stylesheet_link(href),
                Some(StylesheetMode::Embed(css)) => document.embed_stylesheet(css),
                None => {}
            }
            let output = document.to_html().map_err(html_error)?;
            outcome.output_size = output.len();
            write_file(target.as_deref().unwrap_or(path), &output)?;
            outcome.written = true;
        } else {
            outcome.output_size = html.len();
            // Nothing to highlight: leave the file alone unless it has to be
            // mirrored into the output directory.
            if let Some(target) = target {
                write_file(&target, &html)?;
                outcome.written = true;
            }
        }

        Ok(outcome)
    }

    /// Where `path` goes under the output directory, if there is one.
    ///
    /// Files keep their position relative to the root they were found
    /// under. A root that is itself a file lands at the top level.
    fn output_path(&self, path: &Path, roots: &[PathBuf]) -> Option<PathBuf> {
        let output_dir = self.options.output_dir.as_ref()?;
        let relative = roots
            .iter()
            .filter_map(|root| path.strip_prefix(root).ok())
            .find(|relative| !relative.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| path.file_name().map(PathBuf::from))?;
        Some(output_dir.join(relative))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ProcessError> {
    let write_error = |source| ProcessError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, contents).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Level, RecordingDiagnostics};
    use crate::engine::EngineError;

    /// Wraps the source in a single span, or fails on "ruby".
    struct EchoEngine;

    impl HighlightEngine for EchoEngine {
        fn class_prefix(&self) -> &str {
            "echo"
        }

        fn highlight(&mut self, language: &str, source: &str) -> Result<String, EngineError> {
            if language == "ruby" {
                return Err(EngineError::Failed {
                    language: language.to_string(),
                    message: "no grammar".to_string(),
                });
            }
            Ok(format!("<span class=\"echo-keyword\">{source}</span>"))
        }
    }

    const PAGE: &str = r#"<html><head><title>t</title></head><body><pre><code satzbau-language="go">func</code></pre></body></html>"#;
    const PLAIN: &str = "<html><head></head><body><p>no code</p></body></html>";

    fn processor(options: ProcessOptions) -> Processor<EchoEngine> {
        Processor::with_engine(options, || EchoEngine)
    }

    fn options_for(root: &Path) -> ProcessOptions {
        ProcessOptions {
            walk: WalkOptions {
                roots: vec![root.to_path_buf()],
                ..WalkOptions::default()
            },
            ..ProcessOptions::default()
        }
    }

    #[test]
    fn test_processes_in_place() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), PAGE).unwrap();
        fs::write(dir.path().join("plain.html"), PLAIN).unwrap();
        fs::write(dir.path().join("notes.txt"), PAGE).unwrap();

        let mut diagnostics = RecordingDiagnostics::new();
        let stats = processor(options_for(dir.path()))
            .process(&mut diagnostics)
            .unwrap();

        assert_eq!(stats.files_found, 2);
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.files_written, 1);
        assert_eq!(stats.files_unchanged, 1);
        assert_eq!(stats.blocks_highlighted, 1);
        assert_eq!(stats.languages, BTreeSet::from(["go".to_string()]));

        let page = fs::read_to_string(dir.path().join("page.html")).unwrap();
        assert!(page.contains(r#"<span class="satzbau-keyword">func</span>"#));
        assert_eq!(fs::read_to_string(dir.path().join("plain.html")).unwrap(), PLAIN);
        assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), PAGE);
    }

    #[test]
    fn test_stylesheet_only_on_highlighted_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), PAGE).unwrap();
        fs::write(dir.path().join("plain.html"), PLAIN).unwrap();

        let options = ProcessOptions {
            stylesheet: Some(StylesheetMode::Embed(".satzbau{color:red}".to_string())),
            ..options_for(dir.path())
        };
        processor(options)
            .process(&mut RecordingDiagnostics::new())
            .unwrap();

        let page = fs::read_to_string(dir.path().join("page.html")).unwrap();
        assert!(page.contains("<style>.satzbau{color:red}</style></head>"));
        assert_eq!(fs::read_to_string(dir.path().join("plain.html")).unwrap(), PLAIN);
    }

    #[test]
    fn test_mirrors_into_output_dir() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::create_dir(input.path().join("guide")).unwrap();
        fs::write(input.path().join("guide/page.html"), PAGE).unwrap();
        fs::write(input.path().join("plain.html"), PLAIN).unwrap();

        let options = ProcessOptions {
            walk: WalkOptions {
                roots: vec![input.path().to_path_buf()],
                recursive: true,
                ..WalkOptions::default()
            },
            output_dir: Some(output.path().to_path_buf()),
            ..ProcessOptions::default()
        };
        let stats = processor(options)
            .process(&mut RecordingDiagnostics::new())
            .unwrap();

        assert_eq!(stats.files_written, 2);
        let page = fs::read_to_string(output.path().join("guide/page.html")).unwrap();
        assert!(page.contains("satzbau-keyword"));
        assert_eq!(fs::read_to_string(output.path().join("plain.html")).unwrap(), PLAIN);
        // Input untouched
        assert_eq!(fs::read_to_string(input.path().join("guide/page.html")).unwrap(), PAGE);
    }

    #[test]
    fn test_file_root_lands_at_top_of_output_dir() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let file = input.path().join("page.html");
        fs::write(&file, PAGE).unwrap();

        let options = ProcessOptions {
            output_dir: Some(output.path().join("out")),
            ..options_for(&file)
        };
        processor(options)
            .process(&mut RecordingDiagnostics::new())
            .unwrap();

        assert!(output.path().join("out/page.html").is_file());
    }

    #[test]
    fn test_block_failures_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("page.html"),
            r#"<head></head><pre><code satzbau-language="ruby">puts 1</code></pre><pre><code satzbau-language="go">x</code></pre>"#,
        )
        .unwrap();

        let stats = processor(options_for(dir.path()))
            .process(&mut RecordingDiagnostics::new())
            .unwrap();

        assert_eq!(stats.blocks_highlighted, 1);
        assert_eq!(stats.block_failures, 1);
        assert_eq!(stats.files_written, 1);
    }

    #[test]
    fn test_unreadable_file_is_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), PAGE).unwrap();
        fs::write(dir.path().join("binary.html"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let stats = processor(options_for(dir.path()))
            .process(&mut RecordingDiagnostics::new())
            .unwrap();

        assert_eq!(stats.files_found, 2);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_processed, 1);
    }

    #[test]
    fn test_missing_root_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut diagnostics = RecordingDiagnostics::new();
        let err = processor(options_for(&dir.path().join("missing")))
            .process(&mut diagnostics)
            .unwrap_err();

        assert!(matches!(err, ProcessError::Walk(_)));
        assert_eq!(diagnostics.messages(Level::Fatal).len(), 1);
    }

    #[test]
    fn test_inflation() {
        let stats = ProcessorStats {
            bytes_input: 100,
            bytes_output: 150,
            ..ProcessorStats::default()
        };
        assert_eq!(stats.html_inflation_percent(), 50.0);
        assert_eq!(ProcessorStats::default().throughput_mb_s(), 0.0);
    }
}
