//! satzbau CLI - Highlight tagged code blocks in HTML files.

use anyhow::{Context, Result, bail};
use facet::Facet;
use facet_args as args;
use owo_colors::OwoColorize;
use satzbau::languages::LANGUAGES;
use satzbau::styles::{self, StyleOptions};
use satzbau::walker::WalkOptions;
use satzbau::{
    HighlightOptions, ProcessError, ProcessOptions, Processor, StylesheetMode, TracingDiagnostics,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Highlight code blocks tagged with `satzbau-language` in HTML files.
///
/// Files are rewritten in place unless an output directory is given.
#[derive(Debug, Facet)]
struct Args {
    /// Files and directories to process
    #[facet(args::positional, default)]
    paths: Vec<PathBuf>,

    /// Descend into subdirectories
    #[facet(args::named, args::short = 'r', default)]
    recursive: bool,

    /// Deepest directory level to descend into with --recursive (default: 5)
    #[facet(args::named, default)]
    max_depth: Option<usize>,

    /// Glob matched against file names (default: *.html)
    #[facet(args::named, default)]
    glob: Option<String>,

    /// Highlight every block as this language, ignoring its own tag
    #[facet(args::named, args::short = 'l', default)]
    lang: Option<String>,

    /// Language used when the requested one is not supported
    #[facet(args::named, default)]
    fallback: Option<String>,

    /// Strip the satzbau-language attribute from processed blocks
    #[facet(args::named, default)]
    remove_attrs: bool,

    /// Stylesheet to embed in highlighted pages, by name (e.g. github)
    #[facet(args::named, default)]
    style: Option<String>,

    /// Directory holding the stylesheets (default: ./styles)
    #[facet(args::named, default)]
    styles_dir: Option<PathBuf>,

    /// Minify the embedded stylesheet
    #[facet(args::named, default)]
    minify: bool,

    /// Link this stylesheet URL from highlighted pages instead of embedding
    #[facet(args::named, default)]
    stylesheet_href: Option<String>,

    /// Output directory (defaults to modifying files in place)
    #[facet(args::named, args::short = 'o', default)]
    output: Option<PathBuf>,

    /// One of debug, info, warn, error, fatal, silent (default: warn, or RUST_LOG)
    #[facet(args::named, default)]
    log_level: Option<String>,

    /// Print the supported language identifiers and exit
    #[facet(args::named, default)]
    list_languages: bool,

    /// Show a progress bar
    #[facet(args::named, default)]
    progress: bool,
}

fn main() {
    let args: Args = facet_args::from_std_args().unwrap_or_else(|e| {
        if let Some(text) = e.help_text() {
            eprintln!("{text}");
        } else {
            eprintln!("{:?}", e);
        }
        std::process::exit(1);
    });

    let filter = match log_filter(args.log_level.as_deref()) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            std::process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        // Walk failures were already reported by the diagnostics sink
        let reported = matches!(e.downcast_ref::<ProcessError>(), Some(ProcessError::Walk(_)));
        if !reported {
            eprintln!("{} {e:#}", "error:".red().bold());
        }
        std::process::exit(1);
    }
}

fn log_filter(level: Option<&str>) -> Result<EnvFilter> {
    Ok(match level {
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        Some("silent") => EnvFilter::new("off"),
        Some(level @ ("debug" | "info" | "warn" | "error")) => EnvFilter::new(level),
        // Fatal diagnostics are logged at error level
        Some("fatal") => EnvFilter::new("error"),
        Some(other) => {
            bail!("unknown log level `{other}` (expected debug, info, warn, error, fatal or silent)")
        }
    })
}

fn run(args: Args) -> Result<()> {
    if args.list_languages {
        for language in LANGUAGES {
            println!("{language}");
        }
        return Ok(());
    }

    if args.paths.is_empty() {
        bail!("no input files or directories given");
    }

    let stylesheet = match (&args.stylesheet_href, &args.style) {
        (Some(_), Some(_)) => bail!("--style and --stylesheet-href cannot be used together"),
        (Some(href), None) => Some(StylesheetMode::Link(href.clone())),
        (None, Some(name)) => {
            let options = StyleOptions {
                path: args.styles_dir.clone(),
                minify: args.minify,
            };
            let css = styles::load(name, &options)
                .with_context(|| format!("cannot load stylesheet `{name}`"))?;
            Some(StylesheetMode::Embed(css))
        }
        (None, None) => None,
    };

    let defaults = WalkOptions::default();
    let options = ProcessOptions {
        walk: WalkOptions {
            roots: args.paths.clone(),
            recursive: args.recursive,
            max_depth: args.max_depth.unwrap_or(defaults.max_depth),
            pattern: args.glob.clone().unwrap_or(defaults.pattern),
        },
        highlight: HighlightOptions {
            language: args.lang.clone(),
            fallback_language: args.fallback.clone(),
            remove_attrs: args.remove_attrs,
        },
        stylesheet,
        output_dir: args.output.clone(),
        show_progress: args.progress,
    };

    let processor = Processor::new(options);

    // Print header
    eprintln!(
        "{} Highlighting {} path(s)",
        "satzbau".green().bold(),
        args.paths.len()
    );
    if let Some(out) = &args.output {
        eprintln!("  Output: {}", out.display());
    } else {
        eprintln!("  {} Modifying in place", "Note:".yellow());
    }
    eprintln!();

    let start = Instant::now();
    let stats = processor.process(&mut TracingDiagnostics)?;
    let elapsed = start.elapsed();

    // Print results
    eprintln!("{}", "Results:".bold());
    eprintln!(
        "  {} of {} HTML files processed",
        stats.files_processed.to_string().cyan(),
        stats.files_found
    );
    eprintln!(
        "  {} code blocks highlighted",
        stats.blocks_highlighted.to_string().green()
    );
    if stats.files_unchanged > 0 {
        eprintln!(
            "  {} files with nothing to highlight",
            stats.files_unchanged.to_string().yellow()
        );
    }
    if stats.block_failures > 0 {
        eprintln!(
            "  {} code blocks failed to highlight",
            stats.block_failures.to_string().red()
        );
    }
    if stats.files_failed > 0 {
        eprintln!(
            "  {} files could not be processed",
            stats.files_failed.to_string().red()
        );
    }
    if !stats.languages.is_empty() {
        let languages: Vec<&str> = stats.languages.iter().map(String::as_str).collect();
        eprintln!("  Languages: {}", languages.join(", "));
    }
    if stats.bytes_input > 0 {
        eprintln!(
            "  HTML size {:+.1}% ({:.1} MB/s)",
            stats.html_inflation_percent(),
            stats.throughput_mb_s()
        );
    }

    eprintln!("\n  Completed in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        assert_eq!(log_filter(Some("debug")).unwrap().to_string(), "debug");
        assert_eq!(log_filter(Some("fatal")).unwrap().to_string(), "error");
        assert_eq!(log_filter(Some("silent")).unwrap().to_string(), "off");
        assert!(log_filter(Some("verbose")).is_err());
    }
}
