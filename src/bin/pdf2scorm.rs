//! CLI binary for pdf2scorm.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2scorm::pipeline::{extract::read_metadata, input::resolve_input};
use pdf2scorm::{
    convert, ConversionConfig, ConversionProgressCallback, PageSelection, ProgressCallback,
    ProgressMethod, Theme,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar over the selected pages plus one
/// log line per extracted page.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// The bar starts as a spinner; `on_conversion_start` gives it a length.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_pages} pages…"))
        ));
    }

    fn on_page_extracted(&self, page_num: usize, total_pages: usize, fragments: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{fragments:>5} fragments")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
        ));
    }

    fn on_lecture_built(&self, pages: usize) {
        self.bar.set_prefix("Packaging");
        self.bar.set_message(format!("{pages} lecture pages"));
    }

    fn on_conversion_complete(&self, archive: &Path, total_pages: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {} pages read{}  →  {}",
            if errors == 0 { green("✔") } else { cyan("⚠") },
            bold(&total_pages.to_string()),
            if errors == 0 {
                String::new()
            } else {
                format!("  ({} without text)", red(&errors.to_string()))
            },
            bold(&archive.display().to_string()),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (archive written to the current directory)
  pdf2scorm lecture.pdf

  # Into a directory, with a fixed course title
  pdf2scorm lecture.pdf -o courses/ --title "Operating Systems, Lecture 3"

  # Only some pages, stricter completion rule, dark pages
  pdf2scorm --pages 1-12 --threshold 100 --theme dark lecture.pdf

  # Scanned lecture: read pages without a text layer with a vision LLM
  # (requires the `vision` feature)
  pdf2scorm --ocr-fallback --provider openai --model gpt-4.1-nano scan.pdf

  # Inspect PDF metadata
  pdf2scorm --inspect-only lecture.pdf

  # JSON report including the rebuilt lecture
  pdf2scorm --json lecture.pdf > report.json

PACKAGE LAYOUT:
  <title>_SCORM_2004.zip
    imsmanifest.xml         SCORM 2004 4th Edition manifest
    SCORM_API_wrapper.js    LMS runtime shim
    page_1.html … page_N.html
    images/…

ENVIRONMENT VARIABLES:
  PDF2SCORM_*             Every flag, e.g. PDF2SCORM_THRESHOLD=90
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  OPENAI_API_KEY          OpenAI API key (vision fallback)
  ANTHROPIC_API_KEY       Anthropic API key (vision fallback)
  GEMINI_API_KEY          Google Gemini API key (vision fallback)
  EDGEQUAKE_LLM_PROVIDER  Override provider for the vision fallback
  EDGEQUAKE_MODEL         Override model for the vision fallback
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Convert PDF lectures into SCORM 2004 packages.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2scorm",
    version,
    about = "Convert PDF lectures into SCORM 2004 packages",
    long_about = "Rebuild the structure of a PDF lecture (title, pages, paragraphs, figures) \
from its layout and write a SCORM 2004 4th Edition package that any LMS can import.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    input: PathBuf,

    /// Directory the archive is written to.
    #[arg(short, long, env = "PDF2SCORM_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Course title. Default: the first level-1 header.
    #[arg(long, env = "PDF2SCORM_TITLE")]
    title: Option<String>,

    /// Course author. Default: the PDF's author field.
    #[arg(long, env = "PDF2SCORM_AUTHOR")]
    author: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2SCORM_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2SCORM_PASSWORD")]
    password: Option<String>,

    /// Percent of pages a learner must visit to complete the course (0–100).
    #[arg(long, env = "PDF2SCORM_THRESHOLD", default_value_t = 80.0)]
    threshold: f64,

    /// Accent colour of the pages (any CSS colour).
    #[arg(long, env = "PDF2SCORM_ACCENT", default_value = "#0ea5e9")]
    accent: String,

    /// Colour scheme of the pages.
    #[arg(long, env = "PDF2SCORM_THEME", value_enum, default_value = "auto")]
    theme: ThemeArg,

    /// How progress towards the threshold is measured.
    #[arg(long, env = "PDF2SCORM_PROGRESS_METHOD", value_enum, default_value = "screens")]
    progress_method: ProgressMethodArg,

    /// Always reopen the course at its first page.
    #[arg(long, env = "PDF2SCORM_NO_REMEMBER_LAST_PAGE")]
    no_remember_last_page: bool,

    /// Read pages without a text layer with a vision LLM (feature `vision`).
    #[arg(long, env = "PDF2SCORM_OCR_FALLBACK")]
    ocr_fallback: bool,

    /// Vision model for --ocr-fallback (e.g. gpt-4.1-nano).
    #[arg(long, env = "PDF2SCORM_MODEL")]
    model: Option<String>,

    /// Vision provider for --ocr-fallback: openai, anthropic, gemini, ollama.
    #[arg(long, env = "PDF2SCORM_PROVIDER")]
    provider: Option<String>,

    /// Print the conversion report (lecture included) as JSON.
    #[arg(long, env = "PDF2SCORM_JSON")]
    json: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2SCORM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2SCORM_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2SCORM_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ThemeArg {
    Auto,
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(v: ThemeArg) -> Self {
        match v {
            ThemeArg::Auto => Theme::Auto,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ProgressMethodArg {
    Screens,
    Combined,
}

impl From<ProgressMethodArg> for ProgressMethod {
    fn from(v: ProgressMethodArg) -> Self {
        match v {
            ProgressMethodArg::Screens => ProgressMethod::Screens,
            ProgressMethodArg::Combined => ProgressMethod::Combined,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides all the feedback that matters; keep library
    // logs to errors while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let path = resolve_input(&cli.input).context("Failed to open PDF")?;
        let meta =
            read_metadata(&path, cli.password.as_deref()).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
            if let Some(ref d) = meta.creation_date {
                println!("Created:      {}", d);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &cli.output, &config).context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet && !cli.json {
        for skipped in &output.diagnostics {
            eprintln!("  {} {}", cyan("⚠"), skipped);
        }
        if !show_progress {
            eprintln!(
                "Packaged {} pages, {} images in {}ms  →  {}",
                output.stats.lecture_pages,
                output.stats.images_packaged,
                output.stats.total_duration_ms,
                output.archive_path.display()
            );
        } else {
            eprintln!(
                "   {} lecture pages  /  {} images  /  {}ms total",
                dim(&output.stats.lecture_pages.to_string()),
                dim(&output.stats.images_packaged.to_string()),
                output.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ConversionConfig::builder()
        .completion_threshold(cli.threshold)
        .accent_color(&cli.accent)
        .theme(cli.theme.clone().into())
        .progress_method(cli.progress_method.clone().into())
        .remember_last_page(!cli.no_remember_last_page)
        .pages(pages);

    if let Some(ref title) = cli.title {
        builder = builder.title(title);
    }
    if let Some(ref author) = cli.author {
        builder = builder.author(author);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    if cli.ocr_fallback {
        builder = builder.fallback(vision_fallback(cli)?);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(feature = "vision")]
fn vision_fallback(cli: &Cli) -> Result<Arc<dyn pdf2scorm::FallbackTextSource>> {
    use pdf2scorm::vision::{VisionConfig, VisionTextSource};

    let source = VisionTextSource::new(VisionConfig {
        model: cli.model.clone(),
        provider_name: cli.provider.clone(),
        ..VisionConfig::default()
    })
    .context("Failed to set up the vision fallback")?;
    Ok(Arc::new(source))
}

#[cfg(not(feature = "vision"))]
fn vision_fallback(_cli: &Cli) -> Result<Arc<dyn pdf2scorm::FallbackTextSource>> {
    anyhow::bail!("--ocr-fallback needs pdf2scorm built with the `vision` feature")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_specs() {
        assert!(matches!(parse_pages("all").unwrap(), PageSelection::All));
        assert!(matches!(parse_pages(" 7 ").unwrap(), PageSelection::Single(7)));
        assert!(matches!(parse_pages("3-5").unwrap(), PageSelection::Range(3, 5)));
        match parse_pages("1,4,2").unwrap() {
            PageSelection::Set(p) => assert_eq!(p, vec![1, 4, 2]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-2").is_err());
        assert!(parse_pages("x").is_err());
    }

    #[test]
    fn cli_flags_map_to_config() {
        let cli = Cli::parse_from([
            "pdf2scorm",
            "lecture.pdf",
            "--threshold",
            "150",
            "--theme",
            "dark",
            "--no-remember-last-page",
            "--title",
            "OS",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.package.completion_threshold, 100.0);
        assert_eq!(config.package.theme, Theme::Dark);
        assert!(!config.package.remember_last_page);
        assert_eq!(config.title.as_deref(), Some("OS"));
    }
}
