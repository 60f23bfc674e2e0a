//! # pdf2scorm
//!
//! Rebuild the logical structure of a PDF lecture and package it as a
//! SCORM 2004 course any LMS can import.
//!
//! ## Why this crate?
//!
//! A PDF only knows where glyphs and pictures sit on a page; an LMS wants a
//! course: a title, an ordered set of pages, and a manifest that tells it
//! when a learner is done. This crate reads the positioned text runs and
//! images out of the PDF, infers lines, paragraphs and headers from the
//! layout statistics of the document itself, cuts the lecture into pages at
//! its headers, places each figure next to the text it illustrates, and
//! writes a zip with `imsmanifest.xml`, one HTML page per lecture page, the
//! runtime shim and the images.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       validate the path and PDF magic bytes
//!  ├─ 2. Extract     text runs + images via pdfium (fallback text source
//!  │                 for pages without a text layer)
//!  ├─ 3. Normalise   every image source → images/<name>
//!  ├─ 4. Rebuild     lines → paragraphs → headers → pages → image anchors
//!  └─ 5. Package     pages + manifest + shim + images → <title>_SCORM_2004.zip
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2scorm::{convert, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .completion_threshold(90.0)
//!         .build()?;
//!     let output = convert("lecture.pdf", "out", &config)?;
//!     println!("{}", output.archive_path.display());
//!     for skipped in &output.diagnostics {
//!         eprintln!("skipped: {skipped}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Callers with their own extractor skip pdfium entirely and hand over
//! [`Fragment`]s through [`convert_fragments`], or use [`build_lecture`] and
//! [`write_package`] separately.
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf2scorm` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `vision` | off     | [`vision::VisionTextSource`]: reads scanned pages with a vision LLM |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2scorm = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod fragment;
pub mod lecture;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "vision")]
pub mod prompts;
pub mod reconstruct;
#[cfg(feature = "vision")]
pub mod vision;

/// Directory of the package (and of the asset directory) holding images.
pub const IMAGES_DIR: &str = "images";
/// Prefix of every canonical image reference.
pub const IMAGES_DIR_PREFIX: &str = "images/";

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, PackageOptions, PageSelection, ProgressMethod,
    Theme,
};
pub use convert::{convert, convert_fragments, convert_from_bytes, inspect};
pub use error::{AssetError, ConvertError, PageError};
pub use fragment::{BBox, Fragment, ImageSource};
pub use lecture::{ContentBlock, Lecture, Page, Section};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata};
pub use package::{write_package, PackageReport};
pub use pipeline::extract::{Extraction, Extractor, FallbackTextSource, PdfiumExtractor};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use reconstruct::{build_lecture, reconstruct, Reconstruction};
