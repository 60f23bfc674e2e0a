//! Conversion entry points: PDF (or fragments) in, SCORM archive out.
//!
//! ## Why synchronous?
//!
//! Every stage is CPU- or disk-bound and pdfium is not async-safe, so the
//! pipeline runs on the caller's thread. Callers inside an async runtime
//! should wrap these functions in `spawn_blocking`. The one network-bound
//! collaborator, the vision fallback, drives its own private runtime.
//!
//! ## Asset directory lifetime
//!
//! Normalised image bytes are written to a conversion-scoped
//! [`tempfile::TempDir`]; it lives exactly as long as the call, so nothing is
//! left behind whether the conversion succeeds or fails.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::fragment::{renumber, Fragment};
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata};
use crate::package::write_package;
use crate::pipeline::extract::{read_metadata, Extraction, Extractor, PdfiumExtractor};
use crate::pipeline::input;
use crate::pipeline::normalize::normalize_fragments;
use crate::reconstruct::reconstruct;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a PDF file into a SCORM 2004 archive inside `output_dir`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some images were dropped
/// (check `output.diagnostics`, or call [`ConversionOutput::into_result`]).
///
/// # Errors
/// Returns `Err(ConvertError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - Corrupt or encrypted PDF, page selection out of range
/// - No fragments at all
/// - Staging or archive I/O failures
pub fn convert(
    pdf_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", pdf_path.as_ref().display());

    // ── Step 1: Validate input ───────────────────────────────────────────
    let pdf_path = input::resolve_input(pdf_path)?;

    // ── Step 2: Extract fragments ────────────────────────────────────────
    let extract_start = Instant::now();
    let extraction = PdfiumExtractor::from_config(config).extract(&pdf_path)?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} pages in {}ms",
        extraction.pages_extracted, extract_duration_ms
    );

    package_extraction(
        extraction,
        output_dir.as_ref(),
        config,
        total_start,
        extract_duration_ms,
    )
}

/// Run the pipeline on fragments produced by the caller's own extractor.
///
/// `order` is reassigned from the vector position.
pub fn convert_fragments(
    mut fragments: Vec<Fragment>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    info!("Starting conversion of {} fragments", fragments.len());

    renumber(&mut fragments);
    let pages: BTreeSet<u32> = fragments.iter().map(|f| f.page).collect();
    let extraction = Extraction {
        metadata: DocumentMetadata {
            page_count: pages.last().copied().unwrap_or(0) as usize,
            ..DocumentMetadata::default()
        },
        pages_extracted: pages.len(),
        fragments,
        ..Extraction::default()
    };

    package_extraction(extraction, output_dir.as_ref(), config, total_start, 0)
}

/// Convert PDF bytes held in memory.
///
/// Internally the library writes `bytes` to a managed [`tempfile`] and cleans
/// it up automatically on return or panic.
///
/// # Example
/// ```rust,no_run
/// use pdf2scorm::{convert_from_bytes, ConversionConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("lecture.pdf")?;
/// let output = convert_from_bytes(&bytes, "out", &ConversionConfig::default())?;
/// println!("{}", output.archive_path.display());
/// # Ok(())
/// # }
/// ```
pub fn convert_from_bytes(
    bytes: &[u8],
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| ConvertError::StagingFailed {
            path: std::env::temp_dir(),
            source: e,
        })?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| ConvertError::StagingFailed {
            path: tmp.path().to_path_buf(),
            source: e,
        })?;
    // `tmp` is dropped (and the file deleted) when `convert` returns
    convert(tmp.path(), output_dir, config)
}

/// Extract PDF metadata without converting content.
///
/// Does not read any page content or create any files.
pub fn inspect(pdf_path: impl AsRef<Path>) -> Result<DocumentMetadata, ConvertError> {
    let pdf_path = input::resolve_input(pdf_path)?;
    read_metadata(&pdf_path, None)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Normalise → reconstruct → override → package.
fn package_extraction(
    extraction: Extraction,
    output_dir: &Path,
    config: &ConversionConfig,
    total_start: Instant,
    extract_duration_ms: u64,
) -> Result<ConversionOutput, ConvertError> {
    let Extraction {
        fragments,
        metadata,
        page_errors,
        diagnostics: mut all_diagnostics,
        pages_extracted,
    } = extraction;

    // ── Step 3: Normalise image sources ──────────────────────────────────
    let assets = tempfile::Builder::new()
        .prefix("pdf2scorm-assets-")
        .tempdir()
        .map_err(|e| ConvertError::StagingFailed {
            path: std::env::temp_dir(),
            source: e,
        })?;
    let normalized = normalize_fragments(fragments, assets.path());
    all_diagnostics.extend(normalized.diagnostics);
    let mut fragments = normalized.fragments;
    renumber(&mut fragments);

    // ── Step 4: Rebuild the lecture ──────────────────────────────────────
    let reconstruction = reconstruct(&fragments)?;
    all_diagnostics.extend(reconstruction.diagnostics);
    let mut lecture = reconstruction.lecture;

    if let Some(title) = config.title.as_deref() {
        lecture.title = title.trim().to_string();
    }
    lecture.metadata.author = config
        .author
        .clone()
        .or_else(|| metadata.author.clone())
        .unwrap_or_default();
    debug!(
        "Lecture '{}' by '{}': {} pages",
        lecture.title,
        lecture.metadata.author,
        lecture.page_count()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_lecture_built(lecture.page_count());
    }

    // ── Step 5: Write the package ────────────────────────────────────────
    let package_start = Instant::now();
    let report = write_package(&lecture, assets.path(), output_dir, &config.package)?;
    let package_duration_ms = package_start.elapsed().as_millis() as u64;
    all_diagnostics.extend(report.diagnostics);

    let stats = ConversionStats {
        total_pages: metadata.page_count,
        extracted_pages: pages_extracted,
        fragments: fragments.len(),
        sections: lecture.sections.len(),
        lecture_pages: report.pages,
        images_packaged: report.images.len(),
        images_dropped: all_diagnostics.len(),
        extract_duration_ms,
        package_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages, {} images ({} dropped), {}ms total",
        stats.lecture_pages, stats.images_packaged, stats.images_dropped, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(&report.archive_path, pages_extracted);
    }

    Ok(ConversionOutput {
        archive_path: report.archive_path,
        lecture,
        metadata,
        stats,
        diagnostics: all_diagnostics,
        page_errors,
    })
}
