//! Error types for the pdf2scorm library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ConvertError`]: **Fatal**: the conversion cannot proceed at all
//!   (bad input file, empty fragment stream, archive write failure). Returned
//!   as `Err(ConvertError)` from the top-level `convert*` functions. No archive
//!   is produced.
//!
//! * [`AssetError`]: **Non-fatal**: one image could not be resolved, copied
//!   or placed. The image is skipped and the diagnostic is collected in
//!   [`crate::output::ConversionOutput::diagnostics`].
//!
//! * [`PageError`]: **Non-fatal**: the fallback text source failed on one
//!   image-only page. The page simply contributes no text.
//!
//! Keeping the recoverable errors as plain data (`Clone + Serialize`) lets
//! callers print them, ship them over JSON, or turn them into a hard failure
//! with [`crate::output::ConversionOutput::into_result`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2scorm library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The extractor produced no fragments at all.
    #[error("Nothing to convert: the document produced no text or image fragments")]
    EmptyInput,

    /// A fragment violated its construction invariants.
    #[error("Invalid fragment: {0}")]
    InvalidFragment(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection does not match any page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error while reading a page.
    #[error("Extraction failed for page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    // ── Fallback errors ───────────────────────────────────────────────────
    /// The vision fallback provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Package errors ────────────────────────────────────────────────────
    /// Could not create or populate the staging directory.
    #[error("Failed to prepare staging directory '{path}': {source}")]
    StagingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write a package member (page, manifest, shim) or the archive.
    #[error("Failed to write package file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The zip writer rejected an entry.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Some images were skipped and the caller asked for a strict result.
    #[error("{skipped} image(s) could not be packaged")]
    AssetsSkipped { skipped: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Place libpdfium next to the executable or in the working directory.\n\
  • Install pdfium system-wide.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// The offending image is dropped; the rest of the document is unaffected.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum AssetError {
    /// Browser-only `blob:` reference, never resolvable outside the browser.
    #[error("Unresolvable blob reference '{reference}'")]
    BlobReference { reference: String },

    /// A `data:` URI that is not `data:image/<fmt>;base64,<payload>`.
    #[error("Unrecognised inline image data (starts with '{prefix}')")]
    MalformedDataUri { prefix: String },

    /// Inline or extracted image bytes could not be decoded or encoded.
    #[error("Image decode failed: {detail}")]
    Decode { detail: String },

    /// The referenced image file does not exist.
    #[error("Image file not found: '{path}'")]
    NotFound { path: String },

    /// Reading or copying the image failed.
    #[error("Failed to copy image '{path}': {detail}")]
    Copy { path: String, detail: String },

    /// A large image with no nearby text was left out of the package.
    #[error("Page {page}: image '{path}' covers {percent:.0}% of the page with no text nearby; dropped")]
    OversizedOrphan {
        page: u32,
        path: String,
        percent: f64,
    },
}

/// A non-fatal error for a single PDF page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation for the fallback text source failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The fallback text source failed after retries.
    #[error("Page {page}: fallback text source failed after {retries} retries: {detail}")]
    FallbackFailed {
        page: usize,
        retries: u8,
        detail: String,
    },
}
