//! Fragment extraction: PDF pages → positioned text runs and images.
//!
//! The reconstruction engine only ever sees [`Fragment`]s, so anything that
//! can produce them plugs in through the [`Extractor`] trait. The crate ships
//! one implementation, [`PdfiumExtractor`], built on `pdfium-render`.
//!
//! ## Coordinates
//!
//! pdfium reports bounds in PDF user space (origin bottom-left, `y` up).
//! Fragments use top-down page coordinates, so every rectangle is flipped
//! against the page height: `y0 = height − top`, `y1 = height − bottom`.
//!
//! ## Pages without a text layer
//!
//! Scanned pages yield images but no text. When a [`FallbackTextSource`] is
//! configured, such a page is rasterised (longest edge capped at
//! `max_rendered_pixels`) and the returned transcript is laid out as a column
//! of synthetic 12 pt lines. A failing fallback costs that page its text,
//! never the conversion.

use crate::config::{ConversionConfig, PageSelection};
use crate::error::{AssetError, ConvertError, PageError};
use crate::fragment::{renumber, BBox, Fragment, ImageSource, DEFAULT_FONT_SIZE};
use crate::output::DocumentMetadata;
use crate::pipeline::encode::encode_png;
use crate::progress::ProgressCallback;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Images smaller than this (in either dimension) are treated as decoration.
const MIN_IMAGE_EXTENT: f64 = 10.0;

/// Fallback transcript lines shorter than this are noise.
const MIN_FALLBACK_LINE_CHARS: usize = 3;
/// A fallback transcript must carry more characters than this to be used.
const MIN_FALLBACK_TOTAL_CHARS: usize = 10;

// ── Collaborator traits ──────────────────────────────────────────────────

/// Reads the text of a rasterised page that has no text layer.
pub trait FallbackTextSource: Send + Sync {
    /// Short name for logs, e.g. `"vision:gpt-4.1-nano"`.
    fn name(&self) -> &str;

    /// Plain text of the page, lines separated by `\n`.
    fn page_text(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError>;
}

/// Produces the fragment stream of a PDF file.
pub trait Extractor {
    fn extract(&self, path: &Path) -> Result<Extraction, ConvertError>;
}

/// Everything an [`Extractor`] read from a document.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Fragments in reading order; `order` is the position in this vector.
    pub fragments: Vec<Fragment>,
    pub metadata: DocumentMetadata,
    /// Pages whose fallback text could not be obtained.
    pub page_errors: Vec<PageError>,
    /// Embedded images that could not be re-encoded.
    pub diagnostics: Vec<AssetError>,
    /// Number of pages actually read.
    pub pages_extracted: usize,
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Bind to a pdfium library.
///
/// `PDFIUM_LIB_PATH` (a library file or the directory holding it) wins;
/// otherwise the working directory is tried before the system library.
pub fn bind_pdfium() -> Result<Pdfium, ConvertError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH").filter(|p| !p.is_empty()) {
        Some(raw) => {
            let path = PathBuf::from(raw);
            let library = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from PDFIUM_LIB_PATH: {}", library.display());
            Pdfium::bind_to_library(&library)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ConvertError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, ConvertError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let detail = format!("{e:?}");
        if detail.contains("Password") || detail.contains("password") {
            if password.is_some() {
                ConvertError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                ConvertError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            ConvertError::CorruptPdf {
                path: path.to_path_buf(),
                detail,
            }
        }
    })
}

/// Document information dictionary plus page count and PDF version.
pub fn read_metadata(path: &Path, password: Option<&str>) -> Result<DocumentMetadata, ConvertError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, path, password)?;
    Ok(document_metadata(&document))
}

fn document_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

/// Resolve a page selection against the document, 0-based.
pub fn select_pages(selection: &PageSelection, total: usize) -> Result<Vec<usize>, ConvertError> {
    let indices = selection.to_indices(total);
    if indices.is_empty() {
        return Err(ConvertError::PageOutOfRange {
            page: selection.first_requested(),
            total,
        });
    }
    Ok(indices)
}

/// [`Extractor`] backed by `pdfium-render`.
#[derive(Clone, Default)]
pub struct PdfiumExtractor {
    password: Option<String>,
    pages: PageSelection,
    max_rendered_pixels: u32,
    fallback: Option<Arc<dyn FallbackTextSource>>,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for PdfiumExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumExtractor")
            .field("pages", &self.pages)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("fallback", &self.fallback.as_ref().map(|s| s.name()))
            .finish_non_exhaustive()
    }
}

impl PdfiumExtractor {
    /// Take password, page selection, fallback and progress from `config`.
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            password: config.password.clone(),
            pages: config.pages.clone(),
            max_rendered_pixels: config.max_rendered_pixels,
            fallback: config.fallback.clone(),
            progress: config.progress_callback.clone(),
        }
    }

    fn render_config(&self) -> PdfRenderConfig {
        let max = self.max_rendered_pixels.max(100) as i32;
        PdfRenderConfig::new()
            .set_target_width(max)
            .set_maximum_height(max)
    }

    /// Fragments of one page, sorted top to bottom, left to right.
    fn extract_page(
        &self,
        page: &PdfPage<'_>,
        page_num: usize,
        out: &mut Extraction,
    ) -> Result<Vec<Fragment>, ConvertError> {
        let height = page.height().value as f64;
        let mut fragments = Vec::new();

        // ── Text ─────────────────────────────────────────────────────────
        let text = page.text().map_err(|e| ConvertError::ExtractionFailed {
            page: page_num,
            detail: format!("{e:?}"),
        })?;
        for segment in text.segments().iter() {
            let content = segment.text();
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            let bounds = segment.bounds();
            let bbox = BBox::new(
                bounds.left().value as f64,
                height - bounds.top().value as f64,
                bounds.right().value as f64,
                height - bounds.bottom().value as f64,
            );
            let (font_size, bold) = segment_style(&segment);
            fragments.push(Fragment::text(content, font_size, bold, bbox, page_num as u32)?);
        }
        let has_text = !fragments.is_empty();

        // ── Images ───────────────────────────────────────────────────────
        for object in page.objects().iter() {
            let Some(image) = object.as_image_object() else {
                continue;
            };
            let Ok(bounds) = object.bounds() else {
                continue;
            };
            let bbox = BBox::new(
                bounds.left().value as f64,
                height - bounds.top().value as f64,
                bounds.right().value as f64,
                height - bounds.bottom().value as f64,
            );
            if bbox.width() < MIN_IMAGE_EXTENT || bbox.height() < MIN_IMAGE_EXTENT {
                continue;
            }

            let encoded = image
                .get_raw_image()
                .map_err(|e| format!("{e:?}"))
                .and_then(|img| encode_png(&img).map_err(|e| e.to_string()));
            match encoded {
                Ok(data) => fragments.push(Fragment::image(
                    ImageSource::Bytes {
                        data,
                        extension: "png".into(),
                    },
                    bbox,
                    page_num as u32,
                )?),
                Err(detail) => {
                    warn!("Page {}: skipping embedded image: {}", page_num, detail);
                    out.diagnostics.push(AssetError::Decode { detail });
                }
            }
        }

        // ── Fallback text ────────────────────────────────────────────────
        if !has_text {
            if let Some(source) = &self.fallback {
                match self.fallback_text(page, page_num, source.as_ref()) {
                    Ok(lines) => fragments.extend(lines),
                    Err(e) => {
                        warn!("{}", e);
                        if let Some(cb) = &self.progress {
                            cb.on_page_error(page_num, out.metadata.page_count, &e.to_string());
                        }
                        out.page_errors.push(e);
                    }
                }
            }
        }

        fragments.sort_by(|a, b| {
            a.bbox
                .y0
                .total_cmp(&b.bbox.y0)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });
        Ok(fragments)
    }

    fn fallback_text(
        &self,
        page: &PdfPage<'_>,
        page_num: usize,
        source: &dyn FallbackTextSource,
    ) -> Result<Vec<Fragment>, PageError> {
        let bitmap = page
            .render_with_config(&self.render_config())
            .map_err(|e| PageError::RenderFailed {
                page: page_num,
                detail: format!("{e:?}"),
            })?;
        let image = bitmap.as_image();
        debug!(
            "Page {}: no text layer, asking {} ({}x{} px)",
            page_num,
            source.name(),
            image.width(),
            image.height()
        );
        let text = source.page_text(page_num, &image)?;
        let lines = fallback_fragments(&text, page_num as u32);
        if lines.is_empty() {
            debug!("Page {}: fallback transcript too short, ignored", page_num);
        }
        Ok(lines)
    }
}

impl Extractor for PdfiumExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction, ConvertError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, path, self.password.as_deref())?;
        let mut out = Extraction {
            metadata: document_metadata(&document),
            ..Extraction::default()
        };
        let total = out.metadata.page_count;
        info!("PDF loaded: {} pages", total);

        let indices = select_pages(&self.pages, total)?;
        if let Some(cb) = &self.progress {
            cb.on_conversion_start(indices.len());
        }

        let pages = document.pages();
        for idx in indices {
            let page_num = idx + 1;
            let page = pages
                .get(idx as u16)
                .map_err(|e| ConvertError::ExtractionFailed {
                    page: page_num,
                    detail: format!("{e:?}"),
                })?;
            let fragments = self.extract_page(&page, page_num, &mut out)?;
            debug!("Page {}: {} fragments", page_num, fragments.len());
            if let Some(cb) = &self.progress {
                cb.on_page_extracted(page_num, total, fragments.len());
            }
            out.fragments.extend(fragments);
            out.pages_extracted += 1;
        }

        renumber(&mut out.fragments);
        info!(
            "Extracted {} fragments from {} pages",
            out.fragments.len(),
            out.pages_extracted
        );
        Ok(out)
    }
}

/// Font size and boldness of a text run, read from its first visible glyph.
fn segment_style(segment: &PdfPageTextSegment<'_>) -> (f64, bool) {
    let Ok(chars) = segment.chars() else {
        return (DEFAULT_FONT_SIZE, false);
    };
    let Some(glyph) = chars
        .iter()
        .find(|c| c.unicode_char().is_some_and(|ch| !ch.is_whitespace()))
    else {
        return (DEFAULT_FONT_SIZE, false);
    };
    let size = glyph.scaled_font_size().value as f64;
    let bold = is_bold_weight(glyph.font_weight(), &glyph.font_name());
    (size, bold)
}

/// Weight 700 and above is bold; without a weight, trust the font name.
fn is_bold_weight(weight: Option<PdfFontWeight>, font_name: &str) -> bool {
    match weight {
        Some(PdfFontWeight::Weight700Bold | PdfFontWeight::Weight800 | PdfFontWeight::Weight900) => {
            true
        }
        Some(PdfFontWeight::Custom(w)) => w >= 700,
        Some(_) => false,
        None => font_name.to_ascii_lowercase().contains("bold"),
    }
}

/// Lay a fallback transcript out as one synthetic 12 pt line per row.
///
/// Rows shorter than three characters are dropped; the whole transcript is
/// rejected (empty result) unless the kept rows carry more than ten
/// characters.
pub fn fallback_fragments(text: &str, page: u32) -> Vec<Fragment> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| l.chars().count() >= MIN_FALLBACK_LINE_CHARS)
        .collect();
    let total: usize = lines.iter().map(|l| l.chars().count()).sum();
    if total <= MIN_FALLBACK_TOTAL_CHARS {
        return Vec::new();
    }

    lines
        .into_iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let top = 50.0 + 20.0 * i as f64;
            Fragment::text(
                line,
                DEFAULT_FONT_SIZE,
                false,
                BBox::new(50.0, top, 500.0, top + 20.0),
                page,
            )
            .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_lines_are_stacked() {
        let frags = fallback_fragments("Chapter one\nok\n\nThe quick brown fox\n", 4);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].text_content(), Some("Chapter one"));
        assert_eq!(frags[0].bbox, BBox::new(50.0, 50.0, 500.0, 70.0));
        assert_eq!(frags[1].bbox, BBox::new(50.0, 70.0, 500.0, 90.0));
        assert!(frags.iter().all(|f| f.page == 4 && !f.is_bold()));
        assert!(frags.iter().all(|f| f.font_size() == 12.0));
    }

    #[test]
    fn short_fallback_transcript_is_rejected() {
        // 10 characters in total: not enough.
        assert!(fallback_fragments("abcde\nfghij", 1).is_empty());
        assert_eq!(fallback_fragments("abcde\nfghijk", 1).len(), 2);
        assert!(fallback_fragments("", 1).is_empty());
    }

    #[test]
    fn empty_selection_is_out_of_range() {
        let err = select_pages(&PageSelection::Single(9), 3).unwrap_err();
        assert!(matches!(err, ConvertError::PageOutOfRange { page: 9, total: 3 }));
        assert_eq!(select_pages(&PageSelection::Range(2, 9), 3).unwrap(), vec![1, 2]);
    }

    #[test]
    fn bold_from_weight_or_name() {
        assert!(is_bold_weight(Some(PdfFontWeight::Weight700Bold), "Arial"));
        assert!(is_bold_weight(Some(PdfFontWeight::Custom(750)), "Arial"));
        assert!(!is_bold_weight(Some(PdfFontWeight::Weight400Normal), "Arial-Bold"));
        assert!(is_bold_weight(None, "TimesNewRoman-BoldMT"));
        assert!(!is_bold_weight(None, "Helvetica"));
    }
}
