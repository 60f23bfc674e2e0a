//! Document reconstruction: fragments → [`Lecture`].
//!
//! ```text
//! fragments ──▶ lines ──▶ paragraphs ──▶ headers ──▶ pages ──▶ anchored images
//!                                     └─▶ metadata
//! ```
//!
//! Pure and synchronous: nothing here touches the disk. Image fragments are
//! expected to have been through [`crate::pipeline::normalize`] already; any
//! source that still is not a package path is reported, not resolved.

use crate::error::{AssetError, ConvertError};
use crate::fragment::Fragment;
use crate::lecture::{
    ContentBlock, ImageBlock, Lecture, LectureMetadata, Page, Section, DEFAULT_LANGUAGE,
    DEFAULT_LECTURE_TITLE, DEFAULT_PAGE_TITLE, DEFAULT_SECTION_TITLE,
};
use crate::pipeline::anchor::anchor_images;
use crate::pipeline::headers::classify_headers;
use crate::pipeline::lines::group_lines;
use crate::pipeline::metadata::extract_metadata;
use crate::pipeline::normalize::package_path;
use crate::pipeline::paragraphs::assemble_paragraphs;
use crate::pipeline::sections::{build_pages, into_section};
use tracing::{debug, info, warn};

/// A reconstructed lecture plus the images that could not be placed.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub lecture: Lecture,
    pub diagnostics: Vec<AssetError>,
}

/// Rebuild the document model from an ordered fragment stream.
///
/// # Errors
///
/// [`ConvertError::EmptyInput`] when `fragments` is empty. A stream without
/// any text is not an error: it yields a single page of images.
pub fn build_lecture(fragments: &[Fragment]) -> Result<Lecture, ConvertError> {
    reconstruct(fragments).map(|r| r.lecture)
}

/// Like [`build_lecture`], but also returns the non-fatal image diagnostics.
pub fn reconstruct(fragments: &[Fragment]) -> Result<Reconstruction, ConvertError> {
    if fragments.is_empty() {
        return Err(ConvertError::EmptyInput);
    }

    let images: Vec<&Fragment> = fragments.iter().filter(|f| !f.is_text()).collect();
    let lines = group_lines(fragments);
    if lines.is_empty() {
        info!(
            "No text in {} fragments, building image-only lecture",
            fragments.len()
        );
        return Ok(images_only(&images));
    }

    let mut paragraphs = assemble_paragraphs(&lines);
    let headers = classify_headers(&mut paragraphs);
    let info = extract_metadata(&paragraphs, &headers);
    debug!(
        "{} lines → {} paragraphs, {} headers, title '{}'",
        lines.len(),
        paragraphs.len(),
        headers.len(),
        info.title
    );

    let mut drafts = build_pages(&paragraphs, &headers);
    let diagnostics = anchor_images(&mut drafts, &images);
    let section = into_section(drafts);

    info!(
        "Reconstructed '{}': {} pages, {} images placed, {} dropped",
        info.title,
        section.pages.len(),
        section
            .pages
            .iter()
            .flat_map(|p| &p.blocks)
            .filter(|b| b.as_image().is_some())
            .count(),
        diagnostics.len()
    );

    Ok(Reconstruction {
        lecture: Lecture {
            title: info.title,
            description: info.description,
            language: info.language,
            sections: vec![section],
            metadata: LectureMetadata {
                keywords: info.keywords,
                ..LectureMetadata::default()
            },
        },
        diagnostics,
    })
}

/// One page holding every image in stream order.
fn images_only(images: &[&Fragment]) -> Reconstruction {
    let mut page = Page::new(DEFAULT_PAGE_TITLE);
    let mut diagnostics = Vec::new();

    for img in images {
        let Some(source) = img.image_source() else {
            continue;
        };
        match package_path(source) {
            Ok(path) => page.blocks.push(ContentBlock::Image(ImageBlock {
                path,
                alt: String::new(),
                width: Some(img.bbox.width()),
                height: Some(img.bbox.height()),
                caption: None,
            })),
            Err(e) => {
                warn!("Page {}: image not placed: {}", img.page, e);
                diagnostics.push(e);
            }
        }
    }

    let mut section = Section::new(DEFAULT_SECTION_TITLE, 1);
    section.push_page(page);

    Reconstruction {
        lecture: Lecture {
            title: DEFAULT_LECTURE_TITLE.to_string(),
            description: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            sections: vec![section],
            metadata: LectureMetadata::default(),
        },
        diagnostics,
    }
}
