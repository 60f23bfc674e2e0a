//! SectionPageBuilder: cut the paragraph sequence into pages at headers.
//!
//! Every lecture has exactly one section. Each level-1 header (or every
//! header, when the document has no level-1 header) opens a page that runs
//! up to the next such header. Header paragraphs delimit pages but never
//! become content blocks; they are recognised by ordinal.

use crate::lecture::{
    Alignment, ContentBlock, Page, Section, SourceParagraph, TextBlock, TextStyle,
    DEFAULT_PAGE_TITLE, DEFAULT_SECTION_TITLE,
};
use crate::pipeline::headers::{Header, HEADER_TEXT_LIMIT};
use crate::pipeline::paragraphs::Paragraph;
use std::collections::HashSet;
use tracing::debug;

/// A page under construction together with the paragraphs it was cut from.
///
/// The paragraph slice still includes the page's header; image anchoring
/// uses it to work out the PDF page range and height the page covers.
#[derive(Debug)]
pub struct PageDraft<'a> {
    pub page: Page,
    pub paragraphs: &'a [Paragraph],
}

/// Split `paragraphs` into page drafts.
pub fn build_pages<'a>(paragraphs: &'a [Paragraph], headers: &[Header]) -> Vec<PageDraft<'a>> {
    let header_ordinals: HashSet<usize> = headers.iter().map(|h| h.ordinal).collect();

    if headers.is_empty() {
        return vec![draft(DEFAULT_PAGE_TITLE, paragraphs, &header_ordinals)];
    }

    let mut boundaries: Vec<&Header> = headers.iter().filter(|h| h.level == 1).collect();
    if boundaries.is_empty() {
        boundaries = headers.iter().collect();
    }

    let mut drafts = Vec::with_capacity(boundaries.len());
    for (i, header) in boundaries.iter().enumerate() {
        let start = position_of(paragraphs, header.ordinal);
        let end = boundaries
            .get(i + 1)
            .map_or(paragraphs.len(), |next| position_of(paragraphs, next.ordinal));
        let slice = &paragraphs[start..end.max(start)];
        if slice.is_empty() {
            continue;
        }

        let title: String = header.text.trim().chars().take(HEADER_TEXT_LIMIT).collect();
        debug!(
            "Page '{}': paragraphs {}..{} ({} body)",
            title,
            start,
            end,
            slice
                .iter()
                .filter(|p| !header_ordinals.contains(&p.ordinal))
                .count()
        );
        drafts.push(draft(&title, slice, &header_ordinals));
    }
    drafts
}

/// Wrap finished drafts into the lecture's single section.
pub fn into_section(drafts: Vec<PageDraft<'_>>) -> Section {
    let mut section = Section::new(DEFAULT_SECTION_TITLE, 1);
    for d in drafts {
        section.push_page(d.page);
    }
    section
}

/// Index of the paragraph carrying `ordinal`.
///
/// Ordinals increase monotonically along the slice, so this is a binary
/// search rather than an assumption that ordinal == index.
fn position_of(paragraphs: &[Paragraph], ordinal: usize) -> usize {
    paragraphs.partition_point(|p| p.ordinal < ordinal)
}

fn draft<'a>(title: &str, paragraphs: &'a [Paragraph], headers: &HashSet<usize>) -> PageDraft<'a> {
    let mut page = Page::new(title);
    page.blocks = paragraphs
        .iter()
        .filter(|p| !headers.contains(&p.ordinal))
        .map(text_block)
        .collect();
    PageDraft { page, paragraphs }
}

fn text_block(para: &Paragraph) -> ContentBlock {
    ContentBlock::Text(TextBlock {
        text: para.text.clone(),
        style: TextStyle {
            font_size: Some(para.font_size),
            bold: para.bold,
            alignment: Alignment::Left,
        },
        source: Some(SourceParagraph {
            ordinal: para.ordinal,
            page: para.page,
            bbox: para.bbox,
        }),
    })
}
