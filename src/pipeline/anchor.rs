//! ImageAnchorer: place image fragments between the text blocks of a page.
//!
//! An image belongs to every page draft whose paragraphs span its PDF page.
//! Inside the page it goes right after the text block it follows visually:
//! the last block whose paragraph ends at or above the image's top edge,
//! provided no later block starts above the image's bottom edge. When that
//! scan finds nothing, the block with the nearest vertical centre wins if it
//! is at most 300 units away; otherwise the image is appended.
//!
//! ## Oversized orphans
//!
//! An image taller than 60 % of the estimated page height with no text block
//! centre within 100 units is treated as a full-page scan and dropped. The
//! drop is lossy, so each one is recorded as an
//! [`AssetError::OversizedOrphan`] diagnostic instead of vanishing silently:
//! once per image, and only if no other page draft kept it.

use crate::error::AssetError;
use crate::fragment::{BBox, Fragment};
use crate::lecture::{ContentBlock, ImageBlock};
use crate::pipeline::normalize::package_path;
use crate::pipeline::sections::PageDraft;
use tracing::{debug, warn};

/// Page height assumed when a page's paragraphs give no usable estimate (A4 at 72 dpi).
pub const DEFAULT_PAGE_HEIGHT: f64 = 842.0;
/// Height, in percent of the page, above which an image counts as oversized.
pub const OVERSIZED_PERCENT: f64 = 60.0;
/// Text whose centre is closer than this keeps an oversized image.
pub const NEARBY_TEXT_DISTANCE: f64 = 100.0;
/// Furthest a nearest-centre fallback anchor may be.
pub const MAX_ANCHOR_DISTANCE: f64 = 300.0;

/// Anchor `images` into every draft they belong to.
///
/// An image that spans several drafts is judged on each of them; it is
/// reported at most once, and only when no draft took it.
pub fn anchor_images(drafts: &mut [PageDraft<'_>], images: &[&Fragment]) -> Vec<AssetError> {
    let mut placed = vec![false; images.len()];
    let mut dropped: Vec<Option<AssetError>> = vec![None; images.len()];
    for draft in drafts.iter_mut() {
        anchor_page(draft, images, &mut placed, &mut dropped);
    }
    dropped
        .into_iter()
        .zip(placed)
        .filter_map(|(diagnostic, placed)| if placed { None } else { diagnostic })
        .collect()
}

fn anchor_page(
    draft: &mut PageDraft<'_>,
    images: &[&Fragment],
    placed: &mut [bool],
    dropped: &mut [Option<AssetError>],
) {
    let (Some(first), Some(last)) = (draft.paragraphs.first(), draft.paragraphs.last()) else {
        return;
    };
    let pages = first.page..=last.page;
    let page_height = estimate_page_height(draft);

    let mut members: Vec<(usize, &Fragment)> = images
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, img)| pages.contains(&img.page))
        .collect();
    members.sort_by(|(_, a), (_, b)| a.bbox.y0.total_cmp(&b.bbox.y0));

    for (i, img) in members {
        let Some(source) = img.image_source() else {
            continue;
        };
        let path = match package_path(source) {
            Ok(p) => p,
            Err(e) => {
                if dropped[i].is_none() {
                    warn!("Page {}: image not placed: {}", img.page, e);
                    dropped[i] = Some(e);
                }
                continue;
            }
        };

        let percent = img.bbox.height() / page_height * 100.0;
        if percent > OVERSIZED_PERCENT && !has_nearby_text(&draft.page.blocks, &img.bbox) {
            if dropped[i].is_none() {
                warn!(
                    "Page {}: dropping {} ({:.0}% of page height, no text nearby)",
                    img.page, path, percent
                );
                dropped[i] = Some(AssetError::OversizedOrphan {
                    page: img.page,
                    path,
                    percent,
                });
            }
            continue;
        }

        let block = ContentBlock::Image(ImageBlock {
            path,
            alt: String::new(),
            width: Some(img.bbox.width()),
            height: Some(img.bbox.height()),
            caption: None,
        });
        match insertion_anchor(&draft.page.blocks, &img.bbox) {
            Some(idx) => draft.page.blocks.insert(idx + 1, block),
            None => draft.page.blocks.push(block),
        }
        placed[i] = true;
    }

    debug!(
        "Page '{}': {} blocks after anchoring",
        draft.page.title,
        draft.page.blocks.len()
    );
}

/// Largest paragraph bottom on the draft, or [`DEFAULT_PAGE_HEIGHT`].
fn estimate_page_height(draft: &PageDraft<'_>) -> f64 {
    let max_bottom = draft
        .paragraphs
        .iter()
        .map(|p| p.bbox.y1)
        .fold(f64::NEG_INFINITY, f64::max);
    if max_bottom > 0.0 {
        max_bottom
    } else {
        DEFAULT_PAGE_HEIGHT
    }
}

/// Text blocks as (index into `blocks`, source paragraph box).
fn text_anchors(blocks: &[ContentBlock]) -> Vec<(usize, BBox)> {
    blocks
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.as_text().and_then(|t| t.source).map(|s| (i, s.bbox)))
        .collect()
}

fn has_nearby_text(blocks: &[ContentBlock], image: &BBox) -> bool {
    text_anchors(blocks)
        .iter()
        .any(|(_, bbox)| (bbox.center_y() - image.center_y()).abs() < NEARBY_TEXT_DISTANCE)
}

/// Index of the block the image should follow, `None` to append.
pub fn insertion_anchor(blocks: &[ContentBlock], image: &BBox) -> Option<usize> {
    let anchors = text_anchors(blocks);
    preceding_block(&anchors, image).or_else(|| nearest_block(&anchors, image))
}

fn preceding_block(anchors: &[(usize, BBox)], image: &BBox) -> Option<usize> {
    let mut found = None;
    for (k, (idx, bbox)) in anchors.iter().enumerate() {
        if bbox.y1 > image.y0 {
            continue;
        }
        let overtaken = anchors[k + 1..]
            .iter()
            .any(|(_, later)| later.y0 < image.y1);
        if !overtaken {
            found = Some(*idx);
        }
    }
    found
}

/// Closest block by vertical centre; ties keep the earlier block.
fn nearest_block(anchors: &[(usize, BBox)], image: &BBox) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, bbox) in anchors {
        let distance = (bbox.center_y() - image.center_y()).abs();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((*idx, distance));
        }
    }
    best.filter(|(_, d)| *d <= MAX_ANCHOR_DISTANCE).map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::ImageSource;
    use crate::lecture::{SourceParagraph, TextBlock, TextStyle};
    use crate::pipeline::headers::Header;
    use crate::pipeline::paragraphs::Paragraph;
    use crate::pipeline::sections::build_pages;

    fn para(text: &str, ordinal: usize, y0: f64, y1: f64) -> Paragraph {
        let bbox = BBox::new(72.0, y0, 500.0, y1);
        Paragraph {
            fragments: vec![Fragment::text(text, 12.0, false, bbox, 1).unwrap()],
            text: text.into(),
            font_size: 12.0,
            bold: false,
            bbox,
            page: 1,
            line_count: 1,
            ordinal,
            header_level: 0,
        }
    }

    fn text_block(y0: f64, y1: f64) -> ContentBlock {
        ContentBlock::Text(TextBlock {
            text: "t".into(),
            style: TextStyle::default(),
            source: Some(SourceParagraph {
                ordinal: 0,
                page: 1,
                bbox: BBox::new(0.0, y0, 100.0, y1),
            }),
        })
    }

    fn image(name: &str, y0: f64, y1: f64) -> Fragment {
        Fragment::image(
            ImageSource::Reference(format!("images/{name}")),
            BBox::new(100.0, y0, 300.0, y1),
            1,
        )
        .unwrap()
    }

    fn layout(blocks: &[ContentBlock]) -> Vec<String> {
        blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Text(t) => t.text.clone(),
                ContentBlock::Image(i) => i.path.clone(),
                _ => "?".into(),
            })
            .collect()
    }

    #[test]
    fn image_between_paragraphs_follows_the_upper_one() {
        let blocks = vec![text_block(100.0, 112.0), text_block(200.0, 212.0)];
        assert_eq!(insertion_anchor(&blocks, &BBox::new(0.0, 120.0, 10.0, 180.0)), Some(0));
    }

    #[test]
    fn image_below_everything_follows_the_last_block() {
        let blocks = vec![text_block(100.0, 112.0), text_block(200.0, 212.0)];
        assert_eq!(insertion_anchor(&blocks, &BBox::new(0.0, 300.0, 10.0, 400.0)), Some(1));
    }

    #[test]
    fn image_above_everything_uses_nearest_block() {
        let blocks = vec![text_block(100.0, 112.0), text_block(200.0, 212.0)];
        assert_eq!(insertion_anchor(&blocks, &BBox::new(0.0, 10.0, 10.0, 60.0)), Some(0));
    }

    #[test]
    fn distant_image_is_appended() {
        let blocks = vec![text_block(500.0, 512.0)];
        // Nothing ends above the image and the centres are 466 apart.
        assert_eq!(insertion_anchor(&blocks, &BBox::new(0.0, 0.0, 10.0, 80.0)), None);
    }

    #[test]
    fn nearest_tie_keeps_earlier_block() {
        let anchors = vec![(0, BBox::new(0.0, 0.0, 1.0, 20.0)), (1, BBox::new(0.0, 40.0, 1.0, 60.0))];
        assert_eq!(nearest_block(&anchors, &BBox::new(0.0, 20.0, 1.0, 40.0)), Some(0));
    }

    #[test]
    fn images_are_inserted_in_reading_order() {
        let paras = vec![
            para("first", 0, 100.0, 112.0),
            para("second", 1, 300.0, 312.0),
            para("third", 2, 500.0, 512.0),
        ];
        let mut drafts = build_pages(&paras, &[]);
        let a = image("a.png", 150.0, 250.0);
        let b = image("b.png", 350.0, 450.0);
        let diags = anchor_images(&mut drafts, &[&b, &a]);
        assert!(diags.is_empty());
        assert_eq!(
            layout(&drafts[0].page.blocks),
            vec!["first", "images/a.png", "second", "images/b.png", "third"]
        );
    }

    #[test]
    fn oversized_orphan_is_dropped_and_reported() {
        // Page height estimate is 712; the image is 70% of it and 500 units
        // from the only text block.
        let paras = vec![para("footer", 0, 700.0, 712.0)];
        let mut drafts = build_pages(&paras, &[]);
        let h = 712.0 * 0.7;
        let y0 = 706.0 - 500.0 - h / 2.0;
        let scan = image("scan.png", y0, y0 + h);
        let diags = anchor_images(&mut drafts, &[&scan]);
        assert!(drafts[0].page.blocks.iter().all(|b| b.as_image().is_none()));
        assert!(matches!(diags[0], AssetError::OversizedOrphan { .. }));
    }

    #[test]
    fn oversized_image_near_text_is_kept() {
        let paras = vec![para("label", 0, 400.0, 412.0), para("footer", 1, 700.0, 712.0)];
        let mut drafts = build_pages(&paras, &[]);
        let figure = image("figure.png", 100.0, 640.0);
        let diags = anchor_images(&mut drafts, &[&figure]);
        assert!(diags.is_empty());
        assert_eq!(
            drafts[0].page.blocks.iter().filter(|b| b.as_image().is_some()).count(),
            1
        );
    }

    #[test]
    fn images_outside_the_page_range_are_ignored() {
        let paras = vec![para("only page one", 0, 100.0, 112.0)];
        let mut drafts = build_pages(&paras, &[]);
        let mut other = image("p2.png", 150.0, 200.0);
        other.page = 2;
        anchor_images(&mut drafts, &[&other]);
        assert_eq!(drafts[0].page.blocks.len(), 1);
    }

    #[test]
    fn orphan_spanning_two_drafts_is_reported_once() {
        // Two lecture pages on PDF page 1; the poster is too tall and too far
        // from the body text of either.
        let paras = vec![
            para("Intro", 0, 100.0, 124.0),
            para("body one", 1, 130.0, 142.0),
            para("Details", 2, 700.0, 724.0),
            para("body two", 3, 730.0, 742.0),
        ];
        let headers = vec![
            Header { level: 1, text: "Intro".into(), ordinal: 0 },
            Header { level: 1, text: "Details".into(), ordinal: 2 },
        ];
        let mut drafts = build_pages(&paras, &headers);
        assert_eq!(drafts.len(), 2);

        let poster = image("poster.png", 160.0, 690.0);
        let diags = anchor_images(&mut drafts, &[&poster]);
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0], AssetError::OversizedOrphan { .. }));
    }

    #[test]
    fn blob_image_is_reported_not_placed() {
        let paras = vec![para("text", 0, 100.0, 112.0)];
        let mut drafts = build_pages(&paras, &[]);
        let blob = Fragment::image(
            ImageSource::Reference("blob:http://x".into()),
            BBox::new(0.0, 120.0, 10.0, 130.0),
            1,
        )
        .unwrap();
        let diags = anchor_images(&mut drafts, &[&blob]);
        assert!(matches!(diags[0], AssetError::BlobReference { .. }));
        assert_eq!(drafts[0].page.blocks.len(), 1);
    }
}
