//! ParagraphAssembler: merge consecutive lines into paragraphs.
//!
//! ## Decision rule
//!
//! A line continues the paragraph under construction only when it matches
//! the paragraph's last line on page, spacing, size and weight:
//!
//! | # | Condition | Effect |
//! |---|-----------|--------|
//! | a | same page | required |
//! | b | gap < 15 | required |
//! | c | \|Δ mean size\| < 2 | required |
//! | d | same all-bold state | required |
//! | e | gap > max(median × 1.3, mean × 1.2) | forces a break |
//! | f | starts uppercase, previous ends `.!?`, gap > 8 | forces a break |
//! | g | gap > 25 | forces a break |
//!
//! The gap between two lines is the distance from the previous line's bottom
//! to the current line's top. The median and mean come from a statistics
//! pass over all same-page gaps in `(0, 100)`.

use crate::fragment::{BBox, Fragment};
use crate::pipeline::lines::Line;
use crate::pipeline::stats;
use tracing::debug;

/// Gap assumed for both statistics when no usable gap exists.
pub const DEFAULT_GAP: f64 = 15.0;
/// Gaps at or above this are outliers (page breaks, figures) and not sampled.
pub const GAP_OUTLIER: f64 = 100.0;
/// Largest gap two lines of one paragraph may have.
pub const MERGE_GAP: f64 = 15.0;
/// Largest mean font-size difference two lines of one paragraph may have.
pub const FONT_SIZE_TOLERANCE: f64 = 2.0;
/// Gap above which a sentence ending followed by a capital starts a paragraph.
pub const SENTENCE_BREAK_GAP: f64 = 8.0;
/// Gap above which lines are always split.
pub const FORCE_BREAK_GAP: f64 = 25.0;

/// A run of lines the assembler decided belong together.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub fragments: Vec<Fragment>,
    /// Fragment texts joined with single spaces.
    pub text: String,
    /// Mean font size over all constituent fragments.
    pub font_size: f64,
    /// True when every constituent fragment is bold.
    pub bold: bool,
    pub bbox: BBox,
    /// Page of the first fragment.
    pub page: u32,
    pub line_count: usize,
    /// Document-wide position after the final (page, top) sort.
    pub ordinal: usize,
    /// 0 for body text, 1 or 2 for headers.
    pub header_level: u8,
}

impl Paragraph {
    fn from_lines(lines: &[Line]) -> Self {
        let fragments: Vec<Fragment> = lines
            .iter()
            .flat_map(|l| l.fragments.iter().cloned())
            .collect();
        let text = fragments
            .iter()
            .filter_map(Fragment::text_content)
            .collect::<Vec<_>>()
            .join(" ");
        let sizes: Vec<f64> = fragments.iter().map(Fragment::font_size).collect();
        let font_size = stats::mean(&sizes).unwrap_or(crate::fragment::DEFAULT_FONT_SIZE);
        let bold = !fragments.is_empty() && fragments.iter().all(Fragment::is_bold);
        let bbox = fragments
            .iter()
            .map(|f| f.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        let page = fragments.first().map_or(0, |f| f.page);

        Self {
            fragments,
            text,
            font_size,
            bold,
            bbox,
            page,
            line_count: lines.len(),
            ordinal: 0,
            header_level: 0,
        }
    }

    pub fn is_header(&self) -> bool {
        self.header_level > 0
    }

    /// Length of the text in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Median and mean vertical gap between consecutive same-page lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapStats {
    pub median: f64,
    pub mean: f64,
}

impl GapStats {
    pub fn from_lines(lines: &[Line]) -> Self {
        let gaps: Vec<f64> = lines
            .windows(2)
            .filter(|w| w[0].page == w[1].page)
            .map(|w| w[1].top() - w[0].bottom())
            .filter(|&g| g > 0.0 && g < GAP_OUTLIER)
            .collect();

        Self {
            median: stats::median(&gaps).unwrap_or(DEFAULT_GAP),
            mean: stats::mean(&gaps).unwrap_or(DEFAULT_GAP),
        }
    }

    /// Gap above which a break is considered significant for this document.
    pub fn significant_gap(&self) -> f64 {
        (self.median * 1.3).max(self.mean * 1.2)
    }
}

/// Should `current` be appended to the paragraph whose last line is `previous`?
pub fn continues_paragraph(previous: &Line, current: &Line, gaps: &GapStats) -> bool {
    let gap = current.top() - previous.bottom();

    let same_page = current.page == previous.page;
    let size_close = (current.mean_font_size() - previous.mean_font_size()).abs() < FONT_SIZE_TOLERANCE;
    let same_weight = current.all_bold() == previous.all_bold();
    let basic = same_page && gap < MERGE_GAP && size_close && same_weight;

    let significant = gap > 0.0 && gap > gaps.significant_gap();

    let current_text = current.text();
    let previous_text = previous.text();
    let sentence_break = current_text.chars().next().is_some_and(char::is_uppercase)
        && previous_text.ends_with(['.', '!', '?'])
        && gap > SENTENCE_BREAK_GAP;

    let very_large = gap > FORCE_BREAK_GAP;

    basic && !significant && !sentence_break && !very_large
}

/// Merge `lines` into paragraphs, then order them by (page, top) and assign
/// each its ordinal.
pub fn assemble_paragraphs(lines: &[Line]) -> Vec<Paragraph> {
    let gaps = GapStats::from_lines(lines);
    debug!(
        "Line gaps: median {:.2}, mean {:.2} over {} lines",
        gaps.median,
        gaps.mean,
        lines.len()
    );

    let mut paragraphs = Vec::new();
    let mut start = 0;
    for i in 1..lines.len() {
        if !continues_paragraph(&lines[i - 1], &lines[i], &gaps) {
            paragraphs.push(Paragraph::from_lines(&lines[start..i]));
            start = i;
        }
    }
    if start < lines.len() {
        paragraphs.push(Paragraph::from_lines(&lines[start..]));
    }

    // Stable: paragraphs sharing (page, top) keep their assembly order.
    paragraphs.sort_by(|a, b| a.page.cmp(&b.page).then(a.bbox.y0.total_cmp(&b.bbox.y0)));
    for (ordinal, p) in paragraphs.iter_mut().enumerate() {
        p.ordinal = ordinal;
    }

    debug!("Assembled {} paragraphs", paragraphs.len());
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lines::group_lines;

    fn span(text: &str, size: f64, bold: bool, page: u32, y0: f64) -> Fragment {
        Fragment::text(text, size, bold, BBox::new(72.0, y0, 400.0, y0 + size), page).unwrap()
    }

    fn paragraphs_of(frags: &[Fragment]) -> Vec<Paragraph> {
        assemble_paragraphs(&group_lines(frags))
    }

    #[test]
    fn close_lines_merge() {
        let frags = vec![
            span("the quick brown fox", 12.0, false, 1, 100.0),
            span("jumps over the dog", 12.0, false, 1, 114.0),
        ];
        let paras = paragraphs_of(&frags);
        assert_eq!(paras.len(), 1);
        assert_eq!(paras[0].text, "the quick brown fox jumps over the dog");
        assert_eq!(paras[0].line_count, 2);
        assert_eq!(paras[0].bbox, BBox::new(72.0, 100.0, 400.0, 126.0));
    }

    #[test]
    fn gap_of_14_9_merges() {
        // 12 + 14.9 → second line starts 26.9 below the first
        let frags = vec![
            span("first line of text", 12.0, false, 1, 100.0),
            span("second line of text", 12.0, false, 1, 126.9),
        ];
        assert_eq!(paragraphs_of(&frags).len(), 1);
    }

    #[test]
    fn gap_of_25_1_splits() {
        let frags = vec![
            span("first line of text", 12.0, false, 1, 100.0),
            span("second line of text", 12.0, false, 1, 137.1),
        ];
        assert_eq!(paragraphs_of(&frags).len(), 2);
    }

    #[test]
    fn font_size_change_splits() {
        let frags = vec![
            span("big", 18.0, false, 1, 100.0),
            span("small", 12.0, false, 1, 120.0),
        ];
        assert_eq!(paragraphs_of(&frags).len(), 2);
    }

    #[test]
    fn weight_change_splits() {
        let frags = vec![
            span("bold", 12.0, true, 1, 100.0),
            span("plain", 12.0, false, 1, 114.0),
        ];
        assert_eq!(paragraphs_of(&frags).len(), 2);
    }

    #[test]
    fn sentence_boundary_with_gap_splits() {
        // gap 9 > 8 after a full stop, next line capitalised
        let frags = vec![
            span("End of a sentence.", 12.0, false, 1, 100.0),
            span("Another one starts", 12.0, false, 1, 121.0),
        ];
        assert_eq!(paragraphs_of(&frags).len(), 2);
    }

    #[test]
    fn page_change_splits() {
        let frags = vec![
            span("bottom of page one", 12.0, false, 1, 700.0),
            span("top of page two", 12.0, false, 2, 60.0),
        ];
        let paras = paragraphs_of(&frags);
        assert_eq!(paras.len(), 2);
        assert_eq!(paras[1].page, 2);
    }

    #[test]
    fn ordinals_follow_final_order() {
        let frags = vec![
            span("page two", 12.0, false, 2, 50.0),
            span("page one lower", 12.0, false, 1, 300.0),
            span("page one upper", 12.0, false, 1, 100.0),
        ];
        let paras = paragraphs_of(&frags);
        let order: Vec<(&str, usize)> = paras.iter().map(|p| (p.text.as_str(), p.ordinal)).collect();
        assert_eq!(
            order,
            vec![("page one upper", 0), ("page one lower", 1), ("page two", 2)]
        );
    }

    #[test]
    fn gap_stats_default_without_samples() {
        let lines = group_lines(&[span("alone", 12.0, false, 1, 100.0)]);
        let g = GapStats::from_lines(&lines);
        assert_eq!(g, GapStats { median: 15.0, mean: 15.0 });
    }

    #[test]
    fn gap_stats_ignore_outliers_and_overlaps() {
        let frags = vec![
            span("a", 12.0, false, 1, 100.0),
            span("b", 12.0, false, 1, 116.0), // gap 4
            span("c", 12.0, false, 1, 250.0), // gap 122 → outlier
            span("d", 12.0, false, 1, 268.0), // gap 6
        ];
        let g = GapStats::from_lines(&group_lines(&frags));
        assert_eq!(g.median, 5.0);
        assert_eq!(g.mean, 5.0);
    }
}
