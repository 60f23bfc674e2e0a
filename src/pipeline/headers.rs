//! HeaderClassifier: tag paragraphs as level-1 / level-2 headers.
//!
//! ## Why statistics instead of fixed sizes?
//!
//! Lecture slides and handouts use wildly different type scales: a 14 pt
//! heading is huge in a 9 pt handout and invisible in a 24 pt slide deck.
//! The threshold is therefore derived from the document itself:
//!
//! ```text
//! threshold = max(median × 1.3, mean + 1.5 × stdev)
//! ```
//!
//! over the mean font size of every paragraph. Three rules are then tried in
//! order, first match wins:
//!
//! 1. size ≥ threshold, ≤ 2 lines, ≤ 150 chars → level 1 if size ≥ 1.5 × threshold, else level 2
//! 2. all bold, ≤ 2 lines, ≤ 150 chars → level 1
//! 3. 3 < chars ≤ 100, capitalised, not ending in `.`/`,`, size ≥ 0.9 × median,
//!    more than 20 units below the previous paragraph → level 1

use crate::pipeline::paragraphs::Paragraph;
use crate::pipeline::stats;
use tracing::debug;

/// Longest header text kept for titles, in characters.
pub const HEADER_TEXT_LIMIT: usize = 100;
const MAX_HEADER_LINES: usize = 2;
const MAX_HEADER_CHARS: usize = 150;
const SPACED_HEADER_MIN_CHARS: usize = 3;
const SPACED_HEADER_GAP: f64 = 20.0;

/// A paragraph recognised as a header, addressed by its document-wide ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// 1 or 2.
    pub level: u8,
    /// Display text, see [`header_text`].
    pub text: String,
    /// [`Paragraph::ordinal`] of the header paragraph.
    pub ordinal: usize,
}

/// Font statistics over paragraph mean sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontStats {
    pub median: f64,
    pub mean: f64,
    pub stdev: f64,
    pub threshold: f64,
}

impl FontStats {
    pub fn from_paragraphs(paragraphs: &[Paragraph]) -> Self {
        let sizes: Vec<f64> = paragraphs.iter().map(|p| p.font_size).collect();
        let median = stats::median(&sizes).unwrap_or(crate::fragment::DEFAULT_FONT_SIZE);
        let mean = stats::mean(&sizes).unwrap_or(crate::fragment::DEFAULT_FONT_SIZE);
        let stdev = stats::sample_stdev(&sizes);
        Self {
            median,
            mean,
            stdev,
            threshold: (median * 1.3).max(mean + 1.5 * stdev),
        }
    }
}

/// Flag header paragraphs in place and return them in document order.
pub fn classify_headers(paragraphs: &mut [Paragraph]) -> Vec<Header> {
    let fonts = FontStats::from_paragraphs(paragraphs);
    debug!(
        "Font sizes: median {:.2}, mean {:.2}, stdev {:.2} → header threshold {:.2}",
        fonts.median, fonts.mean, fonts.stdev, fonts.threshold
    );

    let mut headers = Vec::new();
    for idx in 0..paragraphs.len() {
        let gap_above = idx
            .checked_sub(1)
            .map(|prev| paragraphs[idx].bbox.y0 - paragraphs[prev].bbox.y1);

        let para = &mut paragraphs[idx];
        let Some(level) = header_level(para, &fonts, gap_above) else {
            continue;
        };

        para.header_level = level;
        headers.push(Header {
            level,
            text: header_text(&para.text),
            ordinal: para.ordinal,
        });
    }

    debug!(
        "Found {} headers ({} level 1)",
        headers.len(),
        headers.iter().filter(|h| h.level == 1).count()
    );
    headers
}

/// Header level of `para`, or `None` for body text.
///
/// `gap_above` is the distance from the previous paragraph's bottom to this
/// paragraph's top; `None` for the first paragraph.
pub fn header_level(para: &Paragraph, fonts: &FontStats, gap_above: Option<f64>) -> Option<u8> {
    let text = para.text.trim();
    if text.is_empty() {
        return None;
    }
    let chars = text.chars().count();
    let short = para.line_count <= MAX_HEADER_LINES && chars <= MAX_HEADER_CHARS;

    // 1. Large type
    if para.font_size >= fonts.threshold && short {
        return Some(if para.font_size >= fonts.threshold * 1.5 { 1 } else { 2 });
    }

    // 2. Bold
    if para.bold && short {
        return Some(1);
    }

    // 3. Short capitalised line set apart by whitespace
    let spaced = chars > SPACED_HEADER_MIN_CHARS
        && chars <= HEADER_TEXT_LIMIT
        && text.chars().next().is_some_and(char::is_uppercase)
        && !text.ends_with(['.', ','])
        && para.font_size >= fonts.median * 0.9
        && gap_above.is_some_and(|g| g > SPACED_HEADER_GAP);
    if spaced {
        return Some(1);
    }

    None
}

/// Display text for a header: the first line only, or at most 100
/// characters cut back to the last word boundary.
pub fn header_text(text: &str) -> String {
    let text = text.trim();
    if let Some((first, _)) = text.split_once('\n') {
        return first.trim().to_string();
    }
    if text.chars().count() <= HEADER_TEXT_LIMIT {
        return text.to_string();
    }
    let head: String = text.chars().take(HEADER_TEXT_LIMIT).collect();
    match head.rsplit_once(' ') {
        Some((kept, _)) => kept.trim().to_string(),
        None => head.trim().to_string(),
    }
}
