//! LineGrouper: bucket text fragments into visual lines.
//!
//! Two fragments share a line when they sit on the same page and their top
//! edges fall into the same 5-unit vertical bucket. The tolerance absorbs
//! the sub-point baseline jitter PDF producers introduce between runs of the
//! same visual row; it is a fixed constant, not a tuning knob.
//!
//! Image fragments never form lines. They are set aside for
//! [`crate::pipeline::anchor`].

use crate::fragment::Fragment;
use std::cmp::Ordering;

/// Vertical bucket size in layout units.
pub const LINE_TOLERANCE: f64 = 5.0;

/// Quantise a top edge to its line bucket: `round(y0 / 5) × 5`.
///
/// Halfway values round to even, so 12.5 lands in bucket 10 and 17.5 in 20.
pub fn bucket(y0: f64) -> i64 {
    ((y0 / LINE_TOLERANCE).round_ties_even() * LINE_TOLERANCE) as i64
}

/// An ordered group of text fragments on one visual row.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub page: u32,
    pub bucket: i64,
    pub fragments: Vec<Fragment>,
}

impl Line {
    /// Fragment texts joined with single spaces.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .filter_map(Fragment::text_content)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn mean_font_size(&self) -> f64 {
        if self.fragments.is_empty() {
            return 0.0;
        }
        self.fragments.iter().map(Fragment::font_size).sum::<f64>() / self.fragments.len() as f64
    }

    /// True only when every fragment on the line is bold.
    pub fn all_bold(&self) -> bool {
        !self.fragments.is_empty() && self.fragments.iter().all(Fragment::is_bold)
    }

    /// Top edge of the line's first fragment.
    ///
    /// Gap measurements use the first run rather than the union box so a
    /// tall inline glyph later in the row does not eat into the gap.
    pub fn top(&self) -> f64 {
        self.fragments.first().map_or(0.0, |f| f.bbox.y0)
    }

    /// Bottom edge of the line's first fragment.
    pub fn bottom(&self) -> f64 {
        self.fragments.first().map_or(0.0, |f| f.bbox.y1)
    }
}

/// Group the text fragments of `fragments` into lines.
///
/// Fragments are (stably) ordered by page, bucket and left edge first, so a
/// caller may pass them in extraction order.
pub fn group_lines(fragments: &[Fragment]) -> Vec<Line> {
    let mut text: Vec<&Fragment> = fragments.iter().filter(|f| f.is_text()).collect();
    text.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then_with(|| bucket(a.bbox.y0).cmp(&bucket(b.bbox.y0)))
            .then_with(|| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<Line> = Vec::new();
    for fragment in text {
        let key = (fragment.page, bucket(fragment.bbox.y0));
        match lines.last_mut() {
            Some(line) if (line.page, line.bucket) == key => line.fragments.push(fragment.clone()),
            _ => lines.push(Line {
                page: key.0,
                bucket: key.1,
                fragments: vec![fragment.clone()],
            }),
        }
    }
    lines
}
