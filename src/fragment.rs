//! The atomic unit the reconstruction engine consumes.
//!
//! A [`Fragment`] is one positioned text run or one image reference taken
//! from a single PDF page. Fragments come from an [`crate::pipeline::extract::Extractor`]
//! (or straight from a library caller) and are read-only afterwards, except
//! for the single image-normalisation pass in [`crate::pipeline::normalize`].
//!
//! Coordinates are page units with the origin at the **top-left** corner and
//! `y` growing downwards, so `y0` is the top edge and `y1` the bottom edge.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};

/// Font size assumed when the source does not report one.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Axis-aligned rectangle `(x0, y0) – (x1, y1)` in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Where the bytes of an image fragment live.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// A textual reference: `images/<name>`, a file path, a
    /// `data:image/...;base64,` URI or a browser `blob:` URL.
    Reference(String),
    /// Encoded image bytes handed over by the extractor.
    Bytes { data: Vec<u8>, extension: String },
}

impl ImageSource {
    /// The canonical package-relative path, if this source already is one.
    ///
    /// Only `images/<file name>` qualifies: a nested or `..` path under
    /// `images/` is not canonical and gets reduced to its file name.
    pub fn canonical(&self) -> Option<&str> {
        match self {
            ImageSource::Reference(r) => {
                let r = r.trim();
                let name = r.strip_prefix(crate::IMAGES_DIR_PREFIX)?;
                is_plain_file_name(name).then_some(r)
            }
            ImageSource::Bytes { .. } => None,
        }
    }

    /// Short human-readable description for logs and diagnostics.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Reference(r) if r.starts_with("data:") => {
                format!("{}…", r.chars().take(30).collect::<String>())
            }
            ImageSource::Reference(r) => r.clone(),
            ImageSource::Bytes { data, extension } => {
                format!("<{} bytes of .{}>", data.len(), extension)
            }
        }
    }
}

/// Text or image payload of a fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentKind {
    Text {
        text: String,
        font_size: f64,
        bold: bool,
    },
    Image {
        source: ImageSource,
    },
}

/// One positioned text run or image on a PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub bbox: BBox,
    /// 1-based PDF page number.
    pub page: u32,
    /// Position in the document-wide fragment stream.
    pub order: usize,
}

impl Fragment {
    /// Build a text fragment. The text is trimmed and must not be empty.
    ///
    /// A non-positive or non-finite font size falls back to
    /// [`DEFAULT_FONT_SIZE`].
    pub fn text(
        text: impl Into<String>,
        font_size: f64,
        bold: bool,
        bbox: BBox,
        page: u32,
    ) -> Result<Self, ConvertError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(ConvertError::InvalidFragment(format!(
                "text fragment on page {page} has no text"
            )));
        }
        Self::check_page(page)?;
        let font_size = if font_size.is_finite() && font_size > 0.0 {
            font_size
        } else {
            DEFAULT_FONT_SIZE
        };
        Ok(Self {
            kind: FragmentKind::Text {
                text,
                font_size,
                bold,
            },
            bbox,
            page,
            order: 0,
        })
    }

    /// Build an image fragment. The source must not be empty.
    pub fn image(source: ImageSource, bbox: BBox, page: u32) -> Result<Self, ConvertError> {
        let empty = match &source {
            ImageSource::Reference(r) => r.trim().is_empty(),
            ImageSource::Bytes { data, .. } => data.is_empty(),
        };
        if empty {
            return Err(ConvertError::InvalidFragment(format!(
                "image fragment on page {page} has no image source"
            )));
        }
        Self::check_page(page)?;
        Ok(Self {
            kind: FragmentKind::Image { source },
            bbox,
            page,
            order: 0,
        })
    }

    fn check_page(page: u32) -> Result<(), ConvertError> {
        if page == 0 {
            return Err(ConvertError::InvalidFragment(
                "page numbers are 1-based, got 0".into(),
            ));
        }
        Ok(())
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, FragmentKind::Text { .. })
    }

    /// The text of a text fragment, `None` for images.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            FragmentKind::Text { text, .. } => Some(text),
            FragmentKind::Image { .. } => None,
        }
    }

    /// Font size of a text fragment; images report the default size.
    pub fn font_size(&self) -> f64 {
        match &self.kind {
            FragmentKind::Text { font_size, .. } => *font_size,
            FragmentKind::Image { .. } => DEFAULT_FONT_SIZE,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self.kind, FragmentKind::Text { bold: true, .. })
    }

    pub fn image_source(&self) -> Option<&ImageSource> {
        match &self.kind {
            FragmentKind::Image { source } => Some(source),
            FragmentKind::Text { .. } => None,
        }
    }
}

/// Assign `order` as the position in the slice.
pub fn renumber(fragments: &mut [Fragment]) {
    for (i, f) in fragments.iter_mut().enumerate() {
        f.order = i;
    }
}

/// A single path component that names a file: not empty, not `.` or `..`,
/// no separators.
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_fragment_is_trimmed() {
        let f = Fragment::text("  Hello  ", 14.0, false, BBox::default(), 1).unwrap();
        assert_eq!(f.text_content(), Some("Hello"));
    }

    #[test]
    fn blank_text_fragment_is_rejected() {
        let err = Fragment::text("   ", 12.0, false, BBox::default(), 1).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidFragment(_)));
    }

    #[test]
    fn zero_page_is_rejected() {
        assert!(Fragment::text("x", 12.0, false, BBox::default(), 0).is_err());
    }

    #[test]
    fn bogus_font_size_falls_back_to_default() {
        let f = Fragment::text("x", f64::NAN, false, BBox::default(), 1).unwrap();
        assert_eq!(f.font_size(), DEFAULT_FONT_SIZE);
        let f = Fragment::text("x", -3.0, false, BBox::default(), 1).unwrap();
        assert_eq!(f.font_size(), DEFAULT_FONT_SIZE);
    }

    #[test]
    fn empty_image_source_is_rejected() {
        let src = ImageSource::Bytes {
            data: vec![],
            extension: "png".into(),
        };
        assert!(Fragment::image(src, BBox::default(), 1).is_err());
        assert!(Fragment::image(ImageSource::Reference(" ".into()), BBox::default(), 1).is_err());
    }

    #[test]
    fn bbox_union_and_metrics() {
        let a = BBox::new(10.0, 20.0, 50.0, 30.0);
        let b = BBox::new(5.0, 25.0, 40.0, 60.0);
        let u = a.union(&b);
        assert_eq!(u, BBox::new(5.0, 20.0, 50.0, 60.0));
        assert_eq!(u.height(), 40.0);
        assert_eq!(u.center_y(), 40.0);
    }

    #[test]
    fn canonical_only_for_images_prefix() {
        assert_eq!(
            ImageSource::Reference("images/a.png".into()).canonical(),
            Some("images/a.png")
        );
        assert_eq!(ImageSource::Reference("/tmp/a.png".into()).canonical(), None);
    }

    #[test]
    fn nested_or_parent_paths_under_images_are_not_canonical() {
        for r in ["images/../../secret.txt", "images/sub/a.png", "images/..", "images/", "images/a\\b.png"] {
            assert_eq!(ImageSource::Reference(r.into()).canonical(), None, "{r}");
        }
    }
}
