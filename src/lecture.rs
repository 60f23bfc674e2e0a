//! The reconstructed document model: Lecture → Section → Page → ContentBlock.
//!
//! Built bottom-up by [`crate::reconstruct::build_lecture`] and treated as
//! immutable afterwards; the only later change is the caller's title
//! override in [`crate::convert`]. Everything here is `Serialize` so the CLI
//! can dump the model with `--json`.

use crate::fragment::BBox;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title used when no header or short paragraph can name the lecture.
pub const DEFAULT_LECTURE_TITLE: &str = "Lecture";
/// Title of the single section every lecture has.
pub const DEFAULT_SECTION_TITLE: &str = "Contents";
/// Title of the page emitted when the document has no headers.
pub const DEFAULT_PAGE_TITLE: &str = "Page 1";
/// Language assumed when the document has no text.
pub const DEFAULT_LANGUAGE: &str = "ru";

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Root of the model, one per conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lecture {
    pub title: String,
    pub description: String,
    /// ISO 639-1 code, `"ru"` or `"en"`.
    pub language: String,
    pub sections: Vec<Section>,
    pub metadata: LectureMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LectureMetadata {
    pub author: String,
    pub created_at: String,
    pub version: String,
    pub keywords: Vec<String>,
}

impl Default for LectureMetadata {
    fn default() -> Self {
        Self {
            author: String::new(),
            created_at: String::new(),
            version: "1.0".to_string(),
            keywords: Vec::new(),
        }
    }
}

impl Lecture {
    /// All pages in reading order, across sections.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.sections.iter().flat_map(|s| s.pages.iter())
    }

    pub fn page_count(&self) -> usize {
        self.sections.iter().map(|s| s.pages.len()).sum()
    }

    /// Every image path referenced by the model, in reading order (with repeats).
    pub fn image_paths(&self) -> impl Iterator<Item = &str> {
        self.pages().flat_map(|p| {
            p.blocks.iter().filter_map(|b| match b {
                ContentBlock::Image(img) => Some(img.path.as_str()),
                _ => None,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    /// 1-based position within the lecture.
    pub order: u32,
    pub pages: Vec<Page>,
}

impl Section {
    pub fn new(title: impl Into<String>, order: u32) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            order,
            pages: Vec::new(),
        }
    }

    /// Append a page, numbering it after the existing ones.
    pub fn push_page(&mut self, mut page: Page) {
        page.order = self.pages.len() as u32 + 1;
        self.pages.push(page);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    /// 1-based position within the section.
    pub order: u32,
    pub blocks: Vec<ContentBlock>,
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            order: 0,
            blocks: Vec::new(),
        }
    }
}

/// One renderable unit of page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text(TextBlock),
    Image(ImageBlock),
    /// Not produced by the reconstruction heuristics; rendered if present.
    List(ListBlock),
    /// Not produced by the reconstruction heuristics; rendered if present.
    Table(TableBlock),
}

impl ContentBlock {
    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            ContentBlock::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageBlock> {
        match self {
            ContentBlock::Image(i) => Some(i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub style: TextStyle,
    /// Geometry of the paragraph this block came from. Only image anchoring
    /// reads it; it is never rendered or serialised.
    #[serde(skip)]
    pub source: Option<SourceParagraph>,
}

/// Back-reference from a text block to its source paragraph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceParagraph {
    pub ordinal: usize,
    pub page: u32,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size: Option<f64>,
    pub bold: bool,
    pub alignment: Alignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_css(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    /// Package-relative path, always `images/<name>`.
    pub path: String,
    pub alt: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBlock {
    pub items: Vec<String>,
    pub ordered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
