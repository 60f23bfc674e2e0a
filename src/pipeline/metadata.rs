//! MetadataExtractor: title, description, language and keywords.
//!
//! Headers are matched by ordinal, never by position in the paragraph
//! slice, so the same code stays correct if paragraphs are ever filtered
//! before reaching this stage.

use crate::lecture::{DEFAULT_LANGUAGE, DEFAULT_LECTURE_TITLE};
use crate::pipeline::headers::Header;
use crate::pipeline::paragraphs::Paragraph;
use std::collections::HashSet;

const TITLE_MAX_CHARS: usize = 200;
const DESCRIPTION_MIN_CHARS: usize = 10;
const DESCRIPTION_MAX_PARTS: usize = 2;
const DESCRIPTION_MAX_CHARS: usize = 500;
const LANGUAGE_SAMPLE_PARAGRAPHS: usize = 10;
const MAX_KEYWORDS: usize = 10;

/// Document-level descriptors derived from the paragraph sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub title: String,
    pub description: String,
    pub language: String,
    pub keywords: Vec<String>,
}

pub fn extract_metadata(paragraphs: &[Paragraph], headers: &[Header]) -> DocumentInfo {
    DocumentInfo {
        title: lecture_title(paragraphs, headers),
        description: description(paragraphs, headers),
        language: detect_language(paragraphs).to_string(),
        keywords: keywords(headers),
    }
}

/// First level-1 header, else first header, else the first short paragraph.
pub fn lecture_title(paragraphs: &[Paragraph], headers: &[Header]) -> String {
    if let Some(h) = headers.iter().find(|h| h.level == 1).or(headers.first()) {
        return h.text.clone();
    }
    paragraphs
        .iter()
        .map(|p| p.text.trim())
        .find(|t| !t.is_empty() && t.chars().count() < TITLE_MAX_CHARS)
        .map_or_else(|| DEFAULT_LECTURE_TITLE.to_string(), str::to_string)
}

/// The first one or two substantial body paragraphs, capped at 500 chars.
pub fn description(paragraphs: &[Paragraph], headers: &[Header]) -> String {
    let header_ordinals: HashSet<usize> = headers.iter().map(|h| h.ordinal).collect();

    let mut parts: Vec<&str> = Vec::new();
    for para in paragraphs {
        if header_ordinals.contains(&para.ordinal) {
            continue;
        }
        let text = para.text.trim();
        if text.chars().count() < DESCRIPTION_MIN_CHARS {
            continue;
        }
        parts.push(text);
        if parts.len() >= DESCRIPTION_MAX_PARTS
            || parts.join(" ").chars().count() > DESCRIPTION_MAX_CHARS
        {
            break;
        }
    }

    let joined = parts.join(" ");
    if joined.chars().count() > DESCRIPTION_MAX_CHARS {
        let mut cut: String = joined.chars().take(DESCRIPTION_MAX_CHARS - 3).collect();
        cut.push_str("...");
        cut
    } else {
        joined
    }
}

/// `"ru"` when Cyrillic letters exceed 30 % of ASCII letters in the first
/// ten paragraphs longer than three characters, else `"en"`.
pub fn detect_language(paragraphs: &[Paragraph]) -> &'static str {
    let sample: Vec<&str> = paragraphs
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| t.chars().count() > 3)
        .take(LANGUAGE_SAMPLE_PARAGRAPHS)
        .collect();
    if sample.is_empty() {
        return DEFAULT_LANGUAGE;
    }

    let combined = sample.join(" ");
    let cyrillic = combined
        .chars()
        .filter(|c| ('\u{0400}'..='\u{04FF}').contains(c))
        .count();
    let latin = combined.chars().filter(char::is_ascii_alphabetic).count();

    if cyrillic as f64 > latin as f64 * 0.3 {
        "ru"
    } else {
        "en"
    }
}

/// Up to ten level-1 header texts.
pub fn keywords(headers: &[Header]) -> Vec<String> {
    headers
        .iter()
        .filter(|h| h.level == 1)
        .take(MAX_KEYWORDS)
        .map(|h| h.text.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{BBox, Fragment};

    fn para(text: &str, ordinal: usize) -> Paragraph {
        let frag = Fragment::text(text, 12.0, false, BBox::default(), 1).unwrap();
        Paragraph {
            fragments: vec![frag],
            text: text.to_string(),
            font_size: 12.0,
            bold: false,
            bbox: BBox::default(),
            page: 1,
            line_count: 1,
            ordinal,
            header_level: 0,
        }
    }

    fn header(text: &str, level: u8, ordinal: usize) -> Header {
        Header {
            level,
            text: text.into(),
            ordinal,
        }
    }

    #[test]
    fn title_prefers_level_one_header() {
        let headers = vec![header("Sub", 2, 0), header("Main", 1, 3)];
        assert_eq!(lecture_title(&[], &headers), "Main");
        assert_eq!(lecture_title(&[], &headers[..1]), "Sub");
    }

    #[test]
    fn title_falls_back_to_short_paragraph_then_placeholder() {
        let long = "x".repeat(250);
        let paras = vec![para(&long, 0), para("Short intro", 1)];
        assert_eq!(lecture_title(&paras, &[]), "Short intro");
        assert_eq!(lecture_title(&[para(&long, 0)], &[]), DEFAULT_LECTURE_TITLE);
    }

    #[test]
    fn description_skips_headers_by_ordinal_and_short_text() {
        let paras = vec![
            para("Heading that is long enough", 0),
            para("tiny", 1),
            para("First real paragraph.", 2),
            para("Second real paragraph.", 3),
            para("Third real paragraph.", 4),
        ];
        let headers = vec![header("Heading that is long enough", 1, 0)];
        assert_eq!(
            description(&paras, &headers),
            "First real paragraph. Second real paragraph."
        );
    }

    #[test]
    fn description_is_truncated_with_ellipsis() {
        let paras = vec![para(&"a".repeat(600), 0)];
        let d = description(&paras, &[]);
        assert_eq!(d.chars().count(), 500);
        assert!(d.ends_with("..."));
    }

    #[test]
    fn description_empty_without_body_text() {
        assert_eq!(description(&[], &[]), "");
    }

    #[test]
    fn language_detection() {
        assert_eq!(detect_language(&[para("Введение в программирование", 0)]), "ru");
        assert_eq!(detect_language(&[para("Introduction to programming", 0)]), "en");
        assert_eq!(detect_language(&[]), "ru");
    }

    #[test]
    fn keywords_are_level_one_headers_capped_at_ten() {
        let mut headers: Vec<Header> = (0..12).map(|i| header(&format!("H{i}"), 1, i)).collect();
        headers.insert(0, header("minor", 2, 100));
        let kw = keywords(&headers);
        assert_eq!(kw.len(), 10);
        assert_eq!(kw[0], "H0");
        assert!(!kw.contains(&"minor".to_string()));
    }
}
