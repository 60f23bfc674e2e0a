//! Configuration types for PDF-to-SCORM conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The slice the package writer needs is
//! split out as [`PackageOptions`], which is plain data and can be shipped
//! through JSON by an HTTP front-end.
//!
//! # Design choice: clamp, don't reject
//! The completion threshold and accent colour come straight from course
//! authors. Out-of-range values are pulled back into range by the setters so
//! a typo never costs a conversion; [`ConversionConfigBuilder::build`] only
//! fails on values no clamping can repair.

use crate::error::ConvertError;
use crate::pipeline::extract::FallbackTextSource;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default completion threshold, in percent of pages visited.
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 80.0;
/// Default accent colour of the page template.
pub const DEFAULT_ACCENT_COLOR: &str = "#0ea5e9";

/// Configuration for a PDF-to-SCORM conversion.
///
/// # Example
/// ```rust
/// use pdf2scorm::{ConversionConfig, Theme};
///
/// let config = ConversionConfig::builder()
///     .completion_threshold(90.0)
///     .accent_color("#7c3aed")
///     .theme(Theme::Dark)
///     .title("Operating Systems, Lecture 3")
///     .build()
///     .unwrap();
/// assert_eq!(config.package.completion_threshold, 90.0);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Serializer settings: threshold, accent colour, player behaviour.
    pub package: PackageOptions,

    /// Overrides the title derived from the document's headers.
    pub title: Option<String>,

    /// Overrides the author read from the PDF's metadata.
    pub author: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Longest edge, in pixels, of pages rasterised for the fallback text
    /// source. Default: 2000.
    ///
    /// A 300-DPI render of an A0 poster would be 10 000 × 14 000 px; this cap
    /// keeps memory bounded whatever the physical page size.
    pub max_rendered_pixels: u32,

    /// Reads text from pages that have no text layer. Default: none, such
    /// pages contribute only their images.
    pub fallback: Option<Arc<dyn FallbackTextSource>>,

    /// Receives per-page extraction events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            package: PackageOptions::default(),
            title: None,
            author: None,
            pages: PageSelection::default(),
            password: None,
            max_rendered_pixels: 2000,
            fallback: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("package", &self.package)
            .field("title", &self.title)
            .field("author", &self.author)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("fallback", &self.fallback.as_ref().map(|f| f.name()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    /// Percentage of pages a learner must visit, clamped to 0–100.
    pub fn completion_threshold(mut self, percent: f64) -> Self {
        self.config.package.completion_threshold = clamp_threshold(percent);
        self
    }

    pub fn accent_color(mut self, color: impl AsRef<str>) -> Self {
        self.config.package.accent_color = sanitize_color(color.as_ref());
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.config.package.theme = theme;
        self
    }

    pub fn progress_method(mut self, method: ProgressMethod) -> Self {
        self.config.package.progress_method = method;
        self
    }

    pub fn remember_last_page(mut self, v: bool) -> Self {
        self.config.package.remember_last_page = v;
        self
    }

    pub fn package_options(mut self, options: PackageOptions) -> Self {
        self.config.package = options.sanitized();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.config.author = Some(author.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn fallback(mut self, source: Arc<dyn FallbackTextSource>) -> Self {
        self.config.fallback = Some(source);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ConvertError::InvalidConfig(
                "title override must not be blank".into(),
            ));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || end < start {
                return Err(ConvertError::InvalidConfig(format!(
                    "page range {start}-{end} is empty (pages are 1-based)"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Package options ──────────────────────────────────────────────────────

/// Everything the package writer needs besides the lecture itself.
///
/// Embedded verbatim (as JSON) in every rendered page for the player script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageOptions {
    /// Percent of pages to visit before the course counts as complete (0–100).
    pub completion_threshold: f64,
    /// CSS colour for headings, links and the progress bar.
    pub accent_color: String,
    pub theme: Theme,
    pub progress_method: ProgressMethod,
    /// Reopen the course at the last visited page.
    pub remember_last_page: bool,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
            theme: Theme::default(),
            progress_method: ProgressMethod::default(),
            remember_last_page: true,
        }
    }
}

impl PackageOptions {
    /// Copy with the threshold clamped and the colour made template-safe.
    ///
    /// Needed for options that bypassed the builder, e.g. deserialised ones.
    pub fn sanitized(&self) -> Self {
        Self {
            completion_threshold: clamp_threshold(self.completion_threshold),
            accent_color: sanitize_color(&self.accent_color),
            ..self.clone()
        }
    }

    /// The threshold as a 0.0–1.0 measure.
    pub fn normalized_threshold(&self) -> f64 {
        clamp_threshold(self.completion_threshold) / 100.0
    }
}

fn clamp_threshold(percent: f64) -> f64 {
    if percent.is_nan() {
        DEFAULT_COMPLETION_THRESHOLD
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Drop characters that could close the surrounding CSS rule or HTML tag.
fn sanitize_color(color: &str) -> String {
    let cleaned: String = color
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '{' | '}' | ';' | '"' | '\''))
        .collect();
    if cleaned.is_empty() {
        DEFAULT_ACCENT_COLOR.to_string()
    } else {
        cleaned
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Colour scheme of the rendered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Follow the learner's system preference. (default)
    #[default]
    Auto,
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Auto => "auto",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// How the player script measures progress towards the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMethod {
    /// Pages visited out of pages total. (default)
    #[default]
    Screens,
    /// Pages visited, weighted by time spent on each.
    Combined,
}

impl ProgressMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressMethod::Screens => "screens",
            ProgressMethod::Combined => "combined",
        }
    }
}

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The first requested page (1-based), for error messages.
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
        }
    }
}
