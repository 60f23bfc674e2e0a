//! Per-page HTML rendering.
//!
//! Every lecture page becomes one self-contained document: a fixed template
//! (styles + player script) around the page's content blocks in order. The
//! template is parameterised only through the `--accent` CSS variable, the
//! `data-theme` attribute and the `window.SCORM_CONFIG` JSON object, so no
//! caller-supplied value is ever spliced into CSS or script source.

use crate::config::PackageOptions;
use crate::lecture::{ContentBlock, ImageBlock, ListBlock, Page, TableBlock, TextBlock};
use once_cell::sync::Lazy;
use quick_xml::escape::{escape, unescape};
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Where a page sits in the lecture, for the player script.
#[derive(Debug, Clone, Copy)]
pub struct PagePosition {
    /// 1-based.
    pub number: usize,
    pub total: usize,
}

/// Render one lecture page.
///
/// Image blocks whose path is not in `available` are left out; the package
/// writer has already reported them.
pub fn render_page(
    page: &Page,
    position: PagePosition,
    lecture_title: &str,
    language: &str,
    options: &PackageOptions,
    available: &HashSet<&str>,
) -> String {
    let title = clean_title(&page.title);
    let mut html = String::with_capacity(16 * 1024);

    html.push_str("<!DOCTYPE html>\n<html lang=\"");
    html.push_str(&escape(language));
    html.push_str("\" data-theme=\"");
    html.push_str(options.theme.as_str());
    html.push_str("\">\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>");
    html.push_str(&escape(title.as_str()));
    html.push_str("</title>\n<style>\n:root { --accent: ");
    html.push_str(&options.accent_color);
    html.push_str("; }\n");
    html.push_str(STYLES);
    html.push_str("</style>\n<script src=\"");
    html.push_str(super::SHIM_FILE);
    html.push_str("\"></script>\n<script>\nwindow.SCORM_CONFIG = ");
    html.push_str(&config_json(lecture_title, options, position));
    html.push_str(";\n</script>\n</head>\n<body>\n<div class=\"container\">\n");
    html.push_str("<div class=\"header\"><h1>");
    html.push_str(&escape(title.as_str()));
    html.push_str("</h1><div class=\"page-counter\">");
    html.push_str(&format!("{} / {}", position.number, position.total));
    html.push_str("</div></div>\n<div class=\"content\">\n");

    for block in &page.blocks {
        if let ContentBlock::Image(img) = block {
            let member = super::canonical_member(&img.path);
            if !available.contains(member.as_str()) {
                continue;
            }
            html.push_str(&render_image(&ImageBlock {
                path: member,
                ..img.clone()
            }));
        } else {
            html.push_str(&render_block(block));
        }
        html.push('\n');
    }

    html.push_str("</div>\n</div>\n<script>\n");
    html.push_str(PLAYER_SCRIPT);
    html.push_str("</script>\n</body>\n</html>\n");
    html
}

/// Page title with markup removed and whitespace collapsed (not yet escaped).
pub fn clean_title(title: &str) -> String {
    let stripped = TAG.replace_all(title, "");
    let decoded = unescape(&stripped).map_or_else(|_| stripped.to_string(), |s| s.into_owned());
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Player settings as a JSON literal that is safe inside `<script>`.
fn config_json(lecture_title: &str, options: &PackageOptions, position: PagePosition) -> String {
    json!({
        "title": lecture_title,
        "playerStyle": {
            "primaryColor": options.accent_color,
            "theme": options.theme.as_str(),
        },
        "progressCompletion": {
            "completionThreshold": options.completion_threshold,
            "progressMethod": options.progress_method.as_str(),
            "rememberLastPage": options.remember_last_page,
        },
        "pageNum": position.number,
        "totalPages": position.total,
    })
    .to_string()
    .replace("</", "<\\/")
}

pub fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Text(t) => render_text(t),
        ContentBlock::Image(i) => render_image(i),
        ContentBlock::List(l) => render_list(l),
        ContentBlock::Table(t) => render_table(t),
    }
}

fn render_text(block: &TextBlock) -> String {
    let mut style = String::new();
    if let Some(size) = block.style.font_size {
        style.push_str(&format!("font-size: {:.1}px; ", size));
    }
    if block.style.bold {
        style.push_str("font-weight: bold; ");
    }
    style.push_str(&format!("text-align: {};", block.style.alignment.as_css()));

    let mut body = escape(block.text.as_str()).replace('\n', "<br>");
    if block.style.bold {
        body = format!("<strong>{body}</strong>");
    }
    let class = if block.style.bold {
        "content-block text-block bold"
    } else {
        "content-block text-block"
    };
    format!("<div class=\"{class}\" style=\"{style}\">{body}</div>")
}

fn render_image(block: &ImageBlock) -> String {
    let mut html = format!(
        "<div class=\"content-block image-block\"><img src=\"{}\" alt=\"{}\"",
        escape(block.path.as_str()),
        escape(block.alt.as_str())
    );
    if let (Some(w), Some(h)) = (block.width, block.height) {
        if w > 0.0 && h > 0.0 {
            html.push_str(&format!(" width=\"{:.0}\" height=\"{:.0}\"", w, h));
        }
    }
    html.push('>');
    if let Some(caption) = block.caption.as_deref().filter(|c| !c.trim().is_empty()) {
        html.push_str("<div class=\"caption\">");
        html.push_str(&escape(caption));
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

fn render_list(block: &ListBlock) -> String {
    let tag = if block.ordered { "ol" } else { "ul" };
    let items: String = block
        .items
        .iter()
        .map(|item| format!("<li>{}</li>", escape(item.as_str())))
        .collect();
    format!("<div class=\"content-block list-block\"><{tag}>{items}</{tag}></div>")
}

fn render_table(block: &TableBlock) -> String {
    if block.rows.is_empty() && block.headers.is_empty() {
        return String::new();
    }
    let mut html = String::from("<div class=\"content-block table-block\"><table>");
    if !block.headers.is_empty() {
        html.push_str("<thead><tr>");
        for h in &block.headers {
            html.push_str(&format!("<th>{}</th>", escape(h.as_str())));
        }
        html.push_str("</tr></thead>");
    }
    html.push_str("<tbody>");
    for row in &block.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape(cell.as_str())));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");
    html
}

// ── Template ─────────────────────────────────────────────────────────────

const STYLES: &str = r#"* { margin: 0; padding: 0; box-sizing: border-box; }
:root { --bg: #f5f5f5; --card: #ffffff; --fg: #333333; --muted: #666666; --rule: #dddddd; }
[data-theme="dark"] { --bg: #111827; --card: #1f2937; --fg: #e5e7eb; --muted: #9ca3af; --rule: #374151; }
@media (prefers-color-scheme: dark) {
  [data-theme="auto"] { --bg: #111827; --card: #1f2937; --fg: #e5e7eb; --muted: #9ca3af; --rule: #374151; }
}
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
  line-height: 1.6; color: var(--fg); background-color: var(--bg); padding: 20px; }
.container { max-width: 1200px; margin: 0 auto; background: var(--card); border-radius: 8px;
  box-shadow: 0 2px 10px rgba(0,0,0,0.1); overflow: hidden; }
.header { background: var(--accent); color: #ffffff; padding: 20px; text-align: center; }
.header h1 { font-size: 24px; margin: 0; }
.header .page-counter { font-size: 13px; opacity: 0.85; margin-top: 4px; }
.content { padding: 30px; }
.content-block { margin-bottom: 20px; }
.text-block { font-size: 16px; line-height: 1.8; white-space: pre-wrap; word-wrap: break-word; }
.text-block.bold { font-weight: bold; }
.image-block { text-align: center; margin: 20px 0; }
.image-block img { max-width: 100%; height: auto; border-radius: 4px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }
.image-block .caption { margin-top: 10px; font-style: italic; color: var(--muted); }
.list-block { margin: 20px 0; padding-left: 30px; }
.list-block li { margin: 8px 0; }
.table-block { margin: 20px 0; overflow-x: auto; }
.table-block table { width: 100%; border-collapse: collapse; margin: 10px 0; }
.table-block th, .table-block td { border: 1px solid var(--rule); padding: 12px; text-align: left; }
.table-block th { background-color: var(--accent); color: #ffffff; font-weight: bold; }
"#;

const PLAYER_SCRIPT: &str = r#"(function () {
  var cfg = window.SCORM_CONFIG || {};
  var progressCfg = cfg.progressCompletion || {};
  var scorm = (window.pipwerks && pipwerks.SCORM) ? pipwerks.SCORM : null;
  var pageNum = cfg.pageNum || 1;
  var totalPages = cfg.totalPages || 1;
  var threshold = typeof progressCfg.completionThreshold === "number" ? progressCfg.completionThreshold : 80;
  var method = progressCfg.progressMethod || "screens";
  var started = new Date().getTime();
  var active = false;

  function readProgress() {
    var raw = scorm.get("cmi.suspend_data");
    if (!raw) { return { visitedPages: [], lastPage: pageNum }; }
    try {
      var parsed = JSON.parse(raw);
      if (!parsed.visitedPages) { parsed.visitedPages = []; }
      return parsed;
    } catch (e) {
      return { visitedPages: [], lastPage: pageNum };
    }
  }

  function save() {
    if (!active) { return; }
    var data = readProgress();
    if (data.visitedPages.indexOf(pageNum) < 0) { data.visitedPages.push(pageNum); }
    data.lastPage = pageNum;
    var visited = data.visitedPages.length;
    var progress = method === "combined" ? (visited / totalPages) * 50 : (visited / totalPages) * 100;

    if (progressCfg.rememberLastPage !== false) { scorm.set("cmi.location", String(pageNum)); }
    scorm.set("cmi.suspend_data", JSON.stringify(data));
    scorm.set("cmi.progress_measure", String(Math.min(1, visited / totalPages)));
    if (progress >= threshold || visited === totalPages) {
      scorm.set("cmi.completion_status", "completed");
    } else if (scorm.get("cmi.completion_status") !== "completed") {
      scorm.set("cmi.completion_status", "incomplete");
    }
    var seconds = Math.round((new Date().getTime() - started) / 1000);
    scorm.set("cmi.session_time", "PT" + seconds + "S");
    scorm.save();
  }

  window.addEventListener("load", function () {
    if (!scorm) { return; }
    scorm.version = "2004";
    active = scorm.init();
    if (!active) { return; }
    var status = scorm.get("cmi.completion_status");
    if (!status || status === "not attempted" || status === "unknown") {
      scorm.set("cmi.completion_status", "incomplete");
    }
    save();
  });

  window.addEventListener("beforeunload", function () {
    if (!active) { return; }
    save();
    scorm.quit();
    active = false;
  });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Theme;
    use crate::lecture::{Alignment, TextStyle};

    fn text(s: &str, bold: bool) -> ContentBlock {
        ContentBlock::Text(TextBlock {
            text: s.into(),
            style: TextStyle {
                font_size: Some(12.0),
                bold,
                alignment: Alignment::Left,
            },
            source: None,
        })
    }

    fn image(path: &str) -> ContentBlock {
        ContentBlock::Image(ImageBlock {
            path: path.into(),
            alt: String::new(),
            width: Some(200.0),
            height: Some(100.0),
            caption: None,
        })
    }

    fn render(page: &Page, options: &PackageOptions, available: &[&str]) -> String {
        let available: HashSet<&str> = available.iter().copied().collect();
        render_page(
            page,
            PagePosition { number: 2, total: 5 },
            "Lecture",
            "en",
            options,
            &available,
        )
    }

    #[test]
    fn text_is_escaped_and_bold_wrapped() {
        let html = render_block(&text("a < b & \"c\"\nnext", true));
        assert!(html.contains("a &lt; b &amp; &quot;c&quot;<br>next"));
        assert!(html.contains("<strong>"));
        assert!(html.contains("text-block bold"));
        assert!(html.contains("text-align: left;"));
    }

    #[test]
    fn blocks_render_in_order() {
        let mut page = Page::new("Intro");
        page.blocks = vec![text("first", false), image("images/a.png"), text("second", false)];
        let html = render(&page, &PackageOptions::default(), &["images/a.png"]);
        let first = html.find("first").unwrap();
        let img = html.find("src=\"images/a.png\"").unwrap();
        let second = html.find("second").unwrap();
        assert!(first < img && img < second);
        assert!(html.contains("width=\"200\" height=\"100\""));
    }

    #[test]
    fn unavailable_images_are_skipped() {
        let mut page = Page::new("Intro");
        page.blocks = vec![image("images/missing.png")];
        let html = render(&page, &PackageOptions::default(), &[]);
        assert!(!html.contains("images/missing.png"));
    }

    #[test]
    fn title_is_stripped_and_escaped() {
        let page = Page::new("<b>Pointers</b> &amp;   references");
        let html = render(&page, &PackageOptions::default(), &[]);
        assert!(html.contains("<title>Pointers &amp; references</title>"));
        assert!(html.contains("<h1>Pointers &amp; references</h1>"));
    }

    #[test]
    fn config_is_embedded_safely() {
        let options = PackageOptions {
            theme: Theme::Dark,
            ..PackageOptions::default()
        };
        let page = Page::new("p");
        let available = HashSet::new();
        let html = render_page(
            &page,
            PagePosition { number: 1, total: 1 },
            "</script><script>alert(1)",
            "ru",
            &options,
            &available,
        );
        assert!(!html.contains("</script><script>alert"));
        assert!(html.contains("data-theme=\"dark\""));
        assert!(html.contains("\"completionThreshold\":80.0"));
        assert!(html.contains("--accent: #0ea5e9;"));
        assert!(html.contains("<html lang=\"ru\""));
    }

    #[test]
    fn list_and_table_markup() {
        let list = render_block(&ContentBlock::List(ListBlock {
            items: vec!["one".into(), "two".into()],
            ordered: true,
        }));
        assert_eq!(
            list,
            "<div class=\"content-block list-block\"><ol><li>one</li><li>two</li></ol></div>"
        );
        let table = render_block(&ContentBlock::Table(TableBlock {
            headers: vec!["h".into()],
            rows: vec![vec!["c".into()]],
        }));
        assert!(table.contains("<thead><tr><th>h</th></tr></thead><tbody><tr><td>c</td></tr></tbody>"));
    }
}
