//! Reconstruction tests on synthetic fragment streams.
//!
//! No PDF and no pdfium library involved: every test builds the fragments a
//! PDF extractor would produce and checks the rebuilt lecture.

use pdf2scorm::lecture::{ContentBlock, DEFAULT_LECTURE_TITLE};
use pdf2scorm::pipeline::normalize::{normalize_fragments, normalize_source};
use pdf2scorm::{build_lecture, reconstruct, AssetError, BBox, Fragment, ImageSource, Lecture};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn text(s: &str, size: f64, bold: bool, page: u32, y0: f64) -> Fragment {
    Fragment::text(s, size, bold, BBox::new(72.0, y0, 500.0, y0 + size), page).unwrap()
}

fn body(s: &str, y0: f64) -> Fragment {
    text(s, 12.0, false, 1, y0)
}

fn heading(s: &str, y0: f64) -> Fragment {
    text(s, 24.0, true, 1, y0)
}

fn image(path: &str, page: u32, y0: f64, y1: f64) -> Fragment {
    Fragment::image(
        ImageSource::Reference(path.into()),
        BBox::new(100.0, y0, 400.0, y1),
        page,
    )
    .unwrap()
}

fn page_titles(lecture: &Lecture) -> Vec<&str> {
    lecture.pages().map(|p| p.title.as_str()).collect()
}

fn block_texts(lecture: &Lecture) -> Vec<Vec<String>> {
    lecture
        .pages()
        .map(|p| {
            p.blocks
                .iter()
                .map(|b| match b {
                    ContentBlock::Text(t) => t.text.clone(),
                    ContentBlock::Image(i) => format!("[img {}]", i.path),
                    ContentBlock::List(_) => "[list]".into(),
                    ContentBlock::Table(_) => "[table]".into(),
                })
                .collect()
        })
        .collect()
}

fn image_count(lecture: &Lecture) -> usize {
    lecture
        .pages()
        .flat_map(|p| &p.blocks)
        .filter(|b| b.as_image().is_some())
        .count()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn header_with_one_body_paragraph() {
    let lecture = build_lecture(&[heading("Chapter One", 72.0), body("Body text.", 120.0)]).unwrap();

    assert_eq!(lecture.sections.len(), 1);
    assert_eq!(page_titles(&lecture), vec!["Chapter One"]);
    assert_eq!(block_texts(&lecture), vec![vec!["Body text.".to_string()]]);
}

#[test]
fn two_headers_make_two_pages() {
    let lecture = build_lecture(&[
        heading("Intro", 72.0),
        body("Why operating systems exist.", 110.0),
        heading("Details", 160.0),
        body("How the scheduler picks a thread.", 200.0),
    ])
    .unwrap();

    assert_eq!(lecture.sections.len(), 1);
    assert_eq!(page_titles(&lecture), vec!["Intro", "Details"]);
    assert_eq!(
        block_texts(&lecture),
        vec![
            vec!["Why operating systems exist.".to_string()],
            vec!["How the scheduler picks a thread.".to_string()],
        ]
    );
    assert_eq!(lecture.title, "Intro");
    assert_eq!(lecture.metadata.keywords, vec!["Intro", "Details"]);
}

#[test]
fn image_only_stream() {
    let r = reconstruct(&[image("images/scan.png", 1, 0.0, 800.0)]).unwrap();
    let lecture = r.lecture;

    assert_eq!(lecture.title, DEFAULT_LECTURE_TITLE);
    assert_eq!(lecture.description, "");
    assert_eq!(lecture.sections.len(), 1);
    assert_eq!(lecture.page_count(), 1);
    assert_eq!(block_texts(&lecture), vec![vec!["[img images/scan.png]".to_string()]]);
}

#[test]
fn large_image_far_from_text_is_dropped() {
    // Text spans y 72..812, so the page is estimated 812 units tall; the
    // image covers 65 % of it and its centre is > 100 units from any text.
    let r = reconstruct(&[
        heading("Memory", 72.0),
        body("Virtual memory gives each process its own address space.", 110.0),
        image("images/poster.png", 1, 150.0, 678.0),
        body("Lecture notes, week three.", 800.0),
    ])
    .unwrap();

    assert_eq!(image_count(&r.lecture), 0);
    assert!(matches!(
        r.diagnostics.as_slice(),
        [AssetError::OversizedOrphan { page: 1, .. }]
    ));
}

#[test]
fn seventy_percent_image_five_hundred_units_from_text_never_placed() {
    // Text ends at y 1000 (page estimate); the image is 700 tall, centred at
    // 350, and the nearest body text is centred at 850.
    let r = reconstruct(&[
        image("images/appendix.png", 1, 0.0, 700.0),
        heading("Scans", 800.0),
        body("The appendix holds the scans.", 844.0),
        body("End of notes here.", 988.0),
    ])
    .unwrap();

    for page in r.lecture.pages() {
        assert!(page
            .blocks
            .iter()
            .all(|b| b.as_image().map_or(true, |i| i.path != "images/appendix.png")));
    }
    assert_eq!(r.diagnostics.len(), 1);
}

#[test]
fn small_image_lands_after_preceding_paragraph() {
    let lecture = build_lecture(&[
        heading("Paging", 50.0),
        body("A page table maps virtual pages.", 100.0),
        image("images/figure.png", 1, 130.0, 230.0),
        body("Each entry holds a frame number.", 250.0),
    ])
    .unwrap();

    assert_eq!(
        block_texts(&lecture),
        vec![vec![
            "A page table maps virtual pages.".to_string(),
            "[img images/figure.png]".to_string(),
            "Each entry holds a frame number.".to_string(),
        ]]
    );
}

#[test]
fn image_on_a_page_without_text_goes_to_covering_page() {
    // Page 2 has no text; the page spanning pages 1..3 still takes its image.
    let lecture = build_lecture(&[
        heading("Overview", 50.0),
        body("Introduction to the course.", 100.0),
        image("images/p2.png", 2, 100.0, 200.0),
        text("Summary of week one.", 12.0, false, 3, 100.0),
    ])
    .unwrap();

    assert_eq!(image_count(&lecture), 1);
}

// ── Laws ─────────────────────────────────────────────────────────────────────

#[test]
fn page_count_equals_level_one_headers() {
    let lecture = build_lecture(&[
        heading("Processes", 50.0),
        body("A process is a program in execution.", 90.0),
        heading("Threads", 140.0),
        body("Threads share an address space.", 180.0),
        heading("Scheduling", 230.0),
        body("The scheduler picks the next thread.", 270.0),
    ])
    .unwrap();
    assert_eq!(lecture.page_count(), 3);

    let flat = build_lecture(&[
        body("just some text without structure", 100.0),
        body("and more text that follows it", 114.0),
    ])
    .unwrap();
    assert_eq!(flat.page_count(), 1);
}

#[test]
fn headers_never_become_content() {
    let lecture = build_lecture(&[
        heading("Intro", 72.0),
        body("Why operating systems exist.", 110.0),
        heading("Details", 160.0),
        body("How the scheduler picks a thread.", 200.0),
    ])
    .unwrap();

    let titles: Vec<String> = page_titles(&lecture).into_iter().map(String::from).collect();
    for blocks in block_texts(&lecture) {
        for b in blocks {
            assert!(!titles.contains(&b), "header '{b}' rendered as content");
        }
    }
}

#[test]
fn paragraphs_before_first_header_are_not_paged() {
    let lecture = build_lecture(&[
        body("course code CS-301", 40.0),
        heading("Intro", 100.0),
        body("Welcome to the course.", 140.0),
    ])
    .unwrap();

    assert_eq!(page_titles(&lecture), vec!["Intro"]);
    assert_eq!(block_texts(&lecture), vec![vec!["Welcome to the course.".to_string()]]);
}

#[test]
fn reconstruction_is_deterministic() {
    let fragments = vec![
        heading("Intro", 72.0),
        body("Why operating systems exist.", 110.0),
        image("images/a.png", 1, 130.0, 180.0),
        heading("Details", 220.0),
        body("How the scheduler picks a thread.", 260.0),
    ];
    let a = build_lecture(&fragments).unwrap();
    let b = build_lecture(&fragments).unwrap();

    assert_eq!(page_titles(&a), page_titles(&b));
    assert_eq!(block_texts(&a), block_texts(&b));
    assert_eq!(a.title, b.title);
    assert_eq!(a.language, b.language);
}

#[test]
fn gap_just_under_merge_limit_merges() {
    let lecture = build_lecture(&[
        body("the kernel schedules", 100.0),
        body("threads on every core", 112.0 + 14.9),
    ])
    .unwrap();
    assert_eq!(
        block_texts(&lecture),
        vec![vec!["the kernel schedules threads on every core".to_string()]]
    );
}

#[test]
fn gap_just_over_force_limit_splits() {
    let lecture = build_lecture(&[
        body("the kernel schedules", 100.0),
        body("threads on every core", 112.0 + 25.1),
    ])
    .unwrap();
    assert_eq!(lecture.page_count(), 1);
    assert_eq!(block_texts(&lecture)[0].len(), 2);
}

#[test]
fn language_follows_script() {
    let ru = build_lecture(&[
        heading("Введение", 72.0),
        body("Операционная система управляет ресурсами.", 110.0),
    ])
    .unwrap();
    assert_eq!(ru.language, "ru");

    let en = build_lecture(&[heading("Intro", 72.0), body("An operating system.", 110.0)]).unwrap();
    assert_eq!(en.language, "en");
}

// ── Image normalisation ──────────────────────────────────────────────────────

#[test]
fn canonical_reference_is_left_alone() {
    let tmp = TempDir::new().unwrap();
    let source = ImageSource::Reference("images/fig.png".into());
    let once = normalize_source(&source, tmp.path()).unwrap();
    let twice = normalize_source(&ImageSource::Reference(once.clone()), tmp.path()).unwrap();
    assert_eq!(once, "images/fig.png");
    assert_eq!(twice, once);
}

#[test]
fn unresolvable_sources_are_dropped_with_diagnostics() {
    let tmp = TempDir::new().unwrap();
    let normalized = normalize_fragments(
        vec![
            body("Some text.", 100.0),
            image("blob:https://example.com/1", 1, 120.0, 160.0),
            image("/no/such/file.png", 1, 170.0, 200.0),
        ],
        tmp.path(),
    );
    assert_eq!(normalized.fragments.len(), 1);
    assert!(normalized.fragments[0].is_text());
    assert_eq!(normalized.diagnostics.len(), 2);
    assert!(matches!(normalized.diagnostics[0], AssetError::BlobReference { .. }));
    assert!(matches!(normalized.diagnostics[1], AssetError::NotFound { .. }));
}
