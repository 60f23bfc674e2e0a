//! `imsmanifest.xml` for SCORM 2004 4th Edition.
//!
//! The manifest is built as a small element tree and serialised in one pass
//! so element nesting can never go out of balance. Layout:
//!
//! ```text
//! manifest
//! ├── metadata          schema / schemaversion
//! ├── organizations
//! │   └── organization  one per lecture
//! │       └── item      one per section, sequencing after its pages
//! │           └── item  one per page → resource
//! └── resources
//!     └── resource      one SCO per page: page, shim, page images
//! ```

use crate::config::PackageOptions;
use crate::lecture::Lecture;
use quick_xml::escape::escape;

const NS_IMSCP: &str = "http://www.imsglobal.org/xsd/imscp_v1p1";
const NS_ADLCP: &str = "http://www.adlnet.org/xsd/adlcp_v1p3";
const NS_ADLSEQ: &str = "http://www.adlnet.org/xsd/adlseq_v1p3";
const NS_ADLNAV: &str = "http://www.adlnet.org/xsd/adlnav_v1p3";
const NS_IMSSS: &str = "http://www.imsglobal.org/xsd/imsss";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://www.imsglobal.org/xsd/imscp_v1p1 imscp_v1p1.xsd \
http://www.adlnet.org/xsd/adlcp_v1p3 adlcp_v1p3.xsd \
http://www.adlnet.org/xsd/adlseq_v1p3 adlseq_v1p3.xsd \
http://www.adlnet.org/xsd/adlnav_v1p3 adlnav_v1p3.xsd \
http://www.imsglobal.org/xsd/imsss imsss.xsd";

const ORGANIZATION_ID: &str = "TOC1";

/// A minimal XML element: attributes, optional text, children.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// First direct child called `name`.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Value of attribute `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Serialise with an XML declaration and two-space indentation.
    pub fn to_document(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write(&mut out, 0);
        out
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape(v.as_str()));
            out.push('"');
        }

        match (&self.text, self.children.is_empty()) {
            (None, true) => out.push_str("/>\n"),
            (Some(text), true) => {
                out.push('>');
                out.push_str(&escape(text.as_str()));
                out.push_str("</");
                out.push_str(&self.name);
                out.push_str(">\n");
            }
            (text, false) => {
                out.push_str(">\n");
                if let Some(text) = text {
                    out.push_str(&indent);
                    out.push_str("  ");
                    out.push_str(&escape(text.as_str()));
                    out.push('\n');
                }
                for child in &self.children {
                    child.write(out, depth + 1);
                }
                out.push_str(&indent);
                out.push_str("</");
                out.push_str(&self.name);
                out.push_str(">\n");
            }
        }
    }
}

/// `SCORM_<title>` with every non-alphanumeric character replaced by `_`.
pub fn manifest_identifier(title: &str) -> String {
    let body: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("SCORM_{body}")
}

/// Build the manifest tree.
///
/// `page_images[i]` lists the packaged images of the i-th page in reading
/// order (pages numbered across all sections).
pub fn build_manifest(
    lecture: &Lecture,
    page_images: &[Vec<String>],
    options: &PackageOptions,
) -> XmlElement {
    let mut organization = XmlElement::new("organization")
        .attr("identifier", ORGANIZATION_ID)
        .child(XmlElement::new("title").text(lecture.title.as_str()));
    let mut resources = XmlElement::new("resources");

    let threshold = options.normalized_threshold();
    let mut page_number = 0usize;

    for section in &lecture.sections {
        let mut section_item = XmlElement::new("item")
            .attr("identifier", format!("SECTION_{}", section.id))
            .child(XmlElement::new("title").text(section.title.as_str()));

        for page in &section.pages {
            page_number += 1;
            let resource_id = format!("RES_PAGE_{page_number}");
            let href = super::page_file_name(page_number);

            section_item.push(
                XmlElement::new("item")
                    .attr("identifier", format!("PAGE_{}", page.id))
                    .attr("identifierref", resource_id.as_str())
                    .child(XmlElement::new("title").text(super::html::clean_title(&page.title))),
            );

            let mut resource = XmlElement::new("resource")
                .attr("identifier", resource_id.as_str())
                .attr("type", "webcontent")
                .attr("adlcp:scormType", "sco")
                .attr("href", href.as_str())
                .child(XmlElement::new("file").attr("href", href.as_str()))
                .child(XmlElement::new("file").attr("href", super::SHIM_FILE));
            for image in page_images.get(page_number - 1).into_iter().flatten() {
                resource.push(XmlElement::new("file").attr("href", image.as_str()));
            }
            resources.push(resource);
        }

        if threshold > 0.0 {
            section_item.push(sequencing(&section.id, threshold));
        }
        organization.push(section_item);
    }

    XmlElement::new("manifest")
        .attr("identifier", manifest_identifier(&lecture.title))
        .attr("version", "1")
        .attr("xmlns", NS_IMSCP)
        .attr("xmlns:adlcp", NS_ADLCP)
        .attr("xmlns:adlseq", NS_ADLSEQ)
        .attr("xmlns:adlnav", NS_ADLNAV)
        .attr("xmlns:imsss", NS_IMSSS)
        .attr("xmlns:xsi", NS_XSI)
        .attr("xsi:schemaLocation", SCHEMA_LOCATION)
        .child(
            XmlElement::new("metadata")
                .child(XmlElement::new("schema").text("ADL SCORM"))
                .child(XmlElement::new("schemaversion").text("2004 4th Edition")),
        )
        .child(
            XmlElement::new("organizations")
                .attr("default", ORGANIZATION_ID)
                .child(organization),
        )
        .child(resources)
}

/// Completion rollup plus a measure-satisfied primary objective.
fn sequencing(section_id: &str, threshold: f64) -> XmlElement {
    XmlElement::new("imsss:sequencing")
        .child(
            XmlElement::new("imsss:rollupRules").child(
                XmlElement::new("imsss:rollupRule")
                    .attr("childActivitySet", "all")
                    .child(
                        XmlElement::new("imsss:rollupConditions").child(
                            XmlElement::new("imsss:rollupCondition").attr("condition", "completed"),
                        ),
                    )
                    .child(XmlElement::new("imsss:rollupAction").attr("action", "completed")),
            ),
        )
        .child(
            XmlElement::new("imsss:objectives").child(
                XmlElement::new("imsss:primaryObjective")
                    .attr("objectiveID", format!("OBJ_{section_id}"))
                    .attr("satisfiedByMeasure", "true")
                    .child(XmlElement::new("imsss:minNormalizedMeasure").text(format_measure(threshold))),
            ),
        )
}

/// `0.8`, `1.0`, `0.05`: shortest decimal, always with a fractional part.
fn format_measure(measure: f64) -> String {
    let s = format!("{measure}");
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lecture::{LectureMetadata, Page, Section};

    fn lecture(pages: &[&str]) -> Lecture {
        let mut section = Section::new("Contents", 1);
        for p in pages {
            section.push_page(Page::new(*p));
        }
        Lecture {
            title: "Intro to C".into(),
            description: String::new(),
            language: "en".into(),
            sections: vec![section],
            metadata: LectureMetadata::default(),
        }
    }

    #[test]
    fn identifier_replaces_non_alphanumerics() {
        assert_eq!(manifest_identifier("Intro to C++"), "SCORM_Intro_to_C__");
        assert_eq!(manifest_identifier("Лекция 1"), "SCORM_Лекция_1");
    }

    #[test]
    fn one_item_and_resource_per_page() {
        let lec = lecture(&["Intro", "Details"]);
        let images = vec![vec!["images/a.png".to_string()], vec![]];
        let m = build_manifest(&lec, &images, &PackageOptions::default());

        let org = m.find("organizations").unwrap().find("organization").unwrap();
        let section = org.children.iter().find(|c| c.name == "item").unwrap();
        let pages: Vec<&XmlElement> = section.children.iter().filter(|c| c.name == "item").collect();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].get("identifierref"), Some("RES_PAGE_2"));

        let res = m.find("resources").unwrap();
        assert_eq!(res.children.len(), 2);
        let first: Vec<&str> = res.children[0]
            .children
            .iter()
            .filter_map(|f| f.get("href"))
            .collect();
        assert_eq!(first, vec!["page_1.html", "SCORM_API_wrapper.js", "images/a.png"]);
        assert_eq!(res.children[1].get("adlcp:scormType"), Some("sco"));
    }

    #[test]
    fn sequencing_follows_page_items() {
        let lec = lecture(&["Intro"]);
        let m = build_manifest(&lec, &[vec![]], &PackageOptions::default());
        let org = m.find("organizations").unwrap().find("organization").unwrap();
        let section = org.find("item").unwrap();
        let last = section.children.last().unwrap();
        assert_eq!(last.name, "imsss:sequencing");
        let xml = m.to_document();
        assert!(xml.contains("<imsss:minNormalizedMeasure>0.8</imsss:minNormalizedMeasure>"));
        assert!(xml.contains("satisfiedByMeasure=\"true\""));
        assert!(xml.contains("<imsss:rollupCondition condition=\"completed\"/>"));
    }

    #[test]
    fn zero_threshold_omits_sequencing() {
        let lec = lecture(&["Intro"]);
        let options = PackageOptions {
            completion_threshold: 0.0,
            ..PackageOptions::default()
        };
        let xml = build_manifest(&lec, &[vec![]], &options).to_document();
        assert!(!xml.contains("imsss:sequencing>"));
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let el = XmlElement::new("title")
            .attr("a", "x\"y")
            .text("Fish & <Chips>");
        let xml = el.to_document();
        assert!(xml.contains("a=\"x&quot;y\""));
        assert!(xml.contains(">Fish &amp; &lt;Chips&gt;</title>"));
    }

    #[test]
    fn measure_formatting() {
        assert_eq!(format_measure(0.8), "0.8");
        assert_eq!(format_measure(1.0), "1.0");
        assert_eq!(format_measure(0.555), "0.555");
    }
}
