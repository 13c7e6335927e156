//! Rendering capabilities: view → markup ([`Renderer`]) and markup → document
//! bytes ([`DocumentProducer`]). The core never depends on a concrete backend.

use crate::error::{BillError, Result};
use crate::reports::{LayoutHint, Orientation, ReportView};
use crate::utils::{format_indian_amount, format_quantity};
use log::warn;
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera, Value};

const EMBEDDED_TEMPLATES: [(&str, &str); 6] = [
    ("first_page.html", include_str!("../templates/first_page.html")),
    ("deviation_statement.html", include_str!("../templates/deviation_statement.html")),
    ("note_sheet.html", include_str!("../templates/note_sheet.html")),
    ("certificate_ii.html", include_str!("../templates/certificate_ii.html")),
    ("certificate_iii.html", include_str!("../templates/certificate_iii.html")),
    ("extra_items.html", include_str!("../templates/extra_items.html")),
];

pub trait Renderer {
    fn render(&self, template_id: &str, view: &ReportView) -> Result<String>;
}

/// Tera-backed renderer. Templates see the view as `data` and get two filters:
/// `inr` (Indian-grouped rupees, two decimals) and `qty` (up to three decimals).
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Uses the templates compiled into the crate.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED_TEMPLATES.to_vec())
            .map_err(|e| render_error("embedded templates", &e))?;
        Ok(Self::with_filters(tera))
    }

    /// Loads `<template_id>.html` files from `dir` instead of the embedded set.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let glob = dir.join("*.html");
        let tera = Tera::new(&glob.to_string_lossy())
            .map_err(|e| render_error(&dir.display().to_string(), &e))?;
        Ok(Self::with_filters(tera))
    }

    fn with_filters(mut tera: Tera) -> Self {
        tera.register_filter("inr", inr_filter);
        tera.register_filter("qty", qty_filter);
        Self { tera }
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, template_id: &str, view: &ReportView) -> Result<String> {
        let mut context = Context::new();
        context.insert("data", view);

        self.tera
            .render(&format!("{}.html", template_id), &context)
            .map_err(|e| render_error(template_id, &e))
    }
}

fn render_error(template: &str, err: &tera::Error) -> BillError {
    // Tera keeps the useful detail in the source chain.
    let mut reason = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        reason.push_str(": ");
        reason.push_str(&inner.to_string());
        source = std::error::Error::source(inner);
    }

    BillError::Render {
        template: template.to_string(),
        reason,
    }
}

fn inr_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(format_indian_amount(value.as_f64().unwrap_or(0.0))))
}

fn qty_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(format_quantity(value.as_f64().unwrap_or(0.0))))
}

/// Minimal document built from the view header alone.
pub fn fallback_markup(view: &ReportView) -> String {
    let header = view.header();
    let title = &header.title;

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{doc}</title>
<style>body {{ font-family: Arial, sans-serif; margin: 20px; }}</style>
</head>
<body>
<h1>{doc}</h1>
<p><strong>Agreement No:</strong> {agreement}</p>
<p><strong>Name of Work:</strong> {work}</p>
<p><strong>Name of Firm:</strong> {firm}</p>
</body>
</html>
"#,
        doc = tera::escape_html(&header.document_title),
        agreement = tera::escape_html(or_na(&title.agreement_no)),
        work = tera::escape_html(or_na(&title.name_of_work)),
        firm = tera::escape_html(or_na(&title.name_of_firm)),
    )
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Renders `view` with its own template, falling back to [`fallback_markup`].
pub fn render_with_fallback(renderer: &dyn Renderer, view: &ReportView) -> String {
    let template_id = view.kind().template_id();
    match renderer.render(template_id, view) {
        Ok(markup) => markup,
        Err(e) => {
            warn!("Rendering {} failed, using fallback markup: {}", template_id, e);
            fallback_markup(view)
        }
    }
}

pub trait DocumentProducer {
    /// File extension of produced documents, without the leading dot.
    fn extension(&self) -> &str;

    fn produce(&self, markup: &str, layout: LayoutHint) -> Result<Vec<u8>>;

    /// Concatenates already produced documents, in the given order.
    fn combine(&self, documents: &[Vec<u8>]) -> Result<Vec<u8>>;
}

/// Print-ready HTML: the page setup is injected as `@page` CSS so any browser
/// or HTML-to-PDF engine lays the document out on A4.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintHtmlProducer;

impl PrintHtmlProducer {
    pub fn page_css(layout: LayoutHint) -> String {
        let orientation = match layout.orientation {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        };
        format!(
            "<style>@page {{ size: A4 {}; margin: {}mm; }}</style>",
            orientation, layout.margin_mm
        )
    }
}

impl DocumentProducer for PrintHtmlProducer {
    fn extension(&self) -> &str {
        "print.html"
    }

    fn produce(&self, markup: &str, layout: LayoutHint) -> Result<Vec<u8>> {
        let css = Self::page_css(layout);
        let document = match markup.find("<head>") {
            Some(pos) => {
                let insert_at = pos + "<head>".len();
                format!("{}\n{}{}", &markup[..insert_at], css, &markup[insert_at..])
            }
            None => format!("{}\n{}", css, markup),
        };
        Ok(document.into_bytes())
    }

    /// Each document becomes a `<section>` whose own styles are scoped to it.
    /// Landscape documents use the named `landscape` page, so orientation survives.
    fn combine(&self, documents: &[Vec<u8>]) -> Result<Vec<u8>> {
        if documents.is_empty() {
            return Err(BillError::Packaging("no documents to combine".to_string()));
        }

        let mut styles = Vec::with_capacity(documents.len());
        let mut sections = Vec::with_capacity(documents.len());
        for (idx, bytes) in documents.iter().enumerate() {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                BillError::Packaging(format!("document {} is not UTF-8: {}", idx + 1, e))
            })?;

            let scope = format!("document-{}", idx + 1);
            let (css, orientation) = scoped_styles(text, &format!("section.{}", scope));
            let class = match orientation {
                Orientation::Portrait => format!("document {}", scope),
                Orientation::Landscape => format!("document {} landscape", scope),
            };

            if !css.is_empty() {
                styles.push(css);
            }
            sections.push(format!("<section class=\"{}\">\n{}\n</section>", class, body_of(text)));
        }

        let portrait = LayoutHint::portrait();
        let landscape = LayoutHint::landscape();
        let combined = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n@page {{ size: A4 portrait; margin: {}mm; }}\n@page landscape {{ size: A4 landscape; margin: {}mm; }}\nsection.document {{ page-break-after: always; }}\nsection.landscape {{ page: landscape; }}\n{}\n</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            portrait.margin_mm,
            landscape.margin_mm,
            styles.join("\n"),
            sections.join("\n")
        );
        Ok(combined.into_bytes())
    }
}

fn body_of(html: &str) -> &str {
    let Some(open) = html.find("<body") else {
        return html;
    };
    let Some(start) = html[open..].find('>').map(|i| open + i + 1) else {
        return html;
    };
    let end = html[start..].find("</body>").map(|i| start + i).unwrap_or(html.len());
    &html[start..end]
}

/// Contents of every `<style>` element, in document order.
fn style_blocks(html: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = html;
    while let Some(open) = rest.find("<style") {
        let Some(start) = rest[open..].find('>').map(|i| open + i + 1) else {
            break;
        };
        let Some(end) = rest[start..].find("</style>").map(|i| start + i) else {
            break;
        };
        blocks.push(&rest[start..end]);
        rest = &rest[end + "</style>".len()..];
    }
    blocks
}

/// Rewrites a document's CSS so every rule applies under `scope` only. `body`
/// selectors become the scope itself. `@page` rules are dropped and only tell
/// the document's orientation; other at-rules are dropped.
fn scoped_styles(html: &str, scope: &str) -> (String, Orientation) {
    let mut orientation = Orientation::Portrait;
    let mut rules = Vec::new();

    for block in style_blocks(html) {
        for chunk in block.split('}') {
            let Some((selectors, declarations)) = chunk.split_once('{') else {
                continue;
            };
            let selectors = selectors.trim();

            if selectors.starts_with("@page") {
                if declarations.contains("landscape") {
                    orientation = Orientation::Landscape;
                }
                continue;
            }
            if selectors.is_empty() || selectors.starts_with('@') {
                continue;
            }

            let scoped: Vec<String> = selectors
                .split(',')
                .map(|selector| scope_selector(selector.trim(), scope))
                .collect();
            rules.push(format!("{} {{{}}}", scoped.join(", "), declarations));
        }
    }

    (rules.join("\n"), orientation)
}

fn scope_selector(selector: &str, scope: &str) -> String {
    if selector == "body" || selector == "html" {
        scope.to_string()
    } else if let Some(rest) = selector.strip_prefix("body ") {
        format!("{} {}", scope, rest.trim_start())
    } else {
        format!("{} {}", scope, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{assemble_view, ReportKind};
    use crate::schema::{ReportData, TitleInfo};

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&self, template_id: &str, _view: &ReportView) -> Result<String> {
            Err(BillError::Render {
                template: template_id.to_string(),
                reason: "backend offline".to_string(),
            })
        }
    }

    fn sample_data() -> ReportData {
        ReportData {
            title: TitleInfo {
                agreement_no: "AG 48 of 2023-24".to_string(),
                name_of_work: "Road <repair>".to_string(),
                name_of_firm: "ABC & Sons".to_string(),
                ..Default::default()
            },
            premium_rate: 0.04,
            ..Default::default()
        }
    }

    #[test]
    fn test_embedded_templates_render_every_kind() {
        let renderer = TeraRenderer::new().unwrap();
        let data = sample_data();

        for kind in ReportKind::ALL {
            let view = assemble_view(&data, kind);
            let html = renderer.render(kind.template_id(), &view).unwrap();
            assert!(html.contains(kind.document_title()), "{} missing title", kind);
            assert!(html.contains("AG 48 of 2023-24"));
        }
    }

    #[test]
    fn test_unknown_template_is_render_error() {
        let renderer = TeraRenderer::new().unwrap();
        let view = assemble_view(&sample_data(), ReportKind::NoteSheet);
        let err = renderer.render("missing_template", &view).unwrap_err();
        assert!(matches!(err, BillError::Render { .. }));
    }

    #[test]
    fn test_templates_from_directory_replace_embedded_set() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("note_sheet.html"),
            "<p>{{ data.header.title.agreement_no }} pays {{ data.summary.net_payable | inr }}</p>",
        )
        .unwrap();

        let renderer = TeraRenderer::from_dir(dir.path()).unwrap();
        let view = assemble_view(&sample_data(), ReportKind::NoteSheet);
        let html = renderer.render("note_sheet", &view).unwrap();
        assert_eq!(html, "<p>AG 48 of 2023-24 pays 0.00</p>");

        assert!(renderer.render("first_page", &view).is_err());
    }

    #[test]
    fn test_fallback_markup_is_escaped() {
        let view = assemble_view(&sample_data(), ReportKind::FirstPage);
        let html = render_with_fallback(&FailingRenderer, &view);
        assert!(html.contains("CONTRACTOR BILL"));
        assert!(html.contains("AG 48 of 2023-24"));
        assert!(html.contains("Road &lt;repair&gt;"));
        assert!(html.contains("ABC &amp; Sons"));
    }

    #[test]
    fn test_fallback_marks_missing_fields() {
        let view = assemble_view(&ReportData::default(), ReportKind::NoteSheet);
        assert!(fallback_markup(&view).contains("<strong>Agreement No:</strong> N/A"));
    }

    #[test]
    fn test_print_producer_injects_page_setup() {
        let producer = PrintHtmlProducer;
        let bytes = producer
            .produce("<html><head></head><body>x</body></html>", LayoutHint::landscape())
            .unwrap();
        let html = String::from_utf8(bytes).unwrap();
        assert!(html.contains("size: A4 landscape; margin: 10mm;"));
        assert!(html.find("@page").unwrap() > html.find("<head>").unwrap());
    }

    #[test]
    fn test_combine_keeps_order() {
        let producer = PrintHtmlProducer;
        let docs = vec![
            b"<html><body><p>first</p></body></html>".to_vec(),
            b"<p>second</p>".to_vec(),
        ];
        let combined = String::from_utf8(producer.combine(&docs).unwrap()).unwrap();
        assert!(combined.find("first").unwrap() < combined.find("second").unwrap());
        assert_eq!(combined.matches("<section class=\"document ").count(), 2);
    }

    #[test]
    fn test_combine_keeps_styles_and_landscape_pages() {
        let producer = PrintHtmlProducer;
        let landscape = "<html><head><style>table { border-collapse: collapse; }\nbody { font-size: 10px; }</style></head><body><table></table></body></html>";
        let portrait = "<html><head><style>h1, p.sub { text-align: center; }</style></head><body><h1>x</h1></body></html>";
        let docs = vec![
            producer.produce(portrait, LayoutHint::portrait()).unwrap(),
            producer.produce(landscape, LayoutHint::landscape()).unwrap(),
        ];

        let combined = String::from_utf8(producer.combine(&docs).unwrap()).unwrap();
        assert!(combined.contains("@page landscape { size: A4 landscape; margin: 10mm; }"));
        assert!(combined.contains("section.landscape { page: landscape; }"));
        assert!(combined.contains("<section class=\"document document-1\">"));
        assert!(combined.contains("<section class=\"document document-2 landscape\">"));
        assert!(combined.contains("section.document-1 h1, section.document-1 p.sub { text-align: center; }"));
        assert!(combined.contains("section.document-2 table { border-collapse: collapse; }"));
        assert!(combined.contains("section.document-2 { font-size: 10px; }"));
        assert_eq!(combined.matches("@page").count(), 2);
    }

    #[test]
    fn test_combine_rejects_empty_and_binary() {
        let producer = PrintHtmlProducer;
        assert!(matches!(producer.combine(&[]), Err(BillError::Packaging(_))));
        assert!(matches!(
            producer.combine(&[vec![0xff, 0xfe]]),
            Err(BillError::Packaging(_))
        ));
    }
}
