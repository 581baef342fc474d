//! SVG engine: one SVG (or raster) per physical page, with record values
//! placed at fixed coordinates from the page maps.
//!
//! Each page is bound, gets its overlay `<text>` nodes appended as children
//! of its root `<svg>`, and is wrapped in a fixed-size `section.page`. The
//! template's `index` shell receives the concatenation as `pages`.

use log::{debug, warn};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::path::Path;

use super::common::inject_styles;
use super::GeneratorError;
use crate::asset::{data_uri, list_page_files, load_page_maps, read_optional_css, PageFile, PageMap};
use crate::models::RequestRecord;
use crate::print::PageSpec;
use crate::template::{load_index, BindingContext, TemplateAssets, TemplateRenderer, TemplateSource};

pub const PAGE_SELECTOR: &str = ".page";
pub const OVERLAY_CLASS: &str = "overlay-field";

/// Print CSS locking every page box to the page size.
pub fn page_css(spec: &PageSpec) -> String {
    format!(
        "@page {{ size: {w_in}in {h_in}in; margin: 0 }}\n\
         html, body {{ margin: 0; padding: 0 }}\n\
         .page {{ position: relative; width: {w}px; height: {h}px; overflow: hidden; page-break-after: always; break-after: page }}\n\
         .page:last-child {{ page-break-after: auto; break-after: auto }}\n\
         .page > svg {{ display: block; width: {w}px; height: {h}px }}\n\
         .{OVERLAY_CLASS} {{ font-family: Helvetica, Arial, sans-serif; fill: #000 }}",
        w_in = spec.width_in(),
        h_in = spec.height_in(),
        w = spec.width_px,
        h = spec.height_px,
    )
}

fn xml_err(page: &str, e: impl std::fmt::Display) -> GeneratorError {
    GeneratorError::binding(page, format!("invalid page SVG: {e}"))
}

fn overlay_nodes(
    writer: &mut Writer<Vec<u8>>,
    map: &PageMap,
    record: &RequestRecord,
    page: &str,
) -> Result<(), GeneratorError> {
    for field in &map.fields {
        let x = field.x.to_string();
        let y = field.baseline_y().to_string();
        let font_size = field.font_size.to_string();

        let mut text = BytesStart::new("text");
        text.push_attribute(("class", OVERLAY_CLASS));
        text.push_attribute(("data-field", field.field()));
        text.push_attribute(("x", x.as_str()));
        text.push_attribute(("y", y.as_str()));
        text.push_attribute(("font-size", font_size.as_str()));
        if let Some(baseline) = field.dominant_baseline() {
            text.push_attribute(("dominant-baseline", baseline));
        }

        let value = record.text(field.field());
        writer
            .write_event(Event::Start(text))
            .map_err(|e| xml_err(page, e))?;
        if !value.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&value)))
                .map_err(|e| xml_err(page, e))?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("text")))
            .map_err(|e| xml_err(page, e))?;
    }
    Ok(())
}

/// Append one `<text>` per mapped field as the last children of the root
/// `<svg>`. Values are XML-escaped; missing values leave the node empty.
/// The XML declaration and doctype are dropped so the page can sit inline in
/// HTML.
pub fn overlay_fields(
    svg: &str,
    map: &PageMap,
    record: &RequestRecord,
    page: &str,
) -> Result<String, GeneratorError> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::with_capacity(svg.len() + map.fields.len() * 96));
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        let event = reader.read_event().map_err(|e| xml_err(page, e))?;
        match event {
            Event::Eof => break,
            Event::Decl(_) | Event::DocType(_) | Event::PI(_) => {}
            Event::Start(start) => {
                if depth == 0 {
                    check_root(&start, saw_root, page)?;
                    saw_root = true;
                }
                depth += 1;
                writer
                    .write_event(Event::Start(start))
                    .map_err(|e| xml_err(page, e))?;
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    overlay_nodes(&mut writer, map, record, page)?;
                }
                writer
                    .write_event(Event::End(end))
                    .map_err(|e| xml_err(page, e))?;
            }
            Event::Empty(start) if depth == 0 => {
                check_root(&start, saw_root, page)?;
                saw_root = true;
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                writer
                    .write_event(Event::Start(start))
                    .map_err(|e| xml_err(page, e))?;
                overlay_nodes(&mut writer, map, record, page)?;
                writer
                    .write_event(Event::End(BytesEnd::new(name)))
                    .map_err(|e| xml_err(page, e))?;
            }
            other => writer.write_event(other).map_err(|e| xml_err(page, e))?,
        }
    }

    if !saw_root {
        return Err(xml_err(page, "no root element"));
    }
    if depth != 0 {
        return Err(xml_err(page, "unclosed element"));
    }
    String::from_utf8(writer.into_inner()).map_err(|e| xml_err(page, e))
}

fn check_root(start: &BytesStart<'_>, saw_root: bool, page: &str) -> Result<(), GeneratorError> {
    if saw_root {
        return Err(xml_err(page, "more than one root element"));
    }
    let local = start.local_name();
    if !local.as_ref().eq_ignore_ascii_case(b"svg") {
        return Err(xml_err(
            page,
            format!(
                "root element is <{}>, expected <svg>",
                String::from_utf8_lossy(local.as_ref())
            ),
        ));
    }
    Ok(())
}

/// A raster page image as a page-sized SVG.
pub fn raster_page(image_uri: &str, spec: &PageSpec) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><image href="{image_uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/></svg>"#,
        w = spec.width_px,
        h = spec.height_px,
    )
}

pub fn wrap_page(number: u32, svg: &str) -> String {
    format!("<section class=\"page\" data-page=\"{number}\">{svg}</section>")
}

fn page_label(dir: &Path, page: &PageFile) -> String {
    let folder = dir.file_name().and_then(|n| n.to_str()).unwrap_or("template");
    let file = page.path.file_name().and_then(|n| n.to_str()).unwrap_or("page");
    format!("{folder}/assets/{file}")
}

async fn bind_page(
    renderer: &TemplateRenderer,
    dir: &Path,
    page: &PageFile,
    context: &BindingContext,
    spec: &PageSpec,
) -> Result<String, GeneratorError> {
    let label = page_label(dir, page);
    let bytes = tokio::fs::read(&page.path)
        .await
        .map_err(|e| GeneratorError::asset_io(&page.path, e))?;

    if page.is_svg() {
        let raw = String::from_utf8(bytes)
            .map_err(|e| GeneratorError::binding(&label, format!("page is not UTF-8: {e}")))?;
        let source = TemplateSource::detect(label, &raw)?;
        renderer.render(&source, context)
    } else {
        Ok(raster_page(&data_uri(&page.path, &bytes), spec))
    }
}

/// Compose the full document for an SVG-engine template.
pub async fn compose(
    renderer: &TemplateRenderer,
    dir: &Path,
    record: &RequestRecord,
    assets: &TemplateAssets,
    strict_mapping: bool,
    spec: &PageSpec,
) -> Result<String, GeneratorError> {
    let shell = load_index(dir).await?;
    let pages = list_page_files(dir).await?;
    let mut maps = load_page_maps(dir, strict_mapping).await?;

    if pages.is_empty() {
        warn!("{} has no assets/page-<N> files, rendering the shell only", dir.display());
    }

    let context = BindingContext::new(record, assets);
    let mut body = String::new();
    for page in &pages {
        let svg = bind_page(renderer, dir, page, &context, spec).await?;
        let svg = match maps.remove(&page.number) {
            Some(map) => {
                debug!("page {}: {} overlay fields", page.number, map.fields.len());
                overlay_fields(&svg, &map, record, &page_label(dir, page))?
            }
            None => svg,
        };
        body.push_str(&wrap_page(page.number, &svg));
    }

    if let Some(orphan) = maps.keys().next() {
        let message = format!(
            "page map for page {orphan} has no matching page file in {}",
            dir.join("assets").display()
        );
        if strict_mapping {
            return Err(GeneratorError::configuration(message));
        }
        warn!("{message}");
    }

    let context = context
        .with("pages", body)
        .with("page_count", pages.len());
    let markup = renderer.render(&shell, &context)?;
    let local_css = read_optional_css(dir).await?;
    Ok(inject_styles(&markup, &[&page_css(spec), &local_css]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::FieldPlacement;
    use serde_json::json;

    fn map(fields: Vec<FieldPlacement>) -> PageMap {
        PageMap { page: 1, fields }
    }

    #[test]
    fn test_overlay_inside_root() {
        let record = RequestRecord::from_value(json!({"insured": "Joe's <Plumbing> & Sons"}));
        let svg = r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg" width="816"><g><rect/></g></svg>"#;

        let out = overlay_fields(svg, &map(vec![FieldPlacement::new("insured", 40.0, 120.5)]), &record, "p1").unwrap();

        assert!(!out.contains("<?xml"));
        assert!(out.ends_with("</text></svg>"));
        assert!(out.contains(r#"data-field="insured" x="40" y="120.5" font-size="10""#));
        assert!(out.contains("&lt;Plumbing&gt; &amp; Sons"));
        assert!(out.contains("<g><rect/></g>"));
    }

    #[test]
    fn test_self_closing_root_and_missing_value() {
        let out = overlay_fields(
            r#"<svg width="816" height="1056"/>"#,
            &map(vec![FieldPlacement::new("missing", 1.0, 2.0)]),
            &RequestRecord::new(),
            "p2",
        )
        .unwrap();
        assert!(out.starts_with(r#"<svg width="816" height="1056">"#));
        assert!(out.ends_with(r#"font-size="10"></text></svg>"#));
        assert!(!out.contains("undefined"));
    }

    #[test]
    fn test_rejects_non_svg_root_and_bad_xml() {
        let record = RequestRecord::new();
        let m = map(vec![FieldPlacement::new("a", 1.0, 1.0)]);

        let err = overlay_fields("<html></html>", &m, &record, "ACORD25/assets/page-1.svg").unwrap_err();
        assert!(matches!(err, GeneratorError::Binding { ref template, .. } if template == "ACORD25/assets/page-1.svg"));
        assert!(overlay_fields("<svg><g></svg>", &m, &record, "p").is_err());
        assert!(overlay_fields("", &m, &record, "p").is_err());
    }

    #[test]
    fn test_unclosed_root_is_an_error() {
        let record = RequestRecord::from_value(json!({"a": "VALUE"}));
        let m = map(vec![FieldPlacement::new("a", 1.0, 1.0)]);

        let err = overlay_fields("<svg><g></g>", &m, &record, "p").unwrap_err();
        assert!(err.to_string().contains("unclosed element"), "{err}");
        assert!(overlay_fields("<svg><g>", &m, &record, "p").is_err());
    }

    #[test]
    fn test_raster_page_and_wrap() {
        let svg = raster_page("data:image/png;base64,AA==", &PageSpec::letter());
        assert!(svg.contains(r#"viewBox="0 0 816 1056""#));
        assert_eq!(
            wrap_page(3, "<svg/>"),
            r#"<section class="page" data-page="3"><svg/></section>"#
        );
        assert!(page_css(&PageSpec::letter()).contains("size: 8.5in 11in"));
    }
}
