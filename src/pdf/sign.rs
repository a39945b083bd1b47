//! Signature, text and image elements placed from a browser canvas
//!
//! The client positions elements on a rendered page and reports them in
//! canvas pixels, top-left origin. Each page carries the canvas size it was
//! rendered at; pages without it are skipped.

use super::document::PdfDocument;
use super::draw::{ImagePlacement, TextRun};
use super::font::StandardFont;
use super::raster::{embed_image, rasterize_svg};
use super::watermark::StampReport;
use crate::error::{Error, Result};
use crate::geometry::{hex_to_rgb_or, CanvasTransform, Dimensions, Rect, Rgb, Warning};
use base64::Engine;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ELEMENT_FONT_SIZE: f32 = 16.0;

/// Left padding between an element box and its text, in points
pub const TEXT_PADDING: f32 = 5.0;

/// Placeholder the editor puts in fresh date fields
const DATE_PLACEHOLDER: &str = "Date Placeholder";

/// SVG stamps are rendered at this many pixels per canvas pixel
const SVG_RASTER_SCALE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Signature,
    Text,
    Stamp,
    Initials,
    Name,
    Date,
    Drawing,
    Image,
}

impl ElementKind {
    fn is_text(&self) -> bool {
        matches!(self, Self::Text | Self::Name | Self::Date | Self::Initials)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ElementPosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ElementSize {
    pub width: f32,
    pub height: f32,
}

/// One element placed on the canvas
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureElement {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub position: ElementPosition,
    pub size: ElementSize,
    /// Text for text-like elements, `data:image/...;base64,` URL for images
    #[serde(default)]
    pub data: String,
    /// Degrees, counter-clockwise
    #[serde(default)]
    pub rotation: f32,
    /// Used as opacity; missing or zero means fully opaque
    #[serde(default)]
    pub scale: Option<f32>,
    /// Zero-based index into the canvas page list
    pub page: u32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub font_family: Option<String>,
}

impl SignatureElement {
    fn ui_rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.width, self.size.height)
    }

    fn opacity(&self) -> f32 {
        match self.scale {
            Some(s) if s.is_finite() && s != 0.0 => s.clamp(0.0, 1.0),
            _ => 1.0,
        }
    }
}

/// Size of the canvas a page was shown at, and the page size it reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanvasPage {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub original_width: Option<f32>,
    #[serde(default)]
    pub original_height: Option<f32>,
}

impl CanvasPage {
    fn has_original_dimensions(&self) -> bool {
        let usable = |v: Option<f32>| v.is_some_and(|v| v.is_finite() && v > 0.0);
        usable(self.original_width) && usable(self.original_height)
    }
}

/// Today's date as shown in filled-in date fields
pub fn today_label() -> String {
    chrono::Local::now().format("%-m/%-d/%Y").to_string()
}

/// Decode a `data:image/...;base64,` URL
pub fn decode_data_url(data: &str) -> Result<Vec<u8>> {
    if !data.starts_with("data:image") {
        return Err(Error::InvalidStamp {
            reason: "element data is not an image data URL".to_string(),
        });
    }
    let (_, payload) = data.split_once(',').ok_or_else(|| Error::InvalidStamp {
        reason: "image data URL has no payload".to_string(),
    })?;
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

fn is_svg(data: &str) -> bool {
    let trimmed = data.trim();
    trimmed.starts_with("<svg")
        || (trimmed.contains("<?xml") && trimmed.contains("<svg"))
        || data.starts_with("data:image/svg")
}

/// SVG markup from raw text or a `data:image/svg+xml` URL
fn svg_markup(data: &str) -> Result<Vec<u8>> {
    let trimmed = data.trim();
    if !trimmed.starts_with("data:") {
        return Ok(trimmed.as_bytes().to_vec());
    }
    let (header, payload) = trimmed.split_once(',').ok_or_else(|| Error::InvalidStamp {
        reason: "SVG data URL has no payload".to_string(),
    })?;
    if header.ends_with(";base64") {
        Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// PNG bytes of an SVG stamp, rendered at twice its canvas size
fn render_svg_stamp(element: &SignatureElement, max_pixels: u64) -> Result<Vec<u8>> {
    let svg = svg_markup(&element.data)?;
    let width = (element.size.width * SVG_RASTER_SCALE).round() as u32;
    let height = (element.size.height * SVG_RASTER_SCALE).round() as u32;
    rasterize_svg(&svg, width, height, max_pixels)
}

fn element_text(element: &SignatureElement) -> String {
    if element.kind == ElementKind::Date
        && (element.data.is_empty() || element.data == DATE_PLACEHOLDER)
    {
        today_label()
    } else {
        element.data.clone()
    }
}

/// Draw one element. Returns `Ok(false)` with a warning pushed when the
/// element has to be skipped.
fn draw_element(
    doc: &mut PdfDocument,
    page: u32,
    transform: &CanvasTransform,
    element: &SignatureElement,
    max_pixels: u64,
    warnings: &mut Vec<Warning>,
) -> Result<bool> {
    let rect = transform.to_pdf_rect(element.ui_rect());
    let opacity = element.opacity();
    let gs = if opacity < 1.0 {
        Some(doc.opacity_resource(page, opacity)?)
    } else {
        None
    };

    if element.kind.is_text() {
        let text = element_text(element);
        if text.is_empty() {
            warnings.push(Warning::ElementSkipped {
                page,
                reason: "empty text".to_string(),
            });
            return Ok(false);
        }

        let font = StandardFont::from_family(element.font_family.as_deref().unwrap_or("arial"));
        let font_size = element
            .font_size
            .filter(|s| *s > 0.0)
            .unwrap_or(DEFAULT_ELEMENT_FONT_SIZE)
            * transform.scale_x();
        let color = match element.color.as_deref() {
            Some(hex) => hex_to_rgb_or(hex, Rgb::BLACK).collect_into(warnings),
            None => Rgb::BLACK,
        };
        let vertical_offset = (rect.height - font.height_at_size(font_size)) / 2.0;

        let resource = doc.font_resource(page, font)?;
        let run = TextRun {
            text: &text,
            font_resource: &resource,
            font_size,
            color,
            opacity_resource: gs.as_deref(),
            rotation_degrees: element.rotation,
            origin: rect.origin().offset(TEXT_PADDING, vertical_offset),
        };
        doc.append_stamp(page, &run.to_operations())?;
        return Ok(true);
    }

    let bytes = if element.kind == ElementKind::Stamp && is_svg(&element.data) {
        render_svg_stamp(element, max_pixels)
    } else {
        decode_data_url(&element.data)
    };
    let embedded = match bytes.and_then(|bytes| embed_image(doc, &bytes, max_pixels)) {
        Ok(embedded) => embedded,
        Err(e) => {
            tracing::warn!(page, kind = ?element.kind, error = %e, "Skipping image element");
            warnings.push(Warning::ElementSkipped {
                page,
                reason: e.client_message(),
            });
            return Ok(false);
        }
    };

    let resource = doc.xobject_resource(page, embedded.id)?;
    let image = ImagePlacement {
        xobject_resource: &resource,
        width: rect.width,
        height: rect.height,
        opacity_resource: gs.as_deref(),
        rotation_degrees: element.rotation,
        origin: rect.origin(),
    };
    doc.append_stamp(page, &image.to_operations())?;
    Ok(true)
}

/// Place `elements` on the document.
///
/// `canvas_pages[i]` describes page `i + 1`. Element failures are reported
/// as warnings; only document-level problems return an error.
pub fn apply_signature_elements(
    doc: &mut PdfDocument,
    canvas_pages: &[CanvasPage],
    elements: &[SignatureElement],
    max_pixels: u64,
) -> Result<StampReport> {
    let mut report = StampReport::default();
    let page_count = doc.page_count();

    for element in elements.iter().filter(|e| e.page >= page_count) {
        report.warnings.push(Warning::ElementSkipped {
            page: element.page.saturating_add(1),
            reason: format!("document has {} pages", page_count),
        });
    }

    for index in 0..page_count {
        let page = index + 1;
        let page_elements: Vec<&SignatureElement> =
            elements.iter().filter(|e| e.page == index).collect();
        if page_elements.is_empty() {
            continue;
        }

        let pdf_size = doc.page_dimensions(page)?;
        let transform = canvas_pages
            .get(index as usize)
            .filter(|canvas| canvas.has_original_dimensions())
            .and_then(|canvas| {
                CanvasTransform::new(pdf_size, Dimensions::new(canvas.width, canvas.height))
            });
        let Some(transform) = transform else {
            tracing::debug!(page, "Skipping page without canvas dimensions");
            report.warnings.push(Warning::MissingCanvasDimensions { page });
            continue;
        };

        let mut drawn = 0;
        for element in page_elements {
            if draw_element(doc, page, &transform, element, max_pixels, &mut report.warnings)? {
                drawn += 1;
            }
        }
        if drawn > 0 {
            report.marks_drawn += drawn;
            report.pages_stamped.push(page);
        }
    }

    tracing::info!(
        pages = report.pages_stamped.len(),
        elements = report.marks_drawn,
        skipped = report.warnings.len(),
        "Applied signature elements"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::test_support::pdf_with_pages;
    use crate::pdf::font::encode_hex_string;
    use crate::pdf::raster::test_support::png;
    use lopdf::Document;

    fn page_text(saved: &[u8], page: u32) -> String {
        let doc = Document::load_mem(saved).unwrap();
        let page_id = *doc.get_pages().get(&page).unwrap();
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
    }

    fn canvas(width: f32, height: f32) -> CanvasPage {
        CanvasPage {
            width,
            height,
            original_width: Some(612.0),
            original_height: Some(792.0),
        }
    }

    fn element(kind: ElementKind, page: u32, data: &str) -> SignatureElement {
        SignatureElement {
            id: None,
            kind,
            position: ElementPosition { x: 100.0, y: 100.0 },
            size: ElementSize {
                width: 200.0,
                height: 50.0,
            },
            data: data.to_string(),
            rotation: 0.0,
            scale: None,
            page,
            color: None,
            font_size: None,
            font_family: None,
        }
    }

    fn image_data_url() -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png(8, 4, 255))
        )
    }

    #[test]
    fn test_element_deserializes_from_editor_json() {
        let json = r##"{
            "id": "el-1",
            "type": "name",
            "position": {"x": 10, "y": 20},
            "size": {"width": 100, "height": 30},
            "data": "Jane Doe",
            "rotation": 0,
            "scale": 1,
            "page": 0,
            "color": "#112233",
            "fontSize": 18,
            "fontFamily": "Times New Roman"
        }"##;
        let element: SignatureElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.kind, ElementKind::Name);
        assert_eq!(element.font_size, Some(18.0));
        assert_eq!(element.font_family.as_deref(), Some("Times New Roman"));
    }

    #[test]
    fn test_text_scaled_and_padded() {
        let mut doc = PdfDocument::load(&pdf_with_pages(&[(612, 792)])).unwrap();
        // Canvas at half size: scale 2
        let report = apply_signature_elements(
            &mut doc,
            &[canvas(306.0, 396.0)],
            &[element(ElementKind::Text, 0, "Hi")],
            1_000_000,
        )
        .unwrap();
        assert_eq!(report.pages_stamped, vec![1]);
        assert!(report.warnings.is_empty());

        let text = page_text(&doc.save().unwrap(), 1);
        // rect: x 200, y 792 - 200 - 100 = 492, height 100; font 32pt
        // Helvetica height at 32pt is 29.6, so the offset is 35.2
        assert!(text.contains(" 32 Tf 1 0 0 1 205 527.2 Tm"));
        assert!(text.contains(&format!("{} Tj", encode_hex_string("Hi"))));
    }

    #[test]
    fn test_date_placeholder_replaced() {
        let el = element(ElementKind::Date, 0, "Date Placeholder");
        assert_eq!(element_text(&el), today_label());
        let el = element(ElementKind::Date, 0, "");
        assert_eq!(element_text(&el), today_label());
        let el = element(ElementKind::Date, 0, "1/2/2024");
        assert_eq!(element_text(&el), "1/2/2024");
    }

    #[test]
    fn test_page_without_canvas_dimensions_skipped() {
        let mut doc = PdfDocument::load(&pdf_with_pages(&[(612, 792), (612, 792)])).unwrap();
        let missing = CanvasPage {
            width: 306.0,
            height: 396.0,
            original_width: None,
            original_height: Some(792.0),
        };
        let report = apply_signature_elements(
            &mut doc,
            &[missing, canvas(0.0, 396.0)],
            &[element(ElementKind::Text, 0, "a"), element(ElementKind::Text, 1, "b")],
            1_000_000,
        )
        .unwrap();
        assert!(report.pages_stamped.is_empty());
        assert_eq!(
            report.warnings,
            vec![
                Warning::MissingCanvasDimensions { page: 1 },
                Warning::MissingCanvasDimensions { page: 2 },
            ]
        );
    }

    #[test]
    fn test_image_element_with_opacity() {
        let mut doc = PdfDocument::load(&pdf_with_pages(&[(612, 792)])).unwrap();
        let mut el = element(ElementKind::Signature, 0, &image_data_url());
        el.scale = Some(0.5);
        let report =
            apply_signature_elements(&mut doc, &[canvas(612.0, 792.0)], &[el], 1_000_000).unwrap();
        assert_eq!(report.marks_drawn, 1);

        let text = page_text(&doc.save().unwrap(), 1);
        assert!(text.contains("200 0 0 50 100 642 cm"));
        assert!(text.contains(" gs"));
    }

    #[test]
    fn test_bad_elements_become_warnings() {
        let mut doc = PdfDocument::load(&pdf_with_pages(&[(612, 792)])).unwrap();
        let elements = vec![
            element(ElementKind::Stamp, 0, "<svg xmlns='http://www.w3.org/2000/svg'><rect"),
            element(ElementKind::Image, 0, "data:image/png;base64,!!!"),
            element(ElementKind::Drawing, 0, "not a data url"),
            element(ElementKind::Text, 4, "beyond the end"),
        ];
        let report =
            apply_signature_elements(&mut doc, &[canvas(612.0, 792.0)], &elements, 1_000_000)
                .unwrap();
        assert_eq!(report.marks_drawn, 0);
        assert_eq!(report.warnings.len(), 4);
        assert!(matches!(report.warnings[0], Warning::ElementSkipped { page: 5, .. }));
    }

    #[test]
    fn test_svg_stamps_are_rasterized() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="5">
            <rect width="20" height="5" fill="#cc0000"/></svg>"##;
        let data_url = format!(
            "data:image/svg+xml;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(svg)
        );

        let mut doc = PdfDocument::load(&pdf_with_pages(&[(612, 792)])).unwrap();
        let elements = vec![
            element(ElementKind::Stamp, 0, svg),
            element(ElementKind::Stamp, 0, &data_url),
        ];
        let report =
            apply_signature_elements(&mut doc, &[canvas(612.0, 792.0)], &elements, 1_000_000)
                .unwrap();
        assert_eq!(report.marks_drawn, 2);
        assert!(report.warnings.is_empty());

        let text = page_text(&doc.save().unwrap(), 1);
        assert_eq!(text.matches("200 0 0 50 100 642 cm").count(), 2);
    }

    #[test]
    fn test_svg_stamp_size_is_bounded() {
        let mut doc = PdfDocument::load(&pdf_with_pages(&[(612, 792)])).unwrap();
        let el = element(ElementKind::Stamp, 0, "<svg xmlns='http://www.w3.org/2000/svg'/>");
        // 400 x 100 raster pixels against a limit of 1000
        let report = apply_signature_elements(&mut doc, &[canvas(612.0, 792.0)], &[el], 1_000)
            .unwrap();
        assert_eq!(report.marks_drawn, 0);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_decode_data_url() {
        let url = image_data_url();
        assert!(!decode_data_url(&url).unwrap().is_empty());
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("https://example.com/a.png").is_err());
    }
}
