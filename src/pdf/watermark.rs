//! Text and image watermarks

use super::document::PdfDocument;
use super::draw::{ImagePlacement, TextRun};
use super::font::StandardFont;
use super::raster::embed_image;
use crate::error::Result;
use crate::geometry::{calculate_placements, Anchor, Dimensions, PlacementRequest, Rgb, Warning};
use serde::Serialize;

/// Opacity used when none (or zero) is given, in percent
pub const DEFAULT_OPACITY_PERCENT: f32 = 30.0;

/// Tiled watermarks are always drawn diagonally
pub const TILE_ROTATION_DEGREES: f32 = 45.0;

pub const DEFAULT_WATERMARK_TEXT: &str = "WATERMARK";
pub const DEFAULT_WATERMARK_FONT_SIZE: f32 = 48.0;
pub const DEFAULT_WATERMARK_ROTATION: f32 = 45.0;
pub const DEFAULT_IMAGE_SCALE_PERCENT: f32 = 50.0;

/// Convert a percent opacity to `[0.01, 1]`. Missing or zero means 30%.
pub fn opacity_from_percent(percent: Option<f32>) -> f32 {
    let percent = match percent {
        Some(p) if p.is_finite() && p != 0.0 => p,
        _ => DEFAULT_OPACITY_PERCENT,
    };
    percent.clamp(1.0, 100.0) / 100.0
}

/// Where a watermark goes on each page
#[derive(Debug, Clone, Copy)]
pub struct WatermarkPosition {
    pub anchor: Anchor,
    pub custom_x: Option<f32>,
    pub custom_y: Option<f32>,
    pub rotation_degrees: f32,
}

impl WatermarkPosition {
    fn rotation(&self) -> f32 {
        if self.anchor == Anchor::Tile {
            TILE_ROTATION_DEGREES
        } else {
            self.rotation_degrees
        }
    }

    fn request(&self, page: Dimensions, content: Dimensions) -> PlacementRequest {
        PlacementRequest::new(self.anchor, page, content).with_custom(self.custom_x, self.custom_y)
    }
}

#[derive(Debug, Clone)]
pub struct TextWatermark {
    pub text: String,
    pub font: StandardFont,
    pub font_size: f32,
    pub color: Rgb,
    /// Fraction in `[0, 1]`
    pub opacity: f32,
    pub position: WatermarkPosition,
}

#[derive(Debug, Clone)]
pub struct ImageWatermark {
    pub image: Vec<u8>,
    /// Percent of the image's natural size
    pub scale_percent: f32,
    /// Fraction in `[0, 1]`
    pub opacity: f32,
    pub position: WatermarkPosition,
    pub max_pixels: u64,
}

/// Outcome of stamping a document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StampReport {
    pub pages_stamped: Vec<u32>,
    pub marks_drawn: usize,
    pub warnings: Vec<Warning>,
}

pub fn apply_text_watermark(
    doc: &mut PdfDocument,
    pages: &[u32],
    watermark: &TextWatermark,
) -> Result<StampReport> {
    let mut report = StampReport::default();
    let content = Dimensions::new(
        watermark.font.text_width(&watermark.text, watermark.font_size),
        watermark.font_size,
    );

    for &page in pages {
        let page_size = doc.page_dimensions(page)?;
        let placements = calculate_placements(&watermark.position.request(page_size, content))
            .collect_into(&mut report.warnings);

        let font = doc.font_resource(page, watermark.font)?;
        let gs = doc.opacity_resource(page, watermark.opacity)?;

        let mut ops = String::new();
        for origin in &placements {
            let run = TextRun {
                text: &watermark.text,
                font_resource: &font,
                font_size: watermark.font_size,
                color: watermark.color,
                opacity_resource: Some(&gs),
                rotation_degrees: watermark.position.rotation(),
                origin: *origin,
            };
            ops.push_str(&run.to_operations());
        }
        doc.append_stamp(page, &ops)?;

        report.marks_drawn += placements.len();
        report.pages_stamped.push(page);
    }

    tracing::info!(
        pages = report.pages_stamped.len(),
        marks = report.marks_drawn,
        "Applied text watermark"
    );
    Ok(report)
}

pub fn apply_image_watermark(
    doc: &mut PdfDocument,
    pages: &[u32],
    watermark: &ImageWatermark,
) -> Result<StampReport> {
    let mut report = StampReport::default();
    if pages.is_empty() {
        return Ok(report);
    }

    let embedded = embed_image(doc, &watermark.image, watermark.max_pixels)?;
    let scale = if watermark.scale_percent.is_finite() && watermark.scale_percent > 0.0 {
        watermark.scale_percent / 100.0
    } else {
        DEFAULT_IMAGE_SCALE_PERCENT / 100.0
    };
    let natural = embedded.dimensions();
    let content = Dimensions::new(natural.width * scale, natural.height * scale);

    for &page in pages {
        let page_size = doc.page_dimensions(page)?;
        let placements = calculate_placements(&watermark.position.request(page_size, content))
            .collect_into(&mut report.warnings);

        let xobject = doc.xobject_resource(page, embedded.id)?;
        let gs = doc.opacity_resource(page, watermark.opacity)?;

        let mut ops = String::new();
        for origin in &placements {
            let image = ImagePlacement {
                xobject_resource: &xobject,
                width: content.width,
                height: content.height,
                opacity_resource: Some(&gs),
                rotation_degrees: watermark.position.rotation(),
                origin: *origin,
            };
            ops.push_str(&image.to_operations());
        }
        doc.append_stamp(page, &ops)?;

        report.marks_drawn += placements.len();
        report.pages_stamped.push(page);
    }

    tracing::info!(
        pages = report.pages_stamped.len(),
        marks = report.marks_drawn,
        "Applied image watermark"
    );
    Ok(report)
}
