//! Page number labels

use super::document::PdfDocument;
use super::draw::TextRun;
use super::font::StandardFont;
use super::watermark::StampReport;
use crate::error::Result;
use crate::geometry::{
    calculate_margin_position, exclude_first_page, format_page_number, parse_page_ranges,
    Dimensions, Margins, NumberFormat, NumberPosition, Resolved, Rgb,
};

pub const DEFAULT_NUMBER_FONT_SIZE: f32 = 12.0;

#[derive(Debug, Clone)]
pub struct PageNumberOptions {
    pub format: NumberFormat,
    pub start_number: i64,
    pub prefix: String,
    pub suffix: String,
    pub position: NumberPosition,
    pub margins: Margins,
    pub font: StandardFont,
    pub font_size: f32,
    pub color: Rgb,
}

impl Default for PageNumberOptions {
    fn default() -> Self {
        Self {
            format: NumberFormat::Numeric,
            start_number: 1,
            prefix: String::new(),
            suffix: String::new(),
            position: NumberPosition::BottomCenter,
            margins: Margins::default(),
            font: StandardFont::Helvetica,
            font_size: DEFAULT_NUMBER_FONT_SIZE,
            color: Rgb::BLACK,
        }
    }
}

impl PageNumberOptions {
    /// Full label for `page`, prefix and suffix included
    pub fn label(&self, page: u32) -> String {
        format!(
            "{}{}{}",
            self.prefix,
            format_page_number(page, self.format, self.start_number),
            self.suffix
        )
    }
}

/// Pages that receive a number: a blank range list means every page.
pub fn pages_to_number(spec: &str, total_pages: u32, skip_first_page: bool) -> Resolved<Vec<u32>> {
    let resolved = if spec.trim().is_empty() {
        Resolved::clean((1..=total_pages).collect())
    } else {
        parse_page_ranges(spec, total_pages)
    };
    if skip_first_page {
        resolved.map(|pages| exclude_first_page(&pages))
    } else {
        resolved
    }
}

pub fn add_page_numbers(
    doc: &mut PdfDocument,
    pages: &[u32],
    options: &PageNumberOptions,
) -> Result<StampReport> {
    let mut report = StampReport::default();

    for &page in pages {
        let label = options.label(page);
        if label.is_empty() {
            continue;
        }

        let page_size = doc.page_dimensions(page)?;
        let content = Dimensions::new(
            options.font.text_width(&label, options.font_size),
            options.font.height_at_size(options.font_size),
        );
        let origin =
            calculate_margin_position(options.position, page_size, content, options.margins);

        let font = doc.font_resource(page, options.font)?;
        let run = TextRun {
            text: &label,
            font_resource: &font,
            font_size: options.font_size,
            color: options.color,
            opacity_resource: None,
            rotation_degrees: 0.0,
            origin,
        };
        doc.append_stamp(page, &run.to_operations())?;

        report.marks_drawn += 1;
        report.pages_stamped.push(page);
    }

    tracing::info!(pages = report.pages_stamped.len(), "Added page numbers");
    Ok(report)
}
