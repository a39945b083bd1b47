//! PDF stamping layer
//!
//! Loads documents with lopdf and draws watermarks, page numbers and
//! signature elements on top of the existing page content.

mod document;
mod draw;
mod font;
mod page_numbers;
mod raster;
mod sign;
mod watermark;

pub use document::{Matrix, PdfDocument, DEFAULT_PAGE_DIMENSIONS};
pub use font::StandardFont;
pub use page_numbers::{
    add_page_numbers, pages_to_number, PageNumberOptions, DEFAULT_NUMBER_FONT_SIZE,
};
pub use raster::{embed_image, rasterize_svg, EmbeddedImage};
pub use sign::{
    apply_signature_elements, decode_data_url, today_label, CanvasPage, ElementKind,
    ElementPosition, ElementSize, SignatureElement, DEFAULT_ELEMENT_FONT_SIZE,
};
pub use watermark::{
    apply_image_watermark, apply_text_watermark, opacity_from_percent, ImageWatermark,
    StampReport, TextWatermark, WatermarkPosition, DEFAULT_IMAGE_SCALE_PERCENT,
    DEFAULT_OPACITY_PERCENT, DEFAULT_WATERMARK_FONT_SIZE, DEFAULT_WATERMARK_ROTATION,
    DEFAULT_WATERMARK_TEXT, TILE_ROTATION_DEGREES,
};

#[cfg(test)]
pub(crate) use document::test_support::pdf_with_pages;
#[cfg(test)]
pub(crate) use raster::test_support::png;
