//! UI canvas to PDF coordinate mapping
//!
//! Elements positioned in a browser are reported in canvas pixels with a
//! top-left origin. PDF drawing wants points with a bottom-left origin.

use super::placement::{Dimensions, Placement};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the y axis starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Screen convention, y grows downwards
    #[default]
    TopLeft,
    /// PDF convention, y grows upwards
    BottomLeft,
}

/// Axis-aligned rectangle given by its corner and size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Placement {
        Placement::new(self.x, self.y)
    }
}

fn usable(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Per-page scale between a UI canvas and the PDF page it shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasTransform {
    pdf: Dimensions,
    scale_x: f32,
    scale_y: f32,
}

impl CanvasTransform {
    /// Build the transform for one page.
    ///
    /// Returns `None` when the canvas size is zero, negative or not a
    /// number; such pages cannot be mapped and must be skipped.
    pub fn new(pdf: Dimensions, ui: Dimensions) -> Option<Self> {
        if !usable(ui.width) || !usable(ui.height) {
            return None;
        }
        Some(Self {
            pdf,
            scale_x: pdf.width / ui.width,
            scale_y: pdf.height / ui.height,
        })
    }

    pub fn scale_x(&self) -> f32 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f32 {
        self.scale_y
    }

    /// Map a point. With `Origin::TopLeft` the y axis is flipped; with
    /// `Origin::BottomLeft` only the scale is applied.
    pub fn to_pdf_point(&self, x: f32, y: f32, origin: Origin) -> Placement {
        let pdf_x = x * self.scale_x;
        let pdf_y = match origin {
            Origin::TopLeft => self.pdf.height - y * self.scale_y,
            Origin::BottomLeft => y * self.scale_y,
        };
        Placement::new(pdf_x, pdf_y)
    }

    /// Map a UI rectangle (top-left corner + size) to the PDF rectangle
    /// whose `x`/`y` is the lower-left corner.
    pub fn to_pdf_rect(&self, element: Rect) -> Rect {
        let width = element.width * self.scale_x;
        let height = element.height * self.scale_y;
        let top = self.to_pdf_point(element.x, element.y, Origin::TopLeft);
        Rect::new(top.x, top.y - height, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_rect_mapping_flips_and_scales() {
        let transform =
            CanvasTransform::new(Dimensions::new(612.0, 792.0), Dimensions::new(306.0, 396.0))
                .unwrap();
        assert!(approx(transform.scale_x(), 2.0));
        assert!(approx(transform.scale_y(), 2.0));

        let rect = transform.to_pdf_rect(Rect::new(10.0, 20.0, 50.0, 30.0));
        assert!(approx(rect.x, 20.0));
        // 792 - 20*2 - 30*2
        assert!(approx(rect.y, 692.0));
        assert!(approx(rect.width, 100.0));
        assert!(approx(rect.height, 60.0));
    }

    #[test]
    fn test_top_left_corner_maps_to_page_top() {
        let transform =
            CanvasTransform::new(Dimensions::new(612.0, 792.0), Dimensions::new(600.0, 800.0))
                .unwrap();
        let point = transform.to_pdf_point(0.0, 0.0, Origin::TopLeft);
        assert!(approx(point.x, 0.0));
        assert!(approx(point.y, 792.0));

        let point = transform.to_pdf_point(600.0, 800.0, Origin::TopLeft);
        assert!(approx(point.x, 612.0));
        assert!(approx(point.y, 0.0));
    }

    #[test]
    fn test_bottom_left_origin_only_scales() {
        let transform =
            CanvasTransform::new(Dimensions::new(200.0, 400.0), Dimensions::new(100.0, 100.0))
                .unwrap();
        let point = transform.to_pdf_point(10.0, 10.0, Origin::BottomLeft);
        assert!(approx(point.x, 20.0));
        assert!(approx(point.y, 40.0));
    }

    #[test]
    fn test_degenerate_canvas() {
        let pdf = Dimensions::new(612.0, 792.0);
        assert!(CanvasTransform::new(pdf, Dimensions::new(0.0, 800.0)).is_none());
        assert!(CanvasTransform::new(pdf, Dimensions::new(600.0, 0.0)).is_none());
        assert!(CanvasTransform::new(pdf, Dimensions::new(f32::NAN, 800.0)).is_none());
        assert!(CanvasTransform::new(pdf, Dimensions::new(-1.0, 800.0)).is_none());
    }
}
