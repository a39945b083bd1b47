//! Stamp placement on a page
//!
//! All coordinates are PDF user space: origin at the bottom-left corner of
//! the page, y growing upwards. A [`Placement`] is the lower-left corner of
//! the stamped content. Results are not clamped to the page; content larger
//! than the space left by an anchor ends up partly off-page.

use super::warning::{Resolved, Warning};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Corner padding as a fraction of the page size
pub const CORNER_PADDING_RATIO: f32 = 0.05;

/// Rows and columns of the tile grid
pub const TILE_GRID: usize = 3;

/// Default value for a missing custom coordinate (percent)
pub const DEFAULT_CUSTOM_PERCENT: f32 = 50.0;

/// Default horizontal margin for page numbers (points)
pub const DEFAULT_NUMBER_MARGIN_X: f32 = 40.0;

/// Default vertical margin for page numbers (points)
pub const DEFAULT_NUMBER_MARGIN_Y: f32 = 30.0;

/// Width and height, in points or UI pixels depending on context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Lower-left draw origin in PDF space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
}

impl Placement {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Named watermark position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[default]
    Center,
    Tile,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Custom,
}

impl Anchor {
    /// Parse a position name arriving from a form field. Unknown names
    /// fall back to `center`.
    pub fn parse_lenient(value: &str) -> Resolved<Self> {
        let anchor = match value.trim().to_ascii_lowercase().as_str() {
            "center" | "" => Self::Center,
            "tile" => Self::Tile,
            "top-left" => Self::TopLeft,
            "top-right" => Self::TopRight,
            "bottom-left" => Self::BottomLeft,
            "bottom-right" => Self::BottomRight,
            "custom" => Self::Custom,
            _ => {
                tracing::debug!(position = value, "unknown watermark position, using center");
                return Resolved::with_warnings(
                    Self::Center,
                    vec![Warning::UnknownAnchor {
                        value: value.to_string(),
                    }],
                );
            }
        };
        Resolved::clean(anchor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Tile => "tile",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to place one stamp on one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRequest {
    pub anchor: Anchor,
    pub page: Dimensions,
    pub content: Dimensions,
    /// Percent from the left edge, only used by `Anchor::Custom`
    pub custom_x: Option<f32>,
    /// Percent from the top edge, only used by `Anchor::Custom`
    pub custom_y: Option<f32>,
}

impl PlacementRequest {
    pub fn new(anchor: Anchor, page: Dimensions, content: Dimensions) -> Self {
        Self {
            anchor,
            page,
            content,
            custom_x: None,
            custom_y: None,
        }
    }

    pub fn with_custom(mut self, custom_x: Option<f32>, custom_y: Option<f32>) -> Self {
        self.custom_x = custom_x;
        self.custom_y = custom_y;
        self
    }
}

fn clamp_percent(axis: char, value: Option<f32>, warnings: &mut Vec<Warning>) -> f32 {
    let value = value.unwrap_or(DEFAULT_CUSTOM_PERCENT);
    if !value.is_finite() {
        warnings.push(Warning::CoordinateClamped { axis, value });
        return DEFAULT_CUSTOM_PERCENT;
    }
    let clamped = value.clamp(0.0, 100.0);
    if clamped != value {
        warnings.push(Warning::CoordinateClamped { axis, value });
    }
    clamped
}

/// Compute the draw origins for a stamp.
///
/// `Anchor::Tile` yields nine placements (a 3×3 grid, columns outer), every
/// other anchor yields exactly one.
pub fn calculate_placements(request: &PlacementRequest) -> Resolved<Vec<Placement>> {
    let Dimensions {
        width: page_w,
        height: page_h,
    } = request.page;
    let Dimensions {
        width: content_w,
        height: content_h,
    } = request.content;

    let padding_x = page_w * CORNER_PADDING_RATIO;
    let padding_y = page_h * CORNER_PADDING_RATIO;
    let mut warnings = Vec::new();

    let placements = match request.anchor {
        Anchor::Center => vec![Placement::new(
            page_w / 2.0 - content_w / 2.0,
            page_h / 2.0 - content_h / 2.0,
        )],
        Anchor::Tile => {
            let tile_w = page_w / TILE_GRID as f32;
            let tile_h = page_h / TILE_GRID as f32;
            let mut tiles = Vec::with_capacity(TILE_GRID * TILE_GRID);
            for col in 0..TILE_GRID {
                for row in 0..TILE_GRID {
                    let cx = tile_w / 2.0 + col as f32 * tile_w;
                    let cy = tile_h / 2.0 + row as f32 * tile_h;
                    tiles.push(Placement::new(cx - content_w / 2.0, cy - content_h / 2.0));
                }
            }
            tiles
        }
        Anchor::TopLeft => vec![Placement::new(padding_x, page_h - padding_y - content_h)],
        Anchor::TopRight => vec![Placement::new(
            page_w - padding_x - content_w,
            page_h - padding_y - content_h,
        )],
        Anchor::BottomLeft => vec![Placement::new(padding_x, padding_y)],
        Anchor::BottomRight => vec![Placement::new(page_w - padding_x - content_w, padding_y)],
        Anchor::Custom => {
            let x = clamp_percent('x', request.custom_x, &mut warnings);
            let y = clamp_percent('y', request.custom_y, &mut warnings);
            // Callers give y as percent from the top
            let from_bottom = 100.0 - y;
            vec![Placement::new(
                x / 100.0 * page_w - content_w / 2.0,
                from_bottom / 100.0 * page_h - content_h / 2.0,
            )]
        }
    };

    Resolved::with_warnings(placements, warnings)
}

/// Page-number position, measured with absolute margins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NumberPosition {
    #[default]
    BottomCenter,
    BottomLeft,
    BottomRight,
    TopCenter,
    TopLeft,
    TopRight,
}

impl NumberPosition {
    pub fn parse_lenient(value: &str) -> Resolved<Self> {
        let position = match value.trim().to_ascii_lowercase().as_str() {
            "bottom-center" | "" => Self::BottomCenter,
            "bottom-left" => Self::BottomLeft,
            "bottom-right" => Self::BottomRight,
            "top-center" => Self::TopCenter,
            "top-left" => Self::TopLeft,
            "top-right" => Self::TopRight,
            _ => {
                return Resolved::with_warnings(
                    Self::BottomCenter,
                    vec![Warning::UnknownNumberPosition {
                        value: value.to_string(),
                    }],
                )
            }
        };
        Resolved::clean(position)
    }
}

/// Margins from the page edge, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub x: f32,
    pub y: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            x: DEFAULT_NUMBER_MARGIN_X,
            y: DEFAULT_NUMBER_MARGIN_Y,
        }
    }
}

/// Place a page label using fixed margins instead of page-relative padding.
pub fn calculate_margin_position(
    position: NumberPosition,
    page: Dimensions,
    content: Dimensions,
    margins: Margins,
) -> Placement {
    let centered_x = page.width / 2.0 - content.width / 2.0;
    let right_x = page.width - content.width - margins.x;
    let top_y = page.height - content.height - margins.y;

    match position {
        NumberPosition::BottomCenter => Placement::new(centered_x, margins.y),
        NumberPosition::BottomLeft => Placement::new(margins.x, margins.y),
        NumberPosition::BottomRight => Placement::new(right_x, margins.y),
        NumberPosition::TopCenter => Placement::new(centered_x, top_y),
        NumberPosition::TopLeft => Placement::new(margins.x, top_y),
        NumberPosition::TopRight => Placement::new(right_x, top_y),
    }
}
