//! Page selection and stamp geometry
//!
//! Pure, synchronous functions shared by the watermark, page-number and
//! signing tools. Nothing here touches a PDF; the `pdf` module feeds the
//! results into content streams.

mod color;
mod numbering;
mod pages;
mod placement;
mod transform;
mod warning;

pub use color::{hex_to_rgb, hex_to_rgb_or, Rgb};
pub use numbering::{format_page_number, to_alphabetic, to_roman, NumberFormat};
pub use pages::{
    count_pages_in_ranges, exclude_first_page, parse_page_ranges, select_pages,
    select_pages_lenient, PageSelection, PageSelectionMode,
};
pub use placement::{
    calculate_margin_position, calculate_placements, Anchor, Dimensions, Margins,
    NumberPosition, Placement, PlacementRequest, CORNER_PADDING_RATIO, DEFAULT_CUSTOM_PERCENT,
    DEFAULT_NUMBER_MARGIN_X, DEFAULT_NUMBER_MARGIN_Y, TILE_GRID,
};
pub use transform::{CanvasTransform, Origin, Rect};
pub use warning::{Resolved, Warning};
