//! PDF Stamp MCP Server Library
//!
//! Page-range selection and stamp geometry for PDFs, plus MCP tools that
//! apply it:
//! - `select_pages`: Resolve all/even/odd/custom page selections
//! - `calculate_placements`: Where a watermark lands on a page
//! - `convert_color` / `map_coordinates` / `format_page_numbers`: Geometry helpers
//! - `watermark_pdf`: Text or image watermarks with opacity and rotation
//! - `add_page_numbers`: Numeric, roman or alphabetic page labels
//! - `sign_pdf`: Place canvas signature elements on their pages
//! - `get_page_dimensions`: Page sizes and rotation

pub mod error;
pub mod geometry;
pub mod pdf;
pub mod server;
pub mod source;

pub use error::{Error, Result};
pub use server::{
    run_server, run_server_with_config, run_server_with_dirs, ImageSource, PdfServer, PdfSource,
    ServerConfig, StampResult,
};
