//! MCP Server implementation using rmcp

use crate::error::Error;
use crate::geometry::{
    calculate_placements, hex_to_rgb, hex_to_rgb_or, select_pages_lenient, Anchor,
    CanvasTransform, Dimensions, Margins, NumberFormat, NumberPosition, Origin, Placement,
    PlacementRequest, Rect, Rgb, Warning, DEFAULT_NUMBER_MARGIN_X, DEFAULT_NUMBER_MARGIN_Y,
};
use crate::pdf::{
    add_page_numbers, apply_image_watermark, apply_signature_elements, apply_text_watermark,
    opacity_from_percent, pages_to_number, CanvasPage, ImageWatermark, PageNumberOptions,
    PdfDocument, SignatureElement, StampReport, StandardFont, TextWatermark, WatermarkPosition,
    DEFAULT_IMAGE_SCALE_PERCENT, DEFAULT_NUMBER_FONT_SIZE, DEFAULT_WATERMARK_FONT_SIZE,
    DEFAULT_WATERMARK_ROTATION, DEFAULT_WATERMARK_TEXT,
};
use crate::source::{
    resolve_base64, resolve_cache, resolve_path, resolve_url, AssetKind, DocumentCache,
    ResolvedAsset,
};
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Where to read a PDF from
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum PdfSource {
    /// File path (absolute or relative)
    Path {
        /// Path to the PDF file
        path: String,
    },
    /// Base64 encoded PDF data
    Base64 {
        /// Base64 encoded PDF content
        base64: String,
    },
    /// URL to download PDF from
    Url {
        /// URL of the PDF file
        url: String,
    },
    /// Output of an earlier stamping call
    CacheRef {
        /// `output_cache_key` from a previous operation
        cache_key: String,
    },
}

fn describe_json(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Null => "null",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Pull the single string field `key` out of a source object
fn string_field<E: serde::de::Error>(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> std::result::Result<Option<String>, E> {
    match obj.get(key) {
        None => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(E::custom(format!(
            "\"{}\" must be a string, got {}",
            key,
            describe_json(other)
        ))),
    }
}

impl<'de> serde::Deserialize<'de> for PdfSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let Some(obj) = value.as_object() else {
            return Err(serde::de::Error::custom(format!(
                "Invalid source: expected an object with one of \"path\", \"base64\", \"url\", or \"cache_key\", but got {}",
                describe_json(&value)
            )));
        };

        if let Some(path) = string_field(obj, "path")? {
            return Ok(PdfSource::Path { path });
        }
        if let Some(base64) = string_field(obj, "base64")? {
            return Ok(PdfSource::Base64 { base64 });
        }
        if let Some(url) = string_field(obj, "url")? {
            return Ok(PdfSource::Url { url });
        }
        if let Some(cache_key) = string_field(obj, "cache_key")? {
            return Ok(PdfSource::CacheRef { cache_key });
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(serde::de::Error::custom(format!(
            "Invalid source: expected an object with one of \"path\", \"base64\", \"url\", or \"cache_key\", but got keys: {:?}",
            keys
        )))
    }
}

/// Image used by image watermarks
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ImageSource {
    Path {
        /// Path to a PNG/JPEG/GIF/BMP/WebP file
        path: String,
    },
    Base64 {
        /// Base64 image data, optionally as a `data:image/...;base64,` URL
        base64: String,
    },
    Url {
        url: String,
    },
}

/// Security and resource configuration for the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directories that path sources and output paths must stay inside.
    /// Empty means no restriction.
    pub resource_dirs: Vec<String>,
    /// Allow URLs that resolve to private/reserved IPs (default: false)
    pub allow_private_urls: bool,
    /// Maximum download size in bytes for URL sources (default: 100MB)
    pub max_download_bytes: u64,
    /// Maximum total bytes in the output cache (default: 512MB)
    pub cache_max_bytes: usize,
    /// Maximum number of cached outputs (default: 100)
    pub cache_max_entries: usize,
    /// Maximum pixel count of a watermark or signature image (default: 40M)
    pub max_image_pixels: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            resource_dirs: Vec::new(),
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
            cache_max_bytes: 512 * 1024 * 1024,    // 512MB
            cache_max_entries: 100,
            max_image_pixels: 40_000_000,
        }
    }
}

/// Parse one config value, keeping `default` when it is absent or invalid
fn parse_setting<T: FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(name, value = %raw, "Ignoring invalid setting");
                default
            }
        },
    }
}

impl ServerConfig {
    /// Defaults overridden by `PDF_STAMP_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let resource_dirs = lookup("PDF_STAMP_RESOURCE_DIRS")
            .map(|dirs| {
                std::env::split_paths(&dirs)
                    .map(|p| p.to_string_lossy().into_owned())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.resource_dirs);

        Self {
            resource_dirs,
            allow_private_urls: parse_setting(
                "PDF_STAMP_ALLOW_PRIVATE_URLS",
                lookup("PDF_STAMP_ALLOW_PRIVATE_URLS"),
                defaults.allow_private_urls,
            ),
            max_download_bytes: parse_setting(
                "PDF_STAMP_MAX_DOWNLOAD_BYTES",
                lookup("PDF_STAMP_MAX_DOWNLOAD_BYTES"),
                defaults.max_download_bytes,
            ),
            cache_max_bytes: parse_setting(
                "PDF_STAMP_CACHE_MAX_BYTES",
                lookup("PDF_STAMP_CACHE_MAX_BYTES"),
                defaults.cache_max_bytes,
            ),
            cache_max_entries: parse_setting(
                "PDF_STAMP_CACHE_MAX_ENTRIES",
                lookup("PDF_STAMP_CACHE_MAX_ENTRIES"),
                defaults.cache_max_entries,
            ),
            max_image_pixels: parse_setting(
                "PDF_STAMP_MAX_IMAGE_PIXELS",
                lookup("PDF_STAMP_MAX_IMAGE_PIXELS"),
                defaults.max_image_pixels,
            ),
        }
    }
}

/// PDF stamping MCP server
#[derive(Clone)]
pub struct PdfServer {
    cache: Arc<DocumentCache>,
    tool_router: ToolRouter<Self>,
    config: Arc<ServerConfig>,
}

fn default_mode() -> String {
    "all".to_string()
}

fn default_position() -> String {
    "center".to_string()
}

fn default_start_number() -> i64 {
    1
}

// ============================================================================
// Request/Response types for select_pages
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SelectPagesParams {
    /// Document length to resolve against. Ignored when `source` is given.
    #[serde(default)]
    pub total_pages: Option<u32>,
    /// PDF whose page count is used
    #[serde(default)]
    pub source: Option<PdfSource>,
    /// "all", "even", "odd" or "custom" (default: all)
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Range list for custom mode, e.g. "1-3,5,8-10"
    #[serde(default)]
    pub custom_pages: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SelectPagesResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub total_pages: u32,
    /// 1-indexed, ascending, no duplicates
    pub pages: Vec<u32>,
    pub count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for calculate_placements
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalculatePlacementsParams {
    /// Page width in points
    pub page_width: f32,
    /// Page height in points
    pub page_height: f32,
    /// Stamp width in points
    pub content_width: f32,
    /// Stamp height in points
    pub content_height: f32,
    /// center, tile, top-left, top-right, bottom-left, bottom-right or custom
    #[serde(default = "default_position")]
    pub position: String,
    /// Custom position, percent from the left edge (default: 50)
    #[serde(default)]
    pub custom_x: Option<f32>,
    /// Custom position, percent from the top edge (default: 50)
    #[serde(default)]
    pub custom_y: Option<f32>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CalculatePlacementsResult {
    /// Anchor actually used
    pub position: Anchor,
    /// Lower-left draw origins, bottom-left page origin
    pub placements: Vec<Placement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

// ============================================================================
// Request/Response types for convert_color
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConvertColorParams {
    /// Hex colors such as "#FF0000" or "00ff00"
    pub colors: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ConvertColorResult {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for map_coordinates
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MapCoordinatesParams {
    /// PDF page width in points
    pub page_width: f32,
    /// PDF page height in points
    pub page_height: f32,
    /// Width of the canvas the page was shown on
    pub canvas_width: f32,
    /// Height of the canvas the page was shown on
    pub canvas_height: f32,
    /// Canvas rectangles: top-left corner and size
    #[serde(default)]
    pub rects: Vec<Rect>,
    /// Canvas points
    #[serde(default)]
    pub points: Vec<Placement>,
    /// Origin the points are measured from (default: top-left)
    #[serde(default)]
    pub origin: Origin,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MapCoordinatesResult {
    pub scale_x: f32,
    pub scale_y: f32,
    /// PDF rectangles: lower-left corner and size
    pub rects: Vec<Rect>,
    pub points: Vec<Placement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for format_page_numbers
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FormatPageNumbersParams {
    pub total_pages: u32,
    /// Pages to label, e.g. "1-5,8". Empty means every page.
    #[serde(default)]
    pub pages: String,
    /// numeric, roman or alphabetic (default: numeric)
    #[serde(default)]
    pub format: String,
    /// Number shown on page 1 (default: 1)
    #[serde(default = "default_start_number")]
    pub start_number: i64,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub skip_first_page: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PageLabel {
    pub page: u32,
    pub label: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FormatPageNumbersResult {
    pub labels: Vec<PageLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for the stamping tools
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WatermarkPdfParams {
    /// PDF to watermark
    pub source: PdfSource,
    /// "text" (default) or "image"
    #[serde(default)]
    pub watermark_type: WatermarkKind,
    /// Watermark text (default: "WATERMARK")
    #[serde(default)]
    pub text: Option<String>,
    /// Hex text color (default: "#FF0000")
    #[serde(default)]
    pub text_color: Option<String>,
    /// Font size in points (default: 48)
    #[serde(default)]
    pub font_size: Option<f32>,
    /// Font family; Arial/Helvetica, Times or Courier (default: Helvetica)
    #[serde(default)]
    pub font_family: Option<String>,
    /// Image for image watermarks
    #[serde(default)]
    pub image: Option<ImageSource>,
    /// Image size in percent of its natural size (default: 50)
    #[serde(default)]
    pub scale: Option<f32>,
    /// Opacity percent, 1-100 (default: 30)
    #[serde(default)]
    pub opacity: Option<f32>,
    /// Rotation in degrees (default: 45). Tiled watermarks always use 45.
    #[serde(default)]
    pub rotation: Option<f32>,
    /// center, tile, top-left, top-right, bottom-left, bottom-right or custom
    #[serde(default = "default_position")]
    pub position: String,
    /// Custom position, percent from the left edge
    #[serde(default)]
    pub custom_x: Option<f32>,
    /// Custom position, percent from the top edge
    #[serde(default)]
    pub custom_y: Option<f32>,
    /// "all", "even", "odd" or "custom" (default: all)
    #[serde(default = "default_mode")]
    pub pages: String,
    /// Range list for custom mode, e.g. "1-3,5"
    #[serde(default)]
    pub custom_pages: String,
    /// Optional file path to also write the output to
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddPageNumbersParams {
    /// PDF to number
    pub source: PdfSource,
    /// numeric, roman or alphabetic (default: numeric)
    #[serde(default)]
    pub format: String,
    /// bottom-center, bottom-left, bottom-right, top-center, top-left or top-right
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub font_family: Option<String>,
    /// Font size in points (default: 12)
    #[serde(default)]
    pub font_size: Option<f32>,
    /// Hex color (default: "#000000")
    #[serde(default)]
    pub color: Option<String>,
    /// Number shown on page 1 (default: 1)
    #[serde(default = "default_start_number")]
    pub start_number: i64,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    /// Horizontal margin in points (default: 40)
    #[serde(default)]
    pub margin_x: Option<f32>,
    /// Vertical margin in points (default: 30)
    #[serde(default)]
    pub margin_y: Option<f32>,
    /// Pages to number, e.g. "1-5,8". Empty means every page.
    #[serde(default)]
    pub pages: String,
    #[serde(default)]
    pub skip_first_page: bool,
    /// Optional file path to also write the output to
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SignPdfParams {
    /// PDF to sign
    pub source: PdfSource,
    /// Elements placed on the canvas
    pub elements: Vec<SignatureElement>,
    /// Canvas size per page; entry 0 is page 1
    pub pages: Vec<CanvasPage>,
    /// Optional file path to also write the output to
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct StampResult {
    pub source: String,
    /// Cache key of the stamped PDF, usable as `{"cache_key": ...}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cache_key: Option<String>,
    pub output_page_count: u32,
    pub pages_stamped: Vec<u32>,
    pub marks_drawn: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StampResult {
    fn failed(source: String, error: &Error) -> Self {
        Self {
            source,
            output_cache_key: None,
            output_page_count: 0,
            pages_stamped: Vec::new(),
            marks_drawn: 0,
            output_path: None,
            warnings: Vec::new(),
            error: Some(error.client_message()),
        }
    }
}

// ============================================================================
// Request/Response types for get_page_dimensions
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetPageDimensionsParams {
    /// PDF sources to inspect
    pub sources: Vec<PdfSource>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PageDimensions {
    /// Page number (1-indexed)
    pub page: u32,
    /// Displayed width in points
    pub width: f32,
    /// Displayed height in points
    pub height: f32,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct GetPageDimensionsResult {
    pub source: String,
    pub page_count: u32,
    pub pages: Vec<PageDimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Largest document length the geometry tools will resolve against
pub const MAX_TOTAL_PAGES: u32 = 100_000;

/// Largest magnitude accepted for `start_number`
pub const MAX_START_NUMBER: i64 = 1_000_000_000;

fn check_total_pages(total_pages: u32) -> crate::error::Result<u32> {
    if total_pages > MAX_TOTAL_PAGES {
        return Err(Error::InvalidParams {
            reason: format!(
                "total_pages {} exceeds the limit of {}",
                total_pages, MAX_TOTAL_PAGES
            ),
        });
    }
    Ok(total_pages)
}

fn check_start_number(start_number: i64) -> crate::error::Result<i64> {
    if start_number.unsigned_abs() > MAX_START_NUMBER.unsigned_abs() {
        return Err(Error::InvalidParams {
            reason: format!(
                "start_number must be between -{0} and {0}",
                MAX_START_NUMBER
            ),
        });
    }
    Ok(start_number)
}

// ============================================================================
// Tool implementations
// ============================================================================

const SOURCE_FORMAT: &str = "Source format: must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}";

#[tool_router]
impl PdfServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a server that only reads and writes inside `dirs`
    pub fn with_resource_dirs(dirs: Vec<String>) -> Self {
        Self::with_config(ServerConfig {
            resource_dirs: dirs,
            ..ServerConfig::default()
        })
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let cache = DocumentCache::new(config.cache_max_entries, config.cache_max_bytes);
        Self {
            cache: Arc::new(cache),
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    #[tool(
        description = "Resolve a page selection to sorted 1-indexed page numbers. Modes: all, even, odd, custom. Custom ranges look like \"1-3,5,8-10\"; malformed tokens and out-of-range pages are dropped and reported as warnings.

Give either total_pages (at most 100000) or a source PDF (path, url, base64 or cache_key)."
    )]
    async fn select_pages(&self, Parameters(params): Parameters<SelectPagesParams>) -> String {
        let result = self.process_select_pages(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "select_pages failed");
            SelectPagesResult {
                source: params.source.as_ref().map(Self::source_name),
                total_pages: 0,
                pages: Vec::new(),
                count: 0,
                warnings: Vec::new(),
                error: Some(e.client_message()),
            }
        });
        to_json(&serde_json::json!({ "results": [result] }))
    }

    #[tool(
        description = "Compute where a watermark of the given size lands on a page. Positions: center, tile (3x3 grid, 9 placements), top-left, top-right, bottom-left, bottom-right (5% padding), custom (custom_x/custom_y percent, y from the top). Coordinates are PDF points from the bottom-left corner."
    )]
    async fn calculate_placements(
        &self,
        Parameters(params): Parameters<CalculatePlacementsParams>,
    ) -> String {
        to_json(&serde_json::json!({ "results": [Self::process_calculate_placements(&params)] }))
    }

    #[tool(description = "Convert hex colors (#RRGGBB) to RGB components in the range 0-1.")]
    async fn convert_color(&self, Parameters(params): Parameters<ConvertColorParams>) -> String {
        let results: Vec<ConvertColorResult> = params
            .colors
            .iter()
            .map(|input| match hex_to_rgb(input) {
                Ok(rgb) => ConvertColorResult {
                    input: input.clone(),
                    rgb: Some(rgb),
                    error: None,
                },
                Err(e) => ConvertColorResult {
                    input: input.clone(),
                    rgb: None,
                    error: Some(e.client_message()),
                },
            })
            .collect();
        to_json(&serde_json::json!({ "results": results }))
    }

    #[tool(
        description = "Map rectangles and points from a browser canvas (pixels, top-left origin) onto a PDF page (points, bottom-left origin). Returned rectangles give their lower-left corner."
    )]
    async fn map_coordinates(
        &self,
        Parameters(params): Parameters<MapCoordinatesParams>,
    ) -> String {
        to_json(&serde_json::json!({ "results": [Self::process_map_coordinates(&params)] }))
    }

    #[tool(
        description = "Render page-number labels without touching a PDF. Formats: numeric, roman, alphabetic (A..Z, AA..). Label = prefix + number + suffix, where number = page + start_number - 1. total_pages is at most 100000 and start_number within +/-1000000000."
    )]
    async fn format_page_numbers(
        &self,
        Parameters(params): Parameters<FormatPageNumbersParams>,
    ) -> String {
        let result = Self::process_format_page_numbers(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "format_page_numbers failed");
            FormatPageNumbersResult {
                labels: Vec::new(),
                warnings: Vec::new(),
                error: Some(e.client_message()),
            }
        });
        to_json(&serde_json::json!({ "results": [result] }))
    }

    #[tool(
        description = "Add a text or image watermark to selected pages. Opacity is a percentage (default 30). The output is always cached (output_cache_key) for chaining with the other stamping tools.

Source format: must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}. Image format: {\"path\"}, {\"url\"} or {\"base64\"}."
    )]
    async fn watermark_pdf(&self, Parameters(params): Parameters<WatermarkPdfParams>) -> String {
        let result = self.process_watermark_pdf(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "watermark_pdf failed");
            StampResult::failed(Self::source_name(&params.source), &e)
        });
        to_json(&serde_json::json!({ "results": [result] }))
    }

    #[tool(
        description = "Add page numbers with fixed margins from the page edge. The output is always cached (output_cache_key) for chaining."
    )]
    async fn add_page_numbers(
        &self,
        Parameters(params): Parameters<AddPageNumbersParams>,
    ) -> String {
        let result = self.process_add_page_numbers(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "add_page_numbers failed");
            StampResult::failed(Self::source_name(&params.source), &e)
        });
        to_json(&serde_json::json!({ "results": [result] }))
    }

    #[tool(
        description = "Place signature, text, name, date and image elements positioned on a browser canvas. Each element's `page` is a zero-based index into `pages`, which gives the canvas size each page was shown at. Pages without originalWidth/originalHeight are skipped. The output is always cached (output_cache_key)."
    )]
    async fn sign_pdf(&self, Parameters(params): Parameters<SignPdfParams>) -> String {
        let result = self.process_sign_pdf(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "sign_pdf failed");
            StampResult::failed(Self::source_name(&params.source), &e)
        });
        to_json(&serde_json::json!({ "results": [result] }))
    }

    #[tool(
        description = "Report each page's displayed size in points and its rotation, for sizing watermarks or canvases."
    )]
    async fn get_page_dimensions(
        &self,
        Parameters(params): Parameters<GetPageDimensionsParams>,
    ) -> String {
        let mut results = Vec::new();
        for source in &params.sources {
            let result = self
                .process_get_page_dimensions(source)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "get_page_dimensions failed");
                    GetPageDimensionsResult {
                        source: Self::source_name(source),
                        page_count: 0,
                        pages: Vec::new(),
                        error: Some(e.client_message()),
                    }
                });
            results.push(result);
        }
        to_json(&serde_json::json!({ "results": results }))
    }
}

impl Default for PdfServer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfServer {
    fn source_name(source: &PdfSource) -> String {
        match source {
            PdfSource::Path { path } => path.clone(),
            PdfSource::Base64 { .. } => "<base64>".to_string(),
            PdfSource::Url { url } => url.clone(),
            PdfSource::CacheRef { cache_key } => format!("<cache:{}>", cache_key),
        }
    }

    async fn resolve_source(&self, source: &PdfSource) -> crate::error::Result<ResolvedAsset> {
        match source {
            PdfSource::Path { path } => {
                let allowed = self.validate_path_access(path)?;
                resolve_path(allowed, AssetKind::Pdf)
            }
            PdfSource::Base64 { base64 } => resolve_base64(base64, AssetKind::Pdf),
            PdfSource::Url { url } => {
                resolve_url(
                    url,
                    AssetKind::Pdf,
                    self.config.allow_private_urls,
                    self.config.max_download_bytes,
                )
                .await
            }
            PdfSource::CacheRef { cache_key } => resolve_cache(cache_key, &self.cache),
        }
    }

    async fn resolve_image(&self, source: &ImageSource) -> crate::error::Result<Vec<u8>> {
        let resolved = match source {
            ImageSource::Path { path } => {
                let allowed = self.validate_path_access(path)?;
                resolve_path(allowed, AssetKind::Image)?
            }
            ImageSource::Base64 { base64 } => resolve_base64(base64, AssetKind::Image)?,
            ImageSource::Url { url } => {
                resolve_url(
                    url,
                    AssetKind::Image,
                    self.config.allow_private_urls,
                    self.config.max_download_bytes,
                )
                .await?
            }
        };
        Ok(resolved.data)
    }

    fn within_resource_dirs(&self, canonical: &Path) -> bool {
        self.config.resource_dirs.iter().any(|dir| {
            std::fs::canonicalize(dir)
                .map(|dir| canonical.starts_with(dir))
                .unwrap_or(false)
        })
    }

    /// Resolve `path` and check it is inside a resource directory.
    /// Without configured directories every path is allowed.
    fn validate_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let denied = || Error::PathAccessDenied {
            path: path.to_string(),
        };
        let canonical = std::fs::canonicalize(path).map_err(|_| denied())?;
        if self.within_resource_dirs(&canonical) {
            Ok(canonical)
        } else {
            Err(denied())
        }
    }

    /// Like [`Self::validate_path_access`] for a file that may not exist yet;
    /// the parent directory is canonicalized instead.
    fn validate_output_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let denied = || Error::PathAccessDenied {
            path: path.to_string(),
        };
        let target = Path::new(path);
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file_name = target.file_name().ok_or_else(denied)?;
        let canonical = std::fs::canonicalize(parent)
            .map_err(|_| denied())?
            .join(file_name);

        if self.within_resource_dirs(&canonical) {
            Ok(canonical)
        } else {
            Err(denied())
        }
    }

    fn write_output(
        &self,
        output_path: &Option<String>,
        data: &[u8],
    ) -> crate::error::Result<Option<String>> {
        let Some(path_str) = output_path else {
            return Ok(None);
        };
        let target = self.validate_output_path_access(path_str)?;

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&target, data)?;
        tracing::debug!(path = %target.display(), bytes = data.len(), "Wrote output");
        Ok(Some(path_str.clone()))
    }

    async fn source_page_count(&self, source: &PdfSource) -> crate::error::Result<(String, u32)> {
        let resolved = self.resolve_source(source).await?;
        let data = resolved.data;
        let count = tokio::task::spawn_blocking(move || {
            PdfDocument::load(&data).map(|doc| doc.page_count())
        })
        .await??;
        Ok((resolved.name, count))
    }

    async fn process_select_pages(
        &self,
        params: &SelectPagesParams,
    ) -> crate::error::Result<SelectPagesResult> {
        let (source, total_pages) = match (&params.source, params.total_pages) {
            (Some(source), _) => {
                let (name, count) = self.source_page_count(source).await?;
                (Some(name), count)
            }
            (None, Some(total)) => (None, total),
            (None, None) => {
                return Err(Error::InvalidParams {
                    reason: "either total_pages or source is required".to_string(),
                })
            }
        };

        let total_pages = check_total_pages(total_pages)?;

        let resolved = select_pages_lenient(total_pages, &params.mode, &params.custom_pages);
        Ok(SelectPagesResult {
            source,
            total_pages,
            count: resolved.value.len(),
            pages: resolved.value,
            warnings: resolved.warnings,
            error: None,
        })
    }

    fn process_calculate_placements(
        params: &CalculatePlacementsParams,
    ) -> CalculatePlacementsResult {
        let mut warnings = Vec::new();
        let anchor = Anchor::parse_lenient(&params.position).collect_into(&mut warnings);
        let request = PlacementRequest::new(
            anchor,
            Dimensions::new(params.page_width, params.page_height),
            Dimensions::new(params.content_width, params.content_height),
        )
        .with_custom(params.custom_x, params.custom_y);
        let placements = calculate_placements(&request).collect_into(&mut warnings);

        CalculatePlacementsResult {
            position: anchor,
            placements,
            warnings,
        }
    }

    fn process_map_coordinates(params: &MapCoordinatesParams) -> MapCoordinatesResult {
        let transform = CanvasTransform::new(
            Dimensions::new(params.page_width, params.page_height),
            Dimensions::new(params.canvas_width, params.canvas_height),
        );
        match transform {
            Some(t) => MapCoordinatesResult {
                scale_x: t.scale_x(),
                scale_y: t.scale_y(),
                rects: params.rects.iter().map(|r| t.to_pdf_rect(*r)).collect(),
                points: params
                    .points
                    .iter()
                    .map(|p| t.to_pdf_point(p.x, p.y, params.origin))
                    .collect(),
                error: None,
            },
            None => MapCoordinatesResult {
                scale_x: 0.0,
                scale_y: 0.0,
                rects: Vec::new(),
                points: Vec::new(),
                error: Some("Canvas width and height must be positive".to_string()),
            },
        }
    }

    fn process_format_page_numbers(
        params: &FormatPageNumbersParams,
    ) -> crate::error::Result<FormatPageNumbersResult> {
        let total_pages = check_total_pages(params.total_pages)?;
        let start_number = check_start_number(params.start_number)?;

        let mut warnings = Vec::new();
        let format = NumberFormat::parse_lenient(&params.format).collect_into(&mut warnings);
        let pages = pages_to_number(&params.pages, total_pages, params.skip_first_page)
            .collect_into(&mut warnings);

        let options = PageNumberOptions {
            format,
            start_number,
            prefix: params.prefix.clone(),
            suffix: params.suffix.clone(),
            ..PageNumberOptions::default()
        };
        Ok(FormatPageNumbersResult {
            labels: pages
                .into_iter()
                .map(|page| PageLabel {
                    page,
                    label: options.label(page),
                })
                .collect(),
            warnings,
            error: None,
        })
    }

    /// Load the source, run `stamp` on a blocking thread, then cache and
    /// optionally write the result.
    async fn run_stamp<F>(
        &self,
        tool: &'static str,
        source: &PdfSource,
        output_path: &Option<String>,
        stamp: F,
    ) -> crate::error::Result<StampResult>
    where
        F: FnOnce(&mut PdfDocument) -> crate::error::Result<StampReport> + Send + 'static,
    {
        let resolved = self.resolve_source(source).await?;
        let source_name = resolved.name;
        let data = resolved.data;

        let (output_data, output_page_count, report) = tokio::task::spawn_blocking(move || {
            let mut doc = PdfDocument::load(&data)?;
            let page_count = doc.page_count();
            let report = stamp(&mut doc)?;
            Ok::<_, Error>((doc.save()?, page_count, report))
        })
        .await??;

        let output_path = self.write_output(output_path, &output_data)?;
        // Always cache the output for chaining operations
        let output_cache_key = self.cache.insert(output_data, tool);

        tracing::info!(
            tool,
            source = %source_name,
            pages = report.pages_stamped.len(),
            warnings = report.warnings.len(),
            "Stamped PDF"
        );
        Ok(StampResult {
            source: source_name,
            output_cache_key,
            output_page_count,
            pages_stamped: report.pages_stamped,
            marks_drawn: report.marks_drawn,
            output_path,
            warnings: report.warnings,
            error: None,
        })
    }

    async fn process_watermark_pdf(
        &self,
        params: &WatermarkPdfParams,
    ) -> crate::error::Result<StampResult> {
        let mut warnings = Vec::new();
        let position = WatermarkPosition {
            anchor: Anchor::parse_lenient(&params.position).collect_into(&mut warnings),
            custom_x: params.custom_x,
            custom_y: params.custom_y,
            rotation_degrees: params.rotation.unwrap_or(DEFAULT_WATERMARK_ROTATION),
        };
        let opacity = opacity_from_percent(params.opacity);
        let mode = params.pages.clone();
        let custom_pages = params.custom_pages.clone();

        enum Stamp {
            Text(TextWatermark),
            Image(ImageWatermark),
        }

        let stamp = match params.watermark_type {
            WatermarkKind::Text => {
                let text = params
                    .text
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_WATERMARK_TEXT.to_string());
                let color = match params.text_color.as_deref() {
                    Some(hex) => hex_to_rgb_or(hex, Rgb::RED).collect_into(&mut warnings),
                    None => Rgb::RED,
                };
                Stamp::Text(TextWatermark {
                    text,
                    font: StandardFont::from_family(
                        params.font_family.as_deref().unwrap_or("arial"),
                    ),
                    font_size: params
                        .font_size
                        .filter(|s| s.is_finite() && *s > 0.0)
                        .unwrap_or(DEFAULT_WATERMARK_FONT_SIZE),
                    color,
                    opacity,
                    position,
                })
            }
            WatermarkKind::Image => {
                let image_source = params.image.as_ref().ok_or_else(|| Error::InvalidParams {
                    reason: "image watermarks need an image".to_string(),
                })?;
                Stamp::Image(ImageWatermark {
                    image: self.resolve_image(image_source).await?,
                    scale_percent: params.scale.unwrap_or(DEFAULT_IMAGE_SCALE_PERCENT),
                    opacity,
                    position,
                    max_pixels: self.config.max_image_pixels,
                })
            }
        };

        self.run_stamp("watermark_pdf", &params.source, &params.output_path, move |doc| {
            let pages = select_pages_lenient(doc.page_count(), &mode, &custom_pages)
                .collect_into(&mut warnings);
            let mut report = match &stamp {
                Stamp::Text(watermark) => apply_text_watermark(doc, &pages, watermark)?,
                Stamp::Image(watermark) => apply_image_watermark(doc, &pages, watermark)?,
            };
            warnings.append(&mut report.warnings);
            report.warnings = warnings;
            Ok(report)
        })
        .await
    }

    async fn process_add_page_numbers(
        &self,
        params: &AddPageNumbersParams,
    ) -> crate::error::Result<StampResult> {
        let start_number = check_start_number(params.start_number)?;

        let mut warnings = Vec::new();
        let color = match params.color.as_deref() {
            Some(hex) => hex_to_rgb_or(hex, Rgb::BLACK).collect_into(&mut warnings),
            None => Rgb::BLACK,
        };
        let options = PageNumberOptions {
            format: NumberFormat::parse_lenient(&params.format).collect_into(&mut warnings),
            start_number,
            prefix: params.prefix.clone(),
            suffix: params.suffix.clone(),
            position: NumberPosition::parse_lenient(&params.position).collect_into(&mut warnings),
            margins: Margins {
                x: params.margin_x.unwrap_or(DEFAULT_NUMBER_MARGIN_X),
                y: params.margin_y.unwrap_or(DEFAULT_NUMBER_MARGIN_Y),
            },
            font: StandardFont::from_family(
                params.font_family.as_deref().unwrap_or("helvetica"),
            ),
            font_size: params
                .font_size
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(DEFAULT_NUMBER_FONT_SIZE),
            color,
        };
        let spec = params.pages.clone();
        let skip_first_page = params.skip_first_page;

        self.run_stamp("add_page_numbers", &params.source, &params.output_path, move |doc| {
            let pages = pages_to_number(&spec, doc.page_count(), skip_first_page)
                .collect_into(&mut warnings);
            let mut report = add_page_numbers(doc, &pages, &options)?;
            warnings.append(&mut report.warnings);
            report.warnings = warnings;
            Ok(report)
        })
        .await
    }

    async fn process_sign_pdf(&self, params: &SignPdfParams) -> crate::error::Result<StampResult> {
        if params.elements.is_empty() {
            return Err(Error::InvalidParams {
                reason: "no elements provided for signing".to_string(),
            });
        }
        if params.pages.is_empty() {
            return Err(Error::InvalidParams {
                reason: "no page data provided".to_string(),
            });
        }

        let elements = params.elements.clone();
        let canvas_pages = params.pages.clone();
        let max_pixels = self.config.max_image_pixels;

        self.run_stamp("sign_pdf", &params.source, &params.output_path, move |doc| {
            apply_signature_elements(doc, &canvas_pages, &elements, max_pixels)
        })
        .await
    }

    async fn process_get_page_dimensions(
        &self,
        source: &PdfSource,
    ) -> crate::error::Result<GetPageDimensionsResult> {
        let resolved = self.resolve_source(source).await?;
        let data = resolved.data;

        let (page_count, pages) = tokio::task::spawn_blocking(move || {
            let doc = PdfDocument::load(&data)?;
            let pages = (1..=doc.page_count())
                .map(|page| {
                    let size = doc.page_dimensions(page)?;
                    Ok(PageDimensions {
                        page,
                        width: size.width,
                        height: size.height,
                        rotation: doc.page_rotation(page)?,
                    })
                })
                .collect::<crate::error::Result<Vec<_>>>()?;
            Ok::<_, Error>((doc.page_count(), pages))
        })
        .await??;

        Ok(GetPageDimensionsResult {
            source: resolved.name,
            page_count,
            pages,
            error: None,
        })
    }
}

#[tool_handler]
impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF stamping server: resolve page selections, compute watermark placements, \
                 map canvas coordinates to PDF space, and apply watermarks, page numbers and \
                 signatures. Stamped PDFs are cached; pass {\"cache_key\": ...} to chain tools."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server without resource directories
pub async fn run_server() -> anyhow::Result<()> {
    run_server_with_config(ServerConfig::default()).await
}

/// Run the MCP server restricted to `resource_dirs`
pub async fn run_server_with_dirs(resource_dirs: Vec<String>) -> anyhow::Result<()> {
    run_server_with_config(ServerConfig {
        resource_dirs,
        ..ServerConfig::default()
    })
    .await
}

pub async fn run_server_with_config(config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!(
        resource_dirs = ?config.resource_dirs,
        allow_private_urls = config.allow_private_urls,
        "PDF stamp server ready, waiting for connections..."
    );
    let server = PdfServer::with_config(config);

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{pdf_with_pages, png};
    use base64::Engine;
    use std::collections::HashMap;

    fn base64_source(data: &[u8]) -> PdfSource {
        PdfSource::Base64 {
            base64: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    fn letter_pdf(pages: usize) -> PdfSource {
        base64_source(&pdf_with_pages(&vec![(612, 792); pages]))
    }

    fn watermark_params(source: PdfSource) -> WatermarkPdfParams {
        let mut params: WatermarkPdfParams = serde_json::from_value(serde_json::json!({
            "source": {"path": "unused.pdf"}
        }))
        .unwrap();
        params.source = source;
        params
    }

    #[test]
    fn test_source_name() {
        assert_eq!(
            PdfServer::source_name(&PdfSource::Path {
                path: "/test.pdf".to_string()
            }),
            "/test.pdf"
        );
        assert_eq!(
            PdfServer::source_name(&PdfSource::Base64 {
                base64: "...".to_string()
            }),
            "<base64>"
        );
        assert_eq!(
            PdfServer::source_name(&PdfSource::CacheRef {
                cache_key: "abc123".to_string()
            }),
            "<cache:abc123>"
        );
    }

    #[test]
    fn test_pdf_source_deserialization() {
        let source: PdfSource = serde_json::from_str(r#"{"path": "/test.pdf"}"#).unwrap();
        assert!(matches!(source, PdfSource::Path { .. }));

        let source: PdfSource = serde_json::from_str(r#"{"cache_key": "abc"}"#).unwrap();
        assert!(matches!(source, PdfSource::CacheRef { .. }));

        let err = serde_json::from_str::<PdfSource>(r#"{"file": "/x.pdf"}"#).unwrap_err();
        assert!(err.to_string().contains("got keys"));

        let err = serde_json::from_str::<PdfSource>(r#""/x.pdf""#).unwrap_err();
        assert!(err.to_string().contains("a string"));

        let err = serde_json::from_str::<PdfSource>(r#"{"path": 3}"#).unwrap_err();
        assert!(err.to_string().contains("\"path\" must be a string"));
    }

    #[test]
    fn test_config_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("PDF_STAMP_ALLOW_PRIVATE_URLS", "true"),
            ("PDF_STAMP_CACHE_MAX_ENTRIES", "7"),
            ("PDF_STAMP_MAX_IMAGE_PIXELS", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let config = ServerConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()));

        assert!(config.allow_private_urls);
        assert_eq!(config.cache_max_entries, 7);
        assert_eq!(config.max_image_pixels, ServerConfig::default().max_image_pixels);
        assert!(config.resource_dirs.is_empty());
    }

    #[test]
    fn test_calculate_placements_reports_fallback() {
        let params = CalculatePlacementsParams {
            page_width: 600.0,
            page_height: 800.0,
            content_width: 100.0,
            content_height: 50.0,
            position: "middle".to_string(),
            custom_x: None,
            custom_y: None,
        };
        let result = PdfServer::process_calculate_placements(&params);
        assert_eq!(result.position, Anchor::Center);
        assert_eq!(result.placements, vec![Placement::new(250.0, 375.0)]);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_map_coordinates_rejects_empty_canvas() {
        let params = MapCoordinatesParams {
            page_width: 612.0,
            page_height: 792.0,
            canvas_width: 0.0,
            canvas_height: 792.0,
            rects: vec![Rect::new(0.0, 0.0, 10.0, 10.0)],
            points: Vec::new(),
            origin: Origin::TopLeft,
        };
        let result = PdfServer::process_map_coordinates(&params);
        assert!(result.error.is_some());
        assert!(result.rects.is_empty());
    }

    #[test]
    fn test_format_page_numbers() {
        let params: FormatPageNumbersParams = serde_json::from_value(serde_json::json!({
            "total_pages": 4,
            "format": "roman",
            "prefix": "p. ",
            "skip_first_page": true
        }))
        .unwrap();
        let result = PdfServer::process_format_page_numbers(&params).unwrap();
        let labels: Vec<&str> = result.labels.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["p. II", "p. III", "p. IV"]);
    }

    #[test]
    fn test_format_page_numbers_rejects_huge_inputs() {
        let params: FormatPageNumbersParams = serde_json::from_value(serde_json::json!({
            "total_pages": u32::MAX
        }))
        .unwrap();
        assert!(matches!(
            PdfServer::process_format_page_numbers(&params),
            Err(Error::InvalidParams { .. })
        ));

        let params: FormatPageNumbersParams = serde_json::from_value(serde_json::json!({
            "total_pages": 3,
            "start_number": i64::MAX
        }))
        .unwrap();
        assert!(matches!(
            PdfServer::process_format_page_numbers(&params),
            Err(Error::InvalidParams { .. })
        ));

        let params: FormatPageNumbersParams = serde_json::from_value(serde_json::json!({
            "total_pages": MAX_TOTAL_PAGES,
            "pages": "1",
            "start_number": -MAX_START_NUMBER
        }))
        .unwrap();
        let result = PdfServer::process_format_page_numbers(&params).unwrap();
        assert_eq!(result.labels[0].label, "-1000000000");
    }

    #[test]
    fn test_server_advertises_tools() {
        let server = PdfServer::new();
        assert!(server.get_info().capabilities.tools.is_some());

        let names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        assert_eq!(names.len(), 9);
        for expected in ["select_pages", "format_page_numbers", "sign_pdf"] {
            assert!(names.iter().any(|name| name == expected), "missing {}", expected);
        }
    }

    #[tokio::test]
    async fn test_select_pages_from_source() {
        let server = PdfServer::new();
        let params = SelectPagesParams {
            total_pages: None,
            source: Some(letter_pdf(5)),
            mode: "even".to_string(),
            custom_pages: String::new(),
        };
        let result = server.process_select_pages(&params).await.unwrap();
        assert_eq!(result.total_pages, 5);
        assert_eq!(result.pages, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_select_pages_needs_length() {
        let server = PdfServer::new();
        let params = SelectPagesParams {
            total_pages: None,
            source: None,
            mode: "all".to_string(),
            custom_pages: String::new(),
        };
        assert!(matches!(
            server.process_select_pages(&params).await,
            Err(Error::InvalidParams { .. })
        ));
    }

    #[tokio::test]
    async fn test_select_pages_caps_document_length() {
        let server = PdfServer::new();
        let mut params = SelectPagesParams {
            total_pages: Some(u32::MAX),
            source: None,
            mode: "all".to_string(),
            custom_pages: String::new(),
        };
        assert!(matches!(
            server.process_select_pages(&params).await,
            Err(Error::InvalidParams { .. })
        ));

        params.total_pages = Some(MAX_TOTAL_PAGES);
        params.mode = "custom".to_string();
        params.custom_pages = "99999-100005".to_string();
        let result = server.process_select_pages(&params).await.unwrap();
        assert_eq!(result.pages, vec![99_999, 100_000]);
    }

    #[tokio::test]
    async fn test_add_page_numbers_rejects_huge_start() {
        let server = PdfServer::new();
        let mut params: AddPageNumbersParams = serde_json::from_value(serde_json::json!({
            "source": {"path": "unused.pdf"},
            "start_number": i64::MIN
        }))
        .unwrap();
        params.source = letter_pdf(1);
        assert!(matches!(
            server.process_add_page_numbers(&params).await,
            Err(Error::InvalidParams { .. })
        ));
    }

    #[tokio::test]
    async fn test_watermark_then_number_via_cache() {
        let server = PdfServer::new();
        let mut params = watermark_params(letter_pdf(3));
        params.pages = "custom".to_string();
        params.custom_pages = "1,3,7".to_string();

        let watermarked = server.process_watermark_pdf(&params).await.unwrap();
        assert_eq!(watermarked.pages_stamped, vec![1, 3]);
        assert_eq!(watermarked.output_page_count, 3);
        assert_eq!(watermarked.warnings.len(), 1);
        let key = watermarked.output_cache_key.unwrap();

        let number_params: AddPageNumbersParams = serde_json::from_value(serde_json::json!({
            "source": {"cache_key": key},
            "format": "alphabetic"
        }))
        .unwrap();
        let numbered = server.process_add_page_numbers(&number_params).await.unwrap();
        assert_eq!(numbered.pages_stamped, vec![1, 2, 3]);
        assert!(numbered.output_cache_key.is_some());
        assert_eq!(server.cache.len(), 2);
    }

    #[tokio::test]
    async fn test_image_watermark_requires_image() {
        let server = PdfServer::new();
        let mut params = watermark_params(letter_pdf(1));
        params.watermark_type = WatermarkKind::Image;
        assert!(matches!(
            server.process_watermark_pdf(&params).await,
            Err(Error::InvalidParams { .. })
        ));

        params.image = Some(ImageSource::Base64 {
            base64: base64::engine::general_purpose::STANDARD.encode(png(20, 10, 255)),
        });
        let result = server.process_watermark_pdf(&params).await.unwrap();
        assert_eq!(result.marks_drawn, 1);
    }

    #[tokio::test]
    async fn test_sign_pdf_requires_elements() {
        let server = PdfServer::new();
        let params: SignPdfParams = serde_json::from_value(serde_json::json!({
            "source": {"path": "unused.pdf"},
            "elements": [],
            "pages": [{"width": 612, "height": 792, "originalWidth": 612, "originalHeight": 792}]
        }))
        .unwrap();
        assert!(matches!(
            server.process_sign_pdf(&params).await,
            Err(Error::InvalidParams { .. })
        ));
    }

    #[tokio::test]
    async fn test_output_path_sandbox() {
        let allowed = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let server =
            PdfServer::with_resource_dirs(vec![allowed.path().to_string_lossy().into_owned()]);

        let mut params = watermark_params(letter_pdf(1));
        params.output_path = Some(outside.path().join("out.pdf").to_string_lossy().into_owned());
        assert!(matches!(
            server.process_watermark_pdf(&params).await,
            Err(Error::PathAccessDenied { .. })
        ));

        let target = allowed.path().join("out.pdf");
        params.output_path = Some(target.to_string_lossy().into_owned());
        let result = server.process_watermark_pdf(&params).await.unwrap();
        assert!(result.output_path.is_some());
        assert!(std::fs::read(&target).unwrap().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_get_page_dimensions() {
        let server = PdfServer::new();
        let source = base64_source(&pdf_with_pages(&[(612, 792), (842, 595)]));
        let result = server.process_get_page_dimensions(&source).await.unwrap();
        assert_eq!(result.page_count, 2);
        assert_eq!(result.pages[1].width, 842.0);
        assert_eq!(result.pages[1].rotation, 0);
    }
}
