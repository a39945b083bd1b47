//! Error types for PDF Stamp MCP Server

use thiserror::Error;

/// Result type alias for PDF Stamp MCP Server
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for PDF Stamp MCP Server
#[derive(Error, Debug)]
pub enum Error {
    /// Input file not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// Hex color string that is not `#RRGGBB`
    #[error("Invalid color: {value}")]
    InvalidColor { value: String },

    /// Page out of bounds
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: u32, total: u32 },

    /// Tool arguments that do not fit together
    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    /// Stamp options that cannot be drawn (empty text, missing image, ...)
    #[error("Invalid stamp options: {reason}")]
    InvalidStamp { reason: String },

    /// Watermark or signature image could not be decoded
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Cache key not found
    #[error("Cache key not found: {key}")]
    CacheKeyNotFound { key: String },

    /// Source resolution error
    #[error("Failed to resolve source: {reason}")]
    SourceResolution { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// lopdf error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Blocking task failed to complete
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// SSRF blocked (URL resolves to private/reserved IP)
    #[error("SSRF blocked: {url}")]
    SsrfBlocked { url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },

    /// Image dimension exceeded
    #[error("Image dimension exceeded: {detail}")]
    ImageDimensionExceeded { detail: String },
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors, file sizes) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::FileNotFound { .. } => "File not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::InvalidColor { value } => format!("Invalid color: {}", value),
            Error::PageOutOfBounds { page, total } => {
                format!("Page {} out of bounds (total: {})", page, total)
            }
            Error::InvalidParams { reason } => format!("Invalid parameters: {}", reason),
            Error::InvalidStamp { reason } => format!("Invalid stamp options: {}", reason),
            Error::ImageDecode(_) => "Image could not be decoded".to_string(),
            Error::CacheKeyNotFound { .. } => "Cache key not found".to_string(),
            Error::SourceResolution { .. } => "Failed to resolve source".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::HttpRequest(_) => "HTTP request failed".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Pdf(_) => "PDF processing error".to_string(),
            Error::TaskJoin(_) => "PDF processing error".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::SsrfBlocked { .. } => "URL not allowed".to_string(),
            Error::DownloadTooLarge { max_size, .. } => {
                format!("Download exceeds maximum size of {} bytes", max_size)
            }
            Error::ImageDimensionExceeded { detail } => {
                format!("Image dimension exceeded: {}", detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_paths() {
        let err = Error::FileNotFound {
            path: "/secret/location/file.pdf".to_string(),
        };
        assert_eq!(err.client_message(), "File not found");
        assert!(err.to_string().contains("/secret/location"));
    }

    #[test]
    fn test_client_message_keeps_user_input_errors() {
        let err = Error::InvalidColor {
            value: "#GG0000".to_string(),
        };
        assert_eq!(err.client_message(), "Invalid color: #GG0000");
    }
}
