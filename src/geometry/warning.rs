//! Degraded-result reporting for the geometry engine
//!
//! Geometry functions never fail on user input. When they drop a token or
//! fall back to a default they say so through a [`Warning`], carried next to
//! the value in [`Resolved`].

use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;

/// Something the engine ignored or replaced while resolving user input
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Range token that did not parse, or whose start exceeds its end
    MalformedRangeToken { token: String },
    /// Single page outside `1..=total_pages`
    PageOutOfRange { page: i64, total_pages: u32 },
    /// Range whose upper bound was cut to the document length
    RangeClamped { token: String, total_pages: u32 },
    /// Page selection mode that is not all/even/odd/custom
    UnknownPageMode { value: String },
    /// Anchor name that is not recognised; `center` is used
    UnknownAnchor { value: String },
    /// Page-number position that is not recognised; `bottom-center` is used
    UnknownNumberPosition { value: String },
    /// Page-number format that is not recognised; `numeric` is used
    UnknownNumberFormat { value: String },
    /// Custom coordinate outside `[0, 100]` that was clamped
    CoordinateClamped { axis: char, value: f32 },
    /// Hex color that could not be decoded; the fallback is used
    InvalidColor { value: String },
    /// Page skipped because its UI canvas dimensions are missing or zero
    MissingCanvasDimensions { page: u32 },
    /// Element that could not be drawn on a page
    ElementSkipped { page: u32, reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MalformedRangeToken { token } => {
                write!(f, "ignored malformed page range \"{}\"", token)
            }
            Warning::PageOutOfRange { page, total_pages } => {
                write!(f, "ignored page {} (document has {} pages)", page, total_pages)
            }
            Warning::RangeClamped { token, total_pages } => {
                write!(f, "range \"{}\" clamped to {} pages", token, total_pages)
            }
            Warning::UnknownPageMode { value } => {
                write!(f, "unknown page mode \"{}\", using all pages", value)
            }
            Warning::UnknownAnchor { value } => {
                write!(f, "unknown position \"{}\", using center", value)
            }
            Warning::UnknownNumberPosition { value } => {
                write!(f, "unknown position \"{}\", using bottom-center", value)
            }
            Warning::UnknownNumberFormat { value } => {
                write!(f, "unknown number format \"{}\", using numeric", value)
            }
            Warning::CoordinateClamped { axis, value } => {
                write!(f, "custom {} = {} clamped to [0, 100]", axis, value)
            }
            Warning::InvalidColor { value } => write!(f, "invalid color \"{}\"", value),
            Warning::MissingCanvasDimensions { page } => {
                write!(f, "page {} skipped: missing canvas dimensions", page)
            }
            Warning::ElementSkipped { page, reason } => {
                write!(f, "element on page {} skipped: {}", page, reason)
            }
        }
    }
}

/// A value produced from lenient input, plus whatever was dropped on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Resolved<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Move the warnings into `sink` and return the value.
    pub fn collect_into(self, sink: &mut Vec<Warning>) -> T {
        sink.extend(self.warnings);
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_into_drains_warnings() {
        let resolved = Resolved::with_warnings(
            7,
            vec![Warning::UnknownAnchor {
                value: "middle".to_string(),
            }],
        );
        let mut sink = Vec::new();
        assert_eq!(resolved.collect_into(&mut sink), 7);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let json = serde_json::to_value(Warning::MalformedRangeToken {
            token: "5-2".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "malformed_range_token");
        assert_eq!(json["token"], "5-2");
    }

    #[test]
    fn test_display() {
        let w = Warning::MissingCanvasDimensions { page: 3 };
        assert_eq!(w.to_string(), "page 3 skipped: missing canvas dimensions");
    }
}
