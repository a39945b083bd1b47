//! Page selection: range strings and all/even/odd/custom modes

use super::warning::{Resolved, Warning};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which pages of a document an operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PageSelectionMode {
    #[default]
    All,
    Even,
    Odd,
    Custom,
}

impl PageSelectionMode {
    /// Parse a mode arriving from outside the type system.
    ///
    /// Unknown values select all pages.
    pub fn parse_lenient(value: &str) -> Resolved<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Resolved::clean(Self::All),
            "even" => Resolved::clean(Self::Even),
            "odd" => Resolved::clean(Self::Odd),
            "custom" => Resolved::clean(Self::Custom),
            _ => Resolved::with_warnings(
                Self::All,
                vec![Warning::UnknownPageMode {
                    value: value.to_string(),
                }],
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Even => "even",
            Self::Odd => "odd",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PageSelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page selection as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageSelection {
    /// Selection mode: "all", "even", "odd" or "custom" (default: "all")
    #[serde(default)]
    pub mode: PageSelectionMode,
    /// Range string used by the "custom" mode, e.g. "1-3,5,9-11"
    #[serde(default)]
    pub custom_pages: String,
}

impl PageSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn custom(spec: impl Into<String>) -> Self {
        Self {
            mode: PageSelectionMode::Custom,
            custom_pages: spec.into(),
        }
    }

    pub fn resolve(&self, total_pages: u32) -> Resolved<Vec<u32>> {
        select_pages(total_pages, self.mode, &self.custom_pages)
    }
}

/// Leading-integer parse: optional sign followed by at least one digit.
/// Anything after the digits is ignored ("3abc" is 3, "abc" is nothing).
fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Saturate instead of failing on absurdly long digit runs
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// Parse a comma separated list of pages and ranges ("1-3,5,9-11").
///
/// Malformed tokens, inverted ranges and pages outside `1..=total_pages`
/// are dropped and reported as warnings. The result is sorted and has no
/// duplicates.
pub fn parse_page_ranges(spec: &str, total_pages: u32) -> Resolved<Vec<u32>> {
    let mut pages = BTreeSet::new();
    let mut warnings = Vec::new();
    let total = i64::from(total_pages);

    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if token.contains('-') {
            let mut bounds = token.split('-');
            let start = bounds.next().and_then(|s| parse_int_prefix(s.trim()));
            let end = bounds.next().and_then(|s| parse_int_prefix(s.trim()));

            let (start, end) = match (start, end) {
                (Some(start), Some(end)) if start <= end => (start, end),
                _ => {
                    warnings.push(Warning::MalformedRangeToken {
                        token: token.to_string(),
                    });
                    continue;
                }
            };

            if end > total {
                warnings.push(Warning::RangeClamped {
                    token: token.to_string(),
                    total_pages,
                });
            }

            for page in start.max(1)..=end.min(total) {
                // Bounded by total_pages, which is a u32
                pages.insert(page as u32);
            }
        } else {
            match parse_int_prefix(token) {
                Some(page) if page > 0 && page <= total => {
                    pages.insert(page as u32);
                }
                Some(page) => warnings.push(Warning::PageOutOfRange { page, total_pages }),
                None => warnings.push(Warning::MalformedRangeToken {
                    token: token.to_string(),
                }),
            }
        }
    }

    Resolved::with_warnings(pages.into_iter().collect(), warnings)
}

/// Resolve a selection mode against a document length.
pub fn select_pages(
    total_pages: u32,
    mode: PageSelectionMode,
    custom_spec: &str,
) -> Resolved<Vec<u32>> {
    match mode {
        PageSelectionMode::All => Resolved::clean((1..=total_pages).collect()),
        PageSelectionMode::Even => Resolved::clean((2..=total_pages).step_by(2).collect()),
        PageSelectionMode::Odd => Resolved::clean((1..=total_pages).step_by(2).collect()),
        PageSelectionMode::Custom => parse_page_ranges(custom_spec, total_pages),
    }
}

/// [`select_pages`] for a mode given as a loose string.
pub fn select_pages_lenient(
    total_pages: u32,
    mode: &str,
    custom_spec: &str,
) -> Resolved<Vec<u32>> {
    let mut warnings = Vec::new();
    let mode = PageSelectionMode::parse_lenient(mode).collect_into(&mut warnings);
    let pages = select_pages(total_pages, mode, custom_spec).collect_into(&mut warnings);
    Resolved::with_warnings(pages, warnings)
}

/// Number of pages a range string covers. An empty string means every page.
pub fn count_pages_in_ranges(spec: &str, total_pages: u32) -> usize {
    if spec.trim().is_empty() {
        return total_pages as usize;
    }
    parse_page_ranges(spec, total_pages).value.len()
}

/// Drop page 1 from a selection (page numbering's "skip first page").
pub fn exclude_first_page(pages: &[u32]) -> Vec<u32> {
    pages.iter().copied().filter(|&p| p != 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_ranges() {
        assert_eq!(parse_page_ranges("1-3", 10).value, vec![1, 2, 3]);
        assert_eq!(parse_page_ranges("1,3,5", 10).value, vec![1, 3, 5]);
        assert_eq!(
            parse_page_ranges("1-3,5,7-9", 10).value,
            vec![1, 2, 3, 5, 7, 8, 9]
        );
        assert_eq!(parse_page_ranges("1,1,2,2", 10).value, vec![1, 2]);
    }

    #[test]
    fn test_parse_page_ranges_clamps_to_document() {
        let resolved = parse_page_ranges("1-3,5,9-11", 10);
        assert_eq!(resolved.value, vec![1, 2, 3, 5, 9, 10]);
        assert_eq!(
            resolved.warnings,
            vec![Warning::RangeClamped {
                token: "9-11".to_string(),
                total_pages: 10
            }]
        );
    }

    #[test]
    fn test_parse_page_ranges_drops_malformed_tokens() {
        let resolved = parse_page_ranges("abc,5-2,4", 10);
        assert_eq!(resolved.value, vec![4]);
        assert_eq!(resolved.warnings.len(), 2);
        assert!(resolved
            .warnings
            .iter()
            .all(|w| matches!(w, Warning::MalformedRangeToken { .. })));
    }

    #[test]
    fn test_parse_page_ranges_out_of_bounds_single() {
        let resolved = parse_page_ranges("0,11,3", 10);
        assert_eq!(resolved.value, vec![3]);
        assert_eq!(resolved.warnings.len(), 2);
    }

    #[test]
    fn test_parse_page_ranges_empty_inputs() {
        assert!(parse_page_ranges("", 10).value.is_empty());
        assert!(parse_page_ranges(" , ,", 10).value.is_empty());
        assert!(parse_page_ranges("1-5", 0).value.is_empty());
    }

    #[test]
    fn test_parse_page_ranges_overlap() {
        assert_eq!(parse_page_ranges("1-3,2-4", 10).value, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_page_ranges_lenient_numbers() {
        // Leading digits count, trailing garbage is ignored
        assert_eq!(parse_page_ranges("2abc, 4 - 5", 10).value, vec![2, 4, 5]);
        // Negative start: zero and below never make it into the result
        assert!(parse_page_ranges("-3", 10).value.is_empty());
        assert_eq!(parse_page_ranges("0-2", 10).value, vec![1, 2]);
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix("  7x"), Some(7));
        assert_eq!(parse_int_prefix("+3"), Some(3));
        assert_eq!(parse_int_prefix("-3"), Some(-3));
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("x7"), None);
        assert_eq!(parse_int_prefix("99999999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn test_select_pages_modes() {
        assert_eq!(
            select_pages(10, PageSelectionMode::Even, "").value,
            vec![2, 4, 6, 8, 10]
        );
        assert_eq!(
            select_pages(7, PageSelectionMode::Odd, "").value,
            vec![1, 3, 5, 7]
        );
        assert_eq!(
            select_pages(3, PageSelectionMode::All, "ignored").value,
            vec![1, 2, 3]
        );
        assert_eq!(
            select_pages(10, PageSelectionMode::Custom, "2-3").value,
            vec![2, 3]
        );
        assert!(select_pages(0, PageSelectionMode::Odd, "").value.is_empty());
        assert!(select_pages(1, PageSelectionMode::Even, "").value.is_empty());
    }

    #[test]
    fn test_select_pages_lenient_unknown_mode() {
        let resolved = select_pages_lenient(3, "every-other", "");
        assert_eq!(resolved.value, vec![1, 2, 3]);
        assert_eq!(
            resolved.warnings,
            vec![Warning::UnknownPageMode {
                value: "every-other".to_string()
            }]
        );
    }

    #[test]
    fn test_mode_parse_is_case_insensitive() {
        assert_eq!(
            PageSelectionMode::parse_lenient("EVEN").value,
            PageSelectionMode::Even
        );
        assert!(PageSelectionMode::parse_lenient(" custom ").is_clean());
    }

    #[test]
    fn test_count_pages_in_ranges() {
        assert_eq!(count_pages_in_ranges("", 12), 12);
        assert_eq!(count_pages_in_ranges("1-3,3,20", 12), 3);
    }

    #[test]
    fn test_exclude_first_page() {
        assert_eq!(exclude_first_page(&[1, 2, 3]), vec![2, 3]);
        assert_eq!(exclude_first_page(&[2, 3]), vec![2, 3]);
    }

    #[test]
    fn test_page_selection_deserialization() {
        let selection: PageSelection =
            serde_json::from_str(r#"{"mode": "custom", "custom_pages": "1-2"}"#).unwrap();
        assert_eq!(selection.resolve(5).value, vec![1, 2]);

        let selection: PageSelection = serde_json::from_str("{}").unwrap();
        assert_eq!(selection.mode, PageSelectionMode::All);
    }
}
