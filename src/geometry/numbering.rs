//! Page label formatting

use super::warning::{Resolved, Warning};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const ROMAN_NUMERALS: [(i64, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// 1, 2, 3
    #[default]
    Numeric,
    /// I, II, III
    Roman,
    /// A, B, ..., Z, AA, AB
    Alphabetic,
}

impl NumberFormat {
    pub fn parse_lenient(value: &str) -> Resolved<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "numeric" | "" => Resolved::clean(Self::Numeric),
            "roman" => Resolved::clean(Self::Roman),
            "alphabetic" => Resolved::clean(Self::Alphabetic),
            _ => Resolved::with_warnings(
                Self::Numeric,
                vec![Warning::UnknownNumberFormat {
                    value: value.to_string(),
                }],
            ),
        }
    }
}

/// Largest value written in roman numerals; bigger values stay numeric.
pub const MAX_ROMAN: i64 = 3999;

pub fn to_roman(mut n: i64) -> String {
    if n > MAX_ROMAN {
        return n.to_string();
    }
    let mut roman = String::new();
    for (value, numeral) in ROMAN_NUMERALS {
        while n >= value {
            roman.push_str(numeral);
            n -= value;
        }
    }
    roman
}

/// Bijective base-26: 1 → A, 26 → Z, 27 → AA.
pub fn to_alphabetic(mut n: i64) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        let remainder = ((n - 1) % 26) as u8;
        letters.push(char::from(b'A' + remainder));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Label for `page` when numbering starts at `start_number`.
///
/// Roman and alphabetic labels are empty for values below one. A value
/// that does not fit in an `i64` gives an empty label.
pub fn format_page_number(page: u32, format: NumberFormat, start_number: i64) -> String {
    let Some(actual) = start_number.checked_add(i64::from(page) - 1) else {
        return String::new();
    };
    match format {
        NumberFormat::Numeric => actual.to_string(),
        NumberFormat::Roman => to_roman(actual),
        NumberFormat::Alphabetic => to_alphabetic(actual),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roman() {
        assert_eq!(to_roman(1), "I");
        assert_eq!(to_roman(4), "IV");
        assert_eq!(to_roman(14), "XIV");
        assert_eq!(to_roman(1994), "MCMXCIV");
        assert_eq!(to_roman(0), "");
        assert_eq!(to_roman(3999), "MMMCMXCIX");
        assert_eq!(to_roman(4000), "4000");
        assert_eq!(to_roman(i64::MAX), i64::MAX.to_string());
    }

    #[test]
    fn test_alphabetic() {
        assert_eq!(to_alphabetic(1), "A");
        assert_eq!(to_alphabetic(26), "Z");
        assert_eq!(to_alphabetic(27), "AA");
        assert_eq!(to_alphabetic(28), "AB");
        assert_eq!(to_alphabetic(702), "ZZ");
        assert_eq!(to_alphabetic(703), "AAA");
        assert_eq!(to_alphabetic(0), "");
    }

    #[test]
    fn test_format_page_number_offsets_start() {
        assert_eq!(format_page_number(1, NumberFormat::Numeric, 1), "1");
        assert_eq!(format_page_number(3, NumberFormat::Numeric, 10), "12");
        assert_eq!(format_page_number(2, NumberFormat::Roman, 3), "IV");
        assert_eq!(format_page_number(1, NumberFormat::Alphabetic, 26), "Z");
        assert_eq!(format_page_number(1, NumberFormat::Numeric, -4), "-4");
    }

    #[test]
    fn test_format_page_number_at_integer_limits() {
        assert_eq!(format_page_number(2, NumberFormat::Numeric, i64::MAX), "");
        assert_eq!(format_page_number(1, NumberFormat::Numeric, i64::MAX), i64::MAX.to_string());
        assert_eq!(format_page_number(0, NumberFormat::Alphabetic, i64::MIN), "");
        assert_eq!(format_page_number(u32::MAX, NumberFormat::Roman, 1), u32::MAX.to_string());
    }

    #[test]
    fn test_format_fallback() {
        let resolved = NumberFormat::parse_lenient("hex");
        assert_eq!(resolved.value, NumberFormat::Numeric);
        assert_eq!(resolved.warnings.len(), 1);
        assert_eq!(NumberFormat::parse_lenient("Roman").value, NumberFormat::Roman);
    }
}
