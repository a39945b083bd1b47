//! Standard 14 fonts used for stamped text
//!
//! Widths are the AFM advance widths (1/1000 em) for the printable ASCII
//! range. Other characters fall back to an average glyph width.

use lopdf::{Dictionary, Object};

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

const COURIER_WIDTH: u16 = 600;

/// Standard font used for stamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StandardFont {
    #[default]
    Helvetica,
    TimesRoman,
    Courier,
}

impl StandardFont {
    /// Map a UI font family to the closest standard font.
    ///
    /// Arial and unknown families use Helvetica.
    pub fn from_family(family: &str) -> Self {
        let family = family.to_ascii_lowercase();
        if family.contains("arial") || family.contains("helvetica") {
            Self::Helvetica
        } else if family.contains("times") || family.contains("serif") {
            Self::TimesRoman
        } else if family.contains("courier") {
            Self::Courier
        } else {
            Self::Helvetica
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::TimesRoman => "Times-Roman",
            Self::Courier => "Courier",
        }
    }

    /// Ascender minus descender, in 1/1000 em
    fn height_units(&self) -> f32 {
        match self {
            Self::Helvetica => 718.0 + 207.0,
            Self::TimesRoman => 683.0 + 217.0,
            Self::Courier => 629.0 + 157.0,
        }
    }

    fn char_width(&self, c: char) -> u16 {
        let index = (c as u32).wrapping_sub(32) as usize;
        match self {
            Self::Helvetica => HELVETICA_WIDTHS.get(index).copied().unwrap_or(556),
            Self::TimesRoman => TIMES_ROMAN_WIDTHS.get(index).copied().unwrap_or(500),
            Self::Courier => COURIER_WIDTH,
        }
    }

    /// Advance width of `text` at `size` points
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.char_width(c))).sum();
        units as f32 * size / 1000.0
    }

    /// Line height of the font at `size` points
    pub fn height_at_size(&self, size: f32) -> f32 {
        self.height_units() * size / 1000.0
    }

    /// Type1 font dictionary with WinAnsi encoding
    pub fn dictionary(&self) -> Dictionary {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(self.base_font().as_bytes().to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        font
    }
}

/// Encode text as a PDF hex string for a WinAnsi font.
///
/// Latin-1 characters map directly; anything else becomes `?`.
pub fn encode_hex_string(text: &str) -> String {
    let mut hex = String::with_capacity(text.len() * 2 + 2);
    hex.push('<');
    for c in text.chars() {
        let byte = match c as u32 {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        };
        hex.push_str(&format!("{:02X}", byte));
    }
    hex.push('>');
    hex
}
