//! Content stream fragments for stamps

use super::font::encode_hex_string;
use crate::geometry::{Placement, Rgb};

/// Format a coordinate with at most three decimals
pub fn num(value: f32) -> String {
    let formatted = format!("{:.3}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Rotation about the draw origin as the first four matrix entries
fn rotation_matrix(degrees: f32) -> (f32, f32, f32, f32) {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    (cos, sin, -sin, cos)
}

/// One line of text whose baseline starts at `origin`, rotated about it
pub struct TextRun<'a> {
    pub text: &'a str,
    pub font_resource: &'a str,
    pub font_size: f32,
    pub color: Rgb,
    pub opacity_resource: Option<&'a str>,
    pub rotation_degrees: f32,
    pub origin: Placement,
}

impl TextRun<'_> {
    pub fn to_operations(&self) -> String {
        let (a, b, c, d) = rotation_matrix(self.rotation_degrees);
        let mut ops = String::from("q\n");
        if let Some(gs) = self.opacity_resource {
            ops.push_str(&format!("/{} gs\n", gs));
        }
        ops.push_str(&format!("{}\n", self.color.fill_op()));
        ops.push_str(&format!(
            "BT /{} {} Tf {} {} {} {} {} {} Tm {} Tj ET\n",
            self.font_resource,
            num(self.font_size),
            num(a),
            num(b),
            num(c),
            num(d),
            num(self.origin.x),
            num(self.origin.y),
            encode_hex_string(self.text)
        ));
        ops.push_str("Q\n");
        ops
    }
}

/// An image XObject scaled to `width` × `height` with its lower-left corner
/// at `origin`, rotated about that corner
pub struct ImagePlacement<'a> {
    pub xobject_resource: &'a str,
    pub width: f32,
    pub height: f32,
    pub opacity_resource: Option<&'a str>,
    pub rotation_degrees: f32,
    pub origin: Placement,
}

impl ImagePlacement<'_> {
    pub fn to_operations(&self) -> String {
        let (cos, sin, neg_sin, _) = rotation_matrix(self.rotation_degrees);
        let mut ops = String::from("q\n");
        if let Some(gs) = self.opacity_resource {
            ops.push_str(&format!("/{} gs\n", gs));
        }
        ops.push_str(&format!(
            "{} {} {} {} {} {} cm /{} Do\n",
            num(cos * self.width),
            num(sin * self.width),
            num(neg_sin * self.height),
            num(cos * self.height),
            num(self.origin.x),
            num(self.origin.y),
            self.xobject_resource
        ));
        ops.push_str("Q\n");
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_trims() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(0.5), "0.5");
        assert_eq!(num(12.34567), "12.346");
        assert_eq!(num(-0.0001), "0");
        assert_eq!(num(-2.5), "-2.5");
    }

    #[test]
    fn test_text_run_unrotated() {
        let run = TextRun {
            text: "Hi",
            font_resource: "StampF1",
            font_size: 12.0,
            color: Rgb::BLACK,
            opacity_resource: None,
            rotation_degrees: 0.0,
            origin: Placement::new(10.0, 20.0),
        };
        assert_eq!(
            run.to_operations(),
            "q\n0 0 0 rg\nBT /StampF1 12 Tf 1 0 0 1 10 20 Tm <4869> Tj ET\nQ\n"
        );
    }

    #[test]
    fn test_text_run_rotated_with_opacity() {
        let run = TextRun {
            text: "A",
            font_resource: "StampF1",
            font_size: 48.0,
            color: Rgb::RED,
            opacity_resource: Some("StampGS1"),
            rotation_degrees: 90.0,
            origin: Placement::new(0.0, 0.0),
        };
        let ops = run.to_operations();
        assert!(ops.contains("/StampGS1 gs"));
        assert!(ops.contains("0 1 -1 0 0 0 Tm"));
    }

    #[test]
    fn test_image_placement_scales() {
        let image = ImagePlacement {
            xobject_resource: "StampIm1",
            width: 100.0,
            height: 50.0,
            opacity_resource: None,
            rotation_degrees: 0.0,
            origin: Placement::new(5.0, 6.0),
        };
        assert_eq!(
            image.to_operations(),
            "q\n100 0 0 50 5 6 cm /StampIm1 Do\nQ\n"
        );
    }
}
