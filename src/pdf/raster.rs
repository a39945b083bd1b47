//! Raster images as PDF image XObjects

use super::document::PdfDocument;
use crate::error::{Error, Result};
use crate::geometry::Dimensions;
use image::ImageReader;
use lopdf::{Dictionary, Object, ObjectId, Stream};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;

/// An image added to the document, ready to be registered on pages
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedImage {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

impl EmbeddedImage {
    /// Natural size, one point per pixel
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width as f32, self.height as f32)
    }
}

fn image_dictionary(width: u32, height: u32, color_space: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(i64::from(width)));
    dict.set("Height", Object::Integer(i64::from(height)));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

/// Pixel count of a `width` × `height` image, if it is within `max_pixels`
fn checked_pixels(width: u32, height: u32, max_pixels: u64) -> Result<u64> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidStamp {
            reason: "image has no pixels".to_string(),
        });
    }
    let pixels = u64::from(width) * u64::from(height);
    if pixels > max_pixels {
        return Err(Error::ImageDimensionExceeded {
            detail: format!(
                "{}x{} = {} pixels exceeds limit of {}",
                width, height, pixels, max_pixels
            ),
        });
    }
    Ok(pixels)
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>> {
    Ok(ImageReader::new(Cursor::new(bytes)).with_guessed_format()?)
}

/// Flate-compress `stream` and add it to `doc`
fn add_compressed(doc: &mut PdfDocument, mut stream: Stream) -> Result<ObjectId> {
    stream.compress()?;
    Ok(doc.add_object(stream))
}

/// Decode PNG/JPEG/... bytes and add them to `doc` as an RGB image.
///
/// Transparency is kept through a DeviceGray soft mask. The size is read
/// from the image header, and images with more than `max_pixels` pixels are
/// rejected before any pixel data is decoded.
pub fn embed_image(doc: &mut PdfDocument, bytes: &[u8], max_pixels: u64) -> Result<EmbeddedImage> {
    let (width, height) = reader(bytes)?.into_dimensions()?;
    let pixels = checked_pixels(width, height, max_pixels)?;

    let decoded = reader(bytes)?.decode()?;
    let has_alpha = decoded.color().has_alpha();
    let rgba = decoded.to_rgba8();

    let mut rgb = Vec::with_capacity(pixels as usize * 3);
    let mut alpha = Vec::with_capacity(if has_alpha { pixels as usize } else { 0 });
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        if has_alpha {
            alpha.push(pixel.0[3]);
        }
    }

    let mut dict = image_dictionary(width, height, "DeviceRGB");
    if has_alpha {
        let mask = Stream::new(image_dictionary(width, height, "DeviceGray"), alpha);
        let mask_id = add_compressed(doc, mask)?;
        dict.set("SMask", Object::Reference(mask_id));
    }
    let id = add_compressed(doc, Stream::new(dict, rgb))?;

    tracing::debug!(width, height, has_alpha, "Embedded stamp image");
    Ok(EmbeddedImage { id, width, height })
}

/// Render SVG markup to PNG bytes, stretched to `width` × `height` pixels.
pub fn rasterize_svg(svg: &[u8], width: u32, height: u32, max_pixels: u64) -> Result<Vec<u8>> {
    checked_pixels(width, height, max_pixels)?;

    let tree = usvg::Tree::from_data(svg, &usvg::Options::default()).map_err(|e| {
        Error::InvalidStamp {
            reason: format!("SVG could not be parsed: {}", e),
        }
    })?;
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| Error::InvalidStamp {
        reason: "SVG canvas could not be allocated".to_string(),
    })?;

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    pixmap.encode_png().map_err(|e| Error::InvalidStamp {
        reason: format!("SVG could not be encoded: {}", e),
    })
}
