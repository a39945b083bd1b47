//! PDF document access for stamping
//!
//! Wraps a `lopdf::Document` with the few operations stamping needs:
//! page lookup, effective page size, resource registration and appending
//! content streams without disturbing the existing page content.

use super::draw::num;
use super::font::StandardFont;
use crate::error::{Error, Result};
use crate::geometry::{Dimensions, Rect};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, HashMap};

/// US Letter, used when a page has no MediaBox anywhere in its tree
pub const DEFAULT_PAGE_DIMENSIONS: Dimensions = Dimensions::new(612.0, 792.0);

/// Affine matrix `[a b c d e f]` as written before `cm`
pub type Matrix = [f32; 6];

/// Inheritable page attributes are looked up at most this many levels up
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Per-page stamping state: resource names registered on the page
#[derive(Debug, Default)]
struct PageResourceNames {
    fonts: HashMap<StandardFont, String>,
    opacity: HashMap<u32, String>,
    xobjects: HashMap<ObjectId, String>,
}

/// A loaded PDF being stamped
pub struct PdfDocument {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    font_ids: HashMap<StandardFont, ObjectId>,
    opacity_ids: HashMap<u32, ObjectId>,
    page_names: HashMap<ObjectId, PageResourceNames>,
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

impl PdfDocument {
    /// Parse PDF bytes. Encrypted documents are rejected.
    pub fn load(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::InvalidPdf {
                reason: "Not a valid PDF file".to_string(),
            });
        }

        let doc = Document::load_mem(data).map_err(|e| Error::InvalidPdf {
            reason: e.to_string(),
        })?;

        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(Error::InvalidPdf {
                reason: "Encrypted PDFs cannot be stamped".to_string(),
            });
        }

        let pages = doc.get_pages();
        Ok(Self {
            doc,
            pages,
            font_ids: HashMap::new(),
            opacity_ids: HashMap::new(),
            page_names: HashMap::new(),
        })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfBounds {
                page,
                total: self.page_count(),
            })
    }

    /// Find an inheritable attribute on the page or one of its ancestors.
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = current.get(key) {
                return Some(value);
            }
            let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
            current = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    /// The (possibly inherited) MediaBox in user space, corners normalised
    fn media_box(&self, page_id: ObjectId) -> Rect {
        self.inherited_attribute(page_id, b"MediaBox")
            .map(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| {
                let values: Vec<f32> = arr
                    .iter()
                    .filter_map(|o| number(self.resolve(o)))
                    .collect();
                (values.len() == 4).then(|| {
                    Rect::new(
                        values[0].min(values[2]),
                        values[1].min(values[3]),
                        (values[2] - values[0]).abs(),
                        (values[3] - values[1]).abs(),
                    )
                })
            })
            .unwrap_or(Rect::new(
                0.0,
                0.0,
                DEFAULT_PAGE_DIMENSIONS.width,
                DEFAULT_PAGE_DIMENSIONS.height,
            ))
    }

    /// Effective page size from the (possibly inherited) MediaBox.
    ///
    /// Width and height are swapped for pages rotated by 90 or 270 degrees,
    /// so the result matches what a viewer displays.
    pub fn page_dimensions(&self, page: u32) -> Result<Dimensions> {
        let media_box = self.media_box(self.page_id(page)?);
        if self.page_rotation(page)? % 180 != 0 {
            Ok(Dimensions::new(media_box.height, media_box.width))
        } else {
            Ok(Dimensions::new(media_box.width, media_box.height))
        }
    }

    /// Page /Rotate normalised to 0, 90, 180 or 270.
    ///
    /// Values that are not a multiple of 90 are invalid and read as 0.
    pub fn page_rotation(&self, page: u32) -> Result<i64> {
        let page_id = self.page_id(page)?;
        let rotate = self
            .inherited_attribute(page_id, b"Rotate")
            .and_then(|obj| self.resolve(obj).as_i64().ok())
            .unwrap_or(0)
            .rem_euclid(360);
        Ok(if rotate % 90 == 0 { rotate } else { 0 })
    }

    /// Matrix taking displayed page space into the page's user space.
    ///
    /// Displayed space is what a viewer shows once `/Rotate` is applied,
    /// with its origin at the bottom-left corner of the MediaBox as shown.
    /// `page_dimensions` describes that space. Returns `None` when the two
    /// spaces coincide.
    pub fn display_matrix(&self, page: u32) -> Result<Option<Matrix>> {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.media_box(self.page_id(page)?);

        let matrix = match self.page_rotation(page)? {
            90 => [0.0, 1.0, -1.0, 0.0, width + x, y],
            180 => [-1.0, 0.0, 0.0, -1.0, width + x, height + y],
            270 => [0.0, -1.0, 1.0, 0.0, x, height + y],
            _ if x == 0.0 && y == 0.0 => return Ok(None),
            _ => [1.0, 0.0, 0.0, 1.0, x, y],
        };
        Ok(Some(matrix))
    }

    /// Current resources of a page, inline, with inherited resources copied in.
    fn page_resources(&self, page_id: ObjectId) -> Dictionary {
        self.inherited_attribute(page_id, b"Resources")
            .map(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new)
    }

    /// Add `name -> value` to one resource category of a page.
    fn register_resource(
        &mut self,
        page_id: ObjectId,
        category: &str,
        name: &str,
        value: Object,
    ) -> Result<()> {
        let mut resources = self.page_resources(page_id);

        let mut entries = match resources.get(category.as_bytes()) {
            Ok(obj) => self.resolve(obj).as_dict().cloned().unwrap_or_else(|_| Dictionary::new()),
            Err(_) => Dictionary::new(),
        };
        entries.set(name, value);
        resources.set(category, Object::Dictionary(entries));

        self.doc
            .get_dictionary_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Pick a resource name not already used on the page.
    fn unused_resource_name(&self, page_id: ObjectId, category: &str, prefix: &str) -> String {
        let resources = self.page_resources(page_id);
        let taken = resources
            .get(category.as_bytes())
            .ok()
            .and_then(|obj| self.resolve(obj).as_dict().ok().cloned())
            .unwrap_or_else(Dictionary::new);

        let mut n = 1;
        loop {
            let name = format!("{}{}", prefix, n);
            if !taken.has(name.as_bytes()) {
                return name;
            }
            n += 1;
        }
    }

    /// Resource name of `font` on `page`, adding the font on first use.
    pub fn font_resource(&mut self, page: u32, font: StandardFont) -> Result<String> {
        let page_id = self.page_id(page)?;
        if let Some(name) = self
            .page_names
            .get(&page_id)
            .and_then(|names| names.fonts.get(&font))
        {
            return Ok(name.clone());
        }

        let font_id = match self.font_ids.get(&font) {
            Some(id) => *id,
            None => {
                let id = self.doc.add_object(font.dictionary());
                self.font_ids.insert(font, id);
                id
            }
        };

        let name = self.unused_resource_name(page_id, "Font", "StampF");
        self.register_resource(page_id, "Font", &name, Object::Reference(font_id))?;
        self.page_names
            .entry(page_id)
            .or_default()
            .fonts
            .insert(font, name.clone());
        Ok(name)
    }

    /// Resource name of a graphics state with fill and stroke alpha set to
    /// `opacity` (clamped to `[0, 1]`).
    pub fn opacity_resource(&mut self, page: u32, opacity: f32) -> Result<String> {
        let page_id = self.page_id(page)?;
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        // Keyed by hundredths so 0.3 and 0.30000001 share one state
        let key = (opacity * 100.0).round() as u32;

        if let Some(name) = self
            .page_names
            .get(&page_id)
            .and_then(|names| names.opacity.get(&key))
        {
            return Ok(name.clone());
        }

        let gs_id = match self.opacity_ids.get(&key) {
            Some(id) => *id,
            None => {
                let alpha = key as f32 / 100.0;
                let mut gs = Dictionary::new();
                gs.set("Type", Object::Name(b"ExtGState".to_vec()));
                gs.set("ca", Object::Real(alpha));
                gs.set("CA", Object::Real(alpha));
                let id = self.doc.add_object(gs);
                self.opacity_ids.insert(key, id);
                id
            }
        };

        let name = self.unused_resource_name(page_id, "ExtGState", "StampGS");
        self.register_resource(page_id, "ExtGState", &name, Object::Reference(gs_id))?;
        self.page_names
            .entry(page_id)
            .or_default()
            .opacity
            .insert(key, name.clone());
        Ok(name)
    }

    /// Add an object (image XObject, soft mask, ...) to the document.
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Resource name of an XObject on `page`, registering it on first use.
    pub fn xobject_resource(&mut self, page: u32, xobject_id: ObjectId) -> Result<String> {
        let page_id = self.page_id(page)?;
        if let Some(name) = self
            .page_names
            .get(&page_id)
            .and_then(|names| names.xobjects.get(&xobject_id))
        {
            return Ok(name.clone());
        }

        let name = self.unused_resource_name(page_id, "XObject", "StampIm");
        self.register_resource(page_id, "XObject", &name, Object::Reference(xobject_id))?;
        self.page_names
            .entry(page_id)
            .or_default()
            .xobjects
            .insert(xobject_id, name.clone());
        Ok(name)
    }

    /// Draw `operations` on top of the existing page content.
    ///
    /// The existing content is wrapped in `q ... Q` first so that a
    /// transformation left active by it cannot shift the stamp.
    pub fn append_content(&mut self, page: u32, operations: &str) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }
        let page_id = self.page_id(page)?;

        let existing: Vec<Object> = match self.doc.get_dictionary(page_id)?.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(obj @ Object::Reference(_)) => vec![obj.clone()],
            _ => Vec::new(),
        };

        let mut contents = Vec::with_capacity(existing.len() + 2);
        if !existing.is_empty() {
            let open = self
                .doc
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            contents.push(Object::Reference(open));
            contents.extend(existing);
        }

        let mut body = String::with_capacity(operations.len() + 4);
        if contents.is_empty() {
            body.push_str(operations);
        } else {
            body.push_str("\nQ\n");
            body.push_str(operations);
        }
        let stamp = self
            .doc
            .add_object(Stream::new(Dictionary::new(), body.into_bytes()));
        contents.push(Object::Reference(stamp));

        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", Object::Array(contents));
        Ok(())
    }

    /// Draw `operations` whose coordinates are in displayed page space.
    ///
    /// The operations are wrapped in `q <display matrix> cm ... Q` when the
    /// page is rotated or its MediaBox does not start at the origin.
    pub fn append_stamp(&mut self, page: u32, operations: &str) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }
        match self.display_matrix(page)? {
            None => self.append_content(page, operations),
            Some(m) => {
                let wrapped = format!(
                    "q\n{} {} {} {} {} {} cm\n{}Q\n",
                    num(m[0]),
                    num(m[1]),
                    num(m[2]),
                    num(m[3]),
                    num(m[4]),
                    num(m[5]),
                    operations
                );
                self.append_content(page, &wrapped)
            }
        }
    }

    /// Serialize the document
    pub fn save(mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.doc.save_to(&mut output)?;
        Ok(output)
    }
}
