//! Loading, saving and page-tree helpers

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::PageSize;

/// Written into the Info dictionary of every document we produce
pub const PRODUCER: &str = concat!("pdf-studio ", env!("CARGO_PKG_VERSION"));

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic Parent chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Check that the bytes look like a PDF file
pub fn ensure_pdf(bytes: &[u8]) -> Result<()> {
    let head = &bytes[..bytes.len().min(1024)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        Ok(())
    } else {
        Err(Error::validation("File is not a PDF document"))
    }
}

/// Parse an unencrypted PDF that must contain at least one page
pub fn load(bytes: &[u8]) -> Result<Document> {
    ensure_pdf(bytes)?;
    let doc = Document::load_mem(bytes)?;
    // The page tree of a password-protected file is not loaded
    if doc.is_encrypted() {
        return Err(Error::validation("PDF is password protected, decrypt it first"));
    }
    if doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf);
    }
    Ok(doc)
}

/// Whether the file carries an Encrypt dictionary
pub fn is_encrypted(bytes: &[u8]) -> Result<bool> {
    ensure_pdf(bytes)?;
    Ok(Document::load_mem(bytes)?.is_encrypted())
}

/// Stamp, prune, compress and serialize a document
pub fn save(doc: &mut Document) -> Result<Vec<u8>> {
    finalize(doc);
    write(doc)
}

/// Stamp the Info dictionary, drop unreachable objects and compress streams
pub fn finalize(doc: &mut Document) {
    stamp_info(doc);
    let pruned = doc.prune_objects();
    debug!(pruned = pruned.len(), "pruned unreachable objects");
    doc.compress();
}

/// Serialize without touching the document
pub fn write(doc: &mut Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn stamp_info(doc: &mut Document) {
    let mod_date = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();

    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => *id,
        _ => {
            let inline = match doc.trailer.remove(b"Info") {
                Some(Object::Dictionary(dict)) => dict,
                _ => Dictionary::new(),
            };
            let id = doc.add_object(Object::Dictionary(inline));
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };

    if let Ok(info) = doc.get_dictionary_mut(info_id) {
        info.set("Producer", Object::string_literal(PRODUCER));
        info.set("ModDate", Object::string_literal(mod_date));
    }
}

/// Page ids in document order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Read a numeric PDF object
pub(crate) fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Follow one level of indirection
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

/// Look up a page attribute, walking up the page tree if the page lacks it
pub fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Media box and rotation of a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// `[x0, y0, x1, y1]`, normalized so x0 <= x1 and y0 <= y1
    pub media_box: [f32; 4],
    /// One of 0, 90, 180, 270
    pub rotation: i64,
}

impl PageGeometry {
    /// Size in unrotated page space
    pub fn size(&self) -> PageSize {
        PageSize::new(
            self.media_box[2] - self.media_box[0],
            self.media_box[3] - self.media_box[1],
        )
    }

    /// Size as the page is displayed
    pub fn visual_size(&self) -> PageSize {
        self.size().rotated(self.rotation)
    }

    /// Matrix taking upright (displayed) coordinates into page space
    pub fn overlay_matrix(&self) -> [f32; 6] {
        let [x0, y0, _, _] = self.media_box;
        let PageSize { width: w, height: h } = self.size();
        match self.rotation {
            90 => [0.0, 1.0, -1.0, 0.0, x0 + w, y0],
            180 => [-1.0, 0.0, 0.0, -1.0, x0 + w, y0 + h],
            270 => [0.0, -1.0, 1.0, 0.0, x0, y0 + h],
            _ => [1.0, 0.0, 0.0, 1.0, x0, y0],
        }
    }
}

/// Effective rotation of a page in degrees, normalized into 0..360
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited_attribute(doc, page_id, b"Rotate")
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_i64().ok())
        .map(normalize_rotation)
        .unwrap_or(0)
}

/// Snap any angle to the nearest quarter turn in 0..360
pub fn normalize_rotation(degrees: i64) -> i64 {
    ((degrees as f64 / 90.0).round() as i64 * 90).rem_euclid(360)
}

/// Read the media box and rotation of a page
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry> {
    doc.get_dictionary(page_id)?;
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .and_then(|values| {
            let numbers: Vec<f32> = values
                .iter()
                .filter_map(|v| as_number(resolve(doc, v)))
                .collect();
            <[f32; 4]>::try_from(numbers).ok()
        })
        .map(|[a, b, c, d]| [a.min(c), b.min(d), a.max(c), b.max(d)])
        .unwrap_or([0.0, 0.0, PageSize::LETTER.width, PageSize::LETTER.height]);

    Ok(PageGeometry {
        media_box,
        rotation: page_rotation(doc, page_id),
    })
}

/// Set a page's rotation
pub fn set_rotation(doc: &mut Document, page_id: ObjectId, degrees: i64) -> Result<()> {
    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Rotate", Object::Integer(normalize_rotation(degrees)));
    Ok(())
}

/// Copy inherited attributes onto the page itself so that it can be
/// re-parented without changing how it renders.
pub fn flatten_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited = Vec::new();
    let page = doc.get_dictionary(page_id)?;
    for key in INHERITABLE {
        if !page.has(key) {
            if let Some(value) = inherited_attribute(doc, page_id, key) {
                inherited.push((key, value.clone()));
            }
        }
    }
    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}

/// Rebuild the page tree so that it holds exactly `pages`, in that order.
///
/// Inheritable attributes are copied onto each page first so nothing is lost
/// when the old intermediate nodes go away. Pages not listed become
/// unreachable and are dropped on save.
pub fn assemble(doc: &mut Document, pages: &[ObjectId]) -> Result<()> {
    for &page_id in pages {
        flatten_inherited(doc, page_id)?;
    }

    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = pages.iter().map(|&id| Object::Reference(id)).collect();
    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(pages.len() as i64));
    pages_object.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages_object));

    for &page_id in pages {
        doc.get_dictionary_mut(page_id)?
            .set("Parent", Object::Reference(pages_id));
    }

    let catalog_id = doc.trailer.get(b"Root").and_then(Object::as_reference)?;
    doc.get_dictionary_mut(catalog_id)?
        .set("Pages", Object::Reference(pages_id));

    debug!(pages = pages.len(), "rebuilt page tree");
    Ok(())
}

/// A content stream holding `content`
pub(crate) fn content_stream(content: impl Into<Vec<u8>>) -> lopdf::Stream {
    lopdf::Stream::new(Dictionary::new(), content.into())
}
