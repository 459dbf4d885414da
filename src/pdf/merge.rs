//! Page merging: overlays onto pages, and whole documents into one

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pdf::document::{content_stream, flatten_inherited, inherited_attribute, page_geometry, resolve};

/// Merges overlay pages onto the pages of a base document.
///
/// The overlay's objects are imported once, renumbered past the base
/// document's ids. Each merge wraps the overlay page in a form XObject,
/// brackets the existing content in `q`/`Q` and draws the form last, so
/// the overlay always sits above what was there and cannot be disturbed by
/// graphics state the page leaves behind.
pub struct PageMerger<'a> {
    doc: &'a mut Document,
    overlay_pages: Vec<ObjectId>,
    next_name: usize,
}

impl<'a> PageMerger<'a> {
    pub fn new(doc: &'a mut Document, mut overlay: Document) -> Self {
        overlay.renumber_objects_with(doc.max_id + 1);
        let overlay_pages = overlay.get_pages().into_values().collect();
        doc.max_id = doc.max_id.max(overlay.max_id);
        doc.objects.extend(overlay.objects);
        Self {
            doc,
            overlay_pages,
            next_name: 0,
        }
    }

    pub fn overlay_count(&self) -> usize {
        self.overlay_pages.len()
    }

    /// Draw overlay page `index` (0-based) on top of `page_id`.
    ///
    /// An overlay page without marks leaves the page untouched.
    pub fn merge(&mut self, page_id: ObjectId, index: usize) -> Result<()> {
        let overlay_page = *self.overlay_pages.get(index).ok_or_else(|| {
            Error::General(format!(
                "overlay has {} pages, page {} requested",
                self.overlay_pages.len(),
                index + 1
            ))
        })?;

        let (content, resources, bbox) = self.overlay_parts(overlay_page)?;
        if content.iter().all(u8::is_ascii_whitespace) {
            debug!(?page_id, "empty overlay, page left as is");
            return Ok(());
        }

        let matrix = page_geometry(self.doc, page_id)?.overlay_matrix();
        let mut form = Dictionary::new();
        form.set("Type", Object::Name(b"XObject".to_vec()));
        form.set("Subtype", Object::Name(b"Form".to_vec()));
        form.set("FormType", Object::Integer(1));
        form.set("BBox", bbox);
        form.set("Matrix", Object::Array(matrix.iter().map(|&v| Object::Real(v)).collect()));
        form.set("Resources", Object::Dictionary(resources));
        let form_id = self.doc.add_object(Stream::new(form, content));

        let name = self.add_xobject_to_page_resources(page_id, form_id)?;
        self.wrap_and_draw(page_id, format!("q /{name} Do Q\n"))?;
        debug!(?page_id, overlay = index, "merged overlay");
        Ok(())
    }

    /// Concatenated content, resources and media box of an imported overlay page
    fn overlay_parts(&self, overlay_page: ObjectId) -> Result<(Vec<u8>, Dictionary, Object)> {
        let doc: &Document = self.doc;
        let page = doc.get_dictionary(overlay_page)?;

        let mut content = Vec::new();
        for id in content_ids(page) {
            if let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) {
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                content.extend_from_slice(&data);
                content.push(b'\n');
            }
        }

        let resources = match page.get(b"Resources").map(|o| resolve(doc, o)) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let bbox = page
            .get(b"MediaBox")
            .cloned()
            .unwrap_or_else(|_| Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)]));
        Ok((content, resources, bbox))
    }

    /// Give the page its own Resources with the form added; returns the name used
    fn add_xobject_to_page_resources(&mut self, page_id: ObjectId, xobject_id: ObjectId) -> Result<String> {
        let doc: &Document = self.doc;
        let mut resources = match inherited_attribute(doc, page_id, b"Resources").map(|o| resolve(doc, o)) {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let mut xobjects = match resources.get(b"XObject").map(|o| resolve(doc, o)) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };

        let name = loop {
            self.next_name += 1;
            let candidate = format!("Ovl{}", self.next_name);
            if !xobjects.has(candidate.as_bytes()) {
                break candidate;
            }
        };

        xobjects.set(name.clone(), Object::Reference(xobject_id));
        resources.set("XObject", Object::Dictionary(xobjects));
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));
        Ok(name)
    }

    /// Contents become `[q, existing..., Q, draw]`
    fn wrap_and_draw(&mut self, page_id: ObjectId, draw: String) -> Result<()> {
        let existing: Vec<Object> = content_ids(self.doc.get_dictionary(page_id)?)
            .into_iter()
            .map(Object::Reference)
            .collect();

        let mut contents = Vec::with_capacity(existing.len() + 3);
        if !existing.is_empty() {
            contents.push(Object::Reference(self.doc.add_object(content_stream("q\n"))));
            contents.extend(existing);
            contents.push(Object::Reference(self.doc.add_object(content_stream("Q\n"))));
        }
        contents.push(Object::Reference(self.doc.add_object(content_stream(draw))));

        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", Object::Array(contents));
        Ok(())
    }
}

fn content_ids(page: &Dictionary) -> Vec<ObjectId> {
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![*id],
        Ok(Object::Array(items)) => items.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => Vec::new(),
    }
}

/// Merge overlay page `i` onto `targets[i]` for every target
pub fn apply_overlay(doc: &mut Document, overlay: Document, targets: &[ObjectId]) -> Result<()> {
    let mut merger = PageMerger::new(doc, overlay);
    if merger.overlay_count() != targets.len() {
        return Err(Error::General(format!(
            "Page count mismatch: {} target pages, overlay has {} pages",
            targets.len(),
            merger.overlay_count()
        )));
    }
    for (index, &page_id) in targets.iter().enumerate() {
        merger.merge(page_id, index)?;
    }
    Ok(())
}

/// Concatenate the pages of several documents, in order, into a new one
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        return Err(Error::validation("No input files provided"));
    }

    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        for page_id in doc.get_pages().into_values() {
            flatten_inherited(&mut doc, page_id)?;
        }

        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);
    // new_object_id() must hand out ids past everything just added
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));
    merged.objects.insert(pages_id, Object::Dictionary(pages_object));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = merged.add_object(Object::Dictionary(catalog));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        merged
            .get_dictionary_mut(page_id)?
            .set("Parent", Object::Reference(pages_id));
    }

    debug!(pages = page_ids.len(), "merged documents");
    Ok(merged)
}
