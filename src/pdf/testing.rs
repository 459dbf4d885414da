//! In-memory PDF fixtures for unit tests

use lopdf::{dictionary, Document, Object, Stream};

/// An `n`-page Letter document; page `i` draws the text `Page i`.
///
/// MediaBox and Resources live on the Pages node so that pages have to
/// inherit them.
pub fn sample_document(n: u32) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for i in 1..=n {
        let content = format!("BT /F1 24 Tf 72 700 Td (Page {i}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => n as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Serialized form of [`sample_document`]
pub fn sample_pdf(n: u32) -> Vec<u8> {
    let mut doc = sample_document(n);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Decoded content of a 1-based page
pub fn page_text(doc: &Document, page: u32) -> String {
    let id = doc.get_pages()[&page];
    String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned()
}

/// Decoded content of every form XObject drawn by a 1-based page
pub fn overlay_text(doc: &Document, page: u32) -> String {
    let id = doc.get_pages()[&page];
    let mut out = String::new();
    let Ok(resources) = doc.get_dictionary(id).and_then(|p| p.get(b"Resources")) else {
        return out;
    };
    let resources = match resources {
        Object::Reference(r) => doc.get_dictionary(*r).unwrap(),
        other => other.as_dict().unwrap(),
    };
    let Ok(xobjects) = resources.get(b"XObject").and_then(Object::as_dict) else {
        return out;
    };
    for (_, value) in xobjects.iter() {
        if let Ok(stream) = value.as_reference().and_then(|r| doc.get_object(r)).and_then(Object::as_stream) {
            let content = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
            out.push_str(&String::from_utf8_lossy(&content));
        }
    }
    out
}
