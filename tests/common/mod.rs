//! In-memory PDF fixtures shared by the integration tests

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

/// An `n`-page Letter PDF whose page `i` shows the text `Page i`
pub fn sample_pdf(n: u32) -> Vec<u8> {
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
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => n as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn load(bytes: &[u8]) -> Document {
    let mut doc = Document::load_mem(bytes).unwrap();
    doc.decompress();
    doc
}

pub fn page_count(bytes: &[u8]) -> usize {
    load(bytes).get_pages().len()
}

/// Decoded content stream of a 1-based page
pub fn page_text(doc: &Document, page: u32) -> String {
    let id = doc.get_pages()[&page];
    String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned()
}

/// Decoded content of the form XObjects a 1-based page draws
pub fn overlay_text(doc: &Document, page: u32) -> String {
    let id = doc.get_pages()[&page];
    let page = doc.get_dictionary(id).unwrap();
    let resources = match page.get(b"Resources") {
        Ok(Object::Reference(r)) => doc.get_dictionary(*r).unwrap(),
        Ok(other) => other.as_dict().unwrap(),
        Err(_) => return String::new(),
    };
    let Ok(xobjects) = resources.get(b"XObject").and_then(Object::as_dict) else {
        return String::new();
    };
    xobjects
        .iter()
        .filter_map(|(_, value)| value.as_reference().ok())
        .filter_map(|r| doc.get_object(r).and_then(Object::as_stream).ok())
        .map(|stream| String::from_utf8_lossy(&stream.content).into_owned())
        .collect()
}

/// The `Page N` label each page of a [`sample_pdf`] derivative still shows
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = load(bytes);
    (1..=doc.get_pages().len() as u32)
        .map(|page| {
            let text = page_text(&doc, page);
            let start = text.find("(Page ").map(|i| i + 1).unwrap_or(0);
            let end = text[start..].find(')').map(|i| start + i).unwrap_or(start);
            text[start..end].to_string()
        })
        .collect()
}

/// Effective /Rotate of a 1-based page
pub fn rotation(bytes: &[u8], page: u32) -> i64 {
    let doc = load(bytes);
    let id = doc.get_pages()[&page];
    doc.get_dictionary(id)
        .unwrap()
        .get(b"Rotate")
        .and_then(Object::as_i64)
        .unwrap_or(0)
}
