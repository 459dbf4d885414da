//! PDF metadata extraction

use lopdf::{Document, Object};

use crate::error::{Error, Result};
use crate::pdf::document::ensure_pdf;
use crate::pdf::security;

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("No Root in trailer".to_string()))?;
    let pages_id = doc
        .get_dictionary(catalog_id)?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("No Pages in catalog".to_string()))?;

    match doc.get_dictionary(pages_id)?.get(b"Count") {
        Ok(Object::Integer(n)) if *n >= 0 => Ok(*n as usize),
        _ => Err(Error::General("Count is not an integer".to_string())),
    }
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Whether the file has an Encrypt dictionary
    pub encrypted: bool,
    /// Header version, e.g. "1.7"
    pub version: String,
}

/// Extract metadata from PDF bytes.
///
/// Encrypted files still report their page count; title and author are
/// only available when the empty user password opens them.
pub fn extract_metadata(bytes: &[u8]) -> Result<PdfMetadata> {
    ensure_pdf(bytes)?;
    let mut doc = Document::load_mem(bytes)?;
    let encrypted = doc.is_encrypted();
    if encrypted {
        doc = security::load_encrypted(bytes)?;
        if doc.decrypt("").is_err() {
            doc.trailer.remove(b"Info");
        }
    }

    // Use catalog-based counting, falling back to walking the tree
    let page_count = count_pages_from_catalog(&doc).unwrap_or_else(|_| doc.get_pages().len());
    if page_count == 0 {
        return Err(Error::EmptyPdf);
    }

    Ok(PdfMetadata {
        page_count,
        title: info_string(&doc, b"Title"),
        author: info_string(&doc, b"Author"),
        encrypted,
        version: doc.version.clone(),
    })
}

fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    let bytes = info.get(key).ok()?.as_str().ok()?;
    let text = decode_text_string(bytes);
    (!text.is_empty()).then_some(text)
}

/// Text strings are UTF-16BE with a BOM, or a single-byte encoding
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        },
    }
}
