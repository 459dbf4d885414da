//! Operations that pick, reorder or turn whole pages

use lopdf::ObjectId;
use tracing::info;

use crate::error::{Error, Result};
use crate::pages::select_pages;
use crate::pdf::document::{self, assemble, page_ids, page_rotation, set_rotation};
use crate::pdf::merge::merge_documents;

/// Angles accepted by [`rotate`]
pub const ROTATION_ANGLES: [i64; 3] = [90, 180, 270];

/// Extract the pages named by `pages` (ascending order) into a new PDF.
///
/// # Example
///
/// ```no_run
/// let input = std::fs::read("report.pdf").unwrap();
/// let output = pdf_studio::ops::split(&input, "2,4-6").unwrap();
/// std::fs::write("excerpt.pdf", output).unwrap();
/// ```
pub fn split(bytes: &[u8], pages: &str) -> Result<Vec<u8>> {
    let mut doc = document::load(bytes)?;
    let ids = page_ids(&doc);
    let max_pages = ids.len() as u32;

    let selected = select_pages(pages, max_pages)?;
    if selected.is_empty() {
        return Err(Error::EmptySelection { max_pages });
    }
    let keep: Vec<ObjectId> = selected.iter().map(|&p| ids[p as usize - 1]).collect();

    assemble(&mut doc, &keep)?;
    info!("split {} of {} pages", keep.len(), max_pages);
    document::save(&mut doc)
}

/// Concatenate several PDFs, in the order given
pub fn merge<B: AsRef<[u8]>>(inputs: &[B]) -> Result<Vec<u8>> {
    if inputs.is_empty() {
        return Err(Error::validation("No input files provided"));
    }

    let mut documents = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        let doc = document::load(input.as_ref()).map_err(|e| match e {
            Error::Validation(msg) => Error::Validation(format!("Input {}: {}", i + 1, msg)),
            other => other,
        })?;
        documents.push(doc);
    }

    let mut merged = merge_documents(documents)?;
    info!("merged {} files into {} pages", inputs.len(), merged.get_pages().len());
    document::save(&mut merged)
}

/// Options for [`rotate`]
#[derive(Debug, Clone)]
pub struct RotateOptions {
    /// Page selection; `all` selects every page
    pub pages: String,
    /// Clockwise quarter turns: 90, 180 or 270
    pub angle: i64,
    /// Keep pages that are not rotated
    pub include_unspecified: bool,
}

impl Default for RotateOptions {
    fn default() -> Self {
        Self {
            pages: "all".to_string(),
            angle: 90,
            include_unspecified: true,
        }
    }
}

/// Rotate the selected pages, keeping or dropping the rest.
///
/// The angle adds to whatever rotation a page already has, including one
/// inherited from the page tree.
pub fn rotate(bytes: &[u8], options: &RotateOptions) -> Result<Vec<u8>> {
    if !ROTATION_ANGLES.contains(&options.angle) {
        return Err(Error::validation(format!(
            "Rotation angle must be 90, 180 or 270, got {}",
            options.angle
        )));
    }

    let mut doc = document::load(bytes)?;
    let ids = page_ids(&doc);
    let max_pages = ids.len() as u32;
    let selected = select_pages(&options.pages, max_pages)?;
    if selected.is_empty() {
        return Err(Error::EmptySelection { max_pages });
    }

    let mut keep = Vec::with_capacity(ids.len());
    for (index, &page_id) in ids.iter().enumerate() {
        let number = index as u32 + 1;
        if selected.binary_search(&number).is_ok() {
            let current = page_rotation(&doc, page_id);
            set_rotation(&mut doc, page_id, current + options.angle)?;
            keep.push(page_id);
        } else if options.include_unspecified {
            keep.push(page_id);
        }
    }

    assemble(&mut doc, &keep)?;
    info!(
        "rotated {} pages by {} degrees, output has {} pages",
        selected.len(),
        options.angle,
        keep.len()
    );
    document::save(&mut doc)
}
