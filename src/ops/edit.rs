//! Editor elements placed on individual pages

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use tracing::info;

use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::pages::RangeError;
use crate::pdf::document::{self, page_geometry, page_ids};
use crate::pdf::fonts::{FontBook, FontWeight};
use crate::pdf::merge::apply_overlay;
use crate::pdf::overlay::{
    ImageElement, OverlayComposer, OverlayElement, Position, ShapeElement, TextElement,
};
use crate::pdf::raster::{PreparedImage, SIGNATURE_MAX_SIZE};

/// One element from the editor, as sent in the `elements` JSON array.
///
/// Coordinates are in top-left-origin pixels of the page as displayed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditElement {
    Text(TextEdit),
    Signature(SignatureEdit),
    Checkbox(CheckboxEdit),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub page: i64,
    pub x: f32,
    pub y: f32,
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub color: Rgb,
    #[serde(default)]
    pub has_background: bool,
    #[serde(default = "white")]
    pub background_color: Rgb,
    #[serde(default)]
    pub bold: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureEdit {
    pub page: i64,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_signature_width")]
    pub width: f32,
    #[serde(default = "default_signature_height")]
    pub height: f32,
    /// Base64 image, optionally as a `data:` URL
    pub image_data: String,
    #[serde(default)]
    pub has_background: bool,
    #[serde(default = "white")]
    pub background_color: Rgb,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckboxEdit {
    pub page: i64,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_checkbox_size")]
    pub size: f32,
    #[serde(default)]
    pub checked: bool,
    #[serde(default = "yes")]
    pub has_border: bool,
    #[serde(default)]
    pub is_transparent: bool,
    #[serde(default)]
    pub border_color: Rgb,
    #[serde(default = "white")]
    pub color: Rgb,
}

fn default_font_size() -> f32 {
    12.0
}

fn default_signature_width() -> f32 {
    100.0
}

fn default_signature_height() -> f32 {
    50.0
}

fn default_checkbox_size() -> f32 {
    18.0
}

fn white() -> Rgb {
    Rgb::WHITE
}

fn yes() -> bool {
    true
}

impl EditElement {
    /// 1-based target page
    pub fn page(&self) -> i64 {
        match self {
            EditElement::Text(e) => e.page,
            EditElement::Signature(e) => e.page,
            EditElement::Checkbox(e) => e.page,
        }
    }

    /// Reject coordinates and sizes that are infinite or NaN
    fn check_finite(&self) -> Result<()> {
        let fields = match self {
            EditElement::Text(e) => vec![("x", e.x), ("y", e.y), ("fontSize", e.font_size)],
            EditElement::Signature(e) => vec![("x", e.x), ("y", e.y), ("width", e.width), ("height", e.height)],
            EditElement::Checkbox(e) => vec![("x", e.x), ("y", e.y), ("size", e.size)],
        };
        match fields.into_iter().find(|(_, value)| !value.is_finite()) {
            Some((name, value)) => Err(Error::validation(format!(
                "Element on page {}: '{name}' must be a finite number, got {value}",
                self.page()
            ))),
            None => Ok(()),
        }
    }

    fn into_overlay(self) -> Result<OverlayElement> {
        Ok(match self {
            EditElement::Text(e) => OverlayElement::Text(TextElement {
                position: Position::TopLeft { x: e.x, y: e.y },
                text: e.text,
                weight: FontWeight::from_bold(e.bold),
                font_size: e.font_size,
                color: e.color,
                background: e.has_background.then_some(e.background_color),
                opacity: 1.0,
            }),
            EditElement::Signature(e) => {
                let bytes = decode_image_data(&e.image_data)?;
                let image = PreparedImage::decode(&bytes, 1.0, Some(SIGNATURE_MAX_SIZE))?;
                OverlayElement::Image(ImageElement {
                    position: Position::TopLeft { x: e.x, y: e.y },
                    image: Arc::new(image),
                    width: e.width,
                    height: e.height,
                    background: e.has_background.then_some(e.background_color),
                })
            }
            EditElement::Checkbox(e) => OverlayElement::Shape(ShapeElement {
                position: Position::TopLeft { x: e.x, y: e.y },
                size: e.size,
                checked: e.checked,
                has_border: e.has_border,
                border_color: e.border_color,
                transparent: e.is_transparent,
                fill_color: e.color,
                opacity: 1.0,
            }),
        })
    }
}

/// Strip an optional `data:<mime>;base64,` prefix and decode
fn decode_image_data(data: &str) -> Result<Vec<u8>> {
    let payload = match data.split_once(',') {
        Some((header, rest)) if header.starts_with("data:") => rest,
        _ => data,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::validation(format!("Signature image is not valid base64: {e}")))
}

/// Parse the editor's JSON element list
pub fn parse_elements(json: &str) -> Result<Vec<EditElement>> {
    Ok(serde_json::from_str(json)?)
}

/// Draw editor elements onto their pages.
///
/// Elements are grouped by page and drawn in list order; pages without
/// elements pass through unchanged.
pub fn apply_edits(bytes: &[u8], elements: Vec<EditElement>, fonts: &FontBook) -> Result<Vec<u8>> {
    let mut doc = document::load(bytes)?;
    let ids = page_ids(&doc);
    let max_pages = ids.len() as u32;

    let count = elements.len();
    let mut by_page: BTreeMap<u32, Vec<OverlayElement>> = BTreeMap::new();
    for element in elements {
        element.check_finite()?;
        let page = element.page();
        if page < 1 {
            return Err(RangeError::BelowLowerBound { page, max_pages }.into());
        }
        if page > i64::from(max_pages) {
            return Err(RangeError::AboveUpperBound { page, max_pages }.into());
        }
        by_page
            .entry(page as u32)
            .or_default()
            .push(element.into_overlay()?);
    }

    let mut composer = OverlayComposer::new(fonts);
    let mut targets = Vec::with_capacity(by_page.len());
    for (&number, page_elements) in &by_page {
        let page_id = ids[number as usize - 1];
        let page = page_geometry(&doc, page_id)?.visual_size();
        composer.add_page(page, page_elements)?;
        targets.push(page_id);
    }

    apply_overlay(&mut doc, composer.finish()?, &targets)?;
    info!("applied {} elements to {} pages", count, targets.len());
    document::save(&mut doc)
}

/// [`parse_elements`] followed by [`apply_edits`]
pub fn edit(bytes: &[u8], elements_json: &str, fonts: &FontBook) -> Result<Vec<u8>> {
    let elements = parse_elements(elements_json)?;
    apply_edits(bytes, elements, fonts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{overlay_text, page_text, sample_pdf};
    use image::{Rgba, RgbaImage};
    use lopdf::Document;

    fn reload(bytes: &[u8]) -> Document {
        let mut doc = Document::load_mem(bytes).unwrap();
        doc.decompress();
        doc
    }

    fn png_base64() -> String {
        let img = RgbaImage::from_pixel(40, 20, Rgba([0, 0, 255, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(out.into_inner()))
    }

    #[test]
    fn test_parse_defaults() {
        let elements = parse_elements(
            r#"[
                {"type": "text", "page": 1, "x": 10, "y": 20, "text": "Hi"},
                {"type": "checkbox", "page": 2, "x": 5, "y": 5}
            ]"#,
        )
        .unwrap();
        match &elements[0] {
            EditElement::Text(t) => {
                assert_eq!(t.font_size, 12.0);
                assert_eq!(t.color, Rgb::BLACK);
                assert!(!t.has_background);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &elements[1] {
            EditElement::Checkbox(c) => {
                assert_eq!(c.size, 18.0);
                assert!(c.has_border);
                assert!(!c.checked);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = parse_elements(r#"[{"type": "circle", "page": 1, "x": 0, "y": 0}]"#).unwrap_err();
        assert!(matches!(err, Error::InvalidElements(_)));
    }

    #[test]
    fn test_bad_color_rejected() {
        let json = r##"[{"type": "text", "page": 1, "x": 0, "y": 0, "text": "a", "color": "#12"}]"##;
        assert!(matches!(parse_elements(json), Err(Error::InvalidElements(_))));
    }

    #[test]
    fn test_edit_targets_only_listed_pages() {
        let fonts = FontBook::standard();
        let json = r##"[
            {"type": "text", "page": 2, "x": 100, "y": 100, "text": "Approved", "hasBackground": true},
            {"type": "checkbox", "page": 2, "x": 300, "y": 100, "checked": true},
            {"type": "signature", "page": 3, "x": 50, "y": 600, "width": 120, "height": 60, "imageData": "SIG"}
        ]"##
        .replace("SIG", &png_base64());
        let out = reload(&edit(&sample_pdf(3), &json, &fonts).unwrap());

        assert!(overlay_text(&out, 1).is_empty());
        let second = overlay_text(&out, 2);
        // List order is drawing order: text first, then the filled, bordered box
        let text_at = second.find("(Approved) Tj").unwrap();
        let box_at = second.find("\nB\n").unwrap();
        assert!(text_at < box_at);
        assert!(second.contains("1 1 1 rg"));
        assert!(overlay_text(&out, 3).contains("120 0 0 60 0 0 cm /Im1 Do"));
        assert!(page_text(&out, 2).contains("(Page 2)"));
    }

    #[test]
    fn test_text_position_flips_y() {
        let fonts = FontBook::standard();
        let json = r#"[{"type": "text", "page": 1, "x": 72, "y": 100, "text": "Top", "fontSize": 10}]"#;
        let out = reload(&edit(&sample_pdf(1), json, &fonts).unwrap());
        // Box top at 792 - 100, height one font size
        assert!(overlay_text(&out, 1).contains("1 0 0 1 72 682 cm"));
    }

    #[test]
    fn test_overflowing_numbers_rejected() {
        let fonts = FontBook::standard();
        // Too large for f32, so they deserialize as infinity
        let json = r#"[{"type": "checkbox", "page": 1, "x": 10, "y": 10, "size": 1e39}]"#;
        let err = edit(&sample_pdf(1), json, &fonts).unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("'size'")), "{err}");

        let json = r#"[{"type": "text", "page": 1, "x": -1e40, "y": 0, "text": "x"}]"#;
        assert!(matches!(edit(&sample_pdf(1), json, &fonts), Err(Error::Validation(_))));
    }

    #[test]
    fn test_page_out_of_range() {
        let fonts = FontBook::standard();
        let json = r#"[{"type": "text", "page": 4, "x": 0, "y": 0, "text": "x"}]"#;
        let err = edit(&sample_pdf(3), json, &fonts).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidRange(RangeError::AboveUpperBound { page: 4, max_pages: 3 })
        ));

        let json = r#"[{"type": "text", "page": 0, "x": 0, "y": 0, "text": "x"}]"#;
        assert!(matches!(edit(&sample_pdf(3), json, &fonts), Err(Error::InvalidRange(_))));
    }

    #[test]
    fn test_empty_list_leaves_document_alone() {
        let fonts = FontBook::standard();
        let out = reload(&edit(&sample_pdf(2), "[]", &fonts).unwrap());
        assert_eq!(out.get_pages().len(), 2);
        assert!(overlay_text(&out, 1).is_empty());
    }

    #[test]
    fn test_bad_signature_data() {
        let fonts = FontBook::standard();
        let json = r#"[{"type": "signature", "page": 1, "x": 0, "y": 0, "imageData": "***"}]"#;
        assert!(matches!(edit(&sample_pdf(1), json, &fonts), Err(Error::Validation(_))));
    }
}
