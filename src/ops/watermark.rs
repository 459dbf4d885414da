//! Text and image watermarks

use std::sync::Arc;

use tracing::{debug, info};

use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::layout::{place, Placement, CORNER_MARGIN};
use crate::pages::select_pages;
use crate::pdf::document::{self, page_geometry, page_ids};
use crate::pdf::fonts::{FontBook, FontWeight};
use crate::pdf::merge::apply_overlay;
use crate::pdf::overlay::{ImageElement, OverlayComposer, OverlayElement, Position, TextElement};
use crate::pdf::raster::{PreparedImage, WATERMARK_MAX_SIZE};

/// What the watermark shows
#[derive(Debug, Clone)]
pub enum WatermarkKind {
    /// One or more lines of text
    Text(String),
    /// Encoded PNG or JPEG bytes
    Image(Vec<u8>),
}

/// Options for [`add_watermark`]
#[derive(Debug, Clone)]
pub struct WatermarkOptions {
    pub kind: WatermarkKind,
    /// 0.0 (invisible) to 1.0 (opaque)
    pub opacity: f32,
    /// Degrees, counter-clockwise, about the watermark's center
    pub rotation: f32,
    pub position: Placement,
    /// Text watermarks only
    pub font_size: f32,
    /// Text watermarks only
    pub font_color: Rgb,
    /// Text watermarks only
    pub bold: bool,
    /// Page selection; `all` selects every page
    pub pages: String,
}

impl WatermarkOptions {
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_kind(WatermarkKind::Text(text.into()))
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self::with_kind(WatermarkKind::Image(bytes))
    }

    fn with_kind(kind: WatermarkKind) -> Self {
        Self {
            kind,
            opacity: 0.5,
            rotation: 0.0,
            position: Placement::Center,
            font_size: 40.0,
            font_color: Rgb::BLACK,
            bold: false,
            pages: "all".to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("Opacity", self.opacity),
            ("Rotation", self.rotation),
            ("Font size", self.font_size),
        ] {
            if !value.is_finite() {
                return Err(Error::validation(format!("{name} must be a finite number, got {value}")));
            }
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::validation(format!(
                "Opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }
        match &self.kind {
            WatermarkKind::Text(text) if text.trim().is_empty() => {
                Err(Error::validation("Watermark text is required"))
            }
            WatermarkKind::Text(_) if self.font_size <= 0.0 => Err(Error::validation(format!(
                "Font size must be positive, got {}",
                self.font_size
            ))),
            WatermarkKind::Image(bytes) if bytes.is_empty() => {
                Err(Error::validation("Watermark image is required"))
            }
            _ => Ok(()),
        }
    }

    /// The element to stamp, positioned later per page
    fn element(&self) -> Result<OverlayElement> {
        let origin = Position::TopLeft { x: 0.0, y: 0.0 };
        Ok(match &self.kind {
            WatermarkKind::Text(text) => OverlayElement::Text(TextElement {
                position: origin,
                text: text.clone(),
                weight: FontWeight::from_bold(self.bold),
                font_size: self.font_size,
                color: self.font_color,
                background: None,
                opacity: self.opacity,
            }),
            WatermarkKind::Image(bytes) => {
                // Opacity goes into the alpha channel, so the element itself is opaque
                let image = PreparedImage::decode(bytes, self.opacity, Some(WATERMARK_MAX_SIZE))?;
                OverlayElement::Image(ImageElement {
                    position: origin,
                    width: image.width() as f32,
                    height: image.height() as f32,
                    image: Arc::new(image),
                    background: None,
                })
            }
        })
    }
}

/// Stamp a watermark onto the selected pages.
///
/// Each target page gets its own overlay sized to that page as displayed,
/// so mixed page sizes and rotated pages are handled. Pages outside the
/// selection pass through unchanged.
pub fn add_watermark(bytes: &[u8], options: &WatermarkOptions, fonts: &FontBook) -> Result<Vec<u8>> {
    options.validate()?;

    let mut doc = document::load(bytes)?;
    let ids = page_ids(&doc);
    let max_pages = ids.len() as u32;
    let selected = select_pages(&options.pages, max_pages)?;
    if selected.is_empty() {
        return Err(Error::EmptySelection { max_pages });
    }

    let element = options.element()?;
    let element_size = element.size(fonts);

    let mut composer = OverlayComposer::new(fonts);
    let mut targets = Vec::with_capacity(selected.len());
    for &number in &selected {
        let page_id = ids[number as usize - 1];
        let page = page_geometry(&doc, page_id)?.visual_size();
        let stamps: Vec<OverlayElement> = place(
            page,
            element_size,
            options.position,
            options.rotation,
            CORNER_MARGIN,
        )
        .into_iter()
        .map(|at| element.with_position(Position::Placed(at)))
        .collect();
        debug!(page = number, stamps = stamps.len(), "watermark overlay");
        composer.add_page(page, &stamps)?;
        targets.push(page_id);
    }

    apply_overlay(&mut doc, composer.finish()?, &targets)?;
    info!(
        "watermarked {} of {} pages ({})",
        targets.len(),
        max_pages,
        options.position
    );
    document::save(&mut doc)
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

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 0, 0, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_text_watermark_centered() {
        let fonts = FontBook::standard();
        let out = reload(&add_watermark(&sample_pdf(2), &WatermarkOptions::text("DRAFT"), &fonts).unwrap());
        for page in 1..=2 {
            let overlay = overlay_text(&out, page);
            assert_eq!(overlay.matches("(DRAFT) Tj").count(), 1);
            assert!(overlay.contains("/GS500 gs"));
            assert!(page_text(&out, page).contains(&format!("(Page {page})")));
        }
    }

    #[test]
    fn test_tile_repeats_on_every_page() {
        let fonts = FontBook::standard();
        let options = WatermarkOptions {
            position: Placement::Tile,
            rotation: 45.0,
            ..WatermarkOptions::text("CONFIDENTIAL")
        };
        let out = reload(&add_watermark(&sample_pdf(3), &options, &fonts).unwrap());
        for page in 1..=3 {
            assert!(overlay_text(&out, page).matches("(CONFIDENTIAL) Tj").count() > 1);
        }
    }

    #[test]
    fn test_only_selected_pages_are_stamped() {
        let fonts = FontBook::standard();
        let options = WatermarkOptions {
            pages: "2".to_string(),
            ..WatermarkOptions::text("COPY")
        };
        let out = reload(&add_watermark(&sample_pdf(3), &options, &fonts).unwrap());
        assert!(overlay_text(&out, 1).is_empty());
        assert!(overlay_text(&out, 2).contains("(COPY) Tj"));
        assert!(overlay_text(&out, 3).is_empty());
    }

    #[test]
    fn test_image_watermark_is_capped() {
        let fonts = FontBook::standard();
        let options = WatermarkOptions {
            position: Placement::BottomRight,
            ..WatermarkOptions::image(png(600, 300))
        };
        let out = reload(&add_watermark(&sample_pdf(1), &options, &fonts).unwrap());
        let overlay = overlay_text(&out, 1);
        assert!(overlay.contains("150 0 0 75 0 0 cm /Im1 Do"));
    }

    #[test]
    fn test_invalid_options() {
        let fonts = FontBook::standard();
        let pdf = sample_pdf(1);

        let blank = WatermarkOptions::text("  ");
        assert!(matches!(add_watermark(&pdf, &blank, &fonts), Err(Error::Validation(_))));

        let too_opaque = WatermarkOptions {
            opacity: 1.5,
            ..WatermarkOptions::text("x")
        };
        assert!(matches!(add_watermark(&pdf, &too_opaque, &fonts), Err(Error::Validation(_))));

        let garbage = WatermarkOptions::image(b"not an image".to_vec());
        assert!(matches!(add_watermark(&pdf, &garbage, &fonts), Err(Error::Image(_))));
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let fonts = FontBook::standard();
        let pdf = sample_pdf(1);

        let endless = WatermarkOptions {
            font_size: "inf".parse().unwrap(),
            position: Placement::Tile,
            ..WatermarkOptions::text("x")
        };
        assert!(matches!(add_watermark(&pdf, &endless, &fonts), Err(Error::Validation(_))));

        let spinning = WatermarkOptions {
            rotation: f32::NAN,
            ..WatermarkOptions::text("x")
        };
        assert!(matches!(add_watermark(&pdf, &spinning, &fonts), Err(Error::Validation(_))));

        let ghost = WatermarkOptions {
            opacity: f32::NAN,
            ..WatermarkOptions::image(png(10, 10))
        };
        assert!(matches!(add_watermark(&pdf, &ghost, &fonts), Err(Error::Validation(_))));
    }
}
