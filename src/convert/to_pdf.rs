//! Plain text and images into PDF

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use lopdf::Document;
use tracing::info;

use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::layout::PageSize;
use crate::pdf::fonts::{FontBook, FontWeight};
use crate::pdf::overlay::{ImageElement, OverlayComposer, OverlayElement, Position, TextElement};
use crate::pdf::raster::PreparedImage;

/// Page margin for text documents
pub const TEXT_MARGIN: f32 = 50.0;
/// Font size for text documents
pub const TEXT_FONT_SIZE: f32 = 12.0;
/// Distance between text lines
pub const TEXT_LINE_HEIGHT: f32 = 20.0;

/// What an uploaded file can be turned into a PDF from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Image,
}

impl SourceKind {
    /// Classify a file by its extension
    pub fn from_file_name(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "txt" => Ok(SourceKind::Text),
            "png" | "jpg" | "jpeg" => Ok(SourceKind::Image),
            "html" | "htm" => Err(Error::validation("HTML to PDF conversion is not supported")),
            _ => Err(Error::validation(format!(
                "Cannot convert '{name}' to PDF (supported: txt, png, jpg, jpeg)"
            ))),
        }
    }
}

/// The `source_format` names used by the desktop client
impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(SourceKind::Text),
            "image" => Ok(SourceKind::Image),
            "html" => Err(Error::validation("HTML to PDF conversion is not supported")),
            other => Err(Error::validation(format!(
                "Unsupported source format '{other}' (expected txt or image)"
            ))),
        }
    }
}

/// Lay out plain text on Letter pages with greedy word wrap.
///
/// Blank lines advance one line; every paragraph is followed by half a line.
pub fn text_to_pdf(text: &str, fonts: &FontBook) -> Result<Document> {
    let page = PageSize::LETTER;
    let max_width = page.width - 2.0 * TEXT_MARGIN;
    let bottom = page.height - TEXT_MARGIN;
    let measure = |s: &str| fonts.string_width(FontWeight::Regular, s, TEXT_FONT_SIZE);

    let mut pages: Vec<Vec<OverlayElement>> = vec![Vec::new()];
    let mut y = TEXT_MARGIN;

    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            y += TEXT_LINE_HEIGHT;
            continue;
        }
        for line in wrap(paragraph, max_width, &measure) {
            if y + TEXT_LINE_HEIGHT > bottom {
                pages.push(Vec::new());
                y = TEXT_MARGIN;
            }
            if let Some(current) = pages.last_mut() {
                current.push(text_line(line, y));
            }
            y += TEXT_LINE_HEIGHT;
        }
        y += TEXT_LINE_HEIGHT / 2.0;
    }

    let mut composer = OverlayComposer::new(fonts);
    for elements in &pages {
        composer.add_page(page, elements)?;
    }
    info!("laid out text on {} pages", composer.page_count());
    composer.finish()
}

fn text_line(line: String, y: f32) -> OverlayElement {
    OverlayElement::Text(TextElement {
        position: Position::TopLeft { x: TEXT_MARGIN, y },
        text: line,
        weight: FontWeight::Regular,
        font_size: TEXT_FONT_SIZE,
        color: Rgb::BLACK,
        background: None,
        opacity: 1.0,
    })
}

/// Greedy word wrap; words wider than a line are broken by characters
fn wrap(paragraph: &str, max_width: f32, measure: &dyn Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in paragraph.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_string();
            continue;
        }
        for ch in word.chars() {
            current.push(ch);
            if measure(&current) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// One page per image, each page exactly the image's pixel size
pub fn images_to_pdf<B: AsRef<[u8]>>(images: &[B], fonts: &FontBook) -> Result<Document> {
    if images.is_empty() {
        return Err(Error::validation("No images provided"));
    }

    let mut composer = OverlayComposer::new(fonts);
    for bytes in images {
        let image = PreparedImage::decode(bytes.as_ref(), 1.0, None)?;
        let (width, height) = (image.width() as f32, image.height() as f32);
        let element = OverlayElement::Image(ImageElement {
            position: Position::TopLeft { x: 0.0, y: 0.0 },
            image: Arc::new(image),
            width,
            height,
            background: None,
        });
        composer.add_page(PageSize::new(width, height), &[element])?;
    }
    info!("converted {} images to PDF", composer.page_count());
    composer.finish()
}
