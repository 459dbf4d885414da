//! Overlay documents
//!
//! An overlay is a throwaway PDF whose pages hold only the marks we want to
//! add (watermark text or images, editor text blocks, signatures and
//! checkboxes). Each overlay page has the size of the page it will be merged
//! onto. Elements are drawn in the order given, so later ones end up on top.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tiny_skia_path::{Path, PathBuilder, PathSegment, Point, Rect, Transform};
use tracing::debug;

use crate::color::Rgb;
use crate::error::Result;
use crate::layout::{to_pdf_space, DrawInstruction, ElementSize, PageSize};
use crate::pdf::document;
use crate::pdf::fonts::{
    embed_true_type, standard_font_dictionary, EncodedText, FontBook, FontFace, FontWeight,
    GlyphUsage,
};
use crate::pdf::raster::PreparedImage;

/// Padding around a text block's background
pub const TEXT_BACKGROUND_PADDING: f32 = 2.0;

/// Line height as a multiple of the font size
pub const LEADING_FACTOR: f32 = 1.2;

/// Where an element goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Top-left corner in top-left-origin pixel space (editor coordinates)
    TopLeft { x: f32, y: f32 },
    /// Already computed in PDF space
    Placed(DrawInstruction),
}

impl Position {
    /// Bottom-left origin and rotation of an element's box in PDF space
    pub fn resolve(&self, size: ElementSize, page_height: f32) -> DrawInstruction {
        match *self {
            Position::TopLeft { x, y } => {
                let (x, top) = to_pdf_space(x, y, page_height);
                DrawInstruction {
                    x,
                    y: top - size.height,
                    rotation: 0.0,
                }
            }
            Position::Placed(instruction) => instruction,
        }
    }
}

/// One or more lines of text
#[derive(Debug, Clone)]
pub struct TextElement {
    pub position: Position,
    pub text: String,
    pub weight: FontWeight,
    pub font_size: f32,
    pub color: Rgb,
    pub background: Option<Rgb>,
    pub opacity: f32,
}

impl TextElement {
    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }

    pub fn leading(&self) -> f32 {
        self.font_size * LEADING_FACTOR
    }

    /// Box from the last baseline up to one font size above the first.
    ///
    /// Width is the widest line.
    pub fn measure(&self, fonts: &FontBook) -> ElementSize {
        let lines = self.lines();
        let width = lines
            .iter()
            .map(|line| fonts.string_width(self.weight, line, self.font_size))
            .fold(0.0, f32::max);
        let height = match lines.len() {
            0 => 0.0,
            n => self.font_size + (n - 1) as f32 * self.leading(),
        };
        ElementSize::new(width, height)
    }
}

/// A raster image drawn at a given size
#[derive(Debug, Clone)]
pub struct ImageElement {
    pub position: Position,
    pub image: Arc<PreparedImage>,
    pub width: f32,
    pub height: f32,
    pub background: Option<Rgb>,
}

/// A checkbox
#[derive(Debug, Clone)]
pub struct ShapeElement {
    pub position: Position,
    pub size: f32,
    pub checked: bool,
    pub has_border: bool,
    pub border_color: Rgb,
    pub transparent: bool,
    pub fill_color: Rgb,
    pub opacity: f32,
}

/// Anything that can be drawn on an overlay page
#[derive(Debug, Clone)]
pub enum OverlayElement {
    Text(TextElement),
    Image(ImageElement),
    Shape(ShapeElement),
}

impl OverlayElement {
    pub fn size(&self, fonts: &FontBook) -> ElementSize {
        match self {
            OverlayElement::Text(text) => text.measure(fonts),
            OverlayElement::Image(image) => ElementSize::new(image.width, image.height),
            OverlayElement::Shape(shape) => ElementSize::new(shape.size, shape.size),
        }
    }

    /// Same element at another position
    pub fn with_position(&self, position: Position) -> Self {
        let mut element = self.clone();
        match &mut element {
            OverlayElement::Text(e) => e.position = position,
            OverlayElement::Image(e) => e.position = position,
            OverlayElement::Shape(e) => e.position = position,
        }
        element
    }
}

struct FontSlot {
    id: ObjectId,
    face: FontFace,
    used: GlyphUsage,
}

/// Resource names used by one overlay page
#[derive(Default)]
struct PageResources {
    fonts: BTreeMap<String, ObjectId>,
    xobjects: BTreeMap<String, ObjectId>,
    ext_gstates: BTreeMap<String, ObjectId>,
}

impl PageResources {
    fn into_dictionary(self) -> Dictionary {
        let section = |entries: BTreeMap<String, ObjectId>| {
            Object::Dictionary(Dictionary::from_iter(
                entries
                    .into_iter()
                    .map(|(name, id)| (name.into_bytes(), Object::Reference(id))),
            ))
        };
        let mut dict = Dictionary::new();
        if !self.fonts.is_empty() {
            dict.set("Font", section(self.fonts));
        }
        if !self.xobjects.is_empty() {
            dict.set("XObject", section(self.xobjects));
        }
        if !self.ext_gstates.is_empty() {
            dict.set("ExtGState", section(self.ext_gstates));
        }
        dict
    }
}

/// Builds a multi-page overlay document.
///
/// Fonts, images and opacity states are shared between pages, so a watermark
/// repeated over a hundred pages embeds its image once.
pub struct OverlayComposer<'a> {
    fonts: &'a FontBook,
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    font_slots: BTreeMap<FontWeight, FontSlot>,
    images: Vec<(Arc<PreparedImage>, ObjectId)>,
    alpha_states: BTreeMap<u32, ObjectId>,
}

impl<'a> OverlayComposer<'a> {
    pub fn new(fonts: &'a FontBook) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            fonts,
            doc,
            pages_id,
            page_ids: Vec::new(),
            font_slots: BTreeMap::new(),
            images: Vec::new(),
            alpha_states: BTreeMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Add a page of the given size holding `elements`, drawn in order
    pub fn add_page(&mut self, page: PageSize, elements: &[OverlayElement]) -> Result<ObjectId> {
        let mut content = String::new();
        let mut resources = PageResources::default();

        for element in elements {
            match element {
                OverlayElement::Text(text) => self.draw_text(&mut content, &mut resources, text, page)?,
                OverlayElement::Image(image) => self.draw_image(&mut content, &mut resources, image, page),
                OverlayElement::Shape(shape) => self.draw_shape(&mut content, &mut resources, shape, page),
            }
        }

        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.width),
                Object::Real(page.height),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources.into_dictionary()));

        let page_id = self.doc.add_object(Object::Dictionary(page_dict));
        self.page_ids.push(page_id);
        debug!(elements = elements.len(), page = self.page_ids.len(), "composed overlay page");
        Ok(page_id)
    }

    /// Write the shared fonts and page tree and hand out the document
    pub fn finish(mut self) -> Result<Document> {
        for slot in self.font_slots.values() {
            match &slot.face {
                FontFace::Standard(font) => {
                    self.doc
                        .objects
                        .insert(slot.id, Object::Dictionary(standard_font_dictionary(*font)));
                }
                FontFace::Embedded(font) => embed_true_type(&mut self.doc, slot.id, font, &slot.used)?,
            }
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.page_ids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(Object::Dictionary(catalog));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        Ok(self.doc)
    }

    fn draw_text(
        &mut self,
        out: &mut String,
        resources: &mut PageResources,
        text: &TextElement,
        page: PageSize,
    ) -> Result<()> {
        let lines = text.lines();
        if lines.is_empty() {
            return Ok(());
        }
        let size = text.measure(self.fonts);
        let at = text.position.resolve(size, page.height);
        let leading = text.leading();

        out.push_str("q\n");
        write_cm(out, &at.transform(size));
        self.set_opacity(out, resources, text.opacity);

        if let Some(background) = text.background {
            let block = lines.len() as f32 * leading;
            let pad = TEXT_BACKGROUND_PADDING;
            let _ = writeln!(
                out,
                "{} rg {} {} {} {} re f",
                rgb(background),
                num(-pad),
                num(size.height - block - pad),
                num(size.width + 2.0 * pad),
                num(block + 2.0 * pad)
            );
        }

        let font_name = self.font_resource(resources, text.weight);
        let _ = writeln!(
            out,
            "BT /{} {} Tf {} rg {} TL 0 {} Td",
            font_name,
            num(text.font_size),
            rgb(text.color),
            num(leading),
            num(size.height - text.font_size)
        );
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                out.push_str("T* ");
            }
            let shown = self.show_string(text.weight, line)?;
            let _ = writeln!(out, "{shown} Tj");
        }
        out.push_str("ET\nQ\n");
        Ok(())
    }

    fn draw_image(
        &mut self,
        out: &mut String,
        resources: &mut PageResources,
        image: &ImageElement,
        page: PageSize,
    ) {
        let size = ElementSize::new(image.width, image.height);
        let at = image.position.resolve(size, page.height);
        let name = self.image_resource(resources, &image.image);

        out.push_str("q\n");
        write_cm(out, &at.transform(size));
        if let Some(background) = image.background {
            let _ = writeln!(out, "{} rg 0 0 {} {} re f", rgb(background), num(size.width), num(size.height));
        }
        let _ = writeln!(out, "{} 0 0 {} 0 0 cm /{} Do", num(size.width), num(size.height), name);
        out.push_str("Q\n");
    }

    fn draw_shape(
        &mut self,
        out: &mut String,
        resources: &mut PageResources,
        shape: &ShapeElement,
        page: PageSize,
    ) {
        let s = shape.size;
        let size = ElementSize::new(s, s);
        let at = shape.position.resolve(size, page.height);

        out.push_str("q\n");
        write_cm(out, &at.transform(size));
        self.set_opacity(out, resources, shape.opacity);

        let fill = !shape.transparent;
        let paint = match (fill, shape.has_border) {
            (true, true) => Some("B"),
            (true, false) => Some("f"),
            (false, true) => Some("S"),
            (false, false) => None,
        };
        if let (Some(op), Some(rect)) = (paint, Rect::from_xywh(0.0, 0.0, s, s)) {
            if fill {
                let _ = writeln!(out, "{} rg", rgb(shape.fill_color));
            }
            if shape.has_border {
                let _ = writeln!(out, "{} RG 1 w", rgb(shape.border_color));
            }
            write_path(out, &PathBuilder::from_rect(rect));
            let _ = writeln!(out, "{op}");
        }

        if shape.checked {
            if let Some(mark) = check_mark(s) {
                let _ = writeln!(out, "0 0 0 RG {} w 1 J 1 j", num(s / 8.0));
                write_path(out, &mark);
                out.push_str("S\n");
            }
        }
        out.push_str("Q\n");
    }

    fn set_opacity(&mut self, out: &mut String, resources: &mut PageResources, opacity: f32) {
        if opacity >= 1.0 {
            return;
        }
        let key = (opacity.max(0.0) * 1000.0).round() as u32;
        let doc = &mut self.doc;
        let id = *self.alpha_states.entry(key).or_insert_with(|| {
            let alpha = Object::Real(key as f32 / 1000.0);
            let mut state = Dictionary::new();
            state.set("Type", Object::Name(b"ExtGState".to_vec()));
            state.set("ca", alpha.clone());
            state.set("CA", alpha);
            doc.add_object(Object::Dictionary(state))
        });
        let name = format!("GS{key}");
        resources.ext_gstates.insert(name.clone(), id);
        let _ = writeln!(out, "/{name} gs");
    }

    fn font_resource(&mut self, resources: &mut PageResources, weight: FontWeight) -> String {
        let name = match weight {
            FontWeight::Regular => "F1",
            FontWeight::Bold => "F2",
        };
        let fonts = self.fonts;
        let doc = &mut self.doc;
        let slot = self.font_slots.entry(weight).or_insert_with(|| FontSlot {
            id: doc.new_object_id(),
            face: fonts.face(weight).clone(),
            used: GlyphUsage::new(),
        });
        resources.fonts.insert(name.to_string(), slot.id);
        name.to_string()
    }

    fn image_resource(&mut self, resources: &mut PageResources, image: &Arc<PreparedImage>) -> String {
        let index = match self.images.iter().position(|(known, _)| Arc::ptr_eq(known, image)) {
            Some(index) => index,
            None => {
                let id = image.write_xobject(&mut self.doc);
                self.images.push((image.clone(), id));
                self.images.len() - 1
            }
        };
        let name = format!("Im{}", index + 1);
        resources.xobjects.insert(name.clone(), self.images[index].1);
        name
    }

    /// The string operand for one line, recording glyph usage for embedded fonts
    fn show_string(&mut self, weight: FontWeight, line: &str) -> Result<String> {
        let Some(slot) = self.font_slots.get_mut(&weight) else {
            return Ok("()".to_string());
        };
        Ok(match slot.face.encode(line)? {
            EncodedText::WinAnsi(bytes) => format!("({})", escape_literal(&bytes)),
            EncodedText::Glyphs(glyphs) => {
                let mut hex = String::with_capacity(glyphs.len() * 4 + 2);
                hex.push('<');
                for glyph in glyphs {
                    let _ = write!(hex, "{:04X}", glyph.id);
                    slot.used.entry(glyph.id).or_insert(glyph);
                }
                hex.push('>');
                hex
            }
        })
    }
}

/// Build a single-page overlay and serialize it
pub fn compose(fonts: &FontBook, page: PageSize, elements: &[OverlayElement]) -> Result<Vec<u8>> {
    let mut composer = OverlayComposer::new(fonts);
    composer.add_page(page, elements)?;
    let mut doc = composer.finish()?;
    doc.compress();
    document::write(&mut doc)
}

/// Check mark through three points, relative to a square of side `size`
fn check_mark(size: f32) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(size * 0.2, size * 0.5);
    pb.line_to(size * 0.45, size * 0.25);
    pb.line_to(size * 0.8, size * 0.75);
    pb.finish()
}

fn write_cm(out: &mut String, t: &Transform) {
    let _ = writeln!(
        out,
        "{} {} {} {} {} {} cm",
        num(t.sx),
        num(t.ky),
        num(t.kx),
        num(t.sy),
        num(t.tx),
        num(t.ty)
    );
}

fn write_path(out: &mut String, path: &Path) {
    let mut last = Point::zero();
    for segment in path.segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                let _ = write!(out, "{} {} m ", num(p.x), num(p.y));
                last = p;
            }
            PathSegment::LineTo(p) => {
                let _ = write!(out, "{} {} l ", num(p.x), num(p.y));
                last = p;
            }
            PathSegment::QuadTo(q, p) => {
                // Degree-elevate to a cubic
                let c1 = Point::from_xy(last.x + 2.0 / 3.0 * (q.x - last.x), last.y + 2.0 / 3.0 * (q.y - last.y));
                let c2 = Point::from_xy(p.x + 2.0 / 3.0 * (q.x - p.x), p.y + 2.0 / 3.0 * (q.y - p.y));
                let _ = write!(
                    out,
                    "{} {} {} {} {} {} c ",
                    num(c1.x),
                    num(c1.y),
                    num(c2.x),
                    num(c2.y),
                    num(p.x),
                    num(p.y)
                );
                last = p;
            }
            PathSegment::CubicTo(c1, c2, p) => {
                let _ = write!(
                    out,
                    "{} {} {} {} {} {} c ",
                    num(c1.x),
                    num(c1.y),
                    num(c2.x),
                    num(c2.y),
                    num(p.x),
                    num(p.y)
                );
                last = p;
            }
            PathSegment::Close => out.push_str("h "),
        }
    }
    out.push('\n');
}

fn rgb(color: Rgb) -> String {
    format!("{} {} {}", num(color.r), num(color.g), num(color.b))
}

/// Compact number formatting for content streams
fn num(value: f32) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Escape bytes for a literal string; non-ASCII bytes become octal escapes
fn escape_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{place, Placement, CORNER_MARGIN};

    fn text(value: &str, position: Position) -> TextElement {
        TextElement {
            position,
            text: value.to_string(),
            weight: FontWeight::Regular,
            font_size: 12.0,
            color: Rgb::BLACK,
            background: None,
            opacity: 1.0,
        }
    }

    fn checkbox(checked: bool, has_border: bool, transparent: bool) -> ShapeElement {
        ShapeElement {
            position: Position::TopLeft { x: 10.0, y: 10.0 },
            size: 18.0,
            checked,
            has_border,
            border_color: Rgb::BLACK,
            transparent,
            fill_color: Rgb::WHITE,
            opacity: 1.0,
        }
    }

    fn single_page(elements: &[OverlayElement]) -> (Document, String) {
        let fonts = FontBook::standard();
        let mut composer = OverlayComposer::new(&fonts);
        composer.add_page(PageSize::LETTER, elements).unwrap();
        let doc = composer.finish().unwrap();
        let page = *doc.get_pages().values().next().unwrap();
        let content = String::from_utf8(doc.get_page_content(page).unwrap()).unwrap();
        (doc, content)
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(0.5), "0.5");
        assert_eq!(num(-0.00001), "0");
        assert_eq!(num(612.125), "612.125");
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal(b"a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_literal(&[0xE9]), "\\351");
    }

    #[test]
    fn test_empty_overlay_has_page_and_no_marks() {
        let (doc, content) = single_page(&[]);
        assert_eq!(doc.get_pages().len(), 1);
        assert!(content.trim().is_empty());
    }

    #[test]
    fn test_top_left_position_flips_axis() {
        let size = ElementSize::new(100.0, 50.0);
        let at = Position::TopLeft { x: 20.0, y: 30.0 }.resolve(size, 792.0);
        assert_eq!((at.x, at.y), (20.0, 712.0));
    }

    #[test]
    fn test_text_lines_and_background() {
        let mut element = text("first\nsecond", Position::TopLeft { x: 72.0, y: 72.0 });
        element.background = Some(Rgb::WHITE);
        let (doc, content) = single_page(&[OverlayElement::Text(element)]);

        assert!(content.contains("(first) Tj"));
        assert!(content.contains("T* (second) Tj"));
        assert!(content.contains("1 1 1 rg"));
        assert!(content.contains("re f"));
        assert!(content.contains("14.4 TL"));

        let page = *doc.get_pages().values().next().unwrap();
        let resources = doc.get_dictionary(page).unwrap().get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"F1"));
    }

    #[test]
    fn test_text_measure() {
        let fonts = FontBook::standard();
        let element = text("Hello\nHi", Position::TopLeft { x: 0.0, y: 0.0 });
        let size = element.measure(&fonts);
        assert!((size.width - fonts.string_width(FontWeight::Regular, "Hello", 12.0)).abs() < 1e-4);
        assert!((size.height - (12.0 + 14.4)).abs() < 1e-4);
    }

    #[test]
    fn test_translucent_text_uses_ext_gstate() {
        let mut element = text("Draft", Position::TopLeft { x: 0.0, y: 0.0 });
        element.opacity = 0.5;
        let (_, content) = single_page(&[OverlayElement::Text(element)]);
        assert!(content.contains("/GS500 gs"));
    }

    #[test]
    fn test_rotated_placement_emits_rotation_matrix() {
        let fonts = FontBook::standard();
        let element = text("WATERMARK", Position::TopLeft { x: 0.0, y: 0.0 });
        let size = element.measure(&fonts);
        let at = place(PageSize::LETTER, size, Placement::Center, 90.0, CORNER_MARGIN)[0];
        let placed = OverlayElement::Text(element).with_position(Position::Placed(at));
        let (_, content) = single_page(&[placed]);
        // cos 90 = 0, sin 90 = 1
        assert!(content.contains("0 1 -1 0 "));
    }

    #[test]
    fn test_checkbox_variants() {
        let (_, content) = single_page(&[OverlayElement::Shape(checkbox(true, true, false))]);
        assert!(content.contains("\nB\n"));
        assert!(content.contains("1 J 1 j"));
        assert!(content.contains("3.6 9 m 8.1 4.5 l 14.4 13.5 l"));

        let (_, content) = single_page(&[OverlayElement::Shape(checkbox(false, false, true))]);
        assert!(!content.contains(" re"));
        assert!(!content.contains(" m "));

        let (_, content) = single_page(&[OverlayElement::Shape(checkbox(false, true, true))]);
        assert!(content.contains("\nS\n"));

        let (_, content) = single_page(&[OverlayElement::Shape(checkbox(true, false, true))]);
        assert!(content.contains("1 J 1 j"));
    }

    #[test]
    fn test_images_are_shared_across_pages() {
        let fonts = FontBook::standard();
        let image = Arc::new(PreparedImage::from_rgba(
            image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255])),
            1.0,
            None,
        ));
        let element = OverlayElement::Image(ImageElement {
            position: Position::TopLeft { x: 0.0, y: 0.0 },
            image,
            width: 4.0,
            height: 4.0,
            background: None,
        });

        let mut composer = OverlayComposer::new(&fonts);
        composer.add_page(PageSize::LETTER, std::slice::from_ref(&element)).unwrap();
        composer.add_page(PageSize::A4, std::slice::from_ref(&element)).unwrap();
        assert_eq!(composer.page_count(), 2);
        let doc = composer.finish().unwrap();

        let images = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Image"[..]))
            .count();
        assert_eq!(images, 1);
    }

    #[test]
    fn test_compose_serializes_a_pdf() {
        let fonts = FontBook::standard();
        let bytes = compose(&fonts, PageSize::A4, &[OverlayElement::Text(text("x", Position::TopLeft { x: 1.0, y: 1.0 }))]).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
