//! Fonts: text measurement and PDF font objects
//!
//! Two kinds of faces are supported. The standard Helvetica pair needs no
//! font file and covers WinAnsi text. TrueType/OpenType faces loaded from
//! disk are shaped with rustybuzz and embedded as Type0 fonts, which lets
//! overlays carry any script the font covers.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use rustybuzz::ttf_parser::GlyphId;
use rustybuzz::{Face, UnicodeBuffer};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Weight selector for overlay text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

impl FontWeight {
    pub fn from_bold(bold: bool) -> Self {
        if bold {
            FontWeight::Bold
        } else {
            FontWeight::Regular
        }
    }
}

/// One of the standard 14 PDF fonts we know metrics for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Advance width of a WinAnsi code in 1/1000 em
    fn width(&self, code: u8) -> u16 {
        let table = match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        match code {
            32..=126 => table[usize::from(code - 32)],
            _ => 556,
        }
    }
}

/// A TrueType or OpenType face loaded from disk
#[derive(Debug)]
pub struct TrueTypeFont {
    name: String,
    data: Vec<u8>,
    units_per_em: f32,
}

/// A shaped glyph: id, advance in font units, and the text it stands for
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedGlyph {
    pub id: u16,
    pub advance: u16,
    pub text: String,
}

impl TrueTypeFont {
    /// Parse font data; `name` becomes the PDF BaseFont
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let name: String = name
            .into()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        let units_per_em = Face::from_slice(&data, 0)
            .map(|face| face.units_per_em() as f32)
            .ok_or_else(|| Error::Font(format!("cannot parse font data for {name}")))?;
        Ok(Self {
            name,
            data,
            units_per_em,
        })
    }

    /// Load a font file, naming it after the file stem
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "EmbeddedFont".to_string());
        Self::from_bytes(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn face(&self) -> Result<Face<'_>> {
        Face::from_slice(&self.data, 0)
            .ok_or_else(|| Error::Font(format!("cannot parse font data for {}", self.name)))
    }

    /// Shape a line of text into glyphs
    pub fn shape(&self, text: &str) -> Result<Vec<ShapedGlyph>> {
        let face = self.face()?;
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        let output = rustybuzz::shape(&face, &[], buffer);
        let infos = output.glyph_infos();

        // Cluster starts in text order, so each cluster's text can be sliced
        let mut starts: Vec<usize> = infos.iter().map(|i| i.cluster as usize).collect();
        starts.sort_unstable();
        starts.dedup();

        let mut seen = Vec::new();
        let glyphs = infos
            .iter()
            .map(|info| {
                let id = info.glyph_id as u16;
                let advance = face.glyph_hor_advance(GlyphId(id)).unwrap_or(0);
                let cluster = info.cluster as usize;
                let text = if seen.contains(&cluster) {
                    String::new()
                } else {
                    seen.push(cluster);
                    let end = starts
                        .iter()
                        .find(|&&s| s > cluster)
                        .copied()
                        .unwrap_or(text.len());
                    text.get(cluster..end).unwrap_or_default().to_string()
                };
                ShapedGlyph { id, advance, text }
            })
            .collect();
        Ok(glyphs)
    }
}

/// A face usable for overlay text
#[derive(Debug, Clone)]
pub enum FontFace {
    Standard(StandardFont),
    Embedded(Arc<TrueTypeFont>),
}

/// Text prepared for a content stream with a given face
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedText {
    /// WinAnsi bytes for a simple font
    WinAnsi(Vec<u8>),
    /// Glyph ids for an Identity-H font
    Glyphs(Vec<ShapedGlyph>),
}

impl FontFace {
    /// Rendered width of one line of text at `size` points
    pub fn string_width(&self, text: &str, size: f32) -> f32 {
        match self {
            FontFace::Standard(font) => {
                let units: u32 = encode_win_ansi(text)
                    .into_iter()
                    .map(|code| u32::from(font.width(code)))
                    .sum();
                units as f32 / 1000.0 * size
            }
            FontFace::Embedded(font) => match font.shape(text) {
                Ok(glyphs) => {
                    let units: u32 = glyphs.iter().map(|g| u32::from(g.advance)).sum();
                    units as f32 / font.units_per_em * size
                }
                Err(e) => {
                    warn!("measuring with {} failed: {}", font.name, e);
                    0.0
                }
            },
        }
    }

    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        match self {
            FontFace::Standard(_) => Ok(EncodedText::WinAnsi(encode_win_ansi(text))),
            FontFace::Embedded(font) => Ok(EncodedText::Glyphs(font.shape(text)?)),
        }
    }
}

/// The text-metrics capability: one face per weight
#[derive(Debug, Clone)]
pub struct FontBook {
    regular: FontFace,
    bold: FontFace,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::standard()
    }
}

impl FontBook {
    /// Helvetica and Helvetica-Bold
    pub fn standard() -> Self {
        Self {
            regular: FontFace::Standard(StandardFont::Helvetica),
            bold: FontFace::Standard(StandardFont::HelveticaBold),
        }
    }

    /// Register a face for a weight, replacing the current one
    pub fn register(&mut self, weight: FontWeight, font: TrueTypeFont) {
        info!("registered {:?} font {}", weight, font.name);
        let face = FontFace::Embedded(Arc::new(font));
        match weight {
            FontWeight::Regular => self.regular = face,
            FontWeight::Bold => self.bold = face,
        }
    }

    /// Look for `*-Regular` and `*-Bold` font files in a directory.
    ///
    /// Anything missing or unreadable falls back to the standard fonts. A
    /// regular face without a bold one serves both weights.
    pub fn from_dir(dir: &Path) -> Self {
        let mut book = Self::standard();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("font directory {} unavailable ({}), using Helvetica", dir.display(), e);
                return book;
            }
        };

        let mut regular = None;
        let mut bold = None;
        for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
            let Some(stem) = font_file_stem(&path) else {
                continue;
            };
            if stem.ends_with("-regular") && regular.is_none() {
                regular = Some(path);
            } else if stem.ends_with("-bold") && bold.is_none() {
                bold = Some(path);
            }
        }

        let load = |path: Option<std::path::PathBuf>| {
            path.and_then(|p| match TrueTypeFont::load(&p) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!("cannot load font {}: {}", p.display(), e);
                    None
                }
            })
        };

        match (load(regular), load(bold)) {
            (Some(regular), Some(bold)) => {
                book.register(FontWeight::Regular, regular);
                book.register(FontWeight::Bold, bold);
            }
            (Some(regular), None) => {
                let face = Arc::new(regular);
                info!("registered font {} for both weights", face.name);
                book.regular = FontFace::Embedded(face.clone());
                book.bold = FontFace::Embedded(face);
            }
            (None, Some(bold)) => book.register(FontWeight::Bold, bold),
            (None, None) => warn!("no fonts found in {}, using Helvetica", dir.display()),
        }
        book
    }

    pub fn face(&self, weight: FontWeight) -> &FontFace {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }

    /// Rendered width of one line of text
    pub fn string_width(&self, weight: FontWeight, text: &str, size: f32) -> f32 {
        self.face(weight).string_width(text, size)
    }
}

fn font_file_stem(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ext != "ttf" && ext != "otf" {
        return None;
    }
    Some(path.file_stem()?.to_str()?.to_ascii_lowercase())
}

/// Map text to WinAnsi codes; unmappable characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            _ => WIN_ANSI_EXTRAS
                .iter()
                .find(|(ch, _)| *ch == c)
                .map(|(_, code)| *code)
                .unwrap_or(b'?'),
        })
        .collect()
}

/// Glyphs drawn with one embedded face, keyed by glyph id
pub(crate) type GlyphUsage = BTreeMap<u16, ShapedGlyph>;

/// Simple Type1 font dictionary for a standard face
pub(crate) fn standard_font_dictionary(font: StandardFont) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"Font".to_vec()));
    dict.set("Subtype", Object::Name(b"Type1".to_vec()));
    dict.set("BaseFont", Object::Name(font.base_font().as_bytes().to_vec()));
    dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    dict
}

/// Embed a TrueType face as a Type0 / CIDFontType2 font under `font_id`.
///
/// Widths and the ToUnicode map only cover the glyphs in `used`.
pub(crate) fn embed_true_type(
    doc: &mut Document,
    font_id: ObjectId,
    font: &TrueTypeFont,
    used: &GlyphUsage,
) -> Result<()> {
    let face = font.face()?;
    let scale = 1000.0 / font.units_per_em;
    let scaled = |v: i16| Object::Integer((f32::from(v) * scale).round() as i64);

    let font_file_id = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![("Length1", Object::Integer(font.data.len() as i64))]),
        font.data.clone(),
    ));

    let bbox = face.global_bounding_box();
    let mut descriptor = Dictionary::new();
    descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
    descriptor.set("FontName", Object::Name(font.name.as_bytes().to_vec()));
    descriptor.set("Flags", Object::Integer(32));
    descriptor.set(
        "FontBBox",
        Object::Array(vec![
            scaled(bbox.x_min),
            scaled(bbox.y_min),
            scaled(bbox.x_max),
            scaled(bbox.y_max),
        ]),
    );
    descriptor.set("ItalicAngle", Object::Integer(0));
    descriptor.set("Ascent", scaled(face.ascender()));
    descriptor.set("Descent", scaled(face.descender()));
    descriptor.set("CapHeight", scaled(face.capital_height().unwrap_or(face.ascender())));
    descriptor.set("StemV", Object::Integer(80));
    descriptor.set("FontFile2", Object::Reference(font_file_id));
    let descriptor_id = doc.add_object(Object::Dictionary(descriptor));

    let mut widths = Vec::with_capacity(used.len() * 2);
    for glyph in used.values() {
        widths.push(Object::Integer(i64::from(glyph.id)));
        widths.push(Object::Array(vec![Object::Integer(
            (f32::from(glyph.advance) * scale).round() as i64,
        )]));
    }

    let mut cid_font = Dictionary::new();
    cid_font.set("Type", Object::Name(b"Font".to_vec()));
    cid_font.set("Subtype", Object::Name(b"CIDFontType2".to_vec()));
    cid_font.set("BaseFont", Object::Name(font.name.as_bytes().to_vec()));
    cid_font.set(
        "CIDSystemInfo",
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
            ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
            ("Supplement", Object::Integer(0)),
        ])),
    );
    cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
    cid_font.set("CIDToGIDMap", Object::Name(b"Identity".to_vec()));
    cid_font.set("W", Object::Array(widths));
    let cid_font_id = doc.add_object(Object::Dictionary(cid_font));

    let to_unicode_id = doc.add_object(Stream::new(
        Dictionary::new(),
        to_unicode_cmap(used).into_bytes(),
    ));

    let mut type0 = Dictionary::new();
    type0.set("Type", Object::Name(b"Font".to_vec()));
    type0.set("Subtype", Object::Name(b"Type0".to_vec()));
    type0.set("BaseFont", Object::Name(font.name.as_bytes().to_vec()));
    type0.set("Encoding", Object::Name(b"Identity-H".to_vec()));
    type0.set("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)]));
    type0.set("ToUnicode", Object::Reference(to_unicode_id));
    doc.objects.insert(font_id, Object::Dictionary(type0));

    debug!(font = %font.name, glyphs = used.len(), "embedded font");
    Ok(())
}

/// ToUnicode CMap for the used glyphs
fn to_unicode_cmap(used: &GlyphUsage) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let mapped: Vec<&ShapedGlyph> = used.values().filter(|g| !g.text.is_empty()).collect();
    // At most 100 entries per bfchar block
    for block in mapped.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", block.len());
        for glyph in block {
            let utf16: String = glyph
                .text
                .encode_utf16()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            let _ = writeln!(cmap, "<{:04X}> <{}>", glyph.id, utf16);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// WinAnsi codes 0x80..0x9F that differ from Latin-1
const WIN_ANSI_EXTRAS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Helvetica advance widths for codes 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Helvetica-Bold advance widths for codes 32..=126
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_width() {
        let book = FontBook::standard();
        // H e l l o = 722 + 556 + 222 + 222 + 556
        let width = book.string_width(FontWeight::Regular, "Hello", 10.0);
        assert!((width - 22.78).abs() < 1e-3);
        assert!(book.string_width(FontWeight::Bold, "Hello", 10.0) > width);
        assert_eq!(book.string_width(FontWeight::Regular, "", 10.0), 0.0);
    }

    #[test]
    fn test_width_scales_with_size() {
        let book = FontBook::standard();
        let small = book.string_width(FontWeight::Regular, "CONFIDENTIAL", 20.0);
        let large = book.string_width(FontWeight::Regular, "CONFIDENTIAL", 40.0);
        assert!((large - 2.0 * small).abs() < 1e-3);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Ab~"), b"Ab~".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("“€”"), vec![0x93, 0x80, 0x94]);
        assert_eq!(encode_win_ansi("한"), b"?".to_vec());
    }

    #[test]
    fn test_standard_font_dictionary() {
        let dict = standard_font_dictionary(StandardFont::HelveticaBold);
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica-Bold");
        assert_eq!(dict.get(b"Encoding").unwrap().as_name().unwrap(), b"WinAnsiEncoding");
    }

    #[test]
    fn test_invalid_font_data_is_rejected() {
        let result = TrueTypeFont::from_bytes("Broken", vec![0, 1, 2, 3]);
        assert!(matches!(result, Err(Error::Font(_))));
    }

    #[test]
    fn test_truetype_scale() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/demo.ttf");
        let font = TrueTypeFont::load(&path).unwrap();
        assert_eq!(font.name, "demo");
        assert_eq!(font.units_per_em, 1000.0);
    }

    #[test]
    fn test_missing_font_dir_falls_back() {
        let book = FontBook::from_dir(Path::new("/nonexistent/fonts"));
        assert!(matches!(book.face(FontWeight::Regular), FontFace::Standard(StandardFont::Helvetica)));
        assert!(matches!(book.face(FontWeight::Bold), FontFace::Standard(StandardFont::HelveticaBold)));
    }

    #[test]
    fn test_to_unicode_cmap_lists_used_glyphs() {
        let mut used = GlyphUsage::new();
        used.insert(36, ShapedGlyph { id: 36, advance: 1300, text: "A".into() });
        used.insert(3, ShapedGlyph { id: 3, advance: 500, text: String::new() });
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("1 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
    }
}
