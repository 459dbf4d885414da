//! Raster images for overlays

use image::imageops::{self, FilterType};
use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Longest side of an image watermark
pub const WATERMARK_MAX_SIZE: u32 = 150;

/// Longest side of a signature image before it is drawn
pub const SIGNATURE_MAX_SIZE: u32 = 300;

/// A decoded RGBA image ready to be embedded
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pixels: RgbaImage,
}

impl PreparedImage {
    /// Decode image bytes, scale alpha by `opacity` and optionally shrink so
    /// neither side exceeds `max_size`.
    pub fn decode(bytes: &[u8], opacity: f32, max_size: Option<u32>) -> Result<Self> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(Error::validation(format!(
                "Opacity must be between 0 and 1, got {opacity}"
            )));
        }
        let pixels = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self::from_rgba(pixels, opacity, max_size))
    }

    pub fn from_rgba(mut pixels: RgbaImage, opacity: f32, max_size: Option<u32>) -> Self {
        if opacity < 1.0 {
            for pixel in pixels.pixels_mut() {
                pixel.0[3] = (f32::from(pixel.0[3]) * opacity) as u8;
            }
        }

        if let Some(cap) = max_size {
            let (w, h) = pixels.dimensions();
            if w > cap || h > cap {
                let ratio = (cap as f32 / w as f32).min(cap as f32 / h as f32);
                let new_w = ((w as f32 * ratio) as u32).max(1);
                let new_h = ((h as f32 * ratio) as u32).max(1);
                pixels = imageops::resize(&pixels, new_w, new_h, FilterType::Lanczos3);
            }
        }

        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn has_transparency(&self) -> bool {
        self.pixels.pixels().any(|p| p.0[3] < 255)
    }

    /// Add an image XObject (plus soft mask if needed) and return its id
    pub(crate) fn write_xobject(&self, doc: &mut Document) -> ObjectId {
        let (w, h) = self.pixels.dimensions();
        let mut rgb = Vec::with_capacity((w * h * 3) as usize);
        let mut alpha = Vec::with_capacity((w * h) as usize);
        for pixel in self.pixels.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mut dict = image_dictionary(w, h, b"DeviceRGB");
        if self.has_transparency() {
            let mask_id = doc.add_object(Stream::new(image_dictionary(w, h, b"DeviceGray"), alpha));
            dict.set("SMask", Object::Reference(mask_id));
        }
        doc.add_object(Stream::new(dict, rgb))
    }
}

fn image_dictionary(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(i64::from(width)));
    dict.set("Height", Object::Integer(i64::from(height)));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_alpha_is_scaled() {
        let image = PreparedImage::decode(&png(4, 4, [10, 20, 30, 200]), 0.5, None).unwrap();
        assert!(image.pixels.pixels().all(|p| p.0 == [10, 20, 30, 100]));
    }

    #[test]
    fn test_full_opacity_keeps_alpha() {
        let image = PreparedImage::decode(&png(2, 2, [0, 0, 0, 255]), 1.0, None).unwrap();
        assert!(!image.has_transparency());
    }

    #[test]
    fn test_downscale_keeps_aspect_ratio() {
        let image = PreparedImage::decode(&png(600, 300, [255, 0, 0, 255]), 1.0, Some(WATERMARK_MAX_SIZE)).unwrap();
        assert_eq!((image.width(), image.height()), (150, 75));
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let image = PreparedImage::decode(&png(40, 20, [255, 0, 0, 255]), 1.0, Some(SIGNATURE_MAX_SIZE)).unwrap();
        assert_eq!((image.width(), image.height()), (40, 20));
    }

    #[test]
    fn test_rejects_garbage_and_bad_opacity() {
        assert!(matches!(PreparedImage::decode(b"not an image", 1.0, None), Err(Error::Image(_))));
        assert!(matches!(PreparedImage::decode(&png(1, 1, [0; 4]), 1.5, None), Err(Error::Validation(_))));
    }

    #[test]
    fn test_xobject_has_soft_mask_when_transparent() {
        let mut doc = Document::with_version("1.5");
        let image = PreparedImage::decode(&png(3, 2, [1, 2, 3, 128]), 1.0, None).unwrap();
        let id = image.write_xobject(&mut doc);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.content.len(), 3 * 2 * 3);
        assert!(stream.dict.has(b"SMask"));
    }
}
