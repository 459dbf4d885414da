//! Page layout calculations
//!
//! All results are in PDF points with the origin at the bottom-left of the
//! page. Inputs given in top-left pixel space go through [`to_pdf_space`].

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tiny_skia_path::Transform;

use crate::error::{Error, Result};

/// Distance kept from the page edges by the corner placements
pub const CORNER_MARGIN: f32 = 50.0;

/// Tile pitch as a multiple of the element's larger side
pub const TILE_SPACING: f32 = 1.5;

/// Lower limit on the tile pitch so tiny elements don't explode the grid
pub const MIN_TILE_PITCH: f32 = 10.0;

/// Upper limit on the instructions of one tiled page
pub const MAX_TILES: usize = 10_000;

/// Page size in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// US Letter size (8.5" × 11")
    pub const LETTER: PageSize = PageSize { width: 612.0, height: 792.0 };

    /// A4 size (210mm × 297mm)
    pub const A4: PageSize = PageSize { width: 595.28, height: 841.89 };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Size as seen after applying a page rotation
    pub fn rotated(self, degrees: i64) -> Self {
        if degrees.rem_euclid(180) == 90 {
            Self { width: self.height, height: self.width }
        } else {
            self
        }
    }
}

/// Bounding box of an element before rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementSize {
    pub width: f32,
    pub height: f32,
}

impl ElementSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Where a watermark goes on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    #[default]
    Center,
    Tile,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Center => "center",
            Placement::Tile => "tile",
            Placement::TopLeft => "top-left",
            Placement::TopRight => "top-right",
            Placement::BottomLeft => "bottom-left",
            Placement::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" => Ok(Placement::Center),
            "tile" => Ok(Placement::Tile),
            "top-left" => Ok(Placement::TopLeft),
            "top-right" => Ok(Placement::TopRight),
            "bottom-left" => Ok(Placement::BottomLeft),
            "bottom-right" => Ok(Placement::BottomRight),
            other => Err(Error::validation(format!(
                "Unknown position '{other}' (expected center, tile, top-left, top-right, bottom-left or bottom-right)"
            ))),
        }
    }
}

/// Where to draw one element: bottom-left origin of its unrotated box, and
/// the rotation in degrees about the box center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawInstruction {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

impl DrawInstruction {
    /// Maps the element's local box `(0,0)..(w,h)` onto the page.
    pub fn transform(&self, size: ElementSize) -> Transform {
        Transform::from_translate(self.x, self.y).pre_concat(Transform::from_rotate_at(
            self.rotation,
            size.width / 2.0,
            size.height / 2.0,
        ))
    }
}

/// Flip a top-left pixel position into bottom-left PDF space
pub fn to_pdf_space(x_px: f32, y_px: f32, page_height: f32) -> (f32, f32) {
    (x_px, page_height - y_px)
}

/// Distance between neighbouring tile centers
pub fn tile_pitch(element: ElementSize) -> f32 {
    (element.width.max(element.height) * TILE_SPACING).max(MIN_TILE_PITCH)
}

/// Compute the draw instructions for an element on a page.
///
/// Non-tile placements yield exactly one instruction. Tile yields a grid that
/// extends one pitch past every page edge.
pub fn place(
    page: PageSize,
    element: ElementSize,
    placement: Placement,
    rotation: f32,
    margin: f32,
) -> Vec<DrawInstruction> {
    let at = |x: f32, y: f32| DrawInstruction { x, y, rotation };

    // Corners stay inside [margin, page - margin - size] on both axes;
    // on pages too small for that the near margin wins.
    let left = margin;
    let right = (page.width - margin - element.width).max(margin);
    let bottom = margin;
    let top = (page.height - margin - element.height).max(margin);

    match placement {
        Placement::Center => vec![at(
            (page.width - element.width) / 2.0,
            (page.height - element.height) / 2.0,
        )],
        Placement::TopLeft => vec![at(left, top)],
        Placement::TopRight => vec![at(right, top)],
        Placement::BottomLeft => vec![at(left, bottom)],
        Placement::BottomRight => vec![at(right, bottom)],
        Placement::Tile => tile(page, element, rotation),
    }
}

fn tile(page: PageSize, element: ElementSize, rotation: f32) -> Vec<DrawInstruction> {
    let pitch = tile_pitch(element);
    let inset_x = (pitch - element.width) / 2.0;
    let inset_y = (pitch - element.height) / 2.0;
    if ![pitch, inset_x, inset_y, page.width, page.height].iter().all(|v| v.is_finite()) {
        return Vec::new();
    }

    let mut instructions = Vec::new();
    // Rows run from one pitch above the top edge to one pitch below the bottom
    let mut row = page.height;
    'rows: loop {
        let mut col = -pitch;
        loop {
            if instructions.len() == MAX_TILES {
                break 'rows;
            }
            instructions.push(DrawInstruction {
                x: col + inset_x,
                y: row + inset_y,
                rotation,
            });
            if col >= page.width {
                break;
            }
            col += pitch;
        }
        if row <= -pitch {
            break;
        }
        row -= pitch;
    }
    instructions
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tiny_skia_path::Point;

    #[test]
    fn test_letter_size() {
        let letter = PageSize::LETTER;
        assert_eq!(letter.width, 612.0);
        assert_eq!(letter.height, 792.0);
        assert_eq!(letter.rotated(90), PageSize::new(792.0, 612.0));
        assert_eq!(letter.rotated(180), letter);
        assert_eq!(letter.rotated(-90), PageSize::new(792.0, 612.0));
    }

    #[test]
    fn test_to_pdf_space_flips_y() {
        assert_eq!(to_pdf_space(10.0, 20.0, 792.0), (10.0, 772.0));
        assert_eq!(to_pdf_space(0.0, 0.0, 792.0), (0.0, 792.0));
    }

    #[test]
    fn test_center() {
        let result = place(PageSize::LETTER, ElementSize::new(100.0, 40.0), Placement::Center, 0.0, CORNER_MARGIN);
        assert_eq!(result, vec![DrawInstruction { x: 256.0, y: 376.0, rotation: 0.0 }]);
    }

    #[test]
    fn test_center_is_idempotent() {
        let page = PageSize::A4;
        let element = ElementSize::new(123.4, 56.7);
        let first = place(page, element, Placement::Center, 45.0, CORNER_MARGIN);
        let second = place(page, element, Placement::Center, 45.0, CORNER_MARGIN);
        assert_eq!(first, second);
    }

    #[test]
    fn test_corners() {
        let page = PageSize::LETTER;
        let element = ElementSize::new(100.0, 40.0);
        let at = |p| place(page, element, p, 0.0, CORNER_MARGIN)[0];

        assert_eq!((at(Placement::TopLeft).x, at(Placement::TopLeft).y), (50.0, 702.0));
        assert_eq!((at(Placement::TopRight).x, at(Placement::TopRight).y), (462.0, 702.0));
        assert_eq!((at(Placement::BottomLeft).x, at(Placement::BottomLeft).y), (50.0, 50.0));
        assert_eq!((at(Placement::BottomRight).x, at(Placement::BottomRight).y), (462.0, 50.0));
    }

    #[test]
    fn test_corners_on_tiny_page_keep_near_margin() {
        let page = PageSize::new(120.0, 80.0);
        let element = ElementSize::new(100.0, 40.0);
        for placement in [Placement::TopLeft, Placement::TopRight, Placement::BottomLeft, Placement::BottomRight] {
            let i = place(page, element, placement, 0.0, CORNER_MARGIN)[0];
            assert!(i.x >= CORNER_MARGIN, "{placement}: x={}", i.x);
            assert!(i.y >= CORNER_MARGIN, "{placement}: y={}", i.y);
        }
    }

    #[test]
    fn test_rotation_keeps_center_fixed() {
        let element = ElementSize::new(200.0, 40.0);
        let i = place(PageSize::LETTER, element, Placement::Center, 45.0, CORNER_MARGIN)[0];
        let mut center = Point::from_xy(100.0, 20.0);
        i.transform(element).map_points(std::slice::from_mut(&mut center));
        assert!((center.x - 306.0).abs() < 1e-3);
        assert!((center.y - 396.0).abs() < 1e-3);
    }

    #[test]
    fn test_tile_produces_grid() {
        let result = place(PageSize::LETTER, ElementSize::new(200.0, 40.0), Placement::Tile, 30.0, CORNER_MARGIN);
        assert!(result.len() > 4);
        assert!(result.iter().all(|i| i.rotation == 30.0));
    }

    #[test]
    fn test_tile_with_unbounded_sizes_terminates() {
        let huge = ElementSize::new(f32::INFINITY, 40.0);
        assert!(place(PageSize::LETTER, huge, Placement::Tile, 0.0, CORNER_MARGIN).is_empty());

        let nan = ElementSize::new(f32::NAN, f32::NAN);
        assert!(place(PageSize::LETTER, nan, Placement::Tile, 0.0, CORNER_MARGIN).len() <= MAX_TILES);

        let vast_page = PageSize::new(1.0e7, 1.0e7);
        let tiny = ElementSize::new(1.0, 1.0);
        assert_eq!(place(vast_page, tiny, Placement::Tile, 0.0, CORNER_MARGIN).len(), MAX_TILES);
    }

    #[test]
    fn test_placement_parsing() {
        assert_eq!("top-right".parse::<Placement>().unwrap(), Placement::TopRight);
        assert_eq!("Tile".parse::<Placement>().unwrap(), Placement::Tile);
        assert!("middle".parse::<Placement>().is_err());
        assert_eq!(Placement::BottomLeft.to_string(), "bottom-left");
    }

    fn covered(cells: &[(f32, f32)], pitch: f32, x: f32, y: f32) -> bool {
        cells
            .iter()
            .any(|&(cx, cy)| {
                x >= cx - 1e-3 && x <= cx + pitch + 1e-3 && y >= cy - 1e-3 && y <= cy + pitch + 1e-3
            })
    }

    proptest! {
        #[test]
        fn prop_tile_cells_cover_page(
            page_w in 50f32..1500.0,
            page_h in 50f32..1500.0,
            el_w in 1f32..400.0,
            el_h in 1f32..200.0,
        ) {
            let element = ElementSize::new(el_w, el_h);
            let pitch = tile_pitch(element);
            let cells: Vec<(f32, f32)> = place(PageSize::new(page_w, page_h), element, Placement::Tile, 0.0, CORNER_MARGIN)
                .iter()
                .map(|i| (i.x - (pitch - el_w) / 2.0, i.y - (pitch - el_h) / 2.0))
                .collect();

            for step_x in 0..=10 {
                for step_y in 0..=10 {
                    let x = page_w * step_x as f32 / 10.0;
                    let y = page_h * step_y as f32 / 10.0;
                    prop_assert!(covered(&cells, pitch, x, y), "gap at ({x}, {y})");
                }
            }
        }

        #[test]
        fn prop_single_placements_yield_one_instruction(
            page_w in 10f32..2000.0,
            page_h in 10f32..2000.0,
            el in 1f32..300.0,
        ) {
            for placement in [Placement::Center, Placement::TopLeft, Placement::TopRight, Placement::BottomLeft, Placement::BottomRight] {
                let result = place(PageSize::new(page_w, page_h), ElementSize::new(el, el), placement, 0.0, CORNER_MARGIN);
                prop_assert_eq!(result.len(), 1);
            }
        }
    }
}
