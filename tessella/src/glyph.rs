// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph sources and glyph runs.
//!
//! A [`GlyphFace`] is anything that can resolve a [`GlyphId`] to geometry or
//! imagery: a sized font, an emoji set, an animated glyph provider. The
//! rasterizer and the atlas only ever talk to this trait, so custom glyph
//! sources plug into the same batching path as regular fonts.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use peniko::kurbo::{Affine, BezPath, Point, Rect};

use crate::font::Font;
use crate::pixmap::Pixmap;

/// Identifies a glyph within one typeface.
///
/// Ids are only meaningful relative to the face that produced them. The zero
/// id is reserved for the missing glyph and short-circuits every glyph
/// operation; backends are never asked about it, because a font's own notdef
/// glyph may have a real visual footprint that must not be drawn implicitly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlyphId(u16);

impl GlyphId {
    /// The reserved missing/notdef glyph id.
    pub const MISSING: Self = Self(0);

    /// Create a glyph id from its raw value.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw id value.
    pub const fn to_u16(self) -> u16 {
        self.0
    }

    /// The raw id value, widened for backends that index with `u32`.
    pub const fn to_u32(self) -> u32 {
        self.0 as u32
    }

    /// Whether this is the reserved missing glyph.
    pub const fn is_missing(self) -> bool {
        self.0 == 0
    }
}

impl From<u16> for GlyphId {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

/// A glyph rendered to an image, plus the transform that places the image
/// relative to the glyph origin.
#[derive(Clone, Debug)]
pub struct GlyphImage {
    /// The glyph's pixels, premultiplied.
    pub pixmap: Arc<Pixmap>,
    /// Maps image pixel coordinates into the glyph's coordinate space.
    pub transform: Affine,
}

/// A source of glyphs.
///
/// Implementations report their capabilities through [`has_color`] and
/// [`has_outlines`]; when `has_outlines` is true, [`path`] succeeds for every
/// valid glyph id, and when `has_color` is true, glyphs are pre-composed RGBA
/// imagery to be fetched with [`image`] rather than filled as paths.
///
/// All operations treat [`GlyphId::MISSING`] as "no glyph": they return
/// `None` or an empty rectangle without consulting any backend.
///
/// [`has_color`]: GlyphFace::has_color
/// [`has_outlines`]: GlyphFace::has_outlines
/// [`path`]: GlyphFace::path
/// [`image`]: GlyphFace::image
pub trait GlyphFace: Debug + Send + Sync {
    /// Whether glyphs are pre-composed color imagery.
    fn has_color(&self) -> bool;

    /// Whether glyphs have vector outlines.
    fn has_outlines(&self) -> bool;

    /// A face for the same glyph source with all geometry scaled by `scale`.
    ///
    /// Fails for a non-finite or non-positive scale. The receiver is left
    /// untouched.
    fn make_scaled(&self, scale: f32) -> Option<Arc<dyn GlyphFace>>;

    /// The glyph's outline, in the face's scaled space with y pointing down.
    ///
    /// `None` for glyphs without an outline (bitmap or color glyphs) and for
    /// the missing glyph.
    fn path(&self, glyph: GlyphId) -> Option<BezPath>;

    /// The glyph's rendered appearance as an image.
    ///
    /// Used for color glyphs and bitmap strikes. Faux-bold is not honored on
    /// this path; callers that need faux-bold must rasterize through the
    /// outline path instead.
    fn image(&self, glyph: GlyphId) -> Option<GlyphImage>;

    /// The glyph's bounding box in the face's scaled space.
    ///
    /// For outline faces this is the fill bounds before any faux-italic
    /// skew. Empty for the missing glyph.
    fn bounds(&self, glyph: GlyphId) -> Rect;

    /// The underlying font, for faces that are backed by one.
    ///
    /// Lets downstream code recover the faux flags and typeface for
    /// backend-specific fast paths.
    fn as_font(&self) -> Option<&Font> {
        None
    }
}

/// A [`GlyphFace`] backed by a [`Font`] value.
#[derive(Clone, Debug, PartialEq)]
pub struct FontGlyphFace {
    font: Font,
}

impl FontGlyphFace {
    /// Wrap a font as a glyph face.
    pub fn new(font: Font) -> Self {
        Self { font }
    }

    /// The wrapped font.
    pub fn font(&self) -> &Font {
        &self.font
    }
}

impl GlyphFace for FontGlyphFace {
    fn has_color(&self) -> bool {
        self.font.typeface().has_color()
    }

    fn has_outlines(&self) -> bool {
        self.font.typeface().has_outlines()
    }

    fn make_scaled(&self, scale: f32) -> Option<Arc<dyn GlyphFace>> {
        if !(scale.is_finite() && scale > 0.0) {
            return None;
        }
        Some(Arc::new(Self {
            font: self.font.with_size(self.font.size() * scale),
        }))
    }

    fn path(&self, glyph: GlyphId) -> Option<BezPath> {
        if !self.has_outlines() {
            return None;
        }
        self.font.path(glyph)
    }

    fn image(&self, glyph: GlyphId) -> Option<GlyphImage> {
        self.font.image(glyph)
    }

    fn bounds(&self, glyph: GlyphId) -> Rect {
        self.font.bounds(glyph)
    }

    fn as_font(&self) -> Option<&Font> {
        Some(&self.font)
    }
}

/// A table-driven color glyph source.
///
/// Maps glyph ids to pre-rendered images, the shape of emoji or other
/// composed-imagery glyph sets. The face owns no typeface; ids are whatever
/// the caller registered.
#[derive(Clone, Debug, Default)]
pub struct ImageGlyphFace {
    glyphs: HashMap<GlyphId, GlyphImage>,
}

impl ImageGlyphFace {
    /// Create an empty face.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the image for a glyph id.
    ///
    /// Inserting for [`GlyphId::MISSING`] is ignored.
    pub fn insert(&mut self, glyph: GlyphId, image: GlyphImage) {
        if glyph.is_missing() {
            return;
        }
        self.glyphs.insert(glyph, image);
    }

    /// The number of registered glyphs.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether the face has no glyphs.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl GlyphFace for ImageGlyphFace {
    fn has_color(&self) -> bool {
        true
    }

    fn has_outlines(&self) -> bool {
        false
    }

    fn make_scaled(&self, scale: f32) -> Option<Arc<dyn GlyphFace>> {
        if !(scale.is_finite() && scale > 0.0) {
            return None;
        }
        let scaling = Affine::scale(f64::from(scale));
        let glyphs = self
            .glyphs
            .iter()
            .map(|(&id, image)| {
                (
                    id,
                    GlyphImage {
                        pixmap: image.pixmap.clone(),
                        transform: scaling * image.transform,
                    },
                )
            })
            .collect();
        Some(Arc::new(Self { glyphs }))
    }

    fn path(&self, _glyph: GlyphId) -> Option<BezPath> {
        None
    }

    fn image(&self, glyph: GlyphId) -> Option<GlyphImage> {
        if glyph.is_missing() {
            return None;
        }
        self.glyphs.get(&glyph).cloned()
    }

    fn bounds(&self, glyph: GlyphId) -> Rect {
        if glyph.is_missing() {
            return Rect::ZERO;
        }
        match self.glyphs.get(&glyph) {
            Some(image) => {
                let extent = Rect::new(
                    0.0,
                    0.0,
                    f64::from(image.pixmap.width()),
                    f64::from(image.pixmap.height()),
                );
                image.transform.transform_rect_bbox(extent)
            }
            None => Rect::ZERO,
        }
    }
}

/// A sequence of glyphs from one face, with a position per glyph.
#[derive(Clone, Debug)]
pub struct GlyphRun {
    face: Arc<dyn GlyphFace>,
    glyphs: Vec<GlyphId>,
    positions: Vec<Point>,
}

impl GlyphRun {
    /// Create a run from parallel glyph and position lists.
    ///
    /// # Panics
    ///
    /// Panics if the lists have different lengths.
    pub fn new(face: Arc<dyn GlyphFace>, glyphs: Vec<GlyphId>, positions: Vec<Point>) -> Self {
        assert_eq!(
            glyphs.len(),
            positions.len(),
            "Expected one position per glyph"
        );
        Self {
            face,
            glyphs,
            positions,
        }
    }

    /// The face shared by all glyphs of the run.
    pub fn face(&self) -> &Arc<dyn GlyphFace> {
        &self.face
    }

    /// The glyph ids.
    pub fn glyphs(&self) -> &[GlyphId] {
        &self.glyphs
    }

    /// The glyph positions.
    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    /// The number of glyphs in the run.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether the run has no glyphs.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Iterate over `(glyph, position)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (GlyphId, Point)> + '_ {
        self.glyphs
            .iter()
            .copied()
            .zip(self.positions.iter().copied())
    }
}

/// An ordered list of glyph runs, the unit the atlas batches over.
#[derive(Clone, Debug, Default)]
pub struct GlyphRunList {
    runs: Vec<GlyphRun>,
}

impl GlyphRunList {
    /// Create a run list.
    pub fn new(runs: Vec<GlyphRun>) -> Self {
        Self { runs }
    }

    /// The runs, in order.
    pub fn runs(&self) -> &[GlyphRun] {
        &self.runs
    }

    /// Whether the list contains no glyphs at all.
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(GlyphRun::is_empty)
    }

    /// The total number of glyphs across all runs.
    pub fn glyph_count(&self) -> usize {
        self.runs.iter().map(GlyphRun::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_id_is_zero() {
        assert!(GlyphId::MISSING.is_missing());
        assert!(GlyphId::new(0).is_missing());
        assert!(!GlyphId::new(1).is_missing());
        assert_eq!(GlyphId::new(0x41).to_u32(), 0x41);
    }

    fn test_image(width: u16, height: u16) -> GlyphImage {
        GlyphImage {
            pixmap: Arc::new(Pixmap::new(width, height)),
            transform: Affine::IDENTITY,
        }
    }

    #[test]
    fn image_face_ignores_missing_id() {
        let mut face = ImageGlyphFace::new();
        face.insert(GlyphId::MISSING, test_image(4, 4));
        assert!(face.is_empty());
        assert!(face.image(GlyphId::MISSING).is_none());
        assert_eq!(face.bounds(GlyphId::MISSING), Rect::ZERO);
    }

    #[test]
    fn image_face_bounds_follow_transform() {
        let mut face = ImageGlyphFace::new();
        let mut image = test_image(4, 8);
        image.transform = Affine::translate((1.0, -8.0));
        face.insert(GlyphId::new(3), image);

        assert_eq!(face.bounds(GlyphId::new(3)), Rect::new(1.0, -8.0, 5.0, 0.0));
        assert_eq!(face.bounds(GlyphId::new(4)), Rect::ZERO);

        let doubled = face.make_scaled(2.0).unwrap();
        assert_eq!(
            doubled.bounds(GlyphId::new(3)),
            Rect::new(2.0, -16.0, 10.0, 0.0)
        );
        assert!(doubled.has_color());
        assert!(face.make_scaled(0.0).is_none());
    }

    #[test]
    #[should_panic(expected = "one position per glyph")]
    fn run_checks_lengths() {
        let face: Arc<dyn GlyphFace> = Arc::new(ImageGlyphFace::new());
        let _ = GlyphRun::new(face, vec![GlyphId::new(1)], vec![]);
    }

    #[test]
    fn run_list_emptiness_ignores_empty_runs() {
        let face: Arc<dyn GlyphFace> = Arc::new(ImageGlyphFace::new());
        let empty = GlyphRun::new(face.clone(), vec![], vec![]);
        let list = GlyphRunList::new(vec![empty.clone()]);
        assert!(list.is_empty());

        let run = GlyphRun::new(face, vec![GlyphId::new(2)], vec![Point::ZERO]);
        let list = GlyphRunList::new(vec![empty, run]);
        assert!(!list.is_empty());
        assert_eq!(list.glyph_count(), 1);
    }
}
