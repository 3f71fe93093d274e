// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-size glyph extraction backends.
//!
//! A [`ScalerContext`] is bound to one (typeface, size) pair and does the
//! actual work of turning glyph ids into metrics, outlines, or pixels.
//! Instances are created and cached by [`Typeface::scaler`]; they are not
//! copyable and are safe for concurrent use.
//!
//! The built-in backend, [`OutlineScaler`], reads OpenType outlines through
//! skrifa. skrifa parses immutable memory on demand, so unlike native
//! font-engine handles it needs no per-typeface lock around glyph access.

use std::fmt::Debug;

use peniko::kurbo::{Affine, BezPath, Rect, Shape, Stroke, Vec2};
use peniko::Blob;
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::{FontRef, MetadataProvider};

use crate::font::{FontMetrics, Typeface};
use crate::glyph::{GlyphId, GlyphImage};
use crate::stroke::stroke_glyph_path;

/// Horizontal shear used to simulate italics.
const FAUX_ITALIC_SKEW: f64 = -0.25;

/// Produces glyph data for one (typeface, size) pair.
///
/// Every operation treats [`GlyphId::MISSING`] as "no glyph" and reports
/// empty results without consulting the font.
pub trait ScalerContext: Debug + Send + Sync {
    /// Font-wide metrics at this scaler's size.
    ///
    /// All-zero metrics signal a font that could not be activated.
    fn metrics(&self) -> FontMetrics;

    /// The advance of a glyph in pixels, horizontal or vertical.
    fn advance(&self, glyph: GlyphId, vertical: bool) -> f32;

    /// The glyph's bounding box, post-scale and pre-faux-italic-skew.
    fn bounds(&self, glyph: GlyphId, faux_bold: bool, faux_italic: bool) -> Rect;

    /// The offset from a glyph's horizontal origin to its vertical origin.
    fn vertical_offset(&self, glyph: GlyphId) -> Vec2;

    /// The glyph's outline with faux styling applied, y-down, in pixels.
    fn path(&self, glyph: GlyphId, faux_bold: bool, faux_italic: bool) -> Option<BezPath>;

    /// A direct pixel rendering of the glyph, for bitmap and color strikes.
    fn image(&self, glyph: GlyphId) -> Option<GlyphImage>;
}

/// The skrifa-backed outline scaler.
#[derive(Clone, Debug)]
pub struct OutlineScaler {
    data: Blob<u8>,
    index: u32,
    size: f32,
    valid: bool,
}

impl OutlineScaler {
    pub(crate) fn new(typeface: &Typeface, size: f32) -> Self {
        let valid = size.is_finite() && size > 0.0;
        if !valid {
            log::warn!("cannot activate font size {size}, glyphs will be empty");
        }
        Self {
            data: typeface.data().clone(),
            index: typeface.index(),
            size,
            valid,
        }
    }

    /// The size in pixels per em.
    pub fn size(&self) -> f32 {
        self.size
    }

    fn font_ref(&self) -> Option<FontRef<'_>> {
        if !self.valid {
            return None;
        }
        FontRef::from_index(self.data.as_ref(), self.index).ok()
    }

    /// The stroke width used to embolden outlines at this size.
    fn embolden_width(&self) -> f64 {
        f64::from(self.size) / 24.0
    }

    fn outline_path(&self, glyph: GlyphId) -> Option<BezPath> {
        let font = self.font_ref()?;
        let outlines = font.outline_glyphs();
        let outline = outlines.get(skrifa::GlyphId::new(glyph.to_u32()))?;
        let mut pen = OutlinePath(BezPath::new());
        let settings = DrawSettings::unhinted(Size::new(self.size), LocationRef::default());
        outline.draw(settings, &mut pen).ok()?;
        Some(pen.0)
    }
}

impl ScalerContext for OutlineScaler {
    fn metrics(&self) -> FontMetrics {
        let Some(font) = self.font_ref() else {
            return FontMetrics::default();
        };
        let metrics = font.metrics(Size::new(self.size), LocationRef::default());
        // skrifa reports y-up metrics; flip to the crate's y-down convention.
        FontMetrics {
            ascent: -metrics.ascent,
            descent: -metrics.descent,
            leading: metrics.leading,
            x_height: metrics.x_height.unwrap_or(0.0),
            cap_height: metrics.cap_height.unwrap_or(0.0),
        }
    }

    fn advance(&self, glyph: GlyphId, vertical: bool) -> f32 {
        if glyph.is_missing() {
            return 0.0;
        }
        let Some(font) = self.font_ref() else {
            return 0.0;
        };
        if vertical {
            // No vertical tables are wired; fall back to the em height.
            return self.size;
        }
        font.glyph_metrics(Size::new(self.size), LocationRef::default())
            .advance_width(skrifa::GlyphId::new(glyph.to_u32()))
            .unwrap_or(0.0)
    }

    fn bounds(&self, glyph: GlyphId, faux_bold: bool, _faux_italic: bool) -> Rect {
        if glyph.is_missing() {
            return Rect::ZERO;
        }
        let Some(path) = self.outline_path(glyph) else {
            return Rect::ZERO;
        };
        if path.elements().is_empty() {
            return Rect::ZERO;
        }
        let mut bounds = path.bounding_box();
        if faux_bold {
            let outset = 0.5 * self.embolden_width();
            bounds = bounds.inflate(outset, outset);
        }
        bounds
    }

    fn vertical_offset(&self, glyph: GlyphId) -> Vec2 {
        if glyph.is_missing() {
            return Vec2::ZERO;
        }
        // Approximate the vertical origin from horizontal metrics: center
        // the glyph on its advance and raise it to the ascender line.
        let advance = self.advance(glyph, false);
        let ascent = self.metrics().ascent;
        Vec2::new(f64::from(advance) * -0.5, f64::from(ascent))
    }

    fn path(&self, glyph: GlyphId, faux_bold: bool, faux_italic: bool) -> Option<BezPath> {
        if glyph.is_missing() {
            return None;
        }
        let mut path = self.outline_path(glyph)?;
        if faux_bold && !path.elements().is_empty() {
            let stroked = stroke_glyph_path(&path, &Stroke::new(self.embolden_width()), 1.0);
            // Under a non-zero fill, outline plus stroked outline reads as
            // the emboldened glyph.
            for element in stroked.elements() {
                path.push(*element);
            }
        }
        if faux_italic {
            path.apply_affine(Affine::skew(FAUX_ITALIC_SKEW, 0.0));
        }
        Some(path)
    }

    fn image(&self, _glyph: GlyphId) -> Option<GlyphImage> {
        // Outline backend; bitmap and color strikes come from other faces.
        None
    }
}

/// Pen adapter collecting a skrifa outline into a `BezPath`.
///
/// The y-axis is flipped to match the crate's y-down coordinate system.
struct OutlinePath(BezPath);

impl OutlinePen for OutlinePath {
    #[inline]
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to((f64::from(x), f64::from(-y)));
    }

    #[inline]
    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to((f64::from(x), f64::from(-y)));
    }

    #[inline]
    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.0.quad_to(
            (f64::from(cx), f64::from(-cy)),
            (f64::from(x), f64::from(-y)),
        );
    }

    #[inline]
    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.0.curve_to(
            (f64::from(cx0), f64::from(-cy0)),
            (f64::from(cx1), f64::from(-cy1)),
            (f64::from(x), f64::from(-y)),
        );
    }

    #[inline]
    fn close(&mut self) {
        self.0.close_path();
    }
}
