// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph and path rasterization.

use peniko::kurbo::{Affine, BezPath, Point, Rect, Stroke};

use crate::atlas::{AtlasFormat, AtlasImage};
use crate::coverage::Canvas;
use crate::gamma::GammaLut;
use crate::glyph::{GlyphFace, GlyphId, GlyphRunList};
use crate::pixmap::{Mask, Pixmap, PremulRgba8};
use crate::stroke::{stroke_glyph_path, stroke_outset};

/// Renders glyphs and paths into caller-owned pixel buffers.
///
/// The rasterizer carries a resolution scale applied to every single-glyph
/// draw and an sRGB gamma table remapping antialiased coverage (see
/// [`gamma`](crate::gamma)). Glyph drawing is a two-stage strategy: a face
/// that renders directly to an image is composited as-is, and everything
/// else falls back to outline extraction and scan conversion.
#[derive(Clone, Debug)]
pub struct GlyphRasterizer {
    resolution_scale: f32,
    gamma: Option<GammaLut>,
}

impl GlyphRasterizer {
    /// Create a rasterizer with the given resolution scale.
    ///
    /// A non-finite or non-positive scale is treated as 1. Gamma correction
    /// is enabled; use [`without_gamma`](Self::without_gamma) to disable it.
    pub fn new(resolution_scale: f32) -> Self {
        let resolution_scale = if resolution_scale.is_finite() && resolution_scale > 0.0 {
            resolution_scale
        } else {
            1.0
        };
        Self {
            resolution_scale,
            gamma: Some(GammaLut::new()),
        }
    }

    /// Disable gamma correction of antialiased coverage.
    pub fn without_gamma(mut self) -> Self {
        self.gamma = None;
        self
    }

    /// The resolution scale applied to single-glyph draws.
    pub fn resolution_scale(&self) -> f32 {
        self.resolution_scale
    }

    /// The device-space bounds a [`fill_glyph`](Self::fill_glyph) call will
    /// cover: the glyph bounds expanded for the stroke in font space, scaled
    /// by the resolution scale, and rounded out to the pixel grid.
    ///
    /// Use this to size the destination mask.
    pub fn glyph_bounds(
        &self,
        face: &dyn GlyphFace,
        glyph: GlyphId,
        stroke: Option<&Stroke>,
    ) -> Rect {
        scaled_glyph_bounds(face, glyph, f64::from(self.resolution_scale), stroke)
    }

    /// Rasterize one glyph into `dst`, which must cover
    /// [`glyph_bounds`](Self::glyph_bounds).
    ///
    /// Returns false if there is nothing to draw: the missing glyph, an
    /// empty destination, or a glyph with neither imagery nor an outline.
    pub fn fill_glyph(
        &self,
        face: &dyn GlyphFace,
        glyph: GlyphId,
        stroke: Option<&Stroke>,
        dst: &mut Mask,
    ) -> bool {
        if glyph.is_missing() || dst.is_empty() {
            return false;
        }
        let bounds = self.glyph_bounds(face, glyph, stroke);
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return false;
        }
        // Stage one: a direct image from the face. Stroking needs the
        // outline, so a stroked draw goes straight to stage two.
        if stroke.is_none() && self.try_direct(face, glyph, bounds, dst).is_some() {
            return true;
        }
        self.fill_glyph_outline(face, glyph, stroke, bounds, dst)
    }

    /// Rasterize an arbitrary path, given in pixel coordinates, into `dst`.
    pub fn fill_path(&self, path: &BezPath, dst: &mut Mask) -> bool {
        if dst.is_empty() || path.elements().is_empty() {
            return false;
        }
        self.fill_path_into(path, true, dst);
        true
    }

    /// Rasterize a whole run list into a single image.
    ///
    /// Positions are mapped through `matrix`; a stroke is applied to each
    /// outline in font space, using the matrix's uniform scale as the
    /// font-to-device factor. This is the entry point the atlas uses to
    /// render one page in one pass.
    pub fn rasterize(
        &self,
        width: u16,
        height: u16,
        run_list: &GlyphRunList,
        antialias: bool,
        matrix: Affine,
        stroke: Option<&Stroke>,
        format: AtlasFormat,
    ) -> Option<AtlasImage> {
        if width == 0 || height == 0 {
            return None;
        }
        let stroke_scale = uniform_scale(matrix).unwrap_or(1.0);
        match format {
            AtlasFormat::Alpha8 => {
                let mut canvas = Canvas::new(width, height);
                let mut images = Vec::new();
                for run in run_list.runs() {
                    for (glyph, position) in run.iter() {
                        if glyph.is_missing() {
                            continue;
                        }
                        let transform = matrix * Affine::translate(position.to_vec2());
                        if let Some(mut path) = run.face().path(glyph) {
                            if path.elements().is_empty() {
                                continue;
                            }
                            path.apply_affine(transform);
                            if let Some(stroke) = stroke {
                                path = stroke_glyph_path(&path, stroke, stroke_scale);
                            }
                            canvas.fill_path(&path);
                        } else if let Some(image) = run.face().image(glyph) {
                            let transform = transform * image.transform;
                            images.push((image, transform));
                        }
                    }
                }
                let mut mask = Mask::from_parts(canvas.accumulate(antialias), width, height);
                if antialias {
                    if let Some(gamma) = &self.gamma {
                        gamma.apply(mask.data_mut());
                    }
                }
                for (image, transform) in images {
                    blit_image_alpha(&image.pixmap, transform, &mut mask);
                }
                Some(AtlasImage::Alpha(mask))
            }
            AtlasFormat::Rgba8 => {
                let mut pixmap = Pixmap::new(width, height);
                let mut canvas = Canvas::new(width, height);
                let mut any_outline = false;
                for run in run_list.runs() {
                    for (glyph, position) in run.iter() {
                        if glyph.is_missing() {
                            continue;
                        }
                        let transform = matrix * Affine::translate(position.to_vec2());
                        if let Some(image) = run.face().image(glyph) {
                            blit_image_rgba(&image.pixmap, transform * image.transform, &mut pixmap);
                        } else if let Some(mut path) = run.face().path(glyph) {
                            if path.elements().is_empty() {
                                continue;
                            }
                            path.apply_affine(transform);
                            if let Some(stroke) = stroke {
                                path = stroke_glyph_path(&path, stroke, stroke_scale);
                            }
                            canvas.fill_path(&path);
                            any_outline = true;
                        }
                    }
                }
                if any_outline {
                    let mut coverage = canvas.accumulate(antialias);
                    if antialias {
                        if let Some(gamma) = &self.gamma {
                            gamma.apply(&mut coverage);
                        }
                    }
                    for (pixel, &alpha) in pixmap.data_mut().iter_mut().zip(coverage.iter()) {
                        if alpha > 0 && pixel.a == 0 {
                            // Outline glyphs composite as white coverage.
                            *pixel = PremulRgba8 {
                                r: alpha,
                                g: alpha,
                                b: alpha,
                                a: alpha,
                            };
                        }
                    }
                }
                Some(AtlasImage::Color(pixmap))
            }
        }
    }

    fn try_direct(
        &self,
        face: &dyn GlyphFace,
        glyph: GlyphId,
        bounds: Rect,
        dst: &mut Mask,
    ) -> Option<()> {
        let image = face.image(glyph)?;
        let transform = Affine::translate((-bounds.x0, -bounds.y0))
            * Affine::scale(f64::from(self.resolution_scale))
            * image.transform;
        blit_image_alpha(&image.pixmap, transform, dst).then_some(())
    }

    fn fill_glyph_outline(
        &self,
        face: &dyn GlyphFace,
        glyph: GlyphId,
        stroke: Option<&Stroke>,
        bounds: Rect,
        dst: &mut Mask,
    ) -> bool {
        let Some(mut path) = face.path(glyph) else {
            return false;
        };
        if path.elements().is_empty() {
            return false;
        }
        let scale = f64::from(self.resolution_scale);
        path.apply_affine(Affine::scale(scale));
        if let Some(stroke) = stroke {
            path = stroke_glyph_path(&path, stroke, scale);
        }
        path.apply_affine(Affine::translate((-bounds.x0, -bounds.y0)));
        self.fill_path_into(&path, true, dst);
        true
    }

    fn fill_path_into(&self, path: &BezPath, antialias: bool, dst: &mut Mask) {
        let mut canvas = Canvas::new(dst.width(), dst.height());
        canvas.fill_path(path);
        let coverage = canvas.accumulate(antialias);
        dst.data_mut().copy_from_slice(&coverage);
        if antialias {
            if let Some(gamma) = &self.gamma {
                gamma.apply(dst.data_mut());
            }
        }
    }
}

impl Default for GlyphRasterizer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// The device-space footprint of a glyph draw: bounds expanded for the
/// stroke in font space, scaled, and rounded out to the pixel grid.
pub(crate) fn scaled_glyph_bounds(
    face: &dyn GlyphFace,
    glyph: GlyphId,
    scale: f64,
    stroke: Option<&Stroke>,
) -> Rect {
    if glyph.is_missing() {
        return Rect::ZERO;
    }
    let mut bounds = face.bounds(glyph);
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return Rect::ZERO;
    }
    if let Some(stroke) = stroke {
        let outset = stroke_outset(stroke);
        bounds = bounds.inflate(outset, outset);
    }
    bounds.scale_from_origin(scale).expand()
}

fn uniform_scale(transform: Affine) -> Option<f64> {
    let [a, b, c, d, _, _] = transform.as_coeffs();
    (a == d && b == 0.0 && c == 0.0 && a > 0.0).then_some(a)
}

/// Composite the alpha channel of `src` into a coverage mask.
///
/// `transform` maps source pixel coordinates to destination pixels; samples
/// are nearest-neighbor and combine with existing coverage by maximum.
fn blit_image_alpha(src: &Pixmap, transform: Affine, dst: &mut Mask) -> bool {
    let Some((x_range, y_range, inverse)) =
        blit_extent(src, transform, dst.width(), dst.height())
    else {
        return false;
    };
    let dst_width = usize::from(dst.width());
    let data = dst.data_mut();
    for y in y_range {
        for x in x_range.clone() {
            let Some((sx, sy)) = source_pixel(src, inverse, x, y) else {
                continue;
            };
            let alpha = src.sample(sx, sy).a;
            let slot = &mut data[y * dst_width + x];
            *slot = (*slot).max(alpha);
        }
    }
    true
}

/// Composite `src` into a color pixmap. Non-transparent samples overwrite.
fn blit_image_rgba(src: &Pixmap, transform: Affine, dst: &mut Pixmap) -> bool {
    let Some((x_range, y_range, inverse)) =
        blit_extent(src, transform, dst.width(), dst.height())
    else {
        return false;
    };
    let dst_width = usize::from(dst.width());
    let data = dst.data_mut();
    for y in y_range {
        for x in x_range.clone() {
            let Some((sx, sy)) = source_pixel(src, inverse, x, y) else {
                continue;
            };
            let pixel = src.sample(sx, sy);
            if pixel.a > 0 {
                data[y * dst_width + x] = pixel;
            }
        }
    }
    true
}

type BlitExtent = (std::ops::Range<usize>, std::ops::Range<usize>, Affine);

fn blit_extent(
    src: &Pixmap,
    transform: Affine,
    dst_width: u16,
    dst_height: u16,
) -> Option<BlitExtent> {
    if src.is_empty() || dst_width == 0 || dst_height == 0 {
        return None;
    }
    if transform.determinant().abs() < 1e-12 {
        return None;
    }
    let extent = Rect::new(
        0.0,
        0.0,
        f64::from(src.width()),
        f64::from(src.height()),
    );
    let target = transform.transform_rect_bbox(extent).expand();
    let x0 = target.x0.max(0.0) as usize;
    let y0 = target.y0.max(0.0) as usize;
    let x1 = (target.x1.max(0.0) as usize).min(usize::from(dst_width));
    let y1 = (target.y1.max(0.0) as usize).min(usize::from(dst_height));
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0..x1, y0..y1, transform.inverse()))
}

fn source_pixel(src: &Pixmap, inverse: Affine, x: usize, y: usize) -> Option<(u16, u16)> {
    let point = inverse * Point::new(x as f64 + 0.5, y as f64 + 0.5);
    let sx = point.x.floor();
    let sy = point.y.floor();
    if sx < 0.0 || sy < 0.0 || sx >= f64::from(src.width()) || sy >= f64::from(src.height()) {
        return None;
    }
    Some((sx as u16, sy as u16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::GlyphImage;
    use peniko::kurbo::Shape;
    use std::sync::Arc;

    /// An outline face whose only glyph is a square filling most of the em.
    #[derive(Debug)]
    struct SquareFace {
        size: f64,
    }

    impl SquareFace {
        fn square(&self) -> Rect {
            Rect::new(
                0.1 * self.size,
                -0.9 * self.size,
                0.9 * self.size,
                -0.1 * self.size,
            )
        }
    }

    impl GlyphFace for SquareFace {
        fn has_color(&self) -> bool {
            false
        }

        fn has_outlines(&self) -> bool {
            true
        }

        fn make_scaled(&self, scale: f32) -> Option<Arc<dyn GlyphFace>> {
            if !(scale.is_finite() && scale > 0.0) {
                return None;
            }
            Some(Arc::new(Self {
                size: self.size * f64::from(scale),
            }))
        }

        fn path(&self, glyph: GlyphId) -> Option<BezPath> {
            (glyph == GlyphId::new(1)).then(|| self.square().to_path(0.1))
        }

        fn image(&self, _glyph: GlyphId) -> Option<GlyphImage> {
            None
        }

        fn bounds(&self, glyph: GlyphId) -> Rect {
            if glyph == GlyphId::new(1) {
                self.square()
            } else {
                Rect::ZERO
            }
        }
    }

    #[test]
    fn missing_glyph_is_rejected() {
        let rasterizer = GlyphRasterizer::new(1.0);
        let face = SquareFace { size: 10.0 };
        assert_eq!(rasterizer.glyph_bounds(&face, GlyphId::MISSING, None), Rect::ZERO);
        let mut mask = Mask::new(8, 8);
        assert!(!rasterizer.fill_glyph(&face, GlyphId::MISSING, None, &mut mask));
        assert!(mask.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn unknown_glyph_is_rejected() {
        let rasterizer = GlyphRasterizer::new(1.0);
        let face = SquareFace { size: 10.0 };
        let mut mask = Mask::new(8, 8);
        assert!(!rasterizer.fill_glyph(&face, GlyphId::new(7), None, &mut mask));
    }

    #[test]
    fn filled_square_covers_its_bounds() {
        let rasterizer = GlyphRasterizer::new(1.0);
        let face = SquareFace { size: 10.0 };
        let glyph = GlyphId::new(1);
        let bounds = rasterizer.glyph_bounds(&face, glyph, None);
        assert_eq!(bounds, Rect::new(1.0, -9.0, 9.0, -1.0));
        let mut mask = Mask::new(bounds.width() as u16, bounds.height() as u16);
        assert!(rasterizer.fill_glyph(&face, glyph, None, &mut mask));
        assert_eq!(mask.sample(4, 4), 255);
        assert!(mask.data().iter().all(|&v| v >= 250));
    }

    #[test]
    fn empty_path_rejected_by_fill_path() {
        let rasterizer = GlyphRasterizer::new(1.0);
        let mut mask = Mask::new(4, 4);
        assert!(!rasterizer.fill_path(&BezPath::new(), &mut mask));
        let mut empty = Mask::new(0, 0);
        let square = Rect::new(0.0, 0.0, 2.0, 2.0).to_path(0.1);
        assert!(!rasterizer.fill_path(&square, &mut empty));
    }

    /// The stroked band must widen linearly with the resolution scale.
    #[test]
    fn stroke_width_scales_linearly() {
        let face = SquareFace { size: 10.0 };
        let glyph = GlyphId::new(1);
        let stroke = Stroke::new(2.0);

        let band = |scale: f32| -> usize {
            let rasterizer = GlyphRasterizer::new(scale);
            let bounds = rasterizer.glyph_bounds(&face, glyph, Some(&stroke));
            let mut mask = Mask::new(bounds.width() as u16, bounds.height() as u16);
            assert!(rasterizer.fill_glyph(&face, glyph, Some(&stroke), &mut mask));
            // Count covered pixels across the vertical middle of the glyph,
            // left band only (up to the horizontal center).
            let y = mask.height() / 2;
            (0..mask.width() / 2)
                .filter(|&x| mask.sample(x, y) >= 128)
                .count()
        };

        let narrow = band(1.0);
        let wide = band(3.0);
        assert!(narrow >= 1);
        let ratio = wide as f64 / narrow as f64;
        assert!((2.0..=4.0).contains(&ratio), "ratio {ratio} ({narrow} -> {wide})");
    }

    #[test]
    fn resolution_scale_grows_the_mask() {
        let face = SquareFace { size: 10.0 };
        let glyph = GlyphId::new(1);
        let rasterizer = GlyphRasterizer::new(2.0);
        let bounds = rasterizer.glyph_bounds(&face, glyph, None);
        assert_eq!(bounds, Rect::new(2.0, -18.0, 18.0, -2.0));
    }
}
