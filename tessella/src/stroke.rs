// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stroking glyph outlines in font space.
//!
//! Stroke widths are given in font units. When a glyph outline has already
//! been scaled to device space, expanding it with the stroke width directly
//! would make the stroked band scale-dependent, so the outline is unscaled,
//! stroked, and rescaled. Every stroke site in the crate goes through these
//! helpers so the transform juggling exists exactly once.

use peniko::kurbo::{self, Affine, BezPath, Join, Stroke, StrokeOpts};

/// Tolerance for stroke expansion, in font units.
const STROKE_TOLERANCE: f64 = 0.01;

/// Expand `path` with `stroke`, treating the path as a glyph outline that
/// has been scaled out of font space by `scale`.
///
/// The returned path is the stroked outline at the same scale as the input.
pub(crate) fn stroke_glyph_path(path: &BezPath, stroke: &Stroke, scale: f64) -> BezPath {
    if !(scale.is_finite() && scale > 0.0) {
        return BezPath::new();
    }
    let mut stroked = if scale == 1.0 {
        kurbo::stroke(path.iter(), stroke, &StrokeOpts::default(), STROKE_TOLERANCE)
    } else {
        let mut unscaled = path.clone();
        unscaled.apply_affine(Affine::scale(scale.recip()));
        kurbo::stroke(
            unscaled.iter(),
            stroke,
            &StrokeOpts::default(),
            STROKE_TOLERANCE,
        )
    };
    if scale != 1.0 {
        stroked.apply_affine(Affine::scale(scale));
    }
    stroked
}

/// How far `stroke` can extend beyond a filled outline, in font units.
///
/// Miter joins may spike out to the miter limit; every other join and cap
/// stays within half the stroke width.
pub(crate) fn stroke_outset(stroke: &Stroke) -> f64 {
    let factor = match stroke.join {
        Join::Miter => stroke.miter_limit.max(1.0),
        _ => 1.0,
    };
    0.5 * stroke.width * factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::kurbo::{Cap, Point, Shape};

    fn vertical_line(x: f64, len: f64) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(Point::new(x, 0.0));
        path.line_to(Point::new(x, len));
        path
    }

    #[test]
    fn stroked_band_width_tracks_scale() {
        let stroke = Stroke::new(2.0);
        // Unscaled: a width-2 stroke around a vertical line spans 2 units.
        let narrow = stroke_glyph_path(&vertical_line(5.0, 10.0), &stroke, 1.0);
        let narrow_box = narrow.bounding_box();
        assert!((narrow_box.width() - 2.0).abs() < 0.2, "{narrow_box:?}");

        // The same outline scaled 3x keeps the stroke in font units, so the
        // band comes out 3x as wide, not 1x or 9x.
        let wide = stroke_glyph_path(&vertical_line(15.0, 30.0), &stroke, 3.0);
        let wide_box = wide.bounding_box();
        assert!((wide_box.width() - 6.0).abs() < 0.6, "{wide_box:?}");
    }

    #[test]
    fn outset_accounts_for_miter_spikes() {
        let mut stroke = Stroke::new(4.0);
        stroke.join = Join::Bevel;
        stroke.start_cap = Cap::Butt;
        stroke.end_cap = Cap::Butt;
        assert_eq!(stroke_outset(&stroke), 2.0);

        stroke.join = Join::Miter;
        stroke.miter_limit = 4.0;
        assert_eq!(stroke_outset(&stroke), 8.0);
    }
}
