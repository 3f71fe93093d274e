// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scan conversion by signed-area accumulation.
//!
//! Curves are flattened to line segments, each segment splats signed
//! per-pixel winding deltas into an `f32` buffer, and a single prefix-sum
//! pass turns the deltas into coverage. Coverage is the absolute winding
//! clamped to one, so overlapping contours of the same direction fill like
//! a non-zero rule.

use peniko::kurbo::{self, BezPath, PathEl, Point};

/// Tolerance for flattening curves to lines, in pixels.
const FLATTEN_TOLERANCE: f64 = 0.1;

/// The accumulation buffer for one rasterization pass.
///
/// Multiple paths may be filled into the same canvas; as long as they do not
/// overlap, the final coverage is the union of their fills.
pub(crate) struct Canvas {
    width: usize,
    height: usize,
    a: Vec<f32>,
}

impl Canvas {
    /// Create a completely uncovered canvas.
    pub(crate) fn new(width: u16, height: u16) -> Self {
        let width = usize::from(width);
        let height = usize::from(height);
        // Slack at the end so the `x + 1` splat of a right-edge pixel stays
        // in bounds without a branch per write.
        Self {
            width,
            height,
            a: vec![0.0; width * height + 4],
        }
    }

    /// Accumulate the fill of `path` into the canvas.
    ///
    /// The path is interpreted in pixel coordinates with y pointing down.
    /// Unclosed subpaths are closed implicitly.
    pub(crate) fn fill_path(&mut self, path: &BezPath) {
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;
        kurbo::flatten(path.iter(), FLATTEN_TOLERANCE, |el| match el {
            PathEl::MoveTo(p) => {
                if last != start {
                    self.line(last, start);
                }
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                self.line(last, p);
                last = p;
            }
            PathEl::ClosePath => {
                self.line(last, start);
                last = start;
            }
            _ => {}
        });
        if last != start {
            self.line(last, start);
        }
    }

    /// Resolve the accumulated deltas into 8-bit coverage, row-major.
    ///
    /// With `antialias` disabled, coverage is thresholded at one half.
    pub(crate) fn accumulate(self, antialias: bool) -> Vec<u8> {
        let mut acc = 0.0_f32;
        self.a[..self.width * self.height]
            .iter()
            .map(|c| {
                acc += c;
                let coverage = acc.abs().min(1.0);
                if antialias {
                    (coverage * 255.0 + 0.5) as u8
                } else if coverage >= 0.5 {
                    255
                } else {
                    0
                }
            })
            .collect()
    }

    /// Add a delta at `(xi, row)`, clamping x into the row.
    #[inline]
    fn add(&mut self, row_start: usize, xi: i64, delta: f32) {
        let xi = xi.clamp(0, self.width as i64) as usize;
        if let Some(a) = self.a.get_mut(row_start + xi) {
            *a += delta;
        }
    }

    /// Splat the winding deltas of one line segment.
    fn line(&mut self, p0: Point, p1: Point) {
        let (p0x, p0y) = (p0.x as f32, p0.y as f32);
        let (p1x, p1y) = (p1.x as f32, p1.y as f32);
        if (p0y - p1y).abs() <= f32::EPSILON {
            return;
        }
        let (dir, x0y0, x1y1) = if p0y < p1y {
            (1.0, (p0x, p0y), (p1x, p1y))
        } else {
            (-1.0, (p1x, p1y), (p0x, p0y))
        };
        let (px0, py0) = x0y0;
        let (px1, py1) = x1y1;
        let dxdy = (px1 - px0) / (py1 - py0);
        let mut x = px0;
        if py0 < 0.0 {
            x -= py0 * dxdy;
        }
        let y_start = py0.max(0.0) as usize;
        let y_end = self.height.min(py1.ceil().max(0.0) as usize);
        for y in y_start..y_end {
            let row_start = y * self.width;
            let dy = ((y + 1) as f32).min(py1) - (y as f32).max(py0);
            let xnext = x + dxdy * dy;
            let d = dy * dir;
            let (x0, x1) = if x < xnext { (x, xnext) } else { (xnext, x) };
            let x0floor = x0.floor();
            let x0i = x0floor as i64;
            let x1ceil = x1.ceil();
            let x1i = x1ceil as i64;
            if x1i <= x0i + 1 {
                // The segment crosses this scanline within one pixel column.
                let xmf = 0.5 * (x + xnext) - x0floor;
                self.add(row_start, x0i, d - d * xmf);
                self.add(row_start, x0i + 1, d * xmf);
            } else {
                let s = (x1 - x0).recip();
                let x0f = x0 - x0floor;
                let a0 = 0.5 * s * (1.0 - x0f) * (1.0 - x0f);
                let x1f = x1 - x1ceil + 1.0;
                let am = 0.5 * s * x1f * x1f;
                self.add(row_start, x0i, d * a0);
                if x1i == x0i + 2 {
                    self.add(row_start, x0i + 1, d * (1.0 - a0 - am));
                } else {
                    let a1 = s * (1.5 - x0f);
                    self.add(row_start, x0i + 1, d * (a1 - a0));
                    for xi in x0i + 2..x1i - 1 {
                        self.add(row_start, xi, d * s);
                    }
                    let a2 = a1 + (x1i - x0i - 3) as f32 * s;
                    self.add(row_start, x1i - 1, d * (1.0 - a2 - am));
                }
                self.add(row_start, x1i, d * am);
            }
            x = xnext;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::kurbo::Rect;
    use peniko::kurbo::Shape;

    fn square() -> BezPath {
        Rect::new(2.0, 2.0, 8.0, 8.0).to_path(0.1)
    }

    #[test]
    fn axis_aligned_square_is_solid() {
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_path(&square());
        let coverage = canvas.accumulate(true);
        for y in 0..10_usize {
            for x in 0..10_usize {
                let v = coverage[y * 10 + x];
                if (2..8).contains(&x) && (2..8).contains(&y) {
                    assert!(v >= 254, "interior ({x}, {y}) = {v}");
                } else {
                    assert!(v <= 1, "exterior ({x}, {y}) = {v}");
                }
            }
        }
    }

    #[test]
    fn half_covered_pixels_are_gray() {
        // A rect whose left edge falls mid-pixel.
        let mut canvas = Canvas::new(8, 4);
        canvas.fill_path(&Rect::new(1.5, 1.0, 6.0, 3.0).to_path(0.1));
        let coverage = canvas.accumulate(true);
        let edge = coverage[8 + 1];
        assert!((120..=135).contains(&edge), "got {edge}");
    }

    #[test]
    fn threshold_mode_is_binary() {
        let mut canvas = Canvas::new(8, 4);
        canvas.fill_path(&Rect::new(1.25, 1.0, 6.0, 3.0).to_path(0.1));
        let coverage = canvas.accumulate(false);
        assert!(coverage.iter().all(|&v| v == 0 || v == 255));
        // The 75%-covered edge pixel survives the threshold.
        assert_eq!(coverage[8 + 1], 255);
    }

    #[test]
    fn unclosed_subpath_is_closed_implicitly() {
        let mut path = BezPath::new();
        path.move_to((2.0, 2.0));
        path.line_to((8.0, 2.0));
        path.line_to((8.0, 8.0));
        path.line_to((2.0, 8.0));
        // No close_path.
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_path(&path);
        let coverage = canvas.accumulate(true);
        assert!(coverage[5 * 10 + 5] >= 254);
    }
}
