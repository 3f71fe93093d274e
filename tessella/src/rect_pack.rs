// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Online rectangle packing for atlas pages.

/// An online, greedy rectangle packer.
///
/// Rectangles are placed one at a time with no knowledge of future requests.
/// The packer keeps a growing bounding canvas that stays roughly square: when
/// continuing the current run of placements would waste more area than the
/// canvas already occupies, it starts a new shelf along the currently shorter
/// axis. This is a single-pass heuristic, not an optimal packer; glyph
/// rectangles are similar enough in size that the wasted space stays small,
/// and waste only costs memory, never correctness.
///
/// The canvas dimensions grow monotonically, and every placed rectangle,
/// inflated by the padding, lies within `[0, width) x [0, height)`.
#[derive(Clone, Debug)]
pub struct RectanglePack {
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    padding: u32,
}

impl RectanglePack {
    /// The default gap kept between rectangles and around the canvas edge.
    pub const DEFAULT_PADDING: u32 = 2;

    /// Create an empty packer keeping `padding` pixels between rectangles.
    pub fn new(padding: u32) -> Self {
        Self {
            width: padding,
            height: padding,
            x: padding,
            y: padding,
            padding,
        }
    }

    /// The current canvas width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The current canvas height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Place a `width` x `height` rectangle, returning its origin.
    ///
    /// The canvas grows as needed; callers that enforce a maximum canvas
    /// size check [`width`](Self::width)/[`height`](Self::height) after the
    /// call.
    pub fn add_rect(&mut self, width: u32, height: u32) -> (u32, u32) {
        let w = width + self.padding;
        let h = height + self.padding;
        let occupied = i64::from(self.width - self.x) * i64::from(self.height - self.y);
        let wasted_right =
            (i64::from(self.x) + i64::from(w) - i64::from(self.width)) * i64::from(self.y);
        let wasted_down =
            (i64::from(self.y) + i64::from(h) - i64::from(self.height)) * i64::from(self.x);
        if wasted_right > occupied || wasted_down > occupied {
            // The current shelf has run out of room; open a new one along
            // the shorter axis.
            if self.width <= self.height {
                self.x = self.width;
                self.y = self.padding;
            } else {
                self.x = self.padding;
                self.y = self.height;
            }
        }
        let point = (self.x, self.y);
        let grow_right = i64::from(self.x) + i64::from(w) - i64::from(self.width);
        let grow_down = i64::from(self.y) + i64::from(h) - i64::from(self.height);
        if grow_right < grow_down {
            self.x += w;
            self.height = self.height.max(self.y + h);
            self.width = self.width.max(self.x);
        } else {
            self.y += h;
            self.width = self.width.max(self.x + w);
            self.height = self.height.max(self.y);
        }
        point
    }

    /// Restore the initial, padding-only state.
    pub fn reset(&mut self) {
        *self = Self::new(self.padding);
    }

    /// Reset to a fresh, empty canvas pre-grown to the given footprint.
    ///
    /// Placements restart at the padding origin, but the growth heuristic
    /// sees a canvas of at least `width` x `height`, so the first few
    /// rectangles pack into that region instead of re-growing the canvas
    /// from nothing.
    pub fn reset_seeded(&mut self, width: u32, height: u32) {
        self.reset();
        self.width = self.width.max(width);
        self.height = self.height.max(height);
    }
}

impl Default for RectanglePack {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PADDING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_placement_sits_at_the_padding_origin() {
        let mut pack = RectanglePack::default();
        assert_eq!(pack.add_rect(10, 12), (2, 2));
        assert!(pack.width() >= 12);
        assert!(pack.height() >= 14);
    }

    #[test]
    fn dimensions_grow_monotonically() {
        let mut pack = RectanglePack::default();
        let sizes = [
            (12, 14),
            (3, 40),
            (40, 3),
            (17, 17),
            (1, 1),
            (25, 9),
            (9, 25),
            (16, 16),
        ];
        let (mut last_w, mut last_h) = (pack.width(), pack.height());
        for (w, h) in sizes {
            pack.add_rect(w, h);
            assert!(pack.width() >= last_w);
            assert!(pack.height() >= last_h);
            (last_w, last_h) = (pack.width(), pack.height());
        }
    }

    #[test]
    fn placements_stay_inside_the_canvas() {
        let mut pack = RectanglePack::new(2);
        let sizes = [
            (20, 20),
            (18, 22),
            (22, 18),
            (20, 20),
            (5, 30),
            (30, 5),
            (20, 20),
            (11, 13),
            (13, 11),
            (20, 20),
        ];
        for (w, h) in sizes {
            let (x, y) = pack.add_rect(w, h);
            // The padded rectangle never reaches past the canvas.
            assert!(x + w + 2 <= pack.width());
            assert!(y + h + 2 <= pack.height());
        }
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let mut pack = RectanglePack::new(3);
        pack.add_rect(40, 40);
        pack.add_rect(40, 40);
        pack.reset();
        assert_eq!(pack.width(), 3);
        assert_eq!(pack.height(), 3);
        assert_eq!(pack.add_rect(10, 10), (3, 3));
    }

    #[test]
    fn seeded_reset_pre_grows_the_canvas() {
        let mut pack = RectanglePack::default();
        pack.reset_seeded(200, 150);
        assert_eq!(pack.width(), 200);
        assert_eq!(pack.height(), 150);
        let (x, y) = pack.add_rect(16, 16);
        assert_eq!((x, y), (2, 2));
        // The seed already covers the placement, so no growth.
        assert_eq!(pack.width(), 200);
        assert_eq!(pack.height(), 150);
    }
}
