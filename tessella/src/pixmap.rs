// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel buffers used as rasterization targets and atlas page storage.

use bytemuck::{Pod, Zeroable};

/// A premultiplied RGBA color with 8 bits per component.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct PremulRgba8 {
    /// Red component, premultiplied by alpha.
    pub r: u8,
    /// Green component, premultiplied by alpha.
    pub g: u8,
    /// Blue component, premultiplied by alpha.
    pub b: u8,
    /// Alpha component.
    pub a: u8,
}

impl PremulRgba8 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };
}

/// An 8-bit coverage mask.
///
/// Values range from 0 (uncovered) to 255 (fully covered) and are stored in
/// row-major order. This is the target for alpha-only glyph rasterization
/// and the backing store of alpha atlas pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl Mask {
    /// Create a new mask with the given width and height in pixels.
    ///
    /// All pixels are initialized to zero coverage.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            data: vec![0; usize::from(width) * usize::from(height)],
        }
    }

    /// Create a new mask from the given coverage data.
    ///
    /// The pixels are in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if the `data` vector is not of length `width * height`.
    pub fn from_parts(data: Vec<u8>, width: u16, height: u16) -> Self {
        assert_eq!(
            data.len(),
            usize::from(width) * usize::from(height),
            "Expected `data` to have length of exactly `width * height`"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Return the width of the mask.
    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Return the height of the mask.
    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Whether the mask has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Return the coverage values, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Return the coverage values mutably, row-major.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Sample the coverage at a specific location.
    ///
    /// # Panics
    ///
    /// Panics if the location is out of bounds.
    pub fn sample(&self, x: u16, y: u16) -> u8 {
        assert!(x < self.width && y < self.height);
        self.data[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }
}

/// A pixmap of premultiplied RGBA8 values.
///
/// Pixels are stored in row-major order. This is the target for color glyph
/// compositing and the backing store of color atlas pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u16,
    height: u16,
    buf: Vec<PremulRgba8>,
}

impl Pixmap {
    /// Create a new pixmap with the given width and height in pixels.
    ///
    /// All pixels are initialized to transparent black.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            buf: vec![PremulRgba8::TRANSPARENT; usize::from(width) * usize::from(height)],
        }
    }

    /// Create a new pixmap with the given premultiplied RGBA8 data.
    ///
    /// The pixels are in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if the `data` vector is not of length `width * height`.
    pub fn from_parts(data: Vec<PremulRgba8>, width: u16, height: u16) -> Self {
        assert_eq!(
            data.len(),
            usize::from(width) * usize::from(height),
            "Expected `data` to have length of exactly `width * height`"
        );
        Self {
            width,
            height,
            buf: data,
        }
    }

    /// Return the width of the pixmap.
    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Return the height of the pixmap.
    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Whether the pixmap has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Return the pixels, row-major.
    pub fn data(&self) -> &[PremulRgba8] {
        &self.buf
    }

    /// Return the pixels mutably, row-major.
    pub fn data_mut(&mut self) -> &mut [PremulRgba8] {
        &mut self.buf
    }

    /// Return the pixels as a byte slice in RGBA order.
    pub fn data_as_u8_slice(&self) -> &[u8] {
        bytemuck::cast_slice(&self.buf)
    }

    /// Sample the pixel at a specific location.
    ///
    /// # Panics
    ///
    /// Panics if the location is out of bounds.
    pub fn sample(&self, x: u16, y: u16) -> PremulRgba8 {
        assert!(x < self.width && y < self.height);
        self.buf[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_starts_uncovered() {
        let mask = Mask::new(4, 3);
        assert_eq!(mask.width(), 4);
        assert_eq!(mask.height(), 3);
        assert!(mask.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn pixmap_byte_view_matches_pixels() {
        let mut pixmap = Pixmap::new(2, 1);
        pixmap.data_mut()[1] = PremulRgba8 {
            r: 10,
            g: 20,
            b: 30,
            a: 40,
        };
        assert_eq!(
            pixmap.data_as_u8_slice(),
            &[0, 0, 0, 0, 10, 20, 30, 40][..]
        );
    }

    #[test]
    #[should_panic(expected = "width * height")]
    fn mask_from_parts_checks_length() {
        let _ = Mask::from_parts(vec![0; 5], 2, 3);
    }
}
