// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typefaces and sized fonts.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use peniko::kurbo::{BezPath, Rect, Vec2};
use peniko::Blob;
use skrifa::instance::{LocationRef, Size};
use skrifa::raw::TableProvider;
use skrifa::{FontRef, MetadataProvider};
use thiserror::Error;

use crate::glyph::{GlyphId, GlyphImage};
use crate::scaler::{OutlineScaler, ScalerContext};

/// Errors produced when constructing a [`Typeface`].
#[derive(Debug, Error)]
pub enum FontError {
    /// The font data could not be parsed.
    #[error("failed to parse font data: {0}")]
    Parse(#[from] skrifa::raw::ReadError),
}

/// Font-wide metrics, scaled to a font's size.
///
/// Uses y-down sign conventions: `ascent` is negative (above the baseline)
/// and `descent` is positive (below it). A backend that fails to activate a
/// size reports all-zero metrics, which callers must treat as an unusable
/// font rather than dividing by them.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FontMetrics {
    /// Distance from the baseline to the typographic top, negative.
    pub ascent: f32,
    /// Distance from the baseline to the typographic bottom, positive.
    pub descent: f32,
    /// Additional spacing between lines.
    pub leading: f32,
    /// Height of the lowercase `x`, or zero if the font does not report it.
    pub x_height: f32,
    /// Height of uppercase letters, or zero if the font does not report it.
    pub cap_height: f32,
}

static NEXT_TYPEFACE_ID: AtomicU64 = AtomicU64::new(1);

/// A parsed font file, shared by every size of the font.
///
/// Capabilities are probed once at parse time. The typeface also owns the
/// per-size [`ScalerContext`] cache, so one instance exists per distinct
/// (typeface, size) pair and sizes of the same typeface share it.
pub struct Typeface {
    data: Blob<u8>,
    index: u32,
    id: u64,
    units_per_em: u16,
    glyph_count: u16,
    has_outlines: bool,
    has_color: bool,
    scalers: Mutex<HashMap<u32, Arc<dyn ScalerContext>>>,
}

impl Typeface {
    /// Parse a typeface from raw font bytes.
    ///
    /// `index` selects a font within a collection; pass 0 for a single font
    /// file.
    pub fn from_data(data: Blob<u8>, index: u32) -> Result<Arc<Self>, FontError> {
        let font = FontRef::from_index(data.as_ref(), index)?;
        let metrics = font.metrics(Size::unscaled(), LocationRef::default());
        let glyph_count = font.maxp().map(|maxp| maxp.num_glyphs()).unwrap_or(0);
        let has_outlines = font.outline_glyphs().format().is_some();
        let has_color = font.colr().is_ok();
        Ok(Arc::new(Self {
            data,
            index,
            id: NEXT_TYPEFACE_ID.fetch_add(1, Ordering::Relaxed),
            units_per_em: metrics.units_per_em,
            glyph_count,
            has_outlines,
            has_color,
            scalers: Mutex::new(HashMap::new()),
        }))
    }

    /// A process-unique identity for this typeface.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The raw font bytes.
    pub fn data(&self) -> &Blob<u8> {
        &self.data
    }

    /// The index of this font within its collection.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Font design units per em.
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// The number of glyphs in the typeface.
    pub fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    /// Whether the typeface has scalable outlines.
    pub fn has_outlines(&self) -> bool {
        self.has_outlines
    }

    /// Whether the typeface carries color glyph tables.
    pub fn has_color(&self) -> bool {
        self.has_color
    }

    /// The scaler for this typeface at `size`, creating and caching it on
    /// first use.
    pub fn scaler(&self, size: f32) -> Arc<dyn ScalerContext> {
        let mut scalers = lock_ignoring_poison(&self.scalers);
        scalers
            .entry(size.to_bits())
            .or_insert_with(|| {
                let scaler: Arc<dyn ScalerContext> = Arc::new(OutlineScaler::new(self, size));
                scaler
            })
            .clone()
    }
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typeface")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("units_per_em", &self.units_per_em)
            .field("glyph_count", &self.glyph_count)
            .field("has_outlines", &self.has_outlines)
            .field("has_color", &self.has_color)
            .finish_non_exhaustive()
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A typeface at a point size, with optional faux styling.
///
/// This is a value type: the `with_*` methods return new values and never
/// mutate the receiver. Two fonts are equal when they reference the same
/// typeface at the same size with the same faux flags.
#[derive(Clone, Debug)]
pub struct Font {
    typeface: Arc<Typeface>,
    size: f32,
    faux_bold: bool,
    faux_italic: bool,
}

impl Font {
    /// Create a font from a typeface and a size in pixels per em.
    pub fn new(typeface: Arc<Typeface>, size: f32) -> Self {
        Self {
            typeface,
            size,
            faux_bold: false,
            faux_italic: false,
        }
    }

    /// The typeface.
    pub fn typeface(&self) -> &Arc<Typeface> {
        &self.typeface
    }

    /// The size in pixels per em.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Whether glyphs are algorithmically emboldened.
    pub fn faux_bold(&self) -> bool {
        self.faux_bold
    }

    /// Whether glyphs are algorithmically slanted.
    pub fn faux_italic(&self) -> bool {
        self.faux_italic
    }

    /// The same font at a different size.
    pub fn with_size(&self, size: f32) -> Self {
        Self {
            typeface: self.typeface.clone(),
            size,
            faux_bold: self.faux_bold,
            faux_italic: self.faux_italic,
        }
    }

    /// The same font with faux bold enabled or disabled.
    pub fn with_faux_bold(&self, faux_bold: bool) -> Self {
        Self {
            faux_bold,
            ..self.clone()
        }
    }

    /// The same font with faux italic enabled or disabled.
    pub fn with_faux_italic(&self, faux_italic: bool) -> Self {
        Self {
            faux_italic,
            ..self.clone()
        }
    }

    /// Font-wide metrics at this size.
    pub fn metrics(&self) -> FontMetrics {
        self.scaler().metrics()
    }

    /// The advance of a glyph, horizontal or vertical.
    pub fn advance(&self, glyph: GlyphId, vertical: bool) -> f32 {
        if glyph.is_missing() {
            return 0.0;
        }
        self.scaler().advance(glyph, vertical)
    }

    /// The bounding box of a glyph, including faux-bold expansion.
    pub fn bounds(&self, glyph: GlyphId) -> Rect {
        if glyph.is_missing() {
            return Rect::ZERO;
        }
        self.scaler()
            .bounds(glyph, self.faux_bold, self.faux_italic)
    }

    /// The outline of a glyph, with faux styling applied.
    pub fn path(&self, glyph: GlyphId) -> Option<BezPath> {
        if glyph.is_missing() {
            return None;
        }
        self.scaler().path(glyph, self.faux_bold, self.faux_italic)
    }

    /// The rendered image of a glyph, for bitmap and color strikes.
    ///
    /// Faux-bold is not honored on this path.
    pub fn image(&self, glyph: GlyphId) -> Option<GlyphImage> {
        if glyph.is_missing() {
            return None;
        }
        self.scaler().image(glyph)
    }

    /// The offset from a glyph's horizontal origin to its vertical origin.
    pub fn vertical_offset(&self, glyph: GlyphId) -> Vec2 {
        if glyph.is_missing() {
            return Vec2::ZERO;
        }
        self.scaler().vertical_offset(glyph)
    }

    fn scaler(&self) -> Arc<dyn ScalerContext> {
        self.typeface.scaler(self.size)
    }
}

impl PartialEq for Font {
    fn eq(&self, other: &Self) -> bool {
        self.typeface.id == other.typeface.id
            && self.size.to_bits() == other.size.to_bits()
            && self.faux_bold == other.faux_bold
            && self.faux_italic == other.faux_italic
    }
}
