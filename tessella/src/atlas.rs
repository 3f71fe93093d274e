// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text atlases: many glyphs packed into a few shared images.
//!
//! An [`Atlas`] takes the glyphs of a run list, deduplicates them by id,
//! tiles their bounding boxes onto one or more pages with
//! [`RectanglePack`], and rasterizes each page in a single pass. The
//! resulting page images plus the `GlyphId` to [`AtlasLocator`] table are
//! everything a GPU text-drawing layer needs to emit textured quads.
//!
//! [`TextAtlas`] sits on top and splits a run list into an alpha atlas
//! (outline glyphs, one byte per pixel) and a color atlas (pre-composed
//! imagery, four bytes per pixel).

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use peniko::kurbo::{Affine, Point, Rect, Stroke};
use smallvec::SmallVec;

use crate::glyph::{GlyphFace, GlyphId, GlyphRun, GlyphRunList};
use crate::pixmap::{Mask, Pixmap};
use crate::raster::GlyphRasterizer;
use crate::rect_pack::RectanglePack;
use crate::stroke::stroke_outset;

/// The hard upper limit on atlas page dimensions, independent of what the
/// device reports.
pub const MAX_ATLAS_PAGE_SIZE: u32 = 4096;

/// The pixel format of an atlas page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AtlasFormat {
    /// One coverage byte per pixel.
    Alpha8,
    /// Four premultiplied RGBA bytes per pixel.
    Rgba8,
}

impl AtlasFormat {
    /// The number of bytes per pixel in this format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Alpha8 => 1,
            Self::Rgba8 => 4,
        }
    }
}

/// One rasterized atlas page.
#[derive(Clone, Debug)]
pub enum AtlasImage {
    /// An alpha-only page.
    Alpha(Mask),
    /// A color page.
    Color(Pixmap),
}

impl AtlasImage {
    /// The page width in pixels.
    pub fn width(&self) -> u16 {
        match self {
            Self::Alpha(mask) => mask.width(),
            Self::Color(pixmap) => pixmap.width(),
        }
    }

    /// The page height in pixels.
    pub fn height(&self) -> u16 {
        match self {
            Self::Alpha(mask) => mask.height(),
            Self::Color(pixmap) => pixmap.height(),
        }
    }

    /// The page's pixel format.
    pub fn format(&self) -> AtlasFormat {
        match self {
            Self::Alpha(_) => AtlasFormat::Alpha8,
            Self::Color(_) => AtlasFormat::Rgba8,
        }
    }

    /// The page's size in bytes.
    pub fn memory_usage(&self) -> usize {
        usize::from(self.width()) * usize::from(self.height()) * self.format().bytes_per_pixel()
    }
}

/// Where one glyph landed in an atlas.
///
/// Locators are produced once when the atlas is built and are immutable;
/// every glyph id that was present in the source run list with non-empty
/// bounds has exactly one, no matter how often it repeated across runs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AtlasLocator {
    /// The page holding the glyph.
    pub page_index: usize,
    /// The glyph's rectangle within that page, in pixels.
    pub location: Rect,
    /// The glyph's bounding box in its face's coordinate space, including
    /// any stroke expansion, before atlas scaling.
    pub glyph_bounds: Rect,
}

/// Groups runs by the glyph source they come from, so one rasterization
/// pass can batch all glyphs of the same face.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FaceKey {
    /// Font-backed faces group by typeface identity.
    Typeface(u64),
    /// Other faces group by allocation identity.
    Instance(usize),
}

fn face_key(face: &Arc<dyn GlyphFace>) -> FaceKey {
    match face.as_font() {
        Some(font) => FaceKey::Typeface(font.typeface().id()),
        None => FaceKey::Instance(Arc::as_ptr(face) as *const () as usize),
    }
}

struct RunBuilder {
    key: FaceKey,
    face: Arc<dyn GlyphFace>,
    glyphs: Vec<GlyphId>,
    positions: Vec<Point>,
}

/// A page being assembled: the text runs placed so far and the packed
/// footprint they occupy.
#[derive(Default)]
struct PageBuilder {
    runs: SmallVec<[RunBuilder; 1]>,
    width: u32,
    height: u32,
}

impl PageBuilder {
    fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn push_glyph(
        &mut self,
        key: FaceKey,
        face: &Arc<dyn GlyphFace>,
        glyph: GlyphId,
        position: Point,
    ) {
        if let Some(run) = self.runs.iter_mut().find(|run| run.key == key) {
            run.glyphs.push(glyph);
            run.positions.push(position);
        } else {
            self.runs.push(RunBuilder {
                key,
                face: face.clone(),
                glyphs: vec![glyph],
                positions: vec![position],
            });
        }
    }

    fn seal(self) -> Page {
        Page {
            runs: self
                .runs
                .into_iter()
                .map(|run| GlyphRun::new(run.face, run.glyphs, run.positions))
                .collect(),
            width: self.width,
            height: self.height,
        }
    }
}

struct Page {
    runs: Vec<GlyphRun>,
    width: u32,
    height: u32,
}

/// Tile the glyphs of `run_list` onto pages no larger than `max_page_size`.
///
/// Glyphs are deduplicated by id across the whole list, first occurrence
/// wins. Placement offsets are stored in the space the page rasterizer will
/// draw in: device pixels normally, pre-scale units when a stroke is
/// present (stroked pages rasterize through a scaling matrix so stroke
/// geometry is computed at device resolution).
fn create_pages(
    run_list: &GlyphRunList,
    max_page_size: u32,
    scale: f32,
    stroke: Option<&Stroke>,
) -> (Vec<Page>, HashMap<GlyphId, AtlasLocator>) {
    let padding = RectanglePack::DEFAULT_PADDING;
    let mut pack = RectanglePack::new(padding);
    let mut pages = Vec::new();
    let mut locators = HashMap::new();
    let mut builder = PageBuilder::default();
    let final_scale = f64::from(if stroke.is_some() { scale } else { 1.0 });
    for run in run_list.runs() {
        if run.is_empty() {
            continue;
        }
        let key = face_key(run.face());
        // Without a stroke the page draws pre-scaled faces through an
        // identity matrix; with one it draws the original faces through a
        // scaling matrix.
        let page_face = if stroke.is_some() || scale == 1.0 {
            run.face().clone()
        } else {
            match run.face().make_scaled(scale) {
                Some(face) => face,
                None => continue,
            }
        };
        for &glyph in run.glyphs() {
            if glyph.is_missing() || locators.contains_key(&glyph) {
                continue;
            }
            let mut glyph_bounds = run.face().bounds(glyph);
            if glyph_bounds.width() <= 0.0 || glyph_bounds.height() <= 0.0 {
                continue;
            }
            if let Some(stroke) = stroke {
                let outset = stroke_outset(stroke);
                glyph_bounds = glyph_bounds.inflate(outset, outset);
            }
            let device = glyph_bounds.scale_from_origin(f64::from(scale)).expand();
            let width = device.width() as u32;
            let height = device.height() as u32;
            if width == 0 || height == 0 {
                continue;
            }
            if width + 2 * padding > max_page_size || height + 2 * padding > max_page_size {
                // Too big to batch; the locator miss routes this glyph to
                // un-batched per-glyph drawing.
                log::debug!(
                    "glyph {} ({width}x{height}) does not fit an atlas page, skipping",
                    glyph.to_u16()
                );
                continue;
            }
            let (mut x, mut y) = pack.add_rect(width, height);
            if pack.width() > max_page_size || pack.height() > max_page_size {
                // Seal the page at its pre-overflow footprint and repack the
                // triggering glyph into a fresh region seeded with that
                // footprint.
                let (page_width, page_height) = (builder.width, builder.height);
                pages.push(mem::take(&mut builder).seal());
                pack.reset_seeded(page_width, page_height);
                (x, y) = pack.add_rect(width, height);
            }
            builder.width = pack.width();
            builder.height = pack.height();
            let position = Point::new(
                (f64::from(x) - device.x0) / final_scale,
                (f64::from(y) - device.y0) / final_scale,
            );
            builder.push_glyph(key, &page_face, glyph, position);
            locators.insert(
                glyph,
                AtlasLocator {
                    page_index: pages.len(),
                    location: Rect::new(
                        f64::from(x),
                        f64::from(y),
                        f64::from(x + width),
                        f64::from(y + height),
                    ),
                    glyph_bounds,
                },
            );
        }
    }
    if !builder.is_empty() {
        pages.push(builder.seal());
    }
    (pages, locators)
}

/// A set of rasterized pages plus the locator table into them.
#[derive(Clone, Debug)]
pub struct Atlas {
    images: Vec<AtlasImage>,
    locators: HashMap<GlyphId, AtlasLocator>,
    format: AtlasFormat,
}

impl Atlas {
    /// Build an atlas for the glyphs of `run_list`.
    ///
    /// `scale` maps face units to atlas pixels; `stroke`, when present, is
    /// applied to every outline in font space. Returns `None` when there is
    /// nothing to batch (an empty list, empty bounds everywhere, or an
    /// unusable scale); callers fall back to drawing glyphs individually.
    pub fn make(
        run_list: &GlyphRunList,
        rasterizer: &GlyphRasterizer,
        max_page_size: u32,
        scale: f32,
        stroke: Option<&Stroke>,
    ) -> Option<Self> {
        if run_list.is_empty() || !(scale.is_finite() && scale > 0.0) {
            return None;
        }
        let max_page_size = max_page_size.min(MAX_ATLAS_PAGE_SIZE);
        if max_page_size <= 2 * RectanglePack::DEFAULT_PADDING {
            return None;
        }
        let format = if run_list.runs().iter().any(|run| run.face().has_color()) {
            AtlasFormat::Rgba8
        } else {
            AtlasFormat::Alpha8
        };
        let (pages, locators) = create_pages(run_list, max_page_size, scale, stroke);
        if pages.is_empty() {
            return None;
        }
        let matrix = if stroke.is_some() {
            Affine::scale(f64::from(scale))
        } else {
            Affine::IDENTITY
        };
        let mut images = Vec::with_capacity(pages.len());
        for page in pages {
            let page_list = GlyphRunList::new(page.runs);
            let image = rasterizer.rasterize(
                page.width as u16,
                page.height as u16,
                &page_list,
                true,
                matrix,
                stroke,
                format,
            )?;
            images.push(image);
        }
        Some(Self {
            images,
            locators,
            format,
        })
    }

    /// The pixel format of the atlas pages.
    pub fn format(&self) -> AtlasFormat {
        self.format
    }

    /// The number of pages.
    pub fn page_count(&self) -> usize {
        self.images.len()
    }

    /// The rasterized page at `page_index`.
    pub fn image(&self, page_index: usize) -> Option<&AtlasImage> {
        self.images.get(page_index)
    }

    /// Look up where a glyph landed.
    ///
    /// `None` if the glyph was not part of the source run list or had empty
    /// bounds and was never packed.
    pub fn locator(&self, glyph: GlyphId) -> Option<AtlasLocator> {
        self.locators.get(&glyph).copied()
    }

    /// Total bytes across all pages.
    pub fn memory_usage(&self) -> usize {
        self.images.iter().map(AtlasImage::memory_usage).sum()
    }
}

/// An atlas pair covering one run list: alpha pages for coverage glyphs and
/// color pages for pre-composed imagery.
///
/// Page indices address the alpha pages first, then the color pages, so a
/// single index space serves both.
#[derive(Clone, Debug)]
pub struct TextAtlas {
    mask: Option<Atlas>,
    color: Option<Atlas>,
}

impl TextAtlas {
    /// Build the atlases for `run_list`.
    ///
    /// The page size is capped at the smaller of `max_texture_size` (the
    /// device texture limit) and [`MAX_ATLAS_PAGE_SIZE`]. Returns `None`
    /// when nothing could be batched; callers fall back to per-glyph
    /// drawing, this is not an error.
    pub fn make(
        run_list: &GlyphRunList,
        rasterizer: &GlyphRasterizer,
        max_texture_size: u32,
        scale: f32,
        stroke: Option<&Stroke>,
    ) -> Option<Self> {
        if run_list.is_empty() {
            return None;
        }
        let max_page_size = MAX_ATLAS_PAGE_SIZE.min(max_texture_size);
        let mut mask_runs = Vec::new();
        let mut color_runs = Vec::new();
        for run in run_list.runs() {
            if run.is_empty() {
                continue;
            }
            if run.face().has_color() {
                color_runs.push(run.clone());
            } else {
                mask_runs.push(run.clone());
            }
        }
        let mask = Atlas::make(
            &GlyphRunList::new(mask_runs),
            rasterizer,
            max_page_size,
            scale,
            stroke,
        );
        let color = Atlas::make(
            &GlyphRunList::new(color_runs),
            rasterizer,
            max_page_size,
            scale,
            stroke,
        );
        if mask.is_none() && color.is_none() {
            return None;
        }
        Some(Self { mask, color })
    }

    fn mask_page_count(&self) -> usize {
        self.mask.as_ref().map_or(0, Atlas::page_count)
    }

    /// The total number of pages across both atlases.
    pub fn page_count(&self) -> usize {
        self.mask_page_count() + self.color.as_ref().map_or(0, Atlas::page_count)
    }

    /// The rasterized page at `page_index`.
    pub fn atlas_image(&self, page_index: usize) -> Option<&AtlasImage> {
        let mask_pages = self.mask_page_count();
        if page_index < mask_pages {
            self.mask.as_ref()?.image(page_index)
        } else {
            self.color.as_ref()?.image(page_index - mask_pages)
        }
    }

    /// Look up where a glyph landed, across both atlases.
    pub fn locator(&self, glyph: GlyphId) -> Option<AtlasLocator> {
        if let Some(locator) = self.mask.as_ref().and_then(|atlas| atlas.locator(glyph)) {
            return Some(locator);
        }
        let mut locator = self.color.as_ref()?.locator(glyph)?;
        locator.page_index += self.mask_page_count();
        Some(locator)
    }

    /// Total bytes across all pages of both atlases.
    pub fn memory_usage(&self) -> usize {
        self.mask.as_ref().map_or(0, Atlas::memory_usage)
            + self.color.as_ref().map_or(0, Atlas::memory_usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::kurbo::{BezPath, Shape};

    /// An outline face whose glyphs are rectangles sized by their id.
    #[derive(Debug)]
    struct RectFace {
        scale: f64,
    }

    impl RectFace {
        fn rect(&self, glyph: GlyphId) -> Rect {
            let id = f64::from(glyph.to_u16());
            Rect::new(0.0, -(6.0 + id % 5.0), 4.0 + id % 7.0, 0.0).scale_from_origin(self.scale)
        }
    }

    impl GlyphFace for RectFace {
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
                scale: self.scale * f64::from(scale),
            }))
        }

        fn path(&self, glyph: GlyphId) -> Option<BezPath> {
            if glyph.is_missing() {
                return None;
            }
            Some(self.rect(glyph).to_path(0.1))
        }

        fn image(&self, _glyph: GlyphId) -> Option<crate::glyph::GlyphImage> {
            None
        }

        fn bounds(&self, glyph: GlyphId) -> Rect {
            if glyph.is_missing() {
                return Rect::ZERO;
            }
            self.rect(glyph)
        }
    }

    fn run_of(face: &Arc<dyn GlyphFace>, ids: &[u16]) -> GlyphRun {
        let glyphs: Vec<_> = ids.iter().copied().map(GlyphId::new).collect();
        let positions = vec![Point::ZERO; glyphs.len()];
        GlyphRun::new(face.clone(), glyphs, positions)
    }

    #[test]
    fn glyphs_dedup_across_runs() {
        let face: Arc<dyn GlyphFace> = Arc::new(RectFace { scale: 1.0 });
        let list = GlyphRunList::new(vec![
            run_of(&face, &[1, 2, 3]),
            run_of(&face, &[3, 2, 4]),
        ]);
        let (pages, locators) = create_pages(&list, 256, 1.0, None);
        assert_eq!(pages.len(), 1);
        assert_eq!(locators.len(), 4);
        let placed: usize = pages[0].runs.iter().map(GlyphRun::len).sum();
        assert_eq!(placed, 4);
    }

    #[test]
    fn missing_and_empty_glyphs_are_not_packed() {
        let face: Arc<dyn GlyphFace> = Arc::new(RectFace { scale: 1.0 });
        let list = GlyphRunList::new(vec![run_of(&face, &[0, 5])]);
        let (pages, locators) = create_pages(&list, 256, 1.0, None);
        assert_eq!(pages.len(), 1);
        assert_eq!(locators.len(), 1);
        assert!(!locators.contains_key(&GlyphId::MISSING));
    }

    #[test]
    fn pages_respect_the_maximum_size() {
        let face: Arc<dyn GlyphFace> = Arc::new(RectFace { scale: 3.0 });
        let ids: Vec<u16> = (1..=40).collect();
        let list = GlyphRunList::new(vec![run_of(&face, &ids)]);
        let (pages, locators) = create_pages(&list, 64, 1.0, None);
        assert!(pages.len() > 1);
        assert_eq!(locators.len(), 40);
        for (index, page) in pages.iter().enumerate() {
            assert!(page.width <= 64, "page {index} width {}", page.width);
            assert!(page.height <= 64, "page {index} height {}", page.height);
        }
        for locator in locators.values() {
            let page = &pages[locator.page_index];
            assert!(locator.location.x1 <= f64::from(page.width));
            assert!(locator.location.y1 <= f64::from(page.height));
        }
    }

    #[test]
    fn packing_is_deterministic() {
        let face: Arc<dyn GlyphFace> = Arc::new(RectFace { scale: 2.0 });
        let ids: Vec<u16> = (1..=25).collect();
        let list = GlyphRunList::new(vec![run_of(&face, &ids)]);
        let (pages_a, locators_a) = create_pages(&list, 128, 1.5, None);
        let (pages_b, locators_b) = create_pages(&list, 128, 1.5, None);
        assert_eq!(pages_a.len(), pages_b.len());
        for id in &ids {
            assert_eq!(locators_a[&GlyphId::new(*id)], locators_b[&GlyphId::new(*id)]);
        }
    }

    #[test]
    fn oversized_glyphs_are_skipped() {
        let face: Arc<dyn GlyphFace> = Arc::new(RectFace { scale: 40.0 });
        // Glyph 1 is 160x240 at this scale; the rest of the run still packs.
        let small: Arc<dyn GlyphFace> = Arc::new(RectFace { scale: 1.0 });
        let list = GlyphRunList::new(vec![run_of(&face, &[1]), run_of(&small, &[2, 3])]);
        let (pages, locators) = create_pages(&list, 128, 1.0, None);
        assert_eq!(pages.len(), 1);
        assert!(!locators.contains_key(&GlyphId::new(1)));
        assert!(locators.contains_key(&GlyphId::new(2)));
        assert!(locators.contains_key(&GlyphId::new(3)));
    }

    #[test]
    fn stroke_positions_divide_out_the_scale() {
        let face: Arc<dyn GlyphFace> = Arc::new(RectFace { scale: 1.0 });
        let list = GlyphRunList::new(vec![run_of(&face, &[7])]);
        let stroke = Stroke::new(2.0);
        let (pages, locators) = create_pages(&list, 256, 2.0, Some(&stroke));
        let locator = locators[&GlyphId::new(7)];
        // Bounds carry the font-space stroke outset.
        assert_eq!(locator.glyph_bounds, face.bounds(GlyphId::new(7)).inflate(1.0, 1.0));
        let position = pages[0].runs[0].positions()[0];
        let device = locator.glyph_bounds.scale_from_origin(2.0).expand();
        assert!((position.x - (locator.location.x0 - device.x0) / 2.0).abs() < 1e-9);
        assert!((position.y - (locator.location.y0 - device.y0) / 2.0).abs() < 1e-9);
    }
}
