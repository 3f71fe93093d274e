// Copyright 2026 the Tessella Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph rasterization and text-atlas packing for batched GPU text drawing.
//!
//! Tessella turns abstract glyph identifiers into rasterized, cached,
//! upload-ready imagery. It covers the middle of a text pipeline: shaping
//! (mapping text to glyph ids and positions) happens upstream, and actually
//! sampling the atlas from a GPU pipeline happens downstream. In between,
//! this crate provides:
//!
//! - the glyph source abstraction ([`glyph::GlyphFace`]) with a font-backed
//!   implementation ([`glyph::FontGlyphFace`]) and an image-backed one for
//!   emoji-style color glyphs ([`glyph::ImageGlyphFace`]),
//! - per-size outline extraction and metrics through
//!   [`scaler::ScalerContext`], backed by [skrifa],
//! - a scan-converting rasterizer with gamma-correct antialiasing and
//!   font-space stroking ([`raster::GlyphRasterizer`]),
//! - an online rectangle packer ([`rect_pack::RectanglePack`]) and the atlas
//!   builder on top of it ([`atlas::TextAtlas`]), which tiles the glyphs of a
//!   run list into fixed-maximum-size pages and exposes a per-glyph locator
//!   table for the drawing layer.
//!
//! A glyph that cannot be rasterized renders as nothing, and a run list that
//! cannot be batched produces no atlas; callers fall back to per-glyph
//! drawing in that case rather than treating either as an error.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::print_stdout, clippy::print_stderr)]

pub mod atlas;
pub mod font;
pub mod gamma;
pub mod glyph;
pub mod pixmap;
pub mod raster;
pub mod rect_pack;
pub mod scaler;

mod coverage;
mod stroke;

pub use peniko;
pub use peniko::kurbo;
