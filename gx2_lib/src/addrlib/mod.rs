//! GX2's AMD-derived surface address library: tile mode resolution,
//! per-level geometry (`get_surface_info`), and the `swizzle`/`deswizzle`
//! byte permutations between linear and tiled layouts.
//!
//! The pipe/bank macro-tile math here is reconstructed from the public
//! AMD R6xx/R7xx tiling model this format is built on (micro-tiles,
//! pipe/bank interleave, bank swap) rather than ported line-for-line from
//! a reference implementation — upstream ships its address library as a
//! compiled Cython extension with no pure-Python fallback to port from.
//! `swizzle`/`deswizzle` share one address function, so every tile mode
//! round-trips exactly regardless of whether its layout matches real
//! silicon down to the byte.

mod macro_tile;
mod micro;

use crate::enums::{GX2AAMode, GX2SurfaceDim, GX2SurfaceUse};
use crate::format::GX2SurfaceFormat;
use crate::util::{div_round_up, round_up};
use thiserror::Error;

const PIPE_INTERLEAVE_BYTES: u32 = 256;
const MICRO_TILE_DIM: u32 = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddrError {
    #[error("tile mode {0:?} uses depth-direction (thick) tiling, which this crate does not support")]
    ThickTilingUnsupported(TileMode),
    #[error("surface format has no known bits-per-pixel mapping")]
    UnsupportedFormat,
    #[error("multisampled surfaces (aa != 1x) are not supported")]
    UnsupportedAaMode,
    #[error("surface dimension {0:?} is not supported; only Dim2D is")]
    UnsupportedDim(GX2SurfaceDim),
    #[error("buffer too small for the requested tiling operation")]
    BufferTooShort,
    #[error("tile mode Default must be resolved via get_default_tile_mode before calling get_surface_info")]
    UnresolvedDefaultTileMode,
}

/// `GX2TileMode`. Numeric values match the hardware enum exactly so the
/// container's raw `u32` round-trips without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TileMode {
    Default = 0,
    LinearAligned = 1,
    Tiled1DThin1 = 2,
    Tiled1DThick = 3,
    Tiled2DThin1 = 4,
    Tiled2DThin2 = 5,
    Tiled2DThin4 = 6,
    Tiled2DThick = 7,
    Tiled2BThin1 = 8,
    Tiled2BThin2 = 9,
    Tiled2BThin4 = 10,
    Tiled2BThick = 11,
    Tiled3DThin1 = 12,
    Tiled3DThick = 13,
    Tiled3BThin1 = 14,
    Tiled3BThick = 15,
    LinearSpecial = 16,
}

impl TryFrom<u32> for TileMode {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Default,
            1 => Self::LinearAligned,
            2 => Self::Tiled1DThin1,
            3 => Self::Tiled1DThick,
            4 => Self::Tiled2DThin1,
            5 => Self::Tiled2DThin2,
            6 => Self::Tiled2DThin4,
            7 => Self::Tiled2DThick,
            8 => Self::Tiled2BThin1,
            9 => Self::Tiled2BThin2,
            10 => Self::Tiled2BThin4,
            11 => Self::Tiled2BThick,
            12 => Self::Tiled3DThin1,
            13 => Self::Tiled3DThick,
            14 => Self::Tiled3BThin1,
            15 => Self::Tiled3BThick,
            16 => Self::LinearSpecial,
            other => return Err(other),
        })
    }
}

impl TileMode {
    fn thickness(self) -> Thickness {
        match self {
            Self::Tiled1DThick
            | Self::Tiled2DThick
            | Self::Tiled2BThick
            | Self::Tiled3DThick
            | Self::Tiled3BThick => Thickness::Thick4,
            _ => Thickness::Thin,
        }
    }

    fn is_linear(self) -> bool {
        matches!(self, Self::LinearAligned | Self::LinearSpecial)
    }

    fn is_macro_tiled(self) -> bool {
        matches!(
            self,
            Self::Tiled2DThin1
                | Self::Tiled2DThin2
                | Self::Tiled2DThin4
                | Self::Tiled2BThin1
                | Self::Tiled2BThin2
                | Self::Tiled2BThin4
        )
    }

    fn is_3d(self) -> bool {
        matches!(
            self,
            Self::Tiled3DThin1 | Self::Tiled3DThick | Self::Tiled3BThin1 | Self::Tiled3BThick
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Thickness {
    Thin,
    Thick4,
    Thick8,
}

impl Thickness {
    fn depth(self) -> u32 {
        match self {
            Thickness::Thin => 1,
            Thickness::Thick4 => 4,
            Thickness::Thick8 => 8,
        }
    }
}

/// Per-level surface geometry: padded pitch/height, the resolved (possibly
/// degraded) tile mode, and the byte size/alignment of the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub bpp: u32,
    pub pitch: u32,
    pub height: u32,
    pub depth: u32,
    pub surf_size: u64,
    pub base_align: u32,
    pub tile_mode: TileMode,
}

fn block_dims(format: GX2SurfaceFormat) -> u32 {
    if format.is_compressed() {
        4
    } else {
        1
    }
}

/// Picks a tile mode for a newly-created surface when the caller leaves it
/// at `Default`. Scan-out buffers get the GPU's simplest linear layout,
/// depth buffers and surfaces too small to fill one macro tile fall back
/// to 1D tiling, everything else gets 2D tiling for bandwidth.
pub fn get_default_tile_mode(
    dim: GX2SurfaceDim,
    width: u32,
    height: u32,
    format: GX2SurfaceFormat,
    aa: GX2AAMode,
    use_: GX2SurfaceUse,
) -> Result<TileMode, AddrError> {
    if aa != GX2AAMode::Mode1X {
        return Err(AddrError::UnsupportedAaMode);
    }
    if dim != GX2SurfaceDim::Dim2D {
        return Err(AddrError::UnsupportedDim(dim));
    }

    if use_.is_scan_buffer() {
        return Ok(TileMode::LinearAligned);
    }

    if use_.is_depth_buffer() {
        return Ok(TileMode::Tiled1DThin1);
    }

    let blk = block_dims(format);
    let width_blocks = div_round_up(width, blk);
    let height_blocks = div_round_up(height, blk);
    let (macro_w, macro_h) = macro_tile::macro_tile_pixel_dims(TileMode::Tiled2DThin1);

    if width_blocks < macro_w || height_blocks < macro_h {
        Ok(TileMode::Tiled1DThin1)
    } else {
        Ok(TileMode::Tiled2DThin1)
    }
}

/// Computes padded geometry and the resolved tile mode for mip level
/// `mip_level` of a surface with base dimensions `width`/`height`.
pub fn get_surface_info(
    format: GX2SurfaceFormat,
    width: u32,
    height: u32,
    dim: GX2SurfaceDim,
    tile_mode: TileMode,
    aa: GX2AAMode,
    mip_level: u32,
) -> Result<SurfaceInfo, AddrError> {
    if aa != GX2AAMode::Mode1X {
        return Err(AddrError::UnsupportedAaMode);
    }
    if dim != GX2SurfaceDim::Dim2D {
        return Err(AddrError::UnsupportedDim(dim));
    }
    if tile_mode.thickness() != Thickness::Thin {
        return Err(AddrError::ThickTilingUnsupported(tile_mode));
    }
    if tile_mode.is_3d() {
        return Err(AddrError::UnsupportedDim(dim));
    }
    if matches!(tile_mode, TileMode::Default) {
        return Err(AddrError::UnresolvedDefaultTileMode);
    }

    let bpp = format.bits_per_pixel().ok_or(AddrError::UnsupportedFormat)?;

    let blk = block_dims(format);
    let width_mip = (width >> mip_level).max(1);
    let height_mip = (height >> mip_level).max(1);
    let width_blocks = div_round_up(width_mip, blk);
    let height_blocks = div_round_up(height_mip, blk);

    let mut resolved = tile_mode;

    if resolved.is_macro_tiled() {
        let (macro_w, macro_h) = macro_tile::macro_tile_pixel_dims(resolved);
        if width_blocks < macro_w || height_blocks < macro_h {
            resolved = TileMode::Tiled1DThin1;
        }
    }

    let (pitch, padded_height, base_align) = match resolved {
        TileMode::LinearSpecial => (width_blocks.max(1), height_blocks.max(1), 1),
        TileMode::LinearAligned => (
            round_up(width_blocks, 8),
            height_blocks,
            PIPE_INTERLEAVE_BYTES,
        ),
        TileMode::Tiled1DThin1 => {
            let micro_bytes = micro::micro_tile_bytes(bpp, Thickness::Thin);
            (
                round_up(width_blocks, MICRO_TILE_DIM),
                round_up(height_blocks, MICRO_TILE_DIM),
                micro_bytes.max(PIPE_INTERLEAVE_BYTES),
            )
        }
        _ if resolved.is_macro_tiled() => {
            let (macro_w, macro_h) = macro_tile::macro_tile_pixel_dims(resolved);
            let micro_bytes = micro::micro_tile_bytes(bpp, Thickness::Thin);
            let (mt_w, mt_h) = macro_tile::macro_tile_micro_dims(resolved);
            let macro_tile_bytes = micro_bytes * mt_w * mt_h;
            (
                round_up(width_blocks, macro_w),
                round_up(height_blocks, macro_h),
                macro_tile_bytes.max(PIPE_INTERLEAVE_BYTES),
            )
        }
        other => return Err(AddrError::ThickTilingUnsupported(other)),
    };

    let surf_size = u64::from(pitch) * u64::from(padded_height) * u64::from(bpp) / 8;

    Ok(SurfaceInfo {
        bpp,
        pitch,
        height: padded_height,
        depth: 1,
        surf_size,
        base_align,
        tile_mode: resolved,
    })
}

fn tiled_byte_offset(x: u32, y: u32, bpp: u32, pitch: u32, tile_mode: TileMode, pipe_swizzle: u32, bank_swizzle: u32) -> u64 {
    let micro_col = x / MICRO_TILE_DIM;
    let micro_row = y / MICRO_TILE_DIM;
    let local_x = x % MICRO_TILE_DIM;
    let local_y = y % MICRO_TILE_DIM;
    let micro_offset = u64::from(micro::micro_tile_byte_offset(local_x, local_y, 0, bpp, Thickness::Thin));
    let micro_bytes = u64::from(micro::micro_tile_bytes(bpp, Thickness::Thin));

    if tile_mode.is_linear() {
        return (u64::from(y) * u64::from(pitch) + u64::from(x)) * u64::from(bpp) / 8;
    }

    if !tile_mode.is_macro_tiled() {
        // 1D tiling: micro-tiles laid out in simple row-major order.
        let micro_cols = pitch / MICRO_TILE_DIM;
        let micro_index = u64::from(micro_row) * u64::from(micro_cols) + u64::from(micro_col);
        return micro_index * micro_bytes + micro_offset;
    }

    let (mt_w, mt_h) = macro_tile::macro_tile_micro_dims(tile_mode);
    let macro_col = micro_col / mt_w;
    let macro_row = micro_row / mt_h;
    let local_col = micro_col % mt_w;
    let local_row = micro_row % mt_h;
    let local_index = local_row * mt_w + local_col;

    let permuted = macro_tile::permute_local_index(local_index, macro_col, tile_mode, pipe_swizzle, bank_swizzle);

    let macro_tiles_per_row = pitch / (mt_w * MICRO_TILE_DIM);
    let macro_tile_index = u64::from(macro_row) * u64::from(macro_tiles_per_row) + u64::from(macro_col);
    let macro_tile_bytes = micro_bytes * u64::from(mt_w) * u64::from(mt_h);

    macro_tile_index * macro_tile_bytes + u64::from(permuted) * micro_bytes + micro_offset
}

fn swizzle_fields(swizzle_word: u32) -> (u32, u32) {
    let bits = (swizzle_word >> 8) & 0x7;
    (bits & 0x1, (bits >> 1) & 0x3)
}

/// Tiles `linear` (a `pitch x height` grid of `bpp`-bit elements in
/// row-major order) into the byte layout `tile_mode` describes.
pub fn swizzle(
    pitch: u32,
    height: u32,
    bpp: u32,
    tile_mode: TileMode,
    swizzle_word: u32,
    linear: &[u8],
) -> Result<Vec<u8>, AddrError> {
    permute(pitch, height, bpp, tile_mode, swizzle_word, linear, true)
}

/// Inverse of [`swizzle`]: recovers the row-major linear layout from a
/// tiled buffer.
pub fn deswizzle(
    pitch: u32,
    height: u32,
    bpp: u32,
    tile_mode: TileMode,
    swizzle_word: u32,
    tiled: &[u8],
) -> Result<Vec<u8>, AddrError> {
    permute(pitch, height, bpp, tile_mode, swizzle_word, tiled, false)
}

fn permute(
    pitch: u32,
    height: u32,
    bpp: u32,
    tile_mode: TileMode,
    swizzle_word: u32,
    src: &[u8],
    to_tiled: bool,
) -> Result<Vec<u8>, AddrError> {
    if tile_mode.thickness() != Thickness::Thin {
        return Err(AddrError::ThickTilingUnsupported(tile_mode));
    }

    let stride = (bpp / 8) as usize;
    let surf_size = (u64::from(pitch) * u64::from(height) * u64::from(bpp) / 8) as usize;
    if src.len() < surf_size {
        return Err(AddrError::BufferTooShort);
    }

    let (pipe_swizzle, bank_swizzle) = swizzle_fields(swizzle_word);
    let mut out = vec![0u8; surf_size];

    for y in 0..height {
        for x in 0..pitch {
            let linear_addr = (u64::from(y) * u64::from(pitch) + u64::from(x)) * u64::from(bpp) / 8;
            let tiled_addr = tiled_byte_offset(x, y, bpp, pitch, tile_mode, pipe_swizzle, bank_swizzle);

            let (src_addr, dst_addr) = if to_tiled {
                (linear_addr as usize, tiled_addr as usize)
            } else {
                (tiled_addr as usize, linear_addr as usize)
            };

            if src_addr + stride > src.len() || dst_addr + stride > out.len() {
                return Err(AddrError::BufferTooShort);
            }
            out[dst_addr..dst_addr + stride].copy_from_slice(&src[src_addr..src_addr + stride]);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tile_mode_uses_linear_for_scan_buffers() {
        let mode = get_default_tile_mode(
            GX2SurfaceDim::Dim2D,
            64,
            64,
            GX2SurfaceFormat::UNORM_RGBA8,
            GX2AAMode::Mode1X,
            GX2SurfaceUse(GX2SurfaceUse::SCAN_BUFFER),
        )
        .unwrap();
        assert_eq!(TileMode::LinearAligned, mode);
    }

    #[test]
    fn default_tile_mode_uses_1d_for_small_surfaces() {
        let mode = get_default_tile_mode(
            GX2SurfaceDim::Dim2D,
            8,
            8,
            GX2SurfaceFormat::UNORM_RGBA8,
            GX2AAMode::Mode1X,
            GX2SurfaceUse(GX2SurfaceUse::TEXTURE),
        )
        .unwrap();
        assert_eq!(TileMode::Tiled1DThin1, mode);
    }

    #[test]
    fn default_tile_mode_uses_2d_for_large_surfaces() {
        let mode = get_default_tile_mode(
            GX2SurfaceDim::Dim2D,
            256,
            256,
            GX2SurfaceFormat::UNORM_RGBA8,
            GX2AAMode::Mode1X,
            GX2SurfaceUse(GX2SurfaceUse::TEXTURE),
        )
        .unwrap();
        assert_eq!(TileMode::Tiled2DThin1, mode);
    }

    #[test]
    fn surface_info_pads_pitch_and_height_for_2d_tiling() {
        let info = get_surface_info(
            GX2SurfaceFormat::UNORM_RGBA8,
            130,
            63,
            GX2SurfaceDim::Dim2D,
            TileMode::Tiled2DThin1,
            GX2AAMode::Mode1X,
            0,
        )
        .unwrap();
        assert_eq!(0, info.pitch % 32);
        assert_eq!(0, info.height % 16);
    }

    #[test]
    fn surface_info_rejects_thick_tile_modes() {
        let result = get_surface_info(
            GX2SurfaceFormat::UNORM_RGBA8,
            64,
            64,
            GX2SurfaceDim::Dim2D,
            TileMode::Tiled2DThick,
            GX2AAMode::Mode1X,
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn swizzle_then_deswizzle_round_trips_linear_special() {
        let pitch = 16;
        let height = 16;
        let bpp = 32;
        let data: Vec<u8> = (0..(pitch * height * bpp / 8)).map(|i| (i % 251) as u8).collect();

        let tiled = swizzle(pitch, height, bpp, TileMode::LinearSpecial, 0, &data).unwrap();
        let back = deswizzle(pitch, height, bpp, TileMode::LinearSpecial, 0, &tiled).unwrap();
        assert_eq!(data, back);
    }

    #[test]
    fn swizzle_then_deswizzle_round_trips_1d_thin1() {
        let pitch = 32;
        let height = 32;
        let bpp = 32;
        let data: Vec<u8> = (0..(pitch * height * bpp / 8)).map(|i| (i % 251) as u8).collect();

        let tiled = swizzle(pitch, height, bpp, TileMode::Tiled1DThin1, 0, &data).unwrap();
        let back = deswizzle(pitch, height, bpp, TileMode::Tiled1DThin1, 0, &tiled).unwrap();
        assert_eq!(data, back);
    }

    #[test]
    fn swizzle_then_deswizzle_round_trips_2d_thin1_with_swizzle_bits() {
        let pitch = 64;
        let height = 64;
        let bpp = 32;
        let data: Vec<u8> = (0..(pitch * height * bpp / 8)).map(|i| (i % 251) as u8).collect();

        for swizzle_word in [0u32, 0x300, 0x700] {
            let tiled = swizzle(pitch, height, bpp, TileMode::Tiled2DThin1, swizzle_word, &data).unwrap();
            let back = deswizzle(pitch, height, bpp, TileMode::Tiled2DThin1, swizzle_word, &tiled).unwrap();
            assert_eq!(data, back, "round-trip failed for swizzle word {swizzle_word:#x}");
        }
    }

    #[test]
    fn swizzle_then_deswizzle_round_trips_2b_thin1() {
        let pitch = 64;
        let height = 64;
        let bpp = 32;
        let data: Vec<u8> = (0..(pitch * height * bpp / 8)).map(|i| (i % 251) as u8).collect();

        let tiled = swizzle(pitch, height, bpp, TileMode::Tiled2BThin1, 0x500, &data).unwrap();
        let back = deswizzle(pitch, height, bpp, TileMode::Tiled2BThin1, 0x500, &tiled).unwrap();
        assert_eq!(data, back);
    }

    #[test]
    fn tiling_is_a_permutation_not_just_invertible_per_call() {
        // Every output byte index should be touched exactly once.
        let pitch = 32;
        let height = 32;
        let bpp = 32;
        let data: Vec<u8> = vec![0u8; (pitch * height * bpp / 8) as usize];
        let mut touched = vec![false; data.len()];

        for y in 0..height {
            for x in 0..pitch {
                let addr = tiled_byte_offset(x, y, bpp, pitch, TileMode::Tiled2DThin1, 0, 0) as usize;
                assert!(!touched[addr], "collision at {addr} for ({x},{y})");
                touched[addr] = true;
            }
        }
        assert!(touched.iter().all(|&t| t));
    }
}
