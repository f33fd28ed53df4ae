//! `GX2Surface`: the on-disk descriptor of one GPU image (dimensions,
//! format, tiling) plus its image/mip byte buffers, and the geometry and
//! retiling operations built on top of it.

use binrw::{BinRead, BinWrite};

use crate::addrlib::{self, AddrError, SurfaceInfo, TileMode};
use crate::enums::{GX2AAMode, GX2SurfaceDim, GX2SurfaceUse};
use crate::format::GX2SurfaceFormat;
use crate::util::{div_round_up, round_up};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface tiling error")]
    Addr(#[from] AddrError),

    #[error("unrecognized surface dimension code {0:#x}")]
    UnknownDim(u32),

    #[error("unrecognized antialiasing mode code {0:#x}")]
    UnknownAaMode(u32),

    #[error("unrecognized tile mode code {0:#x}")]
    UnknownTileMode(u32),

    #[error("source and destination surfaces in copy_surface must share dim/width/height/format")]
    IncompatibleCopy,

    #[error("copy_surface only supports a tiling depth of 1; thick tile modes are rejected upstream")]
    UnsupportedTilingDepth,

    #[error("image data length {got} does not match the {expected}-byte size calc_surface_size_and_alignment computed")]
    ImageDataLength { expected: u64, got: usize },
}

/// The raw 116-byte, big-endian `GX2Surface` record. Kept distinct from
/// [`GX2Surface`] so binrw only ever sees plain integers; the enum/bitset
/// wrapping happens in [`GX2Surface::from_raw`]/[`GX2Surface::to_raw`].
#[derive(Debug, Clone, Copy, BinRead, BinWrite, PartialEq, Eq)]
#[brw(big)]
pub struct GX2SurfaceRaw {
    pub dim: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub num_mips: u32,
    pub format: u32,
    pub aa: u32,
    pub use_: u32,
    pub image_size: u32,
    pub image_ptr: u32,
    pub mip_size: u32,
    pub mip_ptr: u32,
    pub tile_mode: u32,
    pub swizzle: u32,
    pub alignment: u32,
    pub pitch: u32,
    pub mip_offset: [u32; 13],
}

pub const SURFACE_SIZE: usize = 0x74;

#[derive(Debug, Clone)]
pub struct GX2Surface {
    pub dim: GX2SurfaceDim,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub num_mips: u32,
    pub format: GX2SurfaceFormat,
    pub aa: GX2AAMode,
    pub use_: GX2SurfaceUse,
    pub image_size: u32,
    pub image_data: Vec<u8>,
    pub mip_size: u32,
    pub mip_data: Vec<u8>,
    pub tile_mode: TileMode,
    pub swizzle: u32,
    pub alignment: u32,
    pub pitch: u32,
    pub mip_offset: [u32; 13],
}

impl GX2Surface {
    pub fn new(dim: GX2SurfaceDim, width: u32, height: u32, format: GX2SurfaceFormat) -> Self {
        Self {
            dim,
            width,
            height,
            depth: 1,
            num_mips: 1,
            format,
            aa: GX2AAMode::Mode1X,
            use_: GX2SurfaceUse(GX2SurfaceUse::TEXTURE),
            image_size: 0,
            image_data: Vec::new(),
            mip_size: 0,
            mip_data: Vec::new(),
            tile_mode: TileMode::Default,
            swizzle: 0,
            alignment: 0,
            pitch: 0,
            mip_offset: [0; 13],
        }
    }

    /// Parses the header fields from a raw record, without populating
    /// `image_data`/`mip_data` (the caller slices those out of the
    /// container's surrounding block framing).
    pub fn from_raw(raw: GX2SurfaceRaw) -> Result<Self, SurfaceError> {
        let dim = GX2SurfaceDim::try_from(raw.dim).map_err(SurfaceError::UnknownDim)?;
        let format = GX2SurfaceFormat::from(raw.format);
        let aa = GX2AAMode::try_from(raw.aa).map_err(SurfaceError::UnknownAaMode)?;
        let tile_mode = TileMode::try_from(raw.tile_mode).map_err(SurfaceError::UnknownTileMode)?;

        Ok(Self {
            dim,
            width: raw.width,
            height: raw.height,
            depth: if raw.depth == 0 { 1 } else { raw.depth },
            num_mips: if raw.num_mips == 0 { 1 } else { raw.num_mips },
            format,
            aa,
            use_: GX2SurfaceUse(raw.use_),
            image_size: raw.image_size,
            image_data: Vec::new(),
            mip_size: raw.mip_size,
            mip_data: Vec::new(),
            tile_mode,
            swizzle: raw.swizzle,
            alignment: raw.alignment,
            pitch: raw.pitch,
            mip_offset: raw.mip_offset,
        })
    }

    pub fn to_raw(&self) -> GX2SurfaceRaw {
        GX2SurfaceRaw {
            dim: self.dim as u32,
            width: self.width,
            height: self.height,
            depth: self.depth,
            num_mips: self.num_mips,
            format: self.format.0,
            aa: self.aa as u32,
            use_: self.use_.0,
            image_size: self.image_size,
            image_ptr: 0,
            mip_size: self.mip_size,
            mip_ptr: 0,
            tile_mode: self.tile_mode as u32,
            swizzle: self.swizzle,
            alignment: self.alignment,
            pitch: self.pitch,
            mip_offset: self.mip_offset,
        }
    }

    fn surface_info_at(&self, tile_mode: TileMode, mip_level: u32) -> Result<SurfaceInfo, SurfaceError> {
        addrlib::get_surface_info(self.format, self.width, self.height, self.dim, tile_mode, self.aa, mip_level)
            .map_err(SurfaceError::from)
    }

    /// Resolves `Default` tiling, then fills `pitch`/`alignment`/`image_size`
    /// for level 0 and walks the mip chain to compute `mip_size` and
    /// `mip_offset`, tracking the level at which 2D tiling degrades to 1D
    /// (stored in `swizzle` bits 16..19, used by `copy_surface`/register
    /// synthesis).
    pub fn calc_surface_size_and_alignment(&mut self) -> Result<(), SurfaceError> {
        if matches!(self.tile_mode, TileMode::Default) {
            self.tile_mode =
                addrlib::get_default_tile_mode(self.dim, self.width, self.height, self.format, self.aa, self.use_)?;
        }

        let base_info = self.surface_info_at(self.tile_mode, 0)?;
        self.image_size = base_info.surf_size as u32;
        self.alignment = base_info.base_align;
        self.pitch = base_info.pitch;

        self.swizzle &= 0x0700;

        let mut tiling_1d_level = 0u32;
        let mut tiling_1d_level_set = matches!(
            base_info.tile_mode,
            TileMode::LinearAligned | TileMode::LinearSpecial | TileMode::Tiled1DThin1 | TileMode::Tiled1DThick
        );
        if !tiling_1d_level_set {
            tiling_1d_level += 1;
        }

        self.mip_size = 0;
        for mip_level in 1..self.num_mips {
            let info = self.surface_info_at(self.tile_mode, mip_level)?;

            self.mip_size = round_up(self.mip_size, info.base_align);

            if mip_level == 1 {
                self.mip_offset[0] = round_up(self.image_size, info.base_align);
            } else {
                self.mip_offset[(mip_level - 1) as usize] = self.mip_size;
            }

            self.mip_size += info.surf_size as u32;

            if !tiling_1d_level_set {
                if matches!(info.tile_mode, TileMode::Tiled1DThin1 | TileMode::Tiled1DThick) {
                    tiling_1d_level_set = true;
                } else {
                    tiling_1d_level += 1;
                }
            }
        }

        if !tiling_1d_level_set {
            tiling_1d_level = 13;
        }
        self.swizzle |= tiling_1d_level << 16;

        for mip_level in self.num_mips..14 {
            self.mip_offset[(mip_level - 1) as usize] = 0;
        }

        Ok(())
    }

    fn can_copy_without_retiling(src: &GX2Surface, dst: &GX2Surface) -> bool {
        let tile_mode_matches = src.tile_mode as u32 == dst.tile_mode as u32
            && (matches!(src.tile_mode, TileMode::LinearAligned | TileMode::LinearSpecial)
                || ((src.swizzle >> 8) & 7) == ((dst.swizzle >> 8) & 7));

        let depth_matches =
            (src.depth == dst.depth && (src.depth == 1 || src.num_mips == dst.num_mips)) || src.num_mips == 1;

        tile_mode_matches && depth_matches
    }

    /// Retiles `src`'s image/mip data into `dst`'s tile mode and swizzle,
    /// or does a plain byte copy when both surfaces already agree closely
    /// enough that no retiling is observable.
    pub fn copy_surface(src: &GX2Surface, dst: &mut GX2Surface) -> Result<(), SurfaceError> {
        if dst.dim != src.dim || dst.width != src.width || dst.height != src.height || dst.format != src.format {
            return Err(SurfaceError::IncompatibleCopy);
        }

        if Self::can_copy_without_retiling(src, dst) {
            let image_len = (dst.image_size as usize).min(src.image_data.len());
            let mip_len = (dst.mip_size as usize).min(src.mip_data.len());
            dst.image_data = src.image_data[..image_len].to_vec();
            dst.mip_data = src.mip_data[..mip_len].to_vec();
            return Ok(());
        }

        let blk = if src.format.is_compressed() { 4 } else { 1 };
        let bytes_per_pixel = div_round_up(src.format.bits_per_pixel().unwrap_or(8), 8);

        let mut levels = Vec::with_capacity(dst.num_mips as usize);

        let base_info = src.surface_info_at(src.tile_mode, 0)?;
        if base_info.depth != 1 {
            return Err(SurfaceError::UnsupportedTilingDepth);
        }
        let linear = addrlib::deswizzle(
            base_info.pitch,
            base_info.height,
            base_info.bpp,
            base_info.tile_mode,
            src.swizzle,
            &src.image_data,
        )?;
        let logical_size = (div_round_up(src.width, blk) * div_round_up(src.height, blk) * bytes_per_pixel) as usize;
        levels.push(linear[..logical_size.min(linear.len())].to_vec());

        let mut offset = 0usize;
        for mip_level in 1..dst.num_mips {
            let width = (src.width >> mip_level).max(1);
            let height = (src.height >> mip_level).max(1);

            let info = src.surface_info_at(src.tile_mode, mip_level)?;
            let end = offset + info.surf_size as usize;
            let slice = src.mip_data.get(offset..end).ok_or(SurfaceError::ImageDataLength {
                expected: info.surf_size,
                got: src.mip_data.len(),
            })?;

            let linear = addrlib::deswizzle(info.pitch, info.height, info.bpp, info.tile_mode, src.swizzle, slice)?;
            let logical_size = (div_round_up(width, blk) * div_round_up(height, blk) * bytes_per_pixel) as usize;
            levels.push(linear[..logical_size.min(linear.len())].to_vec());

            if mip_level < src.num_mips - 1 {
                offset = src.mip_offset[mip_level as usize] as usize;
            }
        }

        let dst_base_info = dst.surface_info_at(dst.tile_mode, 0)?;
        if dst_base_info.depth != 1 {
            return Err(SurfaceError::UnsupportedTilingDepth);
        }

        let mut padded = levels[0].clone();
        padded.resize(dst_base_info.surf_size as usize, 0);
        let tiled = addrlib::swizzle(
            dst_base_info.pitch,
            dst_base_info.height,
            dst_base_info.bpp,
            dst_base_info.tile_mode,
            dst.swizzle,
            &padded,
        )?;
        dst.image_data = tiled[..dst_base_info.surf_size as usize].to_vec();

        let mut mip_data = Vec::new();
        for mip_level in 1..dst.num_mips {
            let info = dst.surface_info_at(dst.tile_mode, mip_level)?;

            if mip_level != 1 {
                let target = dst.mip_offset[(mip_level - 1) as usize] as usize;
                if target > mip_data.len() {
                    mip_data.resize(target, 0);
                }
            }

            let mut padded = levels[mip_level as usize].clone();
            padded.resize(info.surf_size as usize, 0);
            let tiled = addrlib::swizzle(info.pitch, info.height, info.bpp, info.tile_mode, dst.swizzle, &padded)?;
            mip_data.extend_from_slice(&tiled[..info.surf_size as usize]);
        }
        dst.mip_data = mip_data;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_struct_round_trips_through_binrw() {
        let raw = GX2SurfaceRaw {
            dim: 1,
            width: 64,
            height: 32,
            depth: 1,
            num_mips: 1,
            format: GX2SurfaceFormat::UNORM_RGBA8.0,
            aa: 0,
            use_: 1,
            image_size: 8192,
            image_ptr: 0,
            mip_size: 0,
            mip_ptr: 0,
            tile_mode: 1,
            swizzle: 0,
            alignment: 256,
            pitch: 64,
            mip_offset: [0; 13],
        };

        let mut buf = std::io::Cursor::new(Vec::new());
        raw.write(&mut buf).unwrap();
        assert_eq!(SURFACE_SIZE, buf.get_ref().len());

        let mut reader = std::io::Cursor::new(buf.into_inner());
        let parsed = GX2SurfaceRaw::read(&mut reader).unwrap();
        assert_eq!(raw, parsed);
    }

    #[test]
    fn calc_surface_size_and_alignment_resolves_default_tile_mode() {
        let mut surface = GX2Surface::new(GX2SurfaceDim::Dim2D, 64, 64, GX2SurfaceFormat::UNORM_RGBA8);
        surface.calc_surface_size_and_alignment().unwrap();

        assert_ne!(TileMode::Default as u32, surface.tile_mode as u32);
        assert_ne!(0, surface.image_size);
        assert_ne!(0, surface.alignment);
        assert_ne!(0, surface.pitch);
    }

    #[test]
    fn mip_offsets_are_strictly_increasing_across_levels() {
        let mut surface = GX2Surface::new(GX2SurfaceDim::Dim2D, 128, 128, GX2SurfaceFormat::UNORM_RGBA8);
        surface.num_mips = 4;
        surface.calc_surface_size_and_alignment().unwrap();

        for i in 0..surface.num_mips as usize - 2 {
            assert!(surface.mip_offset[i] < surface.mip_offset[i + 1]);
        }
    }

    #[test]
    fn copy_surface_requires_matching_dim_width_height_format() {
        let mut src = GX2Surface::new(GX2SurfaceDim::Dim2D, 64, 64, GX2SurfaceFormat::UNORM_RGBA8);
        src.calc_surface_size_and_alignment().unwrap();
        let mut dst = GX2Surface::new(GX2SurfaceDim::Dim2D, 32, 32, GX2SurfaceFormat::UNORM_RGBA8);
        dst.calc_surface_size_and_alignment().unwrap();

        assert!(GX2Surface::copy_surface(&src, &mut dst).is_err());
    }

    #[test]
    fn copy_surface_retiles_linear_special_into_tiled_2d() {
        let width = 64;
        let height = 64;

        let mut src = GX2Surface::new(GX2SurfaceDim::Dim2D, width, height, GX2SurfaceFormat::UNORM_RGBA8);
        src.tile_mode = TileMode::LinearSpecial;
        src.calc_surface_size_and_alignment().unwrap();
        src.image_data = (0..src.image_size).map(|i| (i % 251) as u8).collect();

        let mut dst = GX2Surface::new(GX2SurfaceDim::Dim2D, width, height, GX2SurfaceFormat::UNORM_RGBA8);
        dst.tile_mode = TileMode::Tiled2DThin1;
        dst.calc_surface_size_and_alignment().unwrap();

        GX2Surface::copy_surface(&src, &mut dst).unwrap();
        assert_eq!(dst.image_size as usize, dst.image_data.len());

        // Untiling what we just tiled should recover the original pixels.
        let mut back = GX2Surface::new(GX2SurfaceDim::Dim2D, width, height, GX2SurfaceFormat::UNORM_RGBA8);
        back.tile_mode = TileMode::LinearSpecial;
        back.calc_surface_size_and_alignment().unwrap();

        GX2Surface::copy_surface(&dst, &mut back).unwrap();
        assert_eq!(src.image_data, back.image_data);
    }
}
