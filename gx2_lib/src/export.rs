//! Decodes an already-untiled texture level-by-level into RGBA8, for PNG
//! export. [`GX2Texture::to_linear_2d`] does the untiling (a `Linear_Special`
//! surface never pads pitch/height, see `addrlib::get_surface_info`, so its
//! `image_data`/`mip_data` are already exactly the logical pixel/block bytes
//! per level); this module only does the pixel-format decode on top.

use log::debug;
use thiserror::Error;

use crate::bcn::{self, BcnError};
use crate::format::{ChannelKind, GX2SurfaceFormat};
use crate::reformat::{self, ReformatError};
use crate::surface::{GX2Surface, SurfaceError};
use crate::texture::{Component, GX2Texture, TextureError};
use crate::util::div_round_up;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("surface error")]
    Surface(#[from] SurfaceError),

    #[error("texture error")]
    Texture(#[from] TextureError),

    #[error("BCn decode error")]
    Bcn(#[from] BcnError),

    #[error("reformat error")]
    Reformat(#[from] ReformatError),

    #[error("format {0:?} has no known pixel layout to decode for export")]
    UnsupportedFormat(GX2SurfaceFormat),
}

/// One decoded mip level: dimensions plus tightly-packed RGBA8 bytes.
#[derive(Debug, Clone)]
pub struct RgbaLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

fn level_dims(width: u32, height: u32, mip_level: u32) -> (u32, u32) {
    ((width >> mip_level).max(1), (height >> mip_level).max(1))
}

fn level_byte_len(format: GX2SurfaceFormat, width: u32, height: u32) -> usize {
    let blk = if format.is_compressed() { 4 } else { 1 };
    let bytes_per_unit = div_round_up(format.bits_per_pixel().unwrap_or(8), 8) as usize;
    div_round_up(width, blk) as usize * div_round_up(height, blk) as usize * bytes_per_unit
}

/// Slices out one mip level's bytes from an already-untiled `Linear_Special`
/// surface, following the same `mip_offset` convention `copy_surface` writes
/// (level 1 starts at `mip_data[0]`, later levels at `mip_offset[level - 1]`).
fn mip_level_bytes(linear: &GX2Surface, mip_level: u32) -> &[u8] {
    let (width, height) = level_dims(linear.width, linear.height, mip_level);
    let len = level_byte_len(linear.format, width, height);

    if mip_level == 0 {
        &linear.image_data[..len.min(linear.image_data.len())]
    } else {
        let start = if mip_level == 1 {
            0
        } else {
            linear.mip_offset[(mip_level - 1) as usize] as usize
        };
        let end = (start + len).min(linear.mip_data.len());
        &linear.mip_data[start.min(end)..end]
    }
}

fn decode_level(
    format: GX2SurfaceFormat,
    width: u32,
    height: u32,
    data: &[u8],
    comp_sel: [Component; 4],
) -> Result<Vec<u8>, ExportError> {
    let kind = format.channel_kind().ok_or(ExportError::UnsupportedFormat(format))?;

    Ok(match kind {
        ChannelKind::Bc1 => reformat::remap_rgba8(&bcn::decode_bc1(width, height, data)?, comp_sel),
        ChannelKind::Bc2 => reformat::remap_rgba8(&bcn::decode_bc2(width, height, data)?, comp_sel),
        ChannelKind::Bc3 => reformat::remap_rgba8(&bcn::decode_bc3(width, height, data)?, comp_sel),
        ChannelKind::Bc4 => {
            let single = bcn::decode_bc4(width, height, data, format.is_snorm())?;
            let native: Vec<u8> = single.iter().flat_map(|&v| [v, 0, 0, 0]).collect();
            reformat::remap_rgba8(&native, comp_sel)
        }
        ChannelKind::Bc5 => reformat::remap_rgba8(&bcn::decode_bc5(width, height, data, format.is_snorm())?, comp_sel),
        other => {
            let bytes_per_pixel = div_round_up(format.bits_per_pixel().unwrap_or(8), 8);
            reformat::to_rgba8(width, height, data, other, bytes_per_pixel, comp_sel)?
        }
    })
}

/// A finite, non-restartable sequence of decoded RGBA8 mip levels, base
/// level first. Construct with [`rgba_mip_levels`]; the whole texture is
/// untiled up front (tiling is level-interleaved in memory for a retiled
/// surface, so there's no way to decode one level without the others), but
/// BCn/reformat decoding happens lazily as the iterator is advanced.
pub struct RgbaMipLevels {
    linear: GX2Surface,
    comp_sel: [Component; 4],
    next_level: u32,
}

impl Iterator for RgbaMipLevels {
    type Item = Result<RgbaLevel, ExportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_level >= self.linear.num_mips {
            return None;
        }

        let level = self.next_level;
        self.next_level += 1;

        let (width, height) = level_dims(self.linear.width, self.linear.height, level);
        debug!("decoding mip level {level} ({width}x{height})");
        let data = mip_level_bytes(&self.linear, level);

        Some(decode_level(self.linear.format, width, height, data, self.comp_sel).map(|pixels| RgbaLevel {
            width,
            height,
            pixels,
        }))
    }
}

/// Untiles `texture` and returns a lazily-decoding iterator over its mip
/// levels, base level first.
pub fn rgba_mip_levels(texture: &GX2Texture) -> Result<RgbaMipLevels, ExportError> {
    let linear = texture.to_linear_2d()?;
    let comp_sel = texture.comp_sel.as_array()?;

    Ok(RgbaMipLevels {
        linear,
        comp_sel,
        next_level: 0,
    })
}

#[cfg(feature = "image")]
impl RgbaLevel {
    /// Converts this level into an [`image::RgbaImage`] for encoding.
    pub fn into_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrlib::TileMode;
    use crate::format::GX2SurfaceFormat;
    use crate::texture::CompSel;

    #[test]
    fn untiled_rgba8_level_matches_source_bytes() {
        let width = 32;
        let height = 32;
        let image_data: Vec<u8> = (0..width * height * 4).map(|i| (i % 251) as u8).collect();

        let texture = GX2Texture::from_linear_2d(
            width,
            height,
            1,
            GX2SurfaceFormat::UNORM_RGBA8,
            CompSel::RGBA,
            &image_data,
            &[],
            TileMode::Tiled2DThin1,
            0,
            0,
            7,
        )
        .unwrap();

        let mut levels = rgba_mip_levels(&texture).unwrap();
        let level = levels.next().unwrap().unwrap();
        assert_eq!(width, level.width);
        assert_eq!(height, level.height);
        assert_eq!(image_data, level.pixels);
        assert!(levels.next().is_none());
    }

    #[test]
    fn comp_sel_is_applied_when_decoding() {
        let width = 8;
        let height = 8;
        let image_data = vec![0x40u8; (width * height) as usize];

        let texture = GX2Texture::from_linear_2d(
            width,
            height,
            1,
            GX2SurfaceFormat::UNORM_R8,
            CompSel::new(Component::R, Component::R, Component::R, Component::One),
            &image_data,
            &[],
            TileMode::Tiled1DThin1,
            0,
            0,
            7,
        )
        .unwrap();

        let mut levels = rgba_mip_levels(&texture).unwrap();
        let level = levels.next().unwrap().unwrap();
        for pixel in level.pixels.chunks_exact(4) {
            assert_eq!([0x40, 0x40, 0x40, 255], pixel);
        }
    }

    #[test]
    fn multi_mip_texture_decodes_every_level() {
        let width = 32;
        let height = 32;
        let num_mips = 3;
        let image_data = vec![0xffu8; (width * height * 4) as usize];
        let mip_data = vec![0xffu8; (width * height) as usize];

        let texture = GX2Texture::from_linear_2d(
            width,
            height,
            num_mips,
            GX2SurfaceFormat::UNORM_RGBA8,
            CompSel::RGBA,
            &image_data,
            &mip_data,
            TileMode::Tiled2DThin1,
            0,
            0,
            7,
        )
        .unwrap();

        let levels: Vec<_> = rgba_mip_levels(&texture).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(3, levels.len());
        assert_eq!((32, 32), (levels[0].width, levels[0].height));
        assert_eq!((16, 16), (levels[1].width, levels[1].height));
        assert_eq!((8, 8), (levels[2].width, levels[2].height));
    }
}
