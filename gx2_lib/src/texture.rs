//! `GX2Texture`: a surface plus the mip/slice view GX2 samples from it and
//! the five hardware register words describing it to the GPU.

use binrw::{BinRead, BinWrite};
use thiserror::Error;

use crate::addrlib::TileMode;
use crate::enums::{GX2AAMode, GX2SurfaceDim, GX2SurfaceUse};
use crate::format::GX2SurfaceFormat;
use crate::regs::calc_regs;
use crate::surface::{GX2Surface, GX2SurfaceRaw, SurfaceError, SURFACE_SIZE};

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("surface error")]
    Surface(#[from] SurfaceError),

    #[error("texture surface does not have antialiasing mode 1x")]
    NotSingleSampled,

    #[error("texture surface's use bitset does not include Texture")]
    NotATexture,

    #[error("component selector byte {0:#x} is not one of Red/Green/Blue/Alpha/Zero/One")]
    UnknownComponent(u8),

    #[error("view first_mip={first_mip} num_mips={num_mips} exceeds surface num_mips={surface_num_mips}")]
    MipViewOutOfRange {
        first_mip: u32,
        num_mips: u32,
        surface_num_mips: u32,
    },

    #[error("view first_slice={first_slice} num_slices={num_slices} exceeds surface depth={surface_depth}")]
    SliceViewOutOfRange {
        first_slice: u32,
        num_slices: u32,
        surface_depth: u32,
    },

    #[error("image data is {got} bytes, expected {expected} from calc_surface_size_and_alignment")]
    ImageDataLength { expected: u32, got: usize },
}

/// `GX2CompSel::Component`. `Zero`/`One` are constant sources, not channels
/// of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Component {
    R = 0,
    G = 1,
    B = 2,
    A = 3,
    Zero = 4,
    One = 5,
}

impl TryFrom<u8> for Component {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::R,
            1 => Self::G,
            2 => Self::B,
            3 => Self::A,
            4 => Self::Zero,
            5 => Self::One,
            other => return Err(other),
        })
    }
}

/// Four component selectors packed big-endian into one 32-bit word, one
/// byte per destination channel (R, G, B, A in that order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompSel(pub u32);

impl CompSel {
    /// `GX2CompSel.RGBA`: every channel from its matching source channel.
    pub const RGBA: Self = Self(0x00010203);
    /// `GX2CompSel.ZZZO`: the default for a surface with no texture data
    /// bound yet — reads as opaque black.
    pub const ZZZO: Self = Self(0x04040405);

    pub fn new(x: Component, y: Component, z: Component, w: Component) -> Self {
        Self((x as u32) << 24 | (y as u32) << 16 | (z as u32) << 8 | (w as u32))
    }

    fn component(self, index: u32) -> Result<Component, TextureError> {
        let byte = ((self.0 >> (24 - 8 * index)) & 0xff) as u8;
        Component::try_from(byte).map_err(TextureError::UnknownComponent)
    }

    pub fn x(self) -> u8 {
        ((self.0 >> 24) & 0xff) as u8
    }
    pub fn y(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }
    pub fn z(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }
    pub fn w(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// The four selectors in destination-channel order (R, G, B, A).
    pub fn as_array(self) -> Result<[Component; 4], TextureError> {
        Ok([
            self.component(0)?,
            self.component(1)?,
            self.component(2)?,
            self.component(3)?,
        ])
    }
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite, PartialEq, Eq)]
#[brw(big)]
pub struct GX2TextureViewRaw {
    pub view_first_mip: u32,
    pub view_num_mips: u32,
    pub view_first_slice: u32,
    pub view_num_slices: u32,
    pub comp_sel: u32,
    pub regs: [u32; 5],
}

pub const TEXTURE_SIZE: usize = SURFACE_SIZE + 0x28;

#[derive(Debug, Clone)]
pub struct GX2Texture {
    pub surface: GX2Surface,
    pub view_first_mip: u32,
    pub view_num_mips: u32,
    pub view_first_slice: u32,
    pub view_num_slices: u32,
    pub comp_sel: CompSel,
    pub regs: [u32; 5],
}

impl GX2Texture {
    pub fn from_parts(surface: GX2Surface, view: GX2TextureViewRaw) -> Result<Self, TextureError> {
        if surface.aa != GX2AAMode::Mode1X {
            return Err(TextureError::NotSingleSampled);
        }
        if !surface.use_.contains_texture() {
            return Err(TextureError::NotATexture);
        }

        let view_num_mips = if view.view_num_mips == 0 { 1 } else { view.view_num_mips };
        let view_num_slices = if view.view_num_slices == 0 { 1 } else { view.view_num_slices };

        if view.view_first_mip >= surface.num_mips || view_num_mips > surface.num_mips - view.view_first_mip {
            return Err(TextureError::MipViewOutOfRange {
                first_mip: view.view_first_mip,
                num_mips: view_num_mips,
                surface_num_mips: surface.num_mips,
            });
        }
        if view.view_first_slice >= surface.depth || view_num_slices > surface.depth - view.view_first_slice {
            return Err(TextureError::SliceViewOutOfRange {
                first_slice: view.view_first_slice,
                num_slices: view_num_slices,
                surface_depth: surface.depth,
            });
        }

        Ok(Self {
            surface,
            view_first_mip: view.view_first_mip,
            view_num_mips,
            view_first_slice: view.view_first_slice,
            view_num_slices,
            comp_sel: CompSel(view.comp_sel),
            regs: view.regs,
        })
    }

    pub fn raw_view(&self) -> GX2TextureViewRaw {
        GX2TextureViewRaw {
            view_first_mip: self.view_first_mip,
            view_num_mips: self.view_num_mips,
            view_first_slice: self.view_first_slice,
            view_num_slices: self.view_num_slices,
            comp_sel: self.comp_sel.0,
            regs: self.regs,
        }
    }

    /// Packs `regs` from the surface's current geometry. Called after
    /// `calc_surface_size_and_alignment` so pitch/tile_mode are final.
    pub fn init_texture_regs(&mut self, surf_mode: u32, perf_modulation: u32) {
        let pitch = if self.surface.format.is_compressed() {
            self.surface.pitch * 4
        } else {
            self.surface.pitch
        };

        self.regs = calc_regs(
            self.surface.width,
            self.surface.height,
            self.surface.num_mips,
            self.surface.format,
            self.surface.tile_mode as u32,
            pitch,
            self.comp_sel,
            surf_mode,
            perf_modulation,
        );
    }

    /// Builds a texture from scratch: fills a new surface, computes its
    /// size/alignment, sets the view to span the whole resource, and packs
    /// registers.
    #[allow(clippy::too_many_arguments)]
    pub fn init_texture(
        dim: GX2SurfaceDim,
        width: u32,
        height: u32,
        depth: u32,
        num_mips: u32,
        format: GX2SurfaceFormat,
        comp_sel: CompSel,
        tile_mode: TileMode,
        swizzle: u32,
        surf_mode: u32,
        perf_modulation: u32,
    ) -> Result<Self, TextureError> {
        let mut surface = GX2Surface::new(dim, width, height, format);
        surface.depth = depth;
        surface.num_mips = num_mips;
        surface.tile_mode = tile_mode;
        surface.swizzle = swizzle << 8;

        surface.calc_surface_size_and_alignment()?;

        let mut texture = Self {
            surface,
            view_first_mip: 0,
            view_num_mips: num_mips,
            view_first_slice: 0,
            view_num_slices: depth,
            comp_sel,
            regs: [0; 5],
        };
        texture.init_texture_regs(surf_mode, perf_modulation);
        Ok(texture)
    }

    /// Tiles a linear (row-major) image into a fresh texture with the
    /// requested tile mode, by building an intermediate `Linear_Special`
    /// texture and retiling through [`GX2Surface::copy_surface`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_linear_2d(
        width: u32,
        height: u32,
        num_mips: u32,
        format: GX2SurfaceFormat,
        comp_sel: CompSel,
        image_data: &[u8],
        mip_data: &[u8],
        tile_mode: TileMode,
        swizzle: u32,
        surf_mode: u32,
        perf_modulation: u32,
    ) -> Result<Self, TextureError> {
        let mut linear = Self::init_texture(
            GX2SurfaceDim::Dim2D,
            width,
            height,
            1,
            num_mips,
            format,
            comp_sel,
            TileMode::LinearSpecial,
            0,
            0,
            7,
        )?;

        if image_data.len() < linear.surface.image_size as usize {
            return Err(TextureError::ImageDataLength {
                expected: linear.surface.image_size,
                got: image_data.len(),
            });
        }
        linear.surface.image_data = image_data[..linear.surface.image_size as usize].to_vec();

        if num_mips > 1 {
            if mip_data.len() < linear.surface.mip_size as usize {
                return Err(TextureError::ImageDataLength {
                    expected: linear.surface.mip_size,
                    got: mip_data.len(),
                });
            }
            linear.surface.mip_data = mip_data[..linear.surface.mip_size as usize].to_vec();
        }

        let mut texture = Self::init_texture(
            GX2SurfaceDim::Dim2D,
            width,
            height,
            1,
            num_mips,
            format,
            comp_sel,
            tile_mode,
            swizzle,
            surf_mode,
            perf_modulation,
        )?;

        GX2Surface::copy_surface(&linear.surface, &mut texture.surface)?;

        Ok(texture)
    }

    /// Untiles this texture into a fresh `Linear_Special` surface, the
    /// inverse of [`Self::from_linear_2d`]. Used by both DDS export (which
    /// writes the untiled bytes back out directly) and PNG export (which
    /// further decodes them through [`crate::bcn`]/[`crate::reformat`]).
    pub fn to_linear_2d(&self) -> Result<GX2Surface, TextureError> {
        let src = &self.surface;

        let mut linear = GX2Surface::new(src.dim, src.width, src.height, src.format);
        linear.depth = src.depth;
        linear.num_mips = src.num_mips;
        linear.tile_mode = TileMode::LinearSpecial;
        linear.calc_surface_size_and_alignment()?;

        GX2Surface::copy_surface(src, &mut linear)?;
        Ok(linear)
    }
}

/// Reads the raw 180-byte record (surface + view fields) into typed parts.
pub fn read_raw<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
) -> Result<(GX2SurfaceRaw, GX2TextureViewRaw), binrw::Error> {
    let surface = GX2SurfaceRaw::read(reader)?;
    let view = GX2TextureViewRaw::read(reader)?;
    Ok((surface, view))
}

/// Writes the raw 180-byte record.
pub fn write_raw<W: std::io::Write + std::io::Seek>(
    writer: &mut W,
    surface: &GX2SurfaceRaw,
    view: &GX2TextureViewRaw,
) -> Result<(), binrw::Error> {
    surface.write(writer)?;
    view.write(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comp_sel_rgba_decomposes_to_identity_mapping() {
        let parts = CompSel::RGBA.as_array().unwrap();
        assert_eq!([Component::R, Component::G, Component::B, Component::A], parts);
    }

    #[test]
    fn comp_sel_zzzo_reads_as_zero_zero_zero_one() {
        let parts = CompSel::ZZZO.as_array().unwrap();
        assert_eq!([Component::Zero, Component::Zero, Component::Zero, Component::One], parts);
    }

    #[test]
    fn comp_sel_new_round_trips_through_the_byte_accessors() {
        let sel = CompSel::new(Component::B, Component::G, Component::R, Component::One);
        assert_eq!(Component::B as u8, sel.x());
        assert_eq!(Component::G as u8, sel.y());
        assert_eq!(Component::R as u8, sel.z());
        assert_eq!(Component::One as u8, sel.w());
    }

    #[test]
    fn init_texture_spans_the_whole_resource_by_default() {
        let texture = GX2Texture::init_texture(
            GX2SurfaceDim::Dim2D,
            64,
            64,
            1,
            3,
            GX2SurfaceFormat::UNORM_RGBA8,
            CompSel::RGBA,
            TileMode::Tiled2DThin1,
            0,
            0,
            7,
        )
        .unwrap();

        assert_eq!(0, texture.view_first_mip);
        assert_eq!(3, texture.view_num_mips);
        assert_eq!(0, texture.view_first_slice);
        assert_eq!(1, texture.view_num_slices);
        assert_ne!([0; 5], texture.regs);
    }

    #[test]
    fn from_linear_2d_tiles_image_data_into_the_target_surface() {
        let width = 64;
        let height = 64;
        let image_data = vec![0xabu8; (width * height * 4) as usize];

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

        assert_eq!(texture.surface.image_size as usize, texture.surface.image_data.len());
    }
}
