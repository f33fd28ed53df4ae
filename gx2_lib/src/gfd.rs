//! GFD container framing: the `Gfx2` file header and `BLK{` block headers
//! wrapping a sequence of GX2 textures, plus the file-level parse/save that
//! stitches texture header blocks back together with their image and mip
//! data blocks.

use thiserror::Error;

use crate::surface::{GX2Surface, SurfaceError};
use crate::texture::{read_raw, write_raw, GX2Texture, TextureError, TEXTURE_SIZE};
use crate::util::round_up;

#[derive(Debug, Error)]
pub enum GfdError {
    #[error("not a valid GFD file: {0}")]
    Malformed(&'static str),

    #[error("file major version {0} is not 6 or 7")]
    UnknownFileVersion(u32),

    #[error("block header major version {0} is not 0 or 1")]
    UnknownBlockVersion(u32),

    #[error("texture header block data_size is {got}, expected {expected}")]
    TextureHeaderSize { expected: usize, got: u32 },

    #[error("image data block is {got} bytes, texture declares image_size={expected}")]
    ImageDataSize { expected: u32, got: usize },

    #[error("mip data block is {got} bytes, texture declares mip_size={expected}")]
    MipDataSize { expected: u32, got: usize },

    #[error("input is {got} bytes, expected at least {expected}")]
    InputLength { expected: usize, got: usize },

    #[error("surface error")]
    Surface(#[from] SurfaceError),

    #[error("texture error")]
    Texture(#[from] TextureError),

    #[error("binrw error")]
    Binrw(#[from] binrw::Error),

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// `GFDBlockTypeV0`/`GFDBlockTypeV1`. Only the ids this crate's scope
/// touches are named; shader/Usr/reserved blocks are valid but opaque and
/// skipped by `data_size` during parsing.
mod block_type {
    pub const INVALID: u32 = 0;
    pub const END: u32 = 1;
    pub const PAD: u32 = 2;

    pub const V0_TEXTURE_HEADER: u32 = 10;
    pub const V0_IMAGE_DATA: u32 = 11;
    pub const V0_MIP_DATA: u32 = 12;

    pub const V1_TEXTURE_HEADER: u32 = 11;
    pub const V1_IMAGE_DATA: u32 = 12;
    pub const V1_MIP_DATA: u32 = 13;
}

fn texture_block_ids(block_major_version: u32) -> (u32, u32, u32) {
    if block_major_version == 1 {
        (block_type::V1_TEXTURE_HEADER, block_type::V1_IMAGE_DATA, block_type::V1_MIP_DATA)
    } else {
        (block_type::V0_TEXTURE_HEADER, block_type::V0_IMAGE_DATA, block_type::V0_MIP_DATA)
    }
}

const GPU_VERSION: u32 = 2;

pub const HEADER_SIZE: usize = 0x20;
pub const BLOCK_HEADER_SIZE: usize = 0x20;

/// The 32-byte `Gfx2` file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfdHeader {
    pub major_version: u32,
    pub minor_version: u32,
    pub align_enabled: bool,
}

impl Default for GfdHeader {
    fn default() -> Self {
        Self {
            major_version: 7,
            minor_version: 1,
            align_enabled: true,
        }
    }
}

impl GfdHeader {
    pub fn parse(data: &[u8]) -> Result<Self, GfdError> {
        if data.len() < HEADER_SIZE {
            return Err(GfdError::InputLength {
                expected: HEADER_SIZE,
                got: data.len(),
            });
        }
        if &data[0..4] != b"Gfx2" {
            return Err(GfdError::Malformed("magic"));
        }

        let size = u32::from_be_bytes(data[4..8].try_into().unwrap());
        let major_version = u32::from_be_bytes(data[8..12].try_into().unwrap());
        let minor_version = u32::from_be_bytes(data[12..16].try_into().unwrap());
        let gpu_version = u32::from_be_bytes(data[16..20].try_into().unwrap());
        let align_mode = u32::from_be_bytes(data[20..24].try_into().unwrap());

        if size as usize != HEADER_SIZE {
            return Err(GfdError::Malformed("header size"));
        }
        if major_version != 6 && major_version != 7 {
            return Err(GfdError::UnknownFileVersion(major_version));
        }
        if gpu_version != GPU_VERSION {
            return Err(GfdError::Malformed("gpu_version"));
        }

        Ok(Self {
            major_version,
            minor_version,
            align_enabled: align_mode != 0,
        })
    }

    pub fn save(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(b"Gfx2");
        out[4..8].copy_from_slice(&(HEADER_SIZE as u32).to_be_bytes());
        out[8..12].copy_from_slice(&self.major_version.to_be_bytes());
        out[12..16].copy_from_slice(&self.minor_version.to_be_bytes());
        out[16..20].copy_from_slice(&GPU_VERSION.to_be_bytes());
        out[20..24].copy_from_slice(&(self.align_enabled as u32).to_be_bytes());
        out
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockHeader {
    major_version: u32,
    minor_version: u32,
    type_: u32,
    data_size: u32,
}

impl BlockHeader {
    fn parse(data: &[u8]) -> Result<Self, GfdError> {
        if data.len() < BLOCK_HEADER_SIZE {
            return Err(GfdError::InputLength {
                expected: BLOCK_HEADER_SIZE,
                got: data.len(),
            });
        }
        if &data[0..4] != b"BLK{" {
            return Err(GfdError::Malformed("block magic"));
        }

        let size = u32::from_be_bytes(data[4..8].try_into().unwrap());
        let major_version = u32::from_be_bytes(data[8..12].try_into().unwrap());
        let minor_version = u32::from_be_bytes(data[12..16].try_into().unwrap());
        let type_ = u32::from_be_bytes(data[16..20].try_into().unwrap());
        let data_size = u32::from_be_bytes(data[20..24].try_into().unwrap());

        if size as usize != BLOCK_HEADER_SIZE {
            return Err(GfdError::Malformed("block header size"));
        }
        if major_version != 0 && major_version != 1 {
            return Err(GfdError::UnknownBlockVersion(major_version));
        }
        if type_ == block_type::INVALID {
            return Err(GfdError::Malformed("block type Invalid"));
        }
        if type_ == block_type::END && data_size != 0 {
            return Err(GfdError::Malformed("End block has nonzero data_size"));
        }

        Ok(Self {
            major_version,
            minor_version,
            type_,
            data_size,
        })
    }

    fn save(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut out = [0u8; BLOCK_HEADER_SIZE];
        out[0..4].copy_from_slice(b"BLK{");
        out[4..8].copy_from_slice(&(BLOCK_HEADER_SIZE as u32).to_be_bytes());
        out[8..12].copy_from_slice(&self.major_version.to_be_bytes());
        out[12..16].copy_from_slice(&self.minor_version.to_be_bytes());
        out[16..20].copy_from_slice(&self.type_.to_be_bytes());
        out[20..24].copy_from_slice(&self.data_size.to_be_bytes());
        out
    }
}

/// A parsed or in-progress GFD file: one header plus a growable list of
/// textures, each carrying its own surface and image/mip buffers.
#[derive(Debug, Clone, Default)]
pub struct GfdFile {
    pub header: GfdHeader,
    pub textures: Vec<GX2Texture>,
}

impl GfdFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the file version, re-deriving `surf_mode`/`perf_modulation`
    /// from it (6.0→(1,0), 6.1→(1,7), 7.1→(0,7) when `perf_modulation` is
    /// not overridden) and re-synthesizing every texture's register words
    /// to match. This is what the CLI's version flags drive on export.
    pub fn set_version(
        &mut self,
        major_version: u32,
        minor_version: u32,
        perf_modulation: Option<u32>,
    ) -> Result<(u32, u32), GfdError> {
        if major_version != 6 && major_version != 7 {
            return Err(GfdError::UnknownFileVersion(major_version));
        }

        self.header.major_version = major_version;
        self.header.minor_version = minor_version;

        let surf_mode = if major_version == 6 { 1 } else { 0 };
        let default_perf_modulation = match (major_version, minor_version) {
            (6, 0) => 0,
            (6, 1) => 7,
            _ => 7,
        };
        let perf_modulation = perf_modulation.unwrap_or(default_perf_modulation);

        for texture in &mut self.textures {
            texture.init_texture_regs(surf_mode, perf_modulation);
        }

        Ok((surf_mode, perf_modulation))
    }

    /// Parses a full GFD file. Texture header/image/mip blocks are
    /// collected into three parallel lists as they're encountered (they
    /// need not interleave 1:1:1) and zipped together once the End block
    /// is reached, mirroring the reference loader. Block types that are
    /// neither a texture block nor Pad/End are skipped using their
    /// declared `data_size`, so files carrying shader or Usr blocks this
    /// crate doesn't model still parse.
    pub fn parse(data: &[u8]) -> Result<Self, GfdError> {
        let header = GfdHeader::parse(data)?;
        let mut pos = HEADER_SIZE;

        let mut texture_headers = Vec::new();
        let mut image_blocks = Vec::new();
        let mut mip_blocks = Vec::new();

        loop {
            let block_data = data.get(pos..).ok_or(GfdError::InputLength {
                expected: pos + BLOCK_HEADER_SIZE,
                got: data.len(),
            })?;
            let block = BlockHeader::parse(block_data)?;
            pos += BLOCK_HEADER_SIZE;

            if block.type_ == block_type::END {
                break;
            }

            let payload = data.get(pos..pos + block.data_size as usize).ok_or(GfdError::InputLength {
                expected: pos + block.data_size as usize,
                got: data.len(),
            })?;

            let (header_id, image_id, mip_id) = texture_block_ids(block.major_version);

            if block.type_ == header_id {
                if block.data_size as usize != TEXTURE_SIZE {
                    return Err(GfdError::TextureHeaderSize {
                        expected: TEXTURE_SIZE,
                        got: block.data_size,
                    });
                }
                let mut cursor = std::io::Cursor::new(payload);
                let (surface_raw, view_raw) = read_raw(&mut cursor)?;
                let surface = GX2Surface::from_raw(surface_raw)?;
                texture_headers.push(GX2Texture::from_parts(surface, view_raw)?);
            } else if block.type_ == image_id {
                image_blocks.push(payload);
            } else if block.type_ == mip_id {
                mip_blocks.push(payload);
            }

            pos += block.data_size as usize;
        }

        let mut image_blocks = image_blocks.into_iter();
        let mut mip_blocks = mip_blocks.into_iter();
        let mut textures = Vec::with_capacity(texture_headers.len());

        for mut texture in texture_headers {
            let image_data = image_blocks
                .next()
                .ok_or(GfdError::Malformed("texture header block without a matching image data block"))?;
            if image_data.len() != texture.surface.image_size as usize {
                return Err(GfdError::ImageDataSize {
                    expected: texture.surface.image_size,
                    got: image_data.len(),
                });
            }
            texture.surface.image_data = image_data.to_vec();

            if texture.surface.num_mips > 1 {
                let mip_data = mip_blocks
                    .next()
                    .ok_or(GfdError::Malformed("multi-mip texture header block without a matching mip data block"))?;
                if mip_data.len() != texture.surface.mip_size as usize {
                    return Err(GfdError::MipDataSize {
                        expected: texture.surface.mip_size,
                        got: mip_data.len(),
                    });
                }
                texture.surface.mip_data = mip_data.to_vec();
            }

            textures.push(texture);
        }

        Ok(Self { header, textures })
    }

    /// Serializes the file: one Header/ImageData/MipData block group per
    /// texture (with Pad blocks interspersed when alignment is enabled),
    /// terminated by an End block. A Pad block's `data_size` is chosen so
    /// that the *payload* of the following block lands on a multiple of
    /// the surface's `alignment`.
    pub fn save(&self) -> Result<Vec<u8>, GfdError> {
        let (block_major, block_minor) = if (self.header.major_version, self.header.minor_version) == (6, 0) {
            (0, 1)
        } else {
            (1, 0)
        };
        let (header_id, image_id, mip_id) = texture_block_ids(block_major);

        let mut out = Vec::new();
        out.extend_from_slice(&self.header.save());

        let mut block = BlockHeader {
            major_version: block_major,
            minor_version: block_minor,
            type_: block_type::INVALID,
            data_size: 0,
        };

        let write_pad = |out: &mut Vec<u8>, block: &mut BlockHeader, alignment: u32| {
            let data_pos = (out.len() + BLOCK_HEADER_SIZE * 2) as u32;
            let pad_size = round_up(data_pos, alignment) - data_pos;

            block.type_ = block_type::PAD;
            block.data_size = pad_size;
            out.extend_from_slice(&block.save());
            out.resize(out.len() + pad_size as usize, 0);
        };

        for texture in &self.textures {
            let mut texture_buf = std::io::Cursor::new(Vec::with_capacity(TEXTURE_SIZE));
            write_raw(&mut texture_buf, &texture.surface.to_raw(), &texture.raw_view())?;
            let texture_bytes = texture_buf.into_inner();

            block.type_ = header_id;
            block.data_size = texture_bytes.len() as u32;
            out.extend_from_slice(&block.save());
            out.extend_from_slice(&texture_bytes);

            if self.header.align_enabled {
                write_pad(&mut out, &mut block, texture.surface.alignment);
            }

            block.type_ = image_id;
            block.data_size = texture.surface.image_size;
            out.extend_from_slice(&block.save());
            out.extend_from_slice(&texture.surface.image_data);

            if !texture.surface.mip_data.is_empty() {
                if self.header.align_enabled {
                    write_pad(&mut out, &mut block, texture.surface.alignment);
                }

                block.type_ = mip_id;
                block.data_size = texture.surface.mip_size;
                out.extend_from_slice(&block.save());
                out.extend_from_slice(&texture.surface.mip_data);
            }
        }

        block.type_ = block_type::END;
        block.data_size = 0;
        out.extend_from_slice(&block.save());

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrlib::TileMode;
    use crate::format::GX2SurfaceFormat;
    use crate::texture::CompSel;

    #[test]
    fn empty_texture_list_round_trips_to_64_bytes() {
        let file = GfdFile::new();
        let bytes = file.save().unwrap();
        assert_eq!(64, bytes.len());

        let parsed = GfdFile::parse(&bytes).unwrap();
        assert_eq!(7, parsed.header.major_version);
        assert_eq!(1, parsed.header.minor_version);
        assert!(parsed.header.align_enabled);
        assert!(parsed.textures.is_empty());
    }

    #[test]
    fn header_rejects_bad_magic() {
        let mut bytes = GfdFile::new().save().unwrap();
        bytes[0] = b'X';
        assert!(matches!(GfdHeader::parse(&bytes), Err(GfdError::Malformed("magic"))));
    }

    #[test]
    fn header_rejects_unknown_major_version() {
        let mut bytes = GfdFile::new().save().unwrap();
        bytes[8..12].copy_from_slice(&9u32.to_be_bytes());
        assert!(matches!(GfdHeader::parse(&bytes), Err(GfdError::UnknownFileVersion(9))));
    }

    #[test]
    fn single_texture_round_trips_through_save_and_parse() {
        let image_data = vec![0x11u8; 64 * 64 * 4];
        let texture = GX2Texture::from_linear_2d(
            64,
            64,
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

        let mut file = GfdFile::new();
        file.textures.push(texture);

        let bytes = file.save().unwrap();
        let parsed = GfdFile::parse(&bytes).unwrap();

        assert_eq!(1, parsed.textures.len());
        assert_eq!(file.textures[0].surface.image_data, parsed.textures[0].surface.image_data);
        assert_eq!(file.textures[0].surface.width, parsed.textures[0].surface.width);
    }

    #[test]
    fn image_data_payload_lands_on_alignment_for_default_tile_mode() {
        // 8x8 R8 with default tiling resolves to Tiled_1D_Thin1: image_size=64,
        // alignment=256. The header+image block headers (0x20 each) plus the
        // 0x9c-byte texture record push the image payload past the first
        // alignment boundary, so a pad block is required to reach it.
        let mut texture = GX2Texture::init_texture(
            crate::enums::GX2SurfaceDim::Dim2D,
            8,
            8,
            1,
            1,
            GX2SurfaceFormat::UNORM_R8,
            CompSel::new(
                crate::texture::Component::Zero,
                crate::texture::Component::Zero,
                crate::texture::Component::Zero,
                crate::texture::Component::R,
            ),
            TileMode::Default,
            0,
            0,
            7,
        )
        .unwrap();
        assert_eq!(64, texture.surface.image_size);
        assert_eq!(256, texture.surface.alignment);

        texture.surface.image_data = vec![0u8; texture.surface.image_size as usize];

        let mut file = GfdFile::new();
        file.textures.push(texture);

        let bytes = file.save().unwrap();

        // Position the image payload would start at with no pad block at all:
        // header + texture-header-block + texture record + pad-block-header
        // + image-block-header.
        let unpadded_pos = (HEADER_SIZE + BLOCK_HEADER_SIZE + TEXTURE_SIZE + BLOCK_HEADER_SIZE * 2) as u32;
        let image_payload_pos = round_up(unpadded_pos, 256) as usize;
        assert_eq!(0, image_payload_pos % 256);
        assert_eq!(
            &bytes[image_payload_pos..image_payload_pos + 64],
            file.textures[0].surface.image_data.as_slice()
        );

        let parsed = GfdFile::parse(&bytes).unwrap();
        assert_eq!(1, parsed.textures.len());
    }

    #[test]
    fn set_version_rederives_surf_mode_and_perf_modulation() {
        let image_data = vec![0u8; 64 * 64 * 4];
        let texture = GX2Texture::from_linear_2d(
            64,
            64,
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

        let mut file = GfdFile::new();
        file.textures.push(texture);

        let (surf_mode, perf_modulation) = file.set_version(6, 0, None).unwrap();
        assert_eq!((1, 0), (surf_mode, perf_modulation));

        let (surf_mode, perf_modulation) = file.set_version(6, 1, None).unwrap();
        assert_eq!((1, 7), (surf_mode, perf_modulation));

        let (surf_mode, perf_modulation) = file.set_version(7, 1, None).unwrap();
        assert_eq!((0, 7), (surf_mode, perf_modulation));
    }

    #[test]
    fn set_version_rejects_unknown_major_version() {
        let mut file = GfdFile::new();
        assert!(matches!(file.set_version(5, 0, None), Err(GfdError::UnknownFileVersion(5))));
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = [0u8; 10];
        assert!(matches!(
            GfdFile::parse(&bytes),
            Err(GfdError::InputLength { expected: HEADER_SIZE, got: 10 })
        ));
    }
}
