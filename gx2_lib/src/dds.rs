//! DDS container parsing and emission, and the format/component-selector
//! inference needed to move textures between DDS and GX2 representations.
//!
//! The header layout mirrors the classic `DDS ` format: a 128-byte header
//! (4-byte magic + 124-byte payload) with an embedded 32-byte pixel format
//! block at offset 0x4c. DX10, cube maps and volume textures are rejected;
//! see [`DdsError`].

use binrw::{BinRead, BinWrite};
use thiserror::Error;

use crate::format::GX2SurfaceFormat;
use crate::texture::{Component, CompSel};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DdsError {
    #[error("not a valid DDS file: {0}")]
    Malformed(&'static str),
    #[error("3D textures are not supported")]
    VolumeUnsupported,
    #[error("cube maps are not supported")]
    CubeMapUnsupported,
    #[error("DX10 extended DDS files are not supported")]
    Dx10Unsupported,
    #[error("YUV color space is not supported")]
    YuvUnsupported,
    #[error("unrecognized bits-per-pixel: {0}")]
    UnrecognizedBitsPerPixel(u32),
    #[error("unrecognized FourCC: {0:?}")]
    UnrecognizedFourCc([u8; 4]),
    #[error("could not determine texture format from pixel masks")]
    UndeterminedFormat,
    #[error("unsupported texture format for DDS export: {0:?}")]
    UnsupportedExportFormat(GX2SurfaceFormat),
    #[error("exporting with a component selector of Zero is not supported by DDS")]
    ZeroComponentUnsupported,
    #[error("exporting with RGB component selectors set to One on a non alpha-only texture is not supported by DDS")]
    OneComponentUnsupported,
    #[error("component selector index {0} is out of range for this format's channel masks")]
    ComponentOutOfRange(u8),
    #[error("input is {got} bytes, expected at least {expected}")]
    InputLength { expected: usize, got: usize },
}

pub mod flags {
    pub const CAPS: u32 = 0x1;
    pub const HEIGHT: u32 = 0x2;
    pub const WIDTH: u32 = 0x4;
    pub const PITCH: u32 = 0x8;
    pub const PIXEL_FORMAT: u32 = 0x1000;
    pub const MIP_MAP_COUNT: u32 = 0x20000;
    pub const LINEAR_SIZE: u32 = 0x80000;
    pub const DEPTH: u32 = 0x800000;
}

pub mod pf_flags {
    pub const ALPHA_PIXELS: u32 = 0x1;
    pub const ALPHA: u32 = 0x2;
    pub const FOUR_CC: u32 = 0x4;
    pub const RGB: u32 = 0x40;
    pub const YUV: u32 = 0x200;
    pub const LUMINANCE: u32 = 0x20000;
}

pub mod caps {
    pub const COMPLEX: u32 = 0x8;
    pub const TEXTURE: u32 = 0x1000;
    pub const MIP_MAP: u32 = 0x400000;
}

pub mod caps2 {
    pub const CUBE_MAP: u32 = 0x200;
    pub const CUBE_MAP_POSITIVE_X: u32 = 0x400;
    pub const CUBE_MAP_NEGATIVE_X: u32 = 0x800;
    pub const CUBE_MAP_POSITIVE_Y: u32 = 0x1000;
    pub const CUBE_MAP_NEGATIVE_Y: u32 = 0x2000;
    pub const CUBE_MAP_POSITIVE_Z: u32 = 0x4000;
    pub const CUBE_MAP_NEGATIVE_Z: u32 = 0x8000;
    pub const VOLUME: u32 = 0x200000;

    pub const ANY_CUBE_FACE: u32 = CUBE_MAP
        | CUBE_MAP_POSITIVE_X
        | CUBE_MAP_NEGATIVE_X
        | CUBE_MAP_POSITIVE_Y
        | CUBE_MAP_NEGATIVE_Y
        | CUBE_MAP_POSITIVE_Z
        | CUBE_MAP_NEGATIVE_Z;
}

/// The 32-byte `DDS_PIXELFORMAT` block embedded at offset 0x4c of a DDS
/// header.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub four_cc: [u8; 4],
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

impl Default for DdsPixelFormat {
    fn default() -> Self {
        Self {
            size: 0x20,
            flags: 0,
            four_cc: [0; 4],
            rgb_bit_count: 0,
            r_bit_mask: 0,
            g_bit_mask: 0,
            b_bit_mask: 0,
            a_bit_mask: 0,
        }
    }
}

/// The 128-byte `DDS_HEADER` (including the 4-byte `DDS ` magic), with the
/// pixel format spliced in at its fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdsHeader {
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mip_map_count: u32,
    pub pixel_format: DdsPixelFormat,
    pub caps: u32,
    pub caps2: u32,
}

/// Total on-disk size of a DDS header, magic included.
pub const HEADER_SIZE: usize = 0x80;
const PAYLOAD_SIZE_FIELD: u32 = 0x7c;
const PIXEL_FORMAT_OFFSET: usize = 0x4c;

impl Default for DdsHeader {
    fn default() -> Self {
        Self {
            flags: flags::CAPS | flags::HEIGHT | flags::WIDTH | flags::PIXEL_FORMAT,
            height: 0,
            width: 0,
            pitch_or_linear_size: 0,
            depth: 0,
            mip_map_count: 1,
            pixel_format: DdsPixelFormat::default(),
            caps: caps::TEXTURE,
            caps2: 0,
        }
    }
}

impl DdsHeader {
    /// Parses and validates a DDS header from the start of `data`. Mirrors
    /// the reference loader's field-by-field assertions rather than
    /// trusting the input blindly.
    pub fn parse(data: &[u8]) -> Result<Self, DdsError> {
        if data.len() < HEADER_SIZE {
            return Err(DdsError::InputLength {
                expected: HEADER_SIZE,
                got: data.len(),
            });
        }
        if &data[0..4] != b"DDS " {
            return Err(DdsError::Malformed("magic"));
        }

        let mut cur = std::io::Cursor::new(&data[4..]);
        let size = u32::read_le(&mut cur).map_err(|_| DdsError::Malformed("size"))?;
        let flags = u32::read_le(&mut cur).map_err(|_| DdsError::Malformed("flags"))?;
        let height = u32::read_le(&mut cur).map_err(|_| DdsError::Malformed("height"))?;
        let width = u32::read_le(&mut cur).map_err(|_| DdsError::Malformed("width"))?;
        let pitch_or_linear_size =
            u32::read_le(&mut cur).map_err(|_| DdsError::Malformed("pitchOrLinearSize"))?;
        let depth = u32::read_le(&mut cur).map_err(|_| DdsError::Malformed("depth"))?;
        let mip_map_count = u32::read_le(&mut cur).map_err(|_| DdsError::Malformed("mipMapCount"))?;

        if size != PAYLOAD_SIZE_FIELD {
            return Err(DdsError::Malformed("header size"));
        }

        let required = flags::CAPS | flags::HEIGHT | flags::WIDTH | flags::PIXEL_FORMAT;
        if flags & required != required {
            return Err(DdsError::Malformed("missing required flags"));
        }
        if flags & flags::PITCH != 0 && flags & flags::LINEAR_SIZE != 0 {
            return Err(DdsError::Malformed("Pitch and LinearSize both set"));
        }
        if height == 0 || width == 0 {
            return Err(DdsError::Malformed("zero height or width"));
        }

        let mut pf_cur = std::io::Cursor::new(&data[PIXEL_FORMAT_OFFSET..]);
        let pixel_format =
            DdsPixelFormat::read(&mut pf_cur).map_err(|_| DdsError::Malformed("pixelFormat"))?;
        let set_count = [
            pixel_format.flags & pf_flags::ALPHA != 0,
            pixel_format.flags & pf_flags::FOUR_CC != 0,
            pixel_format.flags & pf_flags::RGB != 0,
            pixel_format.flags & pf_flags::YUV != 0,
            pixel_format.flags & pf_flags::LUMINANCE != 0,
        ]
        .into_iter()
        .filter(|b| *b)
        .count();
        if set_count != 1 {
            return Err(DdsError::Malformed(
                "pixelFormat.flags must set exactly one of Alpha/FourCC/RGB/YUV/Luminance",
            ));
        }
        if pixel_format.flags & pf_flags::FOUR_CC != 0 && pixel_format.four_cc == [0; 4] {
            return Err(DdsError::Malformed("FourCC flag set but fourCC is zero"));
        }

        let mut caps_cur = std::io::Cursor::new(&data[0x6c..]);
        let caps = u32::read_le(&mut caps_cur).map_err(|_| DdsError::Malformed("caps"))?;
        let caps2 = u32::read_le(&mut caps_cur).map_err(|_| DdsError::Malformed("caps2"))?;
        if caps & caps::TEXTURE == 0 {
            return Err(DdsError::Malformed("caps missing Texture bit"));
        }

        let pitch_or_linear_size = if flags & (flags::PITCH | flags::LINEAR_SIZE) == 0 {
            0
        } else {
            if pitch_or_linear_size == 0 {
                return Err(DdsError::Malformed("pitchOrLinearSize is zero but flagged"));
            }
            pitch_or_linear_size
        };
        let depth = if flags & flags::DEPTH == 0 {
            0
        } else {
            if depth == 0 {
                return Err(DdsError::Malformed("depth is zero but flagged"));
            }
            depth
        };
        let mip_map_count = if flags & flags::MIP_MAP_COUNT == 0 {
            1
        } else {
            if !(1..=14).contains(&mip_map_count) {
                return Err(DdsError::Malformed("mipMapCount out of range"));
            }
            mip_map_count
        };

        Ok(Self {
            flags,
            height,
            width,
            pitch_or_linear_size,
            depth,
            mip_map_count,
            pixel_format,
            caps,
            caps2,
        })
    }

    pub fn save(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.extend_from_slice(b"DDS ");
        out.extend_from_slice(&PAYLOAD_SIZE_FIELD.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.pitch_or_linear_size.to_le_bytes());
        out.extend_from_slice(&self.depth.to_le_bytes());
        out.extend_from_slice(&self.mip_map_count.to_le_bytes());
        out.extend_from_slice(&[0u8; 44]);
        debug_assert_eq!(out.len(), PIXEL_FORMAT_OFFSET);
        let mut pf_cur = std::io::Cursor::new(Vec::new());
        self.pixel_format.write(&mut pf_cur).expect("writing a fixed-size struct cannot fail");
        out.extend_from_slice(&pf_cur.into_inner());
        out.extend_from_slice(&self.caps.to_le_bytes());
        out.extend_from_slice(&self.caps2.to_le_bytes());
        out.extend_from_slice(&[0u8; 12]);
        debug_assert_eq!(out.len(), HEADER_SIZE);
        out
    }
}

/// FourCC -> (GX2 format, block size in bytes) for the compressed formats
/// this crate can decode. Reproduces the import table exactly, including
/// the two aliases each of `BC4U`/`BC5U` share with `ATI1`/`ATI2`.
fn fourcc_to_format(four_cc: [u8; 4]) -> Option<(u32, u32)> {
    match &four_cc {
        b"DXT1" => Some((0x031, 0x08)),
        b"DXT2" | b"DXT3" => Some((0x032, 0x10)),
        b"DXT4" | b"DXT5" => Some((0x033, 0x10)),
        b"ATI1" | b"BC4U" => Some((0x034, 0x08)),
        b"BC4S" => Some((0x234, 0x08)),
        b"ATI2" | b"BC5U" => Some((0x035, 0x10)),
        b"BC5S" => Some((0x235, 0x10)),
        _ => None,
    }
}

/// GX2 format -> FourCC for export. Keyed by the literal (buggy) expression
/// `format & 0x3F + 0x200` from the exporter this was ported from: due to
/// operator precedence that evaluates as `format & 0x23F`, not
/// `(format & 0x3F) | 0x200` as the spacing suggests was intended.
/// Reproduced here verbatim since GX2 files in the wild were produced by,
/// and are expected to round-trip through, that exact behavior.
fn format_to_fourcc(format: u32) -> Option<[u8; 4]> {
    match format & 0x23F {
        0x031 => Some(*b"DXT1"),
        0x032 => Some(*b"DXT3"),
        0x033 => Some(*b"DXT5"),
        0x034 => Some(*b"ATI1"),
        0x234 => Some(*b"BC4S"),
        0x035 => Some(*b"ATI2"),
        0x235 => Some(*b"BC5S"),
        _ => None,
    }
}

/// Channel masks accepted for each uncompressed bits-per-pixel / base
/// format, in component-selector-index order.
fn valid_masks(bits_per_pixel: u32, base_format: u32) -> Option<&'static [u32]> {
    match (bits_per_pixel, base_format) {
        (0x08, 0x001) => Some(&[0x000000ff]),
        (0x08, 0x002) => Some(&[0x0000000f, 0x000000f0]),
        (0x10, 0x007) => Some(&[0x000000ff, 0x0000ff00]),
        (0x10, 0x008) => Some(&[0x0000001f, 0x000007e0, 0x0000f800]),
        (0x10, 0x00a) => Some(&[0x0000001f, 0x000003e0, 0x00007c00, 0x00008000]),
        (0x10, 0x00b) => Some(&[0x0000000f, 0x000000f0, 0x00000f00, 0x0000f000]),
        (0x20, 0x019) => Some(&[0x3ff00000, 0x000ffc00, 0x000003ff, 0xc0000000]),
        (0x20, 0x01a) => Some(&[0x000000ff, 0x0000ff00, 0x00ff0000, 0xff000000]),
        _ => None,
    }
}

/// Every base-format candidate tried for a given bits-per-pixel, in the
/// order inference should try them.
fn masks_for_bpp(bits_per_pixel: u32) -> &'static [u32] {
    match bits_per_pixel {
        0x08 => &[0x001, 0x002],
        0x10 => &[0x007, 0x008, 0x00a, 0x00b],
        0x20 => &[0x019, 0x01a],
        _ => &[],
    }
}

/// One decoded DDS input, with the GX2 format and component selector array
/// already resolved from the header.
pub struct DdsImport {
    pub width: u32,
    pub height: u32,
    pub num_mips: u32,
    pub format: GX2SurfaceFormat,
    /// Component values in `GX2CompSel` order: what each of R/G/B/A (as
    /// they appear in the final texture) should source from among this
    /// format's native channels.
    pub comp_sel_candidates: [Component; 4],
    pub image_data: Vec<u8>,
    pub mip_data: Vec<u8>,
}

/// Parses a full DDS file and resolves the GX2 format plus the native
/// component-selector candidates implied by its channel masks / FourCC.
/// `srgb` requests the SRGB variant when the resolved format is RGBA8.
pub fn import_dds(data: &[u8], srgb: bool) -> Result<DdsImport, DdsError> {
    let header = DdsHeader::parse(data)?;

    if header.depth > 1 || header.caps2 & caps2::VOLUME != 0 {
        return Err(DdsError::VolumeUnsupported);
    }
    if header.caps2 & caps2::ANY_CUBE_FACE != 0 {
        return Err(DdsError::CubeMapUnsupported);
    }
    if header.pixel_format.flags & pf_flags::YUV != 0 {
        return Err(DdsError::YuvUnsupported);
    }

    let width = header.width;
    let height = header.height;
    let num_mips = header.mip_map_count;

    let (format, comp_sel_candidates, image_size) = if header.pixel_format.flags & pf_flags::FOUR_CC == 0
    {
        let bits_per_pixel = header.pixel_format.rgb_bit_count;
        let candidates = masks_for_bpp(bits_per_pixel);
        if candidates.is_empty() {
            return Err(DdsError::UnrecognizedBitsPerPixel(bits_per_pixel));
        }

        let r_mask = header.pixel_format.r_bit_mask;
        let g_mask = header.pixel_format.g_bit_mask;
        let b_mask = header.pixel_format.b_bit_mask;
        let a_mask = header.pixel_format.a_bit_mask;
        let alpha_only = header.pixel_format.flags & pf_flags::ALPHA != 0;
        let has_alpha = header.pixel_format.flags & pf_flags::ALPHA_PIXELS != 0;
        let rgb = header.pixel_format.flags & pf_flags::RGB != 0;

        let mut resolved = None;
        for &base_format in candidates {
            let masks = valid_masks(bits_per_pixel, base_format).expect("candidate table is self-consistent");
            let idx = |mask: u32| masks.iter().position(|&m| m == mask);

            let sel = if alpha_only {
                idx(a_mask).map(|a| {
                    [Component::One, Component::One, Component::One, component_from_index(a)]
                })
            } else if has_alpha && rgb {
                match (idx(r_mask), idx(g_mask), idx(b_mask), idx(a_mask)) {
                    (Some(r), Some(g), Some(b), Some(a)) => Some([
                        component_from_index(r),
                        component_from_index(g),
                        component_from_index(b),
                        component_from_index(a),
                    ]),
                    _ => None,
                }
            } else if has_alpha {
                match (idx(r_mask), idx(a_mask)) {
                    (Some(r), Some(a)) => {
                        let rc = component_from_index(r);
                        Some([rc, rc, rc, component_from_index(a)])
                    }
                    _ => None,
                }
            } else if rgb {
                match (idx(r_mask), idx(g_mask), idx(b_mask)) {
                    (Some(r), Some(g), Some(b)) => Some([
                        component_from_index(r),
                        component_from_index(g),
                        component_from_index(b),
                        Component::One,
                    ]),
                    _ => None,
                }
            } else {
                idx(r_mask).map(|r| {
                    let rc = component_from_index(r);
                    [rc, rc, rc, Component::One]
                })
            };

            if let Some(sel) = sel {
                resolved = Some((base_format, sel));
                break;
            }
        }

        let (mut base_format, comp_sel_candidates) = resolved.ok_or(DdsError::UndeterminedFormat)?;
        if base_format == 0x01a && srgb {
            base_format |= 0x400;
        }

        let image_size = width as usize * height as usize * (bits_per_pixel as usize / 8);
        (GX2SurfaceFormat::from(base_format), comp_sel_candidates, image_size)
    } else {
        if &header.pixel_format.four_cc == b"DX10" {
            return Err(DdsError::Dx10Unsupported);
        }
        let (mut base_format, block_size) = fourcc_to_format(header.pixel_format.four_cc)
            .ok_or(DdsError::UnrecognizedFourCc(header.pixel_format.four_cc))?;

        let comp_sel_candidates = if base_format & 4 == 0 {
            if srgb {
                base_format |= 0x400;
            }
            [Component::R, Component::G, Component::B, Component::A]
        } else if base_format & 0x3F == 0x34 {
            [Component::R, Component::Zero, Component::Zero, Component::One]
        } else {
            [Component::R, Component::G, Component::Zero, Component::One]
        };

        let blocks_w = (width as usize + 3) / 4;
        let blocks_h = (height as usize + 3) / 4;
        let image_size = blocks_w * blocks_h * block_size as usize;
        (GX2SurfaceFormat::from(base_format), comp_sel_candidates, image_size)
    };

    if data.len() < HEADER_SIZE + image_size {
        return Err(DdsError::InputLength {
            expected: HEADER_SIZE + image_size,
            got: data.len(),
        });
    }
    let image_data = data[HEADER_SIZE..HEADER_SIZE + image_size].to_vec();
    let mip_data = data[HEADER_SIZE + image_size..].to_vec();

    Ok(DdsImport {
        width,
        height,
        num_mips,
        format,
        comp_sel_candidates,
        image_data,
        mip_data,
    })
}

fn component_from_index(index: usize) -> Component {
    Component::try_from(index as u8).expect("mask table index is always 0..=3")
}

/// Builds the `CompSel` applied to a freshly-imported texture: `comp_sel`
/// picks, for each of the final R/G/B/A channels, which of the DDS's
/// resolved per-format candidates (also in R/G/B/A order, with Zero/One
/// appended) to source from.
pub fn resolve_comp_sel(candidates: [Component; 4], comp_sel: [u8; 4]) -> CompSel {
    let table = [candidates[0], candidates[1], candidates[2], candidates[3], Component::Zero, Component::One];
    let pick = |i: u8| table[i as usize];
    CompSel::new(pick(comp_sel[0]), pick(comp_sel[1]), pick(comp_sel[2]), pick(comp_sel[3]))
}

/// Builds a DDS header describing a texture already reformatted to
/// `Linear_Special` tiling, given its format, dimensions, mip count and
/// component selector. Does not touch pixel data; callers own untiling.
pub fn export_header(
    format: GX2SurfaceFormat,
    width: u32,
    height: u32,
    num_mips: u32,
    comp_sel: [Component; 4],
    image_size: u32,
) -> Result<DdsHeader, DdsError> {
    let supported: &[u32] = &[
        0x001, 0x002, 0x007, 0x008, 0x00a, 0x00b, 0x019, 0x01a, 0x41a, 0x031, 0x431, 0x032, 0x432,
        0x033, 0x433, 0x034, 0x234, 0x035, 0x235,
    ];
    let raw_format: u32 = format.into();
    if !supported.contains(&raw_format) {
        return Err(DdsError::UnsupportedExportFormat(format));
    }

    let mut header = DdsHeader::default();
    header.width = width;
    header.height = height;

    if num_mips > 1 {
        header.mip_map_count = num_mips;
        header.flags |= flags::MIP_MAP_COUNT;
        header.caps |= caps::COMPLEX | caps::MIP_MAP;
    }

    if !format.is_compressed() {
        let bits_per_pixel = format.bits_per_pixel().ok_or(DdsError::UnsupportedExportFormat(format))?;
        header.pixel_format.rgb_bit_count = bits_per_pixel;
        header.pitch_or_linear_size = width * (bits_per_pixel / 8);
        header.flags |= flags::PITCH;

        if comp_sel.contains(&Component::Zero) {
            return Err(DdsError::ZeroComponentUnsupported);
        }
        let [r, g, b, a] = comp_sel;
        let alpha_only_shape = r == g && g == b && a != Component::One;
        if [r, g, b].contains(&Component::One) && !alpha_only_shape {
            return Err(DdsError::OneComponentUnsupported);
        }

        let masks = valid_masks(bits_per_pixel, raw_format & 0x3F).ok_or(DdsError::UnsupportedExportFormat(format))?;
        let index_of = |c: Component| -> Result<Option<usize>, DdsError> {
            match c {
                Component::One => Ok(None),
                Component::R => Ok(Some(0)),
                Component::G => masks.get(1).map(|_| Some(1)).ok_or(DdsError::ComponentOutOfRange(1)),
                Component::B => masks.get(2).map(|_| Some(2)).ok_or(DdsError::ComponentOutOfRange(2)),
                Component::A => masks.get(3).map(|_| Some(3)).ok_or(DdsError::ComponentOutOfRange(3)),
                Component::Zero => unreachable!("rejected above"),
            }
        };

        let mut alpha_only = false;
        if a != Component::One {
            let idx = index_of(a)?.ok_or(DdsError::ComponentOutOfRange(a as u8))?;
            header.pixel_format.a_bit_mask = masks[idx];
            if r == g && g == b {
                alpha_only = true;
                header.pixel_format.flags |= pf_flags::ALPHA;
            } else {
                header.pixel_format.flags |= pf_flags::ALPHA_PIXELS;
            }
        }

        if !alpha_only {
            if r == g && g == b {
                header.pixel_format.flags |= pf_flags::LUMINANCE;
            } else {
                header.pixel_format.flags |= pf_flags::RGB;
            }
            let ri = index_of(r)?.ok_or(DdsError::ComponentOutOfRange(r as u8))?;
            let gi = index_of(g)?.ok_or(DdsError::ComponentOutOfRange(g as u8))?;
            let bi = index_of(b)?.ok_or(DdsError::ComponentOutOfRange(b as u8))?;
            header.pixel_format.r_bit_mask = masks[ri];
            header.pixel_format.g_bit_mask = masks[gi];
            header.pixel_format.b_bit_mask = masks[bi];
        }
    } else {
        header.pixel_format.flags |= pf_flags::FOUR_CC;
        header.pixel_format.four_cc = format_to_fourcc(raw_format).ok_or(DdsError::UnsupportedExportFormat(format))?;
        header.pitch_or_linear_size = image_size;
        header.flags |= flags::LINEAR_SIZE;
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_header_bytes(pixel_format: DdsPixelFormat, width: u32, height: u32) -> Vec<u8> {
        let header = DdsHeader {
            width,
            height,
            pixel_format,
            ..DdsHeader::default()
        };
        header.save()
    }

    #[test]
    fn header_round_trips_through_save_and_parse() {
        let pf = DdsPixelFormat {
            flags: pf_flags::RGB | pf_flags::ALPHA_PIXELS,
            rgb_bit_count: 32,
            r_bit_mask: 0x00ff0000,
            g_bit_mask: 0x0000ff00,
            b_bit_mask: 0x000000ff,
            a_bit_mask: 0xff000000,
            ..DdsPixelFormat::default()
        };
        let bytes = minimal_header_bytes(pf, 4, 4);
        assert_eq!(HEADER_SIZE, bytes.len());
        let parsed = DdsHeader::parse(&bytes).unwrap();
        assert_eq!(4, parsed.width);
        assert_eq!(4, parsed.height);
        assert_eq!(pf, parsed.pixel_format);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(b"NOPE");
        assert_eq!(Err(DdsError::Malformed("magic")), DdsHeader::parse(&bytes));
    }

    #[test]
    fn import_infers_rgba8_from_masks() {
        let pf = DdsPixelFormat {
            flags: pf_flags::RGB | pf_flags::ALPHA_PIXELS,
            rgb_bit_count: 32,
            r_bit_mask: 0x000000ff,
            g_bit_mask: 0x0000ff00,
            b_bit_mask: 0x00ff0000,
            a_bit_mask: 0xff000000,
            ..DdsPixelFormat::default()
        };
        let mut bytes = minimal_header_bytes(pf, 2, 2);
        bytes.extend_from_slice(&[0u8; 16]);
        let imported = import_dds(&bytes, false).unwrap();
        assert_eq!(GX2SurfaceFormat::from(0x01a), imported.format);
        assert_eq!(
            [Component::R, Component::G, Component::B, Component::A],
            imported.comp_sel_candidates
        );
    }

    #[test]
    fn import_rejects_dx10() {
        let pf = DdsPixelFormat {
            flags: pf_flags::FOUR_CC,
            four_cc: *b"DX10",
            ..DdsPixelFormat::default()
        };
        let bytes = minimal_header_bytes(pf, 4, 4);
        assert_eq!(Err(DdsError::Dx10Unsupported), import_dds(&bytes, false));
    }

    #[test]
    fn import_resolves_dxt1_fourcc() {
        let pf = DdsPixelFormat {
            flags: pf_flags::FOUR_CC,
            four_cc: *b"DXT1",
            ..DdsPixelFormat::default()
        };
        let mut bytes = minimal_header_bytes(pf, 4, 4);
        bytes.extend_from_slice(&[0u8; 8]);
        let imported = import_dds(&bytes, false).unwrap();
        assert_eq!(GX2SurfaceFormat::from(0x031), imported.format);
    }

    #[test]
    fn export_bc4_snorm_fourcc_mask_quirk_is_reproduced() {
        let format = GX2SurfaceFormat::from(0x234u32);
        let header = export_header(format, 4, 4, 1, [Component::R, Component::Zero, Component::Zero, Component::One], 8).unwrap();
        assert_eq!(*b"BC4S", header.pixel_format.four_cc);
    }

    #[test]
    fn export_rejects_zero_component_selector() {
        let format = GX2SurfaceFormat::from(0x01au32);
        let result = export_header(format, 4, 4, 1, [Component::R, Component::G, Component::Zero, Component::One], 0);
        assert_eq!(Err(DdsError::ZeroComponentUnsupported), result);
    }

    #[test]
    fn export_allows_one_on_alpha_only_texture() {
        let format = GX2SurfaceFormat::from(0x001u32);
        let header = export_header(format, 4, 4, 1, [Component::One, Component::One, Component::One, Component::R], 0).unwrap();
        assert_ne!(0, header.pixel_format.flags & pf_flags::ALPHA);
    }
}
