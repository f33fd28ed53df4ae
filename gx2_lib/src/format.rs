//! `GX2SurfaceFormat` and the bit-level queries the rest of the crate needs
//! from it: compressedness, channel layout, bits per pixel, sign/range.
//!
//! The 32-bit format code packs a base format id in the low 6 bits and a
//! numeric "kind" (unorm/uint/snorm/sint/srgb/float) in bits 8-11. The two
//! are independent, so every query below masks out only the bits it needs
//! rather than matching the whole code.

use std::fmt;

/// A GX2 surface/texture pixel format code.
///
/// Stored and compared as the raw `u32` the GPU register layout uses;
/// construct from one of the associated constants rather than a bare
/// integer literal where possible.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GX2SurfaceFormat(pub u32);

impl From<u32> for GX2SurfaceFormat {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<GX2SurfaceFormat> for u32 {
    fn from(value: GX2SurfaceFormat) -> Self {
        value.0
    }
}

impl fmt::Debug for GX2SurfaceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GX2SurfaceFormat(0x{:03x})", self.0)
    }
}

/// Per-pixel channel layout used by the reformatter and BCn decoder to pick
/// a decode path. Distinct from `GX2SurfaceFormat` because several formats
/// (e.g. unorm/uint/snorm RGBA8) share a layout and differ only in how the
/// component bits are interpreted, which the reformatter does separately.
///
/// Only the formats the PNG/DDS pixel path actually supports are named here
/// (`ninTexUtils/gx2/gx2_texture_export_png.py`'s `formats` table): L8, LA4,
/// LA8, RGB565, RGB5A1, RGBA4, BGR10A2, RGBA8, plus BC1-5. Everything else
/// (depth/stencil, 16-bit-per-channel, A2BGR10) is framed by the container
/// but rejected for pixel access, matching that module's `NotImplementedError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    R8,
    RG4,
    RG8,
    RGB565,
    RGB5A1,
    RGBA4,
    BGR10A2,
    RGBA8,
    Bc1,
    Bc2,
    Bc3,
    Bc4,
    Bc5,
}

impl GX2SurfaceFormat {
    pub const INVALID: Self = Self(0x000);

    pub const UNORM_R8: Self = Self(0x001);
    pub const UNORM_RG4: Self = Self(0x002);
    pub const UNORM_R16: Self = Self(0x005);
    pub const UNORM_RG8: Self = Self(0x007);
    pub const UNORM_RGB565: Self = Self(0x008);
    pub const UNORM_RGB5A1: Self = Self(0x00a);
    pub const UNORM_RGBA4: Self = Self(0x00b);
    pub const UNORM_A1BGR5: Self = Self(0x00c);
    pub const UNORM_RG16: Self = Self(0x00f);
    pub const UNORM_R24X8: Self = Self(0x011);
    pub const UNORM_RGB10A2: Self = Self(0x019);
    pub const UNORM_RGBA8: Self = Self(0x01a);
    pub const UNORM_A2BGR10: Self = Self(0x01b);
    pub const UNORM_RGBA16: Self = Self(0x01f);
    pub const UNORM_BC1: Self = Self(0x031);
    pub const UNORM_BC2: Self = Self(0x032);
    pub const UNORM_BC3: Self = Self(0x033);
    pub const UNORM_BC4: Self = Self(0x034);
    pub const UNORM_BC5: Self = Self(0x035);
    pub const UNORM_NV12: Self = Self(0x081);

    pub const UINT_R8: Self = Self(0x101);
    pub const UINT_RG8: Self = Self(0x107);
    pub const UINT_R16: Self = Self(0x105);
    pub const UINT_RG16: Self = Self(0x10f);
    pub const UINT_X24G8: Self = Self(0x111);
    pub const UINT_RGB10A2: Self = Self(0x119);
    pub const UINT_RGBA8: Self = Self(0x11a);
    pub const UINT_A2BGR10: Self = Self(0x11b);
    pub const UINT_G8X24: Self = Self(0x11c);
    pub const UINT_RGBA16: Self = Self(0x11f);
    pub const UINT_RGBA32: Self = Self(0x122);

    pub const SNORM_R8: Self = Self(0x201);
    pub const SNORM_R16: Self = Self(0x205);
    pub const SNORM_RG8: Self = Self(0x207);
    pub const SNORM_RG16: Self = Self(0x20f);
    pub const SNORM_RGB10A2: Self = Self(0x219);
    pub const SNORM_RGBA8: Self = Self(0x21a);
    pub const SNORM_RGBA16: Self = Self(0x21f);
    pub const SNORM_BC4: Self = Self(0x234);
    pub const SNORM_BC5: Self = Self(0x235);

    pub const SINT_R8: Self = Self(0x301);
    pub const SINT_R16: Self = Self(0x305);
    pub const SINT_RG8: Self = Self(0x307);
    pub const SINT_RG16: Self = Self(0x30f);
    pub const SINT_RGB10A2: Self = Self(0x319);
    pub const SINT_RGBA8: Self = Self(0x31a);
    pub const SINT_RGBA16: Self = Self(0x31f);
    pub const SINT_RGBA32: Self = Self(0x322);

    pub const SRGB_RGBA8: Self = Self(0x41a);
    pub const SRGB_BC1: Self = Self(0x431);
    pub const SRGB_BC2: Self = Self(0x432);
    pub const SRGB_BC3: Self = Self(0x433);

    pub const FLOAT_R16: Self = Self(0x806);
    pub const FLOAT_RG16: Self = Self(0x810);
    pub const FLOAT_D24S8: Self = Self(0x811);
    pub const FLOAT_RG11B10: Self = Self(0x816);
    pub const FLOAT_X8X24: Self = Self(0x81c);
    pub const FLOAT_R32: Self = Self(0x80e);
    pub const FLOAT_RG32: Self = Self(0x81e);
    pub const FLOAT_RGBA16: Self = Self(0x820);
    pub const FLOAT_RGBA32: Self = Self(0x823);

    /// The low 6 bits: the part of the code that identifies channel layout
    /// independent of numeric interpretation.
    pub fn base_id(self) -> u32 {
        self.0 & 0x3f
    }

    /// Bits 8-11: unorm(0) / uint(1) / snorm(2) / sint(3) / srgb(4) / float(8).
    fn kind_bits(self) -> u32 {
        (self.0 & 0xf00) >> 8
    }

    pub fn is_uint(self) -> bool {
        self.kind_bits() == 1
    }

    pub fn is_sint(self) -> bool {
        self.kind_bits() == 3
    }

    /// Resolves the signedness ambiguity left open by the distilled format
    /// description: a format is signed-normalized exactly when its kind
    /// nibble is 2, matching every `Snorm_*` constant above (e.g. BC4/BC5
    /// ATI2 variants used for normal maps).
    pub fn is_snorm(self) -> bool {
        self.kind_bits() == 2
    }

    pub fn is_srgb(self) -> bool {
        self.kind_bits() == 4
    }

    pub fn is_float(self) -> bool {
        self.kind_bits() & 0x8 != 0
    }

    pub fn is_compressed(self) -> bool {
        matches!(self.base_id(), 0x31..=0x35)
    }

    /// Bits per pixel for uncompressed formats, or bits per 4x4 block for
    /// compressed ones. `None` for formats this crate doesn't decode
    /// (depth/stencil and packed-float formats carried only for round-trip
    /// framing, not pixel access).
    pub fn bits_per_pixel(self) -> Option<u32> {
        Some(match self.base_id() {
            0x01 => 8,   // R8 / NV12 luma plane
            0x02 => 8,   // RG4
            0x05 => 16,  // R16
            0x06 => 16,  // Float_R16
            0x07 => 16,  // RG8
            0x08 => 16,  // RGB565
            0x0a => 16,  // RGB5A1
            0x0b => 16,  // RGBA4
            0x0c => 16,  // A1BGR5
            0x0d => 32,  // R32
            0x0e => 32,  // Float_R32
            0x0f => 32,  // RG16
            0x10 => 32,  // Float_RG16
            0x11 => 32,  // R24X8 / Float_D24S8 / Uint_X24G8
            0x16 => 32,  // Float_RG11B10
            0x19 => 32,  // RGB10A2
            0x1a => 32,  // RGBA8
            0x1b => 32,  // A2BGR10
            0x1c => 32,  // Uint_G8X24 / Float_X8X24
            0x1d => 64,  // RG32
            0x1e => 64,  // Float_RG32
            0x1f => 64,  // RGBA16
            0x20 => 64,  // Float_RGBA16
            0x22 => 128, // RGBA32 (u/s int)
            0x23 => 128, // Float_RGBA32
            0x31 => 64,  // BC1
            0x32 => 128, // BC2
            0x33 => 128, // BC3
            0x34 => 64,  // BC4
            0x35 => 128, // BC5
            _ => return None,
        })
    }

    /// Channel layout for the formats this crate can reformat or decode to
    /// RGBA8: L8, LA4, LA8, RGB565, RGB5A1, RGBA4, BGR10A2, RGBA8, and BC1-5.
    /// Every other format id returns `None`; the container still frames
    /// them, but pixel access is out of scope (the original exporter raises
    /// `NotImplementedError` on the same set this rejects).
    pub fn channel_kind(self) -> Option<ChannelKind> {
        Some(match self.base_id() {
            0x01 => ChannelKind::R8,
            0x02 => ChannelKind::RG4,
            0x07 => ChannelKind::RG8,
            0x08 => ChannelKind::RGB565,
            0x0a => ChannelKind::RGB5A1,
            0x0b => ChannelKind::RGBA4,
            0x19 => ChannelKind::BGR10A2,
            0x1a => ChannelKind::RGBA8,
            0x31 => ChannelKind::Bc1,
            0x32 => ChannelKind::Bc2,
            0x33 => ChannelKind::Bc3,
            0x34 => ChannelKind::Bc4,
            0x35 => ChannelKind::Bc5,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_id_ignores_kind_bits() {
        assert_eq!(0x31, GX2SurfaceFormat::UNORM_BC1.base_id());
        assert_eq!(0x31, GX2SurfaceFormat::SRGB_BC1.base_id());
    }

    #[test]
    fn snorm_detection_matches_bc4_bc5_variants() {
        assert!(GX2SurfaceFormat::SNORM_BC4.is_snorm());
        assert!(GX2SurfaceFormat::SNORM_BC5.is_snorm());
        assert!(!GX2SurfaceFormat::UNORM_BC4.is_snorm());
        assert!(!GX2SurfaceFormat::UNORM_BC1.is_snorm());
    }

    #[test]
    fn srgb_flag_independent_of_base_format() {
        assert!(GX2SurfaceFormat::SRGB_RGBA8.is_srgb());
        assert!(!GX2SurfaceFormat::UNORM_RGBA8.is_srgb());
        assert_eq!(
            GX2SurfaceFormat::SRGB_RGBA8.base_id(),
            GX2SurfaceFormat::UNORM_RGBA8.base_id()
        );
    }

    #[test]
    fn bits_per_pixel_known_formats() {
        assert_eq!(Some(32), GX2SurfaceFormat::UNORM_RGBA8.bits_per_pixel());
        assert_eq!(Some(64), GX2SurfaceFormat::UNORM_BC1.bits_per_pixel());
        assert_eq!(Some(128), GX2SurfaceFormat::UNORM_BC3.bits_per_pixel());
        assert_eq!(None, GX2SurfaceFormat::INVALID.bits_per_pixel());
    }

    #[test]
    fn compressed_formats_are_bc1_through_bc5_only() {
        assert!(GX2SurfaceFormat::UNORM_BC1.is_compressed());
        assert!(GX2SurfaceFormat::SNORM_BC5.is_compressed());
        assert!(!GX2SurfaceFormat::UNORM_RGBA8.is_compressed());
    }

    #[test]
    fn channel_kind_is_none_for_unsupported_formats() {
        assert_eq!(None, GX2SurfaceFormat::INVALID.channel_kind());
        assert_eq!(
            Some(ChannelKind::RGBA8),
            GX2SurfaceFormat::UNORM_RGBA8.channel_kind()
        );
    }

    #[test]
    fn channel_kind_rejects_formats_outside_the_png_export_allowlist() {
        // The original exporter raises NotImplementedError for every format
        // not in its `formats` table; these ids have a bits_per_pixel() but
        // no pixel-level decode path.
        assert_eq!(None, GX2SurfaceFormat::UNORM_A1BGR5.channel_kind());
        assert_eq!(None, GX2SurfaceFormat::UNORM_R16.channel_kind());
        assert_eq!(None, GX2SurfaceFormat::UNORM_RG16.channel_kind());
        assert_eq!(None, GX2SurfaceFormat::UNORM_R24X8.channel_kind());
        assert_eq!(None, GX2SurfaceFormat::UNORM_A2BGR10.channel_kind());
        assert_eq!(None, GX2SurfaceFormat::UNORM_RGBA16.channel_kind());
    }

    #[test]
    fn channel_kind_bgr10a2_maps_to_base_id_0x19() {
        assert_eq!(
            Some(ChannelKind::BGR10A2),
            GX2SurfaceFormat::UNORM_RGB10A2.channel_kind()
        );
    }
}
