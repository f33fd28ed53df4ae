//! Converts uncompressed GX2 pixel formats to RGBA8, applying the
//! texture's component selectors on the way out. BCn formats go through
//! [`crate::bcn`] first; this module only handles native-channel formats.

use thiserror::Error;

use crate::format::ChannelKind;
use crate::texture::Component;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReformatError {
    #[error("input is {got} bytes, expected {expected} for a {width}x{height} image at {bytes_per_pixel} bytes/pixel")]
    InputLength {
        expected: usize,
        got: usize,
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
    },
}

/// Extracts the native RGBA channels of one pixel (as 0..255 values, with
/// any channel absent from the format left at 0) so [`to_rgba8`] can remap
/// them through `comp_sel` uniformly regardless of source layout.
fn native_channels(kind: ChannelKind, bytes: &[u8]) -> [u8; 4] {
    match kind {
        ChannelKind::R8 => [bytes[0], 0, 0, 0],
        ChannelKind::RG4 => {
            let b = bytes[0];
            let r = b & 0xf;
            let g = b >> 4;
            [(r << 4) | r, (g << 4) | g, 0, 0]
        }
        ChannelKind::RG8 => [bytes[0], bytes[1], 0, 0],
        ChannelKind::RGB565 => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]);
            let r5 = (v >> 11) & 0x1f;
            let g6 = (v >> 5) & 0x3f;
            let b5 = v & 0x1f;
            [
                ((r5 << 3) | (r5 >> 2)) as u8,
                ((g6 << 2) | (g6 >> 4)) as u8,
                ((b5 << 3) | (b5 >> 2)) as u8,
                255,
            ]
        }
        ChannelKind::RGB5A1 => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]);
            let r5 = (v >> 11) & 0x1f;
            let g5 = (v >> 6) & 0x1f;
            let b5 = (v >> 1) & 0x1f;
            let a1 = v & 0x1;
            [
                ((r5 << 3) | (r5 >> 2)) as u8,
                ((g5 << 3) | (g5 >> 2)) as u8,
                ((b5 << 3) | (b5 >> 2)) as u8,
                if a1 == 1 { 255 } else { 0 },
            ]
        }
        ChannelKind::RGBA4 => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]);
            let r4 = (v >> 12) & 0xf;
            let g4 = (v >> 8) & 0xf;
            let b4 = (v >> 4) & 0xf;
            let a4 = v & 0xf;
            [
                ((r4 << 4) | r4) as u8,
                ((g4 << 4) | g4) as u8,
                ((b4 << 4) | b4) as u8,
                ((a4 << 4) | a4) as u8,
            ]
        }
        ChannelKind::BGR10A2 => {
            let v = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let r10 = v & 0x3ff;
            let g10 = (v >> 10) & 0x3ff;
            let b10 = (v >> 20) & 0x3ff;
            let a2 = (v >> 30) & 0x3;
            [
                (r10 >> 2) as u8,
                (g10 >> 2) as u8,
                (b10 >> 2) as u8,
                ((a2 * 85) & 0xff) as u8,
            ]
        }
        ChannelKind::RGBA8 => [bytes[0], bytes[1], bytes[2], bytes[3]],
        ChannelKind::Bc1 | ChannelKind::Bc2 | ChannelKind::Bc3 | ChannelKind::Bc4 | ChannelKind::Bc5 => {
            unreachable!("compressed formats are decoded by crate::bcn, not reformat")
        }
    }
}

fn select(native: [u8; 4], component: Component) -> u8 {
    match component {
        Component::R => native[0],
        Component::G => native[1],
        Component::B => native[2],
        Component::A => native[3],
        Component::Zero => 0,
        Component::One => 255,
    }
}

/// Remaps an already-decoded RGBA8 buffer (4 bytes/pixel, native channel
/// order) through `comp_sel`. BCn decode output is already shaped this way
/// (see [`crate::bcn`]), so this is the hook PNG export uses to apply a
/// texture's component selector to compressed formats, which bypass
/// [`to_rgba8`] entirely.
pub fn remap_rgba8(native: &[u8], comp_sel: [Component; 4]) -> Vec<u8> {
    let mut out = vec![0u8; native.len()];
    for (src, dst) in native.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
        let pixel = [src[0], src[1], src[2], src[3]];
        dst[0] = select(pixel, comp_sel[0]);
        dst[1] = select(pixel, comp_sel[1]);
        dst[2] = select(pixel, comp_sel[2]);
        dst[3] = select(pixel, comp_sel[3]);
    }
    out
}

/// Converts a `width x height` image of `kind`-shaped pixels at
/// `bytes_per_pixel` stride into RGBA8, remapping channels through
/// `comp_sel`.
pub fn to_rgba8(
    width: u32,
    height: u32,
    data: &[u8],
    kind: ChannelKind,
    bytes_per_pixel: u32,
    comp_sel: [Component; 4],
) -> Result<Vec<u8>, ReformatError> {
    let expected = width as usize * height as usize * bytes_per_pixel as usize;
    if data.len() < expected {
        return Err(ReformatError::InputLength {
            expected,
            got: data.len(),
            width,
            height,
            bytes_per_pixel,
        });
    }

    let mut out = vec![0u8; width as usize * height as usize * 4];
    let stride = bytes_per_pixel as usize;

    for i in 0..(width as usize * height as usize) {
        let pixel = &data[i * stride..i * stride + stride];
        let native = native_channels(kind, pixel);
        out[i * 4] = select(native, comp_sel[0]);
        out[i * 4 + 1] = select(native, comp_sel[1]);
        out[i * 4 + 2] = select(native, comp_sel[2]);
        out[i * 4 + 3] = select(native, comp_sel[3]);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_passthrough_with_identity_comp_sel() {
        let data = [10u8, 20, 30, 40];
        let out = to_rgba8(
            1,
            1,
            &data,
            ChannelKind::RGBA8,
            4,
            [Component::R, Component::G, Component::B, Component::A],
        )
        .unwrap();
        assert_eq!(vec![10, 20, 30, 40], out);
    }

    #[test]
    fn comp_sel_can_force_constant_channels() {
        let data = [10u8, 20, 30, 40];
        let out = to_rgba8(
            1,
            1,
            &data,
            ChannelKind::RGBA8,
            4,
            [Component::Zero, Component::One, Component::R, Component::A],
        )
        .unwrap();
        assert_eq!(vec![0, 255, 10, 40], out);
    }

    #[test]
    fn rgb565_expands_to_full_8_bit_range_with_opaque_alpha() {
        // Pure red in RGB565: r=0x1f, g=0, b=0 -> little-endian 0xF800 -> bytes [0x00, 0xF8]
        let data = [0x00u8, 0xf8];
        let out = to_rgba8(
            1,
            1,
            &data,
            ChannelKind::RGB565,
            2,
            [Component::R, Component::G, Component::B, Component::A],
        )
        .unwrap();
        assert_eq!(vec![255, 0, 0, 255], out);
    }

    #[test]
    fn bgr10a2_scales_10_bit_channels_to_8_bit() {
        // r=0x3ff (full), g=b=0, a=0b11 (full) packed as bits [9:0]=r, [19:10]=g,
        // [29:20]=b, [31:30]=a, little-endian u32.
        let v: u32 = 0x3ff | (0b11 << 30);
        let data = v.to_le_bytes();
        let out = to_rgba8(
            1,
            1,
            &data,
            ChannelKind::BGR10A2,
            4,
            [Component::R, Component::G, Component::B, Component::A],
        )
        .unwrap();
        assert_eq!(vec![255, 0, 0, 255], out);
    }

    #[test]
    fn l8_reformat_replicates_red_into_rgb_via_comp_sel() {
        let data = [0x80u8];
        let out = to_rgba8(
            1,
            1,
            &data,
            ChannelKind::R8,
            1,
            [Component::R, Component::R, Component::R, Component::One],
        )
        .unwrap();
        assert_eq!(vec![0x80, 0x80, 0x80, 255], out);
    }

    #[test]
    fn rejects_truncated_input() {
        let data = [0u8; 2];
        let result = to_rgba8(2, 2, &data, ChannelKind::RGBA8, 4, [Component::R, Component::G, Component::B, Component::A]);
        assert!(result.is_err());
    }

    #[test]
    fn remap_rgba8_replicates_red_channel_for_grayscale_comp_sel() {
        // What a BC4-decoded (single-channel) texture looks like once
        // padded to RGBA8-native-shaped input: only R is meaningful.
        let native = [0x40u8, 0, 0, 0];
        let out = remap_rgba8(&native, [Component::R, Component::R, Component::R, Component::One]);
        assert_eq!(vec![0x40, 0x40, 0x40, 255], out);
    }
}
