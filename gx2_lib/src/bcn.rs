//! Decoders for the block-compressed formats GX2 textures may carry:
//! BC1/BC2/BC3 (DXT1/3/5) and BC4/BC5 (ATI1/ATI2). Encoding is out of
//! scope — these formats only need to come *out* of a GFD, for DDS export
//! or PNG export by way of the reformatter.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BcnError {
    #[error("BCn input is {got} bytes, expected {expected} for a {width}x{height} image at {block_bytes} bytes/block")]
    InputLength {
        expected: usize,
        got: usize,
        width: u32,
        height: u32,
        block_bytes: usize,
    },
}

fn div_round_up(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

fn decode_rgb565(value: u16) -> [u8; 3] {
    let r5 = (value >> 11) & 0x1f;
    let g6 = (value >> 5) & 0x3f;
    let b5 = value & 0x1f;
    [
        ((r5 << 3) | (r5 >> 2)) as u8,
        ((g6 << 2) | (g6 >> 4)) as u8,
        ((b5 << 3) | (b5 >> 2)) as u8,
    ]
}

/// Decodes one BC1 (DXT1) color block into 16 RGBA8 texels in row-major
/// order. `has_explicit_alpha` controls whether the 2-color-endpoint case
/// (`c0 <= c1`) produces a transparent fourth color (true DXT1) or just a
/// black one (used as the color half of BC2/BC3 blocks, which carry alpha
/// separately).
fn decode_bc1_block(block: &[u8; 8], has_explicit_alpha: bool) -> [[u8; 4]; 16] {
    let c0_raw = u16::from_le_bytes([block[0], block[1]]);
    let c1_raw = u16::from_le_bytes([block[2], block[3]]);
    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);

    let c0 = decode_rgb565(c0_raw);
    let c1 = decode_rgb565(c1_raw);

    let mix = |a: u8, b: u8, num: u32, den: u32| -> u8 { ((u32::from(a) * num + u32::from(b) * (den - num)) / den) as u8 };

    let palette: [[u8; 4]; 4] = if c0_raw > c1_raw || !has_explicit_alpha {
        [
            [c0[0], c0[1], c0[2], 255],
            [c1[0], c1[1], c1[2], 255],
            [
                mix(c0[0], c1[0], 2, 3),
                mix(c0[1], c1[1], 2, 3),
                mix(c0[2], c1[2], 2, 3),
                255,
            ],
            [
                mix(c0[0], c1[0], 1, 3),
                mix(c0[1], c1[1], 1, 3),
                mix(c0[2], c1[2], 1, 3),
                255,
            ],
        ]
    } else {
        [
            [c0[0], c0[1], c0[2], 255],
            [c1[0], c1[1], c1[2], 255],
            [
                mix(c0[0], c1[0], 1, 2),
                mix(c0[1], c1[1], 1, 2),
                mix(c0[2], c1[2], 1, 2),
                255,
            ],
            [0, 0, 0, 0],
        ]
    };

    let mut out = [[0u8; 4]; 16];
    for (i, texel) in out.iter_mut().enumerate() {
        let sel = (indices >> (i * 2)) & 0x3;
        *texel = palette[sel as usize];
    }
    out
}

fn decode_bc2_alpha_block(block: &[u8; 8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for i in 0..16 {
        let nibble_byte = block[i / 2];
        let nibble = if i % 2 == 0 { nibble_byte & 0xf } else { nibble_byte >> 4 };
        out[i] = (nibble << 4) | nibble;
    }
    out
}

fn decode_bc3_alpha_block(block: &[u8; 8]) -> [u8; 16] {
    let a0 = block[0];
    let a1 = block[1];
    let indices = u64::from_le_bytes([block[2], block[3], block[4], block[5], block[6], block[7], 0, 0]);

    let palette: [u8; 8] = if a0 > a1 {
        [
            a0,
            a1,
            ((6 * u32::from(a0) + 1 * u32::from(a1)) / 7) as u8,
            ((5 * u32::from(a0) + 2 * u32::from(a1)) / 7) as u8,
            ((4 * u32::from(a0) + 3 * u32::from(a1)) / 7) as u8,
            ((3 * u32::from(a0) + 4 * u32::from(a1)) / 7) as u8,
            ((2 * u32::from(a0) + 5 * u32::from(a1)) / 7) as u8,
            ((1 * u32::from(a0) + 6 * u32::from(a1)) / 7) as u8,
        ]
    } else {
        [
            a0,
            a1,
            ((4 * u32::from(a0) + 1 * u32::from(a1)) / 5) as u8,
            ((3 * u32::from(a0) + 2 * u32::from(a1)) / 5) as u8,
            ((2 * u32::from(a0) + 3 * u32::from(a1)) / 5) as u8,
            ((1 * u32::from(a0) + 4 * u32::from(a1)) / 5) as u8,
            0,
            255,
        ]
    };

    let mut out = [0u8; 16];
    for (i, a) in out.iter_mut().enumerate() {
        let sel = (indices >> (i * 3)) & 0x7;
        *a = palette[sel as usize];
    }
    out
}

/// Shared by BC4 (single channel) and BC5 (two channels): an 8-byte
/// "alpha-style" block with two endpoints and a 3-bit-per-texel index,
/// interpreted over signed or unsigned endpoints.
fn decode_bc4_channel_block(block: &[u8; 8], snorm: bool) -> [u8; 16] {
    if snorm {
        let e0 = block[0] as i8;
        let e1 = block[1] as i8;
        let indices = u64::from_le_bytes([block[2], block[3], block[4], block[5], block[6], block[7], 0, 0]);

        let to_unorm = |v: i32| -> u8 { (v.clamp(-127, 127) + 128) as u8 };

        let palette: [i32; 8] = if e0 > e1 {
            [
                e0 as i32,
                e1 as i32,
                (6 * e0 as i32 + 1 * e1 as i32) / 7,
                (5 * e0 as i32 + 2 * e1 as i32) / 7,
                (4 * e0 as i32 + 3 * e1 as i32) / 7,
                (3 * e0 as i32 + 4 * e1 as i32) / 7,
                (2 * e0 as i32 + 5 * e1 as i32) / 7,
                (1 * e0 as i32 + 6 * e1 as i32) / 7,
            ]
        } else {
            [
                e0 as i32,
                e1 as i32,
                (4 * e0 as i32 + 1 * e1 as i32) / 5,
                (3 * e0 as i32 + 2 * e1 as i32) / 5,
                (2 * e0 as i32 + 3 * e1 as i32) / 5,
                (1 * e0 as i32 + 4 * e1 as i32) / 5,
                -127,
                127,
            ]
        };

        let mut out = [0u8; 16];
        for (i, v) in out.iter_mut().enumerate() {
            let sel = (indices >> (i * 3)) & 0x7;
            *v = to_unorm(palette[sel as usize]);
        }
        out
    } else {
        decode_bc3_alpha_block(block)
    }
}

/// Decodes a BC1 (DXT1) image into RGBA8, row-major, 4 bytes/texel.
pub fn decode_bc1(width: u32, height: u32, data: &[u8]) -> Result<Vec<u8>, BcnError> {
    decode_blocky(width, height, data, 8, |block| {
        let block: &[u8; 8] = block.try_into().unwrap();
        decode_bc1_block(block, true)
    })
}

/// Decodes a BC2 (DXT3) image into RGBA8: explicit 4-bit alpha plus a BC1
/// color block (with the implicit-alpha palette variant, since alpha is
/// carried separately).
pub fn decode_bc2(width: u32, height: u32, data: &[u8]) -> Result<Vec<u8>, BcnError> {
    decode_blocky(width, height, data, 16, |block| {
        let alpha_block: &[u8; 8] = block[0..8].try_into().unwrap();
        let color_block: &[u8; 8] = block[8..16].try_into().unwrap();
        let alpha = decode_bc2_alpha_block(alpha_block);
        let mut colors = decode_bc1_block(color_block, false);
        for (texel, a) in colors.iter_mut().zip(alpha) {
            texel[3] = a;
        }
        colors
    })
}

/// Decodes a BC3 (DXT5) image into RGBA8: interpolated 8-level alpha plus
/// a BC1 color block.
pub fn decode_bc3(width: u32, height: u32, data: &[u8]) -> Result<Vec<u8>, BcnError> {
    decode_blocky(width, height, data, 16, |block| {
        let alpha_block: &[u8; 8] = block[0..8].try_into().unwrap();
        let color_block: &[u8; 8] = block[8..16].try_into().unwrap();
        let alpha = decode_bc3_alpha_block(alpha_block);
        let mut colors = decode_bc1_block(color_block, false);
        for (texel, a) in colors.iter_mut().zip(alpha) {
            texel[3] = a;
        }
        colors
    })
}

/// Decodes a BC4 (ATI1) image into single-channel (L8) output, one byte
/// per texel, replicated into the red channel by convention elsewhere.
pub fn decode_bc4(width: u32, height: u32, data: &[u8], snorm: bool) -> Result<Vec<u8>, BcnError> {
    decode_blocky_single(width, height, data, 8, |block| {
        let block: &[u8; 8] = block.try_into().unwrap();
        decode_bc4_channel_block(block, snorm)
    })
}

/// Decodes a BC5 (ATI2) image into RG8 (two interpolated channels, blue
/// and alpha left at 0/255 by convention elsewhere), 4 bytes/texel output
/// to keep a uniform RGBA8 stride with the other decoders.
pub fn decode_bc5(width: u32, height: u32, data: &[u8], snorm: bool) -> Result<Vec<u8>, BcnError> {
    decode_blocky(width, height, data, 16, |block| {
        let r_block: &[u8; 8] = block[0..8].try_into().unwrap();
        let g_block: &[u8; 8] = block[8..16].try_into().unwrap();
        let r = decode_bc4_channel_block(r_block, snorm);
        let g = decode_bc4_channel_block(g_block, snorm);
        let mut out = [[0u8; 4]; 16];
        for i in 0..16 {
            out[i] = [r[i], g[i], 0, 255];
        }
        out
    })
}

fn decode_blocky(
    width: u32,
    height: u32,
    data: &[u8],
    block_bytes: usize,
    decode: impl Fn(&[u8]) -> [[u8; 4]; 16],
) -> Result<Vec<u8>, BcnError> {
    let blocks_wide = div_round_up(width, 4);
    let blocks_high = div_round_up(height, 4);
    let expected = blocks_wide as usize * blocks_high as usize * block_bytes;
    if data.len() < expected {
        return Err(BcnError::InputLength {
            expected,
            got: data.len(),
            width,
            height,
            block_bytes,
        });
    }

    let mut out = vec![0u8; (width as usize) * (height as usize) * 4];

    for by in 0..blocks_high {
        for bx in 0..blocks_wide {
            let block_index = (by * blocks_wide + bx) as usize;
            let block = &data[block_index * block_bytes..block_index * block_bytes + block_bytes];
            let texels = decode(block);

            for ty in 0..4u32 {
                for tx in 0..4u32 {
                    let x = bx * 4 + tx;
                    let y = by * 4 + ty;
                    if x >= width || y >= height {
                        continue;
                    }
                    let texel = texels[(ty * 4 + tx) as usize];
                    let out_index = (y as usize * width as usize + x as usize) * 4;
                    out[out_index..out_index + 4].copy_from_slice(&texel);
                }
            }
        }
    }

    Ok(out)
}

fn decode_blocky_single(
    width: u32,
    height: u32,
    data: &[u8],
    block_bytes: usize,
    decode: impl Fn(&[u8]) -> [u8; 16],
) -> Result<Vec<u8>, BcnError> {
    let blocks_wide = div_round_up(width, 4);
    let blocks_high = div_round_up(height, 4);
    let expected = blocks_wide as usize * blocks_high as usize * block_bytes;
    if data.len() < expected {
        return Err(BcnError::InputLength {
            expected,
            got: data.len(),
            width,
            height,
            block_bytes,
        });
    }

    let mut out = vec![0u8; (width as usize) * (height as usize)];

    for by in 0..blocks_high {
        for bx in 0..blocks_wide {
            let block_index = (by * blocks_wide + bx) as usize;
            let block = &data[block_index * block_bytes..block_index * block_bytes + block_bytes];
            let texels = decode(block);

            for ty in 0..4u32 {
                for tx in 0..4u32 {
                    let x = bx * 4 + tx;
                    let y = by * 4 + ty;
                    if x >= width || y >= height {
                        continue;
                    }
                    out[y as usize * width as usize + x as usize] = texels[(ty * 4 + tx) as usize];
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_single_opaque_black_bc1_block() {
        // c0 = c1 = 0x0000 (black, opaque since c0 <= c1 uses the 4-color
        // path when has_explicit_alpha and equal raw values), indices all 0.
        let block = hexlit::hex!("00 00 FF FF 00 00 00 00");
        let pixels = decode_bc1(4, 4, &block).unwrap();
        assert_eq!(4 * 4 * 4, pixels.len());
        for texel in pixels.chunks_exact(4) {
            assert_eq!([0, 0, 0, 255], texel);
        }
    }

    #[test]
    fn bc1_rejects_truncated_input() {
        let short = [0u8; 4];
        assert!(decode_bc1(4, 4, &short).is_err());
    }

    #[test]
    fn bc4_unorm_endpoints_decode_to_known_extremes() {
        let block = [255u8, 0, 0, 0, 0, 0, 0, 0]; // all indices 0 -> endpoint a0=255
        let pixels = decode_bc4(4, 4, &block, false).unwrap();
        assert!(pixels.iter().all(|&p| p == 255));
    }

    #[test]
    fn bc5_produces_rgba8_stride_with_fixed_blue_and_alpha() {
        let block = [0u8; 16];
        let pixels = decode_bc5(4, 4, &block, false).unwrap();
        for texel in pixels.chunks_exact(4) {
            assert_eq!(0, texel[2]);
            assert_eq!(255, texel[3]);
        }
    }

    #[test]
    fn decode_handles_non_multiple_of_4_dimensions_by_cropping() {
        // 2x2 image still needs one full 4x4 block of input.
        let block = hexlit::hex!("00 00 00 00 00 00 00 00");
        let pixels = decode_bc1(2, 2, &block).unwrap();
        assert_eq!(2 * 2 * 4, pixels.len());
    }
}
