//! Synthesis of the five GX2 texture register words (`regs[0..5]` in
//! `GX2Texture`) from a surface's dimensions, format and tiling choice.
//!
//! These words are consumed directly by the GPU and don't round-trip
//! through anything else in this crate, so they're built with plain
//! bit-packing functions mirroring the reference register layout rather
//! than `bilge` bitfields: several fields (`format_comp`) are replicated
//! across four non-contiguous ranges of the same word, which doesn't map
//! onto a 1:1 bitfield struct.

use crate::format::GX2SurfaceFormat;
use crate::texture::CompSel;

fn register0(width_m1: u32, pitch_div8_m1: u32, tile_type: u32, tile_mode: u32, dim: u32) -> u32 {
    (width_m1 & 0x1fff) << 19
        | (pitch_div8_m1 & 0x7ff) << 8
        | (tile_type & 0x1) << 7
        | (tile_mode & 0xf) << 3
        | (dim & 0x7)
}

fn register1(format: u32, depth: u32, height_m1: u32) -> u32 {
    (format & 0x3f) << 26 | (depth & 0x1fff) << 13 | (height_m1 & 0x1fff)
}

#[allow(clippy::too_many_arguments)]
fn register2(
    base_level: u32,
    dst_sel_w: u32,
    dst_sel_z: u32,
    dst_sel_y: u32,
    dst_sel_x: u32,
    request_size: u32,
    endian: u32,
    force_degamma: u32,
    surf_mode: u32,
    num_format: u32,
    format_comp: u32,
) -> u32 {
    (base_level & 0x7) << 28
        | (dst_sel_w & 0x7) << 25
        | (dst_sel_z & 0x7) << 22
        | (dst_sel_y & 0x7) << 19
        | (dst_sel_x & 0x7) << 16
        | (request_size & 0x3) << 14
        | (endian & 0x3) << 12
        | (force_degamma & 0x1) << 11
        | (surf_mode & 0x1) << 10
        | (num_format & 0x3) << 8
        | (format_comp & 0x3) << 6
        | (format_comp & 0x3) << 4
        | (format_comp & 0x3) << 2
        | (format_comp & 0x3)
}

fn register3(yuv_conv: u32, last_array: u32, base_array: u32, last_level: u32) -> u32 {
    (yuv_conv & 0x3) << 30 | (last_array & 0x1fff) << 17 | (base_array & 0x1fff) << 4 | (last_level & 0xf)
}

fn register4(
    type_: u32,
    advis_clamp_lod: u32,
    advis_fault_lod: u32,
    interlaced: u32,
    perf_modulation: u32,
    max_aniso_ratio: u32,
    mpeg_clamp: u32,
) -> u32 {
    (type_ & 0x3) << 30
        | (advis_clamp_lod & 0x3f) << 13
        | (advis_fault_lod & 0xf) << 9
        | (interlaced & 0x1) << 8
        | (perf_modulation & 0x7) << 5
        | (max_aniso_ratio & 0x7) << 2
        | (mpeg_clamp & 0x3)
}

/// Packs the five register words for a 2D texture.
///
/// `tile_type` and `dim` are hardcoded to the values the reference encoder
/// always uses for 2D surfaces (`0` and `1` respectively); 3D/cube surfaces
/// are out of scope for this crate, so no caller ever needs a different
/// value here.
pub fn calc_regs(
    width: u32,
    height: u32,
    num_mips: u32,
    format: GX2SurfaceFormat,
    tile_mode: u32,
    pitch: u32,
    comp_sel: CompSel,
    surf_mode: u32,
    perf_modulation: u32,
) -> [u32; 5] {
    let pitch = pitch.max(8);

    let r0 = register0(width - 1, pitch / 8 - 1, 0, tile_mode, 1);
    let r1 = register1(format.0, 0, height - 1);

    let format_comp = u32::from(format.is_snorm() || format.is_sint());
    let num_format = if format.is_float() {
        2
    } else if format.is_uint() || format.is_sint() {
        1
    } else {
        0
    };
    let force_degamma = u32::from(format.is_srgb());

    let r2 = register2(
        0,
        comp_sel.w() as u32,
        comp_sel.z() as u32,
        comp_sel.y() as u32,
        comp_sel.x() as u32,
        2,
        0,
        force_degamma,
        surf_mode,
        num_format,
        format_comp,
    );

    let r3 = register3(0, 0, 0, num_mips - 1);
    let r4 = register4(2, 0, 0, 0, perf_modulation, 4, 0);

    [r0, r1, r2, r3, r4]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Component;

    #[test]
    fn register0_packs_width_pitch_tile_mode() {
        // width=64 -> width-1=63, pitch=64 -> pitch/8-1=7, tileMode=4, dim=1
        let r0 = register0(63, 7, 0, 4, 1);
        assert_eq!(63 << 19 | 7 << 8 | 4 << 3 | 1, r0);
    }

    #[test]
    fn register2_replicates_format_comp_across_four_slots() {
        let r2 = register2(0, 0, 0, 0, 0, 2, 0, 0, 1, 0, 3);
        assert_eq!(3 << 6 | 3 << 4 | 3 << 2 | 3, r2 & 0xff);
    }

    #[test]
    fn calc_regs_sets_num_format_for_sint_as_well_as_uint() {
        // format & 0x100 is set for both the Uint (0x100) and Sint (0x300)
        // kind nibbles, so numFormat=1 must trigger for either, not just Uint.
        let regs = calc_regs(
            64,
            64,
            1,
            GX2SurfaceFormat::SINT_RGBA8,
            4,
            64,
            CompSel::RGBA,
            0,
            7,
        );
        assert_eq!(1, (regs[2] >> 8) & 0x3);
    }

    #[test]
    fn calc_regs_matches_reference_formula_for_rgba8_2d() {
        let regs = calc_regs(
            64,
            64,
            1,
            GX2SurfaceFormat::UNORM_RGBA8,
            4,
            64,
            CompSel::new(Component::R, Component::G, Component::B, Component::A),
            0,
            7,
        );

        assert_eq!(63 << 19 | 7 << 8 | 4 << 3 | 1, regs[0]);
        assert_eq!((0x1a) << 26 | 63, regs[1]);
        assert_eq!(0, regs[3] & 0xf);
        assert_eq!(2 << 30 | 7 << 5 | 4 << 2, regs[4]);
    }
}
