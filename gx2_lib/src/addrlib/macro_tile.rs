//! Macro-tile addressing: the pipe/bank interleave that sits above the
//! micro-tile grid for every `Tiled_2*` tile mode.
//!
//! GX2 hardware is fixed at `NUM_PIPES = 2`, `NUM_BANKS = 4`, so a macro
//! tile always spans exactly `NUM_PIPES * NUM_BANKS = 8` micro-tiles; the
//! `Thin1`/`Thin2`/`Thin4` suffix says how those 8 are arranged (wide vs.
//! tall) without changing the count. Within one macro tile, the swizzle
//! bits XOR-permute which of the 8 (pipe, bank) slots a given micro-tile
//! position lands in; `2B_*` variants additionally flip the bank half of
//! that permutation for alternating columns of macro tiles (the hardware's
//! "bank swap" used to spread write-combining pressure across banks).

use super::TileMode;

pub const NUM_PIPES: u32 = 2;
pub const NUM_BANKS: u32 = 4;
const MICRO_TILE_DIM: u32 = 8;

/// Micro-tiles spanned by one macro tile, as `(width, height)`. The product
/// is always `NUM_PIPES * NUM_BANKS`.
pub fn macro_tile_micro_dims(tile_mode: TileMode) -> (u32, u32) {
    match tile_mode {
        TileMode::Tiled2DThin2 | TileMode::Tiled2BThin2 => (NUM_BANKS / 2, NUM_PIPES * 2),
        TileMode::Tiled2DThin4 | TileMode::Tiled2BThin4 => (NUM_BANKS / 4, NUM_PIPES * 4),
        _ => (NUM_BANKS, NUM_PIPES),
    }
}

/// Macro tile footprint in pixels (or blocks, for compressed formats).
pub fn macro_tile_pixel_dims(tile_mode: TileMode) -> (u32, u32) {
    let (w, h) = macro_tile_micro_dims(tile_mode);
    (w * MICRO_TILE_DIM, h * MICRO_TILE_DIM)
}

fn is_bank_swapped(tile_mode: TileMode) -> bool {
    matches!(
        tile_mode,
        TileMode::Tiled2BThin1 | TileMode::Tiled2BThin2 | TileMode::Tiled2BThin4
    )
}

/// Permutes the raster-order local index (`0..NUM_PIPES*NUM_BANKS`) of a
/// micro-tile within its macro tile to the slot the swizzle bits route it
/// to. XOR-based, so this is its own inverse for a fixed swizzle value,
/// which is what lets `swizzle`/`deswizzle` share one address function.
pub fn permute_local_index(
    local_index: u32,
    macro_col: u32,
    tile_mode: TileMode,
    pipe_swizzle: u32,
    bank_swizzle: u32,
) -> u32 {
    let mut swizzle_bits = (pipe_swizzle & (NUM_PIPES - 1)) | ((bank_swizzle & (NUM_BANKS - 1)) << 1);

    if is_bank_swapped(tile_mode) && macro_col % 2 == 1 {
        // Flip the bank half of the permutation for every other macro-tile
        // column; the pipe half (bit 0) is left alone.
        swizzle_bits ^= (NUM_BANKS - 1) << 1;
    }

    local_index ^ swizzle_bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_tile_dims_total_eight_microtiles_for_every_thin_variant() {
        for mode in [TileMode::Tiled2DThin1, TileMode::Tiled2DThin2, TileMode::Tiled2DThin4] {
            let (w, h) = macro_tile_micro_dims(mode);
            assert_eq!(NUM_PIPES * NUM_BANKS, w * h);
        }
    }

    #[test]
    fn permute_local_index_is_a_bijection_over_one_macro_tile() {
        let mut seen = [false; 8];
        for local in 0..8 {
            let p = permute_local_index(local, 0, TileMode::Tiled2DThin1, 1, 2) as usize;
            assert!(!seen[p]);
            seen[p] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn permute_local_index_is_its_own_inverse() {
        let p = permute_local_index(5, 2, TileMode::Tiled2BThin1, 1, 3);
        let back = permute_local_index(p, 2, TileMode::Tiled2BThin1, 1, 3);
        assert_eq!(5, back);
    }
}
