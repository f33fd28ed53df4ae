//! Small fixed-value enums and bitsets from the GX2 surface descriptor that
//! don't carry enough behavior to deserve their own module.

/// `GX2SurfaceDim`. Only `Dim2D` is exercised by this crate; the others are
/// recognized on parse (so a container round-trips its framing) but every
/// operation that touches pixel data rejects anything other than 2D.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GX2SurfaceDim {
    Dim1D = 0,
    Dim2D = 1,
    Dim3D = 2,
    DimCube = 3,
    Dim1DArray = 4,
    Dim2DArray = 5,
    Dim2DMsaa = 6,
    Dim2DMsaaArray = 7,
}

impl TryFrom<u32> for GX2SurfaceDim {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Dim1D,
            1 => Self::Dim2D,
            2 => Self::Dim3D,
            3 => Self::DimCube,
            4 => Self::Dim1DArray,
            5 => Self::Dim2DArray,
            6 => Self::Dim2DMsaa,
            7 => Self::Dim2DMsaaArray,
            other => return Err(other),
        })
    }
}

/// `GX2AAMode`. This crate only supports `Mode1X`; anything else is a
/// non-goal (multisampled surfaces).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GX2AAMode {
    Mode1X = 0,
    Mode2X = 1,
    Mode4X = 2,
    Mode8X = 3,
}

impl TryFrom<u32> for GX2AAMode {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Mode1X,
            1 => Self::Mode2X,
            2 => Self::Mode4X,
            3 => Self::Mode8X,
            other => return Err(other),
        })
    }
}

/// `GX2SurfaceUse`, a bitset. Kept as a raw `u32` newtype with named bit
/// constants rather than a `bitflags` type, matching how small flag words
/// elsewhere in this crate (e.g. `swizzle`) are modeled as plain integers
/// with helper masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GX2SurfaceUse(pub u32);

impl GX2SurfaceUse {
    pub const TEXTURE: u32 = 1 << 0;
    pub const COLOR_BUFFER: u32 = 1 << 1;
    pub const DEPTH_BUFFER: u32 = 1 << 2;
    pub const SCAN_BUFFER: u32 = 1 << 3;
    pub const TV: u32 = 1 << 31;

    pub fn contains_texture(self) -> bool {
        self.0 & Self::TEXTURE != 0
    }

    pub fn is_scan_buffer(self) -> bool {
        self.0 & Self::SCAN_BUFFER != 0
    }

    pub fn is_depth_buffer(self) -> bool {
        self.0 & Self::DEPTH_BUFFER != 0
    }
}
