//! A library for converting between Wii U GX2 GFD texture containers and
//! portable interchange formats (DDS, PNG).
//!
//! The core pipeline is [`gfd::GfdFile`] (container framing) wrapping
//! [`texture::GX2Texture`] (view + registers) wrapping [`surface::GX2Surface`]
//! (dimensions/format/tiling plus image bytes). [`addrlib`] supplies the
//! tiling math `surface` calls into; [`bcn`] and [`reformat`] turn decoded
//! pixel bytes into RGBA8; [`dds`] is the other container this crate speaks.
//! [`export`] (behind the `image` feature) untiles a texture and decodes it
//! mip-by-mip for PNG export.

use std::{
    io::{BufWriter, Read},
    path::Path,
};

pub mod addrlib;
pub mod bcn;
pub mod dds;
pub mod enums;
#[cfg(feature = "image")]
pub mod export;
pub mod format;
pub mod gfd;
pub mod reformat;
pub mod regs;
pub mod surface;
pub mod texture;
pub mod util;

use gfd::{GfdError, GfdFile};

impl GfdFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GfdError> {
        Self::parse(bytes)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GfdError> {
        let mut bytes = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GfdError> {
        use std::io::Write;

        let bytes = self.save()?;
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        writer.write_all(&bytes)?;
        Ok(())
    }
}
