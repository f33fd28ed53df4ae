//! Import/export pipeline for the `gx2_tex` binary: DDS/PNG on one side,
//! `.gtx`/`.gsh` GFD texture containers on the other. The flag surface and
//! behavior mirror the original importer/exporter scripts (`-i`/`-o`/`-a`,
//! the version/tileMode/swizzle/compSel knobs); the container and tiling
//! work itself is all `gx2_lib`.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::Args;

use gx2_lib::addrlib::TileMode;
use gx2_lib::dds;
use gx2_lib::export::rgba_mip_levels;
use gx2_lib::format::GX2SurfaceFormat;
use gx2_lib::gfd::GfdFile;
use gx2_lib::texture::{Component, GX2Texture};

#[derive(Args)]
pub struct ImportArgs {
    /// Input PNG/DDS file(s) or glob patterns. A single DDS file carries its
    /// own mip chain; multiple PNG files are successive mip levels of one
    /// texture, base level first.
    #[arg(short = 'i', required = true, num_args = 1..)]
    input: Vec<String>,

    /// Output .gtx/.gsh file. Defaults to the first input's name with any
    /// `_image0_level0`/`_image0`/`_level0` suffix stripped and `.gtx`
    /// appended.
    #[arg(short = 'o')]
    output: Option<String>,

    /// Append the imported texture to an existing GFD file instead of
    /// creating a new one. The file to append to is the output path.
    #[arg(short = 'a')]
    append: bool,

    /// Disable padding the image/mip data blocks to the surface alignment.
    #[arg(long = "no-align")]
    no_align: bool,

    /// Write a version 6.0 GFD container.
    #[arg(long = "v6")]
    v6: bool,
    /// Write a version 6.1 GFD container.
    #[arg(long = "v6_1")]
    v6_1: bool,
    /// Write a version 7.1 GFD container (default).
    #[arg(long = "v7")]
    v7: bool,

    /// GX2TileMode to retile the imported surface into (0-16). Defaults to
    /// whatever the hardware's default tiling resolves to for this surface.
    #[arg(long = "tileMode", default_value_t = 0)]
    tile_mode: u32,

    /// Macro-tile bank/pipe swizzle bits (0-7).
    #[arg(long = "swizzle", default_value_t = 0)]
    swizzle: u32,

    /// Import into the sRGB counterpart of the detected/chosen format.
    #[arg(long = "SRGB")]
    srgb: bool,

    /// Four-character component selector over R/G/B/A/0/1, e.g. `RGBA` or
    /// `RGB1`. Defaults to a straight `RGBA` passthrough.
    #[arg(long = "compSel")]
    comp_sel: Option<String>,
}

#[derive(Args)]
pub struct ExportArgs {
    /// The .gtx/.gsh file to export textures from.
    input: String,

    /// Output file (single texture) or basename (multiple textures, which
    /// get `_image{n}` appended). Defaults to the input path without its
    /// extension.
    #[arg(short = 'o')]
    output: Option<String>,

    /// Export to PNG instead of DDS.
    #[arg(long)]
    png: bool,
}

fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if Path::new(pattern).is_file() {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let walker = globwalk::GlobWalkerBuilder::from_patterns(".", &[pattern])
            .build()
            .with_context(|| format!("invalid glob pattern: {pattern}"))?;

        let mut matched = false;
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() {
                matched = true;
                paths.push(entry.into_path());
            }
        }
        if !matched {
            bail!("could not locate input file: {pattern}");
        }
    }
    paths.sort();
    Ok(paths)
}

fn resolve_version(v6: bool, v6_1: bool, v7: bool) -> anyhow::Result<(u32, u32)> {
    match (v6, v6_1, v7) {
        (true, false, false) => Ok((6, 0)),
        (false, true, false) => Ok((6, 1)),
        (false, false, true) => Ok((7, 1)),
        (false, false, false) => Ok((7, 1)),
        _ => bail!("cannot specify multiple version options (-v6/-v6_1/-v7)"),
    }
}

fn parse_comp_sel(s: &str) -> anyhow::Result<[u8; 4]> {
    let upper = s.to_uppercase();
    let chars: Vec<char> = upper.chars().collect();
    if chars.len() != 4 || !chars.iter().all(|c| "RGBA01".contains(*c)) {
        bail!("invalid -compSel value {s:?}: expected a 4-character combination of R, G, B, A, 0 and 1");
    }
    let mut out = [0u8; 4];
    for (i, c) in chars.iter().enumerate() {
        out[i] = "RGBA01".find(*c).unwrap() as u8;
    }
    Ok(out)
}

/// `os.path.splitext(name)[0]` with the reference importer's trailing
/// `_image0_level0`/`_image0`/`_level0` suffix stripped, so re-importing a
/// file this crate just exported produces the same base name.
fn default_output_name(first_input: &Path) -> anyhow::Result<PathBuf> {
    let ext = first_input.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
    if ext != "png" && ext != "dds" {
        bail!("expected input file to end with \".png\" or \".dds\"");
    }

    let stem = first_input.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let trimmed = stem
        .strip_suffix("_image0_level0")
        .or_else(|| stem.strip_suffix("_image0"))
        .or_else(|| stem.strip_suffix("_level0"))
        .unwrap_or(stem);

    Ok(first_input.with_file_name(format!("{trimmed}.gtx")))
}

struct ImportedPixels {
    width: u32,
    height: u32,
    num_mips: u32,
    format: GX2SurfaceFormat,
    comp_sel_candidates: [Component; 4],
    image_data: Vec<u8>,
    mip_data: Vec<u8>,
}

fn import_dds(path: &Path, srgb: bool) -> anyhow::Result<ImportedPixels> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let imported = dds::import_dds(&bytes, srgb).with_context(|| format!("{} is not a valid DDS file", path.display()))?;

    Ok(ImportedPixels {
        width: imported.width,
        height: imported.height,
        num_mips: imported.num_mips,
        format: imported.format,
        comp_sel_candidates: imported.comp_sel_candidates,
        image_data: imported.image_data,
        mip_data: imported.mip_data,
    })
}

/// Reads one or more PNGs as successive mip levels of a single RGBA8
/// texture, base level first. Every level after the base must match the
/// halved-and-floored dimensions of the one before it.
fn import_png_levels(paths: &[PathBuf], srgb: bool) -> anyhow::Result<ImportedPixels> {
    let base = image::open(&paths[0]).with_context(|| format!("reading {}", paths[0].display()))?.to_rgba8();
    let (width, height) = base.dimensions();
    let mut image_data = base.into_raw();
    let mut mip_data = Vec::new();

    let mut num_mips = 1u32;
    for path in &paths[1..] {
        if num_mips >= 13 {
            log::warn!("ignoring {}: GX2 textures support at most 13 mip levels", path.display());
            break;
        }

        let level = image::open(path).with_context(|| format!("reading {}", path.display()))?.to_rgba8();
        let expected_width = (width >> num_mips).max(1);
        let expected_height = (height >> num_mips).max(1);
        if level.dimensions() != (expected_width, expected_height) {
            bail!(
                "{} is {}x{}, expected {}x{} for mip level {}",
                path.display(),
                level.width(),
                level.height(),
                expected_width,
                expected_height,
                num_mips
            );
        }

        mip_data.extend(level.into_raw());
        num_mips += 1;
    }

    let format = if srgb { GX2SurfaceFormat::SRGB_RGBA8 } else { GX2SurfaceFormat::UNORM_RGBA8 };
    let comp_sel_candidates = [Component::R, Component::G, Component::B, Component::A];

    Ok(ImportedPixels {
        width,
        height,
        num_mips,
        format,
        comp_sel_candidates,
        image_data: std::mem::take(&mut image_data),
        mip_data,
    })
}

pub fn run_import(args: &ImportArgs) -> anyhow::Result<()> {
    let inputs = expand_inputs(&args.input)?;
    if inputs.is_empty() {
        bail!("no input files were given");
    }

    let output = match &args.output {
        Some(output) => PathBuf::from(output),
        None if args.append => {
            bail!("(-a) was specified, but no output file was given with (-o) to append to");
        }
        None => default_output_name(&inputs[0])?,
    };

    let first_ext = inputs[0].extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
    let pixels = if first_ext == "dds" {
        if inputs.len() != 1 {
            bail!("expected only one DDS file as input, but {} were given", inputs.len());
        }
        log::info!("importing {} as DDS", inputs[0].display());
        import_dds(&inputs[0], args.srgb)?
    } else if first_ext == "png" {
        log::info!("importing {} PNG level(s) starting at {}", inputs.len(), inputs[0].display());
        import_png_levels(&inputs, args.srgb)?
    } else {
        bail!("expected input files to end with \".png\" or \".dds\", got {}", inputs[0].display());
    };

    let comp_sel_indices = match &args.comp_sel {
        Some(s) => parse_comp_sel(s)?,
        None => [0, 1, 2, 3],
    };
    let comp_sel = dds::resolve_comp_sel(pixels.comp_sel_candidates, comp_sel_indices);

    let tile_mode = TileMode::try_from(args.tile_mode).map_err(|v| anyhow!("invalid tileMode value {v}: expected 0 to 16"))?;
    if args.swizzle > 7 {
        bail!("invalid swizzle value {}: expected 0 to 7", args.swizzle);
    }

    let mut gfd = if args.append {
        log::info!("appending to existing GFD file {}", output.display());
        GfdFile::from_file(&output).with_context(|| format!("{} is not a valid GFD file", output.display()))?
    } else {
        GfdFile::new()
    };
    gfd.header.align_enabled = !args.no_align;

    let (major, minor) = resolve_version(args.v6, args.v6_1, args.v7)?;
    let (surf_mode, perf_modulation) = gfd.set_version(major, minor, None)?;

    let texture = GX2Texture::from_linear_2d(
        pixels.width,
        pixels.height,
        pixels.num_mips,
        pixels.format,
        comp_sel,
        &pixels.image_data,
        &pixels.mip_data,
        tile_mode,
        args.swizzle,
        surf_mode,
        perf_modulation,
    )
    .context("building GX2 texture from imported pixel data")?;

    gfd.textures.push(texture);

    gfd.write_to_file(&output).with_context(|| format!("writing {}", output.display()))?;
    log::info!("wrote {}", output.display());
    Ok(())
}

fn dds_export_path(base: &Path, index: Option<usize>) -> PathBuf {
    match index {
        None => base.with_extension("dds"),
        Some(i) => {
            let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            base.with_file_name(format!("{stem}_image{i}.dds"))
        }
    }
}

fn png_export_path(base: &Path, index: Option<usize>, level: Option<usize>) -> PathBuf {
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    match (index, level) {
        (None, None) => base.with_extension("png"),
        (None, Some(j)) => base.with_file_name(format!("{stem}_level{j}.png")),
        (Some(i), None) => base.with_file_name(format!("{stem}_image{i}.png")),
        (Some(i), Some(j)) => base.with_file_name(format!("{stem}_image{i}_level{j}.png")),
    }
}

fn export_dds(texture: &GX2Texture, path: &Path) -> anyhow::Result<()> {
    let linear = texture.to_linear_2d().context("untiling texture for DDS export")?;
    let comp_sel = texture.comp_sel.as_array()?;

    let header = dds::export_header(linear.format, linear.width, linear.height, linear.num_mips, comp_sel, linear.image_size)
        .context("building DDS header")?;

    let mut bytes = header.save();
    bytes.extend_from_slice(&linear.image_data);
    bytes.extend_from_slice(&linear.mip_data);

    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn export_png(texture: &GX2Texture, path: &Path, index: Option<usize>) -> anyhow::Result<()> {
    let levels: Vec<_> = rgba_mip_levels(texture)
        .context("untiling texture for PNG export")?
        .collect::<Result<_, _>>()
        .context("decoding texture to RGBA8")?;

    if levels.len() == 1 {
        let image = levels.into_iter().next().unwrap().into_image().context("decoded level has an invalid size for its pixel buffer")?;
        let target = png_export_path(path, index, None);
        image.save(&target).with_context(|| format!("writing {}", target.display()))?;
        log::info!("wrote {}", target.display());
    } else {
        for (j, level) in levels.into_iter().enumerate() {
            let image = level.into_image().context("decoded level has an invalid size for its pixel buffer")?;
            let target = png_export_path(path, index, Some(j));
            image.save(&target).with_context(|| format!("writing {}", target.display()))?;
            log::info!("wrote {}", target.display());
        }
    }
    Ok(())
}

pub fn run_export(args: &ExportArgs) -> anyhow::Result<()> {
    let input = Path::new(&args.input);
    let gfd = GfdFile::from_file(input).with_context(|| format!("{} is not a valid GFD file", input.display()))?;

    if gfd.textures.is_empty() {
        bail!("{} contains no textures", input.display());
    }

    let base = match &args.output {
        Some(output) => PathBuf::from(output),
        None => input.with_extension(""),
    };

    log::info!("exporting {} texture(s) from {}", gfd.textures.len(), input.display());

    for (i, texture) in gfd.textures.iter().enumerate() {
        let index = if gfd.textures.len() == 1 { None } else { Some(i) };
        if args.png {
            export_png(texture, &base, index)?;
        } else {
            let path = dds_export_path(&base, index);
            export_dds(texture, &path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_image0_level0_suffix_from_default_output_name() {
        let name = default_output_name(Path::new("texture_image0_level0.png")).unwrap();
        assert_eq!(Path::new("texture.gtx"), name);
    }

    #[test]
    fn strips_level0_suffix_from_default_output_name() {
        let name = default_output_name(Path::new("texture_level0.dds")).unwrap();
        assert_eq!(Path::new("texture.gtx"), name);
    }

    #[test]
    fn default_output_name_rejects_unknown_extension() {
        assert!(default_output_name(Path::new("texture.tga")).is_err());
    }

    #[test]
    fn comp_sel_parses_all_six_symbols() {
        assert_eq!([0, 1, 2, 3], parse_comp_sel("rgba").unwrap());
        assert_eq!([3, 2, 1, 0], parse_comp_sel("ABGR").unwrap());
        assert_eq!([4, 4, 4, 5], parse_comp_sel("0001").unwrap());
    }

    #[test]
    fn comp_sel_rejects_wrong_length() {
        assert!(parse_comp_sel("RGB").is_err());
    }

    #[test]
    fn comp_sel_rejects_unknown_symbol() {
        assert!(parse_comp_sel("RGBX").is_err());
    }

    #[test]
    fn resolve_version_defaults_to_seven_one() {
        assert_eq!((7, 1), resolve_version(false, false, false).unwrap());
    }

    #[test]
    fn resolve_version_rejects_multiple_flags() {
        assert!(resolve_version(true, true, false).is_err());
    }

    #[test]
    fn dds_export_path_appends_image_index_for_multiple_textures() {
        let base = Path::new("out.gtx");
        assert_eq!(Path::new("out.dds"), dds_export_path(base, None));
        assert_eq!(Path::new("out_image2.dds"), dds_export_path(base, Some(2)));
    }

    #[test]
    fn png_export_path_combines_image_and_level_suffixes() {
        let base = Path::new("out.gtx");
        assert_eq!(Path::new("out.png"), png_export_path(base, None, None));
        assert_eq!(Path::new("out_level3.png"), png_export_path(base, None, Some(3)));
        assert_eq!(Path::new("out_image1.png"), png_export_path(base, Some(1), None));
        assert_eq!(Path::new("out_image1_level3.png"), png_export_path(base, Some(1), Some(3)));
    }
}
