use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

use sigphoto::{
    Commit, ImageFormat, Masking, NormalizationSpec, Normalizer, PhotoConfig, PhotoReference,
    PngCompression, RawUpload, Session, ValidationLimits,
};

#[derive(Parser)]
#[command(name = "sigphoto-cli")]
#[command(about = "Normalize profile photos for email signatures", long_about = None)]
#[command(version)]
struct Args {
    /// Photo files (PNG or JPEG) or directories containing them. The last
    /// successful one becomes the signature photo.
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Write the winning photo's encoded bytes to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Remote photo URL, overrides any uploaded photo
    #[arg(long, value_name = "URL", default_value = "")]
    url: String,

    /// Photo source used when nothing else resolves
    #[arg(
        long,
        value_name = "SRC",
        default_value = "https://cdn.pixabay.com/photo/2015/10/05/22/37/blank-profile-picture-973460_960_720.png"
    )]
    default_src: String,

    /// Image format
    #[arg(long, value_enum)]
    image_format: Option<ImageFormatArg>,

    /// JPEG/WebP quality (0-100)
    #[arg(long, value_name = "QUALITY")]
    quality: Option<u8>,

    /// PNG compression level
    #[arg(long, value_enum, default_value_t = PngCompressionArg::Default)]
    png_compression: PngCompressionArg,

    /// Output side length in pixels
    #[arg(long, value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..))]
    target_size: Option<u32>,

    /// Corner radius in pixels
    #[arg(long, value_name = "PIXELS")]
    corner_radius: Option<u32>,

    /// Largest accepted upload in KB
    #[arg(long, value_name = "KB")]
    max_file_size_kb: Option<u64>,

    /// Largest accepted width or height in pixels
    #[arg(long, value_name = "PIXELS")]
    max_pixels: Option<u32>,

    /// Remember these settings for next time
    #[arg(long, default_value_t)]
    save_config: bool,

    /// Verbose output
    #[arg(short, long, default_value_t)]
    verbose: bool,

    /// Quiet mode (minimal output)
    #[arg(short, long, default_value_t)]
    quiet: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ImageFormatArg {
    Jpeg,
    Png,
    Webp,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PngCompressionArg {
    Fast,
    Default,
    Best,
}

impl From<PngCompressionArg> for PngCompression {
    fn from(arg: PngCompressionArg) -> Self {
        match arg {
            PngCompressionArg::Fast => PngCompression::Fast,
            PngCompressionArg::Default => PngCompression::Default,
            PngCompressionArg::Best => PngCompression::Best,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(args.verbose, args.quiet);

    let config = build_config(&args)?;
    if args.save_config && config.save().is_none() {
        log::warn!("Could not save config");
    }

    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        log::warn!("No PNG or JPEG files found in the given inputs");
    }

    let session = Session::new();
    let normalizer = Normalizer::new(config);

    // Tickets are taken in argument order, so the last file wins no matter
    // which one finishes first
    let jobs: Vec<_> = files.iter().map(|path| (path, session.begin())).collect();
    let accepted = jobs
        .par_iter()
        .filter_map(|(path, ticket)| {
            let normalized = process_file(path, &normalizer)?;
            if let Commit::Stale(_) = session.commit(*ticket, normalized) {
                log::debug!("{}: superseded by a later file", path.display());
            }
            Some(())
        })
        .count();

    if !args.quiet {
        log::info!("Accepted {accepted} of {} photos", files.len());
    }

    session.set_url_override(args.url.as_str());
    let reference = session.photo_reference(&args.default_src);

    if accepted == 0 && !matches!(reference, PhotoReference::RemoteUrl(_)) {
        anyhow::bail!("No photo was accepted");
    }

    if let Some(output) = &args.output {
        match &reference {
            PhotoReference::Upload(photo) => {
                std::fs::write(output, &photo.data)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                if !args.quiet {
                    log::info!("Wrote {}", output.display());
                }
            }
            _ => log::warn!("No uploaded photo in use, not writing {}", output.display()),
        }
    }

    println!("{}", reference.src());
    Ok(())
}

fn process_file(path: &Path, normalizer: &Normalizer) -> Option<sigphoto::Normalized> {
    let raw = RawUpload::from_path(path)
        .map_err(|e| log::warn!("{e:#}"))
        .ok()?;

    match normalizer.run(&raw) {
        Ok(normalized) => {
            if let Masking::Skipped(reason) = normalized.masking {
                log::warn!("{}: corners not rounded ({reason})", path.display());
            }
            log::info!(
                "{}: {} bytes {}",
                path.display(),
                normalized.photo.data.len(),
                normalized.photo.mime()
            );
            Some(normalized)
        }
        Err(e) => {
            log::warn!("{}: {e}", path.display());
            None
        }
    }
}

/// Expand directories into the photo files they contain, in a stable order
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.exists() {
            anyhow::bail!("Input does not exist: {}", input.display());
        }

        if input.is_file() {
            files.push(input.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .into_iter()
            .filter_map(|entry| {
                entry
                    .map_err(|e| log::warn!("Failed to read directory entry: {}", e))
                    .ok()
            })
            .filter(|entry| entry.file_type().is_file() && is_photo(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn build_config(args: &Args) -> Result<PhotoConfig> {
    let saved = PhotoConfig::load().unwrap_or_default();

    // Validate quality
    if args.quality.is_some_and(|q| q > 100) {
        anyhow::bail!("Quality must be between 0 and 100");
    }

    let quality = args.quality.unwrap_or(match saved.image_format {
        ImageFormat::Jpeg { quality } | ImageFormat::WebP { quality } => quality,
        ImageFormat::Png { .. } => 70,
    });

    let image_format = match args.image_format {
        Some(ImageFormatArg::Jpeg) => ImageFormat::Jpeg { quality },
        Some(ImageFormatArg::Png) => ImageFormat::Png {
            compression: args.png_compression.into(),
        },
        Some(ImageFormatArg::Webp) => ImageFormat::WebP { quality },
        None => match saved.image_format {
            ImageFormat::Jpeg { .. } => ImageFormat::Jpeg { quality },
            ImageFormat::WebP { .. } => ImageFormat::WebP { quality },
            png @ ImageFormat::Png { .. } => png,
        },
    };

    let spec = NormalizationSpec {
        target_size: args.target_size.unwrap_or(saved.spec.target_size),
        corner_radius: args.corner_radius.unwrap_or(saved.spec.corner_radius),
    };

    let limits = ValidationLimits {
        max_file_size_bytes: args
            .max_file_size_kb
            .map(|kb| kb * 1024)
            .unwrap_or(saved.limits.max_file_size_bytes),
        max_dimension_pixels: args.max_pixels.unwrap_or(saved.limits.max_dimension_pixels),
    };

    if spec.corner_radius > spec.target_size / 2 {
        log::warn!(
            "Corner radius {} exceeds half the target size, the photo will be a circle",
            spec.corner_radius
        );
    }

    Ok(PhotoConfig {
        limits,
        spec,
        image_format,
        background: saved.background,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_expand_to_sorted_photos() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPG", "a.png", "notes.txt", "c.jpeg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.png", "b.JPG", "c.jpeg"]);
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(collect_inputs(&[PathBuf::from("/definitely/not/here.png")]).is_err());
    }
}
