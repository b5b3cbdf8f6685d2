use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::path::Path;
use std::process::Command;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

use crate::config::ConvertConfig;

/// Run `<encoder> -version`. Fails when the encoder cannot be executed.
///
/// Returns `(major, minor)` when the banner carries a release number; git
/// builds report a revision instead and yield `None`.
pub fn check_encoder(encoder_bin: &Path) -> Result<Option<(u32, u32)>> {
    let output = Command::new(encoder_bin)
        .arg("-version")
        .output()
        .with_context(|| {
            format!(
                "Failed to execute {} -version. Is it installed and in PATH?",
                encoder_bin.display()
            )
        })?;

    if !output.status.success() {
        return Err(anyhow!("{} -version command failed", encoder_bin.display()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_encoder_version(&stdout))
}

/// Parse version from output like "ffmpeg version 6.1.1" or "ffmpeg version n7.0".
pub fn parse_encoder_version(banner: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"version[^\d]*(\d+)\.(\d+)").ok()?;
    let caps = re.captures(banner)?;
    let major = caps[1].parse().ok()?;
    let minor = caps[2].parse().ok()?;
    Some((major, minor))
}

/// Fail unless `<encoder> -hide_banner -encoders` lists `codec`.
pub fn check_codec_support(encoder_bin: &Path, codec: &str) -> Result<()> {
    let output = Command::new(encoder_bin)
        .arg("-hide_banner")
        .arg("-encoders")
        .output()
        .with_context(|| format!("Failed to execute {} -encoders", encoder_bin.display()))?;

    if !output.status.success() {
        return Err(anyhow!("{} -encoders command failed", encoder_bin.display()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if encoder_list_contains(&stdout, codec) {
        Ok(())
    } else {
        Err(anyhow!(
            "Audio codec '{}' is not supported by {}",
            codec,
            encoder_bin.display()
        ))
    }
}

/// Whether an `-encoders` listing has an entry named exactly `codec`.
pub fn encoder_list_contains(listing: &str, codec: &str) -> bool {
    // Entry lines look like " A....D libmp3lame   libmp3lame MP3 (MPEG audio layer 3)"
    listing.lines().any(|line| {
        let mut fields = line.split_whitespace();
        matches!((fields.next(), fields.next()), (Some(_flags), Some(name)) if name == codec)
    })
}

/// Logical CPU count of this host, at least 1.
pub fn detect_cpu_count() -> usize {
    let sys = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new()));
    sys.cpus().len().max(1)
}

/// Configured worker override, or the CPU count.
pub fn worker_limit(config: &ConvertConfig) -> usize {
    config.max_workers.unwrap_or_else(detect_cpu_count).max(1)
}
