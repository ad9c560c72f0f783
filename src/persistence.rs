//! Persistence overlay creation for live distros.
//!
//! Ubuntu, Debian, and Fedora live systems can retain writes across reboots
//! in a fixed-size overlay file on the USB. The overlay is zero-filled with
//! dd and, except on Fedora (whose overlay is raw), formatted as ext3.

use crate::install::{InstallContext, InstallOutcome, InstallReport, InstallStep, StatusLog};
use crate::usb::UsbDetails;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// FAT filesystems cannot hold a file larger than this, so overlay sizing
/// is capped here on vfat/fat32 targets.
pub const FAT_MAX_OVERLAY_BYTES: u64 = 4096 * 1024 * 1024;

const FAT_FS: &[&str] = &["vfat", "fat32"];

fn supports_persistence(distro: &str) -> bool {
    matches!(distro, "ubuntu" | "debian" | "debian-install" | "fedora")
}

/// Maximum overlay size for a distro on the given USB, or `None` when the
/// distro has no persistence support.
///
/// Membership in the FAT set is tested exactly; only vfat/fat32 targets get
/// the 4 GiB cap, everything else is bounded by free space alone.
pub fn persistence_capacity(distro: &str, details: &UsbDetails) -> Option<u64> {
    if !supports_persistence(distro) {
        return None;
    }
    let kind = details.filesystem_kind.to_ascii_lowercase();
    if FAT_FS.contains(&kind.as_str()) {
        Some(details.free_bytes.min(FAT_MAX_OVERLAY_BYTES))
    } else {
        Some(details.free_bytes)
    }
}

/// Overlay file path relative to the USB mount, per distro convention.
pub fn overlay_relative_path(
    distro: &str,
    iso_basename: &str,
    details: &UsbDetails,
) -> Option<PathBuf> {
    let base = PathBuf::from("multibootusb").join(iso_basename);
    match distro {
        "ubuntu" => Some(base.join("casper-rw")),
        "debian" | "debian-install" => Some(base.join("live-rw")),
        "fedora" => Some(base.join("LiveOS").join(format!(
            "overlay-{}-{}",
            details.label, details.uuid
        ))),
        _ => None,
    }
}

/// Create a persistence overlay of `size_bytes` for the distro.
///
/// Zero-fills the file with dd, then formats it ext3 for non-Fedora
/// distros. Steps are sequential and exit-code checked like install steps.
pub fn create_persistence(
    ctx: &InstallContext,
    details: &UsbDetails,
    distro: &str,
    iso_basename: &str,
    size_bytes: u64,
) -> Result<InstallReport> {
    let mut log = StatusLog::new();

    let relative = match overlay_relative_path(distro, iso_basename, details) {
        Some(path) => path,
        None => {
            log.push(format!("Distro '{}' has no persistence support.", distro));
            return Ok(log.into_report(InstallOutcome::Unsupported));
        }
    };
    let overlay = details.mount_point.join(&relative);
    if let Some(parent) = overlay.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let count_mib = size_bytes / (1024 * 1024);
    let fill = InstallStep::new(
        "create persistence file",
        "dd",
        vec![
            "if=/dev/zero".into(),
            format!("of={}", overlay.display()),
            "bs=1M".into(),
            format!("count={}", count_mib),
        ],
    );
    log.push("Creating persistence file...".to_string());
    log.push(format!("Executing ==> {}", fill.command_line()));
    if ctx.runner.run(&fill)? != 0 {
        log.push("Failed to create persistence file.".to_string());
        return Ok(log.into_report(InstallOutcome::StepFailed(fill.name)));
    }
    log.push("Successfully created persistence file.".to_string());

    // Fedora's overlay stays raw; everything else is an ext3 loopback.
    if distro != "fedora" {
        let mkfs = InstallStep::new(
            "format persistence file",
            "mkfs.ext3",
            vec!["-F".into(), overlay.display().to_string()],
        );
        log.push("Applying filesystem to persistence file...".to_string());
        log.push(format!("Executing ==> {}", mkfs.command_line()));
        if ctx.runner.run(&mkfs)? != 0 {
            log.push("Failed to apply filesystem to persistence file.".to_string());
            return Ok(log.into_report(InstallOutcome::StepFailed(mkfs.name)));
        }
        log.push("Successfully applied filesystem.".to_string());
    }

    Ok(log.into_report(InstallOutcome::Success))
}
