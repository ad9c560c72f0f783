//! Inspection of an extracted ISO tree for isolinux boot configuration.
//!
//! ISO9660 parsing itself is out of scope; the companion extractor unpacks
//! the image (or at least its boot configuration directory) to a plain
//! directory tree, and this module answers three questions about it: does
//! the distro boot via isolinux, where does its config live, and which
//! syslinux major version built the bundled `isolinux.bin`.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// ISO filename without extension, used as the per-distro install
/// directory name on the USB.
pub fn iso_basename(iso_path: &Path) -> String {
    iso_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// View over an extracted ISO tree.
pub struct ExtractedIso {
    root: PathBuf,
}

impl ExtractedIso {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Full path to `isolinux.bin` inside the tree, if the distro ships one.
    pub fn isolinux_bin(&self) -> Option<PathBuf> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| {
                e.file_type().is_file()
                    && e.file_name().to_string_lossy().eq_ignore_ascii_case("isolinux.bin")
            })
            .map(|e| e.into_path())
    }

    /// Whether the distro uses isolinux for booting at all.
    pub fn isolinux_exists(&self) -> bool {
        self.isolinux_bin().is_some()
    }

    /// Directory holding the isolinux config, relative to the ISO root.
    ///
    /// `"/"` when `isolinux.bin` sits at the root of the image (seen on
    /// generic and some alpine layouts).
    pub fn isolinux_dir(&self) -> Option<String> {
        let bin = self.isolinux_bin()?;
        let parent = bin.parent()?;
        let rel = parent.strip_prefix(&self.root).ok()?;
        if rel.as_os_str().is_empty() {
            Some("/".to_string())
        } else {
            Some(format!("/{}", rel.to_string_lossy()))
        }
    }

    /// Syslinux major version of the bundled `isolinux.bin`.
    ///
    /// The binary embeds a banner of the form `ISOLINUX 4.07 ...`; the major
    /// number is read from it. Falls back to 4 (the bundled default) when no
    /// banner is found.
    pub fn isolinux_version(&self) -> Result<u32> {
        let bin = self
            .isolinux_bin()
            .context("distro has no isolinux.bin to version")?;
        let bytes = fs::read(&bin)
            .with_context(|| format!("failed to read {}", bin.display()))?;
        Ok(banner_major_version(&bytes).unwrap_or(4))
    }
}

/// Extract the major version from an `ISOLINUX <major>.<minor>` banner.
fn banner_major_version(bytes: &[u8]) -> Option<u32> {
    const BANNER: &[u8] = b"ISOLINUX ";
    let start = bytes
        .windows(BANNER.len())
        .position(|w| w == BANNER)?
        + BANNER.len();
    let digits: Vec<u8> = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .copied()
        .collect();
    if digits.is_empty() {
        return None;
    }
    String::from_utf8(digits).ok()?.parse().ok()
}
