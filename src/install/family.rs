//! Installer family classification and version policy.

/// Filesystems handled by extlinux.
pub const EXTLINUX_FS: &[&str] = &["ext2", "ext3", "ext4", "btrfs"];

/// Filesystems handled by syslinux.
pub const SYSLINUX_FS: &[&str] = &["vfat", "fat32", "ntfs"];

/// Oldest syslinux revision the bundled binaries support; detected versions
/// below this are clamped up.
pub const MIN_SYSLINUX_VERSION: u32 = 3;

/// Version used for the generic (non-distro-specific) install.
pub const DEFAULT_SYSLINUX_VERSION: u32 = 4;

/// Which installer binary applies to a filesystem kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootFamily {
    Extlinux,
    Syslinux,
}

impl BootFamily {
    /// Classify a filesystem kind by exact membership in one of the two
    /// recognized sets, case-insensitively. Anything else gets `None` and
    /// no install action; there is deliberately no fallback branch.
    pub fn classify(filesystem_kind: &str) -> Option<Self> {
        let kind = filesystem_kind.to_ascii_lowercase();
        if EXTLINUX_FS.contains(&kind.as_str()) {
            Some(Self::Extlinux)
        } else if SYSLINUX_FS.contains(&kind.as_str()) {
            Some(Self::Syslinux)
        } else {
            None
        }
    }
}

/// Clamp a detected isolinux version to the supported floor.
pub fn clamp_version(detected: u32) -> u32 {
    detected.max(MIN_SYSLINUX_VERSION)
}
