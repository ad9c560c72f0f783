//! Preflight checks run before touching the disk.
//!
//! Validates that the host has the required external tools and that the
//! process runs with enough privilege to write to raw block devices.
//! This prevents cryptic errors halfway through an installation.

use anyhow::{bail, Result};

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools required for boot-loader installation.
///
/// Each tuple is (command_name, package_name). The syslinux/extlinux
/// binaries themselves are bundled resources, not host tools.
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("parted", "parted"),
    ("dd", "coreutils"),
    ("lsblk", "util-linux"),
];

/// Check that specific tools are available.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with the list of missing tools and their packages
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check that all tools needed for an installation run are available.
pub fn check_host_tools() -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)
}

/// Whether the process runs with root privileges.
///
/// Writing the MBR and installing boot loaders onto raw devices requires
/// euid 0; callers abort before any step executes otherwise.
pub fn is_root() -> bool {
    // Safety: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}
