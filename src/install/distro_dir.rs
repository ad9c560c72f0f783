//! Boot-loader install into a distro's own isolinux directory.
//!
//! Installing here (instead of the generic `multibootusb` directory) lets
//! the ISO's native boot menu run. After a successful install the first
//! disk block is backed up to `<config_dir>/<distro>.bs` so chain-loading
//! can be restored later.

use super::family::{clamp_version, BootFamily, MIN_SYSLINUX_VERSION};
use super::step::{ensure_executable, InstallStep};
use super::{
    DistroLayout, InstallContext, InstallOutcome, InstallReport, InstallTarget, StatusLog,
};
use anyhow::Result;

/// Syslinux argument mode, decided by (version == 3, root-level generic
/// layout). Total over both booleans; version 3 binaries predate the `-i`
/// install flag, and a root-level generic layout needs no directory flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyslinuxArgMode {
    /// Version 3 onto the filesystem root: no extra flags.
    Plain,
    /// Version 3 into a subdirectory: `-d <dir>`.
    Directory,
    /// Version 4+ onto the filesystem root: `-i`.
    Install,
    /// Version 4+ into a subdirectory: `-i -d <dir>`.
    InstallDirectory,
}

impl SyslinuxArgMode {
    pub fn select(version_is_3: bool, root_level_generic: bool) -> Self {
        match (version_is_3, root_level_generic) {
            (true, true) => Self::Plain,
            (true, false) => Self::Directory,
            (false, true) => Self::Install,
            (false, false) => Self::InstallDirectory,
        }
    }

    /// Arguments ahead of the disk device. `config_dir` is the boot config
    /// directory relative to the filesystem root.
    pub fn args(self, config_dir: &str) -> Vec<String> {
        match self {
            Self::Plain => vec![],
            Self::Directory => vec!["-d".into(), config_dir.into()],
            Self::Install => vec!["-i".into()],
            Self::InstallDirectory => {
                vec!["-i".into(), "-d".into(), config_dir.into()]
            }
        }
    }
}

/// Install the version-matched boot loader into the distro's isolinux
/// directory and back up the boot sector.
///
/// `layout` is `None` when the ISO inspector found no isolinux config; that
/// is a deliberate no-op, not an error. The backup copy runs only after a
/// successful install; a failed backup leaves the installed loader in place
/// but the report still carries the failure.
pub fn install_to_distro_dir(
    ctx: &InstallContext,
    target: &InstallTarget,
    layout: Option<&DistroLayout>,
) -> Result<InstallReport> {
    let mut log = StatusLog::new();

    let layout = match layout {
        Some(layout) => layout,
        None => {
            log.push("Distro does not use isolinux for booting.".to_string());
            return Ok(log.into_report(InstallOutcome::Skipped));
        }
    };

    let version = clamp_version(layout.detected_version);
    if layout.detected_version < MIN_SYSLINUX_VERSION {
        log.push(format!(
            "Distro uses isolinux version {}; installing version {} instead.",
            layout.detected_version, MIN_SYSLINUX_VERSION
        ));
    }

    let family = match BootFamily::classify(&target.filesystem_kind) {
        Some(family) => family,
        None => {
            log.push(format!(
                "Filesystem '{}' is not supported for boot-loader install.",
                target.filesystem_kind
            ));
            return Ok(log.into_report(InstallOutcome::Unsupported));
        }
    };

    let mount = &target.mount_point;
    let install = match family {
        BootFamily::Syslinux => {
            let binary = ctx.resources.syslinux_binary(version);
            ensure_executable(&binary)?;
            let mode = SyslinuxArgMode::select(
                version == MIN_SYSLINUX_VERSION,
                layout.is_root_generic(),
            );
            let mut args = mode.args(&layout.config_dir_on_filesystem(mount));
            args.push(target.usb_disk.clone());
            InstallStep::new(
                "install distro syslinux",
                binary.to_string_lossy(),
                args,
            )
        }
        BootFamily::Extlinux => {
            let binary = ctx.resources.extlinux_binary(version);
            ensure_executable(&binary)?;
            InstallStep::new(
                "install distro extlinux",
                binary.to_string_lossy(),
                vec![
                    "--install".into(),
                    layout.config_dir(mount).to_string_lossy().into_owned(),
                ],
            )
        }
    };

    log.push("Installing distro specific boot loader...".to_string());
    log.push(format!("Executing ==> {}", install.command_line()));
    if ctx.runner.run(&install)? != 0 {
        log.push("Failed to install boot loader on distro directory.".to_string());
        return Ok(log.into_report(InstallOutcome::StepFailed(install.name)));
    }
    log.push("Boot-loader install on distro directory is successful.".to_string());

    // One device block; the .bs file restores chain-loading later.
    let backup = InstallStep::new(
        "copy boot sector",
        "dd",
        vec![
            format!("if={}", target.usb_disk),
            format!("of={}", layout.backup_file(mount).display()),
            "count=1".into(),
        ],
    );
    log.push("Copying boot sector...".to_string());
    log.push(format!("Executing ==> {}", backup.command_line()));
    if ctx.runner.run(&backup)? == 0 {
        log.push("Boot-sector copy is successful.".to_string());
        Ok(log.into_report(InstallOutcome::Success))
    } else {
        // Install stays in place; only the backup is missing.
        log.push("Failed to copy boot sector.".to_string());
        Ok(log.into_report(InstallOutcome::StepFailed(backup.name)))
    }
}
