//! Generic boot-loader install into the USB root.

use super::family::{BootFamily, DEFAULT_SYSLINUX_VERSION};
use super::step::{ensure_executable, InstallStep};
use super::{InstallContext, InstallOutcome, InstallReport, InstallTarget, StatusLog};
use crate::usb::base_device;
use anyhow::Result;

/// Install the generic boot loader into `<mount>/multibootusb`, write the
/// MBR, and ensure the boot flag is set.
///
/// Steps run strictly in sequence; the first nonzero exit aborts the rest
/// and the report carries the failed step's name. Nothing already written
/// to disk is rolled back.
pub fn install_default(ctx: &InstallContext, target: &InstallTarget) -> Result<InstallReport> {
    let mut log = StatusLog::new();

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

    let install = match family {
        BootFamily::Extlinux => {
            let binary = ctx.resources.extlinux_binary(DEFAULT_SYSLINUX_VERSION);
            ensure_executable(&binary)?;
            log.push(format!(
                "Installing default extlinux version {}...",
                DEFAULT_SYSLINUX_VERSION
            ));
            InstallStep::new(
                "install default extlinux",
                binary.to_string_lossy(),
                vec![
                    "--install".into(),
                    target
                        .mount_point
                        .join("multibootusb")
                        .to_string_lossy()
                        .into_owned(),
                ],
            )
        }
        BootFamily::Syslinux => {
            let binary = ctx.resources.syslinux_binary(DEFAULT_SYSLINUX_VERSION);
            ensure_executable(&binary)?;
            log.push(format!(
                "Installing default syslinux version {}...",
                DEFAULT_SYSLINUX_VERSION
            ));
            InstallStep::new(
                "install default syslinux",
                binary.to_string_lossy(),
                vec![
                    "-i".into(),
                    "-d".into(),
                    "multibootusb".into(),
                    target.usb_disk.clone(),
                ],
            )
        }
    };

    log.push(format!("Executing ==> {}", install.command_line()));
    if ctx.runner.run(&install)? != 0 {
        log.push("Failed to install default boot loader.".to_string());
        return Ok(log.into_report(InstallOutcome::StepFailed(install.name)));
    }
    log.push("Default boot-loader install is successful.".to_string());

    // First 440 bytes of the base device only; the partition table that
    // follows is left untouched.
    let mbr = InstallStep::new(
        "write mbr",
        "dd",
        vec![
            "bs=440".into(),
            "count=1".into(),
            "conv=notrunc".into(),
            format!("if={}", ctx.resources.mbr_bin.display()),
            format!("of={}", base_device(&target.usb_disk)),
        ],
    );
    log.push("Installing mbr...".to_string());
    log.push(format!("Executing ==> {}", mbr.command_line()));
    if ctx.runner.run(&mbr)? != 0 {
        log.push("Failed to write mbr.".to_string());
        return Ok(log.into_report(InstallOutcome::StepFailed(mbr.name)));
    }
    log.push("mbr install is successful.".to_string());

    let state = super::ensure_boot_flag(ctx, &target.usb_disk, &mut log)?;
    if state.is_bootable() {
        Ok(log.into_report(InstallOutcome::Success))
    } else {
        Ok(log.into_report(InstallOutcome::StepFailed("set boot flag".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::testing::{fixture_resources, ScriptedRunner};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn target(fs: &str) -> InstallTarget {
        InstallTarget {
            usb_disk: "/dev/sdb1".to_string(),
            mount_point: PathBuf::from("/mnt/usb"),
            filesystem_kind: fs.to_string(),
        }
    }

    fn ctx<'a>(runner: &'a ScriptedRunner, temp: &TempDir) -> InstallContext<'a> {
        InstallContext {
            resources: fixture_resources(temp),
            runner,
        }
    }

    #[test]
    fn test_ext4_runs_extlinux_then_mbr_then_boot_flag() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::ok().with_capture_stdout(b"primary:boot;");

        let report = install_default(&ctx(&runner, &temp), &target("ext4")).unwrap();

        assert_eq!(report.outcome, InstallOutcome::Success);
        assert_eq!(
            runner.step_names(),
            vec![
                "install default extlinux",
                "write mbr",
                "query partition table"
            ]
        );
        // Never the syslinux binary for an extlinux-family filesystem.
        assert!(runner.programs().iter().all(|p| !p.contains("syslinux4")));
    }

    #[test]
    fn test_vfat_runs_syslinux_with_structured_args() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::ok().with_capture_stdout(b"primary:boot;");

        let report = install_default(&ctx(&runner, &temp), &target("vfat")).unwrap();

        assert_eq!(report.outcome, InstallOutcome::Success);
        let calls = runner.calls.borrow();
        assert_eq!(calls[0].name, "install default syslinux");
        assert_eq!(
            calls[0].args,
            vec!["-i", "-d", "multibootusb", "/dev/sdb1"]
        );
    }

    #[test]
    fn test_mbr_targets_base_device() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::ok().with_capture_stdout(b"primary:boot;");

        install_default(&ctx(&runner, &temp), &target("ext4")).unwrap();

        let calls = runner.calls.borrow();
        let mbr = calls.iter().find(|s| s.name == "write mbr").unwrap();
        assert!(mbr.args.contains(&"of=/dev/sdb".to_string()));
        assert!(mbr.args.contains(&"bs=440".to_string()));
    }

    #[test]
    fn test_install_failure_stops_sequence() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::failing("install default extlinux");

        let report = install_default(&ctx(&runner, &temp), &target("ext4")).unwrap();

        assert_eq!(
            report.outcome,
            InstallOutcome::StepFailed("install default extlinux".to_string())
        );
        // No MBR write, no boot-flag step after the failure.
        assert_eq!(runner.step_names(), vec!["install default extlinux"]);
    }

    #[test]
    fn test_mbr_failure_skips_boot_flag() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::failing("write mbr");

        let report = install_default(&ctx(&runner, &temp), &target("vfat")).unwrap();

        assert_eq!(
            report.outcome,
            InstallOutcome::StepFailed("write mbr".to_string())
        );
        assert_eq!(
            runner.step_names(),
            vec!["install default syslinux", "write mbr"]
        );
    }

    #[test]
    fn test_unsupported_filesystem_runs_nothing() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::ok();

        let report = install_default(&ctx(&runner, &temp), &target("exfat")).unwrap();

        assert_eq!(report.outcome, InstallOutcome::Unsupported);
        assert!(runner.calls.borrow().is_empty());
        assert!(report
            .messages
            .iter()
            .any(|m| m.contains("not supported")));
    }
}
