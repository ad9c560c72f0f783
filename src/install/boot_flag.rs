//! Boot-flag check/set on the base disk's partition table.

use super::step::InstallStep;
use super::{InstallContext, StatusLog};
use crate::usb::base_device;
use anyhow::Result;

/// Terminal states of the boot-flag protocol.
///
/// From `Unknown`, querying the partition table either finds the flag
/// already present (`CheckedPresent`) or leads to a set attempt that ends
/// in `Set` or `Failed`. Check-then-set is idempotent; repeating it lands
/// on the same terminal state with no error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootFlagState {
    Unknown,
    CheckedPresent,
    Set,
    Failed,
}

impl BootFlagState {
    pub fn is_bootable(self) -> bool {
        matches!(self, Self::CheckedPresent | Self::Set)
    }
}

/// Ensure the first partition of the disk carries the boot flag.
pub fn ensure_boot_flag(
    ctx: &InstallContext,
    usb_disk: &str,
    log: &mut StatusLog,
) -> Result<BootFlagState> {
    let disk = base_device(usb_disk);
    log.push(format!("Checking boot flag on {}...", disk));

    let query = InstallStep::new(
        "query partition table",
        "parted",
        vec!["-m".into(), "-s".into(), disk.into(), "print".into()],
    );
    let (code, stdout) = ctx.runner.capture(&query)?;
    if code == 0 && stdout.windows(4).any(|w| w == b"boot") {
        log.push(format!("Disk {} already has a boot flag.", disk));
        return Ok(BootFlagState::CheckedPresent);
    }

    let set = InstallStep::new(
        "set boot flag",
        "parted",
        vec![disk.into(), "set".into(), "1".into(), "boot".into(), "on".into()],
    );
    log.push(format!("Executing ==> {}", set.command_line()));
    if ctx.runner.run(&set)? == 0 {
        log.push(format!("Boot flag set on {}.", disk));
        Ok(BootFlagState::Set)
    } else {
        log.push(format!("Unable to set boot flag on {}.", disk));
        Ok(BootFlagState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::testing::{fixture_resources, ScriptedRunner};
    use tempfile::TempDir;

    fn ctx<'a>(runner: &'a ScriptedRunner, temp: &TempDir) -> InstallContext<'a> {
        InstallContext {
            resources: fixture_resources(temp),
            runner,
        }
    }

    #[test]
    fn test_flag_already_present() {
        let temp = TempDir::new().unwrap();
        let runner =
            ScriptedRunner::ok().with_capture_stdout(b"1:1049kB:8000MB:ext4::primary:boot;\n");
        let mut log = StatusLog::new();

        let state = ensure_boot_flag(&ctx(&runner, &temp), "/dev/sdb1", &mut log).unwrap();

        assert_eq!(state, BootFlagState::CheckedPresent);
        assert_eq!(runner.step_names(), vec!["query partition table"]);
    }

    #[test]
    fn test_flag_set_when_absent() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::ok().with_capture_stdout(b"1:1049kB:8000MB:ext4::primary:;\n");
        let mut log = StatusLog::new();

        let state = ensure_boot_flag(&ctx(&runner, &temp), "/dev/sdb1", &mut log).unwrap();

        assert_eq!(state, BootFlagState::Set);
        assert_eq!(
            runner.step_names(),
            vec!["query partition table", "set boot flag"]
        );
        // Set command targets the base device, not the partition.
        let calls = runner.calls.borrow();
        assert_eq!(calls[1].args[0], "/dev/sdb");
    }

    #[test]
    fn test_flag_set_failure() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::failing("set boot flag");
        let mut log = StatusLog::new();

        let state = ensure_boot_flag(&ctx(&runner, &temp), "/dev/sdb1", &mut log).unwrap();

        assert_eq!(state, BootFlagState::Failed);
        assert!(!state.is_bootable());
    }

    #[test]
    fn test_idempotent_terminal_state() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::ok().with_capture_stdout(b"primary:boot;");

        let mut log = StatusLog::new();
        let first = ensure_boot_flag(&ctx(&runner, &temp), "/dev/sdb1", &mut log).unwrap();
        let second = ensure_boot_flag(&ctx(&runner, &temp), "/dev/sdb1", &mut log).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, BootFlagState::CheckedPresent);
    }
}
