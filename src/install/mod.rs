//! Boot-loader installation onto a prepared USB disk.
//!
//! The install protocol picks the installer family (syslinux vs extlinux)
//! from the target filesystem, the binary version from the distro's bundled
//! isolinux, and the argument mode from the distro layout, then runs the
//! external steps strictly in sequence:
//!
//! ```text
//! classify filesystem ──► install boot loader ──► write MBR ──► set boot flag
//!                              │
//!                              └─► (distro dir) back up boot sector
//! ```
//!
//! A failed step aborts the remainder of its sequence; steps already
//! completed are left in place. All status text is collected into the
//! returned [`InstallReport`] rather than threaded through shared state.

pub mod boot_flag;
pub mod default;
pub mod distro_dir;
pub mod family;
pub mod step;

pub use boot_flag::{ensure_boot_flag, BootFlagState};
pub use default::install_default;
pub use distro_dir::{install_to_distro_dir, SyslinuxArgMode};
pub use family::{clamp_version, BootFamily, DEFAULT_SYSLINUX_VERSION};
pub use step::{CommandRunner, InstallStep, SystemRunner};

use crate::iso::{iso_basename, ExtractedIso};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The USB partition an installation run operates on.
///
/// Derived fresh per request and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct InstallTarget {
    /// Partition device, e.g. `/dev/sdb1`.
    pub usb_disk: String,
    pub mount_point: PathBuf,
    /// Filesystem kind as reported by the inspector (e.g. `ext4`, `vfat`).
    pub filesystem_kind: String,
}

/// Where a distro keeps its boot configuration on the USB.
#[derive(Debug, Clone)]
pub struct DistroLayout {
    pub distro_id: String,
    /// ISO filename without extension; names the per-distro install dir.
    pub iso_basename: String,
    /// Boot config directory relative to the distro install tree, with a
    /// leading slash; `"/"` when the config sits at the root.
    pub boot_config_subdir: String,
    /// Syslinux major version of the distro's bundled isolinux.
    pub detected_version: u32,
}

impl DistroLayout {
    /// Resolve a layout from an extracted ISO tree.
    ///
    /// Returns `Ok(None)` when the distro does not boot via isolinux; the
    /// caller treats that as a deliberate no-op, not an error.
    pub fn resolve(iso_root: &Path, distro_id: &str) -> Result<Option<Self>> {
        let iso = ExtractedIso::new(iso_root);
        let subdir = match iso.isolinux_dir() {
            Some(dir) => dir,
            None => return Ok(None),
        };
        Ok(Some(Self {
            distro_id: distro_id.to_string(),
            iso_basename: iso_basename(iso_root),
            boot_config_subdir: subdir,
            detected_version: iso.isolinux_version()?,
        }))
    }

    /// Generic and alpine variants install straight into the USB root
    /// instead of a per-ISO directory.
    pub fn uses_usb_root(&self) -> bool {
        matches!(self.distro_id.as_str(), "generic" | "alpine")
    }

    /// Generic layout with the boot config at the filesystem root; this is
    /// the case where syslinux needs no directory argument at all.
    pub fn is_root_generic(&self) -> bool {
        self.distro_id == "generic" && self.boot_config_subdir == "/"
    }

    /// Absolute install directory for this distro on the mounted USB.
    pub fn install_dir(&self, mount: &Path) -> PathBuf {
        if self.uses_usb_root() {
            mount.to_path_buf()
        } else {
            mount.join("multibootusb").join(&self.iso_basename)
        }
    }

    /// Absolute directory holding the boot config on the USB.
    pub fn config_dir(&self, mount: &Path) -> PathBuf {
        let trimmed = self.boot_config_subdir.trim_matches('/');
        if trimmed.is_empty() {
            self.install_dir(mount)
        } else {
            self.install_dir(mount).join(trimmed)
        }
    }

    /// Boot config directory as syslinux sees it: relative to the
    /// filesystem root, with a leading slash.
    pub fn config_dir_on_filesystem(&self, mount: &Path) -> String {
        let abs = self.config_dir(mount);
        match abs.strip_prefix(mount) {
            Ok(rel) if !rel.as_os_str().is_empty() => format!("/{}", rel.display()),
            _ => "/".to_string(),
        }
    }

    /// Per-distro boot-sector backup file, `<config_dir>/<distro>.bs`.
    pub fn backup_file(&self, mount: &Path) -> PathBuf {
        self.config_dir(mount).join(format!("{}.bs", self.distro_id))
    }
}

/// Bundled installer binaries and the MBR image.
#[derive(Debug, Clone)]
pub struct Resources {
    /// Directory holding `syslinux<N>` / `extlinux<N>` binaries.
    pub syslinux_bin_dir: PathBuf,
    /// 440-byte master boot record image.
    pub mbr_bin: PathBuf,
}

impl Resources {
    /// Resources rooted at a base directory: `<base>/syslinux/bin` and
    /// `<base>/tools/mbr.bin`.
    pub fn from_base(base: &Path) -> Self {
        Self {
            syslinux_bin_dir: base.join("syslinux").join("bin"),
            mbr_bin: base.join("tools").join("mbr.bin"),
        }
    }

    /// Default resource location under the invoking user's home directory.
    pub fn locate() -> Result<Self> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        Ok(Self::from_base(&home.join(".multiboot-installer")))
    }

    pub fn syslinux_binary(&self, version: u32) -> PathBuf {
        self.syslinux_bin_dir.join(format!("syslinux{}", version))
    }

    pub fn extlinux_binary(&self, version: u32) -> PathBuf {
        self.syslinux_bin_dir.join(format!("extlinux{}", version))
    }
}

/// Everything an installation run needs, passed explicitly into each
/// operation.
pub struct InstallContext<'a> {
    pub resources: Resources,
    pub runner: &'a dyn CommandRunner,
}

/// Aggregate result of an install operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// All steps ran and exited zero.
    Success,
    /// Filesystem kind is in neither installer family; nothing was run.
    Unsupported,
    /// Distro ships no isolinux config; deliberate no-op.
    Skipped,
    /// The named step exited nonzero; later steps were not attempted.
    StepFailed(String),
}

/// Outcome plus the status messages emitted along the way.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub outcome: InstallOutcome,
    pub messages: Vec<String>,
}

impl InstallReport {
    /// Whether the operation ran to completion (a deliberate no-op counts).
    pub fn success(&self) -> bool {
        matches!(
            self.outcome,
            InstallOutcome::Success | InstallOutcome::Skipped
        )
    }
}

/// Status lines for one operation, printed as they happen and collected
/// into the final report.
pub struct StatusLog {
    messages: Vec<String>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        println!("{}", msg);
        self.messages.push(msg);
    }

    pub fn into_report(self, outcome: InstallOutcome) -> InstallReport {
        InstallReport {
            outcome,
            messages: self.messages,
        }
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runner and fixture resources shared by install tests.

    use super::step::{CommandRunner, InstallStep};
    use super::Resources;
    use anyhow::Result;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Runner that records every step and fails the ones it is told to.
    pub struct ScriptedRunner {
        pub calls: RefCell<Vec<InstallStep>>,
        /// Step names that should exit nonzero.
        pub fail_steps: Vec<String>,
        /// Bytes returned as stdout from captured commands (parted print).
        pub capture_stdout: Vec<u8>,
    }

    impl ScriptedRunner {
        pub fn ok() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_steps: Vec::new(),
                capture_stdout: Vec::new(),
            }
        }

        pub fn failing(step_name: &str) -> Self {
            Self {
                fail_steps: vec![step_name.to_string()],
                ..Self::ok()
            }
        }

        pub fn with_capture_stdout(mut self, stdout: &[u8]) -> Self {
            self.capture_stdout = stdout.to_vec();
            self
        }

        pub fn step_names(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|s| s.name.clone()).collect()
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(|s| s.program.clone())
                .collect()
        }

        fn exit_code_for(&self, step: &InstallStep) -> i32 {
            if self.fail_steps.iter().any(|n| n == &step.name) {
                1
            } else {
                0
            }
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, step: &InstallStep) -> Result<i32> {
            self.calls.borrow_mut().push(step.clone());
            Ok(self.exit_code_for(step))
        }

        fn capture(&self, step: &InstallStep) -> Result<(i32, Vec<u8>)> {
            self.calls.borrow_mut().push(step.clone());
            Ok((self.exit_code_for(step), self.capture_stdout.clone()))
        }
    }

    /// Resources backed by dummy binaries in a tempdir, so the executable
    /// permission fix has real files to work on.
    pub fn fixture_resources(temp: &TempDir) -> Resources {
        let resources = Resources::from_base(temp.path());
        fs::create_dir_all(&resources.syslinux_bin_dir).unwrap();
        fs::create_dir_all(resources.mbr_bin.parent().unwrap()).unwrap();
        for version in 3..=6 {
            fs::write(resources.syslinux_binary(version), b"stub").unwrap();
            fs::write(resources.extlinux_binary(version), b"stub").unwrap();
        }
        fs::write(&resources.mbr_bin, vec![0u8; 440]).unwrap();
        resources
    }
}
