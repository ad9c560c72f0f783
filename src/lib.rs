//! Boot-loader installation for multi-ISO USB disks.
//!
//! This crate prepares an already-partitioned USB stick for multi-ISO
//! booting by driving the external system tools that do the real work
//! (syslinux/extlinux, parted, dd). The logic that lives here is the
//! decision protocol: which installer family and version apply to a given
//! (filesystem, distro, layout) tuple, in what order the external steps
//! run, and how per-step failures propagate.
//!
//! # Architecture
//!
//! ```text
//! multiboot-installer
//!     │
//!     ├── usb         - partition inspector (lsblk wrapper)
//!     ├── iso         - extracted-ISO isolinux inspector
//!     ├── install     - family/version/mode decisions, step sequencing
//!     ├── persistence - live-distro overlay creation
//!     ├── process     - structured Cmd builder (no shell)
//!     └── preflight   - host tool + privilege checks
//! ```
//!
//! Installation runs are single-threaded and strictly sequential; each
//! step blocks until the external tool exits, and the run assumes
//! exclusive access to the disk for its duration. Completed steps are
//! never rolled back.

pub mod install;
pub mod iso;
pub mod persistence;
pub mod preflight;
pub mod process;
pub mod usb;

pub use install::{
    install_default, install_to_distro_dir, BootFamily, BootFlagState, CommandRunner,
    DistroLayout, InstallContext, InstallOutcome, InstallReport, InstallStep, InstallTarget,
    Resources, SystemRunner,
};
