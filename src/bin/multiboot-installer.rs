use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use multiboot_installer::install::{self, InstallContext, Resources, SystemRunner};
use multiboot_installer::{preflight, usb, DistroLayout, InstallTarget};

fn usage() -> &'static str {
    "Usage:\n  multiboot-installer <usb_disk> <extracted_iso_dir> <distro_id>\n\n\
     <usb_disk>          target partition, e.g. /dev/sdb1\n\
     <extracted_iso_dir> directory the ISO (or its boot config) was extracted to\n\
     <distro_id>         detected distro, e.g. debian, ubuntu, generic"
}

fn main() -> ExitCode {
    if !preflight::is_root() {
        eprintln!("multiboot-installer must run with root privileges.");
        return ExitCode::FAILURE;
    }

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (usb_disk, iso_dir, distro_id) = match args.as_slice() {
        [disk, iso, distro] => (disk.as_str(), Path::new(iso), distro.as_str()),
        _ => bail!(usage()),
    };

    preflight::check_host_tools()?;

    let details = usb::details(usb_disk)
        .with_context(|| format!("inspecting {}", usb_disk))?;
    let target = InstallTarget {
        usb_disk: usb_disk.to_string(),
        mount_point: details.mount_point.clone(),
        filesystem_kind: details.filesystem_kind.clone(),
    };

    let ctx = InstallContext {
        resources: Resources::locate()?,
        runner: &SystemRunner,
    };

    let layout = DistroLayout::resolve(iso_dir, distro_id)
        .with_context(|| format!("inspecting {}", iso_dir.display()))?;

    let report = install::install_to_distro_dir(&ctx, &target, layout.as_ref())?;
    if !report.success() {
        return Ok(false);
    }

    // Distros without isolinux still get the generic menu.
    if layout.is_none() {
        let report = install::install_default(&ctx, &target)?;
        return Ok(report.success());
    }

    Ok(true)
}
