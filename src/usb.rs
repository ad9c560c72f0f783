//! Thin inspector for the target USB partition.
//!
//! Device *enumeration* (picking which stick to use) is out of scope; this
//! module only reports the facts the installer needs about an already-chosen
//! partition: filesystem kind, mount point, label, UUID, and free space.

use crate::process::Cmd;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Facts about a mounted USB partition, as reported by the host.
#[derive(Debug, Clone)]
pub struct UsbDetails {
    pub filesystem_kind: String,
    pub mount_point: PathBuf,
    pub label: String,
    pub uuid: String,
    pub free_bytes: u64,
}

/// Inspect a partition (e.g. `/dev/sdb1`) via lsblk.
///
/// Fails if the partition is not mounted; every install operation needs the
/// mount point.
pub fn details(usb_disk: &str) -> Result<UsbDetails> {
    let output = Cmd::new("lsblk")
        .args(["-nr", "-o", "FSTYPE,MOUNTPOINT,LABEL,UUID"])
        .arg(usb_disk)
        .error_msg(&format!("lsblk failed for {}", usb_disk))
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .next()
        .with_context(|| format!("lsblk reported nothing for {}", usb_disk))?;

    let mut details = parse_lsblk_row(line)?;
    if details.mount_point.as_os_str().is_empty() {
        bail!("{} is not mounted", usb_disk);
    }

    details.free_bytes = fs2::available_space(&details.mount_point)
        .with_context(|| format!("statvfs failed for {}", details.mount_point.display()))?;

    Ok(details)
}

/// Parse one `lsblk -nr -o FSTYPE,MOUNTPOINT,LABEL,UUID` row.
///
/// The raw format is space-separated with `\xHH` escapes in place of spaces
/// inside values. `free_bytes` is left at 0 for the caller to fill in.
fn parse_lsblk_row(line: &str) -> Result<UsbDetails> {
    let fields: Vec<String> = line.split(' ').map(unescape_lsblk).collect();
    if fields.len() < 4 {
        bail!("unexpected lsblk output: {:?}", line);
    }

    Ok(UsbDetails {
        filesystem_kind: fields[0].clone(),
        mount_point: PathBuf::from(&fields[1]),
        label: fields[2].clone(),
        uuid: fields[3].clone(),
        free_bytes: 0,
    })
}

fn unescape_lsblk(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'x') {
            chars.next();
            let hex: String = chars.by_ref().take(2).collect();
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                out.push(byte as char);
                continue;
            }
            out.push_str(&hex);
        } else {
            out.push(c);
        }
    }
    out
}

/// Base block device of a partition identifier: `/dev/sdb1` -> `/dev/sdb`.
///
/// MBR writes and boot-flag changes target the whole disk, not the
/// partition.
pub fn base_device(usb_disk: &str) -> &str {
    usb_disk.trim_end_matches(|c: char| c.is_ascii_digit())
}
