use anyhow::{anyhow, Context, Result};
use std::{
    fs::{File, OpenOptions},
    io::Read,
    os::unix::io::AsRawFd,
    path::{Path, PathBuf},
    time::Duration,
};

use super::{DeviceProvider, DeviceSession, ReadError};
use crate::protocol::frame::{RawFrame, FRAME_LEN};

const SYSFS_HIDRAW: &str = "/sys/class/hidraw";

/// `_IOC(_IOC_WRITE | _IOC_READ, 'H', 0x06, len)`
fn hidiocsfeature(len: usize) -> libc::c_ulong {
    const IOC_READ_WRITE: libc::c_ulong = 3;
    (IOC_READ_WRITE << 30) | ((len as libc::c_ulong) << 16) | ((b'H' as libc::c_ulong) << 8) | 0x06
}

/// Finds the sensor among `/dev/hidraw*` nodes by USB vendor/product id.
pub struct HidrawProvider {
    vendor_id: u16,
    product_id: u16,
    sysfs_root: PathBuf,
}

impl HidrawProvider {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            sysfs_root: PathBuf::from(SYSFS_HIDRAW),
        }
    }

    /// Return the first `/dev/hidrawN` node matching the configured ids.
    pub fn find_node(&self) -> Result<PathBuf> {
        let entries = std::fs::read_dir(&self.sysfs_root)
            .with_context(|| format!("Failed to list {}", self.sysfs_root.display()))?;

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        for name in names {
            let uevent = self.sysfs_root.join(&name).join("device").join("uevent");
            let Ok(content) = std::fs::read_to_string(&uevent) else {
                continue;
            };
            if let Some((vid, pid)) = parse_hid_id(&content) {
                if vid == self.vendor_id && pid == self.product_id {
                    return Ok(Path::new("/dev").join(name));
                }
            }
        }

        Err(anyhow!(
            "no hidraw device with id {:04x}:{:04x}",
            self.vendor_id,
            self.product_id
        ))
    }
}

impl DeviceProvider for HidrawProvider {
    type Session = HidrawSession;

    fn open(&mut self) -> Result<HidrawSession> {
        let path = self.find_node()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|err| anyhow!("Failed to open {}: {err}", path.display()))?;
        log::debug!("Opened {}", path.display());
        Ok(HidrawSession { file, path })
    }
}

/// Parse the `HID_ID=bus:vendor:product` line of a hidraw uevent file.
pub(crate) fn parse_hid_id(uevent: &str) -> Option<(u16, u16)> {
    let id = uevent
        .lines()
        .find_map(|line| line.strip_prefix("HID_ID="))?;
    let mut parts = id.trim().split(':');
    let _bus = parts.next()?;
    let vid = u32::from_str_radix(parts.next()?, 16).ok()?;
    let pid = u32::from_str_radix(parts.next()?, 16).ok()?;
    Some((u16::try_from(vid).ok()?, u16::try_from(pid).ok()?))
}

/// An open hidraw node.
pub struct HidrawSession {
    file: File,
    path: PathBuf,
}

impl DeviceSession for HidrawSession {
    fn send_feature_report(&mut self, data: &[u8]) -> Result<()> {
        let mut report = Vec::with_capacity(data.len() + 1);
        report.push(0u8);
        report.extend_from_slice(data);

        let fd = self.file.as_raw_fd();
        // SAFETY: `report` outlives the call and its length is encoded in the request.
        let rc = unsafe { libc::ioctl(fd, hidiocsfeature(report.len()) as _, report.as_mut_ptr()) };
        if rc < 0 {
            return Err(anyhow!(
                "HIDIOCSFEATURE failed on {}: {}",
                self.path.display(),
                std::io::Error::last_os_error()
            ));
        }
        if (rc as usize) != report.len() {
            return Err(anyhow!(
                "short feature report write on {} ({rc} of {} bytes)",
                self.path.display(),
                report.len()
            ));
        }
        Ok(())
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<RawFrame, ReadError> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        // SAFETY: one valid pollfd for the duration of the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            return Err(classify(std::io::Error::last_os_error()));
        }
        if rc == 0 {
            return Err(ReadError::Timeout);
        }
        if pfd.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0 {
            return Err(ReadError::Removed);
        }

        let mut frame = [0u8; FRAME_LEN];
        match self.file.read(&mut frame) {
            Ok(n) if n == FRAME_LEN => Ok(frame),
            Ok(n) => Err(ReadError::ShortRead { len: n }),
            Err(err) => Err(classify(err)),
        }
    }

    fn path(&self) -> Result<String> {
        self.path
            .to_str()
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("device path is not valid UTF-8"))
    }

    fn close(self) {
        log::debug!("Closing {}", self.path.display());
    }
}

fn classify(err: std::io::Error) -> ReadError {
    match err.raw_os_error() {
        Some(libc::ENODEV) | Some(libc::EIO) | Some(libc::ENXIO) => ReadError::Removed,
        _ if err.kind() == std::io::ErrorKind::TimedOut => ReadError::Timeout,
        _ => ReadError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hid_id() {
        let uevent = "DRIVER=hid-generic\nHID_ID=0003:000004D9:0000A052\nHID_NAME=Holtek USB-zyTemp\n";
        assert_eq!(parse_hid_id(uevent), Some((0x04d9, 0xa052)));
    }

    #[test]
    fn test_parse_hid_id_missing_or_malformed() {
        assert_eq!(parse_hid_id("DRIVER=hid-generic\n"), None);
        assert_eq!(parse_hid_id("HID_ID=0003:zzzz:0000A052\n"), None);
        assert_eq!(parse_hid_id("HID_ID=0003:000104D9:0000A052\n"), None);
    }

    #[test]
    fn test_feature_ioctl_number() {
        // HIDIOCSFEATURE(9) as defined by linux/hidraw.h
        assert_eq!(hidiocsfeature(9), 0xC009_4806);
    }

    #[test]
    fn test_classify_removal_errors() {
        let gone = std::io::Error::from_raw_os_error(libc::ENODEV);
        assert!(classify(gone).is_removal());
        let io = std::io::Error::from_raw_os_error(libc::EIO);
        assert!(classify(io).is_removal());
        let again = std::io::Error::from_raw_os_error(libc::EAGAIN);
        assert!(matches!(classify(again), ReadError::Io(_)));
    }

    #[test]
    fn test_find_node_in_sysfs_tree() {
        let root = std::env::temp_dir().join(format!("co2mon-sysfs-{}", uuid::Uuid::new_v4()));
        for (name, id) in [
            ("hidraw0", "0003:0000046D:0000C52B"),
            ("hidraw3", "0003:000004D9:0000A052"),
        ] {
            let dir = root.join(name).join("device");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("uevent"), format!("HID_ID={id}\n")).unwrap();
        }

        let provider = HidrawProvider {
            vendor_id: 0x04d9,
            product_id: 0xa052,
            sysfs_root: root.clone(),
        };
        assert_eq!(provider.find_node().unwrap(), PathBuf::from("/dev/hidraw3"));

        let other = HidrawProvider {
            vendor_id: 0x1234,
            product_id: 0x5678,
            sysfs_root: root.clone(),
        };
        assert!(other.find_node().is_err());

        std::fs::remove_dir_all(root).unwrap();
    }
}
