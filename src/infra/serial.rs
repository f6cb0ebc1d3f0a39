//! Serial port enumeration through sysfs
//!
//! Every `/sys/class/tty/<name>` entry with a `device` link is a candidate.
//! USB serial adapters expose `idVendor` and `idProduct` on the USB device a
//! few levels above the tty's device node; ports without them (on-board UARTs,
//! virtual consoles) are skipped.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::defaults::SYSFS_TTY_CLASS;
use crate::core::discovery::{DeviceSource, DiscoveredDevice, SerialDevice};
use crate::core::index::HexId;
use crate::error::DiscoveryError;

/// Ancestors of the tty device node searched for USB ids
const USB_ANCESTOR_DEPTH: usize = 3;

/// Serial ports listed under a sysfs tty class directory
#[derive(Debug, Clone)]
pub struct SysfsSerialSource {
    class_dir: PathBuf,
    dev_dir: PathBuf,
}

impl SysfsSerialSource {
    /// Scan `class_dir`, reporting ports as `<dev_dir>/<name>`
    pub fn new(class_dir: &Path, dev_dir: &Path) -> Self {
        Self {
            class_dir: class_dir.to_path_buf(),
            dev_dir: dev_dir.to_path_buf(),
        }
    }

    /// Blocking scan of the class directory
    ///
    /// A missing class directory (non-Linux hosts) yields no devices.
    pub fn scan(&self) -> Result<Vec<DiscoveredDevice>, DiscoveryError> {
        if !self.class_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut devices = Vec::new();
        for entry in WalkDir::new(&self.class_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| DiscoveryError::Enumeration {
                source_name: "serial".to_string(),
                error: e.to_string(),
            })?;
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };

            let Ok(device_node) = fs::canonicalize(entry.path().join("device")) else {
                continue;
            };
            if let Some(device) = self.usb_device(name, &device_node) {
                devices.push(DiscoveredDevice::Serial(device));
            }
        }
        Ok(devices)
    }

    fn usb_device(&self, name: &str, device_node: &Path) -> Option<SerialDevice> {
        let usb_dir = device_node
            .ancestors()
            .take(USB_ANCESTOR_DEPTH)
            .find(|dir| dir.join("idVendor").is_file() && dir.join("idProduct").is_file())?;

        let vendor_id = read_hex(&usb_dir.join("idVendor"))?;
        let product_id = read_hex(&usb_dir.join("idProduct"))?;
        let serial_number = fs::read_to_string(usb_dir.join("serial"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Some(SerialDevice {
            port: self.dev_dir.join(name).display().to_string(),
            vendor_id,
            product_id,
            serial_number,
        })
    }
}

impl Default for SysfsSerialSource {
    fn default() -> Self {
        Self::new(Path::new(SYSFS_TTY_CLASS), Path::new("/dev"))
    }
}

fn read_hex(path: &Path) -> Option<u16> {
    let content = fs::read_to_string(path).ok()?;
    match HexId::parse(&content) {
        Ok(id) => Some(id.0),
        Err(e) => {
            tracing::debug!(path = %path.display(), "Ignoring USB id: {}", e);
            None
        }
    }
}

#[async_trait]
impl DeviceSource for SysfsSerialSource {
    fn name(&self) -> &str {
        "serial"
    }

    async fn enumerate(&self) -> Result<Vec<DiscoveredDevice>, DiscoveryError> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.scan())
            .await
            .map_err(|e| DiscoveryError::Enumeration {
                source_name: "serial".to_string(),
                error: e.to_string(),
            })?
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    /// Lay out `devices/usb1/1-1/1-1:1.0` with ids on `1-1` and link a tty to it
    fn fake_usb_tty(root: &Path, tty: &str, vid: &str, pid: &str, serial: Option<&str>) {
        let usb = root.join("devices").join("usb1").join(format!("1-{tty}"));
        let interface = usb.join("1-1:1.0");
        fs::create_dir_all(&interface).unwrap();
        fs::write(usb.join("idVendor"), format!("{vid}\n")).unwrap();
        fs::write(usb.join("idProduct"), format!("{pid}\n")).unwrap();
        if let Some(serial) = serial {
            fs::write(usb.join("serial"), format!("{serial}\n")).unwrap();
        }

        let class = root.join("class").join(tty);
        fs::create_dir_all(&class).unwrap();
        symlink(&interface, class.join("device")).unwrap();
    }

    #[test]
    fn test_scan_finds_usb_serial_ports() {
        let temp = TempDir::new().unwrap();
        fake_usb_tty(temp.path(), "ttyACM0", "2341", "0043", Some("75830303934351F0A0E1"));
        fake_usb_tty(temp.path(), "ttyUSB0", "10c4", "ea60", None);

        let source = SysfsSerialSource::new(&temp.path().join("class"), Path::new("/dev"));
        let devices = source.scan().unwrap();

        assert_eq!(
            devices,
            vec![
                DiscoveredDevice::Serial(SerialDevice {
                    port: "/dev/ttyACM0".to_string(),
                    vendor_id: 0x2341,
                    product_id: 0x0043,
                    serial_number: Some("75830303934351F0A0E1".to_string()),
                }),
                DiscoveredDevice::Serial(SerialDevice {
                    port: "/dev/ttyUSB0".to_string(),
                    vendor_id: 0x10c4,
                    product_id: 0xea60,
                    serial_number: None,
                }),
            ]
        );
    }

    #[test]
    fn test_scan_skips_ports_without_usb_ids() {
        let temp = TempDir::new().unwrap();
        let platform = temp.path().join("devices").join("platform").join("serial8250");
        fs::create_dir_all(&platform).unwrap();
        let class = temp.path().join("class").join("ttyS0");
        fs::create_dir_all(&class).unwrap();
        symlink(&platform, class.join("device")).unwrap();
        fs::create_dir_all(temp.path().join("class").join("tty0")).unwrap();

        let source = SysfsSerialSource::new(&temp.path().join("class"), Path::new("/dev"));
        assert!(source.scan().unwrap().is_empty());
    }

    #[test]
    fn test_missing_class_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let source = SysfsSerialSource::new(&temp.path().join("missing"), Path::new("/dev"));
        assert!(source.scan().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enumerate_runs_scan() {
        let temp = TempDir::new().unwrap();
        fake_usb_tty(temp.path(), "ttyACM0", "2341", "0043", None);

        let source = SysfsSerialSource::new(&temp.path().join("class"), Path::new("/dev"));
        assert_eq!(source.enumerate().await.unwrap().len(), 1);
    }
}
