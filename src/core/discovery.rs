//! Device discovery
//!
//! A [`DiscoveryMonitor`] polls its device sources on a fixed interval from a
//! background task and publishes each result as a [`Snapshot`]. Starting the
//! monitor returns a [`MonitorHandle`]; dropping the handle stops the task.
//!
//! Devices are only meaningful within the snapshot that reported them.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::DiscoveryError;

/// A device attached through a serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialDevice {
    /// Port location (e.g., "/dev/ttyACM0" or "COM3")
    pub port: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
}

/// A device reachable over the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDevice {
    pub address: String,
    pub port: u16,
    /// Advertised name, matched against board ids
    pub name: String,
}

/// A device reported by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveredDevice {
    Serial(SerialDevice),
    Network(NetworkDevice),
}

impl fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial(device) => write!(
                f,
                "{} ({:#06x}:{:#06x})",
                device.port, device.vendor_id, device.product_id
            ),
            Self::Network(device) => write!(f, "{}:{} ({})", device.address, device.port, device.name),
        }
    }
}

/// Devices seen by one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    generation: u64,
    serial: Vec<SerialDevice>,
    network: Vec<NetworkDevice>,
}

impl Snapshot {
    /// Build a snapshot from scanned devices
    pub fn new(generation: u64, devices: Vec<DiscoveredDevice>) -> Self {
        let mut snapshot = Self {
            generation,
            ..Self::default()
        };
        for device in devices {
            match device {
                DiscoveredDevice::Serial(device) => snapshot.serial.push(device),
                DiscoveredDevice::Network(device) => snapshot.network.push(device),
            }
        }
        snapshot
    }

    /// Scan counter; zero means no scan has completed yet
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Serial devices in enumeration order
    pub fn serial(&self) -> &[SerialDevice] {
        &self.serial
    }

    /// Network devices in enumeration order
    pub fn network(&self) -> &[NetworkDevice] {
        &self.network
    }

    pub fn is_empty(&self) -> bool {
        self.serial.is_empty() && self.network.is_empty()
    }
}

/// A source of attached devices
#[async_trait]
pub trait DeviceSource: fmt::Debug + Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// List the devices currently attached
    async fn enumerate(&self) -> Result<Vec<DiscoveredDevice>, DiscoveryError>;
}

/// Source reporting a fixed set of devices
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    devices: Vec<DiscoveredDevice>,
}

impl StaticSource {
    pub fn new(devices: Vec<DiscoveredDevice>) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl DeviceSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn enumerate(&self) -> Result<Vec<DiscoveredDevice>, DiscoveryError> {
        Ok(self.devices.clone())
    }
}

/// Polls device sources in the background
#[derive(Debug)]
pub struct DiscoveryMonitor {
    sources: Vec<Arc<dyn DeviceSource>>,
    interval: Duration,
    starts: AtomicUsize,
}

impl DiscoveryMonitor {
    /// Create a monitor without sources
    pub fn new(interval: Duration) -> Self {
        Self {
            sources: Vec::new(),
            interval,
            starts: AtomicUsize::new(0),
        }
    }

    /// Add a device source
    #[must_use]
    pub fn with_source(mut self, source: impl DeviceSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// How many times this monitor has been started
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Start scanning in a background task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> MonitorHandle {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = watch::channel(Snapshot::default());
        let token = CancellationToken::new();

        tracing::debug!(
            sources = self.sources.len(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "Starting discovery monitor"
        );
        let task = tokio::spawn(scan_loop(
            self.sources.clone(),
            self.interval,
            sender,
            token.clone(),
        ));

        MonitorHandle {
            snapshots: receiver,
            token,
            task: Some(task),
        }
    }
}

/// Scan every source once, in order
pub async fn scan_sources(sources: &[Arc<dyn DeviceSource>], generation: u64) -> Snapshot {
    let mut devices = Vec::new();
    for source in sources {
        match source.enumerate().await {
            Ok(found) => devices.extend(found),
            Err(e) => tracing::warn!(source = source.name(), "Device enumeration failed: {}", e),
        }
    }
    Snapshot::new(generation, devices)
}

async fn scan_loop(
    sources: Vec<Arc<dyn DeviceSource>>,
    interval: Duration,
    sender: watch::Sender<Snapshot>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut generation = 0;

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        generation += 1;
        let snapshot = tokio::select! {
            () = token.cancelled() => break,
            snapshot = scan_sources(&sources, generation) => snapshot,
        };
        tracing::debug!(
            generation,
            serial = snapshot.serial().len(),
            network = snapshot.network().len(),
            "Discovery scan complete"
        );

        if sender.send(snapshot).is_err() {
            break;
        }
    }
    tracing::debug!("Discovery monitor stopped");
}

/// Running monitor; stops scanning when dropped
#[derive(Debug)]
pub struct MonitorHandle {
    snapshots: watch::Receiver<Snapshot>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Latest published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until a scanned snapshot satisfies `ready` or `settle` elapses
    ///
    /// Returns the satisfying snapshot, or the latest one at the deadline.
    pub async fn settle<F>(&mut self, settle: Duration, mut ready: F) -> Snapshot
    where
        F: FnMut(&Snapshot) -> bool,
    {
        let deadline = Instant::now() + settle;
        loop {
            {
                let current = self.snapshots.borrow_and_update();
                if current.generation() > 0 && ready(&*current) {
                    return current.clone();
                }
            }
            match tokio::time::timeout_at(deadline, self.snapshots.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) | Err(_) => break,
            }
        }
        self.snapshot()
    }

    /// Stop scanning and wait for the background task to exit
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Discovery task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
