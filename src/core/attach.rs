//! Board attach
//!
//! Turns a board locator into a board and records it in the sketch metadata.
//! A locator is either an FQBN (`arduino:avr:uno`), a serial port
//! (`/dev/ttyACM0`, `serial:///dev/ttyACM0`, `COM3`) or a network address
//! (`tcp://192.168.1.20:8266`, `http://esp.local`).

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use url::{Host, Url};

use crate::config::defaults::{DEFAULT_SETTLE_TIMEOUT, SERIAL_SCHEME};
use crate::error::CommandError;

use super::catalog::{Board, Catalog};
use super::discovery::{DiscoveryMonitor, NetworkDevice, SerialDevice, Snapshot};
use super::fqbn::Fqbn;
use super::instance::Instances;
use super::progress::{ProgressEvent, ProgressSink};
use super::sketch::{BoardMetadata, Sketch};

/// Attach a sketch to a board
#[derive(Debug, Clone)]
pub struct BoardAttachRequest {
    pub instance_id: u32,
    pub sketch_path: PathBuf,
    /// FQBN, serial port or network locator
    pub board_uri: String,
    /// How long discovery may run (`5s`, `1500ms`, `1m30s`)
    pub search_timeout: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardAttachResponse {
    pub fqbn: String,
}

/// Attach the sketch at `request.sketch_path` to the board named by the locator
pub async fn board_attach(
    instances: &Instances,
    monitor: &DiscoveryMonitor,
    request: &BoardAttachRequest,
    progress: &mut dyn ProgressSink,
) -> Result<BoardAttachResponse, CommandError> {
    let catalog = instances.get(request.instance_id)?;
    let mut sketch =
        Sketch::open(&request.sketch_path).map_err(CommandError::CantOpenSketch)?;
    let settle = parse_duration(&request.search_timeout);

    let fqbn = attach(catalog, monitor, &mut sketch, &request.board_uri, settle, progress).await?;
    Ok(BoardAttachResponse {
        fqbn: fqbn.to_string(),
    })
}

/// Resolve `locator` to a board and write it into the sketch metadata
///
/// FQBN locators are recorded as-is without discovery. Any other locator
/// starts `monitor` for at most `settle`; the monitor is stopped before the
/// matched board is looked up.
pub async fn attach(
    catalog: &Catalog,
    monitor: &DiscoveryMonitor,
    sketch: &mut Sketch,
    locator: &str,
    settle: Duration,
    progress: &mut dyn ProgressSink,
) -> Result<Fqbn, CommandError> {
    let (fqbn, metadata) = match locator.parse::<Fqbn>() {
        Ok(fqbn) => {
            tracing::debug!(fqbn = %fqbn, "Locator is a fully qualified board name");
            let metadata = BoardMetadata {
                fqbn: fqbn.to_string(),
                name: None,
                port: None,
            };
            (fqbn, metadata)
        }
        Err(_) => {
            let target = Target::parse(locator)?;
            let board = discover_board(catalog, monitor, &target, settle).await?;
            progress.on_progress(ProgressEvent::named(format!("Board found: {}", board.name)));

            let fqbn = board.fqbn();
            let metadata = BoardMetadata {
                fqbn: fqbn.to_string(),
                name: Some(board.name.clone()),
                port: Some(target.uri.to_string()),
            };
            (fqbn, metadata)
        }
    };

    sketch.metadata.cpu = metadata;
    sketch
        .export_metadata()
        .map_err(|e| CommandError::PermissionDenied {
            message: "Cannot export sketch metadata".to_string(),
            source: e,
        })?;

    tracing::info!(fqbn = %fqbn, sketch = %sketch.path().display(), "Sketch attached");
    progress.on_progress(ProgressEvent::completed_named(format!("Selected fqbn: {fqbn}")));
    Ok(fqbn)
}

async fn discover_board<'a>(
    catalog: &'a Catalog,
    monitor: &DiscoveryMonitor,
    target: &Target,
    settle: Duration,
) -> Result<&'a Board, CommandError> {
    let mut handle = monitor.start();
    let snapshot = handle
        .settle(settle, |snapshot| target.matches_any(snapshot))
        .await;
    handle.stop().await;

    tracing::debug!(
        uri = %target.uri,
        generation = snapshot.generation(),
        "Matching discovered devices"
    );
    target
        .find_board(catalog, &snapshot)
        .ok_or_else(|| CommandError::InvalidArgument {
            message: format!("no supported board found at {}", target.uri),
        })
}

/// Prefix locators without a scheme with `serial://`
pub fn normalize_locator(locator: &str) -> String {
    if locator.contains("://") {
        locator.to_string()
    } else {
        format!("{SERIAL_SCHEME}://{locator}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
    Serial { location: String },
    Network { host: String, port: Option<u16> },
}

/// A parsed non-FQBN locator
#[derive(Debug, Clone)]
struct Target {
    uri: Url,
    matcher: Matcher,
}

impl Target {
    fn parse(locator: &str) -> Result<Self, CommandError> {
        let normalized = normalize_locator(locator);
        let uri = Url::parse(&normalized).map_err(|e| CommandError::InvalidArgument {
            message: format!("invalid device port '{locator}': {e}"),
        })?;

        let matcher = match uri.scheme() {
            "serial" | "tty" => Matcher::Serial {
                location: serial_location(&uri),
            },
            "http" | "https" | "tcp" | "udp" => Matcher::Network {
                host: match uri.host() {
                    Some(Host::Domain(domain)) => domain.to_string(),
                    Some(Host::Ipv4(addr)) => addr.to_string(),
                    Some(Host::Ipv6(addr)) => addr.to_string(),
                    None => String::new(),
                },
                port: uri.port_or_known_default(),
            },
            scheme => {
                return Err(CommandError::InvalidArgument {
                    message: format!("invalid device port type provided: {scheme}"),
                })
            }
        };

        Ok(Self { uri, matcher })
    }

    fn matches_any(&self, snapshot: &Snapshot) -> bool {
        match &self.matcher {
            Matcher::Serial { .. } => self.serial_device(snapshot).is_some(),
            Matcher::Network { .. } => self.network_device(snapshot).is_some(),
        }
    }

    fn serial_device<'s>(&self, snapshot: &'s Snapshot) -> Option<&'s SerialDevice> {
        let Matcher::Serial { location } = &self.matcher else {
            return None;
        };
        snapshot.serial().iter().find(|device| &device.port == location)
    }

    fn network_device<'s>(&self, snapshot: &'s Snapshot) -> Option<&'s NetworkDevice> {
        let Matcher::Network { host, port } = &self.matcher else {
            return None;
        };
        snapshot.network().iter().find(|device| {
            device.address.eq_ignore_ascii_case(host) && Some(device.port) == *port
        })
    }

    fn find_board<'a>(&self, catalog: &'a Catalog, snapshot: &Snapshot) -> Option<&'a Board> {
        match &self.matcher {
            Matcher::Serial { .. } => {
                let device = self.serial_device(snapshot)?;
                tracing::debug!(
                    port = %device.port,
                    vid = device.vendor_id,
                    pid = device.product_id,
                    "Serial device matched"
                );
                catalog
                    .find_boards_with_vid_pid(device.vendor_id, device.product_id)
                    .into_iter()
                    .next()
            }
            Matcher::Network { .. } => {
                let device = self.network_device(snapshot)?;
                tracing::debug!(
                    address = %device.address,
                    port = device.port,
                    name = %device.name,
                    "Network device matched"
                );
                catalog.find_boards_with_id(&device.name).into_iter().next()
            }
        }
    }
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|ms|s|m|h))+$").expect("valid duration regex")
    })
}

fn duration_part_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|ms|s|m|h)").expect("valid duration part regex")
    })
}

/// Parse a duration like `5s`, `1500ms` or `1m30s`
///
/// Falls back to the default settle timeout when the value is empty or
/// malformed.
pub fn parse_duration(value: &str) -> Duration {
    try_parse_duration(value.trim()).unwrap_or_else(|| {
        if !value.trim().is_empty() {
            tracing::debug!(value, "Invalid timeout, using default");
        }
        DEFAULT_SETTLE_TIMEOUT
    })
}

fn try_parse_duration(value: &str) -> Option<Duration> {
    if value == "0" {
        return Some(Duration::ZERO);
    }
    if !duration_regex().is_match(value) {
        return None;
    }

    let mut nanos: u128 = 0;
    for part in duration_part_regex().captures_iter(value) {
        let unit: u128 = match &part[2] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return None,
        };
        let (whole, fraction) = part[1].split_once('.').unwrap_or((&part[1], ""));
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        nanos = nanos.checked_add(whole.checked_mul(unit)?)?;

        if !fraction.is_empty() {
            let digits = fraction.len().min(18);
            let scale = 10u128.pow(u32::try_from(digits).ok()?);
            let fraction: u128 = fraction[..digits].parse().ok()?;
            nanos = nanos.checked_add(fraction * unit / scale)?;
        }
    }
    u64::try_from(nanos).ok().map(Duration::from_nanos)
}

// Host (with port, when present) followed by the path.
fn serial_location(uri: &Url) -> String {
    let host = uri.host_str().unwrap_or_default();
    match uri.port() {
        Some(port) => format!("{host}:{port}{}", uri.path()),
        None => format!("{host}{}", uri.path()),
    }
}
