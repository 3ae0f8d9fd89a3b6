//! pnet-based frame source and sink.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};

use super::{FrameSink, FrameSource};
use crate::config::CaptureConfig;
use crate::container::{CaptureRecord, LinkType};
use crate::error::CaptureError;

/// Capture and injection on one interface through a pnet datalink channel.
pub struct PnetCapture {
    interface: NetworkInterface,
    tx: Box<dyn DataLinkSender>,
    rx: Box<dyn DataLinkReceiver>,
    snap_len: u32,
    running: Arc<AtomicBool>,
}

impl PnetCapture {
    /// Open a channel on the interface named in `config`.
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let interface = find_interface(&config.interface)?;

        let channel_config = Config {
            read_timeout: Some(config.read_timeout),
            promiscuous: config.promiscuous,
            ..Config::default()
        };

        let (tx, rx) = match datalink::channel(&interface, channel_config) {
            Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => {
                return Err(CaptureError::ChannelCreation(
                    "unsupported channel type".to_string(),
                ))
            }
            Err(e) => return Err(channel_error(e)),
        };

        tracing::debug!(
            "Opened {} (promiscuous: {}, snaplen: {})",
            interface.name,
            config.promiscuous,
            config.snap_len
        );

        Ok(Self {
            interface,
            tx,
            rx,
            snap_len: config.snap_len,
            running: Arc::new(AtomicBool::new(true)),
        })
    }
}

impl FrameSource for PnetCapture {
    fn next_frame(&mut self) -> Result<Option<CaptureRecord>, CaptureError> {
        Ok(read_frame(self.rx.as_mut(), &self.running, self.snap_len))
    }

    fn link_type(&self) -> LinkType {
        LinkType::ETHERNET
    }

    fn snap_len(&self) -> u32 {
        self.snap_len
    }

    fn set_running(&mut self, running: Arc<AtomicBool>) {
        self.running = running;
    }
}

/// Next frame from `rx`, or `None` once `running` is cleared.
///
/// Read failures are logged and the read is retried.
fn read_frame(
    rx: &mut dyn DataLinkReceiver,
    running: &AtomicBool,
    snap_len: u32,
) -> Option<CaptureRecord> {
    while running.load(Ordering::SeqCst) {
        match rx.next() {
            Ok(frame) => {
                let (ts_sec, ts_usec) = now();
                return Some(CaptureRecord::truncated(
                    ts_sec,
                    ts_usec,
                    frame.to_vec(),
                    snap_len,
                ));
            }
            // Timeout is expected, check the running flag again
            Err(e) if is_timeout(&e) => continue,
            Err(e) => {
                tracing::warn!("Capture read failed: {}", e);
                continue;
            }
        }
    }
    None
}

impl FrameSink for PnetCapture {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), CaptureError> {
        match self.tx.send_to(frame, None) {
            Some(result) => result.map_err(CaptureError::Send),
            None => Err(CaptureError::Send(io::Error::new(
                io::ErrorKind::Other,
                "no transmit buffer available",
            ))),
        }
    }

    fn interface_name(&self) -> &str {
        &self.interface.name
    }
}

/// List all available network interfaces.
pub fn list_interfaces() -> Vec<String> {
    datalink::interfaces()
        .into_iter()
        .map(|iface| {
            let status = if iface.is_up() { "UP" } else { "DOWN" };
            let ips: Vec<_> = iface.ips.iter().map(|ip| ip.to_string()).collect();
            let mac = iface
                .mac
                .map(|mac| mac.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{}: {} {} [{}]",
                iface.name,
                status,
                mac,
                if ips.is_empty() {
                    "no IP".to_string()
                } else {
                    ips.join(", ")
                }
            )
        })
        .collect()
}

fn find_interface(name: &str) -> Result<NetworkInterface, CaptureError> {
    datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| CaptureError::InterfaceNotFound(name.to_string()))
}

fn channel_error(e: io::Error) -> CaptureError {
    let msg = e.to_string();
    if e.kind() == io::ErrorKind::PermissionDenied
        || msg.contains("permission")
        || msg.contains("Operation not permitted")
    {
        return CaptureError::InsufficientPermissions;
    }
    CaptureError::ChannelCreation(msg)
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Wall-clock time as seconds and microseconds.
fn now() -> (u32, u32) {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (elapsed.as_secs() as u32, elapsed.subsec_micros())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_interface_is_reported() {
        let config = CaptureConfig::new("osi-replay-does-not-exist0");
        match PnetCapture::open(&config) {
            Err(CaptureError::InterfaceNotFound(name)) => {
                assert_eq!(name, "osi-replay-does-not-exist0")
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("interface should not exist"),
        }
    }

    #[test]
    fn permission_errors_are_recognized() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            channel_error(err),
            CaptureError::InsufficientPermissions
        ));
        let err = io::Error::new(io::ErrorKind::Other, "Operation not permitted (os error 1)");
        assert!(matches!(
            channel_error(err),
            CaptureError::InsufficientPermissions
        ));
        let err = io::Error::new(io::ErrorKind::Other, "no such device");
        assert!(matches!(channel_error(err), CaptureError::ChannelCreation(_)));
    }

    /// Receiver that plays back a script of read results.
    struct ScriptedReceiver {
        script: Vec<io::Result<Vec<u8>>>,
        current: Vec<u8>,
        running: Arc<AtomicBool>,
    }

    impl DataLinkReceiver for ScriptedReceiver {
        fn next(&mut self) -> io::Result<&[u8]> {
            if self.script.is_empty() {
                self.running.store(false, Ordering::SeqCst);
                return Err(io::Error::from(io::ErrorKind::TimedOut));
            }
            self.current = self.script.remove(0)?;
            Ok(&self.current)
        }
    }

    #[test]
    fn read_errors_are_skipped() {
        let running = Arc::new(AtomicBool::new(true));
        let mut rx = ScriptedReceiver {
            script: vec![
                Err(io::Error::from(io::ErrorKind::TimedOut)),
                Err(io::Error::new(io::ErrorKind::Other, "network is down")),
                Ok(vec![0xab; 100]),
            ],
            current: Vec::new(),
            running: running.clone(),
        };

        let record = read_frame(&mut rx, &running, 64).unwrap();
        assert_eq!(record.data(), &[0xab; 64][..]);
        assert_eq!(record.original_len(), 100);

        assert!(read_frame(&mut rx, &running, 64).is_none());
    }

    #[test]
    fn cleared_flag_stops_reading() {
        let running = Arc::new(AtomicBool::new(false));
        let mut rx = ScriptedReceiver {
            script: vec![Ok(vec![1, 2, 3])],
            current: Vec::new(),
            running: running.clone(),
        };
        assert!(read_frame(&mut rx, &running, 64).is_none());
        assert_eq!(rx.script.len(), 1);
    }

    #[test]
    fn timeouts_are_not_errors() {
        assert!(is_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_timeout(&io::Error::from(io::ErrorKind::BrokenPipe)));
    }
}
