//! Error types for the capture, codec and pipeline layers.

use std::net::IpAddr;

use pcap_file::PcapError;
use thiserror::Error;

use crate::container::LinkType;

/// Malformed capture-container header or record.
///
/// Fatal for a run: nothing past the offending point can be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("malformed capture: {0}")]
    Invalid(String),

    #[error("unsupported format version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("capture ends inside a header or record")]
    Truncated,

    #[error("captured length {captured} exceeds snap length {snap_len}")]
    ExceedsSnapLen { captured: u32, snap_len: u32 },

    #[error("captured length {captured} exceeds original length {original}")]
    ExceedsOriginalLen { captured: u32, original: u32 },
}

/// Errors surfaced by the container reader and writer.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("capture format error: {0}")]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PcapError> for ContainerError {
    fn from(err: PcapError) -> Self {
        match err {
            PcapError::IncompleteBuffer => ContainerError::Format(FormatError::Truncated),
            PcapError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                ContainerError::Format(FormatError::Truncated)
            }
            PcapError::IoError(e) => ContainerError::Io(e),
            other => ContainerError::Format(FormatError::Invalid(other.to_string())),
        }
    }
}

/// A frame whose required link-layer header does not fit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{layer}: frame too short (need {expected} bytes, have {actual})")]
    PacketTooShort {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// The checksum engine could not compute a checksum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("{layer} checksum needs a preceding IP layer for its pseudo-header")]
    MissingPseudoHeader { layer: &'static str },
}

/// Non-fatal problem with a single substitution of the rewrite policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteWarning {
    #[error("invalid MAC replacement '{replacement}' for {original}")]
    InvalidMac {
        original: String,
        replacement: String,
    },

    #[error("invalid IP replacement '{replacement}' for {original}")]
    InvalidIp {
        original: IpAddr,
        replacement: String,
    },
}

/// Live interface errors.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("network interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("failed to create datalink channel: {0}")]
    ChannelCreation(String),

    #[error("insufficient permissions, run as root or grant CAP_NET_RAW")]
    InsufficientPermissions,

    #[error("failed to send frame: {0}")]
    Send(#[source] std::io::Error),
}

/// Address-mapping and filter configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {table} key '{key}': not a valid address")]
    InvalidKey { table: &'static str, key: String },

    #[error("invalid blocked address '{0}'")]
    InvalidBlockedAddress(String),
}

/// Run-level failures of a pipeline driver.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("link type mismatch: capture is {capture}, interface carries {interface}")]
    LinkTypeMismatch {
        capture: LinkType,
        interface: LinkType,
    },

    #[error("worker pool failure: {0}")]
    Worker(String),
}

impl From<FormatError> for PipelineError {
    fn from(err: FormatError) -> Self {
        PipelineError::Container(ContainerError::Format(err))
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Container(ContainerError::Io(err))
    }
}
