//! Run configuration: live capture settings and the address policy file.
//!
//! The policy file is TOML:
//!
//! ```toml
//! [mac.source]
//! "00:11:22:33:44:55" = "66:77:88:99:aa:bb"
//!
//! [ip.destination]
//! "192.168.1.200" = "10.0.0.10"
//!
//! [filter]
//! blocked_ips = ["10.0.0.1"]
//! ```
//!
//! Keys are parsed into addresses at load time. Replacement values stay as
//! written and are parsed when a frame is rewritten.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use macaddr::MacAddr6;
use serde::Deserialize;

use crate::container::DEFAULT_SNAPLEN;
use crate::error::ConfigError;
use crate::rewriter::AddressRewritePolicy;
use crate::sanitizer::FilterPolicy;
use crate::utils::parse_mac;

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Settings for a live capture or replay channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub interface: String,
    pub promiscuous: bool,
    pub snap_len: u32,
    /// How long a read may block before the running flag is checked again.
    pub read_timeout: Duration,
}

impl CaptureConfig {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            promiscuous: true,
            snap_len: DEFAULT_SNAPLEN,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    /// Zero keeps the default snap length.
    pub fn with_snap_len(mut self, snap_len: u32) -> Self {
        if snap_len > 0 {
            self.snap_len = snap_len;
        }
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// One direction pair of an address table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AddressTables {
    pub source: BTreeMap<String, String>,
    pub destination: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSection {
    pub blocked_ips: Vec<String>,
}

/// Contents of an address-mapping / filter file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyFile {
    pub mac: AddressTables,
    pub ip: AddressTables,
    pub filter: FilterSection,
}

impl PolicyFile {
    /// Read and parse a policy file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Build the rewrite policy, validating every key.
    pub fn rewrite_policy(&self) -> Result<AddressRewritePolicy, ConfigError> {
        Ok(AddressRewritePolicy::new(
            mac_table(&self.mac.source, "mac.source")?,
            mac_table(&self.mac.destination, "mac.destination")?,
            ip_table(&self.ip.source, "ip.source")?,
            ip_table(&self.ip.destination, "ip.destination")?,
        ))
    }

    /// Build the filter policy from `[filter] blocked_ips`.
    pub fn filter_policy(&self) -> Result<FilterPolicy, ConfigError> {
        let blocked = parse_blocklist(self.filter.blocked_ips.iter().map(String::as_str))?;
        Ok(FilterPolicy::new(blocked))
    }
}

/// Addresses `transform` drops when neither `--block` nor a policy file is
/// given.
pub const DEFAULT_BLOCKED_IPS: &[&str] = &["10.0.0.1"];

/// Blocklist of a transform run: the `entries` plus the policy file's
/// `[filter] blocked_ips`, or [`DEFAULT_BLOCKED_IPS`] when both are absent.
pub fn transform_blocklist<'a>(
    entries: impl IntoIterator<Item = &'a str>,
    file: Option<&PolicyFile>,
) -> Result<HashSet<IpAddr>, ConfigError> {
    let mut blocked = parse_blocklist(entries)?;
    match file {
        Some(file) => blocked.extend(file.filter_policy()?.blocked()),
        None if blocked.is_empty() => {
            blocked = parse_blocklist(DEFAULT_BLOCKED_IPS.iter().copied())?;
        }
        None => {}
    }
    Ok(blocked)
}

/// Parse blocklist entries such as `--block` arguments.
pub fn parse_blocklist<'a>(
    entries: impl IntoIterator<Item = &'a str>,
) -> Result<HashSet<IpAddr>, ConfigError> {
    entries
        .into_iter()
        .map(|entry| {
            entry
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidBlockedAddress(entry.to_string()))
        })
        .collect()
}

fn mac_table(
    table: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<HashMap<MacAddr6, String>, ConfigError> {
    table
        .iter()
        .map(|(key, value)| {
            let mac = parse_mac(key).ok_or_else(|| ConfigError::InvalidKey {
                table: name,
                key: key.clone(),
            })?;
            Ok((mac, value.clone()))
        })
        .collect()
}

fn ip_table(
    table: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<HashMap<IpAddr, String>, ConfigError> {
    table
        .iter()
        .map(|(key, value)| {
            let ip = key
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidKey {
                    table: name,
                    key: key.clone(),
                })?;
            Ok((ip, value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    const SAMPLE: &str = r#"
[mac.source]
"00:11:22:33:44:55" = "66:77:88:99:aa:bb"

[mac.destination]
"AA-BB-CC-DD-EE-FF" = "11:22:33:44:55:66"

[ip.source]
"192.168.1.100" = "10.0.0.5"

[ip.destination]
"192.168.1.200" = "10.0.0.10"
"2001:db8::1" = "2001:db8::2"

[filter]
blocked_ips = ["10.0.0.1", "fe80::1"]
"#;

    mod capture_config {
        use super::*;

        #[test]
        fn defaults_match_capture_tooling() {
            let config = CaptureConfig::new("eth0");
            assert_eq!(config.interface, "eth0");
            assert!(config.promiscuous);
            assert_eq!(config.snap_len, 65535);
            assert_eq!(config.read_timeout, Duration::from_millis(100));
        }

        #[test]
        fn zero_snap_len_keeps_default() {
            let config = CaptureConfig::new("eth0").with_snap_len(0);
            assert_eq!(config.snap_len, 65535);
            let config = CaptureConfig::new("eth0").with_snap_len(96);
            assert_eq!(config.snap_len, 96);
        }
    }

    mod policy_file {
        use super::*;

        #[test]
        fn parses_all_tables() {
            let file = PolicyFile::from_toml(SAMPLE).unwrap();
            assert_eq!(file.mac.source.len(), 1);
            assert_eq!(file.ip.destination.len(), 2);
            assert_eq!(file.filter.blocked_ips, vec!["10.0.0.1", "fe80::1"]);
        }

        #[test]
        fn missing_tables_default_to_empty() {
            let file = PolicyFile::from_toml("[ip.source]\n\"1.2.3.4\" = \"5.6.7.8\"\n").unwrap();
            assert!(file.mac.source.is_empty());
            assert!(file.filter.blocked_ips.is_empty());
        }

        #[test]
        fn unknown_tables_are_rejected() {
            assert!(matches!(
                PolicyFile::from_toml("[ports]\n\"80\" = \"8080\"\n"),
                Err(ConfigError::Parse(_))
            ));
        }

        #[test]
        fn builds_policies() {
            let file = PolicyFile::from_toml(SAMPLE).unwrap();
            let policy = file.rewrite_policy().unwrap();
            assert_eq!(policy.len(), 5);

            let filter = file.filter_policy().unwrap();
            assert!(filter.is_blocked(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
            assert!(filter.is_blocked(&"fe80::1".parse().unwrap()));
        }

        #[test]
        fn invalid_keys_are_rejected_at_load() {
            let file = PolicyFile::from_toml("[ip.source]\n\"300.1.1.1\" = \"10.0.0.1\"\n").unwrap();
            match file.rewrite_policy() {
                Err(ConfigError::InvalidKey { table, key }) => {
                    assert_eq!(table, "ip.source");
                    assert_eq!(key, "300.1.1.1");
                }
                other => panic!("expected InvalidKey, got {:?}", other),
            }

            let file = PolicyFile::from_toml("[mac.destination]\n\"zz\" = \"00:00:00:00:00:01\"\n")
                .unwrap();
            assert!(matches!(
                file.rewrite_policy(),
                Err(ConfigError::InvalidKey { table: "mac.destination", .. })
            ));
        }

        #[test]
        fn invalid_replacements_are_kept_for_later() {
            let file = PolicyFile::from_toml("[ip.source]\n\"1.2.3.4\" = \"not-an-ip\"\n").unwrap();
            assert!(file.rewrite_policy().is_ok());
        }

        #[test]
        fn load_reports_missing_file() {
            let err = PolicyFile::load(Path::new("/nonexistent/osi-replay.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Read { .. }));
        }
    }

    mod transform_blocklist {
        use super::*;

        fn ips(entries: &[&str]) -> HashSet<IpAddr> {
            entries.iter().map(|entry| entry.parse().unwrap()).collect()
        }

        #[test]
        fn defaults_when_nothing_is_given() {
            let blocked = transform_blocklist([], None).unwrap();
            assert_eq!(blocked, ips(&["10.0.0.1"]));
        }

        #[test]
        fn block_arguments_replace_the_default() {
            let blocked = transform_blocklist(["192.168.9.9"], None).unwrap();
            assert_eq!(blocked, ips(&["192.168.9.9"]));
        }

        #[test]
        fn policy_file_replaces_the_default() {
            let file = PolicyFile::from_toml("[filter]\nblocked_ips = [\"fe80::1\"]\n").unwrap();
            let blocked = transform_blocklist(["172.16.0.1"], Some(&file)).unwrap();
            assert_eq!(blocked, ips(&["172.16.0.1", "fe80::1"]));

            let empty = PolicyFile::from_toml("").unwrap();
            assert!(transform_blocklist([], Some(&empty)).unwrap().is_empty());
        }

        #[test]
        fn invalid_file_entries_are_reported() {
            let file = PolicyFile::from_toml("[filter]\nblocked_ips = [\"10.0\"]\n").unwrap();
            assert!(matches!(
                transform_blocklist([], Some(&file)),
                Err(ConfigError::InvalidBlockedAddress(_))
            ));
        }
    }

    #[test]
    fn blocklist_rejects_garbage() {
        assert!(parse_blocklist(["10.0.0.1", " 192.168.0.1 "]).is_ok());
        assert!(matches!(
            parse_blocklist(["10.0.0"]),
            Err(ConfigError::InvalidBlockedAddress(_))
        ));
    }
}
