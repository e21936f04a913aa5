//! High-availability identity.
//!
//! Works out which configured server id this instance is, and the address
//! peers use to reach a given id. The type registry never reads any of this.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};

use tracing::{info, warn};

use crate::error::Error;

/// Default sleep between ZooKeeper connection retries.
pub const DEFAULT_ZOOKEEPER_RETRY_SLEEP_MS: u32 = 1000;

/// Default number of ZooKeeper connection retries.
pub const DEFAULT_ZOOKEEPER_NUM_RETRIES: u32 = 3;

/// Default ZooKeeper session timeout.
pub const DEFAULT_ZOOKEEPER_SESSION_TIMEOUT_MS: u32 = 20000;

/// ZooKeeper settings used by leader election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZookeeperProperties {
    /// Connect string, e.g. `zk1:2181,zk2:2181`.
    pub connect_string: Option<String>,
    /// Sleep between retries in milliseconds.
    pub retry_sleep_time_ms: u32,
    /// Number of retries.
    pub num_retries: u32,
    /// Session timeout in milliseconds.
    pub session_timeout_ms: u32,
}

impl ZookeeperProperties {
    /// Build properties from a shared connect string and an HA-specific one.
    ///
    /// The HA connect string wins when both are set.
    pub fn new(shared_connect: Option<String>, ha_connect: Option<String>) -> Self {
        Self {
            connect_string: ha_connect.or(shared_connect),
            ..Self::default()
        }
    }

    /// Set the retry sleep time.
    pub fn with_retry_sleep_time_ms(mut self, ms: u32) -> Self {
        self.retry_sleep_time_ms = ms;
        self
    }

    /// Set the number of retries.
    pub fn with_num_retries(mut self, retries: u32) -> Self {
        self.num_retries = retries;
        self
    }

    /// Set the session timeout.
    pub fn with_session_timeout_ms(mut self, ms: u32) -> Self {
        self.session_timeout_ms = ms;
        self
    }
}

impl Default for ZookeeperProperties {
    fn default() -> Self {
        Self {
            connect_string: None,
            retry_sleep_time_ms: DEFAULT_ZOOKEEPER_RETRY_SLEEP_MS,
            num_retries: DEFAULT_ZOOKEEPER_NUM_RETRIES,
            session_timeout_ms: DEFAULT_ZOOKEEPER_SESSION_TIMEOUT_MS,
        }
    }
}

/// HA settings for one server instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HaConfig {
    /// Whether HA mode is on.
    pub enabled: bool,
    /// Configured server ids, in priority order.
    pub server_ids: Vec<String>,
    /// `host:port` per server id.
    pub addresses: BTreeMap<String, String>,
    /// Whether peers are reached over TLS.
    pub tls_enabled: bool,
    /// ZooKeeper settings.
    pub zookeeper: ZookeeperProperties,
}

impl HaConfig {
    /// Create a disabled HA configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable HA.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Add a server id with its `host:port`.
    pub fn with_server(mut self, id: impl Into<String>, host_port: impl Into<String>) -> Self {
        let id = id.into();
        if !self.server_ids.contains(&id) {
            self.server_ids.push(id.clone());
        }
        self.addresses.insert(id, host_port.into());
        self
    }

    /// Add a server id that has no address entry.
    pub fn with_server_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.server_ids.contains(&id) {
            self.server_ids.push(id);
        }
        self
    }

    /// Enable or disable TLS.
    pub fn with_tls(mut self, tls_enabled: bool) -> Self {
        self.tls_enabled = tls_enabled;
        self
    }

    /// Set the ZooKeeper properties.
    pub fn with_zookeeper(mut self, zookeeper: ZookeeperProperties) -> Self {
        self.zookeeper = zookeeper;
        self
    }

    /// Check if HA mode is on.
    pub fn is_ha_enabled(&self) -> bool {
        self.enabled
    }

    /// Find the id of this instance.
    ///
    /// Picks the first configured id whose address resolves to a local IP
    /// and whose port is `app_port`.
    pub fn server_id(&self, app_port: u16) -> Result<String, Error> {
        self.server_id_matching(app_port, is_local_address)
    }

    /// Like [`HaConfig::server_id`], with a custom local-address check.
    pub fn server_id_matching<F>(&self, app_port: u16, is_local: F) -> Result<String, Error>
    where
        F: Fn(IpAddr) -> bool,
    {
        for id in &self.server_ids {
            let Some(host_port) = self.addresses.get(id).filter(|a| !a.trim().is_empty()) else {
                info!(server_id = %id, "no address entry for server id");
                continue;
            };
            let addr = match resolve(host_port) {
                Ok(addr) => addr,
                Err(e) => {
                    warn!(server_id = %id, host_port = %host_port, error = %e, "cannot resolve server address");
                    continue;
                }
            };
            if is_local(addr.ip()) && addr.port() == app_port {
                info!(server_id = %id, host_port = %host_port, "matched server id");
                return Ok(id.clone());
            }
        }

        Err(Error::Config(format!(
            "no server id matches a local host and port {} among [{}]",
            app_port,
            self.server_ids.join(",")
        )))
    }

    /// Web address of a server id: `http(s)://host:port`.
    pub fn bound_address(&self, server_id: &str) -> Option<String> {
        let protocol = if self.tls_enabled { "https://" } else { "http://" };
        self.addresses
            .get(server_id)
            .map(|host_port| format!("{}{}", protocol, host_port))
    }
}

fn resolve(host_port: &str) -> Result<SocketAddr, Error> {
    host_port
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::Config(format!("{} resolved to no address", host_port)))
}

/// Check if `ip` belongs to this host.
///
/// Loopback and unspecified addresses are local; anything else is local
/// when a socket can bind to it.
pub fn is_local_address(ip: IpAddr) -> bool {
    ip.is_loopback() || ip.is_unspecified() || UdpSocket::bind(SocketAddr::new(ip, 0)).is_ok()
}
