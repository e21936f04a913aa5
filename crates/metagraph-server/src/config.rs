//! Server configuration.

use clap::Parser;
use std::path::PathBuf;

use crate::ha::{
    HaConfig, ZookeeperProperties, DEFAULT_ZOOKEEPER_NUM_RETRIES, DEFAULT_ZOOKEEPER_RETRY_SLEEP_MS,
    DEFAULT_ZOOKEEPER_SESSION_TIMEOUT_MS,
};

/// Default application port.
pub const DEFAULT_APP_PORT: u16 = 21000;

/// Default data directory.
pub const DEFAULT_DATA_PATH: &str = "./data";

/// Metagraph server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the type store directory.
    pub data_path: PathBuf,

    /// Schema documents registered at startup, in order.
    pub bootstrap_files: Vec<PathBuf>,

    /// Register the built-in lineage types at startup.
    pub lineage_types: bool,

    /// Port the application listens on; used to identify this HA server.
    pub app_port: u16,

    /// High-availability settings.
    pub ha: HaConfig,
}

impl ServerConfig {
    /// Create a new server configuration with the given data path.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            bootstrap_files: Vec::new(),
            lineage_types: true,
            app_port: DEFAULT_APP_PORT,
            ha: HaConfig::default(),
        }
    }

    /// Add a bootstrap schema file.
    pub fn with_bootstrap_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.bootstrap_files.push(path.into());
        self
    }

    /// Skip registering the built-in lineage types.
    pub fn without_lineage_types(mut self) -> Self {
        self.lineage_types = false;
        self
    }

    /// Set the application port.
    pub fn with_app_port(mut self, port: u16) -> Self {
        self.app_port = port;
        self
    }

    /// Set the HA configuration.
    pub fn with_ha(mut self, ha: HaConfig) -> Self {
        self.ha = ha;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "metagraph-server")]
#[command(version, about = "Metagraph type service", long_about = None)]
pub struct Args {
    /// Path to the type store directory.
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Schema document to register at startup (repeatable).
    #[arg(short, long = "bootstrap")]
    pub bootstrap: Vec<PathBuf>,

    /// Do not register the built-in lineage types.
    #[arg(long)]
    pub no_lineage_types: bool,

    /// Port the application listens on.
    #[arg(long, default_value_t = DEFAULT_APP_PORT)]
    pub app_port: u16,

    /// Enable high-availability mode.
    #[arg(long)]
    pub ha_enabled: bool,

    /// HA server as `id=host:port` (repeatable, in priority order).
    #[arg(long = "server-id", value_parser = parse_server_id)]
    pub server_ids: Vec<(String, String)>,

    /// Peers are reached over TLS.
    #[arg(long)]
    pub tls: bool,

    /// Shared ZooKeeper connect string.
    #[arg(long)]
    pub zookeeper_connect: Option<String>,

    /// ZooKeeper connect string for HA only; overrides --zookeeper-connect.
    #[arg(long)]
    pub ha_zookeeper_connect: Option<String>,

    /// Sleep between ZooKeeper retries in milliseconds.
    #[arg(long, default_value_t = DEFAULT_ZOOKEEPER_RETRY_SLEEP_MS)]
    pub zookeeper_retry_sleep_ms: u32,

    /// Number of ZooKeeper retries.
    #[arg(long, default_value_t = DEFAULT_ZOOKEEPER_NUM_RETRIES)]
    pub zookeeper_num_retries: u32,

    /// ZooKeeper session timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_ZOOKEEPER_SESSION_TIMEOUT_MS)]
    pub zookeeper_session_timeout_ms: u32,
}

impl Args {
    /// Convert command-line arguments to server configuration.
    pub fn into_config(self) -> ServerConfig {
        let zookeeper = ZookeeperProperties::new(self.zookeeper_connect, self.ha_zookeeper_connect)
            .with_retry_sleep_time_ms(self.zookeeper_retry_sleep_ms)
            .with_num_retries(self.zookeeper_num_retries)
            .with_session_timeout_ms(self.zookeeper_session_timeout_ms);

        let ha = self
            .server_ids
            .into_iter()
            .fold(HaConfig::new(), |ha, (id, host_port)| ha.with_server(id, host_port))
            .with_enabled(self.ha_enabled)
            .with_tls(self.tls)
            .with_zookeeper(zookeeper);

        ServerConfig {
            data_path: self.data_path,
            bootstrap_files: self.bootstrap,
            lineage_types: !self.no_lineage_types,
            app_port: self.app_port,
            ha,
        }
    }
}

fn parse_server_id(s: &str) -> Result<(String, String), String> {
    let (id, host_port) = s
        .split_once('=')
        .ok_or_else(|| format!("expected id=host:port, got {}", s))?;
    let (id, host_port) = (id.trim(), host_port.trim());
    if id.is_empty() || host_port.is_empty() {
        return Err(format!("expected id=host:port, got {}", s));
    }
    Ok((id.to_string(), host_port.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.data_path, PathBuf::from("./data"));
        assert!(config.bootstrap_files.is_empty());
        assert!(config.lineage_types);
        assert_eq!(config.app_port, DEFAULT_APP_PORT);
        assert!(!config.ha.is_ha_enabled());
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::new("/var/lib/metagraph")
            .with_bootstrap_file("models/hive.json")
            .with_bootstrap_file("models/kafka.json")
            .without_lineage_types()
            .with_app_port(31000)
            .with_ha(HaConfig::new().with_enabled(true));

        assert_eq!(config.data_path, PathBuf::from("/var/lib/metagraph"));
        assert_eq!(config.bootstrap_files.len(), 2);
        assert!(!config.lineage_types);
        assert_eq!(config.app_port, 31000);
        assert!(config.ha.is_ha_enabled());
    }

    #[test]
    fn test_args_into_config() {
        let args = Args::parse_from([
            "metagraph-server",
            "--data-path",
            "/tmp/mg",
            "--bootstrap",
            "types.json",
            "--ha-enabled",
            "--server-id",
            "id1=host1:21000",
            "--server-id",
            "id2=host2:21000",
            "--tls",
            "--zookeeper-connect",
            "zk:2181",
            "--zookeeper-num-retries",
            "5",
        ]);
        let config = args.into_config();

        assert_eq!(config.data_path, PathBuf::from("/tmp/mg"));
        assert_eq!(config.bootstrap_files, vec![PathBuf::from("types.json")]);
        assert!(config.ha.is_ha_enabled());
        assert_eq!(config.ha.server_ids, vec!["id1".to_string(), "id2".to_string()]);
        assert_eq!(
            config.ha.bound_address("id2").as_deref(),
            Some("https://host2:21000")
        );
        assert_eq!(config.ha.zookeeper.connect_string.as_deref(), Some("zk:2181"));
        assert_eq!(config.ha.zookeeper.num_retries, 5);
        assert_eq!(
            config.ha.zookeeper.session_timeout_ms,
            DEFAULT_ZOOKEEPER_SESSION_TIMEOUT_MS
        );
    }

    #[test]
    fn test_parse_server_id() {
        assert_eq!(
            parse_server_id("id1 = host:21000").unwrap(),
            ("id1".to_string(), "host:21000".to_string())
        );
        assert!(parse_server_id("host:21000").is_err());
        assert!(parse_server_id("=host:21000").is_err());
    }
}
