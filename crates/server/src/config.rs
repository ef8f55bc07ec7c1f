use kvitto::KvittoConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds. A batch waits on every model call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// YAML pipeline configuration; defaults apply when unset
    #[serde(default)]
    pub pipeline_config: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            pipeline_config: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("KVITTO_SERVER").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Pipeline settings with the API key resolved from the environment.
    pub fn pipeline(&self) -> anyhow::Result<KvittoConfig> {
        let mut pipeline = match &self.pipeline_config {
            Some(path) => KvittoConfig::from_file(path)?,
            None => KvittoConfig::default(),
        };
        pipeline.resolve_api_key();
        if pipeline.classify.api_key.is_none() {
            tracing::warn!(
                env = %pipeline.api_key_env,
                "No API key found, classification requests will be unauthenticated"
            );
        }
        Ok(pipeline)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_max_body_size_mb() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout(), Duration::from_secs(180));
        assert_eq!(cfg.max_body_size(), 50 * 1024 * 1024);
        assert!(cfg.enable_cors);
        assert!(cfg.metrics_enabled);
        assert!(cfg.pipeline_config.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_invalid_bind_addr() {
        let cfg = ServerConfig {
            bind_addr: "not an address".into(),
            ..Default::default()
        };
        assert!(cfg.socket_addr().is_err());
    }

    #[test]
    fn test_pipeline_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "version: \"1.0\"\nbatch:\n  max_concurrency: 4\nexport:\n  default_owner: Alex").unwrap();
        let cfg = ServerConfig {
            pipeline_config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let pipeline = cfg.pipeline().unwrap();
        assert_eq!(pipeline.batch.max_concurrency, Some(4));
        assert_eq!(pipeline.export.default_owner, "Alex");
    }

    #[test]
    fn test_missing_pipeline_file() {
        let cfg = ServerConfig {
            pipeline_config: Some(PathBuf::from("/definitely/not/here.yaml")),
            ..Default::default()
        };
        assert!(cfg.pipeline().is_err());
    }
}
