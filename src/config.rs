//! Configuration management for profview.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::artifact::{ArtifactResolver, DEFAULT_ALLOWED_EXTENSIONS};
use crate::cli::Args;
use crate::session::MAX_SESSION_TTL;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Where profiles are read from.
    pub profiles: ProfilesSection,
    /// Session lifecycle.
    pub sessions: SessionsSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            graceful_shutdown: true,
        }
    }
}

/// Profiles configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesSection {
    /// Base directory containing the profiles.
    pub base_dir: PathBuf,
    /// File name suffixes that may be opened.
    pub allowed_extensions: Vec<String>,
}

impl Default for ProfilesSection {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Sessions configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsSection {
    /// Seconds without activity before a session is unloaded.
    pub ttl_secs: u64,
    /// Seconds between sweeps for expired sessions.
    pub sweep_interval_secs: u64,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            ttl_secs: 30 * 60,
            sweep_interval_secs: 30,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source (for testing).
    pub fn apply_env_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("PROFVIEW_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("PROFVIEW_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Some(dir) = var("PROFVIEW_PROFILES") {
            if !dir.is_empty() {
                self.profiles.base_dir = PathBuf::from(dir);
            }
        }

        if let Some(ttl) = var("PROFVIEW_SESSION_TTL") {
            if let Ok(ttl) = ttl.parse() {
                self.sessions.ttl_secs = ttl;
            }
        }

        if let Some(level) = var("PROFVIEW_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref dir) = args.profiles {
            self.profiles.base_dir = dir.clone();
        }

        if let Some(valid) = args.valid {
            self.sessions.ttl_secs = valid.as_secs();
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sessions.ttl_secs == 0 {
            return Err(ConfigError::Invalid("sessions.ttl_secs must be positive"));
        }
        if self.sessions.ttl_secs > MAX_SESSION_TTL.as_secs() {
            return Err(ConfigError::Invalid(
                "sessions.ttl_secs must not exceed one year",
            ));
        }
        if self.sessions.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sessions.sweep_interval_secs must be positive",
            ));
        }
        if self.profiles.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "profiles.allowed_extensions must not be empty",
            ));
        }
        Ok(())
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port)
            .with_sweep_interval(Duration::from_secs(self.sessions.sweep_interval_secs));

        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    /// Build the artifact resolver for the profiles section.
    pub fn to_resolver(&self) -> ArtifactResolver {
        ArtifactResolver::new(&self.profiles.base_dir)
            .with_allowed_extensions(self.profiles.allowed_extensions.iter().cloned())
    }

    /// Inactivity window for sessions.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.sessions.ttl_secs)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
    /// A value is out of range.
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::Invalid(reason) => write!(f, "invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.profiles.base_dir, PathBuf::from("."));
        assert_eq!(config.session_ttl(), Duration::from_secs(1800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "server": {
                "host": "127.0.0.1",
                "port": 9090
            },
            "profiles": {
                "base_dir": "/srv/profiles",
                "allowed_extensions": [".pb.gz"]
            },
            "sessions": {
                "ttl_secs": 120
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.profiles.base_dir, PathBuf::from("/srv/profiles"));
        assert_eq!(config.profiles.allowed_extensions, vec![".pb.gz"]);
        assert_eq!(config.sessions.ttl_secs, 120);
        assert_eq!(config.sessions.sweep_interval_secs, 30); // Default
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "server": { "port": 9000 } }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0"); // Default
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_apply_env() {
        let vars: HashMap<&str, &str> = [
            ("PROFVIEW_HOST", "10.0.0.1"),
            ("PROFVIEW_PORT", "7000"),
            ("PROFVIEW_PROFILES", "/data"),
            ("PROFVIEW_SESSION_TTL", "60"),
            ("RUST_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.profiles.base_dir, PathBuf::from("/data"));
        assert_eq!(config.sessions.ttl_secs, 60);
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_apply_env_ignores_bad_numbers() {
        let mut config = Config::default();
        config.apply_env_from(|key| match key {
            "PROFVIEW_PORT" => Some("not-a-port".to_string()),
            "PROFVIEW_SESSION_TTL" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.sessions.ttl_secs, 1800);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            host: Some("192.168.1.1".parse().unwrap()),
            port: Some(5000),
            profiles: Some(PathBuf::from("/tmp/profiles")),
            valid: Some(Duration::from_secs(300)),
            log_level: Some("trace".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.profiles.base_dir, PathBuf::from("/tmp/profiles"));
        assert_eq!(config.sessions.ttl_secs, 300);
        assert_eq!(config.log_filter(), "trace");
    }

    #[test]
    fn test_unset_args_keep_file_values() {
        let mut config = Config::default();
        config.server.port = 9999;

        config.apply_args(&Args::default());
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = Config::default();
        config.sessions.ttl_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_ttl() {
        let mut config = Config::default();
        config.apply_env_from(|key| match key {
            "PROFVIEW_SESSION_TTL" => Some(u64::MAX.to_string()),
            _ => None,
        });
        assert_eq!(config.sessions.ttl_secs, u64::MAX);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.sessions.ttl_secs = MAX_SESSION_TTL.as_secs();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_server_config() {
        let config = Config::default();
        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.host, "0.0.0.0");
        assert_eq!(server_config.port, 8080);
        assert_eq!(server_config.sweep_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_host() {
        let mut config = Config::default();
        config.server.host = "not-an-ip".to_string();

        assert!(config.to_server_config().is_err());
    }

    #[test]
    fn test_to_resolver() {
        let mut config = Config::default();
        config.profiles.base_dir = PathBuf::from("/srv/profiles");
        config.profiles.allowed_extensions = vec![".pprof".to_string()];

        let resolver = config.to_resolver();
        assert_eq!(resolver.base_dir(), Path::new("/srv/profiles"));
        assert_eq!(resolver.allowed_extensions(), [".pprof".to_string()]);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"host\""));
        assert!(json.contains("\"ttl_secs\""));
        assert!(json.contains("\"allowed_extensions\""));
    }
}
