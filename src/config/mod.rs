use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Local persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// App-private directory holding the key-value files and snapshots
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Key the camera collection is stored under
    #[serde(default = "default_camera_key")]
    pub camera_key: String,
    /// Key the snapshot collection is stored under
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
    /// Subdirectory for snapshot image files
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_camera_key() -> String {
    "@cctv_cameras".to_string()
}

fn default_snapshot_key() -> String {
    "cctv_snapshots".to_string()
}

fn default_snapshot_dir() -> String {
    "snapshots".to_string()
}

impl StorageConfig {
    /// Absolute-ish path of the snapshot image directory.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_dir)
    }
}

/// Player tuning passed down to whatever engine renders the stream
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Network buffer in milliseconds
    #[serde(default = "default_caching_ms")]
    pub network_caching_ms: u64,
    /// Live stream buffer in milliseconds
    #[serde(default = "default_caching_ms")]
    pub live_caching_ms: u64,
    /// File caching buffer in milliseconds
    #[serde(default = "default_caching_ms")]
    pub file_caching_ms: u64,
    /// RTSP specific caching in milliseconds
    #[serde(default = "default_caching_ms")]
    pub rtsp_caching_ms: u64,
    /// Force RTSP over TCP (no packet loss on flaky networks)
    #[serde(default = "default_true")]
    pub rtsp_tcp: bool,
    /// Use hardware decoding when available
    #[serde(default = "default_true")]
    pub hardware_decode: bool,
    /// Decode audio; CCTV feeds usually run without it
    #[serde(default)]
    pub audio: bool,
}

fn default_caching_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

/// Connectivity probe configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// TCP connect timeout in milliseconds
    #[serde(default = "default_probe_timeout")]
    pub timeout_ms: u64,
    /// Port assumed when the form leaves it blank
    #[serde(default = "default_rtsp_port")]
    pub default_port: u16,
}

fn default_probe_timeout() -> u64 {
    2500
}

fn default_rtsp_port() -> u16 {
    554
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            camera_key: default_camera_key(),
            snapshot_key: default_snapshot_key(),
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            network_caching_ms: default_caching_ms(),
            live_caching_ms: default_caching_ms(),
            file_caching_ms: default_caching_ms(),
            rtsp_caching_ms: default_caching_ms(),
            rtsp_tcp: true,
            hardware_decode: true,
            audio: false,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout(),
            default_port: default_rtsp_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            streaming: StreamingConfig::default(),
            probe: ProbeConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Load configuration from a file or use default
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

            let config = if path.extension().map_or(false, |ext| ext == "json") {
                serde_json::from_str(&config_str)
                    .map_err(|e| Error::Config(format!("Failed to parse JSON config: {}", e)))?
            } else if path.extension().map_or(false, |ext| ext == "toml") {
                toml::from_str(&config_str)
                    .map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e)))?
            } else {
                return Err(Error::Config("Unsupported config file format".to_string()));
            };

            Ok(config)
        }
        None => Ok(Config::default()),
    }
}
