use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::core::media::default_ffmpeg_args;

const ENV_PREFIX: &str = "CLIPDECK_";

#[derive(Debug, thiserror::Error)]
#[error("Failed to parse config at {}: {source}", .path.display())]
pub struct ConfigError {
    pub path: PathBuf,
    #[source]
    source: Box<figment::Error>,
}

/// Outcome of [`AppConfig::load`].
///
/// Loading runs before logging exists, so a parse failure is handed back in
/// `error` (with `config` holding the defaults) for the caller to report.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub error: Option<ConfigError>,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
    pub migration: MigrationConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

/// Object store and transcoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Root of the filesystem object store. Defaults to `<data_dir>/media`.
    pub root: Option<PathBuf>,
    pub ffmpeg_path: PathBuf,
    /// Output arguments placed between the input and `pipe:1`.
    pub ffmpeg_args: Vec<String>,
    /// Content type recorded for transcoded objects.
    pub output_content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Override the log directory. Defaults to `<data_dir>/logs`.
    pub log_dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Write JSON logs to a daily-rolling file in addition to stdout.
    pub file_logging: bool,
}

/// Defaults applied to media migrations that do not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub prefix: String,
    pub source_suffix: String,
    pub target_suffix: String,
    pub concurrency: usize,
    pub max_objects: usize,
    pub page_size: usize,
    pub log_every: usize,
    pub log_capacity: usize,
    pub dry_run_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffmpeg_args: default_ffmpeg_args(),
            output_content_type: "audio/ogg".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_filter: "info".to_string(),
            file_logging: true,
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            prefix: "audio/".to_string(),
            source_suffix: ".mp3".to_string(),
            target_suffix: ".opus".to_string(),
            concurrency: 5,
            max_objects: 10_000,
            page_size: 1000,
            log_every: 10,
            log_capacity: 500,
            dry_run_delay_ms: 50,
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/clipdeck/config.toml` (or `path`),
    /// with `CLIPDECK_*` environment variables layered on top.
    /// Falls back to defaults when the sources are unparseable.
    pub fn load(path: Option<&Path>) -> LoadedConfig {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        Self::load_from(&config_path, ENV_PREFIX)
    }

    fn load_from(config_path: &Path, env_prefix: &str) -> LoadedConfig {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(env_prefix).split("__"));

        let (config, error) = match figment.extract::<Self>() {
            Ok(config) => (config, None),
            Err(e) => {
                let error = ConfigError {
                    path: config_path.to_path_buf(),
                    source: Box::new(e),
                };
                (Self::default(), Some(error))
            }
        };

        LoadedConfig {
            config,
            path: config_path.to_path_buf(),
            error,
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("clipdeck"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    pub fn media_root(&self) -> PathBuf {
        self.media.root.clone().unwrap_or_else(|| self.data_dir().join("media"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.logging.log_dir.clone().unwrap_or_else(|| self.data_dir().join("logs"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("clipdeck").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
