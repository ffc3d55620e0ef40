//! TOML configuration for idstriage.
//!
//! Layered model: an explicit path, else the `IDSTRIAGE_CONFIG` environment
//! variable, else the system location, else compiled-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::triage::prompt::SamplingOptions;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "IDSTRIAGE_CONFIG";

/// System-wide config location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/idstriage/idstriage.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the configuration.
    ///
    /// An explicit `path` must load; the environment and system locations
    /// are best-effort and fall through to defaults. Nothing is logged here
    /// since this runs before the subscriber exists; call
    /// [`Resolved::log`] once tracing is up.
    pub fn resolve(path: Option<&Path>) -> Result<Resolved> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::resolve_from(path, env_path.as_deref(), Path::new(SYSTEM_CONFIG_PATH))
    }

    fn resolve_from(
        path: Option<&Path>,
        env_path: Option<&Path>,
        system_path: &Path,
    ) -> Result<Resolved> {
        if let Some(path) = path {
            return Ok(Resolved {
                config: Self::load(path)?,
                source: Some(path.to_path_buf()),
                rejected: Vec::new(),
            });
        }

        let mut rejected = Vec::new();

        if let Some(path) = env_path {
            match Self::load(path) {
                Ok(config) => {
                    return Ok(Resolved {
                        config,
                        source: Some(path.to_path_buf()),
                        rejected,
                    })
                }
                Err(e) => rejected.push(Rejected {
                    path: path.to_path_buf(),
                    error: format!("{:#}", e),
                }),
            }
        }

        if system_path.exists() {
            match Self::load(system_path) {
                Ok(config) => {
                    return Ok(Resolved {
                        config,
                        source: Some(system_path.to_path_buf()),
                        rejected,
                    })
                }
                Err(e) => rejected.push(Rejected {
                    path: system_path.to_path_buf(),
                    error: format!("{:#}", e),
                }),
            }
        }

        Ok(Resolved {
            config: Self::default(),
            source: None,
            rejected,
        })
    }
}

/// Outcome of [`Config::resolve`].
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: Config,
    /// File the config came from; `None` means compiled-in defaults.
    pub source: Option<PathBuf>,
    /// Candidate files that were tried and failed to load, in order.
    pub rejected: Vec<Rejected>,
}

#[derive(Debug, Clone)]
pub struct Rejected {
    pub path: PathBuf,
    pub error: String,
}

impl Resolved {
    pub fn log(&self) {
        for r in &self.rejected {
            warn!(
                path = %r.path.display(),
                error = %r.error,
                "config file could not be loaded, trying fallback"
            );
        }
        match &self.source {
            Some(path) => info!(path = %path.display(), "loaded configuration"),
            None => debug!("no config file found, using compiled-in defaults"),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP API.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Local inference endpoint and sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the Ollama server.
    pub endpoint: String,
    /// Model tag, e.g. `gemma3:270m`.
    pub name: String,
    /// Upper bound on a single completion request (seconds).
    pub timeout_secs: u64,
    /// Upper bound on the health probe (seconds).
    pub health_timeout_secs: u64,
    pub temperature: f64,
    pub top_p: f64,
    /// Maximum tokens generated per completion.
    pub num_predict: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let sampling = SamplingOptions::default();
        Self {
            endpoint: "http://localhost:11434".to_string(),
            name: "gemma3:270m".to_string(),
            timeout_secs: 120,
            health_timeout_secs: 5,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            num_predict: sampling.num_predict,
        }
    }
}

impl ModelConfig {
    pub fn sampling(&self) -> SamplingOptions {
        SamplingOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            num_predict: self.num_predict,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// SQLite database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/idstriage.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Pacing for `idstriage replay`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Pause between submitted alerts (milliseconds).
    pub delay_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { delay_ms: 10_000 }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON log lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
        assert_eq!(cfg.model.endpoint, "http://localhost:11434");
        assert_eq!(cfg.model.name, "gemma3:270m");
        assert_eq!(cfg.model.timeout_secs, 120);
        assert_eq!(cfg.model.health_timeout_secs, 5);
        assert_eq!(cfg.model.num_predict, 200);
        assert!((cfg.model.temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(cfg.storage.db_path, PathBuf::from("data/idstriage.db"));
        assert_eq!(cfg.replay.delay_ms, 10_000);
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
    }

    #[test]
    fn test_parse_example_toml() {
        let toml_str = r#"
[server]
bind = "127.0.0.1:9000"

[model]
endpoint = "http://gpu-box:11434"
name = "gemma2:2b"
timeout_secs = 30
temperature = 0.2
num_predict = 256

[storage]
db_path = "/var/lib/idstriage/alerts.db"

[replay]
delay_ms = 500

[logging]
level = "debug"
json = true
"#;

        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.model.endpoint, "http://gpu-box:11434");
        assert_eq!(cfg.model.name, "gemma2:2b");
        assert_eq!(cfg.model.timeout_secs, 30);
        assert_eq!(cfg.model.health_timeout_secs, 5);
        assert_eq!(cfg.model.sampling().num_predict, 256);
        assert!((cfg.model.sampling().top_p - 0.9).abs() < f64::EPSILON);
        assert_eq!(
            cfg.storage.db_path,
            PathBuf::from("/var/lib/idstriage/alerts.db")
        );
        assert_eq!(cfg.replay.delay_ms, 500);
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: Config = toml::from_str("[model]\nname = \"llama3\"\n").unwrap();
        assert_eq!(cfg.model.name, "llama3");
        assert_eq!(cfg.model.endpoint, "http://localhost:11434");
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("idstriage.toml");
        std::fs::write(&path, "[server]\nbind = \"0.0.0.0:9999\"\n").unwrap();

        let resolved = Config::resolve(Some(path.as_path())).unwrap();
        assert_eq!(resolved.config.server.bind, "0.0.0.0:9999");
        assert_eq!(resolved.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_explicit_missing_file_errors() {
        let result = Config::resolve(Some(Path::new("/nonexistent/idstriage.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[model\nname = ").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_env_path_is_used_when_set() {
        let dir = tempfile::TempDir::new().unwrap();
        let env_file = dir.path().join("env.toml");
        std::fs::write(&env_file, "[model]\nname = \"from-env\"\n").unwrap();
        let system = dir.path().join("system.toml");
        std::fs::write(&system, "[model]\nname = \"from-system\"\n").unwrap();

        let resolved = Config::resolve_from(None, Some(env_file.as_path()), &system).unwrap();
        assert_eq!(resolved.config.model.name, "from-env");
        assert_eq!(resolved.source.as_deref(), Some(env_file.as_path()));
        assert!(resolved.rejected.is_empty());
    }

    #[test]
    fn test_bad_env_file_falls_back_and_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let env_file = dir.path().join("env.toml");
        std::fs::write(&env_file, "[model\nname = ").unwrap();
        let system = dir.path().join("system.toml");
        std::fs::write(&system, "[model]\nname = \"from-system\"\n").unwrap();

        let resolved = Config::resolve_from(None, Some(env_file.as_path()), &system).unwrap();
        assert_eq!(resolved.config.model.name, "from-system");
        assert_eq!(resolved.source.as_deref(), Some(system.as_path()));
        assert_eq!(resolved.rejected.len(), 1);
        assert_eq!(resolved.rejected[0].path, env_file);
        assert!(resolved.rejected[0].error.contains("failed to parse"));
    }

    #[test]
    fn test_missing_env_file_and_bad_system_file_use_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let env_file = dir.path().join("absent.toml");
        let system = dir.path().join("system.toml");
        std::fs::write(&system, "not = [valid").unwrap();

        let resolved = Config::resolve_from(None, Some(env_file.as_path()), &system).unwrap();
        assert!(resolved.source.is_none());
        assert_eq!(resolved.config.model.name, "gemma3:270m");
        let paths: Vec<_> = resolved.rejected.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec![env_file, system]);
    }

    #[test]
    fn test_no_candidates_uses_defaults_silently() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolved =
            Config::resolve_from(None, None, &dir.path().join("system.toml")).unwrap();
        assert!(resolved.source.is_none());
        assert!(resolved.rejected.is_empty());
        assert_eq!(resolved.config.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn test_resolve_reads_config_env_var() {
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("env.toml");
        std::fs::write(&path, "[replay]\ndelay_ms = 42\n").unwrap();

        std::env::set_var(CONFIG_ENV, &path);
        let resolved = Config::resolve(None);
        std::env::remove_var(CONFIG_ENV);

        let resolved = resolved.unwrap();
        assert_eq!(resolved.config.replay.delay_ms, 42);
        assert_eq!(resolved.source.as_deref(), Some(path.as_path()));
    }
}
