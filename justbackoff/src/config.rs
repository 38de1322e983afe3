use crate::backoff::{Backoff, DEFAULT_FACTOR, DEFAULT_MAX_MS, DEFAULT_MIN_MS};
use crate::jitter::JitterSource;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const ENV_MIN_MS: &str = "JUSTBACKOFF_MIN_MS";
pub const ENV_MAX_MS: &str = "JUSTBACKOFF_MAX_MS";
pub const ENV_FACTOR: &str = "JUSTBACKOFF_FACTOR";
pub const ENV_JITTER: &str = "JUSTBACKOFF_JITTER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse config yaml {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },
    #[error("no config directory available on this platform")]
    NoConfigDir,
    #[error("write config file {}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("serialize config")]
    Serialize(#[from] serde_yaml::Error),
}

/// Settings that look like mistakes. None of them stop a `Backoff` from
/// being built.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigWarning {
    #[error("min_ms {min_ms} exceeds max_ms {max_ms}; every delay will be max_ms")]
    Inverted { min_ms: f64, max_ms: f64 },
    #[error("{field} is negative ({value})")]
    Negative { field: &'static str, value: f64 },
    #[error("factor {0} is below 1; delays shrink instead of growing")]
    ShrinkingFactor(f64),
}

/// Serializable `Backoff` parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub min_ms: f64,
    pub max_ms: f64,
    pub factor: f64,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_ms: DEFAULT_MIN_MS,
            max_ms: DEFAULT_MAX_MS,
            factor: DEFAULT_FACTOR,
            jitter: false,
        }
    }
}

impl BackoffConfig {
    /// Reads `path` when given, otherwise the per-user config file if one
    /// exists, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::config_path() {
                Ok(p) if p.exists() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_yaml(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded backoff config");
        Ok(cfg)
    }

    pub fn from_yaml(data: &str) -> Result<Self, serde_yaml::Error> {
        // an empty document deserializes as unit, not as an empty map
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(data)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        let data = serde_yaml::to_string(self)?;
        let mut f = fs::File::create(path).map_err(write_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = f.metadata().map_err(write_err)?.permissions();
            perms.set_mode(0o600);
            f.set_permissions(perms).map_err(write_err)?;
        }
        f.write_all(data.as_bytes()).map_err(write_err)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let proj = ProjectDirs::from("", "", "justbackoff").ok_or(ConfigError::NoConfigDir)?;
        Ok(proj.config_dir().join("config.yaml"))
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Applies `JUSTBACKOFF_*` overrides looked up through `lookup`. Unset
    /// and empty variables are skipped.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty()).map(|v| (var, v));

        if let Some((var, v)) = get(ENV_MIN_MS) {
            self.min_ms = parse_f64(var, &v)?;
        }
        if let Some((var, v)) = get(ENV_MAX_MS) {
            self.max_ms = parse_f64(var, &v)?;
        }
        if let Some((var, v)) = get(ENV_FACTOR) {
            self.factor = parse_f64(var, &v)?;
        }
        if let Some((var, v)) = get(ENV_JITTER) {
            self.jitter = parse_bool(var, &v)?;
        }
        debug!(config = ?self, "applied environment overrides");
        Ok(())
    }

    pub fn check(&self) -> Vec<ConfigWarning> {
        let mut out = Vec::new();
        if self.min_ms > self.max_ms {
            out.push(ConfigWarning::Inverted {
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        for (field, value) in [("min_ms", self.min_ms), ("max_ms", self.max_ms), ("factor", self.factor)] {
            if value < 0.0 {
                out.push(ConfigWarning::Negative { field, value });
            }
        }
        if (0.0..1.0).contains(&self.factor) {
            out.push(ConfigWarning::ShrinkingFactor(self.factor));
        }
        out
    }

    pub fn build(&self) -> Backoff {
        Backoff::new(self.min_ms, self.max_ms, self.factor, self.jitter)
    }

    pub fn build_with_source<R: JitterSource>(&self, source: R) -> Backoff<R> {
        Backoff::with_source(self.min_ms, self.max_ms, self.factor, self.jitter, source)
    }
}

fn parse_f64(var: &'static str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            var,
            value: value.to_string(),
        }),
    }
}
