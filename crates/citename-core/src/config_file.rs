use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Config;

/// File name of the per-directory settings file.
pub const LOCAL_CONFIG_FILE: &str = ".citename.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value in {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// On-disk TOML settings.
/// All fields are optional so partial files work (layered over defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub naming: Option<NamingConfig>,
    pub scan: Option<ScanConfig>,
    pub network: Option<NetworkConfig>,
    pub files: Option<FilesConfig>,
    pub logging: Option<LoggingConfig>,
    pub sources: Option<SourcesConfig>,
    pub api_keys: Option<ApiKeysConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamingConfig {
    pub max_title_length: Option<usize>,
    pub colon_replacement: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    pub max_pages: Option<usize>,
    pub frontiers_doi_heuristic: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub api_timeout_secs: Option<f64>,
    pub api_delay_secs: Option<f64>,
    pub fuzzy_match_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesConfig {
    pub create_backup: Option<bool>,
    pub backup_folder: Option<String>,
    pub review_folder: Option<String>,
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub enabled: Option<bool>,
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub crossref: Option<bool>,
    pub arxiv: Option<bool>,
    pub open_library: Option<bool>,
    pub semantic_scholar: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub s2_api_key: Option<String>,
    pub crossref_mailto: Option<String>,
}

/// Platform config directory path: `<config_dir>/citename/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("citename").join("config.toml"))
}

/// Load a settings file from a specific path.
pub fn load_from_path(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Result of layering the settings files over the defaults.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// Files that were applied, lowest precedence first.
    pub applied: Vec<PathBuf>,
    /// Files that could not be used. The run continues without them.
    pub warnings: Vec<ConfigError>,
}

/// Build the configuration from defaults, the platform settings file,
/// `./.citename.toml`, and `explicit` (the `--config` path), in increasing
/// precedence.
///
/// Missing platform and local files are skipped silently; a missing explicit
/// file, or any file that fails to read or parse, becomes a warning.
pub fn load_config(explicit: Option<&Path>) -> LoadedConfig {
    let mut loaded = LoadedConfig {
        config: Config::default(),
        applied: Vec::new(),
        warnings: Vec::new(),
    };

    let implicit = [config_path(), Some(PathBuf::from(LOCAL_CONFIG_FILE))];
    for path in implicit.into_iter().flatten() {
        if path.exists() {
            loaded.layer(&path);
        }
    }
    if let Some(path) = explicit {
        loaded.layer(path);
    }

    loaded
}

impl LoadedConfig {
    fn layer(&mut self, path: &Path) {
        match load_from_path(path) {
            Ok(file) => {
                self.warnings.extend(file.apply_to(&mut self.config, path));
                self.applied.push(path.to_path_buf());
            }
            Err(e) => self.warnings.push(e),
        }
    }
}

fn seconds(value: Option<f64>, key: &str, path: &Path) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|secs| {
            Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::Invalid {
                path: path.to_path_buf(),
                message: format!("{key} must be a non-negative number of seconds, got {secs}"),
            })
        })
        .transpose()
}

impl ConfigFile {
    /// Overwrite the fields of `config` that this file sets.
    ///
    /// Invalid values are skipped and returned as errors; the other values
    /// still apply.
    pub fn apply_to(&self, config: &mut Config, path: &Path) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Some(naming) = &self.naming {
            if let Some(v) = naming.max_title_length {
                config.max_title_length = v;
            }
            if let Some(v) = &naming.colon_replacement {
                config.colon_replacement = v.clone();
            }
        }

        if let Some(scan) = &self.scan {
            if let Some(v) = scan.max_pages {
                config.max_pages = v;
            }
            if let Some(v) = scan.frontiers_doi_heuristic {
                config.frontiers_doi_heuristic = v;
            }
        }

        if let Some(network) = &self.network {
            match seconds(network.api_timeout_secs, "api_timeout_secs", path) {
                Ok(Some(v)) => config.api_timeout = v,
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
            match seconds(network.api_delay_secs, "api_delay_secs", path) {
                Ok(Some(v)) => config.api_delay = v,
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
            if let Some(v) = network.fuzzy_match_threshold {
                if (0.0..=1.0).contains(&v) {
                    config.fuzzy_match_threshold = v;
                } else {
                    errors.push(ConfigError::Invalid {
                        path: path.to_path_buf(),
                        message: format!("fuzzy_match_threshold must be within 0..=1, got {v}"),
                    });
                }
            }
        }

        if let Some(files) = &self.files {
            if let Some(v) = files.create_backup {
                config.create_backup = v;
            }
            if let Some(v) = &files.backup_folder {
                config.backup_folder = v.clone();
            }
            if let Some(v) = &files.review_folder {
                config.review_folder = v.clone();
            }
            if let Some(v) = files.dry_run {
                config.dry_run = v;
            }
        }

        if let Some(logging) = &self.logging {
            if let Some(v) = logging.enabled {
                config.logging_enabled = v;
            }
            if let Some(v) = &logging.log_file {
                config.log_file = PathBuf::from(v);
            }
        }

        if let Some(sources) = &self.sources {
            if let Some(v) = sources.crossref {
                config.use_crossref = v;
            }
            if let Some(v) = sources.arxiv {
                config.use_arxiv = v;
            }
            if let Some(v) = sources.open_library {
                config.use_open_library = v;
            }
            if let Some(v) = sources.semantic_scholar {
                config.use_semantic_scholar = v;
            }
        }

        if let Some(keys) = &self.api_keys {
            if let Some(v) = &keys.s2_api_key {
                config.s2_api_key = Some(v.clone());
            }
            if let Some(v) = &keys.crossref_mailto {
                config.crossref_mailto = Some(v.clone());
            }
        }

        errors
    }
}
