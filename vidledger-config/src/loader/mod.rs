//! Layered configuration: defaults, TOML file, environment, then CLI
//! overrides, each layer replacing the values the previous one set.

pub mod error;

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use vidledger_core::providers::youtube::MAX_PAGE_SIZE;
use vidledger_core::{MissingCatalogPolicy, StopPolicy};

use crate::models::sources::{EnvConfig, FileConfig};
use crate::models::{Config, ConfigMetadata};
use crate::util::non_blank;
use error::ConfigLoadError;

/// Config file names looked up in the working directory when no path is given.
const CANDIDATES: &[&str] = &["vidledger.toml", "config/vidledger.toml"];

const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Debug, Clone, Default)]
pub struct ConfigLoaderOptions {
    /// Explicit config file. Must exist when set.
    pub config_path: Option<PathBuf>,
    /// Env file to load before reading the environment. Without one, a
    /// `.env` in the working directory is used if present.
    pub env_file: Option<PathBuf>,
}

/// Values given on the command line. Applied after every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub playlist_id: Option<String>,
    pub page_size: Option<u32>,
    pub max_batches: Option<usize>,
    pub early_stop: bool,
    pub require_catalog: bool,
}

/// Non-fatal observations about the effective configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self {
            options,
            overrides: ConfigOverrides::default(),
        }
    }

    pub fn overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Load the env file, read the process environment and resolve.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;
        let env = EnvConfig::gather()?;
        let mut load = self.load_from(env)?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolve against an already gathered environment. Never touches the
    /// process environment.
    pub fn load_from(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let config_path = self.resolve_config_path(&env)?;
        let file = match &config_path {
            Some(path) => {
                debug!(path = %path.display(), "reading config file");
                FileConfig::load_from_file(path)?
            }
            None => FileConfig::default(),
        };

        let mut config = Config::default();
        apply_file(&mut config, file);
        apply_env(&mut config, env);
        apply_overrides(&mut config, &self.overrides);
        config.metadata = ConfigMetadata {
            config_path,
            env_file_loaded: false,
        };

        validate(&config)?;
        let warnings = collect_warnings(&config);
        info!(
            catalog = %config.catalog_path.display(),
            page_size = config.page_size,
            max_batches = config.max_batches,
            "configuration resolved"
        );
        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        match &self.options.env_file {
            Some(path) => dotenvy::from_path(path)
                .map(|()| true)
                .map_err(|source| ConfigLoadError::EnvFile {
                    path: path.clone(),
                    source,
                }),
            None => default_env_file_outcome(dotenvy::dotenv()),
        }
    }

    fn resolve_config_path(
        &self,
        env: &EnvConfig,
    ) -> Result<Option<PathBuf>, ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigLoadError::MissingConfigFile { path });
            }
            return Ok(Some(path));
        }
        Ok(find_default_file())
    }
}

/// An absent `.env` is fine; one that exists but cannot be read or parsed
/// fails the load.
fn default_env_file_outcome(
    result: Result<PathBuf, dotenvy::Error>,
) -> Result<bool, ConfigLoadError> {
    match result {
        Ok(path) => {
            debug!(path = %path.display(), "loaded env file");
            Ok(true)
        }
        Err(err) if err.not_found() => Ok(false),
        Err(source) => Err(ConfigLoadError::EnvFile {
            path: PathBuf::from(DEFAULT_ENV_FILE),
            source,
        }),
    }
}

fn find_default_file() -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(|path| path.to_path_buf())
}

fn apply_file(config: &mut Config, file: FileConfig) {
    if let Some(path) = file.catalog.path {
        config.catalog_path = path;
    }
    if let Some(missing) = file.catalog.missing {
        config.missing_catalog = missing;
    }
    if let Some(id) = file.sync.playlist_id.filter(|id| !id.trim().is_empty()) {
        config.playlist_id = Some(id);
    }
    if let Some(size) = file.sync.page_size {
        config.page_size = size;
    }
    if let Some(batches) = file.sync.max_batches {
        config.max_batches = batches;
    }
    if let Some(policy) = file.sync.stop_policy {
        config.stop_policy = policy;
    }
    if let Some(key) = non_blank(file.youtube.api_key) {
        config.youtube.api_key = Some(key);
    }
    if let Some(token) = non_blank(file.youtube.access_token) {
        config.youtube.access_token = Some(token);
    }
    if let Some(base) = non_blank(file.youtube.base_url) {
        config.youtube.base_url = Some(base);
    }
}

fn apply_env(config: &mut Config, env: EnvConfig) {
    if let Some(path) = env.catalog_path {
        config.catalog_path = path;
    }
    if let Some(id) = env.playlist_id {
        config.playlist_id = Some(id);
    }
    if let Some(size) = env.page_size {
        config.page_size = size;
    }
    if let Some(batches) = env.max_batches {
        config.max_batches = batches;
    }
    if let Some(early_stop) = env.early_stop {
        config.stop_policy = stop_policy_for(early_stop);
    }
    if let Some(require) = env.require_catalog {
        config.missing_catalog = missing_policy_for(require);
    }
    if let Some(key) = env.youtube_api_key {
        config.youtube.api_key = Some(key);
    }
    if let Some(token) = env.youtube_access_token {
        config.youtube.access_token = Some(token);
    }
    if let Some(base) = env.youtube_api_base {
        config.youtube.base_url = Some(base);
    }
}

fn apply_overrides(config: &mut Config, overrides: &ConfigOverrides) {
    if let Some(path) = &overrides.catalog_path {
        config.catalog_path = path.clone();
    }
    if let Some(id) = overrides
        .playlist_id
        .as_ref()
        .filter(|id| !id.trim().is_empty())
    {
        config.playlist_id = Some(id.clone());
    }
    if let Some(size) = overrides.page_size {
        config.page_size = size;
    }
    if let Some(batches) = overrides.max_batches {
        config.max_batches = batches;
    }
    // Flags can only switch the stricter behaviour on.
    if overrides.early_stop {
        config.stop_policy = StopPolicy::StopOnKnownPage;
    }
    if overrides.require_catalog {
        config.missing_catalog = MissingCatalogPolicy::Fail;
    }
}

fn stop_policy_for(early_stop: bool) -> StopPolicy {
    if early_stop {
        StopPolicy::StopOnKnownPage
    } else {
        StopPolicy::FullScan
    }
}

fn missing_policy_for(require: bool) -> MissingCatalogPolicy {
    if require {
        MissingCatalogPolicy::Fail
    } else {
        MissingCatalogPolicy::Bootstrap
    }
}

fn validate(config: &Config) -> Result<(), ConfigLoadError> {
    if !(1..=MAX_PAGE_SIZE).contains(&config.page_size) {
        return Err(ConfigLoadError::InvalidPageSize {
            value: config.page_size,
            max: MAX_PAGE_SIZE,
        });
    }
    if config.max_batches == 0 {
        return Err(ConfigLoadError::InvalidMaxBatches);
    }
    Ok(())
}

fn collect_warnings(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    if config.stop_policy == StopPolicy::StopOnKnownPage {
        warnings.push(ConfigWarning {
            message: "early stop is enabled; uploads listed out of order on \
                      later pages can be missed"
                .into(),
            hint: Some("unset VIDLEDGER_EARLY_STOP for a full scan".into()),
        });
    }
    if config.playlist_id.is_none()
        && config.youtube.access_token.is_none()
        && config.youtube.api_key.is_some()
    {
        warnings.push(ConfigWarning {
            message: "no playlist id configured and an API key cannot discover \
                      the uploads playlist"
                .into(),
            hint: Some(
                "set sync.playlist_id or YOUTUBE_ACCESS_TOKEN".into(),
            ),
        });
    }
    warnings
}
