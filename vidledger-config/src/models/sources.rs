use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vidledger_core::{MissingCatalogPolicy, StopPolicy};

use crate::loader::error::ConfigLoadError;
use crate::util::{non_blank, parse_bool};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub catalog: FileCatalogConfig,
    #[serde(default)]
    pub sync: FileSyncConfig,
    #[serde(default)]
    pub youtube: FileYoutubeConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileCatalogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<MissingCatalogPolicy>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileSyncConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_policy: Option<StopPolicy>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileYoutubeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl FileConfig {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read config file {}", path.display())
        })?;
        Self::parse_from_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse_from_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub playlist_id: Option<String>,
    pub page_size: Option<u32>,
    pub max_batches: Option<usize>,
    pub early_stop: Option<bool>,
    pub require_catalog: Option<bool>,
    pub youtube_api_key: Option<String>,
    pub youtube_access_token: Option<String>,
    pub youtube_api_base: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| non_blank(lookup(name));

        Ok(Self {
            config_path: var("VIDLEDGER_CONFIG_PATH").map(PathBuf::from),
            catalog_path: var("VIDLEDGER_CATALOG_PATH").map(PathBuf::from),
            playlist_id: var("VIDLEDGER_PLAYLIST_ID"),
            page_size: parse_number(
                "VIDLEDGER_PAGE_SIZE",
                var("VIDLEDGER_PAGE_SIZE"),
            )?,
            max_batches: parse_number(
                "VIDLEDGER_MAX_BATCHES",
                var("VIDLEDGER_MAX_BATCHES"),
            )?,
            early_stop: parse_flag(
                "VIDLEDGER_EARLY_STOP",
                var("VIDLEDGER_EARLY_STOP"),
            )?,
            require_catalog: parse_flag(
                "VIDLEDGER_REQUIRE_CATALOG",
                var("VIDLEDGER_REQUIRE_CATALOG"),
            )?,
            youtube_api_key: var("YOUTUBE_API_KEY"),
            youtube_access_token: var("YOUTUBE_ACCESS_TOKEN"),
            youtube_api_base: var("YOUTUBE_API_BASE"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigLoadError> {
    raw.map(|value| {
        value.parse().map_err(|_| ConfigLoadError::InvalidEnvVar {
            name,
            value,
            expected: "a non-negative integer",
        })
    })
    .transpose()
}

fn parse_flag(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<bool>, ConfigLoadError> {
    raw.map(|value| {
        parse_bool(&value).ok_or(ConfigLoadError::InvalidEnvVar {
            name,
            value,
            expected: "a boolean (true/false/1/0/yes/no/on/off)",
        })
    })
    .transpose()
}
