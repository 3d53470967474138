pub mod sources;

use std::path::PathBuf;

use serde::Serialize;
use vidledger_core::{
    CatalogStore, MissingCatalogPolicy, RunOptions, StopPolicy, WalkOptions,
    YoutubeCredentials, YoutubeProvider,
};

use crate::loader::error::ConfigLoadError;

pub const DEFAULT_CATALOG_PATH: &str = "knownvideos.toml";
pub const DEFAULT_MAX_BATCHES: usize = 1;

const REDACTED: &str = "***";

/// Effective configuration after all layers were applied.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub catalog_path: PathBuf,
    pub missing_catalog: MissingCatalogPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    pub page_size: u32,
    pub max_batches: usize,
    pub stop_policy: StopPolicy,
    pub youtube: YoutubeConfig,
    #[serde(skip)]
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct YoutubeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Where the effective values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            missing_catalog: MissingCatalogPolicy::default(),
            playlist_id: None,
            page_size: vidledger_core::DEFAULT_PAGE_SIZE,
            max_batches: DEFAULT_MAX_BATCHES,
            stop_policy: StopPolicy::default(),
            youtube: YoutubeConfig::default(),
            metadata: ConfigMetadata::default(),
        }
    }
}

impl Config {
    /// Credentials for the provider. A bearer token wins over an API key
    /// since it also allows uploads playlist discovery.
    pub fn youtube_credentials(
        &self,
    ) -> Result<YoutubeCredentials, ConfigLoadError> {
        if let Some(token) = self.youtube.access_token.clone() {
            return Ok(YoutubeCredentials::Bearer(token));
        }
        if let Some(key) = self.youtube.api_key.clone() {
            return Ok(YoutubeCredentials::ApiKey(key));
        }
        Err(ConfigLoadError::MissingCredentials)
    }

    pub fn youtube_provider(&self) -> Result<YoutubeProvider, ConfigLoadError> {
        let provider = YoutubeProvider::new(self.youtube_credentials()?);
        Ok(match &self.youtube.base_url {
            Some(base) => provider.with_base_url(base),
            None => provider,
        })
    }

    pub fn catalog_store(&self) -> CatalogStore {
        CatalogStore::new(&self.catalog_path)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            collection_id: self.playlist_id.clone(),
            walk: WalkOptions {
                page_size: self.page_size,
                stop_policy: self.stop_policy,
            },
            max_batches: self.max_batches,
            missing_catalog: self.missing_catalog,
        }
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |value: &mut Option<String>| {
            if value.is_some() {
                *value = Some(REDACTED.to_string());
            }
        };
        mask(&mut copy.youtube.api_key);
        mask(&mut copy.youtube.access_token);
        copy
    }
}
