use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file {path} does not exist")]
    MissingConfigFile { path: PathBuf },

    #[error(transparent)]
    File(#[from] anyhow::Error),

    #[error("failed to load env file {path}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("{name}={value:?} is not valid: expected {expected}")]
    InvalidEnvVar {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("page_size must be between 1 and {max}, got {value}")]
    InvalidPageSize { value: u32, max: u32 },

    #[error("max_batches must be at least 1")]
    InvalidMaxBatches,

    #[error(
        "no YouTube credentials configured; set YOUTUBE_API_KEY or YOUTUBE_ACCESS_TOKEN"
    )]
    MissingCredentials,
}
