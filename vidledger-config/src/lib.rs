//! Configuration loading for vidledger.
//!
//! Values are layered from built-in defaults, an optional TOML file, the
//! process environment (optionally seeded from a `.env` file) and finally
//! command-line overrides. The result is a validated [`Config`] that knows
//! how to build the catalog store, provider and run options.
#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod util;

pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigOverrides,
    ConfigWarning, error::ConfigLoadError,
};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{Config, ConfigMetadata, YoutubeConfig};
