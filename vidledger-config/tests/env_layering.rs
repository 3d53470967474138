use std::fs;

use once_cell::sync::Lazy;
use tempfile::tempdir;
use tokio::sync::Mutex;
use vidledger_config::{
    ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
    ConfigOverrides,
};
use vidledger_core::{MissingCatalogPolicy, StopPolicy};

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const MANAGED_VARS: &[&str] = &[
    "VIDLEDGER_CONFIG_PATH",
    "VIDLEDGER_CATALOG_PATH",
    "VIDLEDGER_PLAYLIST_ID",
    "VIDLEDGER_PAGE_SIZE",
    "VIDLEDGER_MAX_BATCHES",
    "VIDLEDGER_EARLY_STOP",
    "VIDLEDGER_REQUIRE_CATALOG",
    "YOUTUBE_API_KEY",
    "YOUTUBE_ACCESS_TOKEN",
    "YOUTUBE_API_BASE",
];

fn clear_env() {
    for key in MANAGED_VARS {
        unsafe { std::env::remove_var(key) };
    }
}

#[tokio::test]
async fn env_file_and_process_env_layer_over_config_file() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let dir = tempdir().expect("tempdir");
    let config_path = dir.path().join("vidledger.toml");
    fs::write(
        &config_path,
        "[sync]\npage_size = 10\nplaylist_id = \"PLfile\"\n",
    )
    .unwrap();
    let env_path = dir.path().join(".env");
    fs::write(
        &env_path,
        "VIDLEDGER_PAGE_SIZE=12\nYOUTUBE_API_KEY=from-env-file\n",
    )
    .unwrap();

    unsafe {
        std::env::set_var("VIDLEDGER_CONFIG_PATH", &config_path);
        std::env::set_var("VIDLEDGER_REQUIRE_CATALOG", "true");
    }

    let result = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: None,
        env_file: Some(env_path),
    })
    .overrides(ConfigOverrides {
        early_stop: true,
        ..ConfigOverrides::default()
    })
    .load();
    clear_env();

    let ConfigLoad { config, warnings } = result.expect("load");
    assert_eq!(config.page_size, 12);
    assert_eq!(config.playlist_id.as_deref(), Some("PLfile"));
    assert_eq!(config.youtube.api_key.as_deref(), Some("from-env-file"));
    assert_eq!(config.missing_catalog, MissingCatalogPolicy::Fail);
    assert_eq!(config.stop_policy, StopPolicy::StopOnKnownPage);
    assert_eq!(config.metadata.config_path.as_deref(), Some(config_path.as_path()));
    assert!(config.metadata.env_file_loaded);
    assert_eq!(warnings.len(), 1);
}

#[tokio::test]
async fn missing_env_file_fails_the_load() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let dir = tempdir().expect("tempdir");
    let config_path = dir.path().join("vidledger.toml");
    fs::write(&config_path, "").unwrap();

    let result = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: Some(config_path),
        env_file: Some(dir.path().join("missing.env")),
    })
    .load();

    assert!(matches!(result, Err(ConfigLoadError::EnvFile { .. })));
}

#[tokio::test]
async fn invalid_env_number_is_reported_by_name() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let dir = tempdir().expect("tempdir");
    let config_path = dir.path().join("vidledger.toml");
    fs::write(&config_path, "").unwrap();
    let env_path = dir.path().join(".env");
    fs::write(&env_path, "").unwrap();
    unsafe { std::env::set_var("VIDLEDGER_PAGE_SIZE", "lots") };

    let result = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: Some(config_path),
        env_file: Some(env_path),
    })
    .load();
    clear_env();

    match result {
        Err(ConfigLoadError::InvalidEnvVar { name, value, .. }) => {
            assert_eq!(name, "VIDLEDGER_PAGE_SIZE");
            assert_eq!(value, "lots");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
