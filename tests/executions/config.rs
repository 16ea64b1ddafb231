//! Configuration Tests
//!
//! Loading `StoreConfig` from disk and the effect of each setting on a
//! running store.

use crate::*;
use execstore::{logging, ConfigError, ExecutionStore, MemorySession, RunId, StoreConfig};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

fn store_from(config: StoreConfig) -> (ExecutionStore, Arc<MemorySession>) {
    let session = Arc::new(MemorySession::new());
    seed_shard(&session, SHARD, RANGE);
    let store = ExecutionStore::builder()
        .config(config)
        .session(Arc::clone(&session))
        .build()
        .expect("store builds");
    (store, session)
}

#[test]
fn test_load_config_file() {
    let file = write_config(
        r#"
        default_timeout_ms = 2500
        max_page_size = 3
        allow_legacy_cas = false

        [logging]
        level = "warn"
        "#,
    );

    let config = StoreConfig::from_file(file.path()).unwrap();
    assert_eq!(config.default_timeout_ms, 2500);
    assert_eq!(config.max_page_size, 3);
    assert!(!config.allow_legacy_cas);
    assert_eq!(config.logging.level, "warn");

    let (store, _) = store_from(config);
    assert_eq!(store.config().max_page_size, 3);
    assert!(!store.engine().options().allow_legacy_cas);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StoreConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_invalid_file_is_parse_error() {
    let file = write_config("max_page_size = [1, 2]");
    let err = StoreConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_page_size_from_file_clamps_listing() {
    let file = write_config("max_page_size = 1");
    let (store, _) = store_from(StoreConfig::from_file(file.path()).unwrap());
    create_brand_new(&store, "w1", RunId::new());
    create_brand_new(&store, "w2", RunId::new());

    let page = store
        .list_executions(&execstore::ListExecutionsRequest {
            shard_id: SHARD,
            page_size: 50,
            page_token: Vec::new(),
        })
        .unwrap();
    assert_eq!(page.executions.len(), 1);
}

#[test]
fn test_short_default_timeout_still_serves_calls() {
    let file = write_config("default_timeout_ms = 5000");
    let (store, _) = store_from(StoreConfig::from_file(file.path()).unwrap());
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);
    assert!(get(&store, WF, r1).is_ok());
}

#[test]
fn test_logging_init_from_config() {
    let file = write_config("[logging]\nlevel = \"debug\"");
    let config = StoreConfig::from_file(file.path()).unwrap();
    let level = logging::init(&config.logging).unwrap();
    assert_eq!(logging::init(&config.logging).unwrap(), level);
}
