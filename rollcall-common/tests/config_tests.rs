//! Tests for root folder resolution priority
//!
//! Uses serial_test: these tests manipulate process environment variables.

use rollcall_common::config::{database_path, load_toml_file, resolve_root_folder};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

const TEST_ENV: &str = "ROLLCALL_TEST_ROOT_FOLDER";

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(TEST_ENV, "/from/env");
    let root = resolve_root_folder(Some("/from/cli"), TEST_ENV, Some("root_folder")).unwrap();
    env::remove_var(TEST_ENV);

    assert_eq!(root, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    env::set_var(TEST_ENV, "/from/env");
    let root = resolve_root_folder(None, TEST_ENV, None).unwrap();
    env::remove_var(TEST_ENV);

    assert_eq!(root, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_default_is_never_empty() {
    env::remove_var(TEST_ENV);
    let root = resolve_root_folder(None, TEST_ENV, None).unwrap();

    assert!(!root.as_os_str().is_empty());
    assert!(root.to_string_lossy().contains("rollcall"));
}

#[test]
fn test_database_path_inside_root() {
    let path = database_path(&PathBuf::from("/srv/rollcall"));
    assert_eq!(path, PathBuf::from("/srv/rollcall/rollcall.db"));
}

#[test]
fn test_load_toml_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "root_folder = \"/data\"\n[display]\npoll_interval_ms = 250\n").unwrap();

    let config = load_toml_file(&path).unwrap();
    assert_eq!(config["root_folder"].as_str(), Some("/data"));
    assert_eq!(config["display"]["poll_interval_ms"].as_integer(), Some(250));
}

#[test]
fn test_load_toml_file_rejects_garbage() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "root_folder = [unterminated").unwrap();

    assert!(load_toml_file(&path).is_err());
}
