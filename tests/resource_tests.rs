//! Tests for filesystem-backed config resources.
//!
//! Validates load/save round trips, load idempotence, dirty tracking,
//! and the atomic-write discipline under simulated interruption.

use std::fs;
use tempfile::TempDir;
use warden::{ConfigResource, Error, JsonCodec};

fn resource_in(dir: &TempDir) -> ConfigResource {
    ConfigResource::new(dir.path().join("config.json"), Box::new(JsonCodec::new()))
}

// =============================================================================
// Load/Save Tests
// =============================================================================

#[test]
fn test_disk_and_memory_agree_after_save_and_load() {
    let temp = TempDir::new().unwrap();

    let mut res = resource_in(&temp);
    res.set("name", "web01").unwrap();
    res.set("boot", "yes").unwrap();
    res.save().unwrap();

    let mut other = resource_in(&temp);
    other.load().unwrap();
    assert_eq!(other.store(), res.store());
}

#[test]
fn test_load_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let mut res = resource_in(&temp);
    res.set("name", "web01").unwrap();
    res.save().unwrap();

    let mut reader = resource_in(&temp);
    reader.load().unwrap();
    let first = reader.store().clone();
    reader.load().unwrap();
    assert_eq!(reader.store(), &first);
}

#[test]
fn test_load_missing_is_resource_not_found() {
    let temp = TempDir::new().unwrap();
    let mut res = resource_in(&temp);
    assert!(matches!(res.load(), Err(Error::ResourceNotFound(_))));
}

#[test]
fn test_load_corrupt_is_resource_corrupt() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("config.json"), b"{\"name\": ").unwrap();
    let mut res = resource_in(&temp);
    assert!(matches!(res.load(), Err(Error::ResourceCorrupt { .. })));
}

#[test]
fn test_oversized_config_is_resource_corrupt() {
    let temp = TempDir::new().unwrap();
    let huge = vec![b' '; (warden::MAX_CONFIG_FILE_SIZE + 1) as usize];
    fs::write(temp.path().join("config.json"), huge).unwrap();
    let mut res = resource_in(&temp);
    assert!(matches!(res.load(), Err(Error::ResourceCorrupt { .. })));
}

// =============================================================================
// Dirty Tracking Tests
// =============================================================================

#[test]
fn test_fresh_resource_is_clean() {
    let temp = TempDir::new().unwrap();
    let res = resource_in(&temp);
    assert!(!res.is_dirty());
}

#[test]
fn test_mutation_marks_dirty_and_save_clears_it() {
    let temp = TempDir::new().unwrap();
    let mut res = resource_in(&temp);

    res.set("name", "web01").unwrap();
    assert!(res.is_dirty());

    res.save().unwrap();
    assert!(!res.is_dirty());

    res.store_mut().set("boot", "yes").unwrap();
    assert!(res.is_dirty());
}

#[test]
fn test_mutation_never_auto_saves() {
    let temp = TempDir::new().unwrap();
    let mut res = resource_in(&temp);
    res.save().unwrap();

    res.set("name", "web01").unwrap();

    let mut reader = resource_in(&temp);
    reader.load().unwrap();
    assert!(
        !reader.store().contains("name"),
        "mutations must not reach disk before save()"
    );
}

// =============================================================================
// Atomicity Tests
// =============================================================================

#[test]
fn test_interrupted_write_leaves_prior_content_intact() {
    let temp = TempDir::new().unwrap();

    let mut res = resource_in(&temp);
    res.set("name", "web01").unwrap();
    res.save().unwrap();

    // Simulate a save interrupted after staging but before rename: a
    // stray temp file next to the config, holding half a document.
    fs::write(temp.path().join("config.tmp.stale"), b"{\"name\": \"par").unwrap();

    let mut reader = resource_in(&temp);
    reader.load().unwrap();
    assert_eq!(
        reader.store().stored("name").unwrap().as_str(),
        Some("web01"),
        "reader must observe the last completed save"
    );
}

#[test]
fn test_failed_save_cleans_up_staging_files() {
    let temp = TempDir::new().unwrap();

    // Make the rename fail by occupying the config path with a
    // directory; a file cannot be renamed over it.
    let path = temp.path().join("config.json");
    fs::create_dir(&path).unwrap();

    let mut writer = resource_in(&temp);
    writer.set("name", "after").unwrap();
    assert!(writer.save().is_err());

    // No staging files may be left behind.
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains("tmp"))
        .collect();
    assert!(leftovers.is_empty(), "staging files must be cleaned up");
}
