//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use becca_core::{
    becca::Becca,
    config::BeccaConfig,
    event::{ChangeEvent, EntityChange},
    properties::{Attribute, Branch, Note},
};
use std::path::PathBuf;
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Events for a three-level chain `root -> r -> c -> g`, with an inheritable `#tag=x` on `r`.
#[allow(dead_code)]
pub fn tagged_chain() -> Vec<ChangeEvent> {
    [
        EntityChange::NoteUpserted(Note::new("root", "root")),
        EntityChange::NoteUpserted(Note::new("r", "Reading list")),
        EntityChange::NoteUpserted(Note::new("c", "Classics")),
        EntityChange::NoteUpserted(Note::new("g", "The Iliad").with_content("Sing, O goddess")),
        EntityChange::BranchUpserted(Branch::new("root_r", "r", "root", 10)),
        EntityChange::BranchUpserted(Branch::new("r_c", "c", "r", 10)),
        EntityChange::BranchUpserted(Branch::new("c_g", "g", "c", 10)),
        EntityChange::AttributeUpserted(Attribute::label("tag", "r", "tag", "x").inheritable()),
    ]
    .into_iter()
    .map(ChangeEvent::remote)
    .collect()
}

#[allow(dead_code)]
pub fn load(events: Vec<ChangeEvent>) -> Becca {
    init_logging();
    Becca::from_events(BeccaConfig::default(), events)
}

/// Write `events` as a JSON fixture file inside `temp_dir`.
#[allow(dead_code)]
pub fn write_events_fixture(temp_dir: &TempDir, events: &[ChangeEvent]) -> PathBuf {
    let path = temp_dir.path().join("events.json");
    let json = serde_json::to_string_pretty(events).unwrap();
    std::fs::write(&path, json).unwrap();
    path
}

/// Write a TOML config file inside `temp_dir`.
#[allow(dead_code)]
pub fn write_config_fixture(temp_dir: &TempDir, toml: &str) -> PathBuf {
    let path = temp_dir.path().join("becca.toml");
    std::fs::write(&path, toml).unwrap();
    path
}
