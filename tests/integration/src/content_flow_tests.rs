//! Content synchronisation feeding declarations into a boot.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ext_content::{
    ContentDescriptor, ContentProvider, ProviderFactory, StandardProviders, spawn_update,
};
use ext_model::{ExtensionDescriptor, ExtensionId, MANIFEST_FILENAME};
use ext_runtime::{Bootstrapper, ComponentDef, DeclaredModule, RuntimeConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::runtime::Handle;

const MANIFEST: &str = r#"
id = "00000000-0000-0000-0000-000000000007"
parent_id = "00000000-0000-0000-0000-000000000000"
kind = "open"
local_classes = ["seven.Impl"]
exported_classes = ["seven.Api"]
"#;

fn source(dir: &Path) -> PathBuf {
    let source = dir.join("source");
    fs::create_dir_all(source.join("assets")).unwrap();
    fs::write(source.join(MANIFEST_FILENAME), MANIFEST).unwrap();
    fs::write(source.join("assets/icon.svg"), "<svg/>").unwrap();
    source
}

fn provider(source: &Path) -> Arc<dyn ContentProvider> {
    StandardProviders::new()
        .create(&ContentDescriptor::folder(source))
        .unwrap()
}

#[tokio::test]
async fn test_background_sync_then_up_to_date() {
    let dir = TempDir::new().unwrap();
    let source = source(dir.path());
    let target = dir.path().join("installed/seven");
    let provider = provider(&source);

    assert!(provider.is_valid());
    assert!(!provider.is_up_to_date(&target));

    let changed = spawn_update(&Handle::current(), provider.clone(), target.clone())
        .completed()
        .await
        .unwrap();
    assert!(changed);
    assert!(provider.is_up_to_date(&target));
    assert_eq!(
        fs::read_to_string(target.join("assets/icon.svg")).unwrap(),
        "<svg/>"
    );

    // A second run has nothing to do.
    assert!(
        !spawn_update(&Handle::current(), provider, target)
            .completed()
            .await
            .unwrap()
    );
}

#[test]
fn test_source_edits_are_mirrored() {
    let dir = TempDir::new().unwrap();
    let source = source(dir.path());
    let target = dir.path().join("installed/seven");
    let provider = provider(&source);
    provider.update(&target).unwrap();

    fs::remove_file(source.join("assets/icon.svg")).unwrap();
    fs::write(source.join("README.md"), "seven").unwrap();
    assert!(!provider.is_up_to_date(&target));

    assert!(provider.update(&target).unwrap());
    assert!(!target.join("assets/icon.svg").exists());
    assert_eq!(fs::read_to_string(target.join("README.md")).unwrap(), "seven");
}

#[tokio::test]
async fn test_vanished_source_is_invalid() {
    let dir = TempDir::new().unwrap();
    let source = source(dir.path());
    let provider = provider(&source);
    fs::remove_dir_all(&source).unwrap();

    assert!(!provider.is_valid());
    let err = spawn_update(&Handle::current(), provider, dir.path().join("out"))
        .completed()
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
}

#[test]
fn test_synced_manifest_boots() {
    let dir = TempDir::new().unwrap();
    let source = source(dir.path());
    let target = dir.path().join("installed/seven");
    provider(&source).update(&target).unwrap();

    let descriptor = ExtensionDescriptor::from_path(&target.join(MANIFEST_FILENAME)).unwrap();
    let seven = ExtensionId::from_u128(7);
    assert_eq!(descriptor.id, Some(seven));

    let runtime = Bootstrapper::new(RuntimeConfig::default())
        .with_module(
            DeclaredModule::new(ExtensionDescriptor::root(ExtensionId::ROOT, ["host.Clock"]))
                .component(ComponentDef::singleton("host.Clock", |_| Ok(42u64))),
        )
        .with_module(
            DeclaredModule::new(descriptor)
                .component(ComponentDef::singleton("seven.Impl", |r| {
                    Ok(*r.get::<u64>("host.Clock")? * 2)
                }))
                .component(ComponentDef::prototype("seven.Api", |r| {
                    Ok(format!("tick {}", r.get::<u64>("seven.Impl")?))
                })),
        )
        .boot()
        .unwrap();

    assert_eq!(*runtime.get::<String>(seven, "seven.Api").unwrap(), "tick 84");
}
