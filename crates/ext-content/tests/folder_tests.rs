use std::fs;
use std::sync::Arc;

use ext_content::{ContentProvider, Error, FolderContentProvider, spawn_update};
use tokio::runtime::Handle;
use tempfile::TempDir;

fn source_with_payload() -> TempDir {
    let source = TempDir::new().unwrap();
    fs::write(source.path().join("extension.toml"), "kind = \"sealed\"").unwrap();
    fs::create_dir_all(source.path().join("lib")).unwrap();
    fs::write(source.path().join("lib/widgets.jar"), b"jar-bytes").unwrap();
    source
}

#[test]
fn test_valid_while_source_exists() {
    let source = source_with_payload();
    let provider = FolderContentProvider::new(source.path());
    assert!(provider.is_valid());

    let path = source.path().to_path_buf();
    drop(source);
    assert!(!FolderContentProvider::new(path).is_valid());
}

#[test]
fn test_update_then_up_to_date() {
    let source = source_with_payload();
    let target = TempDir::new().unwrap();
    let dest = target.path().join("ext-1");
    let provider = FolderContentProvider::new(source.path());

    assert!(!provider.is_up_to_date(&dest));
    assert!(provider.update(&dest).unwrap());
    assert!(provider.is_up_to_date(&dest));
    assert_eq!(fs::read(dest.join("lib/widgets.jar")).unwrap(), b"jar-bytes");
}

#[test]
fn test_update_is_idempotent() {
    let source = source_with_payload();
    let target = TempDir::new().unwrap();
    let provider = FolderContentProvider::new(source.path());

    provider.update(target.path()).unwrap();
    assert!(!provider.update(target.path()).unwrap());
    assert!(provider.is_up_to_date(target.path()));
}

#[test]
fn test_source_change_makes_target_stale() {
    let source = source_with_payload();
    let target = TempDir::new().unwrap();
    let provider = FolderContentProvider::new(source.path());
    provider.update(target.path()).unwrap();

    fs::write(source.path().join("lib/widgets.jar"), b"v2").unwrap();

    assert!(!provider.is_up_to_date(target.path()));
    assert!(provider.update(target.path()).unwrap());
    assert!(provider.is_up_to_date(target.path()));
}

#[test]
fn test_update_with_vanished_source_fails() {
    let source = source_with_payload();
    let target = TempDir::new().unwrap();
    let provider = FolderContentProvider::new(source.path());
    drop(source);

    let err = provider.update(target.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidSource { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_background_update_reports_outcome() {
    let source = source_with_payload();
    let target = TempDir::new().unwrap();
    let provider: Arc<dyn ContentProvider> = Arc::new(FolderContentProvider::new(source.path()));

    let ticket = spawn_update(
        &Handle::current(),
        Arc::clone(&provider),
        target.path().join("ext"),
    );
    assert_eq!(ticket.target(), target.path().join("ext"));
    assert!(ticket.completed().await.unwrap());
    assert!(provider.is_up_to_date(&target.path().join("ext")));
}

#[test]
fn test_background_update_polls_to_completion() {
    let source = source_with_payload();
    let target = TempDir::new().unwrap();
    let provider: Arc<dyn ContentProvider> = Arc::new(FolderContentProvider::new(source.path()));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let mut ticket = spawn_update(runtime.handle(), provider, target.path().to_path_buf());
    let outcome = loop {
        if let Some(outcome) = ticket.try_complete() {
            break outcome;
        }
        std::thread::yield_now();
    };
    assert!(outcome.unwrap());
}
