use std::fs;

use ext_content::ContentDescriptor;
use ext_model::{ExtensionId, ExtensionKind};
use ext_registry::{Application, Error, ExtensionEntry, Format, RegistryStore};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;
use uuid::Uuid;

fn sample() -> Application {
    let mut app = Application::new(Uuid::from_u128(7));
    app.add_extension(
        None,
        ExtensionEntry::new(ExtensionId::ROOT, ExtensionKind::Root, ContentDescriptor::Builtin)
            .with_child(ExtensionEntry::new(
                ExtensionId::from_u128(1),
                ExtensionKind::Open,
                ContentDescriptor::folder("/srv/ext/one"),
            )),
    )
    .unwrap();
    app
}

#[rstest]
#[case("registry.json", Format::Json)]
#[case("registry.toml", Format::Toml)]
#[case("registry.yaml", Format::Yaml)]
#[case("registry.yml", Format::Yaml)]
fn test_save_then_load(#[case] filename: &str, #[case] format: Format) {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::new(dir.path().join(filename)).unwrap();
    assert_eq!(store.format(), format);

    store.save(&sample()).unwrap();
    assert!(store.exists());
    assert_eq!(store.load().unwrap(), sample());
}

#[test]
fn test_unknown_extension_is_rejected() {
    let err = RegistryStore::new("/tmp/registry.xml").unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { extension } if extension == "xml"));
}

#[test]
fn test_missing_file_uses_default() {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::new(dir.path().join("registry.toml")).unwrap();
    let app = store.load_or_else(|| Application::new(Uuid::nil())).unwrap();
    assert!(app.is_empty());
    assert!(!store.exists());
}

#[test]
fn test_missing_file_is_an_error_for_load() {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::new(dir.path().join("registry.json")).unwrap();
    assert!(matches!(store.load(), Err(Error::Fs(_))));
}

#[test]
fn test_corrupt_file_is_not_replaced_by_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registry.json");
    fs::write(&path, "{ \"id\": ").unwrap();
    let store = RegistryStore::new(&path).unwrap();

    let err = store
        .load_or_else(|| Application::new(Uuid::nil()))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRegistry { format: Format::Json, .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ \"id\": ");
}

#[test]
fn test_save_refuses_duplicate_ids() {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::new(dir.path().join("registry.yaml")).unwrap();
    let mut app = sample();
    // Bypass add_extension to build an inconsistent record.
    app.extensions.push(ExtensionEntry::new(
        ExtensionId::from_u128(1),
        ExtensionKind::Sealed,
        ContentDescriptor::Builtin,
    ));

    assert!(matches!(store.save(&app), Err(Error::DuplicateExtension(_))));
    assert!(!store.exists());
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::new(dir.path().join("nested/deeper/registry.toml")).unwrap();
    store.save(&sample()).unwrap();
    assert_eq!(store.load().unwrap(), sample());
}
