//! Booting from a persisted registry of installed extensions.

use ext_content::ContentDescriptor;
use ext_model::{ExtensionDescriptor, ExtensionId, ExtensionKind, LoadStatus};
use ext_registry::{Application, ExtensionEntry, RegistryStore};
use ext_runtime::{
    BootError, Bootstrapper, ComponentDef, DeclaredModule, FailureCause, FailurePolicy,
    ResolveError, RuntimeConfig,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;
use uuid::Uuid;

fn id(n: u128) -> ExtensionId {
    ExtensionId::from_u128(n)
}

fn modules() -> Vec<DeclaredModule> {
    vec![
        DeclaredModule::new(ExtensionDescriptor::root(ExtensionId::ROOT, ["host.Logger"]))
            .component(ComponentDef::singleton("host.Logger", |_| Ok("logger"))),
        DeclaredModule::new(ExtensionDescriptor::open(
            id(1),
            ExtensionId::ROOT,
            ["one.Impl"],
            ["one.Api"],
        ))
        .component(ComponentDef::singleton("one.Impl", |_| Ok(1u32)))
        .component(ComponentDef::singleton("one.Api", |r| {
            Ok(*r.get::<u32>("one.Impl")? + 1)
        })),
        DeclaredModule::new(ExtensionDescriptor::sealed(id(2), id(1), ["two.Panel"]))
            .component(ComponentDef::singleton("two.Panel", |r| {
                Ok(format!("panel over {}", r.get::<u32>("one.Api")?))
            })),
        DeclaredModule::new(ExtensionDescriptor::sealed(
            id(9),
            ExtensionId::ROOT,
            ["nine.Extra"],
        ))
        .component(ComponentDef::singleton("nine.Extra", |_| Ok(9u8))),
    ]
}

fn installed() -> Application {
    let mut application = Application::new(Uuid::from_u128(0xabc));
    application
        .add_extension(
            None,
            ExtensionEntry::new(ExtensionId::ROOT, ExtensionKind::Root, ContentDescriptor::Builtin)
                .with_child(
                    ExtensionEntry::new(id(1), ExtensionKind::Open, ContentDescriptor::Builtin)
                        .with_child(ExtensionEntry::new(
                            id(2),
                            ExtensionKind::Sealed,
                            ContentDescriptor::folder("ext/two"),
                        )),
                ),
        )
        .unwrap();
    application
}

fn bootstrapper(config: RuntimeConfig) -> Bootstrapper {
    modules()
        .into_iter()
        .fold(Bootstrapper::new(config), Bootstrapper::with_module)
}

#[rstest]
#[case("registry.json")]
#[case("registry.toml")]
#[case("registry.yaml")]
fn test_boots_what_the_saved_registry_installs(#[case] file: &str) {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::new(dir.path().join(file)).unwrap();
    store.save(&installed()).unwrap();

    let application = store.load().unwrap();
    let runtime = bootstrapper(RuntimeConfig::default())
        .installed(application)
        .boot()
        .unwrap();

    assert_eq!(runtime.graph().plan_ids(), vec![ExtensionId::ROOT, id(1), id(2)]);
    assert_eq!(
        *runtime.get::<String>(id(2), "two.Panel").unwrap(),
        "panel over 2"
    );
    assert!(runtime.container(id(9)).is_none());
    assert!(matches!(
        runtime.resolve(id(9), "nine.Extra"),
        Err(ResolveError::Inactive { .. })
    ));
}

#[test]
fn test_registry_disagreeing_on_kind_is_rejected() {
    let mut application = Application::new(Uuid::from_u128(0xabc));
    application
        .add_extension(
            None,
            ExtensionEntry::new(ExtensionId::ROOT, ExtensionKind::Root, ContentDescriptor::Builtin)
                .with_child(ExtensionEntry::new(
                    id(1),
                    ExtensionKind::Sealed,
                    ContentDescriptor::Builtin,
                )),
        )
        .unwrap();

    let err = bootstrapper(RuntimeConfig::default())
        .installed(application)
        .boot()
        .err()
        .unwrap();
    assert!(matches!(err, BootError::Inconsistent { .. }), "{err}");
}

#[test]
fn test_missing_registry_falls_back_to_empty_application() {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::new(dir.path().join("absent.toml")).unwrap();
    assert!(!store.exists());

    let application = store
        .load_or_else(|| Application::new(Uuid::nil()))
        .unwrap();
    assert!(application.is_empty());
}

#[test]
fn test_disabled_subtree_is_reported() {
    let config = RuntimeConfig {
        failure_policy: FailurePolicy::DisableSubtree,
        ..RuntimeConfig::default()
    };
    let runtime = Bootstrapper::new(config)
        .with_module(
            DeclaredModule::new(ExtensionDescriptor::root(ExtensionId::ROOT, ["host.Logger"]))
                .component(ComponentDef::singleton("host.Logger", |_| Ok("logger"))),
        )
        .with_module(
            DeclaredModule::new(ExtensionDescriptor::open(
                id(1),
                ExtensionId::ROOT,
                ["one.Broken"],
                ["one.Api"],
            ))
            .component(ComponentDef::singleton("one.Broken", |_| -> Result<u8, _> {
                Err(ResolveError::construction("one.Broken", "database unreachable"))
            }))
            .component(ComponentDef::singleton("one.Api", |_| Ok(1u8))),
        )
        .with_module(
            DeclaredModule::new(ExtensionDescriptor::sealed(id(2), id(1), ["two.Panel"]))
                .component(ComponentDef::singleton("two.Panel", |_| Ok(2u8))),
        )
        .boot()
        .unwrap();

    assert!(runtime.is_active(ExtensionId::ROOT));
    assert_eq!(runtime.status(id(1)), Some(LoadStatus::Failed));
    assert_eq!(runtime.status(id(2)), Some(LoadStatus::Failed));
    assert!(matches!(
        runtime.failure(id(2)).map(|f| &f.cause),
        Some(FailureCause::AncestorFailed(origin)) if *origin == id(1)
    ));

    let report = runtime.report();
    assert!(!report.is_clean());
    assert_eq!(report.active(), 1);
    assert_eq!(report.failed().count(), 2);
}
