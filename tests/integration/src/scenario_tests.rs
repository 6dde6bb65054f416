//! Cross-crate scenarios: declarations through graph, layers and containers.

use ext_model::{ExtensionDescriptor, ExtensionGraph, ExtensionId, GraphError, LoadStatus};
use ext_runtime::{
    Bootstrapper, ComponentDef, DeclaredModule, ResolveError, Runtime, RuntimeConfig,
};
use pretty_assertions::assert_eq;

fn id(n: u128) -> ExtensionId {
    ExtensionId::from_u128(n)
}

struct Logger;

struct ServiceA;

struct Facade {
    greeting: String,
}

struct ServiceB {
    facade: std::sync::Arc<Facade>,
}

/// Root(0) {Logger}; Open(1) {ServiceA} exporting {Facade};
/// Sealed(2) {ServiceB} depending on Facade.
fn boot() -> Runtime {
    Bootstrapper::new(RuntimeConfig::default())
        .with_module(
            DeclaredModule::new(ExtensionDescriptor::root(ExtensionId::ROOT, ["Logger"]))
                .component(ComponentDef::singleton("Logger", |_| Ok(Logger))),
        )
        .with_module(
            DeclaredModule::new(ExtensionDescriptor::open(
                id(1),
                ExtensionId::ROOT,
                ["ServiceA"],
                ["Facade"],
            ))
            .component(ComponentDef::singleton("ServiceA", |_| Ok(ServiceA)))
            .component(ComponentDef::singleton("Facade", |r| {
                r.get::<Logger>("Logger")?;
                Ok(Facade {
                    greeting: "hello from one".to_string(),
                })
            })),
        )
        .with_module(
            DeclaredModule::new(ExtensionDescriptor::sealed(id(2), id(1), ["ServiceB"]))
                .component(ComponentDef::singleton("ServiceB", |r| {
                    Ok(ServiceB {
                        facade: r.get::<Facade>("Facade")?,
                    })
                })),
        )
        .boot()
        .unwrap()
}

#[test]
fn test_load_plan_lists_parents_first() {
    let runtime = boot();
    assert_eq!(runtime.graph().plan_ids(), vec![ExtensionId::ROOT, id(1), id(2)]);
    assert!(runtime.report().is_clean());
    for extension in [ExtensionId::ROOT, id(1), id(2)] {
        assert_eq!(runtime.status(extension), Some(LoadStatus::Active));
    }
}

#[test]
fn test_sealed_child_sees_facade_and_platform() {
    let runtime = boot();

    let service = runtime.get::<ServiceB>(id(2), "ServiceB").unwrap();
    assert_eq!(service.facade.greeting, "hello from one");

    let facade = runtime.get::<Facade>(id(2), "Facade").unwrap();
    assert!(std::sync::Arc::ptr_eq(&facade, &service.facade));
    runtime.get::<Logger>(id(2), "Logger").unwrap();

    let layer = runtime.layer(id(2)).unwrap();
    assert_eq!(layer.owner_of("Facade"), Some(id(1)));
    assert_eq!(layer.owner_of("Logger"), Some(ExtensionId::ROOT));
}

#[test]
fn test_sealed_child_cannot_reach_parent_local() {
    let runtime = boot();
    let err = runtime.resolve(id(2), "ServiceA").unwrap_err();
    assert!(matches!(err, ResolveError::NotVisible { .. }), "{err}");

    // The owner itself still can.
    runtime.get::<ServiceA>(id(1), "ServiceA").unwrap();
}

#[test]
fn test_root_cannot_reach_descendant_exports() {
    let runtime = boot();
    let err = runtime.resolve(ExtensionId::ROOT, "Facade").unwrap_err();
    assert!(matches!(err, ResolveError::NotVisible { .. }), "{err}");
}

#[test]
fn test_mutual_parents_are_a_cycle() {
    let descriptors = vec![
        ExtensionDescriptor::root(ExtensionId::ROOT, ["Logger"]),
        ExtensionDescriptor::open(id(1), id(2), ["a.L"], ["a.X"]),
        ExtensionDescriptor::open(id(2), id(1), ["b.L"], ["b.X"]),
    ];
    let err = ExtensionGraph::build(descriptors).unwrap_err();
    match err {
        GraphError::Cycle { participants } => {
            assert!(participants.contains(&id(1)));
            assert!(participants.contains(&id(2)));
        }
        other => panic!("expected a cycle, got {other}"),
    }
}
