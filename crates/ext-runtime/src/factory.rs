//! Container construction.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use ext_model::{ClassName, ExtensionNode};

use crate::component::{ComponentDef, Lifetime};
use crate::container::Container;
use crate::error::ContainerError;
use crate::layer::Layer;

/// Builds one container per extension.
#[derive(Debug, Clone, Copy)]
pub struct ContextFactory {
    eager_singletons: bool,
}

impl Default for ContextFactory {
    fn default() -> Self {
        Self {
            eager_singletons: true,
        }
    }
}

impl ContextFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every singleton while the container is built, so
    /// constructor failures surface at boot rather than on first use.
    pub fn with_eager_singletons(mut self, eager: bool) -> Self {
        self.eager_singletons = eager;
        self
    }

    /// Create the container of `node`, chained to `parent`.
    ///
    /// Registers exactly the classes the extension contributes: every
    /// component must name a declared class and every declared class needs
    /// a component.
    pub fn create_container(
        &self,
        node: &ExtensionNode,
        layer: &Layer,
        components: Vec<ComponentDef>,
        parent: Option<&Arc<Container>>,
    ) -> Result<Arc<Container>, ContainerError> {
        let extension = node.extension();
        let id = extension.id();

        let expected = extension.parent();
        let actual = parent.map(|p| p.extension());
        if expected != actual {
            return Err(ContainerError::ParentMismatch {
                extension: id,
                expected,
                actual,
            });
        }

        let declared: BTreeSet<&ClassName> = extension.contributed_classes().collect();
        let mut registered: HashMap<ClassName, ComponentDef> =
            HashMap::with_capacity(components.len());
        for component in components {
            let class = component.class().clone();
            if !declared.contains(&class) {
                return Err(ContainerError::Undeclared {
                    extension: id,
                    class,
                });
            }
            if registered.contains_key(&class) {
                return Err(ContainerError::DuplicateComponent {
                    extension: id,
                    class,
                });
            }
            registered.insert(class, component);
        }

        let missing: Vec<ClassName> = declared
            .into_iter()
            .filter(|class| !registered.contains_key(*class))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ContainerError::MissingComponents {
                extension: id,
                classes: missing,
            });
        }

        let container = Arc::new(Container::new(layer.clone(), parent.cloned(), registered));

        if self.eager_singletons {
            let singletons: Vec<&ClassName> = container
                .registered()
                .into_iter()
                .filter(|class| {
                    container
                        .component(class.as_str())
                        .is_some_and(|c| c.lifetime() == Lifetime::Singleton)
                })
                .collect();
            for class in singletons {
                container
                    .resolve(class.as_str())
                    .map_err(|source| ContainerError::Instantiation {
                        class: class.clone(),
                        source,
                    })?;
            }
        }

        tracing::debug!(
            extension = %id,
            components = container.registered().len(),
            "container created"
        );
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::layer::LayerBuilder;
    use ext_model::{ExtensionDescriptor, ExtensionGraph, ExtensionId};

    fn graph() -> ExtensionGraph {
        ExtensionGraph::build(vec![
            ExtensionDescriptor::root(ExtensionId::ROOT, ["a.Logger"]),
            ExtensionDescriptor::open(
                ExtensionId::from_u128(1),
                ExtensionId::ROOT,
                ["a.ServiceA"],
                ["a.Facade"],
            ),
        ])
        .unwrap()
    }

    fn root_container(factory: ContextFactory, graph: &ExtensionGraph) -> Arc<Container> {
        let layers = LayerBuilder::new().build(graph).unwrap();
        factory
            .create_container(
                graph.root(),
                layers.get(ExtensionId::ROOT).unwrap(),
                vec![ComponentDef::singleton("a.Logger", |_| Ok(()))],
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_registers_declared_classes() {
        let graph = graph();
        let layers = LayerBuilder::new().build(&graph).unwrap();
        let root = root_container(ContextFactory::new(), &graph);
        let child_node = graph.node(ExtensionId::from_u128(1)).unwrap();
        let child = ContextFactory::new()
            .create_container(
                child_node,
                layers.get(child_node.id()).unwrap(),
                vec![
                    ComponentDef::singleton("a.ServiceA", |_| Ok(1u8)),
                    ComponentDef::prototype("a.Facade", |_| Ok(2u8)),
                ],
                Some(&root),
            )
            .unwrap();
        let names: Vec<&str> = child.registered().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["a.Facade", "a.ServiceA"]);
        assert_eq!(child.parent().unwrap().extension(), ExtensionId::ROOT);
    }

    #[test]
    fn test_undeclared_component_is_rejected() {
        let graph = graph();
        let layers = LayerBuilder::new().build(&graph).unwrap();
        let err = ContextFactory::new()
            .create_container(
                graph.root(),
                layers.get(ExtensionId::ROOT).unwrap(),
                vec![
                    ComponentDef::singleton("a.Logger", |_| Ok(())),
                    ComponentDef::singleton("a.Sneaky", |_| Ok(())),
                ],
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ContainerError::Undeclared { class, .. } if class.as_str() == "a.Sneaky"));
    }

    #[test]
    fn test_missing_component_is_rejected() {
        let graph = graph();
        let layers = LayerBuilder::new().build(&graph).unwrap();
        let err = ContextFactory::new()
            .create_container(
                graph.root(),
                layers.get(ExtensionId::ROOT).unwrap(),
                vec![],
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ContainerError::MissingComponents { classes, .. } if classes.len() == 1));
    }

    #[test]
    fn test_child_needs_its_parent_container() {
        let graph = graph();
        let layers = LayerBuilder::new().build(&graph).unwrap();
        let child_node = graph.node(ExtensionId::from_u128(1)).unwrap();
        let err = ContextFactory::new()
            .create_container(child_node, layers.get(child_node.id()).unwrap(), vec![], None)
            .unwrap_err();
        assert!(matches!(err, ContainerError::ParentMismatch { actual: None, .. }));
    }

    #[test]
    fn test_eager_singleton_failure_is_reported() {
        let graph = graph();
        let layers = LayerBuilder::new().build(&graph).unwrap();
        let failing = || {
            vec![ComponentDef::singleton("a.Logger", |_| -> Result<(), ResolveError> {
                Err(ResolveError::construction("a.Logger", "disk full"))
            })]
        };
        let layer = layers.get(ExtensionId::ROOT).unwrap();

        let err = ContextFactory::new()
            .create_container(graph.root(), layer, failing(), None)
            .unwrap_err();
        assert!(matches!(err, ContainerError::Instantiation { .. }));

        let lazy = ContextFactory::new()
            .with_eager_singletons(false)
            .create_container(graph.root(), layer, failing(), None);
        assert!(lazy.is_ok());
    }
}
