//! Per-extension isolation layers.
//!
//! A [`Layer`] is the symbol-visibility table of one extension: the set of
//! classes it may resolve and which extension owns each of them. An extension
//! sees its own local and exported classes, the classes exported by every
//! ancestor, and the root extension's local classes (the platform layer).
//! Siblings and descendants are never visible.

use std::collections::{BTreeMap, HashMap};

use ext_model::{ClassName, ExtensionGraph, ExtensionId, ExtensionNode};

use crate::error::{Collision, LayerError};

/// How a class became visible in a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Private to this extension.
    Local,
    /// Contributed by this extension and shared with descendants.
    Exported,
    /// Shared by an ancestor.
    Inherited { from: ExtensionId },
}

/// The isolation unit of one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    extension: ExtensionId,
    parent: Option<ExtensionId>,
    symbols: BTreeMap<ClassName, Visibility>,
    shared: BTreeMap<ClassName, ExtensionId>,
}

impl Layer {
    pub fn extension(&self) -> ExtensionId {
        self.extension
    }

    pub fn parent(&self) -> Option<ExtensionId> {
        self.parent
    }

    pub fn visibility(&self, class: &str) -> Option<Visibility> {
        self.symbols.get(class).copied()
    }

    pub fn can_see(&self, class: &str) -> bool {
        self.symbols.contains_key(class)
    }

    /// The extension whose container provides `class`, if visible.
    pub fn owner_of(&self, class: &str) -> Option<ExtensionId> {
        self.visibility(class).map(|visibility| match visibility {
            Visibility::Local | Visibility::Exported => self.extension,
            Visibility::Inherited { from } => from,
        })
    }

    /// Every visible class in name order.
    pub fn visible(&self) -> impl Iterator<Item = (&ClassName, Visibility)> {
        self.symbols.iter().map(|(class, v)| (class, *v))
    }

    /// Classes this layer passes down to its children, with their owners.
    pub fn shared(&self) -> impl Iterator<Item = (&ClassName, ExtensionId)> {
        self.shared.iter().map(|(class, owner)| (class, *owner))
    }
}

/// Layers for a whole extension graph, in load order.
#[derive(Debug, Clone, Default)]
pub struct LayerSet {
    layers: Vec<Layer>,
    index: HashMap<ExtensionId, usize>,
}

impl LayerSet {
    pub fn get(&self, id: ExtensionId) -> Option<&Layer> {
        self.index.get(&id).map(|&position| &self.layers[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Builds isolation layers from a load plan.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayerBuilder;

impl LayerBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build one layer per extension in `graph`, following its load plan.
    ///
    /// # Errors
    ///
    /// Returns every collision found across the graph: a class declared by an
    /// extension that an ancestor already shares with it.
    pub fn build(&self, graph: &ExtensionGraph) -> Result<LayerSet, LayerError> {
        let mut set = LayerSet::default();
        let mut collisions = Vec::new();

        for node in graph.plan() {
            let parent = node
                .extension()
                .parent()
                .and_then(|parent| set.get(parent));
            let layer = self.layer_for(node, parent, &mut collisions);
            set.index.insert(layer.extension, set.layers.len());
            set.layers.push(layer);
        }

        if !collisions.is_empty() {
            for collision in &collisions {
                tracing::warn!(
                    extension = %collision.extension,
                    class = %collision.class,
                    owner = %collision.owner,
                    "class visibility collision"
                );
            }
            return Err(LayerError { collisions });
        }
        tracing::debug!(layers = set.len(), "isolation layers built");
        Ok(set)
    }

    /// Build the layer of `node` on top of its parent's layer.
    fn layer_for(
        &self,
        node: &ExtensionNode,
        parent: Option<&Layer>,
        collisions: &mut Vec<Collision>,
    ) -> Layer {
        let extension = node.extension();
        let id = extension.id();

        let mut symbols: BTreeMap<ClassName, Visibility> = BTreeMap::new();
        let mut shared: BTreeMap<ClassName, ExtensionId> = BTreeMap::new();
        if let Some(parent) = parent {
            for (class, owner) in parent.shared() {
                symbols.insert(class.clone(), Visibility::Inherited { from: owner });
                shared.insert(class.clone(), owner);
            }
        }

        let own = extension
            .local_classes()
            .iter()
            .map(|class| (class, Visibility::Local))
            .chain(
                extension
                    .exported_classes()
                    .iter()
                    .map(|class| (class, Visibility::Exported)),
            );
        for (class, visibility) in own {
            if let Some(&owner) = shared.get(class) {
                collisions.push(Collision {
                    extension: id,
                    class: class.clone(),
                    owner,
                });
                continue;
            }
            symbols.insert(class.clone(), visibility);
        }

        // Root local classes form the platform layer; everyone else shares
        // only what it exports.
        let passed_down: Vec<&ClassName> = if extension.is_root() {
            extension.local_classes().iter().collect()
        } else {
            extension.exported_classes().iter().collect()
        };
        for class in passed_down {
            shared.entry(class.clone()).or_insert(id);
        }

        Layer {
            extension: id,
            parent: extension.parent(),
            symbols,
            shared,
        }
    }
}
