//! Extension tree construction and load ordering.
//!
//! The graph is built from a flat descriptor set. Every non-root extension
//! names its parent, so the graph is a tree rooted at the single root
//! extension. The load plan is a pre-order walk: a parent always precedes its
//! children, and siblings keep their registration order.
//!
//! # Example
//!
//! ```
//! use ext_model::{ExtensionDescriptor, ExtensionGraph, ExtensionId};
//!
//! let root = ExtensionId::ROOT;
//! let ui = ExtensionId::from_u128(1);
//! let graph = ExtensionGraph::build(vec![
//!     ExtensionDescriptor::sealed(ui, root, ["org.example.Panel"]),
//!     ExtensionDescriptor::root(root, ["org.example.Logger"]),
//! ])
//! .unwrap();
//!
//! assert_eq!(graph.plan_ids(), vec![root, ui]);
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::descriptor::{Extension, ExtensionDescriptor, ExtensionKind};
use crate::error::GraphError;
use crate::id::ExtensionId;
use crate::validator;

/// Load progress of one extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Pending,
    Validated,
    Isolated,
    Wired,
    Active,
    Failed,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Isolated => "isolated",
            Self::Wired => "wired",
            Self::Active => "active",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An extension placed in the tree.
///
/// The node carries structure and load status only. The container built for
/// it lives in the runtime that booted the graph and is looked up by the
/// node's id (`ext_runtime::Runtime::container`).
#[derive(Debug, Clone)]
pub struct ExtensionNode {
    extension: Extension,
    children: Vec<ExtensionId>,
    depth: usize,
    status: LoadStatus,
}

impl ExtensionNode {
    pub fn extension(&self) -> &Extension {
        &self.extension
    }

    pub fn id(&self) -> ExtensionId {
        self.extension.id()
    }

    /// Direct children in registration order.
    pub fn children(&self) -> &[ExtensionId] {
        &self.children
    }

    /// Distance from the root (the root has depth 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }
}

/// Validated, ordered extension tree.
#[derive(Debug, Clone)]
pub struct ExtensionGraph {
    nodes: Vec<ExtensionNode>,
    index: HashMap<ExtensionId, usize>,
    plan: Vec<usize>,
}

impl ExtensionGraph {
    /// Validate `descriptors` and order them into a load plan.
    ///
    /// # Errors
    ///
    /// Fails on any descriptor violation, a missing or duplicated root,
    /// duplicate ids, unresolved parents, children of sealed extensions, or a
    /// cycle in the parent chain.
    pub fn build(
        descriptors: impl IntoIterator<Item = ExtensionDescriptor>,
    ) -> Result<Self, GraphError> {
        let descriptors: Vec<ExtensionDescriptor> = descriptors.into_iter().collect();
        validator::validate_all(&descriptors)?;

        let extensions = descriptors
            .into_iter()
            .map(Extension::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|report| validator_error(vec![report]))?;

        let mut index = HashMap::with_capacity(extensions.len());
        let mut duplicates = Vec::new();
        for (position, extension) in extensions.iter().enumerate() {
            if index.insert(extension.id(), position).is_some() {
                duplicates.push(extension.id());
            }
        }
        if !duplicates.is_empty() {
            duplicates.sort();
            duplicates.dedup();
            return Err(GraphError::DuplicateIds { ids: duplicates });
        }

        let missing: Vec<(ExtensionId, ExtensionId)> = extensions
            .iter()
            .filter_map(|e| e.parent().map(|parent| (e.id(), parent)))
            .filter(|(_, parent)| !index.contains_key(parent))
            .collect();
        if !missing.is_empty() {
            return Err(GraphError::UnresolvedParents { missing });
        }

        check_acyclic(&extensions, &index)?;

        let roots: Vec<ExtensionId> = extensions
            .iter()
            .filter(|e| e.is_root())
            .map(Extension::id)
            .collect();
        let root = match roots.as_slice() {
            [] => return Err(GraphError::NoRoot),
            [root] => *root,
            _ => return Err(GraphError::MultipleRoots { ids: roots }),
        };

        check_extensible(&extensions, &index)?;

        let mut nodes: Vec<ExtensionNode> = extensions
            .into_iter()
            .map(|extension| ExtensionNode {
                extension,
                children: Vec::new(),
                depth: 0,
                status: LoadStatus::Validated,
            })
            .collect();
        for position in 0..nodes.len() {
            if let Some(parent) = nodes[position].extension.parent() {
                let child = nodes[position].id();
                nodes[index[&parent]].children.push(child);
            }
        }

        let mut plan = Vec::with_capacity(nodes.len());
        let mut stack = vec![(index[&root], 0usize)];
        while let Some((position, depth)) = stack.pop() {
            nodes[position].depth = depth;
            plan.push(position);
            for child in nodes[position].children.iter().rev() {
                stack.push((index[child], depth + 1));
            }
        }

        tracing::debug!(extensions = plan.len(), %root, "extension graph built");
        Ok(Self { nodes, index, plan })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &ExtensionNode {
        &self.nodes[self.plan[0]]
    }

    pub fn node(&self, id: ExtensionId) -> Option<&ExtensionNode> {
        self.index.get(&id).map(|&position| &self.nodes[position])
    }

    pub fn contains(&self, id: ExtensionId) -> bool {
        self.index.contains_key(&id)
    }

    /// Nodes in load order: parents before children, each exactly once.
    pub fn plan(&self) -> impl Iterator<Item = &ExtensionNode> {
        self.plan.iter().map(|&position| &self.nodes[position])
    }

    pub fn plan_ids(&self) -> Vec<ExtensionId> {
        self.plan().map(ExtensionNode::id).collect()
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: ExtensionId) -> Vec<ExtensionId> {
        let mut chain = Vec::new();
        let mut current = self.node(id).and_then(|n| n.extension.parent());
        while let Some(parent) = current {
            chain.push(parent);
            current = self.node(parent).and_then(|n| n.extension.parent());
        }
        chain
    }

    /// Every node below `id`, in load order, excluding `id` itself.
    pub fn descendants(&self, id: ExtensionId) -> Vec<ExtensionId> {
        let mut result = Vec::new();
        let Some(node) = self.node(id) else {
            return result;
        };
        let mut stack: Vec<ExtensionId> = node.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(child) = self.node(current) {
                stack.extend(child.children.iter().rev().copied());
            }
        }
        result
    }

    pub fn status(&self, id: ExtensionId) -> Option<LoadStatus> {
        self.node(id).map(ExtensionNode::status)
    }

    /// Record load progress for `id`. Unknown ids are ignored.
    pub fn set_status(&mut self, id: ExtensionId, status: LoadStatus) {
        if let Some(&position) = self.index.get(&id) {
            self.nodes[position].status = status;
        }
    }
}

fn validator_error(reports: Vec<validator::ValidationReport>) -> GraphError {
    GraphError::Invalid(crate::error::ValidationError { reports })
}

/// Every ancestor chain must reach a root within `len` hops; anything
/// longer revisits a node. Runs before the root count so a loop with no
/// root at all is still reported as a cycle.
fn check_acyclic(
    extensions: &[Extension],
    index: &HashMap<ExtensionId, usize>,
) -> Result<(), GraphError> {
    let limit = extensions.len();
    let mut participants = Vec::new();

    for extension in extensions {
        let mut current = extension;
        let mut hops = 0;
        while !current.is_root() && hops <= limit {
            current = &extensions[index[&current.parent_id()]];
            hops += 1;
        }
        if !current.is_root() {
            participants.push(extension.id());
        }
    }

    if participants.is_empty() {
        Ok(())
    } else {
        participants.sort();
        Err(GraphError::Cycle { participants })
    }
}

fn check_extensible(
    extensions: &[Extension],
    index: &HashMap<ExtensionId, usize>,
) -> Result<(), GraphError> {
    let mut offenders: Vec<(ExtensionId, Vec<ExtensionId>)> = Vec::new();
    let mut seen = HashSet::new();

    for extension in extensions {
        let Some(parent) = extension.parent() else {
            continue;
        };
        if extensions[index[&parent]].kind() != ExtensionKind::Sealed {
            continue;
        }
        if seen.insert(parent) {
            offenders.push((parent, Vec::new()));
        }
        if let Some((_, children)) = offenders.iter_mut().find(|(p, _)| *p == parent) {
            children.push(extension.id());
        }
    }

    match offenders.into_iter().next() {
        Some((parent, children)) => Err(GraphError::SealedParent { parent, children }),
        None => Ok(()),
    }
}
