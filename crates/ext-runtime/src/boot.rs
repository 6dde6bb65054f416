//! Boot sequence: validate, order, isolate, wire.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use ext_model::{ExtensionGraph, ExtensionId, ExtensionKind, ExtensionNode, LoadStatus, validate_all};
use ext_registry::{Application, Mismatch, reconcile};
use serde::Serialize;

use crate::component::Instance;
use crate::config::{FailurePolicy, RuntimeConfig};
use crate::container::Container;
use crate::error::{BootError, BootFailure, FailureCause, ResolveError, error_chain};
use crate::factory::ContextFactory;
use crate::layer::{Layer, LayerBuilder, LayerSet};
use crate::module::ExtensionModule;
use crate::scope::SessionScopes;

/// Collects extension modules and boots them into a [`Runtime`].
pub struct Bootstrapper {
    config: RuntimeConfig,
    modules: Vec<Box<dyn ExtensionModule>>,
    installed: Option<Application>,
}

impl Bootstrapper {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            modules: Vec::new(),
            installed: None,
        }
    }

    pub fn with_module(mut self, module: impl ExtensionModule + 'static) -> Self {
        self.register(Box::new(module));
        self
    }

    /// Add a module; registration order decides sibling load order.
    pub fn register(&mut self, module: Box<dyn ExtensionModule>) {
        self.modules.push(module);
    }

    /// Boot only the extensions installed in `application`.
    ///
    /// The registry must agree with the modules on kind and nesting.
    pub fn installed(mut self, application: Application) -> Self {
        self.installed = Some(application);
        self
    }

    /// Run the boot sequence.
    ///
    /// Configuration problems (invalid descriptors, graph errors, visibility
    /// collisions, registry disagreement) fail before any container is built.
    /// Container failures then follow the configured [`FailurePolicy`].
    pub fn boot(self) -> Result<Runtime, BootError> {
        let Self {
            config,
            mut modules,
            installed,
        } = self;

        if let Some(application) = &installed {
            modules = select_installed(application, modules)?;
        }

        let descriptors: Vec<_> = modules.iter().map(|m| m.descriptor()).collect();
        validate_all(&descriptors)?;
        let mut graph = ExtensionGraph::build(descriptors)?;

        let layers = LayerBuilder::new().build(&graph)?;
        for id in graph.plan_ids() {
            graph.set_status(id, LoadStatus::Isolated);
        }

        let modules: HashMap<ExtensionId, Box<dyn ExtensionModule>> = modules
            .into_iter()
            .filter_map(|m| m.descriptor().id.map(|id| (id, m)))
            .collect();
        let critical = critical_extensions(&graph);
        let factory = ContextFactory::new().with_eager_singletons(config.eager_singletons);

        let mut containers: HashMap<ExtensionId, Arc<Container>> = HashMap::new();
        let mut failures = Vec::new();
        // Failed extension -> the extension whose failure disabled it.
        let mut failed: HashMap<ExtensionId, ExtensionId> = HashMap::new();

        for id in graph.plan_ids() {
            let Some(node) = graph.node(id) else { continue };
            let parent = node.extension().parent();

            if let Some(origin) = parent.and_then(|p| failed.get(&p).copied()) {
                tracing::warn!(extension = %id, ancestor = %origin, "skipping extension below failed ancestor");
                failed.insert(id, origin);
                graph.set_status(id, LoadStatus::Failed);
                failures.push(BootFailure {
                    extension: id,
                    cause: FailureCause::AncestorFailed(origin),
                });
                continue;
            }

            let outcome = match (modules.get(&id), layers.get(id)) {
                (Some(module), Some(layer)) => wire(
                    &factory,
                    module.as_ref(),
                    node,
                    layer,
                    parent.and_then(|p| containers.get(&p)),
                ),
                // Every node comes from a module and has a layer.
                _ => continue,
            };

            match outcome {
                Ok(container) => {
                    graph.set_status(id, LoadStatus::Wired);
                    containers.insert(id, container);
                }
                Err(cause) => {
                    let failure = BootFailure {
                        extension: id,
                        cause,
                    };
                    tracing::error!(
                        extension = %id,
                        error = %error_chain(&failure.cause),
                        "extension failed to load"
                    );
                    let abort = match config.failure_policy {
                        FailurePolicy::Abort => true,
                        FailurePolicy::CriticalPath => critical.contains(&id),
                        FailurePolicy::DisableSubtree => parent.is_none(),
                    };
                    if abort {
                        return Err(BootError::Aborted(failure));
                    }
                    failed.insert(id, id);
                    graph.set_status(id, LoadStatus::Failed);
                    failures.push(failure);
                }
            }
        }

        for id in containers.keys() {
            graph.set_status(*id, LoadStatus::Active);
        }
        tracing::info!(
            active = containers.len(),
            failed = failures.len(),
            "extension runtime booted"
        );

        Ok(Runtime {
            graph,
            layers,
            containers,
            failures,
            config,
            scope_handles: Arc::new(AtomicU64::new(1)),
        })
    }
}

fn wire(
    factory: &ContextFactory,
    module: &dyn ExtensionModule,
    node: &ExtensionNode,
    layer: &Layer,
    parent: Option<&Arc<Container>>,
) -> Result<Arc<Container>, FailureCause> {
    module.on_layer_ready(layer).map_err(FailureCause::Hook)?;
    Ok(factory.create_container(node, layer, module.components(), parent)?)
}

/// Keep the modules installed in `application`.
fn select_installed(
    application: &Application,
    modules: Vec<Box<dyn ExtensionModule>>,
) -> Result<Vec<Box<dyn ExtensionModule>>, BootError> {
    let descriptors: Vec<_> = modules.iter().map(|m| m.descriptor()).collect();
    let (missing, mismatches): (Vec<Mismatch>, Vec<Mismatch>) =
        reconcile(application, &descriptors)
            .into_iter()
            .partition(|m| matches!(m, Mismatch::NotDeclared(_)));
    for mismatch in &missing {
        tracing::warn!(%mismatch, "installed extension has no module");
    }
    if !mismatches.is_empty() {
        return Err(BootError::Inconsistent { mismatches });
    }

    Ok(modules
        .into_iter()
        .zip(descriptors)
        .filter(|(_, descriptor)| match descriptor.id {
            Some(id) => {
                let keep = application.contains(id);
                if !keep {
                    tracing::debug!(extension = %id, "module not installed, skipping");
                }
                keep
            }
            // Left for the validator to report.
            None => true,
        })
        .map(|(module, _)| module)
        .collect())
}

/// The root, every required extension and every ancestor of one.
fn critical_extensions(graph: &ExtensionGraph) -> HashSet<ExtensionId> {
    let mut critical = HashSet::new();
    critical.insert(graph.root().id());
    for node in graph.plan() {
        if node.extension().is_required() {
            critical.insert(node.id());
            critical.extend(graph.ancestors(node.id()));
        }
    }
    critical
}

/// A booted extension tree.
pub struct Runtime {
    graph: ExtensionGraph,
    layers: LayerSet,
    containers: HashMap<ExtensionId, Arc<Container>>,
    failures: Vec<BootFailure>,
    config: RuntimeConfig,
    /// Every scope manager of this runtime draws handles from here.
    scope_handles: Arc<AtomicU64>,
}

impl Runtime {
    pub fn graph(&self) -> &ExtensionGraph {
        &self.graph
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn layer(&self, id: ExtensionId) -> Option<&Layer> {
        self.layers.get(id)
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    /// The container of an active extension.
    pub fn container(&self, id: ExtensionId) -> Option<&Arc<Container>> {
        self.containers.get(&id)
    }

    pub fn status(&self, id: ExtensionId) -> Option<LoadStatus> {
        self.graph.status(id)
    }

    pub fn is_active(&self, id: ExtensionId) -> bool {
        self.status(id) == Some(LoadStatus::Active)
    }

    pub fn failures(&self) -> &[BootFailure] {
        &self.failures
    }

    pub fn failure(&self, id: ExtensionId) -> Option<&BootFailure> {
        self.failures.iter().find(|f| f.extension == id)
    }

    /// Resolve `class` as seen from extension `id`, outside any scope.
    pub fn resolve(&self, id: ExtensionId, class: &str) -> Result<Instance, ResolveError> {
        self.containers
            .get(&id)
            .ok_or(ResolveError::Inactive { extension: id })?
            .resolve(class)
    }

    pub fn get<T: std::any::Any + Send + Sync>(
        &self,
        id: ExtensionId,
        class: &str,
    ) -> Result<Arc<T>, ResolveError> {
        self.containers
            .get(&id)
            .ok_or(ResolveError::Inactive { extension: id })?
            .get(class)
    }

    /// A scope manager over every active container, bound to the calling
    /// thread.
    ///
    /// Managers from one runtime never hand out the same handle, so their
    /// scopes stay isolated even though they share containers.
    pub fn session_scopes(&self) -> SessionScopes {
        SessionScopes::with_handles(
            self.graph
                .plan_ids()
                .into_iter()
                .filter_map(|id| self.containers.get(&id).cloned()),
            self.scope_handles.clone(),
        )
    }

    /// Final status of every extension, in load order.
    pub fn report(&self) -> BootReport {
        let extensions = self
            .graph
            .plan()
            .map(|node| ReportEntry {
                id: node.id(),
                kind: node.extension().kind(),
                parent: node.extension().parent(),
                depth: node.depth(),
                status: node.status(),
                failure: self.failure(node.id()).map(|f| error_chain(&f.cause)),
            })
            .collect();
        BootReport { extensions }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("plan", &self.graph.plan_ids())
            .field("active", &self.containers.len())
            .field("failures", &self.failures.len())
            .finish()
    }
}

/// Outcome of a boot, one entry per extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootReport {
    pub extensions: Vec<ReportEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub id: ExtensionId,
    pub kind: ExtensionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ExtensionId>,
    pub depth: usize,
    pub status: LoadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl BootReport {
    pub fn active(&self) -> usize {
        self.extensions
            .iter()
            .filter(|e| e.status == LoadStatus::Active)
            .count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReportEntry> {
        self.extensions
            .iter()
            .filter(|e| e.status == LoadStatus::Failed)
    }

    pub fn is_clean(&self) -> bool {
        self.failed().next().is_none()
    }
}

impl fmt::Display for BootReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.extensions {
            write!(
                f,
                "{:indent$}{} [{}] {}",
                "",
                entry.id,
                entry.kind,
                entry.status,
                indent = entry.depth * 2
            )?;
            if let Some(failure) = &entry.failure {
                write!(f, ": {failure}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
