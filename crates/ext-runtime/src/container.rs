//! Dependency-injection containers.
//!
//! Each extension gets one [`Container`] holding the components it
//! contributes, parented to its nearest ancestor's container. A request is
//! checked against the extension's [`Layer`] first; the owning container is
//! then found by walking the parent chain.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ext_model::{ClassName, ExtensionId};

use crate::component::{ComponentDef, Instance, Lifetime, Teardown};
use crate::error::ResolveError;
use crate::layer::Layer;
use crate::scope::ScopeHandle;

/// The active session scope during one resolution.
#[derive(Clone, Copy)]
pub(crate) struct ScopeContext<'a> {
    pub handle: ScopeHandle,
    /// Creation counter shared by every scope of one manager.
    pub sequence: &'a Cell<u64>,
}

/// A session-scoped instance cached under one scope handle.
pub(crate) struct ScopedInstance {
    pub sequence: u64,
    pub class: ClassName,
    pub instance: Instance,
    pub teardown: Option<Teardown>,
}

/// Outcome of asking a container to cache instances under a new handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeClaim {
    Claimed,
    /// Nothing here is session scoped.
    NotNeeded,
    /// Another scope manager already uses the handle.
    Taken,
}

/// Components of one extension plus their instance caches.
pub struct Container {
    layer: Layer,
    parent: Option<Arc<Container>>,
    components: HashMap<ClassName, ComponentDef>,
    singletons: Mutex<HashMap<ClassName, Instance>>,
    sessions: Mutex<HashMap<ScopeHandle, Vec<ScopedInstance>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Container {
    pub(crate) fn new(
        layer: Layer,
        parent: Option<Arc<Container>>,
        components: HashMap<ClassName, ComponentDef>,
    ) -> Self {
        Self {
            layer,
            parent,
            components,
            singletons: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn extension(&self) -> ExtensionId {
        self.layer.extension()
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn parent(&self) -> Option<&Arc<Container>> {
        self.parent.as_ref()
    }

    /// Classes registered in this container, in name order.
    pub fn registered(&self) -> Vec<&ClassName> {
        let mut classes: Vec<&ClassName> = self.components.keys().collect();
        classes.sort();
        classes
    }

    pub fn component(&self, class: &str) -> Option<&ComponentDef> {
        self.components.get(class)
    }

    pub fn has_session_components(&self) -> bool {
        self.components
            .values()
            .any(|c| c.lifetime() == Lifetime::Session)
    }

    /// Resolve `class` outside any session scope.
    ///
    /// Session-scoped classes fail with [`ResolveError::NoActiveScope`]; use
    /// [`SessionScopes::resolve`](crate::SessionScopes::resolve) inside
    /// scoped work instead.
    pub fn resolve(&self, class: &str) -> Result<Instance, ResolveError> {
        self.resolve_in(class, None)
    }

    /// Resolve `class` and downcast it to `T`.
    pub fn get<T: Any + Send + Sync>(&self, class: &str) -> Result<Arc<T>, ResolveError> {
        downcast(class, self.resolve(class)?)
    }

    pub(crate) fn resolve_in(
        &self,
        class: &str,
        scope: Option<ScopeContext<'_>>,
    ) -> Result<Instance, ResolveError> {
        let path = RefCell::new(Vec::new());
        Resolver {
            container: self,
            scope,
            singleton: None,
            path: &path,
        }
        .resolve(class)
    }

    /// This container followed by its ancestors.
    fn lineage(&self) -> impl Iterator<Item = &Container> {
        std::iter::successors(Some(self), |c| c.parent.as_deref())
    }

    fn singleton(&self, class: &str) -> Option<Instance> {
        lock(&self.singletons).get(class).cloned()
    }

    fn store_singleton(&self, class: &ClassName, instance: Instance) -> Instance {
        lock(&self.singletons)
            .entry(class.clone())
            .or_insert(instance)
            .clone()
    }

    fn scoped(
        &self,
        scope: ScopeHandle,
        class: &ClassName,
    ) -> Result<Option<Instance>, ResolveError> {
        let sessions = lock(&self.sessions);
        let cache = sessions.get(&scope).ok_or_else(|| ResolveError::ScopeClosed {
            class: class.clone(),
            scope,
        })?;
        Ok(cache
            .iter()
            .find(|cached| &cached.class == class)
            .map(|cached| cached.instance.clone()))
    }

    fn store_scoped(
        &self,
        scope: ScopeContext<'_>,
        component: &ComponentDef,
        instance: Instance,
    ) -> Result<Instance, ResolveError> {
        let mut sessions = lock(&self.sessions);
        let cache = sessions
            .get_mut(&scope.handle)
            .ok_or_else(|| ResolveError::ScopeClosed {
                class: component.class().clone(),
                scope: scope.handle,
            })?;
        if let Some(existing) = cache.iter().find(|c| &c.class == component.class()) {
            return Ok(existing.instance.clone());
        }
        let sequence = scope.sequence.get();
        scope.sequence.set(sequence + 1);
        cache.push(ScopedInstance {
            sequence,
            class: component.class().clone(),
            instance: instance.clone(),
            teardown: component.teardown().cloned(),
        });
        Ok(instance)
    }

    /// Allocate an empty cache for `scope` if anything here is session
    /// scoped. A handle that already has a cache is never shared.
    pub(crate) fn claim_scope(&self, scope: ScopeHandle) -> ScopeClaim {
        if !self.has_session_components() {
            return ScopeClaim::NotNeeded;
        }
        match lock(&self.sessions).entry(scope) {
            Entry::Occupied(_) => ScopeClaim::Taken,
            Entry::Vacant(slot) => {
                slot.insert(Vec::new());
                ScopeClaim::Claimed
            }
        }
    }

    /// Drop the cache of `scope`, handing back its instances.
    pub(crate) fn evict_scope(&self, scope: ScopeHandle) -> Vec<ScopedInstance> {
        lock(&self.sessions).remove(&scope).unwrap_or_default()
    }

    /// Number of instances cached under `scope`.
    pub fn scoped_count(&self, scope: ScopeHandle) -> usize {
        lock(&self.sessions).get(&scope).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("extension", &self.extension())
            .field("parent", &self.parent.as_ref().map(|p| p.extension()))
            .field("registered", &self.registered())
            .finish()
    }
}

fn downcast<T: Any + Send + Sync>(class: &str, instance: Instance) -> Result<Arc<T>, ResolveError> {
    instance
        .downcast::<T>()
        .map_err(|_| ResolveError::TypeMismatch {
            class: class.into(),
            expected: std::any::type_name::<T>(),
        })
}

/// Resolution context handed to constructors.
///
/// Bound to the extension that owns the class being built, so a constructor
/// sees exactly what its own extension sees.
pub struct Resolver<'a> {
    container: &'a Container,
    scope: Option<ScopeContext<'a>>,
    /// The singleton being built somewhere up this resolution, if any.
    singleton: Option<&'a ClassName>,
    path: &'a RefCell<Vec<(ExtensionId, ClassName)>>,
}

impl Resolver<'_> {
    /// The extension this resolver resolves for.
    pub fn extension(&self) -> ExtensionId {
        self.container.extension()
    }

    /// The active session scope, if any.
    pub fn scope(&self) -> Option<ScopeHandle> {
        self.scope.map(|s| s.handle)
    }

    pub fn resolve(&self, class: &str) -> Result<Instance, ResolveError> {
        let layer = self.container.layer();
        let owner_id = layer
            .owner_of(class)
            .ok_or_else(|| ResolveError::NotVisible {
                class: class.into(),
                extension: layer.extension(),
            })?;
        let unregistered = || ResolveError::Unregistered {
            class: class.into(),
            owner: owner_id,
        };
        let owner = self
            .container
            .lineage()
            .find(|c| c.extension() == owner_id)
            .ok_or_else(unregistered)?;
        let component = owner.component(class).ok_or_else(unregistered)?;

        match component.lifetime() {
            Lifetime::Prototype => self.construct(owner, component),
            Lifetime::Singleton => {
                if let Some(instance) = owner.singleton(class) {
                    return Ok(instance);
                }
                let instance = self.construct(owner, component)?;
                Ok(owner.store_singleton(component.class(), instance))
            }
            Lifetime::Session => {
                if let Some(singleton) = self.singleton {
                    return Err(ResolveError::SessionInSingleton {
                        class: class.into(),
                        singleton: singleton.clone(),
                    });
                }
                let scope = self.scope.ok_or_else(|| ResolveError::NoActiveScope {
                    class: class.into(),
                })?;
                if let Some(instance) = owner.scoped(scope.handle, component.class())? {
                    return Ok(instance);
                }
                let instance = self.construct(owner, component)?;
                owner.store_scoped(scope, component, instance)
            }
        }
    }

    pub fn get<T: Any + Send + Sync>(&self, class: &str) -> Result<Arc<T>, ResolveError> {
        downcast(class, self.resolve(class)?)
    }

    fn construct(
        &self,
        owner: &Container,
        component: &ComponentDef,
    ) -> Result<Instance, ResolveError> {
        let key = (owner.extension(), component.class().clone());
        {
            let mut path = self.path.borrow_mut();
            if let Some(start) = path.iter().position(|entry| entry == &key) {
                let mut cycle: Vec<ClassName> =
                    path[start..].iter().map(|(_, class)| class.clone()).collect();
                cycle.push(key.1);
                return Err(ResolveError::CircularDependency { path: cycle });
            }
            path.push(key);
        }

        tracing::trace!(
            extension = %owner.extension(),
            class = %component.class(),
            lifetime = %component.lifetime(),
            "constructing component"
        );
        // Singletons outlive every scope, so they never see the active one.
        let (scope, singleton) = match component.lifetime() {
            Lifetime::Singleton => (None, Some(component.class())),
            Lifetime::Prototype | Lifetime::Session => (self.scope, self.singleton),
        };
        let resolver = Resolver {
            container: owner,
            scope,
            singleton,
            path: self.path,
        };
        let result = component.construct(&resolver);
        self.path.borrow_mut().pop();
        result
    }
}
