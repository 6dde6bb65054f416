//! Session scopes.
//!
//! A session scope is an opaque handle standing for one open document. Work
//! that needs session-scoped components runs inside
//! [`SessionScopes::run_scoped`], which makes the handle current for the
//! duration of the call. Scopes are activated by an explicit stack owned by
//! one [`SessionScopes`] value and bound to the thread that created it.
//!
//! ```
//! use ext_model::{ExtensionDescriptor, ExtensionId};
//! use ext_runtime::{Bootstrapper, ComponentDef, DeclaredModule, RuntimeConfig};
//! use std::sync::Mutex;
//!
//! let runtime = Bootstrapper::new(RuntimeConfig::default())
//!     .with_module(
//!         DeclaredModule::new(ExtensionDescriptor::root(ExtensionId::ROOT, ["doc.Selection"]))
//!             .component(ComponentDef::session("doc.Selection", |_| Ok(Mutex::new(Vec::<u32>::new())))),
//!     )
//!     .boot()
//!     .unwrap();
//! let root = runtime.container(ExtensionId::ROOT).unwrap();
//! let scopes = runtime.session_scopes();
//!
//! let document = scopes.open().unwrap();
//! scopes
//!     .run_scoped(document, || {
//!         let selection = scopes.get::<Mutex<Vec<u32>>>(root, "doc.Selection").unwrap();
//!         selection.lock().unwrap().push(3);
//!     })
//!     .unwrap();
//! scopes.close(document).unwrap();
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use crate::component::Instance;
use crate::container::{Container, ScopeClaim, ScopeContext, ScopedInstance};
use crate::error::{ResolveError, ScopeError};

/// Opaque token identifying one session scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeHandle(u64);

impl fmt::Display for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Lifecycle of a scope handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Opened,
    /// Current: innermost on the activation stack.
    Active,
    Closed,
}

#[derive(Debug, Default)]
struct ScopeEntry {
    closed: bool,
    /// Number of `run_scoped` frames for this handle on the stack.
    in_use: usize,
}

/// Opens, activates and closes session scopes across a set of containers.
pub struct SessionScopes {
    owner: ThreadId,
    containers: Vec<Arc<Container>>,
    scopes: RefCell<HashMap<ScopeHandle, ScopeEntry>>,
    stack: RefCell<Vec<ScopeHandle>>,
    /// Handle counter, shared with every manager over the same runtime.
    handles: Arc<AtomicU64>,
    sequence: Cell<u64>,
}

impl SessionScopes {
    /// Manage scopes over `containers`, bound to the calling thread.
    ///
    /// Prefer [`Runtime::session_scopes`](crate::Runtime::session_scopes),
    /// which hands out handles from one counter per runtime.
    pub fn new(containers: impl IntoIterator<Item = Arc<Container>>) -> Self {
        Self::with_handles(containers, Arc::new(AtomicU64::new(1)))
    }

    pub(crate) fn with_handles(
        containers: impl IntoIterator<Item = Arc<Container>>,
        handles: Arc<AtomicU64>,
    ) -> Self {
        Self {
            owner: thread::current().id(),
            containers: containers.into_iter().collect(),
            scopes: RefCell::new(HashMap::new()),
            stack: RefCell::new(Vec::new()),
            handles,
            sequence: Cell::new(0),
        }
    }

    fn check_thread(&self) -> Result<(), ScopeError> {
        if thread::current().id() == self.owner {
            Ok(())
        } else {
            Err(ScopeError::WrongThread)
        }
    }

    /// Open a fresh scope with empty caches in every container that has
    /// session-scoped components.
    pub fn open(&self) -> Result<ScopeHandle, ScopeError> {
        self.check_thread()?;
        loop {
            let handle = ScopeHandle(self.handles.fetch_add(1, Ordering::Relaxed));
            let mut claimed: Vec<&Arc<Container>> = Vec::new();
            let mut taken = false;
            for container in &self.containers {
                match container.claim_scope(handle) {
                    ScopeClaim::Claimed => claimed.push(container),
                    ScopeClaim::NotNeeded => {}
                    ScopeClaim::Taken => {
                        taken = true;
                        break;
                    }
                }
            }
            if taken {
                // Another manager over these containers owns the handle.
                for container in claimed {
                    container.evict_scope(handle);
                }
                tracing::trace!(scope = %handle, "scope handle in use elsewhere, skipping");
                continue;
            }

            self.scopes.borrow_mut().insert(handle, ScopeEntry::default());
            tracing::debug!(scope = %handle, caches = claimed.len(), "session scope opened");
            return Ok(handle);
        }
    }

    /// Run `work` with `handle` as the current scope.
    ///
    /// The handle is popped again on every exit from `work`, unwinding
    /// included. Calls nest; the innermost handle is current.
    pub fn run_scoped<R>(
        &self,
        handle: ScopeHandle,
        work: impl FnOnce() -> R,
    ) -> Result<R, ScopeError> {
        self.check_thread()?;
        {
            let mut scopes = self.scopes.borrow_mut();
            let entry = scopes
                .get_mut(&handle)
                .ok_or(ScopeError::UnknownScope(handle))?;
            if entry.closed {
                return Err(ScopeError::ScopeClosed(handle));
            }
            entry.in_use += 1;
        }
        self.stack.borrow_mut().push(handle);

        let _activation = Activation {
            scopes: self,
            handle,
        };
        Ok(work())
    }

    /// Close `handle`, evicting every instance cached under it and running
    /// teardown hooks in reverse creation order.
    ///
    /// Returns the number of evicted instances. Fails while a `run_scoped`
    /// call for the handle is still on the stack. A panicking teardown hook
    /// does not stop the others; the scope is closed either way and the
    /// offending classes are reported as [`ScopeError::TeardownPanicked`].
    pub fn close(&self, handle: ScopeHandle) -> Result<usize, ScopeError> {
        self.check_thread()?;
        {
            let mut scopes = self.scopes.borrow_mut();
            let entry = scopes
                .get_mut(&handle)
                .ok_or(ScopeError::UnknownScope(handle))?;
            if entry.closed {
                return Err(ScopeError::ScopeClosed(handle));
            }
            if entry.in_use > 0 {
                return Err(ScopeError::ScopeInUse(handle));
            }
            entry.closed = true;
        }

        let mut evicted: Vec<ScopedInstance> = self
            .containers
            .iter()
            .flat_map(|c| c.evict_scope(handle))
            .collect();
        evicted.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        let count = evicted.len();
        let mut panicked = Vec::new();
        for scoped in evicted {
            let Some(teardown) = &scoped.teardown else {
                continue;
            };
            tracing::trace!(scope = %handle, class = %scoped.class, "tearing down");
            if panic::catch_unwind(AssertUnwindSafe(|| teardown(&scoped.instance))).is_err() {
                tracing::error!(scope = %handle, class = %scoped.class, "teardown hook panicked");
                panicked.push(scoped.class);
            }
        }
        tracing::debug!(scope = %handle, evicted = count, "session scope closed");
        if panicked.is_empty() {
            Ok(count)
        } else {
            Err(ScopeError::TeardownPanicked {
                scope: handle,
                classes: panicked,
            })
        }
    }

    /// The innermost active scope.
    pub fn current(&self) -> Result<ScopeHandle, ScopeError> {
        self.check_thread()?;
        self.stack
            .borrow()
            .last()
            .copied()
            .ok_or(ScopeError::NoActiveScope)
    }

    pub fn state(&self, handle: ScopeHandle) -> Option<ScopeState> {
        let scopes = self.scopes.borrow();
        let entry = scopes.get(&handle)?;
        Some(if entry.closed {
            ScopeState::Closed
        } else if self.stack.borrow().last() == Some(&handle) {
            ScopeState::Active
        } else {
            ScopeState::Opened
        })
    }

    /// Handles opened and not yet closed.
    pub fn open_scopes(&self) -> Vec<ScopeHandle> {
        let mut handles: Vec<ScopeHandle> = self
            .scopes
            .borrow()
            .iter()
            .filter(|(_, entry)| !entry.closed)
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort();
        handles
    }

    /// Resolve `class` from `container` under the current scope.
    ///
    /// Outside `run_scoped`, session-scoped classes fail with
    /// [`ResolveError::NoActiveScope`].
    pub fn resolve(&self, container: &Container, class: &str) -> Result<Instance, ResolveError> {
        self.check_thread()?;
        let current = self.stack.borrow().last().copied();
        let scope = current.map(|handle| ScopeContext {
            handle,
            sequence: &self.sequence,
        });
        container.resolve_in(class, scope)
    }

    pub fn get<T: Any + Send + Sync>(
        &self,
        container: &Container,
        class: &str,
    ) -> Result<Arc<T>, ResolveError> {
        self.resolve(container, class)?
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                class: class.into(),
                expected: std::any::type_name::<T>(),
            })
    }
}

impl fmt::Debug for SessionScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionScopes")
            .field("containers", &self.containers.len())
            .field("open", &self.open_scopes())
            .field("stack", &self.stack.borrow())
            .finish()
    }
}

/// Pops one activation when dropped.
struct Activation<'a> {
    scopes: &'a SessionScopes,
    handle: ScopeHandle,
}

impl Drop for Activation<'_> {
    fn drop(&mut self) {
        let mut stack = self.scopes.stack.borrow_mut();
        if let Some(position) = stack.iter().rposition(|h| *h == self.handle) {
            stack.remove(position);
        }
        if let Some(entry) = self.scopes.scopes.borrow_mut().get_mut(&self.handle) {
            entry.in_use = entry.in_use.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes() -> SessionScopes {
        SessionScopes::new(Vec::new())
    }

    #[test]
    fn test_current_follows_nesting() {
        let scopes = scopes();
        let outer = scopes.open().unwrap();
        let inner = scopes.open().unwrap();
        assert_eq!(scopes.current(), Err(ScopeError::NoActiveScope));

        scopes
            .run_scoped(outer, || {
                assert_eq!(scopes.current(), Ok(outer));
                scopes
                    .run_scoped(inner, || {
                        assert_eq!(scopes.current(), Ok(inner));
                        assert_eq!(scopes.state(outer), Some(ScopeState::Opened));
                        assert_eq!(scopes.state(inner), Some(ScopeState::Active));
                    })
                    .unwrap();
                assert_eq!(scopes.current(), Ok(outer));
            })
            .unwrap();
        assert_eq!(scopes.current(), Err(ScopeError::NoActiveScope));
    }

    #[test]
    fn test_reentrant_activation() {
        let scopes = scopes();
        let handle = scopes.open().unwrap();
        let current = scopes
            .run_scoped(handle, || scopes.run_scoped(handle, || scopes.current()))
            .unwrap()
            .unwrap();
        assert_eq!(current, Ok(handle));
        assert_eq!(scopes.close(handle), Ok(0));
    }

    #[test]
    fn test_close_in_use_is_refused() {
        let scopes = scopes();
        let handle = scopes.open().unwrap();
        let result = scopes.run_scoped(handle, || scopes.close(handle)).unwrap();
        assert_eq!(result, Err(ScopeError::ScopeInUse(handle)));
        assert_eq!(scopes.state(handle), Some(ScopeState::Opened));
        assert!(scopes.close(handle).is_ok());
    }

    #[test]
    fn test_closed_scope_cannot_run_or_close_again() {
        let scopes = scopes();
        let handle = scopes.open().unwrap();
        scopes.close(handle).unwrap();
        assert_eq!(scopes.state(handle), Some(ScopeState::Closed));
        assert_eq!(
            scopes.run_scoped(handle, || ()),
            Err(ScopeError::ScopeClosed(handle))
        );
        assert_eq!(scopes.close(handle), Err(ScopeError::ScopeClosed(handle)));
        assert!(scopes.open_scopes().is_empty());
    }

    #[test]
    fn test_foreign_handle_is_unknown() {
        let mine = scopes();
        let theirs = scopes();
        theirs.open().unwrap();
        let foreign = theirs.open().unwrap();
        assert_eq!(
            mine.run_scoped(foreign, || ()),
            Err(ScopeError::UnknownScope(foreign))
        );
    }

    #[test]
    fn test_panicking_work_still_deactivates() {
        let scopes = scopes();
        let handle = scopes.open().unwrap();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: () = scopes.run_scoped(handle, || panic!("work failed")).unwrap();
        }));
        assert!(outcome.is_err());
        assert_eq!(scopes.current(), Err(ScopeError::NoActiveScope));
        assert_eq!(scopes.close(handle), Ok(0));
    }

    #[test]
    fn test_other_thread_is_rejected() {
        let scopes = scopes();
        let result = std::thread::spawn(move || scopes.open()).join().unwrap();
        assert_eq!(result, Err(ScopeError::WrongThread));
    }
}
