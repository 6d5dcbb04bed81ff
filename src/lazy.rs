//! Lazy subtree loading.
//!
//! A `.**` boundary carries a provider that fetches the real subtree. The
//! [`LazyLoader`] makes sure the provider runs at most once per boundary at a
//! time: every navigation that needs the boundary while a load is running
//! awaits the same shared future. When the load succeeds the boundary is
//! replaced by the fetched states; when it fails the boundary stays so a
//! later navigation can retry.

use crate::error::RegistryError;
use crate::registry::StateRegistry;
use crate::state::StateNode;
use crate::{debug_log, error_log, info_log};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Error type a provider may fail with.
pub type LazyLoadError = Box<dyn std::error::Error + Send + Sync>;

/// Output of a subtree provider.
pub type LazyLoadResult = Result<Vec<StateNode>, LazyLoadError>;

/// Deferred subtree provider attached to a `.**` state.
pub type LazyLoadFn = Arc<dyn Fn() -> BoxFuture<'static, LazyLoadResult> + Send + Sync>;

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Vec<StateNode>>, RegistryError>>>;

/// Coalesces concurrent loads of the same boundary.
#[derive(Default)]
pub struct LazyLoader {
    in_flight: Mutex<HashMap<String, SharedLoad>>,
    provider_calls: AtomicUsize,
}

impl LazyLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a provider has been invoked.
    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    /// Number of loads currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Load the subtree behind `boundary` into `registry`.
    ///
    /// Returns `Ok(())` without doing anything when the boundary is no
    /// longer registered, i.e. another caller already finished the load.
    pub async fn load(
        &self,
        registry: &RwLock<StateRegistry>,
        boundary: &str,
    ) -> Result<(), RegistryError> {
        let shared = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(boundary) {
                Some(shared) => {
                    debug_log!("Joining in-flight load of '{}'", boundary);
                    shared.clone()
                }
                None => {
                    let provider = {
                        let registry = registry.read();
                        match registry.get(boundary).and_then(StateNode::lazy_loader) {
                            Some(provider) => Arc::clone(provider),
                            None => return Ok(()),
                        }
                    };

                    info_log!("Loading lazy subtree '{}'", boundary);
                    self.provider_calls.fetch_add(1, Ordering::Relaxed);
                    let name = boundary.to_string();
                    let shared = provider()
                        .map(move |result| {
                            result.map(Arc::new).map_err(|err| {
                                RegistryError::LazyLoadFailure {
                                    boundary: name,
                                    message: err.to_string(),
                                }
                            })
                        })
                        .boxed()
                        .shared();
                    in_flight.insert(boundary.to_string(), shared.clone());
                    shared
                }
            }
        };

        let outcome = shared.clone().await;

        let registered = match outcome {
            Ok(nodes) => {
                let mut registry = registry.write();
                if registry.contains(boundary) {
                    registry
                        .register_subtree(boundary, nodes.as_ref().clone())
                        .map(|added| {
                            info_log!("Loaded {} states for '{}'", added, boundary);
                        })
                } else {
                    Ok(())
                }
            }
            Err(err) => {
                error_log!("{}", err);
                Err(err)
            }
        };

        // Registration above happens under the write lock, so removing the
        // entry afterwards never lets a new caller see a stale boundary.
        {
            let mut in_flight = self.in_flight.lock();
            if in_flight
                .get(boundary)
                .is_some_and(|current| Shared::ptr_eq(current, &shared))
            {
                in_flight.remove(boundary);
            }
        }

        registered
    }
}

impl std::fmt::Debug for LazyLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyLoader")
            .field("in_flight", &self.in_flight())
            .field("provider_calls", &self.provider_calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(boundary: StateNode) -> RwLock<StateRegistry> {
        let mut registry = StateRegistry::new();
        registry
            .register([StateNode::new("app").redirect_to("welcome"), boundary])
            .unwrap();
        RwLock::new(registry)
    }

    fn contacts_subtree() -> Vec<StateNode> {
        vec![
            StateNode::new("contacts").parent("app").url("/contacts"),
            StateNode::new("contacts.contact").url("/:contactId"),
        ]
    }

    #[test]
    fn test_load_replaces_boundary() {
        let registry = registry_with(
            StateNode::future("contacts", |_| async { Ok(contacts_subtree()) })
                .parent("app")
                .url("/contacts"),
        );
        let loader = LazyLoader::new();

        pollster::block_on(loader.load(&registry, "contacts.**")).unwrap();

        let registry = registry.read();
        assert!(!registry.contains("contacts.**"));
        assert!(registry.contains("contacts.contact"));
        assert_eq!(loader.provider_calls(), 1);
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn test_second_load_is_a_no_op() {
        let registry = registry_with(
            StateNode::future("contacts", |_| async { Ok(contacts_subtree()) })
                .parent("app")
                .url("/contacts"),
        );
        let loader = LazyLoader::new();

        pollster::block_on(loader.load(&registry, "contacts.**")).unwrap();
        pollster::block_on(loader.load(&registry, "contacts.**")).unwrap();

        assert_eq!(loader.provider_calls(), 1);
    }

    #[test]
    fn test_failure_keeps_boundary_for_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let registry = registry_with(
            StateNode::future("contacts", move |_| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(LazyLoadError::from("network down"))
                    } else {
                        Ok(contacts_subtree())
                    }
                }
            })
            .parent("app")
            .url("/contacts"),
        );
        let loader = LazyLoader::new();

        let err = pollster::block_on(loader.load(&registry, "contacts.**")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::LazyLoadFailure {
                boundary: "contacts.**".to_string(),
                message: "network down".to_string(),
            }
        );
        assert!(registry.read().contains("contacts.**"));
        assert_eq!(loader.in_flight(), 0);

        pollster::block_on(loader.load(&registry, "contacts.**")).unwrap();
        assert!(registry.read().contains("contacts"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_subtree_keeps_boundary() {
        let registry = registry_with(
            StateNode::future("contacts", |_| async {
                Ok(vec![StateNode::new("contacts").parent("ghost").url("/contacts")])
            })
            .parent("app")
            .url("/contacts"),
        );
        let loader = LazyLoader::new();

        let err = pollster::block_on(loader.load(&registry, "contacts.**")).unwrap_err();
        assert!(matches!(err, RegistryError::MissingParent { .. }));
        assert!(registry.read().contains("contacts.**"));
    }
}
