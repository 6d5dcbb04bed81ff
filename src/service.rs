//! The navigation engine.
//!
//! [`StateService`] owns the registry, the lazy loader and the guards, and
//! runs a transition through them:
//!
//! 1. load the lazy boundary covering the target, if any;
//! 2. follow the target's `redirect_to`;
//! 3. run guards, which may redirect (e.g. to `login`);
//! 4. run the resolve entries of the target's path;
//! 5. activate.
//!
//! Redirects in steps 2 and 3 replace the running [`TransitionContext`] with
//! one whose `redirected_from` points at the superseded attempt.
//!
//! ```
//! use state_router::{app, StateService};
//!
//! let service = StateService::builder()
//!     .states(app::app_states(Vec::new()))
//!     .build()
//!     .unwrap();
//!
//! let result = pollster::block_on(service.go("app"));
//! assert_eq!(result.active_state(), Some("welcome"));
//! ```

use crate::error::{NavigationError, NavigationResult, RegistryError};
#[cfg(feature = "guard")]
use crate::guards::{GuardContext, GuardFuture, GuardResult, Guards, TransitionGuard};
use crate::lazy::LazyLoader;
use crate::params::StateParams;
use crate::registry::StateRegistry;
use crate::resolve::{resolve_path, ResolvedValues};
use crate::state::{ComponentRef, StateNode};
use crate::transition::{TargetState, TransitionContext};
use crate::{debug_log, info_log, trace_log, warn_log};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Redirects allowed within one navigation before it is abandoned.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// A state that has been entered, with everything resolved for it.
#[derive(Debug, Clone)]
pub struct Activation {
    transition: TransitionContext,
    path: Vec<String>,
    resolved: ResolvedValues,
    component: Option<ComponentRef>,
}

impl Activation {
    /// The transition that produced this activation (after redirects).
    pub fn transition(&self) -> &TransitionContext {
        &self.transition
    }

    pub fn state(&self) -> &TargetState {
        self.transition.to()
    }

    pub fn name(&self) -> &str {
        self.transition.to().name()
    }

    pub fn params(&self) -> &StateParams {
        self.transition.to().params()
    }

    /// Names from the root down to the active state.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn resolved(&self) -> &ResolvedValues {
        &self.resolved
    }

    pub fn component(&self) -> Option<&ComponentRef> {
        self.component.as_ref()
    }
}

/// Navigation engine. See the [module docs](self).
pub struct StateService {
    registry: RwLock<StateRegistry>,
    loader: LazyLoader,
    #[cfg(feature = "guard")]
    guards: Guards,
    current: RwLock<Option<Arc<Activation>>>,
    otherwise: Option<TargetState>,
    max_redirects: usize,
}

impl StateService {
    pub fn builder() -> StateServiceBuilder {
        StateServiceBuilder::new()
    }

    /// Register more states. Same rules as [`StateRegistry::register`].
    pub fn register<I>(&self, nodes: I) -> Result<usize, RegistryError>
    where
        I: IntoIterator<Item = StateNode>,
    {
        self.write_registry().register(nodes)
    }

    /// Read access to the registry. Do not hold it across an `.await`.
    pub fn registry(&self) -> RwLockReadGuard<'_, StateRegistry> {
        self.registry.read()
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, StateRegistry> {
        self.registry.write()
    }

    pub fn loader(&self) -> &LazyLoader {
        &self.loader
    }

    /// The active state, if any navigation has succeeded.
    pub fn current(&self) -> Option<Arc<Activation>> {
        self.current.read().clone()
    }

    /// The active state and params, or an empty target before the first
    /// navigation.
    pub fn current_target(&self) -> TargetState {
        self.current()
            .map(|active| active.state().clone())
            .unwrap_or_default()
    }

    /// URL of a state. Loading is not triggered; states behind an unloaded
    /// boundary are reported as not found.
    pub fn href(&self, name: &str, params: &StateParams) -> Result<String, RegistryError> {
        self.registry().href(name, params)
    }

    /// Navigate to a state by name.
    pub async fn go(&self, name: &str) -> NavigationResult {
        self.go_to(TargetState::new(name)).await
    }

    /// Navigate to a state by name with params.
    pub async fn go_with(&self, name: &str, params: StateParams) -> NavigationResult {
        self.go_to(TargetState::with_params(name, params)).await
    }

    /// Navigate to `target` from the current state.
    pub async fn go_to(&self, target: TargetState) -> NavigationResult {
        let ctx = TransitionContext::new(self.current_target(), target);
        match self.transition_to(ctx).await {
            Ok(active) => NavigationResult::Success {
                state: active.state().clone(),
            },
            Err(err) => {
                warn_log!("Navigation failed: {}", err);
                err.into()
            }
        }
    }

    /// Navigate to whatever state a URL matches, loading lazy boundaries on
    /// the way. Falls back to the `otherwise` target when nothing matches.
    pub async fn navigate_url(&self, url: &str) -> NavigationResult {
        let target = match self.match_url(url).await {
            Ok(target) => target,
            Err(err) if err.is_not_found() => match &self.otherwise {
                Some(fallback) => {
                    debug_log!("No state for '{}', falling back to '{}'", url, fallback);
                    fallback.clone()
                }
                None => return NavigationError::from(err).into(),
            },
            Err(err) => return NavigationError::from(err).into(),
        };
        self.go_to(target).await
    }

    /// Resolve a URL to a target, loading any boundary it falls under.
    pub async fn match_url(&self, url: &str) -> Result<TargetState, RegistryError> {
        loop {
            let found = self.registry().match_url(url)?;
            if !found.boundary {
                return Ok(found.target);
            }
            trace_log!("'{}' falls under boundary '{}'", url, found.target.name());
            self.loader.load(&self.registry, found.target.name()).await?;
        }
    }

    /// Load every boundary covering `name` until the state itself can be
    /// looked up.
    async fn ensure_loaded(&self, name: &str) -> Result<(), RegistryError> {
        loop {
            let boundary = match self.registry().find_future_state(name) {
                Some(boundary) => boundary.name().to_string(),
                None => return Ok(()),
            };
            self.loader.load(&self.registry, &boundary).await?;
        }
    }

    /// Run a transition to completion and make it current.
    ///
    /// This is the full pipeline used by [`go`](Self::go); call it directly
    /// to supply a hand-built context.
    pub async fn transition_to(
        &self,
        mut ctx: TransitionContext,
    ) -> Result<Arc<Activation>, NavigationError> {
        loop {
            let depth = ctx.redirect_depth();
            if depth > self.max_redirects {
                return Err(NavigationError::RedirectLoop {
                    state: ctx.to().name().to_string(),
                    depth,
                });
            }

            let name = ctx.to().name().to_string();
            self.ensure_loaded(&name).await?;

            let redirect = {
                let registry = self.registry();
                let node = registry.lookup(&name)?;
                match node.redirect_target() {
                    Some(target) => Some(target.to_string()),
                    None if node.is_abstract() || node.is_future() => {
                        return Err(NavigationError::AbstractTarget { name });
                    }
                    None => None,
                }
            };
            if let Some(target) = redirect {
                debug_log!("'{}' redirects to '{}'", name, target);
                let params = ctx.to().params().clone();
                ctx = ctx.redirect(TargetState::with_params(target, params));
                continue;
            }

            #[cfg(feature = "guard")]
            {
                let data = self.registry().effective_data(&name)?;
                let guard_ctx = GuardContext::new(ctx.clone(), data);
                match self.guards.evaluate(&guard_ctx).await {
                    None | Some((_, GuardResult::Allow)) => {}
                    Some((guard, GuardResult::Deny { reason })) => {
                        info_log!("{} denied '{}': {}", guard, name, reason);
                        return Err(NavigationError::GuardRejected { guard, reason });
                    }
                    Some((guard, GuardResult::Redirect { to, reason })) => {
                        info_log!(
                            "{} redirected '{}' to '{}': {}",
                            guard,
                            name,
                            to.name(),
                            reason.as_deref().unwrap_or("no reason given")
                        );
                        ctx = ctx.redirect(to);
                        continue;
                    }
                }
            }

            let (path, component) = {
                let registry = self.registry();
                let nodes: Vec<StateNode> = registry.path_to(&name)?.into_iter().cloned().collect();
                let component = nodes.last().and_then(StateNode::component_ref).cloned();
                (nodes, component)
            };

            let resolved = resolve_path(&path, &ctx).await?;

            let activation = Arc::new(Activation {
                path: path.iter().map(|n| n.name().to_string()).collect(),
                transition: ctx,
                resolved,
                component,
            });
            *self.current.write() = Some(Arc::clone(&activation));

            info_log!("Activated {}", activation.transition());
            return Ok(activation);
        }
    }
}

impl std::fmt::Debug for StateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("StateService");
        s.field("states", &self.registry().len())
            .field("loader", &self.loader);
        #[cfg(feature = "guard")]
        s.field("guards", &self.guards);
        s.field("current", &self.current().map(|a| a.name().to_string()))
            .field("otherwise", &self.otherwise)
            .field("max_redirects", &self.max_redirects)
            .finish()
    }
}

/// Builder for [`StateService`].
#[derive(Default)]
pub struct StateServiceBuilder {
    states: Vec<StateNode>,
    #[cfg(feature = "guard")]
    guards: Guards,
    otherwise: Option<TargetState>,
    max_redirects: Option<usize>,
    #[cfg(feature = "cache")]
    cache_capacity: Option<std::num::NonZeroUsize>,
}

impl StateServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// States to register when the service is built.
    pub fn states<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = StateNode>,
    {
        self.states.extend(nodes);
        self
    }

    #[cfg(feature = "guard")]
    pub fn guard<G>(mut self, guard: G) -> Self
    where
        G: TransitionGuard<Future = GuardFuture>,
    {
        self.guards.push(guard);
        self
    }

    /// Target used by [`StateService::navigate_url`] when no state matches.
    pub fn otherwise(mut self, target: impl Into<String>) -> Self {
        self.otherwise = Some(TargetState::new(target));
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = Some(max);
        self
    }

    #[cfg(feature = "cache")]
    pub fn cache_capacity(mut self, capacity: std::num::NonZeroUsize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Register the collected states and build the service.
    pub fn build(self) -> Result<StateService, RegistryError> {
        #[cfg(feature = "cache")]
        let mut registry = match self.cache_capacity {
            Some(capacity) => StateRegistry::with_cache_capacity(capacity),
            None => StateRegistry::new(),
        };
        #[cfg(not(feature = "cache"))]
        let mut registry = StateRegistry::new();

        registry.register(self.states)?;

        Ok(StateService {
            registry: RwLock::new(registry),
            loader: LazyLoader::new(),
            #[cfg(feature = "guard")]
            guards: self.guards,
            current: RwLock::new(None),
            otherwise: self.otherwise,
            max_redirects: self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
        })
    }
}
