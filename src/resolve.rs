//! Resolve entries: named values computed before a state activates.
//!
//! Each [`StateNode`](crate::StateNode) may declare an ordered list of
//! [`ResolveEntry`]s. An entry names a `token`, the tokens it depends on and
//! a resolver that produces the value. When a state activates, the entries
//! of every ancestor (root first) and then of the state itself are run in
//! order; later entries can depend on anything resolved before them.
//!
//! The running transition is always available under [`TRANSITION_TOKEN`].
//!
//! ```
//! use state_router::{compute_return_target, ResolveEntry, TransitionContext, TRANSITION_TOKEN};
//!
//! let return_to = ResolveEntry::value("returnTo", [TRANSITION_TOKEN], |deps| {
//!     let transition = deps.require::<TransitionContext>(TRANSITION_TOKEN)?;
//!     Ok(compute_return_target(transition))
//! });
//! assert_eq!(return_to.token(), "returnTo");
//! ```

use crate::error::NavigationError;
use crate::state::StateNode;
use crate::transition::TransitionContext;
use crate::trace_log;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Token under which the running [`TransitionContext`] is injected.
pub const TRANSITION_TOKEN: &str = "$transition$";

/// A resolved value of any type.
pub type ResolvedValue = Arc<dyn Any + Send + Sync>;

/// Future returned by a resolver.
pub type ResolveFuture = BoxFuture<'static, Result<ResolvedValue, NavigationError>>;

/// Resolver function. Receives only the declared dependencies.
pub type ResolveFn = Arc<dyn Fn(ResolvedValues) -> ResolveFuture + Send + Sync>;

/// A map of resolved values keyed by token.
#[derive(Clone, Default)]
pub struct ResolvedValues {
    values: HashMap<String, ResolvedValue>,
}

impl ResolvedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, value: ResolvedValue) {
        self.values.insert(token.into(), value);
    }

    /// Typed access. `None` when the token is missing or holds another type.
    pub fn get<T: Any>(&self, token: &str) -> Option<&T> {
        self.values.get(token)?.downcast_ref::<T>()
    }

    /// Like [`get`](Self::get) but reports a [`NavigationError::ResolveFailed`]
    /// naming the token.
    pub fn require<T: Any>(&self, token: &str) -> Result<&T, NavigationError> {
        match self.values.get(token) {
            None => Err(NavigationError::resolve(token, "value not resolved")),
            Some(value) => value.downcast_ref::<T>().ok_or_else(|| {
                NavigationError::resolve(
                    token,
                    format!("value is not a {}", std::any::type_name::<T>()),
                )
            }),
        }
    }

    pub fn get_raw(&self, token: &str) -> Option<&ResolvedValue> {
        self.values.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.values.contains_key(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ResolvedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<&str> = self.tokens().collect();
        tokens.sort_unstable();
        f.debug_struct("ResolvedValues")
            .field("tokens", &tokens)
            .finish()
    }
}

/// `{token, dependencies, resolver}` declared on a state.
#[derive(Clone)]
pub struct ResolveEntry {
    token: String,
    deps: Vec<String>,
    resolver: ResolveFn,
}

impl ResolveEntry {
    /// Entry with an async resolver.
    pub fn new<I, S, F, Fut, T>(token: impl Into<String>, deps: I, resolver: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(ResolvedValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, NavigationError>> + Send + 'static,
        T: Any + Send + Sync,
    {
        let resolver: ResolveFn = Arc::new(move |deps| {
            resolver(deps)
                .map(|result| result.map(|value| Arc::new(value) as ResolvedValue))
                .boxed()
        });
        Self {
            token: token.into(),
            deps: deps.into_iter().map(Into::into).collect(),
            resolver,
        }
    }

    /// Entry with a synchronous resolver.
    pub fn value<I, S, F, T>(token: impl Into<String>, deps: I, resolver: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&ResolvedValues) -> Result<T, NavigationError> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Self::new(token, deps, move |deps: ResolvedValues| {
            let result = resolver(&deps);
            async move { result }
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }
}

impl fmt::Debug for ResolveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveEntry")
            .field("token", &self.token)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

/// Run the resolve entries of `path` (root first) for `transition`.
///
/// Returns every resolved value, including the transition itself under
/// [`TRANSITION_TOKEN`]. A dependency that was not resolved earlier in the
/// path fails the whole resolution.
pub async fn resolve_path(
    path: &[StateNode],
    transition: &TransitionContext,
) -> Result<ResolvedValues, NavigationError> {
    let mut pool = ResolvedValues::new();
    pool.insert(TRANSITION_TOKEN, Arc::new(transition.clone()) as ResolvedValue);

    for node in path {
        for entry in node.resolve_entries() {
            let mut inputs = ResolvedValues::new();
            for dep in entry.deps() {
                let value = pool.get_raw(dep).ok_or_else(|| {
                    NavigationError::resolve(
                        entry.token(),
                        format!("unknown dependency '{}' in state '{}'", dep, node.name()),
                    )
                })?;
                inputs.insert(dep.clone(), Arc::clone(value));
            }

            trace_log!("Resolving '{}' for state '{}'", entry.token(), node.name());
            let value = (entry.resolver)(inputs).await?;
            pool.insert(entry.token(), value);
        }
    }

    Ok(pool)
}
