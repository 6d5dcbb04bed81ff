//! Transition guards.
//!
//! A guard inspects a transition before it activates. It either lets the
//! transition through or answers with a deny or a redirect. Redirects do not
//! start a fresh navigation: the service builds a new [`TransitionContext`]
//! that points back at the superseded one, which is what the login state's
//! `returnTo` resolve later reads.

use crate::debug_log;
use crate::transition::{TargetState, TransitionContext};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Metadata key that marks a state (and its descendants) as protected.
pub const REQUIRES_AUTH: &str = "requiresAuth";

/// Result of a guard check
#[derive(Debug, Clone, PartialEq)]
pub enum GuardResult {
    /// Allow the transition to proceed
    Allow,

    /// Stop the transition
    Deny { reason: String },

    /// Supersede the transition with one targeting `to`
    Redirect {
        to: TargetState,
        reason: Option<String>,
    },
}

impl GuardResult {
    pub fn allow() -> Self {
        GuardResult::Allow
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        GuardResult::Deny {
            reason: reason.into(),
        }
    }

    pub fn redirect(to: TargetState) -> Self {
        GuardResult::Redirect { to, reason: None }
    }

    pub fn redirect_with_reason(to: TargetState, reason: impl Into<String>) -> Self {
        GuardResult::Redirect {
            to,
            reason: Some(reason.into()),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, GuardResult::Allow)
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, GuardResult::Deny { .. })
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, GuardResult::Redirect { .. })
    }

    /// Name of the redirect destination, if this is a redirect.
    pub fn redirect_state(&self) -> Option<&str> {
        match self {
            GuardResult::Redirect { to, .. } => Some(to.name()),
            _ => None,
        }
    }
}

/// What a guard gets to see: the transition and the target's metadata,
/// including everything inherited from its ancestors.
#[derive(Debug, Clone)]
pub struct GuardContext {
    transition: TransitionContext,
    data: HashMap<String, String>,
}

impl GuardContext {
    pub fn new(transition: TransitionContext, data: HashMap<String, String>) -> Self {
        Self { transition, data }
    }

    pub fn transition(&self) -> &TransitionContext {
        &self.transition
    }

    pub fn target(&self) -> &TargetState {
        self.transition.to()
    }

    /// Effective `data[key]` of the target state.
    pub fn data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.transition.to().params().get(key)
    }
}

/// Trait for transition guards
///
/// Guards run in descending [`priority`](TransitionGuard::priority) order;
/// the first result other than [`GuardResult::Allow`] wins.
///
/// ```
/// use state_router::guards::{GuardContext, GuardResult, TransitionGuard};
/// use std::future::Future;
/// use std::pin::Pin;
///
/// struct MaintenanceGuard;
///
/// impl TransitionGuard for MaintenanceGuard {
///     type Future = Pin<Box<dyn Future<Output = GuardResult> + Send>>;
///
///     fn check(&self, ctx: &GuardContext) -> Self::Future {
///         let closed = ctx.data("maintenance") == Some("true");
///         Box::pin(async move {
///             if closed {
///                 GuardResult::deny("Down for maintenance")
///             } else {
///                 GuardResult::allow()
///             }
///         })
///     }
/// }
/// ```
pub trait TransitionGuard: Send + Sync + 'static {
    /// The future returned by check
    type Future: Future<Output = GuardResult> + Send + 'static;

    fn check(&self, ctx: &GuardContext) -> Self::Future;

    /// Name used in logs and in [`GuardRejected`](crate::NavigationError::GuardRejected).
    fn name(&self) -> &str {
        "TransitionGuard"
    }

    /// Higher priority guards run first. Default is 0.
    fn priority(&self) -> i32 {
        0
    }
}

/// Future type shared by boxed guards.
pub type GuardFuture = Pin<Box<dyn Future<Output = GuardResult> + Send>>;

/// Boxed guard for dynamic dispatch
pub type BoxedGuard = Box<dyn TransitionGuard<Future = GuardFuture>>;

/// Create a guard from a closure.
///
/// ```
/// use state_router::guards::{guard_fn, GuardResult};
///
/// let guard = guard_fn(|ctx| {
///     let allowed = ctx.param("folderId") != Some("trash");
///     async move {
///         if allowed { GuardResult::allow() } else { GuardResult::deny("Trash is read-only") }
///     }
/// });
/// ```
pub fn guard_fn<F, Fut>(f: F) -> FnGuard<F>
where
    F: Fn(&GuardContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GuardResult> + Send + 'static,
{
    FnGuard { f }
}

/// Guard created from a function or closure
pub struct FnGuard<F> {
    f: F,
}

impl<F, Fut> TransitionGuard for FnGuard<F>
where
    F: Fn(&GuardContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GuardResult> + Send + 'static,
{
    type Future = GuardFuture;

    fn check(&self, ctx: &GuardContext) -> Self::Future {
        Box::pin((self.f)(ctx))
    }
}

// ============================================================================
// Authentication Guard
// ============================================================================

/// Session check used by [`AuthGuard`].
pub type AuthCheckFn = Box<dyn Fn() -> bool + Send + Sync>;

/// Redirects unauthenticated transitions into protected states to the login
/// state.
///
/// A state is protected when its effective `data.requiresAuth` is `"true"`.
/// Unprotected states are always allowed.
///
/// ```
/// use state_router::AuthGuard;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let session = Arc::new(AtomicBool::new(false));
/// let check = Arc::clone(&session);
/// let guard = AuthGuard::new(move || check.load(Ordering::SeqCst), "login");
/// ```
pub struct AuthGuard {
    check_fn: AuthCheckFn,
    login_state: String,
}

impl AuthGuard {
    pub fn new<F>(check_fn: F, login_state: impl Into<String>) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            check_fn: Box::new(check_fn),
            login_state: login_state.into(),
        }
    }

    pub fn login_state(&self) -> &str {
        &self.login_state
    }
}

impl TransitionGuard for AuthGuard {
    type Future = GuardFuture;

    fn check(&self, ctx: &GuardContext) -> Self::Future {
        let protected = ctx.data(REQUIRES_AUTH) == Some("true");
        let result = if !protected || (self.check_fn)() {
            GuardResult::allow()
        } else {
            debug_log!(
                "'{}' requires authentication, redirecting to '{}'",
                ctx.target().name(),
                self.login_state
            );
            GuardResult::redirect_with_reason(
                TargetState::new(self.login_state.as_str()),
                "Authentication required",
            )
        };

        Box::pin(async move { result })
    }

    fn name(&self) -> &str {
        "AuthGuard"
    }

    fn priority(&self) -> i32 {
        100
    }
}

// ============================================================================
// Guard Composition
// ============================================================================

/// Runs several guards with AND logic.
///
/// Guards run in descending priority order; the first non-`Allow` result is
/// returned together with the name of the guard that produced it.
#[derive(Default)]
pub struct Guards {
    guards: Vec<BoxedGuard>,
}

impl Guards {
    pub fn new(guards: Vec<BoxedGuard>) -> Self {
        let mut guards = Self { guards };
        guards.sort();
        guards
    }

    /// Add a guard, keeping priority order.
    pub fn push<G>(&mut self, guard: G)
    where
        G: TransitionGuard<Future = GuardFuture>,
    {
        self.guards.push(Box::new(guard));
        self.sort();
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    fn sort(&mut self) {
        // Stable, so equal priorities keep insertion order.
        self.guards.sort_by_key(|g| Reverse(g.priority()));
    }

    /// Run every guard and report the first objection with its guard name.
    pub async fn evaluate(&self, ctx: &GuardContext) -> Option<(String, GuardResult)> {
        for guard in &self.guards {
            match guard.check(ctx).await {
                GuardResult::Allow => continue,
                other => return Some((guard.name().to_string(), other)),
            }
        }
        None
    }
}

impl std::fmt::Debug for Guards {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.guards.iter().map(|g| g.name()))
            .finish()
    }
}

impl TransitionGuard for Guards {
    type Future = GuardFuture;

    fn check(&self, ctx: &GuardContext) -> Self::Future {
        let futures: Vec<_> = self.guards.iter().map(|g| g.check(ctx)).collect();

        Box::pin(async move {
            for future in futures {
                match future.await {
                    GuardResult::Allow => continue,
                    other => return other,
                }
            }
            GuardResult::Allow
        })
    }

    fn name(&self) -> &str {
        "Guards"
    }

    fn priority(&self) -> i32 {
        self.guards.iter().map(|g| g.priority()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::StateParams;

    fn ctx_for(target: &str, protected: bool) -> GuardContext {
        let mut data = HashMap::new();
        if protected {
            data.insert(REQUIRES_AUTH.to_string(), "true".to_string());
        }
        GuardContext::new(
            TransitionContext::new(TargetState::new("home"), TargetState::new(target)),
            data,
        )
    }

    #[test]
    fn test_guard_result_helpers() {
        assert!(GuardResult::allow().is_allow());
        assert!(GuardResult::deny("no").is_deny());

        let result = GuardResult::redirect(TargetState::new("login"));
        assert!(result.is_redirect());
        assert_eq!(result.redirect_state(), Some("login"));
        assert_eq!(GuardResult::allow().redirect_state(), None);
    }

    #[test]
    fn test_guard_context_accessors() {
        let ctx = GuardContext::new(
            TransitionContext::initial(TargetState::with_params(
                "contacts.contact",
                StateParams::new().with("contactId", "7"),
            )),
            HashMap::new(),
        );

        assert_eq!(ctx.target().name(), "contacts.contact");
        assert_eq!(ctx.param("contactId"), Some("7"));
        assert_eq!(ctx.data(REQUIRES_AUTH), None);
    }

    #[test]
    fn test_auth_guard_redirects_protected_without_session() {
        let guard = AuthGuard::new(|| false, "login");
        assert_eq!(guard.name(), "AuthGuard");
        assert_eq!(guard.priority(), 100);

        let result = pollster::block_on(guard.check(&ctx_for("contacts", true)));
        assert_eq!(
            result,
            GuardResult::redirect_with_reason(TargetState::new("login"), "Authentication required")
        );
    }

    #[test]
    fn test_auth_guard_allows_with_session_or_unprotected() {
        let guard = AuthGuard::new(|| true, "login");
        assert!(pollster::block_on(guard.check(&ctx_for("contacts", true))).is_allow());

        let guard = AuthGuard::new(|| false, "login");
        assert!(pollster::block_on(guard.check(&ctx_for("home", false))).is_allow());
    }

    #[test]
    fn test_guard_fn_default_name() {
        let guard = guard_fn(|_| async { GuardResult::allow() });
        assert_eq!(guard.name(), "TransitionGuard");
        assert_eq!(guard.priority(), 0);
    }

    struct Last;

    impl TransitionGuard for Last {
        type Future = GuardFuture;

        fn check(&self, _ctx: &GuardContext) -> Self::Future {
            Box::pin(async { GuardResult::deny("last") })
        }

        fn name(&self) -> &str {
            "Last"
        }

        fn priority(&self) -> i32 {
            i32::MIN
        }
    }

    #[test]
    fn test_lowest_priority_guard_runs_last() {
        let mut guards = Guards::default();
        guards.push(Last);
        guards.push(guard_fn(|_| async { GuardResult::deny("first") }));

        let (name, result) = pollster::block_on(guards.evaluate(&ctx_for("home", false))).unwrap();
        assert_eq!(name, "TransitionGuard");
        assert_eq!(result, GuardResult::deny("first"));
    }

    #[test]
    fn test_guards_run_in_priority_order() {
        let mut guards = Guards::default();
        guards.push(guard_fn(|_| async { GuardResult::deny("low priority") }));
        guards.push(AuthGuard::new(|| false, "login"));
        assert_eq!(guards.len(), 2);
        assert_eq!(guards.priority(), 100);

        let (name, result) = pollster::block_on(guards.evaluate(&ctx_for("prefs", true))).unwrap();
        assert_eq!(name, "AuthGuard");
        assert_eq!(result.redirect_state(), Some("login"));

        let (name, result) = pollster::block_on(guards.evaluate(&ctx_for("home", false))).unwrap();
        assert_eq!(name, "TransitionGuard");
        assert!(result.is_deny());
    }

    #[test]
    fn test_empty_guards_allow() {
        let guards = Guards::default();
        assert!(pollster::block_on(guards.evaluate(&ctx_for("home", false))).is_none());
        assert!(pollster::block_on(guards.check(&ctx_for("home", false))).is_allow());
    }
}
