//! Transition contexts.
//!
//! A [`TransitionContext`] describes one navigation attempt: where it
//! started ([`from`](TransitionContext::from)), where it is going
//! ([`to`](TransitionContext::to)) and, when a guard interposed a redirect,
//! the attempt it superseded ([`redirected_from`](TransitionContext::redirected_from)).
//!
//! Contexts are immutable. A redirect builds a *new* context that holds an
//! `Arc` back to the original, so "what the user really wanted" survives
//! the detour without any shared mutable state.
//!
//! # Example
//!
//! ```
//! use state_router::{TargetState, TransitionContext};
//!
//! let attempt = TransitionContext::initial(TargetState::new("contacts"));
//! let to_login = attempt.redirect(TargetState::new("login"));
//!
//! assert_eq!(to_login.to().name(), "login");
//! assert_eq!(to_login.redirected_from().unwrap().to().name(), "contacts");
//! assert!(to_login.from().is_empty());
//! ```

use crate::params::StateParams;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TRANSITION_ID: AtomicU64 = AtomicU64::new(1);

/// A state name together with its parameters.
///
/// An empty name stands for "no state"; it appears as the origin of the
/// first transition of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TargetState {
    name: String,
    params: StateParams,
}

impl TargetState {
    /// Target a state with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: StateParams::new(),
        }
    }

    /// Target a state with parameters.
    pub fn with_params(name: impl Into<String>, params: StateParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// The "no state" value used as the origin of an initial transition.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &StateParams {
        &self.params
    }

    /// `true` when this refers to no state at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            return f.write_str("<none>");
        }
        f.write_str(&self.name)?;
        if !self.params.is_empty() {
            write!(f, "({})", self.params.to_query_string())?;
        }
        Ok(())
    }
}

/// Immutable description of a single navigation attempt.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    id: u64,
    from: TargetState,
    to: TargetState,
    redirected_from: Option<Arc<TransitionContext>>,
}

impl TransitionContext {
    /// A transition from an active state to `to`.
    pub fn new(from: TargetState, to: TargetState) -> Self {
        Self {
            id: NEXT_TRANSITION_ID.fetch_add(1, Ordering::Relaxed),
            from,
            to,
            redirected_from: None,
        }
    }

    /// The first transition of a session: there is no origin state.
    pub fn initial(to: TargetState) -> Self {
        Self::new(TargetState::none(), to)
    }

    /// Build the context that replaces this one when a guard redirects.
    ///
    /// The new context keeps the same origin and links back to `self`.
    pub fn redirect(self, to: TargetState) -> TransitionContext {
        let from = self.from.clone();
        TransitionContext {
            id: NEXT_TRANSITION_ID.fetch_add(1, Ordering::Relaxed),
            from,
            to,
            redirected_from: Some(Arc::new(self)),
        }
    }

    /// Process-unique id, useful to correlate log lines.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn from(&self) -> &TargetState {
        &self.from
    }

    pub fn to(&self) -> &TargetState {
        &self.to
    }

    /// The transition this one superseded, if a guard redirected it.
    pub fn redirected_from(&self) -> Option<&TransitionContext> {
        self.redirected_from.as_deref()
    }

    /// `true` when no state was active before this transition.
    pub fn is_initial(&self) -> bool {
        self.from.is_empty()
    }

    /// Number of redirects between the original attempt and this context.
    pub fn redirect_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.redirected_from();
        while let Some(ctx) = current {
            depth += 1;
            current = ctx.redirected_from();
        }
        depth
    }

    /// The first attempt of the redirect chain (`self` when not redirected).
    pub fn original(&self) -> &TransitionContext {
        let mut current = self;
        while let Some(prev) = current.redirected_from() {
            current = prev;
        }
        current
    }
}

impl fmt::Display for TransitionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} -> {}", self.id, self.from, self.to)?;
        if let Some(prev) = &self.redirected_from {
            write!(f, " (redirected from #{})", prev.id)?;
        }
        Ok(())
    }
}
