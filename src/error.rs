//! Error types for the state registry and navigation.
//!
//! - [`RegistryError`]: failures of registration, lookup, URL matching and
//!   lazy subtree loading.
//! - [`NavigationError`]: everything that can stop a transition, including
//!   wrapped registry errors.
//! - [`NavigationResult`]: the outcome of a navigation attempt
//!   (`Success`, `NotFound`, `Blocked`, `Error`).
//!
//! # Examples
//!
//! ```
//! use state_router::{NavigationResult, TargetState};
//!
//! let result = NavigationResult::Success { state: TargetState::new("home") };
//! assert!(result.is_success());
//!
//! let blocked = NavigationResult::Blocked {
//!     reason: "Authentication required".into(),
//! };
//! assert!(blocked.is_blocked());
//! ```

use crate::transition::TargetState;
use std::fmt;

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors raised by [`StateRegistry`](crate::StateRegistry) and the lazy
/// subtree loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No state is registered under this name
    StateNotFound { name: String },

    /// No navigable state matches this URL
    UrlNotFound { url: String },

    /// The name is empty or otherwise unusable
    InvalidName { name: String, reason: String },

    /// A state with this name is already registered (or repeated in the batch)
    DuplicateName { name: String },

    /// The declared or inferred parent is not registered
    MissingParent { name: String, parent: String },

    /// The URL pattern could not be compiled
    InvalidUrl {
        name: String,
        url: String,
        reason: String,
    },

    /// A lazy loader on a regular state, or a `.**` boundary without one
    InvalidLazyLoad { name: String },

    /// The deferred subtree provider failed
    LazyLoadFailure { boundary: String, message: String },
}

impl RegistryError {
    /// `true` for both name and URL misses.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::StateNotFound { .. } | RegistryError::UrlNotFound { .. }
        )
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::StateNotFound { name } => write!(f, "State not found: '{}'", name),
            RegistryError::UrlNotFound { url } => write!(f, "No state matches URL: {}", url),
            RegistryError::InvalidName { name, reason } => {
                write!(f, "Invalid state name '{}': {}", name, reason)
            }
            RegistryError::DuplicateName { name } => {
                write!(f, "State '{}' is already registered", name)
            }
            RegistryError::MissingParent { name, parent } => {
                write!(f, "Parent '{}' of state '{}' is not registered", parent, name)
            }
            RegistryError::InvalidUrl { name, url, reason } => {
                write!(f, "Invalid url '{}' on state '{}': {}", url, name, reason)
            }
            RegistryError::InvalidLazyLoad { name } => {
                write!(
                    f,
                    "State '{}' must be a '.**' boundary exactly when it has a lazy loader",
                    name
                )
            }
            RegistryError::LazyLoadFailure { boundary, message } => {
                write!(f, "Failed to load '{}': {}", boundary, message)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

// ============================================================================
// Navigation Errors
// ============================================================================

/// Reasons a transition can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// Lookup, matching or lazy loading failed
    Registry(RegistryError),

    /// The target is abstract and declares no `redirect_to`
    AbstractTarget { name: String },

    /// A guard rejected the transition
    GuardRejected { guard: String, reason: String },

    /// A resolve entry failed or referenced an unknown dependency
    ResolveFailed { token: String, message: String },

    /// Redirects kept superseding each other
    RedirectLoop { state: String, depth: usize },

    /// Custom error
    Custom { message: String },
}

impl NavigationError {
    /// Build a [`ResolveFailed`](Self::ResolveFailed) error.
    pub fn resolve(token: impl Into<String>, message: impl Into<String>) -> Self {
        NavigationError::ResolveFailed {
            token: token.into(),
            message: message.into(),
        }
    }

    /// Build a [`Custom`](Self::Custom) error.
    pub fn custom(message: impl Into<String>) -> Self {
        NavigationError::Custom {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, NavigationError::Registry(e) if e.is_not_found())
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::Registry(err) => write!(f, "{}", err),
            NavigationError::AbstractTarget { name } => {
                write!(f, "Cannot activate abstract state '{}'", name)
            }
            NavigationError::GuardRejected { guard, reason } => {
                write!(f, "Navigation blocked by {}: {}", guard, reason)
            }
            NavigationError::ResolveFailed { token, message } => {
                write!(f, "Resolve '{}' failed: {}", token, message)
            }
            NavigationError::RedirectLoop { state, depth } => {
                write!(f, "Redirect loop at '{}' after {} redirects", state, depth)
            }
            NavigationError::Custom { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for NavigationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NavigationError::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for NavigationError {
    fn from(err: RegistryError) -> Self {
        NavigationError::Registry(err)
    }
}

// ============================================================================
// Navigation Result
// ============================================================================

/// Outcome of a navigation attempt through [`StateService::go`](crate::StateService::go).
#[derive(Debug, Clone)]
pub enum NavigationResult {
    /// The state (possibly a redirect destination) is now active
    Success { state: TargetState },
    /// No state matches the requested name or URL
    NotFound { target: String },
    /// A guard denied the transition
    Blocked { reason: String },
    /// Any other failure
    Error(NavigationError),
}

impl NavigationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationResult::Success { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, NavigationResult::NotFound { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, NavigationResult::Blocked { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, NavigationResult::Error(_))
    }

    /// Name of the state that became active, if any.
    pub fn active_state(&self) -> Option<&str> {
        match self {
            NavigationResult::Success { state } => Some(state.name()),
            _ => None,
        }
    }
}

impl From<NavigationError> for NavigationResult {
    fn from(err: NavigationError) -> Self {
        match err {
            NavigationError::Registry(RegistryError::StateNotFound { name }) => {
                NavigationResult::NotFound { target: name }
            }
            NavigationError::Registry(RegistryError::UrlNotFound { url }) => {
                NavigationResult::NotFound { target: url }
            }
            NavigationError::GuardRejected { reason, .. } => {
                NavigationResult::Blocked { reason }
            }
            other => NavigationResult::Error(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_result_success() {
        let result = NavigationResult::Success {
            state: TargetState::new("home"),
        };
        assert!(result.is_success());
        assert!(!result.is_not_found());
        assert!(!result.is_blocked());
        assert!(!result.is_error());
        assert_eq!(result.active_state(), Some("home"));
    }

    #[test]
    fn test_not_found_conversion() {
        let err = NavigationError::from(RegistryError::StateNotFound {
            name: "nowhere".to_string(),
        });
        assert!(err.is_not_found());

        let result = NavigationResult::from(err);
        assert!(result.is_not_found());
    }

    #[test]
    fn test_guard_rejection_becomes_blocked() {
        let result = NavigationResult::from(NavigationError::GuardRejected {
            guard: "AuthGuard".to_string(),
            reason: "nope".to_string(),
        });
        match result {
            NavigationResult::Blocked { reason } => assert_eq!(reason, "nope"),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::DuplicateName {
            name: "home".to_string(),
        };
        assert_eq!(err.to_string(), "State 'home' is already registered");

        let err = RegistryError::LazyLoadFailure {
            boundary: "contacts.**".to_string(),
            message: "network down".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to load 'contacts.**': network down");
    }

    #[test]
    fn test_navigation_error_source() {
        use std::error::Error;

        let err = NavigationError::from(RegistryError::UrlNotFound {
            url: "/nope".to_string(),
        });
        assert!(err.source().is_some());
        assert!(NavigationError::custom("x").source().is_none());
    }
}
