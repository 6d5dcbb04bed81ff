//! # State Router
//!
//! A headless hierarchical state router:
//!
//! - **State Tree** - Named states with parents, URLs, resolves and metadata
//! - **Lazy Subtrees** - `.**` future states whose children are loaded on first use
//! - **URL Matching** - Static and parameter segments, query strings, `href` generation
//! - **Guards** - Allow, deny or redirect transitions (feature `guard`)
//! - **Resolves** - Values computed before a state activates, with dependencies
//! - **Return-to** - Where to go after login, computed from the login transition
//!
//! Rendering is not part of this crate. States carry an opaque
//! [`ComponentRef`] that the host application maps to whatever it renders.
//!
//! # Quick Start
//!
//! ```
//! use state_router::{app, AuthGuard, StateNode};
//!
//! let contacts = app::future_state("contacts", |_| async {
//!     Ok(vec![
//!         StateNode::new("contacts")
//!             .parent("app")
//!             .url("/contacts")
//!             .data("requiresAuth", "true"),
//!         StateNode::new("contacts.contact").url("/:contactId"),
//!     ])
//! });
//!
//! let service = app::builder([contacts])
//!     .guard(AuthGuard::new(|| false, app::LOGIN_STATE))
//!     .build()
//!     .unwrap();
//!
//! pollster::block_on(async {
//!     // Not logged in: the guard sends us to login.
//!     let result = service.navigate_url("/contacts/42").await;
//!     assert_eq!(result.active_state(), Some("login"));
//!
//!     // Login resolved where to return afterwards.
//!     let active = service.current().unwrap();
//!     let return_to = active.resolved().get::<state_router::TargetState>("returnTo").unwrap();
//!     assert_eq!(return_to.name(), "contacts.contact");
//!     assert_eq!(return_to.params().get("contactId"), Some("42"));
//! });
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `guard` (default) - Transition guards and [`AuthGuard`]
//! - `cache` (default) - LRU cache for URL matching

#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// State tree
pub mod matcher;
pub mod params;
pub mod registry;
pub mod state;

// Error handling
pub mod error;

// Transitions and what runs during them
pub mod lazy;
pub mod resolve;
pub mod return_to;
pub mod transition;

// Guards
#[cfg(feature = "guard")]
pub mod guards;

// Navigation engine and the application's states
pub mod app;
pub mod service;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::{CacheStats, MatchCache};
pub use error::{NavigationError, NavigationResult, RegistryError};
#[cfg(feature = "guard")]
pub use guards::{
    guard_fn, AuthGuard, BoxedGuard, GuardContext, GuardResult, Guards, TransitionGuard,
    REQUIRES_AUTH,
};
pub use lazy::{LazyLoadError, LazyLoadFn, LazyLoadResult, LazyLoader};
pub use params::StateParams;
pub use registry::{StateMatch, StateRegistry};
pub use resolve::{ResolveEntry, ResolvedValues, TRANSITION_TOKEN};
pub use return_to::{compute_return_target, HOME_STATE};
pub use service::{Activation, StateService, StateServiceBuilder};
pub use state::{ComponentRef, StateNode, FUTURE_STATE_SUFFIX};
pub use transition::{TargetState, TransitionContext};
