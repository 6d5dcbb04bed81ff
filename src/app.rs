//! The application's root state table.
//!
//! ```text
//! app                 abstract shell, redirects to welcome
//! ├── welcome         /welcome   default state
//! ├── home            /home
//! ├── login           /login     resolves `returnTo`
//! ├── contacts.**     /contacts     lazy
//! ├── prefs.**        /prefs        lazy
//! └── mymessages.**   /mymessages   lazy
//! ```
//!
//! Feature modules ship their own states. Only the boundary is declared
//! here; the subtree arrives through the loader passed to
//! [`future_state`]. A module marks itself protected by setting
//! `data.requiresAuth = "true"` on its root state.

use crate::lazy::LazyLoadResult;
use crate::resolve::{ResolveEntry, TRANSITION_TOKEN};
use crate::return_to::compute_return_target;
use crate::service::StateServiceBuilder;
use crate::state::{ComponentRef, StateNode};
use crate::transition::TransitionContext;
use std::future::Future;

pub const ROOT_STATE: &str = "app";
pub const DEFAULT_STATE: &str = "welcome";
pub const LOGIN_STATE: &str = "login";

/// Token of the login state's resolve entry.
pub const RETURN_TO_TOKEN: &str = "returnTo";

/// Lazily loaded feature modules and their URL prefixes.
pub const FEATURE_MODULES: [(&str, &str); 3] = [
    ("contacts", "/contacts"),
    ("prefs", "/prefs"),
    ("mymessages", "/mymessages"),
];

/// The eagerly registered states: `app`, `welcome`, `home` and `login`.
pub fn root_states() -> Vec<StateNode> {
    vec![
        StateNode::new(ROOT_STATE)
            .redirect_to(DEFAULT_STATE)
            .component(ComponentRef::new("App")),
        StateNode::new(DEFAULT_STATE)
            .parent(ROOT_STATE)
            .url("/welcome")
            .component(ComponentRef::new("Welcome")),
        StateNode::new("home")
            .parent(ROOT_STATE)
            .url("/home")
            .component(ComponentRef::new("Home")),
        StateNode::new(LOGIN_STATE)
            .parent(ROOT_STATE)
            .url("/login")
            .component(ComponentRef::new("Login"))
            .resolve(ResolveEntry::value(
                RETURN_TO_TOKEN,
                [TRANSITION_TOKEN],
                |deps| {
                    let transition = deps.require::<TransitionContext>(TRANSITION_TOKEN)?;
                    Ok(compute_return_target(transition))
                },
            )),
    ]
}

/// Boundary for the feature module `module`, mounted under `app` at
/// `/<module>`.
///
/// ```
/// use state_router::app;
///
/// let contacts = app::future_state("contacts", |_| async { Ok(Vec::new()) });
/// assert_eq!(contacts.name(), "contacts.**");
/// assert_eq!(contacts.url_pattern(), Some("/contacts"));
/// ```
pub fn future_state<F, Fut>(module: &str, loader: F) -> StateNode
where
    F: Fn(&str) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LazyLoadResult> + Send + 'static,
{
    StateNode::future(module, loader)
        .parent(ROOT_STATE)
        .url(format!("/{}", module))
}

/// Root states followed by the given feature boundaries.
pub fn app_states<I>(modules: I) -> Vec<StateNode>
where
    I: IntoIterator<Item = StateNode>,
{
    let mut states = root_states();
    states.extend(modules);
    states
}

/// Service builder preloaded with [`app_states`]. Unmatched URLs land on
/// [`DEFAULT_STATE`].
pub fn builder<I>(modules: I) -> StateServiceBuilder
where
    I: IntoIterator<Item = StateNode>,
{
    StateServiceBuilder::new()
        .states(app_states(modules))
        .otherwise(DEFAULT_STATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StateRegistry;
    use crate::transition::TargetState;

    fn modules() -> Vec<StateNode> {
        FEATURE_MODULES
            .iter()
            .map(|(module, _)| future_state(module, |_| async { Ok(Vec::new()) }))
            .collect()
    }

    #[test]
    fn test_app_states_register() {
        let mut registry = StateRegistry::new();
        assert_eq!(registry.register(app_states(modules())).unwrap(), 7);

        assert!(registry.lookup(ROOT_STATE).unwrap().is_abstract());
        assert_eq!(
            registry.lookup(ROOT_STATE).unwrap().redirect_target(),
            Some(DEFAULT_STATE)
        );
        for (module, url) in FEATURE_MODULES {
            let boundary = format!("{}.**", module);
            assert_eq!(registry.url_of(&boundary), Some(url));
            assert_eq!(registry.parent_of(&boundary), Some(ROOT_STATE));
        }
    }

    #[test]
    fn test_login_declares_return_to() {
        let states = root_states();
        let login = states.iter().find(|s| s.name() == LOGIN_STATE).unwrap();

        let entry = &login.resolve_entries()[0];
        assert_eq!(entry.token(), RETURN_TO_TOKEN);
        assert_eq!(entry.deps(), [TRANSITION_TOKEN.to_string()]);
    }

    #[test]
    fn test_return_to_resolves_from_transition() {
        let states = root_states();
        let login = states
            .into_iter()
            .find(|s| s.name() == LOGIN_STATE)
            .unwrap();

        let ctx = TransitionContext::initial(TargetState::new("prefs"))
            .redirect(TargetState::new(LOGIN_STATE));
        let values = pollster::block_on(crate::resolve::resolve_path(&[login], &ctx)).unwrap();
        assert_eq!(
            values.get::<TargetState>(RETURN_TO_TOKEN),
            Some(&TargetState::new("prefs"))
        );
    }
}
