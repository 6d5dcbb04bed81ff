//! State node definitions.
//!
//! A [`StateNode`] is one node of the application's state tree. Nodes are
//! declared with a builder and handed to
//! [`StateRegistry::register`](crate::StateRegistry::register):
//!
//! ```
//! use state_router::{ComponentRef, StateNode};
//!
//! let app = StateNode::new("app").redirect_to("welcome").component(ComponentRef::new("App"));
//! let home = StateNode::new("home").parent("app").url("/home").component(ComponentRef::new("Home"));
//!
//! assert!(app.is_abstract());
//! assert_eq!(home.parent_name(), Some("app"));
//! ```
//!
//! # Future states
//!
//! A name ending in `.**` marks a lazy boundary. Such a node carries a
//! [`LazyLoadFn`] and a URL prefix; the real subtree is fetched the first
//! time a navigation needs it and replaces the placeholder.

use crate::lazy::{LazyLoadFn, LazyLoadResult};
use crate::resolve::ResolveEntry;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Suffix that marks a lazy subtree boundary.
pub const FUTURE_STATE_SUFFIX: &str = ".**";

/// Opaque reference to a renderable unit.
///
/// The router never looks inside; it only hands the reference (and the
/// resolved values) to whoever renders the active state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentRef(Arc<str>);

impl ComponentRef {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One node of the state tree.
#[derive(Clone)]
pub struct StateNode {
    name: String,
    parent: Option<String>,
    url: Option<String>,
    component: Option<ComponentRef>,
    resolve: Vec<ResolveEntry>,
    lazy_load: Option<LazyLoadFn>,
    redirect_to: Option<String>,
    data: HashMap<String, String>,
}

impl StateNode {
    /// Declare a state with the given dotted name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            url: None,
            component: None,
            resolve: Vec::new(),
            lazy_load: None,
            redirect_to: None,
            data: HashMap::new(),
        }
    }

    /// Declare a future state (`<name>.**`) whose subtree comes from `loader`.
    ///
    /// ```
    /// use state_router::StateNode;
    ///
    /// let contacts = StateNode::future("contacts", |_| async { Ok(Vec::new()) })
    ///     .parent("app")
    ///     .url("/contacts");
    /// assert_eq!(contacts.name(), "contacts.**");
    /// assert!(contacts.is_future());
    /// ```
    pub fn future<F, Fut>(name: impl AsRef<str>, loader: F) -> Self
    where
        F: Fn(&str) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LazyLoadResult> + Send + 'static,
    {
        let name = format!("{}{}", name.as_ref(), FUTURE_STATE_SUFFIX);
        let boundary = name.clone();
        let loader: LazyLoadFn = Arc::new(move || loader(&boundary).boxed());
        Self::new(name).lazy_load(loader)
    }

    /// Set the parent explicitly. Without it the parent is inferred from the
    /// dotted name (`contacts.contact` → `contacts`).
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// URL pattern relative to the parent's URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn component(mut self, component: ComponentRef) -> Self {
        self.component = Some(component);
        self
    }

    /// Append a resolve entry. Entries resolve in declaration order.
    pub fn resolve(mut self, entry: ResolveEntry) -> Self {
        self.resolve.push(entry);
        self
    }

    /// Attach a deferred subtree provider. Only valid on `.**` names.
    pub fn lazy_load(mut self, loader: LazyLoadFn) -> Self {
        self.lazy_load = Some(loader);
        self
    }

    /// Activate `target` instead whenever this state is targeted directly.
    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }

    /// Attach metadata. Descendants inherit it unless they override the key.
    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit parent, or the prefix before the last dot of the name.
    pub fn parent_name(&self) -> Option<&str> {
        if let Some(parent) = &self.parent {
            return Some(parent);
        }
        self.base_name().rsplit_once('.').map(|(prefix, _)| prefix)
    }

    pub fn url_pattern(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn component_ref(&self) -> Option<&ComponentRef> {
        self.component.as_ref()
    }

    pub fn resolve_entries(&self) -> &[ResolveEntry] {
        &self.resolve
    }

    pub fn lazy_loader(&self) -> Option<&LazyLoadFn> {
        self.lazy_load.as_ref()
    }

    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }

    /// Metadata declared on this node only.
    pub fn own_data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// All metadata declared on this node.
    pub fn data_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `true` for `.**` boundaries.
    pub fn is_future(&self) -> bool {
        self.name.ends_with(FUTURE_STATE_SUFFIX)
    }

    /// Name without the `.**` suffix.
    pub fn base_name(&self) -> &str {
        self.name
            .strip_suffix(FUTURE_STATE_SUFFIX)
            .unwrap_or(&self.name)
    }

    /// A state without a URL cannot be navigated to by URL, and can only be
    /// targeted by name when it redirects somewhere else.
    pub fn is_abstract(&self) -> bool {
        self.url.is_none()
    }

    /// Whether this boundary's subtree contains `name`.
    pub fn covers(&self, name: &str) -> bool {
        if !self.is_future() {
            return false;
        }
        let base = self.base_name();
        name == base
            || name
                .strip_prefix(base)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Debug for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("name", &self.name)
            .field("parent", &self.parent_name())
            .field("url", &self.url)
            .field("component", &self.component)
            .field("resolve", &self.resolve)
            .field("lazy", &self.lazy_load.is_some())
            .field("redirect_to", &self.redirect_to)
            .field("data", &self.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_inference() {
        assert_eq!(StateNode::new("app").parent_name(), None);
        assert_eq!(StateNode::new("contacts.contact").parent_name(), Some("contacts"));
        assert_eq!(
            StateNode::new("contacts.contact.edit").parent_name(),
            Some("contacts.contact")
        );
        assert_eq!(
            StateNode::new("welcome").parent("app").parent_name(),
            Some("app")
        );
    }

    #[test]
    fn test_future_state() {
        let node = StateNode::future("mymessages", |_| async { Ok(Vec::new()) }).parent("app");

        assert!(node.is_future());
        assert_eq!(node.base_name(), "mymessages");
        assert_eq!(node.parent_name(), Some("app"));
        assert!(node.lazy_loader().is_some());
    }

    #[test]
    fn test_future_parent_inferred_from_base_name() {
        let node = StateNode::future("mymessages.archive", |_| async { Ok(Vec::new()) });
        assert_eq!(node.parent_name(), Some("mymessages"));
    }

    #[test]
    fn test_covers() {
        let node = StateNode::future("contacts", |_| async { Ok(Vec::new()) });

        assert!(node.covers("contacts"));
        assert!(node.covers("contacts.contact"));
        assert!(node.covers("contacts.contact.edit"));
        assert!(!node.covers("contactsx"));
        assert!(!node.covers("prefs"));
        assert!(!StateNode::new("contacts").covers("contacts.contact"));
    }

    #[test]
    fn test_abstract_and_data() {
        let node = StateNode::new("app").data("requiresAuth", "true");
        assert!(node.is_abstract());
        assert_eq!(node.own_data("requiresAuth"), Some("true"));
        assert_eq!(node.own_data("missing"), None);

        assert!(!StateNode::new("home").url("/home").is_abstract());
    }
}
