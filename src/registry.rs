//! The state registry.
//!
//! [`StateRegistry`] is an arena of [`StateNode`]s keyed by name. Parent
//! links are names, not pointers, so the tree can grow at runtime (lazy
//! subtrees) without touching nodes that are already registered.
//!
//! Registration is all-or-nothing: a batch is validated completely (unique
//! names, known parents, valid URLs, lazy loaders only on `.**` names)
//! before anything is inserted. A failed batch leaves the registry exactly
//! as it was.
//!
//! # Example
//!
//! ```
//! use state_router::{StateNode, StateRegistry};
//!
//! let mut registry = StateRegistry::new();
//! registry
//!     .register([
//!         StateNode::new("app").redirect_to("welcome"),
//!         StateNode::new("welcome").parent("app").url("/welcome"),
//!         StateNode::new("home").parent("app").url("/home"),
//!     ])
//!     .unwrap();
//!
//! assert_eq!(registry.match_url("/home").unwrap().target.name(), "home");
//! assert!(registry.register([StateNode::new("home").url("/x")]).is_err());
//! assert_eq!(registry.len(), 3);
//! ```

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, MatchCache};
use crate::error::RegistryError;
use crate::matcher::{MatchRank, UrlPattern};
use crate::params::StateParams;
use crate::state::StateNode;
use crate::transition::TargetState;
use crate::{debug_log, trace_log};
use std::collections::{HashMap, HashSet};
#[cfg(feature = "cache")]
use parking_lot::{Mutex, MutexGuard};

/// Result of matching a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMatch {
    /// The matched state and the params captured from the URL
    pub target: TargetState,
    /// `true` when the URL only matched a lazy boundary's prefix; the
    /// subtree has to be loaded and the URL matched again.
    pub boundary: bool,
}

impl StateMatch {
    pub fn exact(target: TargetState) -> Self {
        Self {
            target,
            boundary: false,
        }
    }

    pub fn boundary(target: TargetState) -> Self {
        Self {
            target,
            boundary: true,
        }
    }
}

#[derive(Debug)]
struct Entry {
    node: StateNode,
    parent: Option<String>,
    /// Full pattern from the root. Abstract states carry their parent's.
    pattern: UrlPattern,
}

impl Entry {
    fn navigable(&self) -> bool {
        !self.node.is_abstract()
    }
}

/// Validated batch, ready to commit.
struct Staged {
    entries: Vec<Entry>,
    replaced: Vec<String>,
}

/// Registry of every known state.
#[derive(Debug, Default)]
pub struct StateRegistry {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
    #[cfg(feature = "cache")]
    match_cache: Mutex<MatchCache>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a URL match cache of the given capacity.
    #[cfg(feature = "cache")]
    pub fn with_cache_capacity(capacity: std::num::NonZeroUsize) -> Self {
        Self {
            match_cache: Mutex::new(MatchCache::with_capacity(capacity)),
            ..Self::default()
        }
    }

    /// Register a batch of states.
    ///
    /// Parents may appear anywhere in the same batch. A regular state whose
    /// name falls under a registered `.**` boundary replaces that boundary.
    ///
    /// Returns the number of states added.
    pub fn register<I>(&mut self, nodes: I) -> Result<usize, RegistryError>
    where
        I: IntoIterator<Item = StateNode>,
    {
        let staged = self.stage(nodes.into_iter().collect(), None)?;
        Ok(self.commit(staged))
    }

    /// Register the subtree fetched for `boundary`, removing the boundary in
    /// the same step.
    pub(crate) fn register_subtree(
        &mut self,
        boundary: &str,
        nodes: Vec<StateNode>,
    ) -> Result<usize, RegistryError> {
        let staged = self.stage(nodes, Some(boundary))?;
        Ok(self.commit(staged))
    }

    fn stage(
        &self,
        batch: Vec<StateNode>,
        replacing: Option<&str>,
    ) -> Result<Staged, RegistryError> {
        let mut seen = HashSet::new();
        for node in &batch {
            let name = node.name();
            if name.is_empty() || name.split('.').any(str::is_empty) {
                return Err(RegistryError::InvalidName {
                    name: name.to_string(),
                    reason: "names must be non-empty dotted identifiers".to_string(),
                });
            }
            if self.entries.contains_key(name) || !seen.insert(name) {
                return Err(RegistryError::DuplicateName {
                    name: name.to_string(),
                });
            }
            if node.is_future() != node.lazy_loader().is_some() {
                return Err(RegistryError::InvalidLazyLoad {
                    name: name.to_string(),
                });
            }
        }

        // A boundary may not shadow states that already exist.
        for future in batch.iter().filter(|n| n.is_future()) {
            let shadowed = self
                .order
                .iter()
                .map(String::as_str)
                .chain(batch.iter().map(|n| n.name()))
                .find(|&name| name != future.name() && future.covers(name));
            if let Some(name) = shadowed {
                return Err(RegistryError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }

        let mut replaced: Vec<String> = replacing.map(String::from).into_iter().collect();
        for node in batch.iter().filter(|n| !n.is_future()) {
            if let Some(future) = self.find_future_state(node.name()) {
                if !replaced.iter().any(|r| r == future.name()) {
                    replaced.push(future.name().to_string());
                }
            }
        }

        // Resolve parents in dependency order so a batch may list children
        // before their parents.
        let mut staged: Vec<Entry> = Vec::with_capacity(batch.len());
        let mut pending = batch;
        while !pending.is_empty() {
            let before = pending.len();
            let mut waiting = Vec::new();

            for node in pending {
                let base = match node.parent_name() {
                    None => Some(UrlPattern::parse("").map_err(|reason| {
                        RegistryError::InvalidUrl {
                            name: node.name().to_string(),
                            url: String::new(),
                            reason,
                        }
                    })?),
                    Some(parent) => staged
                        .iter()
                        .find(|e| e.node.name() == parent)
                        .or_else(|| {
                            self.entries
                                .get(parent)
                                .filter(|_| !replaced.iter().any(|r| r == parent))
                        })
                        .filter(|e| !e.node.is_future())
                        .map(|e| e.pattern.clone()),
                };

                let Some(base) = base else {
                    waiting.push(node);
                    continue;
                };

                let pattern = match node.url_pattern() {
                    Some(url) => base.join(url).map_err(|reason| RegistryError::InvalidUrl {
                        name: node.name().to_string(),
                        url: url.to_string(),
                        reason,
                    })?,
                    None => base,
                };

                staged.push(Entry {
                    parent: node.parent_name().map(String::from),
                    node,
                    pattern,
                });
            }

            if waiting.len() == before {
                let node = &waiting[0];
                return Err(RegistryError::MissingParent {
                    name: node.name().to_string(),
                    parent: node.parent_name().unwrap_or_default().to_string(),
                });
            }
            pending = waiting;
        }

        Ok(Staged {
            entries: staged,
            replaced,
        })
    }

    fn commit(&mut self, staged: Staged) -> usize {
        for name in &staged.replaced {
            if self.entries.remove(name).is_some() {
                debug_log!("Replaced lazy boundary '{}'", name);
            }
        }
        self.order.retain(|n| !staged.replaced.contains(n));

        let added = staged.entries.len();
        for entry in staged.entries {
            trace_log!(
                "Registered state '{}' (url '{}')",
                entry.node.name(),
                entry.pattern.source()
            );
            let name = entry.node.name().to_string();
            self.order.push(name.clone());
            self.entries.insert(name, entry);
        }

        #[cfg(feature = "cache")]
        self.match_cache.get_mut().clear();

        debug_log!("Registered {} states ({} total)", added, self.order.len());
        added
    }

    /// Get a state by name.
    pub fn get(&self, name: &str) -> Option<&StateNode> {
        self.entries.get(name).map(|e| &e.node)
    }

    /// Get a state by name, failing with `StateNotFound`.
    pub fn lookup(&self, name: &str) -> Result<&StateNode, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::StateNotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Parent name of a registered state.
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.entries.get(name)?.parent.as_deref()
    }

    /// The state and all its ancestors, root first.
    pub fn path_to(&self, name: &str) -> Result<Vec<&StateNode>, RegistryError> {
        let mut path = Vec::new();
        let mut current = Some(name);
        while let Some(n) = current {
            let entry = self
                .entries
                .get(n)
                .ok_or_else(|| RegistryError::StateNotFound {
                    name: n.to_string(),
                })?;
            path.push(&entry.node);
            current = entry.parent.as_deref();
        }
        path.reverse();
        Ok(path)
    }

    /// Names from the root down to `name`.
    pub fn ancestors(&self, name: &str) -> Result<Vec<&str>, RegistryError> {
        Ok(self.path_to(name)?.into_iter().map(StateNode::name).collect())
    }

    /// Nearest value of `data[key]` on the state or its ancestors.
    pub fn inherited_data(&self, name: &str, key: &str) -> Option<&str> {
        let mut current = Some(name);
        while let Some(n) = current {
            let entry = self.entries.get(n)?;
            if let Some(value) = entry.node.own_data(key) {
                return Some(value);
            }
            current = entry.parent.as_deref();
        }
        None
    }

    /// Metadata of a state merged with everything it inherits. Nearer
    /// declarations win.
    pub fn effective_data(&self, name: &str) -> Result<HashMap<String, String>, RegistryError> {
        let mut data = HashMap::new();
        for node in self.path_to(name)? {
            for (key, value) in node.data_entries() {
                data.insert(key.to_string(), value.to_string());
            }
        }
        Ok(data)
    }

    /// The most specific registered `.**` boundary whose subtree contains
    /// `name`.
    pub fn find_future_state(&self, name: &str) -> Option<&StateNode> {
        self.order
            .iter()
            .filter_map(|n| self.entries.get(n))
            .map(|e| &e.node)
            .filter(|node| node.covers(name))
            .max_by_key(|node| node.base_name().len())
    }

    /// Full URL pattern of a state.
    pub fn url_of(&self, name: &str) -> Option<&str> {
        let entry = self.entries.get(name)?;
        entry.navigable().then(|| entry.pattern.source())
    }

    /// Match a URL (path plus optional query string) to a state.
    ///
    /// Regular states must match the whole path; lazy boundaries match by
    /// prefix and report [`StateMatch::boundary`]. Query parameters are added
    /// to the captured params; path params win on conflicts.
    pub fn match_url(&self, url: &str) -> Result<StateMatch, RegistryError> {
        #[cfg(feature = "cache")]
        if let Some(found) = self.cache().get(url) {
            return Ok(found);
        }

        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let mut best: Option<(MatchRank, &str, StateParams, bool)> = None;

        for name in &self.order {
            let Some(entry) = self.entries.get(name) else {
                continue;
            };
            if !entry.navigable() {
                continue;
            }
            let exact = !entry.node.is_future();
            let captured = if exact {
                entry.pattern.matches(path)
            } else {
                entry.pattern.matches_prefix(path)
            };
            let Some(params) = captured else {
                continue;
            };

            let rank = entry.pattern.rank(exact);
            if best.as_ref().map_or(true, |(r, ..)| rank > *r) {
                best = Some((rank, name.as_str(), params, exact));
            }
        }

        let Some((_, name, params, exact)) = best else {
            trace_log!("No state matches '{}'", url);
            return Err(RegistryError::UrlNotFound {
                url: url.to_string(),
            });
        };

        let params = StateParams::merge(&StateParams::from_query_string(query), &params);
        let target = TargetState::with_params(name, params);
        let found = if exact {
            StateMatch::exact(target)
        } else {
            StateMatch::boundary(target)
        };

        #[cfg(feature = "cache")]
        self.cache().insert(url.to_string(), found.clone());

        Ok(found)
    }

    /// Build the URL of a state from params.
    pub fn href(&self, name: &str, params: &StateParams) -> Result<String, RegistryError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::StateNotFound {
                name: name.to_string(),
            })?;
        if !entry.navigable() {
            return Err(RegistryError::InvalidUrl {
                name: name.to_string(),
                url: String::new(),
                reason: "state has no url".to_string(),
            });
        }
        entry
            .pattern
            .format(params)
            .map_err(|reason| RegistryError::InvalidUrl {
                name: name.to_string(),
                url: entry.pattern.source().to_string(),
                reason,
            })
    }

    /// All states in registration order.
    pub fn states(&self) -> impl Iterator<Item = &StateNode> {
        self.order
            .iter()
            .filter_map(|n| self.entries.get(n))
            .map(|e| &e.node)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats().clone()
    }

    #[cfg(feature = "cache")]
    fn cache(&self) -> MutexGuard<'_, MatchCache> {
        self.match_cache.lock()
    }
}
