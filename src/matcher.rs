//! URL pattern compilation and matching.
//!
//! Patterns are plain segment lists:
//!
//! - `contacts`: literal, must match exactly
//! - `:contactId` or `{contactId}`: captures one segment
//! - `{contactId:int}`: captures one all-digit segment
//! - a trailing `?sort&page` declares query parameters (used by
//!   [`UrlPattern::format`]; any query string is accepted when matching)
//!
//! A state's full pattern is its ancestors' URLs joined with its own (see
//! [`UrlPattern::join`]). When several patterns match, the one with the
//! highest [`MatchRank`] wins: exact matches beat boundary prefixes, then
//! more literal segments beat fewer.

use crate::params::{decode_component, encode_component, StateParams};
use std::collections::HashSet;

/// A single path segment of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text
    Static(String),
    /// Captured value
    Param {
        name: String,
        constraint: Option<Constraint>,
    },
}

impl Segment {
    fn parse(raw: &str) -> Result<Self, String> {
        let param = raw
            .strip_prefix(':')
            .or_else(|| raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')));

        let Some(body) = param else {
            if raw.contains(['{', '}']) {
                return Err(format!("malformed parameter segment '{}'", raw));
            }
            return Ok(Segment::Static(raw.to_string()));
        };

        let (name, constraint) = match body.split_once(':') {
            Some((name, kind)) => (name, Some(Constraint::parse(kind)?)),
            None => (body, None),
        };

        if name.is_empty() {
            return Err("parameter name cannot be empty".to_string());
        }
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(format!(
                "parameter '{}' must contain only alphanumeric characters and underscores",
                name
            ));
        }

        Ok(Segment::Param {
            name: name.to_string(),
            constraint,
        })
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Segment::Static(expected) => expected == value,
            Segment::Param { constraint, .. } => {
                constraint.as_ref().map_or(true, |c| c.validate(value))
            }
        }
    }
}

/// Value constraint on a parameter segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// `{id:int}`: ASCII digits only
    Int,
}

impl Constraint {
    fn parse(kind: &str) -> Result<Self, String> {
        match kind {
            "int" => Ok(Constraint::Int),
            other => Err(format!("unknown parameter type '{}'", other)),
        }
    }

    pub fn validate(&self, value: &str) -> bool {
        match self {
            Constraint::Int => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        }
    }
}

/// Ordering key between competing matches. Greater is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchRank {
    exact: bool,
    static_segments: usize,
    segments: usize,
}

/// Compiled URL pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    source: String,
    segments: Vec<Segment>,
    query: Vec<String>,
}

impl UrlPattern {
    /// Compile a pattern.
    ///
    /// Rejects consecutive slashes, empty or non-alphanumeric parameter
    /// names, unknown parameter types and duplicate parameter names.
    ///
    /// ```
    /// use state_router::matcher::UrlPattern;
    ///
    /// let pattern = UrlPattern::parse("/contacts/:contactId").unwrap();
    /// let params = pattern.matches("/contacts/42").unwrap();
    /// assert_eq!(params.get("contactId"), Some("42"));
    ///
    /// assert!(UrlPattern::parse("/a/:id/b/:id").is_err());
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let (path, query) = pattern.split_once('?').unwrap_or((pattern, ""));

        if path.contains("//") {
            return Err("url cannot contain consecutive slashes".to_string());
        }

        let segments = split_path(path)
            .into_iter()
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let query: Vec<String> = query
            .split('&')
            .filter(|q| !q.is_empty())
            .map(String::from)
            .collect();

        let mut seen = HashSet::new();
        let param_names = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param { name, .. } => Some(name.as_str()),
                Segment::Static(_) => None,
            })
            .chain(query.iter().map(String::as_str));
        for name in param_names {
            if !seen.insert(name) {
                return Err(format!("duplicate parameter '{}'", name));
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            query,
        })
    }

    /// Append a child pattern to this one.
    ///
    /// ```
    /// use state_router::matcher::UrlPattern;
    ///
    /// let parent = UrlPattern::parse("/mymessages?sort").unwrap();
    /// let full = parent.join("/:folderId").unwrap();
    /// assert_eq!(full.source(), "/mymessages/:folderId?sort");
    /// ```
    pub fn join(&self, child: &str) -> Result<Self, String> {
        let (parent_path, parent_query) =
            self.source.split_once('?').unwrap_or((self.source.as_str(), ""));
        let (child_path, child_query) = child.split_once('?').unwrap_or((child, ""));

        let mut joined = parent_path.trim_end_matches('/').to_string();
        if !child_path.is_empty() && !child_path.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(child_path);

        let query: Vec<&str> = [parent_query, child_query]
            .into_iter()
            .filter(|q| !q.is_empty())
            .collect();
        if !query.is_empty() {
            joined.push('?');
            joined.push_str(&query.join("&"));
        }

        Self::parse(&joined)
    }

    /// The pattern text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match the whole path. Trailing slashes are ignored.
    pub fn matches(&self, path: &str) -> Option<StateParams> {
        let parts = split_path(path);
        if parts.len() != self.segments.len() {
            return None;
        }
        self.capture(&parts)
    }

    /// Match this pattern as a prefix of `path`.
    pub fn matches_prefix(&self, path: &str) -> Option<StateParams> {
        let parts = split_path(path);
        if parts.len() < self.segments.len() {
            return None;
        }
        self.capture(&parts[..self.segments.len()])
    }

    fn capture(&self, parts: &[&str]) -> Option<StateParams> {
        let mut params = StateParams::new();
        for (segment, value) in self.segments.iter().zip(parts) {
            if !segment.accepts(value) {
                return None;
            }
            if let Segment::Param { name, .. } = segment {
                params.insert(name.as_str(), decode_component(value));
            }
        }
        Some(params)
    }

    /// Rank of a match against this pattern.
    pub fn rank(&self, exact: bool) -> MatchRank {
        MatchRank {
            exact,
            static_segments: self
                .segments
                .iter()
                .filter(|s| matches!(s, Segment::Static(_)))
                .count(),
            segments: self.segments.len(),
        }
    }

    /// Build a URL from `params`.
    ///
    /// Every path parameter must be present; declared query parameters are
    /// appended when present.
    pub fn format(&self, params: &StateParams) -> Result<String, String> {
        let mut url = String::new();
        for segment in &self.segments {
            url.push('/');
            match segment {
                Segment::Static(text) => url.push_str(text),
                Segment::Param { name, constraint } => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| format!("missing parameter '{}'", name))?;
                    if let Some(c) = constraint {
                        if !c.validate(value) {
                            return Err(format!("invalid value '{}' for '{}'", value, name));
                        }
                    }
                    url.push_str(&encode_component(value));
                }
            }
        }
        if url.is_empty() {
            url.push('/');
        }

        let query: StateParams = self
            .query
            .iter()
            .filter_map(|name| params.get(name).map(|v| (name.as_str(), v)))
            .collect();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.to_query_string());
        }
        Ok(url)
    }
}

/// Split a path into non-empty segments.
///
/// ```
/// use state_router::matcher::split_path;
///
/// assert_eq!(split_path("/contacts/42/"), vec!["contacts", "42"]);
/// assert!(split_path("/").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
