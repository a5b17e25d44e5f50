//! Live route table owned by the core.
//!
//! Plugins attach handlers here during `register_routes`, and the manager
//! reverses those attachments on unload by exact `(method, path)` match.
//! Keeping the table first-class avoids reaching into a web framework's
//! internal routing stack to remove a handler.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// HTTP-style method for a route entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

/// Identity of a route: the pair the manager removes by on unload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    /// HTTP method.
    pub method: Method,
    /// Exact path, e.g. `/pricing/quote`.
    pub path: String,
}

impl RouteKey {
    /// Create a route key.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into() }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Handler attached to a route. The real HTTP framework is an external
/// collaborator; handlers here map a request body to a response body.
pub type RouteHandler = Arc<dyn Fn(&str) -> String + Send + Sync>;

struct RouteEntry {
    key: RouteKey,
    handler: RouteHandler,
}

/// Mutable routing table with exact-match removal.
#[derive(Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable").field("entries", &self.entries.len()).finish()
    }
}

impl RouteTable {
    /// Create an empty route table.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append a route. Ordering is preserved; duplicates are allowed and
    /// dispatch resolves to the earliest match.
    pub fn add(&mut self, key: RouteKey, handler: RouteHandler) {
        self.entries.push(RouteEntry { key, handler });
    }

    /// Remove every entry matching `(method, path)` exactly.
    ///
    /// Returns the number of entries removed.
    pub fn remove(&mut self, method: Method, path: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !(e.key.method == method && e.key.path == path));
        before - self.entries.len()
    }

    /// Whether a route with this exact key is present.
    pub fn contains(&self, method: Method, path: &str) -> bool {
        self.entries.iter().any(|e| e.key.method == method && e.key.path == path)
    }

    /// Dispatch a request to the first matching handler.
    pub fn dispatch(&self, method: Method, path: &str, body: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|e| e.key.method == method && e.key.path == path)
            .map(|e| (e.handler)(body))
    }

    /// All route keys currently live, in attachment order.
    pub fn keys(&self) -> Vec<RouteKey> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    /// Number of live routes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
