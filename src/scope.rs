//! Per-request scoped state.
//!
//! [`ScopeStore`] attaches key/value state to an in-flight [`Request`]
//! without touching the request itself. Entries are keyed by the request's
//! [`RequestId`](crate::RequestId), never by content, so two concurrent
//! requests cannot see each other's bindings even if their tokens were to
//! coincide.
//!
//! The map is sharded (`DashMap`): a lookup locks one shard for the length
//! of the map operation and hands back an `Arc` clone, so no lock is held
//! while the caller logs or runs handler code.
//!
//! Entries live until [`ScopeStore::release`], or [`ScopeStore::release_id`]
//! once the request itself is gone. A binding that is never
//! released is a leak proportional to request volume.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::request::{Request, RequestId};

type Value = Arc<dyn Any + Send + Sync>;

/// Concurrency-safe map from request identity to that request's bindings.
///
/// ```rust
/// use tsu_trace::{Request, ScopeStore};
/// use http::{Method, Uri};
///
/// let store = ScopeStore::new();
/// let req = Request::new(Method::GET, Uri::from_static("/"));
///
/// store.bind(&req, "user", String::from("alice"));
/// assert_eq!(store.get::<String>(&req, "user").as_deref().map(String::as_str), Some("alice"));
///
/// store.release(&req);
/// assert!(store.get::<String>(&req, "user").is_none());
/// ```
#[derive(Default)]
pub struct ScopeStore {
    entries: DashMap<RequestId, HashMap<&'static str, Value>>,
}

impl ScopeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `req` under `key`, replacing any earlier value.
    pub fn bind<T>(&self, req: &Request, key: &'static str, value: T)
    where
        T: Any + Send + Sync,
    {
        self.entries
            .entry(req.id())
            .or_default()
            .insert(key, Arc::new(value));
    }

    /// Returns the value bound to `req` under `key`.
    ///
    /// `None` when nothing is bound or the value is not a `T`.
    pub fn get<T>(&self, req: &Request, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self.entries.get(&req.id())?.get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Drops every binding for `req`.
    pub fn release(&self, req: &Request) {
        self.release_id(req.id());
    }

    /// Drops every binding for the request with this id.
    ///
    /// For work that outlives the [`Request`], such as a hijacked
    /// connection: keep `req.id()` and release by id when it finishes.
    pub fn release_id(&self, id: RequestId) {
        self.entries.remove(&id);
    }

    /// Whether `req` currently has any bindings.
    pub fn contains(&self, req: &Request) -> bool {
        self.entries.contains_key(&req.id())
    }

    /// Number of requests with live bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
