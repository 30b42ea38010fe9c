//! In-process identity cache for users.
//!
//! Users are indexed twice, by internal id and by external `gid`, and both
//! indexes are bounded LRUs. An epoch counter guards against a reader that
//! started before an invalidation writing its now-stale row back afterwards.

use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::Mutex;

use dumpnote_core::{defaults, User};

struct Inner {
    by_id: LruCache<i64, User>,
    by_gid: LruCache<String, i64>,
    epoch: u64,
}

/// Bounded cache of resolved users keyed by id and by gid.
pub struct IdentityCache {
    inner: Mutex<Inner>,
}

impl IdentityCache {
    /// Create a cache holding at most `capacity` users. A zero capacity falls
    /// back to the default.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(defaults::USER_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                by_id: LruCache::new(capacity),
                by_gid: LruCache::new(capacity),
                epoch: 0,
            }),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Option<User> {
        self.inner.lock().await.by_id.get(&id).cloned()
    }

    pub async fn get_by_gid(&self, gid: &str) -> Option<User> {
        let mut inner = self.inner.lock().await;
        let id = *inner.by_gid.get(gid)?;
        inner.by_id.get(&id).cloned()
    }

    /// Current epoch. Capture it before reading storage and hand it to
    /// [`IdentityCache::insert_if_current`] afterwards.
    pub async fn epoch(&self) -> u64 {
        self.inner.lock().await.epoch
    }

    /// Insert unconditionally, e.g. right after creating the user.
    pub async fn insert(&self, user: User) {
        let mut inner = self.inner.lock().await;
        Self::put(&mut inner, user);
    }

    /// Insert only if nothing was invalidated since `epoch` was read.
    /// Returns whether the user was cached.
    pub async fn insert_if_current(&self, user: User, epoch: u64) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            return false;
        }
        Self::put(&mut inner, user);
        true
    }

    /// Drop a user from both indexes.
    pub async fn invalidate(&self, id: i64) {
        let mut inner = self.inner.lock().await;
        inner.epoch = inner.epoch.wrapping_add(1);
        if let Some(user) = inner.by_id.pop(&id) {
            inner.by_gid.pop(&user.gid);
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn put(inner: &mut Inner, user: User) {
        // `push` hands back either the LRU victim or the replaced entry.
        if let Some((_, evicted)) = inner.by_id.push(user.id, user.clone()) {
            if evicted.gid != user.gid {
                inner.by_gid.pop(&evicted.gid);
            }
        }
        inner.by_gid.put(user.gid, user.id);
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new(defaults::USER_CACHE_CAPACITY)
    }
}
