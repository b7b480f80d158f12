//! Keyed mutual exclusion.
//!
//! A [`LockSet`] hands out at most one live token per key at a time,
//! independent of the rest of the system's threading model. Alert evaluation
//! serializes per rule key through a shared `LockSet`: an evaluation that
//! cannot take its key skips the cycle rather than queueing behind the
//! holder.
//!
//! Release is token-checked: releasing with a stale token (after a
//! force-release, or from a duplicated cleanup path) is a logged no-op
//! instead of stealing the key from the current holder.

use std::collections::HashMap;

use parking_lot::{Condvar, Mutex};
use tracing::warn;
use uuid::Uuid;

/// Opaque proof of a single acquisition.
///
/// Tokens are never reused; a token from a previous acquisition of the same
/// key does not release the current holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(Uuid);

/// Keyed mutual-exclusion primitive with linearizable per-key semantics.
///
/// Safe to share across threads; all methods take `&self`.
#[derive(Debug, Default)]
pub struct LockSet {
    holders: Mutex<HashMap<String, Uuid>>,
    released: Condvar,
}

impl LockSet {
    /// Creates an empty lock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, blocking until it is free.
    #[must_use]
    pub fn acquire(&self, key: &str) -> LockToken {
        let mut holders = self.holders.lock();
        while holders.contains_key(key) {
            self.released.wait(&mut holders);
        }
        let id = Uuid::new_v4();
        holders.insert(key.to_string(), id);
        LockToken(id)
    }

    /// Acquires the lock for `key` without blocking.
    ///
    /// Returns `None` when the key is currently held.
    #[must_use]
    pub fn try_acquire(&self, key: &str) -> Option<LockToken> {
        let mut holders = self.holders.lock();
        if holders.contains_key(key) {
            return None;
        }
        let id = Uuid::new_v4();
        holders.insert(key.to_string(), id);
        Some(LockToken(id))
    }

    /// Releases `key` if `token` matches the current holder.
    ///
    /// Returns `false` (and leaves the lock untouched) on a token mismatch
    /// or when the key is not held.
    pub fn release(&self, key: &str, token: &LockToken) -> bool {
        let mut holders = self.holders.lock();
        match holders.get(key) {
            Some(current) if *current == token.0 => {
                holders.remove(key);
                self.released.notify_all();
                true
            }
            Some(_) => {
                warn!(key = %key, "ignoring release with mismatched token");
                false
            }
            None => false,
        }
    }

    /// Returns `true` if `key` currently has a holder.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.holders.lock().contains_key(key)
    }

    /// Non-blocking acquisition wrapped in a guard that releases on drop.
    ///
    /// This is the form the alert evaluator uses: the guard guarantees the
    /// key is released on every exit path of an evaluation cycle.
    #[must_use]
    pub fn try_acquire_guard(&self, key: &str) -> Option<KeyGuard<'_>> {
        self.try_acquire(key).map(|token| KeyGuard { locks: self, key: key.to_string(), token })
    }

    /// Blocking acquisition wrapped in a guard that releases on drop.
    #[must_use]
    pub fn acquire_guard(&self, key: &str) -> KeyGuard<'_> {
        let token = self.acquire(key);
        KeyGuard { locks: self, key: key.to_string(), token }
    }
}

/// RAII holder of one key in a [`LockSet`]; releases on drop.
pub struct KeyGuard<'a> {
    locks: &'a LockSet,
    key: String,
    token: LockToken,
}

impl KeyGuard<'_> {
    /// The key this guard holds.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The acquisition token backing this guard.
    #[must_use]
    pub fn token(&self) -> &LockToken {
        &self.token
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let _ = self.locks.release(&self.key, &self.token);
    }
}
