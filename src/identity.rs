//! Participant identities and their directed block relationships
//!
//! An identity outlives every session it takes part in. Sessions hold it by
//! `Arc` (owner) or `Weak` (seated participants) and only ever read the block
//! list; mutation belongs to the account layer.

use crate::types::UserHandle;
use crate::utils::normalize_handle;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Identity shared between the account layer and any number of sessions
pub type SharedIdentity = Arc<Identity>;

/// A registered participant with a directed block list
#[derive(Debug)]
pub struct Identity {
    handle: UserHandle,
    block_list: RwLock<HashSet<String>>,
}

impl Identity {
    /// Create an identity with an empty block list
    pub fn new(handle: impl Into<UserHandle>) -> Self {
        Self {
            handle: handle.into(),
            block_list: RwLock::new(HashSet::new()),
        }
    }

    /// Create an identity already blocking the given handles
    pub fn with_blocked<I, S>(handle: impl Into<UserHandle>, blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identity = Self::new(handle);
        for other in blocked {
            identity.block(other.as_ref());
        }
        identity
    }

    /// Wrap into a shareable handle
    pub fn shared(self) -> SharedIdentity {
        Arc::new(self)
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Add `other` to the block list. Returns false if it was already there.
    pub fn block(&self, other: &str) -> bool {
        self.block_list
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_handle(other))
    }

    /// Remove `other` from the block list. Returns false if it was not there.
    pub fn unblock(&self, other: &str) -> bool {
        self.block_list
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalize_handle(other))
    }

    /// Whether this identity blocks the given handle
    pub fn blocks(&self, other: &str) -> bool {
        self.block_list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&normalize_handle(other))
    }

    /// Whether `other` blocks this identity, judged by `other`'s own list
    pub fn is_blocked_by(&self, other: &Identity) -> bool {
        other.blocks(&self.handle)
    }

    /// Sorted snapshot of blocked handles
    pub fn blocked_users(&self) -> Vec<String> {
        let mut blocked: Vec<String> = self
            .block_list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        blocked.sort();
        blocked
    }
}
