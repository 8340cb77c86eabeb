//! In-memory policy store
//!
//! Satisfies the full store contract without durability. Used by the test
//! suite and by embedders that load policies at startup and never persist.

use parking_lot::RwLock;
use std::collections::HashSet;

use crate::core::error::{AuthzError, Result};
use crate::core::policy::Policy;
use crate::core::store::PolicyStore;

/// Non-durable [`PolicyStore`] backed by a vector in insertion order
///
/// # Examples
///
/// ```
/// use turnstile_rs::{Effect, MemoryStore, Policy, PolicyStore};
///
/// let store = MemoryStore::new();
/// store.insert(&Policy::new("p1", Effect::Allow, "role=admin", "type=doc", "read")?)?;
///
/// assert_eq!(store.len()?, 1);
/// assert!(store.insert(&Policy::new("p1", Effect::Deny, "a=b", "c=d", "write")?).is_err());
/// # Ok::<(), turnstile_rs::AuthzError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    // Insertion order is the enumeration order; the set is the name index.
    policies: Vec<Policy>,
    names: HashSet<String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        MemoryStore {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl PolicyStore for MemoryStore {
    fn insert(&self, policy: &Policy) -> Result<()> {
        let mut inner = self.inner.write();
        // Check and append under one write lock: atomic check-and-insert.
        if !inner.names.insert(policy.name.clone()) {
            return Err(AuthzError::DuplicateName {
                name: policy.name.clone(),
            });
        }
        inner.policies.push(policy.clone());
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Policy>> {
        Ok(self.inner.read().policies.clone())
    }

    fn get(&self, name: &str) -> Result<Option<Policy>> {
        Ok(self
            .inner
            .read()
            .policies
            .iter()
            .find(|p| p.name == name)
            .cloned())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.inner.read().policies.len())
    }
}
