//! Policy storage backends
//!
//! The engine consumes storage through the [`PolicyStore`] trait so any
//! backend with two guarantees is substitutable: a uniqueness constraint on
//! the policy name, and enumeration in insertion order. Two implementations
//! ship here:
//!
//! - [`SqliteStore`] — the durable backend (WAL-mode SQLite)
//! - [`MemoryStore`] — in-memory, for tests and short-lived embedding

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::core::error::Result;
use crate::core::policy::Policy;

/// Durable, queryable collection of policy records
///
/// Implementations are internally synchronized: `insert` is serialized
/// against other inserts (a check-then-insert race can never produce two
/// policies with the same name), and reads never block other readers.
pub trait PolicyStore: Send + Sync {
    /// Insert a new policy
    ///
    /// Fails with `DuplicateName` if a policy with the same name already
    /// exists; the rejection is atomic and leaves no partial write behind.
    /// On success the record is visible to every subsequent `list_all`.
    fn insert(&self, policy: &Policy) -> Result<()>;

    /// Every stored policy, in insertion order
    ///
    /// The order is stable across calls as long as no insert intervenes.
    /// It is load-bearing: first-match-wins evaluation uses it as the
    /// tie-break for overlapping policies.
    fn list_all(&self) -> Result<Vec<Policy>>;

    /// Look up a single policy by name
    fn get(&self, name: &str) -> Result<Option<Policy>>;

    /// Number of stored policies
    fn len(&self) -> Result<usize>;

    /// Whether the store holds no policies
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
