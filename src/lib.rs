//! # Turnstile - Attribute-Based Access Control
//!
//! `turnstile-rs` provides a small, predictable authorization engine: named
//! allow/deny policies over subject and resource attributes, evaluated
//! first-match-wins in creation order, with deny as the default.
//!
//! ## Features
//!
//! - **Named policies** with a single subject condition, a single resource
//!   condition, and an exact-match action
//! - **First-match-wins** evaluation in policy creation order
//! - **Default deny** when no policy matches
//! - **Typed attributes** (bool, int, float, string) compared against rule
//!   values through one canonical string rendering
//! - **Durable SQLite store** or in-memory store, behind one trait
//! - **Optional LRU decision cache** and bounded audit trail
//!
//! ## Quick Start
//!
//! ```rust
//! use turnstile_rs::{Attributes, Effect, Turnstile};
//!
//! let turnstile = Turnstile::in_memory();
//! turnstile.create_policy("admin-read", Effect::Allow, "role=admin", "type=doc", "read")?;
//!
//! let subject = Attributes::from([("role", "admin")]);
//! let resource = Attributes::from([("type", "doc")]);
//!
//! assert!(turnstile.authorize(&subject, &resource, "read")?.is_allowed());
//! assert!(!turnstile.authorize(&subject, &resource, "delete")?.is_allowed());
//! # Ok::<(), turnstile_rs::AuthzError>(())
//! ```
//!
//! ## Advanced Usage
//!
//! ```rust,no_run
//! use turnstile_rs::TurnstileBuilder;
//!
//! // Use builder for custom configuration
//! let turnstile = TurnstileBuilder::new()
//!     .path("/data/policies.db")  // Durable store
//!     .with_decision_cache(1024)
//!     .with_audit_log(4096)
//!     .build()?;
//! # Ok::<(), turnstile_rs::AuthzError>(())
//! ```

pub mod core;

// Re-export core types that users need
pub use crate::core::{
    attrs::{AttrValue, Attributes},
    audit::{AuditLog, AuditRecord},
    cache::DecisionCache,
    engine::{AccessRequest, Decision, DecisionEngine, Evaluation},
    error::{AuthzError, Result},
    policy::{Condition, Effect, Policy},
    store::{MemoryStore, PolicyStore, SqliteStore},
};

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How often an enabled audit log drains to its sink once started
const DEFAULT_AUDIT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// High-level authorization API
///
/// This is a wrapper around [`DecisionEngine`] and a [`PolicyStore`] that
/// provides:
/// - Sensible defaults
/// - Policy creation with up-front rule validation
/// - Optional decision caching and audit logging
///
/// All methods take `&self`; a `Turnstile` can be shared across threads
/// behind an `Arc`.
///
/// # Examples
///
/// ```rust
/// use turnstile_rs::{Attributes, Effect, Result, Turnstile};
///
/// # fn main() -> Result<()> {
/// let turnstile = Turnstile::in_memory();
/// turnstile.create_policy("admin-read", Effect::Allow, "role=admin", "type=doc", "read")?;
///
/// let decision = turnstile.authorize(
///     &Attributes::from([("role", "admin")]),
///     &Attributes::from([("type", "doc")]),
///     "read",
/// )?;
/// assert!(decision.is_allowed());
/// # Ok(())
/// # }
/// ```
pub struct Turnstile {
    store: Arc<dyn PolicyStore>,
    engine: DecisionEngine,
    cache: Option<Mutex<DecisionCache>>,
    audit: Option<AuditLog>,
}

impl std::fmt::Debug for Turnstile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Turnstile").finish_non_exhaustive()
    }
}

impl Turnstile {
    /// Create an authorizer over a fresh in-memory store
    ///
    /// Policies live only as long as the instance. Use [`Turnstile::open`]
    /// for a durable store.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use turnstile_rs::Turnstile;
    ///
    /// let turnstile = Turnstile::in_memory();
    /// assert_eq!(turnstile.policy_count()?, 0);
    /// # Ok::<(), turnstile_rs::AuthzError>(())
    /// ```
    pub fn in_memory() -> Self {
        info!("Creating in-memory authorizer");
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Open (creating if needed) an authorizer over a SQLite store
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use turnstile_rs::Turnstile;
    ///
    /// let turnstile = Turnstile::open("policies.db")?;
    /// # Ok::<(), turnstile_rs::AuthzError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening authorizer at {:?}", path.as_ref());
        let store = SqliteStore::open(path)?;
        Ok(Self::with_store(Arc::new(store)))
    }

    /// Create an authorizer over an injected store handle
    ///
    /// The store is shared, not consumed: several authorizers (or other
    /// components) can evaluate against the same policies.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use turnstile_rs::{MemoryStore, Turnstile};
    ///
    /// let store = Arc::new(MemoryStore::new());
    /// let turnstile = Turnstile::with_store(store.clone());
    /// ```
    pub fn with_store(store: Arc<dyn PolicyStore>) -> Self {
        Turnstile {
            engine: DecisionEngine::new(Arc::clone(&store)),
            store,
            cache: None,
            audit: None,
        }
    }

    /// Validate and store a new policy
    ///
    /// The rule strings must each contain exactly one `=`; a name already
    /// in use is rejected without changing the store. Later evaluations see
    /// the policy after every existing one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use turnstile_rs::{AuthzError, Effect, Turnstile};
    ///
    /// let turnstile = Turnstile::in_memory();
    /// turnstile.create_policy("admin-read", Effect::Allow, "role=admin", "type=doc", "read")?;
    ///
    /// let err = turnstile
    ///     .create_policy("admin-read", Effect::Deny, "role=guest", "type=doc", "read")
    ///     .unwrap_err();
    /// assert!(matches!(err, AuthzError::DuplicateName { .. }));
    /// # Ok::<(), turnstile_rs::AuthzError>(())
    /// ```
    pub fn create_policy(
        &self,
        name: &str,
        effect: Effect,
        subject_rule: &str,
        resource_rule: &str,
        action: &str,
    ) -> Result<()> {
        let policy = Policy::new(name, effect, subject_rule, resource_rule, action)?;
        self.add_policy(policy)
    }

    /// Store a [`Policy`] built elsewhere, e.g. one parsed from JSON
    ///
    /// Rule strings are valid by construction; the name gets the same
    /// blank check as [`create_policy`](Self::create_policy), since a
    /// policy assembled field-by-field can carry one.
    pub fn add_policy(&self, policy: Policy) -> Result<()> {
        if policy.name.trim().is_empty() {
            return Err(AuthzError::InvalidPolicyName(policy.name));
        }
        info!(
            name = %policy.name,
            effect = %policy.effect,
            action = %policy.action,
            "Creating policy"
        );
        self.store.insert(&policy)?;

        // New policies can change outcomes, including cached default denies
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }
        Ok(())
    }

    /// Evaluate a request and return the decision
    ///
    /// Policies are scanned in creation order; the first one whose action
    /// and both conditions match decides. No match means deny. Storage
    /// failures surface as errors, never as a deny.
    pub fn authorize(
        &self,
        subject: &Attributes,
        resource: &Attributes,
        action: &str,
    ) -> Result<Decision> {
        Ok(self.explain(subject, resource, action)?.decision)
    }

    /// Evaluate a prebuilt [`AccessRequest`]
    pub fn authorize_request(&self, request: &AccessRequest) -> Result<Decision> {
        self.authorize(&request.subject, &request.resource, &request.action)
    }

    /// Evaluate a request and report which policy decided it
    ///
    /// Consults the decision cache when one is configured and records the
    /// outcome in the audit log when one is configured, cache hit or not.
    pub fn explain(
        &self,
        subject: &Attributes,
        resource: &Attributes,
        action: &str,
    ) -> Result<Evaluation> {
        let evaluation = match &self.cache {
            Some(cache) => {
                let key = DecisionCache::fingerprint(subject, resource, action)?;
                let (cached, generation) = {
                    let mut guard = cache.lock();
                    (guard.get(&key), guard.generation())
                };
                match cached {
                    Some(hit) => {
                        debug!(action, decision = %hit.decision, "Decision served from cache");
                        hit
                    }
                    None => {
                        // The store read runs outside the cache lock, so a
                        // policy insert can land (and clear) in between; the
                        // generation check keeps that result out of the cache.
                        let fresh = self.engine.explain(subject, resource, action)?;
                        cache.lock().put(generation, key, fresh.clone());
                        fresh
                    }
                }
            }
            None => self.engine.explain(subject, resource, action)?,
        };

        if let Some(audit) = &self.audit {
            audit.log(AuditRecord::new(
                action,
                evaluation.decision,
                evaluation.matched.clone(),
            ));
        }

        Ok(evaluation)
    }

    /// All policies in creation (evaluation) order
    pub fn list_policies(&self) -> Result<Vec<Policy>> {
        self.store.list_all()
    }

    /// Look up a policy by name
    pub fn get_policy(&self, name: &str) -> Result<Option<Policy>> {
        self.store.get(name)
    }

    /// Number of stored policies
    pub fn policy_count(&self) -> Result<usize> {
        self.store.len()
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> Arc<dyn PolicyStore> {
        Arc::clone(&self.store)
    }

    /// The audit log, if one was configured
    pub fn audit(&self) -> Option<&AuditLog> {
        self.audit.as_ref()
    }

    /// Mutable audit log access, for starting or stopping its drain thread
    pub fn audit_mut(&mut self) -> Option<&mut AuditLog> {
        self.audit.as_mut()
    }
}

/// Builder for customizing [`Turnstile`] creation
///
/// Provides a fluent API for configuring the store backend, the decision
/// cache, and the audit log. Without a path or injected store the built
/// instance uses a fresh in-memory store.
///
/// # Examples
///
/// ```rust,no_run
/// use turnstile_rs::TurnstileBuilder;
///
/// # fn main() -> turnstile_rs::Result<()> {
/// let turnstile = TurnstileBuilder::new()
///     .path("/data/policies.db")
///     .read_pool_size(2)
///     .with_decision_cache(1024)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct TurnstileBuilder {
    path: Option<PathBuf>,
    store: Option<Arc<dyn PolicyStore>>,
    read_pool_size: Option<usize>,
    cache_capacity: Option<usize>,
    audit_capacity: Option<usize>,
}

impl TurnstileBuilder {
    /// Create a new TurnstileBuilder with default settings
    pub fn new() -> Self {
        TurnstileBuilder {
            path: None,
            store: None,
            read_pool_size: None,
            cache_capacity: None,
            audit_capacity: None,
        }
    }

    /// Back the instance with a SQLite database at this path
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Back the instance with an injected store handle
    pub fn store(mut self, store: Arc<dyn PolicyStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Number of read connections for a SQLite store (clamped to 1..=8)
    pub fn read_pool_size(mut self, size: usize) -> Self {
        self.read_pool_size = Some(size);
        self
    }

    /// Cache up to `capacity` decisions per distinct request
    pub fn with_decision_cache(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Record evaluations in a bounded audit log of `capacity` records
    pub fn with_audit_log(mut self, capacity: usize) -> Self {
        self.audit_capacity = Some(capacity);
        self
    }

    /// Build the Turnstile instance
    pub fn build(self) -> Result<Turnstile> {
        let store: Arc<dyn PolicyStore> = match (self.store, self.path) {
            (Some(_), Some(_)) => {
                return Err(AuthzError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path and store are mutually exclusive",
                )));
            }
            (Some(store), None) => store,
            (None, Some(path)) => {
                let store = match self.read_pool_size {
                    Some(size) => SqliteStore::open_with_readers(&path, size)?,
                    None => SqliteStore::open(&path)?,
                };
                Arc::new(store)
            }
            (None, None) => Arc::new(MemoryStore::new()),
        };

        let mut turnstile = Turnstile::with_store(store);

        if let Some(capacity) = self.cache_capacity {
            turnstile.cache = Some(Mutex::new(DecisionCache::new(capacity)));
            debug!(capacity, "Decision cache enabled");
        }

        if let Some(capacity) = self.audit_capacity {
            turnstile.audit = Some(AuditLog::new(capacity, DEFAULT_AUDIT_FLUSH_INTERVAL));
            debug!(capacity, "Audit logging enabled");
        }

        Ok(turnstile)
    }
}

impl Default for TurnstileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_create_and_authorize() -> Result<()> {
        let turnstile = Turnstile::in_memory();
        turnstile.create_policy("admin-read", Effect::Allow, "role=admin", "type=doc", "read")?;

        let subject = attrs(&[("role", "admin")]);
        let resource = attrs(&[("type", "doc")]);

        assert!(turnstile.authorize(&subject, &resource, "read")?.is_allowed());
        assert!(!turnstile.authorize(&subject, &resource, "write")?.is_allowed());

        Ok(())
    }

    #[test]
    fn test_duplicate_name_leaves_store_unchanged() -> Result<()> {
        let turnstile = Turnstile::in_memory();
        turnstile.create_policy("p", Effect::Allow, "role=admin", "type=doc", "read")?;

        let err = turnstile
            .create_policy("p", Effect::Deny, "role=guest", "type=img", "write")
            .unwrap_err();
        assert!(matches!(err, AuthzError::DuplicateName { name } if name == "p"));

        assert_eq!(turnstile.policy_count()?, 1);
        let kept = turnstile.get_policy("p")?.unwrap();
        assert_eq!(kept.effect, Effect::Allow);

        Ok(())
    }

    #[test]
    fn test_malformed_rule_rejected_up_front() {
        let turnstile = Turnstile::in_memory();

        let err = turnstile
            .create_policy("p", Effect::Allow, "role-admin", "type=doc", "read")
            .unwrap_err();
        assert!(matches!(err, AuthzError::MalformedRule { .. }));
        assert_eq!(turnstile.policy_count().unwrap(), 0);
    }

    #[test]
    fn test_blank_name_rejected_even_when_hand_assembled() {
        let turnstile = Turnstile::in_memory();
        let template = Policy::new("good", Effect::Allow, "role=admin", "type=doc", "read").unwrap();

        // Struct update sidesteps Policy::new, so add_policy must catch it
        let err = turnstile
            .add_policy(Policy {
                name: "  ".into(),
                ..template
            })
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicyName(_)));
        assert_eq!(turnstile.policy_count().unwrap(), 0);
    }

    #[test]
    fn test_builder_defaults_to_in_memory() -> Result<()> {
        let turnstile = TurnstileBuilder::new().build()?;
        assert_eq!(turnstile.policy_count()?, 0);
        Ok(())
    }

    #[test]
    fn test_builder_rejects_path_and_store() {
        let err = TurnstileBuilder::new()
            .path("/tmp/unused.db")
            .store(Arc::new(MemoryStore::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, AuthzError::Io(_)));
    }

    #[test]
    fn test_cache_cleared_on_policy_creation() -> Result<()> {
        let turnstile = TurnstileBuilder::new().with_decision_cache(64).build()?;
        let subject = attrs(&[("role", "admin")]);
        let resource = attrs(&[("type", "doc")]);

        // Caches the default deny
        assert!(!turnstile.authorize(&subject, &resource, "read")?.is_allowed());

        turnstile.create_policy("late", Effect::Allow, "role=admin", "type=doc", "read")?;

        // A stale cache would still deny here
        assert!(turnstile.authorize(&subject, &resource, "read")?.is_allowed());

        Ok(())
    }

    #[test]
    fn test_cache_hit_preserves_matched_policy() -> Result<()> {
        let turnstile = TurnstileBuilder::new().with_decision_cache(64).build()?;
        turnstile.create_policy("p", Effect::Allow, "role=admin", "type=doc", "read")?;

        let subject = attrs(&[("role", "admin")]);
        let resource = attrs(&[("type", "doc")]);

        let first = turnstile.explain(&subject, &resource, "read")?;
        let second = turnstile.explain(&subject, &resource, "read")?;
        assert_eq!(first, second);
        assert_eq!(second.matched.as_deref(), Some("p"));

        Ok(())
    }

    #[test]
    fn test_audit_records_every_evaluation() -> Result<()> {
        let turnstile = TurnstileBuilder::new()
            .with_decision_cache(64)
            .with_audit_log(16)
            .build()?;
        turnstile.create_policy("p", Effect::Allow, "role=admin", "type=doc", "read")?;

        let subject = attrs(&[("role", "admin")]);
        let resource = attrs(&[("type", "doc")]);

        turnstile.authorize(&subject, &resource, "read")?;
        turnstile.authorize(&subject, &resource, "read")?; // cache hit
        turnstile.authorize(&subject, &resource, "delete")?;

        let audit = turnstile.audit().unwrap();
        let records = audit.recent(10);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].matched.as_deref(), Some("p"));
        assert_eq!(records[1].matched.as_deref(), Some("p"));
        assert_eq!(records[2].decision, Decision::Deny);
        assert_eq!(records[2].matched, None);

        Ok(())
    }

    #[test]
    fn test_injected_store_is_shared() -> Result<()> {
        let store: Arc<dyn PolicyStore> = Arc::new(MemoryStore::new());

        let writer = Turnstile::with_store(Arc::clone(&store));
        let reader = Turnstile::with_store(store);

        writer.create_policy("p", Effect::Allow, "role=admin", "type=doc", "read")?;

        assert!(reader
            .authorize(&attrs(&[("role", "admin")]), &attrs(&[("type", "doc")]), "read")?
            .is_allowed());

        Ok(())
    }

    #[test]
    fn test_open_persists_across_instances() -> Result<()> {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("policies.db");

        {
            let turnstile = Turnstile::open(&path)?;
            turnstile.create_policy("p", Effect::Allow, "role=admin", "type=doc", "read")?;
        }

        let reopened = Turnstile::open(&path)?;
        assert_eq!(reopened.policy_count()?, 1);
        assert!(reopened
            .authorize(&attrs(&[("role", "admin")]), &attrs(&[("type", "doc")]), "read")?
            .is_allowed());

        Ok(())
    }
}
