//! Core policy model and evaluation
//!
//! - [`error`] - Error types for authorization operations
//! - [`attrs`] - Typed attribute values and attribute maps
//! - [`policy`] - Policies, effects, and equality conditions
//! - [`store`] - Policy storage (in-memory and SQLite)
//! - [`engine`] - First-match-wins evaluation over a store
//! - [`cache`] - LRU decision cache
//! - [`audit`] - Decision audit trail

pub mod attrs;
pub mod audit;
pub mod cache;
pub mod engine;
pub mod error;
pub mod policy;
pub mod store;

pub use attrs::{AttrValue, Attributes};
pub use audit::{AuditLog, AuditRecord};
pub use cache::DecisionCache;
pub use engine::{AccessRequest, Decision, DecisionEngine, Evaluation};
pub use error::{AuthzError, Result};
pub use policy::{Condition, Effect, Policy};
pub use store::{MemoryStore, PolicyStore, SqliteStore};
