//! Decision engine
//!
//! Evaluates access requests against the stored policies, first match
//! wins: policies are scanned in insertion order and the first one whose
//! action and both conditions match decides the outcome. No match means
//! [`Decision::Deny`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::core::attrs::Attributes;
use crate::core::error::Result;
use crate::core::policy::Effect;
use crate::core::store::PolicyStore;

/// One access request: who, what, and which operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequest {
    pub subject: Attributes,
    pub resource: Attributes,
    pub action: String,
}

impl AccessRequest {
    pub fn new(subject: Attributes, resource: Attributes, action: impl Into<String>) -> Self {
        AccessRequest {
            subject,
            resource,
            action: action.into(),
        }
    }
}

/// Outcome of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Effect> for Decision {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Allow => Decision::Allow,
            Effect::Deny => Decision::Deny,
        }
    }
}

/// Evaluation outcome plus the name of the policy that produced it
///
/// `matched` is `None` when no policy applied and the default deny fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub decision: Decision,
    pub matched: Option<String>,
}

/// Policy evaluator over an injected [`PolicyStore`]
///
/// The engine holds no policy state of its own; every evaluation reads
/// the current policy list from the store, so storage failures surface
/// as errors rather than degrading into a deny.
pub struct DecisionEngine {
    store: Arc<dyn PolicyStore>,
}

impl DecisionEngine {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        DecisionEngine { store }
    }

    /// Evaluate a request, returning only the decision
    pub fn evaluate(
        &self,
        subject: &Attributes,
        resource: &Attributes,
        action: &str,
    ) -> Result<Decision> {
        Ok(self.explain(subject, resource, action)?.decision)
    }

    /// Evaluate a prebuilt [`AccessRequest`]
    pub fn evaluate_request(&self, request: &AccessRequest) -> Result<Decision> {
        self.evaluate(&request.subject, &request.resource, &request.action)
    }

    /// Evaluate a request and report which policy decided it
    pub fn explain(
        &self,
        subject: &Attributes,
        resource: &Attributes,
        action: &str,
    ) -> Result<Evaluation> {
        for policy in self.store.list_all()? {
            if policy.matches(subject, resource, action) {
                let decision = Decision::from(policy.effect);
                debug!(action, policy = %policy.name, %decision, "Policy matched");
                return Ok(Evaluation {
                    decision,
                    matched: Some(policy.name),
                });
            }
        }

        debug!(action, "No policy matched, default deny");
        Ok(Evaluation {
            decision: Decision::Deny,
            matched: None,
        })
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> Arc<dyn PolicyStore> {
        Arc::clone(&self.store)
    }
}
