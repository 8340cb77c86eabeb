//! Policy document structure
//!
//! A policy is a named rule binding one subject condition, one resource
//! condition, and an action to an effect. Conditions are single
//! attribute-equality tests carried on the wire as `"key=value"` strings
//! and parsed once, at creation time. Evaluation never re-parses.

use crate::core::attrs::Attributes;
use crate::core::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Effect of a policy when it matches a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Grant the request
    Allow,
    /// Refuse the request
    Deny,
}

impl Effect {
    /// Stable lowercase form, used in JSON and in the store's effect column
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            other => Err(AuthzError::UnknownEffect(other.to_string())),
        }
    }
}

/// A validated single attribute-equality condition
///
/// The wire form is `"key=value"` with exactly one `=`. Parsing splits the
/// rule once and keeps the structured pair beside the raw string, so a
/// malformed rule is rejected when the policy is created rather than
/// surfacing mid-evaluation.
///
/// # Examples
///
/// ```
/// use turnstile_rs::Condition;
///
/// let cond = Condition::parse("role=admin")?;
/// assert_eq!(cond.key(), "role");
/// assert_eq!(cond.value(), "admin");
/// assert_eq!(cond.rule(), "role=admin");
///
/// assert!(Condition::parse("role").is_err());        // no separator
/// assert!(Condition::parse("a=b=c").is_err());       // two separators
/// # Ok::<(), turnstile_rs::AuthzError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    rule: String,
    key: String,
    value: String,
}

impl Condition {
    /// Parse a `"key=value"` rule string
    ///
    /// # Errors
    ///
    /// Returns `MalformedRule` unless the string contains exactly one `=`.
    /// An empty key or value is accepted: an empty key can never match
    /// (no attribute has the empty name unless the caller supplies one),
    /// and an empty value matches only an attribute rendering to `""`.
    pub fn parse(rule: impl Into<String>) -> Result<Self> {
        let rule = rule.into();
        let Some((key, value)) = rule.split_once('=') else {
            return Err(AuthzError::malformed_rule(&rule, "missing '=' separator"));
        };
        if value.contains('=') {
            return Err(AuthzError::malformed_rule(
                &rule,
                format!(
                    "expected one '=' separator, found {}",
                    rule.matches('=').count()
                ),
            ));
        }
        Ok(Condition {
            key: key.to_string(),
            value: value.to_string(),
            rule,
        })
    }

    /// The attribute name this condition tests
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The expected value, compared as an exact string
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The raw `"key=value"` wire form
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Evaluate this condition against an attribute map
    ///
    /// A missing attribute is a non-match, not an error. The attribute value
    /// is rendered through the canonical string conversion and compared
    /// case-sensitively, with no wildcards and no numeric coercion.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        match attributes.get(&self.key) {
            Some(actual) => actual.to_string() == self.value,
            None => false,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rule)
    }
}

impl TryFrom<String> for Condition {
    type Error = AuthzError;

    fn try_from(rule: String) -> Result<Self> {
        Condition::parse(rule)
    }
}

impl From<Condition> for String {
    fn from(cond: Condition) -> String {
        cond.rule
    }
}

/// A named access rule
///
/// Immutable once created; the store enforces name uniqueness. The JSON
/// form is the wire representation:
/// `{"name", "effect", "subject_rule", "resource_rule", "action"}` with
/// rules as `"key=value"` strings and the effect lowercase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy identifier
    #[serde(deserialize_with = "deserialize_name")]
    pub name: String,

    /// What a match produces
    pub effect: Effect,

    /// Condition on the subject's attributes
    pub subject_rule: Condition,

    /// Condition on the resource's attributes
    pub resource_rule: Condition,

    /// Action this policy applies to, matched by exact equality
    pub action: String,
}

impl Policy {
    /// Create a policy, validating the name and both rule strings
    ///
    /// # Errors
    ///
    /// Returns `InvalidPolicyName` for an empty or blank name and
    /// `MalformedRule` for a rule without exactly one `=`.
    ///
    /// # Examples
    ///
    /// ```
    /// use turnstile_rs::{Effect, Policy};
    ///
    /// let policy = Policy::new("admin-read", Effect::Allow, "role=admin", "type=doc", "read")?;
    /// assert_eq!(policy.subject_rule.key(), "role");
    ///
    /// assert!(Policy::new("", Effect::Allow, "a=b", "c=d", "read").is_err());
    /// # Ok::<(), turnstile_rs::AuthzError>(())
    /// ```
    pub fn new(
        name: impl Into<String>,
        effect: Effect,
        subject_rule: &str,
        resource_rule: &str,
        action: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AuthzError::InvalidPolicyName(name));
        }

        Ok(Policy {
            name,
            effect,
            subject_rule: Condition::parse(subject_rule)?,
            resource_rule: Condition::parse(resource_rule)?,
            action: action.into(),
        })
    }

    /// Check whether this policy matches a request
    ///
    /// The action gate runs first; a policy for another action is skipped
    /// without any attribute comparison. Both conditions must then hold.
    pub fn matches(&self, subject: &Attributes, resource: &Attributes, action: &str) -> bool {
        self.action == action
            && self.subject_rule.matches(subject)
            && self.resource_rule.matches(resource)
    }

    /// Parse a policy from its JSON wire form
    ///
    /// Rejects the same documents [`Policy::new`] would reject: a rule
    /// without exactly one `=`, or a blank name.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this policy to its JSON wire form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// Name validation mirrors `Policy::new`, so deserialization cannot hand
// out a policy the constructor would have refused.
fn deserialize_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    if name.trim().is_empty() {
        return Err(serde::de::Error::custom(
            "policy name must not be empty or blank",
        ));
    }
    Ok(name)
}
