use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("policy name already exists: {name}")]
    DuplicateName { name: String },

    #[error("malformed rule {rule:?}: {reason}")]
    MalformedRule { rule: String, reason: String },

    #[error("invalid policy name: {0:?} (must not be empty or blank)")]
    InvalidPolicyName(String),

    #[error("unknown effect: {0:?} (expected \"allow\" or \"deny\")")]
    UnknownEffect(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthzError {
    pub(crate) fn malformed_rule(rule: &str, reason: impl Into<String>) -> Self {
        AuthzError::MalformedRule {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthzError>;
