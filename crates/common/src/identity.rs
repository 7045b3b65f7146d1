use serde::{Deserialize, Serialize};
use std::fmt;

/// Textual form of the anonymous caller, as issued by the upstream identity layer
pub const ANONYMOUS_IDENTITY: &str = "2vxsx-fae";

/// An opaque caller token verified by an external identity layer.
/// Only used as a lookup key and an audit field; never parsed or validated here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap a verified token. Blank tokens collapse to the anonymous identity.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            Self::anonymous()
        } else if trimmed.len() == token.len() {
            Self(token)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The identity of a caller that did not authenticate
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_IDENTITY.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_IDENTITY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_anonymous() {
        assert!(Identity::new("").is_anonymous());
        assert!(Identity::new("   ").is_anonymous());
        assert!(Identity::new(ANONYMOUS_IDENTITY).is_anonymous());
    }

    #[test]
    fn test_token_is_trimmed() {
        let id = Identity::new("  aaaaa-aa ");
        assert_eq!(id.as_str(), "aaaaa-aa");
        assert!(!id.is_anonymous());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&Identity::from("rrkah-fqaaa")).unwrap();
        assert_eq!(json, "\"rrkah-fqaaa\"");
    }
}
