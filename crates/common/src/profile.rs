use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Self-described profile of a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Access tier of a caller. Callers without an assignment are guests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    #[default]
    Guest,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
            UserRole::Guest => "guest",
        }
    }

    /// Whether this role may work with leads
    pub fn is_member(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::User)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            "guest" => Ok(UserRole::Guest),
            other => Err(crate::Error::Validation(format!("Unknown role: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_role_is_guest() {
        assert_eq!(UserRole::default(), UserRole::Guest);
        assert!(!UserRole::Guest.is_member());
        assert!(UserRole::User.is_member());
        assert!(UserRole::Admin.is_member());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_profile_company_is_optional() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"name":"Ana","email":"ana@x.com"}"#).unwrap();
        assert_eq!(profile.company, None);
    }
}
