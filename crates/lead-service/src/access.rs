//! Authorization guard
//!
//! Every privileged call is classified as an [`Operation`] and checked here,
//! before any state is read or written.

use leads_common::{Error, Identity, UserRole};

/// What a caller is attempting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Read own profile, own role, or admin status
    ReadOwnAccount,
    /// Create or overwrite own profile
    SaveOwnProfile,
    /// List, count or inspect leads
    ReadLeads,
    /// Create leads, append notes, change status
    WriteLeads,
    /// Look up somebody else's profile
    ReadOtherProfile,
    /// Assign a role to any identity
    AssignRole,
}

impl Operation {
    fn required_tier(&self) -> Tier {
        match self {
            Operation::ReadOwnAccount | Operation::SaveOwnProfile => Tier::Authenticated,
            Operation::ReadLeads | Operation::WriteLeads => Tier::Member,
            Operation::ReadOtherProfile | Operation::AssignRole => Tier::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Authenticated,
    Member,
    Admin,
}

/// Reason a call was refused
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    #[error("anonymous callers may not {0:?}")]
    Anonymous(Operation),

    #[error("role {role} may not {operation:?}; user or admin required")]
    NotAMember { role: UserRole, operation: Operation },

    #[error("role {role} may not {operation:?}; admin required")]
    NotAnAdmin { role: UserRole, operation: Operation },
}

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Collapse into the uniform failure signal used for every denial
    pub fn into_result(self) -> leads_common::Result<()> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(denial) => Err(Error::Unauthorized(denial.to_string())),
        }
    }
}

/// Decide whether `caller`, currently holding `role`, may perform `operation`.
pub fn authorize(caller: &Identity, role: UserRole, operation: Operation) -> Decision {
    if caller.is_anonymous() {
        return Decision::Denied(Denial::Anonymous(operation));
    }

    match operation.required_tier() {
        Tier::Authenticated => Decision::Allowed,
        Tier::Member if role.is_member() => Decision::Allowed,
        Tier::Member => Decision::Denied(Denial::NotAMember { role, operation }),
        Tier::Admin if role == UserRole::Admin => Decision::Allowed,
        Tier::Admin => Decision::Denied(Denial::NotAnAdmin { role, operation }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leads_common::ErrorKind;

    const ALL_OPERATIONS: [Operation; 6] = [
        Operation::ReadOwnAccount,
        Operation::SaveOwnProfile,
        Operation::ReadLeads,
        Operation::WriteLeads,
        Operation::ReadOtherProfile,
        Operation::AssignRole,
    ];

    fn alice() -> Identity {
        Identity::from("alice")
    }

    #[test]
    fn test_anonymous_denied_everything() {
        for op in ALL_OPERATIONS {
            let decision = authorize(&Identity::anonymous(), UserRole::Admin, op);
            assert_eq!(decision, Decision::Denied(Denial::Anonymous(op)));
        }
    }

    #[test]
    fn test_guest_limited_to_own_account() {
        assert!(authorize(&alice(), UserRole::Guest, Operation::ReadOwnAccount).is_allowed());
        assert!(authorize(&alice(), UserRole::Guest, Operation::SaveOwnProfile).is_allowed());
        assert!(!authorize(&alice(), UserRole::Guest, Operation::ReadLeads).is_allowed());
        assert!(!authorize(&alice(), UserRole::Guest, Operation::WriteLeads).is_allowed());
        assert!(!authorize(&alice(), UserRole::Guest, Operation::AssignRole).is_allowed());
    }

    #[test]
    fn test_user_works_leads_but_cannot_administer() {
        assert!(authorize(&alice(), UserRole::User, Operation::ReadLeads).is_allowed());
        assert!(authorize(&alice(), UserRole::User, Operation::WriteLeads).is_allowed());
        assert_eq!(
            authorize(&alice(), UserRole::User, Operation::AssignRole),
            Decision::Denied(Denial::NotAnAdmin {
                role: UserRole::User,
                operation: Operation::AssignRole,
            })
        );
        assert!(!authorize(&alice(), UserRole::User, Operation::ReadOtherProfile).is_allowed());
    }

    #[test]
    fn test_admin_allowed_everything() {
        for op in ALL_OPERATIONS {
            assert!(authorize(&alice(), UserRole::Admin, op).is_allowed());
        }
    }

    #[test]
    fn test_denials_share_one_signal() {
        let anonymous = authorize(&Identity::anonymous(), UserRole::Guest, Operation::WriteLeads);
        let guest = authorize(&alice(), UserRole::Guest, Operation::WriteLeads);
        let user = authorize(&alice(), UserRole::User, Operation::AssignRole);

        for decision in [anonymous, guest, user] {
            assert_eq!(decision.into_result().unwrap_err().kind(), ErrorKind::Unauthorized);
        }
    }
}
