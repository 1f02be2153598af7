//! crates/sat_prep_core/src/session.rs
//!
//! The role-gating flow: `unauthenticated -> awaiting role -> active(role)`.
//!
//! The role is never cached on the session itself. An [`AuthContext`] is built
//! per request from the session row and the current user row, so the store is
//! the only place a role lives.

use crate::domain::{Role, User};

/// The authenticated caller, passed explicitly to everything that needs it.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session_id: String,
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    AwaitingRole,
    Active(Role),
}

impl SessionPhase {
    pub fn of(context: Option<&AuthContext>) -> Self {
        match context.map(|c| c.user.role) {
            None => SessionPhase::Unauthenticated,
            Some(None) => SessionPhase::AwaitingRole,
            Some(Some(role)) => SessionPhase::Active(role),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Unauthenticated => "unauthenticated",
            SessionPhase::AwaitingRole => "authenticated-no-role",
            SessionPhase::Active(_) => "authenticated-with-role",
        }
    }

    /// Where the presentation layer should send a caller in this phase.
    pub fn landing_path(&self) -> &'static str {
        match self {
            SessionPhase::Unauthenticated => "/auth/login",
            SessionPhase::AwaitingRole => "/select-role",
            SessionPhase::Active(Role::Instructor) => "/instructor",
            SessionPhase::Active(Role::Student) => "/student",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Select a role before using this resource")]
    RoleNotSelected,
    #[error("This resource requires the {required} role")]
    WrongRole { required: Role },
}

impl AuthContext {
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::of(Some(self))
    }

    /// Checks that the caller has picked a role, and the given one if any.
    pub fn authorize(&self, required: Option<Role>) -> Result<Role, AccessError> {
        let role = self.user.role.ok_or(AccessError::RoleNotSelected)?;
        match required {
            Some(required) if required != role => Err(AccessError::WrongRole { required }),
            _ => Ok(role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn context(role: Option<Role>) -> AuthContext {
        AuthContext {
            session_id: "s".into(),
            user: User {
                id: Uuid::new_v4(),
                email: "ada@example.com".into(),
                name: Some("Ada".into()),
                role,
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn phases_follow_the_role_flow() {
        assert_eq!(SessionPhase::of(None), SessionPhase::Unauthenticated);
        assert_eq!(context(None).phase(), SessionPhase::AwaitingRole);
        assert_eq!(
            context(Some(Role::Student)).phase(),
            SessionPhase::Active(Role::Student)
        );
        assert_eq!(SessionPhase::of(None).landing_path(), "/auth/login");
        assert_eq!(context(None).phase().landing_path(), "/select-role");
        assert_eq!(
            context(Some(Role::Instructor)).phase().landing_path(),
            "/instructor"
        );
    }

    #[test]
    fn authorize_checks_selection_then_role() {
        assert_eq!(
            context(None).authorize(None),
            Err(AccessError::RoleNotSelected)
        );
        assert_eq!(
            context(Some(Role::Student)).authorize(Some(Role::Instructor)),
            Err(AccessError::WrongRole {
                required: Role::Instructor
            })
        );
        assert_eq!(
            context(Some(Role::Student)).authorize(None),
            Ok(Role::Student)
        );
    }
}
