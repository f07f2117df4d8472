//! Role derivation and the gating rules built on top of it.

use model::entities::{account, profile, profile::Role};

use crate::error::ApiError;

/// Role assumed for a non-superuser account that has no profile.
pub const ROLE_WITHOUT_PROFILE: Role = Role::Student;

/// Roles allowed to create and delete accounts.
pub const ADMINISTRATIVE: &[Role] = &[Role::Administrative];
/// Roles allowed to write to the CSV logs.
pub const STAFF: &[Role] = &[Role::Teacher, Role::Administrative];

/// Derive the effective role of an account.
///
/// Superusers are always administrative. Otherwise the profile decides, and
/// an account without a profile is treated as [`ROLE_WITHOUT_PROFILE`].
pub fn role_of(account: &account::Model, profile: Option<&profile::Model>) -> Role {
    if account.is_superuser {
        return Role::Administrative;
    }
    profile.map(|p| p.role).unwrap_or(ROLE_WITHOUT_PROFILE)
}

/// Which accounts a requester may list or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only the requester's own account.
    OnlySelf(i32),
    /// Every account whose derived role is student.
    Students,
    Everyone,
}

impl Visibility {
    pub fn for_requester(account_id: i32, role: Role) -> Self {
        match role {
            Role::Student => Visibility::OnlySelf(account_id),
            Role::Teacher => Visibility::Students,
            Role::Administrative => Visibility::Everyone,
        }
    }

    /// Whether an account with the given id and derived role is visible.
    pub fn allows(&self, account_id: i32, role: Role) -> bool {
        match self {
            Visibility::OnlySelf(id) => *id == account_id,
            Visibility::Students => role == Role::Student,
            Visibility::Everyone => true,
        }
    }
}

/// Fails with `Forbidden(message)` unless `role` is one of `allowed`.
pub fn authorize(role: Role, allowed: &[Role], message: &str) -> Result<(), ApiError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(message.to_string()))
    }
}

/// Superuser accounts can never be deleted through the API.
pub fn ensure_deletable(target: &account::Model) -> Result<(), ApiError> {
    if target.is_superuser {
        Err(ApiError::CannotDeleteSuperuser)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(id: i32, superuser: bool) -> account::Model {
        account::Model {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_superuser: superuser,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    fn profile(account_id: i32, role: Role) -> profile::Model {
        profile::Model {
            account_id,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn superuser_is_always_administrative() {
        let root = account(1, true);
        assert_eq!(role_of(&root, None), Role::Administrative);
        assert_eq!(role_of(&root, Some(&profile(1, Role::Student))), Role::Administrative);
    }

    #[test]
    fn profile_role_wins_for_regular_accounts() {
        let acc = account(2, false);
        for role in [Role::Student, Role::Teacher, Role::Administrative] {
            assert_eq!(role_of(&acc, Some(&profile(2, role))), role);
        }
    }

    #[test]
    fn missing_profile_defaults_to_student() {
        assert_eq!(role_of(&account(3, false), None), Role::Student);
    }

    #[test]
    fn administrative_iff_superuser_or_profile() {
        for superuser in [false, true] {
            for role in [None, Some(Role::Student), Some(Role::Teacher), Some(Role::Administrative)] {
                let acc = account(4, superuser);
                let prof = role.map(|r| profile(4, r));
                let derived = role_of(&acc, prof.as_ref());
                let expected = superuser || role == Some(Role::Administrative);
                assert_eq!(derived == Role::Administrative, expected);
            }
        }
    }

    #[test]
    fn visibility_rules() {
        let student = Visibility::for_requester(10, Role::Student);
        assert!(student.allows(10, Role::Student));
        assert!(!student.allows(11, Role::Student));
        assert!(!student.allows(12, Role::Teacher));

        let teacher = Visibility::for_requester(20, Role::Teacher);
        assert!(teacher.allows(11, Role::Student));
        assert!(!teacher.allows(20, Role::Teacher));
        assert!(!teacher.allows(1, Role::Administrative));

        let admin = Visibility::for_requester(1, Role::Administrative);
        assert!(admin.allows(20, Role::Teacher));
        assert!(admin.allows(1, Role::Administrative));
    }

    #[test]
    fn authorize_checks_role_set() {
        assert!(authorize(Role::Teacher, STAFF, "no").is_ok());
        assert!(authorize(Role::Administrative, ADMINISTRATIVE, "no").is_ok());
        match authorize(Role::Student, STAFF, "No tienes permiso") {
            Err(ApiError::Forbidden(msg)) => assert_eq!(msg, "No tienes permiso"),
            other => panic!("expected Forbidden, got {:?}", other),
        }
        assert!(authorize(Role::Teacher, ADMINISTRATIVE, "no").is_err());
    }

    #[test]
    fn superusers_cannot_be_deleted() {
        assert!(matches!(
            ensure_deletable(&account(1, true)),
            Err(ApiError::CannotDeleteSuperuser)
        ));
        assert!(ensure_deletable(&account(2, false)).is_ok());
    }
}
