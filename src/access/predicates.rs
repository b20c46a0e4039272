use crate::access::{Principal, ProjectAccess};
use crate::error::AppError;
use crate::models::ProjectInvitation;

/// A single, independently testable permission check.
pub type Predicate = fn(&Principal, &ProjectAccess) -> bool;

pub fn is_staff(principal: &Principal, _access: &ProjectAccess) -> bool {
    principal.is_staff
}

pub fn is_project_creator(_principal: &Principal, access: &ProjectAccess) -> bool {
    access.is_creator()
}

pub fn is_project_member(_principal: &Principal, access: &ProjectAccess) -> bool {
    access.is_member(None)
}

pub fn is_project_maintainer(_principal: &Principal, access: &ProjectAccess) -> bool {
    access.is_maintainer()
}

/// Named OR-composition of predicates, evaluated left to right with short-circuit.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    predicates: &'static [Predicate],
    denied: &'static str,
}

impl Rule {
    pub const fn new(
        name: &'static str,
        predicates: &'static [Predicate],
        denied: &'static str,
    ) -> Self {
        Self {
            name,
            predicates,
            denied,
        }
    }

    pub fn allows(&self, principal: &Principal, access: &ProjectAccess) -> bool {
        debug_assert_eq!(principal.user_id, access.user_id);
        self.predicates.iter().any(|check| check(principal, access))
    }

    pub fn check(&self, principal: &Principal, access: &ProjectAccess) -> Result<(), AppError> {
        if self.allows(principal, access) {
            Ok(())
        } else {
            tracing::debug!(
                rule = self.name,
                user_id = %principal.user_id,
                project_id = %access.project_id,
                "permission denied"
            );
            Err(AppError::Forbidden(self.denied.to_string()))
        }
    }
}

pub const PROJECT_READ: Rule = Rule::new(
    "project.read",
    &[is_staff, is_project_creator, is_project_member],
    "Access to the project is granted only to its creator and members",
);

pub const PROJECT_UPDATE: Rule = Rule::new(
    "project.update",
    &[is_staff, is_project_creator, is_project_maintainer],
    "Only the project creator or a maintainer can modify the project",
);

pub const PROJECT_DELETE: Rule = Rule::new(
    "project.delete",
    &[is_staff, is_project_creator],
    "Only the project creator can delete the project",
);

/// Epics, issues and everything hanging off an issue.
pub const PROJECT_CONTENT: Rule = Rule::new(
    "project.content",
    &[is_project_creator, is_project_member],
    "Access is granted only to the creator and members of the owning project",
);

pub const PROJECT_INVITE: Rule = Rule::new(
    "project.invite",
    &[is_project_creator, is_project_maintainer],
    "Only the project creator or a maintainer can invite users",
);

pub const MEMBERSHIP_READ: Rule = Rule::new(
    "membership.read",
    &[is_staff, is_project_creator, is_project_member],
    "Memberships are visible only within their project",
);

pub const MEMBERSHIP_ROLE_CHANGE: Rule = Rule::new(
    "membership.change_role",
    &[is_project_maintainer, is_project_creator],
    "Only the project creator or a maintainer can change membership roles",
);

pub fn can_view_invitation(principal: &Principal, invitation: &ProjectInvitation) -> bool {
    principal.is_staff
        || principal.user_id == invitation.inviter_id
        || principal.user_id == invitation.user_id
}

/// Accept and reject are reserved for the invited user; staff gets no bypass here.
pub fn is_invited_user(principal: &Principal, invitation: &ProjectInvitation) -> bool {
    principal.user_id == invitation.user_id
}
