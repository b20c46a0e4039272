use uuid::Uuid;

use crate::models::{Project, Role};

/// One user's relationship to one project: who created it and which
/// membership role (if any) the user holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectAccess {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub creator_id: Uuid,
    pub role: Option<Role>,
}

impl ProjectAccess {
    pub fn new(project: &Project, user_id: Uuid, role: Option<Role>) -> Self {
        Self {
            project_id: project.id,
            user_id,
            creator_id: project.creator_id,
            role,
        }
    }

    pub fn is_creator(&self) -> bool {
        self.user_id == self.creator_id
    }

    /// Membership check. `None` accepts any role; otherwise the stored role must match exactly.
    pub fn is_member(&self, role: Option<Role>) -> bool {
        match (self.role, role) {
            (Some(_), None) => true,
            (Some(held), Some(wanted)) => held == wanted,
            (None, _) => false,
        }
    }

    /// The creator satisfies every role check.
    pub fn is_member_or_creator(&self, role: Option<Role>) -> bool {
        self.is_creator() || self.is_member(role)
    }

    pub fn is_developer(&self) -> bool {
        self.is_member(Some(Role::Developer))
    }

    pub fn is_maintainer(&self) -> bool {
        self.is_member(Some(Role::Maintainer))
    }

    pub fn is_developer_or_creator(&self) -> bool {
        self.is_member_or_creator(Some(Role::Developer))
    }

    pub fn is_maintainer_or_creator(&self) -> bool {
        self.is_member_or_creator(Some(Role::Maintainer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(is_creator: bool, role: Option<Role>) -> ProjectAccess {
        let user_id = Uuid::now_v7();
        ProjectAccess {
            project_id: Uuid::now_v7(),
            user_id,
            creator_id: if is_creator { user_id } else { Uuid::now_v7() },
            role,
        }
    }

    #[test]
    fn any_role_matches_when_role_omitted() {
        assert!(access(false, Some(Role::Developer)).is_member(None));
        assert!(access(false, Some(Role::Maintainer)).is_member(None));
        assert!(!access(false, None).is_member(None));
    }

    #[test]
    fn role_check_is_exact() {
        let developer = access(false, Some(Role::Developer));
        assert!(developer.is_developer());
        assert!(!developer.is_maintainer());

        let maintainer = access(false, Some(Role::Maintainer));
        assert!(maintainer.is_maintainer());
        assert!(!maintainer.is_developer());
    }

    #[test]
    fn creator_satisfies_any_role() {
        let creator = access(true, None);
        assert!(!creator.is_member(None));
        assert!(creator.is_member_or_creator(None));
        assert!(creator.is_developer_or_creator());
        assert!(creator.is_maintainer_or_creator());
    }

    #[test]
    fn outsider_satisfies_nothing() {
        let outsider = access(false, None);
        assert!(!outsider.is_creator());
        assert!(!outsider.is_member_or_creator(None));
        assert!(!outsider.is_maintainer_or_creator());
    }
}
