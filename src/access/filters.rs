//! List-level visibility, expressed as SQL conditions.
//!
//! Each function appends ` AND (...)` to a query that already has a `WHERE`
//! clause. Staff principals get no condition at all.

use sqlx::{Postgres, QueryBuilder};

use crate::access::Principal;

/// Projects the principal created or is a member of. `alias` names the projects table.
pub fn visible_projects(qb: &mut QueryBuilder<'_, Postgres>, principal: &Principal, alias: &str) {
    if principal.is_staff {
        return;
    }
    qb.push(format!(" AND ({alias}.creator_id = "));
    qb.push_bind(principal.user_id);
    qb.push(format!(
        " OR EXISTS (SELECT 1 FROM project_memberships pm \
         WHERE pm.project_id = {alias}.id AND pm.user_id = "
    ));
    qb.push_bind(principal.user_id);
    qb.push("))");
}

/// Rows whose `project_column` points at a project the principal created or belongs to.
/// Used for epics, issues and memberships.
pub fn within_visible_projects(
    qb: &mut QueryBuilder<'_, Postgres>,
    principal: &Principal,
    project_column: &str,
) {
    if principal.is_staff {
        return;
    }
    qb.push(format!(
        " AND {project_column} IN (SELECT id FROM projects WHERE creator_id = "
    ));
    qb.push_bind(principal.user_id);
    qb.push(" UNION SELECT project_id FROM project_memberships WHERE user_id = ");
    qb.push_bind(principal.user_id);
    qb.push(")");
}

/// Invitations the principal sent or received.
pub fn visible_invitations(
    qb: &mut QueryBuilder<'_, Postgres>,
    principal: &Principal,
    alias: &str,
) {
    if principal.is_staff {
        return;
    }
    qb.push(format!(" AND ({alias}.user_id = "));
    qb.push_bind(principal.user_id);
    qb.push(format!(" OR {alias}.inviter_id = "));
    qb.push_bind(principal.user_id);
    qb.push(")");
}
