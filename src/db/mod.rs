pub mod activation_tokens;
pub mod comments;
pub mod epics;
pub mod invitations;
pub mod issues;
pub mod logged_time;
pub mod memberships;
pub mod notifications;
pub mod projects;
pub mod refresh_tokens;
pub mod users;
