pub mod comment;
pub mod epic;
pub mod invitation;
pub mod issue;
pub mod logged_time;
pub mod membership;
pub mod notification;
pub mod project;
pub mod refresh_token;
pub mod user;

pub use comment::IssueComment;
pub use epic::Epic;
pub use invitation::{InvitationBody, InvitationStatus, ProjectInvitation};
pub use issue::{Issue, IssueFields, IssueStatus, IssueType};
pub use logged_time::LoggedTime;
pub use membership::{ProjectMembership, Role};
pub use notification::NotificationQueueItem;
pub use project::Project;
pub use refresh_token::RefreshToken;
pub use user::User;
