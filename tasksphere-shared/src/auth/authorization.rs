/// Authorization predicates for resource access
///
/// Tasksphere's permission model is flat: a user is either an `admin` (full
/// access) or a regular `user` whose access derives from ownership of the
/// tasks they created, the tasks assigned to them, the comments they posted,
/// and their own notifications.
///
/// All predicates return `Err(AuthzError)` on denial, which the API layer
/// maps to 403 Forbidden.

use super::middleware::CurrentUser;
use crate::models::{comment::Comment, notification::Notification, task::Task};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Admin role required
    #[error("Not authorized as admin")]
    AdminRequired,

    /// Role/ownership mismatch for the resource
    #[error("{0}")]
    NotAuthorized(String),
}

/// Requires the admin role
pub fn require_admin(user: &CurrentUser) -> Result<(), AuthzError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// Task reads: creator, assignee, or admin
pub fn require_task_view(user: &CurrentUser, task: &Task) -> Result<(), AuthzError> {
    if user.is_admin() || task.created_by == user.id || task.assigned_to == Some(user.id) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized(
            "Not authorized to view this task".to_string(),
        ))
    }
}

/// Task updates: creator or admin
pub fn require_task_update(user: &CurrentUser, task: &Task) -> Result<(), AuthzError> {
    if user.is_admin() || task.created_by == user.id {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized(
            "Not authorized to update this task".to_string(),
        ))
    }
}

/// Task deletion: creator or admin
pub fn require_task_delete(user: &CurrentUser, task: &Task) -> Result<(), AuthzError> {
    if user.is_admin() || task.created_by == user.id {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized(
            "Not authorized to delete this task".to_string(),
        ))
    }
}

/// Comment deletion: poster or admin
pub fn require_comment_delete(user: &CurrentUser, comment: &Comment) -> Result<(), AuthzError> {
    if user.is_admin() || comment.posted_by == user.id {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized(
            "Not authorized to delete this comment".to_string(),
        ))
    }
}

/// Notification access: addressee or admin
pub fn require_notification_access(
    user: &CurrentUser,
    notification: &Notification,
) -> Result<(), AuthzError> {
    if user.is_admin() || notification.user_id == user.id {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized(
            "Not authorized to access this notification".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{task::TaskStatus, user::UserRole};
    use chrono::Utc;
    use uuid::Uuid;

    fn user_with_role(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
            avatar_path: None,
            created_at: Utc::now(),
        }
    }

    fn task_of(creator: Uuid, assignee: Option<Uuid>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Ship release".to_string(),
            description: None,
            due_date: None,
            status: TaskStatus::Pending,
            created_by: creator,
            assigned_to: assignee,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&user_with_role(UserRole::Admin)).is_ok());
        assert!(require_admin(&user_with_role(UserRole::User)).is_err());
    }

    #[test]
    fn test_task_view_creator_assignee_admin() {
        let creator = user_with_role(UserRole::User);
        let assignee = user_with_role(UserRole::User);
        let stranger = user_with_role(UserRole::User);
        let admin = user_with_role(UserRole::Admin);

        let task = task_of(creator.id, Some(assignee.id));

        assert!(require_task_view(&creator, &task).is_ok());
        assert!(require_task_view(&assignee, &task).is_ok());
        assert!(require_task_view(&admin, &task).is_ok());
        assert!(require_task_view(&stranger, &task).is_err());
    }

    #[test]
    fn test_task_update_excludes_assignee() {
        let creator = user_with_role(UserRole::User);
        let assignee = user_with_role(UserRole::User);

        let task = task_of(creator.id, Some(assignee.id));

        assert!(require_task_update(&creator, &task).is_ok());
        assert!(require_task_update(&assignee, &task).is_err());
        assert!(require_task_delete(&assignee, &task).is_err());
    }

    #[test]
    fn test_comment_delete_poster_or_admin() {
        let poster = user_with_role(UserRole::User);
        let other = user_with_role(UserRole::User);
        let admin = user_with_role(UserRole::Admin);

        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            text: "note".to_string(),
            posted_by: poster.id,
            created_at: Utc::now(),
        };

        assert!(require_comment_delete(&poster, &comment).is_ok());
        assert!(require_comment_delete(&admin, &comment).is_ok());
        assert!(require_comment_delete(&other, &comment).is_err());
    }

    #[test]
    fn test_notification_access() {
        let owner = user_with_role(UserRole::User);
        let other = user_with_role(UserRole::User);

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: owner.id,
            message: "msg".to_string(),
            is_read: false,
            created_at: Utc::now(),
        };

        assert!(require_notification_access(&owner, &notification).is_ok());
        assert!(require_notification_access(&other, &notification).is_err());
    }
}
