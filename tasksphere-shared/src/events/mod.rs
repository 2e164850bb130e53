/// Task domain events and their side effects
///
/// Task handlers do not write notifications or activity-log rows inline.
/// They publish a [`TaskEvent`] describing what happened; this module derives
/// the side effects from the event:
///
/// - at most one [`Notification`](crate::models::notification::Notification)
///   for the affected user, skipped when that user is the actor;
/// - one activity-log entry recording actor, action kind, target, and a
///   details payload.
///
/// Both writes are best-effort. A failed notification or log write is
/// reported at warn level and never surfaces into the primary request's
/// result.
///
/// # Example
///
/// ```no_run
/// use tasksphere_shared::events::{publish, TaskEvent};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
/// # async fn example(pool: PgPool, actor: Uuid, assignee: Uuid, task_id: Uuid) {
/// publish(&pool, actor, TaskEvent::Created {
///     task_id,
///     title: "Ship release".to_string(),
///     assigned_to: Some(assignee),
/// })
/// .await;
/// # }
/// ```

use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::models::{
    activity_log::{ActivityAction, ActivityLog, CreateActivityLog},
    notification::{CreateNotification, Notification},
    task::TaskStatus,
};

/// A mutation that happened to a task
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// Task was created
    Created {
        task_id: Uuid,
        title: String,
        assigned_to: Option<Uuid>,
    },

    /// Task fields were updated; `reassigned_to` is set when the assignee
    /// changed to a new user
    Updated {
        task_id: Uuid,
        title: String,
        reassigned_to: Option<Uuid>,
        changes: JsonValue,
    },

    /// Task advanced along its lifecycle
    StatusChanged {
        task_id: Uuid,
        title: String,
        status: TaskStatus,
        assigned_to: Option<Uuid>,
    },

    /// Task was deleted
    Deleted { task_id: Uuid, title: String },

    /// A comment was added
    Commented {
        task_id: Uuid,
        title: String,
        task_creator: Uuid,
        text: String,
    },

    /// A comment was removed
    CommentDeleted { task_id: Uuid, comment_id: Uuid },

    /// A file was attached
    AttachmentUploaded { task_id: Uuid, stored_path: String },
}

/// Derives the notification an event produces, if any
///
/// Returns None when the event carries no notification rule or when the
/// would-be recipient is the actor themselves.
pub fn notification_for(actor: Uuid, event: &TaskEvent) -> Option<CreateNotification> {
    let (recipient, message) = match event {
        TaskEvent::Created {
            title,
            assigned_to: Some(assignee),
            ..
        } => (
            *assignee,
            format!("You have been assigned a new task: {}", title),
        ),
        TaskEvent::Updated {
            title,
            reassigned_to: Some(assignee),
            ..
        } => (
            *assignee,
            format!("A task has been assigned to you: {}", title),
        ),
        TaskEvent::StatusChanged {
            title,
            status,
            assigned_to: Some(assignee),
            ..
        } => {
            let message = match status {
                TaskStatus::InProgress => format!("Task \"{}\" is now in progress", title),
                TaskStatus::Completed => format!("Task \"{}\" has been completed", title),
                TaskStatus::Pending => return None,
            };
            (*assignee, message)
        }
        TaskEvent::Commented {
            title,
            task_creator,
            ..
        } => (
            *task_creator,
            format!("New comment on your task \"{}\"", title),
        ),
        _ => return None,
    };

    if recipient == actor {
        return None;
    }

    Some(CreateNotification {
        user_id: recipient,
        message,
    })
}

/// Derives the activity-log entry for an event
pub fn activity_entry(actor: Uuid, event: &TaskEvent) -> CreateActivityLog {
    let (action, task_id, details) = match event {
        TaskEvent::Created { task_id, title, .. } => (
            ActivityAction::Create,
            Some(*task_id),
            json!({ "title": title }),
        ),
        TaskEvent::Updated {
            task_id, changes, ..
        } => (
            ActivityAction::Update,
            Some(*task_id),
            json!({ "updates": changes }),
        ),
        TaskEvent::StatusChanged {
            task_id, status, ..
        } => (
            ActivityAction::StatusChange,
            Some(*task_id),
            json!({ "status": status }),
        ),
        TaskEvent::Deleted { task_id, title } => (
            ActivityAction::Delete,
            Some(*task_id),
            json!({ "title": title }),
        ),
        TaskEvent::Commented { task_id, text, .. } => (
            ActivityAction::Comment,
            Some(*task_id),
            json!({ "comment": text }),
        ),
        TaskEvent::CommentDeleted {
            task_id,
            comment_id,
        } => (
            ActivityAction::DeleteComment,
            Some(*task_id),
            json!({ "commentId": comment_id }),
        ),
        TaskEvent::AttachmentUploaded {
            task_id,
            stored_path,
        } => (
            ActivityAction::Upload,
            Some(*task_id),
            json!({ "file": stored_path }),
        ),
    };

    CreateActivityLog {
        user_id: actor,
        action,
        task_id,
        details: Some(details),
    }
}

/// Publishes an event: writes its notification and activity-log entry
///
/// Side-effect failures are isolated: each write that fails is logged and
/// swallowed so the caller's primary mutation still reports success.
pub async fn publish(pool: &PgPool, actor: Uuid, event: TaskEvent) {
    if let Some(notification) = notification_for(actor, &event) {
        if let Err(e) = Notification::create(pool, notification).await {
            warn!(error = %e, ?event, "Failed to create notification");
        }
    }

    if let Err(e) = ActivityLog::create(pool, activity_entry(actor, &event)).await {
        warn!(error = %e, ?event, "Failed to append activity log entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_notifies_assignee() {
        let actor = Uuid::new_v4();
        let assignee = Uuid::new_v4();

        let event = TaskEvent::Created {
            task_id: Uuid::new_v4(),
            title: "Ship release".to_string(),
            assigned_to: Some(assignee),
        };

        let notification = notification_for(actor, &event).unwrap();
        assert_eq!(notification.user_id, assignee);
        assert_eq!(
            notification.message,
            "You have been assigned a new task: Ship release"
        );
    }

    #[test]
    fn test_created_without_assignee_is_silent() {
        let event = TaskEvent::Created {
            task_id: Uuid::new_v4(),
            title: "Ship release".to_string(),
            assigned_to: None,
        };

        assert!(notification_for(Uuid::new_v4(), &event).is_none());
    }

    #[test]
    fn test_self_assignment_is_silent() {
        let actor = Uuid::new_v4();

        let event = TaskEvent::Created {
            task_id: Uuid::new_v4(),
            title: "Ship release".to_string(),
            assigned_to: Some(actor),
        };

        assert!(notification_for(actor, &event).is_none());
    }

    #[test]
    fn test_status_change_messages() {
        let actor = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let in_progress = TaskEvent::StatusChanged {
            task_id,
            title: "Ship release".to_string(),
            status: TaskStatus::InProgress,
            assigned_to: Some(assignee),
        };
        assert_eq!(
            notification_for(actor, &in_progress).unwrap().message,
            "Task \"Ship release\" is now in progress"
        );

        let completed = TaskEvent::StatusChanged {
            task_id,
            title: "Ship release".to_string(),
            status: TaskStatus::Completed,
            assigned_to: Some(assignee),
        };
        assert_eq!(
            notification_for(actor, &completed).unwrap().message,
            "Task \"Ship release\" has been completed"
        );
    }

    #[test]
    fn test_status_change_by_assignee_is_silent() {
        let assignee = Uuid::new_v4();

        let event = TaskEvent::StatusChanged {
            task_id: Uuid::new_v4(),
            title: "Ship release".to_string(),
            status: TaskStatus::InProgress,
            assigned_to: Some(assignee),
        };

        assert!(notification_for(assignee, &event).is_none());
    }

    #[test]
    fn test_comment_notifies_creator_unless_self() {
        let creator = Uuid::new_v4();
        let poster = Uuid::new_v4();

        let event = TaskEvent::Commented {
            task_id: Uuid::new_v4(),
            title: "Ship release".to_string(),
            task_creator: creator,
            text: "On it".to_string(),
        };

        let notification = notification_for(poster, &event).unwrap();
        assert_eq!(notification.user_id, creator);
        assert_eq!(
            notification.message,
            "New comment on your task \"Ship release\""
        );

        // Creator commenting on their own task stays silent
        assert!(notification_for(creator, &event).is_none());
    }

    #[test]
    fn test_deleted_and_upload_are_silent() {
        let actor = Uuid::new_v4();

        let deleted = TaskEvent::Deleted {
            task_id: Uuid::new_v4(),
            title: "Ship release".to_string(),
        };
        assert!(notification_for(actor, &deleted).is_none());

        let uploaded = TaskEvent::AttachmentUploaded {
            task_id: Uuid::new_v4(),
            stored_path: "uploads/tasks/abc.pdf".to_string(),
        };
        assert!(notification_for(actor, &uploaded).is_none());
    }

    #[test]
    fn test_activity_entries() {
        let actor = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let entry = activity_entry(
            actor,
            &TaskEvent::Created {
                task_id,
                title: "Ship release".to_string(),
                assigned_to: None,
            },
        );
        assert_eq!(entry.user_id, actor);
        assert_eq!(entry.action, ActivityAction::Create);
        assert_eq!(entry.task_id, Some(task_id));
        assert_eq!(entry.details.unwrap()["title"], "Ship release");

        let entry = activity_entry(
            actor,
            &TaskEvent::StatusChanged {
                task_id,
                title: "Ship release".to_string(),
                status: TaskStatus::Completed,
                assigned_to: None,
            },
        );
        assert_eq!(entry.action, ActivityAction::StatusChange);
        assert_eq!(entry.details.unwrap()["status"], "completed");

        let comment_id = Uuid::new_v4();
        let entry = activity_entry(
            actor,
            &TaskEvent::CommentDeleted {
                task_id,
                comment_id,
            },
        );
        assert_eq!(entry.action, ActivityAction::DeleteComment);
        assert_eq!(
            entry.details.unwrap()["commentId"],
            comment_id.to_string()
        );
    }
}
