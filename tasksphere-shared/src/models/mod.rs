/// Database models for Tasksphere
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts, roles, and password-reset state
/// - `task`: Tasks with their lifecycle status and assignment
/// - `comment`: Comments attached to a task, in insertion order
/// - `attachment`: File attachments recorded against a task
/// - `notification`: Per-user messages generated by task events
/// - `activity_log`: Append-only audit trail of mutating actions

pub mod activity_log;
pub mod attachment;
pub mod comment;
pub mod notification;
pub mod task;
pub mod user;
