/// API route handlers, organized by resource
///
/// - `health`: liveness probe
/// - `users`: registration, login, profile, password reset
/// - `tasks`: task lifecycle, comments, attachments, bulk operations
/// - `notifications`: per-user notifications
/// - `dashboard`: admin statistics
/// - `logs`: admin activity-log view

pub mod dashboard;
pub mod health;
pub mod logs;
pub mod notifications;
pub mod tasks;
pub mod users;
