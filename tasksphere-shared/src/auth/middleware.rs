/// Per-request identity for authenticated routes
///
/// The API server's auth layer validates the bearer token, loads the user
/// row, and inserts a [`CurrentUser`] into request extensions. Handlers
/// extract it with Axum's `Extension` extractor:
///
/// ```no_run
/// use axum::Extension;
/// use tasksphere_shared::auth::middleware::CurrentUser;
///
/// async fn handler(Extension(user): Extension<CurrentUser>) -> String {
///     format!("Hello, {}!", user.name)
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{User, UserRole};

/// The authenticated user attached to a request
///
/// Carries everything handlers need for authorization decisions; the
/// password hash is deliberately not part of this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub avatar_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar_path: user.avatar_path.clone(),
            created_at: user.created_at,
        }
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        (&user).into()
    }
}

/// Error type for the authentication layer
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Authorization header is not a Bearer token
    InvalidFormat(String),

    /// Token failed validation
    InvalidToken(String),

    /// Token was valid but the user no longer exists
    UserNotFound,

    /// Database error while resolving the user
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Not authorized, no token").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            AuthError::UserNotFound => {
                (StatusCode::UNAUTHORIZED, "User not found").into_response()
            }
            AuthError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            role,
            avatar_path: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_current_user_from_user() {
        let user = sample_user(UserRole::Admin);
        let current = CurrentUser::from(&user);

        assert_eq!(current.id, user.id);
        assert_eq!(current.email, user.email);
        assert!(current.is_admin());

        // No password material survives serialization
        let json = serde_json::to_string(&current).unwrap();
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidToken("bad".to_string())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::DatabaseError("boom".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
