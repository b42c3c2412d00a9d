use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;
use tracing::warn;

use crate::error::AppError;
use crate::models::User;

const CREDENTIALS_REJECTED: &str = "Could not validate credentials";

/// Caller identified by the `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Caller whose account has the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl AuthUser {
    /// Fails with 403 and `message` unless the user is an admin.
    pub fn require_admin(self, message: &str) -> Result<User, AppError> {
        if self.0.is_admin {
            Ok(self.0)
        } else {
            warn!(username = %self.0.username, "admin-only action rejected");
            Err(AppError::forbidden(message))
        }
    }
}

impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::unauthorized(CREDENTIALS_REJECTED))?;

        let claims = state.jwt.verify(token).map_err(|e| {
            warn!(error = %e, "bearer token rejected");
            AppError::unauthorized(CREDENTIALS_REJECTED)
        })?;

        let user = User::find_by_username(&state.db.pool, &claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::unauthorized(CREDENTIALS_REJECTED))?;

        Ok(AuthUser(user))
    }
}

impl FromRequestParts<Arc<crate::AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state)
            .await?
            .require_admin("Not authorized")?;
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/users/me");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn user(is_admin: bool) -> User {
        User {
            id: 1,
            username: "carol".into(),
            email: "carol@example.com".into(),
            hashed_password: String::new(),
            is_active: true,
            is_admin,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic Zm9vOmJhcg=="))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn require_admin_gates_on_flag() {
        assert!(AuthUser(user(true)).require_admin("nope").is_ok());

        let err = AuthUser(user(false))
            .require_admin("Not authorized to view all users")
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Not authorized to view all users");
    }
}
